//! Shared value types used across resource systems and the render graph.

extern crate nalgebra_glm as na;

/// Alias for convenience
pub type Vector2 = na::Vec2;
/// Alias for convenience
pub type Vector3 = na::Vec3;
/// Alias for convenience
pub type Vector4 = na::Vec4;
/// Alias for convenience
pub type Matrix4 = na::Mat4x4;

/// Pixel format of an attachment or texture.
///
/// `SwapchainColor`/`SwapchainDepth` are sentinels resolved by the RHI to
/// whatever concrete format the current swapchain uses; the depth-detection
/// policy in [`crate::resources::render_pass`] treats `SwapchainDepth` as a
/// depth format even though it carries no explicit bit layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    Rgba8Unorm,
    Bgra8Unorm,
    Rgba8Srgb,
    Bgra8Srgb,
    D32Sfloat,
    D24UnormS8Uint,
    SwapchainColor,
    SwapchainDepth,
}

impl PixelFormat {
    /// True if this format is ever usable as a depth/stencil attachment.
    pub fn is_depth_format(self) -> bool {
        matches!(
            self,
            PixelFormat::D32Sfloat | PixelFormat::D24UnormS8Uint | PixelFormat::SwapchainDepth
        )
    }
}

/// Shader pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Pixel,
    Compute,
    Geometry,
    TessCtl,
    TessEval,
    All,
}

impl ShaderStage {
    /// Infer a stage from a conventional asset filename suffix, used when a
    /// shader's sidecar descriptor is missing (§6 of the spec).
    pub fn infer_from_suffix(suffix: &str) -> Option<ShaderStage> {
        match suffix {
            "vert" => Some(ShaderStage::Vertex),
            "frag" | "pixl" => Some(ShaderStage::Pixel),
            _ => None,
        }
    }
}

/// How an attachment/render pass load operation treats existing contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadOp {
    Load,
    Clear,
    DontCare,
}

/// How an attachment/render pass store operation treats the written contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Store,
    DontCare,
}

/// The role a pass plays relative to the swapchain's color attachment
/// transition (§3, §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassPosition {
    First,
    Middle,
    Last,
    Standalone,
}

impl PassPosition {
    /// Layout the attachment is in when the pass begins.
    pub fn layout_in(self) -> AttachmentLayout {
        match self {
            PassPosition::First | PassPosition::Standalone => AttachmentLayout::Undefined,
            PassPosition::Middle | PassPosition::Last => AttachmentLayout::ColorAttachment,
        }
    }

    /// Layout the attachment must be in when the pass ends.
    pub fn layout_out(self) -> AttachmentLayout {
        match self {
            PassPosition::First | PassPosition::Middle => AttachmentLayout::ColorAttachment,
            PassPosition::Last | PassPosition::Standalone => AttachmentLayout::Present,
        }
    }
}

/// Coarse image layout, enough to describe the UNDEFINED -> ... -> PRESENT
/// transitions the spec cares about without modelling a full backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttachmentLayout {
    Undefined,
    ColorAttachment,
    DepthStencilAttachment,
    Present,
}

/// The kind of a render pass, used both as part of the render-state cache
/// key and to pick the pass's draw-time behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderPassType {
    ForwardOpaque,
    ForwardTransparent,
    Shadow,
    DepthPrepass,
    PostProcess,
    Ui,
}

/// Material class, the other half of the render-state cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaterialClass {
    Standard,
    Ui,
}

/// Canonical vertex layouts the render-state cache knows how to derive
/// attribute lists for (§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexFormat {
    Position,
    PositionColor,
    PositionUv,
    PositionNormal,
    PositionNormalUv,
    PositionNormalUvTangent,
    Custom,
}

/// A single vertex attribute, all channels are Float32 per the spec's table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexAttribute {
    Float32x2,
    Float32x3,
    Float32x4,
}

impl VertexFormat {
    /// Derive the attribute list for a non-`Custom` format, or `None` if the
    /// caller must supply one explicitly (§4.4 table).
    pub fn default_attributes(self) -> Option<Vec<VertexAttribute>> {
        use VertexAttribute::*;
        match self {
            VertexFormat::Position => Some(vec![Float32x3]),
            VertexFormat::PositionColor => Some(vec![Float32x3, Float32x4]),
            VertexFormat::PositionUv => Some(vec![Float32x3, Float32x2]),
            VertexFormat::PositionNormal => Some(vec![Float32x3, Float32x3]),
            VertexFormat::PositionNormalUv => Some(vec![Float32x3, Float32x3, Float32x2]),
            VertexFormat::PositionNormalUvTangent => {
                Some(vec![Float32x3, Float32x3, Float32x2, Float32x4])
            }
            VertexFormat::Custom => None,
        }
    }
}

/// What a texture is semantically used for; drives which placeholder is
/// used while loading (§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureUse {
    Diffuse,
    Specular,
    Normal,
}

/// Kind of resource binding a render state expects from a material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingType {
    ConstantBuffer,
    Texture1D,
    Texture2D,
    Texture3D,
    TextureCube,
    Sampler,
    StorageBuffer,
    StorageTexture,
}

/// A single expected resource binding in a render state.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceBinding {
    pub binding_type: BindingType,
    pub binding_index: u32,
    pub shader_stage: ShaderStage,
}

/// Sizing policy for a render target (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SizingPolicy {
    Absolute,
    RelativeToViewport,
}

/// Usage of a render target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderTargetUsage {
    Color,
    DepthStencil,
    RenderTexture,
    Storage,
}

/// Read/write access declared by a pass against a virtual resource name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceAccess {
    Read,
    Write,
}

/// Per-frame data threaded through the executor into pass renderers.
#[derive(Debug, Clone, Copy)]
pub struct FrameData {
    pub delta_time: f32,
    pub view: Matrix4,
    pub projection: Matrix4,
}

pub const WELL_KNOWN_VIEWPORT_COLOR: &str = "viewport.color";
pub const WELL_KNOWN_VIEWPORT_DEPTH: &str = "viewport.depth";
