//! The RHI abstraction (component A of the spec).
//!
//! This is the "back-end graphics API treated as an abstract capability
//! set" the spec calls out as external to the core (§1, §6): the trait
//! below is the contract every other component in this crate is written
//! against, generalising the concrete gfx-hal calls the teacher crate makes
//! directly in `context.rs`/`target.rs` into a backend-agnostic interface.
//! No Vulkan/Metal/DX implementation ships here; [`NullRhi`] is a
//! deterministic in-memory backend used by this crate's own test suite and
//! by host tooling that wants to drive the render graph without a GPU.

mod null;

pub use null::NullRhi;

use crate::error::BackendFatal;
use crate::resources::mesh::MeshData;
use crate::resources::render_pass::RenderPassConfig;
use crate::resources::render_state::RenderStateConfig;
use crate::resources::render_target::RenderTargetConfig;
use crate::resources::texture::TextureDefinition;
use crate::types::{PassPosition, ShaderStage, VertexAttribute};

/// An opaque reference to a backend-owned object (image, buffer, pipeline,
/// render pass, ...). The RHI hands these out from its `create_*` methods;
/// callers (the resource systems in [`crate::resources`]) store them
/// alongside the handle-fabric entry that owns them and pass them back
/// verbatim on every later RHI call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BackendId(pub u64);

/// The GPU buffers backing an uploaded mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshBuffers {
    pub vertex_buffer: BackendId,
    pub index_buffer: BackendId,
}

/// The render hardware abstraction the rest of this crate is written
/// against (§6 of the spec).
///
/// Implementors back every method with whatever a concrete backend needs;
/// none of it is specified here beyond the contract in the doc comments.
/// `create_*`/`release_*` are main-thread only by convention, enforced by
/// this crate's job scheduling (§5), not by any check inside the trait.
pub trait Rhi: Send + Sync {
    /// Recreate the swapchain. Called on window resize.
    fn resize(&mut self, width: u32, height: u32);

    /// Block until the device has finished all outstanding work. Used only
    /// at shutdown and resize (§5).
    fn wait_idle(&mut self);

    /// Begin a new frame. `false` indicates a transient failure (e.g.
    /// swapchain out of date); the caller skips the frame entirely.
    fn begin_frame(&mut self, dt: f32) -> bool;

    /// End and present the current frame. `false` indicates a transient
    /// failure, handled the same way as `begin_frame`.
    fn end_frame(&mut self, dt: f32) -> bool;

    /// Begin recording a render pass against the given attachments.
    fn begin_render_pass(&mut self, pass: BackendId, targets: &[BackendId]);

    /// End the render pass started by the last `begin_render_pass`.
    fn end_render_pass(&mut self);

    /// Bind a pipeline-state object for subsequent draws.
    fn bind_render_state(&mut self, state: BackendId);

    /// Bind a material's resources against the currently-bound render
    /// state.
    fn bind_material(&mut self, material: BackendId, state: BackendId);

    /// Bind a mesh's vertex/index buffers. Returns `false` if the mesh
    /// isn't GPU-ready yet (still loading); the caller must skip the draw.
    fn bind_mesh(&mut self, mesh: MeshBuffers) -> bool;

    /// Push small per-draw data (e.g. an object's transform).
    fn push_constants(&mut self, stage: ShaderStage, data: &[u8]);

    /// Issue an indexed draw call.
    fn draw_indexed(
        &mut self,
        index_count: u32,
        index_offset: u32,
        vertex_offset: i32,
        instance_count: u32,
        first_instance: u32,
    );

    /// Create a backend render pass object for `config` with attachment
    /// transitions determined by `position` (§4.3).
    fn create_render_pass(
        &mut self,
        config: &RenderPassConfig,
        position: PassPosition,
    ) -> Result<BackendId, BackendFatal>;

    /// Destroy a previously-created render pass.
    fn release_render_pass(&mut self, pass: BackendId);

    /// Create a backend render target (image + view) for `config`.
    fn create_render_target(
        &mut self,
        config: &RenderTargetConfig,
    ) -> Result<BackendId, BackendFatal>;

    /// Destroy a previously-created render target.
    fn release_render_target(&mut self, target: BackendId);

    /// Build a pipeline-state object for `config`, bound against `pass`,
    /// using `attributes` as the vertex attribute layout (§4.4).
    fn create_render_state(
        &mut self,
        config: &RenderStateConfig,
        attributes: &[VertexAttribute],
        pass: BackendId,
    ) -> Result<BackendId, BackendFatal>;

    /// Destroy a previously-created render state.
    fn release_render_state(&mut self, state: BackendId);

    /// Upload mesh data, returning the buffers backing it.
    fn upload_mesh(&mut self, data: &MeshData) -> Result<MeshBuffers, BackendFatal>;

    /// Release a previously-uploaded mesh's buffers.
    fn release_mesh(&mut self, buffers: MeshBuffers);

    /// Upload a decoded texture, returning the backing image.
    fn upload_texture(&mut self, def: &TextureDefinition) -> Result<BackendId, BackendFatal>;

    /// Release a previously-uploaded texture's image.
    fn release_texture(&mut self, image: BackendId);

    /// The swapchain image handle for the current frame.
    fn get_current_color_render_target(&self) -> BackendId;

    /// The depth buffer handle for the current frame.
    fn get_depth_render_target(&self) -> BackendId;
}
