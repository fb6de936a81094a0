//! Render targets: color/depth/render-texture/storage images the render
//! graph's virtual resources ultimately resolve to (§3).

use crate::error::BackendFatal;
use crate::handle::SlotTable;
use crate::ids::RenderTargetHandle;
use crate::rhi::{BackendId, Rhi};
use crate::types::{PixelFormat, RenderTargetUsage, SizingPolicy};

#[derive(Debug, Clone)]
pub struct RenderTargetConfig {
    pub name: String,
    pub format: PixelFormat,
    pub usage: RenderTargetUsage,
    pub sizing_policy: SizingPolicy,
    /// Pixel width for `Absolute`, fraction of the viewport width (e.g.
    /// `1.0`) for `RelativeToViewport`.
    pub width: f32,
    /// Same convention as `width`.
    pub height: f32,
}

impl RenderTargetConfig {
    /// Resolve this config's width/height against the current viewport
    /// size, per its sizing policy.
    pub fn resolve_size(&self, viewport_width: u32, viewport_height: u32) -> (u32, u32) {
        match self.sizing_policy {
            SizingPolicy::Absolute => (self.width as u32, self.height as u32),
            SizingPolicy::RelativeToViewport => (
                (viewport_width as f32 * self.width) as u32,
                (viewport_height as f32 * self.height) as u32,
            ),
        }
    }
}

pub struct RenderTarget {
    pub config: RenderTargetConfig,
    pub backend_image: BackendId,
    pub backend_view: BackendId,
}

/// Owns every live [`RenderTarget`]. Creation is explicit (not
/// lookup-or-create by name): a render target is either one of the
/// engine's persistent viewport targets or an application-managed
/// render texture, created once and then imported into the graph builder
/// by handle each frame (§4.6).
pub struct RenderTargetSystem {
    slots: SlotTable<RenderTarget>,
}

impl RenderTargetSystem {
    pub fn new(capacity: usize) -> Self {
        RenderTargetSystem {
            slots: SlotTable::new(capacity),
        }
    }

    pub fn create(&self, config: RenderTargetConfig, rhi: &mut dyn Rhi) -> Result<RenderTargetHandle, BackendFatal> {
        let backend_image = rhi.create_render_target(&config)?;
        let handle = self
            .slots
            .allocate(RenderTarget {
                config,
                backend_image,
                backend_view: backend_image,
            })
            .retag();
        Ok(handle)
    }

    pub fn get(&self, handle: RenderTargetHandle) -> Option<impl std::ops::Deref<Target = RenderTarget> + '_> {
        self.slots.get(handle.retag())
    }

    pub fn release(&self, handle: RenderTargetHandle, rhi: &mut dyn Rhi) {
        let backend_image = self.slots.get(handle.retag()).map(|target| target.backend_image);
        if let Some(backend_image) = backend_image {
            rhi.release_render_target(backend_image);
        }
        self.slots.release(handle.retag());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_sizing_scales_with_viewport() {
        let config = RenderTargetConfig {
            name: "half_res".into(),
            format: PixelFormat::Rgba8Unorm,
            usage: RenderTargetUsage::RenderTexture,
            sizing_policy: SizingPolicy::RelativeToViewport,
            width: 0.5,
            height: 0.5,
        };
        assert_eq!(config.resolve_size(1920, 1080), (960, 540));
    }

    #[test]
    fn absolute_sizing_ignores_viewport() {
        let config = RenderTargetConfig {
            name: "shadow_map".into(),
            format: PixelFormat::D32Sfloat,
            usage: RenderTargetUsage::DepthStencil,
            sizing_policy: SizingPolicy::Absolute,
            width: 2048.0,
            height: 2048.0,
        };
        assert_eq!(config.resolve_size(1920, 1080), (2048, 2048));
    }

    #[test]
    fn create_then_release_frees_the_slot() {
        let system = RenderTargetSystem::new(2);
        let mut rhi = crate::rhi::NullRhi::new();
        let config = RenderTargetConfig {
            name: "viewport.color".into(),
            format: PixelFormat::SwapchainColor,
            usage: RenderTargetUsage::Color,
            sizing_policy: SizingPolicy::RelativeToViewport,
            width: 1.0,
            height: 1.0,
        };
        let handle = system.create(config, &mut rhi).unwrap();
        assert!(system.get(handle).is_some());
        system.release(handle, &mut rhi);
        assert!(system.get(handle).is_none());
    }
}
