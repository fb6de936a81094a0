//! Render-pass configuration and the render-pass permutation cache (§4.3).
//!
//! Grounded on the teacher's `builders/renderpass.rs` (`AttachmentSpec`/
//! `RenderpassSpec`), generalised from building a concrete gfx-hal render
//! pass to building an RHI-agnostic [`RenderPassConfig`] keyed permutation.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Mutex;

use derive_builder::Builder;

use crate::error::BackendFatal;
use crate::ids::RenderPassHandle;
use crate::rhi::{BackendId, Rhi};
use crate::types::{LoadOp, PassPosition, PixelFormat, RenderPassType, StoreOp};

#[derive(Debug, Clone, Builder)]
#[builder(setter(into))]
pub struct AttachmentConfig {
    pub name: String,
    pub format: PixelFormat,
    #[builder(default = "LoadOp::Clear")]
    pub load_op: LoadOp,
    #[builder(default = "StoreOp::Store")]
    pub store_op: StoreOp,
    #[builder(default)]
    pub clear_color: Option<[f32; 4]>,
    #[builder(default)]
    pub clear_depth: Option<f32>,
    #[builder(default)]
    pub clear_stencil: Option<u32>,
}

impl AttachmentConfig {
    /// Name-based rule wins even for a colorlike format (§4.3, §9).
    pub fn is_depth(&self) -> bool {
        self.name == "depth" || self.format.is_depth_format()
    }
}

/// Only name/format/load_op/store_op participate in equality and hashing:
/// the clear values are draw-time parameters, not part of the permutation
/// key (§4.3).
impl PartialEq for AttachmentConfig {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.format == other.format && self.load_op == other.load_op && self.store_op == other.store_op
    }
}
impl Eq for AttachmentConfig {}

impl Hash for AttachmentConfig {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.format.hash(state);
        self.load_op.hash(state);
        self.store_op.hash(state);
    }
}

#[derive(Debug, Clone, Builder)]
#[builder(setter(into))]
pub struct RenderPassConfig {
    pub name: String,
    pub pass_type: RenderPassType,
    pub attachments: Vec<AttachmentConfig>,
}

impl PartialEq for RenderPassConfig {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.pass_type == other.pass_type && self.attachments == other.attachments
    }
}
impl Eq for RenderPassConfig {}

impl Hash for RenderPassConfig {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.pass_type.hash(state);
        self.attachments.hash(state);
    }
}

/// `{color_formats[], depth_format?}`, derived from a config's attachments
/// and used as part of the render-state cache key (§4.4).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RenderPassSignature {
    pub color_formats: Vec<PixelFormat>,
    pub depth_format: Option<PixelFormat>,
}

impl RenderPassSignature {
    pub fn derive(config: &RenderPassConfig) -> Self {
        let mut color_formats = Vec::new();
        let mut depth_format = None;
        for attachment in &config.attachments {
            if attachment.is_depth() {
                depth_format = Some(attachment.format);
            } else {
                color_formats.push(attachment.format);
            }
        }
        RenderPassSignature {
            color_formats,
            depth_format,
        }
    }
}

pub struct RenderPass {
    pub config: RenderPassConfig,
    pub signature: RenderPassSignature,
    pub position: PassPosition,
    pub backend_pass: BackendId,
}

#[derive(PartialEq, Eq, Hash, Clone)]
struct CacheKey {
    config: RenderPassConfig,
    position: PassPosition,
}

/// The render-pass permutation cache, keyed by `(RenderPassConfig,
/// PassPosition)` (§4.3).
pub struct RenderPassCache {
    entries: Mutex<HashMap<CacheKey, RenderPassHandle>>,
    slots: crate::handle::SlotTable<RenderPass>,
}

impl RenderPassCache {
    pub fn new(capacity: usize) -> Self {
        RenderPassCache {
            entries: Mutex::new(HashMap::new()),
            slots: crate::handle::SlotTable::new(capacity),
        }
    }

    /// Look up or create the render pass for `(config, position)`.
    pub fn get_or_create(
        &self,
        config: RenderPassConfig,
        position: PassPosition,
        rhi: &mut dyn Rhi,
    ) -> Result<RenderPassHandle, BackendFatal> {
        let key = CacheKey {
            config: config.clone(),
            position,
        };

        let mut entries = self.entries.lock().unwrap();
        if let Some(existing) = entries.get(&key).copied() {
            if self.slots.is_valid(existing.retag()) {
                return Ok(existing);
            }
        }

        let signature = RenderPassSignature::derive(&config);
        let backend_pass = rhi.create_render_pass(&config, position)?;
        let handle: RenderPassHandle = self
            .slots
            .allocate(RenderPass {
                config,
                signature,
                position,
                backend_pass,
            })
            .retag();
        entries.insert(key, handle);
        Ok(handle)
    }

    pub fn get(&self, handle: RenderPassHandle) -> Option<impl std::ops::Deref<Target = RenderPass> + '_> {
        self.slots.get(handle.retag())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rhi::NullRhi;

    fn color_attachment(name: &str, format: PixelFormat) -> AttachmentConfig {
        AttachmentConfigBuilder::default()
            .name(name)
            .format(format)
            .build()
            .unwrap()
    }

    #[test]
    fn identical_config_and_position_hit_cache() {
        let cache = RenderPassCache::new(8);
        let mut rhi = NullRhi::new();
        let config = RenderPassConfig {
            name: "forward".into(),
            pass_type: RenderPassType::ForwardOpaque,
            attachments: vec![color_attachment("color", PixelFormat::SwapchainColor)],
        };

        let h1 = cache
            .get_or_create(config.clone(), PassPosition::First, &mut rhi)
            .unwrap();
        let h2 = cache
            .get_or_create(config, PassPosition::First, &mut rhi)
            .unwrap();
        assert_eq!(h1, h2);
    }

    #[test]
    fn different_position_misses_cache() {
        let cache = RenderPassCache::new(8);
        let mut rhi = NullRhi::new();
        let config = RenderPassConfig {
            name: "forward".into(),
            pass_type: RenderPassType::ForwardOpaque,
            attachments: vec![color_attachment("color", PixelFormat::SwapchainColor)],
        };

        let h1 = cache
            .get_or_create(config.clone(), PassPosition::First, &mut rhi)
            .unwrap();
        let h2 = cache
            .get_or_create(config, PassPosition::Last, &mut rhi)
            .unwrap();
        assert_ne!(h1, h2);
    }

    #[test]
    fn name_based_depth_detection_wins_over_format() {
        let attachment = color_attachment("depth", PixelFormat::Rgba8Unorm);
        assert!(attachment.is_depth());
    }

    #[test]
    fn format_based_depth_detection() {
        let attachment = color_attachment("shadow_map", PixelFormat::D32Sfloat);
        assert!(attachment.is_depth());
    }

    #[test]
    fn signature_separates_color_and_depth_formats() {
        let config = RenderPassConfig {
            name: "forward".into(),
            pass_type: RenderPassType::ForwardOpaque,
            attachments: vec![
                color_attachment("color", PixelFormat::SwapchainColor),
                color_attachment("depth", PixelFormat::SwapchainDepth),
            ],
        };
        let signature = RenderPassSignature::derive(&config);
        assert_eq!(signature.color_formats, vec![PixelFormat::SwapchainColor]);
        assert_eq!(signature.depth_format, Some(PixelFormat::SwapchainDepth));
    }
}
