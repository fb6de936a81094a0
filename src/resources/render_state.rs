//! Render-state (pipeline-state object) configuration and the render-state
//! permutation cache (§4.4).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use derive_builder::Builder;

use crate::error::BackendFatal;
use crate::ids::{RenderStateHandle, ShaderHandle};
use crate::resources::render_pass::RenderPassSignature;
use crate::rhi::{BackendId, Rhi};
use crate::types::{MaterialClass, RenderPassType, ResourceBinding, VertexAttribute, VertexFormat};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Builder)]
#[builder(setter(into))]
pub struct RenderStateConfig {
    pub name: String,
    pub material_class: MaterialClass,
    pub pass_type: RenderPassType,
    pub vertex_format: VertexFormat,
    #[builder(default)]
    pub expected_bindings: Vec<ResourceBinding>,
    #[builder(default)]
    pub shader_handles: Vec<ShaderHandle>,
    #[builder(default)]
    pub vertex_attributes: Option<Vec<VertexAttribute>>,
}

pub struct RenderState {
    pub uuid: u64,
    pub name: String,
    pub backend_pipeline: BackendId,
}

#[derive(PartialEq, Eq, Hash, Clone)]
struct CacheKey {
    material_class: MaterialClass,
    pass_type: RenderPassType,
    vertex_format: VertexFormat,
    pass_signature: RenderPassSignature,
}

#[derive(PartialEq, Eq, Hash, Clone)]
struct ConfigKey {
    material_class: MaterialClass,
    pass_type: RenderPassType,
    vertex_format: VertexFormat,
}

/// The render-state permutation cache, keyed by `(material_class,
/// pass_type, vertex_format, pass_signature)` (§4.4).
pub struct RenderStateCache {
    registered: Mutex<HashMap<ConfigKey, RenderStateConfig>>,
    cache: Mutex<HashMap<CacheKey, RenderStateHandle>>,
    slots: crate::handle::SlotTable<RenderState>,
    next_uuid: AtomicU64,
}

impl RenderStateCache {
    pub fn new(capacity: usize) -> Self {
        RenderStateCache {
            registered: Mutex::new(HashMap::new()),
            cache: Mutex::new(HashMap::new()),
            slots: crate::handle::SlotTable::new(capacity),
            next_uuid: AtomicU64::new(1),
        }
    }

    /// Register a config so it can later be matched by
    /// `(material_class, pass_type, vertex_format)` on a cache miss.
    pub fn register_config(&self, config: RenderStateConfig) {
        let key = ConfigKey {
            material_class: config.material_class,
            pass_type: config.pass_type,
            vertex_format: config.vertex_format,
        };
        self.registered.lock().unwrap().insert(key, config);
    }

    /// Look up or build the render state for this permutation. `pass`
    /// is the backend render pass this state will be bound against and
    /// `pass_signature` is that pass's derived attachment signature
    /// (the last component of the cache key). Returns `None` if no config
    /// was registered for `(material_class, pass_type, vertex_format)`
    /// (§4.4).
    pub fn get_or_create(
        &self,
        material_class: MaterialClass,
        pass_type: RenderPassType,
        vertex_format: VertexFormat,
        pass: BackendId,
        pass_signature: RenderPassSignature,
        rhi: &mut dyn Rhi,
    ) -> Result<Option<RenderStateHandle>, BackendFatal> {
        let cache_key = CacheKey {
            material_class,
            pass_type,
            vertex_format,
            pass_signature: pass_signature.clone(),
        };

        let mut cache = self.cache.lock().unwrap();
        if let Some(existing) = cache.get(&cache_key).copied() {
            if self.slots.is_valid(existing.retag()) {
                return Ok(Some(existing));
            }
        }

        let config_key = ConfigKey {
            material_class,
            pass_type,
            vertex_format,
        };
        let registered = self.registered.lock().unwrap();
        let config = match registered.get(&config_key) {
            Some(config) => config.clone(),
            None => return Ok(None),
        };
        drop(registered);

        let attributes = match &config.vertex_attributes {
            Some(attrs) => attrs.clone(),
            None => vertex_format
                .default_attributes()
                .expect("non-Custom vertex format always has default attributes"),
        };

        let backend_pipeline = rhi.create_render_state(&config, &attributes, pass)?;
        let uuid = self.next_uuid.fetch_add(1, Ordering::Relaxed);
        let handle: RenderStateHandle = self
            .slots
            .allocate(RenderState {
                uuid,
                name: config.name.clone(),
                backend_pipeline,
            })
            .retag();
        cache.insert(cache_key, handle);
        Ok(Some(handle))
    }

    pub fn get(&self, handle: RenderStateHandle) -> Option<impl std::ops::Deref<Target = RenderState> + '_> {
        self.slots.get(handle.retag())
    }
}
