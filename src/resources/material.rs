//! Materials and the material template registry (§4.2).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::handle::SlotTable;
use crate::ids::MaterialHandle;
use crate::resources::texture::{TextureResolver, TextureSystem};
use crate::types::{MaterialClass, ResourceBinding, TextureUse, Vector4};

#[derive(Debug, Clone)]
pub struct TextureRef {
    pub name: String,
    pub texture_use: TextureUse,
}

#[derive(Debug, Clone)]
pub struct MaterialTemplate {
    pub name: String,
    pub class: MaterialClass,
    pub diffuse_color: Vector4,
    pub resource_bindings: Vec<ResourceBinding>,
    pub texture_refs: Vec<TextureRef>,
}

pub struct Material {
    pub uuid: u64,
    pub template: Arc<MaterialTemplate>,
    pub diffuse_texture: crate::ids::TextureHandle,
    pub specular_texture: crate::ids::TextureHandle,
    pub normal_texture: crate::ids::TextureHandle,
    pub backend_binding_group: Option<crate::rhi::BackendId>,
}

/// Owns the [`MaterialTemplate`] registry and every instantiated
/// [`Material`].
pub struct MaterialSystem {
    templates: Mutex<HashMap<String, Arc<MaterialTemplate>>>,
    slots: SlotTable<Material>,
    by_name: Mutex<HashMap<String, MaterialHandle>>,
    next_uuid: AtomicU64,
}

impl MaterialSystem {
    pub fn new(capacity: usize) -> Self {
        MaterialSystem {
            templates: Mutex::new(HashMap::new()),
            slots: SlotTable::new(capacity),
            by_name: Mutex::new(HashMap::new()),
            next_uuid: AtomicU64::new(1),
        }
    }

    pub fn register_template(&self, name: &str, template: MaterialTemplate) {
        self.templates
            .lock()
            .unwrap()
            .insert(name.to_string(), Arc::new(template));
    }

    /// Instantiate a material from a registered template, resolving its
    /// texture references through `textures`. A missing or empty reference
    /// falls back to `textures`' invalid/default handle (§4.2).
    pub fn get_handle_for(
        &self,
        name: &str,
        textures: &TextureSystem,
        resolver: Arc<dyn TextureResolver>,
    ) -> Option<MaterialHandle> {
        let mut by_name = self.by_name.lock().unwrap();
        if let Some(existing) = by_name.get(name).copied() {
            if self.slots.is_valid(existing.retag()) {
                return Some(existing);
            }
            by_name.remove(name);
        }

        let template = self.templates.lock().unwrap().get(name)?.clone();

        let texture_for_use = |use_: TextureUse| -> crate::ids::TextureHandle {
            match template.texture_refs.iter().find(|r| r.texture_use == use_) {
                Some(reference) => textures.get_handle_for(&reference.name, use_, resolver.clone()),
                None => crate::handle::Handle::invalid(),
            }
        };
        let diffuse_texture = texture_for_use(TextureUse::Diffuse);
        let specular_texture = texture_for_use(TextureUse::Specular);
        let normal_texture = texture_for_use(TextureUse::Normal);

        let material = Material {
            uuid: self.next_uuid.fetch_add(1, Ordering::Relaxed),
            template,
            diffuse_texture,
            specular_texture,
            normal_texture,
            backend_binding_group: None,
        };

        let handle: MaterialHandle = self.slots.allocate(material).retag();
        by_name.insert(name.to_string(), handle);
        Some(handle)
    }

    pub fn get_pointer_for(&self, handle: MaterialHandle) -> Option<impl std::ops::Deref<Target = Material> + '_> {
        self.slots.get(handle.retag())
    }

    pub fn release(&self, handle: MaterialHandle) -> bool {
        self.slots.release(handle.retag())
    }
}
