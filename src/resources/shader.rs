//! Shader resources. No compilation happens here: bytecode arrives
//! pre-compiled from the host application (shader compilation is out of
//! scope, mirroring the teacher's decision to link `shaderc` only in the
//! render crate this core has no equivalent of).

use std::collections::HashMap;
use std::sync::Arc;

use crate::handle::SlotTable;
use crate::ids::ShaderHandle;
use crate::types::ShaderStage;

#[derive(Debug, Clone)]
pub struct Shader {
    pub name: String,
    pub stage: ShaderStage,
    pub entry_point: String,
    pub bytecode: Arc<[u8]>,
}

/// Owns every live [`Shader`] behind a slot table, deduplicating by name.
pub struct ShaderSystem {
    slots: SlotTable<Shader>,
    by_name: std::sync::Mutex<HashMap<String, ShaderHandle>>,
}

impl ShaderSystem {
    pub fn new(capacity: usize) -> Self {
        ShaderSystem {
            slots: SlotTable::new(capacity),
            by_name: std::sync::Mutex::new(HashMap::new()),
        }
    }

    /// Register a pre-compiled shader, or return the existing handle if one
    /// with this name is already loaded.
    pub fn get_handle_for(
        &self,
        name: &str,
        stage: ShaderStage,
        entry_point: &str,
        bytecode: Arc<[u8]>,
    ) -> ShaderHandle {
        let mut by_name = self.by_name.lock().unwrap();
        if let Some(existing) = by_name.get(name).copied() {
            if self.slots.is_valid(existing.retag()) {
                return existing;
            }
            by_name.remove(name);
        }

        let handle = self
            .slots
            .allocate(Shader {
                name: name.to_string(),
                stage,
                entry_point: entry_point.to_string(),
                bytecode,
            })
            .retag();
        by_name.insert(name.to_string(), handle);
        handle
    }

    pub fn get_pointer_for(&self, handle: ShaderHandle) -> Option<impl std::ops::Deref<Target = Shader> + '_> {
        self.slots.get(handle.retag())
    }

    pub fn release(&self, handle: ShaderHandle) -> bool {
        self.slots.release(handle.retag())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registering_same_name_twice_reuses_handle() {
        let system = ShaderSystem::new(4);
        let bytecode: Arc<[u8]> = Arc::from(vec![1, 2, 3]);
        let h1 = system.get_handle_for("unlit.vert", ShaderStage::Vertex, "main", bytecode.clone());
        let h2 = system.get_handle_for("unlit.vert", ShaderStage::Vertex, "main", bytecode);
        assert_eq!(h1, h2);
    }

    #[test]
    fn infers_stage_from_suffix() {
        assert_eq!(ShaderStage::infer_from_suffix("vert"), Some(ShaderStage::Vertex));
        assert_eq!(ShaderStage::infer_from_suffix("frag"), Some(ShaderStage::Pixel));
        assert_eq!(ShaderStage::infer_from_suffix("unknown"), None);
    }
}
