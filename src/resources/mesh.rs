//! Mesh resources, including the async load pipeline (§4.2, §4.5).

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use crate::error::{BackendFatal, JobFailed};
use crate::handle::SlotTable;
use crate::ids::{MaterialHandle, MeshHandle};
use crate::loader::{CompletionStore, Priority, SyncPoint, WorkerPool};
use crate::rhi::{BackendId, MeshBuffers, Rhi};
use crate::types::{Vector2, Vector3, Vector4};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: Vector3,
    pub normal: Vector3,
    pub uv0: Vector2,
    /// `w` is handedness, `+1` or `-1`.
    pub tangent: Vector4,
}

/// The vertex/index data a mesh owns. `generation` increments on every
/// mutation so [`MeshSystem::bind_mesh`] can detect stale GPU buffers.
#[derive(Debug, Clone)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub generation: u64,
}

/// A named sub-range of a [`MeshData`], bound to one material.
#[derive(Debug, Clone)]
pub struct SubMesh {
    pub name: String,
    pub material_handle: MaterialHandle,
    pub index_offset: u32,
    pub index_count: u32,
    pub vertex_offset: u32,
    pub vertex_count: u32,
}

impl SubMesh {
    /// Valid iff both ranges lie within `mesh_data` and every index in the
    /// index range resolves into the vertex range (§3).
    pub fn is_valid(&self, mesh_data: &MeshData) -> bool {
        let index_end = self.index_offset as usize + self.index_count as usize;
        let vertex_end = self.vertex_offset as usize + self.vertex_count as usize;
        if index_end > mesh_data.indices.len() || vertex_end > mesh_data.vertices.len() {
            return false;
        }
        mesh_data.indices[self.index_offset as usize..index_end]
            .iter()
            .all(|&i| (self.vertex_offset..self.vertex_offset + self.vertex_count).contains(&i))
    }
}

/// Decodes a named asset into mesh data and its submesh table. Implemented
/// by the host application; mesh import is out of scope here.
pub trait MeshResolver: Send + Sync {
    fn resolve(&self, name: &str) -> Result<(MeshData, Vec<SubMesh>), String>;
}

/// A unit cube (24 vertices, one normal/uv pair per face corner so edges
/// don't share a smoothed normal), used as the error mesh's geometry so a
/// failed load still draws something recognizable. Grounded on the
/// original `MeshSystem::CreateCube`.
fn unit_cube_data() -> MeshData {
    let h = 0.5;
    let faces: [(Vector3, [[f32; 3]; 4]); 6] = [
        (Vector3::new(0.0, 0.0, 1.0), [[-h, -h, h], [h, -h, h], [h, h, h], [-h, h, h]]),
        (Vector3::new(0.0, 0.0, -1.0), [[h, -h, -h], [-h, -h, -h], [-h, h, -h], [h, h, -h]]),
        (Vector3::new(1.0, 0.0, 0.0), [[h, -h, h], [h, -h, -h], [h, h, -h], [h, h, h]]),
        (Vector3::new(-1.0, 0.0, 0.0), [[-h, -h, -h], [-h, -h, h], [-h, h, h], [-h, h, -h]]),
        (Vector3::new(0.0, 1.0, 0.0), [[-h, h, h], [h, h, h], [h, h, -h], [-h, h, -h]]),
        (Vector3::new(0.0, -1.0, 0.0), [[-h, -h, -h], [h, -h, -h], [h, -h, h], [-h, -h, h]]),
    ];
    let uvs = [
        Vector2::new(0.0, 0.0),
        Vector2::new(1.0, 0.0),
        Vector2::new(1.0, 1.0),
        Vector2::new(0.0, 1.0),
    ];

    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for (normal, corners) in faces.iter() {
        let base = vertices.len() as u32;
        for (corner, uv) in corners.iter().zip(uvs.iter()) {
            vertices.push(Vertex {
                position: Vector3::new(corner[0], corner[1], corner[2]),
                normal: *normal,
                uv0: *uv,
                tangent: Vector4::new(1.0, 0.0, 0.0, 1.0),
            });
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    MeshData {
        vertices,
        indices,
        generation: 0,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Unloaded,
    Loading,
    Loaded,
    Failed,
}

pub struct Mesh {
    pub name: String,
    pub mesh_data: Arc<RwLock<MeshData>>,
    pub submeshes: Vec<SubMesh>,
    pub backend_vertex_buffer: Option<BackendId>,
    pub backend_index_buffer: Option<BackendId>,
    pub last_uploaded_generation: u64,
    pub load_state: LoadState,
}

struct PendingLoad {
    handle: MeshHandle,
    name: String,
    sync_point: SyncPoint,
}

/// Owns every live [`Mesh`], its name cache, and in-flight loads.
pub struct MeshSystem {
    slots: SlotTable<Mesh>,
    by_name: Mutex<HashMap<String, MeshHandle>>,
    completions: Arc<CompletionStore<(MeshData, Vec<SubMesh>)>>,
    pending: Mutex<Vec<PendingLoad>>,
    pool: Arc<WorkerPool>,
    error_mesh: MeshHandle,
}

impl MeshSystem {
    pub fn new(capacity: usize, pool: Arc<WorkerPool>) -> Self {
        let slots = SlotTable::new(capacity);
        let error_mesh = slots
            .allocate(Mesh {
                name: "__error_mesh".to_string(),
                mesh_data: Arc::new(RwLock::new(unit_cube_data())),
                submeshes: Vec::new(),
                backend_vertex_buffer: None,
                backend_index_buffer: None,
                last_uploaded_generation: 0,
                load_state: LoadState::Loaded,
            })
            .retag();

        MeshSystem {
            slots,
            by_name: Mutex::new(HashMap::new()),
            completions: Arc::new(CompletionStore::new()),
            pending: Mutex::new(Vec::new()),
            pool,
            error_mesh,
        }
    }

    /// Construct a mesh synchronously from in-memory data. Enters `Loaded`
    /// immediately (§3 "Procedural mesh").
    pub fn create_procedural(&self, name: &str, mesh_data: MeshData, submeshes: Vec<SubMesh>) -> MeshHandle {
        let handle: MeshHandle = self
            .slots
            .allocate(Mesh {
                name: name.to_string(),
                mesh_data: Arc::new(RwLock::new(mesh_data)),
                submeshes,
                backend_vertex_buffer: None,
                backend_index_buffer: None,
                last_uploaded_generation: 0,
                load_state: LoadState::Loaded,
            })
            .retag();
        self.by_name.lock().unwrap().insert(name.to_string(), handle);
        handle
    }

    /// Look up a cached handle, or schedule a fresh file-backed load.
    pub fn get_handle_for(&self, name: &str, resolver: Arc<dyn MeshResolver>) -> MeshHandle {
        let mut by_name = self.by_name.lock().unwrap();
        if let Some(existing) = by_name.get(name).copied() {
            if self.slots.is_valid(existing.retag()) {
                return existing;
            }
            by_name.remove(name);
        }

        let handle: MeshHandle = self
            .slots
            .allocate(Mesh {
                name: name.to_string(),
                mesh_data: Arc::new(RwLock::new(MeshData {
                    vertices: Vec::new(),
                    indices: Vec::new(),
                    generation: 0,
                })),
                submeshes: Vec::new(),
                backend_vertex_buffer: None,
                backend_index_buffer: None,
                last_uploaded_generation: 0,
                load_state: LoadState::Loading,
            })
            .retag();
        by_name.insert(name.to_string(), handle);
        drop(by_name);

        let sync_point = SyncPoint::new(1);
        let name_owned = name.to_string();
        let store = self.completions.clone();
        let sp_for_job = sync_point.clone();
        self.pool.submit(Priority::Normal, move || match resolver.resolve(&name_owned) {
            Ok(decoded) => {
                store.put(name_owned, decoded);
                sp_for_job.signal();
            }
            Err(reason) => sp_for_job.signal_failed(JobFailed(reason)),
        });

        self.pending.lock().unwrap().push(PendingLoad {
            handle,
            name: name.to_string(),
            sync_point,
        });

        handle
    }

    /// Mutate a mesh's vertex/index data in place, bumping its generation
    /// so the next `bind_mesh` re-uploads (§3's "Mesh GPU freshness").
    pub fn mutate(&self, handle: MeshHandle, f: impl FnOnce(&mut MeshData)) -> bool {
        match self.slots.get(handle.retag()) {
            Some(mesh) => {
                let mut data = mesh.mesh_data.write().unwrap();
                f(&mut data);
                data.generation += 1;
                true
            }
            None => false,
        }
    }

    /// Drain completed disk jobs into their mesh slots. Does not touch the
    /// RHI: GPU upload happens lazily the next time [`Self::bind_mesh`] is
    /// called for this mesh. Must run on the main thread.
    pub fn process_pending_loads(&self) {
        let mut pending = self.pending.lock().unwrap();
        let mut still_pending = Vec::new();
        for load in pending.drain(..) {
            if !load.sync_point.signaled() {
                still_pending.push(load);
                continue;
            }

            if let Some(failure) = load.sync_point.status() {
                log::warn!("mesh `{}` failed to load: {}", load.name, failure);
                self.slots.get_mut_with(load.handle.retag(), |m| {
                    m.load_state = LoadState::Failed;
                });
                continue;
            }

            match self.completions.take(&load.name) {
                Some((data, submeshes)) => {
                    self.slots.get_mut_with(load.handle.retag(), |m| {
                        *m.mesh_data.write().unwrap() = data;
                        m.submeshes = submeshes;
                        m.load_state = LoadState::Loaded;
                    });
                }
                None => still_pending.push(load),
            }
        }
        *pending = still_pending;
    }

    /// Ensure GPU buffers are current for `handle`'s mesh data, then bind
    /// it. Returns `false` while loading, on upload failure, or if the RHI
    /// reports the mesh isn't bindable yet.
    pub fn bind_mesh(&self, handle: MeshHandle, rhi: &mut dyn Rhi) -> bool {
        let handle = if self.is_loaded(handle) { handle } else if self.is_failed(handle) { self.error_mesh } else { return false };

        let buffers = match self.slots.get_mut_with(handle.retag(), |mesh| -> Result<MeshBuffers, BackendFatal> {
            let generation = mesh.mesh_data.read().unwrap().generation;
            match (mesh.backend_vertex_buffer, mesh.backend_index_buffer) {
                (Some(vertex_buffer), Some(index_buffer)) if mesh.last_uploaded_generation == generation => {
                    Ok(MeshBuffers { vertex_buffer, index_buffer })
                }
                _ => {
                    let data = mesh.mesh_data.read().unwrap();
                    let buffers = rhi.upload_mesh(&data)?;
                    mesh.backend_vertex_buffer = Some(buffers.vertex_buffer);
                    mesh.backend_index_buffer = Some(buffers.index_buffer);
                    mesh.last_uploaded_generation = generation;
                    Ok(buffers)
                }
            }
        }) {
            Some(Ok(buffers)) => buffers,
            _ => return false,
        };

        rhi.bind_mesh(buffers)
    }

    fn is_loaded(&self, handle: MeshHandle) -> bool {
        self.slots
            .get(handle.retag())
            .map(|m| m.load_state == LoadState::Loaded)
            .unwrap_or(false)
    }

    fn is_failed(&self, handle: MeshHandle) -> bool {
        self.slots
            .get(handle.retag())
            .map(|m| m.load_state == LoadState::Failed)
            .unwrap_or(false)
    }

    pub fn get_pointer_for(&self, handle: MeshHandle) -> Option<impl std::ops::Deref<Target = Mesh> + '_> {
        if self.is_failed(handle) {
            return self.slots.get(self.error_mesh.retag());
        }
        match self.slots.get(handle.retag()) {
            Some(mesh) if mesh.load_state == LoadState::Loaded => Some(mesh),
            _ => None,
        }
    }

    pub fn release(&self, handle: MeshHandle) -> bool {
        self.slots.release(handle.retag())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::Handle;
    use crate::rhi::NullRhi;

    fn cube_data() -> MeshData {
        MeshData {
            vertices: vec![
                Vertex {
                    position: Vector3::new(0.0, 0.0, 0.0),
                    normal: Vector3::new(0.0, 1.0, 0.0),
                    uv0: Vector2::new(0.0, 0.0),
                    tangent: Vector4::new(1.0, 0.0, 0.0, 1.0),
                };
                4
            ],
            indices: vec![0, 1, 2, 2, 3, 0],
            generation: 0,
        }
    }

    #[test]
    fn submesh_validity_checks_both_ranges() {
        let data = cube_data();
        let valid = SubMesh {
            name: "all".into(),
            material_handle: Handle::invalid(),
            index_offset: 0,
            index_count: 6,
            vertex_offset: 0,
            vertex_count: 4,
        };
        assert!(valid.is_valid(&data));

        let out_of_range = SubMesh {
            name: "oob".into(),
            material_handle: Handle::invalid(),
            index_offset: 0,
            index_count: 6,
            vertex_offset: 0,
            vertex_count: 2,
        };
        assert!(!out_of_range.is_valid(&data));
    }

    #[test]
    fn procedural_mesh_is_immediately_loaded() {
        let pool = Arc::new(WorkerPool::new_inline());
        let system = MeshSystem::new(8, pool);
        let handle = system.create_procedural("triangle", cube_data(), Vec::new());
        assert!(system.get_pointer_for(handle).is_some());
    }

    #[test]
    fn bind_mesh_reuploads_after_mutation() {
        let pool = Arc::new(WorkerPool::new_inline());
        let system = MeshSystem::new(8, pool);
        let mut rhi = NullRhi::new();
        let handle = system.create_procedural("triangle", cube_data(), Vec::new());

        assert!(system.bind_mesh(handle, &mut rhi));
        let first_gen = system
            .slots
            .get(handle.retag())
            .unwrap()
            .last_uploaded_generation;

        system.mutate(handle, |data| data.vertices.push(data.vertices[0]));
        assert!(system.bind_mesh(handle, &mut rhi));
        let second_gen = system
            .slots
            .get(handle.retag())
            .unwrap()
            .last_uploaded_generation;
        assert_eq!(first_gen, 0);
        assert_eq!(second_gen, 1);
    }

    struct FailingResolver;
    impl MeshResolver for FailingResolver {
        fn resolve(&self, _name: &str) -> Result<(MeshData, Vec<SubMesh>), String> {
            Err("bad format".into())
        }
    }

    #[test]
    fn failed_load_falls_back_to_error_mesh() {
        let pool = Arc::new(WorkerPool::new_inline());
        let system = MeshSystem::new(8, pool);
        let mut rhi = NullRhi::new();
        let handle = system.get_handle_for("broken.mesh", Arc::new(FailingResolver));
        system.process_pending_loads();
        assert!(system.bind_mesh(handle, &mut rhi));
        let pointer = system.get_pointer_for(handle).unwrap();
        assert_eq!(pointer.name, "__error_mesh");
        let data = pointer.mesh_data.read().unwrap();
        assert_eq!(data.vertices.len(), 24);
        assert_eq!(data.indices.len(), 36);
    }
}
