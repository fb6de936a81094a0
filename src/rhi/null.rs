//! A deterministic, allocation-only RHI used for tests and host tooling.

use std::sync::atomic::{AtomicU64, Ordering};

use super::{BackendId, MeshBuffers, Rhi};
use crate::error::BackendFatal;
use crate::resources::mesh::MeshData;
use crate::resources::render_pass::RenderPassConfig;
use crate::resources::render_state::RenderStateConfig;
use crate::resources::render_target::RenderTargetConfig;
use crate::resources::texture::TextureDefinition;
use crate::types::{PassPosition, ShaderStage, VertexAttribute};

/// Never fails, never touches a real device; every `create_*` call hands
/// out a fresh [`BackendId`] from an incrementing counter. Tracks just
/// enough state (current pass/render-state) to enforce the bind-before-draw
/// rule from the spec's open questions (§9) and to let tests force
/// transient failures.
pub struct NullRhi {
    next_id: AtomicU64,
    current_pass: Option<BackendId>,
    current_state: Option<BackendId>,
    frame_in_progress: bool,
    fail_next_begin_frame: bool,
    fail_next_end_frame: bool,
    mesh_bind_should_fail: bool,
}

impl Default for NullRhi {
    fn default() -> Self {
        NullRhi {
            next_id: AtomicU64::new(1),
            current_pass: None,
            current_state: None,
            frame_in_progress: false,
            fail_next_begin_frame: false,
            fail_next_end_frame: false,
            mesh_bind_should_fail: false,
        }
    }
}

impl NullRhi {
    pub fn new() -> Self {
        Self::default()
    }

    fn fresh_id(&self) -> BackendId {
        BackendId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Test hook: make the next `begin_frame` report a transient failure.
    pub fn fail_next_begin_frame(&mut self) {
        self.fail_next_begin_frame = true;
    }

    /// Test hook: make the next `end_frame` report a transient failure.
    pub fn fail_next_end_frame(&mut self) {
        self.fail_next_end_frame = true;
    }

    /// Test hook: make `bind_mesh` report "not ready" until reset.
    pub fn set_mesh_bind_should_fail(&mut self, should_fail: bool) {
        self.mesh_bind_should_fail = should_fail;
    }
}

impl Rhi for NullRhi {
    fn resize(&mut self, _width: u32, _height: u32) {}

    fn wait_idle(&mut self) {}

    fn begin_frame(&mut self, _dt: f32) -> bool {
        if self.fail_next_begin_frame {
            self.fail_next_begin_frame = false;
            return false;
        }
        self.frame_in_progress = true;
        true
    }

    fn end_frame(&mut self, _dt: f32) -> bool {
        self.frame_in_progress = false;
        if self.fail_next_end_frame {
            self.fail_next_end_frame = false;
            return false;
        }
        true
    }

    fn begin_render_pass(&mut self, pass: BackendId, _targets: &[BackendId]) {
        debug_assert!(
            self.frame_in_progress,
            "begin_render_pass called outside a frame"
        );
        self.current_pass = Some(pass);
        self.current_state = None;
    }

    fn end_render_pass(&mut self) {
        self.current_pass = None;
        self.current_state = None;
    }

    fn bind_render_state(&mut self, state: BackendId) {
        debug_assert!(
            self.current_pass.is_some(),
            "bind_render_state called outside a render pass"
        );
        self.current_state = Some(state);
    }

    fn bind_material(&mut self, _material: BackendId, _state: BackendId) {
        debug_assert!(
            self.current_state.is_some(),
            "bind_material called before bind_render_state (spec §9 open question)"
        );
    }

    fn bind_mesh(&mut self, _mesh: MeshBuffers) -> bool {
        !self.mesh_bind_should_fail
    }

    fn push_constants(&mut self, _stage: ShaderStage, _data: &[u8]) {
        debug_assert!(
            self.current_state.is_some(),
            "push_constants called before bind_render_state"
        );
    }

    fn draw_indexed(
        &mut self,
        _index_count: u32,
        _index_offset: u32,
        _vertex_offset: i32,
        _instance_count: u32,
        _first_instance: u32,
    ) {
        debug_assert!(
            self.current_state.is_some(),
            "draw_indexed called before bind_render_state (spec §9 open question)"
        );
    }

    fn create_render_pass(
        &mut self,
        _config: &RenderPassConfig,
        _position: PassPosition,
    ) -> Result<BackendId, BackendFatal> {
        Ok(self.fresh_id())
    }

    fn release_render_pass(&mut self, _pass: BackendId) {}

    fn create_render_target(
        &mut self,
        _config: &RenderTargetConfig,
    ) -> Result<BackendId, BackendFatal> {
        Ok(self.fresh_id())
    }

    fn release_render_target(&mut self, _target: BackendId) {}

    fn create_render_state(
        &mut self,
        _config: &RenderStateConfig,
        _attributes: &[VertexAttribute],
        _pass: BackendId,
    ) -> Result<BackendId, BackendFatal> {
        Ok(self.fresh_id())
    }

    fn release_render_state(&mut self, _state: BackendId) {}

    fn upload_mesh(&mut self, _data: &MeshData) -> Result<MeshBuffers, BackendFatal> {
        Ok(MeshBuffers {
            vertex_buffer: self.fresh_id(),
            index_buffer: self.fresh_id(),
        })
    }

    fn release_mesh(&mut self, _buffers: MeshBuffers) {}

    fn upload_texture(&mut self, _def: &TextureDefinition) -> Result<BackendId, BackendFatal> {
        Ok(self.fresh_id())
    }

    fn release_texture(&mut self, _image: BackendId) {}

    fn get_current_color_render_target(&self) -> BackendId {
        BackendId(u64::MAX - 1)
    }

    fn get_depth_render_target(&self) -> BackendId {
        BackendId(u64::MAX - 2)
    }
}
