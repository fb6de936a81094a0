//! The pass renderer contract and the per-pass setup recorder (§4.6, §4.8).

use crate::resources::render_pass::RenderPassConfig;
use crate::resources::render_state::RenderStateCache;
use crate::rhi::{BackendId, Rhi};
use crate::types::{FrameData, ResourceAccess, WELL_KNOWN_VIEWPORT_COLOR, WELL_KNOWN_VIEWPORT_DEPTH};

/// Implemented once per distinct kind of pass (forward opaque, shadow,
/// post-process, ...). Grounded on the teacher's `IPassRenderer` shape
/// (`Setup`/`Execute`/`GetRenderPassConfig`/`GetName`) from
/// `PassRenderers.hpp`.
pub trait PassRenderer: Send {
    /// Declare this pass's reads/writes against named virtual resources.
    fn setup(&self, recorder: &mut PassRecorder);

    /// Record draw calls for this pass.
    fn execute(&self, ctx: &mut RenderContext);

    /// The render pass configuration this pass renders into.
    fn render_pass_config(&self) -> RenderPassConfig;

    fn name(&self) -> &str;
}

/// Threaded through a pass's `execute` call. Component F of §9: a pass
/// renderer resolves its render state via
/// `render_states.get_or_create((class, pass_type, vertex_format),
/// ctx.current_pass_backend, ctx.current_pass_signature, ctx.rhi)` and then
/// `ctx.rhi.bind_render_state(...)` before issuing draws.
pub struct RenderContext<'a> {
    pub rhi: &'a mut dyn Rhi,
    pub frame_data: FrameData,
    pub render_states: &'a RenderStateCache,
    pub current_pass_handle: crate::ids::RenderPassHandle,
    pub current_pass_backend: BackendId,
    pub current_pass_signature: crate::resources::render_pass::RenderPassSignature,
}

/// Scoped recorder a pass's `setup` declares its resource accesses
/// against. One recorder per pass, discarded once `setup` returns.
#[derive(Default)]
pub struct PassRecorder {
    pub(crate) accesses: Vec<(String, ResourceAccess)>,
}

impl PassRecorder {
    pub fn reads_from(&mut self, name: &str) {
        self.accesses.push((name.to_string(), ResourceAccess::Read));
    }

    pub fn writes_to(&mut self, name: &str) {
        self.accesses.push((name.to_string(), ResourceAccess::Write));
    }

    pub fn reads_from_color_buffer(&mut self) {
        self.reads_from(WELL_KNOWN_VIEWPORT_COLOR);
    }

    pub fn writes_to_color_buffer(&mut self) {
        self.writes_to(WELL_KNOWN_VIEWPORT_COLOR);
    }

    pub fn reads_from_depth_buffer(&mut self) {
        self.reads_from(WELL_KNOWN_VIEWPORT_DEPTH);
    }

    pub fn writes_to_depth_buffer(&mut self) {
        self.writes_to(WELL_KNOWN_VIEWPORT_DEPTH);
    }
}
