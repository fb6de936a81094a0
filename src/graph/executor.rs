//! The render graph executor (§4.8): walks a compiled [`ExecutionPlan`]
//! against the RHI.

use crate::graph::compiler::ExecutionPlan;
use crate::graph::pass::RenderContext;
use crate::resources::render_pass::RenderPassCache;
use crate::resources::render_state::RenderStateCache;
use crate::resources::render_target::RenderTargetSystem;
use crate::rhi::Rhi;
use crate::types::FrameData;

/// Execute every step of `plan` in order: begin its render pass, let the
/// pass renderer record draws (with the render-state cache reachable
/// through [`RenderContext`] for component F's state resolution), end the
/// render pass.
pub fn execute(
    plan: &ExecutionPlan,
    render_pass_cache: &RenderPassCache,
    render_states: &RenderStateCache,
    render_targets: &RenderTargetSystem,
    rhi: &mut dyn Rhi,
    frame_data: FrameData,
) {
    for step in &plan.steps {
        let targets: Vec<_> = step
            .render_targets
            .iter()
            .filter_map(|&handle| render_targets.get(handle).map(|t| t.backend_image))
            .collect();

        let pass_entry = match render_pass_cache.get(step.pass_handle) {
            Some(entry) => entry,
            None => {
                log::warn!("pass `{}` resolved to a stale render pass handle, skipping", step.pass_name);
                continue;
            }
        };
        let backend_pass = pass_entry.backend_pass;
        let signature = pass_entry.signature.clone();
        drop(pass_entry);

        rhi.begin_render_pass(backend_pass, &targets);

        let mut ctx = RenderContext {
            rhi,
            frame_data,
            render_states,
            current_pass_handle: step.pass_handle,
            current_pass_backend: backend_pass,
            current_pass_signature: signature,
        };
        step.renderer.execute(&mut ctx);

        rhi.end_render_pass();
    }
}
