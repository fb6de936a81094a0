//! The render graph builder (§4.6).
//!
//! Grounded on `RenderGraphBuilder.cpp`'s `ReadsFrom`/`WritesTo` API,
//! reimagined around Rust trait objects instead of the original's raw
//! node pointers.

use std::collections::HashMap;

use crate::graph::pass::{PassRecorder, PassRenderer};
use crate::ids::RenderTargetHandle;
use crate::types::ResourceAccess;

pub(crate) struct PassNode {
    pub name: String,
    pub renderer: Box<dyn PassRenderer>,
    pub accesses: Vec<(String, ResourceAccess)>,
}

/// Accumulates one frame's passes and their declared resource accesses.
/// Built fresh every frame (§4.9); compiling it produces an
/// [`crate::graph::compiler::ExecutionPlan`].
#[derive(Default)]
pub struct RenderGraphBuilder {
    pub(crate) imported: HashMap<String, RenderTargetHandle>,
    pub(crate) passes: Vec<PassNode>,
}

impl RenderGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a persistent external target (e.g. the swapchain color image)
    /// under `name`, so pass declarations against that name resolve to it.
    pub fn import_render_target(&mut self, name: &str, handle: RenderTargetHandle) {
        self.imported.insert(name.to_string(), handle);
    }

    /// Register a pass node, running its setup routine immediately to
    /// capture its resource access declarations.
    pub fn add_pass(&mut self, name: &str, renderer: Box<dyn PassRenderer>) {
        let mut recorder = PassRecorder::default();
        renderer.setup(&mut recorder);
        self.passes.push(PassNode {
            name: name.to_string(),
            renderer,
            accesses: recorder.accesses,
        });
    }

    pub fn pass_count(&self) -> usize {
        self.passes.len()
    }
}
