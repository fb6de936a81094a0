//! The render graph: builder, compiler, executor (§4.6-§4.8).

pub mod builder;
pub mod compiler;
pub mod executor;
pub mod pass;

pub use builder::RenderGraphBuilder;
pub use compiler::{compile, ExecutionPlan, ExecutionStep};
pub use pass::{PassRecorder, PassRenderer, RenderContext};
