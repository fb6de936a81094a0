//! Error types (§7 of the spec).
//!
//! Leaf errors are typed `thiserror` enums, as in the teacher's own
//! `error.rs`; call sites that cross module boundaries compose them with
//! `anyhow::Context` instead of growing ad-hoc enums of their own.

use thiserror::Error;

/// Indicates a handle was stale or never allocated. Always recoverable
/// locally by the caller (fallback resource or `None`).
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("handle is invalid (stale or never allocated)")]
pub struct HandleInvalid;

/// An asset lookup by name found nothing registered or resolvable.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("resource not found: {0}")]
pub struct ResourceNotFound(pub String);

/// A disk job's decode step failed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("resource corrupt: {0}")]
pub struct ResourceCorrupt(pub String);

/// A slot table had no free slots left.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("slot table capacity exhausted")]
pub struct CapacityExhausted;

/// A transient RHI condition (e.g. swapchain out of date). The frame should
/// be skipped; the next frame will retry, typically after a resize.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("backend transient failure: {0}")]
pub struct BackendTransient(pub String);

/// A fatal RHI condition (device lost, OOM). Not recoverable locally; must
/// propagate to the application shell.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("backend fatal failure: {0}")]
pub struct BackendFatal(pub String);

/// Frame-level render graph configuration errors (§4.7).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("render graph has a dependency cycle")]
    Cycle,

    #[error("virtual resource `{0}` is read but never written by any pass")]
    MissingProducer(String),
}

/// The outcome of a background job, carried on its [`crate::loader::SyncPoint`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("job failed: {0}")]
pub struct JobFailed(pub String);

/// Errors a [`crate::resources`] system surfaces while resolving a handle.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResourceError {
    #[error(transparent)]
    Invalid(#[from] HandleInvalid),

    #[error(transparent)]
    NotFound(#[from] ResourceNotFound),

    #[error(transparent)]
    Corrupt(#[from] ResourceCorrupt),

    #[error(transparent)]
    CapacityExhausted(#[from] CapacityExhausted),
}

pub fn full_error_display(err: &anyhow::Error) -> String {
    let cont = err
        .chain()
        .skip(1)
        .map(|cause| format!("    caused by: {}", cause))
        .collect::<Vec<String>>()
        .join("\n");

    format!("Error: {}\n{}", err, cont)
}
