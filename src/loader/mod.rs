//! The async loader (component D, §4.5).
//!
//! Two-stage pipeline: a worker pool runs disk I/O jobs off the main
//! thread; a [`SyncPoint`] hands off completion to a main-thread-only
//! upload job. Resource systems ([`crate::resources::mesh`],
//! [`crate::resources::texture`]) each hold their own
//! [`CompletionStore`] of decoded-but-not-yet-uploaded data and drive the
//! upload half themselves once per frame, since only they hold the
//! `&mut dyn Rhi` needed to actually upload.

mod completion_store;
mod job;
mod sync_point;

pub use completion_store::CompletionStore;
pub use job::{Priority, WorkerPool};
pub use sync_point::SyncPoint;

/// Bundles the shared scheduling primitives every resource system's loader
/// plumbing is built on. Cheap to clone (an `Arc` around the worker pool).
pub struct AsyncLoader {
    pool: std::sync::Arc<WorkerPool>,
}

impl AsyncLoader {
    pub fn new(num_worker_threads: usize) -> Self {
        AsyncLoader {
            pool: std::sync::Arc::new(WorkerPool::new(num_worker_threads)),
        }
    }

    /// A loader whose disk jobs run synchronously at submission time.
    /// Intended for tests that want deterministic, immediate completion.
    pub fn new_inline() -> Self {
        AsyncLoader {
            pool: std::sync::Arc::new(WorkerPool::new_inline()),
        }
    }

    pub fn pool(&self) -> std::sync::Arc<WorkerPool> {
        self.pool.clone()
    }
}
