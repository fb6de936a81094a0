//! Counting completion objects jobs signal on exit (§4.5, §5 of the spec).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::JobFailed;

struct Inner {
    remaining: AtomicUsize,
    failure: Mutex<Option<JobFailed>>,
}

/// A lock-free-readable counting sync point. Cloning shares the same
/// underlying counter (it's a thin `Arc` wrapper), which is how a disk job
/// running on a worker thread and the main-thread poll loop observe the
/// same completion state.
#[derive(Clone)]
pub struct SyncPoint(Arc<Inner>);

impl SyncPoint {
    /// Create a new sync point that becomes signaled once it has been
    /// decremented `count` times.
    pub fn new(count: usize) -> Self {
        SyncPoint(Arc::new(Inner {
            remaining: AtomicUsize::new(count),
            failure: Mutex::new(None),
        }))
    }

    /// Cheap, lock-free check for whether the count has reached zero.
    pub fn signaled(&self) -> bool {
        self.0.remaining.load(Ordering::Acquire) == 0
    }

    /// The failure recorded by the last job that decremented this sync
    /// point with an error, if any.
    pub fn status(&self) -> Option<JobFailed> {
        self.0.failure.lock().unwrap().clone()
    }

    /// Decrement the count after a job completed successfully.
    pub fn signal(&self) {
        self.0.remaining.fetch_sub(1, Ordering::AcqRel);
    }

    /// Decrement the count after a job failed, recording the reason so
    /// `status()` observes it.
    pub fn signal_failed(&self, reason: JobFailed) {
        *self.0.failure.lock().unwrap() = Some(reason);
        self.0.remaining.fetch_sub(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signals_once_count_reaches_zero() {
        let sp = SyncPoint::new(2);
        assert!(!sp.signaled());
        sp.signal();
        assert!(!sp.signaled());
        sp.signal();
        assert!(sp.signaled());
        assert!(sp.status().is_none());
    }

    #[test]
    fn records_failure_status() {
        let sp = SyncPoint::new(1);
        sp.signal_failed(JobFailed("disk read failed".into()));
        assert!(sp.signaled());
        assert_eq!(sp.status().unwrap().0, "disk read failed");
    }
}
