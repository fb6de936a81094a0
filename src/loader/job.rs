//! The disk-job worker pool (§4.5, §5).
//!
//! A fixed number of worker threads consume jobs from a shared priority
//! queue; ties within a priority are broken FIFO. Grounded on the teacher's
//! `TextureRepo` background loader thread (`texture/repo.rs`), generalised
//! from one dedicated thread pulling off an `mpsc::channel` to a pool of `n`
//! threads pulling off a priority queue guarded by a `Condvar`.

use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

/// Relative urgency of a disk job. Higher priority jobs run first; jobs of
/// equal priority run in submission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    Low,
    Normal,
    High,
}

type JobFn = Box<dyn FnOnce() + Send + 'static>;

struct QueuedJob {
    priority: Priority,
    seq: u64,
    job: JobFn,
}

impl PartialEq for QueuedJob {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}
impl Eq for QueuedJob {}

impl PartialOrd for QueuedJob {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedJob {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        // BinaryHeap is a max-heap: higher priority, and within a priority
        // the earlier-submitted job (lower seq), should sort greater.
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

struct Shared {
    queue: Mutex<BinaryHeap<QueuedJob>>,
    condvar: Condvar,
    shutdown: Mutex<bool>,
    next_seq: Mutex<u64>,
}

/// A pool of worker threads draining a shared priority queue of disk jobs.
///
/// Constructed with `new(n)` for real background execution, or
/// `new_inline()` for tests that want `submit` to run the job synchronously
/// on the calling thread, making load completion deterministic without
/// needing to poll.
pub struct WorkerPool {
    shared: Arc<Shared>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    inline: bool,
}

impl WorkerPool {
    pub fn new(num_threads: usize) -> Self {
        let shared = Arc::new(Shared {
            queue: Mutex::new(BinaryHeap::new()),
            condvar: Condvar::new(),
            shutdown: Mutex::new(false),
            next_seq: Mutex::new(0),
        });

        let mut handles = Vec::with_capacity(num_threads);
        for _ in 0..num_threads.max(1) {
            let shared = shared.clone();
            handles.push(thread::spawn(move || worker_loop(shared)));
        }

        WorkerPool {
            shared,
            handles: Mutex::new(handles),
            inline: false,
        }
    }

    /// A pool with no background threads: `submit` runs the job immediately
    /// on the caller's thread. Used by tests that need deterministic load
    /// completion.
    pub fn new_inline() -> Self {
        WorkerPool {
            shared: Arc::new(Shared {
                queue: Mutex::new(BinaryHeap::new()),
                condvar: Condvar::new(),
                shutdown: Mutex::new(false),
                next_seq: Mutex::new(0),
            }),
            handles: Mutex::new(Vec::new()),
            inline: true,
        }
    }

    pub fn submit(&self, priority: Priority, job: impl FnOnce() + Send + 'static) {
        if self.inline {
            job();
            return;
        }
        let mut next_seq = self.shared.next_seq.lock().unwrap();
        let seq = *next_seq;
        *next_seq += 1;
        drop(next_seq);

        let mut queue = self.shared.queue.lock().unwrap();
        queue.push(QueuedJob {
            priority,
            seq,
            job: Box::new(job),
        });
        drop(queue);
        self.shared.condvar.notify_one();
    }

    pub fn shutdown(&self) {
        *self.shared.shutdown.lock().unwrap() = true;
        self.shared.condvar.notify_all();
        let mut handles = self.handles.lock().unwrap();
        for handle in handles.drain(..) {
            let _ = handle.join();
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(shared: Arc<Shared>) {
    loop {
        let mut queue = shared.queue.lock().unwrap();
        loop {
            if let Some(job) = queue.pop() {
                drop(queue);
                (job.job)();
                break;
            }
            // Queue drained: only exit once shutdown is requested, so every
            // job submitted before shutdown() still runs.
            if *shared.shutdown.lock().unwrap() {
                return;
            }
            queue = shared.condvar.wait(queue).unwrap();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn runs_jobs_in_priority_then_fifo_order() {
        let pool = WorkerPool::new(1);

        // Block the single worker on a gate job so every other submission
        // below lands in the queue before any of them can run, making the
        // drain order deterministic.
        let (gate_tx, gate_rx) = mpsc::channel::<()>();
        let (ready_tx, ready_rx) = mpsc::channel::<()>();
        pool.submit(Priority::Low, move || {
            ready_tx.send(()).unwrap();
            gate_rx.recv().unwrap();
        });
        ready_rx.recv().unwrap();

        let (tx, rx) = mpsc::channel();
        let tx1 = tx.clone();
        pool.submit(Priority::Low, move || tx1.send("low").unwrap());
        let tx2 = tx.clone();
        pool.submit(Priority::High, move || tx2.send("high").unwrap());
        let tx3 = tx.clone();
        pool.submit(Priority::Normal, move || tx3.send("normal-a").unwrap());
        let tx4 = tx;
        pool.submit(Priority::Normal, move || tx4.send("normal-b").unwrap());

        gate_tx.send(()).unwrap();
        pool.shutdown();
        let order: Vec<_> = rx.try_iter().collect();
        assert_eq!(order, vec!["high", "normal-a", "normal-b", "low"]);
    }

    #[test]
    fn inline_pool_runs_synchronously() {
        let pool = WorkerPool::new_inline();
        let (tx, rx) = mpsc::channel();
        pool.submit(Priority::Normal, move || tx.send(()).unwrap());
        assert!(rx.try_recv().is_ok());
    }
}
