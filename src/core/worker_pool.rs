//! OS-thread-per-worker pool draining a [`WorkQueue`].
//!
//! Grounded on the teacher's `core/worker_pool/native.rs` (dedicated OS
//! threads rather than async tasks, so a CPU-bound handler never blocks the
//! rest of the runtime) and the original `worker_pool.c` (busy-worker
//! bookkeeping under a mutex, cooperative shutdown via a flag plus waking
//! the queue). The teacher's per-worker tokio runtime and crossbeam channel
//! are dropped: handlers here are plain synchronous closures dispatched
//! from the queue built in [`super::queue`], so no nested runtime is needed.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, error, info, warn};

use super::queue::WorkQueue;
use super::task::Task;

/// Executes a [`Task`] to completion, delivering its outcome via the task's
/// [`super::task::ReplyTarget`].
///
/// Implementations run on a worker's OS thread; `run` should not hold locks
/// across blocking I/O any longer than the work itself demands. A panic
/// inside `run` is caught by the pool and turned into an error reply rather
/// than taking the worker thread down (see [`WorkerPool`] docs).
pub trait TaskHandler: Send + Sync + 'static {
    /// Run `task` and deliver its result through its reply target.
    fn run(&self, task: Task);

    /// Human-readable name for logging.
    fn name(&self) -> &str {
        "task_handler"
    }
}

impl<F> TaskHandler for F
where
    F: Fn(Task) + Send + Sync + 'static,
{
    fn run(&self, task: Task) {
        self(task);
    }
}

/// Point-in-time worker pool counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkerPoolStats {
    /// Number of worker threads configured.
    pub total_workers: usize,
    /// Number of workers currently executing a task.
    pub busy_workers: usize,
    /// Tasks completed since startup (success or handler error).
    pub completed_tasks: u64,
    /// Tasks that panicked inside the handler.
    pub panicked_tasks: u64,
}

/// A fixed pool of OS threads draining a shared [`WorkQueue`].
///
/// Workers block on `queue.dequeue(..)` (no polling) and exit once the
/// queue reports shutdown and is empty, mirroring the original
/// `worker_thread_fn`'s "shutdown && queue_is_empty" exit condition.
pub struct WorkerPool {
    queue: Arc<WorkQueue>,
    handler: Arc<dyn TaskHandler>,
    threads: Vec<JoinHandle<()>>,
    busy_workers: Arc<AtomicUsize>,
    completed_tasks: Arc<AtomicU64>,
    panicked_tasks: Arc<AtomicU64>,
    total_workers: usize,
}

impl WorkerPool {
    /// Spawn `worker_count` OS threads pulling from `queue` and dispatching
    /// each task to `handler`. Mirrors `worker_pool_start` running
    /// immediately rather than as a separate step, since nothing in this
    /// design needs a pool that exists without its threads running.
    #[must_use]
    pub fn start(
        worker_count: usize,
        queue: Arc<WorkQueue>,
        handler: Arc<dyn TaskHandler>,
    ) -> Self {
        let busy_workers = Arc::new(AtomicUsize::new(0));
        let completed_tasks = Arc::new(AtomicU64::new(0));
        let panicked_tasks = Arc::new(AtomicU64::new(0));

        let mut threads = Vec::with_capacity(worker_count);
        for worker_id in 0..worker_count {
            let queue = Arc::clone(&queue);
            let handler = Arc::clone(&handler);
            let busy_workers = Arc::clone(&busy_workers);
            let completed_tasks = Arc::clone(&completed_tasks);
            let panicked_tasks = Arc::clone(&panicked_tasks);

            let handle = thread::Builder::new()
                .name(format!("jobforge-worker-{worker_id}"))
                .spawn(move || {
                    worker_loop(
                        worker_id,
                        &queue,
                        handler.as_ref(),
                        &busy_workers,
                        &completed_tasks,
                        &panicked_tasks,
                    );
                })
                .expect("failed to spawn worker thread");
            threads.push(handle);
        }

        info!(worker_count, "worker pool started");

        Self {
            queue,
            handler,
            threads,
            busy_workers,
            completed_tasks,
            panicked_tasks,
            total_workers: worker_count,
        }
    }

    /// Signal shutdown to the queue and join every worker thread. Idempotent:
    /// a second call joins an already-empty thread list and returns
    /// immediately.
    pub fn stop(&mut self) {
        self.queue.shutdown();
        for handle in self.threads.drain(..) {
            if let Err(err) = handle.join() {
                error!(?err, "worker thread panicked during join");
            }
        }
        info!("worker pool stopped");
    }

    /// Snapshot of current pool counters.
    #[must_use]
    pub fn stats(&self) -> WorkerPoolStats {
        WorkerPoolStats {
            total_workers: self.total_workers,
            busy_workers: self.busy_workers.load(Ordering::Relaxed),
            completed_tasks: self.completed_tasks.load(Ordering::Relaxed),
            panicked_tasks: self.panicked_tasks.load(Ordering::Relaxed),
        }
    }

    /// The handler this pool dispatches to, for callers that need to share
    /// it with an inline (non-queued) execution path.
    #[must_use]
    pub fn handler(&self) -> Arc<dyn TaskHandler> {
        Arc::clone(&self.handler)
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.stop();
    }
}

fn worker_loop(
    worker_id: usize,
    queue: &WorkQueue,
    handler: &dyn TaskHandler,
    busy_workers: &AtomicUsize,
    completed_tasks: &AtomicU64,
    panicked_tasks: &AtomicU64,
) {
    loop {
        let Some(task) = queue.dequeue(Some(Duration::from_millis(250))) else {
            if queue.is_shutdown() && queue.is_empty() {
                break;
            }
            continue;
        };

        busy_workers.fetch_add(1, Ordering::AcqRel);
        debug!(worker_id, task_name = %task.task_name, "dispatching task");

        let outcome = catch_unwind(AssertUnwindSafe(|| handler.run(task)));

        busy_workers.fetch_sub(1, Ordering::AcqRel);
        completed_tasks.fetch_add(1, Ordering::Relaxed);

        if outcome.is_err() {
            panicked_tasks.fetch_add(1, Ordering::Relaxed);
            warn!(worker_id, "task handler panicked; worker continuing");
        }

        if queue.is_shutdown() && queue.is_empty() {
            break;
        }
    }
}
