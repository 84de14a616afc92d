//! Bounded FIFO work queue with backpressure and cooperative shutdown.
//!
//! Grounded on the teacher's `ResultStorage` pattern in the original
//! `core/worker_pool/native.rs` (a `parking_lot::Mutex` + `parking_lot::Condvar`
//! pair, no polling) rather than `crossbeam_channel`: the wait-budget
//! semantics here (zero / positive / negative) and the exact
//! `total_enqueued`/`total_dequeued`/`total_dropped` bookkeeping need
//! explicit control a channel API doesn't expose, in particular capacity
//! `0` meaning *unbounded* rather than a rendezvous handoff.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use super::error::QueueError;
use super::task::Task;

/// How long `enqueue` should wait for space when the queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitBudget {
    /// Fail immediately if there is no space (wait_budget == 0).
    Try,
    /// Wait up to the given duration (wait_budget > 0).
    After(Duration),
    /// Wait indefinitely until space frees up or the queue shuts down
    /// (wait_budget < 0).
    Forever,
}

/// Snapshot of queue counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueueStats {
    /// Tasks that have completed a successful enqueue.
    pub total_enqueued: u64,
    /// Tasks that have completed a successful dequeue.
    pub total_dequeued: u64,
    /// Tasks rejected because the queue was full within the wait budget.
    pub total_dropped: u64,
}

struct QueueState {
    tasks: VecDeque<Task>,
    capacity: usize,
    shutdown: bool,
    stats: QueueStats,
}

impl QueueState {
    fn is_full(&self) -> bool {
        self.capacity > 0 && self.tasks.len() >= self.capacity
    }
}

/// A first-in-first-out broker of [`Task`]s with optional capacity and
/// cooperative shutdown.
///
/// `capacity == 0` means unbounded: `enqueue` never blocks and never drops.
/// Internals are a single mutex guarding the deque and counters, with two
/// condition variables ("not empty", "not full") signaled on the relevant
/// transitions, matching spec.md §4.1 and §5 exactly.
pub struct WorkQueue {
    state: Mutex<QueueState>,
    not_empty: Condvar,
    not_full: Condvar,
}

impl WorkQueue {
    /// Create a queue with the given capacity (`0` = unbounded).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(QueueState {
                tasks: VecDeque::new(),
                capacity,
                shutdown: false,
                stats: QueueStats::default(),
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
        }
    }

    /// Admit a task, honoring the wait budget and backpressure rules of
    /// spec.md §4.1. On failure, the task is handed back so the caller
    /// never has to worry about a leaked `Task` (DESIGN.md, "ownership of
    /// Task").
    pub fn enqueue(&self, task: Task, wait_budget: WaitBudget) -> Result<(), (Task, QueueError)> {
        let mut guard = self.state.lock();

        if guard.shutdown {
            return Err((task, QueueError::ShuttingDown));
        }

        if guard.is_full() {
            match wait_budget {
                WaitBudget::Try => {
                    guard.stats.total_dropped += 1;
                    return Err((task, QueueError::Full));
                }
                WaitBudget::After(timeout) => {
                    let deadline = Instant::now() + timeout;
                    while guard.is_full() && !guard.shutdown {
                        let remaining = deadline.saturating_duration_since(Instant::now());
                        if remaining.is_zero() {
                            guard.stats.total_dropped += 1;
                            return Err((task, QueueError::Full));
                        }
                        let timed_out = self.not_full.wait_for(&mut guard, remaining).timed_out();
                        if timed_out && guard.is_full() && !guard.shutdown {
                            guard.stats.total_dropped += 1;
                            return Err((task, QueueError::Full));
                        }
                    }
                    if guard.shutdown {
                        return Err((task, QueueError::ShuttingDown));
                    }
                }
                WaitBudget::Forever => {
                    while guard.is_full() && !guard.shutdown {
                        self.not_full.wait(&mut guard);
                    }
                    if guard.shutdown {
                        return Err((task, QueueError::ShuttingDown));
                    }
                }
            }
        }

        let mut task = task;
        task.enqueue_time = Some(Instant::now());
        guard.tasks.push_back(task);
        guard.stats.total_enqueued += 1;
        self.not_empty.notify_one();
        Ok(())
    }

    /// Block until a task is available, the timeout elapses, or shutdown is
    /// observed with an empty queue.
    pub fn dequeue(&self, timeout: Option<Duration>) -> Option<Task> {
        let mut guard = self.state.lock();

        match timeout {
            None => {
                while guard.tasks.is_empty() && !guard.shutdown {
                    self.not_empty.wait(&mut guard);
                }
            }
            Some(timeout) => {
                let deadline = Instant::now() + timeout;
                while guard.tasks.is_empty() && !guard.shutdown {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return None;
                    }
                    self.not_empty.wait_for(&mut guard, remaining);
                }
            }
        }

        let task = guard.tasks.pop_front()?;
        guard.stats.total_dequeued += 1;
        self.not_full.notify_one();
        Some(task)
    }

    /// Set the shutdown flag and wake every blocked producer and consumer.
    /// Idempotent.
    pub fn shutdown(&self) {
        let mut guard = self.state.lock();
        if guard.shutdown {
            return;
        }
        guard.shutdown = true;
        drop(guard);
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    /// `true` once [`Self::shutdown`] has been called.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.state.lock().shutdown
    }

    /// Current number of queued tasks.
    #[must_use]
    pub fn size(&self) -> usize {
        self.state.lock().tasks.len()
    }

    /// `true` if the queue holds no tasks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// `true` if the queue is at capacity (always `false` when unbounded).
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.state.lock().is_full()
    }

    /// The configured capacity (`0` = unbounded).
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.state.lock().capacity
    }

    /// Snapshot of cumulative counters.
    #[must_use]
    pub fn stats(&self) -> QueueStats {
        self.state.lock().stats
    }
}
