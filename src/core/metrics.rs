//! Metrics aggregator backing the `/status` and `/metrics` routes.
//!
//! Grounded on `server_get_stats`/the `/status` handler in the original
//! `router.c` (connections served, requests ok/error, uptime) and on the
//! original's near-empty `metrics.c` stub, which left the per-command
//! breakdown unimplemented; the `commands` shape and field names here
//! follow spec.md §6 exactly. Counters use `std::sync::atomic` the way
//! the teacher's `resource_pool.rs` counts in-flight work, and per-task
//! timing samples live in a bounded ring buffer under a `parking_lot::
//! Mutex`, matching the "brief critical section" style of the teacher's
//! `ResultStorage`. `queue_size`/`queue_capacity`/`workers` are the same
//! global queue/pool gauges repeated under every command entry: this
//! crate shares one queue and one worker pool across all task names
//! rather than giving each its own (see DESIGN.md).

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use parking_lot::Mutex;
use serde::Serialize;

const SAMPLE_WINDOW: usize = 256;
const US_PER_MS: f64 = 1000.0;

struct MetricsEntryState {
    wait_samples_us: VecDeque<u64>,
    exec_samples_us: VecDeque<u64>,
    count: u64,
    errors: u64,
}

impl MetricsEntryState {
    fn new() -> Self {
        Self {
            wait_samples_us: VecDeque::with_capacity(SAMPLE_WINDOW),
            exec_samples_us: VecDeque::with_capacity(SAMPLE_WINDOW),
            count: 0,
            errors: 0,
        }
    }

    fn record(&mut self, wait_us: u64, exec_us: u64, is_error: bool) {
        push_bounded(&mut self.wait_samples_us, wait_us);
        push_bounded(&mut self.exec_samples_us, exec_us);
        self.count += 1;
        if is_error {
            self.errors += 1;
        }
    }
}

fn push_bounded(buf: &mut VecDeque<u64>, value: u64) {
    if buf.len() == SAMPLE_WINDOW {
        buf.pop_front();
    }
    buf.push_back(value);
}

/// Mean and population standard deviation of a sample set, in
/// milliseconds. `(0.0, 0.0)` when there are no samples.
fn mean_and_stddev_ms(samples_us: &VecDeque<u64>) -> (f64, f64) {
    let n = samples_us.len();
    if n == 0 {
        return (0.0, 0.0);
    }
    let samples_ms: Vec<f64> = samples_us.iter().map(|&v| v as f64 / US_PER_MS).collect();
    let mean = samples_ms.iter().sum::<f64>() / n as f64;
    let variance = samples_ms.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;
    (mean, variance.sqrt())
}

/// Live queue and worker-pool gauges, shared across every command since
/// this crate runs one queue and one worker pool for all task names.
#[derive(Debug, Clone, Copy)]
pub struct PoolGauges {
    /// Tasks currently sitting in the work queue.
    pub queue_size: usize,
    /// Configured queue capacity (`0` meaning unbounded).
    pub queue_capacity: usize,
    /// Workers actively executing a task.
    pub workers_busy: usize,
    /// Total worker threads configured.
    pub workers_total: usize,
}

/// Worker gauges nested under each command entry.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerGauges {
    /// Total worker threads configured.
    pub total: usize,
    /// Workers actively executing a task.
    pub busy: usize,
    /// Workers currently idle.
    pub idle: usize,
}

/// Public, serializable view of one task name's accumulated metrics.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsEntry {
    /// Total completions recorded (success or error) for this task name.
    pub count: u64,
    /// Average queue wait time in milliseconds, over the retained window.
    pub avg_wait_ms: f64,
    /// Population standard deviation of queue wait time, in milliseconds.
    pub stddev_wait_ms: f64,
    /// Average execution time in milliseconds, over the retained window.
    pub avg_exec_ms: f64,
    /// Population standard deviation of execution time, in milliseconds.
    pub stddev_exec_ms: f64,
    /// Tasks currently sitting in the work queue (shared across commands).
    pub queue_size: usize,
    /// Configured queue capacity (`0` meaning unbounded).
    pub queue_capacity: usize,
    /// Worker-pool gauges (shared across commands).
    pub workers: WorkerGauges,
}

/// Full snapshot returned by the `/metrics` route.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Process uptime in seconds.
    pub uptime_seconds: u64,
    /// Requests accepted since startup, across all task names.
    pub total_requests: u64,
    /// Requests that ended in an error outcome.
    pub total_errors: u64,
    /// Per-task-name breakdown, keyed by task/command name.
    pub commands: HashMap<String, MetricsEntry>,
}

/// Aggregates request counts and latency samples, keyed by task name.
pub struct MetricsRegistry {
    start: Instant,
    total_requests: AtomicU64,
    total_errors: AtomicU64,
    by_task: Mutex<HashMap<String, MetricsEntryState>>,
}

impl MetricsRegistry {
    /// Create a fresh registry; `uptime_seconds` in later snapshots is
    /// measured from this call.
    #[must_use]
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            total_requests: AtomicU64::new(0),
            total_errors: AtomicU64::new(0),
            by_task: Mutex::new(HashMap::new()),
        }
    }

    /// Record one completed task's wait and execution time, in
    /// microseconds, under its task name.
    pub fn record(&self, task_name: &str, wait_us: u64, exec_us: u64, is_error: bool) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        if is_error {
            self.total_errors.fetch_add(1, Ordering::Relaxed);
        }
        let mut by_task = self.by_task.lock();
        by_task
            .entry(task_name.to_string())
            .or_insert_with(MetricsEntryState::new)
            .record(wait_us, exec_us, is_error);
    }

    /// Produce a point-in-time snapshot, pulling live queue/worker gauges
    /// from the caller (the registry itself has no reference to either, to
    /// avoid a circular dependency between `core` components).
    #[must_use]
    pub fn snapshot(&self, gauges: PoolGauges) -> MetricsSnapshot {
        let by_task = self.by_task.lock();
        let workers_idle = gauges.workers_total.saturating_sub(gauges.workers_busy);
        let commands = by_task
            .iter()
            .map(|(name, state)| {
                let (avg_wait_ms, stddev_wait_ms) = mean_and_stddev_ms(&state.wait_samples_us);
                let (avg_exec_ms, stddev_exec_ms) = mean_and_stddev_ms(&state.exec_samples_us);
                (
                    name.clone(),
                    MetricsEntry {
                        count: state.count,
                        avg_wait_ms,
                        stddev_wait_ms,
                        avg_exec_ms,
                        stddev_exec_ms,
                        queue_size: gauges.queue_size,
                        queue_capacity: gauges.queue_capacity,
                        workers: WorkerGauges {
                            total: gauges.workers_total,
                            busy: gauges.workers_busy,
                            idle: workers_idle,
                        },
                    },
                )
            })
            .collect();

        MetricsSnapshot {
            uptime_seconds: self.start.elapsed().as_secs(),
            total_requests: self.total_requests.load(Ordering::Relaxed),
            total_errors: self.total_errors.load(Ordering::Relaxed),
            commands,
        }
    }

    /// Average execution time in microseconds over the retained sample
    /// window for one task name (`0.0` if no samples exist yet). Used to
    /// estimate `eta_ms` for `jobs/status`.
    #[must_use]
    pub fn recent_avg_exec_us(&self, task_name: &str) -> f64 {
        let by_task = self.by_task.lock();
        by_task.get(task_name).map_or(0.0, |state| {
            let n = state.exec_samples_us.len();
            if n == 0 {
                0.0
            } else {
                state.exec_samples_us.iter().sum::<u64>() as f64 / n as f64
            }
        })
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gauges(queue_size: usize, workers_busy: usize, workers_total: usize) -> PoolGauges {
        PoolGauges {
            queue_size,
            queue_capacity: 64,
            workers_busy,
            workers_total,
        }
    }

    #[test]
    fn records_accumulate_per_task_name() {
        let metrics = MetricsRegistry::new();
        metrics.record("fibonacci", 100_000, 500_000, false);
        metrics.record("fibonacci", 200_000, 300_000, false);
        metrics.record("fibonacci", 50_000, 900_000, true);

        let snapshot = metrics.snapshot(gauges(0, 0, 4));
        assert_eq!(snapshot.total_requests, 3);
        assert_eq!(snapshot.total_errors, 1);

        let entry = &snapshot.commands["fibonacci"];
        assert_eq!(entry.count, 3);
        assert!((entry.avg_wait_ms - 350.0 / 3.0).abs() < 1e-6);
        assert!(entry.stddev_wait_ms > 0.0);
        assert_eq!(entry.workers.total, 4);
        assert_eq!(entry.workers.idle, 4);
    }

    #[test]
    fn ring_buffer_bounds_the_sample_window() {
        let metrics = MetricsRegistry::new();
        for i in 0..(SAMPLE_WINDOW * 2) {
            metrics.record("loadtest", i as u64, i as u64, false);
        }
        let snapshot = metrics.snapshot(gauges(0, 0, 1));
        let entry = &snapshot.commands["loadtest"];
        assert_eq!(entry.count, (SAMPLE_WINDOW * 2) as u64);
        // average only reflects the last SAMPLE_WINDOW samples (in ms)
        let expected_recent_start = SAMPLE_WINDOW as f64 / US_PER_MS;
        let expected_recent_end = (SAMPLE_WINDOW * 2 - 1) as f64 / US_PER_MS;
        let expected_avg = (expected_recent_start + expected_recent_end) / 2.0;
        assert!((entry.avg_wait_ms - expected_avg).abs() < 0.01);
    }

    #[test]
    fn empty_registry_reports_zeroed_snapshot() {
        let metrics = MetricsRegistry::new();
        let snapshot = metrics.snapshot(gauges(3, 2, 4));
        assert_eq!(snapshot.total_requests, 0);
        assert!(snapshot.commands.is_empty());
    }

    #[test]
    fn recent_avg_exec_us_reports_zero_for_unknown_task() {
        let metrics = MetricsRegistry::new();
        assert_eq!(metrics.recent_avg_exec_us("nope"), 0.0);
        metrics.record("known", 10, 4_000, false);
        assert!((metrics.recent_avg_exec_us("known") - 4_000.0).abs() < 1e-6);
    }
}
