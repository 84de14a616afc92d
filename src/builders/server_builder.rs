//! Wires a [`ServerConfig`] and a set of registered task handlers into a
//! running [`JobServer`]: the work queue, worker pool, job registry,
//! metrics aggregator, and dispatcher all share the same `Arc`s.
//!
//! Grounded on the teacher's `builders/pool_builder.rs`: a builder function
//! that takes validated configuration plus caller-supplied factories
//! (there, queue/mailbox/executor factories; here, task handler
//! registrations) and assembles the wired object graph in one place.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::ServerConfig;
use crate::core::{
    Dispatcher, ExecutionPolicy, HandlerTable, JobRegistry, MetricsRegistry, PoolGauges,
    RegisteredHandler, WorkerPool, WorkQueue,
};

/// The fully wired runtime: queue, workers, registry, metrics, and
/// dispatcher, ready to be driven by a transport layer.
pub struct JobServer {
    /// Validated configuration this server was built from.
    pub config: ServerConfig,
    /// Shared bounded work queue.
    pub queue: Arc<WorkQueue>,
    /// OS-thread worker pool draining `queue`.
    pub workers: WorkerPool,
    /// Async job registry backing `jobs/*` routes.
    pub registry: Arc<JobRegistry>,
    /// Request/latency metrics aggregator.
    pub metrics: Arc<MetricsRegistry>,
    /// Routes requests to handlers, inline or via the queue.
    pub dispatcher: Arc<Dispatcher>,
}

impl JobServer {
    /// Point-in-time status snapshot combining queue, worker, and metrics
    /// state, as served by `/status`.
    #[must_use]
    pub fn metrics_snapshot(&self) -> crate::core::metrics::MetricsSnapshot {
        let worker_stats = self.workers.stats();
        self.metrics.snapshot(PoolGauges {
            queue_size: self.queue.size(),
            queue_capacity: self.queue.capacity(),
            workers_busy: worker_stats.busy_workers,
            workers_total: worker_stats.total_workers,
        })
    }

    /// Shut down the worker pool, letting in-flight tasks drain up to the
    /// configured grace period before forcibly joining.
    pub fn shutdown(&mut self) {
        self.queue.shutdown();
        std::thread::sleep(self.config.shutdown_grace());
        self.workers.stop();
    }
}

/// Accumulates task-handler registrations, then builds a [`JobServer`] from
/// a validated [`ServerConfig`].
#[derive(Default)]
pub struct ServerBuilder {
    handlers: HandlerTable,
}

impl ServerBuilder {
    /// Start with an empty handler table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: HandlerTable::new(),
        }
    }

    /// Register a task handler. `policy` decides whether calls to this
    /// task name run inline or go through the shared queue.
    #[must_use]
    pub fn register(
        mut self,
        task_name: impl Into<String>,
        required_params: Vec<&'static str>,
        policy: ExecutionPolicy,
        run: impl Fn(&HashMap<String, String>) -> Result<String, String> + Send + Sync + 'static,
    ) -> Self {
        self.handlers
            .register(task_name, RegisteredHandler::new(required_params, policy, run));
        self
    }

    /// Validate `config`, then construct the queue, worker pool, job
    /// registry, metrics aggregator, and dispatcher, starting the worker
    /// threads immediately.
    pub fn build(self, config: ServerConfig) -> Result<JobServer, String> {
        config.validate()?;

        let queue = Arc::new(WorkQueue::new(config.queue_capacity));
        let registry = Arc::new(match &config.job_persistence_dir {
            Some(dir) => JobRegistry::with_persistence(dir),
            None => JobRegistry::new(),
        });
        let metrics = Arc::new(MetricsRegistry::new());
        let handlers = Arc::new(Mutex::new(self.handlers));

        let dispatcher = Arc::new(Dispatcher::new(
            Arc::clone(&handlers),
            Arc::clone(&queue),
            Arc::clone(&registry),
            Arc::clone(&metrics),
        ));

        let worker_handler = dispatcher.worker_handler();
        let workers = WorkerPool::start(config.worker_count, Arc::clone(&queue), worker_handler);

        Ok(JobServer {
            config,
            queue,
            workers,
            registry,
            metrics,
            dispatcher,
        })
    }
}
