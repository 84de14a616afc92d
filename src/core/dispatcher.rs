//! Routes a parsed request to a registered task, choosing inline execution
//! or queued submission per the handler's [`ExecutionPolicy`].
//!
//! Grounded on the original `job_executor.c`/`router.c` pair: a flat table
//! mapping a route name to a handler plus its required parameters, and the
//! `/jobs/submit|status|result|cancel` sub-router living alongside the
//! direct `/<task_name>` routes. The teacher's `runtime/api.rs` shows the
//! idiomatic shape for a thin routing layer atop `core` abstractions in
//! this codebase (small enum outcomes instead of raw HTTP types), which
//! this module follows so the `http` layer only has to translate
//! [`DispatchOutcome`] into a response.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::debug;

use super::error::DispatchError;
use super::metrics::MetricsRegistry;
use super::queue::{WaitBudget, WorkQueue};
use super::registry::{JobRecord, JobRegistry};
use super::task::{ReplySink, Task};
use crate::util::{JobId, RequestId};

/// Whether a task name is served synchronously on the calling thread or
/// admitted to the shared work queue for a worker to pick up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionPolicy {
    /// Run inline and reply immediately; never touches the work queue.
    Inline,
    /// Enqueue and let a worker execute it, replying or updating the job
    /// registry once it runs.
    Enqueued {
        /// How long to wait for queue space before failing with
        /// [`DispatchError::Full`].
        wait_budget: WaitBudget,
    },
}

/// A handler registration: the closure that performs the work plus the
/// parameter names it requires, checked before the closure ever runs.
pub struct RegisteredHandler {
    required_params: Vec<&'static str>,
    policy: ExecutionPolicy,
    run: Box<dyn Fn(&HashMap<String, String>) -> Result<String, String> + Send + Sync>,
}

impl RegisteredHandler {
    /// Register a handler under a task name.
    pub fn new(
        required_params: Vec<&'static str>,
        policy: ExecutionPolicy,
        run: impl Fn(&HashMap<String, String>) -> Result<String, String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            required_params,
            policy,
            run: Box::new(run),
        }
    }

    fn check_params(&self, params: &HashMap<String, String>) -> Result<(), DispatchError> {
        for name in &self.required_params {
            if !params.contains_key(*name) {
                return Err(DispatchError::MissingParameter((*name).to_string()));
            }
        }
        Ok(())
    }
}

/// The flat name → handler table, one entry per task name, filled in at
/// startup (see `builders::server_builder`).
#[derive(Default)]
pub struct HandlerTable {
    handlers: HashMap<String, RegisteredHandler>,
}

impl HandlerTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler under `task_name`. Each task name has exactly one
    /// policy, chosen once at registration and applied consistently.
    pub fn register(&mut self, task_name: impl Into<String>, handler: RegisteredHandler) {
        self.handlers.insert(task_name.into(), handler);
    }

    fn get(&self, task_name: &str) -> Option<&RegisteredHandler> {
        self.handlers.get(task_name)
    }
}

/// The outcome of dispatching a request, shaped for the `http` layer to
/// translate into a transport response without needing to know dispatcher
/// internals.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// The task ran inline and produced a result body.
    Completed(String),
    /// The task was admitted to the queue under this job id (async submit).
    Accepted(JobId),
    /// A `jobs/status` lookup result.
    JobStatus(JobRecord),
    /// A `jobs/result` lookup result (only meaningful once terminal).
    JobResult(JobRecord),
    /// A `jobs/cancel` request succeeded.
    Canceled,
}

/// Ties a [`HandlerTable`] to the [`WorkQueue`] and [`JobRegistry`],
/// implementing the routes named in spec.md §6: `<task_name>`,
/// `jobs/submit|status|result|cancel`.
pub struct Dispatcher {
    handlers: Arc<Mutex<HandlerTable>>,
    queue: Arc<WorkQueue>,
    registry: Arc<JobRegistry>,
    metrics: Arc<MetricsRegistry>,
}

impl Dispatcher {
    /// Wire a dispatcher over an existing handler table, queue, registry,
    /// and metrics aggregator (typically constructed once by
    /// `server_builder`).
    #[must_use]
    pub fn new(
        handlers: Arc<Mutex<HandlerTable>>,
        queue: Arc<WorkQueue>,
        registry: Arc<JobRegistry>,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        Self {
            handlers,
            queue,
            registry,
            metrics,
        }
    }

    /// Run or enqueue `task_name` synchronously, replying via `reply` once
    /// the outcome is known (inline: immediately; enqueued: from whichever
    /// worker drains it).
    pub fn dispatch_sync(
        &self,
        request_id: RequestId,
        task_name: &str,
        params: HashMap<String, String>,
        reply: Box<dyn ReplySink>,
    ) -> Result<(), DispatchError> {
        let (policy, required_ok) = {
            let handlers = self.handlers.lock();
            let handler = handlers
                .get(task_name)
                .ok_or_else(|| DispatchError::UnknownRoute(task_name.to_string()))?;
            (handler.policy, handler.check_params(&params))
        };
        required_ok?;

        match policy {
            ExecutionPolicy::Inline => {
                let started = Instant::now();
                let result = self.run_inline(task_name, &params);
                self.metrics
                    .record(task_name, 0, started.elapsed().as_micros() as u64, result.is_err());
                let body = result?;
                reply.success(body);
                Ok(())
            }
            ExecutionPolicy::Enqueued { wait_budget } => {
                let task = Task::new_sync(request_id, task_name, params, reply);
                self.queue
                    .enqueue(task, wait_budget)
                    .map_err(|(_, err)| queue_err_to_dispatch(err))
            }
        }
    }

    /// Handle `jobs/submit`: validate parameters, register a QUEUED job,
    /// then admit the task to the queue bound to that job id.
    pub fn submit_job(
        &self,
        request_id: RequestId,
        task_name: &str,
        params: HashMap<String, String>,
    ) -> Result<JobId, DispatchError> {
        {
            let handlers = self.handlers.lock();
            let handler = handlers
                .get(task_name)
                .ok_or_else(|| DispatchError::UnknownRoute(task_name.to_string()))?;
            handler.check_params(&params)?;
        }

        let job_id = self.registry.submit(task_name, params.clone());
        let task = Task::new_async(request_id, task_name, params, job_id);
        // On a full or shutting-down queue the job stays QUEUED in the
        // registry rather than being reported as failed: the id is still
        // handed back so the caller can retry submission or poll.
        if let Err((_, err)) = self.queue.enqueue(task, WaitBudget::Try) {
            debug!(job_id = %job_id, error = %err, "submit enqueue failed, job remains queued");
        }
        Ok(job_id)
    }

    /// Handle `jobs/status`.
    pub fn job_status(&self, job_id: JobId) -> Result<JobRecord, DispatchError> {
        self.registry.status(job_id).map_err(|_| DispatchError::NotFound)
    }

    /// Handle `jobs/result`.
    pub fn job_result(&self, job_id: JobId) -> Result<JobRecord, DispatchError> {
        self.registry.status(job_id).map_err(|_| DispatchError::NotFound)
    }

    /// Handle `jobs/cancel`. A terminal job is not an error: it reports
    /// `Ok(false)` so the route can answer 200 with `"not_cancelable"`.
    pub fn cancel_job(&self, job_id: JobId) -> Result<bool, DispatchError> {
        match self.registry.cancel(job_id) {
            Ok(()) => Ok(true),
            Err(super::error::JobError::NotCancelable) => Ok(false),
            Err(super::error::JobError::NotFound) => Err(DispatchError::NotFound),
        }
    }

    /// Build a worker-side handler that executes queued tasks by looking
    /// them back up in this table. Used by `server_builder` to hand the
    /// worker pool something that closes over the same handler table and
    /// registry the synchronous path uses.
    #[must_use]
    pub fn worker_handler(self: &Arc<Self>) -> Arc<dyn super::worker_pool::TaskHandler> {
        let this = Arc::clone(self);
        Arc::new(move |task: Task| this.run_worker_task(task))
    }

    fn run_worker_task(&self, task: Task) {
        let Task {
            task_name,
            params,
            job_id,
            reply_target,
            enqueue_time,
            ..
        } = task;

        let wait_us = enqueue_time.map_or(0, |t| t.elapsed().as_micros() as u64);

        if let Some(job_id) = job_id {
            if self.registry.is_canceled(job_id) {
                debug!(%job_id, "job canceled before execution, discarding result");
                return;
            }
            let _ = self.registry.mark_running(job_id);
            let started = Instant::now();
            let outcome = self.run_inline(&task_name, &params);
            self.metrics
                .record(&task_name, wait_us, started.elapsed().as_micros() as u64, outcome.is_err());
            match outcome {
                Ok(body) => {
                    let _ = self.registry.mark_done(job_id, body);
                }
                Err(err) => {
                    let _ = self.registry.mark_error(job_id, err.to_string());
                }
            }
            return;
        }

        if let super::task::ReplyTarget::Sync(reply) = reply_target {
            let started = Instant::now();
            let outcome = self.run_inline(&task_name, &params);
            self.metrics
                .record(&task_name, wait_us, started.elapsed().as_micros() as u64, outcome.is_err());
            match outcome {
                Ok(body) => reply.0.success(body),
                Err(err) => reply.0.error(500, err.to_string()),
            }
        }
    }

    fn run_inline(
        &self,
        task_name: &str,
        params: &HashMap<String, String>,
    ) -> Result<String, DispatchError> {
        let handlers = self.handlers.lock();
        let handler = handlers
            .get(task_name)
            .ok_or_else(|| DispatchError::UnknownRoute(task_name.to_string()))?;
        (handler.run)(params).map_err(DispatchError::HandlerFailure)
    }
}

fn queue_err_to_dispatch(err: super::error::QueueError) -> DispatchError {
    match err {
        super::error::QueueError::Full => DispatchError::Full {
            retry_after_ms: Duration::from_millis(100).as_millis() as u64,
        },
        super::error::QueueError::ShuttingDown => DispatchError::ShuttingDown,
    }
}
