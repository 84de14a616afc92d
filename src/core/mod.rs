//! Core scheduling abstractions: the work queue, worker pool, job registry,
//! dispatcher, and metrics aggregator.

pub mod dispatcher;
pub mod error;
pub mod metrics;
pub mod queue;
pub mod registry;
pub mod task;
pub mod worker_pool;

pub use dispatcher::{Dispatcher, DispatchOutcome, ExecutionPolicy, HandlerTable, RegisteredHandler};
pub use error::{AppResult, DispatchError, JobError, QueueError};
pub use metrics::{MetricsEntry, MetricsRegistry, MetricsSnapshot, PoolGauges, WorkerGauges};
pub use queue::{QueueStats, WaitBudget, WorkQueue};
pub use registry::{JobRecord, JobRegistry, JobStatus};
pub use task::{ReplySink, ReplyTarget, SyncReply, Task};
pub use worker_pool::{TaskHandler, WorkerPool, WorkerPoolStats};
