//! Error types for the queue, registry, and dispatcher.

use thiserror::Error;

/// Errors produced by [`crate::core::WorkQueue`] operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueueError {
    /// The queue is at capacity and the wait budget was exhausted (or zero).
    #[error("queue full")]
    Full,
    /// The queue is shutting down and no longer accepts work.
    #[error("queue is shutting down")]
    ShuttingDown,
}

/// Errors produced by [`crate::core::JobRegistry`] operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JobError {
    /// No job exists with the given id.
    #[error("job not found")]
    NotFound,
    /// The job is in a terminal state and cannot be canceled.
    #[error("job is not cancelable")]
    NotCancelable,
    /// The job already reached a terminal state; further mutation (a
    /// worker's post-execution `mark_done`/`mark_error`, for instance) is
    /// rejected to keep terminal states absorbing.
    #[error("job is already in a terminal state")]
    AlreadyTerminal,
}

/// Errors surfaced by the [`crate::core::Dispatcher`], mapped to HTTP status
/// codes at the transport boundary (see `http::error`).
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A required parameter was absent.
    #[error("missing parameter: {0}")]
    MissingParameter(String),
    /// A parameter was present but failed validation.
    #[error("invalid parameter {0}: {1}")]
    InvalidParameter(String, String),
    /// No handler is registered for the requested route.
    #[error("unknown route: {0}")]
    UnknownRoute(String),
    /// Job id lookup missed.
    #[error("job not found")]
    NotFound,
    /// The work queue rejected the task at its current wait budget.
    #[error("queue full, retry after {retry_after_ms}ms")]
    Full {
        /// Hint for how long the caller should wait before retrying.
        retry_after_ms: u64,
    },
    /// The queue or worker pool is shutting down.
    #[error("shutting down")]
    ShuttingDown,
    /// The task handler returned a failure or produced no output.
    #[error("handler failed: {0}")]
    HandlerFailure(String),
}

/// Application-facing result using anyhow for higher-level (binary) contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
