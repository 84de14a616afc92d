//! The unit of work admitted into the work queue.

use std::collections::HashMap;
use std::time::Instant;

use crate::util::{JobId, RequestId};

/// Where a task's outcome is delivered once a worker finishes it.
///
/// A task carries exactly one of these: a live reply sink for synchronous
/// requests, or a job id for async submissions whose outcome lands in the
/// [`crate::core::JobRegistry`] instead. Modeling this as a tagged variant
/// (rather than two optional fields) makes "exactly one is set" a type-level
/// invariant instead of a runtime check.
pub enum ReplyTarget {
    /// Reply directly to the originating request.
    Sync(SyncReply),
    /// Update the job registry record with this id.
    Async(JobId),
}

/// A channel capable of carrying a task's result back to its caller.
///
/// Boxed so the dispatcher can hand workers a uniform `Task<P>` regardless
/// of which transport (HTTP response, test channel, ...) is behind it.
pub trait ReplySink: Send {
    /// Deliver a successful result body.
    fn success(self: Box<Self>, body: String);
    /// Deliver an error with an HTTP-ish status code.
    fn error(self: Box<Self>, status: u16, message: String);
}

/// Owns the boxed [`ReplySink`] for a synchronous task.
pub struct SyncReply(pub Box<dyn ReplySink>);

impl std::fmt::Debug for SyncReply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncReply").finish_non_exhaustive()
    }
}

impl std::fmt::Debug for ReplyTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sync(r) => f.debug_tuple("Sync").field(r).finish(),
            Self::Async(id) => f.debug_tuple("Async").field(id).finish(),
        }
    }
}

/// A unit of work admitted into the [`crate::core::WorkQueue`].
///
/// Once constructed a task is immutable; the queue and worker pool move it
/// by value so enqueue failure can hand it straight back to the caller
/// instead of leaking it (see DESIGN.md, "ownership of Task").
#[derive(Debug)]
pub struct Task {
    /// Opaque identifier for log/response correlation.
    pub request_id: RequestId,
    /// Where the outcome goes.
    pub reply_target: ReplyTarget,
    /// Names a registered handler.
    pub task_name: String,
    /// Decoded parameter values.
    pub params: HashMap<String, String>,
    /// Set iff this task is bound to an async job.
    pub job_id: Option<JobId>,
    /// Wall-clock instant the task entered the queue; stamped by the queue
    /// on successful enqueue, `None` beforehand.
    pub enqueue_time: Option<Instant>,
}

impl Task {
    /// Build a task that replies synchronously once executed.
    #[must_use]
    pub fn new_sync(
        request_id: RequestId,
        task_name: impl Into<String>,
        params: HashMap<String, String>,
        reply: Box<dyn ReplySink>,
    ) -> Self {
        Self {
            request_id,
            reply_target: ReplyTarget::Sync(SyncReply(reply)),
            task_name: task_name.into(),
            params,
            job_id: None,
            enqueue_time: None,
        }
    }

    /// Build a task bound to an async job record.
    #[must_use]
    pub fn new_async(
        request_id: RequestId,
        task_name: impl Into<String>,
        params: HashMap<String, String>,
        job_id: JobId,
    ) -> Self {
        Self {
            request_id,
            reply_target: ReplyTarget::Async(job_id),
            task_name: task_name.into(),
            params,
            job_id: Some(job_id),
            enqueue_time: None,
        }
    }

    /// `true` if this task reports its outcome to a job record rather than
    /// a live reply sink.
    #[must_use]
    pub fn is_async(&self) -> bool {
        matches!(self.reply_target, ReplyTarget::Async(_))
    }
}
