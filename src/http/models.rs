//! JSON request and response shapes for the HTTP front end.
//!
//! Field names follow the original router's ad hoc JSON (`job_id`,
//! `status`, `progress`, `eta_ms`) rather than inventing a new wire shape.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::core::{JobRecord, JobStatus};
use crate::util::JobId;

/// Response body for the lightweight `status` liveness route, distinct
/// from the detailed per-task breakdown served by `metrics`.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Always `"running"`: the process wouldn't be able to answer otherwise.
    pub status: &'static str,
    /// OS process id, for matching this instance against `ps`/logs.
    pub pid: u32,
    /// Seconds since the server started.
    pub uptime_seconds: u64,
    /// Total requests accepted since startup, across all task names.
    pub connections_served: u64,
    /// Of those, how many completed without error.
    pub requests_ok: u64,
    /// Of those, how many ended in an error outcome.
    pub requests_error: u64,
}

/// Query parameters accepted by `<task_name>` and `jobs/submit`: an
/// arbitrary bag of string parameters, matching the original's
/// "include the whole query as JSON" behavior.
pub type TaskParams = HashMap<String, String>;

/// Response body for `jobs/submit`.
#[derive(Debug, Serialize)]
pub struct JobSubmitResponse {
    /// Id to poll via `jobs/status` and `jobs/result`.
    pub job_id: JobId,
    /// Always `"queued"`: a submit that fails returns an error instead.
    pub status: &'static str,
}

impl JobSubmitResponse {
    /// Build the response for a freshly accepted job.
    #[must_use]
    pub fn new(job_id: JobId) -> Self {
        Self {
            job_id,
            status: "queued",
        }
    }
}

/// Response body for `jobs/status`.
#[derive(Debug, Serialize)]
pub struct JobStatusResponse {
    /// Current lifecycle state.
    pub status: JobStatus,
    /// Completion estimate, 0..=100.
    pub progress: u8,
    /// Rough estimate of remaining time in milliseconds, derived from the
    /// task name's recent average execution time; `0` once terminal or
    /// when no samples exist yet for this task name.
    pub eta_ms: u64,
}

impl JobStatusResponse {
    /// Build from a record plus the task name's recent average execution
    /// time in microseconds (`0` if no samples are available yet).
    #[must_use]
    pub fn new(record: JobRecord, recent_avg_exec_us: f64) -> Self {
        let eta_ms = if record.status.is_terminal() {
            0
        } else {
            let remaining = f64::from(100 - record.progress) / 100.0;
            ((recent_avg_exec_us / 1000.0) * remaining).round() as u64
        };
        Self {
            status: record.status,
            progress: record.progress,
            eta_ms,
        }
    }
}

/// Response body for `jobs/result` when the job ended in `Error`. A `Done`
/// job instead returns its stored result string verbatim as the raw HTTP
/// body, matching the original's "already JSON, send it as-is" handling;
/// a job that is still `Queued`/`Running`/`Canceled` has no result yet and
/// is reported as not found.
#[derive(Debug, Serialize)]
pub struct JobResultResponse {
    /// The handler's error message.
    pub error: String,
}

/// Response body for `jobs/cancel`.
#[derive(Debug, Serialize)]
pub struct JobCancelResponse {
    /// Always `"canceled"`; a non-cancelable job returns an error instead.
    pub status: &'static str,
}

/// Identifies a job in `jobs/status|result|cancel` query parameters.
#[derive(Debug, Deserialize)]
pub struct JobIdQuery {
    /// The job id to look up.
    pub id: JobId,
}

/// Identifies the task to run for `jobs/submit`, with remaining query
/// parameters collected into [`TaskParams`] by the route handler.
#[derive(Debug, Deserialize)]
pub struct JobSubmitQuery {
    /// Task name to submit.
    pub task: String,
}
