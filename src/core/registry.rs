//! Async job registry: the QUEUED → RUNNING → {DONE, ERROR, CANCELED} state
//! machine backing `jobs/submit|status|result|cancel`.
//!
//! Grounded on the original `job_manager.c`: a single lock guarding a flat
//! map of job records, best-effort JSON persistence on every mutation, and
//! the same cancellation rule (only QUEUED or RUNNING jobs are cancelable;
//! DONE/ERROR/CANCELED are terminal). The teacher's `resource_pool.rs`
//! `TaskStatus`/`TaskMetadata` pair shows the idiomatic shape for this kind
//! of record-plus-status type in this codebase; persistence uses `serde_json`
//! the way the teacher's config loader does, one file per job rather than a
//! WAL, since a restart is not expected to reconstruct the registry
//! (DESIGN.md, "job persistence does not survive restart").

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::error::JobError;
use crate::util::{now_ms, JobId};

/// Where a job sits in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Accepted, not yet picked up by a worker.
    Queued,
    /// A worker is executing the task.
    Running,
    /// Finished successfully; `result` is populated.
    Done,
    /// Finished with a failure; `error` is populated.
    Error,
    /// Canceled before or during execution.
    Canceled,
}

impl JobStatus {
    /// `true` for DONE, ERROR, and CANCELED: states a job never leaves.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Error | Self::Canceled)
    }
}

/// A job's full record as tracked by the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    /// Stable identifier handed back to the submitter.
    pub job_id: JobId,
    /// The task name this job was submitted against.
    pub task_name: String,
    /// The submitted params, kept for audit.
    pub payload: HashMap<String, String>,
    /// Current lifecycle state.
    pub status: JobStatus,
    /// Coarse completion estimate, 0..=100.
    pub progress: u8,
    /// Result body, set only once `status == Done`.
    pub result: Option<String>,
    /// Error message, set only once `status == Error`.
    pub error: Option<String>,
    /// Milliseconds since the Unix epoch when the job was submitted.
    pub created_at_ms: u128,
    /// Set once a worker calls `mark_running`.
    pub started_at_ms: Option<u128>,
    /// Set once the job reaches a terminal state.
    pub finished_at_ms: Option<u128>,
}

impl JobRecord {
    fn new(job_id: JobId, task_name: impl Into<String>, payload: HashMap<String, String>) -> Self {
        Self {
            job_id,
            task_name: task_name.into(),
            payload,
            status: JobStatus::Queued,
            progress: 0,
            result: None,
            error: None,
            created_at_ms: now_ms(),
            started_at_ms: None,
            finished_at_ms: None,
        }
    }
}

/// Coarse-locked map of in-flight and completed jobs.
///
/// A single mutex over the whole map, not per-job locks: spec.md calls for
/// linearizable per-`job_id` transitions, and the expected job count
/// (hundreds, not millions) doesn't justify sharding the lock the way a
/// high-fanout cache might.
pub struct JobRegistry {
    jobs: Mutex<HashMap<JobId, JobRecord>>,
    persistence_dir: Option<PathBuf>,
}

impl JobRegistry {
    /// Create a registry with no on-disk persistence.
    #[must_use]
    pub fn new() -> Self {
        Self {
            jobs: Mutex::new(HashMap::new()),
            persistence_dir: None,
        }
    }

    /// Create a registry that best-effort persists each mutation as
    /// `<dir>/<job_id>.json`. Persistence failures are logged, never
    /// propagated: a write failure must not fail the job transition itself.
    #[must_use]
    pub fn with_persistence(dir: impl Into<PathBuf>) -> Self {
        Self {
            jobs: Mutex::new(HashMap::new()),
            persistence_dir: Some(dir.into()),
        }
    }

    /// Register a new job in the QUEUED state and return its id. `payload`
    /// is the submitted params, stored on the record for audit.
    pub fn submit(&self, task_name: impl Into<String>, payload: HashMap<String, String>) -> JobId {
        let job_id = JobId::new();
        let record = JobRecord::new(job_id, task_name, payload);
        let mut jobs = self.jobs.lock();
        jobs.insert(job_id, record.clone());
        drop(jobs);
        self.persist(&record);
        job_id
    }

    /// Transition a job from QUEUED to RUNNING.
    pub fn mark_running(&self, job_id: JobId) -> Result<(), JobError> {
        self.mutate(job_id, |record| {
            record.status = JobStatus::Running;
            record.started_at_ms = Some(now_ms());
        })
    }

    /// Update a running job's progress estimate (0..=100).
    pub fn update_progress(&self, job_id: JobId, progress: u8) -> Result<(), JobError> {
        self.mutate(job_id, |record| {
            record.progress = progress.min(100);
        })
    }

    /// Transition a job to DONE with the given result body.
    pub fn mark_done(&self, job_id: JobId, result: impl Into<String>) -> Result<(), JobError> {
        self.mutate(job_id, |record| {
            record.status = JobStatus::Done;
            record.progress = 100;
            record.result = Some(result.into());
            record.finished_at_ms = Some(now_ms());
        })
    }

    /// Transition a job to ERROR with the given message.
    pub fn mark_error(&self, job_id: JobId, error: impl Into<String>) -> Result<(), JobError> {
        self.mutate(job_id, |record| {
            record.status = JobStatus::Error;
            record.error = Some(error.into());
            record.finished_at_ms = Some(now_ms());
        })
    }

    /// Cancel a job. Fails with `JobError::NotCancelable` if it is already
    /// in a terminal state, matching `job_cancel`'s `1 = not cancelable`
    /// return in the original.
    pub fn cancel(&self, job_id: JobId) -> Result<(), JobError> {
        let mut jobs = self.jobs.lock();
        let record = jobs.get_mut(&job_id).ok_or(JobError::NotFound)?;
        if record.status.is_terminal() {
            return Err(JobError::NotCancelable);
        }
        record.status = JobStatus::Canceled;
        record.finished_at_ms = Some(now_ms());
        let snapshot = record.clone();
        drop(jobs);
        self.persist(&snapshot);
        Ok(())
    }

    /// Fetch the current record for a job.
    pub fn status(&self, job_id: JobId) -> Result<JobRecord, JobError> {
        self.jobs
            .lock()
            .get(&job_id)
            .cloned()
            .ok_or(JobError::NotFound)
    }

    /// `true` if `job_id` has been marked canceled. Workers poll this
    /// cooperatively; cancellation here is advisory, not preemptive
    /// (spec.md Non-goals: no preemption).
    #[must_use]
    pub fn is_canceled(&self, job_id: JobId) -> bool {
        self.jobs
            .lock()
            .get(&job_id)
            .is_some_and(|record| record.status == JobStatus::Canceled)
    }

    /// Number of jobs tracked, regardless of state.
    #[must_use]
    pub fn len(&self) -> usize {
        self.jobs.lock().len()
    }

    /// `true` if no jobs are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Apply `f` to a job's record unless it has already reached a
    /// terminal state. Terminal states are absorbing: a worker finishing
    /// a handler after a concurrent `cancel` has already landed must not
    /// overwrite CANCELED back to DONE/ERROR.
    fn mutate(&self, job_id: JobId, f: impl FnOnce(&mut JobRecord)) -> Result<(), JobError> {
        let mut jobs = self.jobs.lock();
        let record = jobs.get_mut(&job_id).ok_or(JobError::NotFound)?;
        if record.status.is_terminal() {
            return Err(JobError::AlreadyTerminal);
        }
        f(record);
        let snapshot = record.clone();
        drop(jobs);
        self.persist(&snapshot);
        Ok(())
    }

    fn persist(&self, record: &JobRecord) {
        let Some(dir) = &self.persistence_dir else {
            return;
        };
        if let Err(err) = persist_record(dir, record) {
            warn!(job_id = %record.job_id, error = %err, "failed to persist job record");
        }
    }
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn persist_record(dir: &Path, record: &JobRecord) -> std::io::Result<()> {
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}.json", record.job_id));
    let body = serde_json::to_vec_pretty(record).map_err(std::io::Error::other)?;
    fs::write(path, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn submit_starts_queued() {
        let registry = JobRegistry::new();
        let job_id = registry.submit("factor", HashMap::new());
        let record = registry.status(job_id).unwrap();
        assert_eq!(record.status, JobStatus::Queued);
        assert_eq!(record.progress, 0);
    }

    #[test]
    fn full_happy_path_transitions() {
        let registry = JobRegistry::new();
        let job_id = registry.submit("mandelbrot", HashMap::new());
        registry.mark_running(job_id).unwrap();
        assert_eq!(registry.status(job_id).unwrap().status, JobStatus::Running);
        registry.update_progress(job_id, 50).unwrap();
        assert_eq!(registry.status(job_id).unwrap().progress, 50);
        registry.mark_done(job_id, "{\"ok\":true}").unwrap();
        let record = registry.status(job_id).unwrap();
        assert_eq!(record.status, JobStatus::Done);
        assert_eq!(record.progress, 100);
        assert_eq!(record.result.as_deref(), Some("{\"ok\":true}"));
    }

    #[test]
    fn error_path_sets_message() {
        let registry = JobRegistry::new();
        let job_id = registry.submit("hashfile", HashMap::new());
        registry.mark_running(job_id).unwrap();
        registry.mark_error(job_id, "file not found").unwrap();
        let record = registry.status(job_id).unwrap();
        assert_eq!(record.status, JobStatus::Error);
        assert_eq!(record.error.as_deref(), Some("file not found"));
    }

    #[test]
    fn cancel_before_start_succeeds() {
        let registry = JobRegistry::new();
        let job_id = registry.submit("sleep", HashMap::new());
        registry.cancel(job_id).unwrap();
        assert_eq!(registry.status(job_id).unwrap().status, JobStatus::Canceled);
        assert!(registry.is_canceled(job_id));
    }

    #[test]
    fn cancel_while_running_succeeds() {
        let registry = JobRegistry::new();
        let job_id = registry.submit("sleep", HashMap::new());
        registry.mark_running(job_id).unwrap();
        registry.cancel(job_id).unwrap();
        assert_eq!(registry.status(job_id).unwrap().status, JobStatus::Canceled);
    }

    #[test]
    fn cancel_after_done_is_rejected() {
        let registry = JobRegistry::new();
        let job_id = registry.submit("pi", HashMap::new());
        registry.mark_running(job_id).unwrap();
        registry.mark_done(job_id, "3.14").unwrap();
        let err = registry.cancel(job_id).unwrap_err();
        assert_eq!(err, JobError::NotCancelable);
    }

    #[test]
    fn unknown_job_id_is_not_found() {
        let registry = JobRegistry::new();
        let err = registry.status(JobId::new()).unwrap_err();
        assert_eq!(err, JobError::NotFound);
    }

    #[test]
    fn submit_stores_the_payload() {
        let registry = JobRegistry::new();
        let mut payload = HashMap::new();
        payload.insert("n".to_string(), "4".to_string());
        let job_id = registry.submit("double", payload.clone());
        assert_eq!(registry.status(job_id).unwrap().payload, payload);
    }

    #[test]
    fn cancel_during_execution_wins_over_a_late_mark_done() {
        // A worker marks RUNNING, then a concurrent `jobs/cancel` lands
        // before the worker's handler returns. The worker's post-execution
        // `mark_done` must not overwrite the CANCELED status.
        let registry = JobRegistry::new();
        let job_id = registry.submit("sleep", HashMap::new());
        registry.mark_running(job_id).unwrap();
        registry.cancel(job_id).unwrap();

        let err = registry.mark_done(job_id, "too late").unwrap_err();
        assert_eq!(err, JobError::AlreadyTerminal);

        let record = registry.status(job_id).unwrap();
        assert_eq!(record.status, JobStatus::Canceled);
        assert!(record.result.is_none());
    }

    #[test]
    fn mark_error_after_cancel_is_also_rejected() {
        let registry = JobRegistry::new();
        let job_id = registry.submit("sleep", HashMap::new());
        registry.mark_running(job_id).unwrap();
        registry.cancel(job_id).unwrap();

        let err = registry.mark_error(job_id, "too late").unwrap_err();
        assert_eq!(err, JobError::AlreadyTerminal);
        assert_eq!(registry.status(job_id).unwrap().status, JobStatus::Canceled);
    }

    #[test]
    fn persistence_writes_one_file_per_job() {
        let dir = tempdir().unwrap();
        let registry = JobRegistry::with_persistence(dir.path());
        let job_id = registry.submit("wordcount", HashMap::new());
        registry.mark_running(job_id).unwrap();
        registry.mark_done(job_id, "42").unwrap();

        let path = dir.path().join(format!("{job_id}.json"));
        let contents = fs::read_to_string(path).unwrap();
        assert!(contents.contains("\"done\""));
        assert!(contents.contains("42"));
    }
}
