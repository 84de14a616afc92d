//! Server configuration: worker pool sizing, queue capacity, bind address,
//! and optional job persistence.
//!
//! Grounded on the teacher's `config/pool.rs` (a plain `serde`-backed struct
//! with a hand-written `validate()` returning `Result<(), String>`, plus a
//! `from_json_str` convenience constructor); layered with `clap`'s `env`
//! feature and `dotenvy` the way the teacher's binary entry points load
//! settings, so the same fields can come from a config file, environment
//! variables, or CLI flags.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Runtime configuration for the job server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Number of OS-thread workers draining the work queue.
    pub worker_count: usize,
    /// Work queue capacity; `0` means unbounded (never blocks, never drops).
    pub queue_capacity: usize,
    /// How long a sync dispatch waits for queue space before failing with
    /// 503, in milliseconds. Interpreted as a [`crate::core::WaitBudget`]:
    /// `0` = try-once, `>0` = bounded wait, and this field is never
    /// negative (unlike the wait-budget it is converted into, see
    /// `ServerConfig::enqueue_wait_budget`).
    pub enqueue_wait_ms: u64,
    /// TCP port the HTTP listener binds to.
    pub port: u16,
    /// Directory for best-effort per-job JSON persistence. `None` disables
    /// persistence entirely.
    pub job_persistence_dir: Option<PathBuf>,
    /// Graceful shutdown grace period before workers are forcibly joined.
    pub shutdown_grace_ms: u64,
}

impl ServerConfig {
    /// Defaults sized for a small development box: one worker per core,
    /// a modest bounded queue, and no persistence.
    #[must_use]
    pub fn from_env() -> Self {
        let worker_count = std::env::var("JOBFORGE_WORKERS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(num_cpus::get);
        let queue_capacity = std::env::var("JOBFORGE_QUEUE_CAPACITY")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(256);
        let enqueue_wait_ms = std::env::var("JOBFORGE_ENQUEUE_WAIT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        let port = std::env::var("JOBFORGE_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(8080);
        let job_persistence_dir = std::env::var("JOBFORGE_JOB_DIR").ok().map(PathBuf::from);
        let shutdown_grace_ms = std::env::var("JOBFORGE_SHUTDOWN_GRACE_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(5_000);

        Self {
            worker_count,
            queue_capacity,
            enqueue_wait_ms,
            port,
            job_persistence_dir,
            shutdown_grace_ms,
        }
    }

    /// Parse a config from a JSON string, then validate it.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check field invariants: at least one worker, a sane port, and a
    /// bounded shutdown grace period.
    pub fn validate(&self) -> Result<(), String> {
        if self.worker_count == 0 {
            return Err("worker_count must be greater than 0".into());
        }
        if self.port == 0 {
            return Err("port must be non-zero".into());
        }
        if self.shutdown_grace_ms == 0 {
            return Err("shutdown_grace_ms must be greater than 0".into());
        }
        Ok(())
    }

    /// The enqueue wait budget used for synchronous dispatch: `0` means
    /// try-once, matching spec.md's wait_budget == 0 semantics.
    #[must_use]
    pub fn enqueue_wait_budget(&self) -> crate::core::WaitBudget {
        if self.enqueue_wait_ms == 0 {
            crate::core::WaitBudget::Try
        } else {
            crate::core::WaitBudget::After(Duration::from_millis(self.enqueue_wait_ms))
        }
    }

    /// Grace period before the worker pool is forcibly joined on shutdown.
    #[must_use]
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            worker_count: num_cpus::get(),
            queue_capacity: 256,
            enqueue_wait_ms: 0,
            port: 8080,
            job_persistence_dir: None,
            shutdown_grace_ms: 5_000,
        }
    }
}
