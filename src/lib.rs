//! # jobforge
//!
//! A bounded-queue, thread-pool compute-job server: an HTTP front end hands
//! requests to a [`core::Dispatcher`], which either runs a task inline or
//! admits it to a [`core::WorkQueue`] drained by a [`core::WorkerPool`] of
//! OS threads. Requests submitted via `jobs/submit` are tracked
//! asynchronously in a [`core::JobRegistry`] instead of holding a live
//! connection open.
//!
//! ## Core Problem Solved
//!
//! A naive "spawn a thread per request" server falls over under load:
//! CPU-bound handlers (hashing, compression, number theory) pile up
//! threads faster than the OS can schedule them, and a client with a
//! slow-to-return task blocks a connection for as long as it runs. This
//! crate bounds both: a fixed worker pool caps concurrency, and a bounded
//! queue in front of it applies backpressure (reject with 503, or wait up
//! to a budget) instead of accepting unbounded work.
//!
//! ## Key Components
//!
//! - [`core::WorkQueue`]: bounded FIFO with a caller-chosen wait budget.
//! - [`core::WorkerPool`]: fixed OS-thread pool draining the queue.
//! - [`core::JobRegistry`]: QUEUED → RUNNING → {DONE, ERROR, CANCELED} state
//!   machine for async jobs, with optional best-effort persistence.
//! - [`core::Dispatcher`]: routes a task name to its handler, choosing
//!   inline execution or queued submission per handler policy.
//! - [`core::MetricsRegistry`]: per-task-name latency and error counters.
//!
//! For a complete wiring example, see [`builders::ServerBuilder`] and
//! `src/bin/server.rs`.

#![deny(warnings)]
#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core scheduling abstractions: queue, worker pool, registry, dispatcher,
/// metrics.
pub mod core;
/// Configuration models for the job server.
pub mod config;
/// Builders that wire core components into a running server.
pub mod builders;
/// The axum-based HTTP front end.
pub mod http;
/// Shared utilities: clocks, identifiers, telemetry setup.
pub mod util;

/// Mutex re-exports built on `parking_lot`.
pub mod mutex;
/// Reader-writer lock re-exports built on `parking_lot`.
pub mod rwlock;
/// Condition variable built on `parking_lot`.
pub mod condvar;
/// Once-cell re-exports.
pub mod once;

pub use condvar::Condvar;
pub use mutex::{MappedMutexGuard, Mutex, MutexGuard};
pub use once::{Once, OnceCell};
pub use rwlock::{
    MappedRwLockReadGuard, MappedRwLockWriteGuard, RwLock, RwLockReadGuard,
    RwLockUpgradableReadGuard, RwLockWriteGuard,
};
