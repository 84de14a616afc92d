//! Shared utilities: wall-clock helpers, identifier types, telemetry setup.

pub mod clock;
pub mod ids;
pub mod telemetry;

pub use clock::now_ms;
pub use ids::{JobId, RequestId};
pub use telemetry::init_tracing;
