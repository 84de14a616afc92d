//! Wall-clock helpers shared by the job registry and metrics aggregator.

use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch.
///
/// Used for `TaskMetadata`/`JobRecord` timestamps, which need to survive a
/// best-effort persistence round-trip rather than the monotonic guarantees
/// of [`std::time::Instant`].
#[must_use]
pub fn now_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is before the Unix epoch")
        .as_millis()
}
