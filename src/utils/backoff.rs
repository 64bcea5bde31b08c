//! Delay schedules for retrying metadata fetches.

use std::time::Duration;

/// Delay before retrying after a rate-limit response.
///
/// An explicit `Retry-After` (in seconds) wins. Otherwise waits `2^attempt`
/// units, where `attempt` is the 1-based attempt that just failed.
#[must_use]
pub fn rate_limit_delay(attempt: u32, unit: Duration, retry_after_secs: Option<u64>) -> Duration {
    match retry_after_secs {
        Some(secs) => Duration::from_secs(secs),
        None => unit.saturating_mul(1u32.checked_shl(attempt).unwrap_or(u32::MAX)),
    }
}

/// Delay before retrying after a transient network failure: `attempt` units.
#[must_use]
pub fn linear_delay(attempt: u32, unit: Duration) -> Duration {
    unit.saturating_mul(attempt)
}
