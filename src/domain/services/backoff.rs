//! Retry-delay domain service.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Domain service for computing retry schedules for failed queue dispatches.
pub struct BackoffCalculator;

impl BackoffCalculator {
    /// Cap applied to the computed delay so a high retry count can't push a
    /// request's visibility arbitrarily far into the future.
    pub const MAX_DELAY: Duration = Duration::from_secs(15 * 60);

    /// The time a request should next become visible after failing at
    /// `fail_time`, given it is about to become retry number `retry_count`
    /// (1-indexed: the first retry is `retry_count == 1`).
    ///
    /// `process_at ≈ fail_time + retry_base_delay * 2^(retry_count - 1)`,
    /// clamped to [`Self::MAX_DELAY`].
    pub fn next_process_at(
        fail_time: DateTime<Utc>,
        retry_count: u32,
        retry_base_delay: Duration,
    ) -> DateTime<Utc> {
        fail_time + chrono::Duration::from_std(Self::delay(retry_count, retry_base_delay))
            .unwrap_or_default()
    }

    /// The exponential backoff delay itself, independent of any clock.
    pub fn delay(retry_count: u32, retry_base_delay: Duration) -> Duration {
        if retry_count == 0 {
            return Duration::ZERO;
        }
        let exponent = retry_count.saturating_sub(1).min(20);
        let multiplier = 1u64.checked_shl(exponent).unwrap_or(u64::MAX);
        let scaled = retry_base_delay
            .checked_mul(multiplier as u32)
            .unwrap_or(Self::MAX_DELAY);
        scaled.min(Self::MAX_DELAY)
    }
}
