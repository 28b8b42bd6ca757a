//! The remote API's advertised quota for a user, as parsed from response headers.

use chrono::{DateTime, Utc};

use crate::domain::value_objects::ApiType;

/// A snapshot of rate-limit headers from the remote code-hosting API.
///
/// REST responses carry `limit`/`remaining`/`reset`/`used`; GraphQL responses
/// additionally carry `cost`, the points consumed by the specific query that
/// produced this snapshot. A snapshot with no `cost` means the field was
/// absent or unparsable on the response, not that the query was free.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitInfo {
    pub api_type: ApiType,
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
    pub used: Option<u32>,
    pub cost: Option<u32>,
    pub observed_at: DateTime<Utc>,
}

impl RateLimitInfo {
    pub fn new(
        api_type: ApiType,
        limit: u32,
        remaining: u32,
        reset_at: DateTime<Utc>,
        observed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            api_type,
            limit,
            remaining,
            reset_at,
            used: None,
            cost: None,
            observed_at,
        }
    }

    pub fn with_used(mut self, used: u32) -> Self {
        self.used = Some(used);
        self
    }

    pub fn with_cost(mut self, cost: u32) -> Self {
        self.cost = Some(cost);
        self
    }

    /// Fraction of the limit already consumed, in `[0.0, 1.0]`.
    ///
    /// Returns `0.0` for a `limit` of zero rather than dividing by it — a
    /// remote API advertising a zero limit is a degenerate case, not a
    /// reason to propagate NaN into callers.
    pub fn usage_ratio(&self) -> f64 {
        if self.limit == 0 {
            return 0.0;
        }
        let used = self.limit.saturating_sub(self.remaining);
        used as f64 / self.limit as f64
    }

    /// Whether consumption has crossed `threshold` (e.g. `0.8` for 80%).
    pub fn is_approaching(&self, threshold: f64) -> bool {
        self.usage_ratio() >= threshold
    }

    /// Whether the remote API considers this user fully exhausted.
    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }

    /// Time remaining until `reset_at`, relative to `now`. Zero if already past.
    pub fn time_until_reset(&self, now: DateTime<Utc>) -> chrono::Duration {
        let delta = self.reset_at - now;
        if delta < chrono::Duration::zero() {
            chrono::Duration::zero()
        } else {
            delta
        }
    }
}
