//! Rate Limiter Service
//!
//! Sliding-window counters keyed by (user, limit-class), multiplied by a
//! per-user tier. See the top-level-map-then-per-entry-lock discipline
//! described alongside [`crate::application::services::queue_service`].

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;

use crate::domain::{LimitClass, LimitPolicy, SlidingWindow, Tier, TierMultipliers};
use crate::infrastructure::metrics::MetricsSink;
use crate::shared::error::RateLimiterError;

/// The base `(requests, window)` policy for each limit class, per §6.
#[derive(Debug, Clone, Copy)]
pub struct RateLimiterPolicies {
    pub command: LimitPolicy,
    pub remote_rest: LimitPolicy,
    pub remote_graphql: LimitPolicy,
    pub global: LimitPolicy,
}

impl RateLimiterPolicies {
    pub fn for_class(&self, class: LimitClass) -> LimitPolicy {
        match class {
            LimitClass::Command => self.command,
            LimitClass::RemoteRest => self.remote_rest,
            LimitClass::RemoteGraphql => self.remote_graphql,
            LimitClass::Global => self.global,
        }
    }
}

impl Default for RateLimiterPolicies {
    fn default() -> Self {
        use std::time::Duration;
        Self {
            command: LimitPolicy::new(30, Duration::from_secs(60)),
            remote_rest: LimitPolicy::new(60, Duration::from_secs(3600)),
            remote_graphql: LimitPolicy::new(100, Duration::from_secs(3600)),
            global: LimitPolicy::new(200, Duration::from_secs(3600)),
        }
    }
}

/// Rate Limiter public contract (§4.1).
#[async_trait]
pub trait RateLimiterService: Send + Sync {
    /// Non-destructive: does not record the request.
    async fn check_limit(&self, user_id: &str, class: LimitClass, tier: Tier) -> bool;

    /// Checks AND, on success, appends `now` to the window. Atomic with
    /// respect to concurrent callers on the same (user, class).
    async fn consume_limit(
        &self,
        user_id: &str,
        class: LimitClass,
        tier: Tier,
    ) -> Result<(), RateLimiterError>;

    fn current_usage(&self, user_id: &str, class: LimitClass) -> u32;

    fn remaining(&self, user_id: &str, class: LimitClass, tier: Tier) -> u32;

    /// When the oldest in-window timestamp will expire; `now` if empty.
    fn reset_time(&self, user_id: &str, class: LimitClass) -> DateTime<Utc>;

    /// Clears all windows for one user.
    fn reset_user(&self, user_id: &str);

    /// Average, across active windows, of `currentUsage / effectiveLimit`
    /// with tier assumed free-tier for system-load purposes; 0 if none.
    fn global_load(&self) -> f64;
}

type WindowKey = (String, LimitClass);

/// In-memory [`RateLimiterService`], sharded by `dashmap` with one
/// `parking_lot::Mutex` per window — the two-level locking discipline of
/// the design notes without a single global `RwLock` becoming a
/// contention point.
pub struct RateLimiterServiceImpl<Met: MetricsSink> {
    windows: DashMap<WindowKey, Mutex<SlidingWindow>>,
    policies: RateLimiterPolicies,
    multipliers: TierMultipliers,
    metrics: Arc<Met>,
}

impl<Met: MetricsSink> RateLimiterServiceImpl<Met> {
    pub fn new(policies: RateLimiterPolicies, multipliers: TierMultipliers, metrics: Arc<Met>) -> Self {
        Self {
            windows: DashMap::new(),
            policies,
            multipliers,
            metrics,
        }
    }

    fn effective_limit(&self, class: LimitClass, tier: Tier) -> u32 {
        self.policies
            .for_class(class)
            .effective_limit(tier.multiplier(&self.multipliers))
    }
}

#[async_trait]
impl<Met: MetricsSink> RateLimiterService for RateLimiterServiceImpl<Met> {
    async fn check_limit(&self, user_id: &str, class: LimitClass, tier: Tier) -> bool {
        self.metrics
            .inc_counter("rate_limit_checks_total", &[user_id, class.label()]);

        let limit = self.effective_limit(class, tier);
        if limit == 0 {
            return false;
        }
        let now = Utc::now();
        let policy = self.policies.for_class(class);
        let key = (user_id.to_string(), class);
        match self.windows.get(&key) {
            Some(entry) => {
                let mut window = entry.lock();
                window.purge(now, policy.window);
                window.current_usage() < limit as usize
            }
            None => true,
        }
    }

    async fn consume_limit(
        &self,
        user_id: &str,
        class: LimitClass,
        tier: Tier,
    ) -> Result<(), RateLimiterError> {
        let limit = self.effective_limit(class, tier);
        let now = Utc::now();
        let policy = self.policies.for_class(class);
        let key = (user_id.to_string(), class);

        let entry = self
            .windows
            .entry(key)
            .or_insert_with(|| Mutex::new(SlidingWindow::new()));
        let mut window = entry.lock();
        window.purge(now, policy.window);

        if limit == 0 || window.current_usage() >= limit as usize {
            self.metrics
                .inc_counter("rate_limit_violations_total", &[user_id, class.label()]);
            let reset_at = window.reset_time(now, policy.window);
            drop(window);
            tracing::warn!(user = user_id, class = class.label(), "rate limit exceeded");
            return Err(RateLimiterError::LimitExceeded { class, reset_at });
        }

        window.record(now);
        drop(window);
        self.metrics
            .inc_counter("rate_limit_allowed_total", &[user_id, class.label()]);
        tracing::debug!(user = user_id, class = class.label(), "request admitted");
        Ok(())
    }

    fn current_usage(&self, user_id: &str, class: LimitClass) -> u32 {
        let key = (user_id.to_string(), class);
        match self.windows.get(&key) {
            Some(entry) => {
                let mut window = entry.lock();
                window.purge(Utc::now(), self.policies.for_class(class).window);
                window.current_usage() as u32
            }
            None => 0,
        }
    }

    fn remaining(&self, user_id: &str, class: LimitClass, tier: Tier) -> u32 {
        let limit = self.effective_limit(class, tier);
        limit.saturating_sub(self.current_usage(user_id, class))
    }

    fn reset_time(&self, user_id: &str, class: LimitClass) -> DateTime<Utc> {
        let now = Utc::now();
        let key = (user_id.to_string(), class);
        let policy = self.policies.for_class(class);
        match self.windows.get(&key) {
            Some(entry) => {
                let mut window = entry.lock();
                window.purge(now, policy.window);
                window.reset_time(now, policy.window)
            }
            None => now,
        }
    }

    fn reset_user(&self, user_id: &str) {
        for class in LimitClass::ALL {
            self.windows.remove(&(user_id.to_string(), class));
        }
    }

    fn global_load(&self) -> f64 {
        let mut total = 0.0;
        let mut count = 0usize;
        let now = Utc::now();
        for entry in self.windows.iter() {
            let (_, class) = entry.key();
            let policy = self.policies.for_class(*class);
            let mut window = entry.value().lock();
            window.purge(now, policy.window);
            let limit = policy.effective_limit(1);
            if limit == 0 {
                continue;
            }
            total += window.current_usage() as f64 / limit as f64;
            count += 1;
        }
        if count == 0 {
            0.0
        } else {
            total / count as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::metrics::NoopMetricsSink;
    use std::time::Duration;
    use test_case::test_case;

    fn limiter() -> RateLimiterServiceImpl<NoopMetricsSink> {
        let policies = RateLimiterPolicies {
            command: LimitPolicy::new(5, Duration::from_secs(1)),
            ..RateLimiterPolicies::default()
        };
        RateLimiterServiceImpl::new(policies, TierMultipliers::default(), Arc::new(NoopMetricsSink))
    }

    #[tokio::test]
    async fn five_rapid_calls_succeed_sixth_denied() {
        let limiter = limiter();
        for _ in 0..5 {
            limiter
                .consume_limit("u1", LimitClass::Command, Tier::Free)
                .await
                .expect("within limit");
        }
        let err = limiter
            .consume_limit("u1", LimitClass::Command, Tier::Free)
            .await
            .unwrap_err();
        assert!(matches!(err, RateLimiterError::LimitExceeded { .. }));
    }

    #[tokio::test]
    async fn window_expiry_allows_next_call() {
        let limiter = limiter();
        for _ in 0..5 {
            limiter
                .consume_limit("u1", LimitClass::Command, Tier::Free)
                .await
                .unwrap();
        }
        tokio::time::sleep(Duration::from_millis(1010)).await;
        assert!(limiter
            .consume_limit("u1", LimitClass::Command, Tier::Free)
            .await
            .is_ok());
    }

    #[test_case(Tier::Free, 5; "free tier base limit")]
    #[test_case(Tier::Coffee, 10; "coffee tier doubles")]
    #[test_case(Tier::Cake, 20; "cake tier quadruples")]
    #[test_case(Tier::Sponsor, 50; "sponsor tier 10x")]
    #[tokio::test]
    async fn tier_multiplier_scales_effective_limit(tier: Tier, expected_allowed: u32) {
        let limiter = limiter();
        let mut allowed = 0;
        for _ in 0..(expected_allowed + 5) {
            if limiter
                .consume_limit("u1", LimitClass::Command, tier)
                .await
                .is_ok()
            {
                allowed += 1;
            }
        }
        assert_eq!(allowed, expected_allowed);
    }

    #[tokio::test]
    async fn check_limit_does_not_record() {
        let limiter = limiter();
        assert!(limiter.check_limit("u1", LimitClass::Command, Tier::Free).await);
        assert_eq!(limiter.current_usage("u1", LimitClass::Command), 0);
    }

    #[tokio::test]
    async fn reset_user_clears_all_classes() {
        let limiter = limiter();
        limiter
            .consume_limit("u1", LimitClass::Command, Tier::Free)
            .await
            .unwrap();
        limiter.reset_user("u1");
        assert_eq!(limiter.current_usage("u1", LimitClass::Command), 0);
    }

    #[tokio::test]
    async fn global_load_is_zero_with_no_windows() {
        let limiter = limiter();
        assert_eq!(limiter.global_load(), 0.0);
    }

    #[tokio::test]
    async fn global_load_reflects_average_usage_ratio() {
        let limiter = limiter();
        for _ in 0..5 {
            limiter
                .consume_limit("u1", LimitClass::Command, Tier::Free)
                .await
                .unwrap();
        }
        assert!((limiter.global_load() - 1.0).abs() < 0.01);
    }
}
