//! Remote-API Monitor Service
//!
//! Parses rate-limit headers from remote responses, tracks per-user
//! remaining budget and reset time, and advises when requests should be
//! delayed or queued. Observation-only: per §4.2/§7 this service never
//! returns a `Result` — header-parse failures are logged and swallowed.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderMap;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;

use crate::domain::{ApiType, RateLimitInfo, RequestHistory};
use crate::infrastructure::metrics::MetricsSink;
use crate::infrastructure::remote::parse_rate_limit_headers;

/// Thresholds and history size from the configuration surface (§6).
#[derive(Debug, Clone, Copy)]
pub struct MonitorSettings {
    pub warning_threshold: f64,
    pub critical_threshold: f64,
    pub history_size: usize,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            warning_threshold: 0.8,
            critical_threshold: 0.9,
            history_size: 100,
        }
    }
}

/// Metadata about a completed remote-API call, as observed by the caller.
///
/// `headers` carries the response headers if the call produced one at all
/// (a transport-level failure never does); `Monitor::track_request` only
/// attempts header parsing when this is `Some`.
pub struct RemoteCallOutcome<'a> {
    pub status: Option<u16>,
    pub headers: Option<&'a HeaderMap>,
    pub error: Option<&'a str>,
}

/// Aggregate stats for one API type, for `globalApiStats`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ApiStats {
    pub users: u32,
    pub average_usage: f64,
    pub warning_count: u32,
    pub critical_count: u32,
}

/// Remote-API Monitor public contract (§4.2).
#[async_trait::async_trait]
pub trait RemoteApiMonitor: Send + Sync {
    async fn track_request(
        &self,
        user_id: &str,
        api_type: ApiType,
        endpoint: &str,
        started_at: DateTime<Utc>,
        outcome: &RemoteCallOutcome<'_>,
    );

    fn rate_limit_info(&self, user_id: &str, api_type: ApiType) -> Option<RateLimitInfo>;
    fn is_approaching(&self, user_id: &str, api_type: ApiType, threshold: f64) -> bool;
    fn estimate_time_to_limit(&self, user_id: &str, api_type: ApiType) -> Duration;
    fn should_queue(&self, user_id: &str, api_type: ApiType) -> bool;
    fn suggested_delay(&self, user_id: &str, api_type: ApiType) -> Duration;
    fn global_api_stats(&self) -> HashMap<ApiType, ApiStats>;
}

struct MonitorEntry {
    info: Option<RateLimitInfo>,
    history: RequestHistory,
}

type MonitorKey = (String, ApiType);

/// In-memory [`RemoteApiMonitor`], one entry per (user, api type).
pub struct RemoteApiMonitorImpl<Met: MetricsSink> {
    entries: DashMap<MonitorKey, Mutex<MonitorEntry>>,
    settings: MonitorSettings,
    metrics: Arc<Met>,
}

impl<Met: MetricsSink> RemoteApiMonitorImpl<Met> {
    pub fn new(settings: MonitorSettings, metrics: Arc<Met>) -> Self {
        Self {
            entries: DashMap::new(),
            settings,
            metrics,
        }
    }

    /// Periodic maintenance sweep (§4.2 cleanup rule): drop histories with
    /// no sample in the last 24h and rate-limit infos whose `resetAt` is
    /// more than 1h in the past.
    pub fn cleanup(&self, now: DateTime<Utc>) {
        let history_max_age = Duration::from_secs(24 * 3600);
        let reset_grace_period = chrono::Duration::hours(1);
        self.entries.retain(|_, entry| {
            let mut e = entry.lock();
            if let Some(info) = e.info {
                if now - info.reset_at > reset_grace_period {
                    e.info = None;
                }
            }
            let history_is_stale = e.history.is_stale(now, history_max_age);
            !(history_is_stale && e.info.is_none())
        });
    }
}

#[async_trait::async_trait]
impl<Met: MetricsSink> RemoteApiMonitor for RemoteApiMonitorImpl<Met> {
    async fn track_request(
        &self,
        user_id: &str,
        api_type: ApiType,
        endpoint: &str,
        started_at: DateTime<Utc>,
        outcome: &RemoteCallOutcome<'_>,
    ) {
        let now = Utc::now();
        let status_label = outcome
            .status
            .map(|s| s.to_string())
            .unwrap_or_else(|| "error".to_string());

        self.metrics.inc_counter(
            "remote_requests_total",
            &[user_id, api_type.label(), endpoint, &status_label],
        );
        self.metrics.observe_histogram(
            "remote_request_seconds",
            &[api_type.label(), endpoint, &status_label],
            (now - started_at).num_milliseconds() as f64 / 1000.0,
        );

        if let Some(err) = outcome.error {
            tracing::debug!(user = user_id, api_type = api_type.label(), error = err, "remote call failed");
        }

        let key = (user_id.to_string(), api_type);
        let entry = self
            .entries
            .entry(key)
            .or_insert_with(|| Mutex::new(MonitorEntry {
                info: None,
                history: RequestHistory::new(self.settings.history_size),
            }));
        let mut e = entry.lock();
        e.history.record(now);

        let Some(headers) = outcome.headers else { return };
        match parse_rate_limit_headers(headers, api_type, now) {
            Some(info) => {
                self.metrics.set_gauge(
                    "remote_rate_limit_remaining",
                    &[user_id, api_type.label()],
                    info.remaining as f64,
                );
                self.metrics.set_gauge(
                    "remote_rate_limit_reset",
                    &[user_id, api_type.label()],
                    info.reset_at.timestamp() as f64,
                );
                e.info = Some(info);
            }
            None => {
                tracing::error!(
                    user = user_id,
                    api_type = api_type.label(),
                    "remote response carried no parsable rate-limit headers"
                );
            }
        }
    }

    fn rate_limit_info(&self, user_id: &str, api_type: ApiType) -> Option<RateLimitInfo> {
        self.entries
            .get(&(user_id.to_string(), api_type))
            .and_then(|entry| entry.lock().info)
    }

    fn is_approaching(&self, user_id: &str, api_type: ApiType, threshold: f64) -> bool {
        self.rate_limit_info(user_id, api_type)
            .map(|info| info.is_approaching(threshold))
            .unwrap_or(false)
    }

    fn estimate_time_to_limit(&self, user_id: &str, api_type: ApiType) -> Duration {
        let Some(entry) = self.entries.get(&(user_id.to_string(), api_type)) else {
            return Duration::from_secs(3600);
        };
        let e = entry.lock();
        let Some(info) = e.info else {
            return Duration::from_secs(3600);
        };
        let now = Utc::now();
        let time_until_reset = info.time_until_reset(now);

        let rate = e.history.rate_per_second(now, Duration::from_secs(3600));
        let estimate = match rate {
            Some(r) if r > 0.0 => Duration::from_secs_f64(info.remaining as f64 / r),
            _ => return time_until_reset.to_std().unwrap_or(Duration::from_secs(3600)),
        };

        estimate.min(time_until_reset.to_std().unwrap_or(estimate))
    }

    fn should_queue(&self, user_id: &str, api_type: ApiType) -> bool {
        let critical = self.is_approaching(user_id, api_type, self.settings.critical_threshold);
        critical || self.estimate_time_to_limit(user_id, api_type) < Duration::from_secs(5 * 60)
    }

    fn suggested_delay(&self, user_id: &str, api_type: ApiType) -> Duration {
        if self.estimate_time_to_limit(user_id, api_type) < Duration::from_secs(5 * 60) {
            if let Some(info) = self.rate_limit_info(user_id, api_type) {
                return info.time_until_reset(Utc::now()).to_std().unwrap_or(Duration::ZERO);
            }
        }
        if self.is_approaching(user_id, api_type, self.settings.critical_threshold) {
            return Duration::from_secs(30);
        }
        if self.is_approaching(user_id, api_type, self.settings.warning_threshold) {
            return Duration::from_secs(10);
        }
        Duration::ZERO
    }

    fn global_api_stats(&self) -> HashMap<ApiType, ApiStats> {
        let mut stats: HashMap<ApiType, (u32, f64, u32, u32)> = HashMap::new();
        for entry in self.entries.iter() {
            let (_, api_type) = entry.key();
            let e = entry.value().lock();
            let Some(info) = e.info else { continue };
            let usage = info.usage_ratio();
            let bucket = stats.entry(*api_type).or_insert((0, 0.0, 0, 0));
            bucket.0 += 1;
            bucket.1 += usage;
            if usage >= self.settings.critical_threshold {
                bucket.3 += 1;
            } else if usage >= self.settings.warning_threshold {
                bucket.2 += 1;
            }
        }
        stats
            .into_iter()
            .map(|(api_type, (users, total_usage, warning_count, critical_count))| {
                let average_usage = if users == 0 { 0.0 } else { total_usage / users as f64 };
                (
                    api_type,
                    ApiStats {
                        users,
                        average_usage,
                        warning_count,
                        critical_count,
                    },
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::metrics::NoopMetricsSink;
    use axum::http::{HeaderName, HeaderValue};

    fn monitor() -> RemoteApiMonitorImpl<NoopMetricsSink> {
        RemoteApiMonitorImpl::new(MonitorSettings::default(), Arc::new(NoopMetricsSink))
    }

    fn rest_headers(limit: &str, remaining: &str, reset_secs_from_now: i64) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(HeaderName::from_static("x-ratelimit-limit"), HeaderValue::from_str(limit).unwrap());
        h.insert(HeaderName::from_static("x-ratelimit-remaining"), HeaderValue::from_str(remaining).unwrap());
        let reset_at = (Utc::now() + chrono::Duration::seconds(reset_secs_from_now)).timestamp();
        h.insert(HeaderName::from_static("x-ratelimit-reset"), HeaderValue::from_str(&reset_at.to_string()).unwrap());
        h
    }

    #[tokio::test]
    async fn ingests_headers_and_reports_approaching() {
        let m = monitor();
        let headers = rest_headers("5000", "4000", 3600);
        m.track_request(
            "u1",
            ApiType::Rest,
            "/repos",
            Utc::now(),
            &RemoteCallOutcome { status: Some(200), headers: Some(&headers), error: None },
        )
        .await;
        assert!(!m.is_approaching("u1", ApiType::Rest, 0.8));

        let headers2 = rest_headers("5000", "500", 3600);
        m.track_request(
            "u1",
            ApiType::Rest,
            "/repos",
            Utc::now(),
            &RemoteCallOutcome { status: Some(200), headers: Some(&headers2), error: None },
        )
        .await;
        assert!(m.is_approaching("u1", ApiType::Rest, 0.8));
        assert!(m.should_queue("u1", ApiType::Rest));
    }

    #[tokio::test]
    async fn missing_data_returns_conservative_defaults() {
        let m = monitor();
        assert!(!m.should_queue("nobody", ApiType::Rest));
        assert_eq!(m.suggested_delay("nobody", ApiType::Rest), Duration::ZERO);
        assert_eq!(m.estimate_time_to_limit("nobody", ApiType::Rest), Duration::from_secs(3600));
    }

    #[tokio::test]
    async fn non_remote_response_without_headers_is_skipped() {
        let m = monitor();
        m.track_request(
            "u1",
            ApiType::Rest,
            "/ping",
            Utc::now(),
            &RemoteCallOutcome { status: Some(200), headers: None, error: None },
        )
        .await;
        assert!(m.rate_limit_info("u1", ApiType::Rest).is_none());
    }
}
