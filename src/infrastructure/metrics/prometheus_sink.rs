//! Prometheus-backed [`super::MetricsSink`].

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, GaugeVec, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};

use super::MetricsSink;

const NAMESPACE: &str = "gitbot_traffic";

static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_all(&registry);
    registry
});

static COMMANDS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("commands_total", "Total inbound commands").namespace(NAMESPACE),
        &["user", "command", "status"],
    )
    .expect("commands_total")
});

static COMMAND_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("command_duration_seconds", "Command handling latency")
            .namespace(NAMESPACE)
            .buckets(vec![0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 30.0]),
        &["command", "status"],
    )
    .expect("command_duration_seconds")
});

static RATE_LIMIT_VIOLATIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("rate_limit_violations_total", "Rate limit denials").namespace(NAMESPACE),
        &["user", "class"],
    )
    .expect("rate_limit_violations_total")
});

static RATE_LIMIT_CHECKS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("rate_limit_checks_total", "Rate limit checks performed").namespace(NAMESPACE),
        &["user", "class"],
    )
    .expect("rate_limit_checks_total")
});

static RATE_LIMIT_ALLOWED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("rate_limit_allowed_total", "Rate limit admits").namespace(NAMESPACE),
        &["user", "class"],
    )
    .expect("rate_limit_allowed_total")
});

static QUEUE_DEPTH: Lazy<GaugeVec> = Lazy::new(|| {
    GaugeVec::new(
        Opts::new("queue_depth", "Current per-user queue depth").namespace(NAMESPACE),
        &["user"],
    )
    .expect("queue_depth")
});

static QUEUED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("queued_total", "Queue outcomes by class").namespace(NAMESPACE),
        &["user", "class", "outcome"],
    )
    .expect("queued_total")
});

static QUEUE_PROCESSING_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("queue_processing_seconds", "Handler invocation latency")
            .namespace(NAMESPACE)
            .buckets(vec![0.01, 0.1, 0.5, 1.0, 5.0, 30.0, 60.0, 300.0]),
        &["class"],
    )
    .expect("queue_processing_seconds")
});

static REMOTE_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("remote_requests_total", "Outbound remote API calls").namespace(NAMESPACE),
        &["user", "api_type", "endpoint", "status"],
    )
    .expect("remote_requests_total")
});

static REMOTE_REQUEST_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("remote_request_seconds", "Remote API call latency")
            .namespace(NAMESPACE)
            .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0]),
        &["api_type", "endpoint", "status"],
    )
    .expect("remote_request_seconds")
});

static REMOTE_RATE_LIMIT_REMAINING: Lazy<GaugeVec> = Lazy::new(|| {
    GaugeVec::new(
        Opts::new("remote_rate_limit_remaining", "Remote quota remaining").namespace(NAMESPACE),
        &["user", "api_type"],
    )
    .expect("remote_rate_limit_remaining")
});

static REMOTE_RATE_LIMIT_RESET: Lazy<GaugeVec> = Lazy::new(|| {
    GaugeVec::new(
        Opts::new("remote_rate_limit_reset", "Remote quota reset, unix seconds")
            .namespace(NAMESPACE),
        &["user", "api_type"],
    )
    .expect("remote_rate_limit_reset")
});

static ACTIVE_USERS: Lazy<GaugeVec> = Lazy::new(|| {
    GaugeVec::new(
        Opts::new("active_users", "Users with at least one active window or queue entry")
            .namespace(NAMESPACE),
        &[] as &[&str],
    )
    .expect("active_users")
});

static SYSTEM_LOAD_FACTOR: Lazy<GaugeVec> = Lazy::new(|| {
    GaugeVec::new(
        Opts::new("system_load_factor", "Average rate limiter load across users")
            .namespace(NAMESPACE),
        &[] as &[&str],
    )
    .expect("system_load_factor")
});

fn register_all(registry: &Registry) {
    registry.register(Box::new(COMMANDS_TOTAL.clone())).expect("register commands_total");
    registry
        .register(Box::new(COMMAND_DURATION_SECONDS.clone()))
        .expect("register command_duration_seconds");
    registry
        .register(Box::new(RATE_LIMIT_VIOLATIONS_TOTAL.clone()))
        .expect("register rate_limit_violations_total");
    registry
        .register(Box::new(RATE_LIMIT_CHECKS_TOTAL.clone()))
        .expect("register rate_limit_checks_total");
    registry
        .register(Box::new(RATE_LIMIT_ALLOWED_TOTAL.clone()))
        .expect("register rate_limit_allowed_total");
    registry.register(Box::new(QUEUE_DEPTH.clone())).expect("register queue_depth");
    registry.register(Box::new(QUEUED_TOTAL.clone())).expect("register queued_total");
    registry
        .register(Box::new(QUEUE_PROCESSING_SECONDS.clone()))
        .expect("register queue_processing_seconds");
    registry
        .register(Box::new(REMOTE_REQUESTS_TOTAL.clone()))
        .expect("register remote_requests_total");
    registry
        .register(Box::new(REMOTE_REQUEST_SECONDS.clone()))
        .expect("register remote_request_seconds");
    registry
        .register(Box::new(REMOTE_RATE_LIMIT_REMAINING.clone()))
        .expect("register remote_rate_limit_remaining");
    registry
        .register(Box::new(REMOTE_RATE_LIMIT_RESET.clone()))
        .expect("register remote_rate_limit_reset");
    registry.register(Box::new(ACTIVE_USERS.clone())).expect("register active_users");
    registry
        .register(Box::new(SYSTEM_LOAD_FACTOR.clone()))
        .expect("register system_load_factor");
}

/// Renders the registry in Prometheus text exposition format, for `GET /metrics`.
pub fn gather() -> String {
    let encoder = TextEncoder::new();
    let families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&families, &mut buffer).expect("metrics encode");
    String::from_utf8(buffer).expect("metrics are valid utf-8")
}

/// [`MetricsSink`] backed by the process-wide Prometheus registry.
///
/// Unknown metric names are logged and dropped rather than panicking: a
/// typo in a call site should not take down the caller.
#[derive(Debug, Default, Clone, Copy)]
pub struct PrometheusMetricsSink;

impl PrometheusMetricsSink {
    pub fn new() -> Self {
        Lazy::force(&REGISTRY);
        Self
    }
}

impl MetricsSink for PrometheusMetricsSink {
    fn inc_counter(&self, name: &str, labels: &[&str]) {
        match name {
            "commands_total" => COMMANDS_TOTAL.with_label_values(labels).inc(),
            "rate_limit_violations_total" => {
                RATE_LIMIT_VIOLATIONS_TOTAL.with_label_values(labels).inc()
            }
            "rate_limit_checks_total" => RATE_LIMIT_CHECKS_TOTAL.with_label_values(labels).inc(),
            "rate_limit_allowed_total" => {
                RATE_LIMIT_ALLOWED_TOTAL.with_label_values(labels).inc()
            }
            "queued_total" => QUEUED_TOTAL.with_label_values(labels).inc(),
            "remote_requests_total" => REMOTE_REQUESTS_TOTAL.with_label_values(labels).inc(),
            other => tracing::warn!(metric = other, "inc_counter on unknown series"),
        }
    }

    fn observe_histogram(&self, name: &str, labels: &[&str], value: f64) {
        match name {
            "command_duration_seconds" => {
                COMMAND_DURATION_SECONDS.with_label_values(labels).observe(value)
            }
            "queue_processing_seconds" => {
                QUEUE_PROCESSING_SECONDS.with_label_values(labels).observe(value)
            }
            "remote_request_seconds" => {
                REMOTE_REQUEST_SECONDS.with_label_values(labels).observe(value)
            }
            other => tracing::warn!(metric = other, "observe_histogram on unknown series"),
        }
    }

    fn set_gauge(&self, name: &str, labels: &[&str], value: f64) {
        match name {
            "queue_depth" => QUEUE_DEPTH.with_label_values(labels).set(value),
            "remote_rate_limit_remaining" => {
                REMOTE_RATE_LIMIT_REMAINING.with_label_values(labels).set(value)
            }
            "remote_rate_limit_reset" => {
                REMOTE_RATE_LIMIT_RESET.with_label_values(labels).set(value)
            }
            "active_users" => ACTIVE_USERS.with_label_values(labels).set(value),
            "system_load_factor" => SYSTEM_LOAD_FACTOR.with_label_values(labels).set(value),
            other => tracing::warn!(metric = other, "set_gauge on unknown series"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_does_not_panic() {
        let sink = PrometheusMetricsSink::new();
        sink.inc_counter("commands_total", &["u1", "ping", "ok"]);
        sink.set_gauge("queue_depth", &["u1"], 3.0);
        let text = gather();
        assert!(text.contains("commands_total"));
    }

    #[test]
    fn unknown_series_does_not_panic() {
        let sink = PrometheusMetricsSink::new();
        sink.inc_counter("not_a_real_metric", &[]);
    }
}
