//! [`super::MetricsSink`] test doubles.

use parking_lot::Mutex;

use super::MetricsSink;

/// Discards every call. Used where a sink is required but assertions on it
/// are not part of the test.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetricsSink;

impl MetricsSink for NoopMetricsSink {
    fn inc_counter(&self, _name: &str, _labels: &[&str]) {}
    fn observe_histogram(&self, _name: &str, _labels: &[&str], _value: f64) {}
    fn set_gauge(&self, _name: &str, _labels: &[&str], _value: f64) {}
}

/// One captured call into a [`RecordingMetricsSink`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedMetric {
    Counter { name: String, labels: Vec<String> },
    Histogram { name: String, labels: Vec<String>, value: f64 },
    Gauge { name: String, labels: Vec<String>, value: f64 },
}

/// Captures every call for assertions, in call order.
#[derive(Debug, Default)]
pub struct RecordingMetricsSink {
    calls: Mutex<Vec<RecordedMetric>>,
}

impl RecordingMetricsSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<RecordedMetric> {
        self.calls.lock().clone()
    }

    pub fn count_of(&self, name: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| match c {
                RecordedMetric::Counter { name: n, .. } => n == name,
                RecordedMetric::Histogram { name: n, .. } => n == name,
                RecordedMetric::Gauge { name: n, .. } => n == name,
            })
            .count()
    }
}

impl MetricsSink for RecordingMetricsSink {
    fn inc_counter(&self, name: &str, labels: &[&str]) {
        self.calls.lock().push(RecordedMetric::Counter {
            name: name.to_string(),
            labels: labels.iter().map(|s| s.to_string()).collect(),
        });
    }

    fn observe_histogram(&self, name: &str, labels: &[&str], value: f64) {
        self.calls.lock().push(RecordedMetric::Histogram {
            name: name.to_string(),
            labels: labels.iter().map(|s| s.to_string()).collect(),
            value,
        });
    }

    fn set_gauge(&self, name: &str, labels: &[&str], value: f64) {
        self.calls.lock().push(RecordedMetric::Gauge {
            name: name.to_string(),
            labels: labels.iter().map(|s| s.to_string()).collect(),
            value,
        });
    }
}
