//! A bounded ring of recent outbound call instants, for rate-trend estimation.

use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, Utc};

/// Default capacity: enough samples to smooth over bursts without growing
/// unbounded for a chatty user.
pub const DEFAULT_CAPACITY: usize = 100;

/// A bounded, FIFO ring of recent outbound-call timestamps for one user.
///
/// Used by the monitor to estimate "time to limit" from the user's own
/// recent call rate, independent of what the remote API's headers say.
#[derive(Debug, Clone)]
pub struct RequestHistory {
    samples: VecDeque<DateTime<Utc>>,
    capacity: usize,
}

impl RequestHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    pub fn record(&mut self, at: DateTime<Utc>) {
        if self.samples.len() >= self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(at);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// The most recent recorded sample, if any.
    pub fn last(&self) -> Option<DateTime<Utc>> {
        self.samples.back().copied()
    }

    /// Whether the most recent sample (if any) is older than `max_age`.
    /// An empty history is always considered stale.
    pub fn is_stale(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        let cutoff = now - chrono::Duration::from_std(max_age).unwrap_or_default();
        match self.last() {
            Some(last) => last <= cutoff,
            None => true,
        }
    }

    /// Observed calls per second over the last `window`, as of `now`.
    ///
    /// Per §4.2: `rate = |{t : now - t < window}| / window.seconds` — the
    /// count of in-window samples divided by the window length, not the
    /// span between the oldest and newest sample. `None` when the window
    /// holds no samples at all: there is nothing to rate.
    pub fn rate_per_second(&self, now: DateTime<Utc>, window: Duration) -> Option<f64> {
        let cutoff = now - chrono::Duration::from_std(window).unwrap_or_default();
        let count = self.samples.iter().filter(|t| **t > cutoff).count();
        if count == 0 {
            return None;
        }
        Some(count as f64 / window.as_secs_f64())
    }
}

impl Default for RequestHistory {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
