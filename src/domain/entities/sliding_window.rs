//! Sliding-window request log for a single (user, class) pair.

use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, Utc};

/// The lifecycle state of a single window, per §4.1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowState {
    /// No timestamps currently in-window.
    Empty,
    /// Some, but fewer than the effective limit.
    Accumulating,
    /// Exactly at the effective limit; further consumes are denied.
    AtLimit,
}

/// An ordered sequence of request timestamps for one (user, class) pair.
///
/// Timestamps are kept in non-decreasing order, which is what lets `purge`
/// find the first live entry with a binary search instead of a linear scan.
/// This is the sliding-window-log algorithm: correct at window boundaries
/// (unlike a fixed-window counter, which allows a burst of `2x` requests
/// straddling a boundary), and simpler than a leaky bucket.
#[derive(Debug, Clone, Default)]
pub struct SlidingWindow {
    timestamps: VecDeque<DateTime<Utc>>,
}

impl SlidingWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop timestamps that are no longer within `window` of `now`.
    ///
    /// A timestamp exactly `window` old (`now - t == window`) is expired.
    /// Finds the first live index with a binary search over the
    /// non-decreasing sequence, then truncates the front in one slice —
    /// no per-element rebuild when everything is live or everything is
    /// expired.
    pub fn purge(&mut self, now: DateTime<Utc>, window: Duration) {
        if self.timestamps.is_empty() {
            return;
        }
        let cutoff = now - chrono::Duration::from_std(window).unwrap_or_default();

        // First index where timestamp > cutoff (i.e. still live).
        let mut lo = 0usize;
        let mut hi = self.timestamps.len();
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.timestamps[mid] > cutoff {
                hi = mid;
            } else {
                lo = mid + 1;
            }
        }

        if lo == 0 {
            return; // everything still live
        }
        self.timestamps.drain(..lo);
    }

    /// Count of timestamps currently within `window` of `now`.
    ///
    /// Callers are expected to `purge` first; `current_usage` does not purge
    /// itself so that read-only callers (`checkLimit`, `remaining`) can share
    /// one purge pass with the eventual `consume`.
    pub fn current_usage(&self) -> usize {
        self.timestamps.len()
    }

    /// Append `now` to the window. Caller must have already purged and
    /// checked capacity; this never rejects on its own.
    pub fn record(&mut self, now: DateTime<Utc>) {
        debug_assert!(
            self.timestamps.back().map_or(true, |&last| last <= now),
            "timestamps must stay non-decreasing"
        );
        self.timestamps.push_back(now);
    }

    /// When the oldest in-window timestamp will expire; `now` if empty.
    pub fn reset_time(&self, now: DateTime<Utc>, window: Duration) -> DateTime<Utc> {
        match self.timestamps.front() {
            Some(oldest) => *oldest + chrono::Duration::from_std(window).unwrap_or_default(),
            None => now,
        }
    }

    /// Whether the window has no entries newer than `now - max_age`.
    ///
    /// Used by the owning map to decide whether a window can be evicted
    /// (default `max_age` is 24h, per the data model's lifecycle rule).
    pub fn is_stale(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        let cutoff = now - chrono::Duration::from_std(max_age).unwrap_or_default();
        match self.timestamps.back() {
            Some(last) => *last <= cutoff,
            None => true,
        }
    }

    /// The state-machine classification of this window relative to
    /// `effective_limit`, per §4.1's per-window state machine.
    pub fn state(&self, effective_limit: u32) -> WindowState {
        let usage = self.current_usage() as u32;
        if usage == 0 {
            WindowState::Empty
        } else if usage >= effective_limit {
            WindowState::AtLimit
        } else {
            WindowState::Accumulating
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(offset_secs: i64) -> DateTime<Utc> {
        Utc::now() + chrono::Duration::seconds(offset_secs)
    }

    #[test]
    fn empty_window_has_zero_usage() {
        let w = SlidingWindow::new();
        assert_eq!(w.current_usage(), 0);
        assert_eq!(w.state(5), WindowState::Empty);
    }

    #[test]
    fn purge_drops_expired_entries_exactly_at_boundary() {
        let mut w = SlidingWindow::new();
        let now = Utc::now();
        // Exactly `window` old: expired per spec's boundary rule.
        w.record(now - chrono::Duration::seconds(60));
        w.record(now - chrono::Duration::seconds(30));
        w.purge(now, Duration::from_secs(60));
        assert_eq!(w.current_usage(), 1);
    }

    #[test]
    fn purge_keeps_all_when_nothing_expired() {
        let mut w = SlidingWindow::new();
        let now = Utc::now();
        w.record(now - chrono::Duration::seconds(1));
        w.record(now);
        w.purge(now, Duration::from_secs(60));
        assert_eq!(w.current_usage(), 2);
    }

    #[test]
    fn purge_empties_when_all_expired() {
        let mut w = SlidingWindow::new();
        let now = Utc::now();
        w.record(now - chrono::Duration::seconds(120));
        w.record(now - chrono::Duration::seconds(90));
        w.purge(now, Duration::from_secs(60));
        assert_eq!(w.current_usage(), 0);
        assert_eq!(w.state(5), WindowState::Empty);
    }

    #[test]
    fn reset_time_is_now_when_empty() {
        let w = SlidingWindow::new();
        let now = Utc::now();
        assert_eq!(w.reset_time(now, Duration::from_secs(60)), now);
    }

    #[test]
    fn reset_time_tracks_oldest_entry() {
        let mut w = SlidingWindow::new();
        let now = Utc::now();
        let oldest = now - chrono::Duration::seconds(10);
        w.record(oldest);
        w.record(now);
        let expected = oldest + chrono::Duration::seconds(60);
        assert_eq!(w.reset_time(now, Duration::from_secs(60)), expected);
    }

    #[test]
    fn state_machine_transitions() {
        let mut w = SlidingWindow::new();
        let now = Utc::now();
        assert_eq!(w.state(2), WindowState::Empty);
        w.record(now);
        assert_eq!(w.state(2), WindowState::Accumulating);
        w.record(now);
        assert_eq!(w.state(2), WindowState::AtLimit);
    }

    #[test]
    fn is_stale_after_max_age() {
        let mut w = SlidingWindow::new();
        let now = Utc::now();
        w.record(now - chrono::Duration::hours(25));
        assert!(w.is_stale(now, Duration::from_secs(24 * 3600)));
    }

    #[test]
    fn not_stale_within_max_age() {
        let mut w = SlidingWindow::new();
        let now = Utc::now();
        w.record(now - chrono::Duration::hours(1));
        assert!(!w.is_stale(now, Duration::from_secs(24 * 3600)));
    }

    #[test]
    fn empty_window_is_always_stale() {
        let w = SlidingWindow::new();
        assert!(w.is_stale(Utc::now(), Duration::from_secs(24 * 3600)));
    }
}
