//! A bounded per-user collection of queued requests.

use chrono::{DateTime, Utc};

use super::QueuedRequest;

/// Default cap on requests a single user may have in flight at once.
pub const DEFAULT_MAX_QUEUE_SIZE: usize = 50;

/// Raised when a push would exceed `max_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFullError;

/// One user's queued requests, capped at `max_size`.
///
/// The global scheduler (see [`crate::application::services::queue_service`])
/// holds one `UserQueue` per user and picks across all of them by priority
/// then age; this type only enforces the per-user bound and exposes the
/// ready-to-dispatch subset.
#[derive(Debug, Clone)]
pub struct UserQueue {
    requests: Vec<QueuedRequest>,
    max_size: usize,
}

impl UserQueue {
    pub fn new(max_size: usize) -> Self {
        Self {
            requests: Vec::new(),
            max_size,
        }
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.requests.len() >= self.max_size
    }

    pub fn push(&mut self, request: QueuedRequest) -> Result<(), QueueFullError> {
        if self.is_full() {
            return Err(QueueFullError);
        }
        self.requests.push(request);
        Ok(())
    }

    /// Remove and return the request with the given id, if present.
    pub fn remove(&mut self, id: uuid::Uuid) -> Option<QueuedRequest> {
        let idx = self.requests.iter().position(|r| r.id() == id)?;
        Some(self.requests.remove(idx))
    }

    /// Requests currently eligible for dispatch (`process_at <= now`).
    pub fn ready(&self, now: DateTime<Utc>) -> impl Iterator<Item = &QueuedRequest> {
        self.requests.iter().filter(move |r| r.is_ready(now))
    }

    /// The best candidate for dispatch: highest priority, then oldest.
    ///
    /// This mirrors the global selector's tie-break rule at the per-user
    /// level, so the queue service can use the same comparison twice:
    /// once to pick a user's best request, once to pick the best across
    /// users.
    pub fn best_candidate(&self, now: DateTime<Utc>) -> Option<&QueuedRequest> {
        self.ready(now).max_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then_with(|| b.age(now).cmp(&a.age(now)))
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &QueuedRequest> {
        self.requests.iter()
    }
}

impl Default for UserQueue {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_QUEUE_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{LimitClass, Priority};

    #[test]
    fn push_rejects_once_full() {
        let mut q = UserQueue::new(1);
        let now = Utc::now();
        q.push(QueuedRequest::builder("u1", LimitClass::Command, vec![]).build(now)).unwrap();
        let overflow = QueuedRequest::builder("u1", LimitClass::Command, vec![]).build(now);
        assert_eq!(q.push(overflow), Err(QueueFullError));
    }

    #[test]
    fn best_candidate_prefers_higher_priority() {
        let mut q = UserQueue::default();
        let now = Utc::now();
        let low = QueuedRequest::builder("u1", LimitClass::Command, vec![]).priority(Priority::Low).build(now);
        let urgent = QueuedRequest::builder("u1", LimitClass::Command, vec![]).priority(Priority::Urgent).build(now);
        q.push(low).unwrap();
        q.push(urgent.clone()).unwrap();
        assert_eq!(q.best_candidate(now).unwrap().id(), urgent.id());
    }

    #[test]
    fn best_candidate_breaks_ties_by_age() {
        let mut q = UserQueue::default();
        let now = Utc::now();
        let older = QueuedRequest::builder("u1", LimitClass::Command, vec![])
            .created_at(now - chrono::Duration::seconds(10))
            .build(now - chrono::Duration::seconds(10));
        let newer = QueuedRequest::builder("u1", LimitClass::Command, vec![]).build(now);
        q.push(newer).unwrap();
        q.push(older.clone()).unwrap();
        assert_eq!(q.best_candidate(now).unwrap().id(), older.id());
    }

    #[test]
    fn best_candidate_ignores_not_yet_ready() {
        let mut q = UserQueue::default();
        let now = Utc::now();
        let delayed = QueuedRequest::builder("u1", LimitClass::Command, vec![])
            .delay(chrono::Duration::seconds(60))
            .build(now);
        q.push(delayed).unwrap();
        assert!(q.best_candidate(now).is_none());
    }

    #[test]
    fn remove_drops_matching_request() {
        let mut q = UserQueue::default();
        let now = Utc::now();
        let req = QueuedRequest::builder("u1", LimitClass::Command, vec![]).build(now);
        let id = req.id();
        q.push(req).unwrap();
        assert!(q.remove(id).is_some());
        assert!(q.is_empty());
    }
}
