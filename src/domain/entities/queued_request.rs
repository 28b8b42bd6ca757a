//! A single queued request awaiting dispatch.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{LimitClass, Priority};

/// Default retry ceiling applied when a builder does not override it.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// An inbound request sitting in a user's queue.
///
/// `process_at` models delayed visibility: a request is not eligible for
/// dispatch until `now >= process_at`, which is how retries get their
/// backoff without a separate delay-queue data structure. The handler that
/// actually performs the work is not part of this entity — it is supplied
/// to the queue service once, not per request, since this core's dispatcher
/// is uniform across a user's requests (see
/// [`crate::application::services::queue_service`]).
#[derive(Debug, Clone)]
pub struct QueuedRequest {
    id: Uuid,
    pub user_id: String,
    pub class: LimitClass,
    pub priority: Priority,
    pub payload: Vec<u8>,
    created_at: DateTime<Utc>,
    process_at: DateTime<Utc>,
    retry_count: u32,
    max_retries: u32,
}

impl QueuedRequest {
    pub fn builder(user_id: impl Into<String>, class: LimitClass, payload: Vec<u8>) -> QueuedRequestBuilder {
        QueuedRequestBuilder::new(user_id, class, payload)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn process_at(&self) -> DateTime<Utc> {
        self.process_at
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Whether this request is visible for dispatch at `now`.
    pub fn is_ready(&self, now: DateTime<Utc>) -> bool {
        now >= self.process_at
    }

    /// Whether another retry is permitted.
    pub fn can_retry(&self) -> bool {
        self.retry_count < self.max_retries
    }

    /// Reschedule this request after a failed attempt, deferring visibility
    /// until `next_process_at`. Returns `None` once `max_retries` is spent;
    /// the caller is expected to dead-letter or drop at that point.
    pub fn retry(mut self, next_process_at: DateTime<Utc>) -> Option<Self> {
        if !self.can_retry() {
            return None;
        }
        self.retry_count += 1;
        self.process_at = next_process_at.max(self.created_at);
        Some(self)
    }

    /// Age of this request relative to `now`, used by the queue's selector
    /// to break priority ties in favor of the oldest waiter.
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.created_at
    }
}

/// Builder enforcing `QueuedRequest`'s invariants at construction time:
/// `process_at >= created_at`, `retry_count <= max_retries`.
pub struct QueuedRequestBuilder {
    user_id: String,
    class: LimitClass,
    payload: Vec<u8>,
    priority: Priority,
    created_at: Option<DateTime<Utc>>,
    delay: Option<chrono::Duration>,
    max_retries: u32,
}

impl QueuedRequestBuilder {
    fn new(user_id: impl Into<String>, class: LimitClass, payload: Vec<u8>) -> Self {
        Self {
            user_id: user_id.into(),
            class,
            payload,
            priority: Priority::default(),
            created_at: None,
            delay: None,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Delay initial visibility by `delay` past `created_at`.
    pub fn delay(mut self, delay: chrono::Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn build(self, now: DateTime<Utc>) -> QueuedRequest {
        let created_at = self.created_at.unwrap_or(now);
        let process_at = created_at + self.delay.unwrap_or_else(chrono::Duration::zero);
        QueuedRequest {
            id: Uuid::new_v4(),
            user_id: self.user_id,
            class: self.class,
            priority: self.priority,
            payload: self.payload,
            created_at,
            process_at,
            retry_count: 0,
            max_retries: self.max_retries,
        }
    }
}
