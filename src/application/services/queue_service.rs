//! Request Queue Service
//!
//! A per-user bounded queue with priorities, delayed execution, retries
//! with exponential backoff, and worker-pool dispatch. See the
//! top-level-map-then-per-entry-lock discipline shared with
//! [`crate::application::services::rate_limiter_service`].

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::domain::services::BackoffCalculator;
use crate::domain::{LimitClass, Priority, QueuedRequest, UserQueue};
use crate::infrastructure::metrics::MetricsSink;
use crate::shared::error::QueueError;

/// Worker count, sizing, and timing knobs from the configuration surface (§6).
#[derive(Debug, Clone, Copy)]
pub struct QueueSettings {
    pub workers: usize,
    pub max_queue_size: usize,
    pub tick: Duration,
    pub retry_base_delay: Duration,
    pub cleanup_interval: Duration,
    pub handler_timeout: Duration,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            workers: 5,
            max_queue_size: 50,
            tick: Duration::from_millis(200),
            retry_base_delay: Duration::from_secs(30),
            cleanup_interval: Duration::from_secs(5 * 60),
            handler_timeout: Duration::from_secs(5 * 60),
        }
    }
}

/// The work a dispatched request performs. Supplied once to
/// [`RequestQueueImpl::start`], not per request: this core's dispatcher is
/// uniform across a user's requests, so the handler looks up whatever it
/// needs from `request.payload`/`request.class` itself.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn handle(&self, request: &QueuedRequest) -> Result<(), String>;
}

/// Per-user observability snapshot, for `userInfo`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UserQueueInfo {
    pub depth: usize,
    pub max_queue_size: usize,
}

/// Request Queue public contract (§4.3), excluding `start`/`stop`, which are
/// inherent methods on [`RequestQueueImpl`] — they need `Arc<Self>` to spawn
/// worker tasks and aren't part of the front-end-facing surface.
#[async_trait]
pub trait RequestQueue: Send + Sync {
    /// Adds to the owner's queue. Assigns defaults (`max_retries = 3`) if
    /// the request didn't set them explicitly.
    async fn enqueue(&self, request: QueuedRequest) -> Result<Uuid, QueueError>;

    fn depth(&self, user_id: &str) -> usize;

    /// Position among the user's own requests ordered by priority then
    /// age, or `None` if not found. `0` is next to be selected.
    fn position(&self, user_id: &str, request_id: Uuid) -> Option<usize>;

    fn cancel(&self, user_id: &str, request_id: Uuid) -> bool;

    fn user_info(&self, user_id: &str) -> UserQueueInfo;
}

type QueueKey = String;

/// In-memory [`RequestQueue`]. One `UserQueue` per user behind a
/// `parking_lot::Mutex`, sharded by `dashmap`, mirroring the rate
/// limiter's locking discipline.
pub struct RequestQueueImpl<Met: MetricsSink> {
    queues: DashMap<QueueKey, Mutex<UserQueue>>,
    settings: QueueSettings,
    metrics: Arc<Met>,
    active_users: AtomicUsize,
}

impl<Met: MetricsSink + 'static> RequestQueueImpl<Met> {
    pub fn new(settings: QueueSettings, metrics: Arc<Met>) -> Self {
        Self {
            queues: DashMap::new(),
            settings,
            metrics,
            active_users: AtomicUsize::new(0),
        }
    }

    /// Number of distinct users with a queue entry, including empty ones
    /// left behind until the next cleanup sweep.
    pub fn active_user_count(&self) -> usize {
        self.active_users.load(Ordering::Relaxed)
    }

    /// Spawns `settings.workers` dispatch tasks plus one cleanup task.
    /// Returns a handle whose `stop()` signals all of them to exit.
    pub fn start(self: &Arc<Self>, handler: Arc<dyn RequestHandler>) -> QueueHandle {
        let (stop_tx, stop_rx) = watch::channel(false);

        let mut workers = Vec::with_capacity(self.settings.workers);
        for worker_id in 0..self.settings.workers {
            let queue = Arc::clone(self);
            let handler = Arc::clone(&handler);
            let mut stop_rx = stop_rx.clone();
            workers.push(tokio::spawn(async move {
                tracing::info!(worker_id, "queue worker starting");
                loop {
                    tokio::select! {
                        _ = stop_rx.changed() => {
                            if *stop_rx.borrow() {
                                break;
                            }
                        }
                        _ = tokio::time::sleep(queue.settings.tick) => {
                            queue.dispatch_one(&handler).await;
                        }
                    }
                }
                tracing::info!(worker_id, "queue worker stopped");
            }));
        }

        let cleanup_queue = Arc::clone(self);
        let mut cleanup_stop_rx = stop_rx.clone();
        let cleanup = tokio::spawn(async move {
            let mut interval = tokio::time::interval(cleanup_queue.settings.cleanup_interval);
            loop {
                tokio::select! {
                    _ = cleanup_stop_rx.changed() => {
                        if *cleanup_stop_rx.borrow() {
                            break;
                        }
                    }
                    _ = interval.tick() => {
                        cleanup_queue.run_cleanup(Utc::now());
                    }
                }
            }
        });

        QueueHandle {
            stop_tx,
            workers,
            cleanup,
        }
    }

    /// Periodic sweep (§4.3 cleanup task): removes requests older than 1h
    /// that have exhausted `maxRetries`. Defensive — such entries should
    /// already have been removed on their final failed attempt.
    fn run_cleanup(&self, now: DateTime<Utc>) {
        let max_age = chrono::Duration::hours(1);
        let mut swept = 0usize;
        for entry in self.queues.iter() {
            let mut queue = entry.value().lock();
            let stale_ids: Vec<Uuid> = queue
                .iter()
                .filter(|r| now - r.created_at() > max_age && !r.can_retry())
                .map(|r| r.id())
                .collect();
            for id in stale_ids {
                queue.remove(id);
                swept += 1;
            }
        }
        if swept > 0 {
            tracing::info!(swept, "queue cleanup swept stale requests");
        }
    }

    /// Selects the single best candidate across all users (highest
    /// priority, then oldest), pops it from its owner's queue, and invokes
    /// the handler under a timeout. See module docs for the two-phase
    /// select-then-pop approach that keeps this race-safe without a
    /// global lock.
    async fn dispatch_one(&self, handler: &Arc<dyn RequestHandler>) {
        let now = Utc::now();
        let Some((user_id, request)) = self.select_and_pop(now) else {
            return;
        };

        self.metrics.set_gauge("queue_depth", &[&user_id], self.depth(&user_id) as f64);

        let handler = Arc::clone(handler);
        let request_for_task = request.clone();
        let task = tokio::spawn(async move { handler.handle(&request_for_task).await });

        let started = Utc::now();
        let outcome = tokio::time::timeout(self.settings.handler_timeout, task).await;
        let elapsed = (Utc::now() - started).num_milliseconds() as f64 / 1000.0;
        self.metrics
            .observe_histogram("queue_processing_seconds", &[request.class.label()], elapsed);

        match outcome {
            Ok(Ok(Ok(()))) => {
                self.metrics
                    .inc_counter("queued_total", &[&user_id, request.class.label(), "completed"]);
                tracing::debug!(user = %user_id, request_id = %request.id(), "request completed");
            }
            Ok(Ok(Err(err))) => {
                tracing::warn!(user = %user_id, request_id = %request.id(), error = %err, "handler failed");
                self.retry_or_drop(user_id, request);
            }
            Ok(Err(join_err)) => {
                tracing::error!(user = %user_id, request_id = %request.id(), error = %join_err, "handler panicked");
                self.retry_or_drop(user_id, request);
            }
            Err(_elapsed) => {
                tracing::warn!(user = %user_id, request_id = %request.id(), "handler timed out");
                self.retry_or_drop(user_id, request);
            }
        }
    }

    fn retry_or_drop(&self, user_id: String, request: QueuedRequest) {
        let now = Utc::now();
        let retry_count = request.retry_count() + 1;
        let class_label = request.class.label();
        match request.retry(BackoffCalculator::next_process_at(
            now,
            retry_count,
            self.settings.retry_base_delay,
        )) {
            Some(retried) => {
                self.metrics
                    .inc_counter("queued_total", &[&user_id, class_label, "retried"]);
                if let Some(entry) = self.queues.get(&user_id) {
                    // Best-effort: if the user's queue filled up in the meantime
                    // the retry is dropped rather than blocking the worker.
                    let _ = entry.value().lock().push(retried);
                }
            }
            None => {
                self.metrics
                    .inc_counter("queued_total", &[&user_id, class_label, "failed"]);
                tracing::warn!(user = %user_id, "request exhausted retries, dropping");
            }
        }
    }

    fn select_and_pop(&self, now: DateTime<Utc>) -> Option<(String, QueuedRequest)> {
        let mut best: Option<(String, Uuid, Priority, DateTime<Utc>)> = None;

        for entry in self.queues.iter() {
            let queue = entry.value().lock();
            let Some(candidate) = queue.best_candidate(now) else {
                continue;
            };
            let is_better = match &best {
                None => true,
                Some((_, _, priority, created_at)) => {
                    candidate.priority > *priority
                        || (candidate.priority == *priority && candidate.created_at() < *created_at)
                }
            };
            if is_better {
                best = Some((
                    entry.key().clone(),
                    candidate.id(),
                    candidate.priority,
                    candidate.created_at(),
                ));
            }
        }

        let (user_id, request_id, ..) = best?;
        let entry = self.queues.get(&user_id)?;
        let popped = entry.value().lock().remove(request_id)?;
        Some((user_id, popped))
    }
}

#[async_trait]
impl<Met: MetricsSink + 'static> RequestQueue for RequestQueueImpl<Met> {
    async fn enqueue(&self, request: QueuedRequest) -> Result<Uuid, QueueError> {
        let user_id = request.user_id.clone();
        let class_label = request.class.label();
        let id = request.id();

        let entry = self
            .queues
            .entry(user_id.clone())
            .or_insert_with(|| {
                self.active_users.fetch_add(1, Ordering::Relaxed);
                Mutex::new(UserQueue::new(self.settings.max_queue_size))
            });

        let mut queue = entry.lock();
        if queue.push(request).is_err() {
            self.metrics
                .inc_counter("queued_total", &[&user_id, class_label, "rejected_full"]);
            return Err(QueueError::FullQueue { user_id });
        }

        self.metrics
            .inc_counter("queued_total", &[&user_id, class_label, "queued"]);
        self.metrics.set_gauge("queue_depth", &[&user_id], queue.len() as f64);
        drop(queue);
        tracing::debug!(user = %user_id, request_id = %id, "request enqueued");
        Ok(id)
    }

    fn depth(&self, user_id: &str) -> usize {
        self.queues.get(user_id).map(|q| q.lock().len()).unwrap_or(0)
    }

    fn position(&self, user_id: &str, request_id: Uuid) -> Option<usize> {
        let entry = self.queues.get(user_id)?;
        let queue = entry.lock();
        let now = Utc::now();
        let mut ready: Vec<&QueuedRequest> = queue.ready(now).collect();
        ready.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| a.created_at().cmp(&b.created_at()))
        });
        ready.iter().position(|r| r.id() == request_id)
    }

    fn cancel(&self, user_id: &str, request_id: Uuid) -> bool {
        let Some(entry) = self.queues.get(user_id) else {
            return false;
        };
        let removed = entry.value().lock().remove(request_id);
        if let Some(request) = &removed {
            self.metrics
                .inc_counter("queued_total", &[user_id, request.class.label(), "cancelled"]);
        }
        removed.is_some()
    }

    fn user_info(&self, user_id: &str) -> UserQueueInfo {
        UserQueueInfo {
            depth: self.depth(user_id),
            max_queue_size: self.settings.max_queue_size,
        }
    }
}

/// Handle returned by [`RequestQueueImpl::start`]; `stop` signals every
/// worker and the cleanup task to exit and waits for in-flight handlers to
/// finish or hit their timeout.
pub struct QueueHandle {
    stop_tx: watch::Sender<bool>,
    workers: Vec<JoinHandle<()>>,
    cleanup: JoinHandle<()>,
}

impl QueueHandle {
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        for worker in self.workers {
            let _ = worker.await;
        }
        let _ = self.cleanup.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::metrics::NoopMetricsSink;

    fn queue() -> RequestQueueImpl<NoopMetricsSink> {
        RequestQueueImpl::new(
            QueueSettings {
                max_queue_size: 3,
                ..QueueSettings::default()
            },
            Arc::new(NoopMetricsSink),
        )
    }

    #[tokio::test]
    async fn enqueue_rejects_once_full_then_allows_after_cancel() {
        let q = queue();
        let now = Utc::now();
        let mut ids = vec![];
        for _ in 0..3 {
            let req = QueuedRequest::builder("u1", LimitClass::Command, vec![]).build(now);
            ids.push(q.enqueue(req).await.unwrap());
        }
        let overflow = QueuedRequest::builder("u1", LimitClass::Command, vec![]).build(now);
        assert!(matches!(q.enqueue(overflow).await, Err(QueueError::FullQueue { .. })));

        assert!(q.cancel("u1", ids[0]));
        let req = QueuedRequest::builder("u1", LimitClass::Command, vec![]).build(now);
        assert!(q.enqueue(req).await.is_ok());
    }

    #[tokio::test]
    async fn dispatch_order_is_priority_then_age() {
        let q = Arc::new(queue());
        let now = Utc::now();
        for priority in [Priority::Low, Priority::Urgent, Priority::Normal] {
            let req = QueuedRequest::builder("u1", LimitClass::Command, vec![])
                .priority(priority)
                .build(now);
            q.enqueue(req).await.unwrap();
        }

        let order = Arc::new(Mutex::new(Vec::new()));

        struct RecordingHandler {
            order: Arc<Mutex<Vec<Priority>>>,
        }

        #[async_trait]
        impl RequestHandler for RecordingHandler {
            async fn handle(&self, request: &QueuedRequest) -> Result<(), String> {
                self.order.lock().push(request.priority);
                Ok(())
            }
        }

        let handler = Arc::new(RecordingHandler { order: Arc::clone(&order) });
        for _ in 0..3 {
            q.dispatch_one(&(handler.clone() as Arc<dyn RequestHandler>)).await;
        }

        assert_eq!(
            *order.lock(),
            vec![Priority::Urgent, Priority::Normal, Priority::Low]
        );
    }

    #[tokio::test]
    async fn failed_handler_retries_with_backoff_then_drops() {
        let q = Arc::new(RequestQueueImpl::new(
            QueueSettings {
                max_queue_size: 3,
                retry_base_delay: Duration::from_millis(1),
                ..QueueSettings::default()
            },
            Arc::new(NoopMetricsSink),
        ));
        let now = Utc::now();
        let req = QueuedRequest::builder("u1", LimitClass::Command, vec![])
            .max_retries(1)
            .build(now);
        q.enqueue(req).await.unwrap();

        struct FailingHandler;
        #[async_trait]
        impl RequestHandler for FailingHandler {
            async fn handle(&self, _request: &QueuedRequest) -> Result<(), String> {
                Err("boom".to_string())
            }
        }

        let handler: Arc<dyn RequestHandler> = Arc::new(FailingHandler);
        // First failure: re-enqueued.
        q.dispatch_one(&handler).await;
        assert_eq!(q.depth("u1"), 1);

        tokio::time::sleep(Duration::from_millis(5)).await;
        // Second failure: retries exhausted, dropped.
        q.dispatch_one(&handler).await;
        assert_eq!(q.depth("u1"), 0);
    }

    #[test]
    fn user_info_reports_max_size() {
        let q = queue();
        let info = q.user_info("nobody");
        assert_eq!(info.depth, 0);
        assert_eq!(info.max_queue_size, 3);
    }
}
