//! `POST /commands` — the ambient shell's illustrative business endpoint.
//!
//! Exercises Rate Limiter -> (Queue | direct dispatch) -> Monitor end to end
//! against a mock remote-API handler, so the crate does something
//! observable under `cargo run` without pulling in a real HTTP client for
//! the remote code-hosting API. See [`MockRemoteApiHandler`].

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use axum::Json;
use chrono::Utc;

use crate::application::dto::commands::{CommandRequest, CommandResponse};
use crate::application::services::{RemoteApiMonitor, RemoteCallOutcome, RequestHandler, RequestQueue};
use crate::domain::{ApiType, LimitClass, Priority, QueuedRequest, Tier};
use crate::infrastructure::metrics::MetricsSink;
use crate::shared::error::AppError;
use crate::startup::AppState;

/// Priority inferred from tier: paid tiers jump the line, per §4.3's note
/// that tier-aware users are expected to enqueue with higher priority.
fn priority_for_tier(tier: Tier) -> Priority {
    match tier {
        Tier::Free => Priority::Low,
        Tier::Coffee => Priority::Normal,
        Tier::Cake => Priority::High,
        Tier::Sponsor => Priority::Urgent,
    }
}

/// Stands in for the real remote-API HTTP client (out of scope per §1): it
/// simulates one outbound REST call, synthesizing `X-RateLimit-*` response
/// headers from a monotonically increasing call count, and feeds them to
/// the [`RemoteApiMonitor`] exactly as a real client's response would.
pub struct MockRemoteApiHandler<Met: MetricsSink> {
    monitor: Arc<dyn RemoteApiMonitor>,
    metrics: Arc<Met>,
    calls_made: AtomicU32,
    simulated_limit: u32,
}

impl<Met: MetricsSink> MockRemoteApiHandler<Met> {
    pub fn new(monitor: Arc<dyn RemoteApiMonitor>, metrics: Arc<Met>, simulated_limit: u32) -> Self {
        Self {
            monitor,
            metrics,
            calls_made: AtomicU32::new(0),
            simulated_limit,
        }
    }

    fn synthetic_headers(&self, used: u32) -> HeaderMap {
        let remaining = self.simulated_limit.saturating_sub(used);
        let reset_at = (Utc::now() + chrono::Duration::hours(1)).timestamp();
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("x-ratelimit-limit"),
            HeaderValue::from_str(&self.simulated_limit.to_string()).unwrap(),
        );
        headers.insert(
            HeaderName::from_static("x-ratelimit-remaining"),
            HeaderValue::from_str(&remaining.to_string()).unwrap(),
        );
        headers.insert(
            HeaderName::from_static("x-ratelimit-reset"),
            HeaderValue::from_str(&reset_at.to_string()).unwrap(),
        );
        headers.insert(
            HeaderName::from_static("x-ratelimit-used"),
            HeaderValue::from_str(&used.to_string()).unwrap(),
        );
        headers
    }
}

#[async_trait::async_trait]
impl<Met: MetricsSink> RequestHandler for MockRemoteApiHandler<Met> {
    async fn handle(&self, request: &QueuedRequest) -> Result<(), String> {
        let started_at = Utc::now();
        let used = self.calls_made.fetch_add(1, Ordering::Relaxed) + 1;
        let headers = self.synthetic_headers(used);

        self.monitor
            .track_request(
                &request.user_id,
                ApiType::Rest,
                "/repos/:owner/:repo",
                started_at,
                &RemoteCallOutcome {
                    status: Some(200),
                    headers: Some(&headers),
                    error: None,
                },
            )
            .await;

        self.metrics.inc_counter(
            "commands_total",
            &[&request.user_id, request.class.label(), "ok"],
        );
        Ok(())
    }
}

/// Records `command_duration_seconds(command, status)` for the whole
/// `submit_command` path, the same way `monitor_service.rs` times
/// `remote_request_seconds` around its own outbound call.
fn observe_command_duration<Met: MetricsSink>(metrics: &Met, command: &str, status: &str, started_at: chrono::DateTime<Utc>) {
    let elapsed = (Utc::now() - started_at).num_milliseconds() as f64 / 1000.0;
    metrics.observe_histogram("command_duration_seconds", &[command, status], elapsed);
}

/// `POST /commands`.
pub async fn submit_command(
    State(state): State<AppState>,
    Json(req): Json<CommandRequest>,
) -> Result<Json<CommandResponse>, AppError> {
    let started_at = Utc::now();
    let tier = Tier::from_level(req.tier);
    let command = req.command.clone();

    if let Err(err) = state
        .rate_limiter
        .consume_limit(&req.user_id, LimitClass::Command, tier)
        .await
    {
        observe_command_duration(state.metrics.as_ref(), &command, "rate_limited", started_at);
        return Err(err.into());
    }

    let should_queue = state.monitor.should_queue(&req.user_id, ApiType::Rest);

    let request = QueuedRequest::builder(req.user_id.clone(), LimitClass::Command, req.command.into_bytes())
        .priority(priority_for_tier(tier))
        .build(Utc::now());

    if should_queue {
        let request_id = match state.queue.enqueue(request).await {
            Ok(id) => id,
            Err(err) => {
                observe_command_duration(state.metrics.as_ref(), &command, "rejected_full", started_at);
                return Err(err.into());
            }
        };
        observe_command_duration(state.metrics.as_ref(), &command, "queued", started_at);
        return Ok(Json(CommandResponse {
            request_id: Some(request_id.to_string()),
            queue_depth: Some(state.queue.depth(&req.user_id)),
            status: "queued",
        }));
    }

    if let Err(err) = state.command_handler.handle(&request).await {
        observe_command_duration(state.metrics.as_ref(), &command, "error", started_at);
        return Err(AppError::Internal(err));
    }

    observe_command_duration(state.metrics.as_ref(), &command, "ok", started_at);
    Ok(Json(CommandResponse {
        request_id: Some(request.id().to_string()),
        queue_depth: None,
        status: "executed",
    }))
}
