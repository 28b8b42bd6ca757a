//! Request Logging Middleware
//!
//! Structured request/response tracing via `tower-http`.

use std::time::Duration;

use tower_http::classify::ServerErrorsFailureClass;
use tower_http::trace::TraceLayer;
use tracing::Span;

/// Build the trace layer applied to every inbound request.
///
/// Logs method, path, status, and latency at `info` level; failures
/// (5xx, dropped connections) are logged at `error`.
pub fn create_trace_layer() -> TraceLayer<
    tower_http::classify::SharedClassifier<tower_http::classify::ServerErrorsAsFailures>,
> {
    TraceLayer::new_for_http()
        .make_span_with(|request: &axum::http::Request<_>| {
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                path = %request.uri().path(),
            )
        })
        .on_response(|response: &axum::http::Response<_>, latency: Duration, _span: &Span| {
            tracing::info!(
                status = %response.status(),
                latency_ms = %latency.as_millis(),
                "request completed"
            );
        })
        .on_failure(
            |error: ServerErrorsFailureClass, latency: Duration, _span: &Span| {
                tracing::error!(?error, latency_ms = %latency.as_millis(), "request failed");
            },
        )
}
