//! Route Configuration
//!
//! The ambient shell carries no business surface beyond one illustrative
//! endpoint: `GET /healthz`, `GET /metrics`, `POST /commands`.

use axum::{response::IntoResponse, routing::{get, post}, Router};

use super::handlers;
use crate::infrastructure::metrics;
use crate::startup::AppState;

/// Create the main router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(handlers::health::healthz))
        .route("/metrics", get(metrics_handler))
        .route("/commands", post(handlers::commands::submit_command))
        .with_state(state)
}

/// Prometheus exposition endpoint.
async fn metrics_handler() -> impl IntoResponse {
    (
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        metrics::gather(),
    )
}
