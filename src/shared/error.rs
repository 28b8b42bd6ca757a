//! Application Error Types
//!
//! The error taxonomy of the traffic control core, plus its Axum integration
//! for the ambient HTTP shell.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::LimitClass;

/// Rate Limiter errors. `UnknownClass` is a programmer error — callers never
/// construct a [`LimitClass`] outside this crate's enum, so this indicates a
/// bug, not user input; it is logged and never surfaced.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RateLimiterError {
    #[error("rate limit exceeded for {class:?}, resets at {reset_at}")]
    LimitExceeded {
        class: LimitClass,
        reset_at: DateTime<Utc>,
    },

    #[error("unknown limit class")]
    UnknownClass,
}

/// Request Queue errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum QueueError {
    #[error("queue is full for user {user_id}")]
    FullQueue { user_id: String },

    #[error("invalid request: {0}")]
    Invalid(String),
}

/// Error response body for the ambient HTTP shell.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub message: String,
}

/// Top-level error type returned by the ambient `/commands` handler.
///
/// The Monitor never produces errors (per §4.2/§7 of the design); only the
/// Rate Limiter and Queue do, so this wraps exactly those two plus a
/// catch-all for the demo handler's own failures.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("rate limited: {0}")]
    RateLimited(#[from] RateLimiterError),

    #[error("queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::RateLimited(RateLimiterError::LimitExceeded { reset_at, .. }) => (
                StatusCode::TOO_MANY_REQUESTS,
                10001,
                format!("rate limited until {reset_at}"),
            ),
            AppError::RateLimited(RateLimiterError::UnknownClass) => {
                tracing::error!("unknown limit class reached the http layer");
                (StatusCode::INTERNAL_SERVER_ERROR, 10000, "internal server error".into())
            }
            AppError::Queue(QueueError::FullQueue { .. }) => {
                (StatusCode::TOO_MANY_REQUESTS, 10002, "too busy, try again".into())
            }
            AppError::Queue(QueueError::Invalid(msg)) => {
                (StatusCode::BAD_REQUEST, 10003, msg.clone())
            }
            AppError::Internal(msg) => {
                tracing::error!("internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, 10000, "internal server error".into())
            }
        };

        (status, Json(ErrorResponse { code, message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_exceeded_carries_reset_time() {
        let reset_at = Utc::now();
        let err = RateLimiterError::LimitExceeded {
            class: LimitClass::Command,
            reset_at,
        };
        assert!(err.to_string().contains("Command"));
    }
}
