//! Health Check Handler
//!
//! Operational liveness/readiness endpoint for the ambient HTTP shell. This
//! core keeps no database or cache of its own, so there is nothing to probe
//! beyond the process having finished starting up.

use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// `GET /healthz`.
pub async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn healthz_reports_healthy() {
        let Json(body) = healthz().await;
        assert_eq!(body.status, "healthy");
    }
}
