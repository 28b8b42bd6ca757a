//! `/healthz` and `/metrics` endpoint tests.

use crate::common::spawn_app;

#[tokio::test]
async fn healthz_returns_ok_status() {
    let server = spawn_app().await;

    let response = server.get("/healthz").await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn metrics_exposes_prometheus_text_format() {
    let server = spawn_app().await;

    let response = server.get("/metrics").await;

    response.assert_status_ok();
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    assert!(content_type.starts_with("text/plain"));
}

#[tokio::test]
async fn metrics_reflect_command_activity() {
    let server = spawn_app().await;

    let _ = server
        .post("/commands")
        .json(&serde_json::json!({"user_id": "u-metrics", "command": "status", "tier": 0}))
        .await;

    let response = server.get("/metrics").await;
    let body = response.text();
    assert!(body.contains("commands_total") || body.contains("rate_limiter"));
}
