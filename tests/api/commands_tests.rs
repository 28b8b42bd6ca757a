//! `POST /commands` end-to-end tests: rate limiter, monitor, and queue
//! wired together behind the ambient shell's one business endpoint.

use crate::common::spawn_app;

#[tokio::test]
async fn command_executes_directly_when_not_backpressured() {
    let server = spawn_app().await;

    let response = server
        .post("/commands")
        .json(&serde_json::json!({"user_id": "u-direct", "command": "status", "tier": 0}))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "executed");
    assert!(body["request_id"].is_string());
}

#[tokio::test]
async fn repeated_commands_eventually_hit_the_rate_limiter() {
    let server = spawn_app().await;

    let mut saw_denied = false;
    for _ in 0..1100 {
        let response = server
            .post("/commands")
            .json(&serde_json::json!({"user_id": "u-flood", "command": "status", "tier": 0}))
            .await;
        if response.status_code() == axum::http::StatusCode::TOO_MANY_REQUESTS {
            saw_denied = true;
            break;
        }
    }

    assert!(saw_denied, "expected the command class limit to eventually deny");
}

#[tokio::test]
async fn rejects_malformed_request_body() {
    let server = spawn_app().await;

    let response = server
        .post("/commands")
        .json(&serde_json::json!({"command": "status"}))
        .await;

    assert!(!response.status_code().is_success());
}
