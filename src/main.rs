//! # Traffic Control Core
//!
//! Per-user rate limiting, remote-API headroom tracking, and request queuing
//! for a chat-bot backend, fronted by a thin illustrative HTTP shell.
//!
//! This is the application entry point that initializes:
//! - Tracing/logging subsystem
//! - Configuration loading
//! - The rate limiter, remote-API monitor, and request queue
//! - The ambient HTTP shell (`/healthz`, `/metrics`, `/commands`)

use anyhow::Result;
use tracing::info;

use gitbot_traffic_core::config::Settings;
use gitbot_traffic_core::startup::Application;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber for structured logging
    gitbot_traffic_core::telemetry::init_tracing();

    info!("Starting traffic control core...");

    // Load configuration from environment and config files
    let settings = Settings::load()?;
    info!(
        host = %settings.server.host,
        port = %settings.server.port,
        environment = %settings.environment,
        "Configuration loaded"
    );

    // Build and run the application
    let application = Application::build(settings).await?;

    info!("Server ready to accept connections");
    application.run_until_stopped().await?;

    Ok(())
}
