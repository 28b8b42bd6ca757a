//! Application settings and configuration structures.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Root configuration structure containing all application settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Server configuration (host, port) for the ambient HTTP shell.
    pub server: ServerSettings,

    /// Rate limiter per-class policies and tier multipliers.
    pub rate_limiter: RateLimiterSettings,

    /// Request queue worker pool and timing configuration.
    pub queue: QueueSettings,

    /// Remote-API monitor thresholds and history size.
    pub monitor: MonitorSettings,

    /// CORS configuration for the ambient HTTP shell.
    pub cors: CorsSettings,

    /// Current environment (development, staging, production).
    pub environment: String,
}

/// Server binding configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    /// Host address to bind to (e.g., "0.0.0.0").
    pub host: String,

    /// Port number to listen on.
    pub port: u16,
}

/// A single `(requests, window_seconds)` limit policy, as loaded from config.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LimitPolicySettings {
    pub requests: u32,
    pub window_seconds: u64,
}

/// Rate limiter configuration: one policy per class plus tier multipliers.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimiterSettings {
    pub command: LimitPolicySettings,
    pub remote_rest: LimitPolicySettings,
    pub remote_graphql: LimitPolicySettings,
    pub global: LimitPolicySettings,
    /// Multiplier applied to the base limit per tier, indexed `[free, coffee, cake, sponsor]`.
    pub tier_multipliers: [u32; 4],
}

/// Request queue configuration.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct QueueSettings {
    pub workers: usize,
    pub max_queue_size: usize,
    pub tick_ms: u64,
    pub retry_base_delay_secs: u64,
    pub cleanup_interval_secs: u64,
    pub handler_timeout_secs: u64,
}

/// Remote-API monitor configuration.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct MonitorSettings {
    pub warning_threshold: f64,
    pub critical_threshold: f64,
    pub history_size: usize,
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CorsSettings {
    /// Allowed origins (comma-separated in env).
    pub allowed_origins: Vec<String>,
}

impl Settings {
    /// Load settings from environment variables and configuration files.
    ///
    /// The loading order is:
    /// 1. Built-in defaults, matching this crate's documented defaults exactly.
    /// 2. `config/default.toml` and `config/{RUN_ENV}.toml`, if present.
    /// 3. `APP__`-prefixed, double-underscore-separated environment variables
    ///    (e.g. `APP__QUEUE__WORKERS=8`), which take highest priority.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if configuration cannot be loaded or parsed.
    pub fn load() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let environment = std::env::var("RUN_ENV").unwrap_or_else(|_| "development".into());

        Config::builder()
            .set_default("environment", environment.clone())?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("rate_limiter.command.requests", 30)?
            .set_default("rate_limiter.command.window_seconds", 60)?
            .set_default("rate_limiter.remote_rest.requests", 60)?
            .set_default("rate_limiter.remote_rest.window_seconds", 3600)?
            .set_default("rate_limiter.remote_graphql.requests", 100)?
            .set_default("rate_limiter.remote_graphql.window_seconds", 3600)?
            .set_default("rate_limiter.global.requests", 200)?
            .set_default("rate_limiter.global.window_seconds", 3600)?
            .set_default("rate_limiter.tier_multipliers", vec![1, 2, 4, 10])?
            .set_default("queue.workers", 5)?
            .set_default("queue.max_queue_size", 50)?
            .set_default("queue.tick_ms", 200)?
            .set_default("queue.retry_base_delay_secs", 30)?
            .set_default("queue.cleanup_interval_secs", 300)?
            .set_default("queue.handler_timeout_secs", 300)?
            .set_default("monitor.warning_threshold", 0.8)?
            .set_default("monitor.critical_threshold", 0.9)?
            .set_default("monitor.history_size", 100)?
            .set_default("cors.allowed_origins", vec!["http://localhost:3000"])?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            .add_source(
                Environment::default()
                    .prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("server.host", std::env::var("SERVER_HOST").ok())?
            .set_override_option("server.port", std::env::var("SERVER_PORT").ok())?
            .build()?
            .try_deserialize()
    }

    /// Get the full server address as a string.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl ServerSettings {
    /// Get the socket address for binding.
    pub fn socket_addr(&self) -> std::net::SocketAddr {
        format!("{}:{}", self.host, self.port)
            .parse()
            .expect("invalid server address configuration")
    }
}

impl From<LimitPolicySettings> for crate::domain::LimitPolicy {
    fn from(settings: LimitPolicySettings) -> Self {
        crate::domain::LimitPolicy::new(
            settings.requests,
            std::time::Duration::from_secs(settings.window_seconds),
        )
    }
}

impl From<[u32; 4]> for crate::domain::TierMultipliers {
    fn from(multipliers: [u32; 4]) -> Self {
        crate::domain::TierMultipliers {
            free: multipliers[0],
            coffee: multipliers[1],
            cake: multipliers[2],
            sponsor: multipliers[3],
        }
    }
}

impl From<RateLimiterSettings> for crate::application::services::RateLimiterPolicies {
    fn from(settings: RateLimiterSettings) -> Self {
        crate::application::services::RateLimiterPolicies {
            command: settings.command.into(),
            remote_rest: settings.remote_rest.into(),
            remote_graphql: settings.remote_graphql.into(),
            global: settings.global.into(),
        }
    }
}

impl From<MonitorSettings> for crate::application::services::MonitorSettings {
    fn from(settings: MonitorSettings) -> Self {
        crate::application::services::MonitorSettings {
            warning_threshold: settings.warning_threshold,
            critical_threshold: settings.critical_threshold,
            history_size: settings.history_size,
        }
    }
}

impl From<QueueSettings> for crate::application::services::QueueSettings {
    fn from(settings: QueueSettings) -> Self {
        crate::application::services::QueueSettings {
            workers: settings.workers,
            max_queue_size: settings.max_queue_size,
            tick: std::time::Duration::from_millis(settings.tick_ms),
            retry_base_delay: std::time::Duration::from_secs(settings.retry_base_delay_secs),
            cleanup_interval: std::time::Duration::from_secs(settings.cleanup_interval_secs),
            handler_timeout: std::time::Duration::from_secs(settings.handler_timeout_secs),
        }
    }
}
