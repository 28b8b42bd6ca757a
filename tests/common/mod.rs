//! Common Test Utilities
//!
//! Builds the router behind a throwaway `AppState`, the same way
//! `startup::Application::build` does, but without binding a socket —
//! integration tests drive it through `axum-test` instead.

use std::sync::Arc;
use std::time::Duration;

use axum_test::TestServer;
use gitbot_traffic_core::application::services::{
    MonitorSettings, QueueSettings, RateLimiterPolicies, RateLimiterServiceImpl,
    RemoteApiMonitor, RemoteApiMonitorImpl, RequestHandler, RequestQueueImpl,
};
use gitbot_traffic_core::domain::{LimitPolicy, TierMultipliers};
use gitbot_traffic_core::infrastructure::metrics::PrometheusMetricsSink;
use gitbot_traffic_core::presentation::http::handlers::commands::MockRemoteApiHandler;
use gitbot_traffic_core::presentation::http::routes;
use gitbot_traffic_core::startup::AppState;

/// Rate limiter policies loose enough that a handful of test requests never
/// trip a limit meant for production traffic volumes.
fn test_policies() -> RateLimiterPolicies {
    RateLimiterPolicies {
        command: LimitPolicy::new(1000, Duration::from_secs(60)),
        remote_rest: LimitPolicy::new(1000, Duration::from_secs(3600)),
        remote_graphql: LimitPolicy::new(1000, Duration::from_secs(3600)),
        global: LimitPolicy::new(5000, Duration::from_secs(3600)),
    }
}

fn test_queue_settings() -> QueueSettings {
    QueueSettings {
        workers: 2,
        max_queue_size: 10,
        tick: Duration::from_millis(20),
        retry_base_delay: Duration::from_millis(50),
        cleanup_interval: Duration::from_secs(60),
        handler_timeout: Duration::from_secs(5),
    }
}

fn test_monitor_settings() -> MonitorSettings {
    MonitorSettings {
        warning_threshold: 0.8,
        critical_threshold: 0.9,
        history_size: 20,
    }
}

/// Spin up a fully wired router against a disposable `AppState`, mirroring
/// `Application::build` minus the network listener.
pub async fn spawn_app() -> TestServer {
    let metrics = Arc::new(PrometheusMetricsSink::new());

    let rate_limiter = Arc::new(RateLimiterServiceImpl::new(
        test_policies(),
        TierMultipliers {
            free: 1,
            coffee: 2,
            cake: 4,
            sponsor: 10,
        },
        metrics.clone(),
    ));

    let monitor = Arc::new(RemoteApiMonitorImpl::new(
        test_monitor_settings(),
        metrics.clone(),
    ));

    let queue = Arc::new(RequestQueueImpl::new(test_queue_settings(), metrics.clone()));

    let command_handler = Arc::new(MockRemoteApiHandler::new(
        Arc::clone(&monitor) as Arc<dyn RemoteApiMonitor>,
        metrics.clone(),
        1000,
    ));

    let _queue_handle = queue.start(Arc::clone(&command_handler) as Arc<dyn RequestHandler>);

    let state = AppState {
        rate_limiter,
        monitor,
        queue,
        command_handler,
        metrics,
        settings: Arc::new(test_settings()),
    };

    let router = routes::create_router(state);
    TestServer::new(router).expect("failed to build test server")
}

fn test_settings() -> gitbot_traffic_core::config::Settings {
    use gitbot_traffic_core::config::{
        CorsSettings, LimitPolicySettings, MonitorSettings as ConfigMonitorSettings,
        QueueSettings as ConfigQueueSettings, RateLimiterSettings, ServerSettings, Settings,
    };

    Settings {
        server: ServerSettings {
            host: "127.0.0.1".into(),
            port: 0,
        },
        rate_limiter: RateLimiterSettings {
            command: LimitPolicySettings {
                requests: 1000,
                window_seconds: 60,
            },
            remote_rest: LimitPolicySettings {
                requests: 1000,
                window_seconds: 3600,
            },
            remote_graphql: LimitPolicySettings {
                requests: 1000,
                window_seconds: 3600,
            },
            global: LimitPolicySettings {
                requests: 5000,
                window_seconds: 3600,
            },
            tier_multipliers: [1, 2, 4, 10],
        },
        queue: ConfigQueueSettings {
            workers: 2,
            max_queue_size: 10,
            tick_ms: 20,
            retry_base_delay_secs: 1,
            cleanup_interval_secs: 60,
            handler_timeout_secs: 5,
        },
        monitor: ConfigMonitorSettings {
            warning_threshold: 0.8,
            critical_threshold: 0.9,
            history_size: 20,
        },
        cors: CorsSettings {
            allowed_origins: vec!["http://localhost:3000".into()],
        },
        environment: "test".into(),
    }
}
