//! Application Startup
//!
//! Wires the three core subsystems behind shared state, spawns the queue's
//! worker pool, and builds the ambient HTTP shell's router.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::application::services::{
    QueueHandle, RateLimiterService, RateLimiterServiceImpl, RemoteApiMonitor,
    RemoteApiMonitorImpl, RequestHandler, RequestQueueImpl,
};
use crate::config::Settings;
use crate::infrastructure::metrics::{MetricsSink, PrometheusMetricsSink};
use crate::presentation::http::handlers::commands::MockRemoteApiHandler;
use crate::presentation::http::routes;
use crate::presentation::middleware::{cors, logging};

/// How often the system-wide gauges (`active_users`, `system_load_factor`)
/// are refreshed. Independent of the monitor's own 24h data-retention sweep.
const GAUGE_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

/// How often the monitor's stale-data sweep (§4.2 cleanup rule) runs.
const MONITOR_CLEANUP_INTERVAL: Duration = Duration::from_secs(24 * 3600);

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub rate_limiter: Arc<RateLimiterServiceImpl<PrometheusMetricsSink>>,
    pub monitor: Arc<RemoteApiMonitorImpl<PrometheusMetricsSink>>,
    pub queue: Arc<RequestQueueImpl<PrometheusMetricsSink>>,
    pub command_handler: Arc<MockRemoteApiHandler<PrometheusMetricsSink>>,
    pub metrics: Arc<PrometheusMetricsSink>,
    pub settings: Arc<Settings>,
}

/// The running application: a bound listener, its router, and the queue's
/// worker handle so shutdown can signal them in order.
pub struct Application {
    listener: TcpListener,
    router: Router,
    queue_handle: QueueHandle,
    maintenance: MaintenanceHandle,
}

impl Application {
    /// Build the application from settings: construct the three core
    /// subsystems behind one shared `PrometheusMetricsSink`, spawn the
    /// queue's worker pool against the mock remote-API handler, and build
    /// the ambient router.
    pub async fn build(settings: Settings) -> Result<Self> {
        let metrics = Arc::new(PrometheusMetricsSink::new());

        let rate_limiter = Arc::new(RateLimiterServiceImpl::new(
            settings.rate_limiter.clone().into(),
            settings.rate_limiter.tier_multipliers.into(),
            metrics.clone(),
        ));

        let monitor = Arc::new(RemoteApiMonitorImpl::new(
            settings.monitor.into(),
            metrics.clone(),
        ));

        let queue = Arc::new(RequestQueueImpl::new(settings.queue.into(), metrics.clone()));

        let command_handler = Arc::new(MockRemoteApiHandler::new(
            Arc::clone(&monitor) as Arc<dyn RemoteApiMonitor>,
            metrics.clone(),
            settings.rate_limiter.remote_rest.requests,
        ));

        let queue_handle = queue.start(Arc::clone(&command_handler) as Arc<dyn RequestHandler>);
        tracing::info!(workers = settings.queue.workers, "queue workers started");

        let maintenance = spawn_maintenance(
            Arc::clone(&rate_limiter),
            Arc::clone(&monitor),
            Arc::clone(&queue),
            metrics.clone(),
        );

        let state = AppState {
            rate_limiter,
            monitor,
            queue,
            command_handler,
            metrics,
            settings: Arc::new(settings.clone()),
        };

        let router = routes::create_router(state)
            .layer(logging::create_trace_layer())
            .layer(cors::create_cors_layer(&settings.cors));

        let addr = SocketAddr::from(([0, 0, 0, 0], settings.server.port));
        let listener = TcpListener::bind(addr).await?;
        tracing::info!("Listening on {}", addr);

        Ok(Self {
            listener,
            router,
            queue_handle,
            maintenance,
        })
    }

    /// Run the server until a ctrl-c signal, then stop the queue's workers
    /// and let any in-flight handler finish or hit its timeout.
    pub async fn run_until_stopped(self) -> Result<()> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        self.queue_handle.stop().await;
        self.maintenance.stop().await;
        Ok(())
    }

    /// Get the bound address.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}

/// Handle to the periodic maintenance task: refreshes the system-wide
/// gauges and runs the monitor's stale-data sweep. Mirrors
/// [`QueueHandle`]'s watch-channel shutdown so `run_until_stopped` can wind
/// both down in the same way.
struct MaintenanceHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl MaintenanceHandle {
    async fn stop(self) {
        let _ = self.stop_tx.send(true);
        let _ = self.task.await;
    }
}

/// Spawns the task that keeps `active_users`/`system_load_factor` current
/// and periodically sweeps the monitor's stale rate-limit info and call
/// histories (§4.2's ~24h cleanup rule).
fn spawn_maintenance<Met: MetricsSink + 'static>(
    rate_limiter: Arc<RateLimiterServiceImpl<Met>>,
    monitor: Arc<RemoteApiMonitorImpl<Met>>,
    queue: Arc<RequestQueueImpl<Met>>,
    metrics: Arc<Met>,
) -> MaintenanceHandle {
    let (stop_tx, mut stop_rx) = watch::channel(false);

    let task = tokio::spawn(async move {
        let mut gauge_tick = tokio::time::interval(GAUGE_REFRESH_INTERVAL);
        let mut cleanup_tick = tokio::time::interval(MONITOR_CLEANUP_INTERVAL);
        loop {
            tokio::select! {
                _ = stop_rx.changed() => {
                    if *stop_rx.borrow() {
                        break;
                    }
                }
                _ = gauge_tick.tick() => {
                    metrics.set_gauge("active_users", &[], queue.active_user_count() as f64);
                    metrics.set_gauge("system_load_factor", &[], rate_limiter.global_load());
                }
                _ = cleanup_tick.tick() => {
                    monitor.cleanup(chrono::Utc::now());
                    tracing::debug!("monitor cleanup sweep completed");
                }
            }
        }
    });

    MaintenanceHandle { stop_tx, task }
}
