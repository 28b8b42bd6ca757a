//! Application Services
//!
//! Business logic services that coordinate domain entities behind the
//! public contracts the presentation layer depends on.
//!
//! ## Available Services
//!
//! - **RateLimiterService**: sliding-window per-user, per-class rate limiting
//! - **RemoteApiMonitor**: tracks remote-API rate-limit headers and advises backpressure
//! - **RequestQueue**: bounded, prioritized, retrying per-user request queue

pub mod monitor_service;
pub mod queue_service;
pub mod rate_limiter_service;

pub use monitor_service::{
    ApiStats, MonitorSettings, RemoteApiMonitor, RemoteApiMonitorImpl, RemoteCallOutcome,
};
pub use queue_service::{
    QueueHandle, QueueSettings, RequestHandler, RequestQueue, RequestQueueImpl, UserQueueInfo,
};
pub use rate_limiter_service::{RateLimiterPolicies, RateLimiterService, RateLimiterServiceImpl};
