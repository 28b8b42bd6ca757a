//! # Gitbot Traffic Core
//!
//! Per-user rate limiting, remote-API rate-limit monitoring, and priority
//! request queueing for a chat-bot backend that bridges to a remote
//! code-hosting API.
//!
//! ## Architecture
//!
//! The crate follows Clean Architecture principles:
//!
//! - **Domain Layer**: Core business entities (sliding windows, tiers,
//!   queued requests) and pure domain services
//! - **Application Layer**: The three public subsystems — Rate Limiter,
//!   Remote-API Monitor, Request Queue — plus their DTOs
//! - **Infrastructure Layer**: Prometheus metrics exposition and remote
//!   response header parsing
//! - **Presentation Layer**: The ambient HTTP shell (`/healthz`,
//!   `/metrics`, and an illustrative `/commands` endpoint)
//!
//! ## Module Structure
//!
//! ```text
//! gitbot_traffic_core/
//! +-- config/        Configuration management
//! +-- domain/        Domain entities, value objects, and domain services
//! +-- application/   Rate limiter, monitor, and queue services
//! +-- infrastructure/ Metrics sink and remote header parsing
//! +-- presentation/  HTTP routes and handlers
//! +-- shared/        Error taxonomy
//! ```

// Configuration module
pub mod config;

// Domain layer - Core business logic
pub mod domain;

// Application layer - Business services
pub mod application;

// Infrastructure layer - External implementations
pub mod infrastructure;

// Presentation layer - HTTP handlers
pub mod presentation;

// Shared utilities
pub mod shared;

// Application startup and state management
pub mod startup;

// Telemetry and observability
pub mod telemetry;
