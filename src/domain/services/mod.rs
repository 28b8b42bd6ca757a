//! # Domain Services
//!
//! Domain services encapsulate business logic that doesn't naturally belong
//! to a single entity. These services operate on domain entities and
//! implement core business rules.
//!
//! ## Services
//!
//! - **BackoffCalculator**: retry-delay and schedule-time calculation for
//!   queued requests that failed dispatch

mod backoff;

pub use backoff::*;
