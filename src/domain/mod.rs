//! # Domain Layer
//!
//! The domain layer contains the core business logic of the traffic control
//! core. It is independent of any external frameworks or infrastructure
//! concerns.
//!
//! ## Structure
//!
//! - **entities**: Core domain entities (Tier, LimitClass, SlidingWindow, QueuedRequest, ...)
//! - **value_objects**: Immutable value types (ApiType)
//! - **services**: Domain services for complex business logic (backoff calculation)
//!
//! ## Design Principles
//!
//! - No dependencies on infrastructure or presentation layers
//! - Pure business logic; entities take `now` as a parameter rather than
//!   reading the clock themselves, so they stay deterministic and testable
//! - No entity is shared between components except through the public
//!   contracts in `application::services`

pub mod entities;
pub mod services;
pub mod value_objects;

pub use entities::*;
pub use value_objects::*;
