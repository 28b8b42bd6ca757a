//! # Domain Entities
//!
//! Core domain entities for the per-user traffic control core.
//!
//! ## Entities
//!
//! - **Tier**: a user's paid-plan level and its rate-limit multiplier
//! - **LimitClass**: the kind of quota being enforced, with its base policy
//! - **SlidingWindow**: the per-(user, class) sliding-window request log
//! - **RateLimitInfo**: the remote API's advertised quota for a user
//! - **RequestHistory**: a bounded ring of recent outbound call instants
//! - **Priority** / **QueuedRequest** / **UserQueue**: the request queue model

mod priority;
mod limit_class;
mod tier;
mod sliding_window;
mod rate_limit_info;
mod request_history;
mod queued_request;
mod user_queue;

pub use priority::Priority;
pub use limit_class::{LimitClass, LimitPolicy};
pub use tier::{Tier, TierMultipliers};
pub use sliding_window::{SlidingWindow, WindowState};
pub use rate_limit_info::RateLimitInfo;
pub use request_history::RequestHistory;
pub use queued_request::{QueuedRequest, QueuedRequestBuilder};
pub use user_queue::UserQueue;
