//! Data Transfer Objects
//!
//! DTOs for the ambient HTTP shell's request/response serialization. The
//! shell exposes one illustrative business endpoint (`POST /commands`); see
//! [`crate::presentation::http::handlers::commands`].

pub mod commands;

pub use commands::{CommandRequest, CommandResponse};
