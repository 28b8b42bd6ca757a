//! HTTP Handlers
//!
//! Request handlers for the ambient shell's two operational endpoints and
//! its one illustrative business endpoint.

pub mod commands;
pub mod health;
