//! Presentation Layer
//!
//! The ambient HTTP shell: `/healthz`, `/metrics`, and the illustrative
//! `/commands` endpoint. No wire protocol or CLI is part of the core itself
//! (§1/§6) — this is the thin operational harness around it.

pub mod http;
pub mod middleware;
