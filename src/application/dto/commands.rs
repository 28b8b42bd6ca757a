//! Command DTOs
//!
//! Wire types for the ambient shell's `POST /commands` endpoint — the
//! illustrative harness that exercises Rate Limiter → Queue → Monitor
//! end to end.

use serde::{Deserialize, Serialize};

/// An inbound command from a chat surface, ready to be queued.
#[derive(Debug, Deserialize)]
pub struct CommandRequest {
    /// The user issuing the command.
    pub user_id: String,
    /// The command body, forwarded verbatim to the mock remote-API handler.
    pub command: String,
    /// Paid-plan tier, 0-3. Defaults to 0 (free) if omitted.
    #[serde(default)]
    pub tier: u8,
}

/// Outcome of accepting (or rejecting) a command.
#[derive(Debug, Serialize)]
pub struct CommandResponse {
    /// Id assigned to the queued request, if it was accepted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// Queue depth for this user immediately after enqueueing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_depth: Option<usize>,
    /// Human-readable outcome: `"queued"`, `"rate_limited"`, or `"queue_full"`.
    pub status: &'static str,
}
