//! Which remote API surface a call targets.

use serde::{Deserialize, Serialize};

/// REST and GraphQL are rate-limited independently by the remote
/// code-hosting API and carry different header shapes, so the monitor
/// tracks one [`crate::domain::RateLimitInfo`] per `(user, ApiType)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiType {
    Rest,
    GraphQl,
}

impl ApiType {
    pub fn label(self) -> &'static str {
        match self {
            ApiType::Rest => "rest",
            ApiType::GraphQl => "graphql",
        }
    }
}
