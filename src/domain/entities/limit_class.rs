//! Limit classes and their base policies.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// The kind of quota being enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LimitClass {
    /// Inbound chat commands from a user.
    Command,
    /// Outbound REST calls to the remote code-hosting API.
    RemoteRest,
    /// Outbound GraphQL calls to the remote code-hosting API.
    RemoteGraphql,
    /// A cross-class global budget for a user.
    Global,
}

impl LimitClass {
    /// All known classes, for iteration (e.g. `reset_user`, metrics rollups).
    pub const ALL: [LimitClass; 4] = [
        LimitClass::Command,
        LimitClass::RemoteRest,
        LimitClass::RemoteGraphql,
        LimitClass::Global,
    ];

    /// A short, stable label for metrics and logs.
    pub fn label(self) -> &'static str {
        match self {
            LimitClass::Command => "command",
            LimitClass::RemoteRest => "remote-rest",
            LimitClass::RemoteGraphql => "remote-graphql",
            LimitClass::Global => "global",
        }
    }
}

/// A `(requests, window)` rate-limit policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitPolicy {
    pub requests: u32,
    pub window: Duration,
}

impl LimitPolicy {
    pub const fn new(requests: u32, window: Duration) -> Self {
        Self { requests, window }
    }

    /// The effective limit for a user at the given tier multiplier.
    ///
    /// `floor(base.requests * multiplier)`, per the glossary.
    pub fn effective_limit(&self, multiplier: u32) -> u32 {
        self.requests.saturating_mul(multiplier)
    }
}
