//! Queue request priority.

use serde::{Deserialize, Serialize};

/// Request priority, in increasing order.
///
/// `Ord` is derived in declaration order, so `Priority::Urgent > Priority::High
/// > Priority::Normal > Priority::Low` — the selector in
/// [`crate::application::services::queue_service`] relies on this directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Normal,
    High,
    Urgent,
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Normal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_matches_spec() {
        assert!(Priority::Urgent > Priority::High);
        assert!(Priority::High > Priority::Normal);
        assert!(Priority::Normal > Priority::Low);
    }
}
