//! User tier and its rate-limit multiplier.

use serde::{Deserialize, Serialize};

/// A user's paid-plan level.
///
/// Tiers are sourced read-only from an external user store; this crate only
/// knows how to turn a tier into a multiplier applied to base rate-limit
/// policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Tier {
    /// Free plan.
    Free = 0,
    /// "Buy me a coffee" supporter tier.
    Coffee = 1,
    /// "Buy me a cake" supporter tier.
    Cake = 2,
    /// Sponsor tier.
    Sponsor = 3,
}

impl Tier {
    /// All tiers in ascending order, for iteration (e.g. metrics rollups).
    pub const ALL: [Tier; 4] = [Tier::Free, Tier::Coffee, Tier::Cake, Tier::Sponsor];

    /// Construct a tier from its raw integer level (0..3).
    ///
    /// Unknown levels fall back to `Free` rather than failing: a tier is
    /// read from an external store the core does not control, and denying
    /// service because of a lookup quirk is worse than under-multiplying.
    pub fn from_level(level: u8) -> Self {
        match level {
            1 => Tier::Coffee,
            2 => Tier::Cake,
            3 => Tier::Sponsor,
            _ => Tier::Free,
        }
    }

    /// The integer level of this tier (0..3).
    pub fn level(self) -> u8 {
        self as u8
    }

    /// The rate-limit multiplier applied to every base policy for this tier.
    ///
    /// Defaults per the configuration surface: `{0: 1, 1: 2, 2: 4, 3: 10}`.
    pub fn multiplier(self, multipliers: &TierMultipliers) -> u32 {
        multipliers.for_tier(self)
    }
}

impl Default for Tier {
    fn default() -> Self {
        Tier::Free
    }
}

/// The configurable `tierMultipliers` table from the configuration surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierMultipliers {
    pub free: u32,
    pub coffee: u32,
    pub cake: u32,
    pub sponsor: u32,
}

impl TierMultipliers {
    pub fn for_tier(&self, tier: Tier) -> u32 {
        match tier {
            Tier::Free => self.free,
            Tier::Coffee => self.coffee,
            Tier::Cake => self.cake,
            Tier::Sponsor => self.sponsor,
        }
    }
}

impl Default for TierMultipliers {
    fn default() -> Self {
        Self {
            free: 1,
            coffee: 2,
            cake: 4,
            sponsor: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_multipliers_match_configuration_surface() {
        let m = TierMultipliers::default();
        assert_eq!(m.for_tier(Tier::Free), 1);
        assert_eq!(m.for_tier(Tier::Coffee), 2);
        assert_eq!(m.for_tier(Tier::Cake), 4);
        assert_eq!(m.for_tier(Tier::Sponsor), 10);
    }

    #[test]
    fn unknown_level_falls_back_to_free() {
        assert_eq!(Tier::from_level(255), Tier::Free);
    }

    #[test]
    fn round_trips_through_level() {
        for tier in Tier::ALL {
            assert_eq!(Tier::from_level(tier.level()), tier);
        }
    }
}
