//! Upgrade cost curves.

use serde::{Deserialize, Serialize};

use crate::stations::{ResourceKind, StationId, UpgradeKey, UpgradeKind};

/// How the primary cost of an upgrade grows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CostScaling {
    /// `floor(current_capacity * multiplier)`. Used by expansion upgrades.
    Capacity {
        /// Fraction of current capacity charged per level.
        multiplier: f64,
    },
    /// `(current_level + 1) * base_cost`. Used by automation upgrades.
    Linear {
        /// Cost of the first level.
        base_cost: f64,
    },
}

/// Scarce-resource surcharge applied once an upgrade passes a level
/// threshold.
///
/// At level `L >= threshold` the next purchase additionally costs
/// `floor(coefficient * base^(L - threshold + 1))`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SecondaryCost {
    /// Scarce resource charged.
    pub resource: ResourceKind,
    /// First level (current level) at which the surcharge applies.
    pub threshold: u32,
    /// Exponential base, distinct per upgrade family.
    pub base: f64,
    /// Linear scale applied to the exponential term.
    #[serde(default = "default_coefficient")]
    pub coefficient: f64,
}

const fn default_coefficient() -> f64 {
    1.0
}

/// Data-driven upgrade definition.
///
/// # Example RON
///
/// ```ron
/// UpgradeData(
///     station: Reactor,
///     kind: Expansion,
///     primary_resource: Energy,
///     scaling: Capacity(multiplier: 0.8),
///     secondary: Some(SecondaryCost(resource: Scrap, threshold: 5, base: 2.0)),
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpgradeData {
    /// Station owning the upgrade.
    pub station: StationId,

    /// Upgrade family.
    pub kind: UpgradeKind,

    /// Resource paid for every level.
    pub primary_resource: ResourceKind,

    /// Growth curve of the primary cost.
    pub scaling: CostScaling,

    /// Optional late-game surcharge.
    #[serde(default)]
    pub secondary: Option<SecondaryCost>,

    /// Highest purchasable level (`None` = unbounded).
    #[serde(default)]
    pub max_level: Option<u32>,
}

impl UpgradeData {
    /// Namespaced key of this upgrade.
    #[must_use]
    pub const fn key(&self) -> UpgradeKey {
        UpgradeKey::new(self.station, self.kind)
    }

    /// Check whether a further level can be bought from `level`.
    #[must_use]
    pub fn allows_level_after(&self, level: u32) -> bool {
        self.max_level.map_or(true, |max| level < max)
    }
}
