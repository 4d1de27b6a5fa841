//! Per-resource tuning data.

use serde::{Deserialize, Serialize};

use crate::stations::ResourceKind;

/// Data-driven definition of one resource and its station.
///
/// # Example RON
///
/// ```ron
/// ResourceData(
///     resource: Insight,
///     display_name: "Insight",
///     click_gain: 1.0,
///     base_capacity: 50.0,
///     capacity_growth: 1.5,
///     per_unit_rate: 0.2,
///     offline_factor: 0.2,
///     requires_power: true,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceData {
    /// Which resource this entry tunes.
    pub resource: ResourceKind,

    /// Human readable name.
    pub display_name: String,

    /// Amount added per manual click.
    pub click_gain: f64,

    /// Capacity at expansion level 0.
    pub base_capacity: f64,

    /// Capacity multiplier per expansion level.
    pub capacity_growth: f64,

    /// Output per active automation unit per second.
    pub per_unit_rate: f64,

    /// Seconds-per-minute factor applied by offline catch-up.
    pub offline_factor: f64,

    /// Whether automation for this station needs reactor power.
    #[serde(default)]
    pub requires_power: bool,

    /// Amount granted to a brand new save.
    #[serde(default)]
    pub starting_amount: f64,
}

impl ResourceData {
    /// Capacity for a given expansion level.
    ///
    /// Always re-derived from the level so repeated purchases never
    /// accumulate rounding drift.
    #[must_use]
    pub fn capacity_at(&self, expansion_level: u32) -> f64 {
        let level = i32::try_from(expansion_level).unwrap_or(i32::MAX);
        (self.base_capacity * self.capacity_growth.powi(level)).floor()
    }
}
