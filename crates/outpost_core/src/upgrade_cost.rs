//! Upgrade cost curves.
//!
//! A single pure function prices every upgrade, so a UI preview and the
//! real purchase can never disagree.

use crate::components::{Generator, ResourceCost};
use crate::data::{CostScaling, UpgradeData};
use crate::stations::{UpgradeKey, UpgradeKind};
use crate::store::World;

/// Price the next level of an upgrade.
///
/// `current_value` is the stat the primary cost scales with: the current
/// capacity for [`CostScaling::Capacity`]; ignored for
/// [`CostScaling::Linear`].
///
/// The primary cost is `floor(current_value * multiplier)` or
/// `(current_level + 1) * base_cost`. Once `current_level` reaches the
/// secondary threshold `t`, a second entry of
/// `floor(coefficient * base^(current_level - t + 1))` is appended.
#[must_use]
pub fn cost_of(upgrade: &UpgradeData, current_level: u32, current_value: f64) -> Vec<ResourceCost> {
    let primary = match upgrade.scaling {
        CostScaling::Capacity { multiplier } => (current_value.max(0.0) * multiplier).floor(),
        CostScaling::Linear { base_cost } => f64::from(current_level.saturating_add(1)) * base_cost,
    };

    let mut costs = vec![ResourceCost::new(upgrade.primary_resource, primary)];

    if let Some(secondary) = upgrade.secondary {
        if current_level >= secondary.threshold {
            let exponent = i32::try_from(current_level - secondary.threshold + 1).unwrap_or(i32::MAX);
            let amount = (secondary.coefficient * secondary.base.powi(exponent)).floor();
            costs.push(ResourceCost::new(secondary.resource, amount));
        }
    }

    costs
}

/// The level and scaling value an upgrade is currently priced from.
///
/// Missing stations read as level 0 with a scaling value of 0.
#[must_use]
pub fn pricing_inputs(world: &World, key: UpgradeKey) -> (u32, f64) {
    let level = world
        .upgrade_levels(key.station)
        .map_or(0, |levels| levels.level(key.kind));

    let value = match key.kind {
        UpgradeKind::Expansion => world
            .storage(key.station.resource())
            .map_or(0.0, |storage| storage.capacity),
        UpgradeKind::Automation => world
            .generator(key.station)
            .map_or(0.0, Generator::rate_per_second),
    };

    (level, value)
}

/// Price the next level of an upgrade against the live world.
///
/// Has no side effects; [`crate::upgrades::UpgradeSystem::purchase`]
/// charges exactly this amount.
#[must_use]
pub fn preview(world: &World, upgrade: &UpgradeData) -> Vec<ResourceCost> {
    let (level, value) = pricing_inputs(world, upgrade.key());
    cost_of(upgrade, level, value)
}
