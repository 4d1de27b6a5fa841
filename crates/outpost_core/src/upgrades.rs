//! Upgrade purchasing.
//!
//! A purchase is atomic: it either debits every cost, raises the level by
//! one, re-derives the dependent stat and emits `UpgradePurchased`, or it
//! changes nothing at all.

use serde::{Deserialize, Serialize};

use crate::components::{Generator, ResourceStorage, UpgradeLevels};
use crate::data::Content;
use crate::events::GameEvent;
use crate::resources::ResourceSystem;
use crate::stations::{StationId, UpgradeKey, UpgradeKind};
use crate::store::World;
use crate::upgrade_cost;

/// Result of a purchase attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum PurchaseOutcome {
    /// Costs were debited and the level raised.
    Purchased {
        /// Level after the purchase.
        level: u32,
    },
    /// At least one cost could not be paid. Nothing changed.
    Unaffordable,
    /// The upgrade has reached its configured maximum.
    MaxLevel,
    /// No content or station exists for the key.
    Unknown,
}

impl PurchaseOutcome {
    /// Check if the purchase went through.
    #[must_use]
    pub const fn is_purchased(&self) -> bool {
        matches!(self, Self::Purchased { .. })
    }
}

/// Owner of upgrade levels and derived capacity/rate.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpgradeSystem;

impl UpgradeSystem {
    /// Attempt to buy the next level of an upgrade.
    ///
    /// Returns the outcome and, on success, the `UpgradePurchased` event
    /// for the caller to publish.
    pub fn purchase(
        world: &mut World,
        content: &Content,
        key: UpgradeKey,
    ) -> (PurchaseOutcome, Vec<GameEvent>) {
        let Some(upgrade) = content.upgrade(key) else {
            tracing::warn!(%key, "Purchase ignored: upgrade not in content");
            return (PurchaseOutcome::Unknown, Vec::new());
        };
        let Some(entity) = world.station_entity(key.station) else {
            tracing::warn!(%key, "Purchase ignored: station not built");
            return (PurchaseOutcome::Unknown, Vec::new());
        };

        let level = world
            .upgrade_levels(key.station)
            .map_or(0, |levels| levels.level(key.kind));
        if !upgrade.allows_level_after(level) {
            return (PurchaseOutcome::MaxLevel, Vec::new());
        }

        let costs = upgrade_cost::preview(world, upgrade);
        if !ResourceSystem::try_spend(world, &costs) {
            tracing::debug!(%key, ?costs, "Purchase rejected: unaffordable");
            return (PurchaseOutcome::Unaffordable, Vec::new());
        }

        let new_level = level + 1;
        if let Some(bag) = world.store.bag_mut(entity) {
            bag.upgrades
                .get_or_insert_with(UpgradeLevels::new)
                .set_level(key.kind, new_level);
        }
        Self::rederive(world, content, key.station);

        tracing::info!(%key, level = new_level, "Upgrade purchased");
        (
            PurchaseOutcome::Purchased { level: new_level },
            vec![GameEvent::UpgradePurchased {
                key,
                level: new_level,
            }],
        )
    }

    /// Recompute capacity and generator units from the stored levels.
    ///
    /// Values are derived from the level itself, never adjusted by a delta,
    /// so repeated calls are stable. Current amounts are clamped to the new
    /// capacity and active units to the new unit count.
    pub fn rederive(world: &mut World, content: &Content, station: StationId) {
        let Some(data) = content.resource(station.resource()) else {
            tracing::warn!(%station, "Re-derive skipped: no resource tuning");
            return;
        };
        let Some(bag) = world
            .station_entity(station)
            .and_then(|id| world.store.bag_mut(id))
        else {
            return;
        };

        let levels = bag.upgrades.clone().unwrap_or_default();
        let expansion = levels.level(UpgradeKind::Expansion);
        let automation = levels.level(UpgradeKind::Automation);

        let storage = bag
            .storage
            .get_or_insert_with(|| ResourceStorage::new(0.0, 0.0));
        storage.capacity = data.capacity_at(expansion);
        storage.clamp();

        let generator = bag
            .generator
            .get_or_insert_with(|| Generator::new(data.per_unit_rate, 0));
        generator.per_unit_rate = data.per_unit_rate;
        generator.units = automation;
        generator.set_active_units(generator.active_units);
        generator.active = generator.active_units > 0;
    }
}
