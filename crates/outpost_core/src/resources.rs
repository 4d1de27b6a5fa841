//! Resource production, clicks, automation toggles and spending.
//!
//! The resource system is the only writer of [`ResourceStorage::current`]
//! and of the activation half of [`Generator`]. Other systems that need a
//! balance to change publish an event (click, loot, purchase) and let the
//! handlers registered here apply it.
//!
//! Every write saturates into `[0, capacity]`; there is no overflow or
//! underflow error path.

use std::collections::BTreeMap;

use crate::components::{Generator, ResourceCost, ResourceStorage};
use crate::data::{Content, EngineSettings};
use crate::events::{AdjustDirection, EventBus, EventKind, GameEvent};
use crate::stations::{ResourceKind, StationId, UpgradeKind};
use crate::store::World;

/// Resource amounts produced during one tick, by resource.
pub type ProductionReport = BTreeMap<ResourceKind, f64>;

/// Owner of stored amounts and generator activation.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResourceSystem;

impl ResourceSystem {
    /// Register the click, automation, loot and purchase handlers.
    ///
    /// Click gains are read from content once, at registration.
    pub fn register(bus: &mut EventBus<World>, content: &Content) {
        let click_gains: BTreeMap<ResourceKind, f64> = content
            .resources
            .iter()
            .map(|r| (r.resource, r.click_gain))
            .collect();

        bus.subscribe(EventKind::ResourceClicked, move |world, event| {
            if let GameEvent::ResourceClicked { station } = event {
                let gain = click_gains.get(&station.resource()).copied().unwrap_or(0.0);
                Self::click(world, *station, gain);
            }
        });

        bus.subscribe(EventKind::AutomationAdjusted, |world, event| {
            if let GameEvent::AutomationAdjusted { station, direction } = event {
                Self::adjust_automation(world, *station, *direction);
            }
        });

        bus.subscribe(EventKind::LootAwarded, |world, event| {
            if let GameEvent::LootAwarded { resource, amount } = event {
                let applied = Self::deposit(world, *resource, *amount);
                tracing::debug!(%resource, amount, applied, "Loot deposited");
            }
        });

        bus.subscribe(EventKind::UpgradePurchased, |world, event| {
            if let GameEvent::UpgradePurchased { key, .. } = event {
                if key.kind == UpgradeKind::Automation {
                    Self::adjust_automation(world, key.station, AdjustDirection::Increase);
                }
            }
        });
    }

    /// Apply one manual click to a station.
    ///
    /// Returns the amount actually added, which is 0 when storage is full.
    pub fn click(world: &mut World, station: StationId, gain: f64) -> f64 {
        Self::deposit(world, station.resource(), gain)
    }

    /// Switch one automation unit on or off.
    ///
    /// The active count stays within `[0, units]`. Returns the new active
    /// count, or `None` if the station has no generator.
    pub fn adjust_automation(
        world: &mut World,
        station: StationId,
        direction: AdjustDirection,
    ) -> Option<u32> {
        let Some(generator) = world
            .station_entity(station)
            .and_then(|id| world.store.get_mut::<Generator>(id))
        else {
            tracing::debug!(%station, "Automation adjust ignored: no generator");
            return None;
        };

        let target = match direction {
            AdjustDirection::Increase => generator.active_units.saturating_add(1),
            AdjustDirection::Decrease => generator.active_units.saturating_sub(1),
        };
        let active = generator.set_active_units(target);
        generator.active = active > 0;
        Some(active)
    }

    /// Add an amount to a resource, saturating at capacity.
    ///
    /// Returns the amount actually applied.
    pub fn deposit(world: &mut World, resource: ResourceKind, amount: f64) -> f64 {
        storage_mut(world, resource).map_or(0.0, |storage| storage.deposit(amount))
    }

    /// Check whether every cost could be paid right now.
    ///
    /// Costs naming the same resource are summed before checking.
    #[must_use]
    pub fn can_afford(world: &World, costs: &[ResourceCost]) -> bool {
        totals(costs).into_iter().all(|(resource, amount)| {
            world
                .storage(resource)
                .is_some_and(|storage| storage.can_afford(amount))
        })
    }

    /// Debit every cost, or nothing.
    ///
    /// Returns `false` without touching any balance if any single cost is
    /// unaffordable.
    pub fn try_spend(world: &mut World, costs: &[ResourceCost]) -> bool {
        if !Self::can_afford(world, costs) {
            return false;
        }
        for (resource, amount) in totals(costs) {
            if let Some(storage) = storage_mut(world, resource) {
                storage.withdraw(amount);
            }
        }
        true
    }

    /// Whether powered automation may run this tick.
    #[must_use]
    pub fn automation_has_power(world: &World, settings: &EngineSettings) -> bool {
        world.amount(ResourceKind::Energy) >= settings.automation_power_threshold
    }

    /// Advance passive production by `dt_ms`.
    ///
    /// Each generator's `active` flag is recomputed: it is set when at least
    /// one unit is switched on and, for stations whose resource requires
    /// power, `has_power` is set. Only active generators produce. Every
    /// storage is clamped afterwards, including ones without a generator.
    pub fn update(
        world: &mut World,
        content: &Content,
        dt_ms: u64,
        has_power: bool,
    ) -> ProductionReport {
        let seconds = dt_ms as f64 / 1000.0;
        let mut produced = ProductionReport::new();

        for (_, bag) in world.store.iter_mut() {
            let Some(storage) = bag.storage.as_mut() else {
                continue;
            };

            if let (Some(generator), Some(station)) = (bag.generator.as_mut(), bag.station) {
                let resource = station.id.resource();
                let needs_power = content
                    .resource(resource)
                    .map_or(true, |data| data.requires_power);
                generator.active = generator.active_units > 0 && (has_power || !needs_power);

                if generator.active {
                    let applied = storage.deposit(generator.rate_per_second() * seconds);
                    if applied > 0.0 {
                        *produced.entry(resource).or_insert(0.0) += applied;
                    }
                }
            }

            storage.clamp();
        }

        produced
    }

    /// Build a `ResourceChanged` notification for the current balance.
    #[must_use]
    pub fn changed_event(world: &World, resource: ResourceKind) -> Option<GameEvent> {
        world.storage(resource).map(|storage| GameEvent::ResourceChanged {
            resource,
            current: storage.current,
            capacity: storage.capacity,
        })
    }
}

fn storage_mut(world: &mut World, resource: ResourceKind) -> Option<&mut ResourceStorage> {
    let id = world.station_entity(resource.station())?;
    world.store.get_mut::<ResourceStorage>(id)
}

fn totals(costs: &[ResourceCost]) -> BTreeMap<ResourceKind, f64> {
    let mut totals = BTreeMap::new();
    for cost in costs {
        *totals.entry(cost.resource).or_insert(0.0) += cost.amount.max(0.0);
    }
    totals
}
