//! The System Manager: one live simulation per session.
//!
//! Owns the world, the content, the event bus and the combat system, and
//! drives them from two entry points:
//!
//! - [`SystemManager::update`] is called by an external fixed-interval
//!   driver and advances Resource, Log and Combat in that order.
//! - [`SystemManager::dispatch`] applies one [`PlayerAction`] and runs every
//!   resulting event to completion before returning.
//!
//! There is no global instance. Construct one with [`SystemManager::load`]
//! or [`SystemManager::new_game`] and pass it to whoever needs it.
//!
//! # Example
//!
//! ```
//! use chrono::Utc;
//! use outpost_core::data::Content;
//! use outpost_core::manager::{PlayerAction, SystemManager};
//! use outpost_core::stations::{ResourceKind, StationId};
//!
//! let mut manager = SystemManager::new_game(Content::default(), Utc::now());
//! manager.dispatch(PlayerAction::Click { station: StationId::Reactor });
//! manager.update(1_000);
//!
//! assert_eq!(manager.world().amount(ResourceKind::Energy), 1.0);
//! ```

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, BTreeSet};
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::combat::{CombatState, CombatSystem};
use crate::components::{Generator, ResourceCost, ResourceStorage, UpgradeLevels};
use crate::data::{Content, PlayerCombatAction};
use crate::error::{GameError, Result};
use crate::events::{AdjustDirection, EventBus, EventKind, GameEvent, Subscription};
use crate::logs::{LogBook, LogSystem};
use crate::offline::{self, OfflineReport};
use crate::resources::{ProductionReport, ResourceSystem};
use crate::snapshot::{ResourceSnapshot, Snapshot, SnapshotResources};
use crate::stations::{ResourceKind, StationId, UpgradeKey, UpgradeKind};
use crate::store::{ComponentBag, World};
use crate::upgrade_cost;
use crate::upgrades::{PurchaseOutcome, UpgradeSystem};

/// Every action a player can take.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlayerAction {
    /// Click a station for its manual gain.
    Click {
        /// Station clicked.
        station: StationId,
    },
    /// Switch one automation unit on or off.
    AdjustAutomation {
        /// Station adjusted.
        station: StationId,
        /// Direction of the change.
        direction: AdjustDirection,
    },
    /// Buy the next level of an upgrade.
    Purchase {
        /// Upgrade to buy.
        key: UpgradeKey,
    },
    /// Begin an encounter.
    StartEncounter {
        /// Region of the encounter.
        region: String,
        /// Difficulty tier.
        tier: u32,
    },
    /// Take one combat action.
    CombatAction {
        /// Action to take.
        action: PlayerCombatAction,
    },
    /// Withdraw from the current encounter.
    Retreat,
}

/// What one [`SystemManager::update`] did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Events published during the tick, in order.
    pub events: Vec<GameEvent>,
    /// Passive production applied.
    pub produced: ProductionReport,
    /// The autosave interval elapsed; the caller should persist a snapshot.
    pub autosave_due: bool,
}

/// What one [`SystemManager::dispatch`] did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionReport {
    /// Whether the action had any effect.
    pub accepted: bool,
    /// Purchase result, for purchase actions.
    pub purchase: Option<PurchaseOutcome>,
    /// Events published, in order.
    pub events: Vec<GameEvent>,
}

/// Serializable engine state, without subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Checkpoint {
    world: World,
    combat: CombatState,
    since_autosave_ms: u64,
    page_timestamps: BTreeMap<String, DateTime<Utc>>,
}

/// Orchestrates every system over one world.
pub struct SystemManager {
    world: World,
    content: Content,
    bus: EventBus<World>,
    combat: CombatSystem,
    since_autosave_ms: u64,
    page_timestamps: BTreeMap<String, DateTime<Utc>>,
}

impl SystemManager {
    fn with_world(world: World, content: Content) -> Self {
        let mut bus = EventBus::new();
        ResourceSystem::register(&mut bus, &content);
        LogSystem::register(&mut bus);

        Self {
            world,
            content,
            bus,
            combat: CombatSystem::new(),
            since_autosave_ms: 0,
            page_timestamps: BTreeMap::new(),
        }
    }

    /// Start a fresh game from content defaults.
    #[must_use]
    pub fn new_game(content: Content, now: DateTime<Utc>) -> Self {
        Self::load(&Snapshot::default(), content, now).0
    }

    /// Build the live world from a persisted snapshot.
    ///
    /// Offline catch-up runs first, against the snapshot as saved with any
    /// missing capacity or generation filled from the saved upgrade levels.
    /// Missing resources and upgrades fall back to content defaults; unknown
    /// upgrade keys are logged and skipped. Capacity is re-derived from the
    /// expansion level rather than trusted from the snapshot.
    #[must_use]
    pub fn load(snapshot: &Snapshot, content: Content, now: DateTime<Utc>) -> (Self, OfflineReport) {
        let keyed = snapshot.upgrade_levels();
        let levels: BTreeMap<StationId, UpgradeLevels> = StationId::ALL
            .into_iter()
            .map(|station| {
                let saved = snapshot.resources.get(station.resource());
                (station, saved_levels(&keyed, saved, station))
            })
            .collect();

        let resolved = with_level_defaults(&snapshot.resources, &levels, &content);
        let report = offline::catch_up(
            &resolved,
            snapshot.last_online,
            now,
            content.settings.max_offline_minutes,
            &content,
        );

        let mut world = World::new();
        for station in StationId::ALL {
            let resource = station.resource();
            let Some(data) = content.resource(resource) else {
                tracing::warn!(%station, "Station skipped: no resource tuning");
                continue;
            };
            let saved = report.updated_resources.get(resource);
            let upgrades = levels.get(&station).cloned().unwrap_or_default();

            let amount = saved.map_or(data.starting_amount, |entry| entry.amount);
            world.add_station(
                station,
                ComponentBag {
                    storage: Some(ResourceStorage {
                        current: amount,
                        capacity: f64::MAX,
                    }),
                    generator: Some(Generator::new(data.per_unit_rate, 0)),
                    upgrades: Some(upgrades),
                    ..Default::default()
                },
            );
            UpgradeSystem::rederive(&mut world, &content, station);

            if let Some(generator) = world
                .station_entity(station)
                .and_then(|id| world.store.get_mut::<Generator>(id))
            {
                let active = saved
                    .and_then(|entry| entry.generation)
                    .map_or(generator.units, whole_units);
                generator.set_active_units(active);
                generator.active = generator.active_units > 0;
            }
        }
        world.logs = LogBook::with_unlocked(snapshot.unlocked_logs.iter().copied())
            .with_encounters_won(snapshot.encounters_won);

        tracing::info!(
            minutes_offline = report.minutes_passed,
            unlocked_logs = snapshot.unlocked_logs.len(),
            encounters_won = snapshot.encounters_won,
            "World loaded"
        );

        let mut manager = Self::with_world(world, content);
        manager.page_timestamps = snapshot.page_timestamps.clone();
        (manager, report)
    }

    /// Regenerate the persisted snapshot from live state.
    ///
    /// All engine timestamps are set to `now`.
    #[must_use]
    pub fn save(&self, now: DateTime<Utc>) -> Snapshot {
        let mut snapshot = Snapshot::from_world(&self.world, now);
        snapshot.page_timestamps = self.page_timestamps.clone();
        snapshot
    }

    /// Record a page visit for the presentation layer.
    pub fn record_page_visit(&mut self, page: &str, now: DateTime<Utc>) {
        self.page_timestamps.insert(page.to_string(), now);
    }

    /// Advance the simulation by `dt_ms`.
    ///
    /// Runs Resource, Log and Combat in that order and reports whether the
    /// autosave interval has elapsed.
    pub fn update(&mut self, dt_ms: u64) -> TickReport {
        let mut report = TickReport::default();

        let has_power = ResourceSystem::automation_has_power(&self.world, &self.content.settings);
        report.produced = ResourceSystem::update(&mut self.world, &self.content, dt_ms, has_power);

        let unlocked = LogSystem::evaluate(&mut self.world, &self.content);
        report.events.extend(self.publish_all(unlocked));

        let combat_events = self.combat.update(&self.content, dt_ms);
        report.events.extend(self.publish_all(combat_events));

        let interval = self.content.settings.autosave_interval_ms;
        self.since_autosave_ms = self.since_autosave_ms.saturating_add(dt_ms);
        if interval > 0 && self.since_autosave_ms >= interval {
            self.since_autosave_ms %= interval;
            report.autosave_due = true;
        }

        report
    }

    /// Apply one player action and publish everything it causes.
    pub fn dispatch(&mut self, action: PlayerAction) -> ActionReport {
        let mut report = ActionReport::default();
        let mut touched = BTreeSet::new();

        let events = match action {
            PlayerAction::Click { station } => {
                touched.insert(station.resource());
                report.accepted = true;
                vec![GameEvent::ResourceClicked { station }]
            }
            PlayerAction::AdjustAutomation { station, direction } => {
                report.accepted = self.world.generator(station).is_some();
                vec![GameEvent::AutomationAdjusted { station, direction }]
            }
            PlayerAction::Purchase { key } => {
                let costs = self.preview_cost(key).unwrap_or_default();
                let (outcome, events) = UpgradeSystem::purchase(&mut self.world, &self.content, key);
                report.purchase = Some(outcome);
                report.accepted = outcome.is_purchased();
                if report.accepted {
                    touched.extend(costs.iter().map(|c| c.resource));
                    touched.insert(key.station.resource());
                }
                events
            }
            PlayerAction::StartEncounter { region, tier } => {
                let events = self.combat.start(&self.content, &region, tier);
                report.accepted = !events.is_empty();
                events
            }
            PlayerAction::CombatAction { action } => {
                let costs = self.combat_action_cost(action);
                match costs {
                    Some(costs) if ResourceSystem::try_spend(&mut self.world, &costs) => {
                        touched.extend(costs.iter().map(|c| c.resource));
                        report.accepted = true;
                        self.combat.player_action(&self.content, action)
                    }
                    _ => Vec::new(),
                }
            }
            PlayerAction::Retreat => {
                let events = self.combat.retreat(&self.content);
                report.accepted = !events.is_empty();
                events
            }
        };

        report.events.extend(self.publish_all(events));
        let changed: Vec<GameEvent> = touched
            .into_iter()
            .filter_map(|resource| ResourceSystem::changed_event(&self.world, resource))
            .collect();
        report.events.extend(self.publish_all(changed));

        let unlocked = LogSystem::evaluate(&mut self.world, &self.content);
        report.events.extend(self.publish_all(unlocked));

        report
    }

    /// Register a read-only observer for one event kind.
    ///
    /// Observers run after the engine's own handlers, so they see the
    /// state the event produced.
    pub fn subscribe<F>(&mut self, kind: EventKind, mut handler: F) -> Subscription
    where
        F: FnMut(&World, &GameEvent) + 'static,
    {
        self.bus.subscribe(kind, move |world, event| handler(world, event))
    }

    /// Remove an observer. Returns `false` if it was already removed.
    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        self.bus.unsubscribe(subscription)
    }

    /// Price the next level of an upgrade without buying it.
    #[must_use]
    pub fn preview_cost(&self, key: UpgradeKey) -> Option<Vec<ResourceCost>> {
        self.content
            .upgrade(key)
            .map(|upgrade| upgrade_cost::preview(&self.world, upgrade))
    }

    /// The live world.
    #[must_use]
    pub const fn world(&self) -> &World {
        &self.world
    }

    /// The content catalog in use.
    #[must_use]
    pub const fn content(&self) -> &Content {
        &self.content
    }

    /// Current combat state.
    #[must_use]
    pub const fn combat(&self) -> &CombatState {
        self.combat.state()
    }

    /// Current amount of a resource.
    #[must_use]
    pub fn amount(&self, resource: ResourceKind) -> f64 {
        self.world.amount(resource)
    }

    /// Hash of world and combat state.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.world.state_hash().hash(&mut hasher);
        self.combat.state().hash(&mut hasher);
        hasher.finish()
    }

    /// Encode the engine state (without subscribers).
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn checkpoint(&self) -> Result<Vec<u8>> {
        let checkpoint = Checkpoint {
            world: self.world.clone(),
            combat: self.combat.state().clone(),
            since_autosave_ms: self.since_autosave_ms,
            page_timestamps: self.page_timestamps.clone(),
        };
        bincode::serialize(&checkpoint)
            .map_err(|e| GameError::Checkpoint(format!("Failed to serialize engine: {e}")))
    }

    /// Rebuild an engine from [`SystemManager::checkpoint`] output.
    ///
    /// Engine handlers are re-registered; external observers are not.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails.
    pub fn restore(data: &[u8], content: Content) -> Result<Self> {
        let checkpoint: Checkpoint = bincode::deserialize(data)
            .map_err(|e| GameError::Checkpoint(format!("Failed to deserialize engine: {e}")))?;

        let mut manager = Self::with_world(checkpoint.world, content);
        manager.combat = CombatSystem::from_state(checkpoint.combat);
        manager.since_autosave_ms = checkpoint.since_autosave_ms;
        manager.page_timestamps = checkpoint.page_timestamps;
        Ok(manager)
    }

    fn combat_action_cost(&self, action: PlayerCombatAction) -> Option<Vec<ResourceCost>> {
        if !self.combat.accepts_player_action() {
            tracing::debug!(?action, "Combat action ignored: not the player's turn");
            return None;
        }
        let Some(data) = self.content.player_action(action) else {
            tracing::warn!(?action, "Combat action ignored: not in content");
            return None;
        };
        Some(data.cost.clone())
    }

    /// Publish events in order. Loot also reports the balance it changed.
    fn publish_all(&mut self, events: Vec<GameEvent>) -> Vec<GameEvent> {
        let mut published = Vec::with_capacity(events.len());
        for event in events {
            self.bus.publish(&mut self.world, &event);
            let follow_up = match &event {
                GameEvent::LootAwarded { resource, .. } => {
                    ResourceSystem::changed_event(&self.world, *resource)
                }
                _ => None,
            };
            published.push(event);
            if let Some(follow_up) = follow_up {
                self.bus.publish(&mut self.world, &follow_up);
                published.push(follow_up);
            }
        }
        published
    }
}

/// Saved levels of one station.
///
/// A missing automation level falls back to the saved generation.
fn saved_levels(
    keyed: &BTreeMap<UpgradeKey, u32>,
    saved: Option<&ResourceSnapshot>,
    station: StationId,
) -> UpgradeLevels {
    let mut upgrades = UpgradeLevels::new();
    for kind in UpgradeKind::ALL {
        let level = keyed
            .get(&UpgradeKey::new(station, kind))
            .copied()
            .unwrap_or_else(|| match kind {
                UpgradeKind::Automation => saved
                    .and_then(|entry| entry.generation)
                    .map_or(0, whole_units),
                UpgradeKind::Expansion => 0,
            });
        upgrades.set_level(kind, level);
    }
    upgrades
}

/// Fill missing capacity and generation from the saved levels, so
/// catch-up credits expanded and automated stations correctly.
fn with_level_defaults(
    saved: &SnapshotResources,
    levels: &BTreeMap<StationId, UpgradeLevels>,
    content: &Content,
) -> SnapshotResources {
    let mut resolved = *saved;
    for (resource, entry) in saved.iter() {
        let Some(upgrades) = levels.get(&resource.station()) else {
            continue;
        };
        let capacity = entry.capacity.or_else(|| {
            content
                .resource(resource)
                .map(|data| data.capacity_at(upgrades.level(UpgradeKind::Expansion)))
        });
        let generation = entry
            .generation
            .or_else(|| Some(f64::from(upgrades.level(UpgradeKind::Automation))));
        resolved.set(
            resource,
            ResourceSnapshot {
                capacity,
                generation,
                ..*entry
            },
        );
    }
    resolved
}

fn whole_units(generation: f64) -> u32 {
    generation.max(0.0).floor() as u32
}

impl std::fmt::Debug for SystemManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemManager")
            .field("world", &self.world)
            .field("combat", self.combat.state())
            .field("bus", &self.bus)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn fresh() -> SystemManager {
        SystemManager::new_game(Content::default(), t0())
    }

    fn reactor_automation() -> UpgradeKey {
        UpgradeKey::new(StationId::Reactor, UpgradeKind::Automation)
    }

    #[test]
    fn test_new_game_defaults() {
        let manager = fresh();
        assert_eq!(manager.world().store.len(), 4);
        assert_eq!(manager.world().storage(ResourceKind::Energy).unwrap().capacity, 100.0);
        assert_eq!(manager.world().storage(ResourceKind::Crew).unwrap().capacity, 20.0);
        assert_eq!(manager.amount(ResourceKind::Energy), 0.0);
        assert!(!manager.combat().active);
    }

    #[test]
    fn test_click_publishes_resource_changed() {
        let mut manager = fresh();
        let report = manager.dispatch(PlayerAction::Click {
            station: StationId::Reactor,
        });

        assert!(report.accepted);
        assert!(report.events.contains(&GameEvent::ResourceChanged {
            resource: ResourceKind::Energy,
            current: 1.0,
            capacity: 100.0
        }));
    }

    #[test]
    fn test_automation_purchase_then_produce() {
        let mut manager = fresh();
        for _ in 0..10 {
            manager.dispatch(PlayerAction::Click {
                station: StationId::Reactor,
            });
        }

        let report = manager.dispatch(PlayerAction::Purchase {
            key: reactor_automation(),
        });
        assert_eq!(report.purchase, Some(PurchaseOutcome::Purchased { level: 1 }));
        assert!(report.events.contains(&GameEvent::UpgradePurchased {
            key: reactor_automation(),
            level: 1
        }));
        assert!(report
            .events
            .contains(&GameEvent::LogUnlocked { log_id: 1 }));

        let generator = manager.world().generator(StationId::Reactor).unwrap();
        assert_eq!((generator.units, generator.active_units), (1, 1));

        let tick = manager.update(1_000);
        assert_eq!(tick.produced.get(&ResourceKind::Energy), Some(&1.0));
        assert_eq!(manager.amount(ResourceKind::Energy), 1.0);
    }

    #[test]
    fn test_unaffordable_purchase_is_silent() {
        let mut manager = fresh();
        let counter = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&counter);
        manager.subscribe(EventKind::UpgradePurchased, move |_, _| {
            *sink.borrow_mut() += 1;
        });

        // Settle the start log first so only the purchase could change state
        manager.update(0);
        let before = manager.state_hash();
        let report = manager.dispatch(PlayerAction::Purchase {
            key: reactor_automation(),
        });
        assert!(!report.accepted);
        assert_eq!(report.purchase, Some(PurchaseOutcome::Unaffordable));
        assert_eq!(manager.state_hash(), before);
        assert_eq!(*counter.borrow(), 0);
    }

    #[test]
    fn test_observer_sees_post_update_state() {
        let mut manager = fresh();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let sub = manager.subscribe(EventKind::ResourceClicked, move |world, _| {
            sink.borrow_mut().push(world.amount(ResourceKind::Energy));
        });

        manager.dispatch(PlayerAction::Click {
            station: StationId::Reactor,
        });
        assert!(manager.unsubscribe(sub));
        manager.dispatch(PlayerAction::Click {
            station: StationId::Reactor,
        });

        assert_eq!(*seen.borrow(), vec![1.0]);
    }

    #[test]
    fn test_first_tick_unlocks_start_log() {
        let mut manager = fresh();
        let report = manager.update(1_000);
        assert!(report.events.contains(&GameEvent::LogUnlocked { log_id: 0 }));
        assert!(manager.world().logs.is_unlocked(0));
    }

    #[test]
    fn test_autosave_cadence() {
        let mut manager = fresh();
        let due: Vec<bool> = (0..31).map(|_| manager.update(1_000).autosave_due).collect();
        assert_eq!(due.iter().filter(|d| **d).count(), 1);
        assert!(due[29]);
    }

    #[test]
    fn test_combat_action_costs_resources() {
        let mut manager = fresh();
        manager.dispatch(PlayerAction::StartEncounter {
            region: "debris_field".to_string(),
            tier: 1,
        });

        // No energy yet: the weapon cannot fire
        let report = manager.dispatch(PlayerAction::CombatAction {
            action: PlayerCombatAction::Weapon,
        });
        assert!(!report.accepted);
        assert_eq!(manager.combat().enemy_health, 40);

        for _ in 0..5 {
            manager.dispatch(PlayerAction::Click {
                station: StationId::Reactor,
            });
        }
        let report = manager.dispatch(PlayerAction::CombatAction {
            action: PlayerCombatAction::Weapon,
        });
        assert!(report.accepted);
        assert_eq!(manager.amount(ResourceKind::Energy), 0.0);
        assert_eq!(manager.combat().enemy_health, 35);
    }

    #[test]
    fn test_victory_deposits_loot() {
        let mut content = Content::default();
        content.enemies[0].health = 5;
        content.enemies[0].shield = 0;
        let mut manager = SystemManager::new_game(content, t0());
        for _ in 0..5 {
            manager.dispatch(PlayerAction::Click {
                station: StationId::Reactor,
            });
        }
        manager.dispatch(PlayerAction::StartEncounter {
            region: "debris_field".to_string(),
            tier: 1,
        });

        let report = manager.dispatch(PlayerAction::CombatAction {
            action: PlayerCombatAction::Weapon,
        });
        assert_eq!(manager.amount(ResourceKind::Scrap), 15.0);
        assert!(report.events.contains(&GameEvent::ResourceChanged {
            resource: ResourceKind::Scrap,
            current: 15.0,
            capacity: 50.0
        }));
        assert!(report.events.contains(&GameEvent::LogUnlocked { log_id: 3 }));
        assert_eq!(manager.world().logs.encounters_won(), 1);
    }

    #[test]
    fn test_retreat_cancels_charge_through_ticks() {
        let mut manager = fresh();
        for _ in 0..5 {
            manager.dispatch(PlayerAction::Click {
                station: StationId::Reactor,
            });
        }
        manager.dispatch(PlayerAction::StartEncounter {
            region: "debris_field".to_string(),
            tier: 1,
        });
        manager.dispatch(PlayerAction::CombatAction {
            action: PlayerCombatAction::Weapon,
        });
        assert!(manager.combat().charging_action_id.is_some());

        let report = manager.dispatch(PlayerAction::Retreat);
        assert!(!report
            .events
            .iter()
            .any(|e| matches!(e, GameEvent::LootAwarded { .. })));

        let tick = manager.update(5_000);
        assert!(tick.events.iter().all(|e| !matches!(
            e,
            GameEvent::CombatEnded { .. } | GameEvent::EnemyCharging { .. }
        )));
        assert_eq!(manager.combat(), &CombatState::default());
    }

    #[test]
    fn test_load_applies_offline_and_levels() {
        let text = r#"{
            "resources": {
                "energy": { "amount": 10, "capacity": 100, "autoGeneration": 2,
                            "lastSavedAt": "2024-01-01T00:00:00Z" }
            },
            "upgrades": { "reactor:automation": 2, "reactor:expansion": 1, "nope:thing": 3 },
            "unlockedLogs": [0]
        }"#;
        let snapshot = Snapshot::from_json_str(text).unwrap();
        let (manager, report) =
            SystemManager::load(&snapshot, Content::default(), t0() + Duration::minutes(60));

        assert_eq!(report.gains.get(&ResourceKind::Energy), Some(&90.0));
        let storage = manager.world().storage(ResourceKind::Energy).unwrap();
        assert_eq!(storage.capacity, 150.0);
        assert_eq!(storage.current, 100.0);
        let generator = manager.world().generator(StationId::Reactor).unwrap();
        assert_eq!((generator.units, generator.active_units), (2, 2));
        assert!(manager.world().logs.is_unlocked(0));
    }

    #[test]
    fn test_load_generation_without_upgrade_key() {
        let text = r#"{ "resources": { "crew": { "amount": 1, "workerCrews": 3 } } }"#;
        let snapshot = Snapshot::from_json_str(text).unwrap();
        let (manager, _) = SystemManager::load(&snapshot, Content::default(), t0());

        let generator = manager.world().generator(StationId::CrewQuarters).unwrap();
        assert_eq!((generator.units, generator.active_units), (3, 3));
    }

    #[test]
    fn test_save_stamps_now() {
        let mut manager = fresh();
        manager.dispatch(PlayerAction::Click {
            station: StationId::Processor,
        });
        manager.record_page_visit("processor", t0());
        let now = t0() + Duration::hours(1);

        let snapshot = manager.save(now);
        assert_eq!(snapshot.last_online, Some(now));
        let insight = snapshot.resources.get(ResourceKind::Insight).unwrap();
        assert_eq!(insight.amount, 1.0);
        assert_eq!(insight.last_saved_at, Some(now));
        assert_eq!(snapshot.page_timestamps.get("processor"), Some(&t0()));
        assert_eq!(
            snapshot.upgrades.get("reactor:automation"),
            Some(&crate::snapshot::UpgradeValue::Level(0))
        );
    }

    #[test]
    fn test_checkpoint_round_trip_preserves_hash() {
        let mut manager = fresh();
        manager.dispatch(PlayerAction::Click {
            station: StationId::Reactor,
        });
        manager.update(500);

        let bytes = manager.checkpoint().unwrap();
        let restored = SystemManager::restore(&bytes, Content::default()).unwrap();
        assert_eq!(restored.state_hash(), manager.state_hash());
    }

    #[test]
    fn test_player_action_json_shape() {
        let action = PlayerAction::CombatAction {
            action: PlayerCombatAction::Weapon,
        };
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "type": "combat_action", "action": "weapon" })
        );
        assert_eq!(serde_json::from_value::<PlayerAction>(json).unwrap(), action);

        let retreat: PlayerAction = serde_json::from_str(r#"{ "type": "retreat" }"#).unwrap();
        assert_eq!(retreat, PlayerAction::Retreat);
    }

    #[test]
    fn test_victory_count_survives_reload() {
        let mut content = Content::default();
        content.enemies[0].health = 5;
        content.enemies[0].shield = 0;
        content.logs[3].trigger = crate::data::LogTrigger::EncountersWon { count: 2 };

        let win = |manager: &mut SystemManager| {
            for _ in 0..5 {
                manager.dispatch(PlayerAction::Click {
                    station: StationId::Reactor,
                });
            }
            manager.dispatch(PlayerAction::StartEncounter {
                region: "debris_field".to_string(),
                tier: 1,
            });
            manager.dispatch(PlayerAction::CombatAction {
                action: PlayerCombatAction::Weapon,
            })
        };

        let mut manager = SystemManager::new_game(content.clone(), t0());
        win(&mut manager);
        assert_eq!(manager.world().logs.encounters_won(), 1);
        assert!(!manager.world().logs.is_unlocked(3));

        let snapshot = manager.save(t0());
        assert_eq!(snapshot.encounters_won, 1);
        let text = snapshot.to_json_string().unwrap();
        let reloaded = Snapshot::from_json_str(&text).unwrap();

        let (mut manager, _) = SystemManager::load(&reloaded, content, t0());
        assert_eq!(manager.world().logs.encounters_won(), 1);
        let report = win(&mut manager);
        assert_eq!(manager.world().logs.encounters_won(), 2);
        assert!(report.events.contains(&GameEvent::LogUnlocked { log_id: 3 }));
    }

    #[test]
    fn test_load_without_generation_keeps_units_on() {
        let text = r#"{
            "resources": { "energy": { "amount": 5 } },
            "upgrades": { "reactor:automation": 2 }
        }"#;
        let snapshot = Snapshot::from_json_str(text).unwrap();
        let (mut manager, _) = SystemManager::load(&snapshot, Content::default(), t0());

        let generator = manager.world().generator(StationId::Reactor).unwrap();
        assert_eq!((generator.units, generator.active_units), (2, 2));

        manager.update(1_000);
        assert_eq!(manager.amount(ResourceKind::Energy), 7.0);
    }

    #[test]
    fn test_offline_uses_level_defaults_for_missing_fields() {
        let text = r#"{
            "resources": {
                "energy": { "amount": 100, "lastSavedAt": "2024-01-01T00:00:00Z" }
            },
            "upgrades": { "reactor:expansion": 2, "reactor:automation": 1 }
        }"#;
        let snapshot = Snapshot::from_json_str(text).unwrap();
        let (manager, report) =
            SystemManager::load(&snapshot, Content::default(), t0() + Duration::minutes(60));

        // Capacity 225 at expansion level 2, one active unit
        assert_eq!(report.gains.get(&ResourceKind::Energy), Some(&125.0));
        assert_eq!(manager.amount(ResourceKind::Energy), 225.0);
    }
}
