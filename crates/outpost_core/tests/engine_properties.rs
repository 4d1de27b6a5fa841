//! Engine-level properties and scenarios for outpost_core.
//!
//! These tests drive the engine only through `SystemManager`, the way the
//! presentation and persistence layers do.

use chrono::Duration;
use outpost_core::prelude::*;
use outpost_test_utils::determinism::{run_script, strategies};
use outpost_test_utils::fixtures::{
    clicked_manager, fresh_manager, saved_resource, snapshot_with, t0, SAMPLE_SNAPSHOT_JSON,
};
use proptest::prelude::*;

fn assert_storage_invariant(manager: &SystemManager) {
    for resource in ResourceKind::ALL {
        let storage = manager.world().storage(resource).unwrap();
        assert!(
            storage.current >= 0.0 && storage.current <= storage.capacity,
            "{resource}: {} outside [0, {}]",
            storage.current,
            storage.capacity
        );
    }
}

// =============================================================================
// Resource Tests
// =============================================================================

mod resources {
    use super::*;

    #[test]
    fn test_click_at_capacity_is_zero_gain() {
        let mut manager = clicked_manager(StationId::CrewQuarters, 20);
        assert_eq!(manager.amount(ResourceKind::Crew), 20.0);

        let report = manager.dispatch(PlayerAction::Click {
            station: StationId::CrewQuarters,
        });
        assert_eq!(manager.amount(ResourceKind::Crew), 20.0);
        assert!(report.events.contains(&GameEvent::ResourceChanged {
            resource: ResourceKind::Crew,
            current: 20.0,
            capacity: 20.0
        }));
    }

    #[test]
    fn test_powered_station_needs_energy() {
        let snapshot = Snapshot::from_json_str(
            r#"{ "upgrades": { "processor:automation": 1 } }"#,
        )
        .unwrap();
        let (mut manager, _) = SystemManager::load(&snapshot, Content::default(), t0());

        manager.update(1_000);
        assert_eq!(manager.amount(ResourceKind::Insight), 0.0);

        manager.dispatch(PlayerAction::Click {
            station: StationId::Reactor,
        });
        manager.update(1_000);
        assert!((manager.amount(ResourceKind::Insight) - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_deactivated_units_stop_production() {
        let snapshot =
            Snapshot::from_json_str(r#"{ "upgrades": { "reactor:automation": 2 } }"#).unwrap();
        let (mut manager, _) = SystemManager::load(&snapshot, Content::default(), t0());

        manager.dispatch(PlayerAction::AdjustAutomation {
            station: StationId::Reactor,
            direction: AdjustDirection::Decrease,
        });
        manager.update(1_000);
        assert_eq!(manager.amount(ResourceKind::Energy), 1.0);

        manager.dispatch(PlayerAction::AdjustAutomation {
            station: StationId::Reactor,
            direction: AdjustDirection::Decrease,
        });
        manager.update(1_000);
        assert_eq!(manager.amount(ResourceKind::Energy), 1.0);
        assert_eq!(manager.world().generator(StationId::Reactor).unwrap().units, 2);
    }
}

// =============================================================================
// Upgrade Tests
// =============================================================================

mod upgrades {
    use super::*;

    #[test]
    fn test_unaffordable_purchase_is_atomic() {
        let mut manager = clicked_manager(StationId::Reactor, 50);
        let key = UpgradeKey::new(StationId::Reactor, UpgradeKind::Expansion);
        let fired = std::rc::Rc::new(std::cell::Cell::new(false));
        let flag = std::rc::Rc::clone(&fired);
        manager.subscribe(EventKind::UpgradePurchased, move |_, _| flag.set(true));

        let report = manager.dispatch(PlayerAction::Purchase { key });
        assert_eq!(report.purchase, Some(PurchaseOutcome::Unaffordable));
        assert_eq!(manager.amount(ResourceKind::Energy), 50.0);
        assert_eq!(
            manager.world().upgrade_levels(StationId::Reactor).unwrap().level(UpgradeKind::Expansion),
            0
        );
        assert!(!fired.get());
    }

    #[test]
    fn test_preview_matches_charge() {
        let mut manager = clicked_manager(StationId::Reactor, 100);
        let key = UpgradeKey::new(StationId::Reactor, UpgradeKind::Expansion);

        let preview = manager.preview_cost(key).unwrap();
        assert_eq!(preview, vec![ResourceCost::new(ResourceKind::Energy, 80.0)]);

        manager.dispatch(PlayerAction::Purchase { key });
        assert_eq!(manager.amount(ResourceKind::Energy), 20.0);
        assert_eq!(manager.world().storage(ResourceKind::Energy).unwrap().capacity, 150.0);

        // Next level scales with the new capacity
        let preview = manager.preview_cost(key).unwrap();
        assert_eq!(preview[0].amount, 120.0);
    }
}

// =============================================================================
// Combat Tests
// =============================================================================

mod combat {
    use super::*;

    fn in_encounter() -> SystemManager {
        let mut manager = clicked_manager(StationId::Reactor, 30);
        manager.dispatch(PlayerAction::StartEncounter {
            region: "debris_field".to_string(),
            tier: 1,
        });
        manager
    }

    #[test]
    fn test_full_cycle_timing() {
        let mut manager = in_encounter();
        manager.dispatch(PlayerAction::CombatAction {
            action: PlayerCombatAction::Weapon,
        });
        assert_eq!(manager.combat().phase, CombatPhase::EnemyCharging);

        manager.update(500);
        assert_eq!(manager.combat().phase, CombatPhase::EnemyCharging);
        assert_eq!(manager.combat().player_health, 100);

        manager.update(200);
        assert_eq!(manager.combat().player_health, 88);
        assert_eq!(manager.combat().phase, CombatPhase::PlayerActing);
    }

    #[test]
    fn test_retreat_mid_charge() {
        let mut manager = in_encounter();
        manager.dispatch(PlayerAction::CombatAction {
            action: PlayerCombatAction::Weapon,
        });
        let scrap_before = manager.amount(ResourceKind::Scrap);

        let report = manager.dispatch(PlayerAction::Retreat);
        assert!(report.events.contains(&GameEvent::CombatEnded {
            enemy_id: "scavenger_drone".to_string(),
            outcome: CombatOutcome::Retreat
        }));
        assert!(!report
            .events
            .iter()
            .any(|e| matches!(e, GameEvent::LootAwarded { .. })));

        manager.update(10_000);
        assert_eq!(manager.combat(), &CombatState::default());
        assert_eq!(manager.amount(ResourceKind::Scrap), scrap_before);
    }

    #[test]
    fn test_win_drone_by_attrition() {
        let mut manager = in_encounter();
        let mut outcome = None;

        for _ in 0..20 {
            let report = manager.dispatch(PlayerAction::CombatAction {
                action: PlayerCombatAction::Weapon,
            });
            for event in &report.events {
                if let GameEvent::CombatEnded { outcome: o, .. } = event {
                    outcome = Some(*o);
                }
            }
            if outcome.is_some() {
                break;
            }
            manager.update(700);
        }

        assert_eq!(outcome, Some(CombatOutcome::Victory));
        assert_eq!(manager.amount(ResourceKind::Scrap), 15.0);
        assert!(manager.world().logs.is_unlocked(3));
    }

    #[test]
    fn test_unknown_enemy_stays_idle() {
        let mut manager = fresh_manager();
        let report = manager.dispatch(PlayerAction::StartEncounter {
            region: "deep_space".to_string(),
            tier: 1,
        });
        assert!(!report.accepted);
        assert!(!manager.combat().active);
    }
}

// =============================================================================
// Offline and Snapshot Tests
// =============================================================================

mod offline {
    use super::*;

    #[test]
    fn test_sixty_minute_energy_scenario() {
        let snapshot = snapshot_with(ResourceKind::Energy, saved_resource(10.0, 100.0, 2.0, 60));
        let report = catch_up(&snapshot.resources, None, t0(), 1440, &Content::default());

        assert_eq!(report.minutes_passed, 60);
        assert_eq!(report.gains.get(&ResourceKind::Energy), Some(&90.0));
        assert_eq!(
            report.updated_resources.get(ResourceKind::Energy).unwrap().amount,
            100.0
        );
    }

    #[test]
    fn test_cap_at_1440_minutes() {
        let content = Content::default();
        let long = snapshot_with(ResourceKind::Scrap, saved_resource(0.0, 1.0e9, 1.0, 10_000));
        let exact = snapshot_with(ResourceKind::Scrap, saved_resource(0.0, 1.0e9, 1.0, 1_440));

        let a = catch_up(&long.resources, None, t0(), 1440, &content);
        let b = catch_up(&exact.resources, None, t0(), 1440, &content);
        assert_eq!(a.gains, b.gains);
        assert_eq!(a.gains.get(&ResourceKind::Scrap), Some(&43_200.0));
    }

    #[test]
    fn test_sample_snapshot_loads() {
        let snapshot = Snapshot::from_json_str(SAMPLE_SNAPSHOT_JSON).unwrap();
        let (manager, report) = SystemManager::load(&snapshot, Content::default(), t0());

        // Energy: 2 units * 60 min * 60 s * 1.0, capped by saved capacity 150
        assert_eq!(report.gains.get(&ResourceKind::Energy), Some(&110.0));
        // Crew: 1 * 60 * 60 * 0.1 = 360, capped at 20 - 2
        assert_eq!(report.gains.get(&ResourceKind::Crew), Some(&18.0));
        assert!(!report.gains.contains_key(&ResourceKind::Insight));

        assert_eq!(manager.amount(ResourceKind::Energy), 150.0);
        let crew = manager.world().generator(StationId::CrewQuarters).unwrap();
        assert_eq!(crew.units, 1);
        assert!(manager.world().logs.is_unlocked(1));
    }

    #[test]
    fn test_save_then_load_is_stable() {
        let mut manager = clicked_manager(StationId::Reactor, 40);
        manager.dispatch(PlayerAction::Purchase {
            key: UpgradeKey::new(StationId::Reactor, UpgradeKind::Automation),
        });
        manager.update(3_000);

        let snapshot = manager.save(t0());
        let text = snapshot.to_json_string().unwrap();
        let reloaded = Snapshot::from_json_str(&text).unwrap();
        let (restored, report) = SystemManager::load(&reloaded, Content::default(), t0());

        assert!(!report.has_gains());
        assert_eq!(restored.world().state_hash(), manager.world().state_hash());
    }

    #[test]
    fn test_load_after_absence_applies_gain_once() {
        let mut manager = fresh_manager();
        for _ in 0..10 {
            manager.dispatch(PlayerAction::Click {
                station: StationId::Reactor,
            });
        }
        manager.dispatch(PlayerAction::Purchase {
            key: UpgradeKey::new(StationId::Reactor, UpgradeKind::Automation),
        });
        let snapshot = manager.save(t0());

        let later = t0() + Duration::minutes(30);
        let (loaded, report) = SystemManager::load(&snapshot, Content::default(), later);
        assert_eq!(report.gains.get(&ResourceKind::Energy), Some(&100.0));
        assert_eq!(loaded.amount(ResourceKind::Energy), 100.0);

        let resaved = loaded.save(later);
        let (_, again) = SystemManager::load(&resaved, Content::default(), later);
        assert!(!again.has_gains());
    }
}

// =============================================================================
// Property Tests
// =============================================================================

proptest! {
    /// Storage stays within [0, capacity] after any sequence of actions and ticks.
    #[test]
    fn prop_storage_invariant_holds(script in strategies::arb_script(80)) {
        let mut manager = fresh_manager();
        run_script(&mut manager, &script);
        assert_storage_invariant(&manager);
    }

    /// Catch-up is idempotent and never exceeds capacity.
    #[test]
    fn prop_catch_up_idempotent(resources in strategies::arb_snapshot_resources()) {
        let content = Content::default();
        let now = strategies::reference_now();
        let a = catch_up(&resources, None, now, 1440, &content);
        let b = catch_up(&resources, None, now, 1440, &content);
        prop_assert_eq!(&a, &b);

        for (kind, entry) in a.updated_resources.iter() {
            let capacity = entry.capacity.unwrap_or(f64::MAX);
            let before = resources.get(kind).map_or(0.0, |e| e.amount);
            prop_assert!(entry.amount <= capacity.max(before));
            prop_assert!(entry.amount >= before);
        }
    }

    /// Combat never leaves an inert state with a pending charge.
    #[test]
    fn prop_idle_combat_is_inert(script in strategies::arb_script(80)) {
        let mut manager = clicked_manager(StationId::Reactor, 50);
        run_script(&mut manager, &script);
        let combat = manager.combat();
        if !combat.active {
            prop_assert_eq!(combat, &CombatState::default());
        }
    }
}
