//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the engine produces identical
//! results given identical inputs.
//!
//! # Testing Strategy
//!
//! The engine takes both `now` and `dt` from its caller, so a scripted
//! sequence of ticks and player actions must always land in the same
//! state. Sources of non-determinism to guard against:
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   The store is a `BTreeMap` and is always walked in entity id order.
//!
//! - **Wall clock reads**: nothing inside the engine may call `Utc::now()`.
//!
//! - **Enemy action selection**: cyclic and weighted selection must be
//!   pure functions of encounter state.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: Individual system determinism (resources, combat, etc.)
//! 2. **Property tests**: Random scripts must still produce deterministic outputs
//! 3. **Integration tests**: Full sessions including load and save are reproducible

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use outpost_core::data::Content;
use outpost_core::manager::{PlayerAction, SystemManager};

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of steps executed per run.
    pub steps: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic engine).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the engine was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Engine is non-deterministic!\n\
                 Runs: {}\n\
                 Steps: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.steps,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// One step of a scripted session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptStep {
    /// Advance the engine by this many milliseconds.
    Tick(u64),
    /// Dispatch a player action.
    Act(PlayerAction),
}

/// Apply one scripted step.
pub fn apply_step(manager: &mut SystemManager, step: &ScriptStep) {
    match step {
        ScriptStep::Tick(dt_ms) => {
            manager.update(*dt_ms);
        }
        ScriptStep::Act(action) => {
            manager.dispatch(action.clone());
        }
    }
}

/// Run a whole script against a manager.
pub fn run_script(manager: &mut SystemManager, script: &[ScriptStep]) {
    for step in script {
        apply_step(manager, step);
    }
}

/// Run a state machine multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run
/// * `steps` - Number of steps per run
/// * `setup` - Function to create initial state
/// * `step` - Function to advance state by one step
/// * `hash` - Function to compute state hash
///
/// # Example
///
/// ```ignore
/// use outpost_test_utils::determinism::verify_determinism;
///
/// let result = verify_determinism(
///     5,   // Run 5 times
///     100, // 100 ticks each
///     || fresh_manager(),
///     |manager| { manager.update(1_000); },
///     |manager| manager.state_hash(),
/// );
/// result.assert_deterministic();
/// ```
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    steps: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..steps {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        steps,
    }
}

/// Run the same script twice from identical setups and compare hashes.
pub fn verify_script_determinism<F>(setup_fn: F, script: &[ScriptStep]) -> DeterminismResult
where
    F: Fn() -> SystemManager,
{
    let hashes: Vec<u64> = (0..2)
        .map(|_| {
            let mut manager = setup_fn();
            run_script(&mut manager, script);
            manager.state_hash()
        })
        .collect();

    DeterminismResult {
        is_deterministic: hashes[0] == hashes[1],
        hashes,
        steps: script.len() as u64,
    }
}

/// Compare two runs step by step, finding the first divergence.
///
/// # Returns
///
/// `None` if the runs stay identical, `Some(step)` (1-based, 0 for the
/// initial state) where they first differ.
pub fn find_first_divergence<F>(setup_fn: F, script: &[ScriptStep]) -> Option<u64>
where
    F: Fn() -> SystemManager,
{
    let mut a = setup_fn();
    let mut b = setup_fn();

    if a.state_hash() != b.state_hash() {
        return Some(0);
    }

    for (i, step) in script.iter().enumerate() {
        apply_step(&mut a, step);
        apply_step(&mut b, step);

        if a.state_hash() != b.state_hash() {
            return Some(i as u64 + 1);
        }
    }

    None
}

/// Verify that a checkpoint round-trip preserves engine state exactly.
///
/// Also checks that the restored engine continues identically: the rest
/// of the script is applied to both and the final hashes compared.
pub fn verify_checkpoint_determinism<F>(
    setup_fn: F,
    content: &Content,
    before: &[ScriptStep],
    after: &[ScriptStep],
) -> bool
where
    F: Fn() -> SystemManager,
{
    let mut original = setup_fn();
    run_script(&mut original, before);

    let Ok(bytes) = original.checkpoint() else {
        return false;
    };
    let Ok(mut restored) = SystemManager::restore(&bytes, content.clone()) else {
        return false;
    };

    if original.state_hash() != restored.state_hash() {
        return false;
    }

    run_script(&mut original, after);
    run_script(&mut restored, after);
    original.state_hash() == restored.state_hash()
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for engine testing.
///
/// These strategies generate random but reproducible inputs for
/// property-based testing.
pub mod strategies {
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use proptest::prelude::*;

    use outpost_core::data::PlayerCombatAction;
    use outpost_core::events::AdjustDirection;
    use outpost_core::manager::PlayerAction;
    use outpost_core::snapshot::{ResourceSnapshot, SnapshotResources};
    use outpost_core::stations::{StationId, UpgradeKey, UpgradeKind};

    use super::ScriptStep;

    /// Generate one of the four stations.
    pub fn arb_station() -> impl Strategy<Value = StationId> {
        prop::sample::select(StationId::ALL.to_vec())
    }

    /// Generate an upgrade key.
    pub fn arb_upgrade_key() -> impl Strategy<Value = UpgradeKey> {
        (arb_station(), prop::sample::select(UpgradeKind::ALL.to_vec()))
            .prop_map(|(station, kind)| UpgradeKey::new(station, kind))
    }

    /// Generate a player combat action.
    pub fn arb_combat_action() -> impl Strategy<Value = PlayerCombatAction> {
        prop::sample::select(PlayerCombatAction::ALL.to_vec())
    }

    /// Generate a player action.
    ///
    /// Encounters are limited to the two tiers of the default catalog plus
    /// one that does not exist.
    pub fn arb_player_action() -> impl Strategy<Value = PlayerAction> {
        prop_oneof![
            4 => arb_station().prop_map(|station| PlayerAction::Click { station }),
            1 => (arb_station(), any::<bool>()).prop_map(|(station, up)| {
                PlayerAction::AdjustAutomation {
                    station,
                    direction: if up {
                        AdjustDirection::Increase
                    } else {
                        AdjustDirection::Decrease
                    },
                }
            }),
            2 => arb_upgrade_key().prop_map(|key| PlayerAction::Purchase { key }),
            1 => (1u32..4).prop_map(|tier| PlayerAction::StartEncounter {
                region: "debris_field".to_string(),
                tier,
            }),
            2 => arb_combat_action().prop_map(|action| PlayerAction::CombatAction { action }),
            1 => Just(PlayerAction::Retreat),
        ]
    }

    /// Generate a tick length in milliseconds.
    ///
    /// Range: 0 to 5000.
    pub fn arb_dt_ms() -> impl Strategy<Value = u64> {
        0u64..5_000
    }

    /// Generate one script step.
    pub fn arb_script_step() -> impl Strategy<Value = ScriptStep> {
        prop_oneof![
            arb_dt_ms().prop_map(ScriptStep::Tick),
            arb_player_action().prop_map(ScriptStep::Act),
        ]
    }

    /// Generate a script of up to `max_len` steps.
    pub fn arb_script(max_len: usize) -> impl Strategy<Value = Vec<ScriptStep>> {
        prop::collection::vec(arb_script_step(), 0..max_len)
    }

    /// Generate a saved resource entry with a timestamp within a week of
    /// the reference instant.
    pub fn arb_resource_snapshot() -> impl Strategy<Value = ResourceSnapshot> {
        (0.0f64..500.0, 1.0f64..1_000.0, 0u32..6, 0i64..10_080).prop_map(
            |(amount, capacity, generation, minutes_ago)| ResourceSnapshot {
                amount: amount.min(capacity),
                capacity: Some(capacity),
                generation: Some(f64::from(generation)),
                last_saved_at: Some(reference_now() - Duration::minutes(minutes_ago)),
            },
        )
    }

    /// Generate all four resource entries, each possibly missing.
    pub fn arb_snapshot_resources() -> impl Strategy<Value = SnapshotResources> {
        (
            proptest::option::of(arb_resource_snapshot()),
            proptest::option::of(arb_resource_snapshot()),
            proptest::option::of(arb_resource_snapshot()),
            proptest::option::of(arb_resource_snapshot()),
        )
            .prop_map(|(energy, insight, crew, scrap)| SnapshotResources {
                energy,
                insight,
                crew,
                scrap,
            })
    }

    /// The instant strategies measure "ago" from.
    #[must_use]
    pub fn reference_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0)
            .single()
            .unwrap_or_default()
    }
}
