//! Turn-based encounter state machine.
//!
//! An encounter cycles through:
//!
//! ```text
//! Idle -> PlayerActing -> (resolve) -> EnemyCharging -> (resolve) -> PlayerActing ...
//!                      \-> Victory | Defeat | Retreat -> Idle
//! ```
//!
//! Player actions and enemy actions resolve synchronously the moment they
//! happen. The only timed transition is the enemy's telegraph: it is stored
//! as data (`charge_remaining_ms`) and counted down by [`CombatSystem::update`],
//! so ending the encounter cancels it by resetting the field.
//!
//! Damage always hits shield before health. Action costs are paid through
//! the resource system by the caller before [`CombatSystem::player_action`]
//! is invoked; this module never touches resources.

use serde::{Deserialize, Serialize};

use crate::data::{ActionSelection, Content, EnemyData, EnemyEffect, PlayerCombatAction};
use crate::events::GameEvent;

/// How an encounter ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombatOutcome {
    /// Enemy health reached zero.
    Victory,
    /// Player health reached zero.
    Defeat,
    /// The player withdrew.
    Retreat,
}

/// Observable phase of the encounter cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombatPhase {
    /// No encounter.
    #[default]
    Idle,
    /// Waiting for exactly one player action.
    PlayerActing,
    /// The enemy is telegraphing its next action.
    EnemyCharging,
}

/// Live encounter state. Inert (all defaults) while idle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CombatState {
    /// Whether an encounter is running.
    pub active: bool,
    /// Current phase.
    pub phase: CombatPhase,
    /// Enemy definition id.
    pub current_enemy_id: Option<String>,
    /// Region of the encounter.
    pub region: String,
    /// Difficulty tier.
    pub tier: u32,
    /// Player hull points.
    pub player_health: u32,
    /// Player shield points.
    pub player_shield: u32,
    /// Enemy hull points.
    pub enemy_health: u32,
    /// Enemy hull ceiling for repairs.
    pub enemy_max_health: u32,
    /// Enemy shield points.
    pub enemy_shield: u32,
    /// Enemy action being telegraphed.
    pub charging_action_id: Option<String>,
    /// Time left before the charged action resolves.
    pub charge_remaining_ms: u64,
    /// Percent reduction applied to the next enemy attack.
    pub countermeasure_percent: u32,
    /// Cursor for cyclic selection.
    pub cycle_index: usize,
    /// Running weights for smooth weighted round-robin selection.
    pub selection_weights: Vec<i64>,
}

/// Owner of the combat sub-state.
#[derive(Debug, Clone, Default)]
pub struct CombatSystem {
    state: CombatState,
}

impl CombatSystem {
    /// Create an idle combat system.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume from a previously captured state.
    #[must_use]
    pub const fn from_state(state: CombatState) -> Self {
        Self { state }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> &CombatState {
        &self.state
    }

    /// Check if an encounter is running.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.state.active
    }

    /// Check if a player action would be accepted right now.
    ///
    /// Callers check this before paying an action's cost.
    #[must_use]
    pub fn accepts_player_action(&self) -> bool {
        self.state.active && self.state.phase == CombatPhase::PlayerActing
    }

    /// Begin an encounter against the enemy defined for `region`/`tier`.
    ///
    /// Ignored while an encounter is already running. An unknown enemy is
    /// logged and leaves the system idle.
    pub fn start(&mut self, content: &Content, region: &str, tier: u32) -> Vec<GameEvent> {
        if self.state.active {
            tracing::warn!(region, tier, "Encounter start ignored: already in combat");
            return Vec::new();
        }
        let Some(enemy) = content.enemy(region, tier) else {
            tracing::warn!(region, tier, "Encounter start ignored: no enemy defined");
            return Vec::new();
        };

        self.state = CombatState {
            active: true,
            phase: CombatPhase::PlayerActing,
            current_enemy_id: Some(enemy.id.clone()),
            region: region.to_string(),
            tier,
            player_health: content.settings.player_max_health,
            player_shield: 0,
            enemy_health: enemy.health,
            enemy_max_health: enemy.health,
            enemy_shield: enemy.shield,
            charging_action_id: None,
            charge_remaining_ms: 0,
            countermeasure_percent: 0,
            cycle_index: 0,
            selection_weights: vec![0; enemy.actions.len()],
        };

        tracing::info!(enemy = %enemy.id, region, tier, "Encounter started");
        vec![GameEvent::CombatStarted {
            enemy_id: enemy.id.clone(),
            region: region.to_string(),
            tier,
        }]
    }

    /// Apply one player action.
    ///
    /// Only accepted in [`CombatPhase::PlayerActing`]. After it resolves the
    /// encounter either ends in victory or the enemy starts charging.
    pub fn player_action(
        &mut self,
        content: &Content,
        action: PlayerCombatAction,
    ) -> Vec<GameEvent> {
        if !self.accepts_player_action() {
            tracing::debug!(?action, phase = ?self.state.phase, "Player action ignored");
            return Vec::new();
        }
        let magnitude = content.player_action(action).map_or(0, |a| a.magnitude);
        let settings = &content.settings;
        let state = &mut self.state;

        match action {
            PlayerCombatAction::Weapon => {
                absorb(&mut state.enemy_shield, &mut state.enemy_health, magnitude);
            }
            PlayerCombatAction::Shield => {
                state.player_shield = state
                    .player_shield
                    .saturating_add(magnitude)
                    .min(settings.player_max_shield);
            }
            PlayerCombatAction::Repair => {
                state.player_health = state
                    .player_health
                    .saturating_add(magnitude)
                    .min(settings.player_max_health);
            }
            PlayerCombatAction::Countermeasure => {
                state.countermeasure_percent = magnitude.min(100);
            }
        }

        let mut events = vec![GameEvent::PlayerActed { action }];

        if self.state.enemy_health == 0 {
            events.extend(self.finish(content, CombatOutcome::Victory));
            return events;
        }

        events.extend(self.begin_charge(content));
        events
    }

    /// Advance the enemy telegraph by `dt_ms`.
    ///
    /// Resolves the charged action once the countdown reaches zero. Does
    /// nothing outside [`CombatPhase::EnemyCharging`].
    pub fn update(&mut self, content: &Content, dt_ms: u64) -> Vec<GameEvent> {
        if !self.state.active || self.state.phase != CombatPhase::EnemyCharging {
            return Vec::new();
        }

        self.state.charge_remaining_ms = self.state.charge_remaining_ms.saturating_sub(dt_ms);
        if self.state.charge_remaining_ms > 0 {
            return Vec::new();
        }

        self.resolve_enemy_action(content)
    }

    /// Withdraw from the current encounter. No loot is awarded.
    pub fn retreat(&mut self, content: &Content) -> Vec<GameEvent> {
        if !self.state.active {
            return Vec::new();
        }
        self.finish(content, CombatOutcome::Retreat)
    }

    fn begin_charge(&mut self, content: &Content) -> Vec<GameEvent> {
        let Some(enemy) = self.current_enemy(content) else {
            tracing::warn!(enemy = ?self.state.current_enemy_id, "Enemy vanished from content");
            return self.finish(content, CombatOutcome::Retreat);
        };

        let action_id = select_action(&mut self.state, enemy);
        let delay_ms = content.settings.enemy_charge_ms;

        self.state.phase = CombatPhase::EnemyCharging;
        self.state.charging_action_id = action_id.clone();
        self.state.charge_remaining_ms = delay_ms;

        match action_id {
            Some(action_id) => vec![GameEvent::EnemyCharging { action_id, delay_ms }],
            None => Vec::new(),
        }
    }

    fn resolve_enemy_action(&mut self, content: &Content) -> Vec<GameEvent> {
        let action_id = self.state.charging_action_id.take();
        self.state.charge_remaining_ms = 0;
        self.state.phase = CombatPhase::PlayerActing;

        let action = action_id.as_deref().and_then(|id| content.enemy_action(id));
        let Some(action) = action else {
            tracing::warn!(action = ?action_id, "Unknown enemy action, turn skipped");
            return Vec::new();
        };

        let state = &mut self.state;
        match action.effect {
            EnemyEffect::Attack { damage } => {
                let kept = 100 - state.countermeasure_percent.min(100);
                let reduced = u64::from(damage) * u64::from(kept) / 100;
                state.countermeasure_percent = 0;
                absorb(
                    &mut state.player_shield,
                    &mut state.player_health,
                    u32::try_from(reduced).unwrap_or(u32::MAX),
                );
            }
            EnemyEffect::Fortify { shield } => {
                state.enemy_shield = state.enemy_shield.saturating_add(shield);
            }
            EnemyEffect::Repair { health } => {
                state.enemy_health = state
                    .enemy_health
                    .saturating_add(health)
                    .min(state.enemy_max_health);
            }
        }
        tracing::debug!(
            action = %action.id,
            player_health = state.player_health,
            "Enemy action resolved"
        );

        if self.state.player_health == 0 {
            return self.finish(content, CombatOutcome::Defeat);
        }
        Vec::new()
    }

    fn finish(&mut self, content: &Content, outcome: CombatOutcome) -> Vec<GameEvent> {
        let state = std::mem::take(&mut self.state);
        let enemy_id = state.current_enemy_id.unwrap_or_default();
        let mut events = Vec::new();

        if outcome == CombatOutcome::Victory {
            if let Some(enemy) = content.enemy(&state.region, state.tier) {
                events.extend(enemy.loot.iter().map(|loot| GameEvent::LootAwarded {
                    resource: loot.resource,
                    amount: loot.amount,
                }));
            }
            events.push(GameEvent::EncounterCompleted {
                enemy_id: enemy_id.clone(),
                region: state.region,
                tier: state.tier,
            });
        }

        tracing::info!(enemy = %enemy_id, ?outcome, "Encounter ended");
        events.push(GameEvent::CombatEnded { enemy_id, outcome });
        events
    }

    fn current_enemy<'a>(&self, content: &'a Content) -> Option<&'a EnemyData> {
        content
            .enemy(&self.state.region, self.state.tier)
            .filter(|enemy| Some(&enemy.id) == self.state.current_enemy_id.as_ref())
    }
}

/// Subtract damage from shield first, overflow into health.
fn absorb(shield: &mut u32, health: &mut u32, damage: u32) {
    let absorbed = damage.min(*shield);
    *shield -= absorbed;
    *health = health.saturating_sub(damage - absorbed);
}

/// Pick the enemy's next action id.
///
/// Weighted pools use smooth weighted round-robin: every weight is added to
/// its running counter, the largest counter wins (first on ties) and the
/// total is subtracted from it. Over one period each action appears exactly
/// `weight` times.
fn select_action(state: &mut CombatState, enemy: &EnemyData) -> Option<String> {
    if enemy.actions.is_empty() {
        return None;
    }

    let index = match &enemy.selection {
        ActionSelection::Weighted(weights)
            if weights.len() == enemy.actions.len()
                && state.selection_weights.len() == weights.len() =>
        {
            let total: i64 = weights.iter().map(|w| i64::from(*w)).sum();
            let mut best = 0;
            for (i, weight) in weights.iter().enumerate() {
                state.selection_weights[i] += i64::from(*weight);
                if state.selection_weights[i] > state.selection_weights[best] {
                    best = i;
                }
            }
            state.selection_weights[best] -= total;
            best
        }
        _ => {
            let index = state.cycle_index % enemy.actions.len();
            state.cycle_index = state.cycle_index.wrapping_add(1);
            index
        }
    };

    enemy.actions.get(index).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drone(content: &Content) -> CombatSystem {
        let mut combat = CombatSystem::new();
        combat.start(content, "debris_field", 1);
        combat
    }

    #[test]
    fn test_absorb_shield_then_health() {
        let mut shield = 20;
        let mut health = 50;
        absorb(&mut shield, &mut health, 30);
        assert_eq!((shield, health), (0, 40));

        absorb(&mut shield, &mut health, 100);
        assert_eq!((shield, health), (0, 0));
    }

    #[test]
    fn test_start_seeds_enemy() {
        let content = Content::default();
        let mut combat = CombatSystem::new();
        let events = combat.start(&content, "debris_field", 1);

        assert!(matches!(events[0], GameEvent::CombatStarted { .. }));
        let state = combat.state();
        assert!(state.active);
        assert_eq!(state.phase, CombatPhase::PlayerActing);
        assert_eq!(state.enemy_health, 40);
        assert_eq!(state.enemy_shield, 10);
        assert_eq!(state.player_health, 100);
    }

    #[test]
    fn test_unknown_enemy_stays_idle() {
        let content = Content::default();
        let mut combat = CombatSystem::new();
        assert!(combat.start(&content, "nebula", 7).is_empty());
        assert!(!combat.is_active());
    }

    #[test]
    fn test_weapon_then_enemy_charges() {
        let content = Content::default();
        let mut combat = drone(&content);

        let events = combat.player_action(&content, PlayerCombatAction::Weapon);
        assert_eq!(
            events.last(),
            Some(&GameEvent::EnemyCharging {
                action_id: "ram".to_string(),
                delay_ms: 700
            })
        );
        let state = combat.state();
        assert_eq!((state.enemy_shield, state.enemy_health), (0, 35));
        assert_eq!(state.phase, CombatPhase::EnemyCharging);

        // Only one action per cycle
        assert!(combat
            .player_action(&content, PlayerCombatAction::Weapon)
            .is_empty());
    }

    #[test]
    fn test_charge_resolves_after_delay() {
        let content = Content::default();
        let mut combat = drone(&content);
        combat.player_action(&content, PlayerCombatAction::Shield);
        assert_eq!(combat.state().player_shield, 12);

        combat.update(&content, 699);
        assert_eq!(combat.state().phase, CombatPhase::EnemyCharging);

        combat.update(&content, 1);
        let state = combat.state();
        assert_eq!(state.phase, CombatPhase::PlayerActing);
        assert_eq!(state.player_shield, 0);
        assert_eq!(state.player_health, 100);
    }

    #[test]
    fn test_countermeasure_halves_next_attack() {
        let content = Content::default();
        let mut combat = drone(&content);
        combat.player_action(&content, PlayerCombatAction::Countermeasure);
        combat.update(&content, 700);

        assert_eq!(combat.state().player_health, 94);
        assert_eq!(combat.state().countermeasure_percent, 0);
    }

    #[test]
    fn test_retreat_cancels_pending_charge() {
        let content = Content::default();
        let mut combat = drone(&content);
        combat.player_action(&content, PlayerCombatAction::Weapon);

        let events = combat.retreat(&content);
        assert_eq!(
            events,
            vec![GameEvent::CombatEnded {
                enemy_id: "scavenger_drone".to_string(),
                outcome: CombatOutcome::Retreat
            }]
        );
        assert_eq!(combat.state(), &CombatState::default());

        assert!(combat.update(&content, 10_000).is_empty());
        assert_eq!(combat.state(), &CombatState::default());
    }

    #[test]
    fn test_victory_awards_loot() {
        let mut content = Content::default();
        content.enemies[0].health = 10;
        content.enemies[0].shield = 0;
        let mut combat = drone(&content);

        let events = combat.player_action(&content, PlayerCombatAction::Weapon);
        assert!(events.contains(&GameEvent::LootAwarded {
            resource: crate::stations::ResourceKind::Scrap,
            amount: 15.0
        }));
        assert!(events
            .iter()
            .any(|e| matches!(e, GameEvent::EncounterCompleted { .. })));
        assert_eq!(
            events.last(),
            Some(&GameEvent::CombatEnded {
                enemy_id: "scavenger_drone".to_string(),
                outcome: CombatOutcome::Victory
            })
        );
        assert!(!combat.is_active());
    }

    #[test]
    fn test_defeat() {
        let mut content = Content::default();
        content.settings.player_max_health = 5;
        let mut combat = drone(&content);
        combat.player_action(&content, PlayerCombatAction::Repair);

        let events = combat.update(&content, 700);
        assert!(matches!(
            events.last(),
            Some(GameEvent::CombatEnded {
                outcome: CombatOutcome::Defeat,
                ..
            })
        ));
        assert!(!events
            .iter()
            .any(|e| matches!(e, GameEvent::LootAwarded { .. })));
    }

    #[test]
    fn test_unknown_enemy_action_skips_turn() {
        let mut content = Content::default();
        content.enemies[0].actions = vec!["warp_bomb".to_string()];
        let mut combat = drone(&content);
        combat.player_action(&content, PlayerCombatAction::Weapon);

        let events = combat.update(&content, 700);
        assert!(events.is_empty());
        assert_eq!(combat.state().player_health, 100);
        assert!(combat.accepts_player_action());
    }

    #[test]
    fn test_cyclic_selection() {
        let content = Content::default();
        let enemy = content.enemy("debris_field", 1).unwrap();
        let mut state = CombatState::default();

        let picks: Vec<String> = (0..4)
            .filter_map(|_| select_action(&mut state, enemy))
            .collect();
        assert_eq!(picks, vec!["ram", "ram", "patch", "ram"]);
    }

    #[test]
    fn test_weighted_selection_is_smooth_and_exact() {
        let content = Content::default();
        let enemy = content.enemy("debris_field", 2).unwrap();
        let mut state = CombatState {
            selection_weights: vec![0; 3],
            ..Default::default()
        };

        let picks: Vec<String> = (0..6)
            .filter_map(|_| select_action(&mut state, enemy))
            .collect();
        assert_eq!(
            picks,
            vec!["laser", "ram", "laser", "barrier", "ram", "laser"]
        );
        assert_eq!(state.selection_weights, vec![0, 0, 0]);
    }
}
