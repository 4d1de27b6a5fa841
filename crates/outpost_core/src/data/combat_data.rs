//! Enemy, enemy action and player combat action definitions.

use serde::{Deserialize, Serialize};

use crate::components::ResourceCost;
use crate::stations::ResourceKind;

/// What an enemy action does when it resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnemyEffect {
    /// Damage the player, shield first.
    Attack {
        /// Raw damage before countermeasures.
        damage: u32,
    },
    /// Add to the enemy's own shield.
    Fortify {
        /// Shield points added.
        shield: u32,
    },
    /// Heal the enemy up to its starting health.
    Repair {
        /// Health restored.
        health: u32,
    },
}

/// Data-driven enemy action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnemyActionData {
    /// Identifier referenced from enemy action pools.
    pub id: String,
    /// Telegraph text shown while charging.
    pub name: String,
    /// Effect applied on resolution.
    pub effect: EnemyEffect,
}

/// How an enemy picks its next action from its pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionSelection {
    /// Walk the pool in order, wrapping around.
    Cyclic,
    /// Smooth weighted round-robin; one weight per pool entry.
    Weighted(Vec<u32>),
}

/// Resource dropped on victory.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LootData {
    /// Resource awarded.
    pub resource: ResourceKind,
    /// Amount awarded (clamped by capacity on arrival).
    pub amount: f64,
}

/// Data-driven enemy definition.
///
/// # Example RON
///
/// ```ron
/// EnemyData(
///     id: "scavenger_drone",
///     name: "Scavenger Drone",
///     region: "debris_field",
///     tier: 1,
///     health: 40,
///     shield: 10,
///     actions: ["ram", "ram", "patch"],
///     selection: Cyclic,
///     loot: [LootData(resource: Scrap, amount: 15.0)],
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemyData {
    /// Unique identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Region the enemy appears in.
    pub region: String,
    /// Difficulty tier within the region.
    pub tier: u32,
    /// Starting hull points.
    pub health: u32,
    /// Starting shield points.
    #[serde(default)]
    pub shield: u32,
    /// Ids of [`EnemyActionData`] the enemy may use.
    pub actions: Vec<String>,
    /// How the next action is chosen.
    #[serde(default = "default_selection")]
    pub selection: ActionSelection,
    /// Victory rewards.
    #[serde(default)]
    pub loot: Vec<LootData>,
}

fn default_selection() -> ActionSelection {
    ActionSelection::Cyclic
}

/// The four moves available to the player each cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerCombatAction {
    /// Raise the player's shield.
    Shield,
    /// Damage the enemy, shield first.
    Weapon,
    /// Restore player health.
    Repair,
    /// Weaken the next enemy attack by a percentage.
    Countermeasure,
}

impl PlayerCombatAction {
    /// All player actions.
    pub const ALL: [Self; 4] = [
        Self::Shield,
        Self::Weapon,
        Self::Repair,
        Self::Countermeasure,
    ];
}

/// Tuning for one player combat action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerActionData {
    /// Which action this entry tunes.
    pub action: PlayerCombatAction,
    /// Resources spent per use.
    #[serde(default)]
    pub cost: Vec<ResourceCost>,
    /// Damage, shield, health or percentage depending on the action.
    pub magnitude: u32,
}
