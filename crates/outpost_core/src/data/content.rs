//! The complete content catalog consumed by the engine.

use serde::{Deserialize, Serialize};

use super::combat_data::{
    ActionSelection, EnemyActionData, EnemyData, EnemyEffect, LootData, PlayerActionData,
    PlayerCombatAction,
};
use super::log_data::{LogData, LogTrigger};
use super::resource_data::ResourceData;
use super::upgrade_data::{CostScaling, SecondaryCost, UpgradeData};
use crate::components::ResourceCost;
use crate::error::{GameError, Result};
use crate::stations::{ResourceKind, StationId, UpgradeKey, UpgradeKind};

/// Engine-wide timing and balance knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Cadence of the external tick driver.
    pub tick_interval_ms: u64,
    /// Cadence of autosave requests reported by the manager.
    pub autosave_interval_ms: u64,
    /// Ceiling on offline catch-up.
    pub max_offline_minutes: u64,
    /// Telegraph delay between enemy charge and resolution.
    pub enemy_charge_ms: u64,
    /// Energy that must be stored for powered automation to run.
    pub automation_power_threshold: f64,
    /// Player hull points at encounter start.
    pub player_max_health: u32,
    /// Ceiling for the player's shield.
    pub player_max_shield: u32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1_000,
            autosave_interval_ms: 30_000,
            max_offline_minutes: 1_440,
            enemy_charge_ms: 700,
            automation_power_threshold: 1.0,
            player_max_health: 100,
            player_max_shield: 50,
        }
    }
}

/// Every piece of game data the engine reads.
///
/// Content is plain data: the engine never hard-codes a balance value.
/// Load it from RON with [`Content::from_ron_str`] or use the built-in
/// catalog via [`Content::default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    /// Timing and balance knobs.
    #[serde(default)]
    pub settings: EngineSettings,
    /// One entry per resource.
    pub resources: Vec<ResourceData>,
    /// One entry per upgrade key.
    pub upgrades: Vec<UpgradeData>,
    /// Enemy catalog.
    #[serde(default)]
    pub enemies: Vec<EnemyData>,
    /// Enemy action catalog.
    #[serde(default)]
    pub enemy_actions: Vec<EnemyActionData>,
    /// Player combat action tuning.
    #[serde(default)]
    pub player_actions: Vec<PlayerActionData>,
    /// Story log entries.
    #[serde(default)]
    pub logs: Vec<LogData>,
}

impl Content {
    /// Parse and validate content from a RON document.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::ContentParse`] on malformed RON and
    /// [`GameError::ContentValidation`] if references do not resolve.
    pub fn from_ron_str(source_name: &str, text: &str) -> Result<Self> {
        let content: Self = ron::from_str(text).map_err(|e| GameError::ContentParse {
            source_name: source_name.to_string(),
            message: e.to_string(),
        })?;
        let errors = content.validate();
        if errors.is_empty() {
            Ok(content)
        } else {
            Err(GameError::ContentValidation(errors))
        }
    }

    /// Serialize to pretty RON.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidState`] if serialization fails.
    pub fn to_ron_string(&self) -> Result<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| GameError::InvalidState(format!("Failed to serialize content: {e}")))
    }

    /// Find tuning for a resource.
    #[must_use]
    pub fn resource(&self, kind: ResourceKind) -> Option<&ResourceData> {
        self.resources.iter().find(|r| r.resource == kind)
    }

    /// Find an upgrade definition.
    #[must_use]
    pub fn upgrade(&self, key: UpgradeKey) -> Option<&UpgradeData> {
        self.upgrades.iter().find(|u| u.key() == key)
    }

    /// Find an enemy by region and tier.
    #[must_use]
    pub fn enemy(&self, region: &str, tier: u32) -> Option<&EnemyData> {
        self.enemies
            .iter()
            .find(|e| e.region == region && e.tier == tier)
    }

    /// Find an enemy action by id.
    #[must_use]
    pub fn enemy_action(&self, id: &str) -> Option<&EnemyActionData> {
        self.enemy_actions.iter().find(|a| a.id == id)
    }

    /// Find tuning for a player combat action.
    #[must_use]
    pub fn player_action(&self, action: PlayerCombatAction) -> Option<&PlayerActionData> {
        self.player_actions.iter().find(|a| a.action == action)
    }

    /// Validate internal consistency.
    ///
    /// Checks for:
    /// - Every resource has exactly one tuning entry
    /// - Upgrade keys are unique
    /// - Enemy action pools reference known actions
    /// - Weighted selections carry one positive weight per pool entry
    /// - Log ids are unique
    ///
    /// Returns a list of validation errors.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        for kind in ResourceKind::ALL {
            let count = self.resources.iter().filter(|r| r.resource == kind).count();
            if count != 1 {
                errors.push(format!("Resource '{kind}' has {count} tuning entries"));
            }
        }

        for resource in &self.resources {
            if resource.base_capacity <= 0.0 || resource.capacity_growth < 1.0 {
                errors.push(format!(
                    "Resource '{}' has invalid capacity curve",
                    resource.resource
                ));
            }
        }

        for (i, upgrade) in self.upgrades.iter().enumerate() {
            if self.upgrades[..i].iter().any(|u| u.key() == upgrade.key()) {
                errors.push(format!("Duplicate upgrade '{}'", upgrade.key()));
            }
            if let Some(secondary) = upgrade.secondary {
                if secondary.base <= 0.0 {
                    errors.push(format!(
                        "Upgrade '{}' has non-positive secondary base",
                        upgrade.key()
                    ));
                }
            }
        }

        for enemy in &self.enemies {
            if enemy.actions.is_empty() {
                errors.push(format!("Enemy '{}' has an empty action pool", enemy.id));
            }
            for action_id in &enemy.actions {
                if self.enemy_action(action_id).is_none() {
                    errors.push(format!(
                        "Enemy '{}' uses unknown action '{}'",
                        enemy.id, action_id
                    ));
                }
            }
            if let ActionSelection::Weighted(weights) = &enemy.selection {
                if weights.len() != enemy.actions.len() {
                    errors.push(format!(
                        "Enemy '{}' has {} weights for {} actions",
                        enemy.id,
                        weights.len(),
                        enemy.actions.len()
                    ));
                }
                if weights.iter().any(|w| *w == 0) {
                    errors.push(format!("Enemy '{}' has a zero weight", enemy.id));
                }
            }
        }

        for (i, log) in self.logs.iter().enumerate() {
            if self.logs[..i].iter().any(|l| l.id == log.id) {
                errors.push(format!("Duplicate log id {}", log.id));
            }
        }

        errors
    }
}

impl Default for Content {
    fn default() -> Self {
        Self {
            settings: EngineSettings::default(),
            resources: default_resources(),
            upgrades: default_upgrades(),
            enemies: default_enemies(),
            enemy_actions: default_enemy_actions(),
            player_actions: default_player_actions(),
            logs: default_logs(),
        }
    }
}

fn default_resources() -> Vec<ResourceData> {
    let entry = |resource, name: &str, capacity, growth, rate, power| ResourceData {
        resource,
        display_name: name.to_string(),
        click_gain: 1.0,
        base_capacity: capacity,
        capacity_growth: growth,
        per_unit_rate: rate,
        offline_factor: rate,
        requires_power: power,
        starting_amount: 0.0,
    };
    vec![
        entry(ResourceKind::Energy, "Energy", 100.0, 1.5, 1.0, false),
        entry(ResourceKind::Insight, "Insight", 50.0, 1.5, 0.2, true),
        entry(ResourceKind::Crew, "Crew", 20.0, 1.25, 0.1, true),
        entry(ResourceKind::Scrap, "Scrap", 50.0, 1.5, 0.5, true),
    ]
}

fn default_upgrades() -> Vec<UpgradeData> {
    let expansion = |station: StationId, secondary_resource| UpgradeData {
        station,
        kind: UpgradeKind::Expansion,
        primary_resource: station.resource(),
        scaling: CostScaling::Capacity { multiplier: 0.8 },
        secondary: Some(SecondaryCost {
            resource: secondary_resource,
            threshold: 5,
            base: 2.0,
            coefficient: 5.0,
        }),
        max_level: None,
    };
    let automation = |station: StationId, primary_resource, base_cost| UpgradeData {
        station,
        kind: UpgradeKind::Automation,
        primary_resource,
        scaling: CostScaling::Linear { base_cost },
        secondary: Some(SecondaryCost {
            resource: ResourceKind::Insight,
            threshold: 10,
            base: 1.5,
            coefficient: 10.0,
        }),
        max_level: None,
    };
    vec![
        expansion(StationId::Reactor, ResourceKind::Scrap),
        automation(StationId::Reactor, ResourceKind::Energy, 10.0),
        expansion(StationId::Processor, ResourceKind::Scrap),
        automation(StationId::Processor, ResourceKind::Energy, 25.0),
        expansion(StationId::CrewQuarters, ResourceKind::Scrap),
        automation(StationId::CrewQuarters, ResourceKind::Insight, 15.0),
        expansion(StationId::Manufacturing, ResourceKind::Crew),
        automation(StationId::Manufacturing, ResourceKind::Crew, 5.0),
    ]
}

fn default_enemy_actions() -> Vec<EnemyActionData> {
    let action = |id: &str, name: &str, effect| EnemyActionData {
        id: id.to_string(),
        name: name.to_string(),
        effect,
    };
    vec![
        action("ram", "Ramming run", EnemyEffect::Attack { damage: 12 }),
        action("patch", "Hull patch", EnemyEffect::Repair { health: 8 }),
        action("laser", "Charged laser", EnemyEffect::Attack { damage: 20 }),
        action("barrier", "Barrier", EnemyEffect::Fortify { shield: 15 }),
    ]
}

fn default_enemies() -> Vec<EnemyData> {
    vec![
        EnemyData {
            id: "scavenger_drone".to_string(),
            name: "Scavenger Drone".to_string(),
            region: "debris_field".to_string(),
            tier: 1,
            health: 40,
            shield: 10,
            actions: vec!["ram".to_string(), "ram".to_string(), "patch".to_string()],
            selection: ActionSelection::Cyclic,
            loot: vec![LootData {
                resource: ResourceKind::Scrap,
                amount: 15.0,
            }],
        },
        EnemyData {
            id: "raider_corvette".to_string(),
            name: "Raider Corvette".to_string(),
            region: "debris_field".to_string(),
            tier: 2,
            health: 90,
            shield: 30,
            actions: vec![
                "laser".to_string(),
                "barrier".to_string(),
                "ram".to_string(),
            ],
            selection: ActionSelection::Weighted(vec![3, 1, 2]),
            loot: vec![
                LootData {
                    resource: ResourceKind::Scrap,
                    amount: 40.0,
                },
                LootData {
                    resource: ResourceKind::Insight,
                    amount: 10.0,
                },
            ],
        },
    ]
}

fn default_player_actions() -> Vec<PlayerActionData> {
    vec![
        PlayerActionData {
            action: PlayerCombatAction::Weapon,
            cost: vec![ResourceCost::new(ResourceKind::Energy, 5.0)],
            magnitude: 15,
        },
        PlayerActionData {
            action: PlayerCombatAction::Shield,
            cost: vec![ResourceCost::new(ResourceKind::Energy, 4.0)],
            magnitude: 12,
        },
        PlayerActionData {
            action: PlayerCombatAction::Repair,
            cost: vec![ResourceCost::new(ResourceKind::Scrap, 5.0)],
            magnitude: 15,
        },
        PlayerActionData {
            action: PlayerCombatAction::Countermeasure,
            cost: vec![ResourceCost::new(ResourceKind::Insight, 3.0)],
            magnitude: 50,
        },
    ]
}

fn default_logs() -> Vec<LogData> {
    vec![
        LogData {
            id: 0,
            title: "Station online".to_string(),
            trigger: LogTrigger::Start,
        },
        LogData {
            id: 1,
            title: "First automation".to_string(),
            trigger: LogTrigger::UpgradeLevel {
                station: StationId::Reactor,
                kind: UpgradeKind::Automation,
                level: 1,
            },
        },
        LogData {
            id: 2,
            title: "Full reactor".to_string(),
            trigger: LogTrigger::ResourceAmount {
                resource: ResourceKind::Energy,
                amount: 100.0,
            },
        },
        LogData {
            id: 3,
            title: "First contact".to_string(),
            trigger: LogTrigger::EncountersWon { count: 1 },
        },
    ]
}
