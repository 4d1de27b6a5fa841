//! Data structures for game content.
//!
//! This module contains pure data structures that define resources,
//! upgrades, enemies and story logs. All structs are designed to be
//! deserialized from RON.
//!
//! **Note:** This module contains no IO - it only defines data types.
//! File loading is handled by `outpost_headless`.

mod combat_data;
mod content;
mod log_data;
mod resource_data;
mod upgrade_data;

pub use combat_data::{
    ActionSelection, EnemyActionData, EnemyData, EnemyEffect, LootData, PlayerActionData,
    PlayerCombatAction,
};
pub use content::{Content, EngineSettings};
pub use log_data::{LogData, LogTrigger};
pub use resource_data::ResourceData;
pub use upgrade_data::{CostScaling, SecondaryCost, UpgradeData};
