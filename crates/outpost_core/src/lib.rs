//! # Outpost Core
//!
//! Simulation engine for the Outpost idle station game.
//!
//! This crate contains **only** simulation logic:
//! - No rendering
//! - No IO
//! - No wall clock (callers pass `now` and `dt`)
//!
//! The presentation and persistence layers talk to the engine through
//! exactly two shapes: the [`snapshot::Snapshot`] loaded at session start
//! and saved on autosave, and the [`events::GameEvent`] notifications
//! published outward.
//!
//! ## Crate Structure
//!
//! - [`store`] - Entity/component store and the [`store::World`]
//! - [`events`] - Synchronous typed event bus
//! - [`resources`] - Production, clicks, automation and spending
//! - [`upgrade_cost`] / [`upgrades`] - Pricing and purchasing upgrades
//! - [`combat`] - Encounter state machine
//! - [`logs`] - Story log unlocking
//! - [`offline`] - Offline catch-up at load
//! - [`manager`] - The System Manager driving all of the above
//! - [`data`] - Content definitions loaded from RON

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod combat;
pub mod components;
pub mod data;
pub mod error;
pub mod events;
pub mod logs;
pub mod manager;
pub mod offline;
pub mod resources;
pub mod snapshot;
pub mod stations;
pub mod store;
pub mod upgrade_cost;
pub mod upgrades;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::combat::{CombatOutcome, CombatPhase, CombatState, CombatSystem};
    pub use crate::components::*;
    pub use crate::data::{Content, EngineSettings, PlayerCombatAction};
    pub use crate::error::{GameError, Result};
    pub use crate::events::{AdjustDirection, EventBus, EventKind, GameEvent, Subscription};
    pub use crate::logs::{LogBook, LogSystem};
    pub use crate::manager::{ActionReport, PlayerAction, SystemManager, TickReport};
    pub use crate::offline::{catch_up, OfflineReport};
    pub use crate::resources::ResourceSystem;
    pub use crate::snapshot::{ResourceSnapshot, Snapshot, SnapshotResources, UpgradeValue};
    pub use crate::stations::{ResourceKind, StationId, UpgradeKey, UpgradeKind};
    pub use crate::store::{ComponentBag, Store, World};
    pub use crate::upgrade_cost::cost_of;
    pub use crate::upgrades::{PurchaseOutcome, UpgradeSystem};
}
