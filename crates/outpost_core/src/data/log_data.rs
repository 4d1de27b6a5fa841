//! Story log entries and their unlock triggers.

use serde::{Deserialize, Serialize};

use crate::stations::{ResourceKind, StationId, UpgradeKind};

/// Condition that unlocks a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum LogTrigger {
    /// Unlocked as soon as the world is running.
    Start,
    /// An upgrade reached at least `level`.
    UpgradeLevel {
        /// Station owning the upgrade.
        station: StationId,
        /// Upgrade family.
        kind: UpgradeKind,
        /// Level required.
        level: u32,
    },
    /// At least `count` encounters won this session or earlier.
    EncountersWon {
        /// Victories required.
        count: u32,
    },
    /// A resource is holding at least `amount`.
    ResourceAmount {
        /// Resource checked.
        resource: ResourceKind,
        /// Amount required.
        amount: f64,
    },
}

/// Data-driven log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogData {
    /// Numeric id persisted in `unlockedLogs`.
    pub id: u32,
    /// Entry title.
    pub title: String,
    /// Unlock condition.
    pub trigger: LogTrigger,
}
