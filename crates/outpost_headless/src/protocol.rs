//! JSON protocol for the headless driver.
//!
//! The driver communicates via JSON lines (one JSON object per line):
//!
//! **Input (stdin):** Commands from the controller
//! **Output (stdout):** Responses, one per command
//!
//! # Protocol Flow
//!
//! 1. Driver loads content and snapshot, runs catch-up, outputs `ready`
//! 2. Controller sends commands as JSON lines
//! 3. Every command is answered with exactly one response line
//! 4. `quit` (or end of input) outputs `bye` and exits
//!
//! # Example Session
//!
//! ```text
//! <- {"type":"ready","version":"1.0","minutes_passed":60,"gains":{"energy":90.0}}
//! -> {"cmd":"click","station":"reactor"}
//! <- {"type":"ack","cmd":"click","accepted":true,"events":[...]}
//! -> {"cmd":"purchase","key":"reactor:expansion"}
//! <- {"type":"ack","cmd":"purchase","accepted":true,"purchase":{"result":"purchased","level":1},"events":[...]}
//! -> {"cmd":"tick","count":30}
//! <- {"type":"ack","cmd":"tick","accepted":true,"autosave_due":true,"events":[...]}
//! -> {"cmd":"hash"}
//! <- {"type":"hash","tick":30,"hash":1234567890}
//! -> {"cmd":"save"}
//! <- {"type":"snapshot","snapshot":{"resources":{...},"upgrades":{...},...}}
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use outpost_core::combat::CombatState;
use outpost_core::components::ResourceCost;
use outpost_core::data::PlayerCombatAction;
use outpost_core::events::{AdjustDirection, GameEvent};
use outpost_core::snapshot::Snapshot;
use outpost_core::stations::{ResourceKind, StationId};
use outpost_core::upgrades::PurchaseOutcome;

/// Protocol version reported in `ready`.
pub const PROTOCOL_VERSION: &str = "1.0";

// ============================================================================
// Input Commands (controller -> driver)
// ============================================================================

/// Commands that can be sent to the headless driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    /// Advance the engine by `count` ticks of `dt_ms` each.
    Tick {
        /// Number of ticks (default: 1).
        #[serde(default = "default_tick_count")]
        count: u32,
        /// Tick length; defaults to the content's tick interval.
        #[serde(default)]
        dt_ms: Option<u64>,
    },

    /// Click a station.
    Click {
        /// Station clicked.
        station: StationId,
    },

    /// Switch one automation unit on or off.
    Adjust {
        /// Station adjusted.
        station: StationId,
        /// `increase` or `decrease`.
        direction: AdjustDirection,
    },

    /// Buy the next level of an upgrade, e.g. `"reactor:expansion"`.
    Purchase {
        /// Upgrade key.
        key: String,
    },

    /// Price the next level of an upgrade without buying it.
    Preview {
        /// Upgrade key.
        key: String,
    },

    /// Begin an encounter.
    StartEncounter {
        /// Region name.
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

    /// Record that a UI page was visited.
    Visit {
        /// Page name.
        page: String,
    },

    /// Query current state without advancing time.
    State,

    /// Produce the snapshot the persistence layer would store.
    Save,

    /// State hash for determinism verification.
    Hash,

    /// Quit the driver.
    Quit,
}

fn default_tick_count() -> u32 {
    1
}

// ============================================================================
// Output Responses (driver -> controller)
// ============================================================================

/// Responses sent from the headless driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Driver is ready to accept commands.
    Ready {
        /// Protocol version.
        version: String,
        /// Whole minutes credited by offline catch-up.
        minutes_passed: u64,
        /// Offline gains per resource.
        gains: BTreeMap<ResourceKind, f64>,
    },

    /// A command ran.
    Ack {
        /// Command name.
        cmd: String,
        /// Whether the command had any effect.
        accepted: bool,
        /// Purchase result, for purchases.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        purchase: Option<PurchaseOutcome>,
        /// Set when a tick crossed the autosave interval.
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        autosave_due: bool,
        /// Events published, in order.
        events: Vec<GameEvent>,
    },

    /// Current engine state.
    State(StateView),

    /// Snapshot for persistence.
    Snapshot {
        /// The snapshot.
        snapshot: Snapshot,
    },

    /// Next-level price of an upgrade.
    Cost {
        /// Upgrade key.
        key: String,
        /// Cost entries.
        cost: Vec<ResourceCost>,
    },

    /// State hash.
    #[serde(rename = "hash")]
    StateHash {
        /// Ticks run since start.
        tick: u64,
        /// Hash of world and combat state.
        hash: u64,
    },

    /// Error processing a command.
    Error {
        /// What went wrong.
        message: String,
        /// Command name, when it parsed.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cmd: Option<String>,
    },

    /// Goodbye message before shutdown.
    Bye,
}

// ============================================================================
// State Types
// ============================================================================

/// One resource as seen from outside the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceView {
    /// Stored amount.
    pub current: f64,
    /// Storage ceiling.
    pub capacity: f64,
    /// Production per second of the active units.
    pub rate_per_second: f64,
    /// Purchased automation units.
    pub units: u32,
    /// Units switched on.
    pub active_units: u32,
}

/// Full state view returned by `state`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateView {
    /// Ticks run since start.
    pub tick: u64,
    /// Per-resource state.
    pub resources: BTreeMap<ResourceKind, ResourceView>,
    /// Non-zero upgrade levels keyed `"<station>:<kind>"`.
    pub upgrades: BTreeMap<String, u32>,
    /// Unlocked story log ids.
    pub unlocked_logs: Vec<u32>,
    /// Combat state.
    pub combat: CombatState,
    /// Hash of world and combat state.
    pub hash: u64,
}

// ============================================================================
// Helpers
// ============================================================================

impl Response {
    /// Create a ready response.
    pub fn ready(minutes_passed: u64, gains: BTreeMap<ResourceKind, f64>) -> Self {
        Self::Ready {
            version: PROTOCOL_VERSION.to_string(),
            minutes_passed,
            gains,
        }
    }

    /// Create an acknowledgment with no purchase result.
    pub fn ack(cmd: &str, accepted: bool, events: Vec<GameEvent>) -> Self {
        Self::Ack {
            cmd: cmd.to_string(),
            accepted,
            purchase: None,
            autosave_due: false,
            events,
        }
    }

    /// Create an error response.
    pub fn error(message: impl Into<String>, cmd: Option<&str>) -> Self {
        Self::Error {
            message: message.into(),
            cmd: cmd.map(String::from),
        }
    }

    /// Serialize to JSON line (with newline).
    pub fn to_json_line(&self) -> String {
        let mut json = serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"type":"error","message":"Serialization failed: {e}"}}"#)
        });
        json.push('\n');
        json
    }
}

impl Command {
    /// Parse from a JSON line.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Command name for acknowledgments.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Tick { .. } => "tick",
            Self::Click { .. } => "click",
            Self::Adjust { .. } => "adjust",
            Self::Purchase { .. } => "purchase",
            Self::Preview { .. } => "preview",
            Self::StartEncounter { .. } => "start_encounter",
            Self::CombatAction { .. } => "combat_action",
            Self::Retreat => "retreat",
            Self::Visit { .. } => "visit",
            Self::State => "state",
            Self::Save => "save",
            Self::Hash => "hash",
            Self::Quit => "quit",
        }
    }
}
