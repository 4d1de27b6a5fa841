//! Test fixtures and helpers.
//!
//! Pre-built engines and snapshots for consistent testing.

use chrono::{DateTime, Duration, TimeZone, Utc};

use outpost_core::data::Content;
use outpost_core::manager::{PlayerAction, SystemManager};
use outpost_core::snapshot::{ResourceSnapshot, Snapshot};
use outpost_core::stations::{ResourceKind, StationId};

/// Fixed reference instant used as "now" in tests.
#[must_use]
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

/// A new game on the default catalog at [`t0`].
#[must_use]
pub fn fresh_manager() -> SystemManager {
    SystemManager::new_game(Content::default(), t0())
}

/// A new game with `clicks` manual clicks applied to one station.
#[must_use]
pub fn clicked_manager(station: StationId, clicks: usize) -> SystemManager {
    let mut manager = fresh_manager();
    for _ in 0..clicks {
        manager.dispatch(PlayerAction::Click { station });
    }
    manager
}

/// A saved resource entry stamped `minutes_ago` before [`t0`].
#[must_use]
pub fn saved_resource(
    amount: f64,
    capacity: f64,
    generation: f64,
    minutes_ago: i64,
) -> ResourceSnapshot {
    ResourceSnapshot {
        amount,
        capacity: Some(capacity),
        generation: Some(generation),
        last_saved_at: Some(t0() - Duration::minutes(minutes_ago)),
    }
}

/// A snapshot holding a single resource entry.
#[must_use]
pub fn snapshot_with(resource: ResourceKind, entry: ResourceSnapshot) -> Snapshot {
    let mut snapshot = Snapshot::default();
    snapshot.resources.set(resource, entry);
    snapshot
}

/// Snapshot JSON in the shape the persistence layer writes.
pub const SAMPLE_SNAPSHOT_JSON: &str = r#"{
  "resources": {
    "energy": { "amount": 40, "capacity": 150, "autoGeneration": 2, "lastSavedAt": "2023-12-31T23:00:00Z" },
    "insight": { "amount": 5, "capacity": 50, "autoGeneration": 0, "lastSavedAt": "2023-12-31T23:00:00Z" },
    "crew": { "amount": 2, "capacity": 20, "workerCrews": 1, "lastSavedAt": "2023-12-31T23:00:00Z" },
    "scrap": { "amount": 0, "capacity": 50, "manufacturingBays": 0, "lastSavedAt": "2023-12-31T23:00:00Z" }
  },
  "upgrades": {
    "reactor:expansion": 1,
    "reactor:automation": 2,
    "crew_quarters:automation": true,
    "legacy:bonus": 4
  },
  "unlockedLogs": [0, 1],
  "lastOnline": "2023-12-31T23:00:00Z",
  "pageTimestamps": { "reactor": "2023-12-31T22:30:00Z" }
}"#;
