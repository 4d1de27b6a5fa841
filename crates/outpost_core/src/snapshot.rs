//! Persisted snapshot shape.
//!
//! The snapshot is the only payload exchanged with the persistence layer.
//! It is camelCase JSON:
//!
//! ```json
//! {
//!   "resources": {
//!     "energy": { "amount": 10, "capacity": 100, "autoGeneration": 2,
//!                 "lastSavedAt": "2024-01-01T00:00:00Z" }
//!   },
//!   "upgrades": { "reactor:expansion": 2, "reactor:automation": true },
//!   "unlockedLogs": [0, 1],
//!   "encountersWon": 3,
//!   "lastOnline": "2024-01-01T00:00:00Z",
//!   "pageTimestamps": { "reactor": "2024-01-01T00:00:00Z" }
//! }
//! ```
//!
//! Every field is optional. Missing values fall back to content defaults
//! when the world is built; unknown upgrade keys are logged and skipped.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::components::{Generator, ResourceStorage, UpgradeLevels};
use crate::error::{GameError, Result};
use crate::stations::{ResourceKind, StationId, UpgradeKey};
use crate::store::World;

/// Saved state of one resource.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSnapshot {
    /// Stored amount.
    #[serde(default)]
    pub amount: f64,
    /// Storage ceiling, if saved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<f64>,
    /// Active generator units. Absent means every purchased unit is on.
    ///
    /// Older saves name this per resource (`workerCrews`,
    /// `manufacturingBays`); all spellings are accepted.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        rename = "autoGeneration",
        alias = "workerCrews",
        alias = "manufacturingBays"
    )]
    pub generation: Option<f64>,
    /// When this resource was last persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_saved_at: Option<DateTime<Utc>>,
}

/// The four resource entries of a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SnapshotResources {
    /// Energy entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy: Option<ResourceSnapshot>,
    /// Insight entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insight: Option<ResourceSnapshot>,
    /// Crew entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crew: Option<ResourceSnapshot>,
    /// Scrap entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scrap: Option<ResourceSnapshot>,
}

impl SnapshotResources {
    /// Entry for a resource, if saved.
    #[must_use]
    pub const fn get(&self, kind: ResourceKind) -> Option<&ResourceSnapshot> {
        match kind {
            ResourceKind::Energy => self.energy.as_ref(),
            ResourceKind::Insight => self.insight.as_ref(),
            ResourceKind::Crew => self.crew.as_ref(),
            ResourceKind::Scrap => self.scrap.as_ref(),
        }
    }

    /// Replace the entry for a resource.
    pub fn set(&mut self, kind: ResourceKind, entry: ResourceSnapshot) {
        let slot = match kind {
            ResourceKind::Energy => &mut self.energy,
            ResourceKind::Insight => &mut self.insight,
            ResourceKind::Crew => &mut self.crew,
            ResourceKind::Scrap => &mut self.scrap,
        };
        *slot = Some(entry);
    }

    /// Iterate over saved entries in canonical resource order.
    pub fn iter(&self) -> impl Iterator<Item = (ResourceKind, &ResourceSnapshot)> + '_ {
        ResourceKind::ALL
            .into_iter()
            .filter_map(move |kind| self.get(kind).map(|entry| (kind, entry)))
    }
}

/// Saved upgrade value. Booleans are legacy one-shot upgrades.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UpgradeValue {
    /// `true` is level 1, `false` level 0.
    Flag(bool),
    /// Purchased level.
    Level(u32),
}

impl UpgradeValue {
    /// The level this value stands for.
    #[must_use]
    pub const fn level(&self) -> u32 {
        match self {
            Self::Flag(true) => 1,
            Self::Flag(false) => 0,
            Self::Level(level) => *level,
        }
    }
}

/// Full persisted state.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Per-resource state.
    #[serde(default)]
    pub resources: SnapshotResources,
    /// Upgrade levels keyed by `"<station>:<upgradeKind>"`.
    #[serde(default)]
    pub upgrades: BTreeMap<String, UpgradeValue>,
    /// Unlocked story log ids.
    #[serde(default)]
    pub unlocked_logs: Vec<u32>,
    /// Encounters won across all sessions.
    #[serde(default)]
    pub encounters_won: u32,
    /// Session-level fallback timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_online: Option<DateTime<Utc>>,
    /// Last visit per page, owned by the presentation layer.
    #[serde(default)]
    pub page_timestamps: BTreeMap<String, DateTime<Utc>>,
}

impl Snapshot {
    /// Parse a snapshot from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::SnapshotParse`] if the text is not valid JSON
    /// or a field has the wrong type.
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| GameError::SnapshotParse(e.to_string()))
    }

    /// Serialize to pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::SnapshotParse`] if serialization fails.
    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| GameError::SnapshotParse(e.to_string()))
    }

    /// Upgrade levels with keys parsed.
    ///
    /// Unknown or malformed keys are logged and skipped.
    #[must_use]
    pub fn upgrade_levels(&self) -> BTreeMap<UpgradeKey, u32> {
        let mut levels = BTreeMap::new();
        for (raw, value) in &self.upgrades {
            match raw.parse::<UpgradeKey>() {
                Ok(key) => {
                    levels.insert(key, value.level());
                }
                Err(e) => tracing::warn!(key = %raw, error = %e, "Skipping saved upgrade"),
            }
        }
        levels
    }

    /// Regenerate a snapshot from live state.
    ///
    /// Every resource timestamp and `lastOnline` are set to `now`. Page
    /// timestamps are not engine state and are carried over by the caller.
    #[must_use]
    pub fn from_world(world: &World, now: DateTime<Utc>) -> Self {
        let mut snapshot = Self {
            last_online: Some(now),
            unlocked_logs: world.logs.unlocked_ids(),
            encounters_won: world.logs.encounters_won(),
            ..Self::default()
        };

        for station in StationId::ALL {
            let Some(entity) = world.station_entity(station) else {
                continue;
            };

            if let Some(storage) = world.store.get::<ResourceStorage>(entity) {
                let generation = world
                    .store
                    .get::<Generator>(entity)
                    .map_or(0.0, |g| f64::from(g.active_units));
                snapshot.resources.set(
                    station.resource(),
                    ResourceSnapshot {
                        amount: storage.current,
                        capacity: Some(storage.capacity),
                        generation: Some(generation),
                        last_saved_at: Some(now),
                    },
                );
            }

            if let Some(levels) = world.store.get::<UpgradeLevels>(entity) {
                for (kind, level) in levels.iter() {
                    let key = UpgradeKey::new(station, kind);
                    snapshot
                        .upgrades
                        .insert(key.to_string(), UpgradeValue::Level(level));
                }
            }
        }

        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stations::UpgradeKind;

    #[test]
    fn test_parse_full_snapshot() {
        let text = r#"{
            "resources": {
                "energy": { "amount": 10, "capacity": 100, "autoGeneration": 2,
                            "lastSavedAt": "2024-01-01T00:00:00Z" },
                "crew": { "amount": 3, "workerCrews": 1 },
                "scrap": { "amount": 4, "manufacturingBays": 2 }
            },
            "upgrades": { "reactor:expansion": 2, "processor:automation": true, "bogus": 1 },
            "unlockedLogs": [0, 2],
            "lastOnline": "2024-01-01T00:00:00Z",
            "pageTimestamps": { "reactor": "2024-01-01T00:00:00Z" }
        }"#;

        let snapshot = Snapshot::from_json_str(text).unwrap();
        let energy = snapshot.resources.get(ResourceKind::Energy).unwrap();
        assert_eq!(energy.generation, Some(2.0));
        assert_eq!(energy.capacity, Some(100.0));
        assert!(energy.last_saved_at.is_some());

        assert_eq!(
            snapshot.resources.get(ResourceKind::Crew).unwrap().generation,
            Some(1.0)
        );
        assert_eq!(
            snapshot.resources.get(ResourceKind::Scrap).unwrap().generation,
            Some(2.0)
        );
        assert!(snapshot.resources.get(ResourceKind::Insight).is_none());

        let levels = snapshot.upgrade_levels();
        assert_eq!(levels.len(), 2);
        assert_eq!(
            levels.get(&UpgradeKey::new(StationId::Reactor, UpgradeKind::Expansion)),
            Some(&2)
        );
        assert_eq!(
            levels.get(&UpgradeKey::new(StationId::Processor, UpgradeKind::Automation)),
            Some(&1)
        );
        assert_eq!(snapshot.unlocked_logs, vec![0, 2]);
        assert_eq!(snapshot.page_timestamps.len(), 1);
    }

    #[test]
    fn test_empty_object_is_valid() {
        let snapshot = Snapshot::from_json_str("{}").unwrap();
        assert_eq!(snapshot, Snapshot::default());
    }

    #[test]
    fn test_malformed_json_is_error() {
        let result = Snapshot::from_json_str("{ \"resources\": 5 }");
        assert!(matches!(result, Err(GameError::SnapshotParse(_))));
    }

    #[test]
    fn test_serialized_keys_are_camel_case() {
        let mut snapshot = Snapshot::default();
        snapshot.resources.set(
            ResourceKind::Energy,
            ResourceSnapshot {
                amount: 1.0,
                capacity: Some(100.0),
                generation: Some(1.0),
                last_saved_at: None,
            },
        );
        snapshot.unlocked_logs = vec![0];
        snapshot.encounters_won = 2;

        let text = snapshot.to_json_string().unwrap();
        assert!(text.contains("\"autoGeneration\""));
        assert!(text.contains("\"unlockedLogs\""));
        assert!(text.contains("\"encountersWon\""));
        assert!(text.contains("\"pageTimestamps\""));
        assert_eq!(Snapshot::from_json_str(&text).unwrap(), snapshot);
    }

    #[test]
    fn test_missing_generation_stays_absent() {
        let text = r#"{ "resources": { "energy": { "amount": 5 } } }"#;
        let snapshot = Snapshot::from_json_str(text).unwrap();
        let energy = snapshot.resources.get(ResourceKind::Energy).unwrap();
        assert_eq!(energy.generation, None);
        assert_eq!(snapshot.encounters_won, 0);

        let text = snapshot.to_json_string().unwrap();
        assert!(!text.contains("autoGeneration"));
    }
}
