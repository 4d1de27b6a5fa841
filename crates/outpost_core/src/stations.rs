//! Station, resource and upgrade identifiers.
//!
//! The station catalog is fixed: four stations, each producing exactly one
//! resource. Upgrade identifiers are namespaced as `"<station>:<kind>"`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GameError;

/// One of the four resources players accumulate.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Produced by the reactor; powers automation elsewhere.
    Energy,
    /// Produced by the processor.
    Insight,
    /// Produced by the crew quarters.
    Crew,
    /// Produced by the manufacturing bay; also dropped as combat loot.
    Scrap,
}

impl ResourceKind {
    /// All resources in canonical order.
    pub const ALL: [Self; 4] = [Self::Energy, Self::Insight, Self::Crew, Self::Scrap];

    /// Stable lowercase name used in snapshots and logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Energy => "energy",
            Self::Insight => "insight",
            Self::Crew => "crew",
            Self::Scrap => "scrap",
        }
    }

    /// The station that produces this resource.
    #[must_use]
    pub const fn station(&self) -> StationId {
        match self {
            Self::Energy => StationId::Reactor,
            Self::Insight => StationId::Processor,
            Self::Crew => StationId::CrewQuarters,
            Self::Scrap => StationId::Manufacturing,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| GameError::UnknownResource(s.to_string()))
    }
}

/// One of the four station locations. Each station is one entity.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum StationId {
    /// Energy production.
    Reactor,
    /// Insight production.
    Processor,
    /// Crew recruitment.
    CrewQuarters,
    /// Scrap manufacturing.
    Manufacturing,
}

impl StationId {
    /// All stations in canonical order.
    pub const ALL: [Self; 4] = [
        Self::Reactor,
        Self::Processor,
        Self::CrewQuarters,
        Self::Manufacturing,
    ];

    /// Stable name used in upgrade keys.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Reactor => "reactor",
            Self::Processor => "processor",
            Self::CrewQuarters => "crew_quarters",
            Self::Manufacturing => "manufacturing",
        }
    }

    /// The resource this station produces.
    #[must_use]
    pub const fn resource(&self) -> ResourceKind {
        match self {
            Self::Reactor => ResourceKind::Energy,
            Self::Processor => ResourceKind::Insight,
            Self::CrewQuarters => ResourceKind::Crew,
            Self::Manufacturing => ResourceKind::Scrap,
        }
    }
}

impl fmt::Display for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StationId {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| GameError::UnknownStation(s.to_string()))
    }
}

/// Upgrade family. Determines both the cost curve and the derived stat.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum UpgradeKind {
    /// Raises storage capacity. Cost scales with current capacity.
    Expansion,
    /// Adds one generator unit. Cost scales linearly with level.
    Automation,
}

impl UpgradeKind {
    /// All upgrade kinds.
    pub const ALL: [Self; 2] = [Self::Expansion, Self::Automation];

    /// Stable name used in upgrade keys.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Expansion => "expansion",
            Self::Automation => "automation",
        }
    }
}

/// Namespaced upgrade identifier, `"<station>:<upgradeKind>"`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct UpgradeKey {
    /// Station owning the upgrade.
    pub station: StationId,
    /// Upgrade family.
    pub kind: UpgradeKind,
}

impl UpgradeKey {
    /// Create a new upgrade key.
    #[must_use]
    pub const fn new(station: StationId, kind: UpgradeKind) -> Self {
        Self { station, kind }
    }

    /// Every upgrade key in canonical order.
    pub fn all() -> impl Iterator<Item = Self> {
        StationId::ALL.into_iter().flat_map(|station| {
            UpgradeKind::ALL
                .into_iter()
                .map(move |kind| Self::new(station, kind))
        })
    }
}

impl fmt::Display for UpgradeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.station.as_str(), self.kind.as_str())
    }
}

impl FromStr for UpgradeKey {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || GameError::UnknownUpgrade(s.to_string());
        let (station, kind) = s.split_once(':').ok_or_else(unknown)?;
        let station = StationId::from_str(station).map_err(|_| unknown())?;
        let kind = UpgradeKind::ALL
            .into_iter()
            .find(|k| k.as_str() == kind)
            .ok_or_else(unknown)?;
        Ok(Self::new(station, kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_station_resource_pairing() {
        for station in StationId::ALL {
            assert_eq!(station.resource().station(), station);
        }
    }

    #[test]
    fn test_upgrade_key_parse_and_display() {
        let key: UpgradeKey = "crew_quarters:automation".parse().unwrap();
        assert_eq!(key.station, StationId::CrewQuarters);
        assert_eq!(key.kind, UpgradeKind::Automation);
        assert_eq!(key.to_string(), "crew_quarters:automation");
    }

    #[test]
    fn test_upgrade_key_rejects_unknown() {
        assert!("reactor".parse::<UpgradeKey>().is_err());
        assert!("reactor:overdrive".parse::<UpgradeKey>().is_err());
        assert!("bridge:expansion".parse::<UpgradeKey>().is_err());
    }

    #[test]
    fn test_all_upgrade_keys() {
        assert_eq!(UpgradeKey::all().count(), 8);
    }

    #[test]
    fn test_resource_from_str() {
        assert_eq!("scrap".parse::<ResourceKind>().unwrap(), ResourceKind::Scrap);
        assert!("gold".parse::<ResourceKind>().is_err());
    }
}
