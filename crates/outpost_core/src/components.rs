//! ECS component definitions.
//!
//! Components are pure data with small saturating helpers. Every station
//! entity carries some combination of these.
//!
//! # Ownership
//!
//! - [`ResourceStorage`] and the activation half of [`Generator`]
//!   (`active_units`, `active`) are written only by the resource system.
//! - [`UpgradeLevels`], [`ResourceStorage::capacity`] and the derived half
//!   of [`Generator`] (`per_unit_rate`, `units`) are written only by the
//!   upgrade system.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::stations::{ResourceKind, StationId, UpgradeKind};

/// Unique identifier for entities.
pub type EntityId = u64;

/// An amount of one resource, used for upgrade and combat action costs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceCost {
    /// Resource being spent.
    pub resource: ResourceKind,
    /// Amount required.
    pub amount: f64,
}

impl ResourceCost {
    /// Create a new cost entry.
    #[must_use]
    pub const fn new(resource: ResourceKind, amount: f64) -> Self {
        Self { resource, amount }
    }
}

/// Stored amount of a station's resource.
///
/// Invariant: `0 <= current <= capacity` whenever the value is observed
/// outside a system's own update.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceStorage {
    /// Amount currently stored.
    pub current: f64,
    /// Storage ceiling.
    pub capacity: f64,
}

impl ResourceStorage {
    /// Create storage, clamping `current` into `[0, capacity]`.
    #[must_use]
    pub fn new(current: f64, capacity: f64) -> Self {
        let mut storage = Self { current, capacity };
        storage.clamp();
        storage
    }

    /// Force the invariant back into place.
    ///
    /// Non-finite or negative capacity becomes 0; NaN amounts become 0.
    pub fn clamp(&mut self) {
        if !self.capacity.is_finite() || self.capacity < 0.0 {
            self.capacity = 0.0;
        }
        if self.current.is_nan() {
            self.current = 0.0;
        }
        self.current = self.current.clamp(0.0, self.capacity);
    }

    /// Remaining headroom before the ceiling.
    #[must_use]
    pub fn available_space(&self) -> f64 {
        (self.capacity - self.current).max(0.0)
    }

    /// Check if storage is at its ceiling.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.current >= self.capacity
    }

    /// Add an amount, saturating at capacity.
    ///
    /// Returns the amount actually applied (never negative).
    pub fn deposit(&mut self, amount: f64) -> f64 {
        if !amount.is_finite() || amount <= 0.0 {
            return 0.0;
        }
        let before = self.current;
        self.current += amount;
        self.clamp();
        self.current - before
    }

    /// Remove an amount, saturating at zero.
    ///
    /// Returns the amount actually removed.
    pub fn withdraw(&mut self, amount: f64) -> f64 {
        if !amount.is_finite() || amount <= 0.0 {
            return 0.0;
        }
        let before = self.current;
        self.current -= amount;
        self.clamp();
        before - self.current
    }

    /// Check if at least `amount` is stored.
    #[must_use]
    pub fn can_afford(&self, amount: f64) -> bool {
        self.current >= amount
    }
}

/// Passive production from purchased automation units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Generator {
    /// Output per active unit per second.
    pub per_unit_rate: f64,
    /// Purchased units (equals the automation upgrade level).
    pub units: u32,
    /// Units currently switched on, bounded by `[0, units]`.
    pub active_units: u32,
    /// Whether the generator ran during the last tick: units switched on
    /// and, where required, powered.
    pub active: bool,
}

impl Generator {
    /// Create a generator with every purchased unit switched on.
    #[must_use]
    pub const fn new(per_unit_rate: f64, units: u32) -> Self {
        Self {
            per_unit_rate,
            units,
            active_units: units,
            active: units > 0,
        }
    }

    /// Current production per second across active units.
    #[must_use]
    pub fn rate_per_second(&self) -> f64 {
        self.per_unit_rate * f64::from(self.active_units)
    }

    /// Set the active unit count, clamped to `[0, units]`.
    ///
    /// Returns the resulting active count.
    pub fn set_active_units(&mut self, count: u32) -> u32 {
        self.active_units = count.min(self.units);
        self.active_units
    }
}

/// Purchased upgrade levels for one station, keyed by family.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UpgradeLevels {
    levels: BTreeMap<UpgradeKind, u32>,
}

impl UpgradeLevels {
    /// Create an empty level table (every upgrade at level 0).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current level of an upgrade family (0 if never purchased).
    #[must_use]
    pub fn level(&self, kind: UpgradeKind) -> u32 {
        self.levels.get(&kind).copied().unwrap_or(0)
    }

    /// Overwrite the level of an upgrade family.
    pub fn set_level(&mut self, kind: UpgradeKind, level: u32) {
        self.levels.insert(kind, level);
    }

    /// Iterate over non-default levels in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (UpgradeKind, u32)> + '_ {
        self.levels.iter().map(|(k, v)| (*k, *v))
    }
}

/// Tag linking an entity to its station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Station {
    /// Which station this entity represents.
    pub id: StationId,
}

impl Station {
    /// Create a new station tag.
    #[must_use]
    pub const fn new(id: StationId) -> Self {
        Self { id }
    }
}
