//! Entity/component store.
//!
//! Entities are identifiers with an optional slot per component kind.
//! This gives flexible composition without a full ECS framework, and
//! keeps the set of component kinds closed and checked at compile time.
//!
//! # Determinism
//!
//! Storage is a `BTreeMap`, so iteration is always in ascending entity id
//! order and two worlds built from the same snapshot hash identically.

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::components::{EntityId, Generator, ResourceStorage, Station, UpgradeLevels};
use crate::error::{GameError, Result};
use crate::logs::LogBook;
use crate::stations::{ResourceKind, StationId};

/// The component slots of one entity.
///
/// Only components that are `Some` are present on the entity. Absence
/// means "the entity has no such aspect", never an error.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ComponentBag {
    /// Station tag.
    pub station: Option<Station>,
    /// Stored resource.
    pub storage: Option<ResourceStorage>,
    /// Passive production.
    pub generator: Option<Generator>,
    /// Purchased upgrade levels.
    pub upgrades: Option<UpgradeLevels>,
}

/// A component kind that can live in a [`ComponentBag`].
pub trait Component: Sized {
    /// Borrow this component from a bag.
    fn get(bag: &ComponentBag) -> Option<&Self>;
    /// Mutably borrow this component from a bag.
    fn get_mut(bag: &mut ComponentBag) -> Option<&mut Self>;
}

macro_rules! impl_component {
    ($ty:ty, $field:ident) => {
        impl Component for $ty {
            fn get(bag: &ComponentBag) -> Option<&Self> {
                bag.$field.as_ref()
            }

            fn get_mut(bag: &mut ComponentBag) -> Option<&mut Self> {
                bag.$field.as_mut()
            }
        }
    };
}

impl_component!(Station, station);
impl_component!(ResourceStorage, storage);
impl_component!(Generator, generator);
impl_component!(UpgradeLevels, upgrades);

/// Storage for all entities.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Store {
    entities: BTreeMap<EntityId, ComponentBag>,
    next_id: EntityId,
}

impl Store {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entities: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Insert a new entity and return its id.
    ///
    /// Any combination of components is accepted.
    pub fn create_entity(&mut self, bag: ComponentBag) -> EntityId {
        let id = self.next_id.max(1);
        self.next_id = id + 1;
        self.entities.insert(id, bag);
        id
    }

    /// Borrow a component of an entity.
    #[must_use]
    pub fn get<C: Component>(&self, entity: EntityId) -> Option<&C> {
        self.entities.get(&entity).and_then(C::get)
    }

    /// Mutably borrow a component of an entity.
    pub fn get_mut<C: Component>(&mut self, entity: EntityId) -> Option<&mut C> {
        self.entities.get_mut(&entity).and_then(C::get_mut)
    }

    /// Borrow an entity's whole bag.
    #[must_use]
    pub fn bag(&self, entity: EntityId) -> Option<&ComponentBag> {
        self.entities.get(&entity)
    }

    /// Mutably borrow an entity's whole bag.
    ///
    /// Used when one system needs two components of the same entity at once.
    pub fn bag_mut(&mut self, entity: EntityId) -> Option<&mut ComponentBag> {
        self.entities.get_mut(&entity)
    }

    /// Check if an entity exists.
    #[must_use]
    pub fn contains(&self, entity: EntityId) -> bool {
        self.entities.contains_key(&entity)
    }

    /// Number of entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Check if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Entity ids in ascending order.
    #[must_use]
    pub fn ids(&self) -> Vec<EntityId> {
        self.entities.keys().copied().collect()
    }

    /// Iterate over all entities in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &ComponentBag)> {
        self.entities.iter().map(|(id, bag)| (*id, bag))
    }

    /// Iterate mutably over all entities in ascending id order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (EntityId, &mut ComponentBag)> {
        self.entities.iter_mut().map(|(id, bag)| (*id, bag))
    }
}

/// The live simulation state shared by all systems.
///
/// Holds the store, the station index and the log book. Combat state is
/// deliberately not here: the combat system owns it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct World {
    /// Entity storage.
    pub store: Store,
    stations: BTreeMap<StationId, EntityId>,
    /// Unlocked story logs and victory count.
    pub logs: LogBook,
}

impl World {
    /// Create an empty world.
    #[must_use]
    pub fn new() -> Self {
        Self {
            store: Store::new(),
            stations: BTreeMap::new(),
            logs: LogBook::default(),
        }
    }

    /// Create a station entity and index it.
    ///
    /// The station tag is set on the bag regardless of what was passed.
    pub fn add_station(&mut self, station: StationId, mut bag: ComponentBag) -> EntityId {
        bag.station = Some(Station::new(station));
        let id = self.store.create_entity(bag);
        self.stations.insert(station, id);
        id
    }

    /// Entity id of a station, if it was built.
    #[must_use]
    pub fn station_entity(&self, station: StationId) -> Option<EntityId> {
        self.stations.get(&station).copied()
    }

    /// Stored amount of a resource.
    #[must_use]
    pub fn storage(&self, resource: ResourceKind) -> Option<&ResourceStorage> {
        self.station_entity(resource.station())
            .and_then(|id| self.store.get::<ResourceStorage>(id))
    }

    /// Generator of a station.
    #[must_use]
    pub fn generator(&self, station: StationId) -> Option<&Generator> {
        self.station_entity(station)
            .and_then(|id| self.store.get::<Generator>(id))
    }

    /// Upgrade levels of a station.
    #[must_use]
    pub fn upgrade_levels(&self, station: StationId) -> Option<&UpgradeLevels> {
        self.station_entity(station)
            .and_then(|id| self.store.get::<UpgradeLevels>(id))
    }

    /// Current amount of a resource, 0 if the station is missing.
    #[must_use]
    pub fn amount(&self, resource: ResourceKind) -> f64 {
        self.storage(resource).map_or(0.0, |s| s.current)
    }

    /// Calculate a hash of the world state.
    ///
    /// Two worlds with identical state produce identical hashes.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.store.len().hash(&mut hasher);
        for (id, bag) in self.store.iter() {
            id.hash(&mut hasher);

            if let Some(station) = &bag.station {
                station.id.hash(&mut hasher);
            }

            if let Some(storage) = &bag.storage {
                storage.current.to_bits().hash(&mut hasher);
                storage.capacity.to_bits().hash(&mut hasher);
            }

            if let Some(generator) = &bag.generator {
                generator.per_unit_rate.to_bits().hash(&mut hasher);
                generator.units.hash(&mut hasher);
                generator.active_units.hash(&mut hasher);
                generator.active.hash(&mut hasher);
            }

            if let Some(upgrades) = &bag.upgrades {
                for (kind, level) in upgrades.iter() {
                    kind.hash(&mut hasher);
                    level.hash(&mut hasher);
                }
            }
        }

        self.logs.hash(&mut hasher);
        hasher.finish()
    }

    /// Encode the world as an opaque checkpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| GameError::Checkpoint(format!("Failed to serialize world: {e}")))
    }

    /// Decode a checkpoint produced by [`World::serialize`].
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails.
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data)
            .map_err(|e| GameError::Checkpoint(format!("Failed to deserialize world: {e}")))
    }
}
