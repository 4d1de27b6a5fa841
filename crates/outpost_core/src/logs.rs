//! Story log unlocking.
//!
//! Logs are content-defined entries with a single unlock trigger. The log
//! system is evaluated every tick and after every dispatched player action;
//! an entry unlocks once and stays unlocked.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::data::{Content, LogTrigger};
use crate::events::{EventBus, EventKind, GameEvent};
use crate::store::World;

/// Unlocked log ids and the progress counters triggers read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LogBook {
    unlocked: BTreeSet<u32>,
    encounters_won: u32,
}

impl LogBook {
    /// Create a log book with some ids already unlocked.
    #[must_use]
    pub fn with_unlocked(ids: impl IntoIterator<Item = u32>) -> Self {
        Self {
            unlocked: ids.into_iter().collect(),
            encounters_won: 0,
        }
    }

    /// Restore the victory count carried over from earlier sessions.
    #[must_use]
    pub fn with_encounters_won(mut self, count: u32) -> Self {
        self.encounters_won = count;
        self
    }

    /// Check if a log is unlocked.
    #[must_use]
    pub fn is_unlocked(&self, id: u32) -> bool {
        self.unlocked.contains(&id)
    }

    /// Mark a log as unlocked.
    ///
    /// Returns `true` if it was not unlocked before.
    pub fn unlock(&mut self, id: u32) -> bool {
        self.unlocked.insert(id)
    }

    /// Unlocked ids in ascending order.
    #[must_use]
    pub fn unlocked_ids(&self) -> Vec<u32> {
        self.unlocked.iter().copied().collect()
    }

    /// Encounters won across all sessions.
    #[must_use]
    pub const fn encounters_won(&self) -> u32 {
        self.encounters_won
    }

    /// Count one more victory.
    pub fn record_victory(&mut self) {
        self.encounters_won = self.encounters_won.saturating_add(1);
    }
}

/// Evaluates log triggers against the world.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSystem;

impl LogSystem {
    /// Register the victory counter on the bus.
    pub fn register(bus: &mut EventBus<World>) {
        bus.subscribe(EventKind::EncounterCompleted, |world, _| {
            world.logs.record_victory();
        });
    }

    /// Unlock every log whose trigger now holds.
    ///
    /// Returns one `LogUnlocked` event per newly unlocked entry, in content
    /// order.
    pub fn evaluate(world: &mut World, content: &Content) -> Vec<GameEvent> {
        let mut events = Vec::new();

        for log in &content.logs {
            if world.logs.is_unlocked(log.id) || !trigger_met(world, &log.trigger) {
                continue;
            }
            world.logs.unlock(log.id);
            tracing::debug!(log_id = log.id, title = %log.title, "Log unlocked");
            events.push(GameEvent::LogUnlocked { log_id: log.id });
        }

        events
    }
}

fn trigger_met(world: &World, trigger: &LogTrigger) -> bool {
    match *trigger {
        LogTrigger::Start => true,
        LogTrigger::UpgradeLevel {
            station,
            kind,
            level,
        } => world
            .upgrade_levels(station)
            .is_some_and(|levels| levels.level(kind) >= level),
        LogTrigger::EncountersWon { count } => world.logs.encounters_won() >= count,
        LogTrigger::ResourceAmount { resource, amount } => world.amount(resource) >= amount,
    }
}
