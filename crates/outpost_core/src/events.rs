//! Typed publish/subscribe event bus.
//!
//! The set of event names is closed ([`EventKind`]); each [`GameEvent`]
//! variant carries its payload. Dispatch is synchronous: `publish` calls
//! every handler registered for the event's kind, in subscription order,
//! before it returns. Nothing is queued or deferred.
//!
//! Handlers receive a mutable context alongside the event. The engine uses
//! the [`World`](crate::store::World) as context so that the system owning
//! a component can react to another system's event and perform the
//! mutation itself.
//!
//! A handler that panics is caught and logged; the remaining handlers for
//! the same event still run.

use std::collections::BTreeMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};

use serde::{Deserialize, Serialize};

use crate::combat::CombatOutcome;
use crate::data::PlayerCombatAction;
use crate::stations::{ResourceKind, StationId, UpgradeKey};

/// Direction for switching automation units on or off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustDirection {
    /// Switch one more unit on.
    Increase,
    /// Switch one unit off.
    Decrease,
}

/// Closed union of event names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// A manual click on a station.
    ResourceClicked,
    /// Automation units switched on or off.
    AutomationAdjusted,
    /// Combat loot on its way into storage.
    LootAwarded,
    /// A stored amount changed outside the periodic tick.
    ResourceChanged,
    /// An upgrade level was bought.
    UpgradePurchased,
    /// An encounter began.
    CombatStarted,
    /// A player combat action was applied.
    PlayerActed,
    /// The enemy telegraphed its next action.
    EnemyCharging,
    /// An encounter ended (victory, defeat or retreat).
    CombatEnded,
    /// An encounter was won.
    EncounterCompleted,
    /// A story log was unlocked.
    LogUnlocked,
}

impl EventKind {
    /// All event kinds.
    pub const ALL: [Self; 11] = [
        Self::ResourceClicked,
        Self::AutomationAdjusted,
        Self::LootAwarded,
        Self::ResourceChanged,
        Self::UpgradePurchased,
        Self::CombatStarted,
        Self::PlayerActed,
        Self::EnemyCharging,
        Self::CombatEnded,
        Self::EncounterCompleted,
        Self::LogUnlocked,
    ];

    /// Wire name of the event.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ResourceClicked => "resource:clicked",
            Self::AutomationAdjusted => "automation:adjusted",
            Self::LootAwarded => "loot:awarded",
            Self::ResourceChanged => "resource:changed",
            Self::UpgradePurchased => "upgrade:purchased",
            Self::CombatStarted => "combat:started",
            Self::PlayerActed => "combat:player_acted",
            Self::EnemyCharging => "combat:enemy_charging",
            Self::CombatEnded => "combat:ended",
            Self::EncounterCompleted => "encounter:completed",
            Self::LogUnlocked => "log:unlocked",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An event with its payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    /// A manual click on a station.
    ResourceClicked {
        /// Station clicked.
        station: StationId,
    },
    /// Automation units switched on or off.
    AutomationAdjusted {
        /// Station adjusted.
        station: StationId,
        /// Direction of the change.
        direction: AdjustDirection,
    },
    /// Combat loot on its way into storage.
    LootAwarded {
        /// Resource awarded.
        resource: ResourceKind,
        /// Amount before capacity clamping.
        amount: f64,
    },
    /// A stored amount changed outside the periodic tick.
    ResourceChanged {
        /// Resource changed.
        resource: ResourceKind,
        /// New stored amount.
        current: f64,
        /// Current capacity.
        capacity: f64,
    },
    /// An upgrade level was bought.
    UpgradePurchased {
        /// Upgrade bought.
        key: UpgradeKey,
        /// Level after the purchase.
        level: u32,
    },
    /// An encounter began.
    CombatStarted {
        /// Enemy definition id.
        enemy_id: String,
        /// Region of the encounter.
        region: String,
        /// Difficulty tier.
        tier: u32,
    },
    /// A player combat action was applied.
    PlayerActed {
        /// Action taken.
        action: PlayerCombatAction,
    },
    /// The enemy telegraphed its next action.
    EnemyCharging {
        /// Action id being charged.
        action_id: String,
        /// Delay before it resolves.
        delay_ms: u64,
    },
    /// An encounter ended.
    CombatEnded {
        /// Enemy definition id.
        enemy_id: String,
        /// How it ended.
        outcome: CombatOutcome,
    },
    /// An encounter was won.
    EncounterCompleted {
        /// Enemy definition id.
        enemy_id: String,
        /// Region of the encounter.
        region: String,
        /// Difficulty tier.
        tier: u32,
    },
    /// A story log was unlocked.
    LogUnlocked {
        /// Log id.
        log_id: u32,
    },
}

impl GameEvent {
    /// The name this event is dispatched under.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::ResourceClicked { .. } => EventKind::ResourceClicked,
            Self::AutomationAdjusted { .. } => EventKind::AutomationAdjusted,
            Self::LootAwarded { .. } => EventKind::LootAwarded,
            Self::ResourceChanged { .. } => EventKind::ResourceChanged,
            Self::UpgradePurchased { .. } => EventKind::UpgradePurchased,
            Self::CombatStarted { .. } => EventKind::CombatStarted,
            Self::PlayerActed { .. } => EventKind::PlayerActed,
            Self::EnemyCharging { .. } => EventKind::EnemyCharging,
            Self::CombatEnded { .. } => EventKind::CombatEnded,
            Self::EncounterCompleted { .. } => EventKind::EncounterCompleted,
            Self::LogUnlocked { .. } => EventKind::LogUnlocked,
        }
    }
}

/// Token returned by [`EventBus::subscribe`]; pass it to
/// [`EventBus::unsubscribe`] to remove the handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription {
    kind: EventKind,
    id: u64,
}

impl Subscription {
    /// Event kind the handler listens to.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        self.kind
    }
}

type Handler<C> = Box<dyn FnMut(&mut C, &GameEvent)>;

/// Synchronous, in-order event dispatcher.
pub struct EventBus<C> {
    handlers: BTreeMap<EventKind, Vec<(u64, Handler<C>)>>,
    next_id: u64,
}

impl<C> EventBus<C> {
    /// Create a bus with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: BTreeMap::new(),
            next_id: 0,
        }
    }

    /// Register a handler for one event kind.
    ///
    /// Handlers run in the order they were subscribed. There is no
    /// deduplication, so handlers must tolerate repeated dispatches.
    pub fn subscribe<F>(&mut self, kind: EventKind, handler: F) -> Subscription
    where
        F: FnMut(&mut C, &GameEvent) + 'static,
    {
        let id = self.next_id;
        self.next_id += 1;
        self.handlers
            .entry(kind)
            .or_default()
            .push((id, Box::new(handler)));
        Subscription { kind, id }
    }

    /// Remove a handler.
    ///
    /// Returns `false` if it was already removed.
    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        let Some(list) = self.handlers.get_mut(&subscription.kind) else {
            return false;
        };
        let before = list.len();
        list.retain(|(id, _)| *id != subscription.id);
        list.len() != before
    }

    /// Number of handlers registered for a kind.
    #[must_use]
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.handlers.get(&kind).map_or(0, Vec::len)
    }

    /// Dispatch an event to every handler registered for its kind.
    ///
    /// Each handler call is isolated: a panic is logged and dispatch
    /// continues with the next handler. Returns the number of handlers
    /// that completed normally.
    pub fn publish(&mut self, context: &mut C, event: &GameEvent) -> usize {
        let kind = event.kind();
        let Some(list) = self.handlers.get_mut(&kind) else {
            return 0;
        };

        let mut completed = 0;
        for (id, handler) in list.iter_mut() {
            let result = catch_unwind(AssertUnwindSafe(|| handler(context, event)));
            match result {
                Ok(()) => completed += 1,
                Err(_) => {
                    tracing::warn!(event = %kind, subscriber = *id, "Event subscriber panicked");
                }
            }
        }
        completed
    }
}

impl<C> Default for EventBus<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for EventBus<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: BTreeMap<EventKind, usize> = self
            .handlers
            .iter()
            .map(|(kind, list)| (*kind, list.len()))
            .collect();
        f.debug_struct("EventBus")
            .field("subscribers", &counts)
            .finish()
    }
}
