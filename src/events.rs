//! Typed game events with cancelable handlers
//!
//! Handlers subscribe to one `EventKind` and run in subscription order.
//! Any handler may stop propagation by returning `false`; for the
//! "before" events this cancels the action being announced.

use std::fmt;

use crate::body::BodyPartId;
use crate::entity::CreatureId;

/// Discriminant of a `GameEvent`, used as the subscription key
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    BeforeMeleeAttack,
    TakeDamage,
    Died,
    BeforeDismember,
    AfterDismember,
    LimbRegenerated,
    BodyPartAdded,
    BodyPartRemoved,
    MutationBodyRebuild,
}

/// An event with its payload
#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    BeforeMeleeAttack {
        attacker: CreatureId,
        defender: CreatureId,
    },
    TakeDamage {
        target: CreatureId,
        attacker: Option<CreatureId>,
        amount: i32,
    },
    Died {
        creature: CreatureId,
        killer: Option<CreatureId>,
    },
    BeforeDismember {
        creature: CreatureId,
        part: BodyPartId,
    },
    AfterDismember {
        creature: CreatureId,
        part: BodyPartId,
        /// Lost to an unsupported-part cascade rather than a direct blow
        cascaded: bool,
    },
    LimbRegenerated {
        creature: CreatureId,
        part: BodyPartId,
    },
    BodyPartAdded {
        creature: CreatureId,
        part: BodyPartId,
        manager: Option<String>,
    },
    BodyPartRemoved {
        creature: CreatureId,
        part: BodyPartId,
        manager: Option<String>,
    },
    MutationBodyRebuild {
        creature: CreatureId,
        mutation: String,
    },
}

impl GameEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::BeforeMeleeAttack { .. } => EventKind::BeforeMeleeAttack,
            Self::TakeDamage { .. } => EventKind::TakeDamage,
            Self::Died { .. } => EventKind::Died,
            Self::BeforeDismember { .. } => EventKind::BeforeDismember,
            Self::AfterDismember { .. } => EventKind::AfterDismember,
            Self::LimbRegenerated { .. } => EventKind::LimbRegenerated,
            Self::BodyPartAdded { .. } => EventKind::BodyPartAdded,
            Self::BodyPartRemoved { .. } => EventKind::BodyPartRemoved,
            Self::MutationBodyRebuild { .. } => EventKind::MutationBodyRebuild,
        }
    }
}

/// Handle returned by `EventBus::subscribe`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler = Box<dyn FnMut(&GameEvent) -> bool>;

/// Registration table of handlers keyed by event kind
#[derive(Default)]
pub struct EventBus {
    handlers: Vec<(SubscriptionId, EventKind, Handler)>,
    next_id: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler. Returning `false` from it stops propagation.
    pub fn subscribe<F>(&mut self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: FnMut(&GameEvent) -> bool + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.handlers.push((id, kind, Box::new(handler)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(sub, _, _)| *sub != id);
        self.handlers.len() != before
    }

    /// Deliver an event. Returns `false` if any handler stopped propagation.
    pub fn fire(&mut self, event: &GameEvent) -> bool {
        let kind = event.kind();
        for (_, handler_kind, handler) in self.handlers.iter_mut() {
            if *handler_kind == kind && !handler(event) {
                tracing::debug!(?kind, "event propagation stopped");
                return false;
            }
        }
        true
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}
