//! Per-event-type callback registry with handle-based removal.
//!
//! Registrations are keyed by a small integer id handed out by the
//! registry, so removal never depends on closure identity. Callbacks for
//! one event type run in registration order.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use crate::event::{Event, EventType};

/// A registered event callback.
pub(crate) type Callback = Arc<dyn Fn(&Event) + Send + Sync>;

/// Identifies one registration within a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// Mapping from event type to its ordered callbacks.
#[derive(Default)]
pub(crate) struct SubscriptionRegistry {
    next_id: u64,
    entries: BTreeMap<EventType, Vec<(SubscriptionId, Callback)>>,
}

impl SubscriptionRegistry {
    /// Register `callback` under `event_type`.
    pub(crate) fn add(&mut self, event_type: EventType, callback: Callback) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.entries
            .entry(event_type)
            .or_default()
            .push((id, callback));
        id
    }

    /// Remove one registration. Returns `false` if it was already gone.
    pub(crate) fn remove(&mut self, event_type: EventType, id: SubscriptionId) -> bool {
        let Some(callbacks) = self.entries.get_mut(&event_type) else {
            return false;
        };
        let before = callbacks.len();
        callbacks.retain(|(existing, _)| *existing != id);
        let removed = callbacks.len() != before;
        if callbacks.is_empty() {
            self.entries.remove(&event_type);
        }
        removed
    }

    /// Remove every registration for `event_type`, returning how many there were.
    pub(crate) fn remove_type(&mut self, event_type: EventType) -> usize {
        self.entries.remove(&event_type).map_or(0, |v| v.len())
    }

    /// Remove every registration, returning how many there were.
    pub(crate) fn clear(&mut self) -> usize {
        let count = self.len(None);
        self.entries.clear();
        count
    }

    /// Snapshot of the callbacks for `event_type`, in registration order.
    ///
    /// Cloned out so the registry lock is not held while callbacks run.
    pub(crate) fn callbacks(&self, event_type: EventType) -> Vec<Callback> {
        self.entries
            .get(&event_type)
            .map(|v| v.iter().map(|(_, cb)| Arc::clone(cb)).collect())
            .unwrap_or_default()
    }

    /// Number of registrations for one type, or for all types.
    pub(crate) fn len(&self, event_type: Option<EventType>) -> usize {
        match event_type {
            Some(kind) => self.entries.get(&kind).map_or(0, Vec::len),
            None => self.entries.values().map(Vec::len).sum(),
        }
    }
}

/// Handle to one registration made through [`AppBridge::subscribe`](crate::AppBridge::subscribe).
///
/// Dropping the handle does not unsubscribe; call [`unsubscribe`](Subscription::unsubscribe).
#[derive(Clone)]
pub struct Subscription {
    registry: Weak<Mutex<SubscriptionRegistry>>,
    event_type: EventType,
    id: SubscriptionId,
}

impl Subscription {
    pub(crate) fn new(
        registry: &Arc<Mutex<SubscriptionRegistry>>,
        event_type: EventType,
        id: SubscriptionId,
    ) -> Self {
        Self {
            registry: Arc::downgrade(registry),
            event_type,
            id,
        }
    }

    /// Remove this registration.
    ///
    /// Returns `true` the first time; later calls are no-ops returning `false`,
    /// as are calls after the registration was cleared by
    /// [`unsubscribe_all`](crate::AppBridge::unsubscribe_all) or the bridge was dropped.
    pub fn unsubscribe(&self) -> bool {
        let Some(registry) = self.registry.upgrade() else {
            return false;
        };
        registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(self.event_type, self.id)
    }

    /// The event type this registration listens to.
    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    /// The registry id of this registration.
    pub fn id(&self) -> SubscriptionId {
        self.id
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("event_type", &self.event_type)
            .field("id", &self.id)
            .finish()
    }
}
