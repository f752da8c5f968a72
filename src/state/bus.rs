//! Observer bus: ordered, synchronous event dispatch for state transitions.
//!
//! Subscribers are registered per event kind and invoked in registration
//! order. Dispatch hands each callback a mutable borrow of the owning
//! [`StateStore`], so a callback may issue further transitions; those nested
//! transitions complete (including their own notifications) before control
//! returns to the outer callback. A failing subscriber propagates to the
//! publisher instead of being swallowed.

use std::collections::HashMap;
use std::rc::Rc;

use super::store::StateStore;
use super::types::{Action, RunState, StoreError};

/// The event channels the store publishes on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A transition was applied
    StateChanged,

    /// A transition or a subscriber failed
    Error,
}

/// Payload delivered to subscribers
#[derive(Debug, Clone)]
pub enum Event {
    /// Fired after every applied transition. `previous` is a deep snapshot
    /// of the state as it was before the mutation; the current state is
    /// reachable through the store reference passed alongside the event.
    StateChanged { previous: RunState, action: Action },

    /// Fired when a transition fails to decode or a subscriber errors.
    /// `state` is the state at the time of the failure (unmodified for an
    /// invalid action).
    Error {
        action: String,
        message: String,
        state: RunState,
    },
}

/// Callback signature for subscribers.
///
/// `Rc<dyn Fn...>` rather than boxed `FnMut` so the dispatch loop can clone
/// the subscriber list out of the bus and re-enter the store mutably without
/// aliasing the bus storage.
pub type ObserverFn = dyn Fn(&mut StateStore, &Event) -> Result<(), StoreError>;

/// Handle returned by [`ObserverBus::subscribe`], usable for removal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

/// Mapping from event kind to an ordered list of subscribers
#[derive(Default)]
pub struct ObserverBus {
    next_id: u64,
    subscribers: HashMap<EventKind, Vec<(SubscriptionId, Rc<ObserverFn>)>>,
}

impl ObserverBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback for an event kind; callbacks fire in
    /// registration order
    pub fn subscribe(&mut self, kind: EventKind, callback: Rc<ObserverFn>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.entry(kind).or_default().push((id, callback));
        id
    }

    /// Remove a previously registered callback. Returns `true` if it was
    /// still registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        for list in self.subscribers.values_mut() {
            if let Some(pos) = list.iter().position(|(sub_id, _)| *sub_id == id) {
                list.remove(pos);
                return true;
            }
        }
        false
    }

    /// Snapshot the subscriber list for one event kind, in registration order
    pub fn callbacks_for(&self, kind: EventKind) -> Vec<Rc<ObserverFn>> {
        self.subscribers
            .get(&kind)
            .map(|list| list.iter().map(|(_, cb)| Rc::clone(cb)).collect())
            .unwrap_or_default()
    }

    /// Number of subscribers registered for an event kind
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.subscribers.get(&kind).map(|l| l.len()).unwrap_or(0)
    }
}

impl std::fmt::Debug for ObserverBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverBus")
            .field("next_id", &self.next_id)
            .field(
                "state_changed_subscribers",
                &self.subscriber_count(EventKind::StateChanged),
            )
            .field(
                "error_subscribers",
                &self.subscriber_count(EventKind::Error),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_and_count() {
        let mut bus = ObserverBus::new();
        assert_eq!(bus.subscriber_count(EventKind::StateChanged), 0);

        bus.subscribe(EventKind::StateChanged, Rc::new(|_, _| Ok(())));
        bus.subscribe(EventKind::StateChanged, Rc::new(|_, _| Ok(())));
        bus.subscribe(EventKind::Error, Rc::new(|_, _| Ok(())));

        assert_eq!(bus.subscriber_count(EventKind::StateChanged), 2);
        assert_eq!(bus.subscriber_count(EventKind::Error), 1);
        assert_eq!(bus.callbacks_for(EventKind::StateChanged).len(), 2);
    }

    #[test]
    fn test_unsubscribe() {
        let mut bus = ObserverBus::new();
        let id = bus.subscribe(EventKind::StateChanged, Rc::new(|_, _| Ok(())));

        assert!(bus.unsubscribe(id));
        assert_eq!(bus.subscriber_count(EventKind::StateChanged), 0);
        // Second removal is a no-op
        assert!(!bus.unsubscribe(id));
    }

    #[test]
    fn test_callbacks_preserve_registration_order() {
        let mut bus = ObserverBus::new();
        let first = bus.subscribe(EventKind::StateChanged, Rc::new(|_, _| Ok(())));
        let second = bus.subscribe(EventKind::StateChanged, Rc::new(|_, _| Ok(())));
        bus.unsubscribe(first);
        let third = bus.subscribe(EventKind::StateChanged, Rc::new(|_, _| Ok(())));

        assert_ne!(second, third);
        assert_eq!(bus.subscriber_count(EventKind::StateChanged), 2);
    }
}
