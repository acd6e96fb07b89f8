//! Synchronous publish/subscribe keyed by [EventType].
//!
//! Callbacks run on the emitting thread, in registration order, over a
//! snapshot of the listener list: a callback may subscribe, unsubscribe or
//! emit again without disturbing the dispatch in progress. Listeners added
//! during a dispatch are first called on the next emit; listeners removed
//! during a dispatch still receive the event being dispatched.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use crate::events::{EventType, SimEvent};

type Callback = Rc<dyn Fn(&SimEvent)>;

struct Listener {
    id: u64,
    callback: Callback,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    typed: HashMap<EventType, Vec<Listener>>,
    /// Receive every event, after the typed listeners.
    wildcard: Vec<Listener>,
}

impl Registry {
    fn insert(&mut self, key: Option<EventType>, callback: Callback) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        let listener = Listener { id, callback };
        match key {
            Some(event_type) => self.typed.entry(event_type).or_default().push(listener),
            None => self.wildcard.push(listener),
        }
        id
    }

    fn remove(&mut self, key: Option<EventType>, id: u64) {
        match key {
            Some(event_type) => {
                if let Some(listeners) = self.typed.get_mut(&event_type) {
                    listeners.retain(|listener| listener.id != id);
                    if listeners.is_empty() {
                        self.typed.remove(&event_type);
                    }
                }
            }
            None => self.wildcard.retain(|listener| listener.id != id),
        }
    }

    fn snapshot(&self, event_type: EventType) -> Vec<Callback> {
        self.typed
            .get(&event_type)
            .into_iter()
            .flatten()
            .chain(self.wildcard.iter())
            .map(|listener| Rc::clone(&listener.callback))
            .collect()
    }
}

/// Cheap to clone; clones share one listener registry.
#[derive(Clone, Default)]
pub struct EventBus {
    registry: Rc<RefCell<Registry>>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let registry = self.registry.borrow();
        f.debug_struct("EventBus")
            .field("typed_types", &registry.typed.len())
            .field("wildcard", &registry.wildcard.len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, event_type: EventType, callback: F) -> Subscription
    where
        F: Fn(&SimEvent) + 'static,
    {
        self.register(Some(event_type), Rc::new(callback))
    }

    /// Listens to every event type.
    pub fn subscribe_all<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&SimEvent) + 'static,
    {
        self.register(None, Rc::new(callback))
    }

    fn register(&self, key: Option<EventType>, callback: Callback) -> Subscription {
        let id = self.registry.borrow_mut().insert(key, callback);
        Subscription {
            registry: Rc::downgrade(&self.registry),
            key,
            id,
        }
    }

    /// Delivers `event` to its typed listeners, then to wildcard listeners.
    /// A type without listeners is a no-op.
    pub fn emit(&self, event: &SimEvent) {
        let snapshot = self.registry.borrow().snapshot(event.event_type());
        for callback in snapshot {
            callback(event);
        }
    }

    pub fn listener_count(&self, event_type: EventType) -> usize {
        self.registry
            .borrow()
            .typed
            .get(&event_type)
            .map_or(0, Vec::len)
    }

    pub fn wildcard_count(&self) -> usize {
        self.registry.borrow().wildcard.len()
    }
}

/// Handle returned by [EventBus::subscribe]. Dropping it does NOT remove the
/// listener; call [Subscription::unsubscribe] on teardown.
#[must_use = "listeners stay registered until `unsubscribe` is called"]
#[derive(Debug)]
pub struct Subscription {
    registry: Weak<RefCell<Registry>>,
    key: Option<EventType>,
    id: u64,
}

impl Subscription {
    /// `None` for wildcard subscriptions.
    pub fn event_type(&self) -> Option<EventType> {
        self.key
    }

    /// Removes the listener. No-op if the bus is gone.
    pub fn unsubscribe(self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.borrow_mut().remove(self.key, self.id);
        }
    }
}
