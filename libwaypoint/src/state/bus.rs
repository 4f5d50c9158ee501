//! In-process event bus for state notifications
//!
//! Listeners are registered per [`Topic`] and invoked synchronously, in
//! registration order, on the thread that emits. The registry is never
//! borrowed while a listener runs, so a listener may emit, register or
//! unregister from inside its own callback.
//!
//! # Example
//!
//! ```
//! use libwaypoint::state::{Event, EventBus, Topic};
//!
//! let bus = EventBus::new();
//! let id = bus.on(Topic::Reset, |event| {
//!     assert!(matches!(event, Event::Reset));
//! });
//!
//! bus.emit(&Topic::Reset, &Event::Reset);
//! assert!(bus.off(&Topic::Reset, id));
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use super::schema::{StateKey, Value};

/// Listener callback
pub type Listener = Rc<dyn Fn(&Event)>;

/// Handle returned by [`EventBus::on`], used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Notification channels
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Every change, whatever the key
    AnyChange,
    /// Changes of one key
    Changed(StateKey),
    /// Whole-session reset
    Reset,
    /// Free-form topics for collaborators
    Custom(String),
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topic::AnyChange => write!(f, "change"),
            Topic::Changed(key) => write!(f, "change:{}", key),
            Topic::Reset => write!(f, "reset"),
            Topic::Custom(name) => write!(f, "{}", name),
        }
    }
}

/// A single leaf assignment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub key: StateKey,
    pub old_value: Value,
    pub new_value: Value,
}

/// Events delivered to listeners
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    Changed(ChangeEvent),
    Reset,
    Custom { payload: serde_json::Value },
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    topics: HashMap<Topic, Vec<(ListenerId, Listener)>>,
}

/// Synchronous publish/subscribe registry
///
/// Cloning yields another handle onto the same registry.
#[derive(Clone, Default)]
pub struct EventBus {
    registry: Rc<RefCell<Registry>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener` for `topic`
    pub fn on(&self, topic: Topic, listener: impl Fn(&Event) + 'static) -> ListenerId {
        let mut registry = self.registry.borrow_mut();
        registry.next_id += 1;
        let id = ListenerId(registry.next_id);
        registry
            .topics
            .entry(topic)
            .or_default()
            .push((id, Rc::new(listener)));
        id
    }

    /// Unregister a listener. Returns `false` if it was not registered.
    pub fn off(&self, topic: &Topic, id: ListenerId) -> bool {
        let mut registry = self.registry.borrow_mut();
        let Some(listeners) = registry.topics.get_mut(topic) else {
            return false;
        };
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        before != listeners.len()
    }

    /// Invoke every listener of `topic` in registration order
    pub fn emit(&self, topic: &Topic, event: &Event) {
        // Snapshot so listeners can touch the registry while running
        let listeners: Vec<Listener> = match self.registry.borrow().topics.get(topic) {
            Some(listeners) => listeners.iter().map(|(_, l)| Rc::clone(l)).collect(),
            None => return,
        };

        for listener in listeners {
            listener(event);
        }
    }

    /// Number of listeners registered for `topic`
    pub fn listener_count(&self, topic: &Topic) -> usize {
        self.registry
            .borrow()
            .topics
            .get(topic)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.registry.borrow();
        f.debug_struct("EventBus")
            .field("topics", &registry.topics.len())
            .finish()
    }
}
