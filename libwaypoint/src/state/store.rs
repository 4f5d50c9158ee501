//! Reactive state store
//!
//! The store is the only sanctioned way to mutate session state. Every
//! assignment is announced twice on the injected [`EventBus`]: first on
//! [`Topic::AnyChange`], then on [`Topic::Changed`] for the key.
//!
//! The store takes `&self` everywhere and never holds a borrow of the state
//! while listeners run, so a listener may call [`Store::set`] on the same or
//! another key. Such calls recurse synchronously; bounding the recursion is
//! the caller's business.

use std::cell::RefCell;

use tracing::trace;

use super::bus::{ChangeEvent, Event, EventBus, ListenerId, Topic};
use super::schema::{AppState, ScreenId, Settings, StageId, StageRecords, StateKey, Value};
use crate::error::StoreError;

pub struct Store {
    state: RefCell<AppState>,
    bus: EventBus,
}

impl Store {
    /// Create a store with default state, publishing on `bus`
    pub fn new(bus: EventBus) -> Self {
        Self::with_settings(Settings::default(), bus)
    }

    pub fn with_settings(settings: Settings, bus: EventBus) -> Self {
        Self {
            state: RefCell::new(AppState::new(settings)),
            bus,
        }
    }

    /// Assign `value` to `key` and notify listeners
    pub fn set(&self, key: StateKey, value: impl Into<Value>) -> Result<(), StoreError> {
        let new_value = value.into();
        let old_value = self.state.borrow_mut().write(key, new_value)?;
        trace!(key = %key, ?old_value, ?new_value, "state changed");

        let event = Event::Changed(ChangeEvent {
            key,
            old_value,
            new_value,
        });
        self.bus.emit(&Topic::AnyChange, &event);
        self.bus.emit(&Topic::Changed(key), &event);
        Ok(())
    }

    /// Assign by dotted path, e.g. `stages.scan.locked`
    pub fn set_path(&self, path: &str, value: impl Into<Value>) -> Result<(), StoreError> {
        let key: StateKey = path.parse()?;
        self.set(key, value)
    }

    /// Resolve a dotted path. Unknown paths yield `None`.
    pub fn get(&self, path: &str) -> Option<Value> {
        let key: StateKey = path.parse().ok()?;
        Some(self.value(key))
    }

    pub fn value(&self, key: StateKey) -> Value {
        self.state.borrow().read(key)
    }

    pub fn flag(&self, key: StateKey) -> bool {
        self.value(key).as_bool().unwrap_or(false)
    }

    pub fn current_screen(&self) -> ScreenId {
        self.state.borrow().current_screen
    }

    pub fn stage_completed(&self, stage: StageId) -> bool {
        self.state.borrow().stages.completed(stage)
    }

    /// Clone of the whole tree
    pub fn snapshot(&self) -> AppState {
        self.state.borrow().clone()
    }

    pub fn on(&self, topic: Topic, listener: impl Fn(&Event) + 'static) -> ListenerId {
        self.bus.on(topic, listener)
    }

    pub fn off(&self, topic: &Topic, id: ListenerId) -> bool {
        self.bus.off(topic, id)
    }

    pub fn emit(&self, topic: &Topic, event: &Event) {
        self.bus.emit(topic, event)
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Restore `stages` and `currentScreen`. Listeners stay registered.
    pub fn reset(&self) {
        {
            let mut state = self.state.borrow_mut();
            state.current_screen = ScreenId::Intro;
            state.stages = StageRecords::default();
        }
        self.bus.emit(&Topic::Reset, &Event::Reset);
    }

    /// Percentage of completed stages: always a multiple of 25
    pub fn progress(&self) -> u32 {
        let completed = self.state.borrow().stages.completed_count();
        completed * 100 / StageId::ALL.len() as u32
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("state", &self.state.borrow())
            .field("bus", &self.bus)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn store() -> Store {
        Store::new(EventBus::new())
    }

    #[test]
    fn test_set_then_get_returns_value() {
        let store = store();
        store.set(StateKey::PlacementPlacedCount, 4u32).unwrap();
        assert_eq!(
            store.get("stages.placement.placedCount"),
            Some(Value::Count(4))
        );
    }

    #[test]
    fn test_get_unknown_path_is_none() {
        let store = store();
        assert_eq!(store.get("stages.orbit.completed"), None);
        assert_eq!(store.get(""), None);
    }

    #[test]
    fn test_set_path_rejects_unknown_path() {
        let store = store();
        let err = store.set_path("stages.scan.speed", 1.0).unwrap_err();
        assert!(matches!(err, StoreError::UnknownPath(_)));
    }

    #[test]
    fn test_type_mismatch_emits_nothing() {
        let store = store();
        let hits = Rc::new(Cell::new(0));
        {
            let hits = Rc::clone(&hits);
            store.on(Topic::AnyChange, move |_| hits.set(hits.get() + 1));
        }

        assert!(store.set(StateKey::ScanLocked, 3u32).is_err());
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn test_wildcard_then_specific_notification() {
        let store = store();
        let order = Rc::new(RefCell::new(Vec::new()));
        {
            let order = Rc::clone(&order);
            store.on(Topic::Changed(StateKey::ScanCompleted), move |_| {
                order.borrow_mut().push("specific")
            });
        }
        {
            let order = Rc::clone(&order);
            store.on(Topic::AnyChange, move |_| order.borrow_mut().push("any"));
        }

        store.set(StateKey::ScanCompleted, true).unwrap();
        assert_eq!(*order.borrow(), vec!["any", "specific"]);
    }

    #[test]
    fn test_change_event_carries_old_and_new() {
        let store = store();
        let seen = Rc::new(RefCell::new(None));
        {
            let seen = Rc::clone(&seen);
            store.on(Topic::Changed(StateKey::CurrentScreen), move |event| {
                *seen.borrow_mut() = Some(event.clone())
            });
        }

        store.set(StateKey::CurrentScreen, ScreenId::Scan).unwrap();
        assert_eq!(
            *seen.borrow(),
            Some(Event::Changed(ChangeEvent {
                key: StateKey::CurrentScreen,
                old_value: Value::Screen(ScreenId::Intro),
                new_value: Value::Screen(ScreenId::Scan),
            }))
        );
    }

    #[test]
    fn test_listener_may_set_reentrantly() {
        let store = Rc::new(store());
        let weak = Rc::downgrade(&store);
        store.on(Topic::Changed(StateKey::ScanCompleted), move |_| {
            if let Some(store) = weak.upgrade() {
                store.set(StateKey::ScanLocked, true).unwrap();
            }
        });

        store.set(StateKey::ScanCompleted, true).unwrap();
        assert!(store.flag(StateKey::ScanLocked));
    }

    #[test]
    fn test_reset_keeps_listeners_and_settings() {
        let store = store();
        let resets = Rc::new(Cell::new(0));
        {
            let resets = Rc::clone(&resets);
            store.on(Topic::Reset, move |_| resets.set(resets.get() + 1));
        }

        store.set(StateKey::VibrationEnabled, false).unwrap();
        store.set(StateKey::AnswerCompleted, true).unwrap();
        store.set(StateKey::CurrentScreen, ScreenId::Placement).unwrap();
        store.reset();

        assert_eq!(resets.get(), 1);
        assert_eq!(store.current_screen(), ScreenId::Intro);
        assert!(!store.stage_completed(StageId::Answer));
        assert!(!store.flag(StateKey::VibrationEnabled));
        assert_eq!(store.bus().listener_count(&Topic::Reset), 1);
    }

    #[test]
    fn test_custom_topic_delivers_payload() {
        let store = store();
        let received = Rc::new(RefCell::new(Vec::new()));
        {
            let received = Rc::clone(&received);
            store.on(Topic::Custom("confetti".into()), move |event| {
                if let Event::Custom { payload } = event {
                    received.borrow_mut().push(payload.clone());
                }
            });
        }

        let payload = serde_json::json!({ "bursts": 3, "color": "gold" });
        store.emit(
            &Topic::Custom("confetti".into()),
            &Event::Custom { payload: payload.clone() },
        );
        store.emit(
            &Topic::Custom("sparkles".into()),
            &Event::Custom { payload: serde_json::Value::Null },
        );
        store.set(StateKey::ScanCompleted, true).unwrap();

        assert_eq!(*received.borrow(), vec![payload]);
    }

    #[test]
    fn test_progress_is_quarter_steps() {
        let store = store();
        let keys = [
            StateKey::ScanCompleted,
            StateKey::AnswerCompleted,
            StateKey::PlacementCompleted,
            StateKey::CaptureCompleted,
        ];
        assert_eq!(store.progress(), 0);
        for (k, key) in keys.into_iter().enumerate() {
            store.set(key, true).unwrap();
            assert_eq!(store.progress(), 25 * (k as u32 + 1));
        }
    }
}
