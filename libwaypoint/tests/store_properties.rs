//! Store and orchestrator properties checked through the public API

use std::cell::RefCell;
use std::rc::Rc;

use libwaypoint::state::{Event, EventBus, Topic, ValueKind};
use libwaypoint::transition::{Scene, TransitionOptions};
use libwaypoint::{Direction, Fault, Orchestrator, ScreenId, StageId, StateKey, Store, Value};

fn sample(key: StateKey) -> Value {
    match key.kind() {
        ValueKind::Bool => Value::Bool(true),
        ValueKind::Count => Value::Count(3),
        ValueKind::Number => Value::Number(-12.5),
        ValueKind::Screen => Value::Screen(ScreenId::Capture),
    }
}

#[test]
fn test_every_key_round_trips_through_its_path() {
    let store = Store::new(EventBus::new());
    for key in StateKey::ALL {
        let value = sample(key);
        store.set(key, value).unwrap();
        assert_eq!(store.get(key.path()), Some(value), "{}", key);
    }
}

#[test]
fn test_each_set_notifies_wildcard_then_key() {
    let store = Store::new(EventBus::new());
    let log = Rc::new(RefCell::new(Vec::new()));
    for key in StateKey::ALL {
        let log = Rc::clone(&log);
        store.on(Topic::Changed(key), move |_| log.borrow_mut().push(format!("key:{}", key)));
    }
    {
        let log = Rc::clone(&log);
        store.on(Topic::AnyChange, move |event| {
            if let Event::Changed(change) = event {
                log.borrow_mut().push(format!("any:{}", change.key));
            }
        });
    }

    for key in StateKey::ALL {
        log.borrow_mut().clear();
        store.set(key, sample(key)).unwrap();
        assert_eq!(
            *log.borrow(),
            vec![format!("any:{}", key), format!("key:{}", key)]
        );
    }
}

#[test]
fn test_progress_steps_by_quarters() {
    let store = Store::new(EventBus::new());
    assert_eq!(store.progress(), 0);
    for (k, stage) in StageId::ALL.into_iter().enumerate() {
        store.set(stage.completed_key(), true).unwrap();
        assert_eq!(store.progress(), 25 * (k as u32 + 1));
    }
}

#[test]
fn test_wrong_kind_is_rejected() {
    let store = Store::new(EventBus::new());
    assert!(store.set(StateKey::ScanCompleted, 4u32).is_err());
    assert!(!store.flag(StateKey::ScanCompleted));
    assert!(store.get("stages.scan.nope").is_none());
}

#[test]
fn test_reset_keeps_listeners() {
    let store = Store::new(EventBus::new());
    let hits = Rc::new(RefCell::new(0));
    {
        let hits = Rc::clone(&hits);
        store.on(Topic::AnyChange, move |_| *hits.borrow_mut() += 1);
    }
    store.set(StateKey::AnswerCompleted, true).unwrap();
    store.reset();
    assert!(!store.flag(StateKey::AnswerCompleted));
    assert_eq!(store.current_screen(), ScreenId::Intro);

    store.set(StateKey::AnswerCompleted, true).unwrap();
    assert_eq!(*hits.borrow(), 2);
}

#[test]
fn test_goto_unmounted_screen_leaves_current_screen() {
    let store = Rc::new(Store::new(EventBus::new()));
    let mut scene = Scene::standard();
    scene.unmount_surface(ScreenId::Placement);
    let mut orchestrator = Orchestrator::new(Rc::clone(&store), scene);

    let called = Rc::new(RefCell::new(false));
    let flag = Rc::clone(&called);
    let result = orchestrator.goto(
        ScreenId::Answer,
        ScreenId::Placement,
        TransitionOptions::new(Direction::Zoom).on_complete(move || *flag.borrow_mut() = true),
    );

    assert_eq!(result, Err(Fault::MissingAnchor("placement-screen".into())));
    orchestrator.advance(std::time::Duration::from_secs(2));
    assert_eq!(store.current_screen(), ScreenId::Intro);
    assert!(!*called.borrow());
}

#[test]
fn test_every_direction_completes_a_hand_off() {
    for direction in Direction::ALL {
        let store = Rc::new(Store::new(EventBus::new()));
        let mut orchestrator = Orchestrator::new(Rc::clone(&store), Scene::standard());
        orchestrator.jump_to(ScreenId::Scan);
        orchestrator
            .goto(ScreenId::Scan, ScreenId::Answer, TransitionOptions::new(direction))
            .unwrap();
        orchestrator.advance(std::time::Duration::from_millis(1000));

        assert_eq!(store.current_screen(), ScreenId::Answer, "{}", direction);
        let scene = orchestrator.scene();
        assert!(!scene.surface(ScreenId::Scan).unwrap().active, "{}", direction);
        assert!(scene.surface(ScreenId::Answer).unwrap().active, "{}", direction);
    }
}
