//! End-to-end flow tests
//!
//! Drive a whole session from the intro to the success screen through the
//! public API only, the way a front end would.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use libwaypoint::config::{Config, DeviceKind};
use libwaypoint::feedback::{Pulse, RecordingBackdrop, RecordingHaptics};
use libwaypoint::stage::device::{FrameOrigin, NoDevice, SimulatedDevice};
use libwaypoint::stage::{Input, Outcome, Point};
use libwaypoint::{DotState, ScreenId, Session, StageId, StateKey};

fn run(session: &mut Session, by: Duration) {
    let end = session.now() + by;
    while session.now() < end {
        let next = (session.now() + Duration::from_millis(50)).min(end);
        session.advance(next);
    }
}

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn seeded_config() -> Config {
    let mut config = Config::default();
    config.placement.seed = Some(7);
    config.capture.device = DeviceKind::None;
    config
}

fn recording_session(config: Config) -> Result<(Session, RecordingHaptics, RecordingBackdrop)> {
    let haptics = RecordingHaptics::default();
    let backdrop = RecordingBackdrop::default();
    let mut session = Session::new(
        config,
        Box::new(haptics.clone()),
        Box::new(backdrop.clone()),
        Arc::new(NoDevice),
    )?;
    session.start();
    Ok((session, haptics, backdrop))
}

fn pass_scan(session: &mut Session) {
    assert_eq!(session.input(Input::Press(Point::default())), Outcome::Progressed);
    run(session, ms(3050));
    assert!(session.store().flag(StateKey::ScanCompleted));
    session.input(Input::Release(Point::default()));
    run(session, ms(1500 + 700));
}

fn pass_answer(session: &mut Session) {
    session.input(Input::Text("  Chill ".into()));
    assert_eq!(session.input(Input::Submit), Outcome::Completed);
    run(session, ms(2000 + 700));
}

fn pass_placement(session: &mut Session) {
    let mut guard = 0;
    while session.placement().map(|p| p.placed_count()).unwrap_or(6) < 6 && guard < 20 {
        guard += 1;
        let placement = session.placement().expect("placement stage");
        let target = placement.target();
        let token = placement
            .tokens()
            .iter()
            .find(|t| !t.placed)
            .expect("unplaced token");
        let grab = token.center();

        session.input(Input::Press(grab));
        session.input(Input::Move(Point::new(target.x + 5.0, target.y)));
        session.input(Input::Release(target));
        run(session, ms(50));
    }
    assert!(session.store().flag(StateKey::PlacementCompleted));
    run(session, ms(1000 + 700));
}

fn pass_capture(session: &mut Session) {
    assert_eq!(session.input(Input::Confirm), Outcome::Progressed);
    run(session, ms(1000 + 1200 + 700));
}

#[test]
fn test_full_flow_reaches_success() -> Result<()> {
    let (mut session, haptics, backdrop) = recording_session(seeded_config())?;

    assert_eq!(session.input(Input::Confirm), Outcome::Progressed);
    run(&mut session, ms(700));
    assert_eq!(session.active_stage(), Some(StageId::Scan));

    pass_scan(&mut session);
    assert_eq!(session.current_screen(), ScreenId::Answer);
    assert_eq!(session.progress().percent, 25);

    pass_answer(&mut session);
    assert_eq!(session.current_screen(), ScreenId::Placement);
    assert_eq!(session.progress().percent, 50);

    pass_placement(&mut session);
    assert_eq!(session.current_screen(), ScreenId::Capture);
    assert_eq!(session.store().value(StateKey::PlacementPlacedCount).as_count(), Some(6));

    pass_capture(&mut session);
    assert_eq!(session.current_screen(), ScreenId::Success);
    assert!(session.is_finished());
    assert_eq!(session.active_stage(), None);
    assert_eq!(session.progress().percent, 100);
    assert_eq!(session.progress().dots, [DotState::Completed; 4]);
    assert_eq!(
        session.capture().and_then(|c| c.still()).map(|f| f.origin),
        Some(FrameOrigin::Fallback)
    );

    let pulses = haptics.recorded();
    assert_eq!(pulses.iter().filter(|p| **p == Pulse::Success).count(), 4);
    // capture success and the success screen
    assert_eq!(backdrop.burst_count(), 2);

    assert_eq!(session.input(Input::Confirm), Outcome::Ignored);
    Ok(())
}

#[test]
fn test_current_screen_lags_until_hand_off_completes() -> Result<()> {
    let (mut session, _, _) = recording_session(seeded_config())?;
    session.input(Input::Confirm);
    run(&mut session, ms(700));
    session.input(Input::Press(Point::default()));
    run(&mut session, ms(3050 + 1500));

    // hand-off under way: still on scan
    run(&mut session, ms(300));
    assert_eq!(session.current_screen(), ScreenId::Scan);
    assert!(session.orchestrator().is_transitioning());

    run(&mut session, ms(400));
    assert_eq!(session.current_screen(), ScreenId::Answer);
    Ok(())
}

#[test]
fn test_reset_mid_flow_starts_over() -> Result<()> {
    let (mut session, _, _) = recording_session(seeded_config())?;
    session.input(Input::Confirm);
    run(&mut session, ms(700));
    pass_scan(&mut session);
    session.input(Input::Text("wrong".into()));
    session.input(Input::Submit);

    session.reset()?;
    assert_eq!(session.current_screen(), ScreenId::Intro);
    assert_eq!(session.progress().percent, 0);
    assert!(!session.store().flag(StateKey::ScanLocked));

    session.input(Input::Confirm);
    run(&mut session, ms(700));
    assert_eq!(session.active_stage(), Some(StageId::Scan));
    pass_scan(&mut session);
    assert_eq!(session.current_screen(), ScreenId::Answer);
    assert_eq!(session.answer().map(|a| a.attempts()), Some(0));
    Ok(())
}

#[test]
fn test_live_device_flow() -> Result<()> {
    let device = SimulatedDevice::granting();
    let mut config = seeded_config();
    config.capture.device = DeviceKind::Simulated;
    let mut session = Session::new(
        config,
        Box::new(RecordingHaptics::default()),
        Box::new(RecordingBackdrop::default()),
        Arc::new(device.clone()),
    )?;
    session.start();

    session.input(Input::Confirm);
    run(&mut session, ms(700));
    pass_scan(&mut session);
    pass_answer(&mut session);
    pass_placement(&mut session);
    assert_eq!(session.active_stage(), Some(StageId::Capture));

    assert_eq!(session.input(Input::RequestDevice), Outcome::Progressed);
    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    while !session.store().flag(StateKey::PermissionCamera)
        && std::time::Instant::now() < deadline
    {
        std::thread::sleep(ms(5));
        let now = session.now();
        session.advance(now);
    }
    assert!(session.store().flag(StateKey::PermissionCamera));

    pass_capture(&mut session);
    assert!(session.is_finished());
    assert_eq!(
        session.capture().and_then(|c| c.still()).map(|f| f.origin),
        Some(FrameOrigin::Live)
    );
    assert_eq!(device.stopped(), 1);
    Ok(())
}

#[test]
fn test_silent_settings_mute_feedback() -> Result<()> {
    let mut config = seeded_config();
    config.settings.vibration = false;
    config.settings.particles = false;
    let (mut session, haptics, backdrop) = recording_session(config)?;

    session.input(Input::Confirm);
    run(&mut session, ms(700));
    pass_scan(&mut session);

    assert!(haptics.recorded().is_empty());
    assert!(backdrop.containers.lock().unwrap().is_empty());
    Ok(())
}
