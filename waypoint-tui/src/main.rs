//! waypoint-tui - Terminal front end for Waypoint
//!
//! Hosts a session in the terminal: keys and mouse become stage input, the
//! tick drives the session clock, and the scene is drawn every frame.

use std::time::Instant;

use anyhow::Context;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use libwaypoint::logging::{LogTarget, LoggingConfig};
use libwaypoint::stage::{Input, Outcome};
use libwaypoint::{Config, Session, WaypointError};
use tracing::{debug, info, warn};
use tui_textarea::TextArea;
use uuid::Uuid;
use waypoint_tui::{
    app::event::{EventHandler, TuiEvent},
    map_key, map_mouse, reduce,
    terminal::{install_panic_hook, restore_terminal, setup_terminal, Tui},
    ui, Action, TuiError, TuiState,
};

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(exit_code(&e));
    }
}

fn exit_code(error: &anyhow::Error) -> i32 {
    if let Some(e) = error.downcast_ref::<TuiError>() {
        e.exit_code()
    } else if let Some(e) = error.downcast_ref::<WaypointError>() {
        e.exit_code()
    } else {
        1
    }
}

fn run() -> anyhow::Result<()> {
    // The terminal belongs to the UI; logs only go to WAYPOINT_LOG_FILE
    LoggingConfig::from_env(LogTarget::Discard).init()?;

    let config = Config::load().context("Failed to load configuration")?;
    let mut session = Session::from_config(config).context("Failed to start session")?;
    let session_id: Uuid = session.id();
    info!(session = %session_id, "waypoint-tui starting");

    install_panic_hook();
    let mut terminal = setup_terminal()?;

    let result = run_app(&mut terminal.terminal, &mut session);

    session.teardown();
    restore_terminal(terminal)?;
    info!(session = %session_id, "waypoint-tui stopped");

    result.map_err(Into::into)
}

fn answer_field() -> TextArea<'static> {
    let mut textarea = TextArea::default();
    textarea.set_placeholder_text("Type your answer and press Enter");
    textarea.set_block(
        ratatui::widgets::Block::default()
            .title(" Answer ")
            .borders(ratatui::widgets::Borders::ALL),
    );
    textarea
}

/// Keys the answer field must not swallow
fn is_global_key(key: &KeyEvent) -> bool {
    matches!(
        (key.code, key.modifiers),
        (KeyCode::Char('c'), KeyModifiers::CONTROL)
            | (KeyCode::Char('r'), KeyModifiers::CONTROL)
            | (KeyCode::F(_), _)
            | (KeyCode::Esc, _)
            | (KeyCode::Enter, _)
    )
}

fn run_app(terminal: &mut Tui, session: &mut Session) -> waypoint_tui::Result<()> {
    let mut state = TuiState::new();
    let size = terminal.size()?;
    state = reduce(state, Action::Resize(size.width, size.height));

    let mut textarea = answer_field();
    let event_handler = EventHandler::new(state.config.tick_rate_ms);

    session.start();
    let started = Instant::now();

    loop {
        terminal.draw(|frame| {
            ui::render(frame, &state, &*session, &textarea);
        })?;

        let action = match event_handler.next()? {
            TuiEvent::Key(key)
                if state.is_typing() && key.kind == KeyEventKind::Press && !is_global_key(&key) =>
            {
                textarea.input(key);
                Action::Stage(Input::Text(textarea.lines().join("")))
            }
            TuiEvent::Key(key) => map_key(&state, key),
            TuiEvent::Mouse(mouse) => {
                let board = &session.config().placement;
                let (width, height) = session
                    .placement()
                    .map(|p| p.board())
                    .unwrap_or((board.board_width, board.board_height));
                let geometry = ui::board_geometry(state.viewport, width, height);
                map_mouse(&state, mouse, &geometry)
            }
            other => other.into(),
        };

        state = reduce(state, action.clone());

        // Side effects
        match action {
            Action::Stage(input) => match session.input(input) {
                Outcome::Rejected(fault) => {
                    debug!(%fault, "input rejected");
                    state = reduce(state, Action::SetStatus(fault.to_string()));
                }
                Outcome::Completed => {
                    state = reduce(state, Action::ClearStatus);
                }
                Outcome::Ignored | Outcome::Progressed => {}
            },
            Action::ResetSession => {
                if let Err(e) = session.reset() {
                    warn!(error = %e, "session reset failed");
                    state = reduce(state, Action::ShowError(e.to_string()));
                }
                textarea = answer_field();
            }
            Action::Tick => session.advance(started.elapsed()),
            _ => {}
        }

        let screen = session.current_screen();
        if screen != state.screen {
            state = reduce(state, Action::ScreenChanged(screen));
        }

        // The stage clears the field after a wrong answer
        let cleared = session.answer().map(|a| a.input().is_empty()).unwrap_or(true);
        if cleared && !textarea.is_empty() {
            textarea = answer_field();
        }

        if state.should_quit {
            break;
        }
    }

    Ok(())
}
