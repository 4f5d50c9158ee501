//! Pure reducer and input mapping
//!
//! `reduce` is `(TuiState, Action) -> TuiState` with no side effects.
//! `map_key` and `map_mouse` turn raw terminal events into actions; this is
//! where keybindings live.

use crossterm::event::{
    KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use libwaypoint::stage::{Input, Point};
use libwaypoint::ScreenId;
use ratatui::layout::Rect;

use super::actions::Action;
use super::state::{StatusBarState, TuiState};
use crate::ui::board::BoardGeometry;

pub fn reduce(state: TuiState, action: Action) -> TuiState {
    match action {
        // === UI Events ===
        Action::Key(key) => {
            let mapped = map_key(&state, key);
            reduce(state, mapped)
        }
        Action::Mouse(_) => state, // mapped by the main loop, which knows the board geometry
        Action::Tick => state,
        Action::Resize(width, height) => TuiState {
            viewport: Rect::new(0, 0, width, height),
            ..state
        },

        // === Session ===
        Action::Stage(Input::Press(_)) if state.screen == ScreenId::Scan => TuiState {
            holding: true,
            ..state
        },
        Action::Stage(Input::Release(_)) if state.screen == ScreenId::Scan => TuiState {
            holding: false,
            ..state
        },
        Action::Stage(_) => state,

        Action::ScreenChanged(screen) => TuiState {
            screen,
            holding: false,
            status: StatusBarState::default(),
            ..state
        },

        Action::ResetSession => TuiState {
            help_visible: false,
            holding: false,
            status: StatusBarState {
                message: Some("Session reset".to_string()),
            },
            ..state
        },

        // === Navigation ===
        Action::Quit => TuiState {
            should_quit: true,
            ..state
        },

        Action::ShowHelp => TuiState {
            help_visible: true,
            ..state
        },

        Action::HideHelp => TuiState {
            help_visible: false,
            ..state
        },

        // === Error Handling ===
        Action::ShowError(error) => TuiState {
            error: Some(error),
            ..state
        },

        Action::DismissError => TuiState { error: None, ..state },

        // === Status Bar ===
        Action::SetStatus(message) => TuiState {
            status: StatusBarState {
                message: Some(message),
            },
            ..state
        },

        Action::ClearStatus => TuiState {
            status: StatusBarState::default(),
            ..state
        },

        Action::None => state,
    }
}

/// Map a key press to an action
pub fn map_key(state: &TuiState, key: KeyEvent) -> Action {
    match key.kind {
        // Only reported with keyboard enhancement
        KeyEventKind::Release => {
            let held_space =
                state.screen == ScreenId::Scan && key.code == KeyCode::Char(' ') && state.holding;
            return if held_space {
                Action::Stage(Input::Release(Point::default()))
            } else {
                Action::None
            };
        }
        KeyEventKind::Repeat => return Action::None,
        KeyEventKind::Press => {}
    }

    // Global keybindings
    match (key.code, key.modifiers) {
        (KeyCode::Char('c'), KeyModifiers::CONTROL) => return Action::Quit,
        (KeyCode::F(1), _) => {
            return if state.help_visible {
                Action::HideHelp
            } else {
                Action::ShowHelp
            };
        }
        (KeyCode::Esc, _) if state.error.is_some() => return Action::DismissError,
        (KeyCode::Esc, _) if state.help_visible => return Action::HideHelp,
        (KeyCode::Esc, _) => return Action::Quit,
        (KeyCode::Char('r'), KeyModifiers::CONTROL) => return Action::ResetSession,
        _ => {}
    }

    if state.has_overlay() {
        return Action::None;
    }

    let plain = key.modifiers == KeyModifiers::NONE || key.modifiers == KeyModifiers::SHIFT;
    match (state.screen, key.code) {
        (ScreenId::Answer, KeyCode::Enter) => Action::Stage(Input::Submit),
        // Every other key belongs to the text field
        (ScreenId::Answer, _) => Action::None,

        (_, KeyCode::Char('q')) if plain => Action::Quit,

        (ScreenId::Intro, KeyCode::Enter) => Action::Stage(Input::Confirm),

        (ScreenId::Scan, KeyCode::Char(' ')) if state.holding => {
            Action::Stage(Input::Release(Point::default()))
        }
        (ScreenId::Scan, KeyCode::Char(' ')) => Action::Stage(Input::Press(Point::default())),

        (ScreenId::Placement, KeyCode::Enter) => Action::Stage(Input::Continue),
        (ScreenId::Placement, KeyCode::Char('r')) if plain => Action::Stage(Input::Reset),

        (ScreenId::Capture, KeyCode::Char('c')) if plain => Action::Stage(Input::RequestDevice),
        (ScreenId::Capture, KeyCode::Enter | KeyCode::Char(' ')) => Action::Stage(Input::Confirm),

        (ScreenId::Success, KeyCode::Enter) => Action::ResetSession,

        _ => Action::None,
    }
}

/// Map a mouse event to an action. Placement coordinates are converted to
/// board units through `board`.
pub fn map_mouse(state: &TuiState, mouse: MouseEvent, board: &BoardGeometry) -> Action {
    if state.has_overlay() {
        return Action::None;
    }

    match (state.screen, mouse.kind) {
        (ScreenId::Scan, MouseEventKind::Down(MouseButton::Left)) => {
            Action::Stage(Input::Press(Point::default()))
        }
        (ScreenId::Scan, MouseEventKind::Up(MouseButton::Left)) if state.holding => {
            Action::Stage(Input::Release(Point::default()))
        }

        (ScreenId::Placement, kind) => {
            let point = board.to_board(mouse.column, mouse.row);
            match kind {
                MouseEventKind::Down(MouseButton::Left) => match point {
                    Some(point) => Action::Stage(Input::Press(point)),
                    None => Action::None,
                },
                MouseEventKind::Drag(MouseButton::Left) => {
                    Action::Stage(Input::Move(board.to_board_clamped(mouse.column, mouse.row)))
                }
                MouseEventKind::Up(MouseButton::Left) => {
                    Action::Stage(Input::Release(board.to_board_clamped(mouse.column, mouse.row)))
                }
                _ => Action::None,
            }
        }

        (ScreenId::Capture, MouseEventKind::Down(MouseButton::Left)) => {
            Action::Stage(Input::Confirm)
        }

        _ => Action::None,
    }
}
