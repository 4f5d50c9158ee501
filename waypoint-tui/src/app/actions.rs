//! Actions for the reducer pattern
//!
//! Every change to [`TuiState`](super::TuiState) is described by an action.
//! Actions that carry a stage [`Input`] are also forwarded to the session by
//! the main loop.

use crossterm::event::{KeyEvent, MouseEvent};
use libwaypoint::stage::Input;
use libwaypoint::ScreenId;

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    // === UI Events ===
    Key(KeyEvent),

    Mouse(MouseEvent),

    /// Periodic tick; the main loop advances the session clock
    Tick,

    Resize(u16, u16),

    // === Session ===
    /// Forward an input to the active stage
    Stage(Input),

    /// The session reports a new current screen
    ScreenChanged(ScreenId),

    /// Start the whole flow over from the intro
    ResetSession,

    // === Navigation ===
    Quit,

    ShowHelp,

    HideHelp,

    // === Error Handling ===
    ShowError(String),

    DismissError,

    // === Status Bar ===
    SetStatus(String),

    ClearStatus,

    /// Nothing to do
    None,
}

impl Action {
    /// The stage input carried by this action, if any
    pub fn input(&self) -> Option<&Input> {
        match self {
            Action::Stage(input) => Some(input),
            _ => None,
        }
    }
}
