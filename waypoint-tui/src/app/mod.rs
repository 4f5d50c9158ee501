//! Application module
//!
//! - Actions: what can happen
//! - State: what the front end knows on top of the session
//! - Reducer: pure `(State, Action) -> State` plus key and mouse mapping
//! - Event: terminal events merged with the tick

pub mod actions;
pub mod event;
pub mod reducer;
pub mod state;

pub use actions::Action;
pub use reducer::{map_key, map_mouse, reduce};
pub use state::{StatusBarState, TuiState, UiConfig};
