//! waypoint-tui library
//!
//! Exports the front-end state, reducer, terminal setup and renderers so
//! the binary and the integration tests share them.

pub mod app;
pub mod error;
pub mod terminal;
pub mod ui;

// Re-export commonly used types
pub use app::{map_key, map_mouse, reduce, Action, TuiState};
pub use error::{Result, TuiError};
