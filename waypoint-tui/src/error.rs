//! Error types for waypoint-tui
//!
//! Wraps core library errors and terminal I/O errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TuiError {
    /// Core library error
    #[error("Core error: {0}")]
    Core(#[from] libwaypoint::WaypointError),

    /// Terminal/IO error
    #[error("Terminal error: {0}")]
    Terminal(#[from] std::io::Error),

    #[error("Application error: {0}")]
    Application(String),

    /// Event source error
    #[error("Event error: {0}")]
    Event(String),
}

impl TuiError {
    /// Process exit code for the binary
    pub fn exit_code(&self) -> i32 {
        match self {
            TuiError::Core(e) => e.exit_code(),
            TuiError::Terminal(_) | TuiError::Event(_) => 2,
            TuiError::Application(_) => 1,
        }
    }
}

/// Result type for TUI operations
pub type Result<T> = std::result::Result<T, TuiError>;
