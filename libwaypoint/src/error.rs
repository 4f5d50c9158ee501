//! Error types for Waypoint

use std::time::Duration;

use thiserror::Error;

use crate::state::{StateKey, ValueKind};

pub type Result<T> = std::result::Result<T, WaypointError>;

#[derive(Error, Debug)]
pub enum WaypointError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("State error: {0}")]
    Store(#[from] StoreError),

    #[error("Capture device error: {0}")]
    Device(#[from] DeviceError),

    #[error("Runtime error: {0}")]
    Runtime(String),
}

impl WaypointError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            WaypointError::Config(_) => 3,
            WaypointError::Store(_) => 1,
            WaypointError::Device(_) => 1,
            WaypointError::Runtime(_) => 1,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Unknown state path: {0}")]
    UnknownPath(String),

    #[error("{key} holds {expected} values, got {found}")]
    TypeMismatch {
        key: StateKey,
        expected: ValueKind,
        found: ValueKind,
    },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DeviceError {
    #[error("No capture device available")]
    Unavailable,

    #[error("Capture permission denied: {0}")]
    PermissionDenied(String),

    #[error("Capture device did not answer within {0:?}")]
    TimedOut(Duration),

    #[error("Capture stream failed: {0}")]
    Stream(String),
}

/// Recoverable conditions raised while a stage is running.
///
/// None of these cross a stage boundary: the controller that raised one
/// keeps running and only the state it owns is touched.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Fault {
    /// A required visual anchor is not mounted.
    #[error("Missing anchor: {0}")]
    MissingAnchor(String),

    /// Capture device access refused or impossible; the stage falls back.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// User input did not satisfy the stage's success condition.
    #[error("Validation failed: {0}")]
    ValidationFailure(String),

    /// A dragged token was released outside the snap threshold.
    #[error("Target out of reach ({distance:.1} > {threshold:.1})")]
    UnreachableTarget { distance: f64, threshold: f64 },
}

impl From<DeviceError> for Fault {
    fn from(err: DeviceError) -> Self {
        Fault::PermissionDenied(err.to_string())
    }
}
