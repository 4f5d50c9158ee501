//! Waypoint - a four-stage guided sequence engine
//!
//! This library provides the reactive state store, the transition/effect
//! orchestrator and the stage controllers (scan, answer, placement, capture)
//! that drive a linear chain of full-screen views with animated hand-offs.
//! Front ends host a [`Session`] and feed it input and time.

pub mod config;
pub mod error;
pub mod feedback;
pub mod logging;
pub mod session;
pub mod stage;
pub mod state;
pub mod transition;

// Re-export commonly used types
pub use config::Config;
pub use error::{Fault, Result, WaypointError};
pub use session::{DotState, Progress, Session};
pub use stage::{Input, Phase, Point, StageController};
pub use state::{AppState, ScreenId, StageId, StateKey, Store, Value};
pub use transition::{Direction, Orchestrator, TransitionOptions};
