//! Session state
//!
//! - Schema: what the state tree looks like and how keys address it
//! - Bus: synchronous publish/subscribe
//! - Store: the single mutation surface

pub mod bus;
pub mod schema;
pub mod store;

pub use bus::{ChangeEvent, Event, EventBus, Listener, ListenerId, Topic};
pub use schema::{
    AnswerRecord, AppState, CaptureRecord, Permissions, PlacementRecord, ScanRecord, ScreenId,
    Sensors, Settings, StageId, StageRecords, StateKey, Value, ValueKind,
};
pub use store::Store;
