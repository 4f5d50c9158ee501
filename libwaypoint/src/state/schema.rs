//! Session state schema
//!
//! The state tree is a fixed record. Every observable leaf is named by a
//! [`StateKey`], which maps to exactly one dotted path and one value kind, so
//! traversal into a missing segment cannot be expressed.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Screen identifiers, in flow order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreenId {
    Intro,
    Scan,
    Answer,
    Placement,
    Capture,
    Success,
}

impl ScreenId {
    pub const ALL: [ScreenId; 6] = [
        ScreenId::Intro,
        ScreenId::Scan,
        ScreenId::Answer,
        ScreenId::Placement,
        ScreenId::Capture,
        ScreenId::Success,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScreenId::Intro => "intro",
            ScreenId::Scan => "scan",
            ScreenId::Answer => "answer",
            ScreenId::Placement => "placement",
            ScreenId::Capture => "capture",
            ScreenId::Success => "success",
        }
    }

    /// The stage hosted on this screen, if any.
    pub fn stage(&self) -> Option<StageId> {
        match self {
            ScreenId::Scan => Some(StageId::Scan),
            ScreenId::Answer => Some(StageId::Answer),
            ScreenId::Placement => Some(StageId::Placement),
            ScreenId::Capture => Some(StageId::Capture),
            ScreenId::Intro | ScreenId::Success => None,
        }
    }
}

impl fmt::Display for ScreenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScreenId {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase();
        let name = name.strip_suffix("-screen").unwrap_or(&name);
        ScreenId::ALL
            .into_iter()
            .find(|id| id.as_str() == name)
            .ok_or_else(|| StoreError::UnknownPath(s.to_string()))
    }
}

/// The four stages, in flow order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    Scan,
    Answer,
    Placement,
    Capture,
}

impl StageId {
    pub const ALL: [StageId; 4] = [
        StageId::Scan,
        StageId::Answer,
        StageId::Placement,
        StageId::Capture,
    ];

    pub fn screen(&self) -> ScreenId {
        match self {
            StageId::Scan => ScreenId::Scan,
            StageId::Answer => ScreenId::Answer,
            StageId::Placement => ScreenId::Placement,
            StageId::Capture => ScreenId::Capture,
        }
    }

    /// Screen the flow hands off to once this stage completes.
    pub fn next_screen(&self) -> ScreenId {
        match self {
            StageId::Scan => ScreenId::Answer,
            StageId::Answer => ScreenId::Placement,
            StageId::Placement => ScreenId::Capture,
            StageId::Capture => ScreenId::Success,
        }
    }

    pub fn completed_key(&self) -> StateKey {
        match self {
            StageId::Scan => StateKey::ScanCompleted,
            StageId::Answer => StateKey::AnswerCompleted,
            StageId::Placement => StateKey::PlacementCompleted,
            StageId::Capture => StateKey::CaptureCompleted,
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.screen().as_str())
    }
}

/// Kind of value a key holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Bool,
    Count,
    Number,
    Screen,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Bool => write!(f, "bool"),
            ValueKind::Count => write!(f, "count"),
            ValueKind::Number => write!(f, "number"),
            ValueKind::Screen => write!(f, "screen"),
        }
    }
}

/// A leaf value in the state tree.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Value {
    Bool(bool),
    Count(u32),
    Number(f64),
    Screen(ScreenId),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Bool(_) => ValueKind::Bool,
            Value::Count(_) => ValueKind::Count,
            Value::Number(_) => ValueKind::Number,
            Value::Screen(_) => ValueKind::Screen,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_count(&self) -> Option<u32> {
        match self {
            Value::Count(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_screen(&self) -> Option<ScreenId> {
        match self {
            Value::Screen(s) => Some(*s),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Count(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Number(v)
    }
}

impl From<ScreenId> for Value {
    fn from(v: ScreenId) -> Self {
        Value::Screen(v)
    }
}

/// Closed set of observable fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateKey {
    CurrentScreen,
    ScanCompleted,
    ScanLocked,
    AnswerCompleted,
    AnswerExtra,
    PlacementCompleted,
    PlacementPlacedCount,
    CaptureCompleted,
    CaptureVerified,
    PermissionCamera,
    PermissionGyroscope,
    SensorAlpha,
    SensorBeta,
    SensorGamma,
    SoundEnabled,
    VibrationEnabled,
    ParticlesEnabled,
}

impl StateKey {
    pub const ALL: [StateKey; 17] = [
        StateKey::CurrentScreen,
        StateKey::ScanCompleted,
        StateKey::ScanLocked,
        StateKey::AnswerCompleted,
        StateKey::AnswerExtra,
        StateKey::PlacementCompleted,
        StateKey::PlacementPlacedCount,
        StateKey::CaptureCompleted,
        StateKey::CaptureVerified,
        StateKey::PermissionCamera,
        StateKey::PermissionGyroscope,
        StateKey::SensorAlpha,
        StateKey::SensorBeta,
        StateKey::SensorGamma,
        StateKey::SoundEnabled,
        StateKey::VibrationEnabled,
        StateKey::ParticlesEnabled,
    ];

    /// Dotted path of this key in the state tree.
    pub fn path(&self) -> &'static str {
        match self {
            StateKey::CurrentScreen => "currentScreen",
            StateKey::ScanCompleted => "stages.scan.completed",
            StateKey::ScanLocked => "stages.scan.locked",
            StateKey::AnswerCompleted => "stages.answer.completed",
            StateKey::AnswerExtra => "stages.answer.extra",
            StateKey::PlacementCompleted => "stages.placement.completed",
            StateKey::PlacementPlacedCount => "stages.placement.placedCount",
            StateKey::CaptureCompleted => "stages.capture.completed",
            StateKey::CaptureVerified => "stages.capture.verified",
            StateKey::PermissionCamera => "permissions.camera",
            StateKey::PermissionGyroscope => "permissions.gyroscope",
            StateKey::SensorAlpha => "sensors.alpha",
            StateKey::SensorBeta => "sensors.beta",
            StateKey::SensorGamma => "sensors.gamma",
            StateKey::SoundEnabled => "settings.soundEnabled",
            StateKey::VibrationEnabled => "settings.vibrationEnabled",
            StateKey::ParticlesEnabled => "settings.particlesEnabled",
        }
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            StateKey::CurrentScreen => ValueKind::Screen,
            StateKey::AnswerExtra | StateKey::PlacementPlacedCount => ValueKind::Count,
            StateKey::SensorAlpha | StateKey::SensorBeta | StateKey::SensorGamma => {
                ValueKind::Number
            }
            _ => ValueKind::Bool,
        }
    }

    /// Whether the key lives under `stages`.
    pub fn is_stage_field(&self) -> bool {
        self.path().starts_with("stages.")
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

impl FromStr for StateKey {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StateKey::ALL
            .into_iter()
            .find(|key| key.path() == s)
            .ok_or_else(|| StoreError::UnknownPath(s.to_string()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanRecord {
    pub completed: bool,
    pub locked: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub completed: bool,
    /// Carried for schema compatibility; no stage logic reads it.
    pub extra: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementRecord {
    pub completed: bool,
    pub placed_count: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaptureRecord {
    pub completed: bool,
    pub verified: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageRecords {
    pub scan: ScanRecord,
    pub answer: AnswerRecord,
    pub placement: PlacementRecord,
    pub capture: CaptureRecord,
}

impl StageRecords {
    pub fn completed(&self, stage: StageId) -> bool {
        match stage {
            StageId::Scan => self.scan.completed,
            StageId::Answer => self.answer.completed,
            StageId::Placement => self.placement.completed,
            StageId::Capture => self.capture.completed,
        }
    }

    pub fn completed_count(&self) -> u32 {
        StageId::ALL
            .into_iter()
            .filter(|stage| self.completed(*stage))
            .count() as u32
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Permissions {
    pub camera: bool,
    pub gyroscope: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sensors {
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub sound_enabled: bool,
    pub vibration_enabled: bool,
    pub particles_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sound_enabled: true,
            vibration_enabled: true,
            particles_enabled: true,
        }
    }
}

/// Root session state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    pub current_screen: ScreenId,
    pub stages: StageRecords,
    pub permissions: Permissions,
    pub sensors: Sensors,
    pub settings: Settings,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            current_screen: ScreenId::Intro,
            stages: StageRecords::default(),
            permissions: Permissions::default(),
            sensors: Sensors::default(),
            settings: Settings::default(),
        }
    }
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    /// Read the leaf named by `key`.
    pub fn read(&self, key: StateKey) -> Value {
        match key {
            StateKey::CurrentScreen => Value::Screen(self.current_screen),
            StateKey::ScanCompleted => Value::Bool(self.stages.scan.completed),
            StateKey::ScanLocked => Value::Bool(self.stages.scan.locked),
            StateKey::AnswerCompleted => Value::Bool(self.stages.answer.completed),
            StateKey::AnswerExtra => Value::Count(self.stages.answer.extra),
            StateKey::PlacementCompleted => Value::Bool(self.stages.placement.completed),
            StateKey::PlacementPlacedCount => Value::Count(self.stages.placement.placed_count),
            StateKey::CaptureCompleted => Value::Bool(self.stages.capture.completed),
            StateKey::CaptureVerified => Value::Bool(self.stages.capture.verified),
            StateKey::PermissionCamera => Value::Bool(self.permissions.camera),
            StateKey::PermissionGyroscope => Value::Bool(self.permissions.gyroscope),
            StateKey::SensorAlpha => Value::Number(self.sensors.alpha),
            StateKey::SensorBeta => Value::Number(self.sensors.beta),
            StateKey::SensorGamma => Value::Number(self.sensors.gamma),
            StateKey::SoundEnabled => Value::Bool(self.settings.sound_enabled),
            StateKey::VibrationEnabled => Value::Bool(self.settings.vibration_enabled),
            StateKey::ParticlesEnabled => Value::Bool(self.settings.particles_enabled),
        }
    }

    /// Assign the leaf named by `key`, returning the previous value.
    pub fn write(&mut self, key: StateKey, value: Value) -> Result<Value, StoreError> {
        let mismatch = || StoreError::TypeMismatch {
            key,
            expected: key.kind(),
            found: value.kind(),
        };
        let old = self.read(key);

        match (key, value) {
            (StateKey::CurrentScreen, Value::Screen(v)) => self.current_screen = v,
            (StateKey::ScanCompleted, Value::Bool(v)) => self.stages.scan.completed = v,
            (StateKey::ScanLocked, Value::Bool(v)) => self.stages.scan.locked = v,
            (StateKey::AnswerCompleted, Value::Bool(v)) => self.stages.answer.completed = v,
            (StateKey::AnswerExtra, Value::Count(v)) => self.stages.answer.extra = v,
            (StateKey::PlacementCompleted, Value::Bool(v)) => self.stages.placement.completed = v,
            (StateKey::PlacementPlacedCount, Value::Count(v)) => {
                self.stages.placement.placed_count = v
            }
            (StateKey::CaptureCompleted, Value::Bool(v)) => self.stages.capture.completed = v,
            (StateKey::CaptureVerified, Value::Bool(v)) => self.stages.capture.verified = v,
            (StateKey::PermissionCamera, Value::Bool(v)) => self.permissions.camera = v,
            (StateKey::PermissionGyroscope, Value::Bool(v)) => self.permissions.gyroscope = v,
            (StateKey::SensorAlpha, Value::Number(v)) => self.sensors.alpha = v,
            (StateKey::SensorBeta, Value::Number(v)) => self.sensors.beta = v,
            (StateKey::SensorGamma, Value::Number(v)) => self.sensors.gamma = v,
            (StateKey::SoundEnabled, Value::Bool(v)) => self.settings.sound_enabled = v,
            (StateKey::VibrationEnabled, Value::Bool(v)) => self.settings.vibration_enabled = v,
            (StateKey::ParticlesEnabled, Value::Bool(v)) => self.settings.particles_enabled = v,
            _ => return Err(mismatch()),
        }

        Ok(old)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_key_round_trips_its_path() {
        for key in StateKey::ALL {
            assert_eq!(key.path().parse::<StateKey>().unwrap(), key);
        }
    }

    #[test]
    fn test_unknown_path_is_rejected() {
        let err = "stages.scan.missing".parse::<StateKey>().unwrap_err();
        assert_eq!(err, StoreError::UnknownPath("stages.scan.missing".into()));
    }

    #[test]
    fn test_key_kinds_match_default_values() {
        let state = AppState::default();
        for key in StateKey::ALL {
            assert_eq!(state.read(key).kind(), key.kind(), "{}", key);
        }
    }

    #[test]
    fn test_write_rejects_wrong_kind() {
        let mut state = AppState::default();
        let err = state
            .write(StateKey::PlacementPlacedCount, Value::Bool(true))
            .unwrap_err();
        assert!(matches!(err, StoreError::TypeMismatch { .. }));
        assert_eq!(state.stages.placement.placed_count, 0);
    }

    #[test]
    fn test_write_returns_old_value() {
        let mut state = AppState::default();
        let old = state
            .write(StateKey::CurrentScreen, Value::Screen(ScreenId::Scan))
            .unwrap();
        assert_eq!(old, Value::Screen(ScreenId::Intro));
        assert_eq!(state.current_screen, ScreenId::Scan);
    }

    #[test]
    fn test_screen_id_parsing_accepts_screen_suffix() {
        assert_eq!("answer".parse::<ScreenId>().unwrap(), ScreenId::Answer);
        assert_eq!("capture-screen".parse::<ScreenId>().unwrap(), ScreenId::Capture);
        assert!("lobby".parse::<ScreenId>().is_err());
    }

    #[test]
    fn test_completed_count() {
        let mut records = StageRecords::default();
        assert_eq!(records.completed_count(), 0);
        records.scan.completed = true;
        records.capture.completed = true;
        assert_eq!(records.completed_count(), 2);
    }

    #[test]
    fn test_stage_navigation() {
        assert_eq!(StageId::Scan.next_screen(), ScreenId::Answer);
        assert_eq!(StageId::Capture.next_screen(), ScreenId::Success);
        assert_eq!(ScreenId::Placement.stage(), Some(StageId::Placement));
        assert_eq!(ScreenId::Intro.stage(), None);
    }
}
