//! Configuration management for Waypoint

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::state::Settings;
use crate::transition::Direction;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub flow: FlowConfig,
    pub scan: ScanConfig,
    pub answer: AnswerConfig,
    pub placement: PlacementConfig,
    pub capture: CaptureConfig,
    pub settings: SettingsConfig,
}

/// Hand-offs between stages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    pub direction: Direction,
    pub transition_ms: u64,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            direction: Direction::Left,
            transition_ms: 600,
        }
    }
}

impl FlowConfig {
    pub fn transition(&self) -> Duration {
        Duration::from_millis(self.transition_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub hold_ms: u64,
    pub settle_ms: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            hold_ms: 3000,
            settle_ms: 1500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnswerConfig {
    /// Compared after trimming and lowercasing the input
    pub secret: String,
    pub question: String,
    pub clear_ms: u64,
    pub settle_ms: u64,
}

impl Default for AnswerConfig {
    fn default() -> Self {
        Self {
            secret: "chill".to_string(),
            question: "What is the password?".to_string(),
            clear_ms: 800,
            settle_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    pub snap_distance: f64,
    pub board_width: f64,
    pub board_height: f64,
    /// Fixed layout seed; entropy when absent
    pub seed: Option<u64>,
    /// Show an overlay after completion that waits for a continue
    pub reveal: bool,
    pub reveal_message: String,
    pub settle_ms: u64,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            snap_distance: 60.0,
            board_width: 360.0,
            board_height: 560.0,
            seed: None,
            reveal: false,
            reveal_message: "A surprise is waiting for you".to_string(),
            settle_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    /// No capture hardware; confirm always commits the fallback still
    None,
    #[default]
    Simulated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    pub device: DeviceKind,
    pub timeout_secs: u64,
    pub hud_interval_ms: u64,
    pub flash_ms: u64,
    pub verify_ms: u64,
    pub settle_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device: DeviceKind::Simulated,
            timeout_secs: 10,
            hud_interval_ms: 500,
            flash_ms: 500,
            verify_ms: 500,
            settle_ms: 1200,
        }
    }
}

impl CaptureConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsConfig {
    pub sound: bool,
    pub vibration: bool,
    pub particles: bool,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            sound: true,
            vibration: true,
            particles: true,
        }
    }
}

impl From<&SettingsConfig> for Settings {
    fn from(config: &SettingsConfig) -> Self {
        Settings {
            sound_enabled: config.sound,
            vibration_enabled: config.vibration,
            particles_enabled: config.particles,
        }
    }
}

/// Token footprint on the placement board
pub const TOKEN_WIDTH: f64 = 60.0;
pub const TOKEN_HEIGHT: f64 = 80.0;

impl Config {
    /// Load configuration from the default location, or defaults when no
    /// file exists there
    pub fn load() -> Result<Self> {
        let config_path = resolve_config_path()?;
        if !config_path.exists() {
            tracing::debug!(path = %config_path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let config: Config = toml::from_str(&content).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |field: &str, reason: &str| ConfigError::InvalidValue {
            field: field.to_string(),
            reason: reason.to_string(),
        };

        if self.answer.secret.trim().is_empty() {
            return Err(ConfigError::MissingField("answer.secret".to_string()).into());
        }
        if self.scan.hold_ms == 0 {
            return Err(invalid("scan.hold_ms", "must be greater than zero").into());
        }
        if self.placement.snap_distance.is_nan() || self.placement.snap_distance <= 0.0 {
            return Err(invalid("placement.snap_distance", "must be positive").into());
        }
        let (width, height) = (self.placement.board_width, self.placement.board_height);
        if !width.is_finite() || !height.is_finite() {
            return Err(invalid("placement.board_width", "board size must be finite").into());
        }
        if width < TOKEN_WIDTH * 3.0 || height < TOKEN_HEIGHT * 3.0 {
            return Err(invalid(
                "placement.board_width",
                "board is too small to lay out the tokens",
            )
            .into());
        }
        if self.capture.hud_interval_ms == 0 {
            return Err(invalid("capture.hud_interval_ms", "must be greater than zero").into());
        }
        Ok(())
    }

    pub fn settings(&self) -> Settings {
        Settings::from(&self.settings)
    }
}

/// Resolve the configuration file path following XDG Base Directory spec
pub fn resolve_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("WAYPOINT_CONFIG") {
        return Ok(PathBuf::from(shellexpand::tilde(&path).to_string()));
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::MissingField("config directory".to_string()))?;

    Ok(config_dir.join("waypoint").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WaypointError;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.answer.secret, "chill");
        assert_eq!(config.capture.timeout(), Duration::from_secs(10));
        assert_eq!(config.flow.transition(), Duration::from_millis(600));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[answer]
secret = "Open Sesame"

[placement]
seed = 42
reveal = true

[settings]
particles = false
"#
        )
        .unwrap();

        let config = Config::load_from_path(file.path()).unwrap();
        assert_eq!(config.answer.secret, "Open Sesame");
        assert_eq!(config.answer.clear_ms, 800);
        assert_eq!(config.placement.seed, Some(42));
        assert!(config.placement.reveal);
        assert!(!config.settings().particles_enabled);
        assert!(config.settings().vibration_enabled);
    }

    #[test]
    fn test_direction_in_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[flow]\ndirection = \"glitch\"").unwrap();
        let config = Config::load_from_path(file.path()).unwrap();
        assert_eq!(config.flow.direction, Direction::Glitch);
    }

    #[test]
    fn test_empty_secret_rejected() {
        let mut config = Config::default();
        config.answer.secret = "   ".to_string();
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            WaypointError::Config(ConfigError::MissingField(_))
        ));
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = Config::default();
        config.placement.snap_distance = 0.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.scan.hold_ms = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.placement.board_width = 100.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_non_finite_board_rejected() {
        for (width, height) in [(f64::NAN, 560.0), (360.0, f64::NAN), (f64::INFINITY, 560.0)] {
            let mut config = Config::default();
            config.placement.board_width = width;
            config.placement.board_height = height;
            match config.validate() {
                Err(WaypointError::Config(ConfigError::InvalidValue { field, .. })) => {
                    assert_eq!(field, "placement.board_width");
                }
                other => panic!("expected invalid board size, got {other:?}"),
            }
        }

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[placement]\nboard_height = nan").unwrap();
        assert!(Config::load_from_path(file.path()).is_err());
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[scan\nhold_ms = ").unwrap();
        let err = Config::load_from_path(file.path()).unwrap_err();
        assert!(matches!(
            err,
            WaypointError::Config(ConfigError::ParseError(_))
        ));
    }

    #[test]
    #[serial]
    fn test_config_path_from_env() {
        std::env::set_var("WAYPOINT_CONFIG", "/tmp/waypoint-test/config.toml");
        let path = resolve_config_path().unwrap();
        std::env::remove_var("WAYPOINT_CONFIG");
        assert_eq!(path, PathBuf::from("/tmp/waypoint-test/config.toml"));
    }

    #[test]
    #[serial]
    fn test_load_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::env::set_var("WAYPOINT_CONFIG", dir.path().join("absent.toml"));
        let config = Config::load();
        std::env::remove_var("WAYPOINT_CONFIG");
        assert_eq!(config.unwrap(), Config::default());
    }
}
