//! Centralized logging configuration for Waypoint hosts
//!
//! Provides consistent logging setup with support for:
//! - Text, JSON, and pretty-printed output
//! - Environment variable configuration
//! - An optional log file, for hosts that own the terminal
//!
//! # Examples
//!
//! ```no_run
//! use libwaypoint::logging::{LogFormat, LogTarget, LoggingConfig};
//!
//! let config = LoggingConfig::new(LogFormat::Json, "debug".to_string(), false)
//!     .with_target(LogTarget::File("/tmp/waypoint.log".into()));
//! config.init().expect("logging");
//!
//! // Or respect the WAYPOINT_LOG_* variables
//! libwaypoint::logging::init_default();
//! ```

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Mutex;

use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

use crate::error::{ConfigError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable text output (no colors, for piping)
    Text,
    /// Machine-parseable JSON (one JSON object per line)
    Json,
    /// Pretty-printed with colors (for development)
    Pretty,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            _ => Err(format!(
                "Invalid log format: '{}'. Valid options: text, json, pretty",
                s
            )),
        }
    }
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Text => write!(f, "text"),
            LogFormat::Json => write!(f, "json"),
            LogFormat::Pretty => write!(f, "pretty"),
        }
    }
}

/// Where log lines go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    /// Appended to; created if missing
    File(PathBuf),
    /// Nothing is installed
    Discard,
}

/// Configuration for logging initialization
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub format: LogFormat,
    pub level: String,
    pub verbose: bool,
    pub target: LogTarget,
}

impl LoggingConfig {
    /// Create a new logging configuration writing to stderr
    ///
    /// # Arguments
    ///
    /// * `format` - Log output format (text, json, or pretty)
    /// * `level` - Minimum log level (error, warn, info, debug, trace)
    /// * `verbose` - If true, defaults to debug level
    pub fn new(format: LogFormat, level: String, verbose: bool) -> Self {
        Self {
            format,
            level,
            verbose,
            target: LogTarget::Stderr,
        }
    }

    pub fn with_target(mut self, target: LogTarget) -> Self {
        self.target = target;
        self
    }

    /// Read `WAYPOINT_LOG_FORMAT`, `WAYPOINT_LOG_LEVEL` and
    /// `WAYPOINT_LOG_FILE`. Without a log file, `fallback` is used.
    pub fn from_env(fallback: LogTarget) -> Self {
        let format = std::env::var("WAYPOINT_LOG_FORMAT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(LogFormat::Text);

        let level = std::env::var("WAYPOINT_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let target = match std::env::var("WAYPOINT_LOG_FILE") {
            Ok(path) if !path.trim().is_empty() => {
                LogTarget::File(PathBuf::from(shellexpand::tilde(&path).to_string()))
            }
            _ => fallback,
        };

        Self::new(format, level, false).with_target(target)
    }

    fn filter(&self) -> EnvFilter {
        let level: &str = if self.verbose { "debug" } else { &self.level };
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    }

    fn writer(&self) -> Result<Option<(BoxMakeWriter, bool)>> {
        match &self.target {
            LogTarget::Discard => Ok(None),
            LogTarget::Stderr => Ok(Some((BoxMakeWriter::new(std::io::stderr), true))),
            LogTarget::File(path) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent).map_err(ConfigError::ReadError)?;
                }
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .map_err(ConfigError::ReadError)?;
                Ok(Some((BoxMakeWriter::new(Mutex::new(file)), false)))
            }
        }
    }

    /// Initialize logging with the configured settings
    ///
    /// Call once at the start of the program. A second call leaves the first
    /// subscriber in place.
    pub fn init(&self) -> Result<()> {
        let Some((writer, ansi)) = self.writer()? else {
            return Ok(());
        };
        let filter = self.filter();

        let installed = match self.format {
            LogFormat::Json => tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_current_span(true)
                .with_span_list(true)
                .flatten_event(true)
                .with_target(true)
                .with_line_number(true)
                .with_file(true)
                .try_init(),
            LogFormat::Pretty => tracing_subscriber::fmt()
                .pretty()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(ansi)
                .with_target(true)
                .with_line_number(true)
                .with_file(true)
                .try_init(),
            LogFormat::Text => tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false)
                .with_level(true)
                .try_init(),
        };

        if installed.is_err() {
            tracing::debug!("logging subscriber already installed");
        }
        Ok(())
    }
}

/// Initialize logging with default settings
///
/// Respects `WAYPOINT_LOG_FORMAT`, `WAYPOINT_LOG_LEVEL` and
/// `WAYPOINT_LOG_FILE`. Falls back to text format at info level on stderr.
pub fn init_default() {
    let config = LoggingConfig::from_env(LogTarget::Stderr);
    if let Err(e) = config.init() {
        eprintln!("Failed to initialize logging: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_log_format_from_str() {
        assert_eq!("text".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("PRETTY".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
    }

    #[test]
    fn test_log_format_from_str_invalid() {
        let result = "yaml".parse::<LogFormat>();
        assert!(result.unwrap_err().contains("Invalid log format: 'yaml'"));
    }

    #[test]
    fn test_log_format_display() {
        assert_eq!(LogFormat::Json.to_string(), "json");
        assert_eq!(LogFormat::Pretty.to_string(), "pretty");
    }

    #[test]
    #[serial]
    fn test_from_env_reads_variables() {
        std::env::set_var("WAYPOINT_LOG_FORMAT", "json");
        std::env::set_var("WAYPOINT_LOG_LEVEL", "trace");
        std::env::set_var("WAYPOINT_LOG_FILE", "/tmp/waypoint/tui.log");

        let config = LoggingConfig::from_env(LogTarget::Discard);

        std::env::remove_var("WAYPOINT_LOG_FORMAT");
        std::env::remove_var("WAYPOINT_LOG_LEVEL");
        std::env::remove_var("WAYPOINT_LOG_FILE");

        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.level, "trace");
        assert_eq!(
            config.target,
            LogTarget::File(PathBuf::from("/tmp/waypoint/tui.log"))
        );
    }

    #[test]
    #[serial]
    fn test_from_env_uses_fallback_target() {
        std::env::remove_var("WAYPOINT_LOG_FILE");
        std::env::remove_var("WAYPOINT_LOG_FORMAT");
        let config = LoggingConfig::from_env(LogTarget::Discard);
        assert_eq!(config.target, LogTarget::Discard);
        assert_eq!(config.format, LogFormat::Text);
    }

    #[test]
    fn test_discard_installs_nothing() {
        let config = LoggingConfig::new(LogFormat::Text, "info".into(), false)
            .with_target(LogTarget::Discard);
        assert!(config.init().is_ok());
    }

    #[test]
    fn test_file_target_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("waypoint.log");
        let config = LoggingConfig::new(LogFormat::Text, "info".into(), false)
            .with_target(LogTarget::File(path.clone()));
        assert!(config.writer().unwrap().is_some());
        assert!(path.exists());
    }
}
