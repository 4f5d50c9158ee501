//! Front-end state
//!
//! Only what the terminal needs on top of the session: overlays, the status
//! line, the viewport and whether the sensor key is held. All transitions go
//! through the reducer.

use libwaypoint::ScreenId;
use ratatui::layout::Rect;

#[derive(Debug, Clone, PartialEq)]
pub struct TuiState {
    pub should_quit: bool,

    /// Mirror of the session's current screen
    pub screen: ScreenId,

    pub help_visible: bool,

    /// Scan sensor is being held from the keyboard or mouse
    pub holding: bool,

    pub status: StatusBarState,

    /// Error overlay text
    pub error: Option<String>,

    /// Last known terminal size
    pub viewport: Rect,

    pub config: UiConfig,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusBarState {
    pub message: Option<String>,
}

/// UI configuration
#[derive(Debug, Clone, PartialEq)]
pub struct UiConfig {
    pub colors_enabled: bool,

    /// Use unicode symbols (false = ASCII fallback)
    pub unicode_enabled: bool,

    pub tick_rate_ms: u64,
}

impl Default for UiConfig {
    fn default() -> Self {
        let colors_enabled = std::env::var("NO_COLOR").is_err()
            && std::env::var("WAYPOINT_TUI_NO_COLOR").is_err();

        let unicode_enabled = colors_enabled;

        let tick_rate_ms = std::env::var("WAYPOINT_TUI_TICK_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|ms| *ms > 0)
            .unwrap_or(50);

        Self {
            colors_enabled,
            unicode_enabled,
            tick_rate_ms,
        }
    }
}

impl Default for TuiState {
    fn default() -> Self {
        Self {
            should_quit: false,
            screen: ScreenId::Intro,
            help_visible: false,
            holding: false,
            status: StatusBarState::default(),
            error: None,
            viewport: Rect::new(0, 0, 80, 24),
            config: UiConfig::default(),
        }
    }
}

impl TuiState {
    pub fn new() -> Self {
        Self::default()
    }

    /// An overlay is capturing keys
    pub fn has_overlay(&self) -> bool {
        self.help_visible || self.error.is_some()
    }

    /// Keys go to the answer field
    pub fn is_typing(&self) -> bool {
        self.screen == ScreenId::Answer && !self.has_overlay()
    }
}
