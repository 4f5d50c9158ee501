//! Terminal management
//!
//! Raw mode, alternate screen, mouse capture and, where the terminal
//! supports it, key release reporting so the sensor can be held with space.
//! The panic hook restores all of it.

use std::io::{self, Stdout};

use crossterm::{
    event::{
        DisableMouseCapture, EnableMouseCapture, KeyboardEnhancementFlags,
        PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    execute,
    terminal::{
        disable_raw_mode, enable_raw_mode, supports_keyboard_enhancement, EnterAlternateScreen,
        LeaveAlternateScreen,
    },
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::debug;

use crate::error::Result;

pub type Tui = Terminal<CrosstermBackend<Stdout>>;

/// Terminal plus what was switched on, so teardown undoes exactly that
pub struct TerminalSession {
    pub terminal: Tui,
    pub key_release: bool,
}

pub fn setup_terminal() -> Result<TerminalSession> {
    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

    let key_release = supports_keyboard_enhancement().unwrap_or(false);
    if key_release {
        execute!(
            stdout,
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
        )?;
    }
    debug!(key_release, "terminal ready");

    let terminal = Terminal::new(CrosstermBackend::new(stdout))?;
    Ok(TerminalSession {
        terminal,
        key_release,
    })
}

pub fn restore_terminal(mut session: TerminalSession) -> Result<()> {
    if session.key_release {
        execute!(session.terminal.backend_mut(), PopKeyboardEnhancementFlags)?;
    }
    execute!(
        session.terminal.backend_mut(),
        DisableMouseCapture,
        LeaveAlternateScreen
    )?;
    disable_raw_mode()?;
    session.terminal.show_cursor()?;
    Ok(())
}

/// Restore the terminal before the default panic output
pub fn install_panic_hook() {
    let original_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(
            io::stdout(),
            PopKeyboardEnhancementFlags,
            DisableMouseCapture,
            LeaveAlternateScreen
        );

        original_hook(panic_info);
    }));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_hook_installs() {
        install_panic_hook();
    }
}
