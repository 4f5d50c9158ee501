//! Event handling
//!
//! Terminal events are read on a background thread and merged with a fixed
//! tick over crossbeam channels, so the session clock keeps moving while the
//! user types or drags.

use std::thread;
use std::time::Duration;

use crossbeam_channel::{select, tick, unbounded, Receiver};
use crossterm::event::{self, Event as CrosstermEvent, KeyEvent, MouseEvent};
use tracing::debug;

use crate::app::Action;
use crate::error::{Result, TuiError};

#[derive(Debug, Clone, PartialEq)]
pub enum TuiEvent {
    Key(KeyEvent),

    Mouse(MouseEvent),

    Resize(u16, u16),

    /// Periodic tick for animations and timers
    Tick,
}

impl From<TuiEvent> for Action {
    fn from(event: TuiEvent) -> Self {
        match event {
            TuiEvent::Key(key) => Action::Key(key),
            TuiEvent::Mouse(mouse) => Action::Mouse(mouse),
            TuiEvent::Resize(w, h) => Action::Resize(w, h),
            TuiEvent::Tick => Action::Tick,
        }
    }
}

fn convert(event: CrosstermEvent) -> Option<TuiEvent> {
    match event {
        CrosstermEvent::Key(key) => Some(TuiEvent::Key(key)),
        CrosstermEvent::Mouse(mouse) => Some(TuiEvent::Mouse(mouse)),
        CrosstermEvent::Resize(w, h) => Some(TuiEvent::Resize(w, h)),
        _ => None,
    }
}

pub struct EventHandler {
    tick_rate: Duration,
    events: Receiver<TuiEvent>,
    ticker: Receiver<std::time::Instant>,
}

impl EventHandler {
    /// Start reading terminal events; ticks arrive every `tick_rate_ms`
    pub fn new(tick_rate_ms: u64) -> Self {
        let tick_rate = Duration::from_millis(tick_rate_ms);
        let (tx, events) = unbounded();

        let spawned = thread::Builder::new()
            .name("waypoint-input".to_string())
            .spawn(move || loop {
                match event::read() {
                    Ok(event) => {
                        if let Some(event) = convert(event) {
                            if tx.send(event).is_err() {
                                break;
                            }
                        }
                    }
                    Err(e) => {
                        debug!(error = %e, "terminal event source stopped");
                        break;
                    }
                }
            });
        if let Err(e) = spawned {
            debug!(error = %e, "failed to spawn input thread");
        }

        Self {
            tick_rate,
            events,
            ticker: tick(tick_rate),
        }
    }

    pub fn tick_rate(&self) -> Duration {
        self.tick_rate
    }

    /// Block until the next terminal event or tick
    pub fn next(&self) -> Result<TuiEvent> {
        select! {
            recv(self.events) -> event => {
                event.map_err(|_| TuiError::Event("terminal event source closed".to_string()))
            }
            recv(self.ticker) -> _ => Ok(TuiEvent::Tick),
        }
    }
}
