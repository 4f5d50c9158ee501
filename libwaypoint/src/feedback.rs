//! Tactile and cosmetic feedback
//!
//! Stages never talk to a vibration motor or a particle field directly. They
//! go through [`Feedback`], which drops requests the session settings have
//! switched off.

use std::fmt;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::state::{StateKey, Store};

/// Vibration patterns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pulse {
    Light,
    Medium,
    Heavy,
    Success,
    Error,
    Warning,
    Lock,
    Ping,
}

impl Pulse {
    /// Alternating on/off durations in milliseconds
    pub fn pattern(&self) -> &'static [u64] {
        match self {
            Pulse::Light => &[10],
            Pulse::Medium => &[25],
            Pulse::Heavy => &[50],
            Pulse::Success => &[50, 50, 50, 50, 100],
            Pulse::Error => &[100, 50, 100, 50, 100],
            Pulse::Warning => &[30, 30, 30],
            Pulse::Lock => &[20, 20, 40],
            Pulse::Ping => &[15, 30, 15],
        }
    }
}

/// Fire-and-forget tactile output
pub trait Haptics {
    fn pulse(&self, pulse: Pulse);
}

/// Decorative particle field behind the screens
pub trait Backdrop {
    fn init(&mut self, container: &str);
    fn burst(&mut self);
    fn destroy(&mut self);
}

/// Haptics that only log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingHaptics;

impl Haptics for TracingHaptics {
    fn pulse(&self, pulse: Pulse) {
        trace!(?pulse, pattern = ?pulse.pattern(), "haptic pulse");
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoBackdrop;

impl Backdrop for NoBackdrop {
    fn init(&mut self, _container: &str) {}
    fn burst(&mut self) {}
    fn destroy(&mut self) {}
}

/// Haptics that remember every pulse, for tests
#[derive(Debug, Default, Clone)]
pub struct RecordingHaptics {
    pub pulses: Arc<Mutex<Vec<Pulse>>>,
}

impl RecordingHaptics {
    pub fn recorded(&self) -> Vec<Pulse> {
        self.pulses.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

impl Haptics for RecordingHaptics {
    fn pulse(&self, pulse: Pulse) {
        if let Ok(mut pulses) = self.pulses.lock() {
            pulses.push(pulse);
        }
    }
}

/// Backdrop that counts calls, for tests
#[derive(Debug, Default, Clone)]
pub struct RecordingBackdrop {
    pub containers: Arc<Mutex<Vec<String>>>,
    pub bursts: Arc<Mutex<usize>>,
    pub destroyed: Arc<Mutex<bool>>,
}

impl RecordingBackdrop {
    pub fn burst_count(&self) -> usize {
        self.bursts.lock().map(|b| *b).unwrap_or(0)
    }
}

impl Backdrop for RecordingBackdrop {
    fn init(&mut self, container: &str) {
        if let Ok(mut containers) = self.containers.lock() {
            containers.push(container.to_string());
        }
    }

    fn burst(&mut self) {
        if let Ok(mut bursts) = self.bursts.lock() {
            *bursts += 1;
        }
    }

    fn destroy(&mut self) {
        if let Ok(mut destroyed) = self.destroyed.lock() {
            *destroyed = true;
        }
    }
}

pub const BACKDROP_CONTAINER: &str = "particles-container";

pub struct Feedback {
    store: Rc<Store>,
    haptics: Box<dyn Haptics>,
    backdrop: Box<dyn Backdrop>,
    backdrop_ready: bool,
}

impl Feedback {
    pub fn new(store: Rc<Store>, haptics: Box<dyn Haptics>, backdrop: Box<dyn Backdrop>) -> Self {
        Self {
            store,
            haptics,
            backdrop,
            backdrop_ready: false,
        }
    }

    /// Feedback that only logs
    pub fn silent(store: Rc<Store>) -> Self {
        Self::new(store, Box::new(TracingHaptics), Box::new(NoBackdrop))
    }

    pub fn pulse(&self, pulse: Pulse) {
        if self.store.flag(StateKey::VibrationEnabled) {
            self.haptics.pulse(pulse);
        }
    }

    pub fn init_backdrop(&mut self) {
        if self.backdrop_ready || !self.store.flag(StateKey::ParticlesEnabled) {
            return;
        }
        self.backdrop.init(BACKDROP_CONTAINER);
        self.backdrop_ready = true;
    }

    pub fn burst(&mut self) {
        if self.backdrop_ready && self.store.flag(StateKey::ParticlesEnabled) {
            self.backdrop.burst();
        }
    }

    pub fn destroy_backdrop(&mut self) {
        if self.backdrop_ready {
            self.backdrop.destroy();
            self.backdrop_ready = false;
        }
    }
}

impl fmt::Debug for Feedback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Feedback")
            .field("backdrop_ready", &self.backdrop_ready)
            .finish_non_exhaustive()
    }
}
