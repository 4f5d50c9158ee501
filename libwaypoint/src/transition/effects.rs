//! Reusable effect timelines
//!
//! Builders here only describe motion. The orchestrator checks that targets
//! are mounted and schedules the result.

use std::rc::Rc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::ease::Ease;
use super::scene::{anchors, ElementId, Prop};
use super::timeline::{At, CounterFormat, Timeline, TweenSpec};

/// Entry/exit motion shapes for [`animate_in`] and [`animate_out`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    #[default]
    FadeUp,
    FadeDown,
    FadeLeft,
    FadeRight,
    Scale,
    Pop,
}

impl Preset {
    /// Offset an element enters from
    fn entry_from(&self) -> (Prop, f64) {
        match self {
            Preset::FadeUp => (Prop::Y, 30.0),
            Preset::FadeDown => (Prop::Y, -30.0),
            Preset::FadeLeft => (Prop::X, 30.0),
            Preset::FadeRight => (Prop::X, -30.0),
            Preset::Scale => (Prop::Scale, 0.8),
            Preset::Pop => (Prop::Scale, 0.0),
        }
    }

    /// Offset an element leaves towards
    fn exit_to(&self) -> (Prop, f64) {
        match self {
            Preset::FadeUp => (Prop::Y, -30.0),
            Preset::FadeDown => (Prop::Y, 30.0),
            Preset::FadeLeft => (Prop::X, -30.0),
            Preset::FadeRight => (Prop::X, 30.0),
            Preset::Scale | Preset::Pop => (Prop::Scale, 0.8),
        }
    }

    fn entry_ease(&self) -> Ease {
        match self {
            Preset::Pop => Ease::BackOut(1.7),
            _ => Ease::Power2Out,
        }
    }
}

fn rest(prop: Prop) -> f64 {
    match prop {
        Prop::Scale | Prop::Opacity => 1.0,
        _ => 0.0,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnimateOptions {
    pub preset: Preset,
    pub duration: Duration,
    pub delay: Duration,
    /// Offset between consecutive elements
    pub stagger: Duration,
}

impl AnimateOptions {
    pub fn entry() -> Self {
        Self {
            preset: Preset::FadeUp,
            duration: Duration::from_millis(500),
            delay: Duration::ZERO,
            stagger: Duration::from_millis(100),
        }
    }

    pub fn exit() -> Self {
        Self {
            duration: Duration::from_millis(300),
            stagger: Duration::ZERO,
            ..Self::entry()
        }
    }

    pub fn preset(mut self, preset: Preset) -> Self {
        self.preset = preset;
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

pub fn animate_in(elements: &[ElementId], options: &AnimateOptions) -> Timeline {
    let (prop, from) = options.preset.entry_from();
    let ease = options.preset.entry_ease();
    let mut timeline = Timeline::new();
    for (i, id) in elements.iter().enumerate() {
        let start = options.delay + options.stagger * i as u32;
        timeline.group(
            [
                TweenSpec::from_to(id.clone(), Prop::Opacity, 0.0, 1.0, options.duration)
                    .ease(ease),
                TweenSpec::from_to(id.clone(), prop, from, rest(prop), options.duration)
                    .ease(ease),
            ],
            At::Time(start),
        );
    }
    timeline
}

pub fn animate_out(elements: &[ElementId], options: &AnimateOptions) -> Timeline {
    let (prop, to) = options.preset.exit_to();
    let mut timeline = Timeline::new();
    for (i, id) in elements.iter().enumerate() {
        let start = options.delay + options.stagger * i as u32;
        timeline.group(
            [
                TweenSpec::to(id.clone(), Prop::Opacity, 0.0, options.duration)
                    .ease(Ease::Power2In),
                TweenSpec::to(id.clone(), prop, to, options.duration).ease(Ease::Power2In),
            ],
            At::Time(start),
        );
    }
    timeline
}

#[derive(Debug, Clone, PartialEq)]
pub struct PulseOptions {
    pub scale: f64,
    /// Length of one leg (out or back)
    pub duration: Duration,
    /// Additional out-and-back cycles after the first
    pub repeat: u32,
}

impl Default for PulseOptions {
    fn default() -> Self {
        Self {
            scale: 1.1,
            duration: Duration::from_millis(300),
            repeat: 0,
        }
    }
}

pub fn pulse(element: &ElementId, options: &PulseOptions) -> Timeline {
    let mut timeline = Timeline::new();
    timeline.tween(
        TweenSpec::to(element.clone(), Prop::Scale, options.scale, options.duration)
            .ease(Ease::Power2InOut)
            .yoyo(options.repeat * 2 + 1),
        At::End,
    );
    timeline
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShakeOptions {
    pub intensity: f64,
    pub duration: Duration,
}

impl Default for ShakeOptions {
    fn default() -> Self {
        Self {
            intensity: 5.0,
            duration: Duration::from_millis(500),
        }
    }
}

const SHAKE_LEGS: u32 = 10;

/// Oscillate on x, then put x back to rest, also when cancelled
pub fn shake(element: &ElementId, options: &ShakeOptions) -> Timeline {
    let mut timeline = Timeline::new();
    timeline
        .tween(
            TweenSpec::to(
                element.clone(),
                Prop::X,
                options.intensity,
                options.duration / SHAKE_LEGS,
            )
            .ease(Ease::Power2InOut)
            .yoyo(SHAKE_LEGS - 1),
            At::End,
        )
        .restore(element.clone(), Prop::X, 0.0, At::End);
    timeline
}

#[derive(Debug, Clone, PartialEq)]
pub struct GlowOptions {
    pub color: String,
    /// Length of one leg
    pub duration: Duration,
    /// Full on-off cycles
    pub cycles: u32,
}

impl Default for GlowOptions {
    fn default() -> Self {
        Self {
            color: "cyan".to_string(),
            duration: Duration::from_millis(1000),
            cycles: 1,
        }
    }
}

pub fn glow_pulse(element: &ElementId, options: &GlowOptions) -> Timeline {
    let mut timeline = Timeline::new();
    let legs = options.cycles.max(1) * 2;
    timeline.tween(
        TweenSpec::from_to(element.clone(), Prop::Glow, 0.0, 1.0, options.duration)
            .ease(Ease::Power2InOut)
            .yoyo(legs - 1),
        At::End,
    );
    timeline
}

pub const FLASH_RISE: Duration = Duration::from_millis(100);

/// Flash overlay up in [`FLASH_RISE`], then down over the rest of `duration`
pub fn flash(duration: Duration) -> Timeline {
    let overlay = ElementId::from(anchors::FLASH_OVERLAY);
    let mut timeline = Timeline::new();
    timeline
        .tween(
            TweenSpec::to(overlay.clone(), Prop::Opacity, 1.0, FLASH_RISE),
            At::End,
        )
        .tween(
            TweenSpec::to(overlay, Prop::Opacity, 0.0, duration.saturating_sub(FLASH_RISE)),
            At::End,
        );
    timeline
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypewriterOptions {
    /// Time per character
    pub speed: Duration,
    pub delay: Duration,
}

impl Default for TypewriterOptions {
    fn default() -> Self {
        Self {
            speed: Duration::from_millis(50),
            delay: Duration::ZERO,
        }
    }
}

pub fn typewriter(element: &ElementId, text: &str, options: &TypewriterOptions) -> Timeline {
    let mut timeline = Timeline::new();
    timeline.reveal(element.clone(), text, options.speed, At::Time(options.delay));
    timeline
}

#[derive(Clone)]
pub struct CountOptions {
    pub duration: Duration,
    pub format: CounterFormat,
}

impl Default for CountOptions {
    fn default() -> Self {
        Self {
            duration: Duration::from_millis(1000),
            format: Rc::new(|value| format!("{}", value.round())),
        }
    }
}

impl std::fmt::Debug for CountOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CountOptions")
            .field("duration", &self.duration)
            .finish_non_exhaustive()
    }
}

pub fn count_to(element: &ElementId, start: f64, end: f64, options: &CountOptions) -> Timeline {
    let mut timeline = Timeline::new();
    timeline.counter(
        element.clone(),
        start,
        end,
        options.duration,
        Ease::Power2Out,
        Rc::clone(&options.format),
        At::End,
    );
    timeline
}
