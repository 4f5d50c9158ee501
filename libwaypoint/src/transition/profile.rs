//! Screen hand-off profiles
//!
//! Each [`Direction`] maps to a declarative [`TransitionProfile`]: a list of
//! exit legs played on the outgoing surface, assignments applied once it is
//! gone, and one entry leg on the incoming surface that starts `overlap`
//! before the exit ends.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::ease::Ease;
use super::scene::Prop;
use super::timeline::{At, SetChange, Timeline, TweenSpec};
use crate::state::ScreenId;

pub const DEFAULT_DURATION: Duration = Duration::from_millis(600);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Left,
    Right,
    Up,
    Down,
    Fade,
    Zoom,
    Glitch,
}

impl Direction {
    pub const ALL: [Direction; 7] = [
        Direction::Left,
        Direction::Right,
        Direction::Up,
        Direction::Down,
        Direction::Fade,
        Direction::Zoom,
        Direction::Glitch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Left => "left",
            Direction::Right => "right",
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Fade => "fade",
            Direction::Zoom => "zoom",
            Direction::Glitch => "glitch",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase();
        Direction::ALL
            .into_iter()
            .find(|d| d.as_str() == name)
            .ok_or_else(|| format!("unknown transition direction '{}'", s))
    }
}

/// One property change within a leg
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Motion {
    pub prop: Prop,
    pub from: Option<f64>,
    pub to: f64,
}

impl Motion {
    fn to(prop: Prop, to: f64) -> Self {
        Self {
            prop,
            from: None,
            to,
        }
    }

    fn from_to(prop: Prop, from: f64, to: f64) -> Self {
        Self {
            prop,
            from: Some(from),
            to,
        }
    }
}

/// Length of a leg
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Span {
    /// Fraction of the requested duration
    Scaled(f64),
    Fixed(Duration),
}

impl Span {
    fn resolve(&self, requested: Duration) -> Duration {
        match *self {
            Span::Scaled(factor) => requested.mul_f64(factor),
            Span::Fixed(fixed) => fixed,
        }
    }
}

/// Motions that run together
#[derive(Debug, Clone, PartialEq)]
pub struct Leg {
    pub motions: Vec<Motion>,
    pub span: Span,
    pub ease: Ease,
}

impl Leg {
    fn new(motions: Vec<Motion>, span: Span, ease: Ease) -> Self {
        Self {
            motions,
            span,
            ease,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransitionProfile {
    pub exit: Vec<Leg>,
    pub after_exit: Vec<SetChange>,
    pub enter: Leg,
    pub overlap: Duration,
}

impl TransitionProfile {
    pub fn for_direction(direction: Direction) -> Self {
        match direction {
            Direction::Left => Self::slide(Prop::X, -100.0),
            Direction::Right => Self::slide(Prop::X, 100.0),
            Direction::Up => Self::slide(Prop::Y, -100.0),
            Direction::Down => Self::slide(Prop::Y, 100.0),
            Direction::Fade => Self {
                exit: vec![Leg::new(
                    vec![Motion::to(Prop::Opacity, 0.0)],
                    Span::Scaled(0.5),
                    Ease::Power2In,
                )],
                after_exit: vec![SetChange::Visible(false)],
                enter: Leg::new(
                    vec![
                        Motion::from_to(Prop::Opacity, 0.0, 1.0),
                        Motion::from_to(Prop::Scale, 0.95, 1.0),
                    ],
                    Span::Scaled(0.5),
                    Ease::Power2Out,
                ),
                overlap: Duration::ZERO,
            },
            Direction::Zoom => Self {
                exit: vec![Leg::new(
                    vec![Motion::to(Prop::Scale, 1.2), Motion::to(Prop::Opacity, 0.0)],
                    Span::Scaled(1.0),
                    Ease::Power2In,
                )],
                after_exit: Vec::new(),
                enter: Leg::new(
                    vec![
                        Motion::from_to(Prop::Scale, 0.8, 1.0),
                        Motion::from_to(Prop::Opacity, 0.0, 1.0),
                    ],
                    Span::Scaled(1.0),
                    Ease::Power2Out,
                ),
                overlap: Duration::from_millis(200),
            },
            Direction::Glitch => Self::glitch(),
        }
    }

    /// Outgoing surface leaves along `prop` towards `offset`, incoming one
    /// arrives from the opposite side
    fn slide(prop: Prop, offset: f64) -> Self {
        Self {
            exit: vec![Leg::new(
                vec![Motion::to(prop, offset), Motion::to(Prop::Opacity, 0.0)],
                Span::Scaled(1.0),
                Ease::Power2InOut,
            )],
            after_exit: Vec::new(),
            enter: Leg::new(
                vec![
                    Motion::from_to(prop, -offset, 0.0),
                    Motion::from_to(Prop::Opacity, 0.0, 1.0),
                ],
                Span::Scaled(1.0),
                Ease::Power2Out,
            ),
            overlap: Duration::from_millis(300),
        }
    }

    fn glitch() -> Self {
        let ms = Duration::from_millis;
        Self {
            exit: vec![
                Leg::new(
                    vec![Motion::to(Prop::Opacity, 0.0)],
                    Span::Fixed(ms(100)),
                    Ease::Steps(5),
                ),
                Leg::new(
                    vec![Motion::to(Prop::Opacity, 1.0)],
                    Span::Fixed(ms(50)),
                    Ease::Linear,
                ),
                Leg::new(
                    vec![Motion::to(Prop::Opacity, 0.0), Motion::to(Prop::X, 10.0)],
                    Span::Fixed(ms(100)),
                    Ease::Linear,
                ),
                Leg::new(
                    vec![Motion::to(Prop::X, -10.0)],
                    Span::Fixed(ms(50)),
                    Ease::Linear,
                ),
            ],
            after_exit: vec![SetChange::Visible(false), SetChange::Prop(Prop::X, 0.0)],
            enter: Leg::new(
                vec![
                    Motion::from_to(Prop::Opacity, 0.0, 1.0),
                    Motion::from_to(Prop::X, -10.0, 0.0),
                ],
                Span::Fixed(ms(200)),
                Ease::Power2Out,
            ),
            overlap: Duration::ZERO,
        }
    }

    /// Interpret the profile into a timeline for one hand-off
    pub fn build(&self, from: ScreenId, to: ScreenId, duration: Duration) -> Timeline {
        let mut timeline = Timeline::new();
        for leg in &self.exit {
            timeline.group(leg_tweens(leg, from, duration), At::End);
        }
        for change in &self.after_exit {
            timeline.set(from, *change, At::End);
        }
        timeline.group(leg_tweens(&self.enter, to, duration), At::Overlap(self.overlap));
        timeline
    }
}

fn leg_tweens(leg: &Leg, screen: ScreenId, requested: Duration) -> Vec<TweenSpec> {
    let duration = leg.span.resolve(requested);
    leg.motions
        .iter()
        .map(|motion| {
            let spec = match motion.from {
                Some(from) => TweenSpec::from_to(screen, motion.prop, from, motion.to, duration),
                None => TweenSpec::to(screen, motion.prop, motion.to, duration),
            };
            spec.ease(leg.ease)
        })
        .collect()
}
