//! Animated screen hand-offs and effects
//!
//! Time never comes from a wall clock here: callers pass the elapsed session
//! time to [`Orchestrator::advance`].

pub mod ease;
pub mod effects;
pub mod orchestrator;
pub mod profile;
pub mod scene;
pub mod timeline;

pub use ease::Ease;
pub use effects::{
    AnimateOptions, CountOptions, GlowOptions, Preset, PulseOptions, ShakeOptions,
    TypewriterOptions,
};
pub use orchestrator::{Callback, EffectId, Orchestrator, TransitionOptions};
pub use profile::{Direction, TransitionProfile, DEFAULT_DURATION};
pub use scene::{anchors, Element, ElementId, Prop, Scene, Surface, Target, Visual};
pub use timeline::{At, SetChange, Timeline, TweenSpec};
