//! Timelines: ordered animation steps sampled against elapsed time
//!
//! A timeline is built once, bound to the scene when it starts playing, and
//! then sampled with the time elapsed since it started. Each step applies its
//! final value exactly once when its window closes, so a later step on the
//! same property always wins.

use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use super::ease::Ease;
use super::scene::{Prop, Scene, Target};

/// Where a step starts relative to what is already on the timeline
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum At {
    /// When the previous steps end
    End,
    /// This long before the previous steps end
    Overlap(Duration),
    /// At an absolute offset from the timeline start
    Time(Duration),
}

/// One property animation
#[derive(Debug, Clone, PartialEq)]
pub struct TweenSpec {
    pub target: Target,
    pub prop: Prop,
    /// Start value; `None` takes the value found when the tween starts
    pub from: Option<f64>,
    pub to: f64,
    pub duration: Duration,
    pub ease: Ease,
    /// Extra cycles after the first
    pub repeat: u32,
    /// Alternate direction on every cycle
    pub yoyo: bool,
}

impl TweenSpec {
    pub fn to(target: impl Into<Target>, prop: Prop, to: f64, duration: Duration) -> Self {
        Self {
            target: target.into(),
            prop,
            from: None,
            to,
            duration,
            ease: Ease::Power2Out,
            repeat: 0,
            yoyo: false,
        }
    }

    pub fn from_to(
        target: impl Into<Target>,
        prop: Prop,
        from: f64,
        to: f64,
        duration: Duration,
    ) -> Self {
        Self {
            from: Some(from),
            ..Self::to(target, prop, to, duration)
        }
    }

    pub fn ease(mut self, ease: Ease) -> Self {
        self.ease = ease;
        self
    }

    pub fn yoyo(mut self, repeat: u32) -> Self {
        self.repeat = repeat;
        self.yoyo = true;
        self
    }

    fn span(&self) -> Duration {
        self.duration * (self.repeat + 1)
    }
}

/// Instantaneous assignment
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SetChange {
    Prop(Prop, f64),
    Visible(bool),
}

pub type CounterFormat = Rc<dyn Fn(f64) -> String>;

enum Step {
    Tween {
        spec: TweenSpec,
        start: Duration,
        resolved_from: Option<f64>,
        done: bool,
    },
    Set {
        target: Target,
        change: SetChange,
        at: Duration,
        done: bool,
    },
    /// A set that also lands when the timeline is cancelled
    Restore {
        target: Target,
        prop: Prop,
        value: f64,
        at: Duration,
        done: bool,
    },
    Reveal {
        target: Target,
        text: Vec<char>,
        start: Duration,
        interval: Duration,
        shown: usize,
        done: bool,
    },
    Counter {
        target: Target,
        from: f64,
        to: f64,
        start: Duration,
        duration: Duration,
        ease: Ease,
        format: CounterFormat,
        done: bool,
    },
}

impl Step {
    fn end(&self) -> Duration {
        match self {
            Step::Tween { spec, start, .. } => *start + spec.span(),
            Step::Set { at, .. } | Step::Restore { at, .. } => *at,
            Step::Reveal {
                start,
                interval,
                text,
                ..
            } => *start + *interval * text.len() as u32,
            Step::Counter {
                start, duration, ..
            } => *start + *duration,
        }
    }

    fn target(&self) -> &Target {
        match self {
            Step::Tween { spec, .. } => &spec.target,
            Step::Set { target, .. }
            | Step::Restore { target, .. }
            | Step::Reveal { target, .. }
            | Step::Counter { target, .. } => target,
        }
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Tween { spec, start, .. } => f
                .debug_struct("Tween")
                .field("spec", spec)
                .field("start", start)
                .finish(),
            Step::Set {
                target, change, at, ..
            } => f
                .debug_struct("Set")
                .field("target", target)
                .field("change", change)
                .field("at", at)
                .finish(),
            Step::Restore {
                target,
                prop,
                value,
                at,
                ..
            } => f
                .debug_struct("Restore")
                .field("target", target)
                .field("prop", prop)
                .field("value", value)
                .field("at", at)
                .finish(),
            Step::Reveal {
                target,
                text,
                start,
                interval,
                ..
            } => f
                .debug_struct("Reveal")
                .field("target", target)
                .field("chars", &text.len())
                .field("start", start)
                .field("interval", interval)
                .finish(),
            Step::Counter {
                target,
                from,
                to,
                start,
                duration,
                ..
            } => f
                .debug_struct("Counter")
                .field("target", target)
                .field("from", from)
                .field("to", to)
                .field("start", start)
                .field("duration", duration)
                .finish(),
        }
    }
}

#[derive(Debug, Default)]
pub struct Timeline {
    steps: Vec<Step>,
    cursor: Duration,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time at which the last step settles
    pub fn duration(&self) -> Duration {
        self.steps
            .iter()
            .map(Step::end)
            .max()
            .unwrap_or(Duration::ZERO)
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Every target a step writes to
    pub fn targets(&self) -> Vec<&Target> {
        let mut targets: Vec<&Target> = Vec::new();
        for step in &self.steps {
            let target = step.target();
            if !targets.contains(&target) {
                targets.push(target);
            }
        }
        targets
    }

    fn resolve(&self, at: At) -> Duration {
        match at {
            At::End => self.cursor,
            At::Overlap(by) => self.cursor.saturating_sub(by),
            At::Time(t) => t,
        }
    }

    fn push(&mut self, step: Step) {
        self.cursor = self.cursor.max(step.end());
        self.steps.push(step);
    }

    /// Add tweens that all start together
    pub fn group(&mut self, specs: impl IntoIterator<Item = TweenSpec>, at: At) -> &mut Self {
        let start = self.resolve(at);
        for spec in specs {
            self.push(Step::Tween {
                spec,
                start,
                resolved_from: None,
                done: false,
            });
        }
        self
    }

    pub fn tween(&mut self, spec: TweenSpec, at: At) -> &mut Self {
        self.group([spec], at)
    }

    pub fn set(&mut self, target: impl Into<Target>, change: SetChange, at: At) -> &mut Self {
        let at = self.resolve(at);
        self.push(Step::Set {
            target: target.into(),
            change,
            at,
            done: false,
        });
        self
    }

    /// Put `prop` to its resting `value` at `at`, or as soon as the
    /// timeline is cancelled
    pub fn restore(
        &mut self,
        target: impl Into<Target>,
        prop: Prop,
        value: f64,
        at: At,
    ) -> &mut Self {
        let at = self.resolve(at);
        self.push(Step::Restore {
            target: target.into(),
            prop,
            value,
            at,
            done: false,
        });
        self
    }

    /// Reveal `text` one character per `interval` into an element's text
    pub fn reveal(
        &mut self,
        target: impl Into<Target>,
        text: &str,
        interval: Duration,
        at: At,
    ) -> &mut Self {
        let start = self.resolve(at);
        self.push(Step::Reveal {
            target: target.into(),
            text: text.chars().collect(),
            start,
            interval,
            shown: 0,
            done: false,
        });
        self
    }

    #[allow(clippy::too_many_arguments)]
    pub fn counter(
        &mut self,
        target: impl Into<Target>,
        from: f64,
        to: f64,
        duration: Duration,
        ease: Ease,
        format: CounterFormat,
        at: At,
    ) -> &mut Self {
        let start = self.resolve(at);
        self.push(Step::Counter {
            target: target.into(),
            from,
            to,
            start,
            duration,
            ease,
            format,
            done: false,
        });
        self
    }

    /// Render start states; call once before sampling
    pub fn bind(&mut self, scene: &mut Scene) {
        for step in &mut self.steps {
            match step {
                Step::Tween {
                    spec: TweenSpec {
                        target,
                        prop,
                        from: Some(from),
                        ..
                    },
                    ..
                } => {
                    if let Some(visual) = scene.visual_mut(target) {
                        visual.set(*prop, *from);
                    }
                }
                Step::Reveal { target, .. } => write_text(scene, target, String::new()),
                _ => {}
            }
        }
    }

    /// Apply every step at `elapsed`
    pub fn sample(&mut self, elapsed: Duration, scene: &mut Scene) {
        for step in &mut self.steps {
            sample_step(step, elapsed, scene);
        }
    }

    pub fn is_complete(&self, elapsed: Duration) -> bool {
        elapsed >= self.duration()
    }

    /// Apply every restore that has not landed yet
    pub fn settle_restores(&mut self, scene: &mut Scene) {
        for step in &mut self.steps {
            if let Step::Restore {
                target,
                prop,
                value,
                done,
                ..
            } = step
            {
                if !*done {
                    *done = true;
                    if let Some(visual) = scene.visual_mut(target) {
                        visual.set(*prop, *value);
                    }
                }
            }
        }
    }
}

fn write_text(scene: &mut Scene, target: &Target, text: String) {
    if let Target::Element(id) = target {
        if let Some(element) = scene.element_mut(id) {
            element.text = text;
        }
    }
}

fn sample_step(step: &mut Step, elapsed: Duration, scene: &mut Scene) {
    match step {
        Step::Tween {
            spec,
            start,
            resolved_from,
            done,
        } => {
            if *done || elapsed < *start {
                return;
            }
            let Some(visual) = scene.visual_mut(&spec.target) else {
                *done = true;
                return;
            };
            let from = *resolved_from.get_or_insert_with(|| {
                spec.from.unwrap_or_else(|| visual.get(spec.prop))
            });

            let local = elapsed - *start;
            let span = spec.span();
            let cycles = spec.repeat + 1;
            let (cycle, t) = if local >= span || spec.duration.is_zero() {
                *done = true;
                (cycles - 1, 1.0)
            } else {
                let dur = spec.duration.as_secs_f64();
                let position = local.as_secs_f64() / dur;
                let cycle = (position.floor() as u32).min(cycles - 1);
                (cycle, position - cycle as f64)
            };
            let t = if spec.yoyo && cycle % 2 == 1 { 1.0 - t } else { t };
            visual.set(spec.prop, from + (spec.to - from) * spec.ease.apply(t));
        }
        Step::Set {
            target,
            change,
            at,
            done,
        } => {
            if *done || elapsed < *at {
                return;
            }
            *done = true;
            if let Some(visual) = scene.visual_mut(target) {
                match *change {
                    SetChange::Prop(prop, value) => visual.set(prop, value),
                    SetChange::Visible(visible) => visual.visible = visible,
                }
            }
        }
        Step::Restore {
            target,
            prop,
            value,
            at,
            done,
        } => {
            if *done || elapsed < *at {
                return;
            }
            *done = true;
            if let Some(visual) = scene.visual_mut(target) {
                visual.set(*prop, *value);
            }
        }
        Step::Reveal {
            target,
            text,
            start,
            interval,
            shown,
            done,
        } => {
            if *done || elapsed < *start {
                return;
            }
            let local = elapsed - *start;
            let count = if interval.is_zero() {
                text.len()
            } else {
                ((local.as_millis() / interval.as_millis().max(1)) as usize).min(text.len())
            };
            if count != *shown {
                *shown = count;
                write_text(scene, target, text[..count].iter().collect());
            }
            *done = count == text.len();
        }
        Step::Counter {
            target,
            from,
            to,
            start,
            duration,
            ease,
            format,
            done,
        } => {
            if *done || elapsed < *start {
                return;
            }
            let local = elapsed - *start;
            let t = if duration.is_zero() || local >= *duration {
                *done = true;
                1.0
            } else {
                local.as_secs_f64() / duration.as_secs_f64()
            };
            let value = *from + (*to - *from) * ease.apply(t);
            write_text(scene, target, format(value));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ScreenId;
    use crate::transition::scene::ElementId;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn element(id: &str) -> Target {
        Target::Element(ElementId::from(id))
    }

    fn scene_with(id: &str) -> Scene {
        let mut scene = Scene::new();
        scene.mount_element(id);
        scene
    }

    #[test]
    fn test_sequential_steps_extend_duration() {
        let mut tl = Timeline::new();
        tl.tween(TweenSpec::to(element("a"), Prop::X, 10.0, ms(100)), At::End)
            .tween(TweenSpec::to(element("a"), Prop::Y, 10.0, ms(200)), At::End);
        assert_eq!(tl.duration(), ms(300));
    }

    #[test]
    fn test_overlap_pulls_start_back() {
        let mut tl = Timeline::new();
        tl.tween(TweenSpec::to(element("a"), Prop::X, 10.0, ms(600)), At::End)
            .tween(TweenSpec::to(element("b"), Prop::X, 10.0, ms(600)), At::Overlap(ms(300)));
        assert_eq!(tl.duration(), ms(900));
    }

    #[test]
    fn test_tween_reaches_target_value() {
        let mut scene = scene_with("a");
        let mut tl = Timeline::new();
        tl.tween(
            TweenSpec::to(element("a"), Prop::X, 40.0, ms(100)).ease(Ease::Linear),
            At::End,
        );
        tl.bind(&mut scene);

        tl.sample(ms(50), &mut scene);
        assert_eq!(scene.visual(&element("a")).unwrap().x, 20.0);

        tl.sample(ms(500), &mut scene);
        assert_eq!(scene.visual(&element("a")).unwrap().x, 40.0);
        assert!(tl.is_complete(ms(500)));
    }

    #[test]
    fn test_from_to_renders_start_on_bind() {
        let mut scene = scene_with("a");
        let mut tl = Timeline::new();
        tl.tween(
            TweenSpec::from_to(element("a"), Prop::Opacity, 0.0, 1.0, ms(100)),
            At::Time(ms(500)),
        );
        tl.bind(&mut scene);
        assert_eq!(scene.visual(&element("a")).unwrap().opacity, 0.0);
    }

    #[test]
    fn test_yoyo_with_odd_repeat_returns_to_start() {
        let mut scene = scene_with("a");
        let mut tl = Timeline::new();
        tl.tween(
            TweenSpec::to(element("a"), Prop::Scale, 1.1, ms(300)).yoyo(1),
            At::End,
        );
        tl.bind(&mut scene);
        tl.sample(ms(300), &mut scene);
        assert!((scene.visual(&element("a")).unwrap().scale - 1.1).abs() < 1e-9);
        tl.sample(ms(600), &mut scene);
        assert!((scene.visual(&element("a")).unwrap().scale - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_set_after_tween_is_not_overwritten() {
        let mut scene = scene_with("a");
        let mut tl = Timeline::new();
        tl.tween(TweenSpec::to(element("a"), Prop::X, -10.0, ms(50)), At::End)
            .set(element("a"), SetChange::Prop(Prop::X, 0.0), At::End);
        tl.bind(&mut scene);
        tl.sample(ms(60), &mut scene);
        tl.sample(ms(70), &mut scene);
        assert_eq!(scene.visual(&element("a")).unwrap().x, 0.0);
    }

    #[test]
    fn test_restore_lands_on_resting_value() {
        let mut scene = scene_with("a");
        scene.visual_mut(&element("a")).unwrap().x = 7.0;
        let mut tl = Timeline::new();
        tl.tween(TweenSpec::to(element("a"), Prop::X, 12.0, ms(50)), At::End)
            .restore(element("a"), Prop::X, 0.0, At::End);
        tl.bind(&mut scene);
        tl.sample(ms(100), &mut scene);
        assert_eq!(scene.visual(&element("a")).unwrap().x, 0.0);
    }

    #[test]
    fn test_settle_restores_applies_pending_only() {
        let mut scene = scene_with("a");
        let mut tl = Timeline::new();
        tl.tween(TweenSpec::to(element("a"), Prop::X, 12.0, ms(50)), At::End)
            .restore(element("a"), Prop::X, 0.0, At::End);
        tl.bind(&mut scene);
        tl.sample(ms(25), &mut scene);
        assert!(scene.visual(&element("a")).unwrap().x > 0.0);

        tl.settle_restores(&mut scene);
        assert_eq!(scene.visual(&element("a")).unwrap().x, 0.0);

        // Already landed; a later write is left alone
        scene.visual_mut(&element("a")).unwrap().x = 3.0;
        tl.settle_restores(&mut scene);
        assert_eq!(scene.visual(&element("a")).unwrap().x, 3.0);
    }

    #[test]
    fn test_reveal_writes_prefixes() {
        let mut scene = scene_with("a");
        scene.element_mut(&"a".into()).unwrap().text = "old".into();
        let mut tl = Timeline::new();
        tl.reveal(element("a"), "héllo", ms(50), At::Time(ms(100)));
        tl.bind(&mut scene);
        assert_eq!(scene.element(&"a".into()).unwrap().text, "");

        tl.sample(ms(199), &mut scene);
        assert_eq!(scene.element(&"a".into()).unwrap().text, "h");
        tl.sample(ms(200), &mut scene);
        assert_eq!(scene.element(&"a".into()).unwrap().text, "hé");
        tl.sample(ms(400), &mut scene);
        assert_eq!(scene.element(&"a".into()).unwrap().text, "héllo");
        assert_eq!(tl.duration(), ms(350));
    }

    #[test]
    fn test_counter_formats_each_frame() {
        let mut scene = scene_with("a");
        let mut tl = Timeline::new();
        tl.counter(
            element("a"),
            0.0,
            100.0,
            ms(100),
            Ease::Linear,
            Rc::new(|v| format!("{}%", v.round())),
            At::End,
        );
        tl.bind(&mut scene);
        tl.sample(ms(50), &mut scene);
        assert_eq!(scene.element(&"a".into()).unwrap().text, "50%");
        tl.sample(ms(100), &mut scene);
        assert_eq!(scene.element(&"a".into()).unwrap().text, "100%");
    }

    #[test]
    fn test_missing_target_is_skipped() {
        let mut scene = Scene::new();
        let mut tl = Timeline::new();
        tl.tween(
            TweenSpec::to(Target::Surface(ScreenId::Scan), Prop::X, 1.0, ms(10)),
            At::End,
        );
        tl.bind(&mut scene);
        tl.sample(ms(20), &mut scene);
        assert!(tl.is_complete(ms(20)));
    }
}
