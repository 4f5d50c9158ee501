//! Transition orchestrator
//!
//! Owns the [`Scene`] and every running timeline. Screen hand-offs and
//! effects are both timelines; the difference is what happens when they
//! settle. A hand-off deactivates the outgoing surface, records the incoming
//! screen in the store and then runs its completion callback. Hand-offs
//! cannot be cancelled.

use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use tracing::{debug, warn};

use super::effects::{
    self, AnimateOptions, CountOptions, GlowOptions, PulseOptions, ShakeOptions, TypewriterOptions,
};
use super::profile::{Direction, TransitionProfile, DEFAULT_DURATION};
use super::scene::{anchors, ElementId, Scene, Target};
use super::timeline::Timeline;
use crate::error::Fault;
use crate::state::{ScreenId, StateKey, Store};

pub type Callback = Box<dyn FnOnce()>;

/// Handle to a scheduled timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EffectId(u64);

pub struct TransitionOptions {
    pub direction: Direction,
    pub duration: Duration,
    /// Runs once, after `currentScreen` has been updated
    pub on_complete: Option<Callback>,
}

impl Default for TransitionOptions {
    fn default() -> Self {
        Self {
            direction: Direction::default(),
            duration: DEFAULT_DURATION,
            on_complete: None,
        }
    }
}

impl TransitionOptions {
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            ..Self::default()
        }
    }

    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn on_complete(mut self, callback: impl FnOnce() + 'static) -> Self {
        self.on_complete = Some(Box::new(callback));
        self
    }
}

impl fmt::Debug for TransitionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransitionOptions")
            .field("direction", &self.direction)
            .field("duration", &self.duration)
            .field("on_complete", &self.on_complete.is_some())
            .finish()
    }
}

struct Running {
    id: EffectId,
    timeline: Timeline,
    started_at: Duration,
    handoff: Option<(ScreenId, ScreenId)>,
    on_complete: Option<Callback>,
}

pub struct Orchestrator {
    store: Rc<Store>,
    scene: Scene,
    running: Vec<Running>,
    next_id: u64,
    now: Duration,
}

impl Orchestrator {
    pub fn new(store: Rc<Store>, scene: Scene) -> Self {
        Self {
            store,
            scene,
            running: Vec::new(),
            next_id: 0,
            now: Duration::ZERO,
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn store(&self) -> &Rc<Store> {
        &self.store
    }

    /// Time of the last [`advance`](Self::advance)
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Animate from one screen to another.
    ///
    /// Both surfaces must be mounted; otherwise nothing changes and
    /// [`Fault::MissingAnchor`] is returned.
    pub fn goto(
        &mut self,
        from: ScreenId,
        to: ScreenId,
        options: TransitionOptions,
    ) -> Result<EffectId, Fault> {
        for screen in [from, to] {
            if !self.scene.has(&Target::Surface(screen)) {
                warn!(screen = %screen, "transition target is not mounted");
                return Err(Fault::MissingAnchor(format!("{}-screen", screen)));
            }
        }

        debug!(
            from = %from,
            to = %to,
            direction = %options.direction,
            duration_ms = options.duration.as_millis() as u64,
            "starting hand-off"
        );

        if let Some(surface) = self.scene.surface_mut(to) {
            surface.active = true;
            surface.visual.visible = true;
        }
        let timeline =
            TransitionProfile::for_direction(options.direction).build(from, to, options.duration);
        Ok(self.schedule(timeline, Some((from, to)), options.on_complete))
    }

    /// Schedule an effect timeline. Every target must be mounted.
    pub fn play(&mut self, timeline: Timeline) -> Result<EffectId, Fault> {
        self.check_targets(&timeline)?;
        Ok(self.schedule(timeline, None, None))
    }

    /// Like [`play`](Self::play), running `callback` once it settles
    pub fn play_then(
        &mut self,
        timeline: Timeline,
        callback: impl FnOnce() + 'static,
    ) -> Result<EffectId, Fault> {
        self.check_targets(&timeline)?;
        Ok(self.schedule(timeline, None, Some(Box::new(callback))))
    }

    fn check_targets(&self, timeline: &Timeline) -> Result<(), Fault> {
        match timeline.targets().into_iter().find(|t| !self.scene.has(t)) {
            Some(missing) => {
                debug!(target = %missing, "effect target is not mounted");
                Err(Fault::MissingAnchor(missing.to_string()))
            }
            None => Ok(()),
        }
    }

    fn schedule(
        &mut self,
        mut timeline: Timeline,
        handoff: Option<(ScreenId, ScreenId)>,
        on_complete: Option<Callback>,
    ) -> EffectId {
        self.next_id += 1;
        let id = EffectId(self.next_id);
        timeline.bind(&mut self.scene);
        timeline.sample(Duration::ZERO, &mut self.scene);
        self.running.push(Running {
            id,
            timeline,
            started_at: self.now,
            handoff,
            on_complete,
        });
        id
    }

    /// Sample every running timeline at `now` and settle finished ones
    pub fn advance(&mut self, now: Duration) {
        self.now = now.max(self.now);
        let mut finished = Vec::new();
        let mut i = 0;
        while i < self.running.len() {
            let run = &mut self.running[i];
            let elapsed = self.now.saturating_sub(run.started_at);
            run.timeline.sample(elapsed, &mut self.scene);
            if run.timeline.is_complete(elapsed) {
                finished.push(self.running.remove(i));
            } else {
                i += 1;
            }
        }

        for run in finished {
            self.settle(run);
        }
    }

    fn settle(&mut self, run: Running) {
        if let Some((from, to)) = run.handoff {
            if from != to {
                if let Some(surface) = self.scene.surface_mut(from) {
                    surface.active = false;
                    surface.visual.visible = false;
                }
            }
            if let Err(e) = self.store.set(StateKey::CurrentScreen, to) {
                warn!(error = %e, "failed to record current screen");
            }
            debug!(screen = %to, "hand-off complete");
        }
        if let Some(callback) = run.on_complete {
            callback();
        }
    }

    pub fn is_running(&self, id: EffectId) -> bool {
        self.running.iter().any(|r| r.id == id)
    }

    pub fn is_transitioning(&self) -> bool {
        self.running.iter().any(|r| r.handoff.is_some())
    }

    pub fn running_count(&self) -> usize {
        self.running.len()
    }

    /// Stop an effect where it is, landing its pending restores. Hand-offs
    /// are refused.
    pub fn cancel(&mut self, id: EffectId) -> bool {
        let Some(index) = self.running.iter().position(|r| r.id == id) else {
            return false;
        };
        if self.running[index].handoff.is_some() {
            debug!(?id, "refusing to cancel a hand-off");
            return false;
        }
        let mut run = self.running.remove(index);
        run.timeline.settle_restores(&mut self.scene);
        true
    }

    /// Drop every effect and show `screen` at rest. Pending hand-offs are
    /// discarded without running their callbacks.
    pub fn jump_to(&mut self, screen: ScreenId) {
        self.running.clear();
        self.scene.reset_elements();
        self.scene.show_only(screen);
    }

    pub fn animate_in(
        &mut self,
        elements: &[&str],
        options: &AnimateOptions,
    ) -> Result<EffectId, Fault> {
        self.play(effects::animate_in(&ids(elements), options))
    }

    pub fn animate_out(
        &mut self,
        elements: &[&str],
        options: &AnimateOptions,
    ) -> Result<EffectId, Fault> {
        self.play(effects::animate_out(&ids(elements), options))
    }

    pub fn pulse(&mut self, element: &str, options: &PulseOptions) -> Result<EffectId, Fault> {
        self.play(effects::pulse(&element.into(), options))
    }

    pub fn shake(&mut self, element: &str, options: &ShakeOptions) -> Result<EffectId, Fault> {
        self.play(effects::shake(&element.into(), options))
    }

    pub fn glow_pulse(&mut self, element: &str, options: &GlowOptions) -> Result<EffectId, Fault> {
        let id = self.play(effects::glow_pulse(&element.into(), options))?;
        self.tint(element, &options.color);
        Ok(id)
    }

    pub fn flash(&mut self, color: &str, duration: Duration) -> Result<EffectId, Fault> {
        let id = self.play(effects::flash(duration))?;
        self.tint(anchors::FLASH_OVERLAY, color);
        Ok(id)
    }

    pub fn typewriter(
        &mut self,
        element: &str,
        text: &str,
        options: &TypewriterOptions,
    ) -> Result<EffectId, Fault> {
        self.play(effects::typewriter(&element.into(), text, options))
    }

    pub fn count_to(
        &mut self,
        element: &str,
        start: f64,
        end: f64,
        options: &CountOptions,
    ) -> Result<EffectId, Fault> {
        self.play(effects::count_to(&element.into(), start, end, options))
    }

    fn tint(&mut self, element: &str, color: &str) {
        if let Some(element) = self.scene.element_mut(&element.into()) {
            element.tint = Some(color.to_string());
        }
    }
}

fn ids(elements: &[&str]) -> Vec<ElementId> {
    elements.iter().map(|e| ElementId::from(*e)).collect()
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("now", &self.now)
            .field("running", &self.running.len())
            .field("transitioning", &self.is_transitioning())
            .finish()
    }
}
