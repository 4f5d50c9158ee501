//! Stage controllers
//!
//! Every stage implements [`StageController`] and moves through
//! Idle → Active → Validating → Completed. A controller reads and writes the
//! store, asks the orchestrator for effects, and on success hands off to the
//! next screen once its settle delay has passed. The hand-off callback queues
//! a [`SessionCommand`] instead of touching the next controller directly.

pub mod answer;
pub mod capture;
pub mod device;
pub mod placement;
pub mod scan;

use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use crossbeam_channel::Sender;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Fault;
use crate::feedback::Feedback;
use crate::state::{StageId, Store};
use crate::transition::{Direction, EffectId, Orchestrator, Scene, Target, TransitionOptions};

pub use answer::AnswerStage;
pub use capture::CaptureStage;
pub use placement::PlacementStage;
pub use scan::ScanStage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Active,
    /// A gesture or confirmation is being evaluated
    Validating,
    Completed,
}

/// Position in board units
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Host input, already mapped out of the front end's event vocabulary
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Press(Point),
    Move(Point),
    Release(Point),
    /// Full contents of the text field after an edit
    Text(String),
    Submit,
    Confirm,
    RequestDevice,
    Reset,
    Continue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Ignored,
    Progressed,
    Rejected(Fault),
    Completed,
}

/// Work queued by hand-off callbacks for the session to pick up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    Activate(StageId),
    Finished,
}

/// What a controller may touch while handling a call
pub struct StageContext<'a> {
    pub store: &'a Rc<Store>,
    pub orchestrator: &'a mut Orchestrator,
    pub feedback: &'a mut Feedback,
    pub commands: &'a Sender<SessionCommand>,
    pub direction: Direction,
    pub transition: Duration,
    pub now: Duration,
}

impl StageContext<'_> {
    pub fn scene(&mut self) -> &mut Scene {
        self.orchestrator.scene_mut()
    }

    /// Write an element's text if it is mounted
    pub fn set_text(&mut self, element: &str, text: impl Into<String>) {
        if let Some(element) = self.orchestrator.scene_mut().element_mut(&element.into()) {
            element.text = text.into();
        }
    }

    /// Fail with [`Fault::MissingAnchor`] on the first unmounted element
    pub fn require(&self, elements: &[&str]) -> Result<(), Fault> {
        let scene = self.orchestrator.scene();
        match elements
            .iter()
            .find(|id| !scene.has(&Target::Element((**id).into())))
        {
            Some(missing) => Err(Fault::MissingAnchor((*missing).to_string())),
            None => Ok(()),
        }
    }

    /// Hand off from `stage`'s screen to the next one. The callback queues
    /// activation of the next stage, or the end of the flow.
    pub fn hand_off(&mut self, stage: StageId) -> Result<EffectId, Fault> {
        let next = stage.next_screen();
        let command = match next.stage() {
            Some(next_stage) => SessionCommand::Activate(next_stage),
            None => SessionCommand::Finished,
        };
        let commands = self.commands.clone();
        let options = TransitionOptions::new(self.direction)
            .duration(self.transition)
            .on_complete(move || {
                if commands.send(command).is_err() {
                    debug!(?command, "session gone before hand-off finished");
                }
            });

        self.orchestrator
            .goto(stage.screen(), next, options)
            .inspect_err(|e| warn!(stage = %stage, error = %e, "hand-off failed"))
    }
}

/// A single pending deadline
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timer(Option<Duration>);

impl Timer {
    pub fn arm(&mut self, at: Duration) {
        self.0 = Some(at);
    }

    pub fn clear(&mut self) {
        self.0 = None;
    }

    pub fn is_armed(&self) -> bool {
        self.0.is_some()
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.0
    }

    /// True once `now` reaches the deadline; disarms itself
    pub fn fire(&mut self, now: Duration) -> bool {
        match self.0 {
            Some(at) if now >= at => {
                self.0 = None;
                true
            }
            _ => false,
        }
    }
}

pub trait StageController {
    fn id(&self) -> StageId;

    fn phase(&self) -> Phase;

    /// Bind anchors and become Active. Calling again on an Active or
    /// Completed controller changes nothing.
    fn init(&mut self, ctx: &mut StageContext<'_>) -> Result<(), Fault>;

    fn handle_input(&mut self, input: &Input, ctx: &mut StageContext<'_>) -> Outcome;

    /// Called on every host tick with `ctx.now`
    fn tick(&mut self, ctx: &mut StageContext<'_>);

    /// Stage-local restart; completed stages ignore it
    fn reset(&mut self, ctx: &mut StageContext<'_>);

    /// Release timers and devices. Safe to call repeatedly; a controller that
    /// has not completed goes back to Idle.
    fn teardown(&mut self);
}

pub enum Stage {
    Scan(ScanStage),
    Answer(AnswerStage),
    Placement(PlacementStage),
    Capture(CaptureStage),
}

macro_rules! dispatch {
    ($stage:expr, $inner:ident => $body:expr) => {
        match $stage {
            Stage::Scan($inner) => $body,
            Stage::Answer($inner) => $body,
            Stage::Placement($inner) => $body,
            Stage::Capture($inner) => $body,
        }
    };
}

impl StageController for Stage {
    fn id(&self) -> StageId {
        dispatch!(self, s => s.id())
    }

    fn phase(&self) -> Phase {
        dispatch!(self, s => s.phase())
    }

    fn init(&mut self, ctx: &mut StageContext<'_>) -> Result<(), Fault> {
        dispatch!(self, s => s.init(ctx))
    }

    fn handle_input(&mut self, input: &Input, ctx: &mut StageContext<'_>) -> Outcome {
        dispatch!(self, s => s.handle_input(input, ctx))
    }

    fn tick(&mut self, ctx: &mut StageContext<'_>) {
        dispatch!(self, s => s.tick(ctx))
    }

    fn reset(&mut self, ctx: &mut StageContext<'_>) {
        dispatch!(self, s => s.reset(ctx))
    }

    fn teardown(&mut self) {
        dispatch!(self, s => s.teardown())
    }
}

impl fmt::Debug for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stage")
            .field("id", &self.id())
            .field("phase", &self.phase())
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Shared fixture for controller tests

    use super::*;
    use std::cell::Cell;

    use crossbeam_channel::{unbounded, Receiver};

    use crate::feedback::RecordingHaptics;
    use crate::feedback::{Feedback, RecordingBackdrop};
    use crate::state::{EventBus, ScreenId, StateKey, Topic};

    pub struct Harness {
        pub store: Rc<Store>,
        pub orchestrator: Orchestrator,
        pub feedback: Feedback,
        pub haptics: RecordingHaptics,
        pub backdrop: RecordingBackdrop,
        pub tx: Sender<SessionCommand>,
        pub rx: Receiver<SessionCommand>,
        pub now: Duration,
    }

    impl Harness {
        pub fn new(screen: ScreenId) -> Self {
            let store = Rc::new(Store::new(EventBus::new()));
            let mut scene = Scene::standard();
            scene.show_only(screen);
            let haptics = RecordingHaptics::default();
            let backdrop = RecordingBackdrop::default();
            let mut feedback = Feedback::new(
                Rc::clone(&store),
                Box::new(haptics.clone()),
                Box::new(backdrop.clone()),
            );
            feedback.init_backdrop();
            let (tx, rx) = unbounded();
            Self {
                orchestrator: Orchestrator::new(Rc::clone(&store), scene),
                store,
                feedback,
                haptics,
                backdrop,
                tx,
                rx,
                now: Duration::ZERO,
            }
        }

        pub fn ctx(&mut self) -> StageContext<'_> {
            StageContext {
                store: &self.store,
                orchestrator: &mut self.orchestrator,
                feedback: &mut self.feedback,
                commands: &self.tx,
                direction: Direction::Left,
                transition: Duration::from_millis(600),
                now: self.now,
            }
        }

        /// Move the clock forward in small steps, ticking `stage` each time
        pub fn run(&mut self, stage: &mut impl StageController, by: Duration) {
            let end = self.now + by;
            let step = Duration::from_millis(50);
            while self.now < end {
                self.now = (self.now + step).min(end);
                self.orchestrator.advance(self.now);
                let mut ctx = self.ctx();
                stage.tick(&mut ctx);
            }
        }

        pub fn text(&self, element: &str) -> String {
            self.orchestrator
                .scene()
                .element(&element.into())
                .map(|e| e.text.clone())
                .unwrap_or_default()
        }

        pub fn commands(&self) -> Vec<SessionCommand> {
            self.rx.try_iter().collect()
        }

        /// Count change notifications for `key` from here on
        pub fn count_changes(&self, key: StateKey) -> Rc<Cell<u32>> {
            let count = Rc::new(Cell::new(0));
            let seen = Rc::clone(&count);
            self.store
                .on(Topic::Changed(key), move |_| seen.set(seen.get() + 1));
            count
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_fires_once() {
        let mut timer = Timer::default();
        assert!(!timer.fire(Duration::from_secs(5)));

        timer.arm(Duration::from_millis(800));
        assert!(!timer.fire(Duration::from_millis(799)));
        assert!(timer.fire(Duration::from_millis(800)));
        assert!(!timer.fire(Duration::from_millis(900)));
        assert!(!timer.is_armed());
    }

    #[test]
    fn test_point_distance() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(30.0, 40.0);
        assert_eq!(a.distance(&b), 50.0);
    }
}
