//! Session bootstrap
//!
//! A [`Session`] owns everything one run of the flow needs: the store, the
//! orchestrator with its scene, the feedback collaborators and the four stage
//! controllers. The host feeds it [`Input`] and the current time; the session
//! routes input to the active controller and activates the next one when a
//! hand-off reports back.

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{Config, DeviceKind};
use crate::error::Result;
use crate::feedback::{Backdrop, Feedback, Haptics, NoBackdrop, Pulse, TracingHaptics};
use crate::stage::device::{CaptureDevice, DeviceBroker, NoDevice, SimulatedDevice};
use crate::stage::{
    AnswerStage, CaptureStage, Input, Outcome, PlacementStage, ScanStage, SessionCommand, Stage,
    StageContext, StageController,
};
use crate::state::{EventBus, ScreenId, StageId, Store, Topic};
use crate::transition::{anchors, AnimateOptions, Orchestrator, Preset, Scene, TransitionOptions};

/// Marker state of one stage dot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DotState {
    Pending,
    Active,
    Completed,
}

/// Top progress bar and the four stage dots
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    pub percent: u32,
    pub dots: [DotState; 4],
}

impl Progress {
    fn read(store: &Store) -> Self {
        let screen = store.current_screen();
        let dots = StageId::ALL.map(|stage| {
            if store.stage_completed(stage) {
                DotState::Completed
            } else if screen == stage.screen() {
                DotState::Active
            } else {
                DotState::Pending
            }
        });
        Self {
            percent: store.progress(),
            dots,
        }
    }
}

/// Keep `progress` in step with the store
fn watch_progress(store: &Rc<Store>, progress: &Rc<RefCell<Progress>>) {
    for topic in [Topic::AnyChange, Topic::Reset] {
        let weak: Weak<Store> = Rc::downgrade(store);
        let progress = Rc::clone(progress);
        store.on(topic, move |_| {
            if let Some(store) = weak.upgrade() {
                *progress.borrow_mut() = Progress::read(&store);
            }
        });
    }
}

fn build_stages(config: &Config, device: Arc<dyn CaptureDevice>) -> Result<Vec<Stage>> {
    let broker = DeviceBroker::new(device, config.capture.timeout())?;
    Ok(vec![
        Stage::Scan(ScanStage::new(&config.scan)),
        Stage::Answer(AnswerStage::new(&config.answer)),
        Stage::Placement(PlacementStage::new(&config.placement)),
        Stage::Capture(CaptureStage::new(&config.capture, broker)),
    ])
}

const INTRO_ELEMENTS: [&str; 3] = [
    anchors::INTRO_TITLE,
    anchors::INTRO_SUBTITLE,
    anchors::INTRO_START,
];

pub struct Session {
    id: Uuid,
    config: Config,
    store: Rc<Store>,
    orchestrator: Orchestrator,
    feedback: Feedback,
    device: Arc<dyn CaptureDevice>,
    stages: Vec<Stage>,
    active: Option<StageId>,
    tx: Sender<SessionCommand>,
    rx: Receiver<SessionCommand>,
    progress: Rc<RefCell<Progress>>,
    now: Duration,
    finished: bool,
}

impl Session {
    /// # Errors
    ///
    /// Returns an error if the device runtime cannot be started
    pub fn new(
        config: Config,
        haptics: Box<dyn Haptics>,
        backdrop: Box<dyn Backdrop>,
        device: Arc<dyn CaptureDevice>,
    ) -> Result<Self> {
        let store = Rc::new(Store::with_settings(config.settings(), EventBus::new()));
        let progress = Rc::new(RefCell::new(Progress::read(&store)));
        watch_progress(&store, &progress);

        let stages = build_stages(&config, Arc::clone(&device))?;
        let (tx, rx) = unbounded();
        let id = Uuid::new_v4();
        info!(session = %id, device = device.name(), "session created");

        Ok(Self {
            id,
            orchestrator: Orchestrator::new(Rc::clone(&store), Scene::standard()),
            feedback: Feedback::new(Rc::clone(&store), haptics, backdrop),
            config,
            store,
            device,
            stages,
            active: None,
            tx,
            rx,
            progress,
            now: Duration::ZERO,
            finished: false,
        })
    }

    /// Session with logging-only feedback and the configured device
    pub fn from_config(config: Config) -> Result<Self> {
        let device: Arc<dyn CaptureDevice> = match config.capture.device {
            DeviceKind::None => Arc::new(NoDevice),
            DeviceKind::Simulated => Arc::new(SimulatedDevice::granting()),
        };
        Self::new(config, Box::new(TracingHaptics), Box::new(NoBackdrop), device)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Rc<Store> {
        &self.store
    }

    pub fn scene(&self) -> &Scene {
        self.orchestrator.scene()
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn current_screen(&self) -> ScreenId {
        self.store.current_screen()
    }

    pub fn active_stage(&self) -> Option<StageId> {
        self.active
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn progress(&self) -> Progress {
        self.progress.borrow().clone()
    }

    pub fn stage(&self, id: StageId) -> Option<&Stage> {
        self.stages.iter().find(|stage| stage.id() == id)
    }

    pub fn scan(&self) -> Option<&ScanStage> {
        self.stages.iter().find_map(|stage| match stage {
            Stage::Scan(scan) => Some(scan),
            _ => None,
        })
    }

    pub fn answer(&self) -> Option<&AnswerStage> {
        self.stages.iter().find_map(|stage| match stage {
            Stage::Answer(answer) => Some(answer),
            _ => None,
        })
    }

    pub fn placement(&self) -> Option<&PlacementStage> {
        self.stages.iter().find_map(|stage| match stage {
            Stage::Placement(placement) => Some(placement),
            _ => None,
        })
    }

    pub fn capture(&self) -> Option<&CaptureStage> {
        self.stages.iter().find_map(|stage| match stage {
            Stage::Capture(capture) => Some(capture),
            _ => None,
        })
    }

    /// Show the intro screen and start the backdrop
    pub fn start(&mut self) {
        self.feedback.init_backdrop();
        self.orchestrator.jump_to(ScreenId::Intro);
        self.animate_intro();
    }

    fn animate_intro(&mut self) {
        let logo = AnimateOptions::entry()
            .preset(Preset::Scale)
            .delay(Duration::from_millis(200));
        let rest = AnimateOptions {
            stagger: Duration::from_millis(200),
            ..AnimateOptions::entry().delay(Duration::from_millis(600))
        };
        if let Err(e) = self
            .orchestrator
            .animate_in(&[anchors::INTRO_LOGO], &logo)
            .and_then(|_| self.orchestrator.animate_in(&INTRO_ELEMENTS, &rest))
        {
            warn!(error = %e, "intro animation skipped");
        }
    }

    /// Route one input. Before the flow starts, Confirm leaves the intro.
    pub fn input(&mut self, input: Input) -> Outcome {
        if self.finished {
            return Outcome::Ignored;
        }
        let Some(active) = self.active else {
            return self.begin(&input);
        };

        let outcome = self
            .with_stage(active, |stage, ctx| stage.handle_input(&input, ctx))
            .unwrap_or(Outcome::Ignored);
        if let Outcome::Rejected(fault) = &outcome {
            debug!(stage = %active, fault = %fault, "input rejected");
        }
        outcome
    }

    fn begin(&mut self, input: &Input) -> Outcome {
        if *input != Input::Confirm
            || self.store.current_screen() != ScreenId::Intro
            || self.orchestrator.is_transitioning()
        {
            return Outcome::Ignored;
        }

        self.feedback.pulse(Pulse::Medium);
        let commands = self.tx.clone();
        let options = TransitionOptions::new(self.config.flow.direction)
            .duration(self.config.flow.transition())
            .on_complete(move || {
                let _ = commands.send(SessionCommand::Activate(StageId::Scan));
            });
        match self.orchestrator.goto(ScreenId::Intro, ScreenId::Scan, options) {
            Ok(_) => {
                info!(session = %self.id, "flow started");
                Outcome::Progressed
            }
            Err(fault) => Outcome::Rejected(fault),
        }
    }

    /// Move the clock to `now`: sample animations, pick up finished
    /// hand-offs, then tick the active controller
    pub fn advance(&mut self, now: Duration) {
        self.now = self.now.max(now);
        self.orchestrator.advance(self.now);

        while let Ok(command) = self.rx.try_recv() {
            self.apply(command);
        }

        if let Some(active) = self.active {
            self.with_stage(active, |stage, ctx| stage.tick(ctx));
        }
    }

    fn apply(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Activate(next) => {
                if let Some(previous) = self.active.replace(next) {
                    if let Some(stage) = self.stages.iter_mut().find(|s| s.id() == previous) {
                        stage.teardown();
                    }
                }
                let result = self.with_stage(next, |stage, ctx| stage.init(ctx));
                if let Some(Err(fault)) = result {
                    warn!(stage = %next, fault = %fault, "stage failed to start");
                } else {
                    debug!(stage = %next, "stage active");
                }
            }
            SessionCommand::Finished => {
                if let Some(previous) = self.active.take() {
                    if let Some(stage) = self.stages.iter_mut().find(|s| s.id() == previous) {
                        stage.teardown();
                    }
                }
                self.finished = true;
                info!(session = %self.id, "flow finished");
                let options = AnimateOptions::entry().preset(Preset::Pop);
                if let Err(e) = self.orchestrator.animate_in(
                    &[anchors::SUCCESS_CHECKMARK, anchors::SUCCESS_MESSAGE],
                    &options,
                ) {
                    debug!(error = %e, "success animation skipped");
                }
                self.feedback.burst();
            }
        }
    }

    fn with_stage<R>(
        &mut self,
        id: StageId,
        f: impl FnOnce(&mut Stage, &mut StageContext<'_>) -> R,
    ) -> Option<R> {
        let Session {
            config,
            store,
            orchestrator,
            feedback,
            stages,
            tx,
            now,
            ..
        } = self;
        let stage = stages.iter_mut().find(|stage| stage.id() == id)?;
        let mut ctx = StageContext {
            store,
            orchestrator,
            feedback,
            commands: tx,
            direction: config.flow.direction,
            transition: config.flow.transition(),
            now: *now,
        };
        Some(f(stage, &mut ctx))
    }

    /// Back to the intro with fresh stage records. Listeners survive.
    ///
    /// # Errors
    ///
    /// Returns an error if the device runtime cannot be restarted
    pub fn reset(&mut self) -> Result<()> {
        self.teardown_stages();
        self.stages = build_stages(&self.config, Arc::clone(&self.device))?;
        self.active = None;
        self.finished = false;
        while self.rx.try_recv().is_ok() {}

        self.store.reset();
        self.orchestrator.jump_to(ScreenId::Intro);
        self.animate_intro();
        info!(session = %self.id, "session reset");
        Ok(())
    }

    fn teardown_stages(&mut self) {
        for stage in &mut self.stages {
            stage.teardown();
        }
    }

    /// Release devices and timers and stop the backdrop
    pub fn teardown(&mut self) {
        self.teardown_stages();
        self.active = None;
        self.feedback.destroy_backdrop();
        debug!(session = %self.id, "session torn down");
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("active", &self.active)
            .field("now", &self.now)
            .field("finished", &self.finished)
            .field("stages", &self.stages)
            .finish_non_exhaustive()
    }
}
