//! Scan stage: press and hold the sensor until the hold time is reached

use std::time::Duration;

use tracing::{debug, info};

use super::{Input, Outcome, Phase, StageContext, StageController, Timer};
use crate::config::ScanConfig;
use crate::error::Fault;
use crate::feedback::Pulse;
use crate::state::{StageId, StateKey};
use crate::transition::{anchors, GlowOptions, PulseOptions};

const PROMPT: &str = "Touch and hold the sensor";
const SCANNING: &str = "Scanning...";
const RETRY: &str = "Keep holding the sensor";
const CONFIRMED: &str = "Identity confirmed";

#[derive(Debug)]
pub struct ScanStage {
    hold: Duration,
    settle: Duration,
    phase: Phase,
    held_since: Option<Duration>,
    progress: f64,
    /// Quarter milestones already signalled during the current hold
    milestones: u32,
    settle_timer: Timer,
}

impl ScanStage {
    pub fn new(config: &ScanConfig) -> Self {
        Self {
            hold: Duration::from_millis(config.hold_ms),
            settle: Duration::from_millis(config.settle_ms),
            phase: Phase::Idle,
            held_since: None,
            progress: 0.0,
            milestones: 0,
            settle_timer: Timer::default(),
        }
    }

    /// Hold progress in [0, 1]
    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn is_holding(&self) -> bool {
        self.held_since.is_some()
    }

    fn measure(&mut self, now: Duration) {
        if let Some(since) = self.held_since {
            let elapsed = now.saturating_sub(since);
            self.progress = (elapsed.as_secs_f64() / self.hold.as_secs_f64()).clamp(0.0, 1.0);
        }
    }

    fn show_progress(&self, ctx: &mut StageContext<'_>) {
        if let Some(sensor) = ctx.scene().element_mut(&anchors::SCAN_SENSOR.into()) {
            sensor.visual.glow = self.progress;
        }
    }

    fn start_hold(&mut self, ctx: &mut StageContext<'_>) -> Outcome {
        if self.phase != Phase::Active || ctx.store.flag(StateKey::ScanLocked) {
            return Outcome::Ignored;
        }
        self.held_since = Some(ctx.now);
        self.progress = 0.0;
        self.milestones = 0;
        self.phase = Phase::Validating;
        ctx.feedback.pulse(Pulse::Light);
        ctx.set_text(anchors::SCAN_STATUS, SCANNING);
        Outcome::Progressed
    }

    fn end_hold(&mut self, ctx: &mut StageContext<'_>) -> Outcome {
        if self.held_since.is_none() {
            return Outcome::Ignored;
        }
        self.measure(ctx.now);
        if self.progress >= 1.0 {
            return self.complete(ctx);
        }

        debug!(progress = self.progress, "scan released early");
        self.held_since = None;
        self.progress = 0.0;
        self.milestones = 0;
        self.phase = Phase::Active;
        self.show_progress(ctx);
        ctx.set_text(anchors::SCAN_STATUS, RETRY);
        Outcome::Rejected(Fault::ValidationFailure("released before the scan finished".into()))
    }

    fn complete(&mut self, ctx: &mut StageContext<'_>) -> Outcome {
        self.held_since = None;
        self.progress = 1.0;
        self.phase = Phase::Completed;

        for (key, value) in [(StateKey::ScanLocked, true), (StateKey::ScanCompleted, true)] {
            if let Err(e) = ctx.store.set(key, value) {
                debug!(error = %e, "failed to record scan result");
            }
        }
        info!("scan stage completed");

        ctx.feedback.pulse(Pulse::Success);
        ctx.set_text(anchors::SCAN_STATUS, CONFIRMED);
        self.show_progress(ctx);
        let pulse = PulseOptions {
            scale: 1.2,
            repeat: 1,
            ..PulseOptions::default()
        };
        let _ = ctx.orchestrator.pulse(anchors::SCAN_ICON, &pulse);
        let glow = GlowOptions {
            color: "gold".to_string(),
            duration: Duration::from_millis(500),
            cycles: 1,
        };
        let _ = ctx.orchestrator.glow_pulse(anchors::SCAN_SENSOR, &glow);

        self.settle_timer.arm(ctx.now + self.settle);
        Outcome::Completed
    }
}

impl StageController for ScanStage {
    fn id(&self) -> StageId {
        StageId::Scan
    }

    fn phase(&self) -> Phase {
        self.phase
    }

    fn init(&mut self, ctx: &mut StageContext<'_>) -> Result<(), Fault> {
        if self.phase != Phase::Idle {
            return Ok(());
        }
        ctx.require(&[anchors::SCAN_SENSOR, anchors::SCAN_STATUS, anchors::SCAN_ICON])?;
        ctx.set_text(anchors::SCAN_STATUS, PROMPT);
        self.phase = if ctx.store.flag(StateKey::ScanCompleted) {
            Phase::Completed
        } else {
            Phase::Active
        };
        Ok(())
    }

    fn handle_input(&mut self, input: &Input, ctx: &mut StageContext<'_>) -> Outcome {
        match input {
            Input::Press(_) => self.start_hold(ctx),
            Input::Release(_) => self.end_hold(ctx),
            Input::Reset => {
                self.reset(ctx);
                Outcome::Progressed
            }
            _ => Outcome::Ignored,
        }
    }

    fn tick(&mut self, ctx: &mut StageContext<'_>) {
        if self.held_since.is_some() {
            self.measure(ctx.now);
            let reached = (self.progress * 4.0).floor() as u32;
            while self.milestones < reached.min(3) {
                self.milestones += 1;
                ctx.feedback.pulse(Pulse::Light);
            }
            self.show_progress(ctx);
            if self.progress >= 1.0 {
                self.complete(ctx);
            }
        }

        if self.settle_timer.fire(ctx.now) {
            let _ = ctx.hand_off(StageId::Scan);
        }
    }

    fn reset(&mut self, ctx: &mut StageContext<'_>) {
        if self.phase == Phase::Completed || self.phase == Phase::Idle {
            return;
        }
        self.held_since = None;
        self.progress = 0.0;
        self.milestones = 0;
        self.phase = Phase::Active;
        self.show_progress(ctx);
        ctx.set_text(anchors::SCAN_STATUS, PROMPT);
    }

    fn teardown(&mut self) {
        self.held_since = None;
        self.settle_timer.clear();
        if self.phase != Phase::Completed {
            self.phase = Phase::Idle;
            self.progress = 0.0;
            self.milestones = 0;
        }
    }
}
