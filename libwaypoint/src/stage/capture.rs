//! Capture stage: open the camera, confirm, verify and commit a still

use std::fmt;
use std::time::Duration;

use chrono::Local;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use super::device::{Acquisition, DeviceBroker, Frame, FrameOrigin, FrameSource};
use super::{Input, Outcome, Phase, StageContext, StageController, Timer};
use crate::config::CaptureConfig;
use crate::error::{DeviceError, Fault};
use crate::feedback::Pulse;
use crate::state::{StageId, StateKey};
use crate::transition::anchors;

const PROMPT: &str = "Camera access needed. Press c to allow";
const REQUESTING: &str = "Requesting camera...";
const LIVE: &str = "Analyzing... Press Enter to capture";
const FALLBACK: &str = "Camera unavailable. Press Enter to continue";
const VERIFYING: &str = "Verifying...";
const VERIFIED: &str = "Capture verified";

/// Where the camera stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceStatus {
    Prompt,
    Requesting,
    Live,
    Fallback,
}

/// One refresh of the heads-up display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HudReadout {
    pub status: &'static str,
    pub clock: String,
    pub confidence: u32,
    pub matrix: String,
    pub range_cm: u32,
    pub light: u32,
}

impl HudReadout {
    fn sample(rng: &mut StdRng, status: &'static str) -> Self {
        Self {
            status,
            clock: Local::now().format("%H:%M:%S").to_string(),
            confidence: rng.gen_range(92..=99),
            matrix: format!("0x{:04X}", rng.gen::<u16>()),
            range_cm: rng.gen_range(10..=50),
            light: rng.gen_range(60..=100),
        }
    }
}

enum Device {
    Prompt,
    Requesting(Acquisition),
    Live(Box<dyn FrameSource>),
    Fallback(DeviceError),
}

impl Device {
    fn status(&self) -> DeviceStatus {
        match self {
            Device::Prompt => DeviceStatus::Prompt,
            Device::Requesting(_) => DeviceStatus::Requesting,
            Device::Live(_) => DeviceStatus::Live,
            Device::Fallback(_) => DeviceStatus::Fallback,
        }
    }

    /// Stop a live stream and forget a pending open
    fn release(&mut self) {
        if let Device::Live(source) = self {
            source.stop();
        }
        *self = Device::Prompt;
    }
}

pub struct CaptureStage {
    broker: DeviceBroker,
    hud_interval: Duration,
    flash: Duration,
    verify: Duration,
    settle: Duration,
    phase: Phase,
    device: Device,
    hud: Option<HudReadout>,
    still: Option<Frame>,
    rng: StdRng,
    hud_timer: Timer,
    verify_timer: Timer,
    settle_timer: Timer,
}

impl CaptureStage {
    pub fn new(config: &CaptureConfig, broker: DeviceBroker) -> Self {
        Self {
            broker,
            hud_interval: Duration::from_millis(config.hud_interval_ms),
            flash: Duration::from_millis(config.flash_ms),
            verify: Duration::from_millis(config.verify_ms),
            settle: Duration::from_millis(config.settle_ms),
            phase: Phase::Idle,
            device: Device::Prompt,
            hud: None,
            still: None,
            rng: StdRng::from_entropy(),
            hud_timer: Timer::default(),
            verify_timer: Timer::default(),
            settle_timer: Timer::default(),
        }
    }

    pub fn device_status(&self) -> DeviceStatus {
        self.device.status()
    }

    /// Why the live stream is missing, once it is known to be
    pub fn fallback_reason(&self) -> Option<&DeviceError> {
        match &self.device {
            Device::Fallback(reason) => Some(reason),
            _ => None,
        }
    }

    pub fn hud(&self) -> Option<&HudReadout> {
        self.hud.as_ref()
    }

    pub fn still(&self) -> Option<&Frame> {
        self.still.as_ref()
    }

    fn refresh_hud(&mut self, now: Duration) {
        let status = match self.phase {
            Phase::Validating => "VERIFYING",
            Phase::Completed => "VERIFIED",
            _ => "ACTIVE",
        };
        self.hud = Some(HudReadout::sample(&mut self.rng, status));
        self.hud_timer.arm(now + self.hud_interval);
    }

    fn request(&mut self, ctx: &mut StageContext<'_>) -> Outcome {
        if self.phase != Phase::Active || !matches!(self.device, Device::Prompt) {
            return Outcome::Ignored;
        }
        let acquisition = self.broker.request();
        debug!(
            id = %acquisition.id(),
            device = self.broker.device_name(),
            "requesting capture device"
        );
        self.device = Device::Requesting(acquisition);
        ctx.set_text(anchors::CAPTURE_STATUS, REQUESTING);
        Outcome::Progressed
    }

    fn poll_device(&mut self, ctx: &mut StageContext<'_>) {
        let Device::Requesting(acquisition) = &self.device else {
            return;
        };
        match acquisition.poll() {
            None => {}
            Some(Ok(source)) => {
                info!(device = self.broker.device_name(), "capture device granted");
                self.device = Device::Live(source);
                if let Err(e) = ctx.store.set(StateKey::PermissionCamera, true) {
                    debug!(error = %e, "failed to record camera permission");
                }
                ctx.set_text(anchors::CAPTURE_STATUS, LIVE);
            }
            Some(Err(e)) => {
                let fault = Fault::from(e.clone());
                debug!(error = %e, fault = %fault, "capture device unavailable, using fallback");
                self.device = Device::Fallback(e);
                ctx.set_text(anchors::CAPTURE_STATUS, FALLBACK);
            }
        }
    }

    fn confirm(&mut self, ctx: &mut StageContext<'_>) -> Outcome {
        if self.phase != Phase::Active {
            return Outcome::Ignored;
        }
        self.phase = Phase::Validating;
        ctx.feedback.pulse(Pulse::Heavy);
        let _ = ctx.orchestrator.flash("white", self.flash);
        ctx.set_text(anchors::CAPTURE_STATUS, VERIFYING);
        self.verify_timer.arm(ctx.now + self.flash + self.verify);
        Outcome::Progressed
    }

    fn commit(&mut self, ctx: &mut StageContext<'_>) {
        let still = match &mut self.device {
            Device::Live(source) => source.grab().unwrap_or_else(|e| {
                warn!(error = %e, "grab failed, committing fallback still");
                Frame::fallback()
            }),
            _ => Frame::fallback(),
        };
        self.device.release();

        self.phase = Phase::Completed;
        for key in [StateKey::CaptureVerified, StateKey::CaptureCompleted] {
            if let Err(e) = ctx.store.set(key, true) {
                debug!(error = %e, "failed to record capture result");
            }
        }
        info!(live = still.origin == FrameOrigin::Live, "capture stage completed");
        self.still = Some(still);

        ctx.feedback.pulse(Pulse::Success);
        ctx.feedback.burst();
        ctx.set_text(anchors::CAPTURE_STATUS, VERIFIED);
        self.refresh_hud(ctx.now);
        self.hud_timer.clear();
        self.settle_timer.arm(ctx.now + self.settle);
    }
}

impl StageController for CaptureStage {
    fn id(&self) -> StageId {
        StageId::Capture
    }

    fn phase(&self) -> Phase {
        self.phase
    }

    fn init(&mut self, ctx: &mut StageContext<'_>) -> Result<(), Fault> {
        if self.phase != Phase::Idle {
            return Ok(());
        }
        ctx.require(&[anchors::CAPTURE_VIEWFINDER, anchors::CAPTURE_STATUS])?;
        if ctx.store.flag(StateKey::CaptureCompleted) {
            self.phase = Phase::Completed;
            return Ok(());
        }
        self.phase = Phase::Active;
        self.device = Device::Prompt;
        ctx.set_text(anchors::CAPTURE_STATUS, PROMPT);
        self.refresh_hud(ctx.now);
        Ok(())
    }

    fn handle_input(&mut self, input: &Input, ctx: &mut StageContext<'_>) -> Outcome {
        match input {
            Input::RequestDevice => self.request(ctx),
            Input::Confirm => self.confirm(ctx),
            _ => Outcome::Ignored,
        }
    }

    fn tick(&mut self, ctx: &mut StageContext<'_>) {
        self.poll_device(ctx);
        if self.hud_timer.fire(ctx.now) {
            self.refresh_hud(ctx.now);
        }
        if self.verify_timer.fire(ctx.now) {
            self.commit(ctx);
        }
        if self.settle_timer.fire(ctx.now) {
            let _ = ctx.hand_off(StageId::Capture);
        }
    }

    fn reset(&mut self, _ctx: &mut StageContext<'_>) {}

    fn teardown(&mut self) {
        self.device.release();
        self.hud_timer.clear();
        self.verify_timer.clear();
        self.settle_timer.clear();
        if self.phase != Phase::Completed {
            self.phase = Phase::Idle;
            self.hud = None;
        }
    }
}

impl Drop for CaptureStage {
    fn drop(&mut self) {
        self.device.release();
    }
}

impl fmt::Debug for CaptureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureStage")
            .field("phase", &self.phase)
            .field("device", &self.device.status())
            .field("still", &self.still)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::stage::device::{CaptureDevice, NoDevice, SimulatedDevice};
    use crate::stage::testing::Harness;
    use crate::stage::SessionCommand;
    use crate::state::ScreenId;
    use crate::transition::{Prop, Target};

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn setup(device: impl CaptureDevice + 'static, timeout: Duration) -> (Harness, CaptureStage) {
        let mut h = Harness::new(ScreenId::Capture);
        let broker = DeviceBroker::new(Arc::new(device), timeout).unwrap();
        let mut stage = CaptureStage::new(&CaptureConfig::default(), broker);
        stage.init(&mut h.ctx()).unwrap();
        (h, stage)
    }

    /// Tick until the device answers, on wall time since the broker is real
    fn settle_device(h: &mut Harness, stage: &mut CaptureStage) {
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while stage.device_status() == DeviceStatus::Requesting
            && std::time::Instant::now() < deadline
        {
            std::thread::sleep(ms(5));
            stage.tick(&mut h.ctx());
        }
    }

    #[test]
    fn test_granted_device_commits_live_still() {
        let device = SimulatedDevice::granting();
        let (mut h, mut stage) = setup(device.clone(), Duration::from_secs(10));

        stage.handle_input(&Input::RequestDevice, &mut h.ctx());
        settle_device(&mut h, &mut stage);
        assert_eq!(stage.device_status(), DeviceStatus::Live);
        assert!(h.store.flag(StateKey::PermissionCamera));

        assert_eq!(stage.handle_input(&Input::Confirm, &mut h.ctx()), Outcome::Progressed);
        h.run(&mut stage, ms(1000));

        assert_eq!(stage.phase(), Phase::Completed);
        assert_eq!(stage.still().unwrap().origin, FrameOrigin::Live);
        assert!(h.store.flag(StateKey::CaptureVerified));
        assert_eq!(device.stopped(), 1);
        assert_eq!(h.backdrop.burst_count(), 1);
    }

    #[test]
    fn test_denied_device_falls_back() {
        let (mut h, mut stage) = setup(SimulatedDevice::denying("no"), Duration::from_secs(10));
        stage.handle_input(&Input::RequestDevice, &mut h.ctx());
        settle_device(&mut h, &mut stage);

        assert_eq!(stage.device_status(), DeviceStatus::Fallback);
        assert_eq!(stage.fallback_reason(), Some(&DeviceError::PermissionDenied("no".into())));
        assert!(!h.store.flag(StateKey::PermissionCamera));

        stage.handle_input(&Input::Confirm, &mut h.ctx());
        h.run(&mut stage, ms(1000));
        assert_eq!(stage.still().unwrap().origin, FrameOrigin::Fallback);
        assert!(h.store.flag(StateKey::CaptureCompleted));
    }

    #[test]
    fn test_confirm_without_request_uses_fallback() {
        let (mut h, mut stage) = setup(NoDevice, Duration::from_secs(10));
        stage.handle_input(&Input::Confirm, &mut h.ctx());
        h.run(&mut stage, ms(1000));
        assert_eq!(stage.still().unwrap().origin, FrameOrigin::Fallback);
    }

    #[test]
    fn test_pending_request_is_dropped_on_commit() {
        let device = SimulatedDevice::hanging();
        let (mut h, mut stage) = setup(device.clone(), Duration::from_secs(10));
        stage.handle_input(&Input::RequestDevice, &mut h.ctx());
        assert_eq!(stage.device_status(), DeviceStatus::Requesting);

        stage.handle_input(&Input::Confirm, &mut h.ctx());
        h.run(&mut stage, ms(1000));
        assert_eq!(stage.phase(), Phase::Completed);
        assert_eq!(stage.still().unwrap().origin, FrameOrigin::Fallback);
        assert_eq!(stage.device_status(), DeviceStatus::Prompt);
    }

    #[test]
    fn test_confirm_in_flight_is_ignored() {
        let (mut h, mut stage) = setup(NoDevice, Duration::from_secs(10));
        stage.handle_input(&Input::Confirm, &mut h.ctx());
        assert_eq!(stage.handle_input(&Input::Confirm, &mut h.ctx()), Outcome::Ignored);
        assert_eq!(h.haptics.recorded(), vec![Pulse::Heavy]);

        h.run(&mut stage, ms(999));
        assert_eq!(stage.phase(), Phase::Validating);
        h.run(&mut stage, ms(1));
        assert_eq!(stage.phase(), Phase::Completed);
    }

    #[test]
    fn test_confirm_flashes_overlay() {
        let (mut h, mut stage) = setup(NoDevice, Duration::from_secs(10));
        stage.handle_input(&Input::Confirm, &mut h.ctx());
        h.run(&mut stage, ms(100));
        let overlay = h
            .orchestrator
            .scene()
            .visual(&Target::Element(anchors::FLASH_OVERLAY.into()))
            .unwrap()
            .get(Prop::Opacity);
        assert!(overlay > 0.9);
    }

    #[test]
    fn test_hud_refreshes_on_interval() {
        let (mut h, mut stage) = setup(NoDevice, Duration::from_secs(10));
        let first = stage.hud().cloned().unwrap();
        assert!((92..=99).contains(&first.confidence));
        assert!((10..=50).contains(&first.range_cm));
        assert!((60..=100).contains(&first.light));
        assert_eq!(first.matrix.len(), 6);

        assert_eq!(stage.hud_timer.deadline(), Some(ms(500)));
        h.run(&mut stage, ms(500));
        assert_eq!(stage.hud_timer.deadline(), Some(ms(1000)));
    }

    #[test]
    fn test_settle_hands_off_to_success() {
        let (mut h, mut stage) = setup(NoDevice, Duration::from_secs(10));
        stage.handle_input(&Input::Confirm, &mut h.ctx());
        h.run(&mut stage, ms(1000 + 1200 + 700));
        assert_eq!(h.store.current_screen(), ScreenId::Success);
        assert_eq!(h.commands(), vec![SessionCommand::Finished]);
    }

    #[test]
    fn test_repeated_init_completes_and_hands_off_once() {
        let (mut h, mut stage) = setup(NoDevice, Duration::from_secs(10));
        let completions = h.count_changes(StateKey::CaptureCompleted);
        stage.init(&mut h.ctx()).unwrap();
        stage.init(&mut h.ctx()).unwrap();

        assert_eq!(stage.handle_input(&Input::Confirm, &mut h.ctx()), Outcome::Progressed);
        h.run(&mut stage, ms(1000 + 1200 + 700));

        assert_eq!(completions.get(), 1);
        assert!(h.store.flag(StateKey::CaptureVerified));
        assert_eq!(h.commands(), vec![SessionCommand::Finished]);
    }

    #[test]
    fn test_teardown_releases_stream() {
        let device = SimulatedDevice::granting();
        let (mut h, mut stage) = setup(device.clone(), Duration::from_secs(10));
        stage.handle_input(&Input::RequestDevice, &mut h.ctx());
        settle_device(&mut h, &mut stage);

        stage.teardown();
        stage.teardown();
        assert_eq!(device.stopped(), 1);
        assert_eq!(stage.phase(), Phase::Idle);
        assert!(!stage.hud_timer.is_armed());
        assert!(stage.hud().is_none());
    }
}
