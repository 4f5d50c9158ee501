//! Placement stage: drag every token onto the shared target
//!
//! Coordinates are board units with the origin at the board's top-left
//! corner. A token's position is its top-left corner; hit tests and snapping
//! use its center.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use super::{Input, Outcome, Phase, Point, StageContext, StageController, Timer};
use crate::config::{PlacementConfig, TOKEN_HEIGHT, TOKEN_WIDTH};
use crate::error::Fault;
use crate::feedback::Pulse;
use crate::state::{StageId, StateKey};
use crate::transition::{anchors, At, Ease, EffectId, ElementId, Prop, Timeline, TweenSpec};

pub const TOKEN_COUNT: usize = 6;
/// Near highlight kicks in at this multiple of the snap distance
const NEAR_FACTOR: f64 = 1.5;
const PADDING: f64 = 30.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub index: usize,
    /// Generated resting position
    pub home: Point,
    pub home_rotation: f64,
    pub position: Point,
    pub rotation: f64,
    pub placed: bool,
}

impl Token {
    pub fn center(&self) -> Point {
        Point::new(
            self.position.x + TOKEN_WIDTH / 2.0,
            self.position.y + TOKEN_HEIGHT / 2.0,
        )
    }

    pub fn contains(&self, point: &Point) -> bool {
        point.x >= self.position.x
            && point.x <= self.position.x + TOKEN_WIDTH
            && point.y >= self.position.y
            && point.y <= self.position.y + TOKEN_HEIGHT
    }

    /// Scene element that mirrors this token
    pub fn element_id(&self) -> ElementId {
        token_element(self.index)
    }
}

pub fn token_element(index: usize) -> ElementId {
    ElementId::new(format!("placement.token.{}", index))
}

/// Six spots around the board edges, jittered by ±10 with a ±30° tilt
fn layout(width: f64, height: f64, rng: &mut StdRng) -> Vec<Token> {
    let spots = [
        (PADDING, height * 0.2),
        (width - PADDING - 50.0, height * 0.15),
        (PADDING, height * 0.5),
        (width - PADDING - 50.0, height * 0.55),
        (PADDING + 30.0, height * 0.8),
        (width - PADDING - 60.0, height * 0.85),
    ];

    spots
        .iter()
        .enumerate()
        .map(|(index, &(x, y))| {
            let x = (x + rng.gen_range(-10.0_f64..=10.0)).clamp(0.0, width - TOKEN_WIDTH);
            let y = (y + rng.gen_range(-10.0_f64..=10.0)).clamp(0.0, height - TOKEN_HEIGHT);
            let rotation = rng.gen_range(-30.0_f64..=30.0);
            Token {
                index,
                home: Point::new(x, y),
                home_rotation: rotation,
                position: Point::new(x, y),
                rotation,
                placed: false,
            }
        })
        .collect()
}

#[derive(Debug)]
pub struct PlacementStage {
    width: f64,
    height: f64,
    snap_distance: f64,
    reveal: bool,
    reveal_message: String,
    settle: Duration,
    phase: Phase,
    tokens: Vec<Token>,
    dragging: Option<usize>,
    near: bool,
    placed: u32,
    settle_timer: Timer,
    revealing: bool,
    /// Snap animations still in flight
    motions: Vec<EffectId>,
}

impl PlacementStage {
    pub fn new(config: &PlacementConfig) -> Self {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            width: config.board_width,
            height: config.board_height,
            snap_distance: config.snap_distance,
            reveal: config.reveal,
            reveal_message: config.reveal_message.clone(),
            settle: Duration::from_millis(config.settle_ms),
            phase: Phase::Idle,
            tokens: layout(config.board_width, config.board_height, &mut rng),
            dragging: None,
            near: false,
            placed: 0,
            settle_timer: Timer::default(),
            revealing: false,
            motions: Vec::new(),
        }
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn board(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    pub fn target(&self) -> Point {
        Point::new(self.width / 2.0, self.height / 2.0)
    }

    pub fn snap_distance(&self) -> f64 {
        self.snap_distance
    }

    pub fn placed_count(&self) -> u32 {
        self.placed
    }

    pub fn dragging(&self) -> Option<usize> {
        self.dragging
    }

    /// The dragged token is close enough to highlight the target
    pub fn is_near(&self) -> bool {
        self.near
    }

    /// Completion overlay is up and waiting for a continue
    pub fn is_revealing(&self) -> bool {
        self.revealing
    }

    pub fn reveal_message(&self) -> &str {
        &self.reveal_message
    }

    fn mirror(&self, index: usize, ctx: &mut StageContext<'_>) {
        let token = &self.tokens[index];
        if let Some(element) = ctx.scene().element_mut(&token.element_id()) {
            element.visual.x = token.position.x;
            element.visual.y = token.position.y;
            element.visual.rotation = token.rotation;
        }
    }

    fn set_near(&mut self, near: bool, ctx: &mut StageContext<'_>) {
        self.near = near;
        if let Some(target) = ctx.scene().element_mut(&anchors::PLACEMENT_TARGET.into()) {
            target.visual.glow = if near { 1.0 } else { 0.0 };
        }
    }

    fn press(&mut self, point: &Point, ctx: &mut StageContext<'_>) -> Outcome {
        if self.phase != Phase::Active || self.dragging.is_some() {
            return Outcome::Ignored;
        }
        let Some(index) = self
            .tokens
            .iter()
            .rev()
            .find(|t| !t.placed && t.contains(point))
            .map(|t| t.index)
        else {
            return Outcome::Ignored;
        };

        self.dragging = Some(index);
        self.phase = Phase::Validating;
        ctx.feedback.pulse(Pulse::Light);
        Outcome::Progressed
    }

    fn drag(&mut self, point: &Point, ctx: &mut StageContext<'_>) -> Outcome {
        let Some(index) = self.dragging else {
            return Outcome::Ignored;
        };
        let x = (point.x - TOKEN_WIDTH / 2.0).clamp(0.0, self.width - TOKEN_WIDTH);
        let y = (point.y - TOKEN_HEIGHT / 2.0).clamp(0.0, self.height - TOKEN_HEIGHT);
        self.tokens[index].position = Point::new(x, y);
        self.mirror(index, ctx);

        let distance = self.tokens[index].center().distance(&self.target());
        self.set_near(distance < self.snap_distance * NEAR_FACTOR, ctx);
        Outcome::Progressed
    }

    fn release(&mut self, point: &Point, ctx: &mut StageContext<'_>) -> Outcome {
        let Some(index) = self.dragging else {
            return Outcome::Ignored;
        };
        self.drag(point, ctx);
        self.dragging = None;
        self.phase = Phase::Active;
        self.set_near(false, ctx);

        let distance = self.tokens[index].center().distance(&self.target());
        if distance < self.snap_distance {
            return self.place(index, ctx);
        }

        debug!(token = index, distance, "token released out of reach");
        let token = &mut self.tokens[index];
        token.position = token.home;
        token.rotation = token.home_rotation;
        self.mirror(index, ctx);
        Outcome::Rejected(Fault::UnreachableTarget {
            distance,
            threshold: self.snap_distance,
        })
    }

    fn place(&mut self, index: usize, ctx: &mut StageContext<'_>) -> Outcome {
        let target = self.target();
        let token = &mut self.tokens[index];
        token.placed = true;
        token.position = Point::new(target.x - TOKEN_WIDTH / 2.0, target.y - TOKEN_HEIGHT / 2.0);
        token.rotation = index as f64 * 60.0;

        let id = token.element_id();
        let snap = Duration::from_millis(400);
        let mut timeline = Timeline::new();
        timeline.group(
            [
                TweenSpec::to(id.clone(), Prop::X, token.position.x, snap),
                TweenSpec::to(id.clone(), Prop::Y, token.position.y, snap),
                TweenSpec::to(id, Prop::Rotation, token.rotation, snap),
            ]
            .map(|t| t.ease(Ease::BackOut(1.5))),
            At::End,
        );
        if let Ok(effect) = ctx.orchestrator.play(timeline) {
            self.motions.push(effect);
        }

        self.placed += 1;
        ctx.feedback.pulse(Pulse::Medium);
        self.record_count(ctx);

        if self.placed as usize >= self.tokens.len() {
            return self.complete(ctx);
        }
        Outcome::Progressed
    }

    fn record_count(&self, ctx: &mut StageContext<'_>) {
        if let Err(e) = ctx.store.set(StateKey::PlacementPlacedCount, self.placed) {
            debug!(error = %e, "failed to record placed count");
        }
        ctx.set_text(anchors::PLACEMENT_COUNT, self.placed.to_string());
    }

    fn complete(&mut self, ctx: &mut StageContext<'_>) -> Outcome {
        self.phase = Phase::Completed;
        if let Err(e) = ctx.store.set(StateKey::PlacementCompleted, true) {
            debug!(error = %e, "failed to record placement result");
        }
        info!("placement stage completed");
        ctx.feedback.pulse(Pulse::Success);

        let target = ElementId::from(anchors::PLACEMENT_TARGET);
        let mut bloom = Timeline::new();
        bloom.group(
            [
                TweenSpec::to(target.clone(), Prop::Scale, 1.3, Duration::from_millis(500)),
                TweenSpec::to(target, Prop::Glow, 1.0, Duration::from_millis(500)),
            ],
            At::End,
        );
        for token in &self.tokens {
            bloom.tween(
                TweenSpec::to(token.element_id(), Prop::Glow, 1.0, Duration::from_millis(300)),
                At::Time(Duration::from_millis(100) * token.index as u32),
            );
        }
        let _ = ctx.orchestrator.play(bloom);

        self.settle_timer.arm(ctx.now + self.settle);
        Outcome::Completed
    }

    fn restore_layout(&mut self, ctx: &mut StageContext<'_>) {
        for effect in self.motions.drain(..) {
            ctx.orchestrator.cancel(effect);
        }
        let back = Duration::from_millis(300);
        let mut timeline = Timeline::new();
        for token in &mut self.tokens {
            token.placed = false;
            token.position = token.home;
            token.rotation = token.home_rotation;
            let id = token.element_id();
            timeline.group(
                [
                    TweenSpec::to(id.clone(), Prop::X, token.home.x, back),
                    TweenSpec::to(id.clone(), Prop::Y, token.home.y, back),
                    TweenSpec::to(id, Prop::Rotation, token.home_rotation, back),
                ],
                At::Time(Duration::ZERO),
            );
        }
        let _ = ctx.orchestrator.play(timeline);
    }
}

impl StageController for PlacementStage {
    fn id(&self) -> StageId {
        StageId::Placement
    }

    fn phase(&self) -> Phase {
        self.phase
    }

    fn init(&mut self, ctx: &mut StageContext<'_>) -> Result<(), Fault> {
        if self.phase != Phase::Idle {
            return Ok(());
        }
        ctx.require(&[
            anchors::PLACEMENT_BOARD,
            anchors::PLACEMENT_TARGET,
            anchors::PLACEMENT_COUNT,
        ])?;
        for index in 0..self.tokens.len() {
            ctx.scene().mount_element(token_element(index));
            self.mirror(index, ctx);
        }
        ctx.set_text(anchors::PLACEMENT_COUNT, self.placed.to_string());
        self.phase = if ctx.store.flag(StateKey::PlacementCompleted) {
            Phase::Completed
        } else {
            Phase::Active
        };
        Ok(())
    }

    fn handle_input(&mut self, input: &Input, ctx: &mut StageContext<'_>) -> Outcome {
        match input {
            Input::Press(point) => self.press(point, ctx),
            Input::Move(point) => self.drag(point, ctx),
            Input::Release(point) => self.release(point, ctx),
            Input::Reset => {
                if matches!(self.phase, Phase::Completed | Phase::Idle) {
                    return Outcome::Ignored;
                }
                self.reset(ctx);
                Outcome::Progressed
            }
            Input::Continue if self.revealing => {
                self.revealing = false;
                let _ = ctx.hand_off(StageId::Placement);
                Outcome::Progressed
            }
            _ => Outcome::Ignored,
        }
    }

    fn tick(&mut self, ctx: &mut StageContext<'_>) {
        if self.settle_timer.fire(ctx.now) {
            if self.reveal {
                self.revealing = true;
            } else {
                let _ = ctx.hand_off(StageId::Placement);
            }
        }
    }

    fn reset(&mut self, ctx: &mut StageContext<'_>) {
        if matches!(self.phase, Phase::Completed | Phase::Idle) {
            return;
        }
        self.dragging = None;
        self.phase = Phase::Active;
        self.set_near(false, ctx);
        self.placed = 0;
        self.restore_layout(ctx);
        self.record_count(ctx);
        ctx.feedback.pulse(Pulse::Light);
    }

    fn teardown(&mut self) {
        self.dragging = None;
        self.near = false;
        self.settle_timer.clear();
        self.revealing = false;
        self.motions.clear();
        if self.phase != Phase::Completed {
            self.phase = Phase::Idle;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::testing::Harness;
    use crate::stage::SessionCommand;
    use crate::state::ScreenId;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn config() -> PlacementConfig {
        PlacementConfig {
            seed: Some(7),
            ..PlacementConfig::default()
        }
    }

    fn setup(config: PlacementConfig) -> (Harness, PlacementStage) {
        let mut h = Harness::new(ScreenId::Placement);
        let mut stage = PlacementStage::new(&config);
        stage.init(&mut h.ctx()).unwrap();
        (h, stage)
    }

    fn drag_to(h: &mut Harness, stage: &mut PlacementStage, index: usize, to: Point) -> Outcome {
        let grab = stage.tokens()[index].center();
        stage.handle_input(&Input::Press(grab), &mut h.ctx());
        stage.handle_input(&Input::Move(to), &mut h.ctx());
        stage.handle_input(&Input::Release(to), &mut h.ctx())
    }

    #[test]
    fn test_seeded_layout_is_repeatable() {
        let a = PlacementStage::new(&config());
        let b = PlacementStage::new(&config());
        assert_eq!(a.tokens(), b.tokens());
        assert_eq!(a.tokens().len(), TOKEN_COUNT);
        for token in a.tokens() {
            assert!(token.home_rotation.abs() <= 30.0);
            assert!(token.home.x >= 0.0 && token.home.x <= 360.0 - TOKEN_WIDTH);
        }
    }

    #[test]
    fn test_any_order_completes_once() {
        let (mut h, mut stage) = setup(config());
        let target = stage.target();
        for index in [3, 0, 5, 1, 4] {
            assert_eq!(drag_to(&mut h, &mut stage, index, target), Outcome::Progressed);
        }
        assert_eq!(drag_to(&mut h, &mut stage, 2, target), Outcome::Completed);
        assert!(h.store.flag(StateKey::PlacementCompleted));
        assert_eq!(h.store.value(StateKey::PlacementPlacedCount).as_count(), Some(6));
        assert_eq!(stage.phase(), Phase::Completed);

        // placed tokens can no longer be grabbed
        assert_eq!(drag_to(&mut h, &mut stage, 2, target), Outcome::Ignored);
        for token in stage.tokens() {
            assert_eq!(token.rotation, token.index as f64 * 60.0);
        }
    }

    #[test]
    fn test_repeated_init_completes_and_hands_off_once() {
        let (mut h, mut stage) = setup(config());
        let completions = h.count_changes(StateKey::PlacementCompleted);
        stage.init(&mut h.ctx()).unwrap();
        stage.init(&mut h.ctx()).unwrap();
        assert_eq!(stage.tokens().len(), TOKEN_COUNT);

        let target = stage.target();
        for index in 0..TOKEN_COUNT - 1 {
            assert_eq!(drag_to(&mut h, &mut stage, index, target), Outcome::Progressed);
        }
        assert_eq!(
            drag_to(&mut h, &mut stage, TOKEN_COUNT - 1, target),
            Outcome::Completed
        );
        h.run(&mut stage, ms(1000 + 700));

        assert_eq!(completions.get(), 1);
        assert_eq!(h.commands(), vec![SessionCommand::Activate(StageId::Capture)]);
    }

    #[test]
    fn test_out_of_reach_returns_home() {
        let (mut h, mut stage) = setup(config());
        let home = stage.tokens()[1].home;
        let target = stage.target();
        let outcome = drag_to(&mut h, &mut stage, 1, Point::new(target.x + 61.0, target.y));
        match outcome {
            Outcome::Rejected(Fault::UnreachableTarget { distance, threshold }) => {
                assert!((distance - 61.0).abs() < 1e-9);
                assert_eq!(threshold, 60.0);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(stage.tokens()[1].position, home);
        assert_eq!(stage.placed_count(), 0);
    }

    #[test]
    fn test_near_highlight_during_drag() {
        let (mut h, mut stage) = setup(config());
        let target = stage.target();
        let grab = stage.tokens()[0].center();
        stage.handle_input(&Input::Press(grab), &mut h.ctx());
        stage.handle_input(&Input::Move(Point::new(target.x + 80.0, target.y)), &mut h.ctx());
        assert!(stage.is_near());
        stage.handle_input(&Input::Move(Point::new(target.x + 95.0, target.y)), &mut h.ctx());
        assert!(!stage.is_near());
    }

    #[test]
    fn test_drag_is_clamped_to_board() {
        let (mut h, mut stage) = setup(config());
        let grab = stage.tokens()[0].center();
        stage.handle_input(&Input::Press(grab), &mut h.ctx());
        stage.handle_input(&Input::Move(Point::new(-500.0, 9000.0)), &mut h.ctx());
        let token = &stage.tokens()[0];
        assert_eq!(token.position, Point::new(0.0, 560.0 - TOKEN_HEIGHT));
    }

    #[test]
    fn test_reset_restores_layout_and_count() {
        let (mut h, mut stage) = setup(config());
        let homes: Vec<Point> = stage.tokens().iter().map(|t| t.home).collect();
        let target = stage.target();
        drag_to(&mut h, &mut stage, 0, target);
        drag_to(&mut h, &mut stage, 4, target);
        assert_eq!(stage.placed_count(), 2);

        stage.handle_input(&Input::Reset, &mut h.ctx());
        assert_eq!(stage.placed_count(), 0);
        assert_eq!(h.store.value(StateKey::PlacementPlacedCount).as_count(), Some(0));
        let positions: Vec<Point> = stage.tokens().iter().map(|t| t.position).collect();
        assert_eq!(positions, homes);
        assert!(stage.tokens().iter().all(|t| !t.placed));

        h.run(&mut stage, ms(300));
        let element = h
            .orchestrator
            .scene()
            .element(&token_element(0))
            .unwrap()
            .clone();
        assert!((element.visual.x - homes[0].x).abs() < 1e-9);
    }

    #[test]
    fn test_reveal_waits_for_continue() {
        let (mut h, mut stage) = setup(PlacementConfig {
            reveal: true,
            ..config()
        });
        let target = stage.target();
        for index in 0..TOKEN_COUNT {
            drag_to(&mut h, &mut stage, index, target);
        }
        h.run(&mut stage, ms(1000));
        assert!(stage.is_revealing());
        h.run(&mut stage, ms(3000));
        assert!(!h.orchestrator.is_transitioning());
        assert_eq!(h.store.current_screen(), ScreenId::Intro);

        stage.handle_input(&Input::Continue, &mut h.ctx());
        h.run(&mut stage, ms(900));
        assert_eq!(h.store.current_screen(), ScreenId::Capture);
        assert_eq!(h.commands(), vec![SessionCommand::Activate(StageId::Capture)]);
    }
}
