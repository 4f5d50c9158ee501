//! Answer stage: type the secret and submit it

use std::time::Duration;

use tracing::{debug, info};

use super::{Input, Outcome, Phase, StageContext, StageController, Timer};
use crate::config::AnswerConfig;
use crate::error::Fault;
use crate::feedback::Pulse;
use crate::state::{StageId, StateKey};
use crate::transition::{anchors, EffectId, ShakeOptions, TypewriterOptions};

pub const PROMPT_EMPTY: &str = "Enter an answer!";
pub const WRONG: &str = "Wrong! Try again...";
pub const CORRECT: &str = "Correct!";

#[derive(Debug)]
pub struct AnswerStage {
    secret: String,
    question: String,
    clear_delay: Duration,
    settle: Duration,
    phase: Phase,
    input: String,
    attempts: u32,
    /// Shake still running on the input, if any
    shake: Option<EffectId>,
    clear_timer: Timer,
    settle_timer: Timer,
}

impl AnswerStage {
    pub fn new(config: &AnswerConfig) -> Self {
        Self {
            secret: normalize(&config.secret),
            question: config.question.clone(),
            clear_delay: Duration::from_millis(config.clear_ms),
            settle: Duration::from_millis(config.settle_ms),
            phase: Phase::Idle,
            input: String::new(),
            attempts: 0,
            shake: None,
            clear_timer: Timer::default(),
            settle_timer: Timer::default(),
        }
    }

    /// Submissions that were evaluated; empty ones do not count
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    fn edit(&mut self, text: &str, ctx: &mut StageContext<'_>) -> Outcome {
        if self.phase != Phase::Active {
            return Outcome::Ignored;
        }
        self.input = text.to_string();
        ctx.set_text(anchors::ANSWER_INPUT, text);
        ctx.set_text(anchors::ANSWER_FEEDBACK, "");
        Outcome::Progressed
    }

    fn submit(&mut self, ctx: &mut StageContext<'_>) -> Outcome {
        if self.phase != Phase::Active {
            return Outcome::Ignored;
        }
        let answer = normalize(&self.input);
        if answer.is_empty() {
            ctx.set_text(anchors::ANSWER_FEEDBACK, PROMPT_EMPTY);
            ctx.feedback.pulse(Pulse::Light);
            return Outcome::Rejected(Fault::ValidationFailure("empty answer".into()));
        }

        self.phase = Phase::Validating;
        self.attempts += 1;
        if answer == self.secret {
            self.accept(ctx)
        } else {
            self.refuse(ctx)
        }
    }

    fn accept(&mut self, ctx: &mut StageContext<'_>) -> Outcome {
        self.phase = Phase::Completed;
        self.clear_timer.clear();
        if let Err(e) = ctx.store.set(StateKey::AnswerCompleted, true) {
            debug!(error = %e, "failed to record answer result");
        }
        info!(attempts = self.attempts, "answer stage completed");

        ctx.feedback.pulse(Pulse::Success);
        ctx.set_text(anchors::ANSWER_FEEDBACK, CORRECT);
        if let Some(input) = ctx.scene().element_mut(&anchors::ANSWER_INPUT.into()) {
            input.tint = Some("green".to_string());
        }
        self.settle_timer.arm(ctx.now + self.settle);
        Outcome::Completed
    }

    fn refuse(&mut self, ctx: &mut StageContext<'_>) -> Outcome {
        self.phase = Phase::Active;
        debug!(attempts = self.attempts, "wrong answer");
        ctx.feedback.pulse(Pulse::Heavy);
        if let Some(previous) = self.shake.take() {
            ctx.orchestrator.cancel(previous);
        }
        self.shake = ctx
            .orchestrator
            .shake(anchors::ANSWER_INPUT, &ShakeOptions::default())
            .ok();
        ctx.set_text(anchors::ANSWER_FEEDBACK, WRONG);
        self.clear_timer.arm(ctx.now + self.clear_delay);
        Outcome::Rejected(Fault::ValidationFailure("wrong answer".into()))
    }
}

fn normalize(answer: &str) -> String {
    answer.trim().to_lowercase()
}

impl StageController for AnswerStage {
    fn id(&self) -> StageId {
        StageId::Answer
    }

    fn phase(&self) -> Phase {
        self.phase
    }

    fn init(&mut self, ctx: &mut StageContext<'_>) -> Result<(), Fault> {
        if self.phase != Phase::Idle {
            return Ok(());
        }
        ctx.require(&[
            anchors::ANSWER_QUESTION,
            anchors::ANSWER_INPUT,
            anchors::ANSWER_FEEDBACK,
        ])?;
        let _ = ctx.orchestrator.typewriter(
            anchors::ANSWER_QUESTION,
            &self.question,
            &TypewriterOptions::default(),
        );
        ctx.set_text(anchors::ANSWER_INPUT, self.input.clone());
        self.phase = if ctx.store.flag(StateKey::AnswerCompleted) {
            Phase::Completed
        } else {
            Phase::Active
        };
        Ok(())
    }

    fn handle_input(&mut self, input: &Input, ctx: &mut StageContext<'_>) -> Outcome {
        match input {
            Input::Text(text) => self.edit(text, ctx),
            Input::Submit => self.submit(ctx),
            Input::Reset => {
                self.reset(ctx);
                Outcome::Progressed
            }
            _ => Outcome::Ignored,
        }
    }

    fn tick(&mut self, ctx: &mut StageContext<'_>) {
        if self.clear_timer.fire(ctx.now) {
            self.input.clear();
            ctx.set_text(anchors::ANSWER_INPUT, "");
        }
        if self.settle_timer.fire(ctx.now) {
            let _ = ctx.hand_off(StageId::Answer);
        }
    }

    fn reset(&mut self, ctx: &mut StageContext<'_>) {
        if matches!(self.phase, Phase::Completed | Phase::Idle) {
            return;
        }
        self.input.clear();
        self.clear_timer.clear();
        ctx.set_text(anchors::ANSWER_INPUT, "");
        ctx.set_text(anchors::ANSWER_FEEDBACK, "");
    }

    fn teardown(&mut self) {
        self.shake = None;
        self.clear_timer.clear();
        self.settle_timer.clear();
        if self.phase != Phase::Completed {
            self.phase = Phase::Idle;
            self.input.clear();
            self.attempts = 0;
        }
    }
}
