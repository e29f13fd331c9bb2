//! Round state machine
//!
//! Owns score/health/clock, the active question and its targets, and every
//! timer that can touch them. All waiting runs on a game clock that only moves
//! during countdown and play, so nothing fires while paused and nothing
//! survives gameover or reset.
//!
//! Within one `tick`, work happens in a fixed order: due timers (by deadline,
//! then scheduling order), then the shot, then physics. Whichever of those
//! ends the round first wins; later steps see `GameOver` and do nothing.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;

use super::collision::{ShotResult, resolve_shot};
use super::physics::step_targets;
use super::question::{Question, generate, spawn_targets};
use super::rules::RoundRules;
use super::state::{CooldownState, Phase, RoundEvent, RoundState, Target};
use super::timer::TimerQueue;
use crate::Viewport;
use crate::consts::{CLOCK_PERIOD_MS, FEEDBACK_DELAY_MS, HIT_TOLERANCE, OPTION_COUNT};
use crate::settings::{Difficulty, GameSettings, Operation};

/// Delayed work owned by a round
#[derive(Debug, Clone, Copy, PartialEq)]
enum RoundTimer {
    /// 1 s round clock (score-penalty) or question clock (health)
    Clock,
    /// 1 s countdown step
    Countdown,
    /// Feedback delay after a correct hit
    NextQuestion,
    /// End of the grace window for a wrongly shot target
    RevertShot { target_id: u32 },
}

/// Input for a single tick
#[derive(Debug, Clone, Default)]
pub struct RoundInput {
    /// Where a shot landed this frame, in viewport pixels
    pub shot: Option<Vec2>,
}

/// One round of play
#[derive(Debug, Clone)]
pub struct Round {
    difficulty: Difficulty,
    operation: Operation,
    rules: RoundRules,
    countdown_secs: u32,
    state: RoundState,
    question: Option<Question>,
    targets: Vec<Target>,
    viewport: Viewport,
    cooldown: CooldownState,
    timers: TimerQueue<RoundTimer>,
    rng: Pcg32,
    /// Game clock (ms); frozen outside countdown/playing
    clock_ms: f64,
    /// Wall time of the previous `advance`, if the clock is running
    last_wall_ms: Option<f64>,
    next_target_id: u32,
    /// Set by `reset()`; the next tick performs a cold start
    restart_pending: bool,
    events: Vec<RoundEvent>,
}

impl Round {
    pub fn new(settings: &GameSettings, seed: u64) -> Self {
        let rules = RoundRules::from(settings.rules);
        Self {
            difficulty: settings.difficulty,
            operation: settings.operation,
            state: RoundState::new(&rules),
            rules,
            countdown_secs: settings.countdown_secs,
            question: None,
            targets: Vec::new(),
            viewport: Viewport::default(),
            cooldown: CooldownState::default(),
            timers: TimerQueue::new(),
            rng: Pcg32::seed_from_u64(seed),
            clock_ms: 0.0,
            last_wall_ms: None,
            next_target_id: 1,
            restart_pending: false,
            events: Vec::new(),
        }
    }

    pub fn state(&self) -> &RoundState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn question(&self) -> Option<&Question> {
        self.question.as_ref()
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    pub fn rules(&self) -> &RoundRules {
        &self.rules
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Game clock in ms
    pub fn clock_ms(&self) -> f64 {
        self.clock_ms
    }

    /// Number of timers still scheduled
    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Take everything that happened since the last call
    pub fn drain_events(&mut self) -> Vec<RoundEvent> {
        std::mem::take(&mut self.events)
    }

    /// Begin (cold start) or resume the round
    ///
    /// A cold start happens only when no question exists yet: it resets the
    /// score/health/clock and generates the first question. Resuming from
    /// pause changes nothing but the phase.
    pub fn start(&mut self) {
        match self.state.phase {
            Phase::Idle => {
                // Never generate over an existing question
                if self.question.is_none() {
                    self.state = RoundState::new(&self.rules);
                    self.cooldown = CooldownState::default();
                    self.next_question();
                }

                if self.countdown_secs > 0 {
                    self.state.countdown_left = self.countdown_secs;
                    self.set_phase(Phase::Countdown);
                    self.timers
                        .schedule(self.clock_ms + CLOCK_PERIOD_MS, RoundTimer::Countdown);
                } else {
                    self.begin_playing();
                }
            }
            Phase::Paused => {
                self.last_wall_ms = None;
                self.set_phase(Phase::Playing);
            }
            Phase::Countdown | Phase::Playing | Phase::GameOver => {}
        }
    }

    /// Freeze the round. Only valid while playing; touches nothing but the phase.
    pub fn pause(&mut self) {
        if self.state.phase == Phase::Playing {
            self.last_wall_ms = None;
            self.set_phase(Phase::Paused);
        }
    }

    /// Throw the round away and queue a fresh start on the next tick
    pub fn reset(&mut self) {
        self.timers.clear();
        self.question = None;
        self.targets.clear();
        self.cooldown = CooldownState::default();
        self.last_wall_ms = None;

        let phase = self.state.phase;
        self.state = RoundState::new(&self.rules);
        self.state.phase = phase;
        self.set_phase(Phase::Idle);

        self.restart_pending = true;
        log::info!("Round reset");
    }

    /// Stop for good: drop every timer and the question without queuing a
    /// restart. Later ticks do nothing.
    pub fn teardown(&mut self) {
        self.timers.clear();
        self.question = None;
        self.targets.clear();
        self.last_wall_ms = None;
        self.restart_pending = false;
        self.set_phase(Phase::Idle);
    }

    /// Advance to wall time `now_ms`. Intended to be called once per frame.
    pub fn advance(&mut self, now_ms: f64, input: &RoundInput) {
        let delta = match self.last_wall_ms {
            Some(last) => (now_ms - last).max(0.0),
            None => 0.0,
        };
        self.last_wall_ms = Some(now_ms);
        self.tick(delta, input);
    }

    /// Advance by `delta_ms` of wall time
    pub fn tick(&mut self, delta_ms: f64, input: &RoundInput) {
        if self.restart_pending {
            self.restart_pending = false;
            self.start();
        }

        if !matches!(self.state.phase, Phase::Countdown | Phase::Playing) {
            return;
        }

        self.clock_ms += delta_ms;
        self.fire_due_timers();

        if self.state.phase != Phase::Playing {
            return;
        }

        if let Some(point) = input.shot {
            self.shoot(point);
        }

        if self.state.phase == Phase::Playing {
            step_targets(&mut self.targets, self.viewport, delta_ms);
        }
    }

    fn fire_due_timers(&mut self) {
        while let Some((at, timer)) = self.timers.pop_due(self.clock_ms) {
            self.on_timer(at, timer);
        }
    }

    fn on_timer(&mut self, at: f64, timer: RoundTimer) {
        match timer {
            RoundTimer::Countdown => {
                self.state.countdown_left = self.state.countdown_left.saturating_sub(1);
                self.events.push(RoundEvent::CountdownTick {
                    remaining: self.state.countdown_left,
                });
                if self.state.countdown_left == 0 {
                    self.begin_playing_at(at);
                } else {
                    self.timers.schedule(at + CLOCK_PERIOD_MS, RoundTimer::Countdown);
                }
            }
            RoundTimer::Clock => {
                self.state.time_left = self.state.time_left.saturating_sub(1);
                if self.state.time_left > 0 {
                    self.timers.schedule(at + CLOCK_PERIOD_MS, RoundTimer::Clock);
                    return;
                }

                match &self.rules {
                    RoundRules::ScorePenalty(_) => {
                        log::info!("Round clock expired");
                        self.game_over();
                    }
                    RoundRules::Health(r) => {
                        let damage = r.timeout_damage;
                        log::info!("Question timed out");
                        self.events.push(RoundEvent::QuestionTimedOut);
                        if self.damage(damage) {
                            self.next_question();
                        }
                    }
                }
            }
            RoundTimer::NextQuestion => self.next_question(),
            RoundTimer::RevertShot { target_id } => {
                if let Some(target) = self.targets.iter_mut().find(|t| t.id == target_id) {
                    target.is_shot = false;
                    self.events.push(RoundEvent::TargetReverted { target_id });
                }
            }
        }
    }

    fn begin_playing(&mut self) {
        self.begin_playing_at(self.clock_ms);
    }

    fn begin_playing_at(&mut self, at: f64) {
        self.set_phase(Phase::Playing);
        if !self.timers.contains(|t| *t == RoundTimer::Clock) {
            self.timers.schedule(at + CLOCK_PERIOD_MS, RoundTimer::Clock);
        }
    }

    /// Replace the question and its targets wholesale
    fn next_question(&mut self) {
        self.timers.cancel_where(|t| {
            matches!(t, RoundTimer::NextQuestion | RoundTimer::RevertShot { .. })
        });

        let question = generate(self.difficulty, self.operation, &mut self.rng);
        self.targets = spawn_targets(
            &question,
            self.difficulty,
            self.viewport,
            self.next_target_id,
            &mut self.rng,
        );
        self.next_target_id += OPTION_COUNT as u32;

        // Health rules give every question its own clock
        if let RoundRules::Health(r) = &self.rules {
            self.state.time_left = r.question_secs;
            self.timers.cancel_where(|t| *t == RoundTimer::Clock);
            if self.state.phase == Phase::Playing {
                self.timers
                    .schedule(self.clock_ms + CLOCK_PERIOD_MS, RoundTimer::Clock);
            }
        }

        self.events.push(RoundEvent::QuestionGenerated {
            prompt: question.prompt.clone(),
        });
        self.question = Some(question);
    }

    /// Resolve a shot at `point` (viewport pixels)
    fn shoot(&mut self, point: Vec2) -> Option<ShotResult> {
        if self.state.phase != Phase::Playing || self.question.is_none() {
            return None;
        }
        if !self.cooldown.try_fire(self.clock_ms) {
            log::debug!("Shot ignored, still reloading");
            return None;
        }

        let result = resolve_shot(&self.targets, point, HIT_TOLERANCE);
        match result {
            ShotResult::Miss => {}
            ShotResult::Hit {
                target_id,
                correct: true,
                ..
            } => {
                // Already solved; waiting on the next question
                if self.timers.contains(|t| *t == RoundTimer::NextQuestion) {
                    return Some(result);
                }

                let points = self.rules.points(self.difficulty);
                self.state.score = self.state.score.saturating_add(points);
                self.events.push(RoundEvent::CorrectHit { target_id, points });
                self.timers
                    .schedule(self.clock_ms + FEEDBACK_DELAY_MS, RoundTimer::NextQuestion);

                // The question clock stops once it's answered
                if self.rules.is_health() {
                    self.timers.cancel_where(|t| *t == RoundTimer::Clock);
                }
            }
            ShotResult::Hit {
                index,
                target_id,
                correct: false,
            } => {
                self.events.push(RoundEvent::WrongHit { target_id });
                match &self.rules {
                    RoundRules::ScorePenalty(r) => {
                        let penalty = r.penalty[self.difficulty.tier()];
                        self.state.score = self.state.score.saturating_sub(penalty);
                    }
                    RoundRules::Health(r) => {
                        let (grace, damage) = (r.shot_grace_ms, r.miss_damage);
                        self.targets[index].is_shot = true;
                        self.timers.cancel_where(
                            |t| *t == RoundTimer::RevertShot { target_id },
                        );
                        self.timers.schedule(
                            self.clock_ms + grace,
                            RoundTimer::RevertShot { target_id },
                        );
                        self.damage(damage);
                    }
                }
            }
        }

        Some(result)
    }

    /// Take health; ends the round at zero. Returns true if still alive.
    fn damage(&mut self, amount: f32) -> bool {
        self.state.health = (self.state.health - amount).max(0.0);
        if self.state.health <= 0.0 {
            self.game_over();
            false
        } else {
            true
        }
    }

    fn game_over(&mut self) {
        if self.state.phase == Phase::GameOver {
            return;
        }
        self.timers.clear();
        self.set_phase(Phase::GameOver);
        self.events.push(RoundEvent::GameOver {
            score: self.state.score,
        });
        log::info!("Game over, final score {}", self.state.score);
    }

    fn set_phase(&mut self, to: Phase) {
        let from = self.state.phase;
        if from == to {
            return;
        }
        self.state.phase = to;
        self.events.push(RoundEvent::PhaseChanged { from, to });
        log::info!("Phase {:?} -> {:?}", from, to);
    }
}
