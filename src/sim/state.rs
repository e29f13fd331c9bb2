//! Round state and core simulation types

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::rules::RoundRules;
use crate::consts::SHOT_COOLDOWN_MS;

/// Current phase of a round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Nothing started yet (or just reset)
    Idle,
    /// Counting down before play; targets visible but frozen
    Countdown,
    /// Active gameplay
    Playing,
    /// Round is paused
    Paused,
    /// Round ended; only `reset()` leaves this
    GameOver,
}

/// A floating answer bubble
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub id: u32,
    pub value: i64,
    pub pos: Vec2,
    /// Pixels per nominal frame
    pub vel: Vec2,
    pub radius: f32,
    pub is_correct: bool,
    /// Marked after a wrong hit, until the grace window ends
    pub is_shot: bool,
}

/// Score / health / clock as shown to the player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundState {
    pub score: u32,
    pub health: f32,
    /// Seconds left on the round clock (score-penalty) or question clock (health)
    pub time_left: u32,
    /// Seconds left in the countdown phase
    pub countdown_left: u32,
    pub phase: Phase,
}

impl RoundState {
    pub fn new(rules: &RoundRules) -> Self {
        Self {
            score: 0,
            health: rules.starting_health(),
            time_left: rules.clock_secs(),
            countdown_left: 0,
            phase: Phase::Idle,
        }
    }
}

/// Shot rate limiting, threaded through shot resolution
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CooldownState {
    /// Game-clock time of the last accepted shot
    pub last_shot_at: Option<f64>,
    pub cooldown_ms: f64,
}

impl Default for CooldownState {
    fn default() -> Self {
        Self {
            last_shot_at: None,
            cooldown_ms: SHOT_COOLDOWN_MS,
        }
    }
}

impl CooldownState {
    /// True while a shot at `now` must be ignored
    pub fn is_reloading(&self, now: f64) -> bool {
        self.last_shot_at
            .is_some_and(|last| now - last < self.cooldown_ms)
    }

    /// Try to take a shot at `now`. Returns false (and changes nothing)
    /// while still reloading.
    pub fn try_fire(&mut self, now: f64) -> bool {
        if self.is_reloading(now) {
            return false;
        }
        self.last_shot_at = Some(now);
        true
    }
}

/// Something that happened during a round, for audio/visual collaborators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RoundEvent {
    QuestionGenerated { prompt: String },
    CorrectHit { target_id: u32, points: u32 },
    WrongHit { target_id: u32 },
    TargetReverted { target_id: u32 },
    QuestionTimedOut,
    CountdownTick { remaining: u32 },
    PhaseChanged { from: Phase, to: Phase },
    GameOver { score: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cooldown_blocks_until_elapsed() {
        let mut cd = CooldownState::default();
        assert!(cd.try_fire(1000.0));
        assert!(cd.is_reloading(1100.0));
        assert!(!cd.try_fire(1499.0));
        // A rejected shot must not extend the cooldown
        assert!(cd.try_fire(1500.0));
        assert_eq!(cd.last_shot_at, Some(1500.0));
    }

    #[test]
    fn test_new_round_state() {
        let state = RoundState::new(&RoundRules::default());
        assert_eq!(state.phase, Phase::Idle);
        assert_eq!(state.score, 0);
        assert_eq!(state.time_left, 60);
    }
}
