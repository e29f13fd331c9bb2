//! Round rule tables
//!
//! Two incompatible rule sets exist and each keeps its own constants. Tables
//! are indexed by `Difficulty::tier()`.

use serde::{Deserialize, Serialize};

use crate::settings::{Difficulty, RuleSet};

/// Misses cost points; one clock for the whole round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScorePenaltyRules {
    /// Points per correct hit
    pub points: [u32; 3],
    /// Points lost per wrong hit (score never drops below 0)
    pub penalty: [u32; 3],
    /// Length of the round
    pub round_secs: u32,
}

impl Default for ScorePenaltyRules {
    fn default() -> Self {
        Self {
            points: [10, 20, 30],
            penalty: [5, 10, 15],
            round_secs: 60,
        }
    }
}

/// Misses cost health; each question has its own clock
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthRules {
    /// Points per correct hit
    pub points: [u32; 3],
    /// Starting (and maximum) health
    pub max_health: f32,
    /// Health lost per wrong hit
    pub miss_damage: f32,
    /// Health lost when a question runs out of time
    pub timeout_damage: f32,
    /// Time allowed per question
    pub question_secs: u32,
    /// How long a wrongly shot target stays marked
    pub shot_grace_ms: f64,
}

impl Default for HealthRules {
    fn default() -> Self {
        Self {
            points: [10, 20, 30],
            max_health: 6.0,
            miss_damage: 0.5,
            timeout_damage: 1.0,
            question_secs: 20,
            shot_grace_ms: 1500.0,
        }
    }
}

/// The rule set a round runs under
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RoundRules {
    ScorePenalty(ScorePenaltyRules),
    Health(HealthRules),
}

impl Default for RoundRules {
    fn default() -> Self {
        RoundRules::ScorePenalty(ScorePenaltyRules::default())
    }
}

impl From<RuleSet> for RoundRules {
    fn from(set: RuleSet) -> Self {
        match set {
            RuleSet::ScorePenalty => RoundRules::ScorePenalty(ScorePenaltyRules::default()),
            RuleSet::Health => RoundRules::Health(HealthRules::default()),
        }
    }
}

impl RoundRules {
    pub fn points(&self, difficulty: Difficulty) -> u32 {
        match self {
            RoundRules::ScorePenalty(r) => r.points[difficulty.tier()],
            RoundRules::Health(r) => r.points[difficulty.tier()],
        }
    }

    /// Health a fresh round starts with
    pub fn starting_health(&self) -> f32 {
        match self {
            // Health isn't in play, keep it full for display
            RoundRules::ScorePenalty(_) => HealthRules::default().max_health,
            RoundRules::Health(r) => r.max_health,
        }
    }

    /// Value the visible clock starts from: the round for score-penalty,
    /// the current question for health
    pub fn clock_secs(&self) -> u32 {
        match self {
            RoundRules::ScorePenalty(r) => r.round_secs,
            RoundRules::Health(r) => r.question_secs,
        }
    }

    pub fn is_health(&self) -> bool {
        matches!(self, RoundRules::Health(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_are_separate() {
        let score = RoundRules::from(RuleSet::ScorePenalty);
        let health = RoundRules::from(RuleSet::Health);

        assert_eq!(score.clock_secs(), 60);
        assert_eq!(health.clock_secs(), 20);
        assert_eq!(score.points(Difficulty::Easy), 10);
        assert_eq!(health.points(Difficulty::Hard), 30);
        assert_eq!(health.starting_health(), 6.0);
        assert!(health.is_health());
        assert!(!score.is_health());
    }
}
