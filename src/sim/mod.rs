//! Round simulation module
//!
//! All gameplay logic lives here. Nothing in this module touches the browser:
//! - Time comes in as milliseconds from the caller
//! - Seeded RNG only
//! - Targets are iterated in list order

pub mod collision;
pub mod physics;
pub mod question;
pub mod round;
pub mod rules;
pub mod state;
pub mod timer;

pub use collision::{ShotResult, resolve_shot, sd_circle, shot_hits};
pub use physics::{Bounce, step_target, step_targets};
pub use question::{BinOp, Expr, Question, generate, spawn_targets};
pub use round::{Round, RoundInput};
pub use rules::{HealthRules, RoundRules, ScorePenaltyRules};
pub use state::{CooldownState, Phase, RoundEvent, RoundState, Target};
pub use timer::{TimerId, TimerQueue};
