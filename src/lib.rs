//! Math Shot - A math shooting arcade game driven by hand gestures, mouse or touch
//!
//! Core modules:
//! - `sim`: Round simulation (questions, target physics, scoring, timers)
//! - `input`: Input producers (gesture socket client, pointer adapter)
//! - `game`: Per-session coordinator wiring input into the round
//! - `platform`: Browser glue (WebSocket, DOM listeners, frame loop)
//! - `settings`: Difficulty / operation / input method configuration

pub mod error;
pub mod game;
pub mod input;
pub mod platform;
pub mod settings;
pub mod sim;

pub use error::{ProtocolError, SettingsError};
pub use game::{FrameView, Game, Rating};
pub use input::{InputEvent, InputSource};
pub use settings::{Difficulty, GameSettings, InputMethod, Operation, RuleSet};

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Nominal frame length the target velocities are expressed against (ms)
    pub const NOMINAL_FRAME_MS: f64 = 16.0;
    /// Largest frame delta fed to physics (ms), so a stalled tab can't tunnel targets
    pub const MAX_FRAME_MS: f64 = 100.0;

    /// Target defaults
    pub const TARGET_RADIUS: f32 = 40.0;
    /// Radius of the circle targets are spawned on, around the viewport center
    pub const SPAWN_CIRCLE_RADIUS: f32 = 150.0;
    /// Number of options (and targets) per question
    pub const OPTION_COUNT: usize = 4;

    /// Extra slack around a target that still counts as a hit (px)
    pub const HIT_TOLERANCE: f32 = 15.0;
    /// Minimum spacing between two resolved shots (ms)
    pub const SHOT_COOLDOWN_MS: f64 = 500.0;
    /// Delay between a correct hit and the next question (ms)
    pub const FEEDBACK_DELAY_MS: f64 = 300.0;
    /// Cadence of the round / question clock (ms)
    pub const CLOCK_PERIOD_MS: f64 = 1000.0;

    /// Pointer trigger pulse rules
    pub const POINTER_COOLDOWN_MS: f64 = 100.0;
    pub const POINTER_PULSE_MS: f64 = 50.0;

    /// Gesture socket defaults
    pub const GESTURE_ENDPOINT: &str = "ws://localhost:8765";
    pub const RECONNECT_DELAY_MS: f64 = 3000.0;
    pub const CONNECT_TIMEOUT_MS: f64 = 5000.0;
    pub const CONTROL_DEBOUNCE_MS: f64 = 100.0;
    pub const CONTROL_COOLDOWN_MS: f64 = 500.0;

    /// WebSocket close codes
    pub const CLOSE_NORMAL: u16 = 1000;
    /// Application close code used when the open handshake times out
    pub const CLOSE_CONNECT_TIMEOUT: u16 = 4008;
}

/// Size of the element the game is played in (CSS pixels)
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width / 2.0, self.height / 2.0)
    }

    /// Convert a normalized [0,1]² position to viewport pixels
    #[inline]
    pub fn denormalize(&self, normalized: Vec2) -> Vec2 {
        Vec2::new(normalized.x * self.width, normalized.y * self.height)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1280.0, 720.0)
    }
}
