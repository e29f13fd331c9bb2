//! Input sources
//!
//! Gesture, mouse and touch all reduce to the same [`InputEvent`]: a
//! normalized cursor plus `armed` / `trigger` flags. The round never sees which
//! device produced it.

pub mod gesture;
pub mod pointer;

use glam::Vec2;
use serde::{Deserialize, Serialize};

pub use gesture::{
    ConnectionState, ConnectionStatus, ControlAction, ControlMessage, GestureClient, GestureFrame,
    SocketId, TransportCommand,
};
pub use pointer::{ClientRect, PointerAdapter};

use crate::settings::{GameSettings, InputMethod};

/// One frame of device-independent input
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InputEvent {
    pub source: InputMethod,
    /// Normalized [0,1]² position, `None` when nothing is tracked
    pub cursor: Option<Vec2>,
    pub armed: bool,
    /// Level signal; the game detects the rising edge
    pub trigger: bool,
}

impl InputEvent {
    pub fn neutral(source: InputMethod) -> Self {
        Self {
            source,
            cursor: None,
            armed: false,
            trigger: false,
        }
    }
}

/// The active input source. Exactly one exists per game.
#[derive(Debug, Clone)]
pub enum InputSource {
    Gesture(GestureClient),
    Pointer(PointerAdapter),
}

impl InputSource {
    pub fn from_settings(settings: &GameSettings) -> Self {
        match settings.input_method {
            InputMethod::Gesture => Self::Gesture(GestureClient::new(settings.endpoint.clone())),
            method => Self::Pointer(PointerAdapter::new(method)),
        }
    }

    pub fn method(&self) -> InputMethod {
        match self {
            Self::Gesture(_) => InputMethod::Gesture,
            Self::Pointer(pointer) => pointer.method(),
        }
    }

    pub fn produce(&self, now: f64) -> InputEvent {
        match self {
            Self::Gesture(client) => client.produce(),
            Self::Pointer(pointer) => pointer.produce(now),
        }
    }

    pub fn gesture(&self) -> Option<&GestureClient> {
        match self {
            Self::Gesture(client) => Some(client),
            Self::Pointer(_) => None,
        }
    }

    pub fn gesture_mut(&mut self) -> Option<&mut GestureClient> {
        match self {
            Self::Gesture(client) => Some(client),
            Self::Pointer(_) => None,
        }
    }

    pub fn pointer_mut(&mut self) -> Option<&mut PointerAdapter> {
        match self {
            Self::Pointer(pointer) => Some(pointer),
            Self::Gesture(_) => None,
        }
    }

    /// Next latched pointer press. `None` for gesture input, which is
    /// edge-triggered from frames instead.
    pub fn take_press(&mut self) -> Option<Vec2> {
        self.pointer_mut().and_then(PointerAdapter::take_press)
    }

    /// Pointer input has no connection to lose
    pub fn connected(&self) -> bool {
        self.gesture().is_none_or(GestureClient::connected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_follows_settings() {
        let mut settings = GameSettings::default();
        let source = InputSource::from_settings(&settings);
        assert_eq!(source.method(), InputMethod::Gesture);
        assert!(!source.connected());

        settings.input_method = InputMethod::Touch;
        let mut source = InputSource::from_settings(&settings);
        assert_eq!(source.method(), InputMethod::Touch);
        assert!(source.connected());
        assert!(source.gesture_mut().is_none());
        assert!(source.pointer_mut().is_some());
    }

    #[test]
    fn test_pointer_source_is_always_armed() {
        let settings = GameSettings {
            input_method: InputMethod::Mouse,
            ..GameSettings::default()
        };
        let event = InputSource::from_settings(&settings).produce(0.0);
        assert!(event.armed);
        assert_eq!(event.cursor, Some(Vec2::splat(0.5)));
    }
}
