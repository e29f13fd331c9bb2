//! Mouse / touch input
//!
//! Browser listeners feed raw client coordinates in here; the adapter keeps the
//! latest normalized cursor and turns presses into short trigger pulses.

use std::collections::VecDeque;

use glam::Vec2;

use super::InputEvent;
use crate::consts::{POINTER_COOLDOWN_MS, POINTER_PULSE_MS};
use crate::settings::InputMethod;

/// Bounding box of the element pointer coordinates are relative to
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClientRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl ClientRect {
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Map client coordinates into [0,1]², clamping at the edges.
    /// `None` for a collapsed element.
    pub fn normalize(&self, client: Vec2) -> Option<Vec2> {
        if self.width <= 0.0 || self.height <= 0.0 {
            return None;
        }
        let x = (client.x - self.left) / self.width;
        let y = (client.y - self.top) / self.height;
        Some(Vec2::new(x.clamp(0.0, 1.0), y.clamp(0.0, 1.0)))
    }
}

/// Primary mouse button as reported by `MouseEvent.button`
pub const PRIMARY_BUTTON: i16 = 0;

/// Accepted presses held for the game loop before the oldest is dropped
const MAX_PENDING_PRESSES: usize = 8;

/// Pointer adapter for the configured method
///
/// Handlers for the other method are ignored, so an inactive adapter only
/// ever yields neutral events.
#[derive(Debug, Clone)]
pub struct PointerAdapter {
    method: InputMethod,
    cursor: Vec2,
    last_pulse_at: Option<f64>,
    pulse_until: f64,
    /// Cursor of every accepted press not yet taken as a shot
    pending: VecDeque<Vec2>,
}

impl PointerAdapter {
    pub fn new(method: InputMethod) -> Self {
        Self {
            method,
            cursor: Vec2::splat(0.5),
            last_pulse_at: None,
            pulse_until: f64::NEG_INFINITY,
            pending: VecDeque::new(),
        }
    }

    pub fn method(&self) -> InputMethod {
        self.method
    }

    fn accepts(&self, method: InputMethod) -> bool {
        self.method == method && method != InputMethod::Gesture
    }

    fn set_cursor(&mut self, client: Vec2, rect: ClientRect) {
        if let Some(normalized) = rect.normalize(client) {
            self.cursor = normalized;
        }
    }

    /// Start a trigger pulse unless the previous one was too recent.
    /// An accepted press is also latched until [`take_press`](Self::take_press).
    fn pulse(&mut self, now: f64) -> bool {
        if self
            .last_pulse_at
            .is_some_and(|last| now - last < POINTER_COOLDOWN_MS)
        {
            return false;
        }
        self.last_pulse_at = Some(now);
        self.pulse_until = now + POINTER_PULSE_MS;

        if self.pending.len() == MAX_PENDING_PRESSES {
            self.pending.pop_front();
        }
        self.pending.push_back(self.cursor);
        true
    }

    /// Oldest accepted press not yet consumed, with the cursor it was made at.
    /// Independent of frame timing, unlike the `trigger` pulse.
    pub fn take_press(&mut self) -> Option<Vec2> {
        self.pending.pop_front()
    }

    pub fn on_mouse_move(&mut self, client: Vec2, rect: ClientRect) {
        if self.accepts(InputMethod::Mouse) {
            self.set_cursor(client, rect);
        }
    }

    /// Returns true if a trigger pulse started
    pub fn on_mouse_down(&mut self, button: i16, client: Vec2, rect: ClientRect, now: f64) -> bool {
        if !self.accepts(InputMethod::Mouse) || button != PRIMARY_BUTTON {
            return false;
        }
        self.set_cursor(client, rect);
        self.pulse(now)
    }

    /// `first_touch` is the first entry of `TouchEvent.touches`, if any
    pub fn on_touch_start(&mut self, first_touch: Option<Vec2>, rect: ClientRect, now: f64) -> bool {
        if !self.accepts(InputMethod::Touch) {
            return false;
        }
        let Some(touch) = first_touch else {
            return false;
        };
        self.set_cursor(touch, rect);
        self.pulse(now)
    }

    pub fn on_touch_move(&mut self, first_touch: Option<Vec2>, rect: ClientRect) {
        if !self.accepts(InputMethod::Touch) {
            return;
        }
        if let Some(touch) = first_touch {
            self.set_cursor(touch, rect);
        }
    }

    /// Latest input; the trigger reads true only inside the pulse window
    pub fn produce(&self, now: f64) -> InputEvent {
        if !self.accepts(self.method) {
            return InputEvent::neutral(self.method);
        }
        InputEvent {
            source: self.method,
            cursor: Some(self.cursor),
            armed: true,
            trigger: now < self.pulse_until,
        }
    }
}
