//! Gesture server client
//!
//! The hand tracker streams JSON frames over a WebSocket and accepts START /
//! PAUSE control messages. This module holds the connection state machine with
//! no I/O of its own: the platform layer performs the [`TransportCommand`]s it
//! returns and reports socket events back, tagged with the [`SocketId`] they
//! belong to. Events from an older socket are ignored.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::InputEvent;
use crate::consts::{
    CLOSE_CONNECT_TIMEOUT, CLOSE_NORMAL, CONNECT_TIMEOUT_MS, CONTROL_COOLDOWN_MS,
    CONTROL_DEBOUNCE_MS, RECONNECT_DELAY_MS,
};
use crate::error::ProtocolError;
use crate::settings::InputMethod;
use crate::sim::TimerQueue;

/// One tracking frame from the server
///
/// `x`/`y` are the normalized crosshair position, absent while no hand is seen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GestureFrame {
    #[serde(default)]
    pub x: Option<f64>,
    #[serde(default)]
    pub y: Option<f64>,
    pub armed: bool,
    pub shoot: bool,
}

impl GestureFrame {
    /// Crosshair clamped to [0,1]², if both coordinates are present
    pub fn cursor(&self) -> Option<Vec2> {
        match (self.x, self.y) {
            (Some(x), Some(y)) if x.is_finite() && y.is_finite() => Some(Vec2::new(
                x.clamp(0.0, 1.0) as f32,
                y.clamp(0.0, 1.0) as f32,
            )),
            _ => None,
        }
    }
}

pub fn decode_frame(text: &str) -> Result<GestureFrame, ProtocolError> {
    serde_json::from_str(text).map_err(ProtocolError::MalformedFrame)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ControlAction {
    Start,
    Pause,
}

impl ControlAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ControlAction::Start => "START",
            ControlAction::Pause => "PAUSE",
        }
    }
}

/// Client-to-server message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum ControlMessage {
    Control { action: ControlAction },
}

impl ControlMessage {
    pub fn encode(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(ProtocolError::Encode)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectionState {
    pub status: ConnectionStatus,
    /// Reconnects scheduled since the last successful open
    pub reconnect_attempt: u32,
    pub last_sent_action: Option<ControlAction>,
    pub last_sent_at: Option<f64>,
}

/// Delay before reconnecting after a close, `None` for a clean close
pub fn reconnect_delay(close_code: u16) -> Option<f64> {
    (close_code != CLOSE_NORMAL).then_some(RECONNECT_DELAY_MS)
}

/// Generation id of one WebSocket instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SocketId(pub u32);

/// Side effect for the platform to perform
#[derive(Debug, Clone, PartialEq)]
pub enum TransportCommand {
    Open {
        socket: SocketId,
        url: String,
    },
    Close {
        socket: SocketId,
        code: u16,
        reason: &'static str,
    },
    Send {
        socket: SocketId,
        text: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TransportTimer {
    Reconnect,
    ConnectTimeout,
    SendControl(ControlAction),
}

#[derive(Debug, Clone)]
pub struct GestureClient {
    url: String,
    state: ConnectionState,
    socket: Option<SocketId>,
    next_socket: u32,
    enabled: bool,
    frame: Option<GestureFrame>,
    timers: TimerQueue<TransportTimer>,
}

impl GestureClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            state: ConnectionState::default(),
            socket: None,
            next_socket: 1,
            enabled: true,
            frame: None,
            timers: TimerQueue::new(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    pub fn status(&self) -> ConnectionStatus {
        self.state.status
    }

    pub fn connected(&self) -> bool {
        self.state.status == ConnectionStatus::Connected
    }

    pub fn latest_frame(&self) -> Option<&GestureFrame> {
        self.frame.as_ref()
    }

    /// Earliest time [`poll`](Self::poll) has work to do
    pub fn next_deadline(&self) -> Option<f64> {
        self.timers.next_deadline()
    }

    fn is_current(&self, socket: SocketId) -> bool {
        self.enabled && self.socket == Some(socket)
    }

    /// Open a socket unless one is already open or in flight
    pub fn connect(&mut self, now: f64) -> Option<TransportCommand> {
        if !self.enabled || self.state.status != ConnectionStatus::Disconnected {
            return None;
        }
        self.timers.cancel_where(|t| *t == TransportTimer::Reconnect);

        let socket = SocketId(self.next_socket);
        self.next_socket += 1;
        self.socket = Some(socket);
        self.state.status = ConnectionStatus::Connecting;
        self.timers
            .schedule(now + CONNECT_TIMEOUT_MS, TransportTimer::ConnectTimeout);

        log::info!("Connecting to gesture server at {}", self.url);
        Some(TransportCommand::Open {
            socket,
            url: self.url.clone(),
        })
    }

    pub fn on_open(&mut self, socket: SocketId) {
        if !self.is_current(socket) {
            return;
        }
        self.timers.cancel_where(|t| {
            matches!(t, TransportTimer::ConnectTimeout | TransportTimer::Reconnect)
        });
        self.state.status = ConnectionStatus::Connected;
        self.state.reconnect_attempt = 0;
        log::info!("Gesture server connected");
    }

    /// Store a frame. Malformed frames are dropped and the previous one kept.
    pub fn on_message(&mut self, socket: SocketId, text: &str) {
        if !self.is_current(socket) {
            return;
        }
        match decode_frame(text) {
            Ok(frame) => self.frame = Some(frame),
            Err(e) => log::warn!("Dropping gesture frame: {e}"),
        }
    }

    pub fn on_error(&mut self, socket: SocketId) {
        if self.is_current(socket) {
            log::warn!("Gesture socket error");
        }
    }

    pub fn on_close(&mut self, socket: SocketId, code: u16, now: f64) {
        if !self.is_current(socket) {
            return;
        }
        self.socket = None;
        self.frame = None;
        self.state.status = ConnectionStatus::Disconnected;
        self.timers
            .cancel_where(|t| *t == TransportTimer::ConnectTimeout);

        match reconnect_delay(code) {
            Some(delay) if !self.timers.contains(|t| *t == TransportTimer::Reconnect) => {
                self.state.reconnect_attempt += 1;
                self.timers.schedule(now + delay, TransportTimer::Reconnect);
                log::warn!(
                    "Gesture socket closed (code {code}), reconnect #{} in {delay} ms",
                    self.state.reconnect_attempt
                );
            }
            Some(_) => {}
            None => log::info!("Gesture socket closed"),
        }
    }

    /// Ask the server to start or pause. Sent after a short debounce; a newer
    /// request replaces a pending one.
    pub fn request_control(&mut self, action: ControlAction, now: f64) {
        if !self.enabled {
            return;
        }
        self.timers
            .cancel_where(|t| matches!(t, TransportTimer::SendControl(_)));
        self.timers
            .schedule(now + CONTROL_DEBOUNCE_MS, TransportTimer::SendControl(action));
    }

    /// Run due timers and collect the resulting commands
    pub fn poll(&mut self, now: f64) -> Vec<TransportCommand> {
        let mut commands = Vec::new();
        while let Some((_, timer)) = self.timers.pop_due(now) {
            match timer {
                TransportTimer::Reconnect => commands.extend(self.connect(now)),
                TransportTimer::ConnectTimeout => commands.extend(self.abort_connect()),
                TransportTimer::SendControl(action) => {
                    commands.extend(self.flush_control(action, now))
                }
            }
        }
        commands
    }

    fn abort_connect(&mut self) -> Option<TransportCommand> {
        if self.state.status != ConnectionStatus::Connecting {
            return None;
        }
        let socket = self.socket?;
        log::warn!("Gesture server did not answer within {CONNECT_TIMEOUT_MS} ms");
        self.state.status = ConnectionStatus::Disconnecting;
        Some(TransportCommand::Close {
            socket,
            code: CLOSE_CONNECT_TIMEOUT,
            reason: "Connect timeout",
        })
    }

    fn flush_control(&mut self, action: ControlAction, now: f64) -> Option<TransportCommand> {
        let recently_sent = self.state.last_sent_action == Some(action)
            && self
                .state
                .last_sent_at
                .is_some_and(|at| now - at < CONTROL_COOLDOWN_MS);
        if recently_sent {
            log::debug!("Suppressing repeated {}", action.as_str());
            return None;
        }

        let socket = match (self.state.status, self.socket) {
            (ConnectionStatus::Connected, Some(socket)) => socket,
            _ => {
                log::warn!("Not connected, dropping {}", action.as_str());
                return None;
            }
        };

        let text = match (ControlMessage::Control { action }).encode() {
            Ok(text) => text,
            Err(e) => {
                log::error!("{e}");
                return None;
            }
        };
        self.state.last_sent_action = Some(action);
        self.state.last_sent_at = Some(now);
        log::debug!("Sending {}", action.as_str());
        Some(TransportCommand::Send { socket, text })
    }

    /// Close for good: cancel every timer and ignore later socket events
    pub fn teardown(&mut self) -> Option<TransportCommand> {
        self.enabled = false;
        self.timers.clear();
        self.frame = None;
        self.state.status = ConnectionStatus::Disconnected;
        self.socket.take().map(|socket| TransportCommand::Close {
            socket,
            code: CLOSE_NORMAL,
            reason: "Game closed",
        })
    }

    /// Latest frame as an input event; neutral before the first frame or
    /// while disconnected
    pub fn produce(&self) -> InputEvent {
        match &self.frame {
            Some(frame) => InputEvent {
                source: InputMethod::Gesture,
                cursor: frame.cursor(),
                armed: frame.armed,
                trigger: frame.shoot,
            },
            None => InputEvent::neutral(InputMethod::Gesture),
        }
    }
}
