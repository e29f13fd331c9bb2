//! Per-session coordinator
//!
//! Owns the round and the active input source. Each frame it reads the latest
//! input, turns a trigger press into a single shot, advances the round and
//! keeps the gesture server's START/PAUSE state in step with play.

use glam::Vec2;
use serde::Serialize;

use crate::Viewport;
use crate::input::{ControlAction, InputEvent, InputSource, TransportCommand};
use crate::settings::{Difficulty, GameSettings, InputMethod};
use crate::sim::{Phase, Round, RoundEvent, RoundInput};

/// End-of-round grade relative to a per-difficulty base score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rating {
    Perfect,
    Excellent,
    Great,
    KeepGoing,
    KeepLearning,
}

impl Rating {
    pub fn base_score(difficulty: Difficulty) -> u32 {
        match difficulty {
            Difficulty::Easy => 50,
            Difficulty::Medium => 100,
            Difficulty::Hard => 150,
        }
    }

    pub fn from_score(score: u32, difficulty: Difficulty) -> Self {
        let base = Self::base_score(difficulty);
        if score >= base * 3 {
            Rating::Perfect
        } else if score >= base * 2 {
            Rating::Excellent
        } else if score >= base {
            Rating::Great
        } else if score * 2 >= base {
            Rating::KeepGoing
        } else {
            Rating::KeepLearning
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Rating::Perfect => "Amazing!",
            Rating::Excellent => "Excellent!",
            Rating::Great => "Great!",
            Rating::KeepGoing => "Keep going!",
            Rating::KeepLearning => "Keep learning!",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetView {
    pub id: u32,
    pub value: i64,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub is_correct: bool,
    pub is_shot: bool,
}

/// Crosshair in viewport pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CursorView {
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub armed: bool,
    pub trigger: bool,
}

/// Read-only snapshot for whatever draws the frame
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameView {
    pub targets: Vec<TargetView>,
    pub cursor: CursorView,
    pub score: u32,
    pub health: f32,
    pub time_left: u32,
    pub countdown: u32,
    pub phase: Phase,
    pub prompt: Option<String>,
    pub connected: bool,
    /// Set once the round is over
    pub rating: Option<Rating>,
}

/// One play session
#[derive(Debug)]
pub struct Game {
    settings: GameSettings,
    round: Round,
    source: InputSource,
    last_input: InputEvent,
    /// Trigger level seen last frame, for edge detection
    trigger_held: bool,
    /// The first frame starts the round and opens the gesture socket
    booted: bool,
    /// START has been requested for the current stretch of play
    start_sent: bool,
    /// Set by `teardown`; the game never runs again
    torn_down: bool,
}

impl Game {
    pub fn new(settings: GameSettings, seed: u64) -> Self {
        let round = Round::new(&settings, seed);
        let source = InputSource::from_settings(&settings);
        let last_input = InputEvent::neutral(settings.input_method);
        log::info!(
            "New game: {} {} via {} ({} rules)",
            settings.difficulty.as_str(),
            settings.operation.as_str(),
            settings.input_method.as_str(),
            settings.rules.as_str()
        );

        Self {
            settings,
            round,
            source,
            last_input,
            trigger_held: false,
            booted: false,
            start_sent: false,
            torn_down: false,
        }
    }

    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    pub fn round(&self) -> &Round {
        &self.round
    }

    pub fn source(&self) -> &InputSource {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut InputSource {
        &mut self.source
    }

    pub fn phase(&self) -> Phase {
        self.round.phase()
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.round.set_viewport(viewport);
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    pub fn start(&mut self) {
        if !self.torn_down {
            self.round.start();
        }
    }

    pub fn pause(&mut self) {
        if !self.torn_down {
            self.round.pause();
        }
    }

    pub fn reset(&mut self) {
        if !self.torn_down {
            self.round.reset();
        }
    }

    pub fn drain_events(&mut self) -> Vec<RoundEvent> {
        self.round.drain_events()
    }

    /// Earliest time the transport needs polling, independent of frames
    pub fn next_transport_deadline(&self) -> Option<f64> {
        self.source.gesture().and_then(|c| c.next_deadline())
    }

    /// Run the transport's due timers outside a frame
    pub fn poll_transport(&mut self, now: f64) -> Vec<TransportCommand> {
        self.source
            .gesture_mut()
            .map(|client| client.poll(now))
            .unwrap_or_default()
    }

    /// Advance everything to wall time `now` (ms). Returns socket work for
    /// the platform.
    pub fn frame(&mut self, now: f64) -> Vec<TransportCommand> {
        let mut commands = Vec::new();
        if self.torn_down {
            return commands;
        }
        if !self.booted {
            self.booted = true;
            if let Some(client) = self.source.gesture_mut() {
                commands.extend(client.connect(now));
            }
            self.round.start();
        }

        let input = self.source.produce(now);
        let rising = input.trigger && !self.trigger_held;
        self.trigger_held = input.trigger;
        self.last_input = input;

        // Pointer presses are latched so none depend on frame timing;
        // gesture `shoot` is a level and fires on its rising edge
        let aim = match self.source.method() {
            InputMethod::Gesture => rising.then_some(input.cursor).flatten(),
            InputMethod::Mouse | InputMethod::Touch => self.source.take_press(),
        };
        let viewport = self.round.viewport();
        let shot = aim.map(|c| viewport.denormalize(c));
        self.round.advance(now, &RoundInput { shot });

        self.sync_control(now);
        commands.extend(self.poll_transport(now));
        commands
    }

    fn cursor_px(&self) -> Option<Vec2> {
        self.last_input
            .cursor
            .map(|c| self.round.viewport().denormalize(c))
    }

    /// Tell the gesture server to run only while the round is playing
    fn sync_control(&mut self, now: f64) {
        let playing = self.round.phase() == Phase::Playing;
        let Some(client) = self.source.gesture_mut() else {
            return;
        };

        if !client.connected() {
            // Re-send START after a reconnect
            self.start_sent = false;
            return;
        }
        if playing && !self.start_sent {
            client.request_control(ControlAction::Start, now);
            self.start_sent = true;
        } else if !playing && self.start_sent {
            client.request_control(ControlAction::Pause, now);
            self.start_sent = false;
        }
    }

    /// Stop for good. Returns the socket close, if one was open.
    pub fn teardown(&mut self) -> Option<TransportCommand> {
        if self.torn_down {
            return None;
        }
        self.torn_down = true;
        self.round.teardown();
        log::info!("Game torn down");
        self.source.gesture_mut().and_then(|client| client.teardown())
    }

    pub fn snapshot(&self) -> FrameView {
        let state = self.round.state();
        let cursor = self.cursor_px();
        FrameView {
            targets: self
                .round
                .targets()
                .iter()
                .map(|t| TargetView {
                    id: t.id,
                    value: t.value,
                    x: t.pos.x,
                    y: t.pos.y,
                    radius: t.radius,
                    is_correct: t.is_correct,
                    is_shot: t.is_shot,
                })
                .collect(),
            cursor: CursorView {
                x: cursor.map(|c| c.x),
                y: cursor.map(|c| c.y),
                armed: self.last_input.armed,
                trigger: self.last_input.trigger,
            },
            score: state.score,
            health: state.health,
            time_left: state.time_left,
            countdown: state.countdown_left,
            phase: state.phase,
            prompt: self.round.question().map(|q| q.prompt.clone()),
            connected: self.source.connected(),
            rating: (state.phase == Phase::GameOver)
                .then(|| Rating::from_score(state.score, self.settings.difficulty)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{ClientRect, SocketId};
    use crate::settings::{InputMethod, RuleSet};

    fn mouse_settings() -> GameSettings {
        GameSettings {
            input_method: InputMethod::Mouse,
            countdown_secs: 0,
            ..GameSettings::default()
        }
    }

    /// Viewport and client rect share the same pixel space
    fn game(settings: GameSettings) -> (Game, ClientRect) {
        let viewport = Viewport::new(800.0, 600.0);
        let mut game = Game::new(settings, 7);
        game.set_viewport(viewport);
        (game, ClientRect::new(0.0, 0.0, viewport.width, viewport.height))
    }

    fn correct_pos(game: &Game) -> Vec2 {
        game.round().targets().iter().find(|t| t.is_correct).unwrap().pos
    }

    #[test]
    fn test_rating_thresholds() {
        assert_eq!(Rating::from_score(150, Difficulty::Easy), Rating::Perfect);
        assert_eq!(Rating::from_score(100, Difficulty::Easy), Rating::Excellent);
        assert_eq!(Rating::from_score(100, Difficulty::Medium), Rating::Great);
        assert_eq!(Rating::from_score(75, Difficulty::Hard), Rating::KeepGoing);
        assert_eq!(Rating::from_score(74, Difficulty::Hard), Rating::KeepLearning);
        assert_eq!(Rating::from_score(0, Difficulty::Easy), Rating::KeepLearning);
    }

    #[test]
    fn test_first_frame_starts_round() {
        let (mut game, _) = game(mouse_settings());
        assert_eq!(game.phase(), Phase::Idle);
        assert!(game.frame(0.0).is_empty());
        assert_eq!(game.phase(), Phase::Playing);
        assert!(game.snapshot().prompt.is_some());
        assert_eq!(game.snapshot().targets.len(), 4);
    }

    #[test]
    fn test_mouse_click_scores_once() {
        let (mut game, rect) = game(mouse_settings());
        game.frame(0.0);

        let pos = correct_pos(&game);
        let pointer = game.source_mut().pointer_mut().unwrap();
        assert!(pointer.on_mouse_down(0, pos, rect, 1000.0));

        // Pulse spans several frames but only the edge shoots
        game.frame(1000.0);
        game.frame(1016.0);
        game.frame(1032.0);
        assert_eq!(game.snapshot().score, 10);
    }

    #[test]
    fn test_click_survives_slow_frames() {
        let (mut game, rect) = game(mouse_settings());
        game.frame(940.0);

        // The 50 ms pulse falls entirely between two frames
        let pos = correct_pos(&game);
        let pointer = game.source_mut().pointer_mut().unwrap();
        assert!(pointer.on_mouse_down(0, pos, rect, 1000.0));
        game.frame(1060.0);
        game.frame(1076.0);
        assert_eq!(game.snapshot().score, 10);
    }

    #[test]
    fn test_quick_presses_between_frames_stay_separate() {
        let (mut game, rect) = game(mouse_settings());
        game.frame(0.0);

        let pos = correct_pos(&game);
        let pointer = game.source_mut().pointer_mut().unwrap();
        assert!(pointer.on_mouse_down(0, pos, rect, 1000.0));
        assert!(pointer.on_mouse_down(0, pos, rect, 1100.0));

        // One shot per frame; the second waits for the next one
        game.frame(1200.0);
        assert!(game.source_mut().pointer_mut().unwrap().take_press().is_some());
        assert_eq!(game.snapshot().score, 10);
    }

    #[test]
    fn test_teardown_stops_the_round_for_good() {
        let (mut game, _) = game(mouse_settings());
        game.frame(0.0);
        assert!(game.teardown().is_none());
        assert!(game.is_torn_down());

        assert!(game.frame(16.0).is_empty());
        game.start();
        game.reset();
        game.frame(2000.0);
        assert_eq!(game.phase(), Phase::Idle);
        assert!(game.round().question().is_none());
        assert_eq!(game.round().pending_timers(), 0);
    }

    #[test]
    fn test_snapshot_cursor_in_pixels() {
        let (mut game, rect) = game(mouse_settings());
        game.source_mut()
            .pointer_mut()
            .unwrap()
            .on_mouse_move(Vec2::new(200.0, 150.0), rect);
        game.frame(0.0);

        let view = game.snapshot();
        assert_eq!(view.cursor.x, Some(200.0));
        assert_eq!(view.cursor.y, Some(150.0));
        assert!(view.cursor.armed);
        assert!(view.connected);
        assert!(view.rating.is_none());
    }

    #[test]
    fn test_rating_appears_at_gameover() {
        let (mut game, _) = game(mouse_settings());
        game.frame(0.0);
        for i in 1..=61 {
            game.frame(i as f64 * 1000.0);
        }
        let view = game.snapshot();
        assert_eq!(view.phase, Phase::GameOver);
        assert_eq!(view.rating, Some(Rating::KeepLearning));
    }

    #[test]
    fn test_pause_and_resume_through_game() {
        let (mut game, _) = game(GameSettings {
            rules: RuleSet::Health,
            ..mouse_settings()
        });
        game.frame(0.0);
        game.frame(16.0);
        game.pause();
        let frozen = game.snapshot();
        game.frame(10_000.0);
        assert_eq!(game.snapshot(), frozen);

        game.start();
        game.frame(10_016.0);
        assert_eq!(game.phase(), Phase::Playing);
        assert_eq!(game.snapshot().time_left, frozen.time_left);
    }

    fn open_gesture(game: &mut Game, now: f64) -> SocketId {
        let commands = game.frame(now);
        let Some(TransportCommand::Open { socket, .. }) = commands.first().cloned() else {
            panic!("expected open, got {commands:?}");
        };
        game.source_mut().gesture_mut().unwrap().on_open(socket);
        socket
    }

    #[test]
    fn test_gesture_start_and_pause_sync() {
        let (mut game, _) = game(GameSettings {
            countdown_secs: 0,
            ..GameSettings::default()
        });
        let socket = open_gesture(&mut game, 0.0);

        // START requested once, sent after the debounce
        assert!(game.frame(16.0).is_empty());
        let commands = game.frame(150.0);
        assert_eq!(
            commands,
            vec![TransportCommand::Send {
                socket,
                text: r#"{"type":"CONTROL","action":"START"}"#.to_string(),
            }]
        );
        assert!(game.frame(1000.0).is_empty());

        game.pause();
        game.frame(1016.0);
        let commands = game.frame(1200.0);
        assert!(matches!(
            commands.as_slice(),
            [TransportCommand::Send { text, .. }] if text.contains("PAUSE")
        ));
    }

    #[test]
    fn test_held_gesture_shoot_fires_once() {
        let (mut game, _) = game(GameSettings {
            countdown_secs: 0,
            ..GameSettings::default()
        });
        let socket = open_gesture(&mut game, 0.0);

        let pos = correct_pos(&game);
        let frame = format!(
            r#"{{"x":{},"y":{},"armed":true,"shoot":true}}"#,
            pos.x / 800.0,
            pos.y / 600.0
        );
        let client = game.source_mut().gesture_mut().unwrap();
        client.on_message(socket, &frame);

        game.frame(1000.0);
        game.frame(1600.0);
        game.frame(2200.0);
        assert_eq!(game.snapshot().score, 10);
    }

    #[test]
    fn test_teardown_closes_socket() {
        let (mut game, _) = game(GameSettings::default());
        let socket = open_gesture(&mut game, 0.0);
        assert!(matches!(
            game.teardown(),
            Some(TransportCommand::Close { socket: s, code: 1000, .. }) if s == socket
        ));
        assert!(game.next_transport_deadline().is_none());
    }
}
