//! UI surface abstraction.
//!
//! This crate intentionally does not depend on a terminal or windowing
//! backend. The controller keeps a [`UiSnapshot`] up to date and hands it to a
//! [`GameView`] after every accepted transition.

use crate::feedback::Feedback;

/// Which screen is visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Intro,
    Game,
    Result,
}

/// Status indicator on the game screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLight {
    /// Ready for activation.
    Red,
    /// Measurement in flight.
    Yellow,
}

pub const STATUS_READY: &str = "Press Enter to start the test";
pub const STATUS_MEASURING: &str = "Measuring speed...";
pub const HUD_ACTIVE: &str = "◆ SYSTEM ACTIVE | MEASURING SPEED";

/// Everything a view needs to draw the current frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiSnapshot {
    pub screen: Screen,
    pub status: StatusLight,
    pub status_text: &'static str,
    pub hud: Option<&'static str>,
    /// Activation control; enabled only while waiting.
    pub activation_enabled: bool,
    /// Replay control; visible only on the result screen.
    pub replay_visible: bool,
    pub latency_ms: Option<u32>,
    pub feedback: Option<Feedback>,
    pub ranking: Vec<u32>,
}

impl UiSnapshot {
    pub fn intro() -> Self {
        Self {
            screen: Screen::Intro,
            status: StatusLight::Red,
            status_text: STATUS_READY,
            hud: None,
            activation_enabled: false,
            replay_visible: false,
            latency_ms: None,
            feedback: None,
            ranking: Vec::new(),
        }
    }

    /// Puts the game screen back to its ready state.
    pub fn reset_for_round(&mut self) {
        self.screen = Screen::Game;
        self.status = StatusLight::Red;
        self.status_text = STATUS_READY;
        self.hud = Some(HUD_ACTIVE);
        self.activation_enabled = true;
        self.replay_visible = false;
        self.latency_ms = None;
        self.feedback = None;
    }
}

impl Default for UiSnapshot {
    fn default() -> Self {
        Self::intro()
    }
}

/// Something that can draw a [`UiSnapshot`].
pub trait GameView: Send {
    fn render(&mut self, ui: &UiSnapshot);
}

/// A no-op view useful for headless tests.
#[derive(Default)]
pub struct NullView;

impl GameView for NullView {
    fn render(&mut self, _ui: &UiSnapshot) {}
}
