//! Terminal rendering of the game screens.

use std::io::Write;

use ping_shared::ui::{GameView, Screen, StatusLight, UiSnapshot};
use tracing::warn;

pub const EMPTY_RANKING: &str = "No tests recorded yet";

/// Formats one frame as plain text.
pub fn format_screen(ui: &UiSnapshot) -> String {
    let mut out = String::new();
    match ui.screen {
        Screen::Intro => {
            out.push_str("==============================\n");
            out.push_str("   SPEED PING - VELOCITY TEST\n");
            out.push_str("==============================\n");
            out.push_str("Loading...\n");
        }
        Screen::Game => {
            if let Some(hud) = ui.hud {
                out.push_str(hud);
                out.push('\n');
            }
            let light = match ui.status {
                StatusLight::Red => "(●) red",
                StatusLight::Yellow => "(●) yellow",
            };
            out.push_str(&format!("{light}  {}\n", ui.status_text));
            if ui.activation_enabled {
                out.push_str("[ Enter ] measure\n");
            }
        }
        Screen::Result => {
            if let Some(latency_ms) = ui.latency_ms {
                out.push_str(&format!("{latency_ms} ms\n"));
            }
            if let Some(feedback) = ui.feedback {
                out.push_str(feedback.message);
                out.push('\n');
            }
            out.push_str("Ranking:\n");
            out.push_str(&format_ranking(&ui.ranking));
            if ui.replay_visible {
                out.push_str("[ r ] play again\n");
            }
        }
    }
    out
}

/// Numbered ranking lines, or a placeholder when empty.
pub fn format_ranking(entries: &[u32]) -> String {
    if entries.is_empty() {
        return format!("  {EMPTY_RANKING}\n");
    }
    entries
        .iter()
        .enumerate()
        .map(|(i, ms)| format!("  #{} {} ms\n", i + 1, ms))
        .collect()
}

/// View that prints each frame to a writer (stdout in the binary).
pub struct TerminalView<W: Write + Send> {
    out: W,
    last: Option<String>,
}

impl<W: Write + Send> TerminalView<W> {
    pub fn new(out: W) -> Self {
        Self { out, last: None }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> GameView for TerminalView<W> {
    fn render(&mut self, ui: &UiSnapshot) {
        let frame = format_screen(ui);
        // Skip frames identical to the previous one.
        if self.last.as_deref() == Some(frame.as_str()) {
            return;
        }
        let written = writeln!(self.out, "{frame}").and_then(|_| self.out.flush());
        if let Err(err) = written {
            warn!(%err, "failed to draw frame");
        }
        self.last = Some(frame);
    }
}
