//! Latency rating and side-effect feedback (sounds, particles).
//!
//! The emitter is a fire-and-forget collaborator: nothing it does may change
//! game state, so callers go through [`emit_isolated`].

use std::{
    fmt,
    panic::{catch_unwind, AssertUnwindSafe},
};

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Feedback category keyed by latency thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Below 50 ms.
    Excellent,
    /// 50..100 ms.
    Great,
    /// 100..150 ms.
    Good,
    /// 150..200 ms.
    Moderate,
    /// 200 ms and above.
    Poor,
}

impl Tier {
    /// Tier for a latency sample. Total over all `u32` values.
    pub fn for_latency(latency_ms: u32) -> Self {
        match latency_ms {
            0..=49 => Tier::Excellent,
            50..=99 => Tier::Great,
            100..=149 => Tier::Good,
            150..=199 => Tier::Moderate,
            _ => Tier::Poor,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Excellent => "excellent",
            Tier::Great => "great",
            Tier::Good => "good",
            Tier::Moderate => "moderate",
            Tier::Poor => "poor",
        }
    }

    /// Fixed message shown on the result screen.
    pub fn message(&self) -> &'static str {
        match self {
            Tier::Excellent => "🚀 Excellent speed! Top-tier connection!",
            Tier::Great => "✓ Great connection speed!",
            Tier::Good => "✓ Good connection speed.",
            Tier::Moderate => "⚠ Moderate speed. Connection is acceptable.",
            Tier::Poor => "⚠ Slow speed. Check your connection.",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rating of one sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Feedback {
    pub tier: Tier,
    pub message: &'static str,
}

/// Rates a latency sample.
pub fn feedback_for(latency_ms: u32) -> Feedback {
    let tier = Tier::for_latency(latency_ms);
    Feedback {
        tier,
        message: tier.message(),
    }
}

/// Audio/visual feedback sink.
///
/// Return values are only logged; an implementation may fail or even panic
/// without affecting the game.
pub trait FeedbackEmitter: Send {
    fn on_click(&mut self) -> anyhow::Result<()>;
    fn on_success_tier(&mut self, tier: Tier) -> anyhow::Result<()>;
    fn start_ambient(&mut self) -> anyhow::Result<()>;
    fn stop_ambient(&mut self) -> anyhow::Result<()>;
}

/// Feedback that does nothing, for tests and headless runs.
#[derive(Debug, Default)]
pub struct NullFeedback;

impl FeedbackEmitter for NullFeedback {
    fn on_click(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
    fn on_success_tier(&mut self, _tier: Tier) -> anyhow::Result<()> {
        Ok(())
    }
    fn start_ambient(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
    fn stop_ambient(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Runs one emitter call, swallowing both errors and panics.
pub fn emit_isolated<F>(emitter: &mut dyn FeedbackEmitter, what: &'static str, call: F)
where
    F: FnOnce(&mut dyn FeedbackEmitter) -> anyhow::Result<()>,
{
    match catch_unwind(AssertUnwindSafe(|| call(emitter))) {
        Ok(Ok(())) => {}
        Ok(Err(err)) => warn!(feedback = what, ?err, "feedback call failed"),
        Err(_) => warn!(feedback = what, "feedback call panicked"),
    }
}
