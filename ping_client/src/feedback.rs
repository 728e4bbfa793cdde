//! Terminal feedback: bell on click, a particle burst on success, and an
//! ambient hum line while a round is active.

use std::io::Write;

use anyhow::Context;
use ping_shared::feedback::{FeedbackEmitter, Tier};
use rand::{rngs::StdRng, Rng, SeedableRng};

const PARTICLES: &[char] = &['·', '•', '✦', '*', '+'];

/// Number of particles in the success burst for a tier.
pub fn burst_size(tier: Tier) -> usize {
    match tier {
        Tier::Excellent => 30,
        Tier::Great => 24,
        Tier::Good => 18,
        Tier::Moderate => 10,
        Tier::Poor => 4,
    }
}

pub struct TerminalFeedback<W: Write + Send> {
    out: W,
    rng: StdRng,
    ambient: bool,
}

impl<W: Write + Send> TerminalFeedback<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            rng: StdRng::from_entropy(),
            ambient: false,
        }
    }

    pub fn is_ambient_playing(&self) -> bool {
        self.ambient
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, text: &str) -> anyhow::Result<()> {
        self.out.write_all(text.as_bytes()).context("write feedback")?;
        self.out.flush().context("flush feedback")
    }
}

impl<W: Write + Send> FeedbackEmitter for TerminalFeedback<W> {
    fn on_click(&mut self) -> anyhow::Result<()> {
        self.emit("\x07")
    }

    fn on_success_tier(&mut self, tier: Tier) -> anyhow::Result<()> {
        let burst: String = (0..burst_size(tier))
            .map(|_| PARTICLES[self.rng.gen_range(0..PARTICLES.len())])
            .collect();
        self.emit(&format!("{burst}\n"))
    }

    fn start_ambient(&mut self) -> anyhow::Result<()> {
        if self.ambient {
            return Ok(());
        }
        self.ambient = true;
        self.emit("~ ambient hum ~\n")
    }

    fn stop_ambient(&mut self) -> anyhow::Result<()> {
        if !self.ambient {
            return Ok(());
        }
        self.ambient = false;
        Ok(())
    }
}
