//! Configuration system.
//!
//! Loads game configuration from JSON strings/files. Every field has a default
//! so a partial file (or no file at all) is valid.

use std::{path::Path, time::Duration};

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Root configuration for the game and its collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    /// Probe endpoint, e.g. `www.google.com:80`.
    #[serde(default = "default_probe_addr")]
    pub probe_addr: String,
    /// Request path sent to the probe endpoint.
    #[serde(default = "default_probe_path")]
    pub probe_path: String,
    /// Transport-level timeout for one probe round trip.
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
    /// Delay between the intro screen and the first round.
    #[serde(default = "default_intro_delay_ms")]
    pub intro_delay_ms: u64,
    /// Delay between probe completion and the result screen.
    #[serde(default = "default_result_delay_ms")]
    pub result_delay_ms: u64,
    /// Directory holding the persisted ranking.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

fn default_probe_addr() -> String {
    "www.google.com:80".to_string()
}

fn default_probe_path() -> String {
    "/favicon.ico".to_string()
}

fn default_probe_timeout_ms() -> u64 {
    5_000
}

fn default_intro_delay_ms() -> u64 {
    2_000
}

fn default_result_delay_ms() -> u64 {
    500
}

fn default_data_dir() -> String {
    ".speed-ping".to_string()
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            probe_addr: default_probe_addr(),
            probe_path: default_probe_path(),
            probe_timeout_ms: default_probe_timeout_ms(),
            intro_delay_ms: default_intro_delay_ms(),
            result_delay_ms: default_result_delay_ms(),
            data_dir: default_data_dir(),
        }
    }
}

impl GameConfig {
    /// Parses config from JSON.
    pub fn from_json_str(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }

    /// Reads and parses a JSON config file.
    pub fn from_json_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        Self::from_json_str(&raw).with_context(|| format!("parse config {}", path.display()))
    }

    pub fn intro_delay(&self) -> Duration {
        Duration::from_millis(self.intro_delay_ms)
    }

    pub fn result_delay(&self) -> Duration {
        Duration::from_millis(self.result_delay_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}
