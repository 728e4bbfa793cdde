//! Local ranking of the fastest latency samples.
//!
//! # Features
//! - Keeps the five smallest samples ever recorded, ascending
//! - Persists after every mutation as a flat JSON array
//! - Treats absent or malformed persisted data as an empty ranking

use anyhow::Context;
use tracing::{debug, warn};

use crate::storage::KeyValueStore;

/// Storage key of the persisted ranking.
pub const RANKING_KEY: &str = "speed_ranking";

/// Maximum number of entries kept.
pub const MAX_RANKING_ENTRIES: usize = 5;

/// Bounded ascending list of the best latency samples, in milliseconds.
pub struct RankingStore<S: KeyValueStore> {
    storage: S,
    entries: Vec<u32>,
}

impl<S: KeyValueStore> RankingStore<S> {
    /// Loads the persisted ranking.
    ///
    /// Never fails: an unreadable slot or a value that is not a JSON array of
    /// non-negative integers yields an empty ranking.
    pub fn load(storage: S) -> Self {
        let entries = match storage.get(RANKING_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<u32>>(&raw) {
                Ok(mut entries) => {
                    normalize(&mut entries);
                    entries
                }
                Err(err) => {
                    warn!(%err, "persisted ranking is malformed; starting empty");
                    Vec::new()
                }
            },
            Ok(None) => {
                debug!("no persisted ranking");
                Vec::new()
            }
            Err(err) => {
                warn!(?err, "failed to read persisted ranking; starting empty");
                Vec::new()
            }
        };

        debug!(entries = ?entries, "ranking loaded");
        Self { storage, entries }
    }

    /// Current entries, ascending.
    pub fn entries(&self) -> &[u32] {
        &self.entries
    }

    /// Fastest sample recorded so far.
    pub fn best(&self) -> Option<u32> {
        self.entries.first().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Records a sample and persists the ranking.
    ///
    /// The in-memory ranking is updated even when persisting fails; the
    /// error is returned for the caller to report.
    pub fn record(&mut self, sample: u32) -> anyhow::Result<()> {
        self.entries.push(sample);
        normalize(&mut self.entries);
        self.save()
    }

    /// Removes every entry, persisting the empty ranking.
    pub fn clear(&mut self) -> anyhow::Result<()> {
        self.entries.clear();
        self.save()
    }

    fn save(&mut self) -> anyhow::Result<()> {
        let raw = serde_json::to_string(&self.entries).context("serialize ranking")?;
        self.storage
            .set(RANKING_KEY, &raw)
            .context("persist ranking")
    }
}

fn normalize(entries: &mut Vec<u32>) {
    entries.sort();
    entries.truncate(MAX_RANKING_ENTRIES);
}
