use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::dir::Dir;

/// Knobs for a play or replay session. Missing JSON fields take the defaults.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionParams {
    /// Extra ticks a replay may run past its recorded frame count.
    pub grace_ticks: u32,
    pub record_history: bool,
    /// Oldest diffs are dropped past this many; zero keeps them all.
    pub history_limit: usize,
    pub stepping: Option<u8>,
    pub prng_seed: Option<u32>,
    /// Direction mask, as stored in the state (N=1, W=2, S=4, E=8).
    pub random_slide_dir: Option<Dir>,
}

impl Default for SessionParams {
    fn default() -> Self {
        Self {
            grace_ticks: 12,
            record_history: true,
            history_limit: 0,
            stepping: None,
            prng_seed: None,
            random_slide_dir: None,
        }
    }
}

impl SessionParams {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("parsing session parameters")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading session parameters {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("in {}", path.display()))
    }
}
