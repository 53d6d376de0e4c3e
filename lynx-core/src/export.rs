use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::state::{EndReason, GameState, Outcome};

#[derive(Serialize)]
struct ExportMeta<'a> {
    level: u16,
    title: &'a str,
    tick: u32,
    outcome: Outcome,
    end_reason: Option<EndReason>,
    chips_needed: u16,
    time_left_s: Option<i64>,
    creatures: usize,
    checksum: String,
    timestamp_unix_s: u64,
}

/// Writes `state.json` (the full state) and `meta.json` (a summary with the
/// checksum) into `dir`, creating it if needed.
pub fn export_snapshot(state: &GameState, outcome: Outcome, dir: impl AsRef<Path>) -> Result<()> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir).with_context(|| format!("creating export dir {}", dir.display()))?;

    let state_json = serde_json::to_string_pretty(state)?;
    fs::write(dir.join("state.json"), state_json)
        .with_context(|| format!("writing {}", dir.join("state.json").display()))?;

    let meta = ExportMeta {
        level: state.level_number,
        title: &state.title,
        tick: state.tick,
        outcome,
        end_reason: state.end_reason,
        chips_needed: state.chips_needed,
        time_left_s: state.time_left(),
        creatures: state.creatures.iter().filter(|c| !c.hidden).count(),
        checksum: state.checksum(),
        timestamp_unix_s: SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_secs()),
    };
    let meta_json = serde_json::to_string_pretty(&meta)?;
    fs::write(dir.join("meta.json"), meta_json)?;
    Ok(())
}

/// Reads back a `state.json` written by [`export_snapshot`].
pub fn load_snapshot(dir: impl AsRef<Path>) -> Result<GameState> {
    let path = dir.as_ref().join("state.json");
    let text = fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}
