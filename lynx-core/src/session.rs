//! Driving the engine: free play with rewind, and replay verification.

use std::collections::VecDeque;

use anyhow::{ensure, Context, Result};
use serde::Serialize;
use tracing::{debug, warn};

use crate::diff::{self, StateDiff};
use crate::input::{DirProvider, ReplayProvider};
use crate::levelset::Level;
use crate::logic::Lynx;
use crate::params::SessionParams;
use crate::solution::Solution;
use crate::sound::SoundEvent;
use crate::state::{EndReason, GameState, Outcome};
use crate::time::StepTimer;

/// An engine, its input, and the diffs needed to step back through time.
pub struct Session {
    lynx: Lynx,
    input: Box<dyn DirProvider>,
    params: SessionParams,
    history: VecDeque<StateDiff>,
    outcome: Outcome,
}

impl Session {
    /// Starts `level`, applying any overrides from `params`. Invalid levels
    /// still start so they can be looked at; check `state().is_invalid()`
    /// before trusting the result.
    pub fn start(level: &Level, input: Box<dyn DirProvider>, params: SessionParams) -> Self {
        let mut lynx = Lynx::new(level.to_game_state());
        if !lynx.init_game() {
            warn!(level = level.number, "starting a session on an invalid level");
        }
        if let Some(stepping) = params.stepping {
            lynx.state.stepping = stepping & 0x07;
        }
        if let Some(seed) = params.prng_seed {
            lynx.state.main_prng.restart(seed);
        }
        if let Some(dir) = params.random_slide_dir {
            lynx.state.random_slide_dir = dir;
        }
        let on_map = lynx.state.count_chips();
        if on_map < usize::from(lynx.state.chips_needed) {
            warn!(
                level = level.number,
                on_map,
                needed = lynx.state.chips_needed,
                "the socket wants more chips than the map holds"
            );
        }
        Self {
            lynx,
            input,
            params,
            history: VecDeque::new(),
            outcome: Outcome::Playing,
        }
    }

    pub fn state(&self) -> &GameState {
        &self.lynx.state
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Sounds made by the last tick, leaving the queue empty.
    pub fn take_sounds(&mut self) -> Vec<SoundEvent> {
        self.lynx.state.drain_sounds()
    }

    /// Packed size of the rewind history.
    pub fn history_bytes(&self) -> usize {
        self.history.iter().map(StateDiff::byte_size).sum()
    }

    /// Advances one tick. Once the game has ended this is a no-op that keeps
    /// returning the final outcome.
    pub fn advance(&mut self) -> Outcome {
        if self.outcome != Outcome::Playing {
            return self.outcome;
        }
        if !self.params.record_history {
            self.outcome = self.lynx.advance(self.input.as_mut());
            return self.outcome;
        }

        let before = self.lynx.state.clone();
        self.outcome = self.lynx.advance(self.input.as_mut());
        self.history.push_back(diff::capture(&before, &self.lynx.state));
        if self.params.history_limit > 0 && self.history.len() > self.params.history_limit {
            self.history.pop_front();
        }
        self.outcome
    }

    /// Undoes the latest tick. Returns false when there is nothing to undo.
    pub fn rewind(&mut self) -> Result<bool> {
        let Some(diff) = self.history.pop_back() else {
            return Ok(false);
        };
        let tick = self.lynx.state.tick;
        diff::apply(&mut self.lynx.state, &diff)
            .with_context(|| format!("rewinding from tick {tick}"))?;
        self.input.reset(self.lynx.state.tick);
        self.outcome = Outcome::Playing;
        Ok(true)
    }
}

/// Result of replaying one recorded solution.
#[derive(Clone, Debug, Serialize)]
pub struct Verdict {
    pub level: u16,
    pub completed: bool,
    pub outcome: Outcome,
    pub end_reason: Option<EndReason>,
    pub ticks: u32,
    pub elapsed_ms: f64,
}

/// Replays `solution` on `level` for its recorded frame count plus the grace
/// ticks, and reports whether Chip reached the exit. Invalid levels are an
/// error, since no run on them can be certified.
pub fn verify_solution(
    level: &Level,
    solution: &Solution,
    params: &SessionParams,
) -> Result<Verdict> {
    let timer = StepTimer::start();
    let mut lynx = Lynx::new(level.to_game_state());
    ensure!(lynx.init_game(), "level {} cannot be played", level.number);

    let state = &mut lynx.state;
    state.stepping = solution.stepping & 0x07;
    state.walker_rng.reset();
    state.random_slide_dir = solution.random_slide_dir;
    state.main_prng.restart(solution.prng_seed);
    state.chips_needed = level.chips_required;

    let budget = solution.frames.saturating_add(params.grace_ticks);
    debug!(
        level = level.number,
        frames = solution.frames,
        actions = solution.actions.len(),
        seed = solution.prng_seed,
        "replay start"
    );

    let mut input = ReplayProvider::new(solution.actions.clone());
    let mut outcome = Outcome::Playing;
    for _ in 0..budget {
        outcome = lynx.advance(&mut input);
        if outcome != Outcome::Playing {
            break;
        }
    }

    let verdict = Verdict {
        level: level.number,
        completed: lynx.state.completed,
        outcome,
        end_reason: lynx.state.end_reason,
        ticks: lynx.state.tick,
        elapsed_ms: timer.elapsed_ms(),
    };
    debug!(
        level = verdict.level,
        completed = verdict.completed,
        ticks = verdict.ticks,
        elapsed_ms = verdict.elapsed_ms,
        "replay end"
    );
    Ok(verdict)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dir::Dir;
    use crate::input::{Action, KeySequence, NoInput};
    use crate::levelset::fixture::{levelset, LevelBytes};
    use crate::levelset::Levelset;
    use crate::solution::fixture::{header, push_record, solution};
    use crate::solution::SolutionFile;

    /// Chip, a computer chip, then the exit.
    fn corridor() -> Level {
        let mut level = LevelBytes::new(3, &[(0, 0, 0x6E), (1, 0, 0x02), (2, 0, 0x15)]);
        level.chips = 1;
        level.time_limit = 10;
        let set = Levelset::parse(&levelset(&[level])).expect("valid set");
        set.levels[0].clone()
    }

    fn recorded(moves: &[u8], frames: u32) -> Solution {
        let mut bytes = header();
        push_record(&mut bytes, &solution(3, 0, 7, frames, moves));
        let file = SolutionFile::parse(&bytes).expect("valid solution file");
        file.for_level(3).expect("level 3 solved").clone()
    }

    #[test]
    fn recorded_solution_completes_the_level() {
        // east at tick 0, east again at tick 4
        let s = recorded(&[0b000_011_01, 0b011_011_01], 8);
        assert_eq!(
            s.actions,
            vec![Action { tick: 0, dir: Dir::E }, Action { tick: 4, dir: Dir::E }]
        );
        let verdict = verify_solution(&corridor(), &s, &SessionParams::default()).expect("replay");
        assert!(verdict.completed);
        assert_eq!(verdict.level, 3);
        assert_eq!(verdict.ticks, 20);
        assert_eq!(verdict.outcome, Outcome::Playing);
    }

    #[test]
    fn half_a_solution_falls_short() {
        let s = recorded(&[0b000_011_01], 8);
        let verdict = verify_solution(&corridor(), &s, &SessionParams::default()).expect("replay");
        assert!(!verdict.completed);
        assert_eq!(verdict.end_reason, None);
    }

    #[test]
    fn rewind_walks_back_to_the_start() {
        let keys = KeySequence::parse("EE").expect("moves");
        let mut session = Session::start(&corridor(), Box::new(keys), SessionParams::default());
        let start = session.state().clone();

        let mut states = vec![start.clone()];
        for _ in 0..8 {
            session.advance();
            states.push(session.state().clone());
        }
        assert!(session.state().completed);
        assert_eq!(session.state().chips_needed, 0);
        assert_eq!(session.history_len(), 8);
        assert!(session.history_bytes() > 0);

        while let Some(expected) = states.pop() {
            assert_eq!(session.state(), &expected);
            if !session.rewind().expect("rewind") {
                break;
            }
        }
        assert!(states.is_empty());
        assert_eq!(session.state(), &start);
        assert!(!session.rewind().expect("empty history"));
    }

    #[test]
    fn invalid_levels_run_but_never_verify() {
        let exit_only = LevelBytes::new(4, &[(2, 0, 0x15)]);
        let set = Levelset::parse(&levelset(&[exit_only])).expect("valid set");
        let level = &set.levels[0];

        let mut session = Session::start(level, Box::new(NoInput), SessionParams::default());
        assert!(session.state().is_invalid());
        session.advance();
        assert_eq!(session.state().tick, 1);

        let s = recorded(&[0b000_011_01], 8);
        assert!(verify_solution(level, &s, &SessionParams::default()).is_err());
    }

    #[test]
    fn short_of_chips_still_starts() {
        let mut level = LevelBytes::new(5, &[(0, 0, 0x6E), (1, 0, 0x02), (3, 0, 0x22)]);
        level.chips = 2;
        let set = Levelset::parse(&levelset(&[level])).expect("valid set");
        let session = Session::start(&set.levels[0], Box::new(NoInput), SessionParams::default());
        assert!(!session.state().is_invalid());
        assert_eq!(session.state().count_chips(), 1);
        assert_eq!(session.state().chips_needed, 2);
    }

    #[test]
    fn history_is_bounded() {
        let params = SessionParams {
            history_limit: 3,
            prng_seed: Some(99),
            stepping: Some(2),
            ..SessionParams::default()
        };
        let mut session = Session::start(&corridor(), Box::new(NoInput), params);
        assert_eq!(session.state().stepping, 2);
        assert_eq!(session.state().main_prng.initial(), 99);
        for _ in 0..10 {
            session.advance();
        }
        assert_eq!(session.history_len(), 3);
        for _ in 0..3 {
            assert!(session.rewind().expect("rewind"));
        }
        assert_eq!(session.state().tick, 7);
        assert!(!session.rewind().expect("history exhausted"));
    }
}
