//! Sources of Chip's moves.

use std::collections::VecDeque;

use tracing::warn;

use crate::dir::Dir;
use crate::state::GameState;
use crate::time::TICKS_PER_STEP;

/// Asked for Chip's next move whenever Chip is standing still.
pub trait DirProvider {
    fn next_dir(&mut self, state: &GameState) -> Dir;

    /// Seeks to `tick` after a rewind. Stateless providers ignore it.
    fn reset(&mut self, _tick: u32) {}
}

/// Never moves.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoInput;

impl DirProvider for NoInput {
    fn next_dir(&mut self, _state: &GameState) -> Dir {
        Dir::NONE
    }
}

/// Holds one direction down forever.
#[derive(Clone, Copy, Debug)]
pub struct Constant(pub Dir);

impl DirProvider for Constant {
    fn next_dir(&mut self, _state: &GameState) -> Dir {
        self.0
    }
}

/// Hands out one direction per query, then nothing.
#[derive(Clone, Debug, Default)]
pub struct KeySequence {
    keys: VecDeque<Dir>,
}

impl KeySequence {
    pub fn new(keys: impl IntoIterator<Item = Dir>) -> Self {
        Self {
            keys: keys.into_iter().collect(),
        }
    }

    /// Parses `N`, `W`, `S`, `E` and `.` (wait), ignoring whitespace.
    pub fn parse(moves: &str) -> Option<Self> {
        let mut keys = VecDeque::new();
        for ch in moves.chars().filter(|c| !c.is_whitespace()) {
            let dir = match ch.to_ascii_uppercase() {
                'N' => Dir::N,
                'W' => Dir::W,
                'S' => Dir::S,
                'E' => Dir::E,
                '.' => Dir::NONE,
                _ => return None,
            };
            keys.push_back(dir);
        }
        Some(Self { keys })
    }
}

impl DirProvider for KeySequence {
    fn next_dir(&mut self, _state: &GameState) -> Dir {
        self.keys.pop_front().unwrap_or(Dir::NONE)
    }
}

/// Holds each direction for one whole step, so `.` waits a step rather than a
/// tick. Indexed by the clock, so a rewind needs no bookkeeping.
#[derive(Clone, Debug, Default)]
pub struct StepMoves {
    steps: Vec<Dir>,
}

impl StepMoves {
    pub fn parse(moves: &str) -> Option<Self> {
        KeySequence::parse(moves).map(|keys| Self {
            steps: keys.keys.into(),
        })
    }

    /// Ticks needed to play every step.
    pub fn ticks(&self) -> u32 {
        self.steps.len() as u32 * TICKS_PER_STEP
    }
}

impl DirProvider for StepMoves {
    fn next_dir(&mut self, state: &GameState) -> Dir {
        let step = (state.tick / TICKS_PER_STEP) as usize;
        self.steps.get(step).copied().unwrap_or(Dir::NONE)
    }
}

/// A recorded move: press `dir` on tick `tick`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Action {
    pub tick: i64,
    pub dir: Dir,
}

/// Plays back a decoded solution.
#[derive(Clone, Debug)]
pub struct ReplayProvider {
    actions: Vec<Action>,
    next: usize,
}

impl ReplayProvider {
    pub fn new(actions: Vec<Action>) -> Self {
        Self { actions, next: 0 }
    }
}

impl DirProvider for ReplayProvider {
    fn next_dir(&mut self, state: &GameState) -> Dir {
        let now = i64::from(state.tick);
        while let Some(action) = self.actions.get(self.next) {
            if action.tick >= now {
                break;
            }
            warn!(tick = now, action_tick = action.tick, "replay clock passed a recorded move");
            self.next += 1;
        }
        match self.actions.get(self.next) {
            Some(action) if action.tick == now => {
                self.next += 1;
                action.dir
            }
            _ => Dir::NONE,
        }
    }

    fn reset(&mut self, tick: u32) {
        let tick = i64::from(tick);
        self.next = self.actions.partition_point(|a| a.tick < tick);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(tick: u32) -> GameState {
        let mut state = GameState::new();
        state.tick = tick;
        state
    }

    #[test]
    fn key_sequence_runs_dry() {
        let mut keys = KeySequence::parse("E . n").expect("valid moves");
        let state = at(0);
        assert_eq!(keys.next_dir(&state), Dir::E);
        assert_eq!(keys.next_dir(&state), Dir::NONE);
        assert_eq!(keys.next_dir(&state), Dir::N);
        assert_eq!(keys.next_dir(&state), Dir::NONE);
        assert!(KeySequence::parse("EX").is_none());
    }

    #[test]
    fn step_moves_hold_for_a_whole_step() {
        let mut moves = StepMoves::parse("E.s").expect("valid moves");
        assert_eq!(moves.ticks(), 12);
        assert_eq!(moves.next_dir(&at(0)), Dir::E);
        assert_eq!(moves.next_dir(&at(3)), Dir::E);
        assert_eq!(moves.next_dir(&at(4)), Dir::NONE);
        assert_eq!(moves.next_dir(&at(11)), Dir::S);
        assert_eq!(moves.next_dir(&at(12)), Dir::NONE);
    }

    #[test]
    fn replay_answers_only_on_the_recorded_tick() {
        let mut replay = ReplayProvider::new(vec![
            Action { tick: 3, dir: Dir::E },
            Action { tick: 7, dir: Dir::S },
            Action { tick: 9, dir: Dir::W },
        ]);
        assert_eq!(replay.next_dir(&at(2)), Dir::NONE);
        assert_eq!(replay.next_dir(&at(3)), Dir::E);
        assert_eq!(replay.next_dir(&at(3)), Dir::NONE);
        // tick 7 was never asked for
        assert_eq!(replay.next_dir(&at(9)), Dir::W);
        assert_eq!(replay.next_dir(&at(20)), Dir::NONE);

        replay.reset(4);
        assert_eq!(replay.next_dir(&at(7)), Dir::S);
        replay.reset(0);
        assert_eq!(replay.next_dir(&at(3)), Dir::E);
    }
}
