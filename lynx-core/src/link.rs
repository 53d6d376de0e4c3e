use std::fmt;

use serde::{Deserialize, Serialize};

use crate::grid::LEVEL_SIZE;

/// Map coordinates as stored in level files; may lie off the map.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub x: u16,
    pub y: u16,
}

impl Location {
    pub fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }

    pub fn from_pos(pos: usize) -> Self {
        Self {
            x: (pos % LEVEL_SIZE) as u16,
            y: (pos / LEVEL_SIZE) as u16,
        }
    }

    /// Linear map position. Off-map locations give an index past the map.
    #[inline]
    pub fn index(self) -> usize {
        usize::from(self.y) * LEVEL_SIZE + usize::from(self.x)
    }

    pub fn on_map(self) -> bool {
        usize::from(self.x) < LEVEL_SIZE && usize::from(self.y) < LEVEL_SIZE
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Button-to-target wiring for beartraps and clone machines.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Link {
    pub button: Location,
    pub target: Location,
    /// Miswired links stay in the list so their positions are kept.
    pub disabled: bool,
}

impl Link {
    pub fn new(button: Location, target: Location) -> Self {
        Self {
            button,
            target,
            disabled: false,
        }
    }
}

/// Target of the first enabled link wired to the button at `pos`.
pub fn target_of(links: &[Link], pos: usize) -> Option<usize> {
    links
        .iter()
        .find(|l| !l.disabled && l.button.index() == pos)
        .map(|l| l.target.index())
}
