//! Small maps drawn as text, for engine tests.

use crate::dir::Dir;
use crate::grid::LEVEL_SIZE;
use crate::input::{DirProvider, NoInput};
use crate::link::{Link, Location};
use crate::state::{GameState, Outcome};
use crate::tile::{Floor, Kind, Tile};
use crate::time::TICKS_PER_STEP;

use super::Lynx;

fn default_tile(ch: char) -> Option<Tile> {
    let tile = match ch {
        '.' => Tile::Floor(Floor::Empty),
        'C' => Tile::Creature(Kind::Chip, Dir::S),
        'W' => Tile::Floor(Floor::Wall),
        _ => return None,
    };
    Some(tile)
}

pub struct Builder {
    pub state: GameState,
}

impl Builder {
    pub fn new() -> Self {
        Self {
            state: GameState::new(),
        }
    }

    pub fn put(&mut self, x: usize, y: usize, tile: Tile) -> &mut Self {
        self.state.map.get_mut(x, y).top = tile;
        self
    }

    pub fn put_bottom(&mut self, x: usize, y: usize, tile: Tile) -> &mut Self {
        self.state.map.get_mut(x, y).bottom = tile;
        self
    }

    /// Draws `rows` onto the top layer. Leading whitespace on each row is
    /// ignored; characters not in `legend` fall back to `.`, `C` and `W`.
    pub fn rows(&mut self, rows: &str, legend: &[(char, Tile)]) -> &mut Self {
        self.draw(rows, legend, false)
    }

    pub fn bottom_rows(&mut self, rows: &str, legend: &[(char, Tile)]) -> &mut Self {
        self.draw(rows, legend, true)
    }

    fn draw(&mut self, rows: &str, legend: &[(char, Tile)], bottom: bool) -> &mut Self {
        for (y, row) in rows.trim().lines().enumerate() {
            for (x, ch) in row.trim().chars().enumerate() {
                let tile = legend
                    .iter()
                    .find(|(c, _)| *c == ch)
                    .map(|(_, t)| *t)
                    .or_else(|| default_tile(ch))
                    .unwrap_or_else(|| panic!("no tile for {ch:?}"));
                let cell = self.state.map.get_mut(x, y);
                if bottom {
                    cell.bottom = tile;
                } else {
                    cell.top = tile;
                }
            }
        }
        self
    }

    /// Initializes the game and sets the chip count from the top layer.
    pub fn start(&mut self) -> Game {
        let mut lynx = Lynx::new(std::mem::take(&mut self.state));
        lynx.init_game();
        let chip = Tile::Floor(Floor::IcChip);
        lynx.state.chips_needed =
            lynx.state.map.as_slice().iter().filter(|c| c.top == chip).count() as u16;
        Game {
            lynx,
            input: Box::new(NoInput),
        }
    }
}

pub struct Game {
    pub lynx: Lynx,
    pub input: Box<dyn DirProvider>,
}

impl Game {
    pub fn grid(rows: &str, legend: &[(char, Tile)]) -> Self {
        Builder::new().rows(rows, legend).start()
    }

    pub fn two_layer(top: &str, bottom: &str, legend: &[(char, Tile)]) -> Self {
        Builder::new()
            .rows(top, legend)
            .bottom_rows(bottom, legend)
            .start()
    }

    pub fn with_input(mut self, input: impl DirProvider + 'static) -> Self {
        self.input = Box::new(input);
        self
    }

    /// Wires a button to a trap or clone machine, whichever the floors say.
    pub fn connect(&mut self, button: (u16, u16), target: (u16, u16)) {
        let link = Link::new(
            Location::new(button.0, button.1),
            Location::new(target.0, target.1),
        );
        match self.lynx.state.floor_at(link.button.index()) {
            Floor::ButtonBrown => self.lynx.state.trap_links.push(link),
            Floor::ButtonRed => self.lynx.state.clone_links.push(link),
            other => panic!("no button at {}: {other:?}", link.button),
        }
    }

    pub fn tick(&mut self) -> Outcome {
        self.lynx.advance(self.input.as_mut())
    }

    pub fn ticks(&mut self, n: u32) -> Outcome {
        let mut outcome = Outcome::Playing;
        for _ in 0..n {
            outcome = self.tick();
        }
        outcome
    }

    /// Advances by whole or fractional steps of four ticks.
    pub fn step(&mut self, steps: f32) -> Outcome {
        self.ticks((TICKS_PER_STEP as f32 * steps) as u32)
    }

    pub fn xy(&self, idx: usize) -> (usize, usize) {
        let pos = self.lynx.state.creatures[idx].pos;
        (pos % LEVEL_SIZE, pos / LEVEL_SIZE)
    }

    pub fn chip_xy(&self) -> (usize, usize) {
        self.xy(0)
    }

    /// True until the end-game countdown starts, or after a win.
    pub fn alive(&self) -> bool {
        self.lynx.state.endgame_timer == 0 || self.lynx.state.completed
    }

    pub fn top(&self, x: usize, y: usize) -> Tile {
        self.lynx.state.map.get(x, y).top
    }

    /// Index of the first creature after Chip at the given start cell.
    pub fn creature_at(&self, x: usize, y: usize) -> usize {
        let pos = y * LEVEL_SIZE + x;
        self.lynx
            .state
            .creatures
            .iter()
            .position(|cr| cr.pos == pos)
            .unwrap_or_else(|| panic!("no creature at ({x}, {y})"))
    }
}

/// A busy level with every monster kind, a cloner, a trap, teleports and
/// random slides, for whole-engine properties.
pub fn arena() -> Game {
    let glider = Tile::Creature(Kind::Glider, Dir::E);
    let mut game = Builder::new()
        .rows(
            "
            C...........W...
            ..G..b...r.D...T
            .x..........W...
            ..A...?..k..W.B.
            ......?.....W...
            .L..t.......WZ..
            ....~....P......
            .M..........>.-.
            ",
            &[
                ('G', glider),
                ('b', Tile::Floor(Floor::ButtonBrown)),
                ('r', Tile::Floor(Floor::ButtonRed)),
                ('D', Tile::Creature(Kind::Teeth, Dir::W)),
                ('T', Tile::Creature(Kind::Tank, Dir::S)),
                ('x', Tile::Floor(Floor::Teleport)),
                ('A', Tile::Creature(Kind::Ball, Dir::E)),
                ('?', Tile::Floor(Floor::SlideRandom)),
                ('k', Tile::Floor(Floor::Teleport)),
                ('B', Tile::Creature(Kind::Blob, Dir::N)),
                ('L', Tile::Creature(Kind::Walker, Dir::S)),
                ('t', Tile::Floor(Floor::Beartrap)),
                ('Z', Tile::Creature(Kind::Bug, Dir::W)),
                ('~', Tile::Floor(Floor::Water)),
                ('P', Tile::Creature(Kind::Paramecium, Dir::N)),
                ('M', Tile::Creature(Kind::Fireball, Dir::E)),
                ('>', Tile::Floor(Floor::SlideEast)),
                ('-', Tile::Floor(Floor::Ice)),
            ],
        )
        .put(20, 20, glider)
        .put_bottom(20, 20, Tile::Floor(Floor::CloneMachine))
        .start();
    game.connect((5, 1), (4, 5));
    game.connect((9, 1), (20, 20));
    game
}
