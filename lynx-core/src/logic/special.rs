use tracing::warn;

use crate::creature::flags;
use crate::grid::MAP_CELLS;
use crate::link::Location;
use crate::sound::Sound;
use crate::state::floor_flags;
use crate::tile::{Floor, Kind};

use super::{Lynx, MoveResult};

impl Lynx {
    /// Sends creature `idx` to the next free teleport in reverse reading
    /// order. If every exit is blocked it stays put; Chip is then stuck.
    pub(super) fn teleport_creature(&mut self, idx: usize) -> bool {
        let (id, origin) = (self.cr(idx).id, self.cr(idx).pos);
        let is_chip = id == Kind::Chip;
        let mut pos = origin;

        loop {
            pos = pos.checked_sub(1).unwrap_or(MAP_CELLS - 1);
            if self.floor_at(pos) == Floor::Teleport {
                if !is_chip {
                    self.unclaim(self.cr(idx).pos);
                }
                self.cr_mut(idx).pos = pos;
                let dir = self.cr(idx).dir;
                if !self.cell_has(pos, floor_flags::CLAIMED) && self.can_make_move(idx, dir, 0) {
                    break;
                }
                if pos == origin {
                    if is_chip {
                        self.state.stuck = true;
                    } else {
                        self.claim(pos);
                    }
                    return false;
                }
            } else if self.cell_has(pos, floor_flags::TELEPORT) {
                self.set_floor_at(pos, Floor::Teleport);
                if Some(pos) == self.chip_pos() {
                    self.cr_mut(0).hidden = true;
                }
            }
        }

        if is_chip {
            self.add_sound(Sound::Teleporting);
        } else {
            self.claim(pos);
        }
        self.cr_mut(idx).state |= flags::TELEPORTED;
        true
    }

    /// Pushes the creature in the clone machine at `target` out, leaving a
    /// copy behind. Returns true if the original got out.
    pub(super) fn activate_cloner(&mut self, target: Option<usize>) -> bool {
        let Some(pos) = target else {
            return false;
        };
        if pos >= MAP_CELLS {
            let Location { x, y } = Location::from_pos(pos);
            warn!(x, y, "off-map cloning attempted");
            return false;
        }
        if self.floor_at(pos) != Floor::CloneMachine {
            let Location { x, y } = Location::from_pos(pos);
            warn!(x, y, "red button not connected to a clone machine");
            return false;
        }
        let Some(original) = self.lookup_creature(pos, true) else {
            return false;
        };

        let clone = self.new_creature();
        let source = self.cr(original).clone();
        self.cr_mut(clone).copy_motion_from(&source);

        if self.advance_creature(original, true) != MoveResult::Moved {
            self.cr_mut(clone).hidden = true;
            return false;
        }
        true
    }

    /// Lets whatever sits in the beartrap at `target` walk out.
    pub(super) fn spring_trap(&mut self, target: Option<usize>) {
        let Some(pos) = target else {
            return;
        };
        if pos >= MAP_CELLS {
            let Location { x, y } = Location::from_pos(pos);
            warn!(x, y, "off-map trap opening attempted");
            return;
        }
        if !self.cell_has(pos, floor_flags::BEARTRAP) {
            let Location { x, y } = Location::from_pos(pos);
            warn!(x, y, "brown button not connected to a beartrap");
            return;
        }
        if let Some(cr) = self.lookup_creature(pos, true) {
            if !self.cr(cr).dir.is_none() {
                self.advance_creature(cr, true);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testkit::{Builder, Game};
    use crate::dir::Dir;
    use crate::input::{Constant, KeySequence};
    use crate::sound::Sound;
    use crate::tile::{Floor, Kind, Tile};

    fn trap_legend(monster: Kind) -> Vec<(char, Tile)> {
        vec![
            ('F', Tile::Creature(Kind::Fireball, Dir::S)),
            ('f', Tile::Creature(Kind::Fireball, Dir::N)),
            ('A', Tile::Creature(monster, Dir::E)),
            ('b', Tile::Floor(Floor::ButtonBrown)),
            ('t', Tile::Floor(Floor::Beartrap)),
        ]
    }

    #[test]
    fn ball_tapping_the_button_frees_a_trapped_fireball() {
        let mut game = Game::grid(
            "
            C.....
            .....F
            ......
            A..bWt
            ",
            &trap_legend(Kind::Ball),
        );
        game.connect((3, 3), (5, 3));
        let (fireball, ball) = (game.creature_at(5, 1), game.creature_at(0, 3));
        let fireball_frame = |game: &Game| game.lynx.state.creatures[fireball].frame;

        game.step(1.0);
        assert_eq!(game.xy(ball), (1, 3));
        assert_eq!(game.xy(fireball), (5, 2));
        game.step(1.0);
        assert_eq!(game.xy(ball), (2, 3));
        assert_eq!(game.xy(fireball), (5, 3));
        game.step(1.0);
        assert_eq!(game.xy(ball), (3, 3));
        assert_eq!(game.xy(fireball), (5, 4));
        assert_eq!(fireball_frame(&game), 2);
        game.step(1.0);
        assert_eq!(game.xy(ball), (2, 3));
        assert_eq!(game.xy(fireball), (5, 5));
        assert_eq!(fireball_frame(&game), 2);
    }

    #[test]
    fn ball_on_the_button_too_early_leaves_the_fireball_trapped() {
        let mut game = Game::grid(
            "
            C.....
            .....F
            ......
            ..AbWt
            ",
            &trap_legend(Kind::Ball),
        );
        game.connect((3, 3), (5, 3));
        let (fireball, ball) = (game.creature_at(5, 1), game.creature_at(2, 3));

        game.step(1.0);
        assert_eq!(game.xy(ball), (3, 3));
        assert_eq!(game.xy(fireball), (5, 2));
        game.step(1.0);
        assert_eq!(game.xy(ball), (2, 3));
        assert_eq!(game.xy(fireball), (5, 3));
        game.step(1.0);
        assert_eq!(game.xy(ball), (1, 3));
        assert_eq!(game.xy(fireball), (5, 3));
    }

    #[test]
    fn tank_holding_the_button_keeps_the_trap_open() {
        let mut game = Game::grid(
            "
            C.....
            ......
            ......
            A..bWt
            ......
            .....f
            ",
            &trap_legend(Kind::Tank),
        );
        game.connect((3, 3), (5, 3));
        let (tank, fireball) = (game.creature_at(0, 3), game.creature_at(5, 5));

        game.step(1.0);
        assert_eq!(game.xy(tank), (1, 3));
        assert_eq!(game.xy(fireball), (5, 4));
        game.step(1.0);
        assert_eq!(game.xy(tank), (2, 3));
        assert_eq!(game.xy(fireball), (5, 3));
        game.step(1.0);
        assert_eq!(game.xy(tank), (3, 3));
        assert_eq!(game.xy(fireball), (5, 2));
        assert_eq!(game.lynx.state.creatures[fireball].frame, 3);
        game.step(1.0);
        assert_eq!(game.xy(tank), (3, 3));
        assert_eq!(game.xy(fireball), (5, 1));
    }

    #[test]
    fn released_monster_lands_on_a_slide() {
        let mut game = Game::grid(
            "
            C...F
            A.bWt
            ....<
            ",
            &[
                ('F', Tile::Creature(Kind::Fireball, Dir::S)),
                ('A', Tile::Creature(Kind::Tank, Dir::E)),
                ('b', Tile::Floor(Floor::ButtonBrown)),
                ('t', Tile::Floor(Floor::Beartrap)),
                ('<', Tile::Floor(Floor::SlideWest)),
            ],
        );
        game.connect((2, 1), (4, 1));
        let (fireball, tank) = (game.creature_at(4, 0), game.creature_at(0, 1));

        game.step(1.0);
        assert_eq!(game.xy(tank), (1, 1));
        assert_eq!(game.xy(fireball), (4, 1));
        game.step(1.0);
        assert_eq!(game.xy(tank), (2, 1));
        assert_eq!(game.xy(fireball), (4, 2));
        assert_eq!(game.lynx.state.creatures[fireball].frame, 0);
        game.step(1.0);
        assert_eq!(game.xy(fireball), (3, 2));
        assert_eq!(game.lynx.state.creatures[fireball].dir, Dir::W);
    }

    #[test]
    fn miswired_trap_button_does_nothing() {
        let mut game = Game::grid(
            "
            C.bt
            ",
            &trap_legend(Kind::Tank),
        )
        .with_input(Constant(Dir::E));
        game.lynx.spring_trap(Some(1));
        game.lynx.spring_trap(Some(5000));
        assert!(!game.lynx.activate_cloner(Some(3)));
        game.step(2.0);
        assert_eq!(game.chip_xy(), (2, 0));
    }

    #[test]
    fn red_button_clones_the_waiting_monster() {
        let mut game = Builder::new()
            .rows("C.r", &[('r', Tile::Floor(Floor::ButtonRed))])
            .put(4, 3, Tile::Creature(Kind::Glider, Dir::E))
            .put_bottom(4, 3, Tile::Floor(Floor::CloneMachine))
            .start()
            .with_input(KeySequence::new([Dir::E, Dir::E]));
        game.connect((2, 0), (4, 3));
        let original = game.creature_at(4, 3);
        game.step(2.0);
        assert_eq!(game.chip_xy(), (2, 0));
        assert!(game
            .lynx
            .state
            .sounds
            .iter()
            .any(|s| s.sound == Sound::ButtonPushed));
        assert_eq!(game.xy(original), (5, 3));
        let clone = game.creature_at(4, 3);
        assert_ne!(clone, original);
        assert_eq!(game.lynx.state.creatures[clone].id, Kind::Glider);
        game.step(2.0);
        assert_eq!(game.xy(clone), (4, 3));
        assert_eq!(game.lynx.state.creatures.len(), 3);
    }

    /// Teleports at (2, 1) and (4, 1), a block at (5, 1) and Chip east of it,
    /// plus `extra` floors.
    fn teleport_row(extra: &[(usize, usize, Floor)], moves: &str) -> Game {
        let mut builder = Builder::new();
        builder
            .put(2, 1, Tile::Floor(Floor::Teleport))
            .put(4, 1, Tile::Floor(Floor::Teleport))
            .put(5, 1, Tile::Creature(Kind::Block, Dir::N))
            .put(6, 1, Tile::Creature(Kind::Chip, Dir::S));
        for &(x, y, floor) in extra {
            builder.put(x, y, Tile::Floor(floor));
        }
        let keys = KeySequence::parse(moves).expect("moves");
        builder.start().with_input(keys)
    }

    const WALLED_IN: &[(usize, usize, Floor)] = &[(1, 1, Floor::Wall), (3, 1, Floor::Wall)];

    #[test]
    fn block_teleports_to_the_next_pad() {
        let mut game = teleport_row(&[], "W");
        let block = game.creature_at(5, 1);
        game.step(1.0);
        assert_eq!(game.chip_xy(), (5, 1));
        game.step(1.0);
        assert_eq!(game.xy(block), (1, 1));
    }

    #[test]
    fn block_slides_through_when_the_other_pad_is_blocked() {
        let mut game = teleport_row(&[(1, 1, Floor::Wall)], "W");
        let block = game.creature_at(5, 1);
        game.step(2.0);
        assert_eq!(game.xy(block), (3, 1));
    }

    #[test]
    fn block_sticks_when_every_exit_is_blocked() {
        let mut game = teleport_row(WALLED_IN, "W");
        let block = game.creature_at(5, 1);
        game.step(1.0);
        assert_eq!(game.chip_xy(), (5, 1));
        assert_eq!(game.xy(block), (4, 1));
        game.step(2.0);
        assert_eq!(game.xy(block), (4, 1));
    }

    /// Toggle walls beside both pads, opened by the green button south of
    /// Chip's first step.
    fn switch_walls(west: Floor) -> Vec<(usize, usize, Floor)> {
        vec![
            (1, 1, west),
            (3, 1, Floor::SwitchWallClosed),
            (5, 2, Floor::ButtonGreen),
        ]
    }

    #[test]
    fn stuck_block_teleports_once_both_ways_open() {
        let mut game = teleport_row(&switch_walls(Floor::SwitchWallClosed), "WS");
        let block = game.creature_at(5, 1);
        game.step(1.0);
        assert_eq!(game.chip_xy(), (5, 1));
        assert_eq!(game.xy(block), (4, 1));
        game.step(1.0);
        assert_eq!(game.chip_xy(), (5, 2));
        game.step(1.0);
        assert_eq!(game.xy(block), (1, 1));
    }

    #[test]
    fn stuck_block_slides_on_once_its_own_way_opens() {
        let mut game = teleport_row(&switch_walls(Floor::Wall), "WS");
        let block = game.creature_at(5, 1);
        game.step(1.0);
        assert_eq!(game.xy(block), (4, 1));
        game.step(1.0);
        assert_eq!(game.chip_xy(), (5, 2));
        game.step(1.0);
        assert_eq!(game.xy(block), (3, 1));
    }

    /// Parks the block on the east pad, then walks Chip round to push it
    /// south.
    fn push_stuck_block(extra: &[(usize, usize, Floor)], moves: &str) -> (Game, usize) {
        let mut floors = WALLED_IN.to_vec();
        floors.extend_from_slice(extra);
        let mut game = teleport_row(&floors, moves);
        let block = game.creature_at(5, 1);
        game.step(1.0);
        assert_eq!(game.chip_xy(), (5, 1));
        assert_eq!(game.xy(block), (4, 1));
        (game, block)
    }

    #[test]
    fn pushed_stuck_block_slides_off_and_chip_teleports() {
        let (mut game, block) = push_stuck_block(&[], "WNWS");
        game.step(4.0);
        assert_eq!(game.chip_xy(), (2, 2));
        assert_eq!(game.xy(block), (4, 2));
        assert!(game.alive());
    }

    #[test]
    fn pushed_stuck_block_is_pushed_again_by_chip_sliding_through() {
        let (mut game, block) = push_stuck_block(&[(2, 2, Floor::Wall)], "WNWS");
        game.step(4.0);
        assert_eq!(game.chip_xy(), (4, 2));
        assert_eq!(game.xy(block), (4, 3));
        assert!(game.alive());
    }

    #[test]
    fn pushed_stuck_block_teleports_when_its_slide_is_walled() {
        let (mut game, block) = push_stuck_block(&[(4, 2, Floor::Wall)], "WNWS");
        game.step(4.0);
        assert_eq!(game.chip_xy(), (4, 0));
        assert_eq!(game.xy(block), (2, 2));
    }

    #[test]
    fn pushed_stuck_block_slides_when_its_slide_opens() {
        let (mut game, block) = push_stuck_block(
            &[
                (2, 2, Floor::Wall),
                (4, 2, Floor::SwitchWallClosed),
                (3, 0, Floor::ButtonGreen),
            ],
            "WNWS...W",
        );
        game.step(3.0);
        assert_eq!(game.chip_xy(), (4, 0));
        // the push only turned it to face south
        assert_eq!(game.xy(block), (4, 1));
        assert_eq!(game.lynx.state.creatures[block].dir, Dir::S);
        game.step(2.0);
        assert_eq!(game.chip_xy(), (3, 0));
        assert_eq!(game.xy(block), (4, 2));
    }

    #[test]
    fn pushed_stuck_block_teleports_when_the_far_slide_opens() {
        let (mut game, block) = push_stuck_block(
            &[
                (2, 2, Floor::SwitchWallClosed),
                (4, 2, Floor::Wall),
                (3, 0, Floor::ButtonGreen),
            ],
            "WNWS...W",
        );
        game.step(3.0);
        assert_eq!(game.chip_xy(), (4, 0));
        assert_eq!(game.xy(block), (4, 1));
        game.step(2.0);
        assert_eq!(game.chip_xy(), (3, 0));
        assert_eq!(game.xy(block), (2, 2));
    }

    #[test]
    fn chip_teleports_with_a_sound() {
        let mut game = Game::grid(
            "
            .x...
            C..x.
            ",
            &[('x', Tile::Floor(Floor::Teleport))],
        )
        .with_input(KeySequence::new([Dir::E, Dir::E, Dir::E]));
        game.step(3.0);
        assert_eq!(game.chip_xy(), (1, 0));
        assert!(game
            .lynx
            .state
            .sounds
            .iter()
            .any(|s| s.sound == Sound::Teleporting));
        game.step(1.0);
        assert_eq!(game.chip_xy(), (2, 0));
        assert!(!game.lynx.state.stuck);
    }
}
