use crate::creature::flags;
use crate::grid::MAP_CELLS;
use crate::state::{status, EndReason};
use crate::tile::{Floor, Kind};
use crate::time::ENDGAME_TICKS;

use super::Lynx;

impl Lynx {
    /// Start-of-tick checks: the clock, pending tank reversals, pushed
    /// blocks and the toggle walls.
    pub(super) fn initial_housekeeping(&mut self) {
        if self.state.tick == 0 {
            self.last_stepping = self.state.stepping;
        }

        if let Some(chip) = self.state.creatures.first_mut() {
            if chip.id == Kind::PushingChip {
                chip.id = Kind::Chip;
            }
        }

        if !self.in_endgame() {
            if self.state.completed {
                self.state.endgame_timer = ENDGAME_TICKS;
            } else if self.state.time_limit_ticks > 0
                && self.state.tick >= self.state.time_limit_ticks
            {
                self.remove_chip(EndReason::Time, None);
            }
        }

        for (i, cr) in self.state.creatures.iter_mut().enumerate() {
            if i != 0 && cr.hidden {
                continue;
            }
            if cr.has(flags::REVERSE) {
                cr.state &= !flags::REVERSE;
                if cr.moving <= 0 {
                    cr.dir = cr.dir.back();
                }
            }
        }
        for cr in &mut self.state.creatures {
            if cr.has(flags::PUSHED) && (cr.hidden || cr.moving <= 0) {
                cr.state &= !flags::PUSHED;
            }
        }

        if self.state.toggle_state {
            for pos in 0..MAP_CELLS {
                match self.floor_at(pos) {
                    Floor::SwitchWallOpen => self.set_floor_at(pos, Floor::SwitchWallClosed),
                    Floor::SwitchWallClosed => self.set_floor_at(pos, Floor::SwitchWallOpen),
                    _ => {}
                }
            }
            self.state.toggle_state = false;
        }

        self.chip_to_pos = None;
        self.chip_to_cr = None;
    }

    /// End-of-tick flags read by the presentation layer.
    pub(super) fn prepare_display(&mut self) {
        let Some(chip) = self.state.creatures.first() else {
            return;
        };
        if chip.hidden {
            return;
        }
        let (pos, moving) = (chip.pos, chip.moving);
        if self.floor_at(pos) == Floor::HintButton && moving <= 0 {
            self.state.status |= status::SHOW_HINT;
        } else {
            self.state.status &= !status::SHOW_HINT;
        }
        let pushing = self.state.pushing;
        if let Some(chip) = self.state.creatures.first_mut() {
            if chip.id == Kind::Chip && pushing {
                chip.id = Kind::PushingChip;
            }
        }
    }
}
