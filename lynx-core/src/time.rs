use std::time::Instant;

pub const TICKS_PER_STEP: u32 = 4;
pub const STEPS_PER_SECOND: u32 = 5;
pub const TICKS_PER_SECOND: u32 = TICKS_PER_STEP * STEPS_PER_SECOND;

/// Ticks between the end of play and the final outcome being reported.
pub const ENDGAME_TICKS: u8 = 12 + 1;

/// Seconds left on the clock, rounded up; `None` for untimed levels.
pub fn seconds_left(time_limit_ticks: u32, tick: u32) -> Option<i64> {
    if time_limit_ticks == 0 {
        return None;
    }
    let remaining = i64::from(time_limit_ticks) - i64::from(tick);
    let per_second = i64::from(TICKS_PER_SECOND);
    Some(remaining.div_euclid(per_second) + i64::from(remaining.rem_euclid(per_second) != 0))
}

pub struct StepTimer {
    start: Instant,
}

impl StepTimer {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}
