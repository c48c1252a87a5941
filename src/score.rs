//! Scoring and fall-speed progression

use std::time::Duration;

/// Tick interval at the start of a session
pub const DEFAULT_FALL_INTERVAL: Duration = Duration::from_millis(1000);

/// Score above which the fall interval is capped, checked fastest first
const SPEED_THRESHOLDS: [(u64, Duration); 3] = [
    (5000, Duration::from_millis(500)),
    (3000, Duration::from_millis(700)),
    (1000, Duration::from_millis(850)),
];

/// Points for a lock before the n-back multiplier.
/// Locking without clearing still earns a little.
pub fn base_points(lines_cleared: usize) -> u64 {
    match lines_cleared {
        0 => 20,
        1 => 100,
        2 => 300,
        3 => 500,
        4 => 1000,
        _ => 0,
    }
}

/// `round(base * multiplier)` with the multiplier given in tenths
pub fn apply_multiplier(base: u64, multiplier_tenths: u64) -> u64 {
    (base * multiplier_tenths + 5) / 10
}

/// Score tracking
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Score {
    /// Current score
    pub points: u64,
    /// Total lines cleared
    pub lines: u32,
    /// Pieces locked into the board
    pub pieces: u32,
    fall_interval: Duration,
    initial_fall_interval: Duration,
}

impl Default for Score {
    fn default() -> Self {
        Self::new(DEFAULT_FALL_INTERVAL)
    }
}

impl Score {
    pub fn new(initial_fall_interval: Duration) -> Self {
        Self {
            points: 0,
            lines: 0,
            pieces: 0,
            fall_interval: initial_fall_interval,
            initial_fall_interval,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.initial_fall_interval);
    }

    /// Current time between fall ticks
    pub fn fall_interval(&self) -> Duration {
        self.fall_interval
    }

    /// Record a lock and return the points awarded
    pub fn add_lock(&mut self, lines_cleared: usize, multiplier_tenths: u64) -> u64 {
        let awarded = apply_multiplier(base_points(lines_cleared), multiplier_tenths);
        self.points += awarded;
        self.lines += lines_cleared as u32;
        self.pieces += 1;
        self.update_speed();
        awarded
    }

    /// Speed only ever ratchets up: the interval is lowered to the cap of the
    /// highest threshold passed and never raised again
    fn update_speed(&mut self) {
        if let Some(&(_, cap)) = SPEED_THRESHOLDS.iter().find(|(min, _)| self.points > *min) {
            self.fall_interval = self.fall_interval.min(cap);
        }
    }
}
