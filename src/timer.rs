//! Session countdown
//!
//! The countdown only counts whole seconds; the runtime decides when a
//! second has passed and calls [`Countdown::tick`].

use std::time::Duration;

pub const DEFAULT_GAME_DURATION: Duration = Duration::from_secs(60);
pub const MIN_GAME_DURATION: Duration = Duration::from_secs(10);
pub const MAX_GAME_DURATION: Duration = Duration::from_secs(600);
/// Step used when the player adjusts the duration before a game
pub const DURATION_STEP: Duration = Duration::from_secs(10);
/// At or below this many seconds the timer is shown as a warning
pub const LOW_TIME_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Countdown {
    limit: Duration,
    remaining_secs: u64,
}

impl Default for Countdown {
    fn default() -> Self {
        Self::new(DEFAULT_GAME_DURATION)
    }
}

impl Countdown {
    pub fn new(limit: Duration) -> Self {
        let limit = clamp_duration(limit);
        Self {
            limit,
            remaining_secs: limit.as_secs(),
        }
    }

    pub fn limit(&self) -> Duration {
        self.limit
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    pub fn is_up(&self) -> bool {
        self.remaining_secs == 0
    }

    pub fn is_running_low(&self) -> bool {
        self.remaining_secs <= LOW_TIME_SECS
    }

    /// Refill to the full limit
    pub fn reset(&mut self) {
        self.remaining_secs = self.limit.as_secs();
    }

    /// One second elapsed; returns true when this tick hit zero
    pub fn tick(&mut self) -> bool {
        if self.remaining_secs == 0 {
            return false;
        }
        self.remaining_secs -= 1;
        self.remaining_secs == 0
    }

    /// Change the limit and refill. Returns true if the limit changed.
    pub fn set_limit(&mut self, limit: Duration) -> bool {
        let limit = clamp_duration(limit);
        let changed = limit != self.limit;
        self.limit = limit;
        self.reset();
        changed
    }

    pub fn increase(&mut self) -> bool {
        self.set_limit(self.limit.saturating_add(DURATION_STEP))
    }

    pub fn decrease(&mut self) -> bool {
        self.set_limit(self.limit.saturating_sub(DURATION_STEP))
    }

    /// Format remaining time as MM:SS
    pub fn format_remaining(&self) -> String {
        let minutes = self.remaining_secs / 60;
        let seconds = self.remaining_secs % 60;
        format!("{:02}:{:02}", minutes, seconds)
    }
}

/// Whole seconds within the allowed range
fn clamp_duration(limit: Duration) -> Duration {
    Duration::from_secs(limit.as_secs()).clamp(MIN_GAME_DURATION, MAX_GAME_DURATION)
}
