//! Round-based time for the simulation loop
//!
//! All timing in the core is expressed in round counts:
//! - `Round` - Logical time unit, one simulation tick
//! - `RoundClock` - Monotonic round counter with real-time conversion
//! - `Speed` - Pacing control for hosts driving the loop off wall-clock time

use serde::{Deserialize, Serialize};

/// A discrete round number (logical time unit)
pub type Round = u64;

/// Pacing settings for hosts that drive the round loop from real time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Speed {
    /// Loop is paused
    #[default]
    Paused,
    /// Slow pacing
    Slow,
    /// Normal pacing
    Normal,
    /// Fast pacing
    Fast,
}

impl Speed {
    /// Get the round interval in milliseconds for this speed
    /// Returns None if paused
    pub fn round_interval_ms(&self, seconds_per_round: u32) -> Option<u64> {
        let base = seconds_per_round as u64 * 1000;
        match self {
            Speed::Paused => None,
            Speed::Slow => Some(base * 2),
            Speed::Normal => Some(base),
            Speed::Fast => Some(base / 2),
        }
    }

    /// Check if the loop is paused
    pub fn is_paused(&self) -> bool {
        matches!(self, Speed::Paused)
    }
}

/// The default real-time length of a round, in seconds
pub const DEFAULT_SECONDS_PER_ROUND: u32 = 4;

/// Monotonic round clock
///
/// Advances by exactly 1 per tick, never resets or decrements during a
/// session. Owned by the round loop; read by every component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundClock {
    /// Current round number
    round: Round,
    /// Real-time seconds represented by one round
    seconds_per_round: u32,
    /// Current pacing
    pub speed: Speed,
}

impl RoundClock {
    /// Create a new clock at round 0
    pub fn new() -> Self {
        Self::with_seconds_per_round(DEFAULT_SECONDS_PER_ROUND)
    }

    /// Create with a specific seconds-per-round; values below 1 are clamped
    pub fn with_seconds_per_round(seconds_per_round: u32) -> Self {
        Self {
            round: 0,
            seconds_per_round: seconds_per_round.max(1),
            speed: Speed::Paused,
        }
    }

    /// Advance to the next round, returning the new round number
    pub fn advance(&mut self) -> Round {
        self.round += 1;
        self.round
    }

    /// Get the current round number
    pub fn now(&self) -> Round {
        self.round
    }

    /// Real-time seconds represented by one round
    pub fn seconds_per_round(&self) -> u32 {
        self.seconds_per_round
    }

    /// Convert a real-time duration in seconds to rounds, rounding up
    pub fn seconds_to_rounds(&self, seconds: u64) -> u64 {
        seconds.div_ceil(self.seconds_per_round as u64)
    }

    /// Convert a real-time duration in minutes to rounds, rounding up
    pub fn minutes_to_rounds(&self, minutes: u64) -> u64 {
        self.seconds_to_rounds(minutes * 60)
    }

    /// Convert a round count back to real-time seconds
    pub fn rounds_to_seconds(&self, rounds: u64) -> u64 {
        rounds * self.seconds_per_round as u64
    }

    /// Set the pacing
    pub fn set_speed(&mut self, speed: Speed) {
        self.speed = speed;
    }
}

impl Default for RoundClock {
    fn default() -> Self {
        Self::new()
    }
}
