//! Deterministic random number generator
//!
//! Uses a simple xorshift64 algorithm for reproducibility across platforms.
//! This ensures the same seed produces the same sequence on all hosts.

use serde::{Deserialize, Serialize};

/// A deterministic random number generator
///
/// Uses xorshift64 for simplicity and reproducibility.
/// Never use std::random or other non-deterministic sources in game logic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameRng {
    state: u64,
}

impl GameRng {
    /// Create a new RNG with the given seed
    pub fn new(seed: u64) -> Self {
        // Ensure non-zero state (xorshift requires this)
        let state = if seed == 0 { 1 } else { seed };
        Self { state }
    }

    /// Create an RNG from a saved state
    pub fn from_state(state: u64) -> Self {
        let state = if state == 0 { 1 } else { state };
        Self { state }
    }

    /// Get the current state (useful for saving/loading)
    pub fn state(&self) -> u64 {
        self.state
    }

    /// Generate the next raw u64 value
    pub fn next_u64(&mut self) -> u64 {
        // xorshift64 algorithm
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    /// Generate a random i64 in range [min, max]
    pub fn range_i64(&mut self, min: i64, max: i64) -> i64 {
        let range = (max - min + 1) as u64;
        let value = self.next_u64() % range;
        min + value as i64
    }

    /// Roll `count` dice with `sides` sides each and sum them
    ///
    /// Zero dice or zero sides roll 0.
    pub fn dice_roll(&mut self, count: u32, sides: u32) -> i64 {
        if count == 0 || sides == 0 {
            return 0;
        }
        let mut total = 0i64;
        for _ in 0..count {
            total += self.range_i64(1, sides as i64);
        }
        total
    }

    /// Generate a random value in [0, 100) for percentage checks
    pub fn percent(&mut self) -> u8 {
        (self.next_u64() % 100) as u8
    }

    /// Generate a random bool with the given percent chance of true
    pub fn chance_percent(&mut self, percent: u8) -> bool {
        self.percent() < percent
    }

    /// Pick a random element from a slice
    pub fn pick<'a, T>(&mut self, slice: &'a [T]) -> Option<&'a T> {
        if slice.is_empty() {
            None
        } else {
            let i = (self.next_u64() as usize) % slice.len();
            Some(&slice[i])
        }
    }
}

impl Default for GameRng {
    fn default() -> Self {
        Self::new(12345)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_determinism() {
        let mut rng1 = GameRng::new(42);
        let mut rng2 = GameRng::new(42);

        for _ in 0..100 {
            assert_eq!(rng1.next_u64(), rng2.next_u64());
        }
    }

    #[test]
    fn test_dice_roll_bounds() {
        let mut rng = GameRng::new(42);

        for _ in 0..100 {
            let roll = rng.dice_roll(2, 6);
            assert!((2..=12).contains(&roll));
        }

        assert_eq!(rng.dice_roll(0, 6), 0);
        assert_eq!(rng.dice_roll(2, 0), 0);
    }

    #[test]
    fn test_percent_range() {
        let mut rng = GameRng::new(42);
        for _ in 0..1000 {
            assert!(rng.percent() < 100);
        }
    }

    #[test]
    fn test_chance_percent_extremes() {
        let mut rng = GameRng::new(42);
        for _ in 0..100 {
            assert!(!rng.chance_percent(0));
            assert!(rng.chance_percent(100));
        }
    }

    #[test]
    fn test_pick() {
        let mut rng = GameRng::new(42);
        let items = ["a", "b", "c"];
        let picked = rng.pick(&items).unwrap();
        assert!(items.contains(picked));

        let empty: [&str; 0] = [];
        assert!(rng.pick(&empty).is_none());
    }
}
