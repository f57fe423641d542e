//! Seeded dice for derived values
//!
//! Dice terms in formulas draw from a xorshift64 stream, so a given seed
//! yields the same rolls on every platform and every run.

use serde::{Deserialize, Serialize};

/// xorshift64 generator owned by a formula (or the registry, for seeding)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRng {
    state: u64,
}

impl GameRng {
    /// Create a new RNG with the given seed
    pub fn new(seed: u64) -> Self {
        // xorshift never leaves zero
        let state = if seed == 0 { 1 } else { seed };
        Self { state }
    }

    /// Raw generator state
    pub fn state(&self) -> u64 {
        self.state
    }

    pub fn next_u64(&mut self) -> u64 {
        // xorshift64 algorithm
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    /// Uniform draw from `[min, max]`
    pub fn range_i64(&mut self, min: i64, max: i64) -> i64 {
        if max <= min {
            return min;
        }
        let range = (max - min + 1) as u64;
        let value = self.next_u64() % range;
        min + value as i64
    }

    /// Roll a die with `sides` faces, returning a value in [1, sides]
    pub fn roll(&mut self, sides: u32) -> i64 {
        self.range_i64(1, i64::from(sides.max(1)))
    }

    /// Split off an independent generator, advancing this one
    ///
    /// Every call yields a different child, so values cloned from the same
    /// source each roll their own sequence.
    pub fn fork(&mut self) -> Self {
        // splitmix64 finalizer over the next draw
        let mut z = self.next_u64().wrapping_add(0x9E37_79B9_7F4A_7C15);
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        Self::new(z ^ (z >> 31))
    }
}

impl Default for GameRng {
    fn default() -> Self {
        Self::new(12345)
    }
}
