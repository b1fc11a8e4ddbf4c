//! Seeded Random Number Generator
//!
//! Linear congruential generator over a single 32-bit state.
//! Given the same seed and the same call sequence, produces identical
//! output forever. Track generation and every bot draw from one shared
//! instance owned by the race.

use serde::{Deserialize, Serialize};

/// LCG multiplier (Numerical Recipes).
const LCG_MULTIPLIER: u32 = 1_664_525;

/// LCG increment (Numerical Recipes).
const LCG_INCREMENT: u32 = 1_013_904_223;

/// 2^32 as a float, the divisor that maps state into [0, 1).
const STATE_SPAN: f64 = 4_294_967_296.0;

/// Deterministic PRNG using a 32-bit linear congruential recurrence.
///
/// # Determinism Guarantee
///
/// Two instances constructed from the same seed and driven by the same
/// call sequence yield bit-identical outputs. Cloning an instance forks
/// an identical stream.
///
/// # Example
///
/// ```
/// use lane_rush::core::rng::SeededRng;
///
/// let mut a = SeededRng::new(42);
/// let mut b = SeededRng::new(42);
/// assert_eq!(a.next(), b.next());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeededRng {
    state: u32,
}

impl Default for SeededRng {
    fn default() -> Self {
        Self::new(0)
    }
}

impl SeededRng {
    /// Create a new RNG from a 32-bit seed.
    pub const fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    /// Create a RNG from any integer seed, truncated to 32 bits.
    pub fn from_i64(seed: i64) -> Self {
        Self::new(seed as u32)
    }

    /// Advance the recurrence and return the raw 32-bit state.
    #[inline]
    pub fn next_u32(&mut self) -> u32 {
        self.state = self
            .state
            .wrapping_mul(LCG_MULTIPLIER)
            .wrapping_add(LCG_INCREMENT);
        self.state
    }

    /// Next float in [0, 1).
    #[inline]
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> f64 {
        self.next_u32() as f64 / STATE_SPAN
    }

    /// Random integer in [min, max). Returns `min` for an empty range.
    #[inline]
    pub fn next_int(&mut self, min: i32, max: i32) -> i32 {
        if max <= min {
            return min;
        }
        let span = (max as i64 - min as i64) as f64;
        let offset = (self.next() * span).floor() as i64;
        (min as i64 + offset) as i32
    }

    /// Random index in [0, len). Returns 0 for an empty range.
    #[inline]
    pub fn next_index(&mut self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        ((self.next() * len as f64).floor() as usize).min(len - 1)
    }

    /// Random float in [min, max].
    #[inline]
    pub fn next_float(&mut self, min: f64, max: f64) -> f64 {
        min + self.next() * (max - min)
    }

    /// Random boolean that is true with the given probability.
    #[inline]
    pub fn chance(&mut self, probability: f64) -> bool {
        self.next() < probability
    }

    /// Get current state (for checkpointing/debugging).
    pub fn state(&self) -> u32 {
        self.state
    }

    /// Restore from saved state.
    pub fn set_state(&mut self, state: u32) {
        self.state = state;
    }
}

// =============================================================================
// TESTS
// =============================================================================
