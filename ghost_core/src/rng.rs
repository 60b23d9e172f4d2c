//! Seeded random draws for shuffles, repeat counts and offsets.
//!
//! Every consumer gets its own ChaCha8 stream derived from the workout seed,
//! so a pattern's draws never depend on how many draws another pattern made.
//! A stream's position is plain data and restores exactly.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Stream used for workout-level draws (superset count, pattern order)
pub const WORKOUT_STREAM: u64 = 0;

/// Stream for one pattern ordinal: the pattern's slot within one superset pass
pub fn pattern_stream(superset: u32, pattern_count: usize, pattern_index: usize) -> u64 {
    1 + superset as u64 * pattern_count as u64 + pattern_index as u64
}

/// Serializable position of a [`SeededRng`]
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RngPosition {
    pub seed: u64,
    pub stream: u64,
    /// Number of draws consumed so far
    pub draws: u64,
    pub word_pos: u128,
}

/// Deterministic draw source keyed by `(seed, stream)`
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(from = "RngPosition", into = "RngPosition")]
pub struct SeededRng {
    seed: u64,
    stream: u64,
    draws: u64,
    rng: ChaCha8Rng,
}

impl SeededRng {
    pub fn new(seed: u64, stream: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        rng.set_stream(stream);
        Self {
            seed,
            stream,
            draws: 0,
            rng,
        }
    }

    pub fn position(&self) -> RngPosition {
        RngPosition {
            seed: self.seed,
            stream: self.stream,
            draws: self.draws,
            word_pos: self.rng.get_word_pos(),
        }
    }

    pub fn from_position(position: RngPosition) -> Self {
        let mut restored = Self::new(position.seed, position.stream);
        restored.rng.set_word_pos(position.word_pos);
        restored.draws = position.draws;
        restored
    }

    pub fn draws(&self) -> u64 {
        self.draws
    }

    /// Uniform draw in `[0, 1)`
    pub fn next_unit(&mut self) -> f64 {
        self.draws += 1;
        self.rng.random::<f64>()
    }

    /// Uniform index in `0..n`; `n` must be non-zero
    pub fn below(&mut self, n: usize) -> usize {
        let pick = (self.next_unit() * n as f64).floor() as usize;
        pick.min(n.saturating_sub(1))
    }

    /// `floor(rand() * (max - min + 1)) + min`
    pub fn int_inclusive(&mut self, min: u32, max: u32) -> u32 {
        let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
        let span = (hi - lo) as u64 + 1;
        let pick = (self.next_unit() * span as f64).floor() as u64;
        lo + pick.min(span - 1) as u32
    }

    /// Uniform value in `[min, max]`
    pub fn uniform(&mut self, min: f64, max: f64) -> f64 {
        let unit = self.next_unit();
        min + unit * (max - min)
    }

    /// Fisher-Yates shuffle in place
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.below(i + 1);
            items.swap(i, j);
        }
    }
}

impl PartialEq for SeededRng {
    fn eq(&self, other: &Self) -> bool {
        self.position() == other.position()
    }
}

impl From<RngPosition> for SeededRng {
    fn from(position: RngPosition) -> Self {
        Self::from_position(position)
    }
}

impl From<SeededRng> for RngPosition {
    fn from(rng: SeededRng) -> Self {
        rng.position()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_draws() {
        let mut a = SeededRng::new(42, 3);
        let mut b = SeededRng::new(42, 3);
        for _ in 0..20 {
            assert_eq!(a.next_unit(), b.next_unit());
        }
        assert_eq!(a.draws(), 20);
    }

    #[test]
    fn test_streams_are_independent() {
        let mut a = SeededRng::new(42, 1);
        let mut b = SeededRng::new(42, 2);
        let xs: Vec<f64> = (0..5).map(|_| a.next_unit()).collect();
        let ys: Vec<f64> = (0..5).map(|_| b.next_unit()).collect();
        assert_ne!(xs, ys);
    }

    #[test]
    fn test_restore_from_position_continues_stream() {
        let mut original = SeededRng::new(7, WORKOUT_STREAM);
        for _ in 0..13 {
            original.next_unit();
        }

        let json = serde_json::to_string(&original).unwrap();
        let mut restored: SeededRng = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.draws(), 13);
        for _ in 0..10 {
            assert_eq!(original.next_unit(), restored.next_unit());
        }
    }

    #[test]
    fn test_int_inclusive_stays_in_range() {
        let mut rng = SeededRng::new(99, 5);
        for _ in 0..200 {
            let n = rng.int_inclusive(2, 4);
            assert!((2..=4).contains(&n));
        }
        assert_eq!(rng.int_inclusive(3, 3), 3);
    }

    #[test]
    fn test_uniform_stays_in_range() {
        let mut rng = SeededRng::new(1, 1);
        for _ in 0..200 {
            let x = rng.uniform(-0.5, 1.5);
            assert!((-0.5..=1.5).contains(&x));
        }
    }

    #[test]
    fn test_shuffle_is_permutation() {
        let mut rng = SeededRng::new(5, 9);
        let mut items: Vec<usize> = (0..10).collect();
        rng.shuffle(&mut items);
        let mut sorted = items.clone();
        sorted.sort();
        assert_eq!(sorted, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_pattern_streams_distinct_across_supersets() {
        assert_ne!(pattern_stream(0, 3, 2), pattern_stream(1, 3, 2));
        assert_ne!(pattern_stream(0, 3, 0), WORKOUT_STREAM);
    }
}
