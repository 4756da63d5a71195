// src/selection/tie_break.rs

use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Injectable uniform selector used to break CTR ties. Constructor
/// injection keeps selection deterministic under test: swap in a
/// seeded or fixed implementation.
pub trait TieBreaker: Send + Sync {
    /// Uniformly pick an index in `0..candidates`; `candidates >= 1`.
    fn pick(&self, candidates: usize) -> usize;
}

/// Production tie-breaker over the thread-local RNG.
pub struct StdTieBreaker;

impl TieBreaker for StdTieBreaker {
    fn pick(&self, candidates: usize) -> usize {
        rand::thread_rng().gen_range(0..candidates)
    }
}

/// Reproducible tie-breaker for tests and replay.
pub struct SeededTieBreaker {
    rng: Mutex<StdRng>,
}

impl SeededTieBreaker {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl TieBreaker for SeededTieBreaker {
    fn pick(&self, candidates: usize) -> usize {
        match self.rng.lock() {
            Ok(mut rng) => rng.gen_range(0..candidates),
            Err(_) => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn std_tie_breaker_stays_in_range() {
        let tie_breaker = StdTieBreaker;
        for _ in 0..100 {
            assert!(tie_breaker.pick(3) < 3);
        }
    }

    #[test]
    fn same_seed_produces_same_pick_sequence() {
        let a = SeededTieBreaker::new(42);
        let b = SeededTieBreaker::new(42);
        let picks_a: Vec<usize> = (0..20).map(|_| a.pick(5)).collect();
        let picks_b: Vec<usize> = (0..20).map(|_| b.pick(5)).collect();
        assert_eq!(picks_a, picks_b);
    }
}
