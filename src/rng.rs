//! Reseeding randomness source for the havoc stage

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

use crate::consts::RNG_RESEED_INTERVAL;

/// PRNG that pulls a fresh seed from OS entropy every
/// [`RNG_RESEED_INTERVAL`] draws.
#[derive(Debug)]
pub struct ReseedingRng {
    rng: StdRng,
    draws: u32,
}

impl ReseedingRng {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            draws: 0,
        }
    }

    /// Deterministic instance for reproducible runs.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            draws: u32::MAX, // never reseed: determinism is the point
        }
    }

    fn tick(&mut self) {
        if self.draws == u32::MAX {
            return;
        }
        self.draws += 1;
        if self.draws >= RNG_RESEED_INTERVAL {
            self.rng = StdRng::from_entropy();
            self.draws = 0;
        }
    }

    pub fn next_u64(&mut self) -> u64 {
        self.tick();
        self.rng.next_u64()
    }

    /// Uniform draw in `[0, bound)`; `bound` must be non-zero.
    pub fn below(&mut self, bound: u64) -> u64 {
        self.tick();
        self.rng.gen_range(0..bound)
    }

    /// Fair coin.
    pub fn coin(&mut self) -> bool {
        self.below(2) == 1
    }
}

impl Default for ReseedingRng {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounded_draws_stay_bounded() {
        let mut rng = ReseedingRng::with_seed(7);
        for _ in 0..1000 {
            assert!(rng.below(17) < 17);
        }
    }

    #[test]
    fn seeded_instances_agree() {
        let mut a = ReseedingRng::with_seed(42);
        let mut b = ReseedingRng::with_seed(42);
        for _ in 0..64 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }
}
