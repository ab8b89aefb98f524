use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;
use rv::misc::LogSumExp;

use crate::error::{Error, Result};

/// Seedable source of every stochastic decision made by a `View`.
///
/// Identical seeds and identical call sequences produce identical outputs.
#[derive(Clone, Debug)]
pub struct RandomNumberGenerator {
    engine: Xoshiro256Plus,
}

impl Default for RandomNumberGenerator {
    fn default() -> Self {
        Self::new(0)
    }
}

impl RandomNumberGenerator {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            engine: Xoshiro256Plus::seed_from_u64(seed),
        }
    }

    /// Uniform variate in `[0, 1)`.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> f64 {
        self.engine.random::<f64>()
    }

    /// Uniform integer in `[0, max)`.
    ///
    /// # Errors
    /// `Error::InvalidBound` if `max` is zero.
    pub fn nexti(&mut self, max: usize) -> Result<usize> {
        if max == 0 {
            return Err(Error::InvalidBound);
        }
        Ok(self.engine.random_range(0..max))
    }

    /// Reinitialize the generator state.
    pub fn set_seed(&mut self, seed: u64) {
        self.engine = Xoshiro256Plus::seed_from_u64(seed);
    }

    /// Draw an index with probability proportional to `exp(ln_weights[i])`.
    ///
    /// Entries of zero mass are never drawn and consume no randomness; every
    /// other entry consumes one uniform variate.
    ///
    /// # Errors
    /// If `ln_weights` is empty or its normalizer is not finite.
    pub fn ln_pflip(&mut self, ln_weights: &[f64]) -> Result<usize> {
        if ln_weights.is_empty() {
            return Err(Error::EmptyWeights);
        }

        let ln_norm = ln_weights.iter().logsumexp();
        if !ln_norm.is_finite() {
            return Err(Error::NonFiniteWeights(ln_norm));
        }

        let candidates: Vec<(usize, f64)> = ln_weights
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, w)| *w > f64::NEG_INFINITY)
            .collect();
        let ix = rv::misc::ln_pflip(
            candidates.iter().map(|(_, w)| *w),
            false,
            &mut self.engine,
        );

        candidates
            .get(ix)
            .map(|(i, _)| *i)
            .ok_or(Error::EmptyWeights)
    }
}
