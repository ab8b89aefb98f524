use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::Model;

pub mod samplers;

/// Trait for Markov Chain Monte Carlo Samplers.
///
/// Samplers mutate the model in place and report the change in
/// [`Model::ln_score`] their step caused.
pub trait Sampler<M, D: ?Sized>: Sized
where
    M: Model,
{
    /// Step the Sampler.
    ///
    /// # Errors
    /// Whatever the model reports while being updated.
    fn step(&mut self, model: &mut M, data: &D) -> Result<f64>;

    /// Run `steps` steps, returning the accumulated score change.
    ///
    /// # Errors
    /// The first error any step reports.
    fn multi_step(&mut self, model: &mut M, data: &D, steps: usize) -> Result<f64> {
        (0..steps).try_fold(0.0, |acc, _| Ok(acc + self.step(model, data)?))
    }
}

/// The transitions a view can run, in the order given by the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewTransition {
    /// Gibbs sweep over the row assignments.
    RowAssignment,
    /// Grid update of the CRP concentration.
    Alpha,
    /// Grid update of every column's prior.
    Hypers,
}

impl ViewTransition {
    /// Row assignments, then alpha, then hypers.
    #[must_use]
    pub const fn default_order() -> [Self; 3] {
        [Self::RowAssignment, Self::Alpha, Self::Hypers]
    }
}
