use crate::error::Result;
use crate::rng::RandomNumberGenerator;

use super::Model;
use super::cluster::ClusterId;

/// Destination of a datum being placed into a partition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Assignment {
    /// An existing partition.
    Existing(ClusterId),
    /// A partition created for this datum.
    New,
}

/// A model which support a partition based hierarchy.
///
/// Every mutating method returns the change it caused in
/// [`Model::ln_score`].
pub trait PartitionModel<X: ?Sized>: Model {
    /// Assign datum `idx` with value `x` to `target`.
    ///
    /// # Errors
    /// If `idx` is already assigned, `target` is unknown, or `x` has the
    /// wrong shape.
    fn assign(&mut self, idx: usize, target: Assignment, x: &X) -> Result<f64>;

    /// Unassign datum `idx`. Partitions left empty are dropped.
    ///
    /// # Errors
    /// If `idx` is not assigned or `x` has the wrong shape.
    fn unassign(&mut self, idx: usize, x: &X) -> Result<f64>;

    /// Check that `x` could be assigned, without touching the model.
    ///
    /// # Errors
    /// If `x` has the wrong shape or holds values the model cannot score.
    fn check_datum(&self, x: &X) -> Result<()>;

    /// Handles of the current partitions, in candidate order.
    fn partitions(&self) -> Vec<ClusterId>;

    /// The partition holding datum `idx`, if it is assigned.
    fn partition_of(&self, idx: usize) -> Option<ClusterId>;

    /// Log Posterior Predictive for datum `x` in partition `k`, weighted by
    /// the partition's size.
    ///
    /// # Errors
    /// If `k` is unknown or `x` has the wrong shape.
    fn ln_pp_partition(&self, x: &X, k: ClusterId) -> Result<f64>;

    /// Log Posterior Predictive for datum `x` to appear in an empty partition,
    /// weighted by the concentration.
    ///
    /// # Errors
    /// If `x` has the wrong shape.
    fn ln_pp_empty(&self, x: &X) -> Result<f64>;

    /// Size of each partition, in [`partitions`](Self::partitions) order.
    fn counts(&self) -> Vec<usize>;

    /// Assigned data, ascending.
    fn assigned(&self) -> Vec<usize>;

    /// Source of the model's stochastic choices.
    fn rng(&mut self) -> &mut RandomNumberGenerator;

    /// The number of partitions.
    fn n_partitions(&self) -> usize {
        self.partitions().len()
    }

    /// The number of assigned data.
    fn n_data(&self) -> usize {
        self.assigned().len()
    }
}
