use crate::data::RowData;
use crate::error::{Error, Result};
use crate::mcmc::Sampler;
use crate::models::cluster::ClusterId;
use crate::models::partition::{Assignment, PartitionModel};

/// Gibbs based sampling on the space of partitions.
#[derive(Default, Clone, Copy, Debug)]
pub struct PartitionGibbs {}

impl PartitionGibbs {
    #[must_use]
    pub const fn new() -> Self {
        Self {}
    }

    /// Place the unassigned datum `idx` by drawing from the CRP predictive.
    ///
    /// Candidates are the existing partitions in order, then a new one. With
    /// no existing partition the new one is taken without touching the rng.
    ///
    /// # Errors
    /// Whatever the model reports while scoring or assigning.
    pub fn reinsert<X, M>(model: &mut M, idx: usize, x: &X) -> Result<f64>
    where
        X: ?Sized,
        M: PartitionModel<X>,
    {
        let partitions = model.partitions();
        let target = if partitions.is_empty() {
            Assignment::New
        } else {
            let mut ln_weights = partitions
                .iter()
                .map(|&k| model.ln_pp_partition(x, k))
                .collect::<Result<Vec<f64>>>()?;
            ln_weights.push(model.ln_pp_empty(x)?);

            let ix = model.rng().ln_pflip(&ln_weights)?;
            partitions
                .get(ix)
                .map_or(Assignment::New, |&k| Assignment::Existing(k))
        };

        log::trace!("row {idx} -> {target:?}");
        model.assign(idx, target, x)
    }

    /// Put datum `idx` back where it was before a failed move, or into a
    /// fresh partition if that one was dropped when it emptied.
    fn restore<X, M>(model: &mut M, idx: usize, x: &X, home: Option<ClusterId>) -> Result<f64>
    where
        X: ?Sized,
        M: PartitionModel<X>,
    {
        let target = match home {
            Some(k) if model.partitions().contains(&k) => Assignment::Existing(k),
            _ => Assignment::New,
        };
        model.assign(idx, target, x)
    }
}

impl<M> Sampler<M, RowData> for PartitionGibbs
where
    M: PartitionModel<[f64]>,
{
    /// One sweep over the assigned data in ascending order.
    ///
    /// A datum is checked before it is unassigned, and restored if it cannot
    /// be placed again, so a failed sweep never loses a datum.
    fn step(&mut self, model: &mut M, data: &RowData) -> Result<f64> {
        let mut delta = 0.0;
        for idx in model.assigned() {
            let x = data.get(&idx).ok_or(Error::MissingRowData(idx))?.as_slice();
            model.check_datum(x)?;

            let home = model.partition_of(idx);
            delta += model.unassign(idx, x)?;
            match Self::reinsert(model, idx, x) {
                Ok(d) => delta += d,
                Err(err) => {
                    if let Err(restore_err) = Self::restore(model, idx, x, home) {
                        log::warn!("row {idx} could not be restored: {restore_err}");
                    }
                    return Err(err);
                }
            }
        }
        Ok(delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::BTreeSet;

    use crate::data::row_data;
    use crate::models::Model;
    use crate::view::View;

    fn two_modes() -> Vec<Vec<f64>> {
        (0..20)
            .map(|i| {
                #[allow(clippy::cast_precision_loss)]
                let jitter = (i % 5) as f64 * 0.1;
                if i < 10 {
                    vec![-20.0 + jitter]
                } else {
                    vec![20.0 + jitter]
                }
            })
            .collect()
    }

    #[test]
    fn reinsert_into_empty_model_does_not_draw() {
        let data = two_modes();
        let mut view = View::builder(&data).populate(false).seed_from_u64(7).build().unwrap();
        let mut reference = crate::rng::RandomNumberGenerator::new(7);

        PartitionGibbs::reinsert(&mut view, 3, data[3].as_slice()).unwrap();

        assert_eq!(view.n_clusters(), 1);
        assert_eq!(view.rng().next().to_bits(), reference.next().to_bits());
    }

    #[test]
    fn sweep_keeps_every_row() {
        let data = two_modes();
        let mut view = View::builder(&data).seed_from_u64(0x1234).build().unwrap();
        let rows = row_data(&data, &(0..20).collect::<Vec<_>>(), &[0]).unwrap();

        let before = view.ln_score();
        let delta = PartitionGibbs::new().step(&mut view, &rows).unwrap();

        assert_eq!(view.n_data(), 20);
        assert::close(view.ln_score() - before, delta, 1e-8);
        view.assert_state_consistency().unwrap();
    }

    #[test]
    fn two_gaussian_modes() {
        let data = two_modes();
        let mut view = View::builder(&data).seed_from_u64(0xABCD).build().unwrap();
        let rows = row_data(&data, &(0..20).collect::<Vec<_>>(), &[0]).unwrap();

        PartitionGibbs::new()
            .multi_step(&mut view, &rows, 50)
            .unwrap();

        // No cluster holds rows from both modes.
        let low: BTreeSet<_> = (0..10).filter_map(|r| view.cluster_of(r)).collect();
        let high: BTreeSet<_> = (10..20).filter_map(|r| view.cluster_of(r)).collect();
        assert!(low.is_disjoint(&high));
        assert!(view.n_clusters() >= 2);
        view.assert_state_consistency().unwrap();
    }

    #[test]
    fn non_finite_row_is_rejected_before_it_moves() {
        let data: Vec<Vec<f64>> = vec![
            vec![0.1, 1.0],
            vec![0.3, 1.2],
            vec![5.0, -2.0],
            vec![5.2, -2.1],
        ];
        let mut view = View::new(&data, &[0, 1, 2, 3], &[0, 1], 11).unwrap();
        let mut rows = row_data(&data, &[0, 1, 2, 3], &[0, 1]).unwrap();
        rows.insert(2, vec![f64::NAN, 0.5]);

        let err = PartitionGibbs::new().step(&mut view, &rows).unwrap_err();

        assert!(matches!(err, Error::InvalidParameter { name: "values", .. }));
        assert_eq!(view.n_data(), 4);
        assert!(view.cluster_of(2).is_some());
        view.assert_state_consistency().unwrap();
    }

    /// Delegates to a view but cannot score a new partition.
    struct NoNewPartitions(View);

    impl Model for NoNewPartitions {
        fn ln_score(&self) -> f64 {
            self.0.ln_score()
        }
    }

    impl PartitionModel<[f64]> for NoNewPartitions {
        fn assign(&mut self, idx: usize, target: Assignment, x: &[f64]) -> Result<f64> {
            self.0.assign(idx, target, x)
        }

        fn unassign(&mut self, idx: usize, x: &[f64]) -> Result<f64> {
            self.0.unassign(idx, x)
        }

        fn check_datum(&self, x: &[f64]) -> Result<()> {
            self.0.check_datum(x)
        }

        fn partitions(&self) -> Vec<ClusterId> {
            self.0.partitions()
        }

        fn partition_of(&self, idx: usize) -> Option<ClusterId> {
            self.0.partition_of(idx)
        }

        fn ln_pp_partition(&self, x: &[f64], k: ClusterId) -> Result<f64> {
            self.0.ln_pp_partition(x, k)
        }

        fn ln_pp_empty(&self, _x: &[f64]) -> Result<f64> {
            Err(Error::NonFiniteWeights(f64::NEG_INFINITY))
        }

        fn counts(&self) -> Vec<usize> {
            self.0.counts()
        }

        fn assigned(&self) -> Vec<usize> {
            self.0.assigned()
        }

        fn rng(&mut self) -> &mut crate::rng::RandomNumberGenerator {
            self.0.rng()
        }
    }

    #[test]
    fn failed_move_restores_the_row_to_its_cluster() {
        let data = two_modes();
        let mut view = View::builder(&data).populate(false).build().unwrap();
        view.assign(0, Assignment::New, data[0].as_slice()).unwrap();
        let home = view.cluster_of(0).unwrap();
        for r in 1..4 {
            view.assign(r, Assignment::Existing(home), data[r].as_slice()).unwrap();
        }
        let score = view.ln_score();
        let rows = row_data(&data, &[0, 1, 2, 3], &[0]).unwrap();

        let mut model = NoNewPartitions(view);
        let err = PartitionGibbs::new().step(&mut model, &rows).unwrap_err();
        let view = model.0;

        assert_eq!(err, Error::NonFiniteWeights(f64::NEG_INFINITY));
        assert_eq!(view.cluster_of(0), Some(home));
        assert_eq!(view.n_data(), 4);
        assert::close(view.ln_score(), score, 1e-10);
        view.assert_state_consistency().unwrap();
    }

    #[test]
    fn failed_move_recreates_a_dropped_singleton() {
        let data = two_modes();
        let mut view = View::builder(&data).populate(false).build().unwrap();
        view.assign(0, Assignment::New, data[0].as_slice()).unwrap();
        view.assign(12, Assignment::New, data[12].as_slice()).unwrap();
        let score = view.ln_score();
        let rows = row_data(&data, &[0, 12], &[0]).unwrap();

        let mut model = NoNewPartitions(view);
        assert!(PartitionGibbs::new().step(&mut model, &rows).is_err());
        let view = model.0;

        assert_eq!(view.n_data(), 2);
        assert_eq!(view.n_clusters(), 2);
        assert_ne!(view.cluster_of(0), view.cluster_of(12));
        assert::close(view.ln_score(), score, 1e-10);
        view.assert_state_consistency().unwrap();
    }

    #[test]
    fn missing_row_data_is_an_error() {
        let data = two_modes();
        let mut view = View::builder(&data).build().unwrap();
        let mut rows = row_data(&data, &(0..20).collect::<Vec<_>>(), &[0]).unwrap();
        rows.remove(&4);

        let err = PartitionGibbs::new().step(&mut view, &rows).unwrap_err();
        assert_eq!(err, Error::MissingRowData(4));
    }
}
