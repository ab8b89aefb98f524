use std::collections::BTreeSet;
use std::fmt;

use rv::data::GaussianSuffStat;
use rv::dist::NormalGamma;
use rv::traits::SuffStat;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::numerics::ln_m;
use crate::utils::NoPrettyPrint;

use super::Model;
use super::hypers::ColumnHypers;

/// Stable handle of a cluster within a view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClusterId(pub usize);

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One cell of a view's partition.
///
/// Holds the member rows, a Gaussian sufficient statistic per column and the
/// marginal log-likelihood of each statistic under its column's prior.
#[derive(Clone)]
pub struct Cluster {
    id: ClusterId,
    row_ids: BTreeSet<usize>,
    stats: Vec<GaussianSuffStat>,
    scores: Vec<f64>,
}

impl fmt::Debug for Cluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cluster")
            .field("id", &self.id)
            .field("row_ids", &NoPrettyPrint::new(&self.row_ids))
            .field("scores", &NoPrettyPrint::new(&self.scores))
            .finish_non_exhaustive()
    }
}

impl Cluster {
    /// An empty cluster over `n_cols` columns.
    #[must_use]
    pub fn new(id: ClusterId, n_cols: usize) -> Self {
        Self {
            id,
            row_ids: BTreeSet::new(),
            stats: (0..n_cols).map(|_| GaussianSuffStat::new()).collect(),
            scores: vec![0.0; n_cols],
        }
    }

    #[must_use]
    pub const fn id(&self) -> ClusterId {
        self.id
    }

    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.row_ids.len()
    }

    #[must_use]
    pub fn n_cols(&self) -> usize {
        self.stats.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.row_ids.is_empty()
    }

    #[must_use]
    pub fn contains(&self, row_id: usize) -> bool {
        self.row_ids.contains(&row_id)
    }

    /// Member row ids in ascending order.
    #[must_use]
    pub fn row_indices(&self) -> Vec<usize> {
        self.row_ids.iter().copied().collect()
    }

    #[must_use]
    pub fn stats(&self) -> &[GaussianSuffStat] {
        &self.stats
    }

    /// Cached marginal log-likelihood of each column.
    #[must_use]
    pub fn column_scores(&self) -> &[f64] {
        &self.scores
    }

    fn check_width(&self, values: &[f64], hypers: &[ColumnHypers]) -> Result<()> {
        if values.len() != self.n_cols() {
            return Err(Error::DimensionMismatch {
                expected: self.n_cols(),
                found: values.len(),
            });
        }
        if hypers.len() != self.n_cols() {
            return Err(Error::DimensionMismatch {
                expected: self.n_cols(),
                found: hypers.len(),
            });
        }
        Ok(())
    }

    /// Add a row. Returns the change in the cluster's score.
    ///
    /// # Errors
    /// If the row is already a member or the widths disagree.
    pub fn insert_row(
        &mut self,
        values: &[f64],
        row_id: usize,
        hypers: &[ColumnHypers],
    ) -> Result<f64> {
        self.check_width(values, hypers)?;
        if self.row_ids.contains(&row_id) {
            return Err(Error::RowAlreadyPresent(row_id));
        }

        let before = self.score();
        self.row_ids.insert(row_id);
        for ((stat, score), (x, h)) in self
            .stats
            .iter_mut()
            .zip(self.scores.iter_mut())
            .zip(values.iter().zip(hypers))
        {
            stat.observe(x);
            *score = ln_m(h.prior(), stat);
        }

        Ok(self.score() - before)
    }

    /// Remove a member row. Returns the change in the cluster's score.
    ///
    /// `values` must be the values the row was inserted with.
    ///
    /// # Errors
    /// If the row is not a member or the widths disagree.
    pub fn remove_row(
        &mut self,
        values: &[f64],
        row_id: usize,
        hypers: &[ColumnHypers],
    ) -> Result<f64> {
        self.check_width(values, hypers)?;
        if !self.row_ids.remove(&row_id) {
            return Err(Error::RowNotInCluster {
                row: row_id,
                cluster: self.id.0,
            });
        }

        let before = self.score();
        if self.row_ids.is_empty() {
            // Nothing left to score; reset rather than evaluate an empty statistic.
            self.stats.iter_mut().for_each(|s| *s = GaussianSuffStat::new());
            self.scores.iter_mut().for_each(|s| *s = 0.0);
        } else {
            for ((stat, score), (x, h)) in self
                .stats
                .iter_mut()
                .zip(self.scores.iter_mut())
                .zip(values.iter().zip(hypers))
            {
                stat.forget(x);
                *score = ln_m(h.prior(), stat);
            }
        }

        Ok(self.score() - before)
    }

    /// Log of the ratio of this cluster's marginal likelihood with `values`
    /// added to its marginal likelihood without them.
    ///
    /// # Errors
    /// If the widths disagree.
    pub fn score_row_insertion(&self, values: &[f64], hypers: &[ColumnHypers]) -> Result<f64> {
        self.check_width(values, hypers)?;
        Ok(self
            .stats
            .iter()
            .zip(self.scores.iter())
            .zip(values.iter().zip(hypers))
            .map(|((stat, score), (x, h))| {
                let mut with_x = stat.clone();
                with_x.observe(x);
                ln_m(h.prior(), &with_x) - score
            })
            .sum())
    }

    /// Marginal log-likelihood of a cluster holding only `values`.
    ///
    /// # Errors
    /// If the widths disagree.
    pub fn singleton_score(values: &[f64], hypers: &[ColumnHypers]) -> Result<f64> {
        if values.len() != hypers.len() {
            return Err(Error::DimensionMismatch {
                expected: hypers.len(),
                found: values.len(),
            });
        }
        Ok(values
            .iter()
            .zip(hypers)
            .map(|(x, h)| {
                let mut stat = GaussianSuffStat::new();
                stat.observe(x);
                ln_m(h.prior(), &stat)
            })
            .sum())
    }

    fn new_col(&self, values: &[f64], hypers: &ColumnHypers) -> Result<(GaussianSuffStat, f64)> {
        if values.len() != self.n_rows() {
            return Err(Error::DimensionMismatch {
                expected: self.n_rows(),
                found: values.len(),
            });
        }

        let mut stat = GaussianSuffStat::new();
        values.iter().for_each(|x| stat.observe(x));
        let score = if self.is_empty() {
            0.0
        } else {
            ln_m(hypers.prior(), &stat)
        };
        Ok((stat, score))
    }

    /// The score a column holding `values` would add, without adding it.
    ///
    /// # Errors
    /// If `values` does not have one entry per member.
    pub fn score_new_col(&self, values: &[f64], hypers: &ColumnHypers) -> Result<f64> {
        self.new_col(values, hypers).map(|(_, score)| score)
    }

    /// Append a column. `values` holds one value per member, in
    /// [`row_indices`](Self::row_indices) order. Returns the new column's score.
    ///
    /// # Errors
    /// If `values` does not have one entry per member.
    pub fn insert_col(&mut self, values: &[f64], hypers: &ColumnHypers) -> Result<f64> {
        let (stat, score) = self.new_col(values, hypers)?;
        self.stats.push(stat);
        self.scores.push(score);
        Ok(score)
    }

    /// Drop the column at local index `col`. Returns the change in score.
    ///
    /// # Errors
    /// If `col` is out of range.
    pub fn remove_col(&mut self, col: usize) -> Result<f64> {
        if col >= self.n_cols() {
            return Err(Error::IndexOutOfBounds {
                index: col,
                len: self.n_cols(),
            });
        }
        self.stats.remove(col);
        Ok(-self.scores.remove(col))
    }

    /// Score of column `col` under an arbitrary prior, without storing it.
    ///
    /// # Errors
    /// If `col` is out of range or the cluster is empty.
    pub fn column_score_under(&self, col: usize, prior: &NormalGamma) -> Result<f64> {
        let stat = self.stats.get(col).ok_or(Error::IndexOutOfBounds {
            index: col,
            len: self.n_cols(),
        })?;
        if self.is_empty() {
            return Err(Error::DegenerateCluster {
                n_rows: 0,
                n_cols: self.n_cols(),
            });
        }
        Ok(ln_m(prior, stat))
    }

    /// Re-score column `col` under a new prior. Returns the change in score.
    ///
    /// # Errors
    /// If `col` is out of range or the cluster is empty.
    pub fn set_column_prior(&mut self, col: usize, prior: &NormalGamma) -> Result<f64> {
        let new_score = self.column_score_under(col, prior)?;
        let delta = new_score - self.scores[col];
        self.scores[col] = new_score;
        Ok(delta)
    }

    /// Recompute the marginal log-likelihood from the statistics alone.
    ///
    /// # Errors
    /// `Error::DegenerateCluster` if the cluster has no rows or no columns.
    pub fn marginal_logp(&self, hypers: &[ColumnHypers]) -> Result<f64> {
        if self.is_empty() || self.n_cols() == 0 {
            return Err(Error::DegenerateCluster {
                n_rows: self.n_rows(),
                n_cols: self.n_cols(),
            });
        }
        if hypers.len() != self.n_cols() {
            return Err(Error::DimensionMismatch {
                expected: self.n_cols(),
                found: hypers.len(),
            });
        }
        Ok(self
            .stats
            .iter()
            .zip(hypers)
            .map(|(stat, h)| ln_m(h.prior(), stat))
            .sum())
    }
}

impl Model for Cluster {
    /// Cached sum of the per-column scores.
    fn ln_score(&self) -> f64 {
        self.scores.iter().sum()
    }
}

impl Cluster {
    /// Cached marginal log-likelihood; see [`Model::ln_score`].
    #[must_use]
    pub fn score(&self) -> f64 {
        self.ln_score()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hypers(n_cols: usize) -> Vec<ColumnHypers> {
        (0..n_cols)
            .map(|_| ColumnHypers::from_data(&[-1.0, 0.0, 1.0, 2.0], 5).unwrap())
            .collect()
    }

    #[test]
    fn insert_and_remove_round_trip() {
        let hs = hypers(2);
        let mut cluster = Cluster::new(ClusterId(0), 2);

        let d0 = cluster.insert_row(&[0.5, 1.0], 3, &hs).unwrap();
        let d1 = cluster.insert_row(&[1.5, -1.0], 7, &hs).unwrap();
        assert::close(cluster.score(), d0 + d1, 1e-12);
        assert_eq!(cluster.row_indices(), vec![3, 7]);
        assert_eq!(cluster.stats()[0].n(), 2);

        let d2 = cluster.remove_row(&[1.5, -1.0], 7, &hs).unwrap();
        assert::close(d1 + d2, 0.0, 1e-10);
        assert::close(cluster.score(), d0, 1e-10);

        cluster.remove_row(&[0.5, 1.0], 3, &hs).unwrap();
        assert!(cluster.is_empty());
        assert_eq!(cluster.score(), 0.0);
        assert!(cluster.stats().iter().all(|s| s.n() == 0));
    }

    #[test]
    fn insert_score_matches_predicted_ratio() {
        let hs = hypers(3);
        let mut cluster = Cluster::new(ClusterId(1), 3);
        cluster.insert_row(&[0.1, 0.2, 0.3], 0, &hs).unwrap();
        cluster.insert_row(&[1.1, -0.2, 0.0], 1, &hs).unwrap();

        let x = [0.4, 0.0, 2.0];
        let predicted = cluster.score_row_insertion(&x, &hs).unwrap();
        let actual = cluster.insert_row(&x, 2, &hs).unwrap();
        assert::close(predicted, actual, 1e-10);
    }

    #[test]
    fn singleton_score_matches_fresh_cluster() {
        let hs = hypers(2);
        let x = [0.3, -0.7];
        let mut cluster = Cluster::new(ClusterId(0), 2);
        let delta = cluster.insert_row(&x, 0, &hs).unwrap();
        assert::close(Cluster::singleton_score(&x, &hs).unwrap(), delta, 1e-12);
    }

    #[test]
    fn membership_errors() {
        let hs = hypers(1);
        let mut cluster = Cluster::new(ClusterId(4), 1);
        cluster.insert_row(&[1.0], 0, &hs).unwrap();

        assert_eq!(
            cluster.insert_row(&[1.0], 0, &hs),
            Err(Error::RowAlreadyPresent(0))
        );
        assert_eq!(
            cluster.remove_row(&[1.0], 9, &hs),
            Err(Error::RowNotInCluster { row: 9, cluster: 4 })
        );
        assert!(matches!(
            cluster.insert_row(&[1.0, 2.0], 1, &hs),
            Err(Error::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn column_round_trip() {
        let hs = hypers(2);
        let mut cluster = Cluster::new(ClusterId(0), 1);
        cluster.insert_row(&[0.0], 5, &hs[..1]).unwrap();
        cluster.insert_row(&[1.0], 2, &hs[..1]).unwrap();
        let before = cluster.score();

        // row 2 then row 5
        let predicted = cluster.score_new_col(&[3.0, 4.0], &hs[1]).unwrap();
        let added = cluster.insert_col(&[3.0, 4.0], &hs[1]).unwrap();
        assert_eq!(predicted.to_bits(), added.to_bits());
        assert_eq!(cluster.n_cols(), 2);
        assert_eq!(cluster.stats()[1].n(), 2);
        assert::close(cluster.score(), before + added, 1e-12);

        let removed = cluster.remove_col(1).unwrap();
        assert::close(removed, -added, 1e-12);
        assert::close(cluster.score(), before, 1e-12);
        assert!(cluster.remove_col(1).is_err());
    }

    #[test]
    fn degenerate_clusters_are_not_scored() {
        let hs = hypers(1);
        let empty = Cluster::new(ClusterId(0), 1);
        assert!(matches!(
            empty.marginal_logp(&hs),
            Err(Error::DegenerateCluster { n_rows: 0, .. })
        ));

        let mut no_cols = Cluster::new(ClusterId(1), 0);
        no_cols.insert_row(&[], 0, &[]).unwrap();
        assert!(matches!(
            no_cols.marginal_logp(&[]),
            Err(Error::DegenerateCluster { n_cols: 0, .. })
        ));
    }

    #[test]
    fn recompute_matches_cache() {
        let hs = hypers(2);
        let mut cluster = Cluster::new(ClusterId(0), 2);
        for (i, x) in [[0.1, 0.2], [1.0, 3.0], [-2.0, 0.5]].iter().enumerate() {
            cluster.insert_row(x, i, &hs).unwrap();
        }
        assert::close(cluster.marginal_logp(&hs).unwrap(), cluster.score(), 1e-12);
    }

    #[test]
    fn set_column_prior_updates_cache() {
        let mut hs = hypers(1);
        let mut cluster = Cluster::new(ClusterId(0), 1);
        cluster.insert_row(&[0.1], 0, &hs).unwrap();
        cluster.insert_row(&[0.9], 1, &hs).unwrap();

        let before = cluster.score();
        hs[0].set(crate::models::hypers::Hyper::R, 3.0).unwrap();
        let delta = cluster.set_column_prior(0, hs[0].prior()).unwrap();
        assert::close(cluster.score(), before + delta, 1e-12);
        assert::close(cluster.marginal_logp(&hs).unwrap(), cluster.score(), 1e-12);
    }
}
