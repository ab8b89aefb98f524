//! A view: a CRP mixture over a subset of the columns.
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use rv::dist::NormalGamma;

use crate::config::ViewConfig;
use crate::data::{RowData, select};
use crate::error::{Error, Result};
use crate::mcmc::samplers::grid::{CrpAlphaGrid, HyperGrid};
use crate::mcmc::samplers::partition::gibbs::PartitionGibbs;
use crate::mcmc::{Sampler, ViewTransition};
use crate::models::Model;
use crate::models::cluster::{Cluster, ClusterId};
use crate::models::hypers::{ColumnHypers, Hyper};
use crate::models::partition::{Assignment, PartitionModel};
use crate::numerics::{grid_size, lcrp, log_linspace};
use crate::rng::RandomNumberGenerator;

pub mod diagnostics;

use diagnostics::{ClusterSummary, ColumnSummary, Diagnostics, ScoreMatrix, ViewSummary};

/// The transitions run per iteration by [`View::update`] unless told otherwise.
#[must_use]
pub fn default_transitions() -> Vec<ViewTransition> {
    ViewTransition::default_order().to_vec()
}

/// Builds a [`View`].
pub struct Builder<'a> {
    data: &'a [Vec<f64>],
    rows: Option<Vec<usize>>,
    cols: Option<Vec<usize>>,
    seed: u64,
    config: ViewConfig,
    diagnostics: Option<Box<dyn Diagnostics + Send>>,
    populate: bool,
}

impl<'a> Builder<'a> {
    /// Start building a view over `data`, a row-major matrix holding every
    /// column of the dataset.
    ///
    /// Unless told otherwise the view takes every row, every column of the
    /// first row and seed 0.
    #[must_use]
    pub fn new(data: &'a [Vec<f64>]) -> Self {
        Self {
            data,
            rows: None,
            cols: None,
            seed: 0,
            config: ViewConfig::default(),
            diagnostics: None,
            populate: true,
        }
    }

    /// Global row ids, in insertion order.
    #[must_use]
    pub fn rows(mut self, rows: impl Into<Vec<usize>>) -> Self {
        self.rows = Some(rows.into());
        self
    }

    /// Global column ids, in local order.
    #[must_use]
    pub fn cols(mut self, cols: impl Into<Vec<usize>>) -> Self {
        self.cols = Some(cols.into());
        self
    }

    /// Set the RNG seed
    #[must_use]
    pub fn seed_from_u64(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub fn config(mut self, config: ViewConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn diagnostics(mut self, sink: Box<dyn Diagnostics + Send>) -> Self {
        self.diagnostics = Some(sink);
        self
    }

    /// Whether `build` inserts the selected rows. When `false` the priors are
    /// still fit to the selected rows but the view starts empty.
    #[must_use]
    pub fn populate(mut self, populate: bool) -> Self {
        self.populate = populate;
        self
    }

    /// Build the `View` and consume the builder
    ///
    /// # Errors
    /// If the configuration is invalid, an id is out of range or repeated, or
    /// columns are requested without any row to fit their priors to.
    #[allow(clippy::cast_precision_loss)]
    pub fn build(self) -> Result<View> {
        self.config.validate()?;

        let rows = self
            .rows
            .unwrap_or_else(|| (0..self.data.len()).collect());
        let cols = self.cols.unwrap_or_else(|| {
            self.data
                .first()
                .map_or_else(Vec::new, |row| (0..row.len()).collect())
        });

        let mut seen = BTreeSet::new();
        if let Some(&dup) = cols.iter().find(|&&c| !seen.insert(c)) {
            return Err(Error::ColumnAlreadyPresent(dup));
        }
        seen.clear();
        if let Some(&dup) = rows.iter().find(|&&r| !seen.insert(r)) {
            return Err(Error::RowAlreadyPresent(dup));
        }
        if rows.is_empty() && !cols.is_empty() {
            return Err(Error::InvalidParameter {
                name: "rows",
                message: String::from("column priors need at least one row"),
            });
        }

        let local = rows
            .iter()
            .map(|&row| select(self.data, row, &cols))
            .collect::<Result<Vec<_>>>()?;

        let n_grid = self.config.n_grid;
        let hypers = (0..cols.len())
            .map(|c| {
                let column: Vec<f64> = local.iter().map(|values| values[c]).collect();
                ColumnHypers::from_data(&column, n_grid)
            })
            .collect::<Result<Vec<_>>>()?;

        let n = rows.len().max(1) as f64;
        let global_to_local = cols.iter().enumerate().map(|(ix, &c)| (c, ix)).collect();

        let mut view = View {
            clusters: BTreeMap::new(),
            cluster_lookup: BTreeMap::new(),
            global_to_local,
            local_to_global: cols,
            hypers,
            alpha: self.config.initial_alpha,
            alpha_grid: log_linspace(1.0 / n, n, grid_size(n_grid)?),
            data_score: 0.0,
            crp_score: 0.0,
            next_cluster_id: 0,
            rng: RandomNumberGenerator::new(self.seed),
            config: self.config,
            diagnostics: self.diagnostics,
        };

        if self.populate {
            for (&row_id, values) in rows.iter().zip(&local) {
                view.insert_row(values, row_id)?;
            }
        }

        log::debug!(
            "built view: {} rows, {} cols, {} clusters, score {}",
            view.n_rows(),
            view.n_cols(),
            view.n_clusters(),
            view.get_score()
        );
        Ok(view)
    }
}

/// A partition of rows into clusters over the columns the view owns.
///
/// The cached score is the sum of every cluster's marginal log-likelihood and
/// the CRP log prior of the cluster sizes. Every mutating method returns the
/// change it made to that score.
pub struct View {
    clusters: BTreeMap<ClusterId, Cluster>,
    cluster_lookup: BTreeMap<usize, ClusterId>,
    global_to_local: BTreeMap<usize, usize>,
    local_to_global: Vec<usize>,
    hypers: Vec<ColumnHypers>,
    alpha: f64,
    alpha_grid: Vec<f64>,
    data_score: f64,
    crp_score: f64,
    next_cluster_id: usize,
    rng: RandomNumberGenerator,
    config: ViewConfig,
    diagnostics: Option<Box<dyn Diagnostics + Send>>,
}

impl fmt::Debug for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("View")
            .field("n_rows", &self.n_rows())
            .field("columns", &self.local_to_global)
            .field("clusters", &self.clusters.values().collect::<Vec<_>>())
            .field("alpha", &self.alpha)
            .field("score", &self.get_score())
            .finish_non_exhaustive()
    }
}

impl View {
    /// A view over the `rows` and `cols` of `data` with default configuration.
    ///
    /// # Errors
    /// See [`Builder::build`].
    pub fn new(data: &[Vec<f64>], rows: &[usize], cols: &[usize], seed: u64) -> Result<Self> {
        Builder::new(data)
            .rows(rows)
            .cols(cols)
            .seed_from_u64(seed)
            .build()
    }

    #[must_use]
    pub fn builder(data: &[Vec<f64>]) -> Builder<'_> {
        Builder::new(data)
    }

    // ------------------------------------------------------------------
    // Introspection

    /// Number of rows currently assigned.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.cluster_lookup.len()
    }

    #[must_use]
    pub fn n_cols(&self) -> usize {
        self.local_to_global.len()
    }

    #[must_use]
    pub fn n_clusters(&self) -> usize {
        self.clusters.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cluster_lookup.is_empty()
    }

    #[must_use]
    pub const fn alpha(&self) -> f64 {
        self.alpha
    }

    #[must_use]
    pub fn alpha_grid(&self) -> &[f64] {
        &self.alpha_grid
    }

    #[must_use]
    pub const fn config(&self) -> &ViewConfig {
        &self.config
    }

    /// The `index`-th cluster in handle order.
    #[must_use]
    pub fn cluster(&self, index: usize) -> Option<&Cluster> {
        self.clusters.values().nth(index)
    }

    #[must_use]
    pub fn cluster_by_id(&self, id: ClusterId) -> Option<&Cluster> {
        self.clusters.get(&id)
    }

    pub fn clusters(&self) -> impl Iterator<Item = &Cluster> {
        self.clusters.values()
    }

    #[must_use]
    pub fn cluster_ids(&self) -> Vec<ClusterId> {
        self.clusters.keys().copied().collect()
    }

    #[must_use]
    pub fn cluster_of(&self, row_id: usize) -> Option<ClusterId> {
        self.cluster_lookup.get(&row_id).copied()
    }

    /// Global column ids in local order.
    #[must_use]
    pub fn column_ids(&self) -> &[usize] {
        &self.local_to_global
    }

    #[must_use]
    pub const fn global_to_local(&self) -> &BTreeMap<usize, usize> {
        &self.global_to_local
    }

    /// # Errors
    /// `Error::ColumnNotPresent` if the view does not own `col_id`.
    pub fn hypers(&self, col_id: usize) -> Result<&ColumnHypers> {
        let local = self.local_index(col_id)?;
        Ok(&self.hypers[local])
    }

    fn local_index(&self, col_id: usize) -> Result<usize> {
        self.global_to_local
            .get(&col_id)
            .copied()
            .ok_or(Error::ColumnNotPresent(col_id))
    }

    /// Cached total score.
    #[must_use]
    pub fn get_score(&self) -> f64 {
        self.data_score + self.crp_score
    }

    /// Cached sum of the clusters' marginal log-likelihoods.
    #[must_use]
    pub const fn data_score(&self) -> f64 {
        self.data_score
    }

    /// Cached CRP log prior of the partition.
    #[must_use]
    pub const fn crp_score(&self) -> f64 {
        self.crp_score
    }

    #[must_use]
    pub fn score_matrix(&self) -> ScoreMatrix {
        ScoreMatrix {
            column_ids: self.local_to_global.clone(),
            cluster_ids: self.cluster_ids(),
            scores: self
                .clusters
                .values()
                .map(|c| c.column_scores().to_vec())
                .collect(),
        }
    }

    #[must_use]
    pub fn summary(&self) -> ViewSummary {
        ViewSummary {
            n_rows: self.n_rows(),
            n_cols: self.n_cols(),
            n_clusters: self.n_clusters(),
            alpha: self.alpha,
            score: self.get_score(),
            clusters: self
                .clusters
                .values()
                .map(|c| ClusterSummary {
                    id: c.id(),
                    rows: c.row_indices(),
                    score: c.score(),
                })
                .collect(),
            columns: self
                .local_to_global
                .iter()
                .zip(&self.hypers)
                .map(|(&col_id, h)| ColumnSummary {
                    col_id,
                    m: h.get(Hyper::M),
                    r: h.get(Hyper::R),
                    s: h.get(Hyper::S),
                    v: h.get(Hyper::V),
                })
                .collect(),
        }
    }

    // ------------------------------------------------------------------
    // Diagnostics

    pub fn set_diagnostics(&mut self, sink: Option<Box<dyn Diagnostics + Send>>) {
        self.diagnostics = sink;
    }

    /// Report the cluster memberships and priors to the diagnostics sink.
    pub fn print(&mut self) {
        if self.diagnostics.is_none() {
            return;
        }
        let summary = self.summary();
        if let Some(sink) = self.diagnostics.as_mut() {
            if let Err(err) = sink.summary(&summary) {
                log::warn!("failed to write view summary: {err}");
            }
        }
    }

    /// Report the per-column cluster scores to the diagnostics sink.
    pub fn print_score_matrix(&mut self) {
        if self.diagnostics.is_none() {
            return;
        }
        let matrix = self.score_matrix();
        if let Some(sink) = self.diagnostics.as_mut() {
            if let Err(err) = sink.score_matrix(&matrix) {
                log::warn!("failed to write score matrix: {err}");
            }
        }
    }

    // ------------------------------------------------------------------
    // Rows

    fn refresh_crp_score(&mut self) -> f64 {
        let crp_score = lcrp(&self.counts(), self.alpha);
        let delta = crp_score - self.crp_score;
        self.crp_score = crp_score;
        delta
    }

    /// Row values must match the view's width and be finite.
    fn check_row(&self, values: &[f64]) -> Result<()> {
        if values.len() != self.n_cols() {
            return Err(Error::DimensionMismatch {
                expected: self.n_cols(),
                found: values.len(),
            });
        }
        match values.iter().enumerate().find(|(_, x)| !x.is_finite()) {
            Some((col, x)) => Err(Error::InvalidParameter {
                name: "values",
                message: format!("non-finite value {x} in column {col}"),
            }),
            None => Ok(()),
        }
    }

    /// Insert an absent row, drawing its cluster from the CRP predictive.
    ///
    /// `values` are in local column order.
    ///
    /// # Errors
    /// `Error::RowAlreadyPresent`, `Error::DimensionMismatch`, or
    /// `Error::InvalidParameter` if a value is not finite.
    pub fn insert_row(&mut self, values: &[f64], row_id: usize) -> Result<f64> {
        if self.cluster_lookup.contains_key(&row_id) {
            return Err(Error::RowAlreadyPresent(row_id));
        }
        self.check_row(values)?;
        PartitionGibbs::reinsert(self, row_id, values)
    }

    /// Remove an assigned row; its cluster is dropped if left empty.
    ///
    /// `values` must be the values the row was inserted with.
    ///
    /// # Errors
    /// `Error::RowNotPresent`, `Error::DimensionMismatch`, or
    /// `Error::InvalidParameter` if a value is not finite.
    pub fn remove_row(&mut self, values: &[f64], row_id: usize) -> Result<f64> {
        self.unassign(row_id, values)
    }

    /// Drop cluster `id` if it has no rows. Returns whether it was dropped.
    pub fn remove_if_empty(&mut self, id: ClusterId) -> bool {
        let empty = self.clusters.get(&id).is_some_and(Cluster::is_empty);
        if empty {
            self.clusters.remove(&id);
        }
        empty
    }

    // ------------------------------------------------------------------
    // Columns

    /// `values` regrouped per cluster, in cluster order and member order.
    fn column_values(&self, values: &[f64], row_ids: &[usize]) -> Result<Vec<Vec<f64>>> {
        if values.len() != row_ids.len() {
            return Err(Error::DimensionMismatch {
                expected: row_ids.len(),
                found: values.len(),
            });
        }
        let by_row: BTreeMap<usize, f64> = row_ids
            .iter()
            .copied()
            .zip(values.iter().copied())
            .collect();

        self.clusters
            .values()
            .map(|c| {
                c.row_indices()
                    .into_iter()
                    .map(|r| by_row.get(&r).copied().ok_or(Error::MissingRowData(r)))
                    .collect()
            })
            .collect()
    }

    /// The change in score [`insert_col`](Self::insert_col) would report for
    /// the same input, without changing the view.
    ///
    /// # Errors
    /// As `insert_col`, except that the column id is not checked.
    pub fn score_col_data(&self, values: &[f64], row_ids: &[usize]) -> Result<f64> {
        let per_cluster = self.column_values(values, row_ids)?;
        let hypers = ColumnHypers::from_data(values, self.config.n_grid)?;
        self.clusters
            .values()
            .zip(&per_cluster)
            .map(|(c, vals)| c.score_new_col(vals, &hypers))
            .sum()
    }

    /// Append column `col_id` to every cluster. `values[i]` is the value of
    /// row `row_ids[i]`; the column's prior is fit to all of `values`.
    ///
    /// # Errors
    /// `Error::ColumnAlreadyPresent`, `Error::DimensionMismatch`, or
    /// `Error::MissingRowData` if a row of the view has no value.
    pub fn insert_col(&mut self, values: &[f64], row_ids: &[usize], col_id: usize) -> Result<f64> {
        if self.global_to_local.contains_key(&col_id) {
            return Err(Error::ColumnAlreadyPresent(col_id));
        }
        let per_cluster = self.column_values(values, row_ids)?;
        let hypers = ColumnHypers::from_data(values, self.config.n_grid)?;

        let mut delta = 0.0;
        for (cluster, vals) in self.clusters.values_mut().zip(&per_cluster) {
            delta += cluster.insert_col(vals, &hypers)?;
        }

        self.global_to_local.insert(col_id, self.local_to_global.len());
        self.local_to_global.push(col_id);
        self.hypers.push(hypers);
        self.data_score += delta;

        log::debug!("inserted column {col_id}: delta {delta}");
        Ok(delta)
    }

    /// Remove column `col_id`; later columns shift down one local position.
    ///
    /// # Errors
    /// `Error::ColumnNotPresent`.
    pub fn remove_col(&mut self, col_id: usize) -> Result<f64> {
        let local = self.local_index(col_id)?;

        let mut delta = 0.0;
        for cluster in self.clusters.values_mut() {
            delta += cluster.remove_col(local)?;
        }

        self.hypers.remove(local);
        self.local_to_global.remove(local);
        self.global_to_local = self
            .local_to_global
            .iter()
            .enumerate()
            .map(|(ix, &c)| (c, ix))
            .collect();
        self.data_score += delta;

        log::debug!("removed column {col_id}: delta {delta}");
        Ok(delta)
    }

    /// Project a row given in global column order onto the view's columns.
    ///
    /// `global_indices[i]` is the global id of `values[i]`. Columns the view
    /// does not own are dropped.
    ///
    /// # Errors
    /// `Error::DimensionMismatch` if the slices differ in length,
    /// `Error::MissingColumn` if an owned column is absent.
    pub fn align_data(&self, values: &[f64], global_indices: &[usize]) -> Result<Vec<f64>> {
        if values.len() != global_indices.len() {
            return Err(Error::DimensionMismatch {
                expected: global_indices.len(),
                found: values.len(),
            });
        }
        if global_indices == self.local_to_global.as_slice() {
            return Ok(values.to_vec());
        }

        let position: BTreeMap<usize, usize> = global_indices
            .iter()
            .enumerate()
            .map(|(ix, &c)| (c, ix))
            .collect();
        self.local_to_global
            .iter()
            .map(|c| {
                position
                    .get(c)
                    .map(|&ix| values[ix])
                    .ok_or(Error::MissingColumn(*c))
            })
            .collect()
    }

    // ------------------------------------------------------------------
    // Parameters

    /// Set the CRP concentration. Returns the change in score.
    ///
    /// # Errors
    /// If `alpha` is not finite and positive.
    pub fn set_alpha(&mut self, alpha: f64) -> Result<f64> {
        if !alpha.is_finite() || alpha <= 0.0 {
            return Err(Error::InvalidParameter {
                name: "alpha",
                message: format!("must be finite and positive, got {alpha}"),
            });
        }
        self.alpha = alpha;
        Ok(self.refresh_crp_score())
    }

    /// Set one hyperparameter of column `col_id` and re-score every cluster.
    ///
    /// # Errors
    /// `Error::ColumnNotPresent`, or `Error::InvalidParameter` for a value
    /// outside the hyper's support.
    pub fn set_hyper(&mut self, col_id: usize, hyper: Hyper, value: f64) -> Result<f64> {
        let local = self.local_index(col_id)?;
        self.hypers[local].set(hyper, value)?;

        let prior = self.hypers[local].prior().clone();
        let mut delta = 0.0;
        for cluster in self.clusters.values_mut() {
            delta += cluster.set_column_prior(local, &prior)?;
        }
        self.data_score += delta;
        Ok(delta)
    }

    /// Sum over clusters of column `col_id`'s score under `prior`.
    ///
    /// # Errors
    /// `Error::ColumnNotPresent`.
    pub fn column_score_under(&self, col_id: usize, prior: &NormalGamma) -> Result<f64> {
        let local = self.local_index(col_id)?;
        self.clusters
            .values()
            .map(|c| c.column_score_under(local, prior))
            .sum()
    }

    // ------------------------------------------------------------------
    // Transitions

    /// One Gibbs sweep over every row, in ascending row id order.
    ///
    /// A row whose move fails is left assigned; rows already moved keep
    /// their new clusters.
    ///
    /// # Errors
    /// `Error::MissingRowData` if `data` lacks a row of the view, or any row
    /// error from [`insert_row`](Self::insert_row).
    pub fn transition_zs(&mut self, data: &RowData) -> Result<f64> {
        let delta = PartitionGibbs::new().step(self, data)?;
        log::debug!(
            "transition_zs: delta {delta}, {} clusters",
            self.n_clusters()
        );
        Ok(delta)
    }

    /// Grid update of alpha. Does nothing on an empty view.
    ///
    /// # Errors
    /// If the grid weights cannot be sampled from.
    pub fn transition_crp_alpha(&mut self) -> Result<f64> {
        let delta = CrpAlphaGrid::new().step(self, &())?;
        log::debug!("transition_crp_alpha: delta {delta}, alpha {}", self.alpha);
        Ok(delta)
    }

    /// Grid update of every column's hypers. Does nothing on an empty view.
    ///
    /// # Errors
    /// If the grid weights cannot be sampled from.
    pub fn transition_hypers(&mut self) -> Result<f64> {
        let delta = HyperGrid::new().step(self, &())?;
        log::debug!("transition_hypers: delta {delta}");
        Ok(delta)
    }

    /// Run `transitions` in order, checking the state after each one when
    /// configured to.
    ///
    /// # Errors
    /// The first error a transition or a consistency check reports.
    pub fn step(&mut self, transitions: &[ViewTransition], data: &RowData) -> Result<f64> {
        let mut delta = 0.0;
        for transition in transitions {
            delta += match transition {
                ViewTransition::RowAssignment => self.transition_zs(data)?,
                ViewTransition::Alpha => self.transition_crp_alpha()?,
                ViewTransition::Hypers => self.transition_hypers()?,
            };
            if self.config.check_consistency {
                self.assert_state_consistency()?;
            }
        }
        Ok(delta)
    }

    /// [`step`](Self::step) `n_iters` times.
    ///
    /// # Errors
    /// See `step`.
    pub fn update(
        &mut self,
        n_iters: usize,
        transitions: &[ViewTransition],
        data: &RowData,
    ) -> Result<f64> {
        (0..n_iters).try_fold(0.0, |acc, _| Ok(acc + self.step(transitions, data)?))
    }

    // ------------------------------------------------------------------
    // Consistency

    fn close(&self, cached: f64, recomputed: f64) -> bool {
        (cached - recomputed).abs() <= self.config.tolerance * recomputed.abs().max(1.0)
    }

    /// Recompute the score from the sufficient statistics and check the
    /// partition against the row lookup.
    ///
    /// # Errors
    /// `Error::PartitionMismatch` or `Error::ScoreMismatch`.
    pub fn assert_state_consistency(&self) -> Result<()> {
        let mut n_members = 0;
        let mut data_score = 0.0;

        for (&id, cluster) in &self.clusters {
            if cluster.id() != id {
                return Err(Error::PartitionMismatch(format!(
                    "cluster {} is stored under {id}",
                    cluster.id()
                )));
            }
            if cluster.is_empty() {
                return Err(Error::PartitionMismatch(format!("cluster {id} is empty")));
            }
            if cluster.n_cols() != self.n_cols() {
                return Err(Error::PartitionMismatch(format!(
                    "cluster {id} has {} columns, view has {}",
                    cluster.n_cols(),
                    self.n_cols()
                )));
            }
            for row in cluster.row_indices() {
                match self.cluster_lookup.get(&row) {
                    Some(&k) if k == id => {}
                    other => {
                        return Err(Error::PartitionMismatch(format!(
                            "row {row} is in cluster {id} but the lookup has {other:?}"
                        )));
                    }
                }
            }
            if let Some(stat) = cluster.stats().iter().find(|s| s.n() != cluster.n_rows()) {
                return Err(Error::PartitionMismatch(format!(
                    "cluster {id} has {} rows but a statistic counts {}",
                    cluster.n_rows(),
                    stat.n()
                )));
            }

            if self.n_cols() > 0 {
                let recomputed = cluster.marginal_logp(&self.hypers)?;
                if !self.close(cluster.score(), recomputed) {
                    return Err(Error::ScoreMismatch {
                        cached: cluster.score(),
                        recomputed,
                    });
                }
                data_score += recomputed;
            }
            n_members += cluster.n_rows();
        }

        if n_members != self.cluster_lookup.len() {
            return Err(Error::PartitionMismatch(format!(
                "{} rows in the lookup, {n_members} in clusters",
                self.cluster_lookup.len()
            )));
        }

        let recomputed = data_score + lcrp(&self.counts(), self.alpha);
        if !self.close(self.get_score(), recomputed) {
            return Err(Error::ScoreMismatch {
                cached: self.get_score(),
                recomputed,
            });
        }
        Ok(())
    }
}

impl Model for View {
    fn ln_score(&self) -> f64 {
        self.get_score()
    }
}

impl PartitionModel<[f64]> for View {
    fn assign(&mut self, idx: usize, target: Assignment, x: &[f64]) -> Result<f64> {
        if self.cluster_lookup.contains_key(&idx) {
            return Err(Error::RowAlreadyPresent(idx));
        }
        self.check_row(x)?;

        let id = match target {
            Assignment::Existing(k) if self.clusters.contains_key(&k) => k,
            Assignment::Existing(k) => return Err(Error::UnknownCluster(k.0)),
            Assignment::New => {
                let id = ClusterId(self.next_cluster_id);
                let n_cols = self.n_cols();
                self.next_cluster_id += 1;
                self.clusters.insert(id, Cluster::new(id, n_cols));
                id
            }
        };

        let cluster = self
            .clusters
            .get_mut(&id)
            .ok_or(Error::UnknownCluster(id.0))?;
        let data_delta = cluster.insert_row(x, idx, &self.hypers)?;
        self.cluster_lookup.insert(idx, id);
        self.data_score += data_delta;

        Ok(data_delta + self.refresh_crp_score())
    }

    fn unassign(&mut self, idx: usize, x: &[f64]) -> Result<f64> {
        let id = self
            .cluster_of(idx)
            .ok_or(Error::RowNotPresent(idx))?;
        self.check_row(x)?;

        let cluster = self
            .clusters
            .get_mut(&id)
            .ok_or(Error::UnknownCluster(id.0))?;
        let data_delta = cluster.remove_row(x, idx, &self.hypers)?;
        self.cluster_lookup.remove(&idx);
        self.remove_if_empty(id);
        self.data_score += data_delta;

        Ok(data_delta + self.refresh_crp_score())
    }

    fn check_datum(&self, x: &[f64]) -> Result<()> {
        self.check_row(x)
    }

    fn partitions(&self) -> Vec<ClusterId> {
        self.cluster_ids()
    }

    fn partition_of(&self, idx: usize) -> Option<ClusterId> {
        self.cluster_of(idx)
    }

    #[allow(clippy::cast_precision_loss)]
    fn ln_pp_partition(&self, x: &[f64], k: ClusterId) -> Result<f64> {
        let cluster = self.clusters.get(&k).ok_or(Error::UnknownCluster(k.0))?;
        Ok((cluster.n_rows() as f64).ln() + cluster.score_row_insertion(x, &self.hypers)?)
    }

    fn ln_pp_empty(&self, x: &[f64]) -> Result<f64> {
        Ok(self.alpha.ln() + Cluster::singleton_score(x, &self.hypers)?)
    }

    fn counts(&self) -> Vec<usize> {
        self.clusters.values().map(Cluster::n_rows).collect()
    }

    fn assigned(&self) -> Vec<usize> {
        self.cluster_lookup.keys().copied().collect()
    }

    fn rng(&mut self) -> &mut RandomNumberGenerator {
        &mut self.rng
    }
}
