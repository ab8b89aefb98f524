//! Griddy Gibbs updates of the view's continuous parameters.
//!
//! Each parameter is resampled from its fixed grid with weights proportional
//! to the likelihood of the current partition, i.e. under a uniform prior
//! over the grid points.
use crate::error::Result;
use crate::mcmc::Sampler;
use crate::models::hypers::Hyper;
use crate::models::partition::PartitionModel;
use crate::numerics::lcrp;
use crate::view::View;

/// Grid update of the CRP concentration.
#[derive(Default, Clone, Copy, Debug)]
pub struct CrpAlphaGrid {}

impl CrpAlphaGrid {
    #[must_use]
    pub const fn new() -> Self {
        Self {}
    }
}

impl<D: ?Sized> Sampler<View, D> for CrpAlphaGrid {
    fn step(&mut self, view: &mut View, _data: &D) -> Result<f64> {
        if view.n_rows() == 0 {
            return Ok(0.0);
        }

        let counts = view.counts();
        let grid = view.alpha_grid().to_vec();
        let ln_weights: Vec<f64> = grid.iter().map(|&alpha| lcrp(&counts, alpha)).collect();

        let ix = view.rng().ln_pflip(&ln_weights)?;
        view.set_alpha(grid[ix])
    }
}

/// Grid update of every column's Normal-Gamma prior.
///
/// Columns are visited in local order and, within a column, the
/// hyperparameters in [`Hyper::ALL`] order.
#[derive(Default, Clone, Copy, Debug)]
pub struct HyperGrid {}

impl HyperGrid {
    #[must_use]
    pub const fn new() -> Self {
        Self {}
    }
}

impl<D: ?Sized> Sampler<View, D> for HyperGrid {
    fn step(&mut self, view: &mut View, _data: &D) -> Result<f64> {
        if view.n_rows() == 0 {
            return Ok(0.0);
        }

        let mut delta = 0.0;
        for col_id in view.column_ids().to_vec() {
            for hyper in Hyper::ALL {
                let hypers = view.hypers(col_id)?;
                let grid = hypers.grid(hyper).to_vec();
                let ln_weights = grid
                    .iter()
                    .map(|&value| view.column_score_under(col_id, &hypers.with(hyper, value)))
                    .collect::<Result<Vec<f64>>>()?;

                let ix = view.rng().ln_pflip(&ln_weights)?;
                delta += view.set_hyper(col_id, hyper, grid[ix])?;
            }
        }
        Ok(delta)
    }
}
