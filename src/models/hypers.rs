use rv::dist::NormalGamma;
use rv::misc::linspace;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::numerics::{grid_size, log_linspace};

/// Smallest sum of squares used when building a column prior.
const MIN_SPREAD: f64 = 1e-6;

/// The hyperparameters of a Normal-Gamma column prior.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Hyper {
    M,
    R,
    S,
    V,
}

impl Hyper {
    /// The order in which hypers are resampled.
    pub const ALL: [Self; 4] = [Self::M, Self::R, Self::S, Self::V];
}

/// Prior and resampling grids for one column.
#[derive(Clone, Debug)]
pub struct ColumnHypers {
    prior: NormalGamma,
    m_grid: Vec<f64>,
    r_grid: Vec<f64>,
    s_grid: Vec<f64>,
    v_grid: Vec<f64>,
}

impl ColumnHypers {
    /// Build the initial prior and the grids from the values of a column.
    ///
    /// The prior starts at `m = mean`, `r = 1`, `s` at the bottom of its grid
    /// and `v = max(n / 2, 1)`, so a fresh cluster expects a spread well
    /// below that of the whole column.
    ///
    /// # Errors
    /// If `values` is empty, contains non-finite entries, or `n_grid` is
    /// below two.
    #[allow(clippy::cast_precision_loss)]
    pub fn from_data(values: &[f64], n_grid: usize) -> Result<Self> {
        if values.is_empty() {
            return Err(Error::InvalidParameter {
                name: "values",
                message: String::from("a column needs at least one value"),
            });
        }
        let n_grid = grid_size(n_grid)?;
        if let Some(x) = values.iter().find(|x| !x.is_finite()) {
            return Err(Error::InvalidParameter {
                name: "values",
                message: format!("non-finite value {x}"),
            });
        }

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let sum_sq_dev = values
            .iter()
            .map(|x| (x - mean).powi(2))
            .sum::<f64>()
            .max(MIN_SPREAD);

        let (min, max) = values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| {
                (lo.min(x), hi.max(x))
            });

        Ok(Self {
            prior: NormalGamma::new_unchecked(mean, 1.0, sum_sq_dev / 100.0, (n / 2.0).max(1.0)),
            m_grid: linspace(min, max, n_grid),
            r_grid: log_linspace(1.0 / n, n, n_grid),
            s_grid: log_linspace(sum_sq_dev / 100.0, sum_sq_dev, n_grid),
            v_grid: log_linspace(1.0, n, n_grid),
        })
    }

    #[must_use]
    pub const fn prior(&self) -> &NormalGamma {
        &self.prior
    }

    #[must_use]
    pub fn grid(&self, hyper: Hyper) -> &[f64] {
        match hyper {
            Hyper::M => &self.m_grid,
            Hyper::R => &self.r_grid,
            Hyper::S => &self.s_grid,
            Hyper::V => &self.v_grid,
        }
    }

    #[must_use]
    pub fn get(&self, hyper: Hyper) -> f64 {
        match hyper {
            Hyper::M => self.prior.m(),
            Hyper::R => self.prior.r(),
            Hyper::S => self.prior.s(),
            Hyper::V => self.prior.v(),
        }
    }

    /// The prior with `hyper` replaced by `value`, leaving `self` untouched.
    #[must_use]
    pub fn with(&self, hyper: Hyper, value: f64) -> NormalGamma {
        let (mut m, mut r, mut s, mut v) =
            (self.prior.m(), self.prior.r(), self.prior.s(), self.prior.v());
        match hyper {
            Hyper::M => m = value,
            Hyper::R => r = value,
            Hyper::S => s = value,
            Hyper::V => v = value,
        }
        NormalGamma::new_unchecked(m, r, s, v)
    }

    /// Replace one hyperparameter.
    ///
    /// # Errors
    /// If `value` is not finite, or is not positive for `r`, `s` and `v`.
    pub fn set(&mut self, hyper: Hyper, value: f64) -> Result<()> {
        if !value.is_finite() || (hyper != Hyper::M && value <= 0.0) {
            return Err(Error::InvalidParameter {
                name: "hyper",
                message: format!("{hyper:?} cannot be {value}"),
            });
        }
        self.prior = self.with(hyper, value);
        Ok(())
    }
}
