//! Closed-form helpers shared by the clusters and the samplers.
use rv::data::{GaussianSuffStat, Partition};
use rv::dist::{Crp, Gaussian, NormalGamma};
use rv::misc::linspace;
use rv::prelude::DataOrSuffStat;
use rv::traits::{ConjugatePrior, HasDensity};

use crate::error::{Error, Result};

/// Log probability of a partition with cluster sizes `counts` under a CRP with
/// concentration `alpha`.
///
/// An empty partition has probability one.
#[must_use]
pub fn lcrp(counts: &[usize], alpha: f64) -> f64 {
    if counts.is_empty() {
        return 0.0;
    }
    let z: Vec<usize> = counts
        .iter()
        .enumerate()
        .flat_map(|(k, &c)| std::iter::repeat_n(k, c))
        .collect();
    let crp = Crp::new_unchecked(alpha, z.len());
    crp.ln_f(&Partition::new_unchecked(z, counts.to_vec()))
}

/// Log marginal likelihood of a Gaussian statistic under a Normal-Gamma prior.
#[must_use]
pub fn ln_m(prior: &NormalGamma, stat: &GaussianSuffStat) -> f64 {
    let x: DataOrSuffStat<f64, Gaussian> = DataOrSuffStat::SuffStat(stat);
    prior.ln_m(&x)
}

/// Number of grid points as the signed count `rv::misc::linspace` takes.
///
/// # Errors
/// If `n_grid` is below two or does not fit an `i32`.
pub fn grid_size(n_grid: usize) -> Result<i32> {
    i32::try_from(n_grid)
        .ok()
        .filter(|&n| n >= 2)
        .ok_or_else(|| Error::InvalidParameter {
            name: "n_grid",
            message: format!("{n_grid} is not a usable grid size"),
        })
}

/// `n` points from `a` to `b` inclusive, evenly spaced in log space.
///
/// Both ends must be strictly positive.
#[must_use]
pub fn log_linspace(a: f64, b: f64, n: i32) -> Vec<f64> {
    linspace(a.ln(), b.ln(), n)
        .into_iter()
        .map(f64::exp)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use rv::misc::ln_gammafn;
    use rv::traits::SuffStat;

    #[test]
    fn lcrp_single_table_is_zero() {
        // A single row always sits at the first table.
        assert::close(lcrp(&[1], 0.3), 0.0, 1e-12);
        assert::close(lcrp(&[1], 12.0), 0.0, 1e-12);
    }

    #[test]
    fn lcrp_matches_sequential_seating() {
        // Seating 3 customers as {0, 1}, {2} with alpha = 2:
        // 1 * (1 / (1 + 2)) * (2 / (2 + 2))
        let alpha = 2.0;
        let expected = (1.0_f64 / 3.0 * 2.0 / 4.0).ln();
        assert::close(lcrp(&[2, 1], alpha), expected, 1e-12);
    }

    #[test]
    fn lcrp_ignores_table_order() {
        assert::close(lcrp(&[3, 1, 2], 0.7), lcrp(&[1, 2, 3], 0.7), 1e-12);
    }

    #[test]
    fn lcrp_matches_gamma_form() {
        let counts = [4_usize, 1, 2];
        let alpha = 1.3_f64;
        let expected = 3.0_f64.mul_add(
            alpha.ln(),
            ln_gammafn(4.0) + ln_gammafn(1.0) + ln_gammafn(2.0),
        ) + ln_gammafn(alpha)
            - ln_gammafn(7.0 + alpha);
        assert::close(lcrp(&counts, alpha), expected, 1e-10);
    }

    #[test]
    fn lcrp_of_empty_partition() {
        assert_eq!(lcrp(&[], 1.5), 0.0);
    }

    #[test]
    fn ln_m_of_two_points_is_product_of_predictives() {
        let prior = NormalGamma::new_unchecked(0.0, 1.0, 1.0, 1.0);
        let mut one = GaussianSuffStat::new();
        one.observe(&0.5);
        let mut two = one.clone();
        two.observe(&-1.2);

        let empty = GaussianSuffStat::new();
        let ln_pp_first = ln_m(&prior, &one) - ln_m(&prior, &empty);
        let ln_pp_second = ln_m(&prior, &two) - ln_m(&prior, &one);

        assert::close(ln_pp_first + ln_pp_second, ln_m(&prior, &two), 1e-10);
        assert::close(ln_m(&prior, &empty), 0.0, 1e-10);
    }

    #[test]
    fn grid_sizes() {
        assert_eq!(grid_size(2), Ok(2));
        assert_eq!(grid_size(31), Ok(31));
        assert!(grid_size(0).is_err());
        assert!(grid_size(1).is_err());
        assert!(grid_size(usize::MAX).is_err());
    }

    #[test]
    fn log_spaced_grid() {
        let g = log_linspace(0.1, 10.0, 3);
        assert_eq!(g.len(), 3);
        assert::close(g[0], 0.1, 1e-12);
        assert::close(g[1], 1.0, 1e-12);
        assert::close(g[2], 10.0, 1e-12);
    }
}
