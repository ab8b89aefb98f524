use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::numerics::grid_size;

/// Tunables of a [`View`](crate::view::View).
///
/// Missing fields take their defaults when deserialized.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    /// Number of points in the alpha grid and in every hyper grid.
    pub n_grid: usize,
    /// CRP concentration before the first alpha transition.
    pub initial_alpha: f64,
    /// Relative tolerance of the score check in `assert_state_consistency`.
    pub tolerance: f64,
    /// Check the cached state after every transition run through `step`.
    pub check_consistency: bool,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            n_grid: 31,
            initial_alpha: 1.0,
            tolerance: 1e-8,
            check_consistency: true,
        }
    }
}

impl ViewConfig {
    /// # Errors
    /// `Error::InvalidParameter` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        grid_size(self.n_grid)?;
        if !self.initial_alpha.is_finite() || self.initial_alpha <= 0.0 {
            return Err(Error::InvalidParameter {
                name: "initial_alpha",
                message: format!("must be finite and positive, got {}", self.initial_alpha),
            });
        }
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(Error::InvalidParameter {
                name: "tolerance",
                message: format!("must be finite and non-negative, got {}", self.tolerance),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = ViewConfig::default();
        assert_eq!(config.n_grid, 31);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: ViewConfig =
            serde_json::from_str(r#"{"n_grid": 11, "check_consistency": false}"#).unwrap();
        assert_eq!(config.n_grid, 11);
        assert!(!config.check_consistency);
        assert_eq!(config.initial_alpha, 1.0);
        assert_eq!(config.tolerance, 1e-8);
    }

    #[test]
    fn validate_rejects_bad_fields() {
        let bad = [
            ViewConfig {
                n_grid: 0,
                ..ViewConfig::default()
            },
            ViewConfig {
                n_grid: 1,
                ..ViewConfig::default()
            },
            ViewConfig {
                initial_alpha: 0.0,
                ..ViewConfig::default()
            },
            ViewConfig {
                initial_alpha: f64::NAN,
                ..ViewConfig::default()
            },
            ViewConfig {
                tolerance: -1.0,
                ..ViewConfig::default()
            },
        ];
        for config in bad {
            assert!(matches!(
                config.validate(),
                Err(Error::InvalidParameter { .. })
            ));
        }
    }
}
