//! Inference core of a cross-categorization model.
//!
//! A [`View`] partitions rows into clusters over a subset of the columns
//! under a Chinese Restaurant Process prior, keeps conjugate Normal-Gamma
//! sufficient statistics per cluster and column, and resamples the
//! partition, the CRP concentration and the column priors by Gibbs updates.
//!
//! ```no_run
//! use xcat_view::{View, data::row_data, view::default_transitions};
//!
//! # fn main() -> xcat_view::Result<()> {
//! let data = vec![vec![0.1, 5.0], vec![0.2, 5.1], vec![9.7, -3.0]];
//! let rows = [0, 1, 2];
//! let cols = [0, 1];
//!
//! let mut view = View::new(&data, &rows, &cols, 1337)?;
//! let row_data = row_data(&data, &rows, &cols)?;
//! view.update(20, &default_transitions(), &row_data)?;
//! println!("{} clusters, score {}", view.n_clusters(), view.get_score());
//! # Ok(())
//! # }
//! ```
pub mod config;
pub mod data;
pub mod error;
pub mod mcmc;
pub mod models;
pub mod numerics;
pub mod rng;
pub mod view;

mod utils;

pub use config::ViewConfig;
pub use data::RowData;
pub use error::{Error, Result};
pub use mcmc::ViewTransition;
pub use models::cluster::{Cluster, ClusterId};
pub use rng::RandomNumberGenerator;
pub use view::View;
