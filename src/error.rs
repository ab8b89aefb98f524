use thiserror::Error;

/// Result alias for `xcat-view`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the view, its clusters and the samplers.
///
/// Precondition violations and consistency failures are both reported here;
/// none of them are retried.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("row {0} is already in the view")]
    RowAlreadyPresent(usize),

    #[error("row {0} is not in the view")]
    RowNotPresent(usize),

    #[error("row {row} is not a member of cluster {cluster}")]
    RowNotInCluster { row: usize, cluster: usize },

    #[error("column {0} is already in the view")]
    ColumnAlreadyPresent(usize),

    #[error("column {0} is not in the view")]
    ColumnNotPresent(usize),

    /// A column owned by the view is absent from the global indices of a row.
    #[error("column {0} is owned by the view but missing from the input")]
    MissingColumn(usize),

    #[error("no data supplied for row {0}")]
    MissingRowData(usize),

    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("index {index} out of bounds for length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("integer sampling bound must be positive")]
    InvalidBound,

    #[error("cannot sample from an empty weight vector")]
    EmptyWeights,

    #[error("weight normalizer is not finite: {0}")]
    NonFiniteWeights(f64),

    #[error("invalid parameter `{name}`: {message}")]
    InvalidParameter { name: &'static str, message: String },

    /// A likelihood evaluation was requested on a cluster with no rows or no columns.
    #[error("cluster with {n_rows} rows and {n_cols} columns cannot be scored")]
    DegenerateCluster { n_rows: usize, n_cols: usize },

    #[error("unknown cluster {0}")]
    UnknownCluster(usize),

    #[error("score mismatch: cached {cached}, recomputed {recomputed}")]
    ScoreMismatch { cached: f64, recomputed: f64 },

    #[error("partition mismatch: {0}")]
    PartitionMismatch(String),
}
