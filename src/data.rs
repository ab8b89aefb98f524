use std::collections::BTreeMap;

use crate::error::{Error, Result};

/// Row id to the row's values in a view's local column order.
pub type RowData = BTreeMap<usize, Vec<f64>>;

/// Values of `row` at the global columns `cols`, in that order.
///
/// # Errors
/// `Error::IndexOutOfBounds` if the row or any column is outside `data`.
pub fn select(data: &[Vec<f64>], row: usize, cols: &[usize]) -> Result<Vec<f64>> {
    let values = data.get(row).ok_or(Error::IndexOutOfBounds {
        index: row,
        len: data.len(),
    })?;
    cols.iter()
        .map(|&col| {
            values.get(col).copied().ok_or(Error::IndexOutOfBounds {
                index: col,
                len: values.len(),
            })
        })
        .collect()
}

/// Local rows of `data` for every id in `rows`.
///
/// # Errors
/// See [`select`].
pub fn row_data(data: &[Vec<f64>], rows: &[usize], cols: &[usize]) -> Result<RowData> {
    rows.iter()
        .map(|&row| select(data, row, cols).map(|values| (row, values)))
        .collect()
}
