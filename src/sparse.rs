//! Sparse matrix utilities.
//!
//! Helpers for building the nalgebra-sparse matrices handed to the solver.

use nalgebra::DMatrix;
use nalgebra_sparse::{CooMatrix, CscMatrix};

/// Entries with magnitude below this are treated as structural zeros.
const DROP_TOL: f64 = 1e-15;

/// Create a CSC matrix from `(row, col, value)` triplets.
///
/// Duplicates are summed together; out-of-range entries are ignored.
pub fn csc_from_triplets(
    nrows: usize,
    ncols: usize,
    triplets: impl IntoIterator<Item = (usize, usize, f64)>,
) -> CscMatrix<f64> {
    let mut coo = CooMatrix::new(nrows, ncols);
    for (row, col, val) in triplets {
        if row < nrows && col < ncols {
            coo.push(row, col, val);
        }
    }
    CscMatrix::from(&coo)
}

/// Upper triangle (diagonal included) of a square dense matrix, in CSC form.
///
/// Quadratic cost matrices are passed to the solver this way.
pub fn dense_upper_to_csc(dense: &DMatrix<f64>) -> CscMatrix<f64> {
    let n = dense.nrows();
    let mut triplets = Vec::new();
    for j in 0..dense.ncols() {
        for i in 0..=j.min(n.saturating_sub(1)) {
            let v = dense[(i, j)];
            if v.abs() > DROP_TOL {
                triplets.push((i, j, v));
            }
        }
    }
    csc_from_triplets(n, dense.ncols(), triplets)
}

/// Convert CSC to dense matrix.
pub fn csc_to_dense(sparse: &CscMatrix<f64>) -> DMatrix<f64> {
    let mut dense = DMatrix::zeros(sparse.nrows(), sparse.ncols());
    for (row, col, val) in sparse.triplet_iter() {
        dense[(row, col)] = *val;
    }
    dense
}
