//! Sample statistics over a return matrix.
//!
//! All functions take a `periods x assets` matrix and work column-wise.

use nalgebra::{DMatrix, DVector};

/// Arithmetic mean of each column.
pub fn column_means(returns: &DMatrix<f64>) -> DVector<f64> {
    let n = returns.nrows();
    if n == 0 {
        return DVector::zeros(returns.ncols());
    }
    DVector::from_iterator(
        returns.ncols(),
        returns.column_iter().map(|c| c.sum() / n as f64),
    )
}

/// Sample covariance matrix with the `n - 1` denominator.
///
/// Returns `None` with fewer than two periods.
pub fn sample_covariance(returns: &DMatrix<f64>) -> Option<DMatrix<f64>> {
    let n = returns.nrows();
    if n < 2 {
        return None;
    }

    let means = column_means(returns);
    let mut centered = returns.clone();
    for (j, mut col) in centered.column_iter_mut().enumerate() {
        col.add_scalar_mut(-means[j]);
    }

    let mut cov = centered.transpose() * &centered / (n - 1) as f64;

    // Force exact symmetry; the product can differ in the last bit.
    let k = cov.nrows();
    for i in 0..k {
        for j in (i + 1)..k {
            let avg = 0.5 * (cov[(i, j)] + cov[(j, i)]);
            cov[(i, j)] = avg;
            cov[(j, i)] = avg;
        }
    }

    Some(cov)
}

/// Pearson correlation matrix derived from a covariance matrix.
///
/// Zero-variance assets get a correlation of 0 with everything else and 1
/// with themselves.
pub fn correlation_from_covariance(cov: &DMatrix<f64>) -> DMatrix<f64> {
    let k = cov.nrows();
    let sd: Vec<f64> = (0..k).map(|i| cov[(i, i)].max(0.0).sqrt()).collect();

    DMatrix::from_fn(k, k, |i, j| {
        if i == j {
            return 1.0;
        }
        let denom = sd[i] * sd[j];
        if denom > 1e-15 {
            (cov[(i, j)] / denom).clamp(-1.0, 1.0)
        } else {
            0.0
        }
    })
}
