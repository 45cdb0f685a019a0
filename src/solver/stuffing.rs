//! Matrix stuffing: converts the mean-variance program to solver format.
//!
//! Clarabel solves
//!
//! ```text
//! minimize    (1/2) x' P x + q' x
//! subject to  A x + s = b,  s in K
//! ```
//!
//! The long-only minimum-variance program maps onto it with `P = 2 Sigma`,
//! `q = 0` and three blocks of constraint rows:
//!
//! ```text
//! [ 1'  ] x + s = [  1     ]   s in {0}        (full allocation)
//! [ -mu'] x + s = [ -floor ]   s >= 0          (return floor)
//! [ -I  ] x + s = [  0     ]   s >= 0          (long only)
//! ```

use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::CscMatrix;

use crate::sparse::{csc_from_triplets, dense_upper_to_csc};

/// Cone dimensions for Clarabel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConeDims {
    /// Number of zero cone (equality) constraints.
    pub zero: usize,
    /// Number of nonnegative cone constraints.
    pub nonneg: usize,
}

impl ConeDims {
    /// Total number of constraint rows.
    pub fn total(&self) -> usize {
        self.zero + self.nonneg
    }
}

/// Stuffed problem ready for Clarabel.
#[derive(Debug)]
pub struct StuffedProblem {
    /// Quadratic cost matrix P (n x n, upper triangle).
    pub p: CscMatrix<f64>,
    /// Linear cost vector q (n).
    pub q: Vec<f64>,
    /// Constraint matrix A (m x n).
    pub a: CscMatrix<f64>,
    /// Constraint vector b (m).
    pub b: Vec<f64>,
    /// Cone dimensions.
    pub cone_dims: ConeDims,
}

/// Build the stuffed problem for `min w' Sigma w` under the return floor,
/// budget and long-only constraints.
pub fn stuff_problem(mu: &DVector<f64>, sigma: &DMatrix<f64>, reward_floor: f64) -> StuffedProblem {
    let n = mu.len();

    // Clarabel carries the 1/2, so the variance needs P = 2 Sigma.
    let p = dense_upper_to_csc(&(sigma * 2.0));
    let q = vec![0.0; n];

    let mut triplets = Vec::with_capacity(3 * n);
    // Row 0: budget.
    triplets.extend((0..n).map(|j| (0, j, 1.0)));
    // Row 1: return floor.
    triplets.extend((0..n).map(|j| (1, j, -mu[j])));
    // Rows 2..n+2: long only.
    triplets.extend((0..n).map(|j| (2 + j, j, -1.0)));

    let m = n + 2;
    let a = csc_from_triplets(m, n, triplets);

    let mut b = vec![0.0; m];
    b[0] = 1.0;
    b[1] = -reward_floor;

    StuffedProblem {
        p,
        q,
        a,
        b,
        cone_dims: ConeDims {
            zero: 1,
            nonneg: n + 1,
        },
    }
}
