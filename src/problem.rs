//! Mean-variance problem definition and solving API.
//!
//! [`MeanVarianceProblem`] is the Markowitz program
//!
//! ```text
//! minimize    sum_ij Sigma[i,j] w_i w_j
//! subject to  sum_i mu_i w_i >= reward_floor
//!             sum_i w_i = 1
//!             w_i >= 0
//! ```
//!
//! Use the builder to construct and solve it:
//! ```ignore
//! let allocation = MeanVarianceProblem::from_returns(&returns)?
//!     .reward_floor(0.01)
//!     .solve()?;
//! ```
//!
//! The formulation owns feasibility and result checking; the numerical work
//! goes through a [`Backend`].

use nalgebra::{DMatrix, DVector};
use tracing::{debug, warn};

use crate::allocation::Allocation;
use crate::data::ReturnTable;
use crate::error::{PortfolioError, Result};
use crate::solver::{Backend, ClarabelBackend, SolveStatus};

/// Default minimum expected periodic return (1%).
pub const DEFAULT_REWARD_FLOOR: f64 = 0.01;

/// Slack allowed when comparing the floor against the best asset mean.
const FEASIBILITY_TOL: f64 = 1e-9;
/// Allowed deviation of `sum(w)` from 1.
const BUDGET_TOL: f64 = 1e-4;
/// Negative weights down to this magnitude are solver noise and snapped to 0.
const NEGATIVE_TOL: f64 = 1e-8;
/// Allowed shortfall of the achieved return below the floor.
const RETURN_TOL: f64 = 1e-6;

/// A long-only minimum-variance problem with a return floor.
#[derive(Debug, Clone, PartialEq)]
pub struct MeanVarianceProblem {
    assets: Vec<String>,
    mu: DVector<f64>,
    sigma: DMatrix<f64>,
    reward_floor: f64,
}

impl MeanVarianceProblem {
    /// Start a problem from per-asset mean returns and their covariance.
    pub fn builder(assets: Vec<String>, mu: DVector<f64>, sigma: DMatrix<f64>) -> ProblemBuilder {
        ProblemBuilder {
            assets,
            mu,
            sigma,
            reward_floor: DEFAULT_REWARD_FLOOR,
        }
    }

    /// Start a problem from a return table: arithmetic means and sample
    /// covariance.
    pub fn from_returns(returns: &ReturnTable) -> Result<ProblemBuilder> {
        Ok(Self::builder(
            returns.assets().to_vec(),
            returns.mean_returns(),
            returns.covariance()?,
        ))
    }

    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    /// Mean return per asset.
    pub fn mu(&self) -> &DVector<f64> {
        &self.mu
    }

    /// Covariance matrix.
    pub fn sigma(&self) -> &DMatrix<f64> {
        &self.sigma
    }

    pub fn reward_floor(&self) -> f64 {
        self.reward_floor
    }

    pub fn n_assets(&self) -> usize {
        self.mu.len()
    }

    /// Portfolio variance `w' Sigma w`.
    pub fn variance(&self, w: &DVector<f64>) -> f64 {
        (w.transpose() * &self.sigma * w)[(0, 0)]
    }

    /// Expected portfolio return `mu' w`.
    pub fn expected_return(&self, w: &DVector<f64>) -> f64 {
        self.mu.dot(w)
    }

    /// Highest expected return any long-only, fully invested portfolio can
    /// reach: the best single-asset mean.
    pub fn max_achievable_return(&self) -> f64 {
        self.mu.max()
    }

    /// Whether some allocation satisfies all constraints.
    pub fn is_feasible(&self) -> bool {
        self.max_achievable_return() >= self.reward_floor - FEASIBILITY_TOL
    }

    /// Solve with the default Clarabel backend.
    pub fn solve(&self) -> Result<Allocation> {
        self.solve_with(&ClarabelBackend::default())
    }

    /// Solve with a specific backend.
    ///
    /// # Errors
    ///
    /// - [`PortfolioError::Infeasible`] if the floor cannot be reached, whether
    ///   detected up front or reported by the backend
    /// - [`PortfolioError::Solver`] / [`PortfolioError::Numerical`] for other
    ///   backend failures or a result that breaks the constraints
    pub fn solve_with<B: Backend + ?Sized>(&self, backend: &B) -> Result<Allocation> {
        if !self.is_feasible() {
            return Err(self.infeasible());
        }

        // Zero degrees of freedom: the budget pins the only weight to 1.
        if self.n_assets() == 1 {
            debug!(asset = %self.assets[0], "single asset, skipping solver");
            return self.check(DVector::from_element(1, 1.0)).map(|a| a.with_stats(0, 0.0));
        }

        debug!(
            backend = backend.name(),
            assets = self.n_assets(),
            reward_floor = self.reward_floor,
            "solving mean-variance program"
        );
        // A floor within FEASIBILITY_TOL above the best mean is reachable only
        // by the best asset; hand the backend a floor it can actually meet.
        let floor = self.reward_floor.min(self.max_achievable_return());
        let solution = backend.solve(&self.mu, &self.sigma, floor);
        let detail = solution.message.clone().unwrap_or_default();

        match solution.status {
            SolveStatus::Optimal => {}
            SolveStatus::Infeasible => return Err(self.infeasible()),
            SolveStatus::Unbounded => {
                return Err(PortfolioError::Solver(format!("problem is unbounded ({})", detail)))
            }
            SolveStatus::MaxIterations => {
                return Err(PortfolioError::Solver(format!(
                    "maximum iterations reached ({})",
                    detail
                )))
            }
            SolveStatus::NumericalError => {
                return Err(PortfolioError::Numerical(format!(
                    "solver encountered numerical difficulties ({})",
                    detail
                )))
            }
            SolveStatus::Unknown => {
                return Err(PortfolioError::Solver(format!("unknown solver status ({})", detail)))
            }
        }

        let weights = solution.weights.ok_or_else(|| {
            PortfolioError::Solver("backend reported optimal without weights".into())
        })?;

        Ok(self
            .check(weights)?
            .with_stats(solution.iterations, solution.solve_time))
    }

    fn infeasible(&self) -> PortfolioError {
        PortfolioError::Infeasible {
            reward_floor: self.reward_floor,
            max_return: self.max_achievable_return(),
        }
    }

    /// Snap solver noise and verify the constraints at `w`.
    fn check(&self, mut w: DVector<f64>) -> Result<Allocation> {
        if w.len() != self.n_assets() {
            return Err(PortfolioError::ShapeMismatch {
                expected: format!("{} weights", self.n_assets()),
                got: format!("{}", w.len()),
            });
        }
        if w.iter().any(|v| !v.is_finite()) {
            return Err(PortfolioError::Numerical("solver returned non-finite weights".into()));
        }

        let mut snapped = 0;
        for v in w.iter_mut() {
            if *v < 0.0 && *v >= -NEGATIVE_TOL {
                *v = 0.0;
                snapped += 1;
            }
        }
        if snapped > 0 {
            warn!(snapped, "snapped tiny negative weights to zero");
        }

        if let Some(v) = w.iter().find(|v| **v < 0.0) {
            return Err(PortfolioError::Numerical(format!("negative weight {:.3e}", v)));
        }

        let total = w.sum();
        if (total - 1.0).abs() > BUDGET_TOL {
            return Err(PortfolioError::Numerical(format!(
                "weights sum to {:.6}, not 1",
                total
            )));
        }

        let expected_return = self.expected_return(&w);
        if expected_return < self.reward_floor - RETURN_TOL {
            return Err(PortfolioError::Numerical(format!(
                "achieved return {:.6} is below the floor {:.6}",
                expected_return, self.reward_floor
            )));
        }

        let variance = self.variance(&w);
        Ok(Allocation::new(self.assets.clone(), w, expected_return, variance))
    }
}

/// Builder for constructing problems.
#[derive(Debug, Clone)]
pub struct ProblemBuilder {
    assets: Vec<String>,
    mu: DVector<f64>,
    sigma: DMatrix<f64>,
    reward_floor: f64,
}

impl ProblemBuilder {
    /// Set the minimum expected return.
    pub fn reward_floor(mut self, floor: f64) -> Self {
        self.reward_floor = floor;
        self
    }

    /// Validate and build the problem.
    pub fn build(self) -> Result<MeanVarianceProblem> {
        let n = self.assets.len();
        if n == 0 {
            return Err(PortfolioError::InvalidSelection("no assets to allocate".into()));
        }
        if self.mu.len() != n {
            return Err(PortfolioError::ShapeMismatch {
                expected: format!("{} mean returns", n),
                got: format!("{}", self.mu.len()),
            });
        }
        if self.sigma.nrows() != n || self.sigma.ncols() != n {
            return Err(PortfolioError::ShapeMismatch {
                expected: format!("{}x{} covariance", n, n),
                got: format!("{}x{}", self.sigma.nrows(), self.sigma.ncols()),
            });
        }
        if !self.reward_floor.is_finite()
            || self.mu.iter().chain(self.sigma.iter()).any(|v| !v.is_finite())
        {
            return Err(PortfolioError::Numerical("non-finite problem data".into()));
        }

        let scale = self.sigma.amax().max(1.0);
        for i in 0..n {
            for j in (i + 1)..n {
                if (self.sigma[(i, j)] - self.sigma[(j, i)]).abs() > 1e-10 * scale {
                    return Err(PortfolioError::Data(format!(
                        "covariance is not symmetric at ({}, {})",
                        i, j
                    )));
                }
            }
        }

        Ok(MeanVarianceProblem {
            assets: self.assets,
            mu: self.mu,
            sigma: self.sigma,
            reward_floor: self.reward_floor,
        })
    }

    /// Build and solve the problem with the default backend.
    pub fn solve(self) -> Result<Allocation> {
        self.build()?.solve()
    }

    /// Build and solve the problem with a specific backend.
    pub fn solve_with<B: Backend + ?Sized>(self, backend: &B) -> Result<Allocation> {
        self.build()?.solve_with(backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::Solution;
    use approx::assert_abs_diff_eq;
    use std::cell::Cell;

    /// Backend returning a canned solution, counting calls and recording the
    /// floor it was asked for.
    struct Canned {
        solution: Solution,
        calls: Cell<usize>,
        floor: Cell<f64>,
    }

    impl Canned {
        fn new(solution: Solution) -> Self {
            Canned {
                solution,
                calls: Cell::new(0),
                floor: Cell::new(f64::NAN),
            }
        }
    }

    impl Backend for Canned {
        fn name(&self) -> &'static str {
            "canned"
        }

        fn solve(&self, _mu: &DVector<f64>, _sigma: &DMatrix<f64>, floor: f64) -> Solution {
            self.calls.set(self.calls.get() + 1);
            self.floor.set(floor);
            self.solution.clone()
        }
    }

    fn two_assets() -> ProblemBuilder {
        MeanVarianceProblem::builder(
            vec!["A".into(), "B".into()],
            DVector::from_vec(vec![0.02, 0.01]),
            DMatrix::from_row_slice(2, 2, &[0.04, 0.0, 0.0, 0.01]),
        )
    }

    #[test]
    fn test_builder_default_floor() {
        let problem = two_assets().build().unwrap();
        assert_eq!(problem.reward_floor(), DEFAULT_REWARD_FLOOR);
        assert_eq!(problem.n_assets(), 2);
    }

    #[test]
    fn test_builder_rejects_shape_mismatch() {
        let err = MeanVarianceProblem::builder(
            vec!["A".into(), "B".into()],
            DVector::from_vec(vec![0.02]),
            DMatrix::identity(2, 2),
        )
        .build()
        .unwrap_err();
        assert!(matches!(err, PortfolioError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_builder_rejects_asymmetric_covariance() {
        let err = MeanVarianceProblem::builder(
            vec!["A".into(), "B".into()],
            DVector::from_vec(vec![0.02, 0.01]),
            DMatrix::from_row_slice(2, 2, &[0.04, 0.01, 0.02, 0.01]),
        )
        .build()
        .unwrap_err();
        assert!(matches!(err, PortfolioError::Data(_)));
    }

    #[test]
    fn test_builder_rejects_empty() {
        let err = MeanVarianceProblem::builder(vec![], DVector::zeros(0), DMatrix::zeros(0, 0))
            .build()
            .unwrap_err();
        assert!(matches!(err, PortfolioError::InvalidSelection(_)));
    }

    #[test]
    fn test_objective_and_return() {
        let problem = two_assets().build().unwrap();
        let w = DVector::from_vec(vec![0.5, 0.5]);
        assert_abs_diff_eq!(problem.variance(&w), 0.0125, epsilon = 1e-15);
        assert_abs_diff_eq!(problem.expected_return(&w), 0.015, epsilon = 1e-15);
        assert_eq!(problem.max_achievable_return(), 0.02);
    }

    #[test]
    fn test_infeasible_detected_before_backend() {
        let backend = Canned::new(Solution::optimal(DVector::from_vec(vec![1.0, 0.0])));
        let err = two_assets().reward_floor(0.03).solve_with(&backend).unwrap_err();
        assert!(err.is_infeasible());
        assert_eq!(backend.calls.get(), 0);
    }

    #[test]
    fn test_floor_just_above_best_mean_is_clamped() {
        let backend = Canned::new(Solution::optimal(DVector::from_vec(vec![1.0, 0.0])));
        let alloc = two_assets().reward_floor(0.02 + 5e-10).solve_with(&backend).unwrap();
        assert_eq!(backend.floor.get(), 0.02);
        assert_eq!(alloc.weights()[0], 1.0);

        // Reachable floors pass through untouched.
        let backend = Canned::new(Solution::optimal(DVector::from_vec(vec![0.5, 0.5])));
        two_assets().reward_floor(0.015).solve_with(&backend).unwrap();
        assert_eq!(backend.floor.get(), 0.015);
    }

    #[test]
    fn test_backend_infeasible_maps_to_error() {
        let backend = Canned::new(Solution::failed(SolveStatus::Infeasible, "nope", 0.0));
        let err = two_assets().solve_with(&backend).unwrap_err();
        assert!(matches!(err, PortfolioError::Infeasible { .. }));
        assert_eq!(backend.calls.get(), 1);
    }

    #[test]
    fn test_backend_failures_are_not_infeasible() {
        let cases = [
            (SolveStatus::MaxIterations, "maximum iterations"),
            (SolveStatus::Unbounded, "unbounded"),
            (SolveStatus::Unknown, "unknown"),
        ];
        for (status, needle) in cases {
            let backend = Canned::new(Solution::failed(status, "x", 0.0));
            match two_assets().solve_with(&backend) {
                Err(PortfolioError::Solver(msg)) => assert!(msg.contains(needle), "{}", msg),
                other => panic!("{:?} should be a solver error, got {:?}", status, other),
            }
        }

        let backend = Canned::new(Solution::failed(SolveStatus::NumericalError, "x", 0.0));
        assert!(matches!(
            two_assets().solve_with(&backend),
            Err(PortfolioError::Numerical(_))
        ));
    }

    #[test]
    fn test_tiny_negatives_are_snapped() {
        let backend = Canned::new(Solution::optimal(DVector::from_vec(vec![1.0, -1e-10])));
        let alloc = two_assets().solve_with(&backend).unwrap();
        assert_eq!(alloc.weights()[1], 0.0);
    }

    #[test]
    fn test_constraint_violations_are_rejected() {
        // Short position.
        let backend = Canned::new(Solution::optimal(DVector::from_vec(vec![1.1, -0.1])));
        assert!(matches!(two_assets().solve_with(&backend), Err(PortfolioError::Numerical(_))));

        // Not fully invested.
        let backend = Canned::new(Solution::optimal(DVector::from_vec(vec![0.5, 0.4])));
        assert!(matches!(two_assets().solve_with(&backend), Err(PortfolioError::Numerical(_))));

        // Below the floor: 0.2 * 0.02 + 0.8 * 0.01 = 0.012 < 0.015.
        let backend = Canned::new(Solution::optimal(DVector::from_vec(vec![0.2, 0.8])));
        assert!(matches!(
            two_assets().reward_floor(0.015).solve_with(&backend),
            Err(PortfolioError::Numerical(_))
        ));

        // Wrong length.
        let backend = Canned::new(Solution::optimal(DVector::from_vec(vec![1.0])));
        assert!(matches!(
            two_assets().solve_with(&backend),
            Err(PortfolioError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_single_asset_skips_backend() {
        let backend = Canned::new(Solution::failed(SolveStatus::Unknown, "unused", 0.0));
        let alloc = MeanVarianceProblem::builder(
            vec!["A".into()],
            DVector::from_vec(vec![0.02]),
            DMatrix::from_element(1, 1, 0.0009),
        )
        .solve_with(&backend)
        .unwrap();

        assert_eq!(alloc.weights()[0], 1.0);
        assert_abs_diff_eq!(alloc.variance, 0.0009, epsilon = 1e-15);
        assert_eq!(backend.calls.get(), 0);
    }

    #[test]
    fn test_single_asset_below_floor_is_infeasible() {
        let err = MeanVarianceProblem::builder(
            vec!["A".into()],
            DVector::from_vec(vec![-0.01]),
            DMatrix::from_element(1, 1, 0.0009),
        )
        .solve()
        .unwrap_err();
        assert!(err.is_infeasible());
    }

    #[test]
    fn test_solve_with_clarabel_binding_floor() {
        // Unconstrained min-variance is (0.2, 0.8) with return 0.012; a floor
        // of 0.015 binds and forces (0.5, 0.5).
        let alloc = two_assets().reward_floor(0.015).solve().unwrap();
        assert_abs_diff_eq!(alloc.weights()[0], 0.5, epsilon = 1e-4);
        assert_abs_diff_eq!(alloc.expected_return, 0.015, epsilon = 1e-6);
        assert!(alloc.iterations > 0);
    }
}
