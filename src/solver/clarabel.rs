//! Clarabel solver integration.
//!
//! [`ClarabelBackend`] solves the stuffed mean-variance program with the
//! Clarabel interior-point conic solver.

use std::time::Instant;

use clarabel::algebra::CscMatrix as ClarabelCsc;
use clarabel::solver::{
    DefaultSettingsBuilder, DefaultSolver, IPSolver, SolverStatus, SupportedConeT,
};
use nalgebra::{DMatrix, DVector};
use serde::Deserialize;
use tracing::debug;

use super::stuffing::{stuff_problem, ConeDims};
use super::{Backend, Solution, SolveStatus};

impl From<SolverStatus> for SolveStatus {
    fn from(status: SolverStatus) -> Self {
        match status {
            SolverStatus::Solved | SolverStatus::AlmostSolved => SolveStatus::Optimal,
            SolverStatus::PrimalInfeasible | SolverStatus::AlmostPrimalInfeasible => {
                SolveStatus::Infeasible
            }
            SolverStatus::DualInfeasible | SolverStatus::AlmostDualInfeasible => {
                SolveStatus::Unbounded
            }
            SolverStatus::MaxIterations | SolverStatus::MaxTime => SolveStatus::MaxIterations,
            SolverStatus::NumericalError | SolverStatus::InsufficientProgress => {
                SolveStatus::NumericalError
            }
            _ => SolveStatus::Unknown,
        }
    }
}

/// Solver settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Print solver output.
    pub verbose: bool,
    /// Maximum iterations.
    pub max_iter: u32,
    /// Time limit in seconds.
    pub time_limit: f64,
    /// Absolute tolerance.
    pub tol_gap_abs: f64,
    /// Relative tolerance.
    pub tol_gap_rel: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            verbose: false,
            max_iter: 200,
            time_limit: f64::INFINITY,
            tol_gap_abs: 1e-8,
            tol_gap_rel: 1e-8,
        }
    }
}

/// Backend running Clarabel with fixed [`Settings`].
#[derive(Debug, Clone, Default)]
pub struct ClarabelBackend {
    settings: Settings,
}

impl ClarabelBackend {
    pub fn new(settings: Settings) -> Self {
        ClarabelBackend { settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }
}

impl Backend for ClarabelBackend {
    fn name(&self) -> &'static str {
        "clarabel"
    }

    fn solve(&self, mu: &DVector<f64>, sigma: &DMatrix<f64>, reward_floor: f64) -> Solution {
        let started = Instant::now();
        let stuffed = stuff_problem(mu, sigma, reward_floor);

        let p = to_clarabel_csc(&stuffed.p);
        let a = to_clarabel_csc(&stuffed.a);
        let cones = to_clarabel_cones(&stuffed.cone_dims);

        let clarabel_settings = match DefaultSettingsBuilder::default()
            .verbose(self.settings.verbose)
            .max_iter(self.settings.max_iter)
            .time_limit(self.settings.time_limit)
            .tol_gap_abs(self.settings.tol_gap_abs)
            .tol_gap_rel(self.settings.tol_gap_rel)
            .build()
        {
            Ok(s) => s,
            Err(e) => {
                return Solution::failed(
                    SolveStatus::Unknown,
                    format!("invalid clarabel settings: {}", e),
                    started.elapsed().as_secs_f64(),
                )
            }
        };

        let mut solver = DefaultSolver::new(&p, &stuffed.q, &a, &stuffed.b, &cones, clarabel_settings);
        solver.solve();

        let raw_status = solver.solution.status;
        let status: SolveStatus = raw_status.into();
        let iterations = solver.info.iterations;
        let solve_time = solver.solution.solve_time;
        debug!(?raw_status, ?status, iterations, solve_time, "clarabel finished");

        if status == SolveStatus::Optimal {
            Solution {
                status,
                weights: Some(DVector::from_column_slice(&solver.solution.x)),
                message: None,
                iterations,
                solve_time,
            }
        } else {
            Solution {
                status,
                weights: None,
                message: Some(format!("clarabel status {:?}", raw_status)),
                iterations,
                solve_time,
            }
        }
    }
}

/// Convert nalgebra CSC to Clarabel CSC.
fn to_clarabel_csc(m: &nalgebra_sparse::CscMatrix<f64>) -> ClarabelCsc<f64> {
    ClarabelCsc::new(
        m.nrows(),
        m.ncols(),
        m.col_offsets().to_vec(),
        m.row_indices().to_vec(),
        m.values().to_vec(),
    )
}

/// Convert cone dimensions to Clarabel cones. Zero cones come first, matching
/// the row order of the stuffed `A`.
fn to_clarabel_cones(dims: &ConeDims) -> Vec<SupportedConeT<f64>> {
    let mut cones = Vec::new();

    if dims.zero > 0 {
        cones.push(SupportedConeT::ZeroConeT(dims.zero));
    }

    if dims.nonneg > 0 {
        cones.push(SupportedConeT::NonnegativeConeT(dims.nonneg));
    }

    cones
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert!(!settings.verbose);
        assert_eq!(settings.max_iter, 200);
        assert!(settings.time_limit.is_infinite());
    }

    #[test]
    fn test_to_clarabel_cones() {
        let cones = to_clarabel_cones(&ConeDims { zero: 1, nonneg: 4 });
        assert_eq!(cones.len(), 2);
        assert!(matches!(cones[0], SupportedConeT::ZeroConeT(1)));
        assert!(matches!(cones[1], SupportedConeT::NonnegativeConeT(4)));
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(SolveStatus::from(SolverStatus::Solved), SolveStatus::Optimal);
        assert_eq!(SolveStatus::from(SolverStatus::PrimalInfeasible), SolveStatus::Infeasible);
        assert_eq!(SolveStatus::from(SolverStatus::MaxTime), SolveStatus::MaxIterations);
        assert_eq!(SolveStatus::from(SolverStatus::Unsolved), SolveStatus::Unknown);
    }

    #[test]
    fn test_backend_two_uncorrelated_assets() {
        // Non-binding floor: w_i proportional to 1 / sigma_i^2, so (0.8, 0.2).
        let mu = DVector::from_vec(vec![0.02, 0.02]);
        let sigma = DMatrix::from_diagonal(&DVector::from_vec(vec![0.01, 0.04]));
        let sol = ClarabelBackend::default().solve(&mu, &sigma, 0.01);

        assert_eq!(sol.status, SolveStatus::Optimal);
        let w = sol.weights.expect("weights");
        assert_abs_diff_eq!(w[0], 0.8, epsilon = 1e-5);
        assert_abs_diff_eq!(w[1], 0.2, epsilon = 1e-5);
    }

    #[test]
    fn test_backend_reports_infeasible() {
        let mu = DVector::from_vec(vec![-0.01, 0.005]);
        let sigma = DMatrix::from_diagonal(&DVector::from_vec(vec![0.01, 0.02]));
        let sol = ClarabelBackend::default().solve(&mu, &sigma, 0.05);

        assert_eq!(sol.status, SolveStatus::Infeasible);
        assert!(sol.weights.is_none());
    }
}
