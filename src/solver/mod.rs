//! Solver interface for minvar.
//!
//! This module provides:
//! - The [`Backend`] seam between the mean-variance formulation and a
//!   numerical QP solver
//! - Matrix stuffing into the conic standard form
//! - Clarabel solver integration

pub mod clarabel;
pub mod stuffing;

use nalgebra::{DMatrix, DVector};

pub use self::clarabel::{ClarabelBackend, Settings};
pub use stuffing::{stuff_problem, ConeDims, StuffedProblem};

/// Solution status from a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    /// Optimal solution found.
    Optimal,
    /// Problem is infeasible.
    Infeasible,
    /// Problem is unbounded.
    Unbounded,
    /// Maximum iterations (or time) reached.
    MaxIterations,
    /// Numerical difficulties.
    NumericalError,
    /// Unknown status.
    Unknown,
}

/// Raw result of one backend call.
#[derive(Debug, Clone)]
pub struct Solution {
    /// Solution status.
    pub status: SolveStatus,
    /// Weights, present only when `status` is [`SolveStatus::Optimal`].
    pub weights: Option<DVector<f64>>,
    /// Backend-specific detail for non-optimal outcomes.
    pub message: Option<String>,
    /// Number of iterations.
    pub iterations: u32,
    /// Solve time in seconds.
    pub solve_time: f64,
}

impl Solution {
    /// An optimal solution.
    pub fn optimal(weights: DVector<f64>) -> Self {
        Solution {
            status: SolveStatus::Optimal,
            weights: Some(weights),
            message: None,
            iterations: 0,
            solve_time: 0.0,
        }
    }

    /// A failed solve with no weights.
    pub fn failed(status: SolveStatus, message: impl Into<String>, solve_time: f64) -> Self {
        Solution {
            status,
            weights: None,
            message: Some(message.into()),
            iterations: 0,
            solve_time,
        }
    }
}

/// A numerical solver for the long-only minimum-variance program:
///
/// ```text
/// minimize    w' sigma w
/// subject to  mu' w >= reward_floor
///             sum(w) = 1
///             w >= 0
/// ```
///
/// Implementations report what happened through [`SolveStatus`]; turning
/// that into user-facing errors is the caller's job.
pub trait Backend {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    fn solve(&self, mu: &DVector<f64>, sigma: &DMatrix<f64>, reward_floor: f64) -> Solution;
}
