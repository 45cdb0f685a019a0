//! Solved portfolio allocations.

use nalgebra::DVector;

/// Weights per asset together with the portfolio's achieved statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    assets: Vec<String>,
    weights: DVector<f64>,
    /// Expected periodic return `mu' w` at the optimum.
    pub expected_return: f64,
    /// Portfolio variance `w' Sigma w` at the optimum.
    pub variance: f64,
    /// Backend iterations (0 when no solver call was needed).
    pub iterations: u32,
    /// Backend solve time in seconds.
    pub solve_time: f64,
}

impl Allocation {
    pub(crate) fn new(
        assets: Vec<String>,
        weights: DVector<f64>,
        expected_return: f64,
        variance: f64,
    ) -> Self {
        Allocation {
            assets,
            weights,
            expected_return,
            variance,
            iterations: 0,
            solve_time: 0.0,
        }
    }

    pub(crate) fn with_stats(mut self, iterations: u32, solve_time: f64) -> Self {
        self.iterations = iterations;
        self.solve_time = solve_time;
        self
    }

    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    pub fn weights(&self) -> &DVector<f64> {
        &self.weights
    }

    /// Weight of `asset`, if it is part of the allocation.
    pub fn weight(&self, asset: &str) -> Option<f64> {
        self.assets
            .iter()
            .position(|a| a == asset)
            .map(|i| self.weights[i])
    }

    /// `(asset, weight)` pairs in asset order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.assets
            .iter()
            .map(String::as_str)
            .zip(self.weights.iter().copied())
    }

    /// Sum of all weights.
    pub fn total(&self) -> f64 {
        self.weights.sum()
    }

    /// Portfolio standard deviation.
    pub fn std_dev(&self) -> f64 {
        self.variance.max(0.0).sqrt()
    }
}
