//! Error types for minvar.

use thiserror::Error;

/// Error type for minvar operations.
#[derive(Debug, Error)]
pub enum PortfolioError {
    /// The requested asset/date selection was rejected before optimizing.
    #[error("Invalid selection: {0}")]
    InvalidSelection(String),

    /// Not enough usable periods to compute returns or covariance.
    #[error("Insufficient data: need at least {required} periods, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    /// No long-only, fully invested allocation reaches the return floor.
    #[error(
        "No allocation meets the return target: floor {reward_floor:.6} exceeds the best achievable mean return {max_return:.6}"
    )]
    Infeasible { reward_floor: f64, max_return: f64 },

    /// Solver error.
    #[error("Solver error: {0}")]
    Solver(String),

    /// Numerical error.
    #[error("Numerical error: {0}")]
    Numerical(String),

    /// Shape mismatch.
    #[error("Shape mismatch: expected {expected}, got {got}")]
    ShapeMismatch { expected: String, got: String },

    /// Malformed price data.
    #[error("Invalid price data: {0}")]
    Data(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Config(#[from] config::ConfigError),
}

impl PortfolioError {
    /// True when the failure means "the target cannot be met" rather than a fault.
    pub fn is_infeasible(&self) -> bool {
        matches!(self, PortfolioError::Infeasible { .. })
    }
}

/// Result type for minvar operations.
pub type Result<T> = std::result::Result<T, PortfolioError>;
