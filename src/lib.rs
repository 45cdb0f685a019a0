//! # minvar
//!
//! Minimum-variance portfolio allocation under a return floor.
//!
//! Given periodic prices for a handful of assets, minvar turns them into
//! fractional returns and solves the long-only Markowitz program:
//!
//! ```text
//! minimize    w' Sigma w            (portfolio variance)
//! subject to  mu' w >= floor        (minimum expected return)
//!             sum(w) = 1            (fully invested)
//!             w >= 0                (no short selling)
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use minvar::prelude::*;
//!
//! let prices = PriceTable::from_csv_path("prices.csv")?;
//! let returns = ReturnTable::from_prices(&prices)?;
//!
//! let allocation = MeanVarianceProblem::from_returns(&returns)?
//!     .reward_floor(0.01)
//!     .solve()?;
//!
//! for (asset, w) in allocation.iter() {
//!     println!("{asset}: {:.2}%", w * 100.0);
//! }
//! ```
//!
//! ## Architecture
//!
//! - **Data**: [`PriceTable`] (dated, with gaps) to [`ReturnTable`] (complete)
//! - **Formulation**: [`MeanVarianceProblem`] owns feasibility and result checks
//! - **Backend**: the [`solver::Backend`] trait; [`ClarabelBackend`] stuffs the
//!   program into conic form and runs the Clarabel interior-point solver
//! - **Pipeline**: [`pipeline::run`] wires a [`Selection`] and a [`Config`]
//!   through all of the above into a [`pipeline::PortfolioReport`]

pub mod allocation;
pub mod config;
pub mod data;
pub mod error;
pub mod pipeline;
pub mod problem;
pub mod report;
pub mod selection;
pub mod solver;
pub mod sparse;
pub mod stats;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use minvar::prelude::*;
/// ```
pub mod prelude {
    // Data
    pub use crate::data::{PriceTable, ReturnTable};

    // Problem
    pub use crate::allocation::Allocation;
    pub use crate::problem::{MeanVarianceProblem, ProblemBuilder, DEFAULT_REWARD_FLOOR};

    // Solver
    pub use crate::solver::{Backend, ClarabelBackend, Settings, Solution, SolveStatus};

    // Requests and output
    pub use crate::config::Config;
    pub use crate::pipeline::{run, run_with, PortfolioReport};
    pub use crate::report::WeightsReport;
    pub use crate::selection::{Selection, SelectionRules};

    // Errors
    pub use crate::error::{PortfolioError, Result};
}

// Re-export main types at crate root
pub use allocation::Allocation;
pub use config::Config;
pub use data::{PriceTable, ReturnTable};
pub use error::{PortfolioError, Result};
pub use problem::MeanVarianceProblem;
pub use selection::Selection;
pub use solver::ClarabelBackend;
