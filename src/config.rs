//! Layered configuration.
//!
//! Built-in defaults are overridden by an optional TOML file, which is in
//! turn overridden by `MINVAR_*` environment variables (nested keys use
//! `__`, e.g. `MINVAR_SOLVER__MAX_ITER=500`).

use std::path::Path;

use serde::Deserialize;

use crate::error::Result;
use crate::problem::DEFAULT_REWARD_FLOOR;
use crate::selection::{SelectionRules, DEFAULT_MAX_ASSETS};
use crate::solver::Settings;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "MINVAR";

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Minimum expected periodic return of the portfolio.
    pub reward_floor: f64,
    /// Upper bound on tickers per request.
    pub max_assets: usize,
    /// Only accept tickers from the predefined universe.
    pub restrict_to_universe: bool,
    /// Resample prices to one row per month before computing returns.
    pub monthly: bool,
    /// Solver settings.
    pub solver: Settings,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            reward_floor: DEFAULT_REWARD_FLOOR,
            max_assets: DEFAULT_MAX_ASSETS,
            restrict_to_universe: false,
            monthly: true,
            solver: Settings::default(),
        }
    }
}

impl Config {
    /// Load defaults, then `path` (if given), then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Selection rules implied by this configuration.
    pub fn selection_rules(&self) -> SelectionRules {
        SelectionRules {
            max_assets: self.max_assets,
            restrict_to_universe: self.restrict_to_universe,
        }
    }
}
