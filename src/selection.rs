//! User requests: which tickers, over which dates.

use std::collections::HashSet;

use chrono::NaiveDate;

use crate::error::{PortfolioError, Result};

/// Default cap on the number of tickers in one request.
pub const DEFAULT_MAX_ASSETS: usize = 10;

/// Predefined tickers offered to users, grouped by sector.
pub const UNIVERSE: &[(&str, &[&str])] = &[
    ("Technology", &["AAPL", "MSFT", "GOOGL", "AMZN", "NVDA"]),
    ("Healthcare", &["MRK", "PFE", "JNJ", "ABBV", "AMGN"]),
    ("Consumer Goods", &["PG", "KO", "PEP", "CL", "MCD"]),
    ("Energy", &["XOM", "CVX", "SLB", "COP"]),
    ("Finance", &["JPM", "GS", "C", "BAC"]),
    ("Industrials", &["BA", "GE", "CAT", "LMT"]),
    ("Consumer Services", &["DIS", "NFLX", "AMT", "VZ"]),
    ("Utilities", &["DUK", "AEE", "SO", "XEL"]),
];

/// Tickers selected when the user picks none explicitly.
pub const DEFAULT_TICKERS: [&str; 3] = ["AAPL", "MSFT", "GOOGL"];

/// All universe tickers in sector order.
pub fn universe_tickers() -> impl Iterator<Item = &'static str> {
    UNIVERSE.iter().flat_map(|(_, tickers)| tickers.iter().copied())
}

/// Whether `ticker` is one of the predefined tickers.
pub fn in_universe(ticker: &str) -> bool {
    universe_tickers().any(|t| t == ticker)
}

/// Default start of the analysis window.
pub fn default_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2019, 10, 1).unwrap_or_default()
}

/// Default (exclusive) end of the analysis window.
pub fn default_end() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 10, 31).unwrap_or_default()
}

/// Validation rules applied to a [`Selection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionRules {
    /// Upper bound on the number of tickers.
    pub max_assets: usize,
    /// Reject tickers outside [`UNIVERSE`].
    pub restrict_to_universe: bool,
}

impl Default for SelectionRules {
    fn default() -> Self {
        SelectionRules {
            max_assets: DEFAULT_MAX_ASSETS,
            restrict_to_universe: false,
        }
    }
}

/// A validated request: tickers in the user's order plus a half-open date
/// window `[start, end)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    tickers: Vec<String>,
    start: NaiveDate,
    end: NaiveDate,
}

impl Selection {
    /// Validate a request.
    ///
    /// Tickers are trimmed and upper-cased before checking.
    pub fn new<S: AsRef<str>>(
        tickers: &[S],
        start: NaiveDate,
        end: NaiveDate,
        rules: &SelectionRules,
    ) -> Result<Self> {
        let tickers: Vec<String> = tickers
            .iter()
            .map(|t| t.as_ref().trim().to_ascii_uppercase())
            .collect();

        if tickers.is_empty() {
            return Err(PortfolioError::InvalidSelection(
                "select at least one ticker".into(),
            ));
        }
        if tickers.len() > rules.max_assets {
            return Err(PortfolioError::InvalidSelection(format!(
                "select at most {} tickers, got {}",
                rules.max_assets,
                tickers.len()
            )));
        }

        let mut seen = HashSet::new();
        for t in &tickers {
            if t.is_empty() {
                return Err(PortfolioError::InvalidSelection("empty ticker".into()));
            }
            if !seen.insert(t.as_str()) {
                return Err(PortfolioError::InvalidSelection(format!(
                    "ticker '{}' selected twice",
                    t
                )));
            }
            if rules.restrict_to_universe && !in_universe(t) {
                return Err(PortfolioError::InvalidSelection(format!(
                    "ticker '{}' is not in the supported universe",
                    t
                )));
            }
        }

        if start >= end {
            return Err(PortfolioError::InvalidSelection(format!(
                "start date {} must be before end date {}",
                start, end
            )));
        }

        Ok(Selection {
            tickers,
            start,
            end,
        })
    }

    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    /// First date included.
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// First date excluded.
    pub fn end(&self) -> NaiveDate {
        self.end
    }
}
