//! Periodic return series.

use nalgebra::{DMatrix, DVector};
use tracing::warn;

use super::prices::PriceTable;
use crate::error::{PortfolioError, Result};
use crate::stats;

/// Period label format for monthly data, e.g. `Oct-2019`.
pub const PERIOD_LABEL_FORMAT: &str = "%b-%Y";
/// Period label format when rows are not resampled, e.g. `2019-10-31`.
pub const DATE_LABEL_FORMAT: &str = "%Y-%m-%d";

/// Fractional returns: rows are periods, columns are assets.
///
/// Every cell is defined; periods with any undefined return are dropped
/// while building the table.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnTable {
    assets: Vec<String>,
    periods: Vec<String>,
    values: DMatrix<f64>,
}

impl ReturnTable {
    /// Compute `(p_t - p_{t-1}) / p_{t-1}` for every period after the first.
    ///
    /// A return is undefined when either price is missing or the earlier
    /// price is zero. Rows containing an undefined return are dropped.
    ///
    /// # Errors
    ///
    /// [`PortfolioError::InsufficientData`] if the table has fewer than two
    /// periods or no row survives.
    pub fn from_prices(prices: &PriceTable) -> Result<Self> {
        Self::from_prices_labelled(prices, PERIOD_LABEL_FORMAT)
    }

    /// Like [`ReturnTable::from_prices`], labelling each period by its
    /// closing date in the given `chrono` format.
    pub fn from_prices_labelled(prices: &PriceTable, label_format: &str) -> Result<Self> {
        if prices.len() < 2 {
            return Err(PortfolioError::InsufficientData {
                required: 2,
                actual: prices.len(),
            });
        }

        let k = prices.assets().len();
        let mut periods = Vec::with_capacity(prices.len() - 1);
        let mut data = Vec::with_capacity((prices.len() - 1) * k);
        let mut dropped = 0usize;

        for (t, pair) in prices.rows().windows(2).enumerate() {
            let row: Option<Vec<f64>> = pair[0]
                .iter()
                .zip(&pair[1])
                .map(|(prev, cur)| match (prev, cur) {
                    (Some(p), Some(c)) if *p != 0.0 => Some((c - p) / p),
                    _ => None,
                })
                .collect();

            match row {
                Some(r) => {
                    periods.push(prices.dates()[t + 1].format(label_format).to_string());
                    data.extend(r);
                }
                None => dropped += 1,
            }
        }

        if dropped > 0 {
            warn!(dropped, "dropped periods with missing prices");
        }

        if periods.is_empty() {
            return Err(PortfolioError::InsufficientData {
                required: 1,
                actual: 0,
            });
        }

        let values = DMatrix::from_row_slice(periods.len(), k, &data);
        Ok(ReturnTable {
            assets: prices.assets().to_vec(),
            periods,
            values,
        })
    }

    /// Wrap an existing `periods x assets` return matrix.
    ///
    /// Periods are labelled `1..=n`. Non-finite cells are rejected.
    pub fn from_matrix(assets: Vec<String>, values: DMatrix<f64>) -> Result<Self> {
        if values.ncols() != assets.len() {
            return Err(PortfolioError::ShapeMismatch {
                expected: format!("{} columns", assets.len()),
                got: format!("{}", values.ncols()),
            });
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(PortfolioError::Data("return matrix has non-finite values".into()));
        }
        let periods = (1..=values.nrows()).map(|i| i.to_string()).collect();
        Ok(ReturnTable {
            assets,
            periods,
            values,
        })
    }

    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    /// Period labels, oldest first.
    pub fn periods(&self) -> &[String] {
        &self.periods
    }

    /// The raw `periods x assets` matrix.
    pub fn values(&self) -> &DMatrix<f64> {
        &self.values
    }

    pub fn n_periods(&self) -> usize {
        self.values.nrows()
    }

    pub fn n_assets(&self) -> usize {
        self.values.ncols()
    }

    /// Returns of a single asset, by column index.
    pub fn column(&self, j: usize) -> Vec<f64> {
        self.values.column(j).iter().copied().collect()
    }

    /// Per-asset arithmetic mean return.
    pub fn mean_returns(&self) -> DVector<f64> {
        stats::column_means(&self.values)
    }

    /// Sample covariance (denominator `n - 1`).
    pub fn covariance(&self) -> Result<DMatrix<f64>> {
        stats::sample_covariance(&self.values).ok_or(PortfolioError::InsufficientData {
            required: 2,
            actual: self.n_periods(),
        })
    }

    /// Pearson correlation matrix.
    pub fn correlation(&self) -> Result<DMatrix<f64>> {
        Ok(stats::correlation_from_covariance(&self.covariance()?))
    }
}
