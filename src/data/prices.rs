//! Dated price tables.
//!
//! A [`PriceTable`] is the input handed over by the market-data side: one row
//! per period, one column per ticker, with `None` marking a missing quote.

use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{Datelike, NaiveDate};

use crate::error::{PortfolioError, Result};

/// Cell spellings treated as a missing price.
const MISSING: [&str; 5] = ["", "nan", "na", "null", "none"];

/// Periodic prices: rows are dates (ascending, unique), columns are tickers.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceTable {
    assets: Vec<String>,
    dates: Vec<NaiveDate>,
    rows: Vec<Vec<Option<f64>>>,
}

impl PriceTable {
    /// Build a table from `(date, prices)` rows.
    ///
    /// Rows are sorted by date. Duplicate dates, duplicate tickers and rows
    /// whose width differs from the ticker count are rejected.
    pub fn new(
        assets: Vec<String>,
        mut rows: Vec<(NaiveDate, Vec<Option<f64>>)>,
    ) -> Result<Self> {
        let mut seen = HashSet::new();
        for a in &assets {
            if !seen.insert(a.as_str()) {
                return Err(PortfolioError::Data(format!("duplicate ticker column '{}'", a)));
            }
        }

        for (date, row) in &rows {
            if row.len() != assets.len() {
                return Err(PortfolioError::ShapeMismatch {
                    expected: format!("{} prices on {}", assets.len(), date),
                    got: format!("{}", row.len()),
                });
            }
        }

        rows.sort_by_key(|(d, _)| *d);
        if let Some(w) = rows.windows(2).find(|w| w[0].0 == w[1].0) {
            return Err(PortfolioError::Data(format!("duplicate date {}", w[0].0)));
        }

        let (dates, rows) = rows.into_iter().unzip();
        Ok(PriceTable { assets, dates, rows })
    }

    /// Load a table from a CSV file.
    pub fn from_csv_path(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::from_csv_reader(file)
    }

    /// Parse CSV with a header of `date,<TICKER>,...` and ISO dates in the
    /// first column. Empty cells, `NaN`, `NA` and `null` are missing prices.
    /// Ticker headers are upper-cased; two headers differing only in case are
    /// duplicates.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = rdr.headers()?.clone();
        if headers.len() < 2 {
            return Err(PortfolioError::Data(
                "header needs a date column and at least one ticker".into(),
            ));
        }
        // Same normalization as `Selection::new`, so `aapl` matches `AAPL`.
        let assets: Vec<String> = headers.iter().skip(1).map(str::to_ascii_uppercase).collect();

        let mut rows = Vec::new();
        for (line, record) in rdr.records().enumerate() {
            let record = record?;
            // +2: one for the header, one for 1-based numbering
            let line = line + 2;

            let date_field = record.get(0).unwrap_or_default();
            let date = NaiveDate::parse_from_str(date_field, "%Y-%m-%d").map_err(|e| {
                PortfolioError::Data(format!("line {}: bad date '{}': {}", line, date_field, e))
            })?;

            let prices = record
                .iter()
                .skip(1)
                .map(|cell| parse_price(cell, line))
                .collect::<Result<Vec<_>>>()?;

            rows.push((date, prices));
        }

        Self::new(assets, rows)
    }

    /// Tickers, in column order.
    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    /// Row dates, ascending.
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Price rows aligned with [`dates`](Self::dates).
    pub fn rows(&self) -> &[Vec<Option<f64>>] {
        &self.rows
    }

    /// Number of periods.
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Keep only the given tickers, in the given order.
    pub fn select(&self, tickers: &[String]) -> Result<PriceTable> {
        let idx = tickers
            .iter()
            .map(|t| {
                self.assets.iter().position(|a| a == t).ok_or_else(|| {
                    PortfolioError::InvalidSelection(format!("no price data for ticker '{}'", t))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let rows = self
            .rows
            .iter()
            .map(|row| idx.iter().map(|&j| row[j]).collect())
            .collect();

        Ok(PriceTable {
            assets: tickers.to_vec(),
            dates: self.dates.clone(),
            rows,
        })
    }

    /// Rows with `start <= date < end`.
    pub fn window(&self, start: NaiveDate, end: NaiveDate) -> PriceTable {
        let (dates, rows) = self
            .dates
            .iter()
            .zip(&self.rows)
            .filter(|(d, _)| **d >= start && **d < end)
            .map(|(d, r)| (*d, r.clone()))
            .unzip();

        PriceTable {
            assets: self.assets.clone(),
            dates,
            rows,
        }
    }

    /// Resample to one row per calendar month.
    ///
    /// Each cell takes the last available price within its month; the row is
    /// dated the first of the month.
    pub fn to_monthly(&self) -> PriceTable {
        let mut dates: Vec<NaiveDate> = Vec::new();
        let mut rows: Vec<Vec<Option<f64>>> = Vec::new();

        for (date, row) in self.dates.iter().zip(&self.rows) {
            let month = month_start(*date);
            if dates.last() != Some(&month) {
                dates.push(month);
                rows.push(vec![None; self.assets.len()]);
            }
            if let Some(current) = rows.last_mut() {
                for (slot, price) in current.iter_mut().zip(row) {
                    if price.is_some() {
                        *slot = *price;
                    }
                }
            }
        }

        PriceTable {
            assets: self.assets.clone(),
            dates,
            rows,
        }
    }
}

fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn parse_price(cell: &str, line: usize) -> Result<Option<f64>> {
    if MISSING.contains(&cell.to_ascii_lowercase().as_str()) {
        return Ok(None);
    }
    let value: f64 = cell
        .parse()
        .map_err(|_| PortfolioError::Data(format!("line {}: bad price '{}'", line, cell)))?;
    if value.is_finite() {
        Ok(Some(value))
    } else {
        Ok(None)
    }
}
