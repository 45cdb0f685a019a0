//! Display-ready views of a solved portfolio.
//!
//! Weights are shown as percentages rounded to two decimals. The total row is
//! the sum of the *rounded* weights at one decimal; rounding error is never
//! pushed back into the rows.

use nalgebra::DMatrix;
use prettytable::format::{self, Alignment};
use prettytable::{Cell, Row, Table};

use crate::allocation::Allocation;

/// Label of the synthetic summary row.
pub const TOTAL_LABEL: &str = "Total";

fn round_to(x: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (x * scale).round() / scale
}

/// One `(asset, weight)` line of the weights table.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightRow {
    pub asset: String,
    /// Weight in percent, rounded to 2 decimals.
    pub percent: f64,
}

impl WeightRow {
    /// `"12.34 %"`.
    pub fn display(&self) -> String {
        format!("{:.2} %", self.percent)
    }
}

/// Weights table with a trailing total.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightsReport {
    pub rows: Vec<WeightRow>,
    /// Sum of the rounded percentages, rounded to 1 decimal.
    pub total_percent: f64,
}

impl WeightsReport {
    pub fn from_allocation(allocation: &Allocation) -> Self {
        let rows: Vec<WeightRow> = allocation
            .iter()
            .map(|(asset, w)| WeightRow {
                asset: asset.to_string(),
                percent: round_to(w * 100.0, 2),
            })
            .collect();
        let total_percent = round_to(rows.iter().map(|r| r.percent).sum(), 1);

        WeightsReport {
            rows,
            total_percent,
        }
    }

    /// `"100.0 %"`.
    pub fn total_display(&self) -> String {
        format!("{:.1} %", self.total_percent)
    }

    /// `(label, weight)` string pairs including the total row.
    pub fn lines(&self) -> Vec<(String, String)> {
        self.rows
            .iter()
            .map(|r| (r.asset.clone(), r.display()))
            .chain(std::iter::once((TOTAL_LABEL.to_string(), self.total_display())))
            .collect()
    }

    pub fn to_table(&self) -> Table {
        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_NO_LINESEP_WITH_TITLE);
        table.set_titles(Row::new(vec![Cell::new("Stock"), Cell::new("Weight")]));
        for (label, weight) in self.lines() {
            table.add_row(Row::new(vec![
                Cell::new(&label),
                Cell::new_align(&weight, Alignment::RIGHT),
            ]));
        }
        table
    }
}

/// Achieved expected return, 4 decimals.
pub fn format_return(expected_return: f64) -> String {
    format!("{:.4}", expected_return)
}

/// Achieved variance, 6 decimals.
pub fn format_risk(variance: f64) -> String {
    format!("{:.6}", variance)
}

/// Annotated correlation matrix, the text stand-in for a heatmap.
pub fn correlation_table(assets: &[String], corr: &DMatrix<f64>) -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_NO_LINESEP_WITH_TITLE);

    let mut titles = vec![Cell::new("")];
    titles.extend(assets.iter().map(|a| Cell::new(a)));
    table.set_titles(Row::new(titles));

    for (i, asset) in assets.iter().enumerate() {
        let mut cells = vec![Cell::new(asset)];
        cells.extend(
            (0..assets.len()).map(|j| Cell::new_align(&format!("{:.2}", corr[(i, j)]), Alignment::RIGHT)),
        );
        table.add_row(Row::new(cells));
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DVector;

    fn thirds() -> Allocation {
        Allocation::new(
            vec!["AAPL".into(), "MSFT".into(), "GOOGL".into()],
            DVector::from_vec(vec![1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0]),
            0.0123456,
            0.00123456789,
        )
    }

    #[test]
    fn test_rounding_is_not_redistributed() {
        let report = WeightsReport::from_allocation(&thirds());
        assert!(report.rows.iter().all(|r| r.percent == 33.33));
        // 99.99 rounds to 100.0 at one decimal.
        assert_eq!(report.total_percent, 100.0);
        assert_eq!(report.rows[0].display(), "33.33 %");
    }

    #[test]
    fn test_total_sums_rounded_rows() {
        let alloc = Allocation::new(
            (0..6).map(|i| format!("T{}", i)).collect(),
            DVector::from_element(6, 1.0 / 6.0),
            0.0,
            0.0,
        );
        let report = WeightsReport::from_allocation(&alloc);
        // 16.67 * 6 = 100.02; the rows keep their rounding error.
        assert!(report.rows.iter().all(|r| r.percent == 16.67));
        assert!(report.rows.iter().map(|r| r.percent).sum::<f64>() > 100.0);
        assert_eq!(report.total_display(), "100.0 %");

        let alloc = Allocation::new(
            (0..7).map(|i| format!("T{}", i)).collect(),
            DVector::from_element(7, 1.0 / 7.0),
            0.0,
            0.0,
        );
        // 14.29 * 7 = 100.03
        let report = WeightsReport::from_allocation(&alloc);
        assert_eq!(report.total_display(), "100.0 %");
    }

    #[test]
    fn test_lines_end_with_total() {
        let lines = WeightsReport::from_allocation(&thirds()).lines();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[3], ("Total".to_string(), "100.0 %".to_string()));
    }

    #[test]
    fn test_scalar_formats() {
        assert_eq!(format_return(0.0123456), "0.0123");
        assert_eq!(format_risk(0.00123456789), "0.001235");
    }

    #[test]
    fn test_tables_render() {
        let weights = WeightsReport::from_allocation(&thirds()).to_table().to_string();
        assert!(weights.contains("Stock"));
        assert!(weights.contains("33.33 %"));
        assert!(weights.contains("Total"));

        let assets = vec!["A".to_string(), "B".to_string()];
        let corr = DMatrix::from_row_slice(2, 2, &[1.0, -0.25, -0.25, 1.0]);
        let rendered = correlation_table(&assets, &corr).to_string();
        assert!(rendered.contains("-0.25"));
        assert!(rendered.contains("1.00"));
    }
}
