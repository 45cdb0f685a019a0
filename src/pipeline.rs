//! End-to-end request: selection and prices in, report out.

use nalgebra::DMatrix;
use tracing::{debug, info};

use crate::allocation::Allocation;
use crate::config::Config;
use crate::data::{PriceTable, ReturnTable, DATE_LABEL_FORMAT, PERIOD_LABEL_FORMAT};
use crate::error::{PortfolioError, Result};
use crate::problem::MeanVarianceProblem;
use crate::report::WeightsReport;
use crate::selection::Selection;
use crate::solver::{Backend, ClarabelBackend};

/// Everything shown back to the user for one request.
#[derive(Debug, Clone)]
pub struct PortfolioReport {
    pub selection: Selection,
    /// Labels of the return periods used.
    pub periods: Vec<String>,
    pub allocation: Allocation,
    pub weights: WeightsReport,
    /// Correlation of the selected assets' returns, in selection order.
    pub correlation: DMatrix<f64>,
}

/// Run a request with a Clarabel backend built from `config.solver`.
pub fn run(prices: &PriceTable, selection: &Selection, config: &Config) -> Result<PortfolioReport> {
    run_with(prices, selection, config, &ClarabelBackend::new(config.solver.clone()))
}

/// Run a request against a specific backend.
pub fn run_with<B: Backend + ?Sized>(
    prices: &PriceTable,
    selection: &Selection,
    config: &Config,
    backend: &B,
) -> Result<PortfolioReport> {
    info!(
        tickers = ?selection.tickers(),
        start = %selection.start(),
        end = %selection.end(),
        reward_floor = config.reward_floor,
        "optimizing portfolio"
    );

    let returns = build_returns(prices, selection, config.monthly)?;
    debug!(periods = returns.n_periods(), assets = returns.n_assets(), "return table ready");

    let problem = MeanVarianceProblem::from_returns(&returns)?
        .reward_floor(config.reward_floor)
        .build()?;
    let allocation = problem.solve_with(backend)?;

    info!(
        expected_return = allocation.expected_return,
        variance = allocation.variance,
        iterations = allocation.iterations,
        "portfolio solved"
    );

    Ok(PortfolioReport {
        selection: selection.clone(),
        periods: returns.periods().to_vec(),
        weights: WeightsReport::from_allocation(&allocation),
        correlation: returns.correlation()?,
        allocation,
    })
}

/// Cut the selected window out of `prices` and turn it into returns.
///
/// Needs at least two complete return periods, since the covariance uses
/// the `n - 1` denominator.
pub fn build_returns(prices: &PriceTable, selection: &Selection, monthly: bool) -> Result<ReturnTable> {
    let mut window = prices
        .select(selection.tickers())?
        .window(selection.start(), selection.end());
    let label_format = if monthly {
        window = window.to_monthly();
        PERIOD_LABEL_FORMAT
    } else {
        // Several rows may fall in one month.
        DATE_LABEL_FORMAT
    };
    debug!(rows = window.len(), monthly, "price window");

    let returns = ReturnTable::from_prices_labelled(&window, label_format)?;
    if returns.n_periods() < 2 {
        return Err(PortfolioError::InsufficientData {
            required: 2,
            actual: returns.n_periods(),
        });
    }
    Ok(returns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::SelectionRules;
    use chrono::NaiveDate;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn daily_prices() -> PriceTable {
        let csv = "\
date,A,B
2024-01-02,100,50
2024-01-31,101,50.5
2024-02-15,99,51
2024-02-29,103,50.8
2024-03-28,104,51.5
2024-04-30,102,52.1
2024-05-31,106,52.0
";
        PriceTable::from_csv_reader(csv.as_bytes()).unwrap()
    }

    fn select(tickers: &[&str], start: NaiveDate, end: NaiveDate) -> Selection {
        Selection::new(tickers, start, end, &SelectionRules::default()).unwrap()
    }

    #[test]
    fn test_build_returns_monthly() {
        let sel = select(&["B", "A"], d(2024, 1, 1), d(2024, 6, 1));
        let returns = build_returns(&daily_prices(), &sel, true).unwrap();

        assert_eq!(returns.assets(), &["B".to_string(), "A".to_string()]);
        assert_eq!(returns.n_periods(), 4);
        assert_eq!(returns.periods()[0], "Feb-2024");
        // Jan close 101 -> Feb close 103.
        assert!((returns.values()[(0, 1)] - 2.0 / 101.0).abs() < 1e-12);
    }

    #[test]
    fn test_build_returns_respects_window() {
        let sel = select(&["A"], d(2024, 2, 1), d(2024, 4, 1));
        let returns = build_returns(&daily_prices(), &sel, false).unwrap();
        // Rows 02-15, 02-29, 03-28 -> two returns.
        assert_eq!(returns.n_periods(), 2);
        assert_eq!(returns.periods(), &["2024-02-29".to_string(), "2024-03-28".to_string()]);
    }

    #[test]
    fn test_short_window_is_insufficient() {
        let sel = select(&["A"], d(2024, 1, 1), d(2024, 3, 1));
        let err = build_returns(&daily_prices(), &sel, true).unwrap_err();
        assert!(matches!(err, PortfolioError::InsufficientData { required: 2, actual: 1 }));

        let sel = select(&["A"], d(2030, 1, 1), d(2031, 1, 1));
        let err = build_returns(&daily_prices(), &sel, true).unwrap_err();
        assert!(matches!(err, PortfolioError::InsufficientData { .. }));
    }

    #[test]
    fn test_unknown_ticker_is_rejected() {
        let sel = select(&["A", "ZZZ"], d(2024, 1, 1), d(2024, 6, 1));
        let err = run(&daily_prices(), &sel, &Config::default()).unwrap_err();
        assert!(matches!(err, PortfolioError::InvalidSelection(_)));
    }

    #[test]
    fn test_run_produces_report() {
        let config = Config {
            reward_floor: 0.0,
            ..Config::default()
        };
        let sel = select(&["A", "B"], d(2024, 1, 1), d(2024, 6, 1));
        let report = run(&daily_prices(), &sel, &config).unwrap();

        assert_eq!(report.periods.len(), 4);
        assert_eq!(report.weights.rows.len(), 2);
        assert!((report.allocation.total() - 1.0).abs() < 1e-4);
        assert!(report.allocation.weights().iter().all(|w| *w >= 0.0));
        assert_eq!(report.correlation[(0, 0)], 1.0);
    }
}
