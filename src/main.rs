//! minvar command line
//!
//! Reads a price table from CSV, optimizes the selected tickers and prints the
//! weights, achieved return/risk and the return correlation matrix.

use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use minvar::{
    config::Config,
    pipeline::{self, PortfolioReport},
    report::{correlation_table, format_return, format_risk},
    selection::{self, Selection, UNIVERSE},
    PriceTable,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Exit code when the return floor cannot be met.
const EXIT_INFEASIBLE: i32 = 2;

#[derive(Parser)]
#[command(name = "minvar", version)]
#[command(about = "Minimum-variance portfolio allocation under a return floor")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Optimize a portfolio from a CSV price table
    Optimize {
        /// CSV with a `date,<TICKER>,...` header
        #[arg(short, long)]
        prices: PathBuf,

        /// Comma-separated tickers (default: AAPL,MSFT,GOOGL)
        #[arg(short, long, value_delimiter = ',')]
        tickers: Vec<String>,

        /// First date included (YYYY-MM-DD)
        #[arg(long)]
        start: Option<NaiveDate>,

        /// First date excluded (YYYY-MM-DD)
        #[arg(long)]
        end: Option<NaiveDate>,

        /// Minimum expected periodic return, e.g. 0.01 for 1%
        #[arg(short, long)]
        reward_floor: Option<f64>,

        /// Use rows as given instead of resampling to months
        #[arg(long)]
        no_monthly: bool,
    },
    /// List the predefined tickers by sector
    Universe,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "minvar=debug" } else { "minvar=info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Commands::Optimize {
            prices,
            tickers,
            start,
            end,
            reward_floor,
            no_monthly,
        } => {
            if let Some(floor) = reward_floor {
                config.reward_floor = floor;
            }
            if no_monthly {
                config.monthly = false;
            }
            optimize(&config, prices, tickers, start, end)
        }
        Commands::Universe => {
            show_universe();
            Ok(())
        }
    }
}

fn optimize(
    config: &Config,
    prices_path: PathBuf,
    tickers: Vec<String>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> anyhow::Result<()> {
    let tickers = if tickers.is_empty() {
        selection::DEFAULT_TICKERS.iter().map(|t| t.to_string()).collect()
    } else {
        tickers
    };
    let selection = Selection::new(
        &tickers,
        start.unwrap_or_else(selection::default_start),
        end.unwrap_or_else(selection::default_end),
        &config.selection_rules(),
    )?;

    let prices = PriceTable::from_csv_path(&prices_path)
        .with_context(|| format!("Failed to read prices from {:?}", prices_path))?;
    tracing::info!(rows = prices.len(), assets = prices.assets().len(), "loaded price table");

    match pipeline::run(&prices, &selection, config) {
        Ok(report) => {
            print_report(&report);
            Ok(())
        }
        Err(e) if e.is_infeasible() => {
            eprintln!("{}", e);
            eprintln!("Lower --reward-floor or pick assets with higher mean returns.");
            std::process::exit(EXIT_INFEASIBLE);
        }
        Err(e) => Err(e).context("Optimization failed"),
    }
}

fn print_report(report: &PortfolioReport) {
    println!(
        "Optimized Portfolio Weights ({} periods, {} to {}):",
        report.periods.len(),
        report.periods.first().map(String::as_str).unwrap_or("-"),
        report.periods.last().map(String::as_str).unwrap_or("-"),
    );
    report.weights.to_table().printstd();

    println!();
    println!("Max Return Expected: {}", format_return(report.allocation.expected_return));
    println!("Risk Ceiling:        {}", format_risk(report.allocation.variance));

    println!();
    println!("Portfolio Return vs Risk (correlation):");
    correlation_table(report.selection.tickers(), &report.correlation).printstd();
}

fn show_universe() {
    for (sector, tickers) in UNIVERSE {
        println!("{:<18} {}", sector, tickers.join(", "));
    }
}
