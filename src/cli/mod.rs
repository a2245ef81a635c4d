//! EVision CLI
//!
//! The dashboard shell: each subcommand loads and normalizes the
//! dataset, dispatches to exactly one analytics module, and renders
//! the result. Errors become a user-visible message for that
//! subcommand only.

use clap::{Parser, Subcommand};
use colored::*;
use polars::prelude::*;
use std::path::PathBuf;

use crate::cache::ModelCache;
use crate::data::{normalize, DataLoader};
use crate::price::VehicleSpec;
use crate::{eda, forecast, query};

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString {
    s.truecolor(100, 100, 100)
}
fn accent(s: &str) -> ColoredString {
    s.truecolor(120, 170, 255)
}
fn ok(s: &str) -> ColoredString {
    s.truecolor(100, 210, 120)
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn kv(key: &str, val: &str) {
    println!("  {} {}", dim(key), val.white());
}

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn warn_msg(msg: &str) {
    println!("  {} {}", "!".yellow(), msg);
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "evision")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Electric vehicle sales analytics")]
#[command(long_about = None)]
pub struct Cli {
    /// Dataset file (defaults to data/train.csv with the standard fallback)
    #[arg(short, long, global = true)]
    pub data: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show dataset shape and columns
    Info,

    /// Forecast sales for the next two years
    Forecast,

    /// Train the price model and predict a single vehicle's price
    Price {
        /// Battery capacity in kWh
        #[arg(long, default_value = "50")]
        battery: f64,

        /// Range in km
        #[arg(long, default_value = "300")]
        range: f64,

        /// Model year
        #[arg(long, default_value = "2023")]
        year: f64,

        /// 0-100 km/h acceleration in seconds
        #[arg(long, default_value = "7.5")]
        acceleration: f64,

        /// Vehicle brand
        #[arg(long, default_value = "Unknown")]
        brand: String,
    },

    /// Exploratory summaries: correlations, brand sales, price distribution
    Eda,

    /// Ask a free-text question about the dataset
    Ask {
        /// The question
        query: String,
    },
}

// ─── Data loading ──────────────────────────────────────────────────────────────

fn load_normalized(data: &Option<PathBuf>) -> anyhow::Result<DataFrame> {
    let loader = match data {
        Some(path) => DataLoader::new().with_primary(path.clone()),
        None => DataLoader::new(),
    };
    let raw = loader.load()?;
    let df = normalize(&raw)?;
    step_ok(&format!("data loaded: {} records", df.height()));
    Ok(df)
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_info(data: &Option<PathBuf>) -> anyhow::Result<()> {
    let df = load_normalized(data)?;

    section("Dataset");
    kv("rows:", &df.height().to_string());
    kv("columns:", &df.width().to_string());

    for name in df.get_column_names().iter().take(15) {
        let dtype = df
            .column(name.as_str())
            .map(|c| c.dtype().to_string())
            .unwrap_or_default();
        println!("  {} {} {}", dim("-"), name, dim(&dtype));
    }
    if df.width() > 15 {
        println!("  {}", dim(&format!("... and {} more", df.width() - 15)));
    }

    Ok(())
}

pub fn cmd_forecast(data: &Option<PathBuf>) -> anyhow::Result<()> {
    let df = load_normalized(data)?;
    let result = forecast::forecast(&df)?;

    section("Yearly EV sales");
    for (year, sales) in &result.observed {
        kv(&format!("{year}:"), &format!("{sales:.0} units"));
    }

    section("Forecast");
    for (year, value) in result.future_years.iter().zip(result.forecast.iter()) {
        println!(
            "  {} {}",
            accent(&format!("{year}:")),
            format!("{value:.0} units").white()
        );
    }

    Ok(())
}

pub fn cmd_price(
    data: &Option<PathBuf>,
    battery: f64,
    range: f64,
    year: f64,
    acceleration: f64,
    brand: String,
) -> anyhow::Result<()> {
    let df = load_normalized(data)?;

    let mut cache = ModelCache::new();
    let model = cache.get_or_train(&df)?;
    step_ok(&format!("model trained, RMSE ${:.2}", model.rmse()));

    let spec = VehicleSpec {
        battery_kwh: battery,
        range_km: range,
        year,
        acceleration,
        brand,
    };
    let price = model.predict(&spec)?;

    section("Predicted EV price");
    println!("  {}", format!("${price:.2}").white().bold());

    Ok(())
}

pub fn cmd_eda(data: &Option<PathBuf>) -> anyhow::Result<()> {
    let df = load_normalized(data)?;

    // Each summary has its own error boundary: one failing section must
    // not block the others.
    section("Correlation (numeric columns)");
    match eda::correlation_matrix(&df) {
        Ok(summary) => {
            for (i, row_name) in summary.columns.iter().enumerate() {
                let cells: Vec<String> = summary.matrix[i]
                    .iter()
                    .map(|v| format!("{v:+.2}"))
                    .collect();
                kv(&format!("{row_name}:"), &cells.join("  "));
            }
        }
        Err(e) => warn_msg(&e.to_string()),
    }

    section("Sales by brand");
    match eda::sales_by_brand(&df) {
        Ok(totals) => {
            for (brand, sales) in totals {
                kv(&format!("{brand}:"), &format!("{sales:.0}"));
            }
        }
        Err(e) => warn_msg(&e.to_string()),
    }

    section("Price distribution");
    match eda::price_distribution(&df) {
        Ok(hist) => {
            kv("prices:", &hist.n_prices.to_string());
            kv("mean:", &format!("${:.2}", hist.mean));
            kv("min:", &format!("${:.2}", hist.min));
            kv("max:", &format!("${:.2}", hist.max));
            let peak = hist.counts.iter().copied().max().unwrap_or(1).max(1);
            for (edge, count) in hist.bin_edges.iter().zip(hist.counts.iter()) {
                let bar = "█".repeat(count * 40 / peak);
                println!("  {} {}", dim(&format!("{edge:>12.0}")), accent(&bar));
            }
        }
        Err(e) => warn_msg(&e.to_string()),
    }

    Ok(())
}

pub fn cmd_ask(data: &Option<PathBuf>, question: &str) -> anyhow::Result<()> {
    let df = load_normalized(data)?;

    section("Answer");
    println!("  {}", query::answer(&df, question).white());

    Ok(())
}
