//! Schema normalization
//!
//! Rewrites a raw frame into the canonical schema. The monthly
//! revenue/units layout carries no explicit year, price, range, or
//! acceleration columns, so those are derived:
//! - year from the "YYYY-MM" date string
//! - price as revenue / units sold
//! - range_km and acceleration as seeded estimates from battery capacity
//!
//! Afterwards every remaining numeric column with missing values is
//! imputed with its median and every text column with its mode, so the
//! output frame has no nulls in any recognized column.

use crate::data::imputer::{ImputeStrategy, Imputer};
use crate::error::Result;
use chrono::{Datelike, NaiveDate};
use polars::prelude::*;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

/// Source columns whose joint presence marks the monthly revenue/units layout
const MONTHLY_SOURCE_COLUMNS: [&str; 4] =
    ["Date", "Battery_Capacity_kWh", "Units_Sold", "Revenue"];

/// Seed for the derived-column perturbation. Contractual: identical
/// input must reproduce identical synthetic range and acceleration
/// values across runs.
const DERIVATION_SEED: u64 = 42;

/// Kilometres of range per kWh of battery, before perturbation
const KM_PER_KWH: f64 = 6.0;

/// Normalize a raw frame into the canonical schema.
///
/// Pure from the caller's perspective: the input frame is never
/// mutated, a new frame is returned.
pub fn normalize(df: &DataFrame) -> Result<DataFrame> {
    let mut out = df.clone();

    if is_monthly_variant(&out) {
        info!("monthly revenue/units layout detected, deriving canonical columns");
        derive_monthly_columns(&mut out)?;
    }

    impute_missing(&mut out)?;

    Ok(out)
}

/// True when all four monthly-layout source columns are present.
pub fn is_monthly_variant(df: &DataFrame) -> bool {
    MONTHLY_SOURCE_COLUMNS
        .iter()
        .all(|c| df.column(c).is_ok())
}

fn derive_monthly_columns(df: &mut DataFrame) -> Result<()> {
    let height = df.height();

    // year from the "YYYY-MM" date string
    if df.column("year").is_err() {
        let dates = df.column("Date")?.as_materialized_series().clone();
        let ca = dates.str()?;
        let years: Vec<Option<i32>> = ca.into_iter().map(|v| v.and_then(parse_year)).collect();
        df.with_column(Series::new("year".into(), years))?;
    }

    // battery_kwh mirrors the source capacity column
    if df.column("battery_kwh").is_err() {
        let battery = df
            .column("Battery_Capacity_kWh")?
            .as_materialized_series()
            .cast(&DataType::Float64)?;
        df.with_column(battery.with_name("battery_kwh".into()))?;
    }

    if df.column("brand").is_err() {
        if let Ok(col) = df.column("Brand") {
            let brand = col.as_materialized_series().clone();
            df.with_column(brand.with_name("brand".into()))?;
        }
    }

    if df.column("model").is_err() {
        if let Ok(col) = df.column("Model") {
            let model = col.as_materialized_series().clone();
            df.with_column(model.with_name("model".into()))?;
        }
    }

    if df.column("sales").is_err() {
        let sales = df.column("Units_Sold")?.as_materialized_series().clone();
        df.with_column(sales.with_name("sales".into()))?;
    }

    // price = revenue / units sold; division by zero becomes missing
    // (imputed later), never infinity
    if df.column("price").is_err() {
        let revenue = column_f64(df, "Revenue")?;
        let units = column_f64(df, "Units_Sold")?;

        let prices: Vec<Option<f64>> = revenue
            .iter()
            .zip(units.iter())
            .map(|(r, u)| match (r, u) {
                (Some(r), Some(u)) => {
                    let p = r / u;
                    if p.is_finite() {
                        Some(p)
                    } else {
                        None
                    }
                }
                _ => None,
            })
            .collect();
        df.with_column(Series::new("price".into(), prices))?;
    }

    // range_km estimated from battery capacity with seeded variation
    if df.column("range_km").is_err() {
        let battery = column_f64(df, "battery_kwh")?;
        let mut rng = ChaCha8Rng::seed_from_u64(DERIVATION_SEED);

        let ranges: Vec<Option<i64>> = battery
            .iter()
            .map(|b| {
                let factor = rng.gen_range(0.8..1.2);
                b.map(|kwh| (kwh * KM_PER_KWH * factor) as i64)
            })
            .collect();
        df.with_column(Series::new("range_km".into(), ranges))?;
        debug!(rows = height, "derived range_km from battery capacity");
    }

    // acceleration estimated from battery capacity: larger packs sit in
    // quicker cars, clamped to the 3-12s band, seeded variation
    if df.column("acceleration").is_err() {
        let battery = column_f64(df, "battery_kwh")?;
        let mut rng = ChaCha8Rng::seed_from_u64(DERIVATION_SEED);

        let accels: Vec<Option<f64>> = battery
            .iter()
            .map(|b| {
                let factor = rng.gen_range(0.9..1.1);
                b.map(|kwh| {
                    let base = (12.0 - (kwh - 40.0) / 10.0).clamp(3.0, 12.0);
                    ((base * factor) * 10.0).round() / 10.0
                })
            })
            .collect();
        df.with_column(Series::new("acceleration".into(), accels))?;
        debug!(rows = height, "derived acceleration from battery capacity");
    }

    Ok(())
}

/// Parse a year from a "YYYY-MM" string; on failure take the first
/// four characters as the year.
fn parse_year(s: &str) -> Option<i32> {
    NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d")
        .map(|d| d.year())
        .ok()
        .or_else(|| s.get(..4).and_then(|p| p.trim().parse::<i32>().ok()))
}

fn column_f64(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let series = df
        .column(name)?
        .as_materialized_series()
        .cast(&DataType::Float64)?;
    Ok(series.f64()?.into_iter().collect())
}

fn impute_missing(df: &mut DataFrame) -> Result<()> {
    let col_names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();

    let mut numeric_with_nulls: Vec<String> = Vec::new();
    let mut text_with_nulls: Vec<String> = Vec::new();

    for name in &col_names {
        let series = df.column(name)?.as_materialized_series();
        if series.null_count() == 0 {
            continue;
        }
        if Imputer::is_numeric_dtype(series.dtype()) {
            numeric_with_nulls.push(name.clone());
        } else if series.dtype() == &DataType::String {
            text_with_nulls.push(name.clone());
        }
    }

    if !numeric_with_nulls.is_empty() {
        let cols: Vec<&str> = numeric_with_nulls.iter().map(|s| s.as_str()).collect();
        let mut imputer = Imputer::new(ImputeStrategy::Median);
        *df = imputer.fit_transform(df, &cols)?;
    }

    if !text_with_nulls.is_empty() {
        let cols: Vec<&str> = text_with_nulls.iter().map(|s| s.as_str()).collect();
        let mut imputer = Imputer::new(ImputeStrategy::MostFrequent);
        *df = imputer.fit_transform(df, &cols)?;
    }

    Ok(())
}
