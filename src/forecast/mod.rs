//! Sales forecasting
//!
//! Aggregates historical sales into a time series and extrapolates a
//! linear trend. When a parseable "YYYY-MM" date column is available
//! the trend is fitted on monthly aggregates and collapsed to two
//! yearly estimates; otherwise the fit runs directly on yearly totals.
//! With a single observed year no regression is possible and a flat
//! 10% growth assumption stands in — an explicit placeholder, not a
//! learned rate.

use crate::error::{EvisionError, Result};
use crate::schema;
use crate::training::LinearRegression;
use chrono::{Datelike, NaiveDate};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Growth assumption applied where regression is underdetermined
const GROWTH_RATE: f64 = 1.10;

/// Months required before the monthly path is trusted
const MIN_MONTHS: usize = 3;

/// Months projected ahead by the monthly path
const MONTHLY_HORIZON: usize = 12;

/// Which aggregation fitted the trend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForecastPath {
    Monthly,
    Yearly,
}

/// A fitted forecast
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastResult {
    /// Observed yearly aggregation (year, total sales), sorted by year
    pub observed: Vec<(i32, f64)>,
    /// Future period labels
    pub future_years: Vec<i32>,
    /// Forecast values, clamped at zero
    pub forecast: Vec<f64>,
    /// Aggregation path that produced the fit
    pub path: ForecastPath,
}

/// Forecast future sales from a normalized dataset.
///
/// Fails with `MissingColumn` when no year or sales column resolves,
/// and with `InsufficientData` when no valid yearly aggregate remains.
pub fn forecast(df: &DataFrame) -> Result<ForecastResult> {
    let (year_col, sales_col, date_col) = resolve_columns(df)?;

    if let Some(date_col) = &date_col {
        if let Some(result) = monthly_forecast(df, date_col, &sales_col)? {
            return Ok(result);
        }
        debug!("monthly path unavailable, falling back to yearly aggregation");
    }

    yearly_forecast(df, &year_col, &sales_col)
}

/// Substring search for year/sales columns, exact match for the date
/// column. Looser than alias resolution so raw layouts ("Units_Sold",
/// "Model_Year") resolve too.
fn resolve_columns(df: &DataFrame) -> Result<(String, String, Option<String>)> {
    let year_col = schema::resolve_containing(df, &["year"])
        .or_else(|| schema::resolve_named(df, &["y"]))
        .ok_or_else(|| EvisionError::MissingColumn {
            field: "year".to_string(),
            aliases: vec!["year".to_string(), "y".to_string()],
        })?;

    let sales_col = schema::resolve_containing(df, &["sales", "quantity", "units"]).ok_or_else(
        || EvisionError::MissingColumn {
            field: "sales".to_string(),
            aliases: vec![
                "sales".to_string(),
                "quantity".to_string(),
                "units".to_string(),
            ],
        },
    )?;

    let date_col = schema::resolve_named(df, &["date"]);

    Ok((year_col, sales_col, date_col))
}

/// Monthly path: OLS of sales against a zero-based month index,
/// projected twelve months ahead and collapsed to two yearly points.
/// Returns `None` when fewer than three distinct months parse.
fn monthly_forecast(
    df: &DataFrame,
    date_col: &str,
    sales_col: &str,
) -> Result<Option<ForecastResult>> {
    let dates = string_column(df, date_col)?;
    let sales = numeric_column(df, sales_col)?;

    // Aggregate by calendar month, dropping unparseable rows
    let mut monthly: BTreeMap<(i32, u32), f64> = BTreeMap::new();
    let mut yearly: BTreeMap<i32, f64> = BTreeMap::new();

    for (date, amount) in dates.iter().zip(sales.iter()) {
        let Some(parsed) = date.as_deref().and_then(parse_year_month) else {
            continue;
        };
        let amount = amount.unwrap_or(0.0);
        *monthly.entry(parsed).or_insert(0.0) += amount;
        *yearly.entry(parsed.0).or_insert(0.0) += amount;
    }

    if monthly.len() < MIN_MONTHS {
        return Ok(None);
    }

    let y: Vec<f64> = monthly.values().copied().collect();
    let n = y.len();

    let x = Array2::from_shape_vec((n, 1), (0..n).map(|i| i as f64).collect())
        .map_err(|e| EvisionError::Computation(e.to_string()))?;
    let y = Array1::from_vec(y);

    let mut model = LinearRegression::new();
    model.fit(&x, &y)?;

    // Predict the next twelve month indices, clamped at zero
    let future_x = Array2::from_shape_vec(
        (MONTHLY_HORIZON, 1),
        (0..MONTHLY_HORIZON).map(|i| (n + i) as f64).collect(),
    )
    .map_err(|e| EvisionError::Computation(e.to_string()))?;

    let monthly_preds = model.predict(&future_x)?.mapv(|v| v.max(0.0));

    // Next year as mean of the twelve forecast months times twelve;
    // year after as flat 10% growth on top
    let next_year_estimate = monthly_preds.mean().unwrap_or(0.0) * 12.0;
    let year_after_estimate = next_year_estimate * GROWTH_RATE;

    let max_year = *yearly.keys().max().expect("nonempty by construction");

    info!(
        months = n,
        next_year = max_year + 1,
        "monthly trend fitted"
    );

    Ok(Some(ForecastResult {
        observed: yearly.into_iter().collect(),
        future_years: vec![max_year + 1, max_year + 2],
        forecast: vec![next_year_estimate, year_after_estimate],
        path: ForecastPath::Monthly,
    }))
}

/// Yearly path: OLS of sales against year number, or compounded 10%
/// growth when only a single year of data exists.
fn yearly_forecast(df: &DataFrame, year_col: &str, sales_col: &str) -> Result<ForecastResult> {
    let years = numeric_column(df, year_col)?;
    let sales = numeric_column(df, sales_col)?;

    let mut yearly: BTreeMap<i32, f64> = BTreeMap::new();
    for (year, amount) in years.iter().zip(sales.iter()) {
        let (Some(year), Some(amount)) = (year, amount) else {
            continue;
        };
        *yearly.entry(*year as i32).or_insert(0.0) += amount;
    }

    // Drop non-positive aggregates
    let observed: Vec<(i32, f64)> = yearly.into_iter().filter(|(_, s)| *s > 0.0).collect();

    if observed.is_empty() {
        return Err(EvisionError::InsufficientData(
            "no valid yearly sales aggregates to forecast from".to_string(),
        ));
    }

    let max_year = observed.last().expect("nonempty").0;
    let future_years = vec![max_year + 1, max_year + 2];

    if observed.len() == 1 {
        // One data point: regression is ill-posed, assume flat growth
        let current = observed[0].1;
        let next = current * GROWTH_RATE;
        let after = next * GROWTH_RATE;

        info!(year = observed[0].0, "single-year series, applying growth assumption");

        return Ok(ForecastResult {
            observed,
            future_years,
            forecast: vec![next, after],
            path: ForecastPath::Yearly,
        });
    }

    let n = observed.len();
    let x = Array2::from_shape_vec(
        (n, 1),
        observed.iter().map(|(y, _)| *y as f64).collect(),
    )
    .map_err(|e| EvisionError::Computation(e.to_string()))?;
    let y = Array1::from_vec(observed.iter().map(|(_, s)| *s).collect());

    let mut model = LinearRegression::new();
    model.fit(&x, &y)?;

    let future_x = Array2::from_shape_vec(
        (future_years.len(), 1),
        future_years.iter().map(|y| *y as f64).collect(),
    )
    .map_err(|e| EvisionError::Computation(e.to_string()))?;

    let forecast = model.predict(&future_x)?.mapv(|v| v.max(0.0));

    info!(years = n, "yearly trend fitted");

    Ok(ForecastResult {
        observed,
        future_years,
        forecast: forecast.to_vec(),
        path: ForecastPath::Yearly,
    })
}

/// Strict "YYYY-MM" parse
fn parse_year_month(s: &str) -> Option<(i32, u32)> {
    NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d")
        .map(|d| (d.year(), d.month()))
        .ok()
}

fn numeric_column(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let series = df
        .column(name)?
        .as_materialized_series()
        .cast(&DataType::Float64)?;
    Ok(series.f64()?.into_iter().collect())
}

fn string_column(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let series = df.column(name)?.as_materialized_series().clone();
    let cast = series.cast(&DataType::String)?;
    let ca = cast.str()?;
    Ok(ca.into_iter().map(|v| v.map(|s| s.to_string())).collect())
}
