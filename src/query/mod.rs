//! Keyword-driven question answering
//!
//! Classifies free-text queries by literal substring containment
//! against an ordered intent table; the first matching intent wins.
//! Every handler resolves its own columns and answers with a fixed
//! sentence. This module never propagates an error — internal failures
//! render as an error string, so one bad query cannot take down the
//! session.

use crate::error::Result;
use crate::schema::{self, Field};
use polars::prelude::*;
use std::collections::BTreeMap;
use std::collections::HashSet;
use tracing::debug;

/// An intent: matched phrases and the handler computing the answer
struct Intent {
    name: &'static str,
    phrases: &'static [&'static str],
    handler: fn(&DataFrame) -> Result<String>,
}

/// Intent table in priority order; the first match wins.
const INTENTS: &[Intent] = &[
    Intent {
        name: "average_price",
        phrases: &["average price", "mean price"],
        handler: answer_average_price,
    },
    Intent {
        name: "highest_sales",
        phrases: &["highest sales", "top sales"],
        handler: answer_highest_sales,
    },
    Intent {
        name: "sales_forecast",
        phrases: &["forecast", "future sales"],
        handler: answer_sales_forecast,
    },
    Intent {
        name: "brands",
        phrases: &["brand"],
        handler: answer_brands,
    },
    Intent {
        name: "models",
        phrases: &["model"],
        handler: answer_models,
    },
];

const HELP_MESSAGE: &str = "I can help you with questions about average prices, highest sales, \
     sales forecasts, brands, and models. Please try rephrasing your question.";

/// Answer a free-text query against the dataset.
///
/// Always returns a sentence; errors inside handlers degrade to an
/// error string instead of propagating.
pub fn answer(df: &DataFrame, query: &str) -> String {
    if df.height() == 0 {
        return "No data available to answer your question.".to_string();
    }

    let query_lower = query.to_lowercase();

    for intent in INTENTS {
        if intent.phrases.iter().any(|p| query_lower.contains(p)) {
            debug!(intent = intent.name, "query matched");
            return match (intent.handler)(df) {
                Ok(text) => text,
                Err(e) => format!("Error processing your question: {e}"),
            };
        }
    }

    HELP_MESSAGE.to_string()
}

fn answer_average_price(df: &DataFrame) -> Result<String> {
    let Some(price_col) = schema::resolve(df, Field::Price) else {
        return Ok("Price data is not available in the dataset.".to_string());
    };

    let prices = numeric_column(df, &price_col)?;
    let valid: Vec<f64> = prices.into_iter().flatten().filter(|p| *p > 0.0).collect();

    if valid.is_empty() {
        return Ok("No valid price data available.".to_string());
    }

    let mean = valid.iter().sum::<f64>() / valid.len() as f64;
    Ok(format!("The average EV price is {}", format_usd(mean)))
}

fn answer_highest_sales(df: &DataFrame) -> Result<String> {
    let model_col = schema::resolve(df, Field::Model);
    let sales_col = schema::resolve(df, Field::Sales);
    let brand_col = schema::resolve(df, Field::Brand);

    if let (Some(model_col), Some(sales_col)) = (&model_col, &sales_col) {
        if let Some((top, total)) = top_group(df, model_col, sales_col)? {
            return Ok(format!(
                "The model with highest sales is {} with {} units sold.",
                top,
                format_count(total)
            ));
        }
    }

    if let (Some(brand_col), Some(sales_col)) = (&brand_col, &sales_col) {
        if let Some((top, total)) = top_group(df, brand_col, sales_col)? {
            return Ok(format!(
                "The brand with highest sales is {} with {} units sold.",
                top,
                format_count(total)
            ));
        }
    }

    Ok("Sales data is not available in the dataset.".to_string())
}

fn answer_sales_forecast(df: &DataFrame) -> Result<String> {
    let (Some(year_col), Some(sales_col)) =
        (schema::resolve(df, Field::Year), schema::resolve(df, Field::Sales))
    else {
        return Ok("Year or sales data is not available in the dataset.".to_string());
    };

    let years = numeric_column(df, &year_col)?;
    let sales = numeric_column(df, &sales_col)?;

    let mut yearly: BTreeMap<i32, f64> = BTreeMap::new();
    for (year, amount) in years.iter().zip(sales.iter()) {
        if let (Some(year), Some(amount)) = (year, amount) {
            *yearly.entry(*year as i32).or_insert(0.0) += amount;
        }
    }

    let latest = yearly.into_iter().filter(|(_, s)| *s > 0.0).next_back();

    match latest {
        Some((year, total)) => Ok(format!(
            "Latest year ({year}) total sales: {} units",
            format_count(total)
        )),
        None => Ok("Insufficient sales data for forecasting.".to_string()),
    }
}

fn answer_brands(df: &DataFrame) -> Result<String> {
    let Some(brand_col) = schema::resolve(df, Field::Brand) else {
        return Ok("Brand information is not available in the dataset.".to_string());
    };

    let brands = distinct_strings(df, &brand_col)?;
    if brands.is_empty() {
        return Ok("No brand information found in the dataset.".to_string());
    }

    let shown = brands.iter().take(10).cloned().collect::<Vec<_>>().join(", ");
    let suffix = if brands.len() > 10 {
        format!(" and {} more.", brands.len() - 10)
    } else {
        ".".to_string()
    };

    Ok(format!("Available brands in the dataset: {shown}{suffix}"))
}

fn answer_models(df: &DataFrame) -> Result<String> {
    let Some(model_col) = schema::resolve(df, Field::Model) else {
        return Ok("Model information is not available in the dataset.".to_string());
    };

    let models = distinct_strings(df, &model_col)?;
    if models.is_empty() {
        return Ok("No model information found in the dataset.".to_string());
    }

    let sample = models.iter().take(5).cloned().collect::<Vec<_>>().join(", ");
    Ok(format!(
        "Total models in dataset: {}. Some examples: {sample}",
        models.len()
    ))
}

/// Sum `value_col` grouped by `key_col` and return the largest
/// positive group, if any.
fn top_group(df: &DataFrame, key_col: &str, value_col: &str) -> Result<Option<(String, f64)>> {
    let keys = string_column(df, key_col)?;
    let values = numeric_column(df, value_col)?;

    let mut sums: BTreeMap<String, f64> = BTreeMap::new();
    for (key, value) in keys.iter().zip(values.iter()) {
        if let (Some(key), Some(value)) = (key, value) {
            *sums.entry(key.clone()).or_insert(0.0) += value;
        }
    }

    Ok(sums
        .into_iter()
        .filter(|(_, total)| *total > 0.0)
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal)))
}

/// Distinct non-null values in first-appearance order
fn distinct_strings(df: &DataFrame, col: &str) -> Result<Vec<String>> {
    let values = string_column(df, col)?;
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for v in values.into_iter().flatten() {
        if seen.insert(v.clone()) {
            out.push(v);
        }
    }
    Ok(out)
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

/// "$1,234.57" — comma thousands separators, two decimals
fn format_usd(value: f64) -> String {
    format!("${}", thousands(value, 2))
}

/// "1,234" — comma thousands separators, no decimals
fn format_count(value: f64) -> String {
    thousands(value, 0)
}

fn thousands(value: f64, decimals: usize) -> String {
    let formatted = format!("{value:.decimals$}");
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (formatted.as_str(), None),
    };

    let (sign, digits) = match int_part.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", int_part),
    };

    let mut grouped = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    match frac_part {
        Some(f) => format!("{sign}{grouped}.{f}"),
        None => format!("{sign}{grouped}"),
    }
}
