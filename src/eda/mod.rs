//! Exploratory analysis summaries
//!
//! Computes the data behind the dashboard's plots — the plotting
//! itself lives with the consumer. Each summary resolves its own
//! columns and fails with a descriptive error when required columns or
//! sufficient variance are absent.

use crate::error::{EvisionError, Result};
use crate::schema;
use ndarray::{Array2, ArrayView1};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Number of bins in the price histogram
const HISTOGRAM_BINS: usize = 30;

/// Brands shown in the sales-by-brand summary
const MAX_BRANDS: usize = 20;

/// Pairwise Pearson correlations over numeric columns
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelationSummary {
    /// Columns included, in matrix order
    pub columns: Vec<String>,
    /// Correlation matrix, row-major square
    pub matrix: Vec<Vec<f64>>,
}

/// Price histogram after outlier trimming
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceHistogram {
    /// Left edge of each bin
    pub bin_edges: Vec<f64>,
    /// Count per bin
    pub counts: Vec<usize>,
    /// Prices that survived trimming
    pub n_prices: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

/// Correlation heatmap data: numeric columns with nonzero variance.
///
/// Fails with `InsufficientData` when fewer than two such columns
/// exist.
pub fn correlation_matrix(df: &DataFrame) -> Result<CorrelationSummary> {
    let mut columns: Vec<String> = Vec::new();
    let mut data: Vec<Vec<f64>> = Vec::new();

    for name in df.get_column_names() {
        let series = df.column(name.as_str())?.as_materialized_series();
        if !crate::data::Imputer::is_numeric_dtype(series.dtype()) {
            continue;
        }

        let cast = series.cast(&DataType::Float64)?;
        let values: Vec<f64> = cast.f64()?.into_iter().flatten().collect();
        if values.len() < 2 {
            continue;
        }

        // Constant columns carry no correlation signal
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        let variance =
            values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
        if variance <= 0.0 {
            continue;
        }

        columns.push(name.to_string());
        data.push(values);
    }

    if columns.len() < 2 {
        return Err(EvisionError::InsufficientData(
            "need at least two numeric columns with variance for correlation analysis"
                .to_string(),
        ));
    }

    // Columns may differ in null counts; correlate over the shared prefix
    let n_rows = data.iter().map(|c| c.len()).min().unwrap_or(0);
    let n_cols = columns.len();

    let mut flat = Vec::with_capacity(n_rows * n_cols);
    for i in 0..n_rows {
        for col in &data {
            flat.push(col[i]);
        }
    }
    let matrix_data = Array2::from_shape_vec((n_rows, n_cols), flat)
        .map_err(|e| EvisionError::Computation(e.to_string()))?;

    let mut matrix = vec![vec![0.0; n_cols]; n_cols];
    for i in 0..n_cols {
        for j in 0..n_cols {
            matrix[i][j] = if i == j {
                1.0
            } else {
                pearson_correlation(matrix_data.column(i), matrix_data.column(j))
            };
        }
    }

    Ok(CorrelationSummary { columns, matrix })
}

/// Total sales per brand, descending, capped at the top 20.
pub fn sales_by_brand(df: &DataFrame) -> Result<Vec<(String, f64)>> {
    let brand_col = schema::resolve_containing(df, &["brand", "manufacturer"]).ok_or_else(
        || EvisionError::MissingColumn {
            field: "brand".to_string(),
            aliases: vec!["brand".to_string(), "manufacturer".to_string()],
        },
    )?;
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

    let brands = df
        .column(&brand_col)?
        .as_materialized_series()
        .cast(&DataType::String)?;
    let sales = df
        .column(&sales_col)?
        .as_materialized_series()
        .cast(&DataType::Float64)?;

    let mut sums: BTreeMap<String, f64> = BTreeMap::new();
    for (brand, amount) in brands.str()?.into_iter().zip(sales.f64()?.into_iter()) {
        if let (Some(brand), Some(amount)) = (brand, amount) {
            *sums.entry(brand.to_string()).or_insert(0.0) += amount;
        }
    }

    let mut totals: Vec<(String, f64)> = sums.into_iter().collect();
    totals.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    totals.truncate(MAX_BRANDS);

    Ok(totals)
}

/// Distribution of positive prices with extreme outliers (beyond three
/// standard deviations) removed.
pub fn price_distribution(df: &DataFrame) -> Result<PriceHistogram> {
    let price_col = schema::resolve_containing(df, &["price"]).ok_or_else(|| {
        EvisionError::MissingColumn {
            field: "price".to_string(),
            aliases: vec!["price".to_string()],
        }
    })?;

    let series = df
        .column(&price_col)?
        .as_materialized_series()
        .cast(&DataType::Float64)?;
    let mut prices: Vec<f64> = series
        .f64()?
        .into_iter()
        .flatten()
        .filter(|p| *p > 0.0)
        .collect();

    if prices.is_empty() {
        return Err(EvisionError::InsufficientData(
            "no valid price data found".to_string(),
        ));
    }

    let mean = prices.iter().sum::<f64>() / prices.len() as f64;
    let std = (prices.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / prices.len() as f64)
        .sqrt();

    if std > 0.0 {
        prices.retain(|p| (*p - mean).abs() <= 3.0 * std);
    }

    if prices.is_empty() {
        return Err(EvisionError::InsufficientData(
            "no valid price data after outlier removal".to_string(),
        ));
    }

    let min = prices.iter().copied().fold(f64::INFINITY, f64::min);
    let max = prices.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let width = ((max - min) / HISTOGRAM_BINS as f64).max(f64::EPSILON);

    let mut counts = vec![0usize; HISTOGRAM_BINS];
    for p in &prices {
        let bin = (((p - min) / width) as usize).min(HISTOGRAM_BINS - 1);
        counts[bin] += 1;
    }

    let bin_edges = (0..HISTOGRAM_BINS)
        .map(|i| min + i as f64 * width)
        .collect();
    let trimmed_mean = prices.iter().sum::<f64>() / prices.len() as f64;

    Ok(PriceHistogram {
        bin_edges,
        counts,
        n_prices: prices.len(),
        mean: trimmed_mean,
        min,
        max,
    })
}

fn pearson_correlation(x: ArrayView1<f64>, y: ArrayView1<f64>) -> f64 {
    let n = x.len() as f64;
    if n < 2.0 {
        return 0.0;
    }

    let x_mean = x.mean().unwrap_or(0.0);
    let y_mean = y.mean().unwrap_or(0.0);

    let mut sum_xy = 0.0;
    let mut sum_x2 = 0.0;
    let mut sum_y2 = 0.0;

    for (&xi, &yi) in x.iter().zip(y.iter()) {
        let dx = xi - x_mean;
        let dy = yi - y_mean;
        sum_xy += dx * dy;
        sum_x2 += dx * dx;
        sum_y2 += dy * dy;
    }

    let denom = (sum_x2 * sum_y2).sqrt();
    if denom == 0.0 {
        0.0
    } else {
        sum_xy / denom
    }
}
