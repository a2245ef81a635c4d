//! Missing value imputation

use crate::error::{EvisionError, Result};
use polars::prelude::*;
use std::collections::HashMap;

/// Strategy for imputing missing values
#[derive(Debug, Clone, PartialEq)]
pub enum ImputeStrategy {
    /// Replace with median (numeric only); 0 when the column is all-missing
    Median,
    /// Replace with the most frequent value; "Unknown" when no mode exists
    MostFrequent,
    /// Replace with a constant value
    Constant(f64),
    /// Replace with a constant string (categorical)
    ConstantString(String),
}

/// Imputer for handling missing values
///
/// Fit computes one fill value per column; transform fills nulls with
/// it and leaves present values untouched.
#[derive(Debug, Clone)]
pub struct Imputer {
    strategy: ImputeStrategy,
    fill_values: HashMap<String, ImputeValue>,
    is_fitted: bool,
}

#[derive(Debug, Clone)]
enum ImputeValue {
    Numeric(f64),
    String(String),
}

impl Imputer {
    /// Create a new imputer with the specified strategy
    pub fn new(strategy: ImputeStrategy) -> Self {
        Self {
            strategy,
            fill_values: HashMap::new(),
            is_fitted: false,
        }
    }

    /// Fit the imputer to the data
    pub fn fit(&mut self, df: &DataFrame, columns: &[&str]) -> Result<&mut Self> {
        for col_name in columns {
            let column = df.column(col_name).map_err(|_| EvisionError::MissingColumn {
                field: col_name.to_string(),
                aliases: vec![col_name.to_string()],
            })?;

            let fill_value = self.compute_fill_value(column.as_materialized_series())?;
            self.fill_values.insert(col_name.to_string(), fill_value);
        }

        self.is_fitted = true;
        Ok(self)
    }

    /// Transform the data by imputing missing values
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(EvisionError::ModelNotFitted);
        }

        let mut result = df.clone();

        for (col_name, fill_value) in &self.fill_values {
            if let Ok(col) = df.column(col_name) {
                let series = col.as_materialized_series();
                if series.null_count() == 0 {
                    continue;
                }
                let filled = Self::fill_series(series, fill_value)?;
                result = result
                    .with_column(filled)
                    .map_err(|e| EvisionError::Parse(e.to_string()))?
                    .clone();
            }
        }

        Ok(result)
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, df: &DataFrame, columns: &[&str]) -> Result<DataFrame> {
        self.fit(df, columns)?;
        self.transform(df)
    }

    /// Check if dtype is numeric
    pub fn is_numeric_dtype(dtype: &DataType) -> bool {
        matches!(
            dtype,
            DataType::Int8
                | DataType::Int16
                | DataType::Int32
                | DataType::Int64
                | DataType::UInt8
                | DataType::UInt16
                | DataType::UInt32
                | DataType::UInt64
                | DataType::Float32
                | DataType::Float64
        )
    }

    /// Compute mode for a string series. Ties break toward the
    /// lexicographically smallest value so imputation is deterministic.
    fn compute_mode_string(series: &Series) -> Option<String> {
        let mut counts: HashMap<String, usize> = HashMap::new();

        if let Ok(ca) = series.str() {
            for val in ca.into_iter().flatten() {
                *counts.entry(val.to_string()).or_insert(0) += 1;
            }
        }

        let mut entries: Vec<(String, usize)> = counts.into_iter().collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        entries.into_iter().next().map(|(v, _)| v)
    }

    fn compute_fill_value(&self, series: &Series) -> Result<ImputeValue> {
        match &self.strategy {
            ImputeStrategy::Median => {
                let median = series
                    .cast(&DataType::Float64)
                    .map_err(|e| EvisionError::Parse(e.to_string()))?
                    .f64()
                    .map_err(|e| EvisionError::Parse(e.to_string()))?
                    .median()
                    .unwrap_or(0.0);
                Ok(ImputeValue::Numeric(median))
            }
            ImputeStrategy::MostFrequent => {
                if Self::is_numeric_dtype(series.dtype()) {
                    let ca = series
                        .cast(&DataType::Float64)
                        .map_err(|e| EvisionError::Parse(e.to_string()))?;
                    let mut counts: HashMap<u64, (f64, usize)> = HashMap::new();
                    if let Ok(vals) = ca.f64() {
                        for val in vals.into_iter().flatten() {
                            let entry = counts.entry(val.to_bits()).or_insert((val, 0));
                            entry.1 += 1;
                        }
                    }
                    let mut entries: Vec<(f64, usize)> = counts.into_values().collect();
                    entries.sort_by(|a, b| {
                        b.1.cmp(&a.1).then_with(|| {
                            a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal)
                        })
                    });
                    let mode = entries.into_iter().next().map(|(v, _)| v).unwrap_or(0.0);
                    Ok(ImputeValue::Numeric(mode))
                } else {
                    let mode = Self::compute_mode_string(series)
                        .unwrap_or_else(|| "Unknown".to_string());
                    Ok(ImputeValue::String(mode))
                }
            }
            ImputeStrategy::Constant(val) => Ok(ImputeValue::Numeric(*val)),
            ImputeStrategy::ConstantString(val) => Ok(ImputeValue::String(val.clone())),
        }
    }

    fn fill_series(series: &Series, fill_value: &ImputeValue) -> Result<Series> {
        match fill_value {
            ImputeValue::Numeric(val) => {
                let cast = series
                    .cast(&DataType::Float64)
                    .map_err(|e| EvisionError::Parse(e.to_string()))?;
                let ca = cast.f64().map_err(|e| EvisionError::Parse(e.to_string()))?;

                let filled: Float64Chunked =
                    ca.into_iter().map(|opt| Some(opt.unwrap_or(*val))).collect();

                Ok(filled.with_name(series.name().clone()).into_series())
            }
            ImputeValue::String(val) => {
                let ca = series
                    .str()
                    .map_err(|e| EvisionError::Parse(e.to_string()))?;

                let filled: StringChunked = ca
                    .into_iter()
                    .map(|opt| Some(opt.unwrap_or(val.as_str()).to_string()))
                    .collect();

                Ok(filled.with_name(series.name().clone()).into_series())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median_imputation() {
        let df = DataFrame::new(vec![Column::new(
            "a".into(),
            &[Some(1.0), None, Some(3.0), Some(4.0)],
        )])
        .unwrap();

        let mut imputer = Imputer::new(ImputeStrategy::Median);
        let result = imputer.fit_transform(&df, &["a"]).unwrap();

        let col = result.column("a").unwrap().f64().unwrap();
        assert_eq!(col.null_count(), 0);
        // Median of [1, 3, 4] = 3
        assert!((col.get(1).unwrap() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_all_missing_fills_zero() {
        let df = DataFrame::new(vec![Column::new(
            "a".into(),
            &[None::<f64>, None, None],
        )])
        .unwrap();

        let mut imputer = Imputer::new(ImputeStrategy::Median);
        let result = imputer.fit_transform(&df, &["a"]).unwrap();

        let col = result.column("a").unwrap().f64().unwrap();
        assert!(col.into_iter().all(|v| v == Some(0.0)));
    }

    #[test]
    fn test_mode_imputation_string() {
        let df = DataFrame::new(vec![Column::new(
            "brand".into(),
            &[Some("Tesla"), Some("Tesla"), None, Some("BYD")],
        )])
        .unwrap();

        let mut imputer = Imputer::new(ImputeStrategy::MostFrequent);
        let result = imputer.fit_transform(&df, &["brand"]).unwrap();

        let col = result.column("brand").unwrap().str().unwrap();
        assert_eq!(col.get(2), Some("Tesla"));
    }

    #[test]
    fn test_unfitted_transform() {
        let df = DataFrame::new(vec![Column::new("a".into(), &[1.0, 2.0])]).unwrap();
        let imputer = Imputer::new(ImputeStrategy::Median);
        assert!(matches!(
            imputer.transform(&df),
            Err(EvisionError::ModelNotFitted)
        ));
    }

    #[test]
    fn test_integer_column_median() {
        let df = DataFrame::new(vec![Column::new(
            "n".into(),
            &[Some(10i64), None, Some(20), Some(30)],
        )])
        .unwrap();

        let mut imputer = Imputer::new(ImputeStrategy::Median);
        let result = imputer.fit_transform(&df, &["n"]).unwrap();

        let col = result.column("n").unwrap().f64().unwrap();
        assert!((col.get(1).unwrap() - 20.0).abs() < 1e-12);
    }
}
