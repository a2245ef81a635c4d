//! Price prediction
//!
//! Trains a random-forest regressor mapping vehicle attributes
//! (battery capacity, range, year, acceleration, brand) to price and
//! exposes single-record inference. The brand is one-hot encoded with
//! the first category dropped; inference inputs are aligned to the
//! training columns so unseen brands predict with all indicators zero.

use crate::error::{EvisionError, Result};
use crate::schema::{self, Field};
use crate::training::{RandomForest, RegressionMetrics};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Fixed seed for the train/evaluation shuffle and the forest
const TRAIN_SEED: u64 = 42;

/// Number of trees in the price forest
const N_ESTIMATORS: usize = 100;

/// Fraction of rows held out for evaluation
const EVAL_FRACTION: f64 = 0.2;

/// Minimum usable rows required for training
const MIN_TRAIN_ROWS: usize = 10;

/// The numeric feature fields, in training column order
const NUMERIC_FIELDS: [Field; 4] = [
    Field::BatteryKwh,
    Field::RangeKm,
    Field::Year,
    Field::Acceleration,
];

/// A single vehicle record for price inference
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleSpec {
    pub battery_kwh: f64,
    pub range_km: f64,
    pub year: f64,
    pub acceleration: f64,
    pub brand: String,
}

/// A fitted price model
///
/// Owns the fitted forest, the post-encoding feature column order used
/// to align inference inputs, and the held-out RMSE. Built once per
/// session and cached by the caller; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceModel {
    forest: RandomForest,
    feature_names: Vec<String>,
    rmse: f64,
}

impl PriceModel {
    /// Train a price model on a normalized dataset.
    ///
    /// Fails with `MissingColumn` when a required field has no
    /// resolvable alias, and with `InsufficientData` when fewer than
    /// ten usable rows remain after target cleaning.
    pub fn train(df: &DataFrame) -> Result<Self> {
        let battery_col = schema::require(df, Field::BatteryKwh)?;
        let range_col = schema::require(df, Field::RangeKm)?;
        let year_col = schema::require(df, Field::Year)?;
        let accel_col = schema::require(df, Field::Acceleration)?;
        let brand_col = schema::require(df, Field::Brand)?;
        let price_col = schema::require(df, Field::Price)?;

        let n_rows = df.height();

        // Numeric features, median-imputed (0 when entirely missing)
        let mut numeric: Vec<Vec<f64>> = Vec::with_capacity(NUMERIC_FIELDS.len());
        for col in [&battery_col, &range_col, &year_col, &accel_col] {
            numeric.push(impute_median(&numeric_column(df, col)?));
        }

        let brands = string_column(df, &brand_col)?;

        // One-hot encode brand: sorted unique categories, first dropped
        let mut categories: Vec<String> = brands.iter().flatten().cloned().collect();
        categories.sort();
        categories.dedup();
        let encoded_categories: Vec<String> = categories.into_iter().skip(1).collect();

        // Target: impute with median, then drop rows still missing or <= 0
        let price_raw = numeric_column(df, &price_col)?;
        let price = impute_median(&price_raw);

        let valid_rows: Vec<usize> = (0..n_rows)
            .filter(|&i| price[i].is_finite() && price[i] > 0.0)
            .collect();

        if valid_rows.is_empty() {
            return Err(EvisionError::InsufficientData(
                "no valid rows for price training after preprocessing".to_string(),
            ));
        }
        if valid_rows.len() < MIN_TRAIN_ROWS {
            return Err(EvisionError::InsufficientData(format!(
                "only {} valid samples available, need at least {}",
                valid_rows.len(),
                MIN_TRAIN_ROWS
            )));
        }

        let feature_names: Vec<String> = NUMERIC_FIELDS
            .iter()
            .map(|f| f.canonical_name().to_string())
            .chain(encoded_categories.iter().map(|c| format!("brand_{c}")))
            .collect();

        let n_features = feature_names.len();
        let make_row = |i: usize| -> Vec<f64> {
            let mut row = Vec::with_capacity(n_features);
            for col in &numeric {
                row.push(col[i]);
            }
            for cat in &encoded_categories {
                let hit = brands[i].as_deref() == Some(cat.as_str());
                row.push(if hit { 1.0 } else { 0.0 });
            }
            row
        };

        // Shuffled 80/20 split with a fixed seed
        let mut rng = ChaCha8Rng::seed_from_u64(TRAIN_SEED);
        let mut shuffled = valid_rows;
        shuffled.shuffle(&mut rng);

        let n_eval = ((shuffled.len() as f64 * EVAL_FRACTION) as usize).max(1);
        let n_train = shuffled.len() - n_eval;
        let (train_rows, eval_rows) = shuffled.split_at(n_train);

        let x_train = build_matrix(train_rows, n_features, &make_row);
        let y_train = Array1::from_vec(train_rows.iter().map(|&i| price[i]).collect());
        let x_eval = build_matrix(eval_rows, n_features, &make_row);
        let y_eval = Array1::from_vec(eval_rows.iter().map(|&i| price[i]).collect());

        let mut forest = RandomForest::new(N_ESTIMATORS).with_random_state(TRAIN_SEED);
        forest.fit(&x_train, &y_train)?;

        let y_pred = forest.predict(&x_eval)?;
        let metrics = RegressionMetrics::compute(&y_eval, &y_pred);

        info!(
            n_train,
            n_eval,
            rmse = metrics.rmse,
            "price model trained"
        );

        Ok(Self {
            forest,
            feature_names,
            rmse: metrics.rmse,
        })
    }

    /// Held-out root-mean-squared-error from training.
    pub fn rmse(&self) -> f64 {
        self.rmse
    }

    /// Feature columns in training order, after categorical encoding.
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Predict the price of a single vehicle.
    ///
    /// The brand is one-hot encoded exactly as during training and the
    /// columns aligned to the training order: indicators absent from
    /// this record are 0, columns unseen at training time are dropped.
    /// Deterministic given model and input.
    pub fn predict(&self, spec: &VehicleSpec) -> Result<f64> {
        let brand_indicator = format!("brand_{}", spec.brand);

        let row: Vec<f64> = self
            .feature_names
            .iter()
            .map(|name| match name.as_str() {
                "battery_kwh" => spec.battery_kwh,
                "range_km" => spec.range_km,
                "year" => spec.year,
                "acceleration" => spec.acceleration,
                other => {
                    if other == brand_indicator {
                        1.0
                    } else {
                        0.0
                    }
                }
            })
            .collect();

        let x = Array2::from_shape_vec((1, row.len()), row)
            .map_err(|e| EvisionError::Computation(e.to_string()))?;
        let pred = self.forest.predict(&x)?;
        Ok(pred[0])
    }
}

fn build_matrix(rows: &[usize], n_features: usize, make_row: &dyn Fn(usize) -> Vec<f64>) -> Array2<f64> {
    let mut data = Vec::with_capacity(rows.len() * n_features);
    for &i in rows {
        data.extend(make_row(i));
    }
    Array2::from_shape_vec((rows.len(), n_features), data)
        .expect("row builder produces fixed-width rows")
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
    match series.str() {
        Ok(ca) => Ok(ca.into_iter().map(|v| v.map(|s| s.to_string())).collect()),
        // Numeric brand codes still work as categories
        Err(_) => {
            let cast = series.cast(&DataType::String)?;
            let ca = cast.str()?;
            Ok(ca.into_iter().map(|v| v.map(|s| s.to_string())).collect())
        }
    }
}

/// Replace missing values with the column median, 0 when all missing.
fn impute_median(values: &[Option<f64>]) -> Vec<f64> {
    let mut present: Vec<f64> = values.iter().flatten().copied().collect();
    let fill = if present.is_empty() {
        0.0
    } else {
        present.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let mid = present.len() / 2;
        if present.len() % 2 == 0 {
            (present[mid - 1] + present[mid]) / 2.0
        } else {
            present[mid]
        }
    };
    values.iter().map(|v| v.unwrap_or(fill)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn training_frame(n: usize) -> DataFrame {
        let battery: Vec<f64> = (0..n).map(|i| 40.0 + (i % 8) as f64 * 10.0).collect();
        let range: Vec<f64> = battery.iter().map(|b| b * 6.0).collect();
        let year: Vec<i32> = (0..n).map(|i| 2018 + (i % 6) as i32).collect();
        let accel: Vec<f64> = battery.iter().map(|b| 12.0 - (b - 40.0) / 10.0).collect();
        let brand: Vec<&str> = (0..n)
            .map(|i| ["Tesla", "BYD", "Nio"][i % 3])
            .collect();
        // Price loosely follows battery size
        let price: Vec<f64> = battery.iter().map(|b| 20_000.0 + b * 500.0).collect();

        df!(
            "battery_kwh" => &battery,
            "range_km" => &range,
            "year" => &year,
            "acceleration" => &accel,
            "brand" => &brand,
            "price" => &price
        )
        .unwrap()
    }

    #[test]
    fn test_train_returns_model_and_rmse() {
        let df = training_frame(60);
        let model = PriceModel::train(&df).unwrap();

        assert!(model.rmse() >= 0.0);
        assert!(model
            .feature_names()
            .starts_with(&["battery_kwh".to_string(), "range_km".to_string()]));
        // 3 brands -> 2 indicator columns (first dropped)
        assert_eq!(model.feature_names().len(), 4 + 2);
    }

    #[test]
    fn test_insufficient_rows() {
        let df = training_frame(5);
        let err = PriceModel::train(&df).unwrap_err();
        assert!(matches!(err, EvisionError::InsufficientData(_)));
    }

    #[test]
    fn test_missing_column() {
        let df = df!(
            "battery_kwh" => &[50.0, 60.0],
            "price" => &[30_000.0, 40_000.0]
        )
        .unwrap();

        let err = PriceModel::train(&df).unwrap_err();
        match err {
            EvisionError::MissingColumn { field, .. } => {
                assert_eq!(field, "range_km");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_predict_known_brand() {
        let df = training_frame(60);
        let model = PriceModel::train(&df).unwrap();

        let spec = VehicleSpec {
            battery_kwh: 70.0,
            range_km: 420.0,
            year: 2022.0,
            acceleration: 9.0,
            brand: "Tesla".to_string(),
        };
        let price = model.predict(&spec).unwrap();
        assert!(price.is_finite());
        assert!(price > 0.0);
    }

    #[test]
    fn test_predict_unseen_brand() {
        let df = training_frame(60);
        let model = PriceModel::train(&df).unwrap();

        let spec = VehicleSpec {
            battery_kwh: 70.0,
            range_km: 420.0,
            year: 2022.0,
            acceleration: 9.0,
            brand: "Rivian".to_string(),
        };
        // All brand indicators zero, still a numeric prediction
        let price = model.predict(&spec).unwrap();
        assert!(price.is_finite());
    }

    #[test]
    fn test_predict_deterministic() {
        let df = training_frame(40);
        let model = PriceModel::train(&df).unwrap();

        let spec = VehicleSpec {
            battery_kwh: 55.0,
            range_km: 330.0,
            year: 2021.0,
            acceleration: 10.0,
            brand: "BYD".to_string(),
        };
        assert_eq!(model.predict(&spec).unwrap(), model.predict(&spec).unwrap());
    }

    #[test]
    fn test_model_serializes() {
        let df = training_frame(40);
        let model = PriceModel::train(&df).unwrap();

        let json = serde_json::to_string(&model).unwrap();
        let restored: PriceModel = serde_json::from_str(&json).unwrap();

        let spec = VehicleSpec {
            battery_kwh: 55.0,
            range_km: 330.0,
            year: 2021.0,
            acceleration: 10.0,
            brand: "Tesla".to_string(),
        };
        assert_eq!(
            model.predict(&spec).unwrap(),
            restored.predict(&spec).unwrap()
        );
    }

    #[test]
    fn test_case_insensitive_resolution() {
        let df = training_frame(40);
        let mut renamed = df.clone();
        renamed.rename("price", "PRICE".into()).unwrap();

        let model = PriceModel::train(&renamed).unwrap();
        assert!(model.rmse() >= 0.0);
    }
}
