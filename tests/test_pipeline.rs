//! Integration tests for the full pipeline: load, normalize, train,
//! forecast, answer.

use evision::cache::ModelCache;
use evision::data::{normalize, DataLoader};
use evision::error::EvisionError;
use evision::forecast::{forecast, ForecastPath};
use evision::price::{PriceModel, VehicleSpec};
use evision::query;
use polars::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_monthly_csv(n_months: usize) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".csv")
        .tempfile()
        .unwrap();

    writeln!(file, "Date,Brand,Model,Battery_Capacity_kWh,Units_Sold,Revenue").unwrap();
    let brands = ["Tesla", "BYD", "Nio", "VW"];
    for i in 0..n_months {
        let year = 2022 + (i / 12) as i32;
        let month = (i % 12) + 1;
        for (j, brand) in brands.iter().enumerate() {
            let battery = 40 + 10 * j;
            let units = 100 + 10 * i + 5 * j;
            let revenue = units * (25_000 + 2_000 * j);
            writeln!(
                file,
                "{year}-{month:02},{brand},{brand} M{j},{battery},{units},{revenue}"
            )
            .unwrap();
        }
    }
    file
}

#[test]
fn test_load_and_normalize_monthly_layout() {
    let file = write_monthly_csv(12);
    let loader = DataLoader::new()
        .with_primary(file.path())
        .with_fallback("does/not/exist.csv");

    let raw = loader.load().unwrap();
    let df = normalize(&raw).unwrap();

    // Every canonical column exists with no missing values
    for col in [
        "year",
        "battery_kwh",
        "brand",
        "sales",
        "price",
        "range_km",
        "acceleration",
    ] {
        let column = df.column(col).unwrap();
        assert_eq!(column.null_count(), 0, "nulls left in {col}");
    }

    // price = revenue / units_sold holds exactly for derived rows
    let prices = df
        .column("price")
        .unwrap()
        .as_materialized_series()
        .cast(&DataType::Float64)
        .unwrap();
    let prices = prices.f64().unwrap();
    assert!((prices.get(0).unwrap() - 25_000.0).abs() < 1e-9);
}

#[test]
fn test_normalization_is_reproducible() {
    let file = write_monthly_csv(6);
    let loader = DataLoader::new()
        .with_primary(file.path())
        .with_fallback("does/not/exist.csv");

    let raw = loader.load().unwrap();
    let a = normalize(&raw).unwrap();
    let b = normalize(&raw).unwrap();

    let ra: Vec<Option<i64>> = a
        .column("range_km")
        .unwrap()
        .i64()
        .unwrap()
        .into_iter()
        .collect();
    let rb: Vec<Option<i64>> = b
        .column("range_km")
        .unwrap()
        .i64()
        .unwrap()
        .into_iter()
        .collect();
    assert_eq!(ra, rb);
}

#[test]
fn test_train_and_predict_end_to_end() {
    let file = write_monthly_csv(12);
    let loader = DataLoader::new()
        .with_primary(file.path())
        .with_fallback("does/not/exist.csv");

    let df = normalize(&loader.load().unwrap()).unwrap();
    let model = PriceModel::train(&df).unwrap();

    assert!(model.rmse() >= 0.0);

    let spec = VehicleSpec {
        battery_kwh: 60.0,
        range_km: 360.0,
        year: 2023.0,
        acceleration: 9.5,
        brand: "Tesla".to_string(),
    };
    let price = model.predict(&spec).unwrap();
    assert!(price > 0.0, "implausible price {price}");

    // Unseen brand still predicts
    let unknown = VehicleSpec {
        brand: "Lucid".to_string(),
        ..spec
    };
    assert!(model.predict(&unknown).unwrap().is_finite());
}

#[test]
fn test_forecast_uses_monthly_path_on_monthly_layout() {
    let file = write_monthly_csv(12);
    let loader = DataLoader::new()
        .with_primary(file.path())
        .with_fallback("does/not/exist.csv");

    let df = normalize(&loader.load().unwrap()).unwrap();
    let result = forecast(&df).unwrap();

    assert_eq!(result.path, ForecastPath::Monthly);
    assert_eq!(result.future_years.len(), 2);
    assert_eq!(result.forecast.len(), 2);
    assert!(result.forecast.iter().all(|v| *v >= 0.0));
    // Year two carries the flat 10% growth assumption
    assert!((result.forecast[1] - result.forecast[0] * 1.10).abs() < 1e-6);
}

#[test]
fn test_model_cache_across_pipeline() {
    let file = write_monthly_csv(12);
    let loader = DataLoader::new()
        .with_primary(file.path())
        .with_fallback("does/not/exist.csv");

    let df = normalize(&loader.load().unwrap()).unwrap();

    let mut cache = ModelCache::new();
    let rmse_first = cache.get_or_train(&df).unwrap().rmse();
    let rmse_second = cache.get_or_train(&df).unwrap().rmse();
    assert_eq!(rmse_first, rmse_second);
}

#[test]
fn test_query_over_normalized_data() {
    let file = write_monthly_csv(12);
    let loader = DataLoader::new()
        .with_primary(file.path())
        .with_fallback("does/not/exist.csv");

    let df = normalize(&loader.load().unwrap()).unwrap();

    let brands = query::answer(&df, "What brands are available?");
    assert!(brands.contains("Tesla"));

    let avg = query::answer(&df, "What is the average price of EVs?");
    assert!(avg.starts_with("The average EV price is $"));

    let help = query::answer(&df, "tell me a joke");
    assert!(help.contains("rephrasing"));
}

#[test]
fn test_missing_file_error() {
    let loader = DataLoader::new()
        .with_primary("no/such/file.csv")
        .with_fallback("also/no/such/file.csv");

    let err = loader.load().unwrap_err();
    assert!(matches!(err, EvisionError::NotFound { .. }));
    let msg = err.to_string();
    assert!(msg.contains("no/such/file.csv"));
}

#[test]
fn test_canonical_layout_end_to_end() {
    // A dataset already in canonical form skips derivation entirely
    let n = 24;
    let battery: Vec<f64> = (0..n).map(|i| 40.0 + (i % 6) as f64 * 10.0).collect();
    let range: Vec<f64> = battery.iter().map(|b| b * 6.0).collect();
    let year: Vec<i32> = (0..n).map(|i| 2019 + (i % 5) as i32).collect();
    let accel: Vec<f64> = battery.iter().map(|b| 12.0 - (b - 40.0) / 10.0).collect();
    let brand: Vec<&str> = (0..n).map(|i| ["Tesla", "BYD", "Nio"][i % 3]).collect();
    let price: Vec<f64> = battery.iter().map(|b| 18_000.0 + b * 450.0).collect();
    let sales: Vec<f64> = (0..n).map(|i| 500.0 + 50.0 * i as f64).collect();

    let raw = df!(
        "battery_kwh" => &battery,
        "range_km" => &range,
        "year" => &year,
        "acceleration" => &accel,
        "brand" => &brand,
        "price" => &price,
        "sales" => &sales
    )
    .unwrap();

    let df = normalize(&raw).unwrap();
    assert_eq!(df.height(), n);

    let model = PriceModel::train(&df).unwrap();
    assert!(model.rmse() >= 0.0);

    let result = forecast(&df).unwrap();
    assert_eq!(result.path, ForecastPath::Yearly);
    assert_eq!(result.future_years.len(), 2);
}
