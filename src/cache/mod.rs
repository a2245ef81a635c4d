//! Session-scoped model cache
//!
//! The price model is expensive to build and read-only once
//! constructed, so a session trains it once and reuses it for the
//! dataset's lifetime. The cache is keyed by a content fingerprint of
//! the normalized frame rather than by identity: a new upload with the
//! same content still hits, any changed cell misses and retrains.

use crate::error::{EvisionError, Result};
use crate::price::PriceModel;
use polars::prelude::*;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

/// Content fingerprint of a dataset
pub type Fingerprint = [u8; 32];

/// Compute a sha256 fingerprint over column names, dtypes, and values.
pub fn fingerprint(df: &DataFrame) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(df.height().to_le_bytes());

    for column in df.get_columns() {
        let series = column.as_materialized_series().rechunk();
        hasher.update(series.name().as_bytes());
        hasher.update(series.dtype().to_string().as_bytes());
        for value in series.iter() {
            hasher.update(value.to_string().as_bytes());
            hasher.update([0u8]);
        }
    }

    hasher.finalize().into()
}

/// Train-once-reuse cache for the session's price model
#[derive(Debug, Default)]
pub struct ModelCache {
    fingerprint: Option<Fingerprint>,
    model: Option<PriceModel>,
}

impl ModelCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached model when the frame's fingerprint matches.
    pub fn get(&self, df: &DataFrame) -> Option<&PriceModel> {
        if self.fingerprint == Some(fingerprint(df)) {
            self.model.as_ref()
        } else {
            None
        }
    }

    /// Return the cached model, training one first when the cache is
    /// empty or the dataset changed.
    pub fn get_or_train(&mut self, df: &DataFrame) -> Result<&PriceModel> {
        let fp = fingerprint(df);
        let hit = self.fingerprint == Some(fp) && self.model.is_some();

        if hit {
            debug!("price model cache hit");
        } else {
            info!("training price model (cache miss)");
            self.model = Some(PriceModel::train(df)?);
            self.fingerprint = Some(fp);
        }

        match &self.model {
            Some(model) => Ok(model),
            None => Err(EvisionError::ModelNotFitted),
        }
    }

    /// Drop the cached model and fingerprint.
    pub fn invalidate(&mut self) {
        self.fingerprint = None;
        self.model = None;
    }

    /// Whether a model is currently cached.
    pub fn is_cached(&self) -> bool {
        self.model.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn training_frame(offset: f64) -> DataFrame {
        let battery: Vec<f64> = (0..30).map(|i| 40.0 + (i % 8) as f64 * 10.0).collect();
        let range: Vec<f64> = battery.iter().map(|b| b * 6.0).collect();
        let year: Vec<i32> = (0..30).map(|i| 2018 + (i % 6) as i32).collect();
        let accel: Vec<f64> = battery.iter().map(|b| 12.0 - (b - 40.0) / 10.0).collect();
        let brand: Vec<&str> = (0..30).map(|i| ["Tesla", "BYD"][i % 2]).collect();
        let price: Vec<f64> = battery
            .iter()
            .map(|b| 20_000.0 + b * 500.0 + offset)
            .collect();

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
    fn test_fingerprint_stable() {
        let a = training_frame(0.0);
        let b = training_frame(0.0);
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn test_fingerprint_changes_with_content() {
        let a = training_frame(0.0);
        let b = training_frame(1.0);
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn test_cache_hit_on_same_frame() {
        let df = training_frame(0.0);
        let mut cache = ModelCache::new();

        assert!(cache.get(&df).is_none());
        let rmse = cache.get_or_train(&df).unwrap().rmse();
        assert!(cache.is_cached());

        // Second call hits and returns the identical model
        let rmse2 = cache.get_or_train(&df).unwrap().rmse();
        assert_eq!(rmse, rmse2);
        assert!(cache.get(&df).is_some());
    }

    #[test]
    fn test_cache_miss_on_changed_frame() {
        let mut cache = ModelCache::new();
        cache.get_or_train(&training_frame(0.0)).unwrap();

        let changed = training_frame(1.0);
        assert!(cache.get(&changed).is_none());
        // Retrains without error
        cache.get_or_train(&changed).unwrap();
        assert!(cache.get(&changed).is_some());
    }

    #[test]
    fn test_invalidate() {
        let df = training_frame(0.0);
        let mut cache = ModelCache::new();
        cache.get_or_train(&df).unwrap();

        cache.invalidate();
        assert!(!cache.is_cached());
        assert!(cache.get(&df).is_none());
    }
}
