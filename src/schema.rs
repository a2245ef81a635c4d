//! Canonical schema and column alias resolution
//!
//! Source files name the same semantic columns differently ("price",
//! "Price (USD)", "price_usd", ...). Every component resolves columns
//! through this module so the search strategy stays in one place:
//! exact match against the alias list first, then a case-insensitive
//! pass over the frame's columns.

use crate::error::{EvisionError, Result};
use polars::prelude::*;

/// Canonical fields all components agree on after normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    BatteryKwh,
    RangeKm,
    Year,
    Acceleration,
    Brand,
    Price,
    Sales,
    Date,
    Model,
}

impl Field {
    /// Canonical column name used after normalization.
    pub fn canonical_name(&self) -> &'static str {
        match self {
            Field::BatteryKwh => "battery_kwh",
            Field::RangeKm => "range_km",
            Field::Year => "year",
            Field::Acceleration => "acceleration",
            Field::Brand => "brand",
            Field::Price => "price",
            Field::Sales => "sales",
            Field::Date => "date",
            Field::Model => "model",
        }
    }

    /// Accepted source column names, in match priority order.
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            Field::BatteryKwh => &[
                "battery_kwh",
                "battery",
                "Battery (kWh)",
                "battery_kWh",
                "Battery_Capacity_kWh",
            ],
            Field::RangeKm => &["range_km", "range", "Range (km)", "range_KM"],
            Field::Year => &["year", "Year", "YEAR"],
            Field::Acceleration => &["acceleration", "accel", "Acceleration", "0-100 km/h"],
            Field::Brand => &["brand", "Brand", "BRAND", "manufacturer", "Manufacturer"],
            Field::Price => &["price", "Price", "PRICE", "price_usd", "Price (USD)"],
            Field::Sales => &["sales", "Sales", "SALES", "quantity", "units", "Units_Sold"],
            Field::Date => &["date", "Date", "DATE"],
            Field::Model => &["model", "Model", "MODEL"],
        }
    }
}

/// Find the actual column name for a canonical field, if any.
///
/// Two passes: exact alias match, then case-insensitive alias match
/// over the frame's column names.
pub fn resolve(df: &DataFrame, field: Field) -> Option<String> {
    let columns: Vec<&str> = df.get_column_names().iter().map(|s| s.as_str()).collect();

    for alias in field.aliases() {
        if columns.contains(alias) {
            return Some(alias.to_string());
        }
    }

    for alias in field.aliases() {
        let alias_lower = alias.to_lowercase();
        if let Some(col) = columns.iter().find(|c| c.to_lowercase() == alias_lower) {
            return Some(col.to_string());
        }
    }

    None
}

/// Like [`resolve`], but fails with `MissingColumn` naming the field
/// and the aliases tried.
pub fn require(df: &DataFrame, field: Field) -> Result<String> {
    resolve(df, field).ok_or_else(|| EvisionError::MissingColumn {
        field: field.canonical_name().to_string(),
        aliases: field.aliases().iter().map(|s| s.to_string()).collect(),
    })
}

/// Find the first column whose lower-cased name contains any of the
/// given fragments.
///
/// The forecaster and the EDA summaries use this looser strategy so a
/// column like "Units_Sold" resolves as sales data.
pub fn resolve_containing(df: &DataFrame, fragments: &[&str]) -> Option<String> {
    for col in df.get_column_names() {
        let col_lower = col.to_lowercase();
        if fragments.iter().any(|f| col_lower.contains(f)) {
            return Some(col.to_string());
        }
    }
    None
}

/// Find the first column whose lower-cased name equals any of the
/// given names.
pub fn resolve_named(df: &DataFrame, names: &[&str]) -> Option<String> {
    for col in df.get_column_names() {
        let col_lower = col.to_lowercase();
        if names.iter().any(|n| col_lower == *n) {
            return Some(col.to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_exact() {
        let df = df!(
            "price" => &[1.0, 2.0],
            "brand" => &["a", "b"]
        )
        .unwrap();

        assert_eq!(resolve(&df, Field::Price), Some("price".to_string()));
        assert_eq!(resolve(&df, Field::Brand), Some("brand".to_string()));
    }

    #[test]
    fn test_resolve_case_insensitive() {
        let df = df!(
            "PRICE" => &[1.0, 2.0]
        )
        .unwrap();

        // "PRICE" is in the alias list, but case-insensitive matching
        // must also find arbitrary casings.
        assert_eq!(resolve(&df, Field::Price), Some("PRICE".to_string()));

        let df2 = df!(
            "pRiCe" => &[1.0, 2.0]
        )
        .unwrap();
        assert_eq!(resolve(&df2, Field::Price), Some("pRiCe".to_string()));
    }

    #[test]
    fn test_require_missing() {
        let df = df!(
            "x" => &[1.0, 2.0]
        )
        .unwrap();

        let err = require(&df, Field::Price).unwrap_err();
        match err {
            EvisionError::MissingColumn { field, aliases } => {
                assert_eq!(field, "price");
                assert!(aliases.contains(&"price_usd".to_string()));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_resolve_containing() {
        let df = df!(
            "Units_Sold" => &[1.0, 2.0],
            "Model_Year" => &[2020, 2021]
        )
        .unwrap();

        assert_eq!(
            resolve_containing(&df, &["sales", "quantity", "units"]),
            Some("Units_Sold".to_string())
        );
        assert_eq!(
            resolve_containing(&df, &["year"]),
            Some("Model_Year".to_string())
        );
        assert_eq!(resolve_containing(&df, &["nonexistent"]), None);
    }

    #[test]
    fn test_resolve_named() {
        let df = df!(
            "Date" => &["2023-01", "2023-02"],
            "update_time" => &["x", "y"]
        )
        .unwrap();

        // Exact (case-insensitive) match only — "update_time" must not
        // resolve as a date column.
        assert_eq!(resolve_named(&df, &["date"]), Some("Date".to_string()));
        assert_eq!(resolve_named(&df, &["time"]), None);
    }
}
