//! EVision - EV sales analytics engine
//!
//! Analytics over a tabular electric-vehicle sales dataset:
//! - Schema normalization of heterogeneous source layouts
//! - Price prediction with a random-forest regressor
//! - Sales forecasting by linear trend extrapolation
//! - Keyword-driven question answering over dataset aggregates
//!
//! # Modules
//!
//! ## Pipeline
//! - [`data`] - Dataset loading and schema normalization
//! - [`schema`] - Canonical fields and column alias resolution
//! - [`training`] - Regression models (OLS, trees, random forest)
//!
//! ## Analytics
//! - [`price`] - Price model training and single-record inference
//! - [`forecast`] - Yearly/monthly sales trend extrapolation
//! - [`query`] - Rule-based question answering
//! - [`eda`] - Plot-ready exploratory summaries
//!
//! ## Infrastructure
//! - [`cache`] - Session-scoped model cache keyed by dataset content
//! - [`cli`] - Command-line dashboard shell

// Core error handling
pub mod error;

// Pipeline
pub mod schema;
pub mod data;
pub mod training;

// Analytics
pub mod price;
pub mod forecast;
pub mod query;
pub mod eda;

// Infrastructure
pub mod cache;
pub mod cli;

pub use error::{EvisionError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{EvisionError, Result};

    // Data pipeline
    pub use crate::data::{normalize, DataLoader, ImputeStrategy, Imputer};
    pub use crate::schema::Field;

    // Analytics
    pub use crate::forecast::{forecast, ForecastPath, ForecastResult};
    pub use crate::price::{PriceModel, VehicleSpec};
    pub use crate::query::answer;

    // Training
    pub use crate::training::{LinearRegression, RandomForest, RegressionMetrics};

    // Caching
    pub use crate::cache::ModelCache;
}
