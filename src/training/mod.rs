//! Regression model training
//!
//! Provides the model stack behind the price estimator and the sales
//! forecaster:
//! - Ordinary least squares linear regression (trend extrapolation)
//! - Regression trees and bagged random forests (price prediction)
//! - Regression metrics (MSE, RMSE, MAE, R²)

pub mod linear_models;
pub mod decision_tree;
pub mod random_forest;
mod metrics;

pub use linear_models::LinearRegression;
pub use decision_tree::{RegressionTree, TreeNode};
pub use random_forest::{MaxFeatures, RandomForest};
pub use metrics::RegressionMetrics;
