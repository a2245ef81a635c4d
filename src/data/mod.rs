//! Dataset loading and schema normalization
//!
//! Raw files come in two accepted layouts: canonical pre-named columns,
//! or the monthly revenue/units layout that needs derivation. Loading
//! resolves the file, normalization rewrites it into the canonical
//! schema with no missing values.

mod loader;
mod imputer;
mod normalize;

pub use loader::DataLoader;
pub use imputer::{ImputeStrategy, Imputer};
pub use normalize::normalize;
