//! Error types for the EVision analytics engine

use thiserror::Error;

/// Result type alias for EVision operations
pub type Result<T> = std::result::Result<T, EvisionError>;

/// Main error type for the EVision engine
#[derive(Error, Debug)]
pub enum EvisionError {
    #[error("Data file not found at {primary} or {fallback}")]
    NotFound { primary: String, fallback: String },

    #[error("Empty data: {0}")]
    EmptyData(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Missing required column '{field}', tried aliases {aliases:?}")]
    MissingColumn {
        field: String,
        aliases: Vec<String>,
    },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    Shape { expected: String, actual: String },

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Computation error: {0}")]
    Computation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<polars::error::PolarsError> for EvisionError {
    fn from(err: polars::error::PolarsError) -> Self {
        EvisionError::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EvisionError::MissingColumn {
            field: "price".to_string(),
            aliases: vec!["price".to_string(), "Price".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("price"));
        assert!(msg.contains("Price"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: EvisionError = io_err.into();
        assert!(matches!(err, EvisionError::Io(_)));
    }
}
