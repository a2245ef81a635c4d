//! Dataset file loading

use crate::error::{EvisionError, Result};
use polars::prelude::*;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::info;

/// Default location of the sales dataset
pub const PRIMARY_PATH: &str = "data/train.csv";
/// Fallback dataset file produced by the acquisition script
pub const FALLBACK_PATH: &str = "data/ev_sales_adoption.csv";

/// Loader for the EV sales dataset
///
/// Tries the primary path first, then the fallback. Either layout
/// (canonical or monthly revenue/units) is accepted; normalization
/// happens downstream.
pub struct DataLoader {
    primary: PathBuf,
    fallback: PathBuf,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    /// Create a loader with the default primary and fallback paths
    pub fn new() -> Self {
        Self {
            primary: PathBuf::from(PRIMARY_PATH),
            fallback: PathBuf::from(FALLBACK_PATH),
        }
    }

    /// Override the primary path
    pub fn with_primary(mut self, path: impl Into<PathBuf>) -> Self {
        self.primary = path.into();
        self
    }

    /// Override the fallback path
    pub fn with_fallback(mut self, path: impl Into<PathBuf>) -> Self {
        self.fallback = path.into();
        self
    }

    /// Load the dataset from the primary path, falling back to the
    /// alternative file when the primary does not exist.
    pub fn load(&self) -> Result<DataFrame> {
        let path = if self.primary.exists() {
            self.primary.as_path()
        } else if self.fallback.exists() {
            self.fallback.as_path()
        } else {
            return Err(EvisionError::NotFound {
                primary: self.primary.display().to_string(),
                fallback: self.fallback.display().to_string(),
            });
        };

        let df = Self::read_csv(path)?;
        info!(
            path = %path.display(),
            rows = df.height(),
            cols = df.width(),
            "dataset loaded"
        );
        Ok(df)
    }

    /// Read a single CSV file into a DataFrame.
    pub fn read_csv(path: &Path) -> Result<DataFrame> {
        let file = File::open(path)?;

        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(1000))
            .into_reader_with_file_handle(file)
            .finish()
            .map_err(|e| match e {
                PolarsError::NoData(msg) => EvisionError::EmptyData(msg.to_string()),
                other => EvisionError::Parse(other.to_string()),
            })?;

        if df.height() == 0 || df.width() == 0 {
            return Err(EvisionError::EmptyData(format!(
                "{} contains no data rows",
                path.display()
            )));
        }

        Ok(df)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_csv(content: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".csv")
            .tempfile()
            .unwrap();
        write!(file, "{content}").unwrap();
        file
    }

    #[test]
    fn test_load_primary() {
        let file = create_csv("a,b\n1,2\n3,4\n");
        let loader = DataLoader::new()
            .with_primary(file.path())
            .with_fallback("does/not/exist.csv");

        let df = loader.load().unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.width(), 2);
    }

    #[test]
    fn test_load_fallback() {
        let file = create_csv("a,b\n1,2\n");
        let loader = DataLoader::new()
            .with_primary("does/not/exist.csv")
            .with_fallback(file.path());

        let df = loader.load().unwrap();
        assert_eq!(df.height(), 1);
    }

    #[test]
    fn test_neither_exists() {
        let loader = DataLoader::new()
            .with_primary("missing/a.csv")
            .with_fallback("missing/b.csv");

        let err = loader.load().unwrap_err();
        assert!(matches!(err, EvisionError::NotFound { .. }));
    }

    #[test]
    fn test_header_only_is_empty() {
        let file = create_csv("a,b,c\n");
        let loader = DataLoader::new()
            .with_primary(file.path())
            .with_fallback("does/not/exist.csv");

        let err = loader.load().unwrap_err();
        assert!(matches!(err, EvisionError::EmptyData(_)));
    }
}
