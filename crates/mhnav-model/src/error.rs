use std::path::PathBuf;

use thiserror::Error;

/// Errors shared across ingest and output stages.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// A dataset is missing one or more required columns.
    ///
    /// Every missing column is listed, not just the first, so a bad extract
    /// needs exactly one round trip to fix.
    #[error("dataset '{dataset}' is missing required columns: {}", missing.join(", "))]
    MissingColumns {
        dataset: String,
        missing: Vec<String>,
    },

    /// Source path has no recognized dataset extension.
    #[error("unrecognized dataset format: {}", path.display())]
    UnsupportedFormat { path: PathBuf },

    /// Output table already exists and overwriting was not requested.
    #[error("output table '{table}' already exists")]
    TableExists { table: String },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for dataset operations.
pub type Result<T> = std::result::Result<T, DatasetError>;

impl DatasetError {
    /// Create a MissingColumns error.
    pub fn missing_columns(dataset: impl Into<String>, missing: Vec<String>) -> Self {
        Self::MissingColumns {
            dataset: dataset.into(),
            missing,
        }
    }

    /// Create an UnsupportedFormat error.
    pub fn unsupported_format(path: impl Into<PathBuf>) -> Self {
        Self::UnsupportedFormat { path: path.into() }
    }

    /// Create a TableExists error.
    pub fn table_exists(table: impl Into<String>) -> Self {
        Self::TableExists {
            table: table.into(),
        }
    }
}
