//! Input-source resolution for encounter datasets.

use std::fmt;
use std::path::{Path, PathBuf};

use polars::prelude::DataFrame;

use mhnav_model::{DatasetError, Result};

/// A resolved input source for one dataset.
///
/// Resolution happens exactly once, before any file is opened: callers hand
/// the pipeline a tagged source instead of a string that gets re-inspected
/// at read time. When an input database is configured, every reference is a
/// table name and file extensions are never consulted.
#[derive(Debug, Clone)]
pub enum DatasetSource {
    /// Frame already in memory (library callers and tests).
    Frame(DataFrame),
    /// Delimited text extract on disk.
    Csv(PathBuf),
    /// SAS transport extract on disk.
    Transport(PathBuf),
    /// Table in the input SQLite database.
    Table(String),
}

impl DatasetSource {
    /// Resolve a dataset reference from the command line.
    ///
    /// With `from_database` set the reference is taken verbatim as a table
    /// name. Otherwise the file extension decides the reader; anything but
    /// `.csv` or `.xpt` is rejected here rather than failing mid-read.
    pub fn resolve(reference: &str, from_database: bool) -> Result<Self> {
        if from_database {
            return Ok(Self::Table(reference.to_string()));
        }
        let path = Path::new(reference);
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("csv") => Ok(Self::Csv(path.to_path_buf())),
            Some("xpt") => Ok(Self::Transport(path.to_path_buf())),
            _ => Err(DatasetError::unsupported_format(path)),
        }
    }
}

impl fmt::Display for DatasetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Frame(df) => write!(f, "in-memory frame ({} rows)", df.height()),
            Self::Csv(path) => write!(f, "{}", path.display()),
            Self::Transport(path) => write!(f, "{}", path.display()),
            Self::Table(name) => write!(f, "table '{name}'"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_extension_resolves_case_insensitively() {
        assert!(matches!(
            DatasetSource::resolve("extracts/index.CSV", false),
            Ok(DatasetSource::Csv(_))
        ));
    }

    #[test]
    fn xpt_extension_resolves_to_transport() {
        assert!(matches!(
            DatasetSource::resolve("extracts/historical.xpt", false),
            Ok(DatasetSource::Transport(_))
        ));
    }

    #[test]
    fn database_flag_overrides_extension() {
        let source = DatasetSource::resolve("index.csv", true).unwrap();
        match source {
            DatasetSource::Table(name) => assert_eq!(name, "index.csv"),
            other => panic!("expected Table, got {other}"),
        }
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let err = DatasetSource::resolve("notes.parquet", false).unwrap_err();
        assert!(matches!(err, DatasetError::UnsupportedFormat { .. }));
    }

    #[test]
    fn display_names_the_table() {
        let source = DatasetSource::Table("historical_notes".to_string());
        assert_eq!(format!("{source}"), "table 'historical_notes'");
    }
}
