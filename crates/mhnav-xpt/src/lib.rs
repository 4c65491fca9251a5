//! SAS Transport (XPT) file format support.
//!
//! Reads SAS Transport V5 and V8 files, the interchange format legacy
//! clinical note extracts arrive in. V8 long variable names (the LABELV8
//! section) are fully supported since clinical extract columns routinely
//! exceed the V5 eight-character limit. A minimal writer is included for
//! building fixtures and round-trip checks.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use mhnav_xpt::read_xpt;
//!
//! let dataset = read_xpt(Path::new("notes.xpt")).unwrap();
//! println!("{} ({} rows)", dataset.name, dataset.num_rows());
//! ```

pub mod error;
pub mod float;
pub mod header;
mod reader;
mod types;
mod writer;

pub use error::{Result, XptError};
pub use reader::{XptReader, read_xpt};
pub use types::{
    MissingValue, NumericValue, XptColumn, XptDataset, XptType, XptValue, XptVersion,
};
pub use writer::{write_xpt, xpt_to_bytes};
