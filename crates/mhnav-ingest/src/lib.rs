//! Dataset ingestion for the encounter note pipeline.
//!
//! Inputs arrive as CSV extracts, SAS transport files, SQLite tables, or
//! frames already in memory. Every source is normalized to a string-typed
//! DataFrame with lower-case headers, validated against its dataset schema,
//! and projected to the schema's required columns before the pipeline
//! touches it.

pub mod csv_table;
pub mod polars_utils;
pub mod reader;
pub mod source;

pub use csv_table::{CsvTable, read_csv_table};
pub use polars_utils::{
    any_to_string, column_trimmed_values, column_value_string, drop_duplicate_rows, format_numeric,
    lowercase_headers, parse_f64, string_frame,
};
pub use reader::{read_dataset, read_table_file};
pub use source::DatasetSource;
