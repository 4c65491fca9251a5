//! Output sinks for one pipeline run.
//!
//! A run produces up to four tables, written as CSV files into a
//! timestamped run directory and/or as SQLite tables, plus optional
//! replacement-audit TSVs. All sinks are write-once: nothing here updates
//! an existing output in place.

pub mod audit;
pub mod csv_sink;
pub mod sqlite_sink;

pub use audit::write_replacement_audit;
pub use csv_sink::{run_output_dir, write_csv_outputs, write_table_csv};
pub use sqlite_sink::{table_exists, write_sqlite_outputs, write_table_sqlite};
