//! Core pipeline: date-window joins, output table construction, and the
//! staged run that turns two encounter datasets into the four output tables.

pub mod datetime;
pub mod joiner;
pub mod pipeline;
pub mod table_builder;

pub use datetime::{date_in_window, parse_date};
pub use joiner::{attach_results, distinct_column_values, filter_column_isin, remove_index_dates};
pub use pipeline::{BuildInput, BuildStats, BuiltTables, build_datasets};
pub use table_builder::{
    build_index_table, build_model_table, build_positive_table, build_regex_table,
};
