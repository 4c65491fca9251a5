//! Shared data model for the clinical-note ETL pipeline.
//!
//! Holds the pieces every other crate agrees on: canonical column names,
//! the required-column schemas for the two input datasets, output table
//! identities, and the dataset error taxonomy.

pub mod columns;
pub mod error;
pub mod schema;
pub mod tables;

pub use error::{DatasetError, Result};
pub use schema::DatasetSchema;
pub use tables::OutputTable;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn historical_schema_is_index_plus_back_reference() {
        let index = DatasetSchema::index();
        let historical = DatasetSchema::historical();
        let extra: Vec<_> = historical
            .required_columns()
            .iter()
            .filter(|c| !index.required_columns().contains(c))
            .collect();
        assert_eq!(extra, vec![&columns::INDEX_PAT_ENC_CSN_ID]);
    }

    #[test]
    fn table_exists_message_names_the_table() {
        let err = DatasetError::table_exists("nlp_model_20240101_000000");
        assert_eq!(
            format!("{err}"),
            "output table 'nlp_model_20240101_000000' already exists"
        );
    }
}
