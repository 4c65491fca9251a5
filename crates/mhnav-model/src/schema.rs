//! Required-column contracts for the two input datasets.

use crate::columns;
use crate::error::{DatasetError, Result};

/// Ordered required-column contract for an input dataset.
///
/// Validation reports every violation at once, and the column order doubles
/// as the canonical projection order after ingest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetSchema {
    name: &'static str,
    required: Vec<&'static str>,
}

impl DatasetSchema {
    /// Schema for the index dataset (target encounters).
    pub fn index() -> Self {
        Self {
            name: "index",
            required: vec![
                columns::STUDYID,
                columns::PAT_ENC_CSN_ID,
                columns::NOTE_DATE,
                columns::NOTE_TEXT,
                columns::START_DATE,
                columns::END_DATE,
            ],
        }
    }

    /// Schema for the historical dataset (look-back window notes).
    ///
    /// Identical to [`DatasetSchema::index`] plus the back-reference to the
    /// index encounter each historical note belongs to.
    pub fn historical() -> Self {
        Self {
            name: "historical",
            required: vec![
                columns::STUDYID,
                columns::PAT_ENC_CSN_ID,
                columns::INDEX_PAT_ENC_CSN_ID,
                columns::NOTE_DATE,
                columns::NOTE_TEXT,
                columns::START_DATE,
                columns::END_DATE,
            ],
        }
    }

    /// Dataset label used in error messages and logs.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Required columns in canonical projection order.
    pub fn required_columns(&self) -> &[&'static str] {
        &self.required
    }

    /// Check `headers` (already lower-cased) against the contract.
    ///
    /// Collects all missing columns before failing.
    pub fn validate(&self, headers: &[String]) -> Result<()> {
        let missing: Vec<String> = self
            .required
            .iter()
            .filter(|col| !headers.iter().any(|h| h == *col))
            .map(|col| (*col).to_string())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(DatasetError::missing_columns(self.name, missing))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(cols: &[&str]) -> Vec<String> {
        cols.iter().map(|c| (*c).to_string()).collect()
    }

    #[test]
    fn index_schema_accepts_complete_headers() {
        let schema = DatasetSchema::index();
        let hdrs = headers(&[
            "studyid",
            "pat_enc_csn_id",
            "note_date",
            "note_text",
            "start_date",
            "end_date",
        ]);
        assert!(schema.validate(&hdrs).is_ok());
    }

    #[test]
    fn extra_columns_are_allowed() {
        let schema = DatasetSchema::index();
        let hdrs = headers(&[
            "studyid",
            "pat_enc_csn_id",
            "note_date",
            "note_text",
            "start_date",
            "end_date",
            "note_id",
        ]);
        assert!(schema.validate(&hdrs).is_ok());
    }

    #[test]
    fn all_missing_columns_are_reported_in_schema_order() {
        let schema = DatasetSchema::historical();
        let hdrs = headers(&["studyid", "pat_enc_csn_id", "note_text", "end_date"]);
        let err = schema.validate(&hdrs).unwrap_err();
        match err {
            DatasetError::MissingColumns { dataset, missing } => {
                assert_eq!(dataset, "historical");
                assert_eq!(
                    missing,
                    vec!["index_pat_enc_csn_id", "note_date", "start_date"]
                );
            }
            other => panic!("expected MissingColumns, got {other}"),
        }
    }

    #[test]
    fn historical_schema_requires_index_back_reference() {
        let schema = DatasetSchema::historical();
        let hdrs = headers(&[
            "studyid",
            "pat_enc_csn_id",
            "note_date",
            "note_text",
            "start_date",
            "end_date",
        ]);
        let err = schema.validate(&hdrs).unwrap_err();
        assert_eq!(
            format!("{err}"),
            "dataset 'historical' is missing required columns: index_pat_enc_csn_id"
        );
    }
}
