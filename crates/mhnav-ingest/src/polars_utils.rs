//! Polars helpers shared across the pipeline stages.
//!
//! Every dataset travels through the pipeline as a frame of string columns,
//! so these helpers centralize cell-to-string conversion, column extraction,
//! and frame construction from row-major string data.

use std::collections::BTreeSet;

use anyhow::{Context, Result};
use polars::prelude::*;

/// Converts a Polars AnyValue to a String representation.
/// Returns empty string for Null, properly formats numeric types.
pub fn any_to_string(value: AnyValue<'_>) -> String {
    match value {
        AnyValue::Null => String::new(),
        AnyValue::Int8(v) => v.to_string(),
        AnyValue::Int16(v) => v.to_string(),
        AnyValue::Int32(v) => v.to_string(),
        AnyValue::Int64(v) => v.to_string(),
        AnyValue::UInt8(v) => v.to_string(),
        AnyValue::UInt16(v) => v.to_string(),
        AnyValue::UInt32(v) => v.to_string(),
        AnyValue::UInt64(v) => v.to_string(),
        AnyValue::Float32(v) => format_numeric(f64::from(v)),
        AnyValue::Float64(v) => format_numeric(v),
        AnyValue::String(s) => s.to_string(),
        AnyValue::StringOwned(s) => s.to_string(),
        AnyValue::Boolean(b) => if b { "1" } else { "0" }.to_string(),
        other => other.to_string(),
    }
}

/// Formats a floating-point number as a string without a trailing
/// fractional part.
///
/// Encounter ids arrive as SAS numerics; this keeps them joinable against
/// the same ids read as text from CSV or SQLite. Whole values print with no
/// decimal point, so the trailing-zero trim only applies to fractions.
pub fn format_numeric(v: f64) -> String {
    let s = format!("{v}");
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s
    }
}

/// Parses a string as f64, returning None for invalid or empty strings.
pub fn parse_f64(value: &str) -> Option<f64> {
    if value.trim().is_empty() {
        return None;
    }
    value.trim().parse::<f64>().ok()
}

/// Extract a cell as a string, with missing columns and rows reading as empty.
pub fn column_value_string(df: &DataFrame, name: &str, idx: usize) -> String {
    match df.column(name) {
        Ok(series) => any_to_string(series.get(idx).unwrap_or(AnyValue::Null)),
        Err(_) => String::new(),
    }
}

/// Extract all trimmed string values from a DataFrame column.
pub fn column_trimmed_values(df: &DataFrame, name: &str) -> Option<Vec<String>> {
    let series = df.column(name).ok()?;
    let mut values = Vec::with_capacity(df.height());
    for idx in 0..df.height() {
        let value = any_to_string(series.get(idx).unwrap_or(AnyValue::Null));
        values.push(value.trim().to_string());
    }
    Some(values)
}

/// Build a string-typed DataFrame from headers plus row-major values.
///
/// Short rows read as empty cells; extra cells beyond the headers are ignored.
pub fn string_frame(headers: &[String], rows: &[Vec<String>]) -> Result<DataFrame> {
    let mut columns: Vec<Column> = Vec::with_capacity(headers.len());
    for (idx, header) in headers.iter().enumerate() {
        let mut values: Vec<String> = Vec::with_capacity(rows.len());
        for row in rows {
            values.push(row.get(idx).cloned().unwrap_or_default());
        }
        columns.push(Series::new(header.as_str().into(), values).into());
    }
    DataFrame::new(columns).context("build dataframe from rows")
}

/// Drop exact duplicate rows, keeping the first occurrence in row order.
pub fn drop_duplicate_rows(df: &DataFrame) -> Result<DataFrame> {
    if df.height() == 0 {
        return Ok(df.clone());
    }
    let names = df.get_column_names_owned();
    let mut seen = BTreeSet::new();
    let mut keep = Vec::with_capacity(df.height());
    for idx in 0..df.height() {
        let mut composite = String::new();
        for (pos, name) in names.iter().enumerate() {
            if pos > 0 {
                // Unit separator: free text never contains it.
                composite.push('\u{1f}');
            }
            composite.push_str(&column_value_string(df, name.as_str(), idx));
        }
        keep.push(seen.insert(composite));
    }
    let mask = BooleanChunked::from_slice("dedupe".into(), &keep);
    df.filter(&mask).context("filter duplicate rows")
}

/// Lower-case every column name, leaving the data untouched.
pub fn lowercase_headers(df: &DataFrame) -> Result<DataFrame> {
    let mut columns: Vec<Column> = Vec::with_capacity(df.width());
    for column in df.get_columns() {
        let lowered = column.name().to_lowercase();
        columns.push(column.clone().with_name(lowered.into()));
    }
    DataFrame::new(columns).context("lowercase column names")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_numeric_keeps_ids_joinable() {
        assert_eq!(format_numeric(1001.0), "1001");
        assert_eq!(format_numeric(7_200_000_000.0), "7200000000");
        assert_eq!(format_numeric(2.5), "2.5");
    }

    #[test]
    fn any_to_string_maps_null_to_empty() {
        assert_eq!(any_to_string(AnyValue::Null), "");
        assert_eq!(any_to_string(AnyValue::Int64(42)), "42");
        assert_eq!(any_to_string(AnyValue::Float64(3.0)), "3");
    }

    #[test]
    fn string_frame_pads_short_rows() {
        let headers = vec!["a".to_string(), "b".to_string()];
        let rows = vec![vec!["1".to_string()]];
        let df = string_frame(&headers, &rows).unwrap();
        assert_eq!(column_value_string(&df, "b", 0), "");
    }

    #[test]
    fn lowercase_headers_renames_in_place() {
        let headers = vec!["STUDYID".to_string(), "Note_Text".to_string()];
        let rows = vec![vec!["S001".to_string(), "ok".to_string()]];
        let df = string_frame(&headers, &rows).unwrap();
        let lowered = lowercase_headers(&df).unwrap();
        assert!(lowered.column("studyid").is_ok());
        assert!(lowered.column("note_text").is_ok());
        assert_eq!(column_value_string(&lowered, "studyid", 0), "S001");
    }

    #[test]
    fn drop_duplicate_rows_keeps_first_in_order() {
        let headers = vec!["id".to_string(), "term".to_string()];
        let rows = vec![
            vec!["1".to_string(), "anxiety".to_string()],
            vec!["2".to_string(), "anxiety".to_string()],
            vec!["1".to_string(), "anxiety".to_string()],
        ];
        let df = string_frame(&headers, &rows).unwrap();
        let deduped = drop_duplicate_rows(&df).unwrap();
        assert_eq!(deduped.height(), 2);
        assert_eq!(column_value_string(&deduped, "id", 0), "1");
        assert_eq!(column_value_string(&deduped, "id", 1), "2");
        let again = drop_duplicate_rows(&deduped).unwrap();
        assert_eq!(again.height(), 2);
    }

    #[test]
    fn column_trimmed_values_trims_edges() {
        let headers = vec!["id".to_string()];
        let rows = vec![vec![" 1001 ".to_string()]];
        let df = string_frame(&headers, &rows).unwrap();
        let values = column_trimmed_values(&df, "id").unwrap();
        assert_eq!(values, vec!["1001"]);
        assert!(column_trimmed_values(&df, "absent").is_none());
    }
}
