//! Note de-lining for raw EHR extracts.
//!
//! Extract jobs often split a long note across many rows, one line of text
//! per row with a shared note id and a line counter. This tool collapses
//! each note back to a single row: the line counter keeps its maximum, the
//! text fragments are joined with newlines in row order, and the remaining
//! metadata columns are joined back on the note id and line counter after
//! exact duplicates are dropped.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use polars::prelude::{Column, DataFrame};
use tracing::{debug, info, info_span};

use mhnav_ingest::{
    column_value_string, drop_duplicate_rows, parse_f64, read_table_file, string_frame,
};
use mhnav_output::write_table_csv;

use crate::logging::redact_value;

/// Column roles for a de-lining run.
#[derive(Debug, Clone, Copy)]
pub struct DelineColumns<'a> {
    /// Column whose value identifies a note.
    pub group_by: &'a str,
    /// Line counter column; the maximum per note is kept.
    pub line_column: &'a str,
    /// Text column; fragments are joined with newlines.
    pub text_column: &'a str,
}

/// Row counts from a completed de-lining run.
#[derive(Debug, Clone, Copy)]
pub struct DelineOutcome {
    pub input_rows: usize,
    pub output_rows: usize,
    pub notes: usize,
}

/// De-line an extract file and write the result as CSV.
pub fn deline_file(
    input: &Path,
    outfile: &Path,
    columns: &DelineColumns<'_>,
) -> Result<DelineOutcome> {
    let span = info_span!("deline", input = %input.display());
    let _guard = span.enter();
    let start = Instant::now();

    let df = read_table_file(input)
        .with_context(|| format!("read extract {}", input.display()))?;
    let delined = deline_frame(&df, columns)?;
    write_table_csv(outfile, &delined)?;

    let mut groups = BTreeSet::new();
    for idx in 0..delined.height() {
        groups.insert(column_value_string(&delined, columns.group_by, idx));
    }
    let outcome = DelineOutcome {
        input_rows: df.height(),
        output_rows: delined.height(),
        notes: groups.len(),
    };
    info!(
        input_rows = outcome.input_rows,
        output_rows = outcome.output_rows,
        notes = outcome.notes,
        outfile = %outfile.display(),
        duration_ms = start.elapsed().as_millis() as u64,
        "delined extract"
    );
    Ok(outcome)
}

/// Collapse a multi-line extract to one row per note.
///
/// Output columns are the note id, the line counter, the joined text, and
/// then the remaining metadata columns in source order. A note whose
/// metadata fans out to several distinct rows keeps one output row per
/// metadata row.
pub fn deline_frame(df: &DataFrame, columns: &DelineColumns<'_>) -> Result<DataFrame> {
    for name in [columns.group_by, columns.line_column, columns.text_column] {
        if df.column(name).is_err() {
            bail!("column '{name}' not found in extract");
        }
    }

    let height = df.height();
    let mut keys = Vec::with_capacity(height);
    let mut lines = Vec::with_capacity(height);
    let mut texts = Vec::with_capacity(height);
    for idx in 0..height {
        keys.push(column_value_string(df, columns.group_by, idx));
        lines.push(column_value_string(df, columns.line_column, idx));
        texts.push(column_value_string(df, columns.text_column, idx));
    }

    let mut rows_by_key: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (idx, key) in keys.iter().enumerate() {
        rows_by_key.entry(key.as_str()).or_default().push(idx);
    }
    let mut ordered_keys: Vec<&str> = rows_by_key.keys().copied().collect();
    ordered_keys.sort_by(|a, b| compare_values(a, b));

    // Metadata is everything except the text, with exact duplicates dropped
    // so repeated per-line values collapse to one row per note.
    let mut meta_columns: Vec<Column> = Vec::with_capacity(df.width().saturating_sub(1));
    for column in df.get_columns() {
        if column.name().as_str() != columns.text_column {
            meta_columns.push(column.clone());
        }
    }
    let metadata =
        drop_duplicate_rows(&DataFrame::new(meta_columns).context("build metadata frame")?)?;

    let mut meta_rows: BTreeMap<(String, String), Vec<usize>> = BTreeMap::new();
    for idx in 0..metadata.height() {
        let key = (
            column_value_string(&metadata, columns.group_by, idx),
            column_value_string(&metadata, columns.line_column, idx),
        );
        meta_rows.entry(key).or_default().push(idx);
    }

    let other_columns: Vec<String> = df
        .get_columns()
        .iter()
        .map(|column| column.name().to_string())
        .filter(|name| {
            name != columns.group_by && name != columns.line_column && name != columns.text_column
        })
        .collect();

    let mut headers = vec![
        columns.group_by.to_string(),
        columns.line_column.to_string(),
        columns.text_column.to_string(),
    ];
    headers.extend(other_columns.iter().cloned());

    let mut rows: Vec<Vec<String>> = Vec::new();
    for key in ordered_keys {
        let indices = &rows_by_key[key];
        let line_count = indices
            .iter()
            .map(|&idx| lines[idx].as_str())
            .max_by(|a, b| compare_values(a, b))
            .unwrap_or_default()
            .to_string();
        let joined = indices
            .iter()
            .map(|&idx| texts[idx].as_str())
            .collect::<Vec<_>>()
            .join("\n");

        match meta_rows.get(&(key.to_string(), line_count.clone())) {
            Some(matches) => {
                if matches.len() > 1 {
                    debug!(
                        note = redact_value(key),
                        rows = matches.len(),
                        "metadata conflicts on the max line; emitting one row each"
                    );
                }
                for &meta_idx in matches {
                    let mut row = vec![key.to_string(), line_count.clone(), joined.clone()];
                    for name in &other_columns {
                        row.push(column_value_string(&metadata, name, meta_idx));
                    }
                    rows.push(row);
                }
            }
            None => {
                let mut row = vec![key.to_string(), line_count.clone(), joined.clone()];
                row.extend(other_columns.iter().map(|_| String::new()));
                rows.push(row);
            }
        }
    }

    string_frame(&headers, &rows)
}

/// Numeric comparison when both sides parse, string comparison otherwise.
/// Line counters read "10" above "2" this way.
fn compare_values(a: &str, b: &str) -> Ordering {
    match (parse_f64(a), parse_f64(b)) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => a.cmp(b),
    }
}
