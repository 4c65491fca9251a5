//! Dataset loading: one entry point across CSV, transport, SQLite, and frames.

use std::path::Path;

use anyhow::{Context, Result, bail};
use polars::prelude::{Column, DataFrame};
use rusqlite::Connection;
use rusqlite::types::Value;
use tracing::info;

use mhnav_model::{DatasetError, DatasetSchema};
use mhnav_xpt::{NumericValue, XptValue, read_xpt};

use crate::csv_table::read_csv_table;
use crate::polars_utils::{format_numeric, lowercase_headers, string_frame};
use crate::source::DatasetSource;

/// Load one dataset, validate it, and project it to its required columns.
///
/// Column names are lower-cased before validation, every missing required
/// column is reported in a single error, and the returned frame carries the
/// schema's columns in schema order with everything else dropped.
pub fn read_dataset(
    source: &DatasetSource,
    schema: &DatasetSchema,
    input_db: Option<&Connection>,
) -> Result<DataFrame> {
    let frame = match source {
        DatasetSource::Frame(df) => df.clone(),
        DatasetSource::Csv(path) => {
            let table = read_csv_table(path)?;
            string_frame(&table.headers, &table.rows)
                .with_context(|| format!("build frame from {}", path.display()))?
        }
        DatasetSource::Transport(path) => transport_frame(path)?,
        DatasetSource::Table(name) => {
            let Some(conn) = input_db else {
                bail!("input database connection required for table '{name}'");
            };
            table_frame(conn, name)?
        }
    };
    let frame = lowercase_headers(&frame)?;
    let headers: Vec<String> = frame
        .get_column_names_owned()
        .iter()
        .map(ToString::to_string)
        .collect();
    schema.validate(&headers)?;
    let projected = project_columns(&frame, schema)?;
    info!(
        dataset = schema.name(),
        source = %source,
        rows = projected.height(),
        "loaded dataset"
    );
    Ok(projected)
}

/// Read a file extract without schema validation or projection.
///
/// The deline tool works on raw multi-line extracts whose columns are not
/// one of the pipeline schemas; this keeps the format dispatch and header
/// lower-casing without the validation step.
pub fn read_table_file(path: &Path) -> Result<DataFrame> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    let frame = match extension.as_deref() {
        Some("csv") => {
            let table = read_csv_table(path)?;
            string_frame(&table.headers, &table.rows)
                .with_context(|| format!("build frame from {}", path.display()))?
        }
        Some("xpt") => transport_frame(path)?,
        _ => return Err(DatasetError::unsupported_format(path).into()),
    };
    lowercase_headers(&frame)
}

fn project_columns(df: &DataFrame, schema: &DatasetSchema) -> Result<DataFrame> {
    let mut columns: Vec<Column> = Vec::with_capacity(schema.required_columns().len());
    for name in schema.required_columns() {
        let column = df
            .column(name)
            .with_context(|| format!("project column '{name}'"))?;
        columns.push(column.clone());
    }
    DataFrame::new(columns).context("project required columns")
}

/// Read a SAS transport extract into a string frame.
///
/// Numeric cells are formatted without trailing zeros so encounter ids stay
/// joinable against their text form; missing numerics read as empty strings.
fn transport_frame(path: &Path) -> Result<DataFrame> {
    let dataset = read_xpt(path).with_context(|| format!("read transport: {}", path.display()))?;
    let headers: Vec<String> = dataset.columns.iter().map(|c| c.name.clone()).collect();
    let mut rows: Vec<Vec<String>> = Vec::with_capacity(dataset.rows.len());
    for row in &dataset.rows {
        let mut values = Vec::with_capacity(headers.len());
        for cell in row {
            values.push(match cell {
                XptValue::Char(s) => s.clone(),
                XptValue::Num(NumericValue::Value(v)) => format_numeric(*v),
                XptValue::Num(NumericValue::Missing(_)) => String::new(),
            });
        }
        rows.push(values);
    }
    string_frame(&headers, &rows).with_context(|| format!("build frame from {}", path.display()))
}

/// Read an entire SQLite table into a string frame.
fn table_frame(conn: &Connection, table: &str) -> Result<DataFrame> {
    // Table names cannot be bound as parameters; quote and escape instead.
    let quoted = table.replace('"', "\"\"");
    let mut stmt = conn
        .prepare(&format!("SELECT * FROM \"{quoted}\""))
        .with_context(|| format!("select from table '{table}'"))?;
    let headers: Vec<String> = stmt.column_names().iter().map(ToString::to_string).collect();
    let column_count = headers.len();
    let mapped = stmt
        .query_map([], |row| {
            let mut values = Vec::with_capacity(column_count);
            for idx in 0..column_count {
                values.push(sql_value_string(row.get::<_, Value>(idx)?));
            }
            Ok(values)
        })
        .with_context(|| format!("query table '{table}'"))?;
    let mut rows: Vec<Vec<String>> = Vec::new();
    for row in mapped {
        rows.push(row.with_context(|| format!("read row from table '{table}'"))?);
    }
    string_frame(&headers, &rows).with_context(|| format!("build frame from table '{table}'"))
}

fn sql_value_string(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Integer(v) => v.to_string(),
        Value::Real(v) => format_numeric(v),
        Value::Text(s) => s,
        Value::Blob(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
    }
}
