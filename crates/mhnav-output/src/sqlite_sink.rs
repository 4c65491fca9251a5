//! SQLite table outputs.
//!
//! Each table writes inside one transaction: drop (when overwriting),
//! create, inserts, commit. Value columns keep TEXT affinity except counts
//! and the audit tag, which are INTEGER.

use anyhow::{Context, Result};
use polars::prelude::{DataFrame, DataType};
use rusqlite::{Connection, params_from_iter};
use tracing::info;

use mhnav_ingest::column_value_string;
use mhnav_model::DatasetError;

/// Whether `name` exists as a table in the connected database.
pub fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    let mut stmt = conn
        .prepare("SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1")
        .context("prepare table existence query")?;
    stmt.exists([name]).context("query table existence")
}

fn column_affinity(dtype: &DataType) -> &'static str {
    match dtype {
        DataType::Boolean
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt32
        | DataType::UInt64 => "INTEGER",
        _ => "TEXT",
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Write one frame as table `name`.
///
/// An existing table is an error unless `overwrite` is set, in which case
/// it is dropped and recreated inside the same transaction as the inserts.
pub fn write_table_sqlite(
    conn: &Connection,
    name: &str,
    df: &DataFrame,
    overwrite: bool,
) -> Result<()> {
    let exists = table_exists(conn, name)?;
    if exists && !overwrite {
        return Err(DatasetError::table_exists(name).into());
    }

    let quoted = quote_ident(name);
    let tx = conn
        .unchecked_transaction()
        .with_context(|| format!("begin transaction for '{name}'"))?;
    if exists {
        tx.execute(&format!("DROP TABLE {quoted}"), [])
            .with_context(|| format!("drop table '{name}'"))?;
    }
    let column_defs: Vec<String> = df
        .get_columns()
        .iter()
        .map(|column| {
            format!(
                "{} {}",
                quote_ident(column.name().as_str()),
                column_affinity(column.dtype())
            )
        })
        .collect();
    tx.execute(
        &format!("CREATE TABLE {quoted} ({})", column_defs.join(", ")),
        [],
    )
    .with_context(|| format!("create table '{name}'"))?;

    let names = df.get_column_names_owned();
    let placeholders: Vec<String> = (1..=names.len()).map(|n| format!("?{n}")).collect();
    {
        let mut stmt = tx
            .prepare(&format!(
                "INSERT INTO {quoted} VALUES ({})",
                placeholders.join(", ")
            ))
            .with_context(|| format!("prepare insert for '{name}'"))?;
        for idx in 0..df.height() {
            let record: Vec<String> = names
                .iter()
                .map(|column| column_value_string(df, column.as_str(), idx))
                .collect();
            stmt.execute(params_from_iter(record.iter()))
                .with_context(|| format!("insert row {idx} into '{name}'"))?;
        }
    }
    tx.commit().with_context(|| format!("commit table '{name}'"))?;
    info!(table = name, rows = df.height(), "wrote sqlite table");
    Ok(())
}

/// Write every table under its run name, honoring the overwrite flag.
pub fn write_sqlite_outputs(
    conn: &Connection,
    tables: &[(String, &DataFrame)],
    overwrite: bool,
) -> Result<()> {
    for (name, df) in tables {
        write_table_sqlite(conn, name, df, overwrite)?;
    }
    Ok(())
}
