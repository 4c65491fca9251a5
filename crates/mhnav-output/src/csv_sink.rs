//! CSV file outputs for one pipeline run.
//!
//! All CSVs from a run land in one run directory named after the shared
//! timestamp. Files carry a header row and never an index column; cells are
//! written as their string form.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use polars::prelude::DataFrame;
use tracing::info;

use mhnav_ingest::column_value_string;

/// Create and return the run output directory `outpath/{timestamp}`.
pub fn run_output_dir(outpath: &Path, timestamp: &str) -> Result<PathBuf> {
    let dir = outpath.join(timestamp);
    fs::create_dir_all(&dir)
        .with_context(|| format!("create output directory {}", dir.display()))?;
    Ok(dir)
}

/// Write one frame as a CSV file with a header row.
pub fn write_table_csv(path: &Path, df: &DataFrame) -> Result<()> {
    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut writer = csv::Writer::from_writer(BufWriter::new(file));
    let names = df.get_column_names_owned();
    writer
        .write_record(names.iter().map(|name| name.as_str()))
        .context("write csv header")?;
    for idx in 0..df.height() {
        let record: Vec<String> = names
            .iter()
            .map(|name| column_value_string(df, name.as_str(), idx))
            .collect();
        writer
            .write_record(&record)
            .with_context(|| format!("write csv row {idx}"))?;
    }
    writer
        .flush()
        .with_context(|| format!("flush {}", path.display()))?;
    Ok(())
}

/// Write every table into the run directory as `{name}.csv`, returning the
/// paths in input order.
pub fn write_csv_outputs(dir: &Path, tables: &[(String, &DataFrame)]) -> Result<Vec<PathBuf>> {
    let mut outputs = Vec::with_capacity(tables.len());
    for (name, df) in tables {
        let path = dir.join(format!("{name}.csv"));
        write_table_csv(&path, df)?;
        info!(table = %name, rows = df.height(), path = %path.display(), "wrote csv");
        outputs.push(path);
    }
    Ok(outputs)
}
