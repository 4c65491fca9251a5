use std::path::PathBuf;

use mhnav_core::BuildStats;

#[derive(Debug)]
pub struct BuildRunResult {
    pub timestamp: String,
    pub run_dir: Option<PathBuf>,
    pub database: Option<PathBuf>,
    pub tables: Vec<TableSummary>,
    pub stats: BuildStats,
}

#[derive(Debug)]
pub struct TableSummary {
    pub name: String,
    pub rows: usize,
    pub csv: Option<PathBuf>,
    pub db_table: Option<String>,
}
