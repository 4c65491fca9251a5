use std::path::PathBuf;

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use mhnav_core::BuildStats;

use crate::types::BuildRunResult;

pub fn print_summary(result: &BuildRunResult) {
    println!("Run: {}", result.timestamp);
    if let Some(dir) = &result.run_dir {
        println!("Output: {}", dir.display());
    }
    if let Some(db) = &result.database {
        println!("Database: {}", db.display());
    }
    let stats = &result.stats;
    println!(
        "Index: {} rows read, {} encounters retained ({} rows)",
        stats.index_rows, stats.retained_encounters, stats.limited_index_rows
    );
    println!(
        "Historical: {} rows read, {} in scope",
        stats.historical_rows, stats.limited_historical_rows
    );
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Table"),
        header_cell("Rows"),
        header_cell("CSV"),
        header_cell("Database"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    for summary in &result.tables {
        table.add_row(vec![
            Cell::new(&summary.name)
                .fg(Color::Blue)
                .add_attribute(Attribute::Bold),
            Cell::new(summary.rows),
            file_cell(summary.csv.as_ref()),
            match &summary.db_table {
                Some(name) => Cell::new(name),
                None => dim_cell("-"),
            },
        ]);
    }
    println!("{table}");
    print_replacements(stats);
}

fn print_replacements(stats: &BuildStats) {
    let rows: Vec<(&str, &str, u64)> = stats
        .index_replacements
        .iter()
        .map(|(pattern, count)| ("index", pattern.as_str(), *count))
        .chain(
            stats
                .historical_replacements
                .iter()
                .map(|(pattern, count)| ("historical", pattern.as_str(), *count)),
        )
        .collect();
    if rows.is_empty() {
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Dataset"),
        header_cell("Pattern"),
        header_cell("Notes"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 2, CellAlignment::Right);
    for (dataset, pattern, count) in rows {
        table.add_row(vec![Cell::new(dataset), Cell::new(pattern), Cell::new(count)]);
    }
    println!();
    println!("Replacements:");
    println!("{table}");
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn file_cell(path: Option<&PathBuf>) -> Cell {
    match path {
        Some(path) => match path.file_name().and_then(|name| name.to_str()) {
            Some(name) => Cell::new(name),
            None => Cell::new(path.display().to_string()),
        },
        None => dim_cell("-"),
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
