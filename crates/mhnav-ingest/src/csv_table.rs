use std::path::Path;

use anyhow::{Context, Result};
use csv::ReaderBuilder;

/// A CSV extract held as strings, prior to frame construction.
#[derive(Debug, Clone)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

fn normalize_header(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('\u{feff}');
    let mut parts = trimmed.split_whitespace();
    let mut normalized = String::new();
    if let Some(first) = parts.next() {
        normalized.push_str(first);
        for part in parts {
            normalized.push(' ');
            normalized.push_str(part);
        }
    }
    normalized
}

fn normalize_cell(raw: &str) -> String {
    raw.trim().trim_matches('\u{feff}').to_string()
}

/// Read a CSV extract with the first row as headers.
///
/// Warehouse extracts are machine generated, so no header detection is
/// attempted. Rows are padded or truncated to the header width, and rows
/// that are entirely empty are dropped.
pub fn read_csv_table(path: &Path) -> Result<CsvTable> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("read csv: {}", path.display()))?;
    let mut headers: Vec<String> = Vec::new();
    let mut rows: Vec<Vec<String>> = Vec::new();
    for record in reader.records() {
        let record = record.with_context(|| format!("read record: {}", path.display()))?;
        if headers.is_empty() {
            headers = record.iter().map(normalize_header).collect();
            continue;
        }
        let mut row = Vec::with_capacity(headers.len());
        for idx in 0..headers.len() {
            let value = record.get(idx).unwrap_or("");
            row.push(normalize_cell(value));
        }
        if row.iter().all(|value| value.is_empty()) {
            continue;
        }
        rows.push(row);
    }
    Ok(CsvTable { headers, rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".csv")
            .tempfile()
            .expect("create temp csv");
        file.write_all(contents.as_bytes()).expect("write temp csv");
        file
    }

    #[test]
    fn first_row_becomes_headers() {
        let file = write_temp("studyid,note_text\nS001,feeling anxious\n");
        let table = read_csv_table(file.path()).unwrap();
        assert_eq!(table.headers, vec!["studyid", "note_text"]);
        assert_eq!(table.rows, vec![vec![
            "S001".to_string(),
            "feeling anxious".to_string()
        ]]);
    }

    #[test]
    fn bom_is_stripped_from_first_header() {
        let file = write_temp("\u{feff}studyid,note_text\nS001,ok\n");
        let table = read_csv_table(file.path()).unwrap();
        assert_eq!(table.headers[0], "studyid");
    }

    #[test]
    fn short_rows_pad_and_long_rows_truncate() {
        let file = write_temp("a,b,c\n1,2\n1,2,3,4\n");
        let table = read_csv_table(file.path()).unwrap();
        assert_eq!(table.rows[0], vec!["1", "2", ""]);
        assert_eq!(table.rows[1], vec!["1", "2", "3"]);
    }

    #[test]
    fn blank_rows_are_dropped() {
        let file = write_temp("a,b\n1,2\n,\n3,4\n");
        let table = read_csv_table(file.path()).unwrap();
        assert_eq!(table.rows.len(), 2);
    }

    #[test]
    fn quoted_newlines_stay_inside_one_cell() {
        let file = write_temp("id,note_text\n1,\"line one\nline two\"\n");
        let table = read_csv_table(file.path()).unwrap();
        assert_eq!(table.rows[0][1], "line one\nline two");
    }
}
