//! Integration tests for the deline tool.

use mhnav_cli::deline::{DelineColumns, deline_file, deline_frame};
use mhnav_ingest::{column_value_string, read_csv_table, string_frame};
use polars::prelude::DataFrame;

fn extract(headers: &[&str], rows: &[&[&str]]) -> DataFrame {
    let headers: Vec<String> = headers.iter().map(ToString::to_string).collect();
    let rows: Vec<Vec<String>> = rows
        .iter()
        .map(|row| row.iter().map(ToString::to_string).collect())
        .collect();
    string_frame(&headers, &rows).expect("build extract frame")
}

fn note_columns() -> DelineColumns<'static> {
    DelineColumns {
        group_by: "note_id",
        line_column: "note_line",
        text_column: "note_text",
    }
}

#[test]
fn lines_join_in_row_order_and_keep_the_max_counter() {
    let df = extract(
        &["note_id", "note_line", "note_text"],
        &[
            &["1", "1", "Patient arrived late."],
            &["1", "2", "Reports poor sleep."],
            &["1", "3", "Plan: follow up."],
            &["2", "1", "No show."],
        ],
    );
    let out = deline_frame(&df, &note_columns()).unwrap();
    assert_eq!(out.height(), 2);
    assert_eq!(column_value_string(&out, "note_id", 0), "1");
    assert_eq!(column_value_string(&out, "note_line", 0), "3");
    assert_eq!(
        column_value_string(&out, "note_text", 0),
        "Patient arrived late.\nReports poor sleep.\nPlan: follow up."
    );
    assert_eq!(column_value_string(&out, "note_text", 1), "No show.");
}

#[test]
fn line_counters_compare_numerically() {
    let df = extract(
        &["note_id", "note_line", "note_text"],
        &[&["1", "9", "ninth line"], &["1", "10", "tenth line"]],
    );
    let out = deline_frame(&df, &note_columns()).unwrap();
    assert_eq!(column_value_string(&out, "note_line", 0), "10");
}

#[test]
fn notes_order_numerically_in_the_output() {
    let df = extract(
        &["note_id", "note_line", "note_text"],
        &[&["10", "1", "tenth note"], &["2", "1", "second note"]],
    );
    let out = deline_frame(&df, &note_columns()).unwrap();
    assert_eq!(column_value_string(&out, "note_id", 0), "2");
    assert_eq!(column_value_string(&out, "note_id", 1), "10");
}

#[test]
fn metadata_comes_from_the_max_line_row() {
    let df = extract(
        &["note_id", "note_line", "note_text", "note_status"],
        &[
            &["1", "1", "Draft text.", "draft"],
            &["1", "2", "Final text.", "signed"],
        ],
    );
    let out = deline_frame(&df, &note_columns()).unwrap();
    assert_eq!(out.height(), 1);
    assert_eq!(column_value_string(&out, "note_status", 0), "signed");
}

#[test]
fn conflicting_metadata_on_the_max_line_fans_out() {
    let df = extract(
        &["note_id", "note_line", "note_text", "author"],
        &[
            &["1", "1", "First.", "smith"],
            &["1", "1", "First again.", "jones"],
        ],
    );
    let out = deline_frame(&df, &note_columns()).unwrap();
    assert_eq!(out.height(), 2);
    assert_eq!(
        column_value_string(&out, "note_text", 0),
        "First.\nFirst again."
    );
    assert_eq!(column_value_string(&out, "author", 0), "smith");
    assert_eq!(column_value_string(&out, "author", 1), "jones");
}

#[test]
fn output_puts_the_note_columns_first() {
    let df = extract(
        &["visit_id", "note_text", "note_id", "note_line"],
        &[&["v9", "text", "1", "1"]],
    );
    let out = deline_frame(&df, &note_columns()).unwrap();
    let names: Vec<String> = out
        .get_column_names_owned()
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(names, vec!["note_id", "note_line", "note_text", "visit_id"]);
}

#[test]
fn missing_column_is_reported_by_name() {
    let df = extract(&["note_id", "note_text"], &[&["1", "text"]]);
    let err = deline_frame(&df, &note_columns()).unwrap_err();
    assert_eq!(err.to_string(), "column 'note_line' not found in extract");
}

#[test]
fn deline_file_round_trips_through_csv() {
    let dir = tempfile::tempdir().expect("create temp dir");
    let input = dir.path().join("notes.csv");
    std::fs::write(
        &input,
        "note_id,note_line,note_text\n1,1,seen today\n1,2,follow up in two weeks\n",
    )
    .expect("write input csv");
    let outfile = dir.path().join("delined.csv");

    let outcome = deline_file(&input, &outfile, &note_columns()).unwrap();
    assert_eq!(outcome.input_rows, 2);
    assert_eq!(outcome.output_rows, 1);
    assert_eq!(outcome.notes, 1);

    let table = read_csv_table(&outfile).unwrap();
    assert_eq!(table.headers, vec!["note_id", "note_line", "note_text"]);
    assert_eq!(table.rows.len(), 1);
    assert_eq!(table.rows[0][1], "2");
    assert_eq!(table.rows[0][2], "seen today\nfollow up in two weeks");
}
