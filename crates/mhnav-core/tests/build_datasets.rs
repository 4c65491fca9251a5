//! End-to-end tests for the dataset-building pipeline on in-memory frames.

use polars::prelude::DataFrame;

use mhnav_clean::CompiledRules;
use mhnav_core::{BuildInput, BuiltTables, build_datasets};
use mhnav_ingest::{DatasetSource, column_value_string, string_frame};
use mhnav_match::ConceptRuleset;
use mhnav_model::{DatasetError, columns};

/// Index rows: (studyid, pat_enc_csn_id, note_date, note_text, start, end).
fn index_source(rows: &[[&str; 6]]) -> DatasetSource {
    let headers: Vec<String> = [
        columns::STUDYID,
        columns::PAT_ENC_CSN_ID,
        columns::NOTE_DATE,
        columns::NOTE_TEXT,
        columns::START_DATE,
        columns::END_DATE,
    ]
    .iter()
    .map(|c| (*c).to_string())
    .collect();
    DatasetSource::Frame(frame(&headers, rows))
}

/// Historical rows: index columns plus the back-reference in third place.
fn historical_source(rows: &[[&str; 7]]) -> DatasetSource {
    let headers: Vec<String> = [
        columns::STUDYID,
        columns::PAT_ENC_CSN_ID,
        columns::INDEX_PAT_ENC_CSN_ID,
        columns::NOTE_DATE,
        columns::NOTE_TEXT,
        columns::START_DATE,
        columns::END_DATE,
    ]
    .iter()
    .map(|c| (*c).to_string())
    .collect();
    DatasetSource::Frame(frame(&headers, rows))
}

fn frame<const N: usize>(headers: &[String], rows: &[[&str; N]]) -> DataFrame {
    let rows: Vec<Vec<String>> = rows
        .iter()
        .map(|row| row.iter().map(|v| (*v).to_string()).collect())
        .collect();
    string_frame(headers, &rows).expect("build test frame")
}

fn ruleset() -> ConceptRuleset {
    ConceptRuleset::parse("GEN_SUIC\tsuicidal\nGEN_ANX\tanxious\n").expect("parse test rules")
}

fn run(index: &DatasetSource, historical: &DatasetSource, context: usize) -> BuiltTables {
    build_datasets(BuildInput {
        index,
        historical,
        ruleset: &ruleset(),
        cleaning: &CompiledRules::default(),
        include_context: context,
        input_db: None,
    })
    .expect("build datasets")
}

fn row(df: &DataFrame, idx: usize, names: &[&str]) -> Vec<String> {
    names
        .iter()
        .map(|name| column_value_string(df, name, idx))
        .collect()
}

#[test]
fn one_index_hit_flows_into_every_table() {
    let index = index_source(&[[
        "9",
        "1",
        "2020-01-10",
        "Patient reports suicidal thoughts.",
        "2019-01-11",
        "2020-01-09",
    ]]);
    let historical = historical_source(&[[
        "9",
        "2",
        "1",
        "2019-06-01",
        "Patient seemed anxious at pickup.",
        "2019-01-11",
        "2020-01-09",
    ]]);

    let tables = run(&index, &historical, 0);

    assert_eq!(tables.positive.height(), 1);
    assert_eq!(
        row(
            &tables.positive,
            0,
            &[columns::PAT_ENC_CSN_ID, columns::NOTE_COUNT]
        ),
        vec!["1", "1"]
    );
    assert_eq!(tables.model.height(), 1);
    assert_eq!(
        row(
            &tables.model,
            0,
            &[
                columns::INDEX_PAT_ENC_CSN_ID,
                columns::NOTE_DATE,
                columns::CONCEPT_TERM
            ]
        ),
        vec!["1", "2019-06-01", "anxiety"]
    );
    assert_eq!(tables.index.height(), 1);
    assert_eq!(
        row(
            &tables.index,
            0,
            &[
                columns::PAT_ENC_CSN_ID,
                columns::NOTE_DATE,
                columns::CONCEPT_TERM,
                columns::TEXT_STRING
            ]
        ),
        vec!["1", "2020-01-10", "suicide", "suicidal"]
    );
    assert!(tables.regex.is_none());
    assert_eq!(tables.stats.index_rows, 1);
    assert_eq!(tables.stats.retained_encounters, 1);
    assert_eq!(tables.stats.limited_historical_rows, 1);
}

#[test]
fn out_of_window_notes_drop_from_model_but_keep_the_encounter() {
    let index = index_source(&[[
        "9",
        "1",
        "2020-01-10",
        "suicidal ideation noted",
        "2019-01-11",
        "2020-01-09",
    ]]);
    // Note written after the window closed.
    let historical = historical_source(&[[
        "9",
        "2",
        "1",
        "2020-06-01",
        "still anxious",
        "2019-01-11",
        "2020-01-09",
    ]]);

    let tables = run(&index, &historical, 0);

    assert_eq!(tables.model.height(), 0);
    assert_eq!(
        row(
            &tables.positive,
            0,
            &[columns::PAT_ENC_CSN_ID, columns::NOTE_COUNT]
        ),
        vec!["1", "0"]
    );
}

#[test]
fn index_own_notes_count_toward_positive_but_not_the_model() {
    let index = index_source(&[[
        "9",
        "1",
        "2020-01-10",
        "suicidal ideation noted",
        "2019-01-11",
        "2020-01-09",
    ]]);
    // The index encounter's own earlier note: same encounter id both ways.
    let historical = historical_source(&[[
        "9",
        "1",
        "1",
        "2019-06-01",
        "anxious all week",
        "2019-01-11",
        "2020-01-09",
    ]]);

    let tables = run(&index, &historical, 0);

    assert_eq!(tables.model.height(), 0);
    assert_eq!(
        row(
            &tables.positive,
            0,
            &[columns::PAT_ENC_CSN_ID, columns::NOTE_COUNT]
        ),
        vec!["1", "1"]
    );
}

#[test]
fn encounters_without_index_hits_are_limited_away() {
    let index = index_source(&[
        [
            "9",
            "1",
            "2020-01-10",
            "suicidal ideation noted",
            "2019-01-11",
            "2020-01-09",
        ],
        [
            "9",
            "5",
            "2020-02-01",
            "routine followup",
            "2019-02-02",
            "2020-01-31",
        ],
    ]);
    let historical = historical_source(&[
        [
            "9",
            "2",
            "1",
            "2019-06-01",
            "anxious at pickup",
            "2019-01-11",
            "2020-01-09",
        ],
        [
            "9",
            "6",
            "5",
            "2019-07-01",
            "anxious on the bus",
            "2019-02-02",
            "2020-01-31",
        ],
    ]);

    let tables = run(&index, &historical, 0);

    assert_eq!(tables.stats.retained_encounters, 1);
    assert_eq!(tables.stats.limited_index_rows, 1);
    assert_eq!(tables.stats.limited_historical_rows, 1);
    assert_eq!(tables.positive.height(), 1);
    assert_eq!(
        column_value_string(&tables.positive, columns::PAT_ENC_CSN_ID, 0),
        "1"
    );
    assert_eq!(tables.model.height(), 1);
}

#[test]
fn positive_counts_distinct_note_dates_per_encounter() {
    let index = index_source(&[[
        "9",
        "1",
        "2020-01-10",
        "suicidal ideation noted",
        "2019-01-11",
        "2020-01-09",
    ]]);
    // Two notes on one day and one on another: two distinct note days.
    let historical = historical_source(&[
        [
            "9", "2", "1", "2019-06-01", "anxious in the morning", "2019-01-11", "2020-01-09",
        ],
        [
            "9", "3", "1", "2019-06-01", "anxious again later", "2019-01-11", "2020-01-09",
        ],
        [
            "9", "4", "1", "2019-08-15", "anxious at followup", "2019-01-11", "2020-01-09",
        ],
    ]);

    let tables = run(&index, &historical, 0);

    assert_eq!(
        row(
            &tables.positive,
            0,
            &[columns::PAT_ENC_CSN_ID, columns::NOTE_COUNT]
        ),
        vec!["1", "2"]
    );
}

#[test]
fn context_mode_adds_the_audit_table() {
    let index = index_source(&[[
        "9",
        "1",
        "2020-01-10",
        "suicidal ideation noted",
        "2019-01-11",
        "2020-01-09",
    ]]);
    let historical = historical_source(&[[
        "9",
        "2",
        "1",
        "2019-06-01",
        "anxious at pickup",
        "2019-01-11",
        "2020-01-09",
    ]]);

    let tables = run(&index, &historical, 5);

    let regex = tables.regex.expect("audit table in context mode");
    assert_eq!(regex.height(), 2);
    let tags: Vec<String> = (0..2)
        .map(|i| column_value_string(&regex, columns::IS_INDEX, i))
        .collect();
    assert_eq!(tags, vec!["1", "0"]);
    assert!(regex.column(columns::PRECONTEXT).is_ok());
}

#[test]
fn missing_required_column_fails_the_run() {
    // No note_text column at all.
    let headers: Vec<String> = [
        columns::STUDYID,
        columns::PAT_ENC_CSN_ID,
        columns::NOTE_DATE,
        columns::START_DATE,
        columns::END_DATE,
    ]
    .iter()
    .map(|c| (*c).to_string())
    .collect();
    let index = DatasetSource::Frame(frame(&headers, &[["9", "1", "2020-01-10", "a", "b"]]));
    let historical = historical_source(&[]);

    let err = build_datasets(BuildInput {
        index: &index,
        historical: &historical,
        ruleset: &ruleset(),
        cleaning: &CompiledRules::default(),
        include_context: 0,
        input_db: None,
    })
    .expect_err("missing column must fail");

    let dataset_err = err
        .downcast_ref::<DatasetError>()
        .expect("dataset error in the chain");
    assert_eq!(
        format!("{dataset_err}"),
        "dataset 'index' is missing required columns: note_text"
    );
}
