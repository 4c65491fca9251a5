//! Construction of the relational output tables.
//!
//! Builders take the joined matcher frames and reshape them into the
//! tables downstream modeling consumes. Each builder owns one dedup or
//! grouping contract and logs its output cardinality; none of them mutate
//! their inputs.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::{Context, Result};
use polars::prelude::{BooleanChunked, Column, DataFrame, NamedFrom, NewChunkedArray, Series};
use tracing::info;

use mhnav_ingest::{column_trimmed_values, column_value_string, drop_duplicate_rows};
use mhnav_model::columns;

use crate::joiner::distinct_column_values;

/// Build the positive/negative label table.
///
/// Counts, per index encounter, the distinct `note_date`s carrying at
/// least one historical hit in `results`, then lays the counts over the
/// full universe of index encounters in `limited` so zero-hit encounters
/// still get a row. One row per index encounter; the identifier column is
/// named `pat_enc_csn_id` as downstream models expect.
pub fn build_positive_table(results: &DataFrame, limited: &DataFrame) -> Result<DataFrame> {
    let hit_encounters = column_trimmed_values(results, columns::INDEX_PAT_ENC_CSN_ID)
        .context("column 'index_pat_enc_csn_id' not found in results")?;
    let hit_dates = column_trimmed_values(results, columns::NOTE_DATE)
        .context("column 'note_date' not found in results")?;
    let mut dates_by_encounter: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for (encounter, date) in hit_encounters.into_iter().zip(hit_dates) {
        dates_by_encounter.entry(encounter).or_default().insert(date);
    }

    let universe = distinct_column_values(limited, columns::INDEX_PAT_ENC_CSN_ID)?;
    let mut encounters: Vec<String> = Vec::with_capacity(universe.len());
    let mut counts: Vec<i64> = Vec::with_capacity(universe.len());
    for encounter in universe {
        let count = dates_by_encounter
            .get(&encounter)
            .map_or(0, |dates| dates.len() as i64);
        counts.push(count);
        encounters.push(encounter);
    }

    let with_hits = counts.iter().filter(|count| **count > 0).count();
    let total_note_days: i64 = counts.iter().sum();
    let table = DataFrame::new(vec![
        Series::new(columns::PAT_ENC_CSN_ID.into(), encounters).into(),
        Series::new(columns::NOTE_COUNT.into(), counts).into(),
    ])
    .context("build positive table")?;
    info!(
        rows = table.height(),
        with_hits, total_note_days, "built positive table"
    );
    Ok(table)
}

/// Build the historical concept-mention table.
///
/// Keeps labeled rows, projects
/// `(index_pat_enc_csn_id, note_date, concept_term)`, deduplicates.
pub fn build_model_table(concepts: &DataFrame) -> Result<DataFrame> {
    let labeled = keep_labeled_rows(concepts)?;
    let projected = project_columns(
        &labeled,
        &[
            columns::INDEX_PAT_ENC_CSN_ID,
            columns::NOTE_DATE,
            columns::CONCEPT_TERM,
        ],
    )?;
    let table = drop_duplicate_rows(&projected)?;
    let encounters = distinct_column_values(&table, columns::INDEX_PAT_ENC_CSN_ID)?.len();
    info!(rows = table.height(), encounters, "built model table");
    Ok(table)
}

/// Build the index concept-mention table.
///
/// Keeps labeled rows, projects
/// `(pat_enc_csn_id, note_date, concept_term, capture)` with the capture
/// renamed to `text_string`, deduplicates.
pub fn build_index_table(concepts: &DataFrame) -> Result<DataFrame> {
    let labeled = keep_labeled_rows(concepts)?;
    let mut projected: Vec<Column> = Vec::with_capacity(4);
    for name in [
        columns::PAT_ENC_CSN_ID,
        columns::NOTE_DATE,
        columns::CONCEPT_TERM,
    ] {
        let column = labeled
            .column(name)
            .with_context(|| format!("column '{name}' not found"))?;
        projected.push(column.clone());
    }
    let capture = labeled
        .column(columns::CAPTURE)
        .context("column 'capture' not found")?;
    projected.push(capture.clone().with_name(columns::TEXT_STRING.into()));
    let projected = DataFrame::new(projected).context("project index table columns")?;
    let table = drop_duplicate_rows(&projected)?;
    let encounters = distinct_column_values(&table, columns::PAT_ENC_CSN_ID)?.len();
    info!(rows = table.height(), encounters, "built index table");
    Ok(table)
}

/// Build the matcher audit table from the pre-join classified frames.
///
/// Stacks the index arm over the historical arm with their column union;
/// columns missing from one arm read as empty there. `is_index` marks
/// which arm each row came from.
pub fn build_regex_table(
    index_concepts: &DataFrame,
    historical_concepts: &DataFrame,
) -> Result<DataFrame> {
    let mut names: Vec<String> = index_concepts
        .get_column_names_owned()
        .iter()
        .map(ToString::to_string)
        .collect();
    for name in historical_concepts.get_column_names_owned() {
        if !names.iter().any(|existing| existing == name.as_str()) {
            names.push(name.to_string());
        }
    }

    let index_hits = index_concepts.height();
    let historical_hits = historical_concepts.height();
    let mut stacked: Vec<Column> = Vec::with_capacity(names.len() + 1);
    for name in &names {
        let mut values: Vec<String> = Vec::with_capacity(index_hits + historical_hits);
        for idx in 0..index_hits {
            values.push(column_value_string(index_concepts, name, idx));
        }
        for idx in 0..historical_hits {
            values.push(column_value_string(historical_concepts, name, idx));
        }
        stacked.push(Series::new(name.as_str().into(), values).into());
    }
    let mut tags = vec![true; index_hits];
    tags.resize(index_hits + historical_hits, false);
    stacked.push(Series::new(columns::IS_INDEX.into(), tags).into());

    let table = DataFrame::new(stacked).context("build regex audit table")?;
    info!(
        rows = table.height(),
        index_hits, historical_hits, "built regex audit table"
    );
    Ok(table)
}

/// Keep rows with a non-empty `concept_term`.
fn keep_labeled_rows(df: &DataFrame) -> Result<DataFrame> {
    let labels = column_trimmed_values(df, columns::CONCEPT_TERM)
        .context("column 'concept_term' not found")?;
    let keep: Vec<bool> = labels.iter().map(|label| !label.is_empty()).collect();
    let mask = BooleanChunked::from_slice("labeled".into(), &keep);
    df.filter(&mask).context("drop unlabeled rows")
}

fn project_columns(df: &DataFrame, names: &[&str]) -> Result<DataFrame> {
    let mut out: Vec<Column> = Vec::with_capacity(names.len());
    for name in names {
        let column = df
            .column(name)
            .with_context(|| format!("column '{name}' not found"))?;
        out.push(column.clone());
    }
    DataFrame::new(out).context("project columns")
}
