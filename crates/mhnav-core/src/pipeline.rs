//! The dataset-building pipeline with explicit stages.
//!
//! The pipeline follows these stages in order:
//! 1. **Load**: read and validate the index and historical datasets
//! 2. **Clean**: scrub note text, draining the replacement tracker per dataset
//! 3. **Match**: scan index notes, limit both datasets to encounters with
//!    hits, then scan the surviving historical notes
//! 4. **Join**: attach hits back onto encounter metadata, enforce the date
//!    window, drop index self-matches
//! 5. **Build**: assemble the positive, model, index, and optional audit
//!    tables
//!
//! Writing the tables out is the caller's concern; the pipeline returns the
//! frames plus per-stage row counts for the run summary.

use std::time::Instant;

use anyhow::{Context, Result};
use polars::prelude::DataFrame;
use rusqlite::Connection;
use tracing::{debug, info, info_span};

use mhnav_clean::{CompiledRules, ReplacementTracker, clean_note_column};
use mhnav_ingest::{DatasetSource, read_dataset};
use mhnav_match::{ConceptRuleset, apply_and_merge};
use mhnav_model::{DatasetSchema, columns};

use crate::joiner::{
    attach_results, distinct_column_values, filter_column_isin, remove_index_dates,
};
use crate::table_builder::{
    build_index_table, build_model_table, build_positive_table, build_regex_table,
};

/// Join keys for re-attaching historical hits to their encounters.
const HISTORICAL_JOIN_KEYS: [&str; 6] = [
    columns::STUDYID,
    columns::PAT_ENC_CSN_ID,
    columns::INDEX_PAT_ENC_CSN_ID,
    columns::START_DATE,
    columns::END_DATE,
    columns::NOTE_DATE,
];

/// Join keys for re-attaching index hits; the index dataset carries no
/// back-reference column.
const INDEX_JOIN_KEYS: [&str; 5] = [
    columns::STUDYID,
    columns::PAT_ENC_CSN_ID,
    columns::START_DATE,
    columns::END_DATE,
    columns::NOTE_DATE,
];

/// Everything one dataset-building run needs.
pub struct BuildInput<'a> {
    /// Where the index encounter dataset comes from.
    pub index: &'a DatasetSource,
    /// Where the historical encounter dataset comes from.
    pub historical: &'a DatasetSource,
    /// Concept rules to scan with.
    pub ruleset: &'a ConceptRuleset,
    /// Compiled note-text cleaning rules.
    pub cleaning: &'a CompiledRules,
    /// Per-side context capture width in characters; zero disables the
    /// audit table.
    pub include_context: usize,
    /// Open connection for table-name dataset references.
    pub input_db: Option<&'a Connection>,
}

/// Output tables of one run.
#[derive(Debug)]
pub struct BuiltTables {
    /// Per-index-encounter distinct-note-date counts.
    pub positive: DataFrame,
    /// Historical concept mentions.
    pub model: DataFrame,
    /// Index-encounter concept mentions with captured text.
    pub index: DataFrame,
    /// Matcher audit union; only built when context capture is on.
    pub regex: Option<DataFrame>,
    /// Row counts and replacement audits collected along the way.
    pub stats: BuildStats,
}

/// Row counts collected as the pipeline runs, for the run summary.
#[derive(Debug, Clone, Default)]
pub struct BuildStats {
    /// Index rows as loaded.
    pub index_rows: usize,
    /// Historical rows as loaded.
    pub historical_rows: usize,
    /// Index encounters with at least one concept hit.
    pub retained_encounters: usize,
    /// Index rows surviving the limiting step.
    pub limited_index_rows: usize,
    /// Historical rows surviving the limiting step.
    pub limited_historical_rows: usize,
    /// Cleaning replacement counts drained after the index dataset.
    pub index_replacements: Vec<(String, u64)>,
    /// Cleaning replacement counts drained after the historical dataset.
    pub historical_replacements: Vec<(String, u64)>,
}

/// Run the full pipeline and return the output tables.
pub fn build_datasets(input: BuildInput<'_>) -> Result<BuiltTables> {
    let run_start = Instant::now();
    let run_span = info_span!("build_datasets");
    let _run_guard = run_span.enter();
    info!("building encounter datasets");

    let mut stats = BuildStats::default();
    let mut tracker = ReplacementTracker::new();

    let (index_df, index_replacements) = load_and_clean(
        &DatasetSchema::index(),
        input.index,
        input.input_db,
        input.cleaning,
        &mut tracker,
    )?;
    let (historical_df, historical_replacements) = load_and_clean(
        &DatasetSchema::historical(),
        input.historical,
        input.input_db,
        input.cleaning,
        &mut tracker,
    )?;
    stats.index_rows = index_df.height();
    stats.historical_rows = historical_df.height();
    stats.index_replacements = index_replacements;
    stats.historical_replacements = historical_replacements;

    // Scan index notes, then keep only encounters that produced a hit.
    let index_concepts = info_span!("match", dataset = "index").in_scope(|| -> Result<_> {
        let start = Instant::now();
        let output = apply_and_merge(&index_df, input.ruleset, input.include_context)
            .context("scan index notes")?;
        debug!(
            results = output.results.height(),
            classified = output.classified.height(),
            duration_ms = start.elapsed().as_millis(),
            "index scan complete"
        );
        Ok(output.classified)
    })?;

    let retained = distinct_column_values(&index_concepts, columns::PAT_ENC_CSN_ID)
        .context("collect retained encounter ids")?;
    let index_lmt = filter_column_isin(&index_df, columns::PAT_ENC_CSN_ID, &retained)?;
    let historical_lmt =
        filter_column_isin(&historical_df, columns::INDEX_PAT_ENC_CSN_ID, &retained)?;
    stats.retained_encounters = retained.len();
    stats.limited_index_rows = index_lmt.height();
    stats.limited_historical_rows = historical_lmt.height();
    info!(
        retained_encounters = retained.len(),
        index_rows = index_lmt.height(),
        historical_rows = historical_lmt.height(),
        "limited datasets to encounters with index hits"
    );

    // Scan the surviving historical notes.
    let historical_match =
        info_span!("match", dataset = "historical").in_scope(|| -> Result<_> {
            let start = Instant::now();
            let output = apply_and_merge(&historical_lmt, input.ruleset, input.include_context)
                .context("scan historical notes")?;
            debug!(
                results = output.results.height(),
                classified = output.classified.height(),
                duration_ms = start.elapsed().as_millis(),
                "historical scan complete"
            );
            Ok(output)
        })?;
    let historical_results = historical_match.results;
    let historical_concepts = historical_match.classified;

    // Attach hits back onto encounter metadata. The historical attaches
    // enforce the look-back window; an index note's own date lies outside
    // that window by construction, so the index attach skips the filter.
    let (attached_results, attached_concepts, attached_index) =
        info_span!("join").in_scope(|| -> Result<_> {
            let start = Instant::now();
            let attached_results = attach_results(
                &historical_lmt,
                &historical_results,
                &HISTORICAL_JOIN_KEYS,
                false,
            )
            .context("attach historical results")?;
            let concepts = attach_results(
                &historical_lmt,
                &historical_concepts,
                &HISTORICAL_JOIN_KEYS,
                false,
            )
            .context("attach historical concepts")?;
            let attached_concepts = remove_index_dates(&concepts)?;
            let attached_index =
                attach_results(&index_lmt, &index_concepts, &INDEX_JOIN_KEYS, true)
                    .context("attach index concepts")?;
            debug!(
                historical_results = attached_results.height(),
                historical_concepts = attached_concepts.height(),
                index_concepts = attached_index.height(),
                duration_ms = start.elapsed().as_millis(),
                "join complete"
            );
            Ok((attached_results, attached_concepts, attached_index))
        })?;

    // Final tables.
    let (positive, model, index, regex) = info_span!("build").in_scope(|| -> Result<_> {
        let start = Instant::now();
        let positive = build_positive_table(&attached_results, &historical_lmt)?;
        let model = build_model_table(&attached_concepts)?;
        let index = build_index_table(&attached_index)?;
        let regex = if input.include_context > 0 {
            Some(build_regex_table(&index_concepts, &historical_concepts)?)
        } else {
            None
        };
        debug!(duration_ms = start.elapsed().as_millis(), "tables built");
        Ok((positive, model, index, regex))
    })?;

    info!(
        positive_rows = positive.height(),
        model_rows = model.height(),
        index_rows = index.height(),
        duration_ms = run_start.elapsed().as_millis(),
        "datasets built"
    );
    Ok(BuiltTables {
        positive,
        model,
        index,
        regex,
        stats,
    })
}

/// Read one dataset and clean its note text, draining the tracker after.
fn load_and_clean(
    schema: &DatasetSchema,
    source: &DatasetSource,
    input_db: Option<&Connection>,
    cleaning: &CompiledRules,
    tracker: &mut ReplacementTracker,
) -> Result<(DataFrame, Vec<(String, u64)>)> {
    let span = info_span!("load", dataset = schema.name());
    let _guard = span.enter();
    let start = Instant::now();
    let frame = read_dataset(source, schema, input_db)
        .with_context(|| format!("read {} dataset", schema.name()))?;
    let cleaned = clean_note_column(&frame, cleaning, tracker)
        .with_context(|| format!("clean {} note text", schema.name()))?;
    let replacements = tracker.log_and_reset();
    debug!(
        dataset = schema.name(),
        rows = cleaned.height(),
        replacement_rules = replacements.len(),
        duration_ms = start.elapsed().as_millis(),
        "dataset loaded and cleaned"
    );
    Ok((cleaned, replacements))
}
