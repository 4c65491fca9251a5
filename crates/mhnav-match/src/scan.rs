//! Scanning notes against the ruleset and reshaping hits into frames.

use anyhow::{Context, Result};
use polars::prelude::{AnyValue, Column, DataFrame, NamedFrom, Series};
use tracing::info;

use mhnav_ingest::{any_to_string, column_value_string, drop_duplicate_rows};
use mhnav_model::columns;

use crate::classify::classify_term;
use crate::ruleset::ConceptRuleset;

/// One pattern match in one note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConceptHit {
    /// Row position of the note in the scanned frame.
    pub row: usize,
    pub concept: String,
    pub term: String,
    /// Exact text span the pattern matched.
    pub capture: String,
    /// Characters before the match, captured only in context mode.
    pub precontext: Option<String>,
    /// Characters after the match, captured only in context mode.
    pub postcontext: Option<String>,
}

/// Raw and classified hits merged back onto their source rows.
#[derive(Debug, Clone)]
pub struct MatchOutput {
    /// One row per hit: source row columns plus hit columns, deduplicated.
    pub results: DataFrame,
    /// Results fanned out to one row per matching vocabulary label,
    /// deduplicated. Hits matching no label are absent here.
    pub classified: DataFrame,
}

/// Scan one note. `context` is the per-side context width in characters;
/// zero disables context capture.
pub fn scan_text(
    ruleset: &ConceptRuleset,
    text: &str,
    row: usize,
    context: usize,
) -> Vec<ConceptHit> {
    let mut hits = Vec::new();
    for rule in ruleset.rules() {
        for found in rule.regex().find_iter(text) {
            let (precontext, postcontext) = if context > 0 {
                (
                    Some(chars_before(text, found.start(), context)),
                    Some(chars_after(text, found.end(), context)),
                )
            } else {
                (None, None)
            };
            hits.push(ConceptHit {
                row,
                concept: rule.concept.clone(),
                term: rule.term.clone(),
                capture: found.as_str().to_string(),
                precontext,
                postcontext,
            });
        }
    }
    hits
}

fn chars_before(text: &str, at: usize, width: usize) -> String {
    let tail: Vec<char> = text[..at].chars().rev().take(width).collect();
    tail.into_iter().rev().collect()
}

fn chars_after(text: &str, at: usize, width: usize) -> String {
    text[at..].chars().take(width).collect()
}

/// Scan every `note_text` value of a frame, tagging hits with row positions.
pub fn scan_frame(
    df: &DataFrame,
    ruleset: &ConceptRuleset,
    context: usize,
) -> Result<Vec<ConceptHit>> {
    let column = df
        .column(columns::NOTE_TEXT)
        .context("note_text column missing for matching")?;
    let mut hits = Vec::new();
    for idx in 0..df.height() {
        let text = any_to_string(column.get(idx).unwrap_or(AnyValue::Null));
        if text.is_empty() {
            continue;
        }
        hits.extend(scan_text(ruleset, &text, idx, context));
    }
    Ok(hits)
}

/// Scan a frame and merge the hits back onto their source rows.
///
/// Produces the raw result frame (inner-merge on row position) and the
/// classified frame (fan-out of vocabulary labels), both deduplicated.
pub fn apply_and_merge(
    df: &DataFrame,
    ruleset: &ConceptRuleset,
    context: usize,
) -> Result<MatchOutput> {
    let hits = scan_frame(df, ruleset, context)?;
    let all: Vec<usize> = (0..hits.len()).collect();
    let results = merged_frame(df, &hits, &all, context, None)?;

    let mut fanout: Vec<usize> = Vec::new();
    let mut labels: Vec<String> = Vec::new();
    for (hit_idx, hit) in hits.iter().enumerate() {
        for label in classify_term(&hit.concept, &hit.term) {
            fanout.push(hit_idx);
            labels.push(label.to_string());
        }
    }
    let classified = merged_frame(df, &hits, &fanout, context, Some(labels))?;

    let results = drop_duplicate_rows(&results)?;
    let classified = drop_duplicate_rows(&classified)?;
    info!(
        rows = df.height(),
        hits = hits.len(),
        results = results.height(),
        classified = classified.height(),
        "matched concepts"
    );
    Ok(MatchOutput {
        results,
        classified,
    })
}

/// Source columns repeated per picked hit, then the hit columns, then the
/// label column when classifying.
fn merged_frame(
    df: &DataFrame,
    hits: &[ConceptHit],
    picks: &[usize],
    context: usize,
    labels: Option<Vec<String>>,
) -> Result<DataFrame> {
    let mut frame_columns: Vec<Column> = Vec::new();
    for name in df.get_column_names_owned() {
        let mut values = Vec::with_capacity(picks.len());
        for &hit_idx in picks {
            values.push(column_value_string(df, name.as_str(), hits[hit_idx].row));
        }
        frame_columns.push(Series::new(name.clone(), values).into());
    }

    let ids: Vec<i64> = picks.iter().map(|&h| hits[h].row as i64).collect();
    frame_columns.push(Series::new(columns::HIT_ID.into(), ids).into());
    let concepts: Vec<String> = picks.iter().map(|&h| hits[h].concept.clone()).collect();
    frame_columns.push(Series::new(columns::CONCEPT.into(), concepts).into());
    let terms: Vec<String> = picks.iter().map(|&h| hits[h].term.clone()).collect();
    frame_columns.push(Series::new(columns::TERM.into(), terms).into());
    let captures: Vec<String> = picks.iter().map(|&h| hits[h].capture.clone()).collect();
    frame_columns.push(Series::new(columns::CAPTURE.into(), captures).into());

    if context > 0 {
        let pre: Vec<String> = picks
            .iter()
            .map(|&h| hits[h].precontext.clone().unwrap_or_default())
            .collect();
        frame_columns.push(Series::new(columns::PRECONTEXT.into(), pre).into());
        let post: Vec<String> = picks
            .iter()
            .map(|&h| hits[h].postcontext.clone().unwrap_or_default())
            .collect();
        frame_columns.push(Series::new(columns::POSTCONTEXT.into(), post).into());
    }

    if let Some(labels) = labels {
        frame_columns.push(Series::new(columns::CONCEPT_TERM.into(), labels).into());
    }

    DataFrame::new(frame_columns).context("build hit frame")
}

#[cfg(test)]
mod tests {
    use super::*;
    use mhnav_ingest::string_frame;

    fn notes(texts: &[&str]) -> DataFrame {
        let headers: Vec<String> = vec![
            columns::PAT_ENC_CSN_ID.to_string(),
            columns::NOTE_TEXT.to_string(),
        ];
        let rows: Vec<Vec<String>> = texts
            .iter()
            .enumerate()
            .map(|(i, t)| vec![format!("100{i}"), (*t).to_string()])
            .collect();
        string_frame(&headers, &rows).expect("build notes frame")
    }

    fn ruleset() -> ConceptRuleset {
        ConceptRuleset::parse(
            "GEN_SUIC\tsuicidal\tsuicid(?:al|e)\nGEN_ANX\tanxious\nBEHAV_SYMPT\tacting out\n",
        )
        .expect("parse test rules")
    }

    #[test]
    fn scan_tags_hits_with_row_positions() {
        let df = notes(&["pt anxious today", "no concerns", "SUICIDAL ideation"]);
        let hits = scan_frame(&df, &ruleset(), 0).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].row, 0);
        assert_eq!(hits[0].term, "anxious");
        assert_eq!(hits[1].row, 2);
        assert_eq!(hits[1].capture, "SUICIDAL");
        assert!(hits[0].precontext.is_none());
    }

    #[test]
    fn context_capture_is_char_safe() {
        let hits = scan_text(&ruleset(), "mood \u{e9}tat anxious afterward", 0, 6);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].precontext.as_deref(), Some(" \u{e9}tat "));
        assert_eq!(hits[0].postcontext.as_deref(), Some(" after"));
    }

    #[test]
    fn merge_repeats_source_row_per_hit() {
        let df = notes(&["anxious and acting out"]);
        let output = apply_and_merge(&df, &ruleset(), 0).unwrap();
        assert_eq!(output.results.height(), 2);
        assert_eq!(
            column_value_string(&output.results, columns::PAT_ENC_CSN_ID, 0),
            "1000"
        );
        assert_eq!(
            column_value_string(&output.results, columns::PAT_ENC_CSN_ID, 1),
            "1000"
        );
        assert_eq!(column_value_string(&output.results, columns::HIT_ID, 1), "0");
        assert!(output.results.column(columns::CONCEPT_TERM).is_err());
    }

    #[test]
    fn classification_fans_out_and_drops_unmatched() {
        let rules =
            ConceptRuleset::parse("GEN\tsuicidal ideation and anxiety\tworried\nGEN\tshrug\tshrug\n")
                .unwrap();
        let df = notes(&["pt worried; shrug"]);
        let output = apply_and_merge(&df, &rules, 0).unwrap();
        // one raw hit per rule
        assert_eq!(output.results.height(), 2);
        // the first term carries two labels, the second none
        assert_eq!(output.classified.height(), 2);
        let labels: Vec<String> = (0..2)
            .map(|i| column_value_string(&output.classified, columns::CONCEPT_TERM, i))
            .collect();
        assert_eq!(labels, vec!["anxiety", "suicide"]);
    }

    #[test]
    fn identical_notes_stay_distinct_by_row_id() {
        let headers: Vec<String> = vec![
            columns::PAT_ENC_CSN_ID.to_string(),
            columns::NOTE_TEXT.to_string(),
        ];
        let rows = vec![
            vec!["1000".to_string(), "pt anxious".to_string()],
            vec!["1000".to_string(), "pt anxious".to_string()],
        ];
        let df = string_frame(&headers, &rows).unwrap();
        let output = apply_and_merge(&df, &ruleset(), 0).unwrap();
        // the id column differs between the rows, so dedup keeps both
        assert_eq!(output.results.height(), 2);
    }

    #[test]
    fn passthrough_concept_survives_classification_verbatim() {
        let df = notes(&["acting out in class"]);
        let output = apply_and_merge(&df, &ruleset(), 0).unwrap();
        assert_eq!(output.classified.height(), 1);
        assert_eq!(
            column_value_string(&output.classified, columns::CONCEPT_TERM, 0),
            "BEHAV_SYMPT"
        );
    }

    #[test]
    fn context_columns_appear_only_in_context_mode() {
        let df = notes(&["pt anxious today"]);
        let plain = apply_and_merge(&df, &ruleset(), 0).unwrap();
        assert!(plain.results.column(columns::PRECONTEXT).is_err());
        let ctx = apply_and_merge(&df, &ruleset(), 5).unwrap();
        assert_eq!(
            column_value_string(&ctx.results, columns::PRECONTEXT, 0),
            "pt "
        );
        assert_eq!(
            column_value_string(&ctx.results, columns::POSTCONTEXT, 0),
            " toda"
        );
    }

    #[test]
    fn empty_frame_produces_empty_but_shaped_output() {
        let df = notes(&[]);
        let output = apply_and_merge(&df, &ruleset(), 0).unwrap();
        assert_eq!(output.results.height(), 0);
        assert!(output.results.column(columns::CAPTURE).is_ok());
        assert!(output.classified.column(columns::CONCEPT_TERM).is_ok());
    }
}
