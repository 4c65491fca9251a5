//! Frame-level cleaning pass over the note text column.

use anyhow::{Context, Result};
use polars::prelude::{AnyValue, DataFrame, NamedFrom, Series};
use tracing::info;

use mhnav_ingest::any_to_string;
use mhnav_model::columns;

use crate::rules::CompiledRules;
use crate::tracker::ReplacementTracker;

/// Clean every value of the `note_text` column, returning a new frame.
///
/// Null cells clean to the empty string. The tracker accumulates counts for
/// the whole column; draining it afterwards is the caller's checkpoint.
pub fn clean_note_column(
    df: &DataFrame,
    rules: &CompiledRules,
    tracker: &mut ReplacementTracker,
) -> Result<DataFrame> {
    let column = df
        .column(columns::NOTE_TEXT)
        .context("note_text column missing for cleaning")?;
    let mut cleaned: Vec<String> = Vec::with_capacity(df.height());
    for idx in 0..df.height() {
        let value = column.get(idx).unwrap_or(AnyValue::Null);
        let text = match value {
            AnyValue::Null => None,
            other => Some(any_to_string(other)),
        };
        cleaned.push(rules.clean_text(text.as_deref(), tracker));
    }
    let mut out = df.clone();
    out.with_column(Series::new(columns::NOTE_TEXT.into(), cleaned))
        .context("replace note_text with cleaned values")?;
    info!(rows = out.height(), "cleaned note text");
    Ok(out)
}
