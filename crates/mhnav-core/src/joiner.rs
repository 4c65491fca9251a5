//! Joins matcher output back onto encounter metadata.
//!
//! Matcher frames carry a copy of their source columns, so the join is an
//! inner hash join on the shared key columns: base rows contribute their
//! own column values and row multiplicity, hit rows contribute the columns
//! only the matcher produces. The date-window filter and the index
//! self-match exclusion live here as well, next to the join they refine.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::{Context, Result, bail};
use polars::prelude::{BooleanChunked, Column, DataFrame, NamedFrom, NewChunkedArray, Series};

use mhnav_ingest::{column_trimmed_values, column_value_string};
use mhnav_model::columns;

use crate::datetime::{date_in_window, parse_date};

/// Separates key parts; free text never contains it.
const KEY_SEPARATOR: char = '\u{1f}';

/// Inner-join `hits` onto `base` by `keys`.
///
/// Every hit row is emitted once per base row sharing its key tuple; hits
/// with no base counterpart are dropped. Shared columns take the base
/// row's values, so there is exactly one `note_text` in the output.
///
/// Unless `skip_date_filter` is set, a joined row survives only when the
/// base row's `note_date` falls inside `[start_date, end_date]` inclusive.
/// Rows with missing or unreadable dates fail the window and are dropped
/// silently.
pub fn attach_results(
    base: &DataFrame,
    hits: &DataFrame,
    keys: &[&str],
    skip_date_filter: bool,
) -> Result<DataFrame> {
    let base_keys = composite_keys(base, keys)?;
    let hit_keys = composite_keys(hits, keys)?;

    let mut base_rows_by_key: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (idx, key) in base_keys.iter().enumerate() {
        base_rows_by_key.entry(key.as_str()).or_default().push(idx);
    }

    let mut base_picks: Vec<usize> = Vec::new();
    let mut hit_picks: Vec<usize> = Vec::new();
    for (hit_idx, key) in hit_keys.iter().enumerate() {
        let Some(base_rows) = base_rows_by_key.get(key.as_str()) else {
            continue;
        };
        for &base_idx in base_rows {
            if !skip_date_filter && !window_holds(base, base_idx) {
                continue;
            }
            base_picks.push(base_idx);
            hit_picks.push(hit_idx);
        }
    }

    let base_names = base.get_column_names_owned();
    let mut joined: Vec<Column> = Vec::with_capacity(hits.width());
    for name in &base_names {
        let values: Vec<String> = base_picks
            .iter()
            .map(|&idx| column_value_string(base, name.as_str(), idx))
            .collect();
        joined.push(Series::new(name.clone(), values).into());
    }
    for name in hits.get_column_names_owned() {
        if base_names.contains(&name) {
            continue;
        }
        let values: Vec<String> = hit_picks
            .iter()
            .map(|&idx| column_value_string(hits, name.as_str(), idx))
            .collect();
        joined.push(Series::new(name.clone(), values).into());
    }
    DataFrame::new(joined).context("assemble joined frame")
}

/// Drop rows whose note is the index encounter's own note.
///
/// A historical row with `pat_enc_csn_id == index_pat_enc_csn_id` is the
/// index note itself and must not count as historical evidence.
pub fn remove_index_dates(df: &DataFrame) -> Result<DataFrame> {
    let pat = column_trimmed_values(df, columns::PAT_ENC_CSN_ID)
        .context("column 'pat_enc_csn_id' not found")?;
    let index_pat = column_trimmed_values(df, columns::INDEX_PAT_ENC_CSN_ID)
        .context("column 'index_pat_enc_csn_id' not found")?;
    let keep: Vec<bool> = pat
        .iter()
        .zip(&index_pat)
        .map(|(own, index)| own != index)
        .collect();
    let mask = BooleanChunked::from_slice("own_note".into(), &keep);
    df.filter(&mask).context("drop index self-matches")
}

/// Distinct trimmed values of one column, in first-seen row order.
pub fn distinct_column_values(df: &DataFrame, column: &str) -> Result<Vec<String>> {
    let values = column_trimmed_values(df, column)
        .with_context(|| format!("column '{column}' not found"))?;
    let mut seen = BTreeSet::new();
    let mut distinct = Vec::new();
    for value in values {
        if seen.insert(value.clone()) {
            distinct.push(value);
        }
    }
    Ok(distinct)
}

/// Keep rows whose trimmed `column` value appears in `allowed`.
pub fn filter_column_isin(df: &DataFrame, column: &str, allowed: &[String]) -> Result<DataFrame> {
    let values = column_trimmed_values(df, column)
        .with_context(|| format!("column '{column}' not found"))?;
    let allowed: BTreeSet<&str> = allowed.iter().map(String::as_str).collect();
    let keep: Vec<bool> = values
        .iter()
        .map(|value| allowed.contains(value.as_str()))
        .collect();
    let mask = BooleanChunked::from_slice("isin".into(), &keep);
    df.filter(&mask)
        .with_context(|| format!("filter rows by '{column}'"))
}

fn composite_keys(df: &DataFrame, keys: &[&str]) -> Result<Vec<String>> {
    for key in keys {
        if df.column(key).is_err() {
            bail!("join key '{key}' not found");
        }
    }
    let mut out = Vec::with_capacity(df.height());
    for idx in 0..df.height() {
        let mut composite = String::new();
        for (pos, key) in keys.iter().enumerate() {
            if pos > 0 {
                composite.push(KEY_SEPARATOR);
            }
            composite.push_str(column_value_string(df, key, idx).trim());
        }
        out.push(composite);
    }
    Ok(out)
}

fn window_holds(df: &DataFrame, idx: usize) -> bool {
    let Some(note) = parse_date(&column_value_string(df, columns::NOTE_DATE, idx)) else {
        return false;
    };
    let Some(start) = parse_date(&column_value_string(df, columns::START_DATE, idx)) else {
        return false;
    };
    let Some(end) = parse_date(&column_value_string(df, columns::END_DATE, idx)) else {
        return false;
    };
    date_in_window(note, start, end)
}
