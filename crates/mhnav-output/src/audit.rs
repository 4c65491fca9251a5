//! Replacement-audit export.
//!
//! The cleaner drains its replacement counts once per dataset; this writes
//! one drain as a two-column TSV so runs can be audited without rereading
//! the logs.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

/// Write drained replacement counts as `pattern<TAB>frequency` lines.
pub fn write_replacement_audit(path: &Path, counts: &[(String, u64)]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(BufWriter::new(file));
    writer
        .write_record(["pattern", "frequency"])
        .context("write audit header")?;
    for (pattern, count) in counts {
        writer
            .write_record([pattern.as_str(), &count.to_string()])
            .with_context(|| format!("write audit row for '{pattern}'"))?;
    }
    writer
        .flush()
        .with_context(|| format!("flush {}", path.display()))?;
    info!(rules = counts.len(), path = %path.display(), "wrote replacement audit");
    Ok(())
}
