//! Replacement accounting for the cleaning pass.

use std::collections::BTreeMap;

use tracing::info;

/// Accumulates how many notes each cleaning rule changed.
///
/// One tracker travels through a cleaning pass and is drained at a
/// checkpoint, typically once per dataset, so repeated runs never
/// cross-contaminate counts. Labels are the rule text as configured.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplacementTracker {
    counts: BTreeMap<String, u64>,
}

impl ReplacementTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one note changed by `label` (a pattern or exclusion phrase).
    pub fn record(&mut self, label: &str) {
        *self.counts.entry(label.to_string()).or_insert(0) += 1;
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Current counts, sorted by label, without resetting.
    pub fn snapshot(&self) -> Vec<(String, u64)> {
        self.counts.iter().map(|(k, v)| (k.clone(), *v)).collect()
    }

    /// Clear all counts.
    pub fn reset(&mut self) {
        self.counts.clear();
    }

    /// Take the counts, leaving the tracker empty.
    pub fn drain(&mut self) -> Vec<(String, u64)> {
        let snapshot = self.snapshot();
        self.reset();
        snapshot
    }

    /// Log every count at info level, then reset.
    ///
    /// Returns the drained counts so callers can persist the audit.
    pub fn log_and_reset(&mut self) -> Vec<(String, u64)> {
        let drained = self.drain();
        for (label, count) in &drained {
            info!(pattern = %label, count = *count, "text cleaning replacement");
        }
        drained
    }
}
