//! Output table identities.

use std::fmt;

/// The four relational tables the pipeline can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputTable {
    /// Per-index-encounter distinct-note-date counts.
    Positive,
    /// Historical (look-back) classified mentions.
    Model,
    /// Index-encounter classified mentions with captured text.
    Index,
    /// Raw matcher audit union, only built when context capture is on.
    Regex,
}

impl OutputTable {
    /// Base table name without the run timestamp suffix.
    pub fn base_name(&self) -> &'static str {
        match self {
            OutputTable::Positive => "nlp_positive",
            OutputTable::Model => "nlp_model",
            OutputTable::Index => "nlp_index",
            OutputTable::Regex => "nlp_regex",
        }
    }

    /// Table name for one run, e.g. `nlp_model_20240117_101530`.
    pub fn run_name(&self, timestamp: &str) -> String {
        format!("{}_{timestamp}", self.base_name())
    }

    /// Tables always produced by a run.
    pub fn core() -> [OutputTable; 3] {
        [OutputTable::Positive, OutputTable::Model, OutputTable::Index]
    }
}

impl fmt::Display for OutputTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_name_appends_timestamp() {
        assert_eq!(
            OutputTable::Positive.run_name("20240117_101530"),
            "nlp_positive_20240117_101530"
        );
    }

    #[test]
    fn core_tables_exclude_regex() {
        assert!(!OutputTable::core().contains(&OutputTable::Regex));
    }
}
