//! Note text cleaning: boilerplate removal with replacement auditing.
//!
//! Cleaning runs before concept matching so dictation artifacts and EHR
//! boilerplate never reach the matcher. A note whose opening characters hit
//! an exclusion phrase is dropped outright (cleaned to the empty string);
//! otherwise line breaks collapse to a double-space separator and each
//! configured pattern is substituted away. Every rule that changes a note is
//! counted in a [`ReplacementTracker`] owned by the caller, so audits of
//! what cleaning did are per-dataset, not process-global.

pub mod column;
pub mod rules;
pub mod tracker;

pub use column::clean_note_column;
pub use rules::{CleaningRules, CompiledRules};
pub use tracker::ReplacementTracker;
