//! Canonical column names shared across the pipeline.
//!
//! Source extracts arrive with arbitrary header casing; ingest lower-cases
//! everything once, so every later stage compares against these constants.

/// Study-level patient identifier.
pub const STUDYID: &str = "studyid";

/// Encounter identifier of the row's own note.
pub const PAT_ENC_CSN_ID: &str = "pat_enc_csn_id";

/// Encounter identifier of the index encounter a historical note belongs to.
pub const INDEX_PAT_ENC_CSN_ID: &str = "index_pat_enc_csn_id";

/// Date the note was written.
pub const NOTE_DATE: &str = "note_date";

/// Free-text body of the note.
pub const NOTE_TEXT: &str = "note_text";

/// Inclusive start of the look-back window.
pub const START_DATE: &str = "start_date";

/// Inclusive end of the look-back window.
pub const END_DATE: &str = "end_date";

/// Row ordinal of the scanned frame a hit came from.
pub const HIT_ID: &str = "id";

/// Concept name from the matched rule.
pub const CONCEPT: &str = "concept";

/// Term name from the matched rule.
pub const TERM: &str = "term";

/// Exact text span the rule matched.
pub const CAPTURE: &str = "capture";

/// Text immediately before the capture (debug context only).
pub const PRECONTEXT: &str = "precontext";

/// Text immediately after the capture (debug context only).
pub const POSTCONTEXT: &str = "postcontext";

/// Model vocabulary label assigned by classification.
pub const CONCEPT_TERM: &str = "concept_term";

/// Distinct-note-date count in the positive table.
pub const NOTE_COUNT: &str = "note_count";

/// Renamed capture column in the index table.
pub const TEXT_STRING: &str = "text_string";

/// Marks which arm of the regex-audit union a row came from.
pub const IS_INDEX: &str = "is_index";
