//! Concept matching for encounter notes.
//!
//! A rules file maps concepts to terms with optional regex patterns; every
//! note is scanned against every rule, and hits are merged back onto their
//! source rows by position. Classification then fans each hit out into the
//! model vocabulary: an ordered, non-exclusive rule set where one hit can
//! earn several labels or none.

pub mod classify;
pub mod ruleset;
pub mod scan;

pub use classify::{classify_term, vocabulary};
pub use ruleset::{ConceptRule, ConceptRuleset};
pub use scan::{ConceptHit, MatchOutput, apply_and_merge, scan_frame, scan_text};
