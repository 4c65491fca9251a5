//! Library components of the pipeline CLI: logging setup and the deline
//! aggregation tool. Argument parsing and command dispatch live in the
//! binary.

pub mod deline;
pub mod logging;
