//! CLI argument definitions for the encounter note pipeline.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{InfoLevel, Verbosity};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "mhnav",
    version,
    about = "Encounter note pipeline - dictionary NLP over clinical note extracts",
    long_about = "Classify mental-health concept mentions in clinical notes.\n\n\
                  Reads an index and a historical encounter extract (CSV, XPT, or\n\
                  SQLite), cleans the note text, matches a concept rules file, and\n\
                  writes the classified datasets as timestamped CSV files and/or\n\
                  SQLite tables."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for debug, -vv for trace, -q for warnings only).
    #[command(flatten)]
    pub verbosity: Verbosity<InfoLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Allow note text and captured values in logs (PHI; redacted by default).
    #[arg(long = "log-data", global = true)]
    pub log_data: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Build the classified encounter datasets from two extracts.
    Build(BuildArgs),

    /// List the classification vocabulary, or the concepts of a rules file.
    Concepts(ConceptsArgs),

    /// Collapse a multi-line note extract to one row per note.
    Deline(DelineArgs),
}

#[derive(Parser)]
pub struct BuildArgs {
    /// Index encounter dataset: a .csv/.xpt path, or a table name with --in-db.
    #[arg(short = 'i', long = "index-dataset", value_name = "DATASET")]
    pub index_dataset: String,

    /// Historical encounter dataset: a .csv/.xpt path, or a table name with --in-db.
    #[arg(short = 's', long = "historical-dataset", value_name = "DATASET")]
    pub historical_dataset: String,

    /// Concept rules file (tab-separated: concept, term, optional pattern).
    #[arg(short = 'r', long = "regex-file", value_name = "PATH")]
    pub regex_file: PathBuf,

    /// Read both datasets as tables from this SQLite database.
    #[arg(long = "in-db", value_name = "PATH")]
    pub in_db: Option<PathBuf>,

    /// Write output tables to this SQLite database.
    #[arg(long = "out-db", value_name = "PATH")]
    pub out_db: Option<PathBuf>,

    /// Directory that receives the per-run output folder.
    #[arg(long = "outpath", value_name = "DIR", default_value = ".")]
    pub outpath: PathBuf,

    /// Skip CSV output (useful with --out-db).
    #[arg(long = "no-csv")]
    pub no_csv: bool,

    /// Capture N characters of context around each match and build the
    /// nlp_regex audit table (0 disables capture).
    #[arg(long = "include-context", value_name = "N", default_value_t = 0)]
    pub include_context: usize,

    /// Text cleaning rules file (JSON with exclude_phrases and replace_patterns).
    #[arg(long = "cleaning-rules", value_name = "PATH")]
    pub cleaning_rules: Option<PathBuf>,

    /// Database table name for nlp_positive (default: nlp_positive_<timestamp>).
    #[arg(long = "positive-table", value_name = "NAME")]
    pub positive_table: Option<String>,

    /// Database table name for nlp_model (default: nlp_model_<timestamp>).
    #[arg(long = "model-table", value_name = "NAME")]
    pub model_table: Option<String>,

    /// Database table name for nlp_index (default: nlp_index_<timestamp>).
    #[arg(long = "index-table", value_name = "NAME")]
    pub index_table: Option<String>,

    /// Database table name for nlp_regex (default: nlp_regex_<timestamp>).
    #[arg(long = "regex-table", value_name = "NAME")]
    pub regex_table: Option<String>,

    /// Drop and recreate output tables that already exist in the database.
    #[arg(long = "overwrite-existing")]
    pub overwrite_existing: bool,

    /// Write per-dataset replacement frequency TSVs next to the CSV outputs.
    #[arg(long = "audit-replacements")]
    pub audit_replacements: bool,
}

#[derive(Parser)]
pub struct ConceptsArgs {
    /// Concept rules file; when given, lists its concepts and rule counts
    /// instead of the built-in classification vocabulary.
    #[arg(short = 'r', long = "regex-file", value_name = "PATH")]
    pub regex_file: Option<PathBuf>,
}

#[derive(Parser)]
pub struct DelineArgs {
    /// Multi-line extract to collapse (.csv or .xpt).
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Output CSV path.
    #[arg(long = "outfile", value_name = "PATH")]
    pub outfile: PathBuf,

    /// Column identifying a note.
    #[arg(long = "groupby", value_name = "COLUMN", default_value = "note_id")]
    pub groupby: String,

    /// Line counter column; its maximum per note is kept.
    #[arg(
        long = "aggnotecount",
        value_name = "COLUMN",
        default_value = "note_line"
    )]
    pub aggnotecount: String,

    /// Text column joined across lines.
    #[arg(long = "aggtext", value_name = "COLUMN", default_value = "note_text")]
    pub aggtext: String,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
