//! Deployment-specific cleaning rules and their compiled form.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::tracker::ReplacementTracker;

/// How many characters at the start of a note are scanned for exclusions.
const EXCLUSION_WINDOW: usize = 100;

/// Site-specific cleaning configuration.
///
/// Exclusion phrases drop a whole note when found near its start; replace
/// patterns are substituted wherever they fire. Both lists ship empty, since
/// every deployment carries its own boilerplate inventory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CleaningRules {
    /// Phrases that exclude the whole note when present in its first 100
    /// characters, compared case-insensitively.
    #[serde(default)]
    pub exclude_phrases: Vec<String>,
    /// Patterns replaced by a single space wherever they match. A literal
    /// space in a pattern matches one-or-more non-word characters.
    #[serde(default)]
    pub replace_patterns: Vec<String>,
}

impl CleaningRules {
    /// Load rules from a JSON file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read cleaning rules: {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("parse cleaning rules: {}", path.display()))
    }

    /// Compile every pattern, failing with the offending pattern named.
    pub fn compile(&self) -> Result<CompiledRules> {
        let excludes = self
            .exclude_phrases
            .iter()
            .map(|phrase| ExcludePhrase {
                lowered: phrase.to_lowercase(),
                phrase: phrase.clone(),
            })
            .collect();
        let mut replacements = Vec::with_capacity(self.replace_patterns.len());
        for pattern in &self.replace_patterns {
            let regex = RegexBuilder::new(&pattern.replace(' ', r"\W+"))
                .case_insensitive(true)
                .build()
                .with_context(|| format!("compile cleaning pattern '{pattern}'"))?;
            replacements.push(ReplaceRule {
                pattern: pattern.clone(),
                regex,
            });
        }
        Ok(CompiledRules {
            excludes,
            replacements,
        })
    }
}

#[derive(Debug, Clone)]
struct ExcludePhrase {
    /// Phrase as configured, used as the tracker label.
    phrase: String,
    lowered: String,
}

#[derive(Debug, Clone)]
struct ReplaceRule {
    /// Pattern as configured, used as the tracker label.
    pattern: String,
    regex: Regex,
}

/// Ready-to-run cleaning rules.
#[derive(Debug, Clone, Default)]
pub struct CompiledRules {
    excludes: Vec<ExcludePhrase>,
    replacements: Vec<ReplaceRule>,
}

impl CompiledRules {
    /// True when no phrase or pattern is configured.
    pub fn is_empty(&self) -> bool {
        self.excludes.is_empty() && self.replacements.is_empty()
    }

    /// Clean one note.
    ///
    /// Missing text cleans to the empty string. Excluded notes clean to the
    /// empty string and count against their phrase. Otherwise line breaks
    /// collapse to a double-space separator and each firing pattern is
    /// replaced by a single space, counting once per note.
    pub fn clean_text(&self, text: Option<&str>, tracker: &mut ReplacementTracker) -> String {
        let Some(raw) = text else {
            return String::new();
        };
        if self.should_exclude(raw, tracker) {
            return String::new();
        }
        let mut cleaned = raw.split('\n').collect::<Vec<_>>().join("  ");
        for rule in &self.replacements {
            if rule.regex.is_match(&cleaned) {
                let replaced = rule.regex.replace_all(&cleaned, " ").into_owned();
                if replaced != cleaned {
                    tracker.record(&rule.pattern);
                }
                cleaned = replaced;
            }
        }
        cleaned
    }

    fn should_exclude(&self, text: &str, tracker: &mut ReplacementTracker) -> bool {
        if self.excludes.is_empty() {
            return false;
        }
        let start: String = text
            .chars()
            .take(EXCLUSION_WINDOW)
            .collect::<String>()
            .to_lowercase();
        for exclude in &self.excludes {
            if start.contains(&exclude.lowered) {
                tracker.record(&exclude.phrase);
                return true;
            }
        }
        false
    }
}
