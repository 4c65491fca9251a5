//! Concept rules file: parsing and compilation.
//!
//! The rules file is tab-separated with one rule per line:
//!
//! ```text
//! # concept <TAB> term <TAB> pattern (optional)
//! BEHAV_SYMPT	suicidal	suicid(?:al|e)
//! GEN_ANX	anxious
//! ```
//!
//! When the pattern column is omitted the term itself is the pattern, with
//! literal spaces widened to match any run of non-word characters. All
//! patterns compile case-insensitive.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use regex::{Regex, RegexBuilder};

/// One compiled rule from the rules file.
#[derive(Debug, Clone)]
pub struct ConceptRule {
    pub concept: String,
    pub term: String,
    regex: Regex,
}

impl ConceptRule {
    pub(crate) fn regex(&self) -> &Regex {
        &self.regex
    }
}

/// The full compiled rules file, in file order.
#[derive(Debug, Clone, Default)]
pub struct ConceptRuleset {
    rules: Vec<ConceptRule>,
}

impl ConceptRuleset {
    /// Load and compile a rules file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("read rules file: {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("parse rules file: {}", path.display()))
    }

    /// Parse rules from text. Lines starting with `#` and blank lines are
    /// skipped; anything else must carry at least concept and term.
    pub fn parse(text: &str) -> Result<Self> {
        let mut rules = Vec::new();
        for (lineno, line) in text.lines().enumerate() {
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() || line.trim_start().starts_with('#') {
                continue;
            }
            let mut fields = line.split('\t');
            let concept = fields.next().unwrap_or("").trim();
            let term = fields.next().map(str::trim).unwrap_or("");
            if concept.is_empty() || term.is_empty() {
                bail!("line {}: expected 'concept<TAB>term[<TAB>pattern]'", lineno + 1);
            }
            let pattern = match fields.next().map(str::trim) {
                Some(p) if !p.is_empty() => p.to_string(),
                _ => term.replace(' ', r"\W+"),
            };
            let regex = RegexBuilder::new(&pattern)
                .case_insensitive(true)
                .build()
                .with_context(|| format!("line {}: compile pattern '{pattern}'", lineno + 1))?;
            rules.push(ConceptRule {
                concept: concept.to_string(),
                term: term.to_string(),
                regex,
            });
        }
        Ok(Self { rules })
    }

    pub fn rules(&self) -> &[ConceptRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Distinct concepts with their rule counts, sorted by concept.
    pub fn concepts(&self) -> Vec<(String, usize)> {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for rule in &self.rules {
            *counts.entry(rule.concept.clone()).or_insert(0) += 1;
        }
        counts.into_iter().collect()
    }
}
