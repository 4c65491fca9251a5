//! Model vocabulary classification over raw concept hits.
//!
//! A hit's `term` can speak to several model categories at once, so the
//! rules are ordered and non-exclusive: every matching rule emits its own
//! label, and downstream tables rely on that duplication. A hit matching
//! nothing is dropped from the classified output (but kept in the raw one).

/// Concepts whose label is the concept name itself.
const PASSTHROUGH_CONCEPTS: [&str; 3] = ["BEHAV_SYMPT", "ENV_STRESS", "MH_REFERRAL"];

/// Ordered substring rules applied to the lower-cased term.
const TERM_RULES: [(&[&str], &str); 10] = [
    (&["depres"], "depression"),
    (&["academ", "grade", "school"], "academic"),
    (&["add", "adhd", "attention"], "adhd"),
    (&["anger"], "anger"),
    (&["anx"], "anxiety"),
    (&["bully"], "bully"),
    (&["defia", "oppositional"], "defiant"),
    (&["drug", "substance"], "drug"),
    (&["meds"], "meds"),
    (&["suic"], "suicide"),
];

/// All labels a hit can receive, for a pass-through concept exactly one.
///
/// Term rules are checked in declaration order and every match contributes a
/// label; the returned vector preserves that order.
pub fn classify_term(concept: &str, term: &str) -> Vec<&'static str> {
    if let Some(label) = PASSTHROUGH_CONCEPTS.iter().copied().find(|c| *c == concept) {
        return vec![label];
    }
    let lowered = term.to_lowercase();
    TERM_RULES
        .iter()
        .filter(|(needles, _)| needles.iter().any(|needle| lowered.contains(needle)))
        .map(|(_, label)| *label)
        .collect()
}

/// Every label the classifier can emit, pass-throughs first, then term
/// labels in rule order.
pub fn vocabulary() -> Vec<&'static str> {
    PASSTHROUGH_CONCEPTS
        .iter()
        .copied()
        .chain(TERM_RULES.iter().map(|(_, label)| *label))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passthrough_concept_keeps_its_own_name() {
        assert_eq!(classify_term("BEHAV_SYMPT", "acting out"), vec!["BEHAV_SYMPT"]);
        assert_eq!(classify_term("ENV_STRESS", "divorce"), vec!["ENV_STRESS"]);
        assert_eq!(classify_term("MH_REFERRAL", "therapy"), vec!["MH_REFERRAL"]);
    }

    #[test]
    fn multi_label_terms_fan_out_in_rule_order() {
        assert_eq!(
            classify_term("GEN", "suicidal ideation and anxiety"),
            vec!["anxiety", "suicide"]
        );
    }

    #[test]
    fn unmatched_terms_classify_to_nothing() {
        assert!(classify_term("GEN", "routine visit").is_empty());
    }

    #[test]
    fn term_matching_is_case_insensitive() {
        assert_eq!(classify_term("GEN", "Depressed Mood"), vec!["depression"]);
    }

    #[test]
    fn alternatives_within_one_rule_emit_one_label() {
        assert_eq!(classify_term("GEN", "school grades slipping"), vec!["academic"]);
        assert_eq!(classify_term("GEN", "attention deficit"), vec!["adhd"]);
        assert_eq!(classify_term("GEN", "oppositional defiant"), vec!["defiant"]);
    }

    #[test]
    fn vocabulary_lists_every_label_once() {
        let vocab = vocabulary();
        assert_eq!(vocab.len(), 13);
        assert_eq!(vocab[0], "BEHAV_SYMPT");
        assert_eq!(vocab[12], "suicide");
    }
}
