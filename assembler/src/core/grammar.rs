//! Section grammars and the shared ordered-subsequence matcher.
//!
//! A grammar is a list of required level-2 headings plus an `ordered` flag.
//! Mode and persona documents use the same matcher; only their grammars
//! differ.

use std::collections::HashMap;

use super::document::Section;
use super::types::DocumentKind;

/// Level at which required sections live.
pub const SECTION_LEVEL: u8 = 2;

pub const MODE_SECTIONS: &[&str] = &["Role", "Workflow", "Persona Tree", "Tools", "Guardrails"];

pub const PERSONA_SECTIONS: &[&str] = &["Overview", "Conventions", "Patterns", "Pitfalls", "Resources"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grammar {
    pub kind: DocumentKind,
    pub required: &'static [&'static str],
    /// Whether required headings must appear in `required` order.
    pub ordered: bool,
}

pub const MODE_GRAMMAR: Grammar = Grammar {
    kind: DocumentKind::Mode,
    required: MODE_SECTIONS,
    ordered: true,
};

pub const PERSONA_GRAMMAR: Grammar = Grammar {
    kind: DocumentKind::Persona,
    required: PERSONA_SECTIONS,
    ordered: false,
};

impl Grammar {
    /// The heading whose presence identifies this grammar.
    pub fn marker(&self) -> &'static str {
        self.required[0]
    }

    pub fn is_required(&self, heading: &str) -> bool {
        self.required.iter().any(|req| *req == heading)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrammarViolation {
    Missing {
        heading: &'static str,
    },
    Duplicate {
        heading: &'static str,
        count: usize,
    },
    /// `heading` appears out of order; `expected_after` is its grammar
    /// predecessor (`None` when it should come first).
    OutOfOrder {
        heading: &'static str,
        expected_after: Option<&'static str>,
    },
}

impl GrammarViolation {
    pub fn message(&self) -> String {
        match self {
            GrammarViolation::Missing { heading } => {
                format!("required section \"## {heading}\" is missing")
            }
            GrammarViolation::Duplicate { heading, count } => {
                format!("required section \"## {heading}\" appears {count} times (expected once)")
            }
            GrammarViolation::OutOfOrder {
                heading,
                expected_after: Some(after),
            } => format!("required section \"## {heading}\" is out of order (expected after \"## {after}\")"),
            GrammarViolation::OutOfOrder {
                heading,
                expected_after: None,
            } => format!("required section \"## {heading}\" is out of order (expected first)"),
        }
    }
}

/// Check `headings` (document order) against `grammar`.
///
/// Violations are returned grouped by type (missing, duplicate, out of order),
/// each group in grammar order. Order checking only considers the first
/// occurrence of each required heading and flags the headings outside the
/// longest already-ordered run, so moving one section yields one violation.
pub fn check_grammar(grammar: &Grammar, headings: &[&str]) -> Vec<GrammarViolation> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut first_seen: Vec<usize> = Vec::new();
    for heading in headings {
        let Some(idx) = grammar.required.iter().position(|req| req == heading) else {
            continue;
        };
        let count = counts.entry(grammar.required[idx]).or_insert(0);
        *count += 1;
        if *count == 1 {
            first_seen.push(idx);
        }
    }

    let mut violations = Vec::new();
    for &heading in grammar.required {
        if !counts.contains_key(heading) {
            violations.push(GrammarViolation::Missing { heading });
        }
    }
    for &heading in grammar.required {
        match counts.get(heading) {
            Some(&count) if count > 1 => {
                violations.push(GrammarViolation::Duplicate { heading, count });
            }
            _ => {}
        }
    }
    if grammar.ordered {
        let keep = longest_increasing(&first_seen);
        let mut misplaced: Vec<usize> = first_seen
            .iter()
            .enumerate()
            .filter(|(pos, _)| !keep.contains(pos))
            .map(|(_, idx)| *idx)
            .collect();
        misplaced.sort_unstable();
        for idx in misplaced {
            violations.push(GrammarViolation::OutOfOrder {
                heading: grammar.required[idx],
                expected_after: idx.checked_sub(1).map(|prev| grammar.required[prev]),
            });
        }
    }
    violations
}

/// Positions (into `values`) of one longest strictly increasing subsequence.
///
/// Ties resolve towards the earliest-ending subsequence so results are stable.
fn longest_increasing(values: &[usize]) -> Vec<usize> {
    if values.is_empty() {
        return Vec::new();
    }
    let mut lengths = vec![1usize; values.len()];
    let mut previous: Vec<Option<usize>> = vec![None; values.len()];
    for i in 0..values.len() {
        for j in 0..i {
            if values[j] < values[i] && lengths[j] + 1 > lengths[i] {
                lengths[i] = lengths[j] + 1;
                previous[i] = Some(j);
            }
        }
    }
    let mut best = 0;
    for (pos, len) in lengths.iter().enumerate() {
        if *len > lengths[best] {
            best = pos;
        }
    }
    let mut chain = Vec::with_capacity(lengths[best]);
    let mut cursor = Some(best);
    while let Some(pos) = cursor {
        chain.push(pos);
        cursor = previous[pos];
    }
    chain.reverse();
    chain
}

/// Decide a document's kind from its level-2 headings.
///
/// Returns `None` when neither grammar marker is present, or both are.
pub fn sniff_kind(sections: &[Section]) -> Option<DocumentKind> {
    let has = |marker: &str| {
        sections
            .iter()
            .any(|section| section.level == SECTION_LEVEL && section.heading == marker)
    };
    match (has(MODE_GRAMMAR.marker()), has(PERSONA_GRAMMAR.marker())) {
        (true, false) => Some(DocumentKind::Mode),
        (false, true) => Some(DocumentKind::Persona),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_mode_outline_passes() {
        let headings = ["Role", "Notes", "Workflow", "Persona Tree", "Tools", "Extra", "Guardrails"];
        assert!(check_grammar(&MODE_GRAMMAR, &headings).is_empty());
    }

    #[test]
    fn missing_final_section_is_one_violation() {
        let headings = ["Role", "Workflow", "Persona Tree", "Tools"];
        assert_eq!(
            check_grammar(&MODE_GRAMMAR, &headings),
            vec![GrammarViolation::Missing { heading: "Guardrails" }]
        );
    }

    #[test]
    fn swapped_sections_flag_only_the_moved_one() {
        let headings = ["Role", "Tools", "Workflow", "Persona Tree", "Guardrails"];
        assert_eq!(
            check_grammar(&MODE_GRAMMAR, &headings),
            vec![GrammarViolation::OutOfOrder {
                heading: "Tools",
                expected_after: Some("Persona Tree"),
            }]
        );
    }

    #[test]
    fn section_moved_to_front_is_one_violation() {
        let headings = ["Guardrails", "Role", "Workflow", "Persona Tree", "Tools"];
        let violations = check_grammar(&MODE_GRAMMAR, &headings);
        assert_eq!(violations.len(), 1);
        assert!(matches!(
            violations[0],
            GrammarViolation::OutOfOrder {
                heading: "Guardrails",
                ..
            }
        ));
    }

    #[test]
    fn persona_order_is_tolerated_but_duplicates_are_not() {
        let headings = ["Resources", "Pitfalls", "Overview", "Patterns", "Conventions"];
        assert!(check_grammar(&PERSONA_GRAMMAR, &headings).is_empty());

        let headings = ["Overview", "Conventions", "Patterns", "Pitfalls", "Resources", "Overview"];
        assert_eq!(
            check_grammar(&PERSONA_GRAMMAR, &headings),
            vec![GrammarViolation::Duplicate {
                heading: "Overview",
                count: 2,
            }]
        );
    }

    #[test]
    fn longest_increasing_prefers_stable_chain() {
        assert_eq!(longest_increasing(&[0, 3, 1, 2, 4]), vec![0, 2, 3, 4]);
        assert_eq!(longest_increasing(&[]), Vec::<usize>::new());
    }

    #[test]
    fn messages_name_the_heading() {
        let message = GrammarViolation::Missing { heading: "Tools" }.message();
        assert!(message.contains("## Tools"));
    }
}
