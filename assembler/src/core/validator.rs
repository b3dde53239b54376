//! Per-document structural validation.
//!
//! Validation is advisory-first: every defect becomes a [`ValidationIssue`],
//! and a typed record is produced only when no error-severity issue was found.
//! Warnings never block a document from later stages.

use std::collections::BTreeSet;

use super::document::Document;
use super::grammar::{
    Grammar, GrammarViolation, MODE_GRAMMAR, PERSONA_GRAMMAR, SECTION_LEVEL, check_grammar,
};
use super::layout::Layout;
use super::manifest::{parse_manifest, persona_root_segments};
use super::template::Template;
use super::types::{DocumentKind, Rule, ValidationIssue, has_errors};

/// A mode template that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeDefinition {
    pub slug: String,
    /// Source document path.
    pub path: String,
    pub template: Template,
    /// `persona_root` exactly as declared in the manifest.
    pub declared_root: String,
    /// Input-relative directory the persona root resolves to.
    pub persona_root: String,
    /// Declared tools, first occurrence order, duplicates removed.
    pub tools: Vec<String>,
    pub expected_personas: Vec<String>,
    pub description: Option<String>,
}

/// A persona document that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonaDocument {
    pub path: String,
    /// File stem; the identity used for ambiguity checks.
    pub technology: String,
    /// First level-1 heading, falling back to the technology name.
    pub title: String,
    /// The required section bodies, in grammar order.
    pub sections: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validated {
    Mode(ModeDefinition),
    Persona(PersonaDocument),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub issues: Vec<ValidationIssue>,
    /// Present only when `issues` holds no error.
    pub record: Option<Validated>,
}

/// Validate one document against the grammar for its kind.
pub fn validate_document(doc: &Document, layout: &Layout) -> ValidationOutcome {
    let provenance = DocumentKind::from(doc.origin);
    let kind = match doc.kind {
        Some(sniffed) if sniffed != provenance => {
            return ValidationOutcome {
                issues: vec![ValidationIssue::error(
                    &doc.path,
                    Rule::MisplacedDocument,
                    format!(
                        "document is structured as a {} but is located in the {} tree",
                        sniffed.as_str(),
                        provenance.as_str()
                    ),
                )],
                record: None,
            };
        }
        Some(sniffed) => sniffed,
        None => provenance,
    };
    match kind {
        DocumentKind::Mode => validate_mode(doc, layout),
        DocumentKind::Persona => validate_persona(doc),
    }
}

fn validate_mode(doc: &Document, layout: &Layout) -> ValidationOutcome {
    let mut issues = Vec::new();

    let manifest = match doc.front_matter() {
        None => {
            issues.push(ValidationIssue::error(
                &doc.path,
                Rule::MissingManifest,
                "mode template must start with a +++ fenced TOML manifest",
            ));
            None
        }
        Some(raw) => match parse_manifest(raw) {
            Ok(manifest) => Some(manifest),
            Err(err) => {
                issues.push(ValidationIssue::error(
                    &doc.path,
                    Rule::InvalidManifest,
                    format!("{err:#}"),
                ));
                None
            }
        },
    };

    let root_segments = manifest.as_ref().and_then(|manifest| {
        match persona_root_segments(&manifest.persona_root) {
            Ok(segments) => Some(segments),
            Err(err) => {
                issues.push(ValidationIssue::error(
                    &doc.path,
                    Rule::PathEscape,
                    err.to_string(),
                ));
                None
            }
        }
    });

    push_grammar_issues(doc, &MODE_GRAMMAR, &mut issues);

    let template = Template::parse(doc, &MODE_GRAMMAR);
    for name in &template.unknown_placeholders {
        issues.push(ValidationIssue::warning(
            &doc.path,
            Rule::UnknownPlaceholder,
            format!("unknown placeholder '{name}' is copied through unchanged"),
        ));
    }

    let tools = match &manifest {
        Some(manifest) => dedupe_tools(&doc.path, &manifest.tools, &mut issues),
        None => Vec::new(),
    };

    if has_errors(&issues) {
        return ValidationOutcome {
            issues,
            record: None,
        };
    }
    let (Some(manifest), Some(root_segments)) = (manifest, root_segments) else {
        return ValidationOutcome {
            issues,
            record: None,
        };
    };

    let slug = layout
        .mode_slug(&doc.path)
        .unwrap_or_else(|| doc.file_stem().to_string());
    let definition = ModeDefinition {
        slug,
        path: doc.path.clone(),
        template,
        persona_root: layout.persona_root_path(&root_segments),
        declared_root: manifest.persona_root,
        tools,
        expected_personas: manifest.expected_personas,
        description: manifest.description,
    };
    ValidationOutcome {
        issues,
        record: Some(Validated::Mode(definition)),
    }
}

fn validate_persona(doc: &Document) -> ValidationOutcome {
    let mut issues = Vec::new();
    push_grammar_issues(doc, &PERSONA_GRAMMAR, &mut issues);

    let mut sections = Vec::with_capacity(PERSONA_GRAMMAR.required.len());
    for heading in PERSONA_GRAMMAR.required {
        let mut matching = doc
            .sections
            .iter()
            .filter(|section| section.level == SECTION_LEVEL && section.heading == *heading);
        let (Some(section), None) = (matching.next(), matching.next()) else {
            continue;
        };
        let body = doc.section_body(section);
        if body.trim().is_empty() {
            issues.push(ValidationIssue::warning(
                &doc.path,
                Rule::EmptySection,
                format!("section \"## {heading}\" has no content"),
            ));
        }
        sections.push((heading.to_string(), body.to_string()));
    }

    if has_errors(&issues) {
        return ValidationOutcome {
            issues,
            record: None,
        };
    }

    let technology = doc.file_stem().to_string();
    let title = doc.title().unwrap_or(&technology).to_string();
    ValidationOutcome {
        issues,
        record: Some(Validated::Persona(PersonaDocument {
            path: doc.path.clone(),
            technology,
            title,
            sections,
        })),
    }
}

fn push_grammar_issues(doc: &Document, grammar: &Grammar, issues: &mut Vec<ValidationIssue>) {
    let headings = doc.headings(SECTION_LEVEL);
    for violation in check_grammar(grammar, &headings) {
        let rule = match violation {
            GrammarViolation::Missing { .. } => Rule::MissingSection,
            GrammarViolation::Duplicate { .. } => Rule::DuplicateSection,
            GrammarViolation::OutOfOrder { .. } => Rule::MisorderedSection,
        };
        issues.push(ValidationIssue::error(&doc.path, rule, violation.message()));
    }
}

fn dedupe_tools(path: &str, declared: &[String], issues: &mut Vec<ValidationIssue>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut reported = BTreeSet::new();
    let mut tools = Vec::with_capacity(declared.len());
    for tool in declared {
        if seen.insert(tool.as_str()) {
            tools.push(tool.clone());
        } else if reported.insert(tool.as_str()) {
            issues.push(ValidationIssue::warning(
                path,
                Rule::DuplicateTool,
                format!("tool '{tool}' is declared more than once"),
            ));
        }
    }
    tools
}
