//! Shared deterministic types for assembler core logic.
//!
//! These types define stable contracts between pipeline stages. They do not
//! depend on external state or I/O and must remain deterministic across runs.

use std::fmt;

use serde::Serialize;

/// Which configured subtree a document was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Modes,
    Personas,
}

/// Structural kind of a document, decided by heading sniffing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Mode,
    Persona,
}

impl DocumentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DocumentKind::Mode => "mode",
            DocumentKind::Persona => "persona",
        }
    }
}

impl From<Origin> for DocumentKind {
    fn from(origin: Origin) -> Self {
        match origin {
            Origin::Modes => DocumentKind::Mode,
            Origin::Personas => DocumentKind::Persona,
        }
    }
}

/// Issue severity. `Error` sorts before `Warning`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
        }
    }
}

/// Top-level issue taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// Missing, duplicated or misordered required section; malformed manifest.
    StructuralViolation,
    /// A reference that points at nothing: missing persona root, missing placeholder.
    DanglingReference,
    /// The same technology name reachable at two paths under one root.
    AmbiguousReference,
    /// Unreadable or oversized input file.
    IoFailure,
}

impl IssueKind {
    pub fn as_str(self) -> &'static str {
        match self {
            IssueKind::StructuralViolation => "structural_violation",
            IssueKind::DanglingReference => "dangling_reference",
            IssueKind::AmbiguousReference => "ambiguous_reference",
            IssueKind::IoFailure => "io_failure",
        }
    }
}

/// Stable rule identifiers. Each rule belongs to exactly one [`IssueKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Rule {
    MissingSection,
    DuplicateSection,
    MisorderedSection,
    EmptySection,
    MisplacedDocument,
    MissingManifest,
    InvalidManifest,
    PathEscape,
    DuplicateTool,
    UnknownPlaceholder,
    MissingPlaceholder,
    RenderFailed,
    MissingSubtree,
    MissingPersonaRoot,
    EmptyPersonaRoot,
    MissingExpectedPersona,
    OrphanedPersona,
    AmbiguousTechnology,
    UnreadableFile,
    DocumentTooLarge,
}

impl Rule {
    pub fn as_str(self) -> &'static str {
        match self {
            Rule::MissingSection => "missing-section",
            Rule::DuplicateSection => "duplicate-section",
            Rule::MisorderedSection => "misordered-section",
            Rule::EmptySection => "empty-section",
            Rule::MisplacedDocument => "misplaced-document",
            Rule::MissingManifest => "missing-manifest",
            Rule::InvalidManifest => "invalid-manifest",
            Rule::PathEscape => "path-escape",
            Rule::DuplicateTool => "duplicate-tool",
            Rule::UnknownPlaceholder => "unknown-placeholder",
            Rule::MissingPlaceholder => "missing-placeholder",
            Rule::RenderFailed => "render-failed",
            Rule::MissingSubtree => "missing-subtree",
            Rule::MissingPersonaRoot => "missing-persona-root",
            Rule::EmptyPersonaRoot => "empty-persona-root",
            Rule::MissingExpectedPersona => "missing-expected-persona",
            Rule::OrphanedPersona => "orphaned-persona",
            Rule::AmbiguousTechnology => "ambiguous-technology",
            Rule::UnreadableFile => "unreadable-file",
            Rule::DocumentTooLarge => "document-too-large",
        }
    }

    pub fn kind(self) -> IssueKind {
        match self {
            Rule::MissingSection
            | Rule::DuplicateSection
            | Rule::MisorderedSection
            | Rule::EmptySection
            | Rule::MisplacedDocument
            | Rule::MissingManifest
            | Rule::InvalidManifest
            | Rule::PathEscape
            | Rule::DuplicateTool
            | Rule::UnknownPlaceholder => IssueKind::StructuralViolation,
            Rule::MissingPlaceholder
            | Rule::RenderFailed
            | Rule::MissingSubtree
            | Rule::MissingPersonaRoot
            | Rule::EmptyPersonaRoot
            | Rule::MissingExpectedPersona
            | Rule::OrphanedPersona => IssueKind::DanglingReference,
            Rule::AmbiguousTechnology => IssueKind::AmbiguousReference,
            Rule::UnreadableFile | Rule::DocumentTooLarge => IssueKind::IoFailure,
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single defect found anywhere in the run.
///
/// Issues are collected, never thrown. Field order matters: the derived `Ord`
/// sorts by path first so reports are stable regardless of completion order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ValidationIssue {
    /// Document path relative to the input root, `/`-separated.
    pub path: String,
    pub severity: Severity,
    pub rule: Rule,
    pub message: String,
}

impl ValidationIssue {
    pub fn error(path: impl Into<String>, rule: Rule, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            severity: Severity::Error,
            rule,
            message: message.into(),
        }
    }

    pub fn warning(path: impl Into<String>, rule: Rule, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            severity: Severity::Warning,
            rule,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> IssueKind {
        self.rule.kind()
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// True if any issue in `issues` has error severity.
pub fn has_errors(issues: &[ValidationIssue]) -> bool {
    issues.iter().any(ValidationIssue::is_error)
}
