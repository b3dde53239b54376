//! Consolidated end-of-run report.
//!
//! Issues from every stage are grouped by document path and sorted, so the
//! report is stable regardless of task completion order.

use std::fmt::Write as _;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::core::types::{IssueKind, Rule, Severity, ValidationIssue};
use crate::exit_codes;
use crate::io::writer::WrittenArtifact;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub summary: Summary,
    /// Documents with at least one issue, in path order.
    pub documents: Vec<DocumentReport>,
    pub artifacts: Vec<ArtifactReport>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// Documents loaded from the input tree.
    pub documents: usize,
    pub modes_assembled: usize,
    pub errors: usize,
    pub warnings: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentReport {
    pub path: String,
    pub issues: Vec<IssueReport>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssueReport {
    pub severity: Severity,
    pub kind: IssueKind,
    pub rule: Rule,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactReport {
    pub mode: String,
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub output: Option<String>,
    pub personas: Vec<String>,
    pub sha256: String,
    /// RFC 3339, UTC.
    pub generated_at: String,
}

impl RunReport {
    pub fn build(
        document_count: usize,
        mut issues: Vec<ValidationIssue>,
        artifacts: &[WrittenArtifact],
    ) -> Self {
        issues.sort();
        issues.dedup();

        let errors = issues.iter().filter(|issue| issue.is_error()).count();
        let summary = Summary {
            documents: document_count,
            modes_assembled: artifacts.len(),
            errors,
            warnings: issues.len() - errors,
        };

        let mut documents: Vec<DocumentReport> = Vec::new();
        for issue in issues {
            let entry = IssueReport {
                severity: issue.severity,
                kind: issue.kind(),
                rule: issue.rule,
                message: issue.message,
            };
            match documents.last_mut() {
                Some(last) if last.path == issue.path => last.issues.push(entry),
                _ => documents.push(DocumentReport {
                    path: issue.path,
                    issues: vec![entry],
                }),
            }
        }

        let mut artifacts: Vec<ArtifactReport> = artifacts
            .iter()
            .map(|artifact| ArtifactReport {
                mode: artifact.slug.clone(),
                source: artifact.source.clone(),
                description: artifact.description.clone(),
                output: artifact
                    .output
                    .as_ref()
                    .map(|path| path.display().to_string()),
                personas: artifact.personas.clone(),
                sha256: artifact.sha256.clone(),
                generated_at: artifact.generated_at.to_rfc3339(),
            })
            .collect();
        artifacts.sort_by(|a, b| a.mode.cmp(&b.mode));

        Self {
            summary,
            documents,
            artifacts,
        }
    }

    pub fn has_errors(&self) -> bool {
        self.summary.errors > 0
    }

    /// Exit code derived solely from error-severity issues.
    pub fn exit_code(&self) -> i32 {
        if self.has_errors() {
            exit_codes::INVALID
        } else {
            exit_codes::OK
        }
    }

    /// Pretty JSON with trailing newline.
    pub fn to_json(&self) -> Result<String> {
        let mut payload = serde_json::to_string_pretty(self).context("serialize report json")?;
        payload.push('\n');
        Ok(payload)
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for document in &self.documents {
            let _ = writeln!(out, "{}", document.path);
            for issue in &document.issues {
                let _ = writeln!(
                    out,
                    "  {:<7} {}: {}",
                    issue.severity.as_str(),
                    issue.rule,
                    issue.message
                );
            }
        }
        if !self.artifacts.is_empty() {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str("artifacts:\n");
            for artifact in &self.artifacts {
                let target = artifact.output.as_deref().unwrap_or("(dry run)");
                let _ = writeln!(
                    out,
                    "  {} -> {} ({} personas)",
                    artifact.mode,
                    target,
                    artifact.personas.len()
                );
            }
        }
        if !out.is_empty() {
            out.push('\n');
        }
        let _ = writeln!(
            out,
            "summary: {} documents, {} modes assembled, {} errors, {} warnings",
            self.summary.documents,
            self.summary.modes_assembled,
            self.summary.errors,
            self.summary.warnings
        );
        out
    }
}
