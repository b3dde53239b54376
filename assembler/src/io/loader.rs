//! Document loading: walk the modes and personas subtrees into an immutable
//! in-memory index.
//!
//! A file that cannot be read degrades to a single issue; only a missing or
//! unusable input root is fatal.

use std::collections::{BTreeMap, BTreeSet};
use std::ffi::OsStr;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use tokio::task::JoinSet;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::core::document::Document;
use crate::core::layout::Layout;
use crate::core::types::{Origin, Rule, ValidationIssue};

/// Every loaded document keyed by input-relative path.
#[derive(Debug, Clone, Default)]
pub struct DocumentIndex {
    documents: BTreeMap<String, Arc<Document>>,
    /// Directories under the personas subtree, the subtree root included.
    persona_directories: BTreeSet<String>,
}

impl DocumentIndex {
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn get(&self, path: &str) -> Option<&Arc<Document>> {
        self.documents.get(path)
    }

    /// Documents in path order.
    pub fn documents(&self) -> impl Iterator<Item = &Arc<Document>> {
        self.documents.values()
    }

    pub fn persona_directories(&self) -> &BTreeSet<String> {
        &self.persona_directories
    }
}

#[derive(Debug, Default)]
pub struct LoadedTree {
    pub index: DocumentIndex,
    /// Per-file failures; none of them abort the load.
    pub issues: Vec<ValidationIssue>,
}

/// A file found by the walk, not yet read.
#[derive(Debug, Clone)]
struct Candidate {
    rel: String,
    abs: PathBuf,
    origin: Origin,
}

#[derive(Debug, Default)]
struct WalkResult {
    candidates: Vec<Candidate>,
    persona_directories: BTreeSet<String>,
    issues: Vec<ValidationIssue>,
}

/// Load every document under the configured subtrees of `input`.
pub async fn load_tree(
    input: &Path,
    layout: &Layout,
    max_document_bytes: u64,
) -> Result<LoadedTree> {
    let root = fs::canonicalize(input)
        .with_context(|| format!("resolve input root {}", input.display()))?;
    if !root.is_dir() {
        return Err(anyhow!("input root {} is not a directory", input.display()));
    }

    let walk_root = root.clone();
    let walk_layout = layout.clone();
    let walked = tokio::task::spawn_blocking(move || walk(&walk_root, &walk_layout))
        .await
        .context("directory walk task failed")?;
    info!(
        candidates = walked.candidates.len(),
        issues = walked.issues.len(),
        "input tree walked"
    );

    let mut tasks = JoinSet::new();
    for candidate in walked.candidates {
        tasks.spawn_blocking(move || read_document(candidate, max_document_bytes));
    }

    let mut documents = BTreeMap::new();
    let mut issues = walked.issues;
    while let Some(joined) = tasks.join_next().await {
        match joined.context("document load task failed")? {
            Ok(document) => {
                documents.insert(document.path.clone(), Arc::new(document));
            }
            Err(issue) => issues.push(issue),
        }
    }
    debug!(documents = documents.len(), "documents loaded");

    Ok(LoadedTree {
        index: DocumentIndex {
            documents,
            persona_directories: walked.persona_directories,
        },
        issues,
    })
}

fn walk(root: &Path, layout: &Layout) -> WalkResult {
    let mut result = WalkResult::default();
    for (dir, origin) in [
        (&layout.modes_dir, Origin::Modes),
        (&layout.personas_dir, Origin::Personas),
    ] {
        let subtree = root.join(dir);
        if !subtree.is_dir() {
            result.issues.push(ValidationIssue::warning(
                dir.as_str(),
                Rule::MissingSubtree,
                format!("{dir}/ does not exist under the input root"),
            ));
            continue;
        }
        if let Some(issue) = check_subtree(root, &subtree, dir) {
            result.issues.push(issue);
            continue;
        }
        walk_subtree(root, &subtree, origin, &layout.extension, &mut result);
    }
    result
}

/// A subtree that resolves outside the input root is an error. A subtree
/// that is itself a symlink is never walked, even when it stays inside.
fn check_subtree(root: &Path, subtree: &Path, dir: &str) -> Option<ValidationIssue> {
    let target = match fs::canonicalize(subtree) {
        Ok(target) => target,
        Err(err) => {
            return Some(ValidationIssue::error(
                dir,
                Rule::UnreadableFile,
                format!("cannot resolve {dir}/: {err}"),
            ));
        }
    };
    if !target.starts_with(root) {
        return Some(ValidationIssue::error(
            dir,
            Rule::PathEscape,
            format!("{dir}/ resolves to {}, outside the input root", target.display()),
        ));
    }
    let linked = fs::symlink_metadata(subtree).is_ok_and(|meta| meta.file_type().is_symlink());
    linked.then(|| {
        ValidationIssue::warning(
            dir,
            Rule::MissingSubtree,
            format!(
                "{dir}/ is a symlink to {}; symlinked directories are not followed",
                target.display()
            ),
        )
    })
}

fn walk_subtree(
    root: &Path,
    subtree: &Path,
    origin: Origin,
    extension: &str,
    result: &mut WalkResult,
) {
    let entries = WalkDir::new(subtree)
        .follow_links(false)
        .follow_root_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry.file_name()));

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let path = err
                    .path()
                    .and_then(|path| relative_path(root, path))
                    .unwrap_or_else(|| subtree.display().to_string());
                result.issues.push(ValidationIssue::error(
                    path,
                    Rule::UnreadableFile,
                    format!("cannot read directory entry: {err}"),
                ));
                continue;
            }
        };

        let Some(rel) = relative_path(root, entry.path()) else {
            result.issues.push(ValidationIssue::error(
                entry.path().to_string_lossy(),
                Rule::UnreadableFile,
                "path is not valid UTF-8",
            ));
            continue;
        };

        let file_type = entry.file_type();
        if file_type.is_dir() {
            if origin == Origin::Personas {
                result.persona_directories.insert(rel);
            }
            continue;
        }
        if entry.path().extension() != Some(OsStr::new(extension)) {
            continue;
        }
        if file_type.is_symlink() {
            match fs::canonicalize(entry.path()) {
                Ok(target) if !target.starts_with(root) => {
                    result.issues.push(ValidationIssue::error(
                        rel,
                        Rule::PathEscape,
                        format!("symlink target {} is outside the input root", target.display()),
                    ));
                    continue;
                }
                Ok(target) if !target.is_file() => {
                    debug!(path = %rel, "skipping symlink to non-file");
                    continue;
                }
                Ok(_) => {}
                Err(err) => {
                    result.issues.push(ValidationIssue::error(
                        rel,
                        Rule::UnreadableFile,
                        format!("cannot resolve symlink: {err}"),
                    ));
                    continue;
                }
            }
        } else if !file_type.is_file() {
            continue;
        }

        result.candidates.push(Candidate {
            rel,
            abs: entry.into_path(),
            origin,
        });
    }
}

fn read_document(
    candidate: Candidate,
    max_document_bytes: u64,
) -> Result<Document, ValidationIssue> {
    let Candidate { rel, abs, origin } = candidate;
    let unreadable =
        |err: std::io::Error| ValidationIssue::error(&rel, Rule::UnreadableFile, err.to_string());
    let size = fs::metadata(&abs).map_err(unreadable)?.len();
    if size > max_document_bytes {
        return Err(ValidationIssue::error(
            &rel,
            Rule::DocumentTooLarge,
            format!("document is {size} bytes; the limit is {max_document_bytes}"),
        ));
    }
    let bytes = fs::read(&abs).map_err(unreadable)?;
    let text = String::from_utf8(bytes).map_err(|err| {
        ValidationIssue::error(
            &rel,
            Rule::UnreadableFile,
            format!("document is not valid UTF-8: {err}"),
        )
    })?;
    Ok(Document::parse(rel, origin, text))
}

fn is_hidden(name: &OsStr) -> bool {
    name.to_str().is_some_and(|name| name.starts_with('.'))
}

/// `/`-separated path of `path` relative to `root`.
fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let rest = path.strip_prefix(root).ok()?;
    let mut parts = Vec::new();
    for component in rest.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?),
            _ => return None,
        }
    }
    Some(parts.join("/"))
}
