//! One assembler run: load -> validate -> resolve -> assemble -> write.
//!
//! Per-document and per-mode work runs on the blocking pool. The only shared
//! mutable state is the [`IssueSink`]; everything else is immutable and
//! shared through `Arc`.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use parking_lot::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::core::assembler::{AssembledArtifact, assemble};
use crate::core::layout::Layout;
use crate::core::resolver::{PersonaCatalog, find_orphans, resolve};
use crate::core::types::ValidationIssue;
use crate::core::validator::{ModeDefinition, PersonaDocument, Validated, validate_document};
use crate::io::config::AssemblerConfig;
use crate::io::loader::{DocumentIndex, load_tree};
use crate::io::writer::{prepare_output_root, write_artifacts};
use crate::report::RunReport;

/// Concurrent append-only issue collection.
#[derive(Debug, Clone, Default)]
pub struct IssueSink {
    issues: Arc<Mutex<Vec<ValidationIssue>>>,
}

impl IssueSink {
    pub fn push(&self, issue: ValidationIssue) {
        self.issues.lock().push(issue);
    }

    pub fn extend(&self, issues: impl IntoIterator<Item = ValidationIssue>) {
        self.issues.lock().extend(issues);
    }

    /// Issues collected so far.
    pub fn count(&self) -> usize {
        self.issues.lock().len()
    }

    /// Everything collected so far, in path order.
    pub fn sorted(&self) -> Vec<ValidationIssue> {
        let mut issues = self.issues.lock().clone();
        issues.sort();
        issues
    }
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub input: PathBuf,
    pub output: PathBuf,
    pub config: AssemblerConfig,
    /// Run every stage except writing.
    pub dry_run: bool,
}

#[derive(Debug)]
pub struct RunOutcome {
    pub report: RunReport,
    /// Assembled artifacts in slug order, written or not.
    pub artifacts: Vec<AssembledArtifact>,
}

/// Execute a full run. `Err` means the run could not complete at all.
pub async fn run(options: &RunOptions) -> Result<RunOutcome> {
    let layout = options.config.layout();
    if !options.dry_run {
        prepare_output_root(&options.output)?;
    }

    let loaded = load_tree(&options.input, &layout, options.config.max_document_bytes).await?;
    let sink = IssueSink::default();
    sink.extend(loaded.issues);
    let index = loaded.index;
    info!(documents = index.len(), "documents loaded");

    let (modes, personas) = validate_all(&index, &layout, &sink).await?;
    info!(
        modes = modes.len(),
        personas = personas.len(),
        issues = sink.count(),
        "validation finished"
    );

    let catalog = Arc::new(PersonaCatalog::new(
        personas,
        index.persona_directories().iter().cloned(),
    ));
    let roots: Vec<String> = modes.iter().map(|mode| mode.persona_root.clone()).collect();
    let artifacts = assemble_all(modes, &catalog, &sink).await?;

    let root_refs: Vec<&str> = roots.iter().map(String::as_str).collect();
    sink.extend(find_orphans(&catalog, &root_refs));

    let written = write_artifacts(
        &options.output,
        &options.config.output_extension,
        &artifacts,
        options.dry_run,
    )?;
    info!(
        artifacts = written.len(),
        dry_run = options.dry_run,
        "artifacts written"
    );

    let report = RunReport::build(index.len(), sink.sorted(), &written);
    Ok(RunOutcome { report, artifacts })
}

async fn validate_all(
    index: &DocumentIndex,
    layout: &Layout,
    sink: &IssueSink,
) -> Result<(Vec<ModeDefinition>, Vec<PersonaDocument>)> {
    let layout = Arc::new(layout.clone());
    let mut tasks = JoinSet::new();
    for doc in index.documents() {
        let doc = Arc::clone(doc);
        let layout = Arc::clone(&layout);
        let sink = sink.clone();
        tasks.spawn_blocking(move || {
            let outcome = validate_document(&doc, &layout);
            debug!(path = %doc.path, issues = outcome.issues.len(), "document validated");
            sink.extend(outcome.issues);
            outcome.record
        });
    }

    let mut modes = Vec::new();
    let mut personas = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined.context("validation task failed")? {
            Some(Validated::Mode(mode)) => modes.push(mode),
            Some(Validated::Persona(persona)) => personas.push(persona),
            None => {}
        }
    }
    modes.sort_by(|a, b| a.slug.cmp(&b.slug));
    Ok((modes, personas))
}

async fn assemble_all(
    modes: Vec<ModeDefinition>,
    catalog: &Arc<PersonaCatalog>,
    sink: &IssueSink,
) -> Result<Vec<AssembledArtifact>> {
    let mut tasks = JoinSet::new();
    for mode in modes {
        let catalog = Arc::clone(catalog);
        let sink = sink.clone();
        tasks.spawn_blocking(move || {
            let resolution = resolve(&mode, &catalog);
            debug!(
                mode = %mode.slug,
                personas = resolution.references.len(),
                "persona tree resolved"
            );
            sink.extend(resolution.issues);
            match assemble(&mode, resolution.references, Utc::now()) {
                Ok(artifact) => Some(artifact),
                Err(issues) => {
                    debug!(mode = %mode.slug, "assembly skipped");
                    sink.extend(issues);
                    None
                }
            }
        });
    }

    let mut artifacts = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        if let Some(artifact) = joined.context("assembly task failed")? {
            artifacts.push(artifact);
        }
    }
    artifacts.sort_by(|a, b| a.slug.cmp(&b.slug));
    Ok(artifacts)
}
