//! Artifact output: one full-rewrite file per assembled mode.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::core::assembler::AssembledArtifact;

/// What the writer did with one artifact; feeds the run report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenArtifact {
    pub slug: String,
    pub source: String,
    pub description: Option<String>,
    /// `None` on a dry run.
    pub output: Option<PathBuf>,
    /// Persona paths the artifact references, in rendered order.
    pub personas: Vec<String>,
    pub sha256: String,
    pub generated_at: DateTime<Utc>,
}

/// `<output_root>/<slug>.<extension>`, mirroring the slug's directories.
pub fn artifact_path(output_root: &Path, slug: &str, extension: &str) -> PathBuf {
    let mut path = output_root.to_path_buf();
    let mut parts = slug.split('/').peekable();
    while let Some(segment) = parts.next() {
        if parts.peek().is_some() {
            path.push(segment);
        } else {
            path.push(format!("{segment}.{extension}"));
        }
    }
    path
}

/// Create the output root if needed and make sure it is a directory.
pub fn prepare_output_root(output_root: &Path) -> Result<()> {
    fs::create_dir_all(output_root)
        .with_context(|| format!("create output root {}", output_root.display()))?;
    if !output_root.is_dir() {
        anyhow::bail!("output root {} is not a directory", output_root.display());
    }
    Ok(())
}

/// Write every artifact, or only describe them when `dry_run` is set.
///
/// Every artifact is first written to a sibling temp file; nothing is renamed
/// into place until all of them are on disk. The first failure aborts the
/// whole stage and removes the temp files written so far.
pub fn write_artifacts(
    output_root: &Path,
    extension: &str,
    artifacts: &[AssembledArtifact],
    dry_run: bool,
) -> Result<Vec<WrittenArtifact>> {
    let outputs: Vec<Option<PathBuf>> = if dry_run {
        vec![None; artifacts.len()]
    } else {
        let mut staged: Vec<StagedFile> = Vec::with_capacity(artifacts.len());
        for artifact in artifacts {
            let path = artifact_path(output_root, &artifact.slug, extension);
            match StagedFile::stage(path, &artifact.text) {
                Ok(file) => staged.push(file),
                Err(err) => {
                    discard_all(&staged);
                    return Err(err.context(format!("write artifact for mode {}", artifact.slug)));
                }
            }
        }
        debug!(staged = staged.len(), "artifacts staged");
        commit_all(staged)?.into_iter().map(Some).collect()
    };

    Ok(artifacts
        .iter()
        .zip(outputs)
        .map(|(artifact, output)| WrittenArtifact {
            slug: artifact.slug.clone(),
            source: artifact.source.clone(),
            description: artifact.description.clone(),
            output,
            personas: artifact
                .references
                .iter()
                .map(|reference| reference.persona_path.clone())
                .collect(),
            sha256: sha256_hex(&artifact.text),
            generated_at: artifact.generated_at,
        })
        .collect())
}

pub fn sha256_hex(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

/// Atomically write `contents` to `path` (temp file + rename).
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    StagedFile::stage(path.to_path_buf(), contents)?.commit()?;
    Ok(())
}

/// Contents written to `.{name}.tmp` next to their final path.
#[derive(Debug)]
struct StagedFile {
    tmp: PathBuf,
    path: PathBuf,
}

impl StagedFile {
    fn stage(path: PathBuf, contents: &str) -> Result<Self> {
        let parent = path
            .parent()
            .with_context(|| format!("output path missing parent {}", path.display()))?;
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
        let file_name = path
            .file_name()
            .with_context(|| format!("output path missing file name {}", path.display()))?;
        let tmp = parent.join(format!(".{}.tmp", file_name.to_string_lossy()));
        if let Err(err) = fs::write(&tmp, contents) {
            let _ = fs::remove_file(&tmp);
            return Err(err).with_context(|| format!("write temp file {}", tmp.display()));
        }
        Ok(Self { tmp, path })
    }

    fn commit(self) -> Result<PathBuf> {
        if let Err(err) = fs::rename(&self.tmp, &self.path) {
            self.discard();
            return Err(err).with_context(|| format!("replace {}", self.path.display()));
        }
        Ok(self.path)
    }

    fn discard(&self) {
        let _ = fs::remove_file(&self.tmp);
    }
}

fn discard_all(staged: &[StagedFile]) {
    for file in staged {
        file.discard();
    }
}

/// Rename every staged file into place. A failed rename discards the
/// remaining temp files.
fn commit_all(staged: Vec<StagedFile>) -> Result<Vec<PathBuf>> {
    let mut committed = Vec::with_capacity(staged.len());
    let mut failure = None;
    let mut pending = staged.into_iter();
    for file in pending.by_ref() {
        match file.commit() {
            Ok(path) => {
                debug!(path = %path.display(), "artifact written");
                committed.push(path);
            }
            Err(err) => {
                failure = Some(err);
                break;
            }
        }
    }
    if let Some(err) = failure {
        let rest: Vec<StagedFile> = pending.collect();
        discard_all(&rest);
        return Err(err);
    }
    Ok(committed)
}
