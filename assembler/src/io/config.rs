//! Assembler configuration stored in `assembler.toml` at the input root.

use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use super::writer::write_atomic;
use crate::core::layout::Layout;

pub const CONFIG_FILE_NAME: &str = "assembler.toml";

/// Assembler configuration (TOML).
///
/// Every field is optional in the file; missing fields take the defaults
/// below, and a missing file means all defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AssemblerConfig {
    /// Mode templates directory, relative to the input root.
    pub modes_dir: String,

    /// Persona documents directory, relative to the input root.
    pub personas_dir: String,

    /// Input document extension, without the dot.
    pub extension: String,

    /// Extension given to written artifacts.
    pub output_extension: String,

    /// Documents larger than this are reported instead of parsed.
    pub max_document_bytes: u64,

    /// Worker threads for blocking stages. `0` uses available parallelism.
    pub jobs: usize,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            modes_dir: "modes".to_string(),
            personas_dir: "personas".to_string(),
            extension: "md".to_string(),
            output_extension: "md".to_string(),
            max_document_bytes: 1024 * 1024,
            jobs: 0,
        }
    }
}

impl AssemblerConfig {
    pub fn validate(&self) -> Result<()> {
        validate_dir("modes_dir", &self.modes_dir)?;
        validate_dir("personas_dir", &self.personas_dir)?;
        if normalize_dir(&self.modes_dir) == normalize_dir(&self.personas_dir) {
            return Err(anyhow!("modes_dir and personas_dir must differ"));
        }
        validate_extension("extension", &self.extension)?;
        validate_extension("output_extension", &self.output_extension)?;
        if self.max_document_bytes == 0 {
            return Err(anyhow!("max_document_bytes must be > 0"));
        }
        Ok(())
    }

    pub fn layout(&self) -> Layout {
        Layout {
            modes_dir: normalize_dir(&self.modes_dir),
            personas_dir: normalize_dir(&self.personas_dir),
            extension: self.extension.clone(),
        }
    }

    /// Effective worker count: `jobs`, or available parallelism when `0`.
    pub fn effective_jobs(&self) -> usize {
        match self.jobs {
            0 => std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1),
            jobs => jobs,
        }
    }
}

fn validate_dir(key: &str, dir: &str) -> Result<()> {
    let trimmed = dir.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("{key} must be non-empty"));
    }
    if trimmed.starts_with('/') || trimmed.starts_with('\\') || Path::new(trimmed).is_absolute() {
        return Err(anyhow!("{key} must be relative to the input root"));
    }
    if trimmed.split(['/', '\\']).any(|segment| segment == "..") {
        return Err(anyhow!("{key} must not contain '..'"));
    }
    if normalize_dir(trimmed).is_empty() {
        return Err(anyhow!("{key} must name a subdirectory"));
    }
    Ok(())
}

fn validate_extension(key: &str, extension: &str) -> Result<()> {
    if extension.trim().is_empty() {
        return Err(anyhow!("{key} must be non-empty"));
    }
    if extension.starts_with('.') {
        return Err(anyhow!("{key} must not start with '.'"));
    }
    if extension.contains(['/', '\\']) {
        return Err(anyhow!("{key} must not contain path separators"));
    }
    Ok(())
}

/// `./a//b/` -> `a/b`.
fn normalize_dir(dir: &str) -> String {
    dir.trim()
        .split(['/', '\\'])
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// Config file location: the explicit path, or `assembler.toml` in `input`.
pub fn config_path(input: &Path, explicit: Option<&Path>) -> PathBuf {
    match explicit {
        Some(path) => path.to_path_buf(),
        None => input.join(CONFIG_FILE_NAME),
    }
}

/// Load the config for a run. An explicitly requested file must exist.
pub fn load_for_input(input: &Path, explicit: Option<&Path>) -> Result<AssemblerConfig> {
    let path = config_path(input, explicit);
    if explicit.is_some() && !path.exists() {
        return Err(anyhow!("config file {} does not exist", path.display()));
    }
    load_config(&path)
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `AssemblerConfig::default()`.
pub fn load_config(path: &Path) -> Result<AssemblerConfig> {
    if !path.exists() {
        let cfg = AssemblerConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: AssemblerConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &AssemblerConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}
