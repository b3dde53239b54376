//! Mode manifest: the `+++` TOML block at the top of every mode template.
//!
//! The manifest is converted to JSON and checked against the embedded v1
//! schema before it is deserialized, so schema messages reach the report
//! instead of serde's first-error-only diagnostics.

use std::sync::LazyLock;

use anyhow::{Context, Result, anyhow};
use jsonschema::Validator;
use serde::Deserialize;
use serde_json::Value;

const MANIFEST_SCHEMA: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../schemas/mode_manifest/v1.schema.json"
));

static MANIFEST_VALIDATOR: LazyLock<Validator> = LazyLock::new(|| {
    let schema: Value =
        serde_json::from_str(MANIFEST_SCHEMA).expect("embedded manifest schema should be json");
    jsonschema::validator_for(&schema).expect("embedded manifest schema should compile")
});

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ModeManifest {
    pub persona_root: String,
    pub tools: Vec<String>,
    #[serde(default)]
    pub expected_personas: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Parse and schema-check a manifest body (the text between the `+++` fences).
pub fn parse_manifest(raw: &str) -> Result<ModeManifest> {
    let table: toml::Table = toml::from_str(raw).context("parse manifest toml")?;
    let value = serde_json::to_value(&table).context("convert manifest to json")?;
    let messages: Vec<String> = MANIFEST_VALIDATOR
        .iter_errors(&value)
        .map(|err| err.to_string())
        .collect();
    if !messages.is_empty() {
        return Err(anyhow!(
            "manifest schema validation failed: {}",
            messages.join("; ")
        ));
    }
    serde_json::from_value(value).context("deserialize manifest")
}

/// Split a manifest persona root into path segments.
///
/// `.` and empty segments are dropped (so `"."` selects the whole persona
/// tree). Absolute paths and `..` segments are rejected because they would
/// reach outside the personas directory.
pub fn persona_root_segments(root: &str) -> Result<Vec<String>> {
    if root.starts_with('/') || root.starts_with('\\') {
        return Err(anyhow!("persona_root '{root}' must be relative"));
    }
    let mut segments = Vec::new();
    for segment in root.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => return Err(anyhow!("persona_root '{root}' must not contain '..'")),
            other => segments.push(other.to_string()),
        }
    }
    Ok(segments)
}
