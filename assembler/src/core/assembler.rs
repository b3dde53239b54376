//! Mode assembly: template + resolved persona tree + tools -> artifact text.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use minijinja::{Environment, context};
use serde::Serialize;

use super::resolver::PersonaReference;
use super::template::PlaceholderKind;
use super::types::{Rule, ValidationIssue};
use super::validator::ModeDefinition;

const PERSONA_TREE_TEMPLATE: &str = include_str!("render/persona_tree.md");
const TOOLS_TEMPLATE: &str = include_str!("render/tools.md");

static RENDER_ENV: LazyLock<Environment<'static>> = LazyLock::new(|| {
    let mut env = Environment::new();
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);
    env.add_template("persona_tree", PERSONA_TREE_TEMPLATE)
        .expect("persona tree template should be valid");
    env.add_template("tools", TOOLS_TEMPLATE)
        .expect("tools template should be valid");
    env
});

/// Final configuration document for one mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledArtifact {
    pub slug: String,
    /// Path of the mode template this was assembled from.
    pub source: String,
    /// The mode's manifest description, carried into the run report.
    pub description: Option<String>,
    pub text: String,
    pub references: Vec<PersonaReference>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct CategoryGroup<'a> {
    heading: String,
    entries: Vec<EntryContext<'a>>,
}

#[derive(Debug, Serialize)]
struct EntryContext<'a> {
    technology: &'a str,
    title: &'a str,
    path: &'a str,
}

/// Generated-file banner placed at the top of every artifact.
pub fn banner(source: &str) -> String {
    format!("<!-- Generated by assembler from {source}. Do not edit by hand. -->\n\n")
}

/// Assemble one mode. Fails with error issues when the template cannot be
/// filled; the caller skips the artifact and carries on.
pub fn assemble(
    mode: &ModeDefinition,
    references: Vec<PersonaReference>,
    generated_at: DateTime<Utc>,
) -> Result<AssembledArtifact, Vec<ValidationIssue>> {
    let missing = mode.template.missing_placeholders();
    if !missing.is_empty() {
        return Err(missing
            .into_iter()
            .map(|kind| {
                ValidationIssue::error(
                    &mode.path,
                    Rule::MissingPlaceholder,
                    format!(
                        "template has no <!-- placeholder:{} --> marker; artifact skipped",
                        kind.name()
                    ),
                )
            })
            .collect());
    }

    let persona_tree = render_persona_tree(&mode.persona_root, &references)
        .map_err(|err| vec![render_failed(mode, PlaceholderKind::PersonaTree, &err)])?;
    let tools = render_tools(&mode.tools)
        .map_err(|err| vec![render_failed(mode, PlaceholderKind::Tools, &err)])?;

    let body = mode.template.render(|kind| match kind {
        PlaceholderKind::PersonaTree => persona_tree.clone(),
        PlaceholderKind::Tools => tools.clone(),
    });
    let mut text = banner(&mode.path);
    text.push_str(body.trim_start_matches('\n'));

    Ok(AssembledArtifact {
        slug: mode.slug.clone(),
        source: mode.path.clone(),
        description: mode.description.clone(),
        text,
        references,
        generated_at,
    })
}

/// Render references grouped by category, in the order given.
pub fn render_persona_tree(
    root: &str,
    references: &[PersonaReference],
) -> Result<String, minijinja::Error> {
    let mut groups: Vec<CategoryGroup<'_>> = Vec::new();
    let mut current: Option<&[String]> = None;
    for reference in references {
        if current != Some(reference.category.as_slice()) {
            let mut heading = root.to_string();
            for dir in &reference.category {
                heading.push('/');
                heading.push_str(dir);
            }
            groups.push(CategoryGroup {
                heading,
                entries: Vec::new(),
            });
            current = Some(reference.category.as_slice());
        }
        if let Some(group) = groups.last_mut() {
            group.entries.push(EntryContext {
                technology: &reference.technology,
                title: &reference.title,
                path: &reference.persona_path,
            });
        }
    }
    let rendered = RENDER_ENV
        .get_template("persona_tree")?
        .render(context! { groups => groups })?;
    Ok(rendered.trim_end().to_string())
}

pub fn render_tools(tools: &[String]) -> Result<String, minijinja::Error> {
    let rendered = RENDER_ENV
        .get_template("tools")?
        .render(context! { tools => tools })?;
    Ok(rendered.trim_end().to_string())
}

fn render_failed(
    mode: &ModeDefinition,
    kind: PlaceholderKind,
    err: &minijinja::Error,
) -> ValidationIssue {
    ValidationIssue::error(
        &mode.path,
        Rule::RenderFailed,
        format!("failed to render {} section: {err}", kind.name()),
    )
}
