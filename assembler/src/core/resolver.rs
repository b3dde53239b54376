//! Persona tree resolution: which validated personas each mode can reach.
//!
//! Resolution reads only the immutable [`PersonaCatalog`]; it never touches
//! the filesystem. References come out in traversal order (directories
//! before files at each level, then alphabetical) so identical input always
//! renders identically.

use std::collections::{BTreeMap, BTreeSet};

use super::layout::{segments, strip_dir};
use super::types::{Rule, ValidationIssue};
use super::validator::{ModeDefinition, PersonaDocument};

/// Validated personas plus every directory that exists under the personas
/// tree, keyed by input-relative path.
#[derive(Debug, Clone, Default)]
pub struct PersonaCatalog {
    personas: BTreeMap<String, PersonaDocument>,
    directories: BTreeSet<String>,
}

impl PersonaCatalog {
    /// Build a catalog. Ancestor directories of each persona are recorded
    /// even when absent from `directories`.
    pub fn new(
        personas: impl IntoIterator<Item = PersonaDocument>,
        directories: impl IntoIterator<Item = String>,
    ) -> Self {
        let mut catalog = Self {
            personas: BTreeMap::new(),
            directories: directories.into_iter().collect(),
        };
        for persona in personas {
            let parts = segments(&persona.path);
            for depth in 1..parts.len() {
                catalog.directories.insert(parts[..depth].join("/"));
            }
            catalog.personas.insert(persona.path.clone(), persona);
        }
        catalog
    }

    pub fn has_directory(&self, path: &str) -> bool {
        self.directories.contains(path)
    }

    /// Personas strictly below `root`, in path order.
    pub fn descendants<'a>(
        &'a self,
        root: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a PersonaDocument)> + 'a {
        self.personas
            .iter()
            .filter_map(move |(path, persona)| strip_dir(path, root).map(|rest| (rest, persona)))
    }
}

/// One persona reachable from one mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonaReference {
    pub mode: String,
    pub persona_path: String,
    /// Directories between the mode's persona root and the file.
    pub category: Vec<String>,
    pub technology: String,
    pub title: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub references: Vec<PersonaReference>,
    /// Warnings only; resolution never blocks assembly.
    pub issues: Vec<ValidationIssue>,
}

/// Resolve the persona tree declared by `mode`.
pub fn resolve(mode: &ModeDefinition, catalog: &PersonaCatalog) -> Resolution {
    let root = mode.persona_root.as_str();
    let mut issues = Vec::new();

    if !catalog.has_directory(root) {
        issues.push(ValidationIssue::warning(
            &mode.path,
            Rule::MissingPersonaRoot,
            format!(
                "persona root '{}' ({root}) does not exist; persona section will be empty",
                mode.declared_root
            ),
        ));
        return Resolution {
            references: Vec::new(),
            issues,
        };
    }

    let mut keyed: Vec<(Vec<(u8, &str)>, PersonaReference)> = catalog
        .descendants(root)
        .filter_map(|(rest, persona)| {
            let parts = segments(rest);
            let (file, dirs) = parts.split_last()?;
            let mut key: Vec<(u8, &str)> = dirs.iter().map(|dir| (0, *dir)).collect();
            key.push((1, *file));
            let reference = PersonaReference {
                mode: mode.slug.clone(),
                persona_path: persona.path.clone(),
                category: dirs.iter().map(|dir| dir.to_string()).collect(),
                technology: persona.technology.clone(),
                title: persona.title.clone(),
            };
            Some((key, reference))
        })
        .collect();
    keyed.sort_by(|a, b| a.0.cmp(&b.0));
    let mut references: Vec<PersonaReference> =
        keyed.into_iter().map(|(_, reference)| reference).collect();
    references.dedup_by(|a, b| a.persona_path == b.persona_path);

    if references.is_empty() {
        issues.push(ValidationIssue::warning(
            &mode.path,
            Rule::EmptyPersonaRoot,
            format!("persona root '{root}' contains no valid personas"),
        ));
    }

    let mut by_technology: BTreeMap<String, Vec<&str>> = BTreeMap::new();
    for reference in &references {
        by_technology
            .entry(reference.technology.to_lowercase())
            .or_default()
            .push(&reference.persona_path);
    }
    for (technology, paths) in &by_technology {
        if paths.len() > 1 {
            issues.push(ValidationIssue::warning(
                &mode.path,
                Rule::AmbiguousTechnology,
                format!(
                    "technology '{technology}' appears at {} paths under '{root}': {}",
                    paths.len(),
                    paths.join(", ")
                ),
            ));
        }
    }

    for expected in &mode.expected_personas {
        if !by_technology.contains_key(&expected.to_lowercase()) {
            issues.push(ValidationIssue::warning(
                &mode.path,
                Rule::MissingExpectedPersona,
                format!("expected persona '{expected}' was not found under '{root}'"),
            ));
        }
    }

    Resolution { references, issues }
}

/// Personas not reachable from any of `roots`.
pub fn find_orphans(catalog: &PersonaCatalog, roots: &[&str]) -> Vec<ValidationIssue> {
    catalog
        .personas
        .keys()
        .filter(|path| !roots.iter().any(|root| strip_dir(path, root).is_some()))
        .map(|path| {
            ValidationIssue::warning(
                path.as_str(),
                Rule::OrphanedPersona,
                "persona is not reachable from any mode's persona root",
            )
        })
        .collect()
}
