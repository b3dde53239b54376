//! Mode templates as a tagged sequence of typed segments.
//!
//! The body of a mode document is cut at every level-2 heading and at every
//! placeholder marker. Markers follow the format `<!-- placeholder:NAME -->`;
//! markers inside fenced code blocks are plain text. Concatenating the segments reproduces the body exactly, except that each
//! known marker becomes a [`Segment::Placeholder`].

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

use super::document::Document;
use super::grammar::{Grammar, SECTION_LEVEL};

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<!--\s*placeholder:([A-Za-z0-9_-]+)\s*-->").unwrap());

/// Placeholders the assembler knows how to fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaceholderKind {
    PersonaTree,
    Tools,
}

impl PlaceholderKind {
    pub const ALL: [PlaceholderKind; 2] = [PlaceholderKind::PersonaTree, PlaceholderKind::Tools];

    pub fn name(self) -> &'static str {
        match self {
            PlaceholderKind::PersonaTree => "persona_tree",
            PlaceholderKind::Tools => "tools",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Text outside any section heading: the preamble, or the remainder of a
    /// section after a placeholder. Unknown placeholder markers also land here.
    Text(String),
    /// Heading line plus body (up to the next placeholder) of a grammar section.
    RequiredSection { heading: String, text: String },
    /// Same shape as `RequiredSection`, for mode-specific extra sections.
    FreeformSection { heading: String, text: String },
    Placeholder(PlaceholderKind),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pub segments: Vec<Segment>,
    /// Names of `placeholder:` markers that are not a [`PlaceholderKind`].
    pub unknown_placeholders: Vec<String>,
}

impl Template {
    /// Parse the body of `doc` into segments, classifying sections by `grammar`.
    pub fn parse(doc: &Document, grammar: &Grammar) -> Self {
        let mut segments = Vec::new();
        let mut unknown_placeholders = Vec::new();
        let top_level: Vec<_> = doc
            .sections
            .iter()
            .filter(|section| section.level <= SECTION_LEVEL)
            .collect();

        let mut cursor = doc.body_start;
        for (idx, section) in top_level.iter().enumerate() {
            // A level-1 heading opens no segment of its own; its text stays
            // with whatever precedes the next level-2 heading.
            if section.level != SECTION_LEVEL {
                continue;
            }
            let start = section.heading_span.start;
            if start > cursor {
                split_markers(
                    doc,
                    cursor..start,
                    None,
                    &mut segments,
                    &mut unknown_placeholders,
                );
            }
            let end = top_level[idx + 1..]
                .iter()
                .find(|next| next.level == SECTION_LEVEL)
                .map(|next| next.heading_span.start)
                .unwrap_or(doc.text.len());
            let opener = SectionOpener {
                heading: section.heading.clone(),
                required: grammar.is_required(&section.heading),
            };
            split_markers(
                doc,
                start..end,
                Some(opener),
                &mut segments,
                &mut unknown_placeholders,
            );
            cursor = end;
        }
        if cursor < doc.text.len() {
            split_markers(
                doc,
                cursor..doc.text.len(),
                None,
                &mut segments,
                &mut unknown_placeholders,
            );
        }

        Self {
            segments,
            unknown_placeholders,
        }
    }

    pub fn contains(&self, kind: PlaceholderKind) -> bool {
        self.segments
            .iter()
            .any(|segment| *segment == Segment::Placeholder(kind))
    }

    /// Required placeholders that never occur in the template.
    pub fn missing_placeholders(&self) -> Vec<PlaceholderKind> {
        PlaceholderKind::ALL
            .into_iter()
            .filter(|kind| !self.contains(*kind))
            .collect()
    }

    /// Render with `fill` supplying the text for each placeholder.
    pub fn render(&self, mut fill: impl FnMut(PlaceholderKind) -> String) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text)
                | Segment::RequiredSection { text, .. }
                | Segment::FreeformSection { text, .. } => out.push_str(text),
                Segment::Placeholder(kind) => out.push_str(&fill(*kind)),
            }
        }
        out
    }
}

struct SectionOpener {
    heading: String,
    required: bool,
}

/// Split `doc.text[span]` at known placeholder markers outside code blocks.
///
/// The first piece becomes the section segment when `opener` is set; later
/// pieces are plain text.
fn split_markers(
    doc: &Document,
    span: Range<usize>,
    opener: Option<SectionOpener>,
    segments: &mut Vec<Segment>,
    unknown: &mut Vec<String>,
) {
    let chunk = &doc.text[span.clone()];
    let mut opener = opener;
    let mut last = 0;
    let push_text = |text: &str, opener: &mut Option<SectionOpener>, segments: &mut Vec<Segment>| {
        match opener.take() {
            Some(SectionOpener {
                heading,
                required: true,
            }) => segments.push(Segment::RequiredSection {
                heading,
                text: text.to_string(),
            }),
            Some(SectionOpener {
                heading,
                required: false,
            }) => segments.push(Segment::FreeformSection {
                heading,
                text: text.to_string(),
            }),
            None if !text.is_empty() => segments.push(Segment::Text(text.to_string())),
            None => {}
        }
    };

    for caps in PLACEHOLDER_RE.captures_iter(chunk) {
        let (Some(marker), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if doc.in_code_block(span.start + marker.start()) {
            continue;
        }
        let Some(kind) = PlaceholderKind::from_name(name.as_str()) else {
            unknown.push(name.as_str().to_string());
            continue;
        };
        push_text(&chunk[last..marker.start()], &mut opener, segments);
        segments.push(Segment::Placeholder(kind));
        last = marker.end();
    }
    push_text(&chunk[last..], &mut opener, segments);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::grammar::MODE_GRAMMAR;
    use crate::core::types::Origin;

    const TEMPLATE: &str = "+++\npersona_root = \"web\"\ntools = []\n+++\n# Web Mode\n\n## Role\nBuild UIs.\n\n## Notes\nfree text\n\n## Persona Tree\nUse these:\n<!-- placeholder:persona_tree -->\nafter\n## Tools\n<!--placeholder:tools-->\n<!-- placeholder:mystery -->\n";

    fn template() -> Template {
        let doc = Document::parse("modes/web.md", Origin::Modes, TEMPLATE);
        Template::parse(&doc, &MODE_GRAMMAR)
    }

    #[test]
    fn segments_are_typed() {
        let template = template();
        assert_eq!(
            template.segments,
            vec![
                Segment::Text("# Web Mode\n\n".to_string()),
                Segment::RequiredSection {
                    heading: "Role".to_string(),
                    text: "## Role\nBuild UIs.\n\n".to_string(),
                },
                Segment::FreeformSection {
                    heading: "Notes".to_string(),
                    text: "## Notes\nfree text\n\n".to_string(),
                },
                Segment::RequiredSection {
                    heading: "Persona Tree".to_string(),
                    text: "## Persona Tree\nUse these:\n".to_string(),
                },
                Segment::Placeholder(PlaceholderKind::PersonaTree),
                Segment::Text("\nafter\n".to_string()),
                Segment::RequiredSection {
                    heading: "Tools".to_string(),
                    text: "## Tools\n".to_string(),
                },
                Segment::Placeholder(PlaceholderKind::Tools),
                Segment::Text("\n<!-- placeholder:mystery -->\n".to_string()),
            ]
        );
        assert_eq!(template.unknown_placeholders, vec!["mystery".to_string()]);
    }

    #[test]
    fn render_substitutes_by_kind() {
        let rendered = template().render(|kind| format!("[{}]", kind.name()));
        assert!(rendered.contains("Use these:\n[persona_tree]\nafter"));
        assert!(rendered.contains("## Tools\n[tools]\n"));
        assert!(!rendered.contains("persona_root"));
    }

    #[test]
    fn reports_missing_placeholders() {
        let doc = Document::parse(
            "modes/a.md",
            Origin::Modes,
            "## Role\n## Tools\n<!-- placeholder:tools -->\n",
        );
        let template = Template::parse(&doc, &MODE_GRAMMAR);
        assert_eq!(template.missing_placeholders(), vec![PlaceholderKind::PersonaTree]);
    }

    #[test]
    fn markers_in_code_blocks_are_text() {
        let doc = Document::parse(
            "modes/a.md",
            Origin::Modes,
            "## Tools\nExample:\n```md\n<!-- placeholder:tools -->\n<!-- placeholder:other -->\n```\n<!-- placeholder:tools -->\n",
        );
        let template = Template::parse(&doc, &MODE_GRAMMAR);
        assert!(template.unknown_placeholders.is_empty());
        assert_eq!(
            template.segments,
            vec![
                Segment::RequiredSection {
                    heading: "Tools".to_string(),
                    text: "## Tools\nExample:\n```md\n<!-- placeholder:tools -->\n<!-- placeholder:other -->\n```\n".to_string(),
                },
                Segment::Placeholder(PlaceholderKind::Tools),
                Segment::Text("\n".to_string()),
            ]
        );
        let rendered = template.render(|_| "[filled]".to_string());
        assert!(rendered.contains("```md\n<!-- placeholder:tools -->\n"));
        assert!(rendered.ends_with("```\n[filled]\n"));
    }
}
