//! In-memory document model: raw text plus its parsed heading outline.
//!
//! Parsing is purely structural. Only ATX headings outside fenced code blocks
//! are recognised; the content between headings is treated as opaque payload.

use std::ops::Range;

use super::grammar::sniff_kind;
use super::types::{DocumentKind, Origin};

const FRONT_MATTER_FENCE: &str = "+++";

/// One heading and the byte spans it owns within [`Document::text`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub heading: String,
    pub level: u8,
    /// Span of the heading line itself (including its line terminator).
    pub heading_span: Range<usize>,
    /// Span from the line after the heading to the next heading of the same
    /// or a higher level.
    pub body: Range<usize>,
}

/// A loaded document. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Path relative to the input root, `/`-separated.
    pub path: String,
    pub origin: Origin,
    pub text: String,
    /// Kind detected by heading sniffing; `None` when inconclusive.
    pub kind: Option<DocumentKind>,
    /// Inner span of a leading `+++` TOML manifest, if present and closed.
    pub front_matter: Option<Range<usize>>,
    /// Byte offset where the body starts (after the manifest, if any).
    pub body_start: usize,
    pub sections: Vec<Section>,
    /// Spans of fenced code blocks in the body, fence lines included. An
    /// unclosed fence runs to the end of the text.
    pub code_blocks: Vec<Range<usize>>,
}

impl Document {
    pub fn parse(path: impl Into<String>, origin: Origin, text: impl Into<String>) -> Self {
        let path = path.into();
        let text = text.into();
        let (front_matter, body_start) = split_front_matter(&text);
        let (sections, code_blocks) = parse_sections(&text, body_start);
        let kind = sniff_kind(&sections);
        Self {
            path,
            origin,
            text,
            kind,
            front_matter,
            body_start,
            sections,
            code_blocks,
        }
    }

    /// Whether byte offset `pos` lies inside a fenced code block.
    pub fn in_code_block(&self, pos: usize) -> bool {
        self.code_blocks.iter().any(|block| block.contains(&pos))
    }

    pub fn byte_len(&self) -> usize {
        self.text.len()
    }

    pub fn body(&self) -> &str {
        &self.text[self.body_start..]
    }

    pub fn front_matter(&self) -> Option<&str> {
        self.front_matter.clone().map(|span| &self.text[span])
    }

    pub fn section_body(&self, section: &Section) -> &str {
        &self.text[section.body.clone()]
    }

    /// Headings at `level`, in document order.
    pub fn headings(&self, level: u8) -> Vec<&str> {
        self.sections
            .iter()
            .filter(|section| section.level == level)
            .map(|section| section.heading.as_str())
            .collect()
    }

    /// First level-1 heading.
    pub fn title(&self) -> Option<&str> {
        self.sections
            .iter()
            .find(|section| section.level == 1)
            .map(|section| section.heading.as_str())
            .filter(|heading| !heading.is_empty())
    }

    /// File name without its extension.
    pub fn file_stem(&self) -> &str {
        let name = self.path.rsplit('/').next().unwrap_or(&self.path);
        match name.rfind('.') {
            Some(idx) if idx > 0 => &name[..idx],
            _ => name,
        }
    }
}

/// Locate a `+++` fenced manifest at the very start of `text`.
///
/// Returns the inner span and the body start offset. An unterminated fence is
/// treated as ordinary body text.
fn split_front_matter(text: &str) -> (Option<Range<usize>>, usize) {
    let mut lines = LineIter::new(text, 0);
    let Some((first_span, first)) = lines.next() else {
        return (None, 0);
    };
    if first.trim_end() != FRONT_MATTER_FENCE {
        return (None, 0);
    }
    for (span, line) in lines {
        if line.trim_end() == FRONT_MATTER_FENCE {
            return (Some(first_span.end..span.start), span.end);
        }
    }
    (None, 0)
}

fn parse_sections(text: &str, body_start: usize) -> (Vec<Section>, Vec<Range<usize>>) {
    let mut headings: Vec<(u8, String, Range<usize>)> = Vec::new();
    let mut code_blocks = Vec::new();
    let mut fence: Option<(&str, usize)> = None;

    for (span, line) in LineIter::new(text, body_start) {
        let trimmed = line.trim_start();
        if let Some((marker, start)) = fence {
            if trimmed.starts_with(marker) {
                code_blocks.push(start..span.end);
                fence = None;
            }
            continue;
        }
        if let Some(marker) = ["```", "~~~"]
            .into_iter()
            .find(|marker| trimmed.starts_with(marker))
        {
            fence = Some((marker, span.start));
            continue;
        }
        if let Some((level, heading)) = parse_heading(line) {
            headings.push((level, heading, span));
        }
    }

    let mut sections = Vec::with_capacity(headings.len());
    for (idx, (level, heading, span)) in headings.iter().enumerate() {
        let end = headings[idx + 1..]
            .iter()
            .find(|(next_level, _, _)| next_level <= level)
            .map(|(_, _, next_span)| next_span.start)
            .unwrap_or(text.len());
        sections.push(Section {
            heading: heading.clone(),
            level: *level,
            heading_span: span.clone(),
            body: span.end..end,
        });
    }
    if let Some((_, start)) = fence {
        code_blocks.push(start..text.len());
    }
    (sections, code_blocks)
}

/// Parse an ATX heading line into `(level, text)`.
fn parse_heading(line: &str) -> Option<(u8, String)> {
    let line = line.trim_end_matches(['\n', '\r']);
    let indent = line.len() - line.trim_start_matches(' ').len();
    if indent > 3 {
        return None;
    }
    let rest = &line[indent..];
    let level = rest.bytes().take_while(|byte| *byte == b'#').count();
    if level == 0 || level > 6 {
        return None;
    }
    let after = &rest[level..];
    if !after.is_empty() && !after.starts_with([' ', '\t']) {
        return None;
    }
    let heading = strip_closing_hashes(after.trim());
    Some((level as u8, heading.to_string()))
}

fn strip_closing_hashes(text: &str) -> &str {
    let without = text.trim_end_matches('#');
    if without.len() == text.len() {
        return text;
    }
    if without.is_empty() {
        return "";
    }
    if without.ends_with([' ', '\t']) {
        return without.trim_end();
    }
    text
}

/// Iterates lines (terminator included) together with their byte spans.
struct LineIter<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> LineIter<'a> {
    fn new(text: &'a str, start: usize) -> Self {
        Self { text, pos: start }
    }
}

impl<'a> Iterator for LineIter<'a> {
    type Item = (Range<usize>, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.text.len() {
            return None;
        }
        let rest = &self.text[self.pos..];
        let len = rest.find('\n').map(|idx| idx + 1).unwrap_or(rest.len());
        let span = self.pos..self.pos + len;
        self.pos += len;
        Some((span.clone(), &self.text[span]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_headings_and_bodies() {
        let doc = Document::parse(
            "personas/react.md",
            Origin::Personas,
            "# React\n\n## Overview\nintro\n### Detail\nmore\n## Pitfalls\nnone\n",
        );
        let outline: Vec<(u8, &str)> = doc
            .sections
            .iter()
            .map(|section| (section.level, section.heading.as_str()))
            .collect();
        assert_eq!(
            outline,
            vec![(1, "React"), (2, "Overview"), (3, "Detail"), (2, "Pitfalls")]
        );
        assert_eq!(doc.section_body(&doc.sections[1]), "intro\n### Detail\nmore\n");
        assert_eq!(doc.section_body(&doc.sections[3]), "none\n");
        assert_eq!(doc.title(), Some("React"));
    }

    #[test]
    fn ignores_headings_inside_code_fences() {
        let doc = Document::parse(
            "personas/x.md",
            Origin::Personas,
            "## Overview\n```md\n## Not a heading\n```\n~~~\n# nor this\n~~~\n## Patterns\n",
        );
        assert_eq!(doc.headings(2), vec!["Overview", "Patterns"]);
        assert!(doc.headings(1).is_empty());
        assert_eq!(doc.code_blocks.len(), 2);
        let inner = doc.text.find("## Not").expect("fenced heading");
        assert!(doc.in_code_block(inner));
        assert!(!doc.in_code_block(doc.text.find("## Patterns").expect("heading")));
    }

    #[test]
    fn unclosed_fence_runs_to_end() {
        let doc = Document::parse("personas/x.md", Origin::Personas, "## Overview\n```\n## Gone\n");
        assert_eq!(doc.code_blocks, vec![12..doc.text.len()]);
        assert_eq!(doc.headings(2), vec!["Overview"]);
    }

    #[test]
    fn splits_front_matter() {
        let doc = Document::parse(
            "modes/a.md",
            Origin::Modes,
            "+++\npersona_root = \"web\"\n+++\n## Role\n",
        );
        assert_eq!(doc.front_matter(), Some("persona_root = \"web\"\n"));
        assert_eq!(doc.body(), "## Role\n");
        assert_eq!(doc.headings(2), vec!["Role"]);
    }

    #[test]
    fn unterminated_front_matter_is_body() {
        let doc = Document::parse("modes/a.md", Origin::Modes, "+++\nx = 1\n## Role\n");
        assert_eq!(doc.front_matter(), None);
        assert_eq!(doc.body_start, 0);
    }

    #[test]
    fn heading_parsing_edge_cases() {
        assert_eq!(parse_heading("## Tools ##\n"), Some((2, "Tools".to_string())));
        assert_eq!(parse_heading("## C#\n"), Some((2, "C#".to_string())));
        assert_eq!(parse_heading("##NoSpace\n"), None);
        assert_eq!(parse_heading("    ## Indented code\n"), None);
        assert_eq!(parse_heading("####### seven\n"), None);
        assert_eq!(parse_heading("#\n"), Some((1, String::new())));
    }

    #[test]
    fn file_stem_strips_extension() {
        let doc = Document::parse("personas/web/react.md", Origin::Personas, "");
        assert_eq!(doc.file_stem(), "react");
        assert_eq!(doc.byte_len(), 0);
    }
}
