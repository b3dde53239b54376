//! Input tree conventions: where modes and personas live and how paths map
//! to mode slugs and persona roots.
//!
//! All paths here are relative to the input root and `/`-separated.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub modes_dir: String,
    pub personas_dir: String,
    /// Document extension without the leading dot.
    pub extension: String,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            modes_dir: "modes".to_string(),
            personas_dir: "personas".to_string(),
            extension: "md".to_string(),
        }
    }
}

impl Layout {
    /// Mode slug for a document under the modes directory.
    ///
    /// `modes/team/review.md` -> `team/review`.
    pub fn mode_slug(&self, path: &str) -> Option<String> {
        let rest = strip_dir(path, &self.modes_dir)?;
        let suffix = format!(".{}", self.extension);
        let slug = rest.strip_suffix(&suffix).unwrap_or(rest);
        (!slug.is_empty()).then(|| slug.to_string())
    }

    /// Input-relative directory for persona root segments.
    ///
    /// Empty segments select the personas directory itself.
    pub fn persona_root_path(&self, segments: &[String]) -> String {
        let mut path = self.personas_dir.clone();
        for segment in segments {
            path.push('/');
            path.push_str(segment);
        }
        path
    }
}

/// Strip `dir/` from the front of `path`.
pub fn strip_dir<'a>(path: &'a str, dir: &str) -> Option<&'a str> {
    path.strip_prefix(dir)?.strip_prefix('/')
}

/// Path segments of `path`.
pub fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|segment| !segment.is_empty()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_slug_strips_dir_and_extension() {
        let layout = Layout::default();
        assert_eq!(layout.mode_slug("modes/review.md"), Some("review".to_string()));
        assert_eq!(
            layout.mode_slug("modes/team/review.md"),
            Some("team/review".to_string())
        );
        assert_eq!(layout.mode_slug("modesx/review.md"), None);
        assert_eq!(layout.mode_slug("personas/react.md"), None);
    }

    #[test]
    fn persona_root_path_joins_segments() {
        let layout = Layout::default();
        assert_eq!(layout.persona_root_path(&[]), "personas");
        assert_eq!(
            layout.persona_root_path(&["frontend".to_string(), "web".to_string()]),
            "personas/frontend/web"
        );
    }

    #[test]
    fn strip_dir_requires_separator() {
        assert_eq!(strip_dir("personas/web/a.md", "personas"), Some("web/a.md"));
        assert_eq!(strip_dir("personas2/a.md", "personas"), None);
    }
}
