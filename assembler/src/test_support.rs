//! Test-only helpers for building mode and persona fixtures.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::core::grammar::{MODE_SECTIONS, PERSONA_SECTIONS};

/// A `+++` manifest block declaring `root` and `tools`.
pub fn manifest(root: &str, tools: &[&str]) -> String {
    let tools: Vec<String> = tools.iter().map(|tool| format!("{tool:?}")).collect();
    format!(
        "+++\npersona_root = {root:?}\ntools = [{}]\n+++\n",
        tools.join(", ")
    )
}

/// A mode body (no manifest) containing `sections` in the given order.
///
/// `Persona Tree` and `Tools` carry their placeholder markers; every other
/// section gets one line of filler.
pub fn mode_body(sections: &[&str]) -> String {
    let mut out = String::from("# Test Mode\n\n");
    for heading in sections {
        out.push_str(&format!("## {heading}\n"));
        match *heading {
            "Persona Tree" => out.push_str("Consult:\n<!-- placeholder:persona_tree -->\n"),
            "Tools" => out.push_str("<!-- placeholder:tools -->\n"),
            other => out.push_str(&format!("{other} instructions.\n")),
        }
        out.push('\n');
    }
    out
}

/// A complete, valid mode template.
pub fn mode_doc(root: &str, tools: &[&str]) -> String {
    mode_doc_with(root, tools, MODE_SECTIONS)
}

/// A mode template with a manifest and only `sections`.
pub fn mode_doc_with(root: &str, tools: &[&str], sections: &[&str]) -> String {
    format!("{}{}", manifest(root, tools), mode_body(sections))
}

/// A complete, valid persona document titled `title`.
pub fn persona_doc(title: &str) -> String {
    persona_doc_with(title, PERSONA_SECTIONS)
}

/// A persona document with only `sections`.
///
/// Each body is exactly `"{heading} guidance for {title}."`.
pub fn persona_doc_with(title: &str, sections: &[&str]) -> String {
    let mut out = format!("# {title}\n\n");
    for heading in sections {
        out.push_str(&format!("## {heading}\n{heading} guidance for {title}.\n\n"));
    }
    out
}

/// Temporary input and output roots for end-to-end tests.
pub struct TestTree {
    temp: TempDir,
}

impl TestTree {
    pub fn new() -> Self {
        let temp = tempfile::tempdir().expect("tempdir");
        fs::create_dir_all(temp.path().join("input")).expect("create input root");
        Self { temp }
    }

    pub fn input(&self) -> PathBuf {
        self.temp.path().join("input")
    }

    pub fn output(&self) -> PathBuf {
        self.temp.path().join("output")
    }

    /// Write `contents` at `rel` under the input root, creating parents.
    pub fn write(&self, rel: &str, contents: &str) {
        let path = self.input().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create fixture dir");
        }
        fs::write(&path, contents).expect("write fixture");
    }

    pub fn write_mode(&self, slug: &str, root: &str, tools: &[&str]) {
        self.write(&format!("modes/{slug}.md"), &mode_doc(root, tools));
    }

    pub fn write_persona(&self, rel: &str, title: &str) {
        self.write(&format!("personas/{rel}"), &persona_doc(title));
    }

    pub fn remove(&self, rel: &str) {
        fs::remove_file(self.input().join(rel)).expect("remove fixture");
    }

    pub fn read_output(&self, rel: &str) -> String {
        fs::read_to_string(self.output().join(rel)).expect("read artifact")
    }

    pub fn output_exists(&self, rel: &str) -> bool {
        self.output().join(rel).exists()
    }

    pub fn path(&self) -> &Path {
        self.temp.path()
    }
}

impl Default for TestTree {
    fn default() -> Self {
        Self::new()
    }
}
