//! CLI tests for the `assembler` binary.
//!
//! Spawns the binary and verifies exit codes and the machine-readable report
//! on stdout for clean, invalid and unusable inputs.

use std::fs;
use std::process::{Command, Output};

use assembler::exit_codes;
use assembler::test_support::{TestTree, mode_doc, mode_doc_with, persona_doc};

fn assemble(tree: &TestTree, extra: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_assembler"))
        .arg(tree.input())
        .arg(tree.output())
        .args(extra)
        .output()
        .expect("assembler")
}

fn report(output: &Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout should be a json report")
}

#[test]
fn clean_tree_exits_ok() {
    let tree = TestTree::new();
    tree.write_mode("web", "web", &["read_file"]);
    tree.write_persona("web/react.md", "React");

    let output = assemble(&tree, &[]);
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let json = report(&output);
    assert_eq!(json["summary"]["errors"], 0);
    assert_eq!(json["summary"]["modes_assembled"], 1);
    assert_eq!(json["artifacts"][0]["mode"], "web");
    assert!(tree.output_exists("web.md"));
}

#[test]
fn structural_error_exits_invalid_but_writes_valid_modes() {
    let tree = TestTree::new();
    tree.write_mode("web", "web", &[]);
    tree.write_persona("web/react.md", "React");
    tree.write(
        "modes/broken.md",
        &mode_doc_with("web", &[], &["Role", "Workflow", "Persona Tree", "Tools"]),
    );

    let output = assemble(&tree, &[]);
    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    let json = report(&output);
    assert_eq!(json["documents"][0]["path"], "modes/broken.md");
    assert_eq!(json["documents"][0]["issues"][0]["rule"], "missing-section");
    assert!(tree.output_exists("web.md"));
    assert!(!tree.output_exists("broken.md"));
}

#[test]
fn missing_input_root_is_fatal() {
    let tree = TestTree::new();
    let output = Command::new(env!("CARGO_BIN_EXE_assembler"))
        .arg(tree.path().join("does-not-exist"))
        .arg(tree.output())
        .output()
        .expect("assembler");
    assert_eq!(output.status.code(), Some(exit_codes::FATAL));
    assert!(output.stdout.is_empty());
    assert!(!output.stderr.is_empty());
}

#[test]
fn unwritable_output_root_is_fatal() {
    let tree = TestTree::new();
    tree.write_mode("web", "web", &[]);
    fs::write(tree.output(), "not a directory").expect("write blocker");

    let output = assemble(&tree, &[]);
    assert_eq!(output.status.code(), Some(exit_codes::FATAL));
}

#[test]
fn text_format_and_dry_run() {
    let tree = TestTree::new();
    tree.write_mode("web", "web", &[]);
    tree.write_persona("web/react.md", "React");

    let output = assemble(&tree, &["--format", "text", "--dry-run", "--jobs", "2"]);
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let stdout = String::from_utf8(output.stdout).expect("utf8");
    assert!(stdout.contains("web -> (dry run) (1 personas)"));
    assert!(stdout.contains("summary: 2 documents, 1 modes assembled, 0 errors, 0 warnings"));
    assert!(!tree.output().exists());
}

#[test]
fn config_file_changes_layout() {
    let tree = TestTree::new();
    tree.write("assembler.toml", "personas_dir = \"knowledge\"\n");
    tree.write("modes/web.md", &mode_doc("web", &[]));
    tree.write("knowledge/web/react.md", &persona_doc("React"));

    let output = assemble(&tree, &[]);
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert!(tree.read_output("web.md").contains("(`knowledge/web/react.md`)"));
}
