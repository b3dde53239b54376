//! End-to-end properties of a full run, driven through the library.

use std::path::PathBuf;

use assembler::core::grammar::{MODE_SECTIONS, PERSONA_SECTIONS};
use assembler::core::types::{IssueKind, Rule, Severity};
use assembler::exit_codes;
use assembler::io::config::AssemblerConfig;
use assembler::pipeline::{RunOptions, RunOutcome, run};
use assembler::report::IssueReport;
use assembler::test_support::{TestTree, mode_doc_with, persona_doc_with};

async fn run_into(tree: &TestTree, output: PathBuf) -> RunOutcome {
    let options = RunOptions {
        input: tree.input(),
        output,
        config: AssemblerConfig::default(),
        dry_run: false,
    };
    run(&options).await.expect("run")
}

async fn run_tree(tree: &TestTree) -> RunOutcome {
    run_into(tree, tree.output()).await
}

fn issues_for<'a>(outcome: &'a RunOutcome, path: &str) -> Vec<&'a IssueReport> {
    outcome
        .report
        .documents
        .iter()
        .filter(|document| document.path == path)
        .flat_map(|document| document.issues.iter())
        .collect()
}

fn without(sections: &[&'static str], missing: &str) -> Vec<&'static str> {
    sections
        .iter()
        .copied()
        .filter(|section| *section != missing)
        .collect()
}

#[tokio::test]
async fn two_runs_produce_identical_artifacts() {
    let tree = TestTree::new();
    tree.write_mode("web", "web", &["read_file", "run_tests"]);
    tree.write_mode("team/review", ".", &["read_file"]);
    tree.write_persona("web/frameworks/react.md", "React");
    tree.write_persona("web/css.md", "CSS");
    tree.write_persona("data/sql.md", "SQL");

    let first = run_tree(&tree).await;
    let web = tree.read_output("web.md");
    let review = tree.read_output("team/review.md");

    let second = run_tree(&tree).await;
    assert_eq!(tree.read_output("web.md"), web);
    assert_eq!(tree.read_output("team/review.md"), review);
    let hashes = |outcome: &RunOutcome| -> Vec<String> {
        outcome
            .report
            .artifacts
            .iter()
            .map(|artifact| artifact.sha256.clone())
            .collect()
    };
    assert_eq!(hashes(&first), hashes(&second));
}

#[tokio::test]
async fn corrupting_one_mode_leaves_others_unchanged() {
    let tree = TestTree::new();
    tree.write_mode("web", "web", &["read_file"]);
    tree.write_mode("data", "data", &["query"]);
    tree.write_persona("web/react.md", "React");
    tree.write_persona("data/sql.md", "SQL");

    let before = run_into(&tree, tree.path().join("before")).await;
    let data_before = std::fs::read_to_string(tree.path().join("before/data.md")).expect("read");

    tree.write(
        "modes/web.md",
        &mode_doc_with("web", &["read_file"], &without(MODE_SECTIONS, "Workflow")),
    );
    let after = run_into(&tree, tree.path().join("after")).await;
    let data_after = std::fs::read_to_string(tree.path().join("after/data.md")).expect("read");

    assert_eq!(data_before, data_after);
    let personas = |outcome: &RunOutcome, mode: &str| -> Vec<String> {
        outcome
            .report
            .artifacts
            .iter()
            .find(|artifact| artifact.mode == mode)
            .map(|artifact| artifact.personas.clone())
            .unwrap_or_default()
    };
    assert_eq!(personas(&before, "data"), personas(&after, "data"));
    assert!(!tree.path().join("after/web.md").exists());
}

#[tokio::test]
async fn every_independent_defect_is_reported() {
    let tree = TestTree::new();
    tree.write_mode("ok", ".", &[]);
    for (slug, missing) in [("a", "Workflow"), ("b", "Tools"), ("c", "Guardrails")] {
        tree.write(
            &format!("modes/{slug}.md"),
            &mode_doc_with("web", &[], &without(MODE_SECTIONS, missing)),
        );
    }
    tree.write_persona("web/react.md", "React");
    for (name, missing) in [("vue", "Overview"), ("svelte", "Resources")] {
        tree.write(
            &format!("personas/web/{name}.md"),
            &persona_doc_with(name, &without(PERSONA_SECTIONS, missing)),
        );
    }

    let outcome = run_tree(&tree).await;
    let summary = &outcome.report.summary;
    assert_eq!(summary.errors + summary.warnings, 5, "{:?}", outcome.report);
    assert_eq!(summary.errors, 5);
    assert_eq!(outcome.report.documents.len(), 5);
    for document in &outcome.report.documents {
        assert_eq!(document.issues.len(), 1);
        assert_eq!(document.issues[0].rule, Rule::MissingSection);
    }
    assert_eq!(outcome.report.exit_code(), exit_codes::INVALID);
}

#[tokio::test]
async fn inserting_a_persona_only_shifts_its_neighbours() {
    let tree = TestTree::new();
    tree.write_mode("web", "web", &[]);
    tree.write_persona("web/a/x.md", "X");
    tree.write_persona("web/a/z.md", "Z");
    tree.write_persona("web/b/w.md", "W");
    tree.write_persona("web/top.md", "Top");

    run_tree(&tree).await;
    let before = tree.read_output("web.md");

    tree.write_persona("web/a/y.md", "Y");
    run_tree(&tree).await;
    let after = tree.read_output("web.md");

    let expected = before.replace(
        "- `z`: Z (`personas/web/a/z.md`)",
        "- `y`: Y (`personas/web/a/y.md`)\n- `z`: Z (`personas/web/a/z.md`)",
    );
    assert_ne!(before, expected);
    assert_eq!(after, expected);
}

#[tokio::test]
async fn missing_persona_root_warns_and_still_assembles() {
    let tree = TestTree::new();
    tree.write_mode("web", "nowhere", &["read_file"]);
    tree.write_mode("data", "data", &[]);
    tree.write_persona("data/sql.md", "SQL");

    let outcome = run_tree(&tree).await;
    let issues = issues_for(&outcome, "modes/web.md");
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].rule, Rule::MissingPersonaRoot);
    assert_eq!(issues[0].severity, Severity::Warning);
    assert_eq!(issues[0].kind, IssueKind::DanglingReference);
    assert_eq!(outcome.report.exit_code(), exit_codes::OK);

    let web = tree.read_output("web.md");
    assert!(!web.contains("### "));
    assert!(web.contains("- `read_file`"));
}

#[tokio::test]
async fn mode_missing_final_section_is_skipped_alone() {
    let tree = TestTree::new();
    tree.write_mode("web", "web", &[]);
    tree.write_persona("web/react.md", "React");
    tree.write(
        "modes/broken.md",
        &mode_doc_with("web", &[], &MODE_SECTIONS[..MODE_SECTIONS.len() - 1]),
    );

    let outcome = run_tree(&tree).await;
    let issues = issues_for(&outcome, "modes/broken.md");
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].kind, IssueKind::StructuralViolation);
    assert!(issues[0].message.contains("Guardrails"));
    assert!(!tree.output_exists("broken.md"));
    assert!(tree.output_exists("web.md"));
    assert_eq!(outcome.report.exit_code(), exit_codes::INVALID);
}

#[tokio::test]
async fn duplicate_technology_names_are_ambiguous_but_kept() {
    let tree = TestTree::new();
    tree.write_mode("web", "web", &[]);
    tree.write_persona("web/frameworks/react.md", "React");
    tree.write_persona("web/legacy/react.md", "React (class components)");

    let outcome = run_tree(&tree).await;
    let issues = issues_for(&outcome, "modes/web.md");
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].kind, IssueKind::AmbiguousReference);
    assert_eq!(issues[0].severity, Severity::Warning);

    let web = tree.read_output("web.md");
    let frameworks = web
        .find("### personas/web/frameworks\n- `react`: React (`personas/web/frameworks/react.md`)")
        .expect("frameworks entry");
    let legacy = web
        .find("### personas/web/legacy\n- `react`: React (class components) (`personas/web/legacy/react.md`)")
        .expect("legacy entry");
    assert!(frameworks < legacy);
}

#[cfg(unix)]
#[tokio::test]
async fn personas_linked_outside_the_input_root_are_never_read() {
    let tree = TestTree::new();
    tree.write_mode("web", ".", &[]);
    let outside = tree.path().join("outside");
    std::fs::create_dir_all(outside.join("web")).expect("mkdir outside");
    std::fs::write(
        outside.join("web/secret.md"),
        assembler::test_support::persona_doc("Secret"),
    )
    .expect("write outside");
    std::os::unix::fs::symlink(&outside, tree.input().join("personas")).expect("symlink");

    let outcome = run_tree(&tree).await;
    let issues = issues_for(&outcome, "personas");
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].rule, Rule::PathEscape);
    assert_eq!(issues[0].severity, Severity::Error);
    assert_eq!(outcome.report.exit_code(), exit_codes::INVALID);
    assert!(!tree.read_output("web.md").contains("secret"));
}
