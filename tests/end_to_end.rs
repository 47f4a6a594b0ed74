//! Driver-level scenarios: whole compiles from disk to the backend
//! hand-off, plus structured diagnostic records.

use std::fs;
use std::path::PathBuf;

use flintc::context::CompilerContext;
use flintc::diagnostics::{record, ErrKind};
use flintc::driver::{self, CompileOptions};
use tempfile::TempDir;

fn options(root: PathBuf) -> CompileOptions {
    CompileOptions {
        file: root,
        out_file: PathBuf::from("main"),
        link_flags: String::new(),
        ll_file: None,
    }
}

#[test]
fn a_two_file_project_reaches_the_backend() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("app.ft");
    fs::write(
        &root,
        "use \"lib.ft\"\ndef main():\n\tgreet(\"world\");\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("lib.ft"),
        "def greet(str who):\n\tprint(who);\n",
    )
    .unwrap();

    let ctx = CompilerContext::new(dir.path().to_path_buf());
    let request = driver::compile(&ctx, &options(root)).expect("compile should succeed");
    assert!(!ctx.has_errors());

    let names: Vec<String> = request
        .emission_order
        .iter()
        .map(|hash| hash.file_name())
        .collect();
    assert_eq!(names, vec!["lib.ft", "app.ft"]);
    assert_eq!(request.out_file, PathBuf::from("main"));
    assert!(request.link_flags.is_empty());
}

#[test]
fn any_diagnostic_suppresses_the_backend_hand_off() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("app.ft");
    fs::write(&root, "def main():\n\tx := 1 + 2.0;\n").unwrap();

    let ctx = CompilerContext::new(dir.path().to_path_buf());
    assert!(driver::compile(&ctx, &options(root)).is_err());
    assert!(ctx
        .sorted_diagnostics()
        .iter()
        .any(|diag| matches!(diag.kind, ErrKind::ExprBinopTypeMismatch { .. })));
}

#[test]
fn a_missing_root_file_fails_cleanly() {
    let dir = TempDir::new().unwrap();
    let ctx = CompilerContext::new(dir.path().to_path_buf());
    assert!(driver::compile(&ctx, &options(dir.path().join("nope.ft"))).is_err());
    assert!(ctx
        .sorted_diagnostics()
        .iter()
        .any(|diag| matches!(diag.kind, ErrKind::ImportNonexistentFile { .. })));
}

#[test]
fn a_root_without_main_is_rejected() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("app.ft");
    fs::write(&root, "def helper():\n\treturn;\n").unwrap();

    let ctx = CompilerContext::new(dir.path().to_path_buf());
    assert!(driver::compile(&ctx, &options(root)).is_err());
    assert!(ctx
        .sorted_diagnostics()
        .iter()
        .any(|diag| matches!(diag.kind, ErrKind::DefNoMainFunction { .. })));
}

#[test]
fn diagnostics_flush_sorted_by_position() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("app.ft");
    fs::write(
        &root,
        "def main():\n\ta := 1 + 2.0;\n\tb := 3 + 4.0;\n",
    )
    .unwrap();

    let ctx = CompilerContext::new(dir.path().to_path_buf());
    let _ = driver::compile(&ctx, &options(root));
    let diagnostics = ctx.sorted_diagnostics();
    assert_eq!(diagnostics.len(), 2);
    assert!(diagnostics[0].line < diagnostics[1].line);
}

#[test]
fn structured_records_expose_editor_positions() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("app.ft");
    fs::write(&root, "def main():\n\tx := 1 + 2.0;\n").unwrap();

    let ctx = CompilerContext::new(dir.path().to_path_buf());
    let _ = driver::compile(&ctx, &options(root));
    let diagnostic = &ctx.sorted_diagnostics()[0];
    let record = record::to_record(&ctx, diagnostic);

    assert_eq!(record.range.0, 1);
    assert!(record.range.2 >= 1);
    assert!(record.file.ends_with("app.ft"));
    let json = record::to_json(&ctx, diagnostic);
    assert!(json.contains("\"severity\":\"Error\""));
}

#[test]
fn cyclic_projects_still_compile() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("a.ft");
    fs::write(&root, "use \"b.ft\"\ndef main():\n\treturn;\n").unwrap();
    fs::write(
        dir.path().join("b.ft"),
        "use \"a.ft\"\ndef other():\n\treturn;\n",
    )
    .unwrap();

    let ctx = CompilerContext::new(dir.path().to_path_buf());
    let request = driver::compile(&ctx, &options(root)).expect("cycles are broken weakly");
    assert_eq!(request.emission_order.len(), 2);
}
