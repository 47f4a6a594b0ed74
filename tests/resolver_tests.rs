//! Resolver integration suite: import graphs on disk, cycle breaking
//! and emission ordering.

use std::fs;
use std::path::PathBuf;

use flintc::context::CompilerContext;
use flintc::diagnostics::ErrKind;
use flintc::parser::Parser;
use flintc::resolver::{self, ResourceLock};
use tempfile::TempDir;

fn write_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

fn ctx_for(dir: &TempDir) -> CompilerContext {
    CompilerContext::new(dir.path().to_path_buf())
}

#[test]
fn a_chain_of_imports_compiles_leaves_first() {
    let dir = TempDir::new().unwrap();
    let root = write_file(
        &dir,
        "a.ft",
        "use \"b.ft\"\ndef main():\n\tprint(\"a\");\n",
    );
    write_file(&dir, "b.ft", "use \"c.ft\"\ndef b():\n\treturn;\n");
    write_file(&dir, "c.ft", "def c():\n\treturn;\n");

    let ctx = ctx_for(&dir);
    let root_node = Parser::parse_file(&ctx, &root).unwrap();
    let graph = resolver::create_dependency_graph(&ctx, root_node);
    assert!(!ctx.has_errors(), "{:?}", ctx.sorted_diagnostics());

    assert_eq!(graph.strong_dependencies().len(), 1);
    let order = resolver::emission_order(&ctx);
    let names: Vec<String> = order.iter().map(|hash| hash.file_name()).collect();
    assert_eq!(names, vec!["c.ft", "b.ft", "a.ft"]);

    // Tips are the nodes with no strong dependencies.
    let tips = resolver::get_dependency_graph_tips(&graph);
    assert_eq!(tips.len(), 1);
    assert_eq!(tips[0].file.file_name(), "c.ft");
}

#[test]
fn cyclic_imports_become_one_weak_edge() {
    let dir = TempDir::new().unwrap();
    let root = write_file(
        &dir,
        "a.ft",
        "use \"b.ft\"\ndef main():\n\treturn;\n",
    );
    write_file(&dir, "b.ft", "use \"a.ft\"\ndef b():\n\treturn;\n");

    let ctx = ctx_for(&dir);
    let root_node = Parser::parse_file(&ctx, &root).unwrap();
    let graph = resolver::create_dependency_graph(&ctx, root_node);
    assert!(!ctx.has_errors(), "{:?}", ctx.sorted_diagnostics());

    assert_eq!(ctx.dep_nodes.lock().unwrap().len(), 2);
    assert_eq!(graph.weak_dependency_count(), 0);
    let b = &graph.strong_dependencies()[0];
    assert_eq!(b.file.file_name(), "b.ft");
    // The second-parsed file carries the weak back-edge to the first.
    assert_eq!(b.weak_dependency_count(), 1);

    // Compilation proceeds: b is a tip because its only edge is weak.
    let order = resolver::emission_order(&ctx);
    let names: Vec<String> = order.iter().map(|hash| hash.file_name()).collect();
    assert_eq!(names, vec!["b.ft", "a.ft"]);
}

#[test]
fn a_file_importing_itself_gets_a_weak_self_edge() {
    let dir = TempDir::new().unwrap();
    let root = write_file(
        &dir,
        "solo.ft",
        "use \"solo.ft\"\ndef main():\n\treturn;\n",
    );

    let ctx = ctx_for(&dir);
    let root_node = Parser::parse_file(&ctx, &root).unwrap();
    let graph = resolver::create_dependency_graph(&ctx, root_node);
    assert!(!ctx.has_errors(), "{:?}", ctx.sorted_diagnostics());

    assert_eq!(ctx.dep_nodes.lock().unwrap().len(), 1);
    assert_eq!(graph.strong_dependencies().len(), 0);
    assert_eq!(graph.weak_dependency_count(), 1);
}

#[test]
fn diamond_imports_are_collapsed() {
    let dir = TempDir::new().unwrap();
    let root = write_file(
        &dir,
        "top.ft",
        "use \"left.ft\"\nuse \"right.ft\"\ndef main():\n\treturn;\n",
    );
    write_file(&dir, "left.ft", "use \"base.ft\"\ndef l():\n\treturn;\n");
    write_file(&dir, "right.ft", "use \"base.ft\"\ndef r():\n\treturn;\n");
    write_file(&dir, "base.ft", "def base():\n\treturn;\n");

    let ctx = ctx_for(&dir);
    let root_node = Parser::parse_file(&ctx, &root).unwrap();
    let _graph = resolver::create_dependency_graph(&ctx, root_node);
    assert!(!ctx.has_errors(), "{:?}", ctx.sorted_diagnostics());

    // base parsed once, all four files registered.
    assert_eq!(ctx.files.lock().unwrap().len(), 4);
    let order = resolver::emission_order(&ctx);
    let names: Vec<String> = order.iter().map(|hash| hash.file_name()).collect();
    assert_eq!(names[0], "base.ft");
    assert_eq!(names[3], "top.ft");
}

#[test]
fn missing_imports_are_reported_and_skipped() {
    let dir = TempDir::new().unwrap();
    let root = write_file(
        &dir,
        "a.ft",
        "use \"missing.ft\"\ndef main():\n\treturn;\n",
    );

    let ctx = ctx_for(&dir);
    let root_node = Parser::parse_file(&ctx, &root).unwrap();
    let graph = resolver::create_dependency_graph(&ctx, root_node);
    assert!(ctx
        .sorted_diagnostics()
        .iter()
        .any(|diag| matches!(diag.kind, ErrKind::ImportNonexistentFile { .. })));
    // The unresolved edge is simply absent.
    assert_eq!(graph.strong_dependencies().len(), 0);
}

#[test]
fn imports_may_not_escape_the_working_directory() {
    let dir = TempDir::new().unwrap();
    let root = write_file(
        &dir,
        "a.ft",
        "use \"../outside.ft\"\ndef main():\n\treturn;\n",
    );

    let ctx = ctx_for(&dir);
    let _ = Parser::parse_file(&ctx, &root);
    assert!(ctx
        .sorted_diagnostics()
        .iter()
        .any(|diag| matches!(diag.kind, ErrKind::ImportExitedCwd { .. })));
}

#[test]
fn functions_are_indexed_per_name_across_files() {
    let dir = TempDir::new().unwrap();
    let root = write_file(
        &dir,
        "a.ft",
        "use \"b.ft\"\ndef main():\n\thelp(1);\n",
    );
    write_file(&dir, "b.ft", "def help(i32 v):\n\treturn;\n");

    let ctx = ctx_for(&dir);
    let root_node = Parser::parse_file(&ctx, &root).unwrap();
    let _ = resolver::create_dependency_graph(&ctx, root_node);
    assert!(!ctx.has_errors(), "{:?}", ctx.sorted_diagnostics());
    let table = ctx.functions_by_name.lock().unwrap();
    assert!(table.contains_key("help"));
    assert!(table.contains_key("main"));
}

#[test]
fn a_second_main_across_files_is_rejected() {
    let dir = TempDir::new().unwrap();
    let root = write_file(
        &dir,
        "a.ft",
        "use \"b.ft\"\ndef main():\n\treturn;\n",
    );
    write_file(&dir, "b.ft", "def main():\n\treturn;\n");

    let ctx = ctx_for(&dir);
    let root_node = Parser::parse_file(&ctx, &root).unwrap();
    let _ = resolver::create_dependency_graph(&ctx, root_node);
    assert!(ctx
        .sorted_diagnostics()
        .iter()
        .any(|diag| matches!(diag.kind, ErrKind::FnMainRedefinition)));
}

#[test]
fn resource_locks_serialize_same_named_work() {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    let inside = Arc::new(AtomicUsize::new(0));
    let mut handles = Vec::new();
    for _ in 0..4 {
        let inside = Arc::clone(&inside);
        handles.push(std::thread::spawn(move || {
            let _guard = ResourceLock::acquire("resolver-test.ft");
            assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0);
            std::thread::yield_now();
            inside.fetch_sub(1, Ordering::SeqCst);
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }
}
