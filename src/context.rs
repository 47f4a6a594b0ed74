//! Compiler-wide shared state.
//!
//! Instead of process-wide singletons, a [`CompilerContext`] is threaded
//! through every entry point. All file-indexed registries live here,
//! behind one coarse lock each: they are append-only during parse and
//! resolve, and only read afterwards.

use std::collections::{HashMap, HashSet};
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::ast::file_node::FileNode;
use crate::diagnostics::{Diagnostic, Stage};
use crate::resolver::DepNode;
use crate::types::{Type, TypeTable};

/// Opaque identifier of a source file: its normalized path. Equality and
/// hashing go by path. The empty hash is a sentinel for synthetic errors
/// that cannot point at a file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct FileHash {
    path: PathBuf,
}

impl FileHash {
    pub fn new(path: &Path) -> Self {
        Self {
            path: normalize_path(path),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.path.as_os_str().is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name portion, used in messages.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Lexically normalize a path: make it absolute against the current
/// directory and fold `.` / `..` components. Deliberately avoids
/// touching the filesystem so unknown files still get stable hashes.
pub fn normalize_path(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };
    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// One line of a source file as the diagnostics renderer needs it.
#[derive(Debug, Clone)]
pub struct SourceLine {
    pub indent: u32,
    pub text: String,
}

/// A parsed function, indexed by name for call-resolution diagnostics.
#[derive(Debug, Clone)]
pub struct RegisteredFunction {
    pub name: String,
    pub param_types: Vec<Arc<Type>>,
    pub return_types: Vec<Arc<Type>>,
    pub file: FileHash,
}

impl RegisteredFunction {
    /// Rendered form for "possible functions you meant" lists.
    pub fn signature(&self) -> String {
        let params: Vec<String> = self.param_types.iter().map(|ty| ty.to_string()).collect();
        format!("{}({})", self.name, params.join(", "))
    }
}

/// Shared state of one compiler run.
pub struct CompilerContext {
    /// file → parsed AST
    pub files: Mutex<HashMap<FileHash, FileNode>>,
    /// file → dependency graph node
    pub dep_nodes: Mutex<HashMap<FileHash, Arc<DepNode>>>,
    /// file → on-disk path
    pub paths: Mutex<HashMap<FileHash, PathBuf>>,
    /// file → source lines (registered right after lexing)
    pub source_lines: Mutex<HashMap<FileHash, Vec<SourceLine>>>,
    /// function name → every parsed function of that name
    pub functions_by_name: Mutex<HashMap<String, Vec<RegisteredFunction>>>,
    /// files in registration order, the deterministic emission tie-break
    pub registration_order: Mutex<Vec<FileHash>>,
    /// files a parse was ever attempted for; breaks import cycles and
    /// keeps a failed import from being re-reported
    attempted: Mutex<HashSet<FileHash>>,

    pub types: TypeTable,
    pub total_token_count: AtomicUsize,
    diagnostics: Mutex<Vec<Diagnostic>>,

    /// Compiler working directory; imports may not escape it.
    pub cwd: PathBuf,
    /// Append compiler-internal call sites to rendered diagnostics.
    pub debug_mode: bool,
    /// Abort the process after the first diagnostic.
    pub hard_crash: bool,
}

impl CompilerContext {
    pub fn new(cwd: PathBuf) -> Self {
        Self {
            files: Mutex::new(HashMap::new()),
            dep_nodes: Mutex::new(HashMap::new()),
            paths: Mutex::new(HashMap::new()),
            source_lines: Mutex::new(HashMap::new()),
            functions_by_name: Mutex::new(HashMap::new()),
            registration_order: Mutex::new(Vec::new()),
            attempted: Mutex::new(HashSet::new()),
            types: TypeTable::new(),
            total_token_count: AtomicUsize::new(0),
            diagnostics: Mutex::new(Vec::new()),
            cwd: normalize_path(&cwd),
            debug_mode: false,
            hard_crash: false,
        }
    }

    /// Report one diagnostic. The single reporting entry point: in
    /// hard-crash mode it renders and aborts, otherwise it accumulates.
    pub fn emit(&self, diagnostic: Diagnostic) {
        if self.hard_crash {
            let mut stderr = crate::diagnostics::render::stderr_stream();
            let _ = crate::diagnostics::render::render_terminal(self, &diagnostic, &mut stderr);
            std::process::exit(1);
        }
        self.diagnostics.lock().unwrap().push(diagnostic);
    }

    pub fn has_errors(&self) -> bool {
        !self.diagnostics.lock().unwrap().is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics.lock().unwrap().len()
    }

    /// All diagnostics so far, sorted by (file, line, column).
    pub fn sorted_diagnostics(&self) -> Vec<Diagnostic> {
        let mut diagnostics = self.diagnostics.lock().unwrap().clone();
        diagnostics.sort_by_key(|diag| diag.sort_key());
        diagnostics
    }

    /// Whether any diagnostic of the given stage was reported.
    pub fn has_errors_of_stage(&self, stage: Stage) -> bool {
        self.diagnostics
            .lock()
            .unwrap()
            .iter()
            .any(|diag| diag.stage == stage)
    }

    /// Register a fully parsed file. Insertion also records the
    /// registration order used for deterministic emission.
    pub fn register_file(&self, node: FileNode) {
        let hash = node.hash.clone();
        let mut files = self.files.lock().unwrap();
        if files.contains_key(&hash) {
            return;
        }
        files.insert(hash.clone(), node);
        self.registration_order.lock().unwrap().push(hash);
    }

    pub fn is_file_known(&self, hash: &FileHash) -> bool {
        self.files.lock().unwrap().contains_key(hash)
    }

    /// Record a parse attempt. Returns true on the first attempt.
    pub fn mark_parse_attempt(&self, hash: &FileHash) -> bool {
        self.attempted.lock().unwrap().insert(hash.clone())
    }

    pub fn parse_attempted(&self, hash: &FileHash) -> bool {
        self.attempted.lock().unwrap().contains(hash)
    }

    pub fn register_path(&self, hash: FileHash, path: PathBuf) {
        self.paths.lock().unwrap().entry(hash).or_insert(path);
    }

    pub fn register_source_lines(&self, hash: FileHash, lines: Vec<SourceLine>) {
        self.source_lines.lock().unwrap().insert(hash, lines);
    }

    pub fn register_function(&self, function: RegisteredFunction) {
        self.functions_by_name
            .lock()
            .unwrap()
            .entry(function.name.clone())
            .or_default()
            .push(function);
    }

    pub fn add_tokens(&self, count: usize) {
        self.total_token_count.fetch_add(count, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_hash_equality_is_by_path() {
        let a = FileHash::new(Path::new("/tmp/project/./main.ft"));
        let b = FileHash::new(Path::new("/tmp/project/main.ft"));
        assert_eq!(a, b);
        assert!(!a.is_empty());
        assert!(FileHash::empty().is_empty());
    }

    #[test]
    fn normalize_folds_parent_components() {
        let normalized = normalize_path(Path::new("/tmp/project/sub/../main.ft"));
        assert_eq!(normalized, PathBuf::from("/tmp/project/main.ft"));
    }

    #[test]
    fn token_counter_accumulates() {
        let ctx = CompilerContext::new(PathBuf::from("/tmp"));
        ctx.add_tokens(3);
        ctx.add_tokens(4);
        assert_eq!(ctx.total_token_count.load(Ordering::Relaxed), 7);
    }
}
