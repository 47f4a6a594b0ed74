//! Import graph construction and compilation ordering.
//!
//! The resolver walks a parsed file's imports recursively, parsing
//! unknown files on the way, and builds a dependency graph whose strong
//! edges form a DAG: an edge that would re-enter a file currently on
//! the traversal stack is recorded as *weak* instead, and the backend
//! forward-declares weak dependencies rather than embedding them.

pub mod resource_lock;

use std::collections::HashSet;
use std::sync::{Arc, Mutex, Weak};

use crate::ast::file_node::FileNode;
use crate::context::{CompilerContext, FileHash};
use crate::parser::Parser;

pub use resource_lock::ResourceLock;

/// Edge of the dependency graph.
#[derive(Debug, Clone)]
pub enum DepEdge {
    Strong(Arc<DepNode>),
    /// Back-edge that would close a cycle; the target is only
    /// forward-declared by the backend.
    Weak(Weak<DepNode>),
}

impl DepEdge {
    pub fn is_weak(&self) -> bool {
        matches!(self, DepEdge::Weak(_))
    }

    /// Hash of the edge target, when it is still alive.
    pub fn target(&self) -> Option<FileHash> {
        match self {
            DepEdge::Strong(node) => Some(node.file.clone()),
            DepEdge::Weak(weak) => weak.upgrade().map(|node| node.file.clone()),
        }
    }
}

/// One file's node in the dependency graph.
#[derive(Debug)]
pub struct DepNode {
    pub file: FileHash,
    pub dependencies: Mutex<Vec<DepEdge>>,
    /// Non-owning pointer to the node that pulled this one in.
    pub root: Mutex<Weak<DepNode>>,
}

impl DepNode {
    fn new(file: FileHash) -> Self {
        Self {
            file,
            dependencies: Mutex::new(Vec::new()),
            root: Mutex::new(Weak::new()),
        }
    }

    /// Whether this node has no outgoing strong edges.
    pub fn is_tip(&self) -> bool {
        self.dependencies
            .lock()
            .unwrap()
            .iter()
            .all(DepEdge::is_weak)
    }

    pub fn strong_dependencies(&self) -> Vec<Arc<DepNode>> {
        self.dependencies
            .lock()
            .unwrap()
            .iter()
            .filter_map(|edge| match edge {
                DepEdge::Strong(node) => Some(Arc::clone(node)),
                DepEdge::Weak(_) => None,
            })
            .collect()
    }

    pub fn weak_dependency_count(&self) -> usize {
        self.dependencies
            .lock()
            .unwrap()
            .iter()
            .filter(|edge| edge.is_weak())
            .count()
    }
}

/// Build the dependency graph rooted at an already-parsed file. The
/// file node moves into the context registry; further files are parsed
/// on demand as their imports are discovered.
pub fn create_dependency_graph(ctx: &CompilerContext, file_node: FileNode) -> Arc<DepNode> {
    let hash = file_node.hash.clone();
    let imports = file_node.imports.clone();
    ctx.register_file(file_node);
    let mut visiting = Vec::new();
    build_node(ctx, hash, imports, &mut visiting)
}

fn build_node(
    ctx: &CompilerContext,
    hash: FileHash,
    imports: Vec<FileHash>,
    visiting: &mut Vec<FileHash>,
) -> Arc<DepNode> {
    if let Some(existing) = ctx.dep_nodes.lock().unwrap().get(&hash) {
        return Arc::clone(existing);
    }

    let node = Arc::new(DepNode::new(hash.clone()));
    ctx.dep_nodes
        .lock()
        .unwrap()
        .insert(hash.clone(), Arc::clone(&node));
    visiting.push(hash);

    for dep_hash in imports {
        if visiting.contains(&dep_hash) {
            // Re-entering a file on the stack: the edge would close a
            // cycle, so record it weakly and do not recurse.
            if let Some(target) = ctx.dep_nodes.lock().unwrap().get(&dep_hash) {
                node.dependencies
                    .lock()
                    .unwrap()
                    .push(DepEdge::Weak(Arc::downgrade(target)));
            }
            continue;
        }

        let existing = ctx.dep_nodes.lock().unwrap().get(&dep_hash).cloned();
        let dep_node = if let Some(existing) = existing {
            existing
        } else if ctx.is_file_known(&dep_hash) {
            // Parsed earlier (by another root) but not yet in the graph.
            let dep_imports = ctx
                .files
                .lock()
                .unwrap()
                .get(&dep_hash)
                .map(|file| file.imports.clone())
                .unwrap_or_default();
            build_node(ctx, dep_hash.clone(), dep_imports, visiting)
        } else if ctx.parse_attempted(&dep_hash) {
            // The parser already tried and failed (missing file or
            // terminal lex error); the import stays unresolved and the
            // backend will refuse to emit this file.
            continue;
        } else {
            // Unknown file: parse it now. The lock keeps two threads
            // from parsing the same import concurrently.
            let _guard = ResourceLock::acquire(&dep_hash.path().display().to_string());
            if ctx.is_file_known(&dep_hash) {
                let dep_imports = ctx
                    .files
                    .lock()
                    .unwrap()
                    .get(&dep_hash)
                    .map(|file| file.imports.clone())
                    .unwrap_or_default();
                build_node(ctx, dep_hash.clone(), dep_imports, visiting)
            } else {
                match Parser::parse_file(ctx, dep_hash.path()) {
                    Some(parsed) => {
                        let dep_imports = parsed.imports.clone();
                        ctx.register_file(parsed);
                        build_node(ctx, dep_hash.clone(), dep_imports, visiting)
                    }
                    None => continue,
                }
            }
        };

        *dep_node.root.lock().unwrap() = Arc::downgrade(&node);
        node.dependencies
            .lock()
            .unwrap()
            .push(DepEdge::Strong(dep_node));
    }

    visiting.pop();
    node
}

/// Every node reachable from `root` with no outgoing strong edges.
pub fn get_dependency_graph_tips(root: &Arc<DepNode>) -> Vec<Arc<DepNode>> {
    let mut tips = Vec::new();
    let mut seen = HashSet::new();
    collect_tips(root, &mut tips, &mut seen);
    tips
}

fn collect_tips(node: &Arc<DepNode>, tips: &mut Vec<Arc<DepNode>>, seen: &mut HashSet<FileHash>) {
    if !seen.insert(node.file.clone()) {
        return;
    }
    let strong = node.strong_dependencies();
    if strong.is_empty() {
        tips.push(Arc::clone(node));
        return;
    }
    for dep in strong {
        collect_tips(&dep, tips, seen);
    }
}

/// Topological order over the strong-edge DAG: a file appears only
/// after every strong dependency, ties broken by registration order.
pub fn emission_order(ctx: &CompilerContext) -> Vec<FileHash> {
    let order = ctx.registration_order.lock().unwrap().clone();
    let dep_nodes = ctx.dep_nodes.lock().unwrap();
    let mut emitted: HashSet<FileHash> = HashSet::new();
    let mut result = Vec::new();

    loop {
        let mut progressed = false;
        for hash in &order {
            if emitted.contains(hash) {
                continue;
            }
            let ready = match dep_nodes.get(hash) {
                Some(node) => node
                    .dependencies
                    .lock()
                    .unwrap()
                    .iter()
                    .all(|edge| match edge {
                        DepEdge::Strong(dep) => emitted.contains(&dep.file),
                        DepEdge::Weak(_) => true,
                    }),
                // A file without a graph node has nothing to wait for.
                None => true,
            };
            if ready {
                emitted.insert(hash.clone());
                result.push(hash.clone());
                progressed = true;
            }
        }
        if !progressed {
            break;
        }
    }
    result
}
