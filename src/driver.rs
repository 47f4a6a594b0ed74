//! Compilation driver: lex → parse → resolve → order → hand-off.
//!
//! The driver owns the front half of a compile. Code generation and
//! linking are downstream consumers: on success the driver hands them a
//! [`BackendRequest`] with the emission order and the pass-through
//! options; any accumulated diagnostic suppresses the hand-off.

use std::path::PathBuf;

use crate::context::{CompilerContext, FileHash};
use crate::diagnostics::{Diagnostic, ErrKind};
use crate::parser::Parser;
use crate::resolver;

/// Options the driver needs for one compile.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    pub file: PathBuf,
    pub out_file: PathBuf,
    /// Pass-through flags for the backend linker.
    pub link_flags: String,
    pub ll_file: Option<PathBuf>,
}

/// Everything the backend needs to emit and link.
#[derive(Debug, Clone)]
pub struct BackendRequest {
    /// Files in leaves-first order: every file appears after all of
    /// its strong dependencies.
    pub emission_order: Vec<FileHash>,
    pub out_file: PathBuf,
    pub link_flags: String,
    pub ll_file: Option<PathBuf>,
}

/// Run the front-end. Returns the backend hand-off only when no
/// diagnostic was reported.
pub fn compile(ctx: &CompilerContext, options: &CompileOptions) -> Result<BackendRequest, ()> {
    let root = match Parser::parse_file(ctx, &options.file) {
        Some(root) => root,
        None => return Err(()),
    };

    if root.function("main").is_none() {
        ctx.emit(Diagnostic::new(
            root.hash.clone(),
            0,
            0,
            0,
            ErrKind::DefNoMainFunction {
                file: root.hash.file_name(),
            },
        ));
    }

    let _graph = resolver::create_dependency_graph(ctx, root);

    if ctx.has_errors() {
        return Err(());
    }

    Ok(BackendRequest {
        emission_order: resolver::emission_order(ctx),
        out_file: options.out_file.clone(),
        link_flags: options.link_flags.clone(),
        ll_file: options.ll_file.clone(),
    })
}
