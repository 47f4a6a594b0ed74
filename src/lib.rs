//! Flint compiler front-end.
//!
//! Five subsystems take a source file to the backend hand-off:
//!
//! - [`lexer`] — UTF-8 source → token stream with indentation layout
//! - [`signature`] — regex-over-tokens matching used for recognition,
//!   extraction and balanced-delimiter bracket matching
//! - [`parser`] — token stream → typed AST with scope tracking
//! - [`resolver`] — import graph, cycle breaking, compilation order
//! - [`diagnostics`] — structured errors with source-annotated frames
//!
//! [`driver::compile`] orchestrates them; [`context::CompilerContext`]
//! carries every shared registry so nothing lives in process statics.

pub mod ast;
pub mod cli;
pub mod context;
pub mod diagnostics;
pub mod driver;
pub mod lexer;
pub mod parser;
pub mod resolver;
pub mod signature;
pub mod types;

pub use context::{CompilerContext, FileHash};
pub use diagnostics::{Diagnostic, ErrKind, Stage};
pub use driver::{compile, BackendRequest, CompileOptions};
