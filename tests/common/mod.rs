//! Shared fixtures for the integration suites.

use std::path::{Path, PathBuf};

use flintc::ast::FileNode;
use flintc::context::{CompilerContext, FileHash};
use flintc::lexer::token::TokenList;
use flintc::lexer::Lexer;
use flintc::parser::Parser;

pub const TEST_ROOT: &str = "/tmp/flintc-tests";

pub fn test_ctx() -> CompilerContext {
    CompilerContext::new(PathBuf::from(TEST_ROOT))
}

pub fn test_file(name: &str) -> FileHash {
    FileHash::new(&Path::new(TEST_ROOT).join(name))
}

/// Lex a source snippet against a fresh context.
#[allow(dead_code)]
pub fn lex(source: &str) -> (CompilerContext, TokenList) {
    let ctx = test_ctx();
    let tokens = Lexer::new(&ctx, test_file("main.ft"), source).scan();
    (ctx, tokens)
}

/// Parse a source snippet as the file `main.ft`.
#[allow(dead_code)]
pub fn parse(source: &str) -> (CompilerContext, Option<FileNode>) {
    let ctx = test_ctx();
    let node = Parser::parse_source(
        &ctx,
        test_file("main.ft"),
        PathBuf::from(TEST_ROOT),
        source,
    );
    (ctx, node)
}
