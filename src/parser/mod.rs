//! Token stream → AST.
//!
//! The parser is a handwritten recursive-descent dispatcher: it looks
//! at one definition line at a time, classifies it against the prebuilt
//! signatures, extracts the indented body where one is required, and
//! hands off to the per-kind builders. Every failure reports one
//! structured error and resumes at the next production, so a single
//! file can produce several diagnostics per pass.

pub mod builtins;
mod definitions;
mod expressions;
mod statements;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::ast::definitions::NodeInfo;
use crate::ast::file_node::FileNode;
use crate::context::{CompilerContext, FileHash, RegisteredFunction, SourceLine};
use crate::diagnostics::{Diagnostic, ErrKind};
use crate::lexer::token::{PositionedToken, TokenKind, TokenList, TAB_SIZE};
use crate::lexer::{self, Lexer};
use crate::signature::{self, patterns};
use crate::types::Type;

pub struct Parser<'ctx> {
    ctx: &'ctx CompilerContext,
    file: FileHash,
    /// Directory of the file, the base for relative imports.
    directory: PathBuf,
    /// Core modules imported so far; consulted during call resolution.
    core_imports: Vec<String>,
    /// Files imported so far; user calls resolve against these.
    imported_files: Vec<FileHash>,
}

impl<'ctx> Parser<'ctx> {
    /// Parse a file from disk. Returns `None` when the file cannot be
    /// read or lexing fails terminally; diagnostics are reported either
    /// way.
    pub fn parse_file(ctx: &'ctx CompilerContext, path: &Path) -> Option<FileNode> {
        let hash = FileHash::new(path);
        ctx.mark_parse_attempt(&hash);
        let source = match Lexer::load_file(hash.path()) {
            Ok(source) => source,
            Err(_) => {
                ctx.emit(Diagnostic::unpositioned(ErrKind::ImportNonexistentFile {
                    path: path.display().to_string(),
                }));
                return None;
            }
        };
        let directory = hash
            .path()
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self::parse_source(ctx, hash, directory, &source)
    }

    /// Parse source text that belongs to the given file hash. The
    /// source-line table is registered before parsing starts so
    /// diagnostics can render even when the parse fails midway.
    pub fn parse_source(
        ctx: &'ctx CompilerContext,
        file: FileHash,
        directory: PathBuf,
        source: &str,
    ) -> Option<FileNode> {
        ctx.mark_parse_attempt(&file);
        ctx.register_path(file.clone(), file.path().to_path_buf());
        ctx.register_source_lines(file.clone(), source_line_table(source));

        let mut tokens = Lexer::new(ctx, file.clone(), source).scan();
        if tokens.is_empty() {
            return None;
        }

        let mut parser = Parser {
            ctx,
            file: file.clone(),
            directory,
            core_imports: Vec::new(),
            imported_files: Vec::new(),
        };
        parser.preregister_functions(&tokens);

        let mut file_node = FileNode::new(file);
        while !tokens.is_empty() && tokens[0].kind != TokenKind::Eof {
            parser.add_next_definition(&mut file_node, &mut tokens);
        }
        Some(file_node)
    }

    /// Extract the next definition line, classify it, and build the
    /// node. Failed productions already reported; the loop continues at
    /// the next line regardless.
    fn add_next_definition(&mut self, file_node: &mut FileNode, tokens: &mut TokenList) {
        let definition = Self::get_definition_tokens(tokens);
        if definition
            .iter()
            .all(|tok| matches!(tok.kind, TokenKind::Indent | TokenKind::Eol | TokenKind::Eof))
        {
            return;
        }
        let indentation = leading_indents(&definition);

        if signature::tokens_contain(&definition, &patterns::USE_STATEMENT) {
            let _ = self.create_import(file_node, &definition, indentation);
        } else if signature::tokens_contain(&definition, &patterns::FUNCTION_DEFINITION) {
            if let Some(mut body) = self.require_body(indentation, &definition, tokens) {
                if let Ok(function) = self.create_function(file_node, &definition, &mut body, &[]) {
                    file_node.add_definition(crate::ast::Definition::Function(function));
                }
            }
        } else if signature::tokens_contain(&definition, &patterns::DATA_DEFINITION) {
            if let Some(mut body) = self.require_body(indentation, &definition, tokens) {
                let _ = self.create_data(file_node, &definition, &mut body);
            }
        } else if signature::tokens_contain(&definition, &patterns::FUNC_DEFINITION) {
            if let Some(mut body) = self.require_body(indentation, &definition, tokens) {
                let _ = self.create_func(file_node, &definition, &mut body);
            }
        } else if signature::tokens_contain(&definition, &patterns::ENTITY_DEFINITION) {
            if let Some(mut body) = self.require_body(indentation, &definition, tokens) {
                let _ = self.create_entity(file_node, &definition, &mut body);
            }
        } else if signature::tokens_contain(&definition, &patterns::ENUM_DEFINITION) {
            if let Some(mut body) = self.require_body(indentation, &definition, tokens) {
                let _ = self.create_enum(file_node, &definition, &mut body);
            }
        } else if signature::tokens_contain(&definition, &patterns::ERROR_DEFINITION) {
            if let Some(mut body) = self.require_body(indentation, &definition, tokens) {
                let _ = self.create_error(file_node, &definition, &mut body);
            }
        } else if signature::tokens_contain(&definition, &patterns::VARIANT_DEFINITION) {
            if let Some(mut body) = self.require_body(indentation, &definition, tokens) {
                let _ = self.create_variant(file_node, &definition, &mut body);
            }
        } else if signature::tokens_contain(&definition, &patterns::TEST_DEFINITION) {
            if let Some(mut body) = self.require_body(indentation, &definition, tokens) {
                let _ = self.create_test(file_node, &definition, &mut body);
            }
        } else {
            let (line, column) = definition_position(&definition);
            self.ctx.emit(Diagnostic::new(
                self.file.clone(),
                line,
                column,
                lexer::to_string(&definition).trim_end().chars().count() as u32,
                ErrKind::UnexpectedDefinition {
                    line_text: lexer::to_string(&definition).trim_end().to_string(),
                },
            ));
        }
    }

    /// Extract this definition's body or report `MissingBody`.
    fn require_body(
        &mut self,
        indentation: u32,
        definition: &[PositionedToken],
        tokens: &mut TokenList,
    ) -> Option<TokenList> {
        let body = Self::get_body_tokens(indentation, tokens);
        if body.is_empty()
            || body
                .iter()
                .all(|tok| matches!(tok.kind, TokenKind::Indent | TokenKind::Eol | TokenKind::Eof))
        {
            let (line, column) = definition_position(definition);
            self.ctx.emit(Diagnostic::new(
                self.file.clone(),
                line,
                column,
                1,
                ErrKind::MissingBody,
            ));
            return None;
        }
        Some(body)
    }

    /// All tokens of the first line of the remainder. The extracted
    /// tokens are removed from the list.
    pub(crate) fn get_definition_tokens(tokens: &mut TokenList) -> TokenList {
        if tokens.is_empty() {
            return Vec::new();
        }
        let line = tokens[0].line;
        let end = tokens
            .iter()
            .position(|tok| tok.line != line)
            .unwrap_or(tokens.len());
        Self::extract_from_to(0, end, tokens)
    }

    /// All following lines whose indent level exceeds the definition's.
    /// The extracted tokens are removed from the list.
    pub(crate) fn get_body_tokens(definition_indentation: u32, tokens: &mut TokenList) -> TokenList {
        let mut end = 0;
        let mut current_line = 0;
        let mut first = true;
        for (idx, tok) in tokens.iter().enumerate() {
            if first || tok.line != current_line {
                first = false;
                current_line = tok.line;
                if tok.kind == TokenKind::Eof {
                    break;
                }
                let indents = line_indents_at(tokens, idx);
                if indents <= definition_indentation {
                    break;
                }
            }
            end = idx + 1;
        }
        Self::extract_from_to(0, end, tokens)
    }

    /// Remove `[from; to)` from the list and return it.
    pub(crate) fn extract_from_to(from: usize, to: usize, tokens: &mut TokenList) -> TokenList {
        debug_assert!(to >= from && to <= tokens.len());
        tokens.drain(from..to).collect()
    }

    /// Light pre-pass over the whole token list: register every
    /// function header's name and parameter types so calls can resolve
    /// forward references within the file.
    fn preregister_functions(&self, tokens: &TokenList) {
        let mut idx = 0;
        while idx < tokens.len() {
            let line = tokens[idx].line;
            let end = tokens[idx..]
                .iter()
                .position(|tok| tok.line != line)
                .map(|offset| idx + offset)
                .unwrap_or(tokens.len());
            let line_tokens = &tokens[idx..end];
            if signature::tokens_contain(line_tokens, &patterns::FUNCTION_DEFINITION) {
                if let Some(registered) = self.scan_function_header(line_tokens) {
                    self.ctx.register_function(registered);
                }
            }
            idx = end;
        }
    }

    /// Best-effort header scan used by the pre-pass; silent on failure.
    fn scan_function_header(&self, tokens: &[PositionedToken]) -> Option<RegisteredFunction> {
        let def_idx = tokens.iter().position(|tok| tok.kind == TokenKind::Def)?;
        let name_tok = tokens.get(def_idx + 1)?;
        if name_tok.kind != TokenKind::Identifier {
            return None;
        }
        let open = tokens
            .iter()
            .position(|tok| tok.kind == TokenKind::LeftParen)?;
        let close = tokens
            .iter()
            .rposition(|tok| tok.kind == TokenKind::RightParen)?;
        let mut param_types = Vec::new();
        let mut segment: Vec<PositionedToken> = Vec::new();
        for tok in &tokens[open + 1..close.max(open + 1)] {
            if tok.kind == TokenKind::Comma {
                if segment.len() > 1 {
                    if let Ok(ty) = self.quiet_type(&segment[..segment.len() - 1]) {
                        param_types.push(ty);
                    }
                }
                segment.clear();
            } else {
                segment.push(tok.clone());
            }
        }
        if segment.len() > 1 {
            if let Ok(ty) = self.quiet_type(&segment[..segment.len() - 1]) {
                param_types.push(ty);
            }
        }
        Some(RegisteredFunction {
            name: name_tok.lexeme().to_string(),
            param_types,
            return_types: Vec::new(),
            file: self.file.clone(),
        })
    }

    /// Type parse without diagnostics, for speculative contexts.
    pub(crate) fn quiet_type(&self, tokens: &[PositionedToken]) -> Result<Arc<Type>, ()> {
        self.parse_type_inner(tokens, false, false)
    }

    /// Parse a type from a token slice, reporting pointer misuse.
    pub(crate) fn parse_type(
        &self,
        tokens: &[PositionedToken],
        in_variant: bool,
    ) -> Result<Arc<Type>, ()> {
        self.parse_type_inner(tokens, true, in_variant)
    }

    fn parse_type_inner(
        &self,
        tokens: &[PositionedToken],
        report: bool,
        in_variant: bool,
    ) -> Result<Arc<Type>, ()> {
        let clean: Vec<&PositionedToken> = tokens
            .iter()
            .filter(|tok| {
                !matches!(
                    tok.kind,
                    TokenKind::Indent | TokenKind::Eol | TokenKind::Eof | TokenKind::Mut
                )
            })
            .collect();
        if clean.is_empty() {
            return Err(());
        }

        let mut cursor = 0;
        let base = self.parse_base_type(&clean, &mut cursor, report, in_variant)?;
        let mut ty = base;
        while cursor < clean.len() {
            match clean[cursor].kind {
                TokenKind::LeftBracket
                    if clean.get(cursor + 1).map(|tok| tok.kind)
                        == Some(TokenKind::RightBracket) =>
                {
                    ty = self.ctx.types.intern(Type::Array { element: ty });
                    cursor += 2;
                }
                TokenKind::Question => {
                    ty = self.ctx.types.intern(Type::Optional { base: ty });
                    cursor += 1;
                }
                TokenKind::Mult => {
                    if report {
                        let tok = clean[cursor];
                        let kind = if in_variant {
                            ErrKind::PtrNotAllowedInVariantDefinition
                        } else {
                            ErrKind::PtrNotAllowedInNonExternContext
                        };
                        self.ctx.emit(Diagnostic::new(
                            self.file.clone(),
                            tok.line,
                            tok.column,
                            1,
                            kind,
                        ));
                    }
                    return Err(());
                }
                _ => return Err(()),
            }
        }
        Ok(ty)
    }

    fn parse_base_type(
        &self,
        clean: &[&PositionedToken],
        cursor: &mut usize,
        report: bool,
        in_variant: bool,
    ) -> Result<Arc<Type>, ()> {
        match clean[*cursor].kind {
            TokenKind::Type => {
                let ty = clean[*cursor].ty().cloned().ok_or(())?;
                *cursor += 1;
                Ok(ty)
            }
            TokenKind::Identifier => {
                let name = clean[*cursor].lexeme().to_string();
                *cursor += 1;
                Ok(self.ctx.types.intern(Type::Data { name }))
            }
            TokenKind::LeftParen => {
                // Tuple type written as a parenthesised group.
                *cursor += 1;
                let mut elements = Vec::new();
                let mut segment: Vec<PositionedToken> = Vec::new();
                let mut depth = 0usize;
                loop {
                    if *cursor >= clean.len() {
                        return Err(());
                    }
                    let tok = clean[*cursor];
                    match tok.kind {
                        TokenKind::LeftParen => {
                            depth += 1;
                            segment.push(tok.clone());
                        }
                        TokenKind::RightParen if depth == 0 => {
                            *cursor += 1;
                            break;
                        }
                        TokenKind::RightParen => {
                            depth -= 1;
                            segment.push(tok.clone());
                        }
                        TokenKind::Comma if depth == 0 => {
                            elements.push(self.parse_type_inner(&segment, report, in_variant)?);
                            segment.clear();
                        }
                        _ => segment.push(tok.clone()),
                    }
                    *cursor += 1;
                }
                if !segment.is_empty() {
                    elements.push(self.parse_type_inner(&segment, report, in_variant)?);
                }
                if elements.is_empty() {
                    return Err(());
                }
                Ok(self.ctx.types.intern(Type::Tuple { elements }))
            }
            _ => Err(()),
        }
    }

    pub(crate) fn ctx(&self) -> &'ctx CompilerContext {
        self.ctx
    }

    pub(crate) fn core_imports(&self) -> &[String] {
        &self.core_imports
    }

    pub(crate) fn imported_files(&self) -> &[FileHash] {
        &self.imported_files
    }

    pub(crate) fn file(&self) -> &FileHash {
        &self.file
    }

    pub(crate) fn directory(&self) -> &Path {
        &self.directory
    }

    pub(crate) fn node_info(&self, tokens: &[PositionedToken]) -> NodeInfo {
        let (line, column) = definition_position(tokens);
        let length = tokens
            .iter()
            .filter(|tok| !matches!(tok.kind, TokenKind::Indent | TokenKind::Eol))
            .map(|tok| tok.width() + 1)
            .sum::<u32>()
            .saturating_sub(1)
            .max(1);
        NodeInfo::new(self.file.clone(), line, column, length)
    }
}

/// Leading `Indent` tokens of a slice that starts at a line boundary.
pub(crate) fn leading_indents(tokens: &[PositionedToken]) -> u32 {
    let mut count = 0;
    for tok in tokens {
        match tok.kind {
            TokenKind::Indent => count += 1,
            TokenKind::Eol => continue,
            _ => break,
        }
    }
    count
}

/// Indent count of the line starting at `idx` inside `tokens`.
fn line_indents_at(tokens: &[PositionedToken], idx: usize) -> u32 {
    let mut count = 0;
    for tok in &tokens[idx..] {
        if tok.kind == TokenKind::Indent {
            count += 1;
        } else {
            break;
        }
    }
    count
}

/// Position of the first substantial token of a definition slice.
pub(crate) fn definition_position(tokens: &[PositionedToken]) -> (u32, u32) {
    tokens
        .iter()
        .find(|tok| !matches!(tok.kind, TokenKind::Indent | TokenKind::Eol))
        .or_else(|| tokens.first())
        .map(|tok| (tok.line, tok.column))
        .unwrap_or((0, 0))
}

/// Build the per-file source-line table: `(indent level, text)` per
/// line, tabs and 4-space groups both counting one level.
pub(crate) fn source_line_table(source: &str) -> Vec<SourceLine> {
    source
        .split('\n')
        .map(|raw| {
            let text = raw.strip_suffix('\r').unwrap_or(raw).to_string();
            let mut indent = 0u32;
            let mut spaces = 0u32;
            for c in text.chars() {
                match c {
                    '\t' => {
                        indent += 1;
                        spaces = 0;
                    }
                    ' ' => {
                        spaces += 1;
                        if spaces == TAB_SIZE {
                            indent += 1;
                            spaces = 0;
                        }
                    }
                    _ => break,
                }
            }
            SourceLine { indent, text }
        })
        .collect()
}

/// Edit distance used by the "possible functions you meant" search.
pub(crate) fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];
    for (i, &ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != cb);
            current[j + 1] = substitution
                .min(previous[j + 1] + 1)
                .min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_line_table_tracks_indent_levels() {
        let table = source_line_table("def main():\n\treturn;\n        done\n");
        assert_eq!(table[0].indent, 0);
        assert_eq!(table[1].indent, 1);
        assert_eq!(table[2].indent, 2);
    }

    #[test]
    fn levenshtein_distances() {
        assert_eq!(levenshtein("print", "print"), 0);
        assert_eq!(levenshtein("pritn", "print"), 2);
        assert_eq!(levenshtein("prin", "print"), 1);
        assert_eq!(levenshtein("", "abc"), 3);
    }
}
