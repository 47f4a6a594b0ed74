//! Source → token stream with indentation-significant layout.
//!
//! The lexer walks the source a character at a time, expands tabs to
//! `TAB_SIZE` columns, folds runs of leading spaces into `Indent`
//! tokens, and resolves identifiers against the primitives table (which
//! yields interned `Type` tokens) before the keyword table. A lexing
//! error is terminal for the file: the scan reports it and returns an
//! empty token list.

pub mod tables;
pub mod token;

use std::fs;
use std::io;
use std::path::Path;

use crate::context::{CompilerContext, FileHash};
use crate::diagnostics::{Diagnostic, ErrKind};

use self::tables::{is_reserved_identifier, KEYWORDS};
use self::token::{PositionedToken, TokenKind, TokenList, TAB_SIZE};

pub struct Lexer<'ctx> {
    ctx: &'ctx CompilerContext,
    file: FileHash,
    source: Vec<char>,
    current: usize,
    line: u32,
    column: u32,
    /// Spaces accumulated at the current line's leading position.
    space_counter: u32,
    /// Whether only indentation has been seen on the current line.
    leading: bool,
    tokens: TokenList,
}

impl<'ctx> Lexer<'ctx> {
    pub fn new(ctx: &'ctx CompilerContext, file: FileHash, source: &str) -> Self {
        Self {
            ctx,
            file,
            source: source.chars().collect(),
            current: 0,
            line: 1,
            column: 1,
            space_counter: 0,
            leading: true,
            tokens: Vec::new(),
        }
    }

    pub fn load_file(path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }

    /// Scan the whole source. On failure the error is reported through
    /// the context and an empty list is returned.
    pub fn scan(mut self) -> TokenList {
        while !self.is_at_end() {
            if self.scan_token().is_err() {
                return Vec::new();
            }
        }

        // Sub-scans of interpolation expressions return their single
        // token untouched.
        if self.tokens.len() == 1 {
            return self.tokens;
        }

        self.remove_empty_lines();
        self.tokens.push(PositionedToken::new(
            TokenKind::Eof,
            self.line,
            self.column,
            "EOF",
        ));
        self.ctx.add_tokens(self.tokens.len());
        self.tokens
    }

    fn scan_token(&mut self) -> Result<(), ()> {
        let c = self.peek();
        if c != ' ' {
            self.space_counter = 0;
        }
        if !matches!(c, ' ' | '\t' | '\n' | '\r') {
            self.leading = false;
        }
        match c {
            '(' => self.single(TokenKind::LeftParen),
            ')' => self.single(TokenKind::RightParen),
            '[' => self.single(TokenKind::LeftBracket),
            ']' => self.single(TokenKind::RightBracket),
            '{' => self.single(TokenKind::LeftBrace),
            '}' => self.single(TokenKind::RightBrace),
            ',' => self.single(TokenKind::Comma),
            ';' => self.single(TokenKind::Semicolon),
            '%' => self.single(TokenKind::Mod),
            '$' => self.single(TokenKind::Dollar),
            '^' => self.single(TokenKind::BitXor),
            '~' => self.single(TokenKind::BitNeg),
            '&' => self.single(TokenKind::BitAnd),
            '#' => self.single(TokenKind::Flag),
            '.' => self.with_options(TokenKind::Dot, &[('.', TokenKind::Range)]),
            ':' => self.with_options(
                TokenKind::Colon,
                &[('=', TokenKind::ColonEqual), (':', TokenKind::Reference)],
            ),
            '?' => self.with_options(TokenKind::Question, &[('?', TokenKind::OptDefault)]),
            '+' => self.with_options(
                TokenKind::Plus,
                &[('+', TokenKind::Increment), ('=', TokenKind::PlusEquals)],
            ),
            '-' => self.with_options(
                TokenKind::Minus,
                &[
                    ('>', TokenKind::Arrow),
                    ('-', TokenKind::Decrement),
                    ('=', TokenKind::MinusEquals),
                ],
            ),
            '*' => self.with_options(
                TokenKind::Mult,
                &[('*', TokenKind::Pow), ('=', TokenKind::MultEquals)],
            ),
            '=' => self.with_options(TokenKind::Equal, &[('=', TokenKind::EqualEqual)]),
            '<' => self.with_options(
                TokenKind::Less,
                &[('=', TokenKind::LessEqual), ('<', TokenKind::ShiftLeft)],
            ),
            '>' => self.with_options(
                TokenKind::Greater,
                &[('=', TokenKind::GreaterEqual), ('>', TokenKind::ShiftRight)],
            ),
            '|' => {
                // `||` is not an operator; logical or is spelled `or`.
                if self.peek_next() == Some('|') {
                    self.ctx.emit(Diagnostic::new(
                        self.file.clone(),
                        self.line,
                        self.column,
                        2,
                        ErrKind::UnexpectedPipe,
                    ));
                    return Err(());
                }
                self.with_options(TokenKind::BitOr, &[('>', TokenKind::Pipe)])
            }
            '!' => self.with_options(TokenKind::Exclamation, &[('=', TokenKind::NotEqual)]),
            '/' => self.slash(),
            '"' => self.string(),
            '\'' => self.char_literal(),
            '\t' => {
                let (line, column) = (self.line, self.column);
                self.bump();
                self.tokens
                    .push(PositionedToken::new(TokenKind::Indent, line, column, "\t"));
                Ok(())
            }
            ' ' => {
                if self.leading {
                    self.space_counter += 1;
                    if self.space_counter == TAB_SIZE {
                        self.space_counter = 0;
                        let (line, column) = (self.line, self.column + 1 - TAB_SIZE);
                        self.tokens
                            .push(PositionedToken::new(TokenKind::Indent, line, column, "\t"));
                    }
                }
                self.bump();
                Ok(())
            }
            '\r' => {
                self.bump();
                Ok(())
            }
            '\n' => {
                let (line, column) = (self.line, self.column);
                self.tokens
                    .push(PositionedToken::new(TokenKind::Eol, line, column, "\n"));
                self.bump();
                self.leading = true;
                self.space_counter = 0;
                Ok(())
            }
            '_' => {
                if self.peek_next().map(is_alpha_num).unwrap_or(false) {
                    self.identifier()
                } else {
                    self.single(TokenKind::Underscore)
                }
            }
            c if c.is_ascii_digit() => self.number(),
            c if is_alpha(c) => self.identifier(),
            c => {
                self.ctx.emit(Diagnostic::new(
                    self.file.clone(),
                    self.line,
                    self.column,
                    1,
                    ErrKind::UnexpectedChar { character: c },
                ));
                Err(())
            }
        }
    }

    fn single(&mut self, kind: TokenKind) -> Result<(), ()> {
        let (line, column) = (self.line, self.column);
        let c = self.bump();
        self.tokens
            .push(PositionedToken::new(kind, line, column, c.to_string()));
        Ok(())
    }

    /// One-character lookahead option table for multi-character tokens.
    fn with_options(&mut self, single: TokenKind, options: &[(char, TokenKind)]) -> Result<(), ()> {
        let (line, column) = (self.line, self.column);
        let first = self.bump();
        for &(next, kind) in options {
            if self.peek_if(next) {
                let second = self.bump();
                let mut lexeme = String::with_capacity(2);
                lexeme.push(first);
                lexeme.push(second);
                self.tokens
                    .push(PositionedToken::new(kind, line, column, lexeme));
                return Ok(());
            }
        }
        self.tokens
            .push(PositionedToken::new(single, line, column, first.to_string()));
        Ok(())
    }

    fn slash(&mut self) -> Result<(), ()> {
        let (line, column) = (self.line, self.column);
        self.bump();
        if self.peek_if('=') {
            self.bump();
            self.tokens.push(PositionedToken::new(
                TokenKind::DivEquals,
                line,
                column,
                "/=",
            ));
            return Ok(());
        }
        if self.peek_if('/') {
            while !self.is_at_end() && self.peek() != '\n' {
                self.bump();
            }
            return Ok(());
        }
        if self.peek_if('*') {
            self.bump();
            loop {
                if self.is_at_end() {
                    self.ctx.emit(Diagnostic::new(
                        self.file.clone(),
                        line,
                        column,
                        2,
                        ErrKind::CommentUnterminatedMultiline,
                    ));
                    return Err(());
                }
                if self.peek() == '*' && self.peek_next() == Some('/') {
                    self.bump();
                    self.bump();
                    return Ok(());
                }
                self.bump();
            }
        }
        self.tokens
            .push(PositionedToken::new(TokenKind::Div, line, column, "/"));
        Ok(())
    }

    fn identifier(&mut self) -> Result<(), ()> {
        let (line, column) = (self.line, self.column);
        let mut name = String::new();
        while !self.is_at_end() && is_alpha_num(self.peek()) {
            name.push(self.bump());
        }

        if is_reserved_identifier(&name) {
            self.ctx.emit(Diagnostic::new(
                self.file.clone(),
                line,
                column,
                name.chars().count() as u32,
                ErrKind::InvalidIdentifier { identifier: name },
            ));
            return Err(());
        }

        if let Some(ty) = self.ctx.types.primitive(&name) {
            self.tokens
                .push(PositionedToken::with_type(line, column, ty));
            return Ok(());
        }

        let kind = KEYWORDS
            .get(name.as_str())
            .copied()
            .unwrap_or(TokenKind::Identifier);
        self.tokens
            .push(PositionedToken::new(kind, line, column, name));
        Ok(())
    }

    fn number(&mut self) -> Result<(), ()> {
        let (line, column) = (self.line, self.column);
        let mut lexeme = String::new();
        self.digits(&mut lexeme);

        if self.peek_if('.') {
            match self.peek_next() {
                Some(next) if next.is_ascii_digit() => {
                    lexeme.push(self.bump());
                    self.digits(&mut lexeme);
                    self.tokens.push(PositionedToken::new(
                        TokenKind::FloatValue,
                        line,
                        column,
                        lexeme,
                    ));
                    return Ok(());
                }
                // `1..5` leaves the range token to the next scan step.
                Some('.') => {}
                other => {
                    self.ctx.emit(Diagnostic::new(
                        self.file.clone(),
                        self.line,
                        self.column,
                        1,
                        ErrKind::UnexpectedCharNumber {
                            character: other.unwrap_or('\0'),
                        },
                    ));
                    return Err(());
                }
            }
        }
        self.tokens.push(PositionedToken::new(
            TokenKind::IntValue,
            line,
            column,
            lexeme,
        ));
        Ok(())
    }

    /// Consume digits and `_` separators; separators are stripped from
    /// the stored lexeme.
    fn digits(&mut self, lexeme: &mut String) {
        while !self.is_at_end() {
            let c = self.peek();
            if c.is_ascii_digit() {
                lexeme.push(self.bump());
            } else if c == '_' {
                self.bump();
            } else {
                break;
            }
        }
    }

    fn string(&mut self) -> Result<(), ()> {
        let is_interpolation = self
            .tokens
            .last()
            .map(|tok| tok.kind == TokenKind::Dollar)
            .unwrap_or(false);
        let (line, column) = (self.line, self.column);
        self.bump();

        let mut value = String::new();
        let mut depth = 0usize;
        let mut interpolating = false;
        loop {
            if self.is_at_end() {
                self.ctx.emit(Diagnostic::new(
                    self.file.clone(),
                    line,
                    column,
                    1,
                    ErrKind::LitUnterminatedString,
                ));
                return Err(());
            }
            let c = self.peek();
            if c == '\\' && self.peek_next() == Some('"') {
                self.bump();
                value.push(self.bump());
                continue;
            }
            if is_interpolation {
                match c {
                    '"' if !interpolating => break,
                    '{' => {
                        if interpolating {
                            depth += 1;
                        } else {
                            interpolating = true;
                            depth = 1;
                        }
                        value.push(self.bump());
                    }
                    '}' if interpolating => {
                        depth -= 1;
                        interpolating = depth != 0;
                        value.push(self.bump());
                    }
                    _ => value.push(self.bump()),
                }
            } else if c == '"' {
                break;
            } else {
                value.push(self.bump());
            }
        }
        self.bump();
        self.tokens.push(PositionedToken::new(
            TokenKind::StrValue,
            line,
            column,
            value,
        ));
        Ok(())
    }

    fn char_literal(&mut self) -> Result<(), ()> {
        let (line, column) = (self.line, self.column);
        self.bump();
        if self.is_at_end() || self.peek() == '\'' {
            self.ctx.emit(Diagnostic::new(
                self.file.clone(),
                line,
                column,
                1,
                ErrKind::LitExpectedCharValue,
            ));
            return Err(());
        }

        let value = if self.peek() == '\\' {
            self.bump();
            if self.is_at_end() {
                self.ctx.emit(Diagnostic::new(
                    self.file.clone(),
                    line,
                    column,
                    1,
                    ErrKind::LitExpectedCharValue,
                ));
                return Err(());
            }
            match self.bump() {
                'n' => '\n',
                't' => '\t',
                'r' => '\r',
                '\\' => '\\',
                '0' => '\0',
                '\'' => '\'',
                'x' => {
                    let mut hex = String::new();
                    for _ in 0..2 {
                        if self.is_at_end() || self.peek() == '\'' {
                            self.ctx.emit(Diagnostic::new(
                                self.file.clone(),
                                line,
                                column,
                                1,
                                ErrKind::LitExpectedCharValue,
                            ));
                            return Err(());
                        }
                        hex.push(self.bump());
                    }
                    match u8::from_str_radix(&hex, 16) {
                        Ok(byte) => byte as char,
                        Err(_) => {
                            self.ctx.emit(Diagnostic::new(
                                self.file.clone(),
                                line,
                                column,
                                2 + hex.chars().count() as u32,
                                ErrKind::LitExpectedCharValue,
                            ));
                            return Err(());
                        }
                    }
                }
                other => other,
            }
        } else {
            self.bump()
        };

        if self.is_at_end() || self.peek() != '\'' {
            // Collect the rest of the over-long literal for the message.
            let mut literal = String::new();
            literal.push(value);
            while !self.is_at_end() && self.peek() != '\'' && self.peek() != '\n' {
                literal.push(self.bump());
            }
            self.ctx.emit(Diagnostic::new(
                self.file.clone(),
                line,
                column,
                2 + literal.chars().count() as u32,
                ErrKind::LitCharLongerThanSingleCharacter { literal },
            ));
            return Err(());
        }
        self.bump();
        self.tokens.push(PositionedToken::new(
            TokenKind::CharValue,
            line,
            column,
            value.to_string(),
        ));
        Ok(())
    }

    /// Delete lines that carry only indentation, then keep the rest in
    /// scan order.
    fn remove_empty_lines(&mut self) {
        let mut kept = Vec::with_capacity(self.tokens.len());
        let mut line_buffer: Vec<PositionedToken> = Vec::new();
        let mut line_has_content = false;
        let mut current_line = 0u32;
        for tok in self.tokens.drain(..) {
            if tok.line != current_line {
                if line_has_content {
                    kept.append(&mut line_buffer);
                } else {
                    line_buffer.clear();
                }
                line_has_content = false;
                current_line = tok.line;
            }
            if !matches!(tok.kind, TokenKind::Indent | TokenKind::Eol) {
                line_has_content = true;
            }
            line_buffer.push(tok);
        }
        if line_has_content {
            kept.append(&mut line_buffer);
        }
        self.tokens = kept;
    }

    fn peek(&self) -> char {
        self.source[self.current]
    }

    fn peek_next(&self) -> Option<char> {
        self.source.get(self.current + 1).copied()
    }

    fn peek_if(&self, expected: char) -> bool {
        !self.is_at_end() && self.peek() == expected
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }

    fn bump(&mut self) -> char {
        let c = self.source[self.current];
        self.current += 1;
        match c {
            '\n' => {
                self.line += 1;
                self.column = 1;
            }
            '\t' => self.column += TAB_SIZE,
            _ => self.column += 1,
        }
        c
    }
}

fn is_alpha(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_alpha_num(c: char) -> bool {
    is_alpha(c) || c.is_ascii_digit()
}

/// Tokens after which no space is rendered by [`to_string`].
fn no_space_after(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::LeftParen
            | TokenKind::LeftBracket
            | TokenKind::Reference
            | TokenKind::Dot
            | TokenKind::Indent
            | TokenKind::Eol
            | TokenKind::Dollar
    )
}

/// Tokens before which no space is rendered by [`to_string`].
fn no_space_before(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::RightParen
            | TokenKind::RightBracket
            | TokenKind::LeftBracket
            | TokenKind::LeftParen
            | TokenKind::Comma
            | TokenKind::Semicolon
            | TokenKind::Colon
            | TokenKind::Dot
            | TokenKind::Reference
            | TokenKind::Question
            | TokenKind::Eol
            | TokenKind::Eof
    )
}

/// Reconstruct readable source from a token slice. A delimiter stack
/// tracks `<` and `[` so commas inside brackets stay tight.
pub fn to_string(tokens: &[PositionedToken]) -> String {
    let mut out = String::new();
    let mut delimiters: Vec<char> = Vec::new();
    let mut iter = tokens.iter().peekable();
    while let Some(tok) = iter.next() {
        match tok.kind {
            TokenKind::Eof => continue,
            TokenKind::Type => {
                if let Some(ty) = tok.ty() {
                    out.push_str(&ty.to_string());
                }
            }
            TokenKind::Less => {
                delimiters.push('<');
                out.push_str(tok.lexeme());
            }
            TokenKind::LeftBracket => {
                delimiters.push('[');
                out.push_str(tok.lexeme());
            }
            TokenKind::Greater => {
                if delimiters.last() == Some(&'<') {
                    delimiters.pop();
                }
                out.push_str(tok.lexeme());
            }
            TokenKind::RightBracket => {
                if delimiters.last() == Some(&'[') {
                    delimiters.pop();
                }
                out.push_str(tok.lexeme());
            }
            TokenKind::Indent => out.push_str(&" ".repeat(TAB_SIZE as usize)),
            TokenKind::Eol => out.push('\n'),
            TokenKind::StrValue => {
                out.push('"');
                out.push_str(tok.lexeme());
                out.push('"');
            }
            TokenKind::CharValue => {
                out.push('\'');
                out.push_str(tok.lexeme());
                out.push('\'');
            }
            _ => out.push_str(tok.lexeme()),
        }
        let next_kind = iter.peek().map(|next| next.kind);
        let comma_in_brackets = tok.kind == TokenKind::Comma && delimiters.last() == Some(&'[');
        if let Some(next) = next_kind {
            if !no_space_after(tok.kind) && !no_space_before(next) && !comma_in_brackets {
                out.push(' ');
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn lex(source: &str) -> TokenList {
        let ctx = CompilerContext::new(PathBuf::from("/tmp"));
        let file = FileHash::new(Path::new("/tmp/test.ft"));
        Lexer::new(&ctx, file, source).scan()
    }

    #[test]
    fn empty_source_yields_eof_only() {
        let tokens = lex("");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Eof);
    }

    #[test]
    fn comment_only_source_yields_eof_only() {
        let tokens = lex("// nothing here\n/* or\nhere */\n");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Eof);
    }

    #[test]
    fn indentation_is_tab_expanded() {
        let tokens = lex("def main():\n\treturn;\n");
        let indent = tokens
            .iter()
            .find(|tok| tok.kind == TokenKind::Indent)
            .unwrap();
        assert_eq!(indent.line, 2);
        let ret = tokens
            .iter()
            .find(|tok| tok.kind == TokenKind::Return)
            .unwrap();
        assert_eq!(ret.column, 1 + TAB_SIZE);
    }

    #[test]
    fn four_leading_spaces_make_one_indent() {
        let tokens = lex("def main():\n    return;\n");
        assert!(tokens.iter().any(|tok| tok.kind == TokenKind::Indent));
    }

    #[test]
    fn mid_line_spaces_do_not_indent() {
        let tokens = lex("x    :=    1;\n");
        assert!(!tokens.iter().any(|tok| tok.kind == TokenKind::Indent));
    }

    #[test]
    fn numbers_strip_separators() {
        let tokens = lex("x := 1_000_000;\n");
        let int = tokens
            .iter()
            .find(|tok| tok.kind == TokenKind::IntValue)
            .unwrap();
        assert_eq!(int.lexeme(), "1000000");
    }

    #[test]
    fn float_requires_digit_after_dot() {
        let tokens = lex("x := 3.25;\n");
        let float = tokens
            .iter()
            .find(|tok| tok.kind == TokenKind::FloatValue)
            .unwrap();
        assert_eq!(float.lexeme(), "3.25");
    }

    #[test]
    fn primitive_names_resolve_to_type_tokens() {
        let tokens = lex("i32 x = 5;\n");
        let ty = &tokens[0];
        assert_eq!(ty.kind, TokenKind::Type);
        assert_eq!(ty.ty().unwrap().to_string(), "i32");
    }

    #[test]
    fn reserved_prefix_fails_the_file() {
        let ctx = CompilerContext::new(PathBuf::from("/tmp"));
        let file = FileHash::new(Path::new("/tmp/test.ft"));
        let tokens = Lexer::new(&ctx, file, "__flint_secret := 1;\n").scan();
        assert!(tokens.is_empty());
        assert!(ctx.has_errors());
    }

    #[test]
    fn interpolation_string_keeps_braced_quotes() {
        let tokens = lex("s := $\"value: {str(\"x\")}\";\n");
        let string = tokens
            .iter()
            .find(|tok| tok.kind == TokenKind::StrValue)
            .unwrap();
        assert_eq!(string.lexeme(), "value: {str(\"x\")}");
    }

    #[test]
    fn char_escapes_decode() {
        let tokens = lex("c := '\\n';\n");
        let ch = tokens
            .iter()
            .find(|tok| tok.kind == TokenKind::CharValue)
            .unwrap();
        assert_eq!(ch.lexeme(), "\n");
    }

    #[test]
    fn long_char_literal_is_reported() {
        let ctx = CompilerContext::new(PathBuf::from("/tmp"));
        let file = FileHash::new(Path::new("/tmp/test.ft"));
        let tokens = Lexer::new(&ctx, file, "c := 'ab';\n").scan();
        assert!(tokens.is_empty());
        assert!(ctx.has_errors());
    }

    #[test]
    fn to_string_round_trips_modulo_whitespace() {
        let source = "def main():\n\tx := 1 + 2;\n";
        let tokens = lex(source);
        let rendered = to_string(&tokens);
        assert!(rendered.contains("def main():"));
        assert!(rendered.contains("x := 1 + 2;"));
    }
}
