//! Lexer integration suite: layout, literals, recovery and the
//! source-reconstruction round trip.

mod common;

use common::{lex, parse};
use flintc::lexer::token::{TokenKind, TAB_SIZE};
use flintc::lexer::to_string;
use proptest::prelude::*;
use rstest::rstest;

#[test]
fn empty_source_is_just_eof() {
    let (ctx, tokens) = lex("");
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].kind, TokenKind::Eof);
    assert!(!ctx.has_errors());
}

#[test]
fn whitespace_and_comments_collapse_to_eof() {
    let (ctx, tokens) = lex("   \n\t\n// line comment\n/* block\nspanning\nlines */\n");
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].kind, TokenKind::Eof);
    assert!(!ctx.has_errors());
}

#[test]
fn unterminated_block_comment_is_terminal() {
    let (ctx, tokens) = lex("/* never closed\n");
    assert!(tokens.is_empty());
    assert_eq!(ctx.error_count(), 1);
}

#[rstest]
#[case("+", TokenKind::Plus)]
#[case("++", TokenKind::Increment)]
#[case("+=", TokenKind::PlusEquals)]
#[case("->", TokenKind::Arrow)]
#[case(":=", TokenKind::ColonEqual)]
#[case("::", TokenKind::Reference)]
#[case("==", TokenKind::EqualEqual)]
#[case("!=", TokenKind::NotEqual)]
#[case("<<", TokenKind::ShiftLeft)]
#[case("**", TokenKind::Pow)]
#[case("??", TokenKind::OptDefault)]
#[case("|>", TokenKind::Pipe)]
#[case("..", TokenKind::Range)]
fn multi_character_tokens(#[case] source: &str, #[case] expected: TokenKind) {
    let (_, tokens) = lex(&format!("a {} b\n", source));
    assert!(
        tokens.iter().any(|tok| tok.kind == expected),
        "expected {:?} in {:?}",
        expected,
        tokens
    );
}

#[test]
fn columns_expand_tabs() {
    let (_, tokens) = lex("def main():\n\t\treturn;\n");
    let ret = tokens
        .iter()
        .find(|tok| tok.kind == TokenKind::Return)
        .unwrap();
    assert_eq!(ret.line, 2);
    assert_eq!(ret.column, 1 + 2 * TAB_SIZE);
}

#[test]
fn leading_space_runs_become_indents() {
    let (_, tokens) = lex("def main():\n        return;\n");
    let indents = tokens
        .iter()
        .filter(|tok| tok.kind == TokenKind::Indent)
        .count();
    assert_eq!(indents, 2);
}

#[test]
fn deeply_nested_indentation_counts_exactly() {
    let source = format!("{}return;\n", "\t".repeat(20));
    let (_, tokens) = lex(&source);
    let indents = tokens
        .iter()
        .filter(|tok| tok.kind == TokenKind::Indent)
        .count();
    assert_eq!(indents, 20);
    assert_eq!(
        flintc::signature::get_leading_indents(&tokens, 1),
        Some(20)
    );
}

#[test]
fn keywords_and_identifiers_are_distinguished() {
    let (_, tokens) = lex("while whilex:\n");
    assert_eq!(tokens[0].kind, TokenKind::While);
    assert_eq!(tokens[1].kind, TokenKind::Identifier);
    assert_eq!(tokens[1].lexeme(), "whilex");
}

#[test]
fn primitive_names_become_interned_type_tokens() {
    let (_, tokens) = lex("i32 a = 1;\nf64x3 b = x;\n");
    let types: Vec<String> = tokens
        .iter()
        .filter(|tok| tok.kind == TokenKind::Type)
        .map(|tok| tok.ty().unwrap().to_string())
        .collect();
    assert_eq!(types, vec!["i32".to_string(), "f64x3".to_string()]);
}

#[test]
fn reserved_identifier_prefixes_fail_the_file() {
    for source in ["__flint_x := 1;\n", "__fip_handle := 1;\n"] {
        let (ctx, tokens) = lex(source);
        assert!(tokens.is_empty());
        assert!(ctx.has_errors());
    }
}

#[test]
fn numeric_separators_are_stripped() {
    let (_, tokens) = lex("a := 12_345;\nb := 1_0.2_5;\n");
    let numbers: Vec<&str> = tokens
        .iter()
        .filter(|tok| matches!(tok.kind, TokenKind::IntValue | TokenKind::FloatValue))
        .map(|tok| tok.lexeme())
        .collect();
    assert_eq!(numbers, vec!["12345", "10.25"]);
}

#[test]
fn dot_without_digit_is_a_dot() {
    let (ctx, tokens) = lex("a := b.c;\n");
    assert!(tokens.iter().any(|tok| tok.kind == TokenKind::Dot));
    assert!(!ctx.has_errors());
}

#[test]
fn string_escape_of_quotes_collapses() {
    let (_, tokens) = lex("s := \"say \\\"hi\\\"\";\n");
    let string = tokens
        .iter()
        .find(|tok| tok.kind == TokenKind::StrValue)
        .unwrap();
    assert_eq!(string.lexeme(), "say \"hi\"");
}

#[test]
fn unterminated_string_is_terminal() {
    let (ctx, tokens) = lex("s := \"no end\n");
    assert!(tokens.is_empty());
    assert!(ctx.has_errors());
}

#[test]
fn interpolation_tracks_brace_depth() {
    let (ctx, tokens) = lex("m := $\"a {f(\"x\")} b\";\n");
    let string = tokens
        .iter()
        .find(|tok| tok.kind == TokenKind::StrValue)
        .unwrap();
    assert_eq!(string.lexeme(), "a {f(\"x\")} b");
    assert!(!ctx.has_errors());
}

#[rstest]
#[case("'a'", "a")]
#[case("'\\n'", "\n")]
#[case("'\\t'", "\t")]
#[case("'\\\\'", "\\")]
#[case("'\\x41'", "A")]
fn char_literals_decode(#[case] literal: &str, #[case] expected: &str) {
    let (_, tokens) = lex(&format!("c := {};\n", literal));
    let value = tokens
        .iter()
        .find(|tok| tok.kind == TokenKind::CharValue)
        .unwrap();
    assert_eq!(value.lexeme(), expected);
}

#[test]
fn over_long_char_literal_is_reported() {
    let (ctx, tokens) = lex("c := 'abc';\n");
    assert!(tokens.is_empty());
    assert!(ctx.has_errors());
}

#[test]
fn doubled_pipe_is_an_unexpected_pipe() {
    let (ctx, tokens) = lex("ok := a || b;\n");
    assert!(tokens.is_empty());
    assert!(ctx
        .sorted_diagnostics()
        .iter()
        .any(|diag| matches!(diag.kind, flintc::diagnostics::ErrKind::UnexpectedPipe)));

    // A single `|` stays the bitwise operator, `|>` stays the pipe.
    let (ctx, tokens) = lex("x := a | b;\ny := a |> f;\n");
    assert!(!ctx.has_errors());
    assert!(tokens.iter().any(|tok| tok.kind == TokenKind::BitOr));
    assert!(tokens.iter().any(|tok| tok.kind == TokenKind::Pipe));
}

#[test]
fn token_counter_tracks_the_scan() {
    let (ctx, tokens) = lex("x := 1;\n");
    assert_eq!(
        ctx.total_token_count
            .load(std::sync::atomic::Ordering::Relaxed),
        tokens.len()
    );
}

#[test]
fn parse_registers_source_lines_for_diagnostics() {
    let (ctx, _) = parse("def main():\n\treturn;\n");
    let lines = ctx.source_lines.lock().unwrap();
    let table = lines.values().next().unwrap();
    assert_eq!(table[0].indent, 0);
    assert_eq!(table[1].indent, 1);
}

proptest! {
    /// Scanning then re-rendering keeps every statement readable.
    #[test]
    fn to_string_round_trips_statements(values in proptest::collection::vec(0u32..1_000_000, 1..12)) {
        let source: String = values
            .iter()
            .map(|value| format!("v := {};\n", value))
            .collect();
        let (ctx, tokens) = lex(&source);
        prop_assert!(!ctx.has_errors());
        // v, :=, value, ;, EOL per line plus the trailing EOF.
        prop_assert_eq!(tokens.len(), values.len() * 5 + 1);
        let rendered = to_string(&tokens);
        for value in &values {
            prop_assert!(rendered.contains(&format!("v := {};", value)), "missing rendered statement for value");
        }
    }

    /// Lexeme payloads reproduce the literal text.
    #[test]
    fn number_lexemes_match_their_source(value in 0u64..10_000_000_000) {
        let (_, tokens) = lex(&format!("x := {};\n", value));
        let number = tokens
            .iter()
            .find(|tok| tok.kind == TokenKind::IntValue)
            .unwrap();
        prop_assert_eq!(number.lexeme(), value.to_string());
    }
}
