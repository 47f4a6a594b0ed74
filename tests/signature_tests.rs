//! Signature engine integration suite: serialization equivalence,
//! range mapping and balanced-delimiter extraction.

mod common;

use common::lex;
use flintc::lexer::token::{PositionedToken, TokenKind};
use flintc::signature::{
    balanced_range_extraction, balanced_range_extraction_vec, combine, get_leading_indents,
    get_match_ranges, get_match_ranges_in_range, get_next_match_range, get_tokens_line_range,
    match_until_signature, raw, regex_string, stringify, tok, tokens_contain,
    tokens_contain_in_range, tokens_match, Signature,
};
use flintc::signature::patterns;
use proptest::prelude::*;

fn toks(kinds: &[TokenKind]) -> Vec<PositionedToken> {
    kinds
        .iter()
        .enumerate()
        .map(|(i, &kind)| PositionedToken::new(kind, 1, i as u32 + 1, kind.as_str()))
        .collect()
}

#[test]
fn matching_agrees_with_the_serialized_regex() {
    let tokens = toks(&[TokenKind::If, TokenKind::True, TokenKind::Colon]);
    let sig: Signature = vec![
        tok(TokenKind::If),
        raw("(?:#[0-9]+#)*"),
        tok(TokenKind::Colon),
    ];
    let serialized = stringify(&tokens);
    let anchored = regex::Regex::new(&format!("^(?:{})$", regex_string(&sig))).unwrap();
    assert_eq!(tokens_match(&tokens, &sig), anchored.is_match(&serialized));
    assert!(tokens_match(&tokens, &sig));
}

#[test]
fn combine_concatenates() {
    let a: Signature = vec![tok(TokenKind::Def)];
    let b: Signature = vec![tok(TokenKind::Identifier)];
    assert_eq!(
        regex_string(&combine(&[&a, &b])),
        format!("{}{}", regex_string(&a), regex_string(&b))
    );
}

#[test]
fn empty_signature_matches_the_empty_list() {
    let sig: Signature = Vec::new();
    assert!(tokens_match(&[], &sig));
    assert!(!tokens_match(&toks(&[TokenKind::Def]), &sig));
}

#[test]
fn ranges_are_half_open_token_indices() {
    let tokens = toks(&[
        TokenKind::Identifier,
        TokenKind::ColonEqual,
        TokenKind::IntValue,
        TokenKind::Semicolon,
        TokenKind::Identifier,
        TokenKind::ColonEqual,
        TokenKind::IntValue,
        TokenKind::Semicolon,
    ]);
    let sig: Signature = vec![tok(TokenKind::Identifier), tok(TokenKind::ColonEqual)];
    assert_eq!(get_match_ranges(&tokens, &sig), vec![(0, 2), (4, 6)]);
    assert_eq!(
        get_match_ranges_in_range(&tokens, &sig, (3, 8)),
        vec![(4, 6)]
    );
    assert!(tokens_contain_in_range(&tokens, &sig, (3, 8)));
    assert!(!tokens_contain_in_range(&tokens, &sig, (1, 4)));
}

#[test]
fn match_until_takes_the_first_terminator() {
    let tokens = toks(&[
        TokenKind::Return,
        TokenKind::IntValue,
        TokenKind::Semicolon,
        TokenKind::Return,
        TokenKind::Semicolon,
    ]);
    let sig = match_until_signature(&[tok(TokenKind::Semicolon)]);
    assert_eq!(get_next_match_range(&tokens, &sig), Some((0, 3)));
}

#[test]
fn line_helpers_locate_lines() {
    let (_, tokens) = lex("def main():\n\t\tx := 1;\n");
    assert_eq!(get_leading_indents(&tokens, 2), Some(2));
    assert_eq!(get_leading_indents(&tokens, 7), None);
    let (start, end) = get_tokens_line_range(&tokens, 1).unwrap();
    assert!(tokens[start..end]
        .iter()
        .all(|token| token.line == 1));
    assert!(get_tokens_line_range(&tokens, 9).is_none());
}

#[test]
fn balanced_extraction_covers_the_call_argument_group() {
    // The canonical example: x := func((a + b) * (c - d));
    let (_, tokens) = lex("x := func((a + b) * (c - d));\n");
    let range = balanced_range_extraction(
        &tokens,
        &[tok(TokenKind::LeftParen)],
        &[tok(TokenKind::RightParen)],
    )
    .unwrap();
    // First `(` after `func` through its matching `)`.
    assert_eq!(tokens[range.0].kind, TokenKind::LeftParen);
    assert_eq!(tokens[range.1 - 1].kind, TokenKind::RightParen);
    assert_eq!(range, (3, 16));
}

#[test]
fn balanced_extraction_without_closers_is_none() {
    let tokens = toks(&[TokenKind::LeftParen, TokenKind::Identifier]);
    assert_eq!(
        balanced_range_extraction(
            &tokens,
            &[tok(TokenKind::LeftParen)],
            &[tok(TokenKind::RightParen)]
        ),
        None
    );
}

#[test]
fn repeated_extraction_returns_later_ranges() {
    let (_, tokens) = lex("f(a)(b)(c);\n");
    let ranges = balanced_range_extraction_vec(
        &tokens,
        &[tok(TokenKind::LeftParen)],
        &[tok(TokenKind::RightParen)],
    );
    assert_eq!(ranges.len(), 3);
    for pair in ranges.windows(2) {
        assert!(pair[0].1 <= pair[1].0);
    }
}

#[test]
fn prebuilt_signatures_classify_real_headers() {
    let (_, tokens) = lex("def add(i32 a, i32 b) -> i32:\n");
    assert!(tokens_contain(&tokens, &patterns::FUNCTION_DEFINITION));

    let (_, tokens) = lex("shared data Point:\n");
    assert!(tokens_contain(&tokens, &patterns::DATA_DEFINITION));

    let (_, tokens) = lex("func Mover requires(Point p):\n");
    assert!(tokens_contain(&tokens, &patterns::FUNC_DEFINITION));

    let (_, tokens) = lex("entity Robot extends(Point p):\n");
    assert!(tokens_contain(&tokens, &patterns::ENTITY_DEFINITION));

    let (_, tokens) = lex("while a < b:\n");
    assert!(tokens_contain(&tokens, &patterns::WHILE_LOOP));

    let (_, tokens) = lex("for i, v in items:\n");
    assert!(tokens_contain(&tokens, &patterns::ENHANCED_FOR_LOOP));

    let (_, tokens) = lex("use \"lib/vec.ft\" as vec\n");
    assert!(tokens_contain(&tokens, &patterns::USE_STATEMENT));
}

proptest! {
    /// Balanced extraction with deletion walks strictly forward.
    #[test]
    fn extraction_vec_is_ordered(kinds in proptest::collection::vec(0u8..3, 0..48)) {
        let tokens: Vec<PositionedToken> = kinds
            .iter()
            .enumerate()
            .map(|(i, &k)| {
                let kind = match k {
                    0 => TokenKind::LeftParen,
                    1 => TokenKind::RightParen,
                    _ => TokenKind::Identifier,
                };
                PositionedToken::new(kind, 1, i as u32 + 1, kind.as_str())
            })
            .collect();
        let ranges = balanced_range_extraction_vec(
            &tokens,
            &[tok(TokenKind::LeftParen)],
            &[tok(TokenKind::RightParen)],
        );
        for range in &ranges {
            prop_assert!(range.0 < range.1);
            prop_assert!(range.1 <= tokens.len());
        }
        for pair in ranges.windows(2) {
            prop_assert!(pair[0].0 <= pair[1].0);
        }
    }

    /// Serialization length is exactly two `#` per token.
    #[test]
    fn serialization_is_token_aligned(count in 0usize..64) {
        let tokens = toks(&vec![TokenKind::Identifier; count]);
        let serialized = stringify(&tokens);
        prop_assert_eq!(serialized.matches('#').count(), count * 2);
    }
}
