//! Regex-over-tokens matching.
//!
//! A signature is a sequence whose elements are either a token kind
//! (matching exactly one token of that kind) or a raw regex fragment.
//! Token lists serialize each token as `#<id>#`; matching runs an
//! ordinary regex over the serialized form and maps character offsets
//! back to token indices by counting `#` pairs. `#` cannot appear inside
//! a token's serialization (only integer ids are written), so it is a
//! safe delimiter.

pub mod patterns;

use std::collections::HashMap;
use std::sync::Mutex;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::lexer::token::{PositionedToken, TokenKind, TokenRange};

/// One element of a signature.
#[derive(Debug, Clone)]
pub enum SigElem {
    Tok(TokenKind),
    Raw(String),
}

/// A token-level pattern.
pub type Signature = Vec<SigElem>;

/// Shorthand constructors used by the prebuilt patterns.
pub fn tok(kind: TokenKind) -> SigElem {
    SigElem::Tok(kind)
}

pub fn raw(fragment: &str) -> SigElem {
    SigElem::Raw(fragment.to_string())
}

/// Concatenate signatures into one. Signatures are plain vectors, so
/// nesting patterns is just concatenation.
pub fn combine(parts: &[&[SigElem]]) -> Signature {
    let mut result = Vec::new();
    for part in parts {
        result.extend_from_slice(part);
    }
    result
}

/// Build the regex source of a signature.
pub fn regex_string(sig: &[SigElem]) -> String {
    let mut pattern = String::new();
    for elem in sig {
        match elem {
            SigElem::Tok(kind) => {
                pattern.push('#');
                pattern.push_str(&kind.id().to_string());
                pattern.push('#');
            }
            SigElem::Raw(fragment) => pattern.push_str(fragment),
        }
    }
    pattern
}

/// Serialize a token list for matching.
pub fn stringify(tokens: &[PositionedToken]) -> String {
    let mut out = String::new();
    for tok in tokens {
        out.push('#');
        out.push_str(&tok.kind.id().to_string());
        out.push('#');
    }
    out
}

static REGEX_CACHE: Lazy<Mutex<HashMap<String, Regex>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Compile (or fetch the memoized) regex for a pattern string.
fn compiled_pattern(pattern: &str) -> Regex {
    let mut cache = REGEX_CACHE.lock().unwrap();
    if let Some(regex) = cache.get(pattern) {
        return regex.clone();
    }
    let regex = Regex::new(pattern)
        .unwrap_or_else(|err| panic!("invalid signature pattern '{}': {}", pattern, err));
    cache.insert(pattern.to_string(), regex.clone());
    regex
}

fn compiled(sig: &[SigElem]) -> Regex {
    compiled_pattern(&regex_string(sig))
}

/// Whether the token list contains a match of the signature.
pub fn tokens_contain(tokens: &[PositionedToken], sig: &[SigElem]) -> bool {
    compiled(sig).is_match(&stringify(tokens))
}

/// Whether the token list matches the signature in full.
pub fn tokens_match(tokens: &[PositionedToken], sig: &[SigElem]) -> bool {
    let serialized = stringify(tokens);
    let anchored = format!("^(?:{})$", regex_string(sig));
    compiled_pattern(&anchored).is_match(&serialized)
}

/// Every non-overlapping match, as half-open token index ranges.
pub fn get_match_ranges(tokens: &[PositionedToken], sig: &[SigElem]) -> Vec<TokenRange> {
    let serialized = stringify(tokens);
    let regex = compiled(sig);
    let mut ranges = Vec::new();
    for m in regex.find_iter(&serialized) {
        let start = serialized[..m.start()].matches('#').count() / 2;
        let matched = m.as_str().matches('#').count() / 2;
        ranges.push((start, start + matched));
    }
    ranges
}

/// The matches of `sig` that lie fully inside `range`.
pub fn get_match_ranges_in_range(
    tokens: &[PositionedToken],
    sig: &[SigElem],
    range: TokenRange,
) -> Vec<TokenRange> {
    get_match_ranges(tokens, sig)
        .into_iter()
        .filter(|m| m.0 >= range.0 && m.1 <= range.1)
        .collect()
}

/// Whether a match of `sig` lies fully inside `range`.
pub fn tokens_contain_in_range(
    tokens: &[PositionedToken],
    sig: &[SigElem],
    range: TokenRange,
) -> bool {
    !get_match_ranges_in_range(tokens, sig, range).is_empty()
}

/// First match of the signature, if any.
pub fn get_next_match_range(tokens: &[PositionedToken], sig: &[SigElem]) -> Option<TokenRange> {
    get_match_ranges(tokens, sig).into_iter().next()
}

/// Build a signature that matches any content up to and including the
/// first occurrence of `sig`. The lazy quantifier guarantees the match
/// ends at the *first* terminator, which is what statement extraction
/// (`… ;` / `… :`) relies on.
pub fn match_until_signature(sig: &[SigElem]) -> Signature {
    combine(&[&[raw("((?:.)*?")], sig, &[raw(")")]])
}

/// Count the leading `Indent` tokens on the given line, or `None` when
/// the line has no tokens at all.
pub fn get_leading_indents(tokens: &[PositionedToken], line: u32) -> Option<u32> {
    let start = tokens.iter().position(|tok| tok.line == line)?;
    let mut indents = 0;
    for tok in &tokens[start..] {
        if tok.line != line {
            break;
        }
        if tok.kind == TokenKind::Indent {
            indents += 1;
        } else {
            break;
        }
    }
    Some(indents)
}

/// Index range of the tokens on the given line.
pub fn get_tokens_line_range(tokens: &[PositionedToken], line: u32) -> Option<TokenRange> {
    let start = tokens.iter().position(|tok| tok.line == line)?;
    let mut end = start;
    while end < tokens.len() && tokens[end].line == line {
        end += 1;
    }
    Some((start, end))
}

/// First balanced bracket region: walk the `inc` and `dec` match starts
/// in order, counting depth, and return the range from the first opener
/// through the closer that brings the depth back to zero.
pub fn balanced_range_extraction(
    tokens: &[PositionedToken],
    inc: &[SigElem],
    dec: &[SigElem],
) -> Option<TokenRange> {
    let inc_ranges = get_match_ranges(tokens, inc);
    let dec_ranges = get_match_ranges(tokens, dec);
    if inc_ranges.is_empty() || dec_ranges.is_empty() {
        return None;
    }

    let first = inc_ranges[0].0;
    let mut balance: usize = 1;
    let mut inc_iter = inc_ranges.iter().skip(1).peekable();
    let mut dec_iter = dec_ranges.iter().filter(|dec| dec.0 > first).peekable();
    loop {
        match (inc_iter.peek(), dec_iter.peek()) {
            (Some(next_inc), Some(next_dec)) if next_inc.0 < next_dec.0 => {
                balance += 1;
                inc_iter.next();
            }
            (_, Some(next_dec)) => {
                balance -= 1;
                let end = next_dec.1;
                dec_iter.next();
                if balance == 0 {
                    return Some((first, end));
                }
            }
            _ => return None,
        }
    }
}

/// Every balanced region, found by repeatedly extracting the first one,
/// deleting it, and compensating the indices of later finds.
pub fn balanced_range_extraction_vec(
    tokens: &[PositionedToken],
    inc: &[SigElem],
    dec: &[SigElem],
) -> Vec<TokenRange> {
    let mut remaining: Vec<PositionedToken> = tokens.to_vec();
    let mut ranges = Vec::new();
    let mut removed = 0;
    while let Some((start, end)) = balanced_range_extraction(&remaining, inc, dec) {
        remaining.drain(start..end);
        ranges.push((start + removed, end + removed));
        removed += end - start;
    }
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::token::PositionedToken;

    fn toks(kinds: &[TokenKind]) -> Vec<PositionedToken> {
        kinds
            .iter()
            .enumerate()
            .map(|(i, &kind)| PositionedToken::new(kind, 1, i as u32 + 1, kind.as_str()))
            .collect()
    }

    #[test]
    fn empty_signature_matches_empty_list() {
        let sig: Signature = Vec::new();
        assert!(tokens_match(&[], &sig));
    }

    #[test]
    fn serialization_counts_token_pairs() {
        let tokens = toks(&[TokenKind::Identifier, TokenKind::Equal, TokenKind::IntValue]);
        let serialized = stringify(&tokens);
        assert_eq!(serialized.matches('#').count(), 6);
    }

    #[test]
    fn match_ranges_map_back_to_token_indices() {
        let tokens = toks(&[
            TokenKind::Identifier,
            TokenKind::Equal,
            TokenKind::IntValue,
            TokenKind::Semicolon,
            TokenKind::Identifier,
            TokenKind::Equal,
            TokenKind::IntValue,
            TokenKind::Semicolon,
        ]);
        let sig = vec![tok(TokenKind::Identifier), tok(TokenKind::Equal)];
        let ranges = get_match_ranges(&tokens, &sig);
        assert_eq!(ranges, vec![(0, 2), (4, 6)]);
    }

    #[test]
    fn match_until_stops_at_first_terminator() {
        let tokens = toks(&[
            TokenKind::Identifier,
            TokenKind::ColonEqual,
            TokenKind::IntValue,
            TokenKind::Semicolon,
            TokenKind::Return,
            TokenKind::Semicolon,
        ]);
        let sig = match_until_signature(&[tok(TokenKind::Semicolon)]);
        let first = get_next_match_range(&tokens, &sig).unwrap();
        assert_eq!(first, (0, 4));
    }

    #[test]
    fn balanced_extraction_finds_outer_group() {
        // func((a + b) * (c - d))
        let tokens = toks(&[
            TokenKind::Identifier,
            TokenKind::LeftParen,
            TokenKind::LeftParen,
            TokenKind::Identifier,
            TokenKind::Plus,
            TokenKind::Identifier,
            TokenKind::RightParen,
            TokenKind::Mult,
            TokenKind::LeftParen,
            TokenKind::Identifier,
            TokenKind::Minus,
            TokenKind::Identifier,
            TokenKind::RightParen,
            TokenKind::RightParen,
        ]);
        let range = balanced_range_extraction(
            &tokens,
            &[tok(TokenKind::LeftParen)],
            &[tok(TokenKind::RightParen)],
        )
        .unwrap();
        assert_eq!(range, (1, 14));
    }

    #[test]
    fn balanced_extraction_vec_compensates_offsets() {
        // (a)(b)
        let tokens = toks(&[
            TokenKind::LeftParen,
            TokenKind::Identifier,
            TokenKind::RightParen,
            TokenKind::LeftParen,
            TokenKind::Identifier,
            TokenKind::RightParen,
        ]);
        let ranges = balanced_range_extraction_vec(
            &tokens,
            &[tok(TokenKind::LeftParen)],
            &[tok(TokenKind::RightParen)],
        );
        assert_eq!(ranges, vec![(0, 3), (3, 6)]);
    }

    #[test]
    fn leading_indents_counts_only_leading() {
        let tokens = vec![
            PositionedToken::new(TokenKind::Indent, 3, 1, "\t"),
            PositionedToken::new(TokenKind::Indent, 3, 5, "\t"),
            PositionedToken::new(TokenKind::Return, 3, 9, "return"),
            PositionedToken::new(TokenKind::Semicolon, 3, 15, ";"),
        ];
        assert_eq!(get_leading_indents(&tokens, 3), Some(2));
        assert_eq!(get_leading_indents(&tokens, 4), None);
    }

    #[test]
    fn line_range_covers_the_line() {
        let tokens = vec![
            PositionedToken::new(TokenKind::Def, 1, 1, "def"),
            PositionedToken::new(TokenKind::Eol, 1, 12, "\n"),
            PositionedToken::new(TokenKind::Return, 2, 5, "return"),
            PositionedToken::new(TokenKind::Semicolon, 2, 11, ";"),
        ];
        assert_eq!(get_tokens_line_range(&tokens, 2), Some((2, 4)));
        assert_eq!(get_tokens_line_range(&tokens, 9), None);
    }

    #[test]
    fn combine_is_concatenation() {
        let a = vec![tok(TokenKind::If)];
        let b = vec![tok(TokenKind::Colon)];
        let joined = combine(&[&a, &b]);
        assert_eq!(regex_string(&joined), format!("{}{}", regex_string(&a), regex_string(&b)));
    }
}
