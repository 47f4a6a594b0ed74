//! Prebuilt token-level patterns the parser classifies with.
//!
//! Every pattern is a lazily built [`Signature`]; nesting is plain
//! concatenation via [`combine`].

use once_cell::sync::Lazy;

use super::{combine, match_until_signature, raw, tok, Signature};
use crate::lexer::token::TokenKind;

/// Any single token.
pub static ANY_TOKEN: Lazy<Signature> = Lazy::new(|| vec![raw("#[0-9]+#")]);

/// A primitive (or SIMD) type: the lexer already folded those into
/// `Type` tokens.
pub static TYPE_PRIM: Lazy<Signature> = Lazy::new(|| vec![tok(TokenKind::Type)]);

/// A primitive or named type, with optional array / optional suffixes.
pub static TYPE: Lazy<Signature> = Lazy::new(|| {
    combine(&[
        &[raw("(?:"), tok(TokenKind::Type), raw("|"), tok(TokenKind::Identifier), raw(")")],
        &[
            raw("(?:(?:"),
            tok(TokenKind::LeftBracket),
            tok(TokenKind::RightBracket),
            raw(")|(?:"),
            tok(TokenKind::Question),
            raw("))*"),
        ],
    ])
});

/// `a::b::c` style references.
pub static REFERENCE: Lazy<Signature> = Lazy::new(|| {
    combine(&[
        &[tok(TokenKind::Identifier)],
        &[raw("(?:"), tok(TokenKind::Reference), tok(TokenKind::Identifier), raw(")+")],
    ])
});

/// One parameter: optional `mut`, a type, a name.
static ONE_PARAM: Lazy<Signature> = Lazy::new(|| {
    combine(&[
        &[raw("(?:"), tok(TokenKind::Mut), raw(")?")],
        &TYPE,
        &[tok(TokenKind::Identifier)],
    ])
});

/// Comma-separated parameter list.
pub static PARAMS: Lazy<Signature> = Lazy::new(|| {
    combine(&[
        &ONE_PARAM,
        &[raw("(?:"), tok(TokenKind::Comma)],
        &ONE_PARAM,
        &[raw(")*")],
    ])
});

/// `name name (, name name)*` — requires-clause entries have no
/// primitive types.
static NO_PRIM_PARAMS: Lazy<Signature> = Lazy::new(|| {
    combine(&[
        &[tok(TokenKind::Identifier), tok(TokenKind::Identifier)],
        &[
            raw("(?:"),
            tok(TokenKind::Comma),
            tok(TokenKind::Identifier),
            tok(TokenKind::Identifier),
            raw(")*"),
        ],
    ])
});

/// Parenthesised group of types, the multi-return form.
pub static GROUP: Lazy<Signature> = Lazy::new(|| {
    combine(&[
        &[tok(TokenKind::LeftParen)],
        &TYPE,
        &[raw("(?:"), tok(TokenKind::Comma)],
        &TYPE,
        &[raw(")*"), tok(TokenKind::RightParen)],
    ])
});

/// `NAME(` — the prefix every call starts with.
pub static FUNCTION_CALL: Lazy<Signature> =
    Lazy::new(|| vec![tok(TokenKind::Identifier), tok(TokenKind::LeftParen)]);

/// `TYPE(` — a cast written like a call of the target type.
pub static TYPE_CAST: Lazy<Signature> =
    Lazy::new(|| vec![tok(TokenKind::Type), tok(TokenKind::LeftParen)]);

// --- definitions ---

/// `use "path"` / `use a.b.c`, with an optional `as ALIAS` suffix.
pub static USE_STATEMENT: Lazy<Signature> = Lazy::new(|| {
    combine(&[
        &[tok(TokenKind::Use)],
        &[
            raw("(?:"),
            tok(TokenKind::StrValue),
            raw("|(?:"),
            tok(TokenKind::Identifier),
            raw("(?:"),
            tok(TokenKind::Dot),
            tok(TokenKind::Identifier),
            raw(")*))"),
        ],
        &[raw("(?:"), tok(TokenKind::As), tok(TokenKind::Identifier), raw(")?")],
    ])
});

/// `[aligned] [const] def NAME(params) [-> returns] :`
pub static FUNCTION_DEFINITION: Lazy<Signature> = Lazy::new(|| {
    combine(&[
        &[raw("(?:"), tok(TokenKind::Aligned), raw(")?")],
        &[raw("(?:"), tok(TokenKind::Const), raw(")?")],
        &[tok(TokenKind::Def), tok(TokenKind::Identifier), tok(TokenKind::LeftParen)],
        &[raw("(?:")],
        &PARAMS,
        &[raw(")?"), tok(TokenKind::RightParen)],
        &[raw("(?:(?:"), tok(TokenKind::Arrow)],
        &GROUP,
        &[tok(TokenKind::Colon), raw(")|(?:"), tok(TokenKind::Arrow)],
        &TYPE,
        // A bare comma list after `->` still classifies as a function
        // header; the builder rejects it as an ungrouped tuple.
        &[raw("(?:"), tok(TokenKind::Comma)],
        &TYPE,
        // The final alternative tolerates an error-set block between
        // the parameter list and the colon.
        &[raw(")*"), tok(TokenKind::Colon), raw(")|(?:(?:.)*?"), tok(TokenKind::Colon), raw("))")],
    ])
});

/// `[shared|immutable] [aligned] data NAME:`
pub static DATA_DEFINITION: Lazy<Signature> = Lazy::new(|| {
    combine(&[
        &[
            raw("(?:"),
            tok(TokenKind::Shared),
            raw("|"),
            tok(TokenKind::Immutable),
            raw(")?"),
        ],
        &[raw("(?:"), tok(TokenKind::Aligned), raw(")?")],
        &[tok(TokenKind::Data), tok(TokenKind::Identifier), tok(TokenKind::Colon)],
    ])
});

/// `func NAME [requires(Data d, ...)] :`
pub static FUNC_DEFINITION: Lazy<Signature> = Lazy::new(|| {
    combine(&[
        &[tok(TokenKind::Func), tok(TokenKind::Identifier)],
        &[raw("(?:"), tok(TokenKind::Requires), tok(TokenKind::LeftParen)],
        &NO_PRIM_PARAMS,
        &[tok(TokenKind::RightParen), raw(")?")],
        &[tok(TokenKind::Colon)],
    ])
});

/// `entity NAME [extends(Data d, ...)] :`
pub static ENTITY_DEFINITION: Lazy<Signature> = Lazy::new(|| {
    combine(&[
        &[tok(TokenKind::Entity), tok(TokenKind::Identifier)],
        &[raw("(?:"), tok(TokenKind::Extends), tok(TokenKind::LeftParen)],
        &NO_PRIM_PARAMS,
        &[tok(TokenKind::RightParen), raw(")?")],
        &[tok(TokenKind::Colon)],
    ])
});

/// `enum NAME:`
pub static ENUM_DEFINITION: Lazy<Signature> =
    Lazy::new(|| vec![tok(TokenKind::Enum), tok(TokenKind::Identifier), tok(TokenKind::Colon)]);

/// `error NAME [(PARENT)] :` — several parents still classify here so
/// the builder can reject them with the dedicated error.
pub static ERROR_DEFINITION: Lazy<Signature> = Lazy::new(|| {
    combine(&[
        &[tok(TokenKind::Error), tok(TokenKind::Identifier)],
        &[
            raw("(?:"),
            tok(TokenKind::LeftParen),
            tok(TokenKind::Identifier),
            raw("(?:"),
            tok(TokenKind::Comma),
            tok(TokenKind::Identifier),
            raw(")*"),
            tok(TokenKind::RightParen),
            raw(")?"),
        ],
        &[tok(TokenKind::Colon)],
    ])
});

/// `variant NAME:`
pub static VARIANT_DEFINITION: Lazy<Signature> = Lazy::new(|| {
    vec![
        tok(TokenKind::Variant),
        tok(TokenKind::Identifier),
        tok(TokenKind::Colon),
    ]
});

/// `test "NAME":`
pub static TEST_DEFINITION: Lazy<Signature> =
    Lazy::new(|| vec![tok(TokenKind::Test), tok(TokenKind::StrValue), tok(TokenKind::Colon)]);

// --- entity bodies ---

/// `data: A, B;` inside an entity.
pub static ENTITY_BODY_DATA: Lazy<Signature> = Lazy::new(|| {
    combine(&[
        &[tok(TokenKind::Data), tok(TokenKind::Colon), tok(TokenKind::Identifier)],
        &[raw("(?:"), tok(TokenKind::Comma), tok(TokenKind::Identifier), raw(")*")],
        &[tok(TokenKind::Semicolon)],
    ])
});

/// `func: A, B;` inside an entity.
pub static ENTITY_BODY_FUNC: Lazy<Signature> = Lazy::new(|| {
    combine(&[
        &[tok(TokenKind::Func), tok(TokenKind::Colon), tok(TokenKind::Identifier)],
        &[raw("(?:"), tok(TokenKind::Comma), tok(TokenKind::Identifier), raw(")*")],
        &[tok(TokenKind::Semicolon)],
    ])
});

/// `link:` header inside an entity.
pub static ENTITY_BODY_LINK_HEADER: Lazy<Signature> =
    Lazy::new(|| vec![tok(TokenKind::Link), tok(TokenKind::Colon)]);

/// One `a::b -> c::d;` mapping of a link section.
pub static ENTITY_BODY_LINK: Lazy<Signature> = Lazy::new(|| {
    combine(&[
        &REFERENCE,
        &[tok(TokenKind::Arrow)],
        &REFERENCE,
        &[tok(TokenKind::Semicolon)],
    ])
});

/// `Name(a, b);` — the entity constructor.
pub static ENTITY_BODY_CONSTRUCTOR: Lazy<Signature> = Lazy::new(|| {
    combine(&[
        &[tok(TokenKind::Identifier), tok(TokenKind::LeftParen)],
        &[
            raw("(?:"),
            tok(TokenKind::Identifier),
            raw("(?:"),
            tok(TokenKind::Comma),
            tok(TokenKind::Identifier),
            raw(")*)?"),
        ],
        &[tok(TokenKind::RightParen), tok(TokenKind::Semicolon)],
    ])
});

// --- statements ---

/// `TYPE NAME =` — the type may also be a parenthesised tuple.
pub static DECLARATION_EXPLICIT: Lazy<Signature> = Lazy::new(|| {
    combine(&[
        &[raw("(?:")],
        &TYPE,
        &[raw("|(?:"), tok(TokenKind::LeftParen)],
        &TYPE,
        &[raw("(?:"), tok(TokenKind::Comma)],
        &TYPE,
        &[raw(")*"), tok(TokenKind::RightParen), raw("))")],
        &[tok(TokenKind::Identifier), tok(TokenKind::Equal)],
    ])
});

/// `NAME :=`
pub static DECLARATION_INFERRED: Lazy<Signature> =
    Lazy::new(|| vec![tok(TokenKind::Identifier), tok(TokenKind::ColonEqual)]);

/// `NAME =`
pub static ASSIGNMENT: Lazy<Signature> =
    Lazy::new(|| vec![tok(TokenKind::Identifier), tok(TokenKind::Equal)]);

/// `for INIT; COND; STEP:`
pub static FOR_LOOP: Lazy<Signature> = Lazy::new(|| {
    combine(&[
        &[tok(TokenKind::For)],
        &match_until_signature(&[tok(TokenKind::Semicolon)]),
        &match_until_signature(&[tok(TokenKind::Semicolon)]),
        &match_until_signature(&[tok(TokenKind::Colon)]),
    ])
});

static LOOP_BINDING: Lazy<Signature> = Lazy::new(|| {
    combine(&[
        &[
            raw("(?:"),
            tok(TokenKind::Underscore),
            raw("|"),
            tok(TokenKind::Identifier),
            raw(")"),
        ],
        &[tok(TokenKind::Comma)],
        &[
            raw("(?:"),
            tok(TokenKind::Underscore),
            raw("|"),
            tok(TokenKind::Identifier),
            raw(")"),
        ],
        &[tok(TokenKind::In)],
    ])
});

/// `for IDX, ELEM in EXPR:`
pub static ENHANCED_FOR_LOOP: Lazy<Signature> = Lazy::new(|| {
    combine(&[
        &[tok(TokenKind::For)],
        &LOOP_BINDING,
        &match_until_signature(&[tok(TokenKind::Colon)]),
    ])
});

/// `parallel for IDX, ELEM in EXPR:`
pub static PAR_FOR_LOOP: Lazy<Signature> = Lazy::new(|| {
    combine(&[
        &[tok(TokenKind::Parallel), raw("(?:"), tok(TokenKind::For), raw(")?")],
        &LOOP_BINDING,
        &match_until_signature(&[tok(TokenKind::Colon)]),
    ])
});

/// `while COND:`
pub static WHILE_LOOP: Lazy<Signature> = Lazy::new(|| {
    combine(&[
        &[tok(TokenKind::While)],
        &match_until_signature(&[tok(TokenKind::Colon)]),
    ])
});

/// `if COND:`
pub static IF_STATEMENT: Lazy<Signature> = Lazy::new(|| {
    combine(&[
        &[tok(TokenKind::If)],
        &match_until_signature(&[tok(TokenKind::Colon)]),
    ])
});

/// `else if COND:`
pub static ELSE_IF_STATEMENT: Lazy<Signature> = Lazy::new(|| {
    combine(&[
        &[tok(TokenKind::Else), tok(TokenKind::If)],
        &match_until_signature(&[tok(TokenKind::Colon)]),
    ])
});

/// `else:`
pub static ELSE_STATEMENT: Lazy<Signature> = Lazy::new(|| {
    combine(&[
        &[tok(TokenKind::Else)],
        &match_until_signature(&[tok(TokenKind::Colon)]),
    ])
});

/// `return [EXPR];`
pub static RETURN_STATEMENT: Lazy<Signature> = Lazy::new(|| {
    combine(&[
        &[tok(TokenKind::Return)],
        &match_until_signature(&[tok(TokenKind::Semicolon)]),
    ])
});

/// `throw EXPR;`
pub static THROW_STATEMENT: Lazy<Signature> = Lazy::new(|| {
    combine(&[
        &[tok(TokenKind::Throw)],
        &match_until_signature(&[tok(TokenKind::Semicolon)]),
    ])
});

/// `catch [NAME]:`
pub static CATCH_STATEMENT: Lazy<Signature> = Lazy::new(|| {
    combine(&[
        &[tok(TokenKind::Catch), raw("(?:"), tok(TokenKind::Identifier), raw(")?")],
        &match_until_signature(&[tok(TokenKind::Colon)]),
    ])
});

// --- operators and simple expressions ---

const BINARY_OPERATORS: &[TokenKind] = &[
    TokenKind::Plus,
    TokenKind::Minus,
    TokenKind::Mult,
    TokenKind::Div,
    TokenKind::Mod,
    TokenKind::Pow,
    TokenKind::EqualEqual,
    TokenKind::NotEqual,
    TokenKind::Less,
    TokenKind::LessEqual,
    TokenKind::Greater,
    TokenKind::GreaterEqual,
    TokenKind::And,
    TokenKind::Or,
    TokenKind::ShiftLeft,
    TokenKind::ShiftRight,
    TokenKind::BitAnd,
    TokenKind::BitOr,
    TokenKind::BitXor,
];

const UNARY_OPERATORS: &[TokenKind] = &[
    TokenKind::Minus,
    TokenKind::Not,
    TokenKind::BitNeg,
    TokenKind::Increment,
    TokenKind::Decrement,
];

const LITERALS: &[TokenKind] = &[
    TokenKind::IntValue,
    TokenKind::FloatValue,
    TokenKind::StrValue,
    TokenKind::CharValue,
    TokenKind::True,
    TokenKind::False,
    TokenKind::None,
];

fn alternation(kinds: &[TokenKind]) -> Signature {
    let mut sig = vec![raw("(?:")];
    for (i, &kind) in kinds.iter().enumerate() {
        if i > 0 {
            sig.push(raw("|"));
        }
        sig.push(tok(kind));
    }
    sig.push(raw(")"));
    sig
}

/// Any binary operator token.
pub static BINARY_OPERATOR: Lazy<Signature> = Lazy::new(|| alternation(BINARY_OPERATORS));

/// Any unary operator token.
pub static UNARY_OPERATOR: Lazy<Signature> = Lazy::new(|| alternation(UNARY_OPERATORS));

/// Any literal token.
pub static LITERAL: Lazy<Signature> = Lazy::new(|| alternation(LITERALS));

/// Something, an operator, something.
pub static BIN_OP_EXPR: Lazy<Signature> = Lazy::new(|| {
    combine(&[
        &[raw("(?:#[0-9]+#)+")],
        &BINARY_OPERATOR,
        &[raw("(?:#[0-9]+#)+")],
    ])
});

/// A unary operator directly followed by its operand.
pub static UNARY_OP_EXPR: Lazy<Signature> = Lazy::new(|| {
    combine(&[&UNARY_OPERATOR, &[raw("(?:#[0-9]+#)+")]])
});

/// A lone identifier.
pub static VARIABLE_EXPR: Lazy<Signature> = Lazy::new(|| vec![tok(TokenKind::Identifier)]);

/// Whether the token kind is a binary operator.
pub fn is_binary_operator(kind: TokenKind) -> bool {
    BINARY_OPERATORS.contains(&kind)
}

/// Whether the token kind is a unary operator.
pub fn is_unary_operator(kind: TokenKind) -> bool {
    UNARY_OPERATORS.contains(&kind)
}

/// Whether the token kind is a literal.
pub fn is_literal(kind: TokenKind) -> bool {
    LITERALS.contains(&kind)
}

/// Binding strength of a binary operator, low → high:
/// logical, equality/relational, bitwise, shifts, additive,
/// multiplicative, exponent.
pub fn precedence(kind: TokenKind) -> Option<u8> {
    let level = match kind {
        TokenKind::Or | TokenKind::And => 1,
        TokenKind::EqualEqual
        | TokenKind::NotEqual
        | TokenKind::Less
        | TokenKind::LessEqual
        | TokenKind::Greater
        | TokenKind::GreaterEqual => 2,
        TokenKind::BitOr | TokenKind::BitXor | TokenKind::BitAnd => 3,
        TokenKind::ShiftLeft | TokenKind::ShiftRight => 4,
        TokenKind::Plus | TokenKind::Minus => 5,
        TokenKind::Mult | TokenKind::Div | TokenKind::Mod => 6,
        TokenKind::Pow => 7,
        _ => return None,
    };
    Some(level)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::token::PositionedToken;
    use crate::signature::{tokens_contain, tokens_match};

    fn toks(kinds: &[TokenKind]) -> Vec<PositionedToken> {
        kinds
            .iter()
            .enumerate()
            .map(|(i, &kind)| PositionedToken::new(kind, 1, i as u32 + 1, kind.as_str()))
            .collect()
    }

    #[test]
    fn function_definition_header_is_recognized() {
        // def main ( ) :
        let tokens = toks(&[
            TokenKind::Def,
            TokenKind::Identifier,
            TokenKind::LeftParen,
            TokenKind::RightParen,
            TokenKind::Colon,
        ]);
        assert!(tokens_contain(&tokens, &FUNCTION_DEFINITION));
    }

    #[test]
    fn use_statement_both_forms() {
        let quoted = toks(&[TokenKind::Use, TokenKind::StrValue]);
        assert!(tokens_contain(&quoted, &USE_STATEMENT));
        let dotted = toks(&[
            TokenKind::Use,
            TokenKind::Identifier,
            TokenKind::Dot,
            TokenKind::Identifier,
        ]);
        assert!(tokens_contain(&dotted, &USE_STATEMENT));
    }

    #[test]
    fn declarations_are_distinguished() {
        let explicit = toks(&[
            TokenKind::Type,
            TokenKind::Identifier,
            TokenKind::Equal,
            TokenKind::IntValue,
            TokenKind::Semicolon,
        ]);
        assert!(tokens_contain(&explicit, &DECLARATION_EXPLICIT));
        assert!(!tokens_contain(&explicit, &DECLARATION_INFERRED));

        let inferred = toks(&[
            TokenKind::Identifier,
            TokenKind::ColonEqual,
            TokenKind::IntValue,
            TokenKind::Semicolon,
        ]);
        assert!(tokens_contain(&inferred, &DECLARATION_INFERRED));
        assert!(!tokens_contain(&inferred, &DECLARATION_EXPLICIT));
    }

    #[test]
    fn else_if_is_an_else_statement_too() {
        let tokens = toks(&[
            TokenKind::Else,
            TokenKind::If,
            TokenKind::True,
            TokenKind::Colon,
        ]);
        assert!(tokens_contain(&tokens, &ELSE_IF_STATEMENT));
        assert!(tokens_contain(&tokens, &ELSE_STATEMENT));
    }

    #[test]
    fn binary_operator_matching() {
        assert!(is_binary_operator(TokenKind::Plus));
        assert!(!is_binary_operator(TokenKind::Semicolon));
        let tokens = toks(&[TokenKind::IntValue, TokenKind::Plus, TokenKind::IntValue]);
        assert!(tokens_match(&tokens, &BIN_OP_EXPR));
    }

    #[test]
    fn precedence_orders_tiers() {
        assert!(precedence(TokenKind::Or).unwrap() < precedence(TokenKind::EqualEqual).unwrap());
        assert!(precedence(TokenKind::Plus).unwrap() < precedence(TokenKind::Mult).unwrap());
        assert!(precedence(TokenKind::Mult).unwrap() < precedence(TokenKind::Pow).unwrap());
        assert!(precedence(TokenKind::Semicolon).is_none());
    }

    #[test]
    fn test_definition_requires_string_name() {
        let tokens = toks(&[TokenKind::Test, TokenKind::StrValue, TokenKind::Colon]);
        assert!(tokens_contain(&tokens, &TEST_DEFINITION));
        let unnamed = toks(&[TokenKind::Test, TokenKind::Colon]);
        assert!(!tokens_contain(&unnamed, &TEST_DEFINITION));
    }
}
