//! Keyword and reserved-name tables used during identifier recognition.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use super::token::TokenKind;

/// Identifier prefixes reserved for compiler-generated symbols.
pub const RESERVED_PREFIXES: &[&str] = &["__flint_", "__fip_"];

/// Keyword spelling → token kind. Identifiers are checked against the
/// primitives table first, this table second.
pub static KEYWORDS: Lazy<HashMap<&'static str, TokenKind>> = Lazy::new(|| {
    let mut map = HashMap::new();
    map.insert("and", TokenKind::And);
    map.insert("or", TokenKind::Or);
    map.insert("not", TokenKind::Not);
    map.insert("if", TokenKind::If);
    map.insert("else", TokenKind::Else);
    map.insert("switch", TokenKind::Switch);
    map.insert("for", TokenKind::For);
    map.insert("do", TokenKind::Do);
    map.insert("while", TokenKind::While);
    map.insert("parallel", TokenKind::Parallel);
    map.insert("in", TokenKind::In);
    map.insert("break", TokenKind::Break);
    map.insert("continue", TokenKind::Continue);
    map.insert("def", TokenKind::Def);
    map.insert("return", TokenKind::Return);
    map.insert("error", TokenKind::Error);
    map.insert("throw", TokenKind::Throw);
    map.insert("catch", TokenKind::Catch);
    map.insert("variant", TokenKind::Variant);
    map.insert("enum", TokenKind::Enum);
    map.insert("use", TokenKind::Use);
    map.insert("as", TokenKind::As);
    map.insert("alias", TokenKind::Alias);
    map.insert("type", TokenKind::TypeKeyword);
    map.insert("true", TokenKind::True);
    map.insert("false", TokenKind::False);
    map.insert("none", TokenKind::None);
    map.insert("data", TokenKind::Data);
    map.insert("shared", TokenKind::Shared);
    map.insert("immutable", TokenKind::Immutable);
    map.insert("aligned", TokenKind::Aligned);
    map.insert("func", TokenKind::Func);
    map.insert("requires", TokenKind::Requires);
    map.insert("entity", TokenKind::Entity);
    map.insert("extends", TokenKind::Extends);
    map.insert("link", TokenKind::Link);
    map.insert("spawn", TokenKind::Spawn);
    map.insert("sync", TokenKind::Sync);
    map.insert("lock", TokenKind::Lock);
    map.insert("const", TokenKind::Const);
    map.insert("mut", TokenKind::Mut);
    map.insert("persistent", TokenKind::Persistent);
    map.insert("test", TokenKind::Test);
    map.insert("extern", TokenKind::Extern);
    map.insert("export", TokenKind::Export);
    map
});

/// Function names a user definition may not take. `main` is deliberately
/// absent; it has its own dedicated rules.
pub static RESERVED_FUNCTION_NAMES: Lazy<Vec<&'static str>> =
    Lazy::new(|| vec!["print", "printerr", "assert", "str", "panic", "typeof"]);

pub fn is_reserved_identifier(identifier: &str) -> bool {
    RESERVED_PREFIXES
        .iter()
        .any(|prefix| identifier.starts_with(prefix))
}

pub fn is_reserved_function_name(name: &str) -> bool {
    RESERVED_FUNCTION_NAMES.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_resolve() {
        assert_eq!(KEYWORDS.get("def"), Some(&TokenKind::Def));
        assert_eq!(KEYWORDS.get("requires"), Some(&TokenKind::Requires));
        assert!(KEYWORDS.get("i32").is_none());
    }

    #[test]
    fn reserved_prefixes() {
        assert!(is_reserved_identifier("__flint_internal"));
        assert!(is_reserved_identifier("__fip_bridge"));
        assert!(!is_reserved_identifier("flint_user"));
    }

    #[test]
    fn main_is_not_reserved() {
        assert!(!is_reserved_function_name("main"));
        assert!(is_reserved_function_name("print"));
    }
}
