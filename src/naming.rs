//! Identifier conversion utilities
//!
//! Every function here is total: any input, including an empty string or one
//! made only of invalid characters, yields a syntactically valid result.

use heck::{ToSnakeCase, ToUpperCamelCase};
use once_cell::sync::Lazy;
use std::collections::HashSet;

/// Literal used when sanitizing leaves nothing behind
pub const FALLBACK_IDENTIFIER: &str = "_field";

/// Words that may not be used as generated identifiers, covering the
/// Python and Rust emitters
static RESERVED_KEYWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        // Python
        "and", "as", "assert", "async", "await", "break", "class", "continue", "def", "del",
        "elif", "else", "except", "finally", "for", "from", "global", "if", "import", "in", "is",
        "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try", "while", "with",
        "yield",
        // Rust
        "abstract", "become", "box", "const", "crate", "do", "dyn", "enum", "extern", "false",
        "final", "fn", "impl", "let", "loop", "macro", "match", "mod", "move", "mut", "override",
        "priv", "pub", "ref", "self", "static", "struct", "super", "trait", "true", "type",
        "typeof", "unsafe", "unsized", "use", "virtual", "where",
    ]
    .into_iter()
    .collect()
});

pub fn is_reserved(identifier: &str) -> bool {
    RESERVED_KEYWORDS.contains(identifier)
}

/// `UserAccount` -> `user_account`, `XMLHttpRequest` -> `xml_http_request`
pub fn to_compound_lower(identifier: &str) -> String {
    identifier.to_snake_case()
}

/// Singularize, then join the words capitalized: `user_accounts` -> `UserAccount`
pub fn to_compound_capitalized(identifier: &str) -> String {
    let lower = to_compound_lower(identifier);
    let singular = singularize(&lower);
    let base = if singular.is_empty() { lower } else { singular };
    base.to_upper_camel_case()
}

/// Produce a lowercase identifier that is valid in every target language
pub fn sanitize_identifier(identifier: &str) -> String {
    // Leading underscores are meaningful and would be eaten by the case split
    let leading = identifier.len() - identifier.trim_start_matches('_').len();

    let mut name: String = "_".repeat(leading);
    name.extend(
        to_compound_lower(identifier)
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '_'),
    );

    if name.is_empty() {
        return FALLBACK_IDENTIFIER.to_string();
    }

    if name.starts_with(|c: char| c.is_ascii_digit()) {
        name.insert(0, '_');
    }

    if is_reserved(&name) {
        name.push('_');
    }

    name
}

/// True when `name` could have been produced by [`sanitize_identifier`]
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_ascii_lowercase() || first == '_')
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        && !is_reserved(name)
}

/// Plural form of the last word in a compound name
pub fn pluralize(word: &str) -> String {
    inflect_last_word(word, 2)
}

/// Singular form of the last word in a compound name
pub fn singularize(word: &str) -> String {
    inflect_last_word(word, 1)
}

fn inflect_last_word(word: &str, count: isize) -> String {
    match word.rsplit_once('_') {
        Some((head, last)) if !last.is_empty() => {
            format!("{}_{}", head, pluralizer::pluralize(last, count, false))
        }
        _ if word.is_empty() => String::new(),
        _ => pluralizer::pluralize(word, count, false),
    }
}

/// Strip a trailing `_id`/`id` from a foreign-key column name:
/// `author_id` -> `author`, `ownerId` -> `owner`
pub fn relationship_stem(column: &str) -> String {
    let lower = to_compound_lower(column);
    let stem = lower
        .strip_suffix("_id")
        .unwrap_or(&lower)
        .trim_end_matches('_');
    stem.to_string()
}

/// Return `base` or the first `{base}_{n}` (n >= 1) not accepted by `taken`
pub fn unique_name(base: &str, mut taken: impl FnMut(&str) -> bool) -> String {
    if !taken(base) {
        return base.to_string();
    }
    (1..)
        .map(|n| format!("{}_{}", base, n))
        .find(|candidate| !taken(candidate))
        .unwrap_or_else(|| base.to_string())
}
