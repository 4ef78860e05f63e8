//! Clojure name munging as a single encode/decode pair.
//!
//! The compiler maps characters that are illegal in JVM class names to fixed
//! replacement tokens. Namespaces additionally map `.` to the package
//! separator, which becomes `/` in archive paths.

/// Character replacements applied by the Clojure compiler.
const MUNGE_TABLE: &[(char, &str)] = &[
    ('-', "_"),
    (':', "_COLON_"),
    ('+', "_PLUS_"),
    ('>', "_GT_"),
    ('<', "_LT_"),
    ('=', "_EQ_"),
    ('~', "_TILDE_"),
    ('!', "_BANG_"),
    ('@', "_CIRCA_"),
    ('#', "_SHARP_"),
    ('\'', "_SINGLEQUOTE_"),
    ('"', "_DOUBLEQUOTE_"),
    ('%', "_PERCENT_"),
    ('^', "_CARET_"),
    ('&', "_AMPERSAND_"),
    ('*', "_STAR_"),
    ('|', "_BAR_"),
    ('{', "_LBRACE_"),
    ('}', "_RBRACE_"),
    ('[', "_LBRACK_"),
    (']', "_RBRACK_"),
    ('/', "_SLASH_"),
    ('\\', "_BSLASH_"),
    ('?', "_QMARK_"),
];

/// Munge a single name segment (no package separators).
pub fn munge(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for ch in name.chars() {
        match MUNGE_TABLE.iter().find(|(from, _)| *from == ch) {
            Some((_, token)) => out.push_str(token),
            None => out.push(ch),
        }
    }
    out
}

/// Reverse [`munge`]. Longer tokens are matched before the bare `_`.
///
/// A literal `_` in the original name is indistinguishable from a munged `-`
/// and decodes as `-`, the same way the Clojure runtime demunges.
pub fn demunge(munged: &str) -> String {
    let mut out = String::with_capacity(munged.len());
    let mut rest = munged;
    while let Some(ch) = rest.chars().next() {
        if ch == '_' {
            if let Some((original, token)) = longest_token_at(rest) {
                out.push(original);
                rest = &rest[token.len()..];
                continue;
            }
        }
        out.push(ch);
        rest = &rest[ch.len_utf8()..];
    }
    out
}

fn longest_token_at(input: &str) -> Option<(char, &'static str)> {
    MUNGE_TABLE
        .iter()
        .filter(|(_, token)| input.starts_with(token))
        .max_by_key(|(_, token)| token.len())
        .map(|(original, token)| (*original, *token))
}

/// Munge a dotted namespace, keeping `.` as the package separator.
///
/// `my-app.core` becomes `my_app.core`, which is also the default class name
/// of a namespace compiled with `:gen-class`.
pub fn munge_namespace(namespace: &str) -> String {
    namespace
        .split('.')
        .map(munge)
        .collect::<Vec<_>>()
        .join(".")
}

/// Archive path prefix of a namespace: `my-app.core` becomes `my_app/core`.
pub fn namespace_to_path(namespace: &str) -> String {
    namespace
        .split('.')
        .map(munge)
        .collect::<Vec<_>>()
        .join("/")
}

/// Inverse of [`namespace_to_path`].
pub fn path_to_namespace(path: &str) -> String {
    path.split('/').map(demunge).collect::<Vec<_>>().join(".")
}

/// Archive path prefix of a fully qualified JVM class name.
pub fn class_to_path(class_name: &str) -> String {
    class_name.replace('.', "/")
}
