//! Reads the `ns` declaration of a Clojure source file.
//!
//! Only the namespace name and the `:name` option of a `(:gen-class ...)`
//! clause are extracted. Anything else in the file is ignored.

use regex::Regex;
use std::sync::LazyLock;

static NS_HEAD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\(\s*ns\s+(?:\^\{[^}]*\}\s*|\^:?[^\s()\[\]{}"]+\s*)*([^\s()\[\]{}"^]+)"#)
        .unwrap_or_else(|err| panic!("invalid ns regex: {err}"))
});

static GEN_CLASS_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#":name\s+([A-Za-z_$][^\s()\[\]{}"]*)"#)
        .unwrap_or_else(|err| panic!("invalid gen-class regex: {err}"))
});

/// What the `ns` form of one file declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NsDeclaration {
    pub namespace: String,
    /// `Some` only when `:gen-class` carries a well-formed `:name`.
    pub gen_class_name: Option<String>,
    /// `:gen-class` was present, with or without a name.
    pub gen_class: bool,
}

/// Parse the first `ns` form in `text`. Returns `None` when there is none.
pub fn parse_ns_declaration(text: &str) -> Option<NsDeclaration> {
    let code = strip_comments(text);
    let start = find_ns_form(&code)?;
    let form = balanced_form(&code[start..]);
    let namespace = NS_HEAD.captures(form)?.get(1)?.as_str().to_string();

    let gen_class_form = form
        .find("(:gen-class")
        .map(|idx| balanced_form(&form[idx..]));
    let gen_class_name = gen_class_form.and_then(|clause| {
        let name = GEN_CLASS_NAME
            .captures(clause)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string());
        if name.is_none() && clause.contains(":name") {
            tracing::warn!(
                namespace = %namespace,
                "ignoring malformed :gen-class :name; using the namespace class name"
            );
        }
        name
    });

    Some(NsDeclaration {
        namespace,
        gen_class_name,
        gen_class: gen_class_form.is_some(),
    })
}

fn find_ns_form(code: &str) -> Option<usize> {
    let mut search_from = 0;
    while let Some(rel) = code[search_from..].find('(') {
        let idx = search_from + rel;
        let after = code[idx + 1..].trim_start();
        if let Some(rest) = after.strip_prefix("ns") {
            if rest.starts_with(char::is_whitespace) {
                return Some(idx);
            }
        }
        search_from = idx + 1;
    }
    None
}

/// The text of the form starting at `input[0]`, up to its closing paren.
/// An unbalanced form yields the remainder of the input.
fn balanced_form(input: &str) -> &str {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (idx, ch) in input.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return &input[..=idx];
                }
            }
            _ => {}
        }
    }
    input
}

/// Blank out `;` line comments and string literals so that neither can
/// be mistaken for code.
fn strip_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut in_string = false;
    while let Some(ch) = chars.next() {
        if in_string {
            match ch {
                '\\' => {
                    out.push(' ');
                    if chars.next().is_some() {
                        out.push(' ');
                    }
                }
                '"' => {
                    in_string = false;
                    out.push('"');
                }
                '\n' => out.push('\n'),
                _ => out.push(' '),
            }
            continue;
        }
        match ch {
            '"' => {
                in_string = true;
                out.push('"');
            }
            '\\' => {
                // Character literal such as \; or \(
                out.push(' ');
                if chars.next().is_some() {
                    out.push(' ');
                }
            }
            ';' => {
                for rest in chars.by_ref() {
                    if rest == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_namespace() {
        let decl = parse_ns_declaration("(ns app.core\n  (:require [clojure.string :as str]))\n")
            .unwrap();
        assert_eq!(decl.namespace, "app.core");
        assert_eq!(decl.gen_class_name, None);
        assert!(!decl.gen_class);
    }

    #[test]
    fn gen_class_with_custom_name() {
        let src = r#"
;; entry point
(ns my-app.main
  "Docstring with (parens) and ; semicolons"
  (:require [my-app.db :as db])
  (:gen-class :name com.example.Main :main true))
"#;
        let decl = parse_ns_declaration(src).unwrap();
        assert_eq!(decl.namespace, "my-app.main");
        assert_eq!(decl.gen_class_name.as_deref(), Some("com.example.Main"));
        assert!(decl.gen_class);
    }

    #[test]
    fn gen_class_without_name_keeps_default() {
        let decl = parse_ns_declaration("(ns app.core (:gen-class))").unwrap();
        assert!(decl.gen_class);
        assert_eq!(decl.gen_class_name, None);
    }

    #[test]
    fn malformed_gen_class_name_is_ignored() {
        let decl = parse_ns_declaration("(ns app.core (:gen-class :name))").unwrap();
        assert_eq!(decl.namespace, "app.core");
        assert!(decl.gen_class);
        assert_eq!(decl.gen_class_name, None);
    }

    #[test]
    fn metadata_before_name_is_skipped() {
        let decl = parse_ns_declaration("(ns ^:no-doc ^{:author \"x\"} app.internal)").unwrap();
        assert_eq!(decl.namespace, "app.internal");
    }

    #[test]
    fn commented_out_ns_is_not_used() {
        let src = ";; (ns not.this)\n(ns the.real.one)";
        assert_eq!(parse_ns_declaration(src).unwrap().namespace, "the.real.one");
    }

    #[test]
    fn no_ns_form() {
        assert_eq!(parse_ns_declaration("(defn f [] 1)"), None);
        assert_eq!(parse_ns_declaration(""), None);
    }

    #[test]
    fn gen_class_outside_ns_is_ignored() {
        let src = "(ns app.core)\n(gen-class :name com.example.Other)";
        let decl = parse_ns_declaration(src).unwrap();
        assert_eq!(decl.gen_class_name, None);
    }
}
