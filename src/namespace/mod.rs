//! First-party namespace classification.
//!
//! Decides which compiled artifact paths belong to the project itself, based
//! on the namespaces declared by its own source files:
//! - [`munge`] - namespace and class name encoding
//! - [`source`] - `ns` form parsing
//!
//! A namespace `app.core` compiles to `app/core__init.class`, one
//! `app/core$...` class per function or anonymous form and, with
//! `:gen-class`, `app/core.class`. All of these are first-party.

pub mod munge;
pub mod source;

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{PackageError, PackageResult};
use munge::{class_to_path, munge_namespace, namespace_to_path};
use source::parse_ns_declaration;

/// Source file extensions that declare JVM namespaces.
const SOURCE_EXTENSIONS: &[&str] = &["clj", "cljc"];

/// A first-party source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUnit {
    pub namespace: String,
    /// Custom class name from `(:gen-class :name ...)`.
    pub gen_class_name: Option<String>,
    /// The `ns` form carries `(:gen-class ...)`, so AOT emits a main class.
    pub gen_class: bool,
    pub path: PathBuf,
}

impl SourceUnit {
    pub fn new(namespace: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            namespace: namespace.into(),
            gen_class_name: None,
            gen_class: false,
            path: path.into(),
        }
    }

    pub fn with_gen_class_name(mut self, name: impl Into<String>) -> Self {
        self.gen_class_name = Some(name.into());
        self.gen_class = true;
        self
    }

    /// Read a source file. `Ok(None)` when it has no `ns` form.
    pub fn from_file(path: &Path) -> PackageResult<Option<Self>> {
        let text = fs::read_to_string(path).map_err(|e| PackageError::io(path, e))?;
        Ok(parse_ns_declaration(&text).map(|decl| Self {
            namespace: decl.namespace,
            gen_class_name: decl.gen_class_name,
            gen_class: decl.gen_class,
            path: path.to_path_buf(),
        }))
    }

    /// JVM class carrying `main` for this namespace.
    pub fn main_class(&self) -> String {
        self.gen_class_name
            .clone()
            .unwrap_or_else(|| munge_namespace(&self.namespace))
    }
}

/// Collect source units under the given roots, sorted by path.
///
/// Files without an `ns` form are skipped.
pub fn discover_source_units(roots: &[PathBuf]) -> PackageResult<Vec<SourceUnit>> {
    let mut units = Vec::new();
    for root in roots {
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(root.as_path()).to_path_buf();
                PackageError::io(path, e.into())
            })?;
            if !entry.file_type().is_file() || !has_source_extension(entry.path()) {
                continue;
            }
            match SourceUnit::from_file(entry.path())? {
                Some(unit) => units.push(unit),
                None => tracing::debug!(
                    path = %entry.path().display(),
                    "no ns form; not a first-party namespace"
                ),
            }
        }
    }
    Ok(units)
}

fn has_source_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext))
}

/// Encoded path prefixes of first-party namespaces and gen-class names.
#[derive(Debug, Clone, Default)]
pub struct FirstPartySet {
    prefixes: BTreeSet<String>,
}

impl FirstPartySet {
    pub fn from_units(units: &[SourceUnit]) -> Self {
        let mut prefixes = BTreeSet::new();
        for unit in units {
            prefixes.insert(namespace_to_path(&unit.namespace));
            if let Some(name) = &unit.gen_class_name {
                prefixes.insert(class_to_path(name));
            }
        }
        Self { prefixes }
    }

    /// Whether an archive-relative path is first-party: `p.class`,
    /// `p__init.class` or any nested `p$...` class for a known prefix `p`.
    pub fn contains(&self, path: &str) -> bool {
        let Some(stem) = path.strip_suffix(".class") else {
            return false;
        };
        let owner = match stem.find('$') {
            Some(idx) => &stem[..idx],
            None => stem.strip_suffix("__init").unwrap_or(stem),
        };
        self.prefixes.contains(owner)
    }

    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.prefixes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn set(units: &[SourceUnit]) -> FirstPartySet {
        FirstPartySet::from_units(units)
    }

    #[test]
    fn namespace_artifacts_are_first_party() {
        let fp = set(&[SourceUnit::new("app.core", "src/app/core.clj")]);
        assert!(fp.contains("app/core__init.class"));
        assert!(fp.contains("app/core.class"));
        assert!(fp.contains("app/core$fn__7.class"));
        assert!(fp.contains("app/core$handler$fn__12.class"));
        assert!(fp.contains("app/core$loading__6789__auto____42.class"));
    }

    #[test]
    fn sibling_and_child_namespaces_are_not() {
        let fp = set(&[SourceUnit::new("app.core", "src/app/core.clj")]);
        assert!(!fp.contains("app/core_test__init.class"));
        assert!(!fp.contains("app/core/ext__init.class"));
        assert!(!fp.contains("app/corex.class"));
        assert!(!fp.contains("app/core.clj"));
    }

    #[test]
    fn hyphenated_namespace_uses_munged_prefix() {
        let fp = set(&[SourceUnit::new("my-app.web-server", "x.clj")]);
        assert!(fp.contains("my_app/web_server__init.class"));
        assert!(!fp.contains("my-app/web-server__init.class"));
    }

    #[test]
    fn custom_gen_class_name_is_first_party() {
        let fp = set(&[
            SourceUnit::new("app.main", "x.clj").with_gen_class_name("com.example.Main")
        ]);
        assert!(fp.contains("com/example/Main.class"));
        assert!(fp.contains("com/example/Main$1.class"));
        assert!(fp.contains("app/main__init.class"));
        assert_eq!(fp.len(), 2);
    }

    #[test]
    fn main_class_prefers_gen_class_name() {
        let plain = SourceUnit::new("my-app.core", "x.clj");
        assert_eq!(plain.main_class(), "my_app.core");
        let named = plain.with_gen_class_name("com.example.Main");
        assert_eq!(named.main_class(), "com.example.Main");
    }

    #[test]
    fn discovers_units_in_sorted_order() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("src");
        fs::create_dir_all(root.join("app")).unwrap();
        fs::write(root.join("app/core.clj"), "(ns app.core (:gen-class))").unwrap();
        fs::write(root.join("app/util.cljc"), "(ns app.util)").unwrap();
        fs::write(root.join("app/data.edn"), "{:a 1}").unwrap();
        fs::write(root.join("app/scratch.clj"), "(println 1)").unwrap();

        let units = discover_source_units(&[root]).unwrap();
        let names: Vec<_> = units.iter().map(|u| u.namespace.as_str()).collect();
        assert_eq!(names, vec!["app.core", "app.util"]);
        assert!(units[0].gen_class);
        assert!(!units[1].gen_class);
    }
}
