//! AOT compile output.
//!
//! Loaded from the compiler's output directory as archive-relative paths
//! (always `/`-separated) mapped to their bytes.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

use crate::error::{PackageError, PackageResult};

/// The set of artifacts produced by one AOT compile, sorted by path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompiledArtifacts {
    artifacts: BTreeMap<String, Vec<u8>>,
}

impl CompiledArtifacts {
    /// Read every regular file under `classes_dir`.
    ///
    /// Symlinks are not followed; a missing directory is an error since a
    /// package build always follows a compile.
    pub fn load(classes_dir: &Path) -> PackageResult<Self> {
        if !classes_dir.is_dir() {
            return Err(PackageError::io(
                classes_dir,
                std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "compiled classes directory not found",
                ),
            ));
        }

        let mut artifacts = BTreeMap::new();
        for entry in WalkDir::new(classes_dir).follow_links(false) {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(classes_dir).to_path_buf();
                PackageError::io(path, e.into())
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let rel = entry
                .path()
                .strip_prefix(classes_dir)
                .unwrap_or(entry.path())
                .to_string_lossy()
                .replace('\\', "/");
            let content = fs::read(entry.path()).map_err(|e| PackageError::io(entry.path(), e))?;
            artifacts.insert(rel, content);
        }

        let compiled = Self { artifacts };
        tracing::debug!(
            dir = %classes_dir.display(),
            count = compiled.len(),
            bytes = compiled.total_size(),
            "loaded compiled artifacts"
        );
        Ok(compiled)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.artifacts.contains_key(path)
    }

    pub fn get(&self, path: &str) -> Option<&[u8]> {
        self.artifacts.get(path).map(Vec::as_slice)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.artifacts.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    pub fn total_size(&self) -> u64 {
        self.artifacts.values().map(|c| c.len() as u64).sum()
    }
}

impl FromIterator<(String, Vec<u8>)> for CompiledArtifacts {
    fn from_iter<I: IntoIterator<Item = (String, Vec<u8>)>>(iter: I) -> Self {
        Self {
            artifacts: iter.into_iter().collect(),
        }
    }
}
