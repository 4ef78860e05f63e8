//! Dependency archive reading.
//!
//! Each resolved dependency arrives as a jar tagged with its coordinate. The
//! jar is read fully into memory once; classification and assembly both work
//! from that in-memory copy.

use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use crate::coordinate::Coordinate;
use crate::error::{PackageError, PackageResult};

const MAX_PREALLOC: u64 = 1 << 20;

/// Where to find one dependency's archive.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArchiveSource {
    pub coordinate: Coordinate,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub path: String,
    pub content: Vec<u8>,
}

/// One dependency's archive content, in archive order.
#[derive(Debug, Clone)]
pub struct DependencyArchive {
    coordinate: Coordinate,
    entries: Vec<ArchiveEntry>,
    lookup: HashMap<String, usize>,
}

impl DependencyArchive {
    /// Build from entries in archive order. A repeated path keeps its first
    /// occurrence.
    pub fn new(coordinate: Coordinate, entries: impl IntoIterator<Item = ArchiveEntry>) -> Self {
        let mut kept = Vec::new();
        let mut lookup = HashMap::new();
        for entry in entries {
            if lookup.contains_key(&entry.path) {
                tracing::debug!(
                    coordinate = %coordinate,
                    path = %entry.path,
                    "duplicate entry inside archive; keeping the first"
                );
                continue;
            }
            lookup.insert(entry.path.clone(), kept.len());
            kept.push(entry);
        }
        Self {
            coordinate,
            entries: kept,
            lookup,
        }
    }

    pub fn coordinate(&self) -> &Coordinate {
        &self.coordinate
    }

    pub fn entry(&self, path: &str) -> Option<&[u8]> {
        self.lookup
            .get(path)
            .map(|&idx| self.entries[idx].content.as_slice())
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.path.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Entries that must not be carried over from a dependency jar: its own
/// manifest and index, and signature files that would no longer match the
/// merged archive.
pub fn is_dropped_entry(path: &str) -> bool {
    let upper = path.to_ascii_uppercase();
    let Some(name) = upper.strip_prefix("META-INF/") else {
        return false;
    };
    if name.contains('/') {
        return false;
    }
    name == "MANIFEST.MF"
        || name == "INDEX.LIST"
        || name.starts_with("SIG-")
        || [".SF", ".DSA", ".RSA", ".EC"]
            .iter()
            .any(|ext| name.ends_with(ext))
}

/// Read one dependency archive.
pub fn read_archive(source: &ArchiveSource) -> PackageResult<DependencyArchive> {
    let unreadable = |err: zip::result::ZipError| PackageError::UnreadableArchive {
        coordinate: source.coordinate.clone(),
        path: source.path.clone(),
        source: err,
    };

    let file = File::open(&source.path).map_err(|e| PackageError::io(&source.path, e))?;
    let mut zip = zip::ZipArchive::new(BufReader::new(file)).map_err(unreadable)?;

    let mut entries = Vec::with_capacity(zip.len());
    for idx in 0..zip.len() {
        let mut file = zip.by_index(idx).map_err(unreadable)?;
        if file.is_dir() {
            continue;
        }
        let path = file.name().trim_start_matches('/').to_string();
        if is_dropped_entry(&path) {
            continue;
        }
        // Header sizes are untrusted; cap the up-front allocation.
        let mut content = Vec::with_capacity(file.size().min(MAX_PREALLOC) as usize);
        file.read_to_end(&mut content)
            .map_err(|e| PackageError::ArchiveEntry {
                coordinate: source.coordinate.clone(),
                entry: path.clone(),
                source: e,
            })?;
        entries.push(ArchiveEntry { path, content });
    }

    let archive = DependencyArchive::new(source.coordinate.clone(), entries);
    tracing::debug!(
        coordinate = %source.coordinate,
        path = %source.path.display(),
        entries = archive.len(),
        "indexed dependency archive"
    );
    Ok(archive)
}

/// Read archives on up to `jobs` threads.
///
/// The result keeps the declared order of `sources`, and when several
/// archives fail the error of the earliest one is returned.
pub fn read_archives(sources: &[ArchiveSource], jobs: usize) -> PackageResult<Vec<DependencyArchive>> {
    let jobs = jobs.clamp(1, sources.len().max(1));
    if jobs == 1 {
        return sources.iter().map(read_archive).collect();
    }

    let chunk_size = sources.len().div_ceil(jobs);
    let chunks: Vec<PackageResult<Vec<DependencyArchive>>> = std::thread::scope(|scope| {
        let handles: Vec<_> = sources
            .chunks(chunk_size)
            .map(|chunk| {
                scope.spawn(move || {
                    chunk
                        .iter()
                        .map(read_archive)
                        .collect::<PackageResult<Vec<_>>>()
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| {
                handle
                    .join()
                    .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
            })
            .collect()
    });

    let mut archives = Vec::with_capacity(sources.len());
    for chunk in chunks {
        archives.extend(chunk?);
    }
    Ok(archives)
}

/// Resolve a possibly relative archive path against `base`.
pub(crate) fn resolve_source(base: &Path, source: ArchiveSource) -> ArchiveSource {
    ArchiveSource {
        path: base.join(source.path),
        ..source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

    fn write_jar(path: &Path, entries: &[(&str, &[u8])]) {
        let mut zip = zip::ZipWriter::new(File::create(path).unwrap());
        let options = SimpleFileOptions::default();
        for (name, content) in entries {
            if name.ends_with('/') {
                zip.add_directory(*name, options).unwrap();
            } else {
                zip.start_file(*name, options).unwrap();
                zip.write_all(content).unwrap();
            }
        }
        zip.finish().unwrap();
    }

    fn source(dir: &Path, coordinate: &str, name: &str) -> ArchiveSource {
        ArchiveSource {
            coordinate: coordinate.parse().unwrap(),
            path: dir.join(name),
        }
    }

    #[test]
    fn drops_directories_manifest_and_signatures() {
        let tmp = TempDir::new().unwrap();
        let src = source(tmp.path(), "lib:json", "json.jar");
        write_jar(
            &src.path,
            &[
                ("META-INF/", b""),
                ("META-INF/MANIFEST.MF", b"Manifest-Version: 1.0\n"),
                ("META-INF/LIB.SF", b"sig"),
                ("META-INF/LIB.RSA", b"sig"),
                ("META-INF/maven/lib/json/pom.xml", b"<project/>"),
                ("lib/json/Writer.class", b"writer"),
            ],
        );

        let archive = read_archive(&src).unwrap();
        let paths: Vec<_> = archive.paths().collect();
        assert_eq!(
            paths,
            vec!["META-INF/maven/lib/json/pom.xml", "lib/json/Writer.class"]
        );
        assert_eq!(archive.entry("lib/json/Writer.class"), Some(&b"writer"[..]));
    }

    #[test]
    fn unreadable_archive_names_coordinate_and_path() {
        let tmp = TempDir::new().unwrap();
        let src = source(tmp.path(), "broken:jar", "broken.jar");
        std::fs::write(&src.path, b"definitely not a zip").unwrap();

        let err = read_archive(&src).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("broken:jar"));
        assert!(msg.contains("broken.jar"));
    }

    #[test]
    fn parallel_read_keeps_declared_order() {
        let tmp = TempDir::new().unwrap();
        let sources: Vec<_> = (0..5)
            .map(|i| {
                let src = source(tmp.path(), &format!("g:a{i}"), &format!("a{i}.jar"));
                let name = format!("a{i}/Marker.class");
                write_jar(&src.path, &[(name.as_str(), b"m")]);
                src
            })
            .collect();

        let archives = read_archives(&sources, 3).unwrap();
        let order: Vec<_> = archives.iter().map(|a| a.coordinate().key()).collect();
        assert_eq!(order, vec!["g:a0", "g:a1", "g:a2", "g:a3", "g:a4"]);
    }

    #[test]
    fn parallel_read_reports_first_failure() {
        let tmp = TempDir::new().unwrap();
        let good = source(tmp.path(), "g:good", "good.jar");
        write_jar(&good.path, &[("x.class", b"x")]);
        let missing = source(tmp.path(), "g:missing", "missing.jar");

        let err = read_archives(&[good, missing], 2).unwrap_err();
        assert!(err.to_string().contains("missing.jar"));
    }

    #[test]
    fn first_occurrence_wins_inside_one_archive() {
        let archive = DependencyArchive::new(
            Coordinate::new("g", "a"),
            [
                ArchiveEntry {
                    path: "data.edn".into(),
                    content: b"first".to_vec(),
                },
                ArchiveEntry {
                    path: "data.edn".into(),
                    content: b"second".to_vec(),
                },
            ],
        );
        assert_eq!(archive.len(), 1);
        assert_eq!(archive.entry("data.edn"), Some(&b"first"[..]));
    }

    #[test]
    fn entries_larger_than_preallocation_read_fully() {
        let tmp = TempDir::new().unwrap();
        let src = source(tmp.path(), "g:big", "big.jar");
        let big = vec![7u8; (MAX_PREALLOC as usize) * 2 + 10];
        write_jar(&src.path, &[("data/blob.bin", big.as_slice())]);

        let archive = read_archive(&src).unwrap();
        assert_eq!(archive.entry("data/blob.bin").map(<[u8]>::len), Some(big.len()));
    }

    #[test]
    fn dropped_entry_rules() {
        assert!(is_dropped_entry("META-INF/MANIFEST.MF"));
        assert!(is_dropped_entry("meta-inf/manifest.mf"));
        assert!(is_dropped_entry("META-INF/BC.DSA"));
        assert!(is_dropped_entry("META-INF/SIG-FOO"));
        assert!(!is_dropped_entry("META-INF/services/java.sql.Driver"));
        assert!(!is_dropped_entry("app/MANIFEST.MF"));
    }
}
