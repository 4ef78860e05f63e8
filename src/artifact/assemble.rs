//! Deterministic uberjar writer.
//!
//! Entry order is fixed: manifest, then kept compiled paths, then kept archive
//! paths, then plain resources, each group sorted by path. Every entry gets the
//! same timestamp and permissions, so identical inputs give identical bytes.
//!
//! The archive is written to a temporary file beside the output and renamed
//! into place only once complete.

use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashSet};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::compiled::CompiledArtifacts;
use super::dependency::DependencyArchive;
use super::manifest::{Manifest, MANIFEST_PATH};
use crate::coordinate::Coordinate;
use crate::error::{PackageError, PackageResult};
use crate::origin::DispositionMap;

/// A plain file copied verbatim into the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub archive_path: String,
    pub source: PathBuf,
}

/// Everything the writer needs; nothing is read from elsewhere.
#[derive(Debug, Clone, Copy)]
pub struct AssemblyInputs<'a> {
    pub dispositions: &'a DispositionMap,
    pub compiled: &'a CompiledArtifacts,
    pub archives: &'a [DependencyArchive],
    pub manifest: &'a Manifest,
    pub resources: &'a [Resource],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyOutcome {
    pub entries_written: usize,
    pub resources_skipped: usize,
    pub sha256: String,
    pub size_bytes: u64,
}

/// Write the uberjar to `output`.
///
/// On error nothing is left at `output` and the temporary file is removed.
pub fn assemble(inputs: &AssemblyInputs<'_>, output: &Path) -> PackageResult<AssemblyOutcome> {
    let parent = output
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).map_err(|e| PackageError::io(parent, e))?;

    let file_name = output
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "uberjar.jar".to_string());
    let tmp = parent.join(tmp_name(&format!(".{file_name}.tmp")));

    let written = match write_archive(inputs, &tmp, output) {
        Ok(counts) => counts,
        Err(err) => {
            let _ = fs::remove_file(&tmp);
            return Err(err);
        }
    };

    if let Err(err) = atomic_rename(&tmp, output) {
        let _ = fs::remove_file(&tmp);
        return Err(err);
    }

    let (sha256, size_bytes) = sha256_file(output)?;
    Ok(AssemblyOutcome {
        entries_written: written.entries,
        resources_skipped: written.resources_skipped,
        sha256,
        size_bytes,
    })
}

struct WriteCounts {
    entries: usize,
    resources_skipped: usize,
}

fn write_archive(
    inputs: &AssemblyInputs<'_>,
    tmp: &Path,
    output: &Path,
) -> PackageResult<WriteCounts> {
    let file = File::create(tmp).map_err(|e| PackageError::io(tmp, e))?;
    let mut writer = EntryWriter {
        zip: ZipWriter::new(BufWriter::new(file)),
        written: HashSet::new(),
        tmp,
        output,
    };

    writer.add(MANIFEST_PATH, &inputs.manifest.render())?;

    for path in inputs.dispositions.kept_from_compiled() {
        if writer.contains(path) {
            continue;
        }
        let content = inputs
            .compiled
            .get(path)
            .ok_or_else(|| PackageError::MissingContent {
                path: path.to_string(),
                origin: "compiled output".to_string(),
            })?;
        writer.add(path, content)?;
    }

    let mut by_coordinate: BTreeMap<&Coordinate, &DependencyArchive> = BTreeMap::new();
    for archive in inputs.archives {
        by_coordinate.entry(archive.coordinate()).or_insert(archive);
    }
    for (path, coordinate) in inputs.dispositions.kept_from_archive() {
        if writer.contains(path) {
            continue;
        }
        let content = by_coordinate
            .get(coordinate)
            .and_then(|archive| archive.entry(path))
            .ok_or_else(|| PackageError::MissingContent {
                path: path.to_string(),
                origin: format!("archive {coordinate}"),
            })?;
        writer.add(path, content)?;
    }

    let mut resources: Vec<&Resource> = inputs.resources.iter().collect();
    resources.sort_by(|a, b| a.archive_path.cmp(&b.archive_path));
    let mut resources_skipped = 0usize;
    for resource in resources {
        if writer.contains(&resource.archive_path) {
            tracing::debug!(
                path = %resource.archive_path,
                source = %resource.source.display(),
                "resource shadowed by an existing entry; skipping"
            );
            resources_skipped += 1;
            continue;
        }
        let content =
            fs::read(&resource.source).map_err(|e| PackageError::io(&resource.source, e))?;
        writer.add(&resource.archive_path, &content)?;
    }

    let entries = writer.finish()?;
    Ok(WriteCounts {
        entries,
        resources_skipped,
    })
}

struct EntryWriter<'a> {
    zip: ZipWriter<BufWriter<File>>,
    written: HashSet<String>,
    tmp: &'a Path,
    output: &'a Path,
}

impl EntryWriter<'_> {
    fn options() -> SimpleFileOptions {
        SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(zip::DateTime::default())
            .unix_permissions(0o644)
    }

    fn contains(&self, path: &str) -> bool {
        self.written.contains(path)
    }

    fn add(&mut self, path: &str, content: &[u8]) -> PackageResult<()> {
        self.zip
            .start_file(path, Self::options())
            .map_err(|source| PackageError::ArchiveWrite {
                path: self.output.to_path_buf(),
                source,
            })?;
        self.zip
            .write_all(content)
            .map_err(|e| PackageError::io(self.tmp, e))?;
        self.written.insert(path.to_string());
        Ok(())
    }

    fn finish(self) -> PackageResult<usize> {
        let count = self.written.len();
        let mut buffered = self
            .zip
            .finish()
            .map_err(|source| PackageError::ArchiveWrite {
                path: self.output.to_path_buf(),
                source,
            })?;
        buffered.flush().map_err(|e| PackageError::io(self.tmp, e))?;
        let file = buffered
            .into_inner()
            .map_err(|e| PackageError::io(self.tmp, e.into_error()))?;
        file.sync_all().map_err(|e| PackageError::io(self.tmp, e))?;
        Ok(count)
    }
}

fn tmp_name(prefix: &str) -> String {
    let n = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    format!("{prefix}-{n}")
}

fn atomic_rename(src: &Path, dst: &Path) -> PackageResult<()> {
    // Same directory, so a plain rename replaces the target atomically.
    fs::rename(src, dst).map_err(|e| PackageError::io(dst, e))
}

/// Streaming sha256 of a file, with its size.
pub fn sha256_file(path: &Path) -> PackageResult<(String, u64)> {
    let f = File::open(path).map_err(|e| PackageError::io(path, e))?;
    let mut r = BufReader::new(f);
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    let mut size = 0u64;
    loop {
        let n = r.read(&mut buf).map_err(|e| PackageError::io(path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        size += n as u64;
    }
    Ok((format!("{:x}", hasher.finalize()), size))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::dependency::ArchiveEntry;
    use crate::origin::Disposition;
    use tempfile::TempDir;

    fn read_entries(path: &Path) -> Vec<(String, Vec<u8>)> {
        let mut zip = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
        (0..zip.len())
            .map(|i| {
                let mut f = zip.by_index(i).unwrap();
                let mut content = Vec::new();
                f.read_to_end(&mut content).unwrap();
                (f.name().to_string(), content)
            })
            .collect()
    }

    struct Fixture {
        dispositions: DispositionMap,
        compiled: CompiledArtifacts,
        archives: Vec<DependencyArchive>,
        manifest: Manifest,
        resources: Vec<Resource>,
    }

    impl Fixture {
        fn new(resource_dir: &Path) -> Self {
            let json = Coordinate::new("lib", "json");
            let mut dispositions = DispositionMap::default();
            dispositions
                .insert("app/core__init.class".into(), Disposition::KeepFromCompiled)
                .unwrap();
            dispositions
                .insert(
                    "lib/json/Writer.class".into(),
                    Disposition::KeepFromArchive(json.clone()),
                )
                .unwrap();
            dispositions
                .insert("javax/servlet/Servlet.class".into(), Disposition::Excluded)
                .unwrap();

            let compiled: CompiledArtifacts = [
                ("app/core__init.class".to_string(), b"app".to_vec()),
                ("lib/json/Writer.class".to_string(), b"recompiled".to_vec()),
                ("javax/servlet/Servlet.class".to_string(), b"servlet".to_vec()),
            ]
            .into_iter()
            .collect();

            let archives = vec![DependencyArchive::new(
                json,
                [ArchiveEntry {
                    path: "lib/json/Writer.class".into(),
                    content: b"shipped".to_vec(),
                }],
            )];

            fs::write(resource_dir.join("config.edn"), b"{:port 80}").unwrap();
            fs::write(resource_dir.join("Writer.class"), b"stray").unwrap();
            let resources = vec![
                Resource {
                    archive_path: "config.edn".into(),
                    source: resource_dir.join("config.edn"),
                },
                Resource {
                    archive_path: "lib/json/Writer.class".into(),
                    source: resource_dir.join("Writer.class"),
                },
            ];

            Self {
                dispositions,
                compiled,
                archives,
                manifest: Manifest::new("app.core", "test"),
                resources,
            }
        }

        fn inputs(&self) -> AssemblyInputs<'_> {
            AssemblyInputs {
                dispositions: &self.dispositions,
                compiled: &self.compiled,
                archives: &self.archives,
                manifest: &self.manifest,
                resources: &self.resources,
            }
        }
    }

    #[test]
    fn writes_entries_in_fixed_order_with_chosen_origins() {
        let tmp = TempDir::new().unwrap();
        let fixture = Fixture::new(tmp.path());
        let output = tmp.path().join("dist/app.jar");

        let outcome = assemble(&fixture.inputs(), &output).unwrap();
        assert_eq!(outcome.entries_written, 4);
        assert_eq!(outcome.resources_skipped, 1);

        let entries = read_entries(&output);
        let names: Vec<_> = entries.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "META-INF/MANIFEST.MF",
                "app/core__init.class",
                "lib/json/Writer.class",
                "config.edn"
            ]
        );
        assert_eq!(entries[2].1, b"shipped");
    }

    #[test]
    fn identical_inputs_give_identical_bytes() {
        let tmp = TempDir::new().unwrap();
        let fixture = Fixture::new(tmp.path());
        let first = tmp.path().join("a.jar");
        let second = tmp.path().join("b.jar");

        let a = assemble(&fixture.inputs(), &first).unwrap();
        let b = assemble(&fixture.inputs(), &second).unwrap();
        assert_eq!(a.sha256, b.sha256);
        assert_eq!(fs::read(&first).unwrap(), fs::read(&second).unwrap());
    }

    #[test]
    fn failure_leaves_no_output_or_temp_file() {
        let tmp = TempDir::new().unwrap();
        let mut fixture = Fixture::new(tmp.path());
        fixture.resources.push(Resource {
            archive_path: "missing.txt".into(),
            source: tmp.path().join("does-not-exist.txt"),
        });
        let out_dir = tmp.path().join("out");
        let output = out_dir.join("app.jar");

        let err = assemble(&fixture.inputs(), &output).unwrap_err();
        assert!(err.to_string().contains("does-not-exist.txt"));
        assert!(!output.exists());
        assert_eq!(fs::read_dir(&out_dir).unwrap().count(), 0);
    }

    #[test]
    fn missing_archive_content_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let mut fixture = Fixture::new(tmp.path());
        fixture.archives.clear();

        let err = assemble(&fixture.inputs(), &tmp.path().join("x.jar")).unwrap_err();
        assert!(matches!(err, PackageError::MissingContent { .. }));
        assert!(err.to_string().contains("lib:json"));
    }

    #[test]
    fn failed_rebuild_keeps_previous_output() {
        let tmp = TempDir::new().unwrap();
        let mut fixture = Fixture::new(tmp.path());
        let output = tmp.path().join("app.jar");
        assemble(&fixture.inputs(), &output).unwrap();
        let before = fs::read(&output).unwrap();

        fixture.archives.clear();
        assert!(assemble(&fixture.inputs(), &output).is_err());
        assert_eq!(fs::read(&output).unwrap(), before);
    }
}
