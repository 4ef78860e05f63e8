//! Package request loading.
//!
//! A package build is described by one TOML file. Relative paths in it are
//! resolved against the file's directory, so the engine itself never looks at
//! the process working directory or environment.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

use crate::artifact::assemble::Resource;
use crate::artifact::dependency::{resolve_source, ArchiveSource};
use crate::coordinate::Coordinate;
use crate::exclusion::lockfile::load_dependency_graph;
use crate::exclusion::DependencyGraph;

const DEFAULT_CREATED_BY: &str = concat!("clj-uberjar ", env!("CARGO_PKG_VERSION"));

/// Fully resolved inputs of one package build.
#[derive(Debug, Clone)]
pub struct PackageConfig {
    pub output: PathBuf,
    pub main_namespace: String,
    pub classes_dir: PathBuf,
    pub source_roots: Vec<PathBuf>,
    pub provided: Vec<Coordinate>,
    /// Declared order; earlier archives win path collisions.
    pub archives: Vec<ArchiveSource>,
    pub resources: Vec<Resource>,
    pub graph: DependencyGraph,
    pub jobs: usize,
    pub created_by: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PackageToml {
    output: PathBuf,
    main_namespace: String,
    classes_dir: PathBuf,
    #[serde(default)]
    source_roots: Vec<PathBuf>,
    #[serde(default)]
    provided: Vec<String>,
    lockfile: Option<PathBuf>,
    jobs: Option<usize>,
    created_by: Option<String>,
    #[serde(default)]
    archives: Vec<ArchiveSource>,
    #[serde(default)]
    resources: Vec<ResourceToml>,
    #[serde(default)]
    graph: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ResourceToml {
    path: PathBuf,
    archive_path: Option<String>,
}

/// Load and resolve a package request file.
pub fn load_package_config(path: &Path) -> Result<PackageConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading package request '{}'", path.display()))?;
    let base = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    parse_package_config(&text, base)
        .with_context(|| format!("parsing package request '{}'", path.display()))
}

/// Parse request text, resolving relative paths against `base`.
pub fn parse_package_config(text: &str, base: &Path) -> Result<PackageConfig> {
    let parsed: PackageToml = toml::from_str(text)?;

    let main_namespace = parsed.main_namespace.trim().to_string();
    if main_namespace.is_empty() {
        bail!("main_namespace must not be empty");
    }

    let jobs = parsed.jobs.unwrap_or(1);
    if jobs == 0 {
        bail!("jobs must be >= 1");
    }

    let provided = parsed
        .provided
        .iter()
        .map(|raw| raw.parse::<Coordinate>())
        .collect::<Result<Vec<_>, _>>()
        .context("invalid provided coordinate")?;

    let mut graph = match &parsed.lockfile {
        Some(lockfile) => load_dependency_graph(&base.join(lockfile))?,
        None => DependencyGraph::new(),
    };
    graph.merge(parse_inline_graph(&parsed.graph)?);

    let mut resources = Vec::new();
    for resource in parsed.resources {
        resources.extend(expand_resource(base, resource)?);
    }

    Ok(PackageConfig {
        output: base.join(parsed.output),
        main_namespace,
        classes_dir: base.join(parsed.classes_dir),
        source_roots: parsed
            .source_roots
            .into_iter()
            .map(|root| base.join(root))
            .collect(),
        provided,
        archives: parsed
            .archives
            .into_iter()
            .map(|source| resolve_source(base, source))
            .collect(),
        resources,
        graph,
        jobs,
        created_by: parsed
            .created_by
            .unwrap_or_else(|| DEFAULT_CREATED_BY.to_string()),
    })
}

fn parse_inline_graph(raw: &BTreeMap<String, Vec<String>>) -> Result<DependencyGraph> {
    let mut graph = DependencyGraph::new();
    for (from, targets) in raw {
        let from: Coordinate = from
            .parse()
            .with_context(|| format!("invalid [graph] key '{from}'"))?;
        graph.add_node(from.clone());
        for to in targets {
            let to: Coordinate = to
                .parse()
                .with_context(|| format!("invalid [graph] dependency of '{from}'"))?;
            graph.add_edge(from.clone(), to);
        }
    }
    Ok(graph)
}

/// A file becomes one resource; a directory becomes one resource per file
/// beneath it, in sorted order.
fn expand_resource(base: &Path, resource: ResourceToml) -> Result<Vec<Resource>> {
    let source = base.join(&resource.path);
    let prefix = match &resource.archive_path {
        Some(raw) => parse_relative_path(raw, "archive_path")?,
        None => PathBuf::new(),
    };

    if source.is_file() {
        let archive_path = if resource.archive_path.is_some() {
            prefix
        } else {
            PathBuf::from(source.file_name().with_context(|| {
                format!("resource '{}' has no file name", source.display())
            })?)
        };
        return Ok(vec![Resource {
            archive_path: to_archive_path(&archive_path),
            source,
        }]);
    }

    if !source.is_dir() {
        bail!("resource path '{}' does not exist", source.display());
    }

    let mut out = Vec::new();
    for entry in WalkDir::new(&source).sort_by_file_name() {
        let entry = entry
            .with_context(|| format!("walking resource directory '{}'", source.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry.path().strip_prefix(&source).unwrap_or(entry.path());
        out.push(Resource {
            archive_path: to_archive_path(&prefix.join(rel)),
            source: entry.path().to_path_buf(),
        });
    }
    Ok(out)
}

fn to_archive_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

fn parse_relative_path(raw: &str, field: &str) -> Result<PathBuf> {
    let candidate = Path::new(raw);
    if candidate.is_absolute() {
        bail!("{field} must be relative, got absolute path '{}'", raw);
    }
    for component in candidate.components() {
        if matches!(
            component,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        ) {
            bail!(
                "{field} contains invalid traversal/root component in '{}'",
                raw
            );
        }
    }
    Ok(candidate.to_path_buf())
}
