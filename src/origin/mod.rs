//! Artifact origin classification.
//!
//! AOT-compiling the entry namespace recompiles every namespace it requires,
//! including third-party ones that already ship as classes in their own
//! archives. A recompiled class is a different runtime type from the shipped
//! one, and protocol dispatch breaks when both meet. So for every path this
//! module picks exactly one physical copy:
//!
//! 1. first-party: the compiled copy, even when an archive also ships it.
//!    If the compile output lacks it, assembly fails instead of using an archive
//! 2. in a non-excluded archive: that archive's copy (first in declared order)
//! 3. compiled and in no archive at all (macro-generated classes): the
//!    compiled copy
//! 4. only in excluded archives: dropped
//! 5. compiled but otherwise only in excluded archives: dropped
//!
//! [`classify`] is a pure function over explicit sets.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::artifact::compiled::CompiledArtifacts;
use crate::artifact::dependency::DependencyArchive;
use crate::coordinate::Coordinate;
use crate::error::{PackageError, PackageResult};
use crate::exclusion::ExcludedCoordinateSet;
use crate::namespace::FirstPartySet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    KeepFromCompiled,
    KeepFromArchive(Coordinate),
    Excluded,
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Disposition::KeepFromCompiled => write!(f, "compiled"),
            Disposition::KeepFromArchive(coordinate) => write!(f, "archive:{}", coordinate.key()),
            Disposition::Excluded => write!(f, "excluded"),
        }
    }
}

/// Archive providers of each path, in declared archive order.
#[derive(Debug, Clone, Default)]
pub struct ArchiveIndex {
    providers: BTreeMap<String, Vec<Coordinate>>,
}

impl ArchiveIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_archives(archives: &[DependencyArchive]) -> Self {
        let mut index = Self::new();
        for archive in archives {
            for path in archive.paths() {
                index.add(archive.coordinate().clone(), path);
            }
        }
        index
    }

    /// Register `coordinate` as a provider of `path`. Call in declared order.
    pub fn add(&mut self, coordinate: Coordinate, path: impl Into<String>) {
        let providers = self.providers.entry(path.into()).or_default();
        if !providers.contains(&coordinate) {
            providers.push(coordinate);
        }
    }

    pub fn providers(&self, path: &str) -> &[Coordinate] {
        self.providers.get(path).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(String::as_str)
    }
}

/// Disposition of every path, keyed and iterated in sorted path order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispositionMap {
    entries: BTreeMap<String, Disposition>,
}

impl DispositionMap {
    /// Record a decision; a second decision for the same path is an
    /// internal-consistency failure.
    pub fn insert(&mut self, path: String, disposition: Disposition) -> PackageResult<()> {
        if self.entries.contains_key(&path) {
            return Err(PackageError::DuplicateDisposition { path });
        }
        self.entries.insert(path, disposition);
        Ok(())
    }

    pub fn get(&self, path: &str) -> Option<&Disposition> {
        self.entries.get(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Disposition)> {
        self.entries.iter().map(|(p, d)| (p.as_str(), d))
    }

    /// Paths kept from the compile output, sorted.
    pub fn kept_from_compiled(&self) -> impl Iterator<Item = &str> {
        self.iter()
            .filter(|(_, d)| matches!(d, Disposition::KeepFromCompiled))
            .map(|(p, _)| p)
    }

    /// Paths kept from dependency archives with their owner, sorted by path.
    pub fn kept_from_archive(&self) -> impl Iterator<Item = (&str, &Coordinate)> {
        self.iter().filter_map(|(p, d)| match d {
            Disposition::KeepFromArchive(coordinate) => Some((p, coordinate)),
            _ => None,
        })
    }

    pub fn excluded(&self) -> impl Iterator<Item = &str> {
        self.iter()
            .filter(|(_, d)| matches!(d, Disposition::Excluded))
            .map(|(p, _)| p)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn counts(&self) -> DispositionCounts {
        let mut counts = DispositionCounts::default();
        for (_, disposition) in self.iter() {
            match disposition {
                Disposition::KeepFromCompiled => counts.kept_from_compiled += 1,
                Disposition::KeepFromArchive(_) => counts.kept_from_archive += 1,
                Disposition::Excluded => counts.excluded += 1,
            }
        }
        counts
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispositionCounts {
    pub kept_from_compiled: usize,
    pub kept_from_archive: usize,
    pub excluded: usize,
}

/// Decide the origin of every path in the compile output and the archives.
pub fn classify(
    first_party: &FirstPartySet,
    compiled: &CompiledArtifacts,
    archives: &ArchiveIndex,
    excluded: &ExcludedCoordinateSet,
) -> PackageResult<DispositionMap> {
    let all_paths: BTreeSet<&str> = compiled.paths().chain(archives.paths()).collect();

    let mut map = DispositionMap::default();
    for path in all_paths {
        let disposition = decide(path, first_party, compiled, archives, excluded);
        map.insert(path.to_string(), disposition)?;
    }
    Ok(map)
}

fn decide(
    path: &str,
    first_party: &FirstPartySet,
    compiled: &CompiledArtifacts,
    archives: &ArchiveIndex,
    excluded: &ExcludedCoordinateSet,
) -> Disposition {
    let in_compiled = compiled.contains(path);
    if first_party.contains(path) {
        if !in_compiled {
            tracing::warn!(
                path,
                providers = ?archives.providers(path).iter().map(Coordinate::key).collect::<Vec<_>>(),
                "first-party path missing from compile output; archive copies are never used"
            );
        }
        return Disposition::KeepFromCompiled;
    }

    let providers = archives.providers(path);
    let mut included = providers.iter().filter(|c| !excluded.contains(c));
    if let Some(winner) = included.next() {
        let shadowed: Vec<_> = included.map(Coordinate::key).collect();
        if !shadowed.is_empty() {
            tracing::debug!(
                path,
                winner = %winner.key(),
                shadowed = ?shadowed,
                "path provided by several archives; first declared wins"
            );
        }
        return Disposition::KeepFromArchive(winner.clone());
    }

    if providers.is_empty() && in_compiled {
        return Disposition::KeepFromCompiled;
    }

    Disposition::Excluded
}
