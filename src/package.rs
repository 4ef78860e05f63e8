//! One package build, end to end.
//!
//! ```text
//! source roots ──> FirstPartySet ─┐
//! provided + graph ──> excluded ──┤
//! classes dir ──> compiled ───────┼──> classify ──> assemble ──> report
//! archives ──> ArchiveIndex ──────┘
//! ```

use serde::Serialize;
use std::path::PathBuf;

use crate::artifact::assemble::{assemble, AssemblyInputs};
use crate::artifact::compiled::CompiledArtifacts;
use crate::artifact::dependency::{read_archives, DependencyArchive};
use crate::artifact::manifest::Manifest;
use crate::config::PackageConfig;
use crate::error::{PackageError, PackageResult};
use crate::exclusion::{resolve_excluded, ExcludedCoordinateSet};
use crate::namespace::munge::class_to_path;
use crate::namespace::{discover_source_units, FirstPartySet};
use crate::origin::{classify, ArchiveIndex, DispositionMap};

/// Outcome of a successful build, printable as JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssemblyReport {
    pub output: PathBuf,
    pub sha256: String,
    pub size_bytes: u64,
    pub main_class: String,
    pub entries_written: usize,
    pub kept_from_compiled: usize,
    pub kept_from_archive: usize,
    /// Artifacts dropped because only excluded coordinates provide them.
    pub excluded: usize,
    pub excluded_coordinates: usize,
    pub resources_skipped: usize,
}

/// Everything decided before any byte is written.
#[derive(Debug)]
pub struct PackagePlan {
    pub first_party: FirstPartySet,
    pub main_class: String,
    pub excluded: ExcludedCoordinateSet,
    pub compiled: CompiledArtifacts,
    pub archives: Vec<DependencyArchive>,
    pub dispositions: DispositionMap,
}

/// The provided coordinates and everything they transitively require.
pub fn excluded_coordinates(config: &PackageConfig) -> ExcludedCoordinateSet {
    resolve_excluded(&config.provided, &config.graph)
}

/// Load all inputs and classify every path, without writing the archive.
pub fn plan(config: &PackageConfig) -> PackageResult<PackagePlan> {
    let units = discover_source_units(&config.source_roots)?;
    let first_party = FirstPartySet::from_units(&units);
    tracing::debug!(
        units = units.len(),
        prefixes = first_party.len(),
        "discovered first-party namespaces"
    );

    let entry = units
        .iter()
        .find(|unit| unit.namespace == config.main_namespace)
        .ok_or_else(|| PackageError::MainClassUnresolved {
            namespace: config.main_namespace.clone(),
        })?;
    let main_class = entry.main_class();

    let excluded = excluded_coordinates(config);
    let compiled = CompiledArtifacts::load(&config.classes_dir)?;

    let main_class_path = format!("{}.class", class_to_path(&main_class));
    if !entry.gen_class {
        tracing::warn!(
            namespace = %entry.namespace,
            main_class = %main_class,
            "entry namespace has no :gen-class; the Main-Class attribute will not be launchable"
        );
    } else if !compiled.contains(&main_class_path) {
        tracing::warn!(
            main_class = %main_class,
            path = %main_class_path,
            "main class not found in compile output; was the entry namespace AOT-compiled?"
        );
    }

    let archives = read_archives(&config.archives, config.jobs)?;
    let index = ArchiveIndex::from_archives(&archives);
    let dispositions = classify(&first_party, &compiled, &index, &excluded)?;

    Ok(PackagePlan {
        first_party,
        main_class,
        excluded,
        compiled,
        archives,
        dispositions,
    })
}

/// Build the uberjar described by `config`.
pub fn build_package(config: &PackageConfig) -> PackageResult<AssemblyReport> {
    let plan = plan(config)?;
    let manifest = Manifest::new(plan.main_class.clone(), config.created_by.clone());

    let inputs = AssemblyInputs {
        dispositions: &plan.dispositions,
        compiled: &plan.compiled,
        archives: &plan.archives,
        manifest: &manifest,
        resources: &config.resources,
    };
    let outcome = assemble(&inputs, &config.output)?;

    let counts = plan.dispositions.counts();
    let report = AssemblyReport {
        output: config.output.clone(),
        sha256: outcome.sha256,
        size_bytes: outcome.size_bytes,
        main_class: plan.main_class,
        entries_written: outcome.entries_written,
        kept_from_compiled: counts.kept_from_compiled,
        kept_from_archive: counts.kept_from_archive,
        excluded: counts.excluded,
        excluded_coordinates: plan.excluded.len(),
        resources_skipped: outcome.resources_skipped,
    };

    tracing::info!(
        output = %report.output.display(),
        excluded = report.excluded,
        excluded_coordinates = report.excluded_coordinates,
        kept_from_compiled = report.kept_from_compiled,
        kept_from_archive = report.kept_from_archive,
        entries_written = report.entries_written,
        resources_skipped = report.resources_skipped,
        sha256 = %report.sha256,
        "excluded {} artifacts from uberjar",
        report.excluded
    );

    Ok(report)
}
