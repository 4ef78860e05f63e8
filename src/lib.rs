//! Uberjar assembly for AOT-compiled Clojure applications.
//!
//! Compiling the entry namespace ahead of time also recompiles every
//! third-party namespace it requires. Shipping both the recompiled classes and
//! the library's own classes puts two copies of the same type on the class
//! path, which breaks protocol dispatch at runtime. This crate decides, for
//! every path, which single copy goes into the final archive, and writes that
//! archive deterministically.
//!
//! # Pipeline
//!
//! ```text
//! config (request.toml)
//!     │
//!     ├── namespace  -> FirstPartySet, main class
//!     ├── exclusion  -> ExcludedCoordinateSet (provided + transitive)
//!     ├── artifact   -> CompiledArtifacts, DependencyArchive[]
//!     ├── origin     -> DispositionMap (one decision per path)
//!     └── artifact::assemble -> uberjar + sha256
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use clj_uberjar::{build_package, load_package_config};
//!
//! let config = load_package_config("request.toml".as_ref())?;
//! let report = build_package(&config)?;
//! println!("{} ({})", report.output.display(), report.sha256);
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod artifact;
pub mod config;
pub mod coordinate;
pub mod error;
pub mod exclusion;
pub mod logging;
pub mod namespace;
pub mod origin;
pub mod package;

pub use config::{load_package_config, PackageConfig};
pub use coordinate::Coordinate;
pub use error::{PackageError, PackageResult};
pub use exclusion::{resolve_excluded, DependencyGraph, ExcludedCoordinateSet};
pub use namespace::{FirstPartySet, SourceUnit};
pub use origin::{classify, Disposition, DispositionMap};
pub use package::{build_package, excluded_coordinates, plan, AssemblyReport};
