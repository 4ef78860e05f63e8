//! Fatal errors raised while assembling an uberjar.
//!
//! Every variant names the offending path or coordinate so a failed build can
//! be diagnosed from the message alone. Recoverable conditions (stale graph
//! entries, malformed `:gen-class` directives) never reach this type; they are
//! logged and skipped where they occur.

use std::path::PathBuf;
use thiserror::Error;

use crate::coordinate::Coordinate;

/// Result alias for engine operations.
pub type PackageResult<T> = Result<T, PackageError>;

#[derive(Error, Debug)]
pub enum PackageError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot read dependency archive {path} for {coordinate}: {source}")]
    UnreadableArchive {
        coordinate: Coordinate,
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("cannot read entry '{entry}' of dependency archive for {coordinate}: {source}")]
    ArchiveEntry {
        coordinate: Coordinate,
        entry: String,
        #[source]
        source: std::io::Error,
    },

    /// Internal-consistency violation: a path was classified twice.
    #[error("path '{path}' was assigned more than one disposition")]
    DuplicateDisposition { path: String },

    /// A disposition points at content that the inputs do not hold.
    #[error("no content for '{path}' in {origin}")]
    MissingContent { path: String, origin: String },

    #[error("failed writing archive {path}: {source}")]
    ArchiveWrite {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("invalid dependency coordinate '{value}' (expected group:artifact[:version])")]
    InvalidCoordinate { value: String },

    #[error("entry namespace '{namespace}' is not defined by any first-party source")]
    MainClassUnresolved { namespace: String },
}

impl PackageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PackageError::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_input() {
        let err = PackageError::DuplicateDisposition {
            path: "app/core__init.class".to_string(),
        };
        assert!(err.to_string().contains("app/core__init.class"));

        let err = PackageError::InvalidCoordinate {
            value: "no-colon".to_string(),
        };
        assert!(err.to_string().contains("no-colon"));
    }
}
