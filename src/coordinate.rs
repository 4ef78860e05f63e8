//! Dependency coordinates.
//!
//! A coordinate is identified by `group:artifact` only. The version is kept for
//! display but ignored by equality, ordering and hashing, so two versions of
//! the same library are the same coordinate for exclusion purposes.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::error::PackageError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Coordinate {
    group: String,
    artifact: String,
    version: Option<String>,
}

impl Coordinate {
    pub fn new(group: impl Into<String>, artifact: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            artifact: artifact.into(),
            version: None,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn artifact(&self) -> &str {
        &self.artifact
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// The version-free form, `group:artifact`.
    pub fn key(&self) -> String {
        format!("{}:{}", self.group, self.artifact)
    }
}

impl FromStr for Coordinate {
    type Err = PackageError;

    /// Parses `group:artifact` or `group:artifact:version`. Extra segments
    /// after the version (packaging, classifier) are ignored.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || PackageError::InvalidCoordinate {
            value: value.to_string(),
        };
        let mut parts = value.trim().split(':');
        let group = parts.next().filter(|s| !s.is_empty()).ok_or_else(invalid)?;
        let artifact = parts.next().filter(|s| !s.is_empty()).ok_or_else(invalid)?;
        let coordinate = Coordinate::new(group, artifact);
        Ok(match parts.next().filter(|s| !s.is_empty()) {
            Some(version) => coordinate.with_version(version),
            None => coordinate,
        })
    }
}

impl TryFrom<String> for Coordinate {
    type Error = PackageError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Coordinate> for String {
    fn from(value: Coordinate) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{}:{}:{}", self.group, self.artifact, version),
            None => write!(f, "{}:{}", self.group, self.artifact),
        }
    }
}

impl PartialEq for Coordinate {
    fn eq(&self, other: &Self) -> bool {
        self.group == other.group && self.artifact == other.artifact
    }
}

impl Eq for Coordinate {}

impl Hash for Coordinate {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.group.hash(state);
        self.artifact.hash(state);
    }
}

impl PartialOrd for Coordinate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Coordinate {
    fn cmp(&self, other: &Self) -> Ordering {
        (&self.group, &self.artifact).cmp(&(&other.group, &other.artifact))
    }
}
