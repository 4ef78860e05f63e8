use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use super::DependencyGraph;
use crate::coordinate::Coordinate;

#[derive(Debug, Deserialize)]
struct LockfileJson {
    entries: Vec<LockEntry>,
}

/// One resolved artifact. Extra fields (file name, digest) are ignored.
#[derive(Debug, Deserialize)]
struct LockEntry {
    coord: LockCoord,
    #[serde(default)]
    direct_dependencies: Vec<LockCoord>,
    #[serde(default)]
    dependencies: Vec<LockCoord>,
}

#[derive(Debug, Deserialize)]
struct LockCoord {
    group: String,
    artifact: String,
    #[serde(default)]
    version: Option<String>,
}

impl From<LockCoord> for Coordinate {
    fn from(value: LockCoord) -> Self {
        let coordinate = Coordinate::new(value.group, value.artifact);
        match value.version {
            Some(version) => coordinate.with_version(version),
            None => coordinate,
        }
    }
}

/// Build the dependency graph from a resolved lockfile.
///
/// Edges are the union of each entry's direct and transitive dependencies.
pub fn load_dependency_graph(path: &Path) -> Result<DependencyGraph> {
    let bytes =
        fs::read(path).with_context(|| format!("reading lockfile '{}'", path.display()))?;
    parse_dependency_graph(&bytes)
        .with_context(|| format!("parsing lockfile '{}'", path.display()))
}

pub fn parse_dependency_graph(bytes: &[u8]) -> Result<DependencyGraph> {
    let parsed: LockfileJson = serde_json::from_slice(bytes)?;
    let mut graph = DependencyGraph::new();
    for entry in parsed.entries {
        let from = Coordinate::from(entry.coord);
        graph.add_node(from.clone());
        for dep in entry
            .direct_dependencies
            .into_iter()
            .chain(entry.dependencies)
        {
            graph.add_edge(from.clone(), dep.into());
        }
    }
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const LOCK: &str = r#"{
      "entries": [
        {
          "coord": {"group": "javax.servlet", "artifact": "servlet-api", "version": "2.5"},
          "file_name": "javax.servlet_servlet-api_2.5.jar",
          "direct_dependencies": [{"group": "commons-logging", "artifact": "commons-logging", "version": "1.2"}],
          "dependencies": [{"group": "commons-logging", "artifact": "commons-logging", "version": "1.2"}]
        },
        {
          "coord": {"group": "commons-logging", "artifact": "commons-logging", "version": "1.2"}
        }
      ]
    }"#;

    #[test]
    fn entries_become_edges() {
        let graph = parse_dependency_graph(LOCK.as_bytes()).unwrap();
        let servlet = Coordinate::new("javax.servlet", "servlet-api");
        let logging = Coordinate::new("commons-logging", "commons-logging");
        assert_eq!(graph.len(), 2);
        assert!(graph.requires(&servlet).unwrap().contains(&logging));
        assert!(graph.requires(&logging).unwrap().is_empty());
    }

    #[test]
    fn malformed_lockfile_is_reported_with_path() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bad.lock.json");
        fs::write(&path, "{\"entries\": 3}").unwrap();
        let err = load_dependency_graph(&path).unwrap_err();
        assert!(format!("{err:#}").contains("bad.lock.json"));
    }
}
