//! Transitive expansion of "provided" dependencies.
//!
//! A provided coordinate is needed at compile time but supplied by the
//! runtime environment, so neither it nor anything it requires may end up in
//! the uberjar. The closure is computed over a read-only dependency graph
//! derived from the resolved lockfile (see [`lockfile`]).

pub mod lockfile;

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::coordinate::Coordinate;

/// Directed "requires" graph: an edge `A -> B` means A requires B.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    edges: BTreeMap<Coordinate, BTreeSet<Coordinate>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a coordinate with no outgoing edges (if not already known).
    pub fn add_node(&mut self, node: Coordinate) {
        self.edges.entry(node).or_default();
    }

    /// Add `from -> to`; both ends become known nodes.
    pub fn add_edge(&mut self, from: Coordinate, to: Coordinate) {
        self.edges.entry(to.clone()).or_default();
        self.edges.entry(from).or_default().insert(to);
    }

    /// Fold another graph into this one, unioning edge sets.
    pub fn merge(&mut self, other: DependencyGraph) {
        for (from, targets) in other.edges {
            self.edges.entry(from).or_default().extend(targets);
        }
    }

    pub fn contains(&self, node: &Coordinate) -> bool {
        self.edges.contains_key(node)
    }

    /// Direct requirements of `node`, `None` if the node is unknown.
    pub fn requires(&self, node: &Coordinate) -> Option<&BTreeSet<Coordinate>> {
        self.edges.get(node)
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

impl FromIterator<(Coordinate, Coordinate)> for DependencyGraph {
    fn from_iter<I: IntoIterator<Item = (Coordinate, Coordinate)>>(iter: I) -> Self {
        let mut graph = DependencyGraph::new();
        for (from, to) in iter {
            graph.add_edge(from, to);
        }
        graph
    }
}

/// Coordinates whose archives are left out of the package.
///
/// Closed under the graph's edges: if `X` is excluded and `X -> Y`, then `Y`
/// is excluded too.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExcludedCoordinateSet {
    coordinates: BTreeSet<Coordinate>,
}

impl ExcludedCoordinateSet {
    pub fn contains(&self, coordinate: &Coordinate) -> bool {
        self.coordinates.contains(coordinate)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Coordinate> {
        self.coordinates.iter()
    }

    pub fn len(&self) -> usize {
        self.coordinates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coordinates.is_empty()
    }
}

/// Breadth-first closure of `declared` over `graph`.
///
/// Declared roots are always excluded. A coordinate missing from the graph
/// (stale lockfile) contributes no edges and is logged, not rejected. Each
/// coordinate is visited once, so cycles terminate.
pub fn resolve_excluded<'a, I>(declared: I, graph: &DependencyGraph) -> ExcludedCoordinateSet
where
    I: IntoIterator<Item = &'a Coordinate>,
{
    let mut visited = BTreeSet::new();
    let mut queue = VecDeque::new();

    for root in declared {
        if visited.insert(root.clone()) {
            queue.push_back(root.clone());
        }
    }

    while let Some(current) = queue.pop_front() {
        let Some(requires) = graph.requires(&current) else {
            tracing::warn!(
                coordinate = %current,
                "coordinate not found in dependency graph; skipping its dependencies"
            );
            continue;
        };
        for next in requires {
            if visited.insert(next.clone()) {
                tracing::debug!(from = %current, to = %next, "excluding transitive dependency");
                queue.push_back(next.clone());
            }
        }
    }

    ExcludedCoordinateSet {
        coordinates: visited,
    }
}
