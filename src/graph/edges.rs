//! Edge set collected during one search.

use std::collections::{HashMap, HashSet};

use super::{ActorId, DirectedEdge};

/// Directed edges observed while expanding both frontiers.
///
/// Stored as an adjacency map so reconstruction can look up a node's
/// successors directly. Destinations keep their discovery order, which is
/// what breaks ties between equally short paths.
#[derive(Debug, Default, Clone)]
pub struct DiscoveredEdges {
    adjacency: HashMap<ActorId, Vec<ActorId>>,
    seen: HashSet<DirectedEdge>,
}

impl DiscoveredEdges {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `source -> destination`. Returns false if the edge was already present.
    pub fn insert(&mut self, source: ActorId, destination: ActorId) -> bool {
        let edge = DirectedEdge::new(source, destination);
        if self.seen.contains(&edge) {
            return false;
        }
        self.adjacency
            .entry(edge.source.clone())
            .or_default()
            .push(edge.destination.clone());
        self.seen.insert(edge);
        true
    }

    pub fn contains(&self, source: &ActorId, destination: &ActorId) -> bool {
        self.seen
            .contains(&DirectedEdge::new(source.clone(), destination.clone()))
    }

    /// Successors of `node` in discovery order.
    pub fn successors(&self, node: &ActorId) -> &[ActorId] {
        self.adjacency
            .get(node)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DirectedEdge> {
        self.seen.iter()
    }
}

impl FromIterator<(ActorId, ActorId)> for DiscoveredEdges {
    fn from_iter<I: IntoIterator<Item = (ActorId, ActorId)>>(iter: I) -> Self {
        let mut edges = Self::new();
        for (source, destination) in iter {
            edges.insert(source, destination);
        }
        edges
    }
}
