//! Follow-graph discovery: frontiers, discovered edges, bidirectional search
//! and shortest-path reconstruction.
//!
//! The remote graph is never queried for paths directly. A search enumerates
//! neighbor lists one node at a time from both endpoints and stops as soon as
//! the two explored regions touch.

mod edges;
mod frontier;
mod reconstruct;
mod search;

#[cfg(test)]
pub(crate) mod testing;

pub use edges::DiscoveredEdges;
pub use frontier::Frontier;
pub use reconstruct::{reconstruct_path, ReconstructionStrategy};
pub use search::{find_path, PathOutcome, PathReport, SearchOutcome, SearchRequest, SearchSession};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical, stable actor identifier (a DID).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(String);

impl ActorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ActorId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ActorId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Which neighbor list of a node to enumerate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Accounts this node follows.
    Outgoing,
    /// Accounts following this node.
    Incoming,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Outgoing => f.write_str("follows"),
            Direction::Incoming => f.write_str("followers"),
        }
    }
}

/// `source` follows `destination`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DirectedEdge {
    pub source: ActorId,
    pub destination: ActorId,
}

impl DirectedEdge {
    pub fn new(source: ActorId, destination: ActorId) -> Self {
        Self {
            source,
            destination,
        }
    }
}

/// Ordered actors from source to target inclusive.
pub type Path = Vec<ActorId>;
