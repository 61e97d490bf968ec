use std::collections::{HashSet, VecDeque};

use super::ActorId;

/// One side of a bidirectional search: a FIFO of nodes waiting to be
/// expanded and the set of every node ever enqueued on this side.
#[derive(Debug, Clone)]
pub struct Frontier {
    queue: VecDeque<ActorId>,
    visited: HashSet<ActorId>,
}

impl Frontier {
    /// A frontier seeded with its endpoint, which counts as visited.
    pub fn new(endpoint: ActorId) -> Self {
        let mut visited = HashSet::new();
        visited.insert(endpoint.clone());
        let mut queue = VecDeque::new();
        queue.push_back(endpoint);
        Self { queue, visited }
    }

    /// Earliest-enqueued node still waiting, if any.
    pub fn pop_next(&mut self) -> Option<ActorId> {
        self.queue.pop_front()
    }

    /// Marks `node` visited and enqueues it. Returns false if it was already visited.
    pub fn visit(&mut self, node: &ActorId) -> bool {
        if self.visited.contains(node) {
            return false;
        }
        self.visited.insert(node.clone());
        self.queue.push_back(node.clone());
        true
    }

    pub fn has_visited(&self, node: &ActorId) -> bool {
        self.visited.contains(node)
    }

    pub fn is_exhausted(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }
}
