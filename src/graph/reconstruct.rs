//! Shortest-path reconstruction over a discovered edge set.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};

use serde::Deserialize;

use super::{ActorId, DiscoveredEdges, Path};

/// How to walk the discovered edges. Both give a shortest path under unit
/// weights; with several shortest paths they may pick different ones.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ReconstructionStrategy {
    #[default]
    BreadthFirst,
    UniformCost,
}

/// Shortest simple path from `source` to `target` using only `edges`.
///
/// Returns `None` when `target` is unreachable or the predecessor chain does
/// not lead back to `source`. `source == target` yields
/// the one-element path.
pub fn reconstruct_path(
    edges: &DiscoveredEdges,
    source: &ActorId,
    target: &ActorId,
    strategy: ReconstructionStrategy,
) -> Option<Path> {
    if source == target {
        return Some(vec![source.clone()]);
    }

    let predecessors = match strategy {
        ReconstructionStrategy::BreadthFirst => breadth_first(edges, source, target),
        ReconstructionStrategy::UniformCost => uniform_cost(edges, source, target),
    }?;

    walk_back(&predecessors, source, target)
}

fn breadth_first<'a>(
    edges: &'a DiscoveredEdges,
    source: &'a ActorId,
    target: &ActorId,
) -> Option<HashMap<&'a ActorId, &'a ActorId>> {
    let mut visited: HashSet<&ActorId> = HashSet::new();
    let mut predecessors = HashMap::new();
    let mut queue = VecDeque::new();

    visited.insert(source);
    queue.push_back(source);

    while let Some(node) = queue.pop_front() {
        for next in edges.successors(node) {
            if !visited.insert(next) {
                continue;
            }
            predecessors.insert(next, node);
            if next == target {
                return Some(predecessors);
            }
            queue.push_back(next);
        }
    }

    None
}

fn uniform_cost<'a>(
    edges: &'a DiscoveredEdges,
    source: &'a ActorId,
    target: &ActorId,
) -> Option<HashMap<&'a ActorId, &'a ActorId>> {
    let mut best: HashMap<&ActorId, u32> = HashMap::new();
    let mut settled: HashSet<&ActorId> = HashSet::new();
    let mut predecessors = HashMap::new();
    // (cost, insertion sequence, node); the sequence keeps equal-cost pops FIFO
    let mut heap = BinaryHeap::new();
    let mut sequence: u64 = 0;

    best.insert(source, 0);
    heap.push(Reverse((0u32, sequence, source)));

    while let Some(Reverse((cost, _, node))) = heap.pop() {
        if !settled.insert(node) {
            continue;
        }
        if node == target {
            return Some(predecessors);
        }
        for next in edges.successors(node) {
            if settled.contains(next) {
                continue;
            }
            let candidate = cost + 1;
            if best.get(next).map_or(true, |&known| candidate < known) {
                best.insert(next, candidate);
                predecessors.insert(next, node);
                sequence += 1;
                heap.push(Reverse((candidate, sequence, next)));
            }
        }
    }

    None
}

fn walk_back(
    predecessors: &HashMap<&ActorId, &ActorId>,
    source: &ActorId,
    target: &ActorId,
) -> Option<Path> {
    let mut path = vec![target.clone()];
    let mut current: &ActorId = target;
    while current != source {
        let prev: &ActorId = predecessors.get(current)?;
        if path.len() > predecessors.len() {
            return None;
        }
        path.push(prev.clone());
        current = prev;
    }
    path.reverse();
    Some(path)
}
