//! Bidirectional frontier search over a graph that can only be listed
//! one node at a time.

use crate::error::{Result, SkypathError};
use crate::neighbors::{NeighborSetBuilder, NeighborSource};
use crate::progress::{ProgressReporter, SearchStats};

use super::{reconstruct_path, ActorId, DiscoveredEdges, Direction, Frontier, Path, ReconstructionStrategy};

/// How a frontier search ended.
#[derive(Debug)]
pub enum SearchOutcome {
    /// The frontiers touched; the edges connect source to target.
    Met(DiscoveredEdges),
    /// One frontier ran dry first.
    Exhausted,
}

impl SearchOutcome {
    /// Discovered edges, empty when exhausted.
    pub fn into_edges(self) -> DiscoveredEdges {
        match self {
            SearchOutcome::Met(edges) => edges,
            SearchOutcome::Exhausted => DiscoveredEdges::new(),
        }
    }
}

/// Result of a full path lookup. Failures are reported through `Err`, never here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathOutcome {
    Found(Path),
    NotFound,
}

/// What to search for.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub source: ActorId,
    pub target: ActorId,
    /// Actor the service's viewer flags refer to, if calls are authenticated.
    pub viewer: Option<ActorId>,
    pub strategy: ReconstructionStrategy,
}

impl SearchRequest {
    pub fn new(source: ActorId, target: ActorId) -> Self {
        Self {
            source,
            target,
            viewer: None,
            strategy: ReconstructionStrategy::default(),
        }
    }
}

/// Outcome plus the counters it took to get there.
#[derive(Debug, Clone)]
pub struct PathReport {
    pub outcome: PathOutcome,
    pub stats: SearchStats,
    pub rounds: usize,
}

/// State of one search: both frontiers, the edges seen so far and the
/// request counter. Nothing here outlives the search.
pub struct SearchSession<'a, S> {
    builder: NeighborSetBuilder<'a, S>,
    forward: Frontier,
    backward: Frontier,
    edges: DiscoveredEdges,
    stats: SearchStats,
    rounds: usize,
    viewer: Option<ActorId>,
    reporter: &'a dyn ProgressReporter,
}

impl<'a, S: NeighborSource + Sync> SearchSession<'a, S> {
    pub fn new(
        builder: NeighborSetBuilder<'a, S>,
        source: ActorId,
        target: ActorId,
        reporter: &'a dyn ProgressReporter,
    ) -> Self {
        Self {
            builder,
            forward: Frontier::new(source),
            backward: Frontier::new(target),
            edges: DiscoveredEdges::new(),
            stats: SearchStats::default(),
            rounds: 0,
            viewer: None,
            reporter,
        }
    }

    pub fn with_viewer(mut self, viewer: Option<ActorId>) -> Self {
        self.viewer = viewer;
        self
    }

    pub fn stats(&self) -> SearchStats {
        self.stats
    }

    /// Rounds started so far. Each round expands at most one node per side.
    pub fn rounds(&self) -> usize {
        self.rounds
    }

    /// Alternate one forward and one backward expansion until the frontiers
    /// meet or either side is exhausted.
    ///
    /// # Errors
    ///
    /// Any failed page call aborts the search.
    pub async fn run(&mut self) -> Result<SearchOutcome> {
        while !self.forward.is_exhausted() && !self.backward.is_exhausted() {
            self.rounds += 1;

            if self.expand(Direction::Outgoing).await? || self.expand(Direction::Incoming).await? {
                log::debug!(
                    "frontiers met after {} rounds ({} edges, {} requests)",
                    self.rounds,
                    self.edges.len(),
                    self.stats.requests
                );
                return Ok(SearchOutcome::Met(std::mem::take(&mut self.edges)));
            }
        }

        log::debug!(
            "frontier exhausted after {} rounds (forward visited {}, backward visited {})",
            self.rounds,
            self.forward.visited_count(),
            self.backward.visited_count()
        );
        Ok(SearchOutcome::Exhausted)
    }

    /// Expand the next node of one side. Returns true on meeting.
    async fn expand(&mut self, direction: Direction) -> Result<bool> {
        let (own, other) = match direction {
            Direction::Outgoing => (&mut self.forward, &self.backward),
            Direction::Incoming => (&mut self.backward, &self.forward),
        };
        let Some(current) = own.pop_next() else {
            return Ok(false);
        };

        let neighbors = self
            .builder
            .collect(
                &current,
                direction,
                self.viewer.as_ref(),
                &mut self.stats,
                self.reporter,
            )
            .await?;

        for neighbor in neighbors {
            if !own.visit(&neighbor) {
                continue;
            }

            let inserted = match direction {
                Direction::Outgoing => self.edges.insert(current.clone(), neighbor.clone()),
                Direction::Incoming => self.edges.insert(neighbor.clone(), current.clone()),
            };
            if inserted {
                self.stats.edges = self.edges.len();
                self.reporter.report(self.stats);
            }

            if other.has_visited(&neighbor) {
                return Ok(true);
            }
        }

        Ok(false)
    }
}

/// Find one shortest follow chain from `request.source` to `request.target`.
///
/// Identical endpoints short-circuit to a one-element path without any calls.
///
/// # Errors
///
/// Page call failures propagate unchanged. A meeting whose edges do not
/// connect the endpoints is reported as `SkypathError::Invariant`.
pub async fn find_path<S: NeighborSource + Sync>(
    builder: NeighborSetBuilder<'_, S>,
    request: &SearchRequest,
    reporter: &dyn ProgressReporter,
) -> Result<PathReport> {
    if request.source == request.target {
        return Ok(PathReport {
            outcome: PathOutcome::Found(vec![request.source.clone()]),
            stats: SearchStats::default(),
            rounds: 0,
        });
    }

    log::info!("Searching for a path from {} to {}", request.source, request.target);

    let mut session = SearchSession::new(
        builder,
        request.source.clone(),
        request.target.clone(),
        reporter,
    )
    .with_viewer(request.viewer.clone());

    let outcome = session.run().await?;
    let stats = session.stats();
    let rounds = session.rounds();

    let outcome = match outcome {
        SearchOutcome::Exhausted => {
            log::info!("No path found ({} requests)", stats.requests);
            PathOutcome::NotFound
        }
        SearchOutcome::Met(edges) => {
            match reconstruct_path(&edges, &request.source, &request.target, request.strategy) {
                Some(path) => {
                    log::info!(
                        "Found path of {} hops ({} edges, {} requests)",
                        path.len() - 1,
                        stats.edges,
                        stats.requests
                    );
                    PathOutcome::Found(path)
                }
                None => {
                    log::error!(
                        "Frontiers met but {} edges do not connect {} to {}",
                        edges.len(),
                        request.source,
                        request.target
                    );
                    return Err(SkypathError::Invariant(format!(
                        "no path from {} to {} in discovered edges after meeting",
                        request.source, request.target
                    )));
                }
            }
        }
    };

    Ok(PathReport {
        outcome,
        stats,
        rounds,
    })
}
