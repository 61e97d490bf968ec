//! In-memory follow graph standing in for the remote service in tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::client::{normalize_actor_input, Identity, IdentityResolver};
use crate::error::{Result, SkypathError};
use crate::graph::{ActorId, Direction};
use crate::neighbors::{NeighborItem, NeighborPage, NeighborSource, PAGE_SIZE};

#[derive(Default)]
pub(crate) struct StubGraph {
    follows: HashMap<ActorId, Vec<ActorId>>,
    followers: HashMap<ActorId, Vec<ActorId>>,
    viewer_flags: HashMap<(ActorId, Direction), usize>,
    fail_on: Option<usize>,
    calls: AtomicUsize,
    requested: Mutex<Vec<(ActorId, Direction)>>,
}

impl StubGraph {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Graph built from `source follows destination` pairs.
    pub(crate) fn from_edges(edges: &[(&str, &str)]) -> Self {
        let mut graph = Self::new();
        for (source, destination) in edges {
            graph.follow(source, destination);
        }
        graph
    }

    pub(crate) fn follow(&mut self, source: &str, destination: &str) {
        let (s, d) = (ActorId::from(source), ActorId::from(destination));
        self.follows.entry(s.clone()).or_default().push(d.clone());
        self.followers.entry(d).or_default().push(s);
    }

    /// Set the viewer flag on the first page of `actor`'s listing.
    pub(crate) fn flag_viewer(&mut self, actor: &str, direction: Direction) {
        self.flag_viewer_on_page(actor, direction, 0);
    }

    pub(crate) fn flag_viewer_on_page(&mut self, actor: &str, direction: Direction, page: usize) {
        self.viewer_flags.insert((ActorId::from(actor), direction), page);
    }

    /// Make the `n`th page call (1-based) fail.
    pub(crate) fn fail_on_call(&mut self, n: usize) {
        self.fail_on = Some(n);
    }

    /// Page calls served so far.
    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Actor and direction of every page call, in call order.
    pub(crate) fn requested(&self) -> Vec<(ActorId, Direction)> {
        self.requested.lock().unwrap().clone()
    }

    fn page(&self, actor: &ActorId, direction: Direction, cursor: Option<&str>) -> Result<NeighborPage> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.requested.lock().unwrap().push((actor.clone(), direction));
        if self.fail_on == Some(call) {
            return Err(SkypathError::Api {
                status: 502,
                body: "stub failure".to_string(),
            });
        }

        let offset: usize = match cursor {
            Some(c) => c
                .parse()
                .map_err(|_| SkypathError::Parse(format!("bad cursor {}", c)))?,
            None => 0,
        };
        let all = match direction {
            Direction::Outgoing => self.follows.get(actor),
            Direction::Incoming => self.followers.get(actor),
        }
        .map(Vec::as_slice)
        .unwrap_or(&[]);

        let end = (offset + PAGE_SIZE).min(all.len());
        let items: Vec<NeighborItem> = all
            .get(offset..end)
            .unwrap_or(&[])
            .iter()
            .map(|id| NeighborItem {
                id: id.clone(),
                handle: format!("{}.test", id),
            })
            .collect();
        let cursor = (items.len() == PAGE_SIZE).then(|| end.to_string());
        let viewer_related = self
            .viewer_flags
            .get(&(actor.clone(), direction))
            .map(|page| *page == offset / PAGE_SIZE);

        Ok(NeighborPage {
            items,
            cursor,
            viewer_related,
        })
    }
}

impl NeighborSource for StubGraph {
    async fn fetch_page(
        &self,
        actor: &ActorId,
        direction: Direction,
        cursor: Option<&str>,
    ) -> Result<NeighborPage> {
        self.page(actor, direction, cursor)
    }
}

/// `<id>.test` resolves to `<id>` when the actor appears in the graph.
impl IdentityResolver for StubGraph {
    async fn resolve(&self, input: &str) -> Result<Identity> {
        let actor = normalize_actor_input(input)?;
        let id = ActorId::from(actor.strip_suffix(".test").unwrap_or(actor));
        if !self.follows.contains_key(&id) && !self.followers.contains_key(&id) {
            return Err(SkypathError::IdentityNotFound(actor.to_string()));
        }
        Ok(Identity {
            handle: format!("{}.test", id),
            id,
            display_name: None,
        })
    }
}
