//! Paginated neighbor listing.
//!
//! `NeighborSource` is one page call against the remote graph;
//! `NeighborSetBuilder` drains it into a full neighbor list for one node.

mod builder;

pub use builder::NeighborSetBuilder;

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::graph::{ActorId, Direction};

/// Items per page requested from the remote service.
pub const PAGE_SIZE: usize = 100;

/// One neighbor as returned in a listing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeighborItem {
    pub id: ActorId,
    pub handle: String,
}

/// One page of a neighbor listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NeighborPage {
    pub items: Vec<NeighborItem>,
    /// Present iff more pages exist.
    pub cursor: Option<String>,
    /// Set when the queried actor itself relates to the viewer in the
    /// listed direction. The service leaves that edge out of `items`.
    pub viewer_related: Option<bool>,
}

impl NeighborPage {
    /// A page shorter than `PAGE_SIZE`, or one without a cursor, ends the listing.
    pub fn is_last(&self) -> bool {
        self.items.len() < PAGE_SIZE || self.cursor.as_deref().map_or(true, str::is_empty)
    }
}

/// A single paginated neighbor call.
pub trait NeighborSource {
    /// Fetch one page of `actor`'s neighbors in `direction`, starting at
    /// `cursor` (or the beginning when `None`).
    fn fetch_page(
        &self,
        actor: &ActorId,
        direction: Direction,
        cursor: Option<&str>,
    ) -> impl Future<Output = Result<NeighborPage>> + Send;
}
