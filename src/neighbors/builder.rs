use std::time::Duration;

use crate::cache::HandleDirectory;
use crate::error::Result;
use crate::graph::{ActorId, Direction};
use crate::progress::{ProgressReporter, SearchStats};

use super::NeighborSource;

/// Drains a `NeighborSource` into one node's full neighbor list
///
/// Follows cursors until a short page, pausing after every call so a search
/// never exceeds one request per pacing interval.
pub struct NeighborSetBuilder<'a, S> {
    source: &'a S,
    pacing: Duration,
    handles: Option<&'a HandleDirectory>,
}

impl<'a, S: NeighborSource + Sync> NeighborSetBuilder<'a, S> {
    /// Create a builder over `source` pausing `pacing` after each page call
    pub fn new(source: &'a S, pacing: Duration) -> Self {
        Self {
            source,
            pacing,
            handles: None,
        }
    }

    /// Record every handle seen in a page into `handles`
    pub fn with_handles(mut self, handles: &'a HandleDirectory) -> Self {
        self.handles = Some(handles);
        self
    }

    /// Full neighbor list of `actor` in `direction`
    ///
    /// When the first page reports that `actor` relates to the viewer, the
    /// service leaves that edge out of the listing, so `viewer` is appended
    /// once at the end. Each page call bumps `stats.requests` and is reported.
    ///
    /// # Errors
    ///
    /// The first failed page call aborts the listing; nothing partial is returned.
    pub async fn collect(
        &self,
        actor: &ActorId,
        direction: Direction,
        viewer: Option<&ActorId>,
        stats: &mut SearchStats,
        reporter: &dyn ProgressReporter,
    ) -> Result<Vec<ActorId>> {
        let mut neighbors = Vec::new();
        let mut cursor: Option<String> = None;
        let mut viewer_related = false;
        let mut first = true;

        loop {
            let page = self
                .source
                .fetch_page(actor, direction, cursor.as_deref())
                .await?;

            stats.requests += 1;
            reporter.report(*stats);

            log::debug!(
                "{} of {}: page {} returned {} items",
                direction,
                actor,
                stats.requests,
                page.items.len()
            );

            if first {
                viewer_related = page.viewer_related.unwrap_or(false);
                first = false;
            }

            let last = page.is_last();
            for item in page.items {
                if let Some(handles) = self.handles {
                    handles.put(item.id.clone(), item.handle);
                }
                neighbors.push(item.id);
            }
            cursor = page.cursor;

            if !self.pacing.is_zero() {
                tokio::time::sleep(self.pacing).await;
            }

            if last {
                break;
            }
        }

        if viewer_related {
            if let Some(viewer) = viewer {
                if !neighbors.contains(viewer) {
                    neighbors.push(viewer.clone());
                }
            }
        }

        Ok(neighbors)
    }
}
