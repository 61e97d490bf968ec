//! Resolve two typed actors and search for a follow chain between them.

use std::time::Duration;

use crate::cache::HandleDirectory;
use crate::client::{Identity, IdentityResolver, XrpcClient};
use crate::config::Config;
use crate::error::Result;
use crate::graph::{find_path, ActorId, PathReport, ReconstructionStrategy, SearchRequest};
use crate::neighbors::{NeighborSetBuilder, NeighborSource};
use crate::progress::ProgressReporter;

/// Everything a search needs besides its endpoints.
pub struct PathFinder<C = XrpcClient> {
    client: C,
    handles: HandleDirectory,
    pacing: Duration,
    strategy: ReconstructionStrategy,
    viewer: Option<ActorId>,
}

impl PathFinder<XrpcClient> {
    /// Build the XRPC client from config and resolve the configured viewer, if any
    pub async fn from_config(config: &Config) -> Result<Self> {
        let client = XrpcClient::from_config(config)?;
        let mut finder = Self::new(
            client,
            HandleDirectory::new(config.cache.handle_capacity),
            config.pacing(),
            config.search.reconstruction,
        );

        if let Some(viewer) = &config.service.viewer {
            let identity = finder.resolve(viewer).await?;
            log::info!("Viewer: @{} ({})", identity.handle, identity.id);
            finder.viewer = Some(identity.id);
        } else if finder.client.is_authenticated() {
            log::warn!("Authenticated without service.viewer; viewer relationship flags are ignored");
        }

        Ok(finder)
    }
}

impl<C: NeighborSource + IdentityResolver + Sync> PathFinder<C> {
    pub fn new(
        client: C,
        handles: HandleDirectory,
        pacing: Duration,
        strategy: ReconstructionStrategy,
    ) -> Self {
        Self {
            client,
            handles,
            pacing,
            strategy,
            viewer: None,
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn handles(&self) -> &HandleDirectory {
        &self.handles
    }

    pub fn strategy(&self) -> ReconstructionStrategy {
        self.strategy
    }

    /// Resolve `input` and remember its handle for rendering
    pub async fn resolve(&self, input: &str) -> Result<Identity> {
        let identity = self.client.resolve(input).await?;
        self.handles.put(identity.id.clone(), identity.handle.clone());
        Ok(identity)
    }

    /// Resolve both endpoints. Fails before any neighbor call is made.
    pub async fn resolve_endpoints(&self, from: &str, to: &str) -> Result<(Identity, Identity)> {
        let from = self.resolve(from).await?;
        let to = self.resolve(to).await?;
        Ok((from, to))
    }

    /// Search between two resolved actors
    pub async fn search(
        &self,
        from: &ActorId,
        to: &ActorId,
        strategy: Option<ReconstructionStrategy>,
        reporter: &dyn ProgressReporter,
    ) -> Result<PathReport> {
        let builder = NeighborSetBuilder::new(&self.client, self.pacing).with_handles(&self.handles);
        let request = SearchRequest {
            source: from.clone(),
            target: to.clone(),
            viewer: self.viewer.clone(),
            strategy: strategy.unwrap_or(self.strategy),
        };
        find_path(builder, &request, reporter).await
    }
}
