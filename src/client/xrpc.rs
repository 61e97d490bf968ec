use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

use crate::client::identity::{normalize_actor_input, Identity, IdentityResolver};
use crate::config::Config;
use crate::error::{Result, SkypathError};
use crate::graph::{ActorId, Direction};
use crate::neighbors::{NeighborItem, NeighborPage, NeighborSource, PAGE_SIZE};

const GET_FOLLOWS: &str = "app.bsky.graph.getFollows";
const GET_FOLLOWERS: &str = "app.bsky.graph.getFollowers";
const GET_PROFILE: &str = "app.bsky.actor.getProfile";

/// Profile as embedded in graph listings and returned by getProfile
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileView {
    did: String,
    handle: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    viewer: Option<ViewerState>,
}

/// Relationship between the authenticated viewer and a profile
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ViewerState {
    #[serde(default)]
    following: Option<String>,
    #[serde(default)]
    followed_by: Option<String>,
}

/// Response of app.bsky.graph.getFollows
#[derive(Deserialize)]
struct FollowsOutput {
    subject: ProfileView,
    follows: Vec<ProfileView>,
    #[serde(default)]
    cursor: Option<String>,
}

/// Response of app.bsky.graph.getFollowers
#[derive(Deserialize)]
struct FollowersOutput {
    subject: ProfileView,
    followers: Vec<ProfileView>,
    #[serde(default)]
    cursor: Option<String>,
}

impl From<ProfileView> for NeighborItem {
    fn from(profile: ProfileView) -> Self {
        NeighborItem {
            id: ActorId::new(profile.did),
            handle: profile.handle,
        }
    }
}

/// XRPC client for the Bluesky AppView
///
/// Issues exactly one HTTP request per call and never retries: a failed page
/// call must abort the search that issued it.
pub struct XrpcClient {
    client: Client,
    base_url: Url,
    auth_token: Option<String>,
}

impl XrpcClient {
    /// Create a new client
    ///
    /// # Arguments
    ///
    /// * `base_url` - Service root, e.g. "https://public.api.bsky.app"
    /// * `timeout` - Per-request timeout
    /// * `auth_token` - Optional bearer token; anonymous when `None`
    pub fn new(base_url: &str, timeout: Duration, auth_token: Option<String>) -> Result<Self> {
        let mut base_url = Url::parse(base_url)
            .map_err(|e| SkypathError::Config(format!("invalid service URL {}: {}", base_url, e)))?;
        // Url::join drops the last path segment unless it ends with '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("skypath/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url,
            auth_token,
        })
    }

    /// Create a client from the `[service]` section of the configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.service.base_url, config.timeout(), config.auth_token())
    }

    /// Whether calls carry a bearer token (viewer flags are only meaningful then)
    pub fn is_authenticated(&self) -> bool {
        self.auth_token.is_some()
    }

    fn endpoint(&self, nsid: &str, params: &[(&str, &str)]) -> Result<Url> {
        let mut url = self
            .base_url
            .join(&format!("xrpc/{}", nsid))
            .map_err(|e| SkypathError::Config(format!("invalid XRPC endpoint {}: {}", nsid, e)))?;
        url.query_pairs_mut().extend_pairs(params);
        Ok(url)
    }

    /// One GET request decoded as `T`
    async fn query<T: DeserializeOwned>(&self, nsid: &str, params: &[(&str, &str)]) -> Result<T> {
        let url = self.endpoint(nsid, params)?;
        log::debug!("GET {}", url);

        let mut request = self.client.get(url);
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(SkypathError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes)
            .map_err(|e| SkypathError::Parse(format!("{} response: {}", nsid, e)))
    }
}

impl NeighborSource for XrpcClient {
    async fn fetch_page(
        &self,
        actor: &ActorId,
        direction: Direction,
        cursor: Option<&str>,
    ) -> Result<NeighborPage> {
        let limit = PAGE_SIZE.to_string();
        let mut params = vec![("actor", actor.as_str()), ("limit", limit.as_str())];
        if let Some(cursor) = cursor.filter(|c| !c.is_empty()) {
            params.push(("cursor", cursor));
        }

        let (subject, profiles, cursor) = match direction {
            Direction::Outgoing => {
                let out: FollowsOutput = self.query(GET_FOLLOWS, &params).await?;
                (out.subject, out.follows, out.cursor)
            }
            Direction::Incoming => {
                let out: FollowersOutput = self.query(GET_FOLLOWERS, &params).await?;
                (out.subject, out.followers, out.cursor)
            }
        };

        // Outgoing: the subject follows the viewer. Incoming: the viewer follows the subject.
        let viewer_related = subject.viewer.map(|v| match direction {
            Direction::Outgoing => v.followed_by.is_some(),
            Direction::Incoming => v.following.is_some(),
        });

        Ok(NeighborPage {
            items: profiles.into_iter().map(NeighborItem::from).collect(),
            cursor,
            viewer_related,
        })
    }
}

impl IdentityResolver for XrpcClient {
    async fn resolve(&self, input: &str) -> Result<Identity> {
        let actor = normalize_actor_input(input)?;

        let profile: ProfileView = match self.query(GET_PROFILE, &[("actor", actor)]).await {
            Ok(profile) => profile,
            Err(SkypathError::Api { status, body })
                if status == StatusCode::BAD_REQUEST.as_u16()
                    || status == StatusCode::NOT_FOUND.as_u16() =>
            {
                log::debug!("getProfile({}) failed with {}: {}", actor, status, body);
                return Err(SkypathError::IdentityNotFound(actor.to_string()));
            }
            Err(e) => return Err(e),
        };

        Ok(Identity {
            id: ActorId::new(profile.did),
            handle: profile.handle,
            display_name: profile.display_name.filter(|n| !n.is_empty()),
        })
    }
}
