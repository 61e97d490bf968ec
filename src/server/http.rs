use crate::client::IdentityResolver;
use crate::config::{ConcurrentSearches, HttpServerConfig};
use crate::error::{Result, SkypathError};
use crate::finder::PathFinder;
use crate::graph::{PathOutcome, ReconstructionStrategy};
use crate::neighbors::NeighborSource;
use crate::progress::{ProgressReporter, SearchStats};
use crate::render::{hops, render_path, PathFormat, PathHop};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{sse::{Event, KeepAlive, Sse}, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use futures_util::Stream;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::{wrappers::UnboundedReceiverStream, StreamExt};
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

/// One server-sent event of a path search
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
enum SearchEvent {
    Progress(SearchStats),
    Found {
        search_id: String,
        path: Vec<PathHop>,
        rendered: String,
        #[serde(flatten)]
        stats: SearchStats,
    },
    NotFound {
        search_id: String,
        #[serde(flatten)]
        stats: SearchStats,
    },
    Failed {
        search_id: String,
        kind: &'static str,
        message: String,
    },
}

impl SearchEvent {
    fn name(&self) -> &'static str {
        match self {
            SearchEvent::Progress(_) => "progress",
            SearchEvent::Found { .. } => "path",
            SearchEvent::NotFound { .. } => "not_found",
            SearchEvent::Failed { .. } => "error",
        }
    }

    fn failed(search_id: &str, err: &SkypathError) -> Self {
        let kind = match err {
            SkypathError::IdentityNotFound(_) => "identity_not_found",
            SkypathError::InvalidInput(_) => "invalid_input",
            _ => "search_failed",
        };
        SearchEvent::Failed {
            search_id: search_id.to_string(),
            kind,
            message: err.to_string(),
        }
    }

    fn cancelled(search_id: &str) -> Self {
        SearchEvent::Failed {
            search_id: search_id.to_string(),
            kind: "cancelled",
            message: "search cancelled by a newer search".to_string(),
        }
    }

    fn into_sse(self) -> Event {
        let event = Event::default().event(self.name());
        match event.json_data(&self) {
            Ok(event) => event,
            Err(e) => Event::default().event("error").data(format!("serialization failed: {}", e)),
        }
    }
}

/// Forwards search progress into the SSE channel
struct ChannelReporter(mpsc::UnboundedSender<SearchEvent>);

impl ProgressReporter for ChannelReporter {
    fn report(&self, stats: SearchStats) {
        // The client may have gone away; the search finishes regardless.
        let _ = self.0.send(SearchEvent::Progress(stats));
    }
}

/// Query string of GET /path
#[derive(Debug, Deserialize)]
struct PathParams {
    from: String,
    to: String,
    #[serde(default)]
    format: PathFormat,
    #[serde(default)]
    strategy: Option<ReconstructionStrategy>,
}

/// HTTP front end streaming path searches as server-sent events
pub struct PathServer<C> {
    finder: Arc<PathFinder<C>>,
    config: HttpServerConfig,
}

impl<C> PathServer<C>
where
    C: NeighborSource + IdentityResolver + Send + Sync + 'static,
{
    pub fn new(finder: PathFinder<C>, config: HttpServerConfig) -> Self {
        Self {
            finder: Arc::new(finder),
            config,
        }
    }

    /// Run the HTTP server on 127.0.0.1:`port`
    pub async fn run(&self, port: u16) -> Result<()> {
        let addr = format!("127.0.0.1:{}", port);
        let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| {
            SkypathError::Io(std::io::Error::new(
                e.kind(),
                format!(
                    "Failed to bind to {}: {}. Use a different port by setting http_server.port in config.toml",
                    addr, e
                ),
            ))
        })?;

        log::info!("Starting Skypath HTTP server on http://{}", addr);
        log::info!("Path endpoint: http://{}/path?from=<handle>&to=<handle>", addr);

        self.serve(listener).await
    }

    /// Serve on an already bound listener
    pub async fn serve(&self, listener: tokio::net::TcpListener) -> Result<()> {
        axum::serve(listener, self.create_router()).await?;
        Ok(())
    }

    /// Create the axum router
    fn create_router(&self) -> Router {
        let cors = if self.config.allowed_origins.is_empty() {
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        } else {
            let origins: Vec<axum::http::HeaderValue> = self
                .config
                .allowed_origins
                .iter()
                .filter_map(|o| o.parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(Any)
                .allow_headers(Any)
        };

        let state = AppState {
            finder: Arc::clone(&self.finder),
            policy: self.config.concurrent_searches,
            running: Arc::new(Mutex::new(None)),
        };

        Router::new()
            .route("/path", get(handle_path::<C>))
            .route("/health", get(handle_health))
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(cors),
            )
            .with_state(state)
    }
}

/// The search started last and the way to reach its client
struct RunningSearch {
    search_id: String,
    handle: JoinHandle<()>,
    events: mpsc::WeakUnboundedSender<SearchEvent>,
}

/// Application state shared across handlers
struct AppState<C> {
    finder: Arc<PathFinder<C>>,
    policy: ConcurrentSearches,
    /// Searches never overlap.
    running: Arc<Mutex<Option<RunningSearch>>>,
}

impl<C> Clone for AppState<C> {
    fn clone(&self) -> Self {
        Self {
            finder: Arc::clone(&self.finder),
            policy: self.policy,
            running: Arc::clone(&self.running),
        }
    }
}

/// Handle GET /path: start a search and stream its progress and result.
///
/// Every stream ends with one `path`, `not_found` or `error` event. A search
/// displaced under the cancel policy gets an `error` of kind `cancelled`.
/// A search whose client disconnects is stopped.
async fn handle_path<C>(
    State(state): State<AppState<C>>,
    Query(params): Query<PathParams>,
) -> Response
where
    C: NeighborSource + IdentityResolver + Send + Sync + 'static,
{
    let search_id = Uuid::new_v4().to_string();
    let (tx, rx) = mpsc::unbounded_channel::<SearchEvent>();

    {
        let mut running = state.running.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = running.as_ref().filter(|r| !r.handle.is_finished()) {
            match state.policy {
                ConcurrentSearches::Reject => {
                    log::warn!("Rejecting search {}: another search is running", search_id);
                    return (
                        StatusCode::CONFLICT,
                        Json(serde_json::json!({ "error": SkypathError::SearchBusy.to_string() })),
                    )
                        .into_response();
                }
                ConcurrentSearches::Cancel => {
                    log::warn!("Cancelling search {} to start {}", previous.search_id, search_id);
                    if let Some(events) = previous.events.upgrade() {
                        let _ = events.send(SearchEvent::cancelled(&previous.search_id));
                    }
                    previous.handle.abort();
                }
            }
        }

        let finder = Arc::clone(&state.finder);
        let id = search_id.clone();
        let events = tx.downgrade();
        let handle = tokio::spawn(async move {
            tokio::select! {
                event = run_search(&finder, &id, &params, tx.clone()) => {
                    let _ = tx.send(event);
                }
                _ = tx.closed() => {
                    log::info!("Search {} stopped: client disconnected", id);
                }
            }
        });
        *running = Some(RunningSearch {
            search_id,
            handle,
            events,
        });
    }

    sse_response(rx).into_response()
}

/// Resolve, search and render into the terminal event
async fn run_search<C>(
    finder: &PathFinder<C>,
    search_id: &str,
    params: &PathParams,
    tx: mpsc::UnboundedSender<SearchEvent>,
) -> SearchEvent
where
    C: NeighborSource + IdentityResolver + Sync,
{
    let (from, to) = match finder.resolve_endpoints(&params.from, &params.to).await {
        Ok(endpoints) => endpoints,
        Err(e) => return SearchEvent::failed(search_id, &e),
    };

    log::info!("Search {}: @{} -> @{}", search_id, from.handle, to.handle);

    let reporter = ChannelReporter(tx);
    match finder.search(&from.id, &to.id, params.strategy, &reporter).await {
        Ok(report) => match report.outcome {
            PathOutcome::Found(path) => SearchEvent::Found {
                search_id: search_id.to_string(),
                path: hops(&path, finder.handles()),
                rendered: render_path(&path, finder.handles(), params.format),
                stats: report.stats,
            },
            PathOutcome::NotFound => SearchEvent::NotFound {
                search_id: search_id.to_string(),
                stats: report.stats,
            },
        },
        Err(e) => {
            log::error!("Search {} failed: {}", search_id, e);
            SearchEvent::failed(search_id, &e)
        }
    }
}

fn sse_response(
    rx: mpsc::UnboundedReceiver<SearchEvent>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let stream = UnboundedReceiverStream::new(rx).map(|event| Ok(event.into_sse()));
    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Handle GET /health
async fn handle_health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::HandleDirectory;
    use crate::graph::testing::StubGraph;
    use std::time::Duration;

    fn server(graph: StubGraph, pacing: Duration, policy: ConcurrentSearches) -> PathServer<StubGraph> {
        let finder = PathFinder::new(
            graph,
            HandleDirectory::new(100),
            pacing,
            ReconstructionStrategy::BreadthFirst,
        );
        let config = HttpServerConfig {
            concurrent_searches: policy,
            ..HttpServerConfig::default()
        };
        PathServer::new(finder, config)
    }

    async fn spawn(server: PathServer<StubGraph>) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            server.serve(listener).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn chain() -> StubGraph {
        StubGraph::from_edges(&[("A", "B"), ("B", "C"), ("C", "D")])
    }

    /// n0 -> n1 -> ... -> n{len}
    fn long_chain(len: usize) -> StubGraph {
        let mut graph = StubGraph::new();
        for i in 0..len {
            graph.follow(&format!("n{}", i), &format!("n{}", i + 1));
        }
        graph
    }

    #[tokio::test]
    async fn test_health() {
        let base = spawn(server(chain(), Duration::ZERO, ConcurrentSearches::Cancel)).await;
        let body: serde_json::Value = reqwest::get(format!("{}/health", base))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_path_stream() {
        let base = spawn(server(chain(), Duration::ZERO, ConcurrentSearches::Cancel)).await;
        let body = reqwest::get(format!("{}/path?from=A.test&to=@D.test&format=https", base))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();

        assert!(body.contains("event: progress"), "body: {}", body);
        assert!(body.contains("event: path"), "body: {}", body);
        assert!(body.contains(
            "https://bsky.app/profile/A.test -> https://bsky.app/profile/B.test -> https://bsky.app/profile/C.test -> https://bsky.app/profile/D.test"
        ));
        assert!(!body.contains("event: error"));
    }

    #[tokio::test]
    async fn test_not_found_and_identity_errors_are_distinct() {
        let graph = StubGraph::from_edges(&[("A", "B"), ("X", "Y")]);
        let base = spawn(server(graph, Duration::ZERO, ConcurrentSearches::Cancel)).await;

        let not_found = reqwest::get(format!("{}/path?from=A.test&to=Y.test", base))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(not_found.contains("event: not_found"), "body: {}", not_found);
        assert!(!not_found.contains("event: error"));

        let unknown = reqwest::get(format!("{}/path?from=A.test&to=ghost.test", base))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(unknown.contains("event: error"), "body: {}", unknown);
        assert!(unknown.contains("identity_not_found"));
        assert!(!unknown.contains("event: not_found"));
    }

    #[tokio::test]
    async fn test_search_failure_is_reported_as_error() {
        let mut graph = chain();
        graph.fail_on_call(1);
        let base = spawn(server(graph, Duration::ZERO, ConcurrentSearches::Cancel)).await;
        let body = reqwest::get(format!("{}/path?from=A.test&to=D.test", base))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(body.contains("event: error"), "body: {}", body);
        assert!(body.contains("search_failed"));
    }

    #[tokio::test]
    async fn test_reject_policy_refuses_overlap() {
        let base = spawn(server(chain(), Duration::from_millis(300), ConcurrentSearches::Reject)).await;

        let first = reqwest::get(format!("{}/path?from=A.test&to=D.test", base)).await.unwrap();
        assert_eq!(first.status(), reqwest::StatusCode::OK);

        let second = reqwest::get(format!("{}/path?from=A.test&to=D.test", base)).await.unwrap();
        assert_eq!(second.status(), reqwest::StatusCode::CONFLICT);

        let body = first.text().await.unwrap();
        assert!(body.contains("event: path"), "body: {}", body);
    }

    #[tokio::test]
    async fn test_cancel_policy_aborts_previous() {
        let base = spawn(server(chain(), Duration::from_millis(300), ConcurrentSearches::Cancel)).await;

        let first = reqwest::get(format!("{}/path?from=A.test&to=D.test", base)).await.unwrap();
        let second = reqwest::get(format!("{}/path?from=A.test&to=D.test", base)).await.unwrap();
        assert_eq!(second.status(), reqwest::StatusCode::OK);

        let first_body = first.text().await.unwrap();
        assert!(!first_body.contains("event: path"), "body: {}", first_body);
        assert!(first_body.contains("event: error"), "body: {}", first_body);
        assert!(first_body.contains("\"kind\":\"cancelled\""), "body: {}", first_body);

        let second_body = second.text().await.unwrap();
        assert!(second_body.contains("event: path"), "body: {}", second_body);
    }

    #[tokio::test]
    async fn test_disconnected_client_frees_the_server() {
        // About 60 paced calls, far longer than the retry window below
        let base = spawn(server(long_chain(60), Duration::from_millis(100), ConcurrentSearches::Reject)).await;
        let url = format!("{}/path?from=n0.test&to=n60.test", base);

        let first = reqwest::get(&url).await.unwrap();
        assert_eq!(first.status(), reqwest::StatusCode::OK);
        drop(first);

        let mut status = reqwest::StatusCode::CONFLICT;
        for _ in 0..20 {
            tokio::time::sleep(Duration::from_millis(100)).await;
            let next = reqwest::get(&url).await.unwrap();
            status = next.status();
            if status == reqwest::StatusCode::OK {
                break;
            }
        }
        assert_eq!(status, reqwest::StatusCode::OK);
    }
}
