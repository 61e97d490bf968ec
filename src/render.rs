//! Turning a found path into text for people.

use serde::{Deserialize, Serialize};

use crate::cache::HandleDirectory;
use crate::graph::ActorId;

/// How each hop of a path is written out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum PathFormat {
    /// `@handle`
    #[default]
    Plain,
    /// `https://bsky.app/profile/<handle>`
    Https,
    /// `at://<handle>`
    At,
}

/// One hop with its display handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathHop {
    pub did: ActorId,
    pub handle: String,
}

pub fn hops(path: &[ActorId], handles: &HandleDirectory) -> Vec<PathHop> {
    path.iter()
        .map(|id| PathHop {
            did: id.clone(),
            handle: handles.display(id),
        })
        .collect()
}

pub fn format_hop(handle: &str, format: PathFormat) -> String {
    match format {
        PathFormat::Plain => format!("@{}", handle),
        PathFormat::Https => format!("https://bsky.app/profile/{}", handle),
        PathFormat::At => format!("at://{}", handle),
    }
}

/// `a -> b -> c` in the chosen format. Unknown handles fall back to the DID.
pub fn render_path(path: &[ActorId], handles: &HandleDirectory, format: PathFormat) -> String {
    path.iter()
        .map(|id| format_hop(&handles.display(id), format))
        .collect::<Vec<_>>()
        .join(" -> ")
}
