pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod finder;
pub mod graph;
pub mod neighbors;
pub mod progress;
pub mod render;
pub mod server;

pub use config::Config;
pub use error::{Result, SkypathError};
pub use finder::PathFinder;
pub use graph::{find_path, ActorId, Direction, PathOutcome, SearchRequest};
