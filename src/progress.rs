//! Progress updates emitted while a search runs.

use serde::Serialize;

/// Running counters for one search. Reset for every new search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SearchStats {
    /// Distinct edges discovered so far.
    pub edges: usize,
    /// Page calls issued so far.
    pub requests: u64,
}

/// Receives counter updates as they change.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, stats: SearchStats);
}

/// Discards updates.
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _stats: SearchStats) {}
}

/// Logs updates at debug level.
pub struct LogProgress;

impl ProgressReporter for LogProgress {
    fn report(&self, stats: SearchStats) {
        log::debug!("edges: {}, requests: {}", stats.edges, stats.requests);
    }
}
