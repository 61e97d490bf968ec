use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::graph::ActorId;

/// Thread-safe LRU map from actor identifier to its last seen handle
///
/// Filled from neighbor pages and identity lookups so a finished path can be
/// shown with handles instead of DIDs. Never consulted by the search itself.
pub struct HandleDirectory {
    cache: Mutex<LruCache<ActorId, String>>,
}

impl HandleDirectory {
    /// Create a new directory with the specified capacity
    ///
    /// A capacity of 0 is raised to 1.
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);

        Self {
            cache: Mutex::new(LruCache::new(cap)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<ActorId, String>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Handle last recorded for `id`
    pub fn get(&self, id: &ActorId) -> Option<String> {
        self.lock().get(id).cloned()
    }

    /// Record the handle for `id`, replacing any older one
    pub fn put(&self, id: ActorId, handle: String) {
        self.lock().put(id, handle);
    }

    /// Handle for `id`, or the identifier itself when unknown
    pub fn display(&self, id: &ActorId) -> String {
        self.get(id).unwrap_or_else(|| id.to_string())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> ActorId {
        ActorId::from(s)
    }

    #[test]
    fn test_put_and_get() {
        let directory = HandleDirectory::new(10);
        directory.put(id("did:plc:alice"), "alice.bsky.social".to_string());

        assert_eq!(directory.get(&id("did:plc:alice")).as_deref(), Some("alice.bsky.social"));
        assert!(directory.get(&id("did:plc:bob")).is_none());
    }

    #[test]
    fn test_handle_change_overwrites() {
        let directory = HandleDirectory::new(10);
        directory.put(id("did:plc:alice"), "alice.bsky.social".to_string());
        directory.put(id("did:plc:alice"), "alice.example.com".to_string());

        assert_eq!(directory.len(), 1);
        assert_eq!(directory.display(&id("did:plc:alice")), "alice.example.com");
    }

    #[test]
    fn test_display_falls_back_to_id() {
        let directory = HandleDirectory::new(10);
        assert_eq!(directory.display(&id("did:plc:nobody")), "did:plc:nobody");
    }

    #[test]
    fn test_eviction() {
        let directory = HandleDirectory::new(2);

        directory.put(id("a"), "a.test".to_string());
        directory.put(id("b"), "b.test".to_string());
        // Touch a so b is least recently used
        let _ = directory.get(&id("a"));
        directory.put(id("c"), "c.test".to_string());

        assert!(directory.get(&id("a")).is_some());
        assert!(directory.get(&id("b")).is_none());
        assert!(directory.get(&id("c")).is_some());
    }

    #[test]
    fn test_capacity_zero_is_raised() {
        let directory = HandleDirectory::new(0);
        directory.put(id("a"), "a.test".to_string());
        assert_eq!(directory.len(), 1);
        directory.clear();
        assert!(directory.is_empty());
    }
}
