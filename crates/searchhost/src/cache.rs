//! Query-result cache for the index-backed engine.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use url::Url;

/// Candidate listings cached per cache key, keyed again by folder root.
///
/// Only the index-backed engine stores entries here; repeated requests that
/// share a cache key (the typing-ahead pattern) reuse the provider's listing
/// instead of enumerating again. Invalidation arrives through
/// [`crate::dispatch::SearchDispatcher::clear_cache`] after a workspace
/// mutation.
#[derive(Default)]
pub struct QueryResultCache {
    entries: Mutex<HashMap<String, HashMap<String, Arc<Vec<Url>>>>>,
}

impl QueryResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, cache_key: &str, folder: &str) -> Option<Arc<Vec<Url>>> {
        self.entries.lock().get(cache_key)?.get(folder).cloned()
    }

    pub fn insert(&self, cache_key: &str, folder: &str, listing: Arc<Vec<Url>>) {
        self.entries
            .lock()
            .entry(cache_key.to_string())
            .or_default()
            .insert(folder.to_string(), listing);
    }

    /// Drop everything stored under `cache_key`. Unknown keys are a no-op.
    pub fn clear(&self, cache_key: &str) {
        self.entries.lock().remove(cache_key);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(paths: &[&str]) -> Arc<Vec<Url>> {
        Arc::new(
            paths
                .iter()
                .map(|path| Url::from_file_path(path).expect("url"))
                .collect(),
        )
    }

    #[test]
    fn insert_then_get_round_trips_per_folder() {
        let cache = QueryResultCache::new();
        cache.insert("key-a", "file:///w/a", listing(&["/w/a/main.rs"]));
        cache.insert("key-a", "file:///w/b", listing(&["/w/b/lib.rs"]));

        assert_eq!(cache.get("key-a", "file:///w/a").expect("hit").len(), 1);
        assert_eq!(cache.get("key-a", "file:///w/b").expect("hit").len(), 1);
        assert!(cache.get("key-b", "file:///w/a").is_none());
    }

    #[test]
    fn clear_removes_every_folder_under_the_key() {
        let cache = QueryResultCache::new();
        cache.insert("key-a", "file:///w/a", listing(&["/w/a/main.rs"]));
        cache.insert("key-a", "file:///w/b", listing(&["/w/b/lib.rs"]));

        cache.clear("key-a");
        assert!(cache.get("key-a", "file:///w/a").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn clearing_unknown_key_is_a_noop() {
        let cache = QueryResultCache::new();
        cache.clear("key-a");
        assert!(cache.is_empty());
    }
}
