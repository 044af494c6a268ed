//! In-memory query cache keyed by typed query keys.
//!
//! Entries carry the instant they were fetched. A fresh entry is served
//! without refetching; a stale one is still handed out so the view can keep
//! showing it while a refetch is in flight.

use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

use crate::config::QuerySettings;
use crate::options::FilterOptionSet;

use super::{OptionsKey, PageKey, PageResult, ResourceKey, SearchKey, SearchResult};

#[derive(Debug)]
struct CacheEntry<V> {
    value: Arc<V>,
    fetched_at: Instant,
}

/// Results of one query category, shared between controllers.
#[derive(Debug)]
pub struct QueryCache<K: Eq + Hash, V> {
    entries: DashMap<K, CacheEntry<V>>,
    fresh_for: Duration,
}

impl<K, V> QueryCache<K, V>
where
    K: Eq + Hash + Clone + ResourceKey,
{
    pub fn new(fresh_for: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            fresh_for,
        }
    }

    pub fn fresh_for(&self) -> Duration {
        self.fresh_for
    }

    /// The cached value if it was fetched within the fresh window.
    pub fn get_fresh(&self, key: &K) -> Option<Arc<V>> {
        self.entries
            .get(key)
            .filter(|entry| entry.fetched_at.elapsed() < self.fresh_for)
            .map(|entry| Arc::clone(&entry.value))
    }

    /// The cached value regardless of age.
    pub fn get_stale(&self, key: &K) -> Option<Arc<V>> {
        self.entries.get(key).map(|entry| Arc::clone(&entry.value))
    }

    pub fn insert(&self, key: K, value: Arc<V>) {
        self.entries.insert(
            key,
            CacheEntry {
                value,
                fetched_at: Instant::now(),
            },
        );
    }

    pub fn invalidate(&self, key: &K) {
        self.entries.remove(key);
    }

    /// Drop every entry of `resource`.
    pub fn invalidate_resource(&self, resource: &str) {
        self.entries.retain(|key, _| key.resource() != resource);
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The three query caches backing every list controller.
///
/// Filter options change far less often than page contents, so their cache
/// is configured with a longer fresh window.
#[derive(Debug)]
pub struct QueryClient {
    pub pages: QueryCache<PageKey, PageResult>,
    pub searches: QueryCache<SearchKey, SearchResult>,
    pub options: QueryCache<OptionsKey, FilterOptionSet>,
}

impl Default for QueryClient {
    fn default() -> Self {
        Self::new(&QuerySettings::default())
    }
}

impl QueryClient {
    pub fn new(settings: &QuerySettings) -> Self {
        Self {
            pages: QueryCache::new(settings.page_fresh()),
            searches: QueryCache::new(settings.search_fresh()),
            options: QueryCache::new(settings.options_fresh()),
        }
    }

    /// Drop cached pages, searches and options of `resource`, e.g. after a mutation.
    pub fn invalidate_resource(&self, resource: &str) {
        self.pages.invalidate_resource(resource);
        self.searches.invalidate_resource(resource);
        self.options.invalidate_resource(resource);
        tracing::debug!(resource, "invalidated cached queries");
    }

    pub fn clear(&self) {
        self.pages.clear();
        self.searches.clear();
        self.options.clear();
    }
}
