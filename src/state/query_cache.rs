//! Query Cache
//!
//! Explicit, bounded cache of accumulated list pages keyed by
//! `(entity kind, filters, page size)`. Several loaders showing the same
//! query share one entry: whichever fetches writes the pages back, the others
//! hydrate from it instead of hitting the source again.
//!
//! Request markers live beside the entries rather than inside them, so LRU
//! eviction never drops the marker of a request that is still running.
//! Invalidation removes both; a request that finishes after its key was
//! invalidated is not written back.

use std::sync::Arc;
use std::time::{Duration, Instant};

use ahash::AHashMap;
use hashlink::LruCache;
use parking_lot::Mutex;
use serde::Serialize;

use crate::constants::{DEFAULT_CACHE_CAPACITY, DEFAULT_STALE_TIME_SECS};
use crate::domain::lead::EntityKind;
use crate::error::Result;

/// Canonical cache key
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct QueryKey {
    kind: EntityKind,
    canonical: Arc<str>,
}

impl QueryKey {
    /// Build a key from the stable JSON form of the filters
    ///
    /// Filters must serialize deterministically (`FilterSet` keeps its
    /// clauses sorted for this reason).
    pub fn new<F: Serialize>(kind: EntityKind, filters: &F, page_size: u32) -> Result<Self> {
        let filters = serde_json::to_string(filters)?;
        Ok(Self {
            kind,
            canonical: format!("{}|{}|{}", kind.as_str(), page_size, filters).into(),
        })
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn as_str(&self) -> &str {
        &self.canonical
    }
}

impl std::fmt::Display for QueryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.canonical)
    }
}

/// Cached pages of one query
#[derive(Clone, Debug)]
pub struct CacheEntry<T> {
    pub items: Vec<T>,
    pub total_count: u64,
    pub pages_loaded: u32,
    pub fetched_at: Instant,
}

/// Bounded LRU cache of accumulated pages
pub struct QueryCache<T> {
    entries: LruCache<QueryKey, CacheEntry<T>>,
    in_flight: AHashMap<QueryKey, u64>,
    next_request_id: u64,
    stale_time: Duration,
}

/// Cache shared between loaders
pub type SharedQueryCache<T> = Arc<Mutex<QueryCache<T>>>;

impl<T: Clone> QueryCache<T> {
    /// Create a cache holding at most `capacity` queries
    pub fn new(capacity: usize, stale_time: Duration) -> Self {
        Self {
            entries: LruCache::new(capacity.max(1)),
            in_flight: AHashMap::new(),
            next_request_id: 1,
            stale_time,
        }
    }

    /// Wrap the cache for sharing between loaders
    pub fn shared(self) -> SharedQueryCache<T> {
        Arc::new(Mutex::new(self))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stale_time(&self) -> Duration {
        self.stale_time
    }

    /// Look up an entry, marking it recently used
    pub fn get(&mut self, key: &QueryKey) -> Option<&CacheEntry<T>> {
        self.entries.get(key)
    }

    /// Look up an entry that is younger than the stale time at `now`
    pub fn get_fresh(&mut self, key: &QueryKey, now: Instant) -> Option<CacheEntry<T>> {
        let stale_time = self.stale_time;
        self.entries
            .get(key)
            .filter(|entry| now.saturating_duration_since(entry.fetched_at) < stale_time)
            .cloned()
    }

    /// Whether an entry exists and is older than the stale time at `now`
    pub fn is_stale(&mut self, key: &QueryKey, now: Instant) -> bool {
        let stale_time = self.stale_time;
        self.entries
            .get(key)
            .is_some_and(|entry| now.saturating_duration_since(entry.fetched_at) >= stale_time)
    }

    /// Replace the pages stored for a key
    pub fn store(&mut self, key: QueryKey, entry: CacheEntry<T>) {
        tracing::trace!(key = %key, pages = entry.pages_loaded, "Caching query pages");
        self.entries.insert(key, entry);
    }

    /// Claim the right to fetch for a key
    ///
    /// Returns `None` when another request for the same key is running.
    pub fn try_begin_request(&mut self, key: &QueryKey) -> Option<u64> {
        if self.in_flight.contains_key(key) {
            return None;
        }
        let id = self.next_request_id;
        self.next_request_id += 1;
        self.in_flight.insert(key.clone(), id);
        Some(id)
    }

    /// Release a claim; returns false if the key was invalidated meanwhile
    pub fn finish_request(&mut self, key: &QueryKey, request_id: u64) -> bool {
        if self.in_flight.get(key) == Some(&request_id) {
            self.in_flight.remove(key);
            true
        } else {
            false
        }
    }

    /// Whether a request for the key is running
    pub fn is_in_flight(&self, key: &QueryKey) -> bool {
        self.in_flight.contains_key(key)
    }

    /// Drop one query
    pub fn invalidate(&mut self, key: &QueryKey) {
        self.entries.remove(key);
        self.in_flight.remove(key);
    }

    /// Drop every query of one entity kind, e.g. after a mutation
    pub fn invalidate_kind(&mut self, kind: EntityKind) -> usize {
        let keys: Vec<QueryKey> = self
            .entries
            .iter()
            .map(|(key, _)| key)
            .filter(|key| key.kind == kind)
            .cloned()
            .collect();
        for key in &keys {
            self.entries.remove(key);
        }
        self.in_flight.retain(|key, _| key.kind != kind);
        tracing::debug!(kind = kind.as_str(), removed = keys.len(), "Invalidated queries");
        keys.len()
    }

    /// Drop everything
    pub fn clear(&mut self) {
        self.entries.clear();
        self.in_flight.clear();
    }
}

impl<T: Clone> Default for QueryCache<T> {
    fn default() -> Self {
        Self::new(
            DEFAULT_CACHE_CAPACITY,
            Duration::from_secs(DEFAULT_STALE_TIME_SECS),
        )
    }
}

impl<T> std::fmt::Debug for QueryCache<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCache")
            .field("entries", &self.entries.len())
            .field("in_flight", &self.in_flight.len())
            .field("stale_time", &self.stale_time)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::filter::FilterSet;

    fn key(kind: EntityKind, stage: &str) -> QueryKey {
        QueryKey::new(kind, &FilterSet::new().equals("stage", stage), 20).expect("key")
    }

    fn entry(items: Vec<u32>, at: Instant) -> CacheEntry<u32> {
        CacheEntry {
            total_count: items.len() as u64,
            items,
            pages_loaded: 1,
            fetched_at: at,
        }
    }

    #[test]
    fn test_key_is_canonical() {
        let a = FilterSet::new().equals("stage", "nuevo").gte("score", 50);
        let b = FilterSet::new().gte("score", 50).equals("stage", "nuevo");
        let ka = QueryKey::new(EntityKind::Leads, &a, 20).expect("key");
        let kb = QueryKey::new(EntityKind::Leads, &b, 20).expect("key");
        assert_eq!(ka, kb);
        assert!(ka.as_str().starts_with("leads|20|"));

        let other_size = QueryKey::new(EntityKind::Leads, &a, 50).expect("key");
        let other_kind = QueryKey::new(EntityKind::Mandates, &a, 20).expect("key");
        assert_ne!(ka, other_size);
        assert_ne!(ka, other_kind);
    }

    #[test]
    fn test_fresh_and_stale_lookup() {
        let mut cache = QueryCache::new(4, Duration::from_secs(30));
        let now = Instant::now();
        let k = key(EntityKind::Leads, "nuevo");
        cache.store(k.clone(), entry(vec![1, 2, 3], now));

        assert_eq!(cache.get_fresh(&k, now).map(|e| e.items), Some(vec![1, 2, 3]));
        assert!(!cache.is_stale(&k, now + Duration::from_secs(29)));
        assert!(cache.is_stale(&k, now + Duration::from_secs(30)));
        assert!(cache.get_fresh(&k, now + Duration::from_secs(31)).is_none());
        // Stale entries are still readable
        assert!(cache.get(&k).is_some());
    }

    #[test]
    fn test_request_claims_deduplicate() {
        let mut cache: QueryCache<u32> = QueryCache::default();
        let k = key(EntityKind::Leads, "nuevo");

        let id = cache.try_begin_request(&k).expect("first claim");
        assert!(cache.is_in_flight(&k));
        assert_eq!(cache.try_begin_request(&k), None);
        assert!(cache.finish_request(&k, id));
        assert!(!cache.is_in_flight(&k));

        let second = cache.try_begin_request(&k).expect("claim after finish");
        assert_ne!(second, id);
        cache.invalidate(&k);
        assert!(!cache.finish_request(&k, second));
    }

    #[test]
    fn test_lru_eviction() {
        let mut cache = QueryCache::new(2, Duration::from_secs(60));
        let now = Instant::now();
        let a = key(EntityKind::Leads, "a");
        let b = key(EntityKind::Leads, "b");
        let c = key(EntityKind::Leads, "c");

        cache.store(a.clone(), entry(vec![1], now));
        cache.store(b.clone(), entry(vec![2], now));
        assert!(cache.get(&a).is_some());
        cache.store(c.clone(), entry(vec![3], now));

        assert_eq!(cache.len(), 2);
        assert!(cache.get(&b).is_none());
        assert!(cache.get(&a).is_some());
        assert!(cache.get(&c).is_some());
    }

    #[test]
    fn test_invalidate_kind() {
        let mut cache = QueryCache::new(8, Duration::from_secs(60));
        let now = Instant::now();
        cache.store(key(EntityKind::Leads, "a"), entry(vec![1], now));
        cache.store(key(EntityKind::Leads, "b"), entry(vec![2], now));
        cache.store(key(EntityKind::Contacts, "a"), entry(vec![3], now));
        let claim = key(EntityKind::Leads, "c");
        cache.try_begin_request(&claim).expect("claim");

        assert_eq!(cache.invalidate_kind(EntityKind::Leads), 2);
        assert_eq!(cache.len(), 1);
        assert!(!cache.is_in_flight(&claim));
        assert!(cache.get(&key(EntityKind::Contacts, "a")).is_some());
    }
}
