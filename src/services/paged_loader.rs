//! Paged Loader
//!
//! Async driver that runs a [`PageCursor`] against a [`PageSource`].
//!
//! ## Pattern
//!
//! ```text
//! load_next_page()
//!       │  lock cursor ─► begin_next ─► unlock
//!       ▼
//! source.fetch_page(request).await        (no lock held)
//!       │
//!       ▼  lock cursor ─► apply_page / apply_failure ─► unlock
//! LoadOutcome / Error::Fetch
//! ```
//!
//! The cursor lock is never held across an `.await`, so render code can read
//! snapshots while a page is in flight. A second `load_next_page` during a
//! fetch returns `Skipped(InFlight)` without touching the source.
//!
//! With a [`SharedQueryCache`] attached, loaders showing the same query share
//! pages: a fresh entry is hydrated instead of fetched, each applied page is
//! written back, and only one loader per key fetches at a time. Starting a
//! new session releases the claim of the abandoned fetch, so its late
//! response neither blocks the new session nor overwrites the cache.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::notify::{NoopNotifier, Notice, Notifier};
use super::source::PageSource;
use crate::domain::config::{FetchPolicy, PaginationConfig};
use crate::domain::lead::EntityKind;
use crate::domain::record::Identified;
use crate::error::{Error, Result};
use crate::state::{
    AccumulatedList, Applied, CacheEntry, LoadState, NextFetch, PageCursor, PageTicket, QueryKey,
    SharedQueryCache, SkipReason,
};

/// Result of `load_next_page`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A page was fetched and appended
    Loaded { page: u32, appended: usize },
    /// Pages were taken from the shared cache instead of the source
    Hydrated { pages: u32 },
    /// Nothing was fetched
    Skipped(SkipReason),
    /// The response arrived after a reset and was dropped
    Discarded,
}

/// Infinite-scroll list bound to one page source
pub struct PagedLoader<S: PageSource> {
    kind: EntityKind,
    source: S,
    cursor: Mutex<PageCursor<S::Item, S::Filters>>,
    fetch_policy: FetchPolicy,
    cache: Option<SharedQueryCache<S::Item>>,
    /// Cache claim of the fetch in flight, if any
    claim: Mutex<Option<(QueryKey, u64)>>,
    notifier: Arc<dyn Notifier>,
}

impl<S: PageSource> PagedLoader<S> {
    /// Create a loader with default paging settings
    pub fn new(kind: EntityKind, source: S, filters: S::Filters) -> Self {
        Self::from_config(kind, source, filters, &PaginationConfig::default())
    }

    /// Create a loader from the paging section of the app config
    pub fn from_config(
        kind: EntityKind,
        source: S,
        filters: S::Filters,
        config: &PaginationConfig,
    ) -> Self {
        let cursor = PageCursor::new(filters, config.page_size).with_stale_time(config.stale_time());
        Self {
            kind,
            source,
            cursor: Mutex::new(cursor),
            fetch_policy: config.fetch_policy,
            cache: None,
            claim: Mutex::new(None),
            notifier: Arc::new(NoopNotifier),
        }
    }

    /// Share pages with other loaders through `cache`
    pub fn with_cache(mut self, cache: SharedQueryCache<S::Item>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Send failure notices to `notifier`
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_fetch_policy(mut self, fetch_policy: FetchPolicy) -> Self {
        self.fetch_policy = fetch_policy;
        self
    }

    pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
        self.cursor.get_mut().set_stale_time(stale_time);
        self
    }

    // ==================== Getters ====================

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn cache(&self) -> Option<&SharedQueryCache<S::Item>> {
        self.cache.as_ref()
    }

    pub fn fetch_policy(&self) -> FetchPolicy {
        self.fetch_policy
    }

    pub fn filters(&self) -> S::Filters {
        self.cursor.lock().filters().clone()
    }

    pub fn page_size(&self) -> u32 {
        self.cursor.lock().page_size()
    }

    pub fn len(&self) -> usize {
        self.cursor.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cursor.lock().is_empty()
    }

    pub fn has_more(&self) -> bool {
        self.cursor.lock().has_more()
    }

    pub fn is_fetching_next(&self) -> bool {
        self.cursor.lock().is_fetching_next()
    }

    pub fn current_page(&self) -> u32 {
        self.cursor.lock().current_page()
    }

    pub fn load_state(&self) -> LoadState {
        self.cursor.lock().load_state().clone()
    }

    /// Whether the loaded pages are past their stale time
    pub fn is_stale(&self) -> bool {
        self.cursor.lock().is_stale()
    }

    pub fn is_stale_at(&self, now: Instant) -> bool {
        self.cursor.lock().is_stale_at(now)
    }

    /// Clone the list state for a render surface
    pub fn snapshot(&self) -> AccumulatedList<S::Item> {
        self.cursor.lock().snapshot()
    }

    /// Borrow the loaded items without cloning them
    pub fn with_items<R>(&self, f: impl FnOnce(&[S::Item]) -> R) -> R {
        f(self.cursor.lock().items())
    }

    /// Cache key of the current session
    pub fn query_key(&self) -> Result<QueryKey> {
        let cursor = self.cursor.lock();
        QueryKey::new(self.kind, cursor.filters(), cursor.page_size())
    }

    // ==================== Operations ====================

    /// Fetch the next page, unless every page is loaded or one is in flight
    ///
    /// A failed fetch leaves items and page position untouched, sends an
    /// error notice and returns `Error::Fetch`; calling again retries the
    /// same page.
    pub async fn load_next_page(&self) -> Result<LoadOutcome> {
        let (pending, claim) = {
            let mut cursor = self.cursor.lock();
            if !cursor.has_more() {
                return Ok(LoadOutcome::Skipped(SkipReason::Exhausted));
            }
            if cursor.is_fetching_next() {
                return Ok(LoadOutcome::Skipped(SkipReason::InFlight));
            }

            let mut claim = None;
            if let Some(cache) = &self.cache {
                let key = QueryKey::new(self.kind, cursor.filters(), cursor.page_size())?;
                let mut cache = cache.lock();
                let ahead = cache
                    .get_fresh(&key, Instant::now())
                    .filter(|entry| entry.pages_loaded > cursor.current_page());
                if let Some(entry) = ahead {
                    let pages = entry.pages_loaded;
                    cursor.hydrate(entry.items, pages, entry.total_count, entry.fetched_at);
                    tracing::debug!(key = %key, pages, "Caught up from query cache");
                    return Ok(LoadOutcome::Hydrated { pages });
                }
                match cache.try_begin_request(&key) {
                    Some(id) => claim = Some((key, id)),
                    None => return Ok(LoadOutcome::Skipped(SkipReason::InFlight)),
                }
            }

            match cursor.begin_next() {
                NextFetch::Fetch(pending) => {
                    *self.claim.lock() = claim.clone();
                    (pending, claim)
                }
                NextFetch::Skip(reason) => {
                    if let (Some(cache), Some((key, id))) = (&self.cache, claim) {
                        cache.lock().finish_request(&key, id);
                    }
                    return Ok(LoadOutcome::Skipped(reason));
                }
            }
        };

        let ticket = pending.ticket;
        tracing::debug!(
            kind = self.kind.as_str(),
            page = ticket.page_number,
            epoch = ticket.epoch,
            "Loading page"
        );

        let mut guard = FetchGuard {
            cursor: &self.cursor,
            cache: self.cache.as_ref(),
            held: &self.claim,
            ticket: Some(ticket),
            claim,
        };
        let result = self.source.fetch_page(pending.request).await;
        let claim = guard.disarm();

        let mut cursor = self.cursor.lock();
        let write_back = match (&self.cache, claim) {
            (Some(cache), Some((key, id))) => {
                forget_claim(&self.claim, id);
                cache.lock().finish_request(&key, id).then_some(key)
            }
            _ => None,
        };

        match result {
            Ok(page) => match cursor.apply_page(ticket, page) {
                Applied::Appended {
                    page_number,
                    appended,
                    duplicates,
                } => {
                    if duplicates > 0 {
                        tracing::debug!(page = page_number, duplicates, "Dropped duplicate items");
                    }
                    if let (Some(cache), Some(key)) = (&self.cache, write_back) {
                        cache.lock().store(
                            key,
                            CacheEntry {
                                items: cursor.items().to_vec(),
                                total_count: cursor.total_count().unwrap_or_default(),
                                pages_loaded: cursor.current_page(),
                                fetched_at: cursor.fetched_at().unwrap_or_else(Instant::now),
                            },
                        );
                    }
                    Ok(LoadOutcome::Loaded {
                        page: page_number,
                        appended,
                    })
                }
                Applied::Stale => Ok(LoadOutcome::Discarded),
            },
            Err(source) => {
                if !cursor.apply_failure(ticket, &source) {
                    tracing::debug!(page = ticket.page_number, error = %source, "Ignoring failure of stale request");
                    return Ok(LoadOutcome::Discarded);
                }
                drop(cursor);

                tracing::error!(
                    kind = self.kind.as_str(),
                    page = ticket.page_number,
                    error = %source,
                    "Failed to load page"
                );
                self.notifier.notify(Notice::error(
                    format!("Could not load {}", self.kind.as_str()),
                    source.to_string(),
                ));
                Err(Error::Fetch {
                    page: ticket.page_number,
                    source,
                })
            }
        }
    }

    /// Switch to new filters, or refresh the current ones with `None`
    ///
    /// Equal filters keep the loaded pages. A refresh also drops the cached
    /// pages of the query, so the source is asked again. Returns whether the
    /// session was reset; with the eager policy page 1 is loaded before
    /// returning.
    pub async fn reset(&self, filters: Option<S::Filters>) -> Result<bool> {
        let changed = {
            let mut cursor = self.cursor.lock();
            if let (None, Some(cache)) = (&filters, &self.cache) {
                let key = QueryKey::new(self.kind, cursor.filters(), cursor.page_size())?;
                cache.lock().invalidate(&key);
            }
            let changed = cursor.reset(filters);
            if changed {
                self.release_claim();
            }
            changed
        };
        if changed {
            self.after_reset().await?;
        }
        Ok(changed)
    }

    /// Drop the cached pages of this query and start over from page 1
    pub async fn refresh(&self) -> Result<()> {
        self.reset(None).await.map(|_| ())
    }

    /// Change the page size; a different size starts a new session
    pub async fn set_page_size(&self, page_size: u32) -> Result<bool> {
        let changed = {
            let mut cursor = self.cursor.lock();
            let changed = cursor.set_page_size(page_size);
            if changed {
                self.release_claim();
            }
            changed
        };
        if changed {
            self.after_reset().await?;
        }
        Ok(changed)
    }

    /// Give up the cache claim of a fetch whose session was just cleared
    fn release_claim(&self) {
        let claim = self.claim.lock().take();
        if let (Some(cache), Some((key, id))) = (&self.cache, claim) {
            if cache.lock().finish_request(&key, id) {
                tracing::debug!(key = %key, "Released claim of abandoned fetch");
            }
        }
    }

    async fn after_reset(&self) -> Result<()> {
        if self.hydrate_from_cache()?.is_some() {
            return Ok(());
        }
        if self.fetch_policy == FetchPolicy::Eager {
            self.load_next_page().await?;
        }
        Ok(())
    }

    /// Fill an empty session from a fresh cache entry
    fn hydrate_from_cache(&self) -> Result<Option<u32>> {
        let Some(cache) = &self.cache else {
            return Ok(None);
        };
        let mut cursor = self.cursor.lock();
        if cursor.current_page() > 0 || cursor.is_fetching_next() {
            return Ok(None);
        }
        let key = QueryKey::new(self.kind, cursor.filters(), cursor.page_size())?;
        let Some(entry) = cache.lock().get_fresh(&key, Instant::now()) else {
            return Ok(None);
        };
        let pages = entry.pages_loaded;
        cursor.hydrate(entry.items, pages, entry.total_count, entry.fetched_at);
        tracing::debug!(key = %key, pages, "Hydrated from query cache");
        Ok(Some(pages))
    }
}

impl<S: PageSource> std::fmt::Debug for PagedLoader<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cursor = self.cursor.lock();
        f.debug_struct("PagedLoader")
            .field("kind", &self.kind)
            .field("items", &cursor.len())
            .field("current_page", &cursor.current_page())
            .field("load_state", cursor.load_state())
            .field("cached", &self.cache.is_some())
            .finish()
    }
}

/// Clear the loader's record of claim `id`, unless a newer claim replaced it
fn forget_claim(held: &Mutex<Option<(QueryKey, u64)>>, id: u64) {
    let mut held = held.lock();
    if held.as_ref().is_some_and(|(_, current)| *current == id) {
        *held = None;
    }
}

/// Releases the in-flight marks if the fetching future is dropped
struct FetchGuard<'a, T: Identified + Clone, F: Clone + PartialEq> {
    cursor: &'a Mutex<PageCursor<T, F>>,
    cache: Option<&'a SharedQueryCache<T>>,
    held: &'a Mutex<Option<(QueryKey, u64)>>,
    ticket: Option<PageTicket>,
    claim: Option<(QueryKey, u64)>,
}

impl<T: Identified + Clone, F: Clone + PartialEq> FetchGuard<'_, T, F> {
    /// The fetch completed; hand the cache claim back to the caller
    fn disarm(&mut self) -> Option<(QueryKey, u64)> {
        self.ticket = None;
        self.claim.take()
    }
}

impl<T: Identified + Clone, F: Clone + PartialEq> Drop for FetchGuard<'_, T, F> {
    fn drop(&mut self) {
        if let Some(ticket) = self.ticket.take() {
            let abandoned = self.cursor.lock().abandon(ticket);
            if abandoned {
                tracing::debug!(page = ticket.page_number, "Page fetch abandoned");
            }
        }
        if let (Some(cache), Some((key, id))) = (self.cache, self.claim.take()) {
            forget_claim(self.held, id);
            cache.lock().finish_request(&key, id);
        }
    }
}
