//! Page Cursor
//!
//! Synchronous state machine behind infinite-scroll lists. It decides which
//! page to request next, accumulates loaded pages in order, and guards
//! against duplicate and stale responses. It never performs I/O itself; the
//! async driver in `services::paged_loader` runs the fetch between
//! [`PageCursor::begin_next`] and [`PageCursor::apply_page`] /
//! [`PageCursor::apply_failure`].
//!
//! ```text
//! begin_next ──► NextFetch::Fetch(pending) ──► source.fetch_page(pending.request)
//!     │                                               │
//!     │ (exhausted / in flight)                       ├─ Ok(page)  ──► apply_page
//!     ▼                                               └─ Err(e)    ──► apply_failure
//! NextFetch::Skip
//! ```
//!
//! Every session (filters + page size) has an epoch. `reset` bumps it, so a
//! response captured under an older epoch is discarded on arrival.

use std::sync::Arc;
use std::time::{Duration, Instant};

use ahash::AHashSet;

use crate::constants::DEFAULT_STALE_TIME_SECS;
use crate::domain::page::{Page, PageRequest, total_pages};
use crate::domain::record::Identified;
use crate::error::FetchError;

/// Loading state of a paged list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LoadState {
    /// Nothing requested in this session yet
    #[default]
    Idle,
    /// A page is being fetched
    Loading,
    /// The last fetch succeeded
    Loaded,
    /// The last fetch failed; retrying is safe
    Error(Arc<str>),
}

impl LoadState {
    /// Check if currently loading
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    /// Check if the last fetch failed
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

/// Identity of one outstanding page request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageTicket {
    /// Session the request was issued in
    pub epoch: u64,
    /// Page requested
    pub page_number: u32,
}

/// A fetch the caller has to run
#[derive(Debug, Clone)]
pub struct PendingFetch<F> {
    pub ticket: PageTicket,
    pub request: PageRequest<F>,
}

/// Why `begin_next` did not start a fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Every page of the collection is loaded
    Exhausted,
    /// A fetch for the next page is already running
    InFlight,
}

/// Result of `begin_next`
#[derive(Debug, Clone)]
pub enum NextFetch<F> {
    Fetch(PendingFetch<F>),
    Skip(SkipReason),
}

/// Result of applying a page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// The page was appended to the list
    Appended {
        page_number: u32,
        appended: usize,
        duplicates: usize,
    },
    /// The page belongs to an older session and was dropped
    Stale,
}

/// Read-only view of a paged list for render surfaces
#[derive(Debug, Clone, PartialEq)]
pub struct AccumulatedList<T> {
    pub items: Vec<T>,
    pub has_more: bool,
    pub is_fetching_next: bool,
    pub current_page: u32,
    pub total_count: Option<u64>,
    pub load_state: LoadState,
}

/// Page-by-page cursor over a filtered remote collection
#[derive(Debug)]
pub struct PageCursor<T: Identified, F> {
    /// Criteria of the current session
    filters: F,
    /// Items per page
    page_size: u32,
    /// Loaded items in page order, de-duplicated by key
    items: Vec<T>,
    /// Keys of `items`
    seen: AHashSet<T::Key>,
    /// Last loaded page (0 before the first)
    current_page: u32,
    /// Total reported by the most recent page
    total_count: Option<u64>,
    /// Request currently outstanding
    in_flight: Option<PageTicket>,
    /// Session generation, bumped on every reset
    epoch: u64,
    /// Current loading state
    load_state: LoadState,
    /// When the most recent page arrived
    fetched_at: Option<Instant>,
    /// Age after which loaded pages count as stale
    stale_time: Duration,
}

impl<T: Identified, F: Clone + PartialEq> PageCursor<T, F> {
    /// Create a cursor for a fresh session; a zero page size is clamped to 1
    pub fn new(filters: F, page_size: u32) -> Self {
        Self {
            filters,
            page_size: page_size.max(1),
            items: Vec::new(),
            seen: AHashSet::new(),
            current_page: 0,
            total_count: None,
            in_flight: None,
            epoch: 0,
            load_state: LoadState::Idle,
            fetched_at: None,
            stale_time: Duration::from_secs(DEFAULT_STALE_TIME_SECS),
        }
    }

    /// Set the staleness TTL
    pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = stale_time;
        self
    }

    pub fn set_stale_time(&mut self, stale_time: Duration) {
        self.stale_time = stale_time;
    }

    // ==================== Getters ====================

    pub fn filters(&self) -> &F {
        &self.filters
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Loaded items in page order
    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Last loaded page, 0 before the first page arrives
    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    /// Total items reported by the source, unknown before the first page
    pub fn total_count(&self) -> Option<u64> {
        self.total_count
    }

    /// Total pages, unknown before the first page
    pub fn total_pages(&self) -> Option<u32> {
        self.total_count.map(|count| total_pages(count, self.page_size))
    }

    /// Whether another page can be requested
    ///
    /// True before the first page, then `current_page < total_pages`.
    pub fn has_more(&self) -> bool {
        self.total_pages().is_none_or(|pages| self.current_page < pages)
    }

    pub fn is_fetching_next(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn load_state(&self) -> &LoadState {
        &self.load_state
    }

    pub fn fetched_at(&self) -> Option<Instant> {
        self.fetched_at
    }

    /// Whether the loaded pages are older than the TTL at `now`
    ///
    /// Nothing loaded is never stale. Expiry does not evict anything; it only
    /// tells the caller a background refresh may be worth triggering.
    pub fn is_stale_at(&self, now: Instant) -> bool {
        self.fetched_at
            .is_some_and(|at| now.saturating_duration_since(at) >= self.stale_time)
    }

    pub fn is_stale(&self) -> bool {
        self.is_stale_at(Instant::now())
    }

    /// Clone the list state for a render surface
    pub fn snapshot(&self) -> AccumulatedList<T>
    where
        T: Clone,
    {
        AccumulatedList {
            items: self.items.clone(),
            has_more: self.has_more(),
            is_fetching_next: self.is_fetching_next(),
            current_page: self.current_page,
            total_count: self.total_count,
            load_state: self.load_state.clone(),
        }
    }

    // ==================== Transitions ====================

    /// Start fetching the next page, unless exhausted or already fetching
    pub fn begin_next(&mut self) -> NextFetch<F> {
        if !self.has_more() {
            return NextFetch::Skip(SkipReason::Exhausted);
        }
        if self.in_flight.is_some() {
            return NextFetch::Skip(SkipReason::InFlight);
        }

        let ticket = PageTicket {
            epoch: self.epoch,
            page_number: self.current_page + 1,
        };
        self.in_flight = Some(ticket);
        self.load_state = LoadState::Loading;

        NextFetch::Fetch(PendingFetch {
            ticket,
            request: PageRequest::new(ticket.page_number, self.page_size, self.filters.clone()),
        })
    }

    /// Append a fetched page, or drop it if its session is gone
    pub fn apply_page(&mut self, ticket: PageTicket, page: Page<T>) -> Applied {
        self.apply_page_at(ticket, page, Instant::now())
    }

    /// [`Self::apply_page`] with an explicit arrival time
    pub fn apply_page_at(&mut self, ticket: PageTicket, page: Page<T>, now: Instant) -> Applied {
        if !self.is_current(ticket) {
            tracing::debug!(
                epoch = ticket.epoch,
                current_epoch = self.epoch,
                page = ticket.page_number,
                "Discarding stale page"
            );
            return Applied::Stale;
        }

        if page.page_number != ticket.page_number {
            tracing::warn!(
                requested = ticket.page_number,
                returned = page.page_number,
                "Source returned a different page number than requested"
            );
        }

        let mut appended = 0;
        let mut duplicates = 0;
        for item in page.items {
            if self.seen.insert(item.key()) {
                self.items.push(item);
                appended += 1;
            } else {
                duplicates += 1;
            }
        }

        self.in_flight = None;
        self.current_page = ticket.page_number;
        self.total_count = Some(page.total_count);
        self.fetched_at = Some(now);
        self.load_state = LoadState::Loaded;

        Applied::Appended {
            page_number: ticket.page_number,
            appended,
            duplicates,
        }
    }

    /// Record a failed fetch; returns false if the ticket is stale
    ///
    /// Items, current page and `has_more` are left untouched so the same page
    /// is requested again on the next `begin_next`.
    pub fn apply_failure(&mut self, ticket: PageTicket, error: &FetchError) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.in_flight = None;
        self.load_state = LoadState::Error(error.to_string().into());
        true
    }

    /// Forget an outstanding request whose result will never be applied
    ///
    /// Used when the fetching future is dropped. Returns false if the ticket
    /// is stale.
    pub fn abandon(&mut self, ticket: PageTicket) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.in_flight = None;
        self.load_state = if self.fetched_at.is_some() {
            LoadState::Loaded
        } else {
            LoadState::Idle
        };
        true
    }

    /// Start a new session if the filters differ, or unconditionally for `None`
    ///
    /// Returns whether the session was reset.
    pub fn reset(&mut self, new_filters: Option<F>) -> bool {
        match new_filters {
            Some(filters) if filters == self.filters => return false,
            Some(filters) => self.filters = filters,
            None => {}
        }
        self.clear_session();
        true
    }

    /// Change the page size; a different size starts a new session
    pub fn set_page_size(&mut self, page_size: u32) -> bool {
        let page_size = page_size.max(1);
        if page_size == self.page_size {
            return false;
        }
        self.page_size = page_size;
        self.clear_session();
        true
    }

    /// Replace the session contents with previously cached pages
    pub fn hydrate(
        &mut self,
        items: Vec<T>,
        pages_loaded: u32,
        total_count: u64,
        fetched_at: Instant,
    ) {
        self.clear_session();
        for item in items {
            if self.seen.insert(item.key()) {
                self.items.push(item);
            }
        }
        self.current_page = pages_loaded;
        self.total_count = Some(total_count);
        self.fetched_at = Some(fetched_at);
        self.load_state = LoadState::Loaded;
    }

    fn is_current(&self, ticket: PageTicket) -> bool {
        ticket.epoch == self.epoch && self.in_flight == Some(ticket)
    }

    fn clear_session(&mut self) {
        self.items.clear();
        self.seen.clear();
        self.current_page = 0;
        self.total_count = None;
        self.in_flight = None;
        self.epoch += 1;
        self.load_state = LoadState::Idle;
        self.fetched_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item(u32);

    impl Identified for Item {
        type Key = u32;

        fn key(&self) -> u32 {
            self.0
        }
    }

    fn items(range: std::ops::Range<u32>) -> Vec<Item> {
        range.map(Item).collect()
    }

    fn begin(cursor: &mut PageCursor<Item, &'static str>) -> PendingFetch<&'static str> {
        match cursor.begin_next() {
            NextFetch::Fetch(pending) => pending,
            NextFetch::Skip(reason) => panic!("expected a fetch, got {reason:?}"),
        }
    }

    fn load(cursor: &mut PageCursor<Item, &'static str>, page_items: Vec<Item>, total: u64) -> Applied {
        let pending = begin(cursor);
        let page = Page::new(page_items, pending.request.page_number, pending.request.page_size, total);
        cursor.apply_page(pending.ticket, page)
    }

    #[test]
    fn test_three_page_scenario() {
        let mut cursor = PageCursor::<Item, _>::new("all", 20);
        assert!(cursor.has_more());
        assert_eq!(cursor.total_pages(), None);

        load(&mut cursor, items(0..20), 45);
        assert_eq!(cursor.total_pages(), Some(3));
        assert!(cursor.has_more());

        load(&mut cursor, items(20..40), 45);
        load(&mut cursor, items(40..45), 45);
        assert_eq!(cursor.len(), 45);
        assert_eq!(cursor.current_page(), 3);
        assert!(!cursor.has_more());
        assert!(matches!(cursor.begin_next(), NextFetch::Skip(SkipReason::Exhausted)));
        assert!(!cursor.is_fetching_next());
    }

    #[test]
    fn test_second_begin_while_in_flight_is_noop() {
        let mut cursor = PageCursor::<Item, _>::new("all", 10);
        let pending = begin(&mut cursor);
        assert_eq!(pending.request.page_number, 1);
        assert!(cursor.is_fetching_next());
        assert!(cursor.load_state().is_loading());
        assert!(matches!(cursor.begin_next(), NextFetch::Skip(SkipReason::InFlight)));
        assert!(matches!(cursor.begin_next(), NextFetch::Skip(SkipReason::InFlight)));
    }

    #[test]
    fn test_pages_requested_in_order() {
        let mut cursor = PageCursor::<Item, _>::new("all", 2);
        let mut requested = Vec::new();
        for chunk in 0..4u32 {
            let pending = begin(&mut cursor);
            requested.push(pending.request.page_number);
            let page = Page::new(items(chunk * 2..chunk * 2 + 2), pending.request.page_number, 2, 8);
            cursor.apply_page(pending.ticket, page);
        }
        assert_eq!(requested, vec![1, 2, 3, 4]);
        assert_eq!(cursor.items(), items(0..8).as_slice());
    }

    #[test]
    fn test_failure_leaves_state_retry_safe() {
        let mut cursor = PageCursor::<Item, _>::new("all", 10);
        load(&mut cursor, items(0..10), 30);
        let before = cursor.snapshot();

        let pending = begin(&mut cursor);
        assert_eq!(pending.request.page_number, 2);
        let error = FetchError::Network {
            message: "connection reset".into(),
        };
        assert!(cursor.apply_failure(pending.ticket, &error));

        assert_eq!(cursor.items(), before.items.as_slice());
        assert_eq!(cursor.current_page(), before.current_page);
        assert_eq!(cursor.has_more(), before.has_more);
        assert!(!cursor.is_fetching_next());
        assert!(cursor.load_state().is_error());

        // The retry asks for the same page, not a skipped one
        let retry = begin(&mut cursor);
        assert_eq!(retry.request.page_number, 2);
    }

    #[test]
    fn test_duplicates_across_pages_dropped() {
        let mut cursor = PageCursor::<Item, _>::new("all", 3);
        load(&mut cursor, items(0..3), 6);
        // A new row shifted the second page by one, so item 2 shows up again
        let applied = load(&mut cursor, vec![Item(2), Item(3), Item(4)], 7);
        assert_eq!(
            applied,
            Applied::Appended {
                page_number: 2,
                appended: 2,
                duplicates: 1
            }
        );
        assert_eq!(cursor.items(), items(0..5).as_slice());
    }

    #[test]
    fn test_reset_discards_late_response() {
        let mut cursor = PageCursor::<Item, _>::new("stage=nuevo", 10);
        let pending = begin(&mut cursor);

        assert!(cursor.reset(Some("stage=cualificado")));
        assert!(!cursor.is_fetching_next());

        let late = Page::new(items(0..10), 1, 10, 50);
        assert_eq!(cursor.apply_page(pending.ticket, late), Applied::Stale);
        assert!(cursor.is_empty());
        assert_eq!(cursor.total_count(), None);
        assert!(!cursor.apply_failure(pending.ticket, &FetchError::Timeout { elapsed_ms: 5 }));

        // The new session starts again at page 1
        let fresh = begin(&mut cursor);
        assert_eq!(fresh.request.page_number, 1);
        assert_eq!(fresh.request.filters, "stage=cualificado");
        assert_ne!(fresh.ticket.epoch, pending.ticket.epoch);
    }

    #[test]
    fn test_reset_with_equal_filters_keeps_session() {
        let mut cursor = PageCursor::<Item, _>::new("all", 10);
        load(&mut cursor, items(0..10), 20);
        let epoch = cursor.epoch();

        assert!(!cursor.reset(Some("all")));
        assert_eq!(cursor.len(), 10);
        assert_eq!(cursor.epoch(), epoch);

        // Explicit refresh always clears
        assert!(cursor.reset(None));
        assert!(cursor.is_empty());
        assert_eq!(cursor.current_page(), 0);
        assert!(cursor.has_more());
        assert_eq!(cursor.load_state(), &LoadState::Idle);
    }

    #[test]
    fn test_abandon_releases_in_flight() {
        let mut cursor = PageCursor::<Item, _>::new("all", 10);
        let pending = begin(&mut cursor);
        assert!(cursor.abandon(pending.ticket));
        assert!(!cursor.is_fetching_next());
        assert_eq!(cursor.load_state(), &LoadState::Idle);
        assert!(!cursor.abandon(pending.ticket));

        load(&mut cursor, items(0..10), 20);
        let pending = begin(&mut cursor);
        assert!(cursor.abandon(pending.ticket));
        assert_eq!(cursor.load_state(), &LoadState::Loaded);
        assert_eq!(begin(&mut cursor).request.page_number, 2);
    }

    #[test]
    fn test_page_size_change_resets() {
        let mut cursor = PageCursor::<Item, _>::new("all", 10);
        load(&mut cursor, items(0..10), 20);
        assert!(!cursor.set_page_size(10));
        assert!(cursor.set_page_size(25));
        assert!(cursor.is_empty());
        assert_eq!(begin(&mut cursor).request.page_size, 25);
        assert_eq!(PageCursor::<Item, ()>::new((), 0).page_size(), 1);
    }

    #[test]
    fn test_empty_collection_has_no_more() {
        let mut cursor = PageCursor::<Item, _>::new("none", 20);
        load(&mut cursor, Vec::new(), 0);
        assert_eq!(cursor.total_pages(), Some(0));
        assert!(!cursor.has_more());
        assert_eq!(cursor.load_state(), &LoadState::Loaded);
    }

    #[test]
    fn test_staleness() {
        let mut cursor = PageCursor::<Item, _>::new("all", 10).with_stale_time(Duration::from_secs(60));
        let start = Instant::now();
        assert!(!cursor.is_stale_at(start));

        let pending = begin(&mut cursor);
        cursor.apply_page_at(pending.ticket, Page::new(items(0..10), 1, 10, 10), start);
        assert!(!cursor.is_stale_at(start + Duration::from_secs(59)));
        assert!(cursor.is_stale_at(start + Duration::from_secs(60)));
        // Stale pages stay in place
        assert_eq!(cursor.len(), 10);
    }

    #[test]
    fn test_hydrate_restores_session() {
        let mut cursor = PageCursor::<Item, _>::new("all", 10);
        let epoch = cursor.epoch();
        cursor.hydrate(items(0..20), 2, 35, Instant::now());

        assert_ne!(cursor.epoch(), epoch);
        assert_eq!(cursor.len(), 20);
        assert_eq!(cursor.current_page(), 2);
        assert!(cursor.has_more());
        assert_eq!(begin(&mut cursor).request.page_number, 3);
    }
}
