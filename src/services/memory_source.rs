//! In-Memory Source
//!
//! Reference `PageSource` that evaluates `ListQuery` criteria over a local
//! vector. Used by the demo binary and as the test double for loaders:
//! failures can be queued with [`InMemorySource::fail_next`] and an artificial
//! latency makes concurrent calls observable.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use parking_lot::{Mutex, RwLock};

use super::source::{FetchResult, PageSource};
use crate::domain::filter::ListQuery;
use crate::domain::page::{Page, PageRequest};
use crate::domain::record::Record;
use crate::error::FetchError;

/// Page source backed by a vector of records
pub struct InMemorySource<T> {
    records: RwLock<Vec<T>>,
    failures: Mutex<VecDeque<FetchError>>,
    latency: Option<Duration>,
    calls: AtomicU32,
}

impl<T: Record + Clone + Send + Sync + 'static> InMemorySource<T> {
    pub fn new(records: Vec<T>) -> Self {
        Self {
            records: RwLock::new(records),
            failures: Mutex::new(VecDeque::new()),
            latency: None,
            calls: AtomicU32::new(0),
        }
    }

    /// Delay every fetch by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Make the next fetch fail with `error`; queued failures are used in order
    pub fn fail_next(&self, error: FetchError) {
        self.failures.lock().push_back(error);
    }

    /// Add a record
    pub fn insert(&self, record: T) {
        self.records.write().push(record);
    }

    /// Remove every record with the given key; returns how many were removed
    pub fn remove(&self, key: &T::Key) -> usize {
        let mut records = self.records.write();
        let before = records.len();
        records.retain(|r| &r.key() != key);
        before - records.len()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Number of `fetch_page` calls so far, failed ones included
    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Filter, sort and slice synchronously
    pub fn query(&self, request: &PageRequest<ListQuery>) -> Page<T> {
        let records = self.records.read();
        let mut matching: Vec<&T> = records
            .iter()
            .filter(|r| request.filters.filters.matches(*r))
            .collect();
        matching.sort_by(|a, b| request.filters.sort.compare(*a, *b));

        let total_count = matching.len() as u64;
        let start = usize::try_from(request.offset()).unwrap_or(usize::MAX);
        let items = matching
            .into_iter()
            .skip(start)
            .take(request.page_size as usize)
            .cloned()
            .collect();

        Page::new(items, request.page_number, request.page_size, total_count)
    }
}

impl<T: Record + Clone + Send + Sync + 'static> PageSource for InMemorySource<T> {
    type Item = T;
    type Filters = ListQuery;

    fn fetch_page(&self, request: PageRequest<ListQuery>) -> BoxFuture<'_, FetchResult<T>> {
        async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(latency) = self.latency {
                tokio::time::sleep(latency).await;
            }
            if let Some(error) = self.failures.lock().pop_front() {
                return Err(error);
            }
            Ok(self.query(&request))
        }
        .boxed()
    }
}

impl<T> std::fmt::Debug for InMemorySource<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemorySource")
            .field("records", &self.records.read().len())
            .field("queued_failures", &self.failures.lock().len())
            .field("calls", &self.calls.load(Ordering::SeqCst))
            .finish()
    }
}
