//! Traced Source
//!
//! Logging middleware around a page source. Each fetch runs inside a
//! `fetch_page` span carrying the source name, page number and size, and its
//! outcome is logged with the elapsed time.

use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use futures::future::BoxFuture;
use tracing::Instrument;

use super::source::{FetchResult, PageSource};
use crate::domain::page::PageRequest;

/// Source decorator that records every fetch
#[derive(Debug)]
pub struct TracedSource<S> {
    inner: S,
    name: Arc<str>,
}

impl<S: PageSource> TracedSource<S> {
    pub fn new(name: impl Into<Arc<str>>, inner: S) -> Self {
        Self {
            inner,
            name: name.into(),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: PageSource> PageSource for TracedSource<S> {
    type Item = S::Item;
    type Filters = S::Filters;

    fn fetch_page(&self, request: PageRequest<S::Filters>) -> BoxFuture<'_, FetchResult<S::Item>> {
        let span = tracing::debug_span!(
            "fetch_page",
            source = %self.name,
            page = request.page_number,
            page_size = request.page_size,
        );
        let filters = format!("{:?}", request.filters);

        async move {
            let started = Instant::now();
            tracing::trace!(filters = %filters, "Fetching page");
            let result = self.inner.fetch_page(request).await;
            let elapsed_ms = started.elapsed().as_millis() as u64;
            match &result {
                Ok(page) => tracing::debug!(
                    items = page.len(),
                    total_count = page.total_count,
                    elapsed_ms,
                    "Page fetched"
                ),
                Err(error) => tracing::warn!(
                    kind = error.kind(),
                    error = %error,
                    elapsed_ms,
                    "Page fetch failed"
                ),
            }
            result
        }
        .instrument(span)
        .boxed()
    }
}
