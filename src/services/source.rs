//! PageSource Trait
//!
//! Abstraction over the backend a paged list reads from. Production code
//! talks to the remote data service; tests and the demo use
//! [`super::InMemorySource`]. Decorators add retries and tracing without the
//! loader knowing.

use std::fmt::Debug;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::Serialize;

use crate::domain::page::{Page, PageRequest};
use crate::domain::record::Identified;
use crate::error::FetchError;

/// Result of a single page fetch
pub type FetchResult<T> = Result<Page<T>, FetchError>;

/// Backend that serves one page of a filtered collection at a time
pub trait PageSource: Send + Sync + 'static {
    type Item: Identified + Clone + Send + Sync + 'static;
    type Filters: Clone + PartialEq + Debug + Serialize + Send + Sync + 'static;

    /// Fetch the page described by `request`
    ///
    /// Pages past the end come back empty with the current total.
    fn fetch_page(&self, request: PageRequest<Self::Filters>) -> BoxFuture<'_, FetchResult<Self::Item>>;
}

impl<S: PageSource> PageSource for Arc<S> {
    type Item = S::Item;
    type Filters = S::Filters;

    fn fetch_page(&self, request: PageRequest<Self::Filters>) -> BoxFuture<'_, FetchResult<Self::Item>> {
        (**self).fetch_page(request)
    }
}
