//! Page Types
//!
//! One fixed-size batch of a remote ordered collection, and the request that
//! produced it. Page numbers are 1-based everywhere in this crate.

use serde::{Deserialize, Serialize};

/// Request for one page of a filtered collection
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PageRequest<F> {
    /// 1-based page number
    pub page_number: u32,
    /// Maximum items per page
    pub page_size: u32,
    /// Criteria the collection is filtered and ordered by
    pub filters: F,
}

impl<F> PageRequest<F> {
    pub fn new(page_number: u32, page_size: u32, filters: F) -> Self {
        Self {
            page_number,
            page_size,
            filters,
        }
    }

    /// Zero-based index of the first item of this page
    pub fn offset(&self) -> u64 {
        u64::from(self.page_number.saturating_sub(1)) * u64::from(self.page_size)
    }
}

/// One page of results
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Items of this page in source order
    pub items: Vec<T>,
    /// 1-based page number
    pub page_number: u32,
    /// Page size the page was requested with
    pub page_size: u32,
    /// Total items across all pages
    pub total_count: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, page_number: u32, page_size: u32, total_count: u64) -> Self {
        Self {
            items,
            page_number,
            page_size,
            total_count,
        }
    }

    /// `ceil(total_count / page_size)`
    pub fn total_pages(&self) -> u32 {
        total_pages(self.total_count, self.page_size)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// `ceil(total_count / page_size)`, with a zero page size treated as 1
pub fn total_pages(total_count: u64, page_size: u32) -> u32 {
    let pages = total_count.div_ceil(u64::from(page_size.max(1)));
    u32::try_from(pages).unwrap_or(u32::MAX)
}
