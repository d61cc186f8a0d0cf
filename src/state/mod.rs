//! State - List State Modules
//!
//! Synchronous state behind paged lists: the per-list page cursor and the
//! query cache shared between lists showing the same collection.

mod page_cursor;
mod query_cache;

pub use page_cursor::*;
pub use query_cache::*;
