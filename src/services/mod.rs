//! Service Layer
//!
//! Async plumbing around the list state: the page source abstraction and its
//! decorators, the loader that drives a cursor against a source, the
//! notification port, and the tokio runtime bridge.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       PagedLoader                            │
//! │  ┌─────────────┐  ┌─────────────┐  ┌──────────────────┐    │
//! │  │ PageCursor  │  │ QueryCache  │  │     Notifier     │    │
//! │  │  (state)    │  │  (shared)   │  │  (user notices)  │    │
//! │  └─────────────┘  └─────────────┘  └──────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//!                            │
//!                            ▼ fetch_page
//! ┌─────────────────────────────────────────────────────────────┐
//! │        TracedSource ─► RetryingSource ─► PageSource          │
//! │                     (remote service / InMemorySource)        │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod memory_source;
mod notify;
mod paged_loader;
mod retry;
mod runtime;
mod source;
mod traced;

pub use memory_source::*;
pub use notify::*;
pub use paged_loader::*;
pub use retry::*;
pub use runtime::*;
pub use source::*;
pub use traced::*;
