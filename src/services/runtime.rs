//! Tokio Runtime Bridge
//!
//! The list core is runtime-agnostic: loaders only `.await` their source.
//! Synchronous hosts (the demo binary, render threads) drive it through the
//! process-wide tokio runtime kept here.
//!
//! ## Pattern
//!
//! ```text
//! render thread / main
//!       │
//!       ▼
//! block_on(loader.load_next_page())   or   spawn_named("prefetch", async { ... })
//!       │
//!       ▼
//! tokio::Runtime
//! ```

use std::future::Future;
use std::sync::OnceLock;

use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::JoinHandle;

use crate::error::Result;

/// Global tokio runtime instance
static TOKIO_RUNTIME: OnceLock<Runtime> = OnceLock::new();

/// Get or initialize the global tokio runtime
fn get_runtime() -> Result<&'static Runtime> {
    if let Some(runtime) = TOKIO_RUNTIME.get() {
        return Ok(runtime);
    }
    let runtime = Builder::new_multi_thread()
        .enable_all()
        .thread_name("dealflow-worker")
        .build()?;
    Ok(TOKIO_RUNTIME.get_or_init(|| runtime))
}

/// Block on a future synchronously
///
/// **Warning**: This blocks the current thread and must not be called from
/// inside the runtime.
pub fn block_on<F, T>(future: F) -> Result<T>
where
    F: Future<Output = T>,
{
    Ok(get_runtime()?.block_on(future))
}

/// Spawn a detached task with a name (for debugging)
pub fn spawn_named<F>(name: &'static str, future: F) -> Result<JoinHandle<()>>
where
    F: Future<Output = ()> + Send + 'static,
{
    tracing::debug!(task = name, "Spawning tokio task");
    Ok(get_runtime()?.spawn(async move {
        future.await;
        tracing::debug!(task = name, "Tokio task completed");
    }))
}

/// Get a handle to the tokio runtime for advanced use cases
pub fn runtime_handle() -> Result<Handle> {
    Ok(get_runtime()?.handle().clone())
}
