//! Retrying Source
//!
//! Retry policy for the remote fetch capability. The cursor never retries on
//! its own; wrapping a source in [`RetryingSource`] gives each page a fixed
//! attempt budget with exponential backoff and a per-attempt timeout.
//! Only transient failures (network, timeout, server) are retried.

use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;

use super::source::{FetchResult, PageSource};
use crate::constants::{
    FETCH_TIMEOUT_MS, RETRY_INITIAL_DELAY_MS, RETRY_JITTER, RETRY_MAX_ATTEMPTS,
    RETRY_MAX_DELAY_MS, RETRY_MULTIPLIER,
};
use crate::domain::config::RetrySettings;
use crate::domain::page::PageRequest;
use crate::error::FetchError;

/// Retry configuration for page fetches
#[derive(Clone, Debug, PartialEq)]
pub struct RetryConfig {
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub multiplier: f64,
    /// Jitter factor (0.0 - 1.0) to randomize delays
    pub jitter: f64,
    /// Total attempts per page, including the first (at least 1)
    pub max_attempts: u32,
    /// Per-attempt timeout, `None` to wait forever
    pub timeout: Option<Duration>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(RETRY_INITIAL_DELAY_MS),
            max_delay: Duration::from_millis(RETRY_MAX_DELAY_MS),
            multiplier: RETRY_MULTIPLIER,
            jitter: RETRY_JITTER,
            max_attempts: RETRY_MAX_ATTEMPTS,
            timeout: Some(Duration::from_millis(FETCH_TIMEOUT_MS)),
        }
    }
}

impl From<&RetrySettings> for RetryConfig {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            initial_delay: Duration::from_millis(settings.initial_delay_ms),
            max_delay: Duration::from_millis(settings.max_delay_ms),
            multiplier: settings.multiplier,
            jitter: settings.jitter.clamp(0.0, 1.0),
            max_attempts: settings.max_attempts.max(1),
            timeout: (settings.timeout_ms > 0).then(|| Duration::from_millis(settings.timeout_ms)),
        }
    }
}

impl RetryConfig {
    /// Backoff before retry number `retry` (1 for the first retry)
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.delay_with_sample(retry, rand_jitter())
    }

    /// Backoff for `retry` with the jitter drawn as `sample` in `0.0..=1.0`
    ///
    /// 0.5 yields the undisturbed delay; 0.0 and 1.0 the ends of the range.
    pub fn delay_with_sample(&self, retry: u32, sample: f64) -> Duration {
        let base_delay = self.initial_delay.as_millis() as f64
            * self.multiplier.powi(retry.saturating_sub(1) as i32);

        let capped_delay = base_delay.min(self.max_delay.as_millis() as f64);

        // Apply jitter
        let jitter_range = capped_delay * self.jitter;
        let jitter = (sample.clamp(0.0, 1.0) * 2.0 - 1.0) * jitter_range;
        let final_delay = (capped_delay + jitter).max(0.0) as u64;

        Duration::from_millis(final_delay)
    }
}

/// Simple pseudo-random jitter (0.0 - 1.0)
fn rand_jitter() -> f64 {
    use std::time::SystemTime;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    (nanos % 1000) as f64 / 1000.0
}

/// Source decorator that retries transient failures
#[derive(Debug)]
pub struct RetryingSource<S> {
    inner: S,
    config: RetryConfig,
}

impl<S: PageSource> RetryingSource<S> {
    pub fn new(inner: S, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    async fn attempt(&self, request: PageRequest<S::Filters>) -> FetchResult<S::Item> {
        let Some(timeout) = self.config.timeout else {
            return self.inner.fetch_page(request).await;
        };
        match tokio::time::timeout(timeout, self.inner.fetch_page(request)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout {
                elapsed_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            }),
        }
    }
}

impl<S: PageSource> PageSource for RetryingSource<S> {
    type Item = S::Item;
    type Filters = S::Filters;

    fn fetch_page(&self, request: PageRequest<S::Filters>) -> BoxFuture<'_, FetchResult<S::Item>> {
        async move {
            let max_attempts = self.config.max_attempts.max(1);
            let mut attempt = 1;
            loop {
                match self.attempt(request.clone()).await {
                    Ok(page) => return Ok(page),
                    Err(error) if error.is_transient() && attempt < max_attempts => {
                        let delay = self.config.delay_for(attempt);
                        tracing::warn!(
                            page = request.page_number,
                            attempt,
                            max_attempts,
                            delay_ms = delay.as_millis() as u64,
                            error = %error,
                            "Page fetch failed, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                    Err(error) => return Err(error),
                }
            }
        }
        .boxed()
    }
}
