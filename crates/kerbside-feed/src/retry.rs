//! Retry policy for feed requests.
//!
//! Transient failures back off exponentially with ±25 % jitter. A 429 waits
//! at least as long as the server's `Retry-After` asked for.

use std::future::Future;
use std::time::Duration;

use crate::error::FeedError;

/// Longest back-off between two attempts.
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Longest wait honoured from a `Retry-After` header.
const MAX_RETRY_AFTER: Duration = Duration::from_secs(120);

/// Returns `true` for errors that are worth retrying after a back-off delay.
///
/// **Retriable:**
/// - [`FeedError::RateLimited`]: HTTP 429.
/// - [`FeedError::UnexpectedStatus`] with a 5xx status.
/// - [`FeedError::Http`]: timeouts, connection failures, 5xx surfaced by reqwest.
///
/// **Not retriable:** 404, other 4xx, malformed bodies, bad configuration.
pub(crate) fn is_retriable(err: &FeedError) -> bool {
    match err {
        FeedError::RateLimited { .. } => true,
        FeedError::UnexpectedStatus { status, .. } => (500..600).contains(status),
        FeedError::Http(e) => {
            e.is_timeout()
                || e.is_connect()
                || e.is_request()
                || e.status().is_some_and(|s| s.is_server_error())
        }
        FeedError::NotFound { .. }
        | FeedError::Deserialize { .. }
        | FeedError::UnexpectedShape { .. }
        | FeedError::InvalidBaseUrl { .. } => false,
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct RetryPolicy {
    /// Additional attempts after the first failure.
    pub max_retries: u32,
    pub backoff_base: Duration,
}

impl RetryPolicy {
    /// How long to wait before retry number `retry` (1-based) after `err`.
    ///
    /// | Retry | Back-off with a 500 ms base |
    /// |-------|-----------------------------|
    /// | 1     | 500 ms ± 25 %               |
    /// | 2     | 1 s ± 25 %                  |
    /// | 3     | 2 s ± 25 %                  |
    ///
    /// The un-jittered back-off is capped at 30 s. For a 429 the delay is
    /// raised to `Retry-After`, itself capped at two minutes.
    pub(crate) fn delay_for(&self, err: &FeedError, retry: u32) -> Duration {
        let doublings = retry.saturating_sub(1).min(16);
        let backoff = self
            .backoff_base
            .saturating_mul(2u32.pow(doublings))
            .min(MAX_BACKOFF)
            .mul_f64(rand::random_range(0.75..1.25));

        match err {
            FeedError::RateLimited { retry_after_secs } => {
                let asked = Duration::from_secs(*retry_after_secs).min(MAX_RETRY_AFTER);
                backoff.max(asked)
            }
            _ => backoff,
        }
    }

    /// Runs `request` until it succeeds, fails permanently, or retries run out.
    pub(crate) async fn run<T, F, Fut>(&self, url: &str, mut request: F) -> Result<T, FeedError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FeedError>>,
    {
        let mut retry = 0u32;
        loop {
            let err = match request().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };
            if retry >= self.max_retries || !is_retriable(&err) {
                return Err(err);
            }
            retry += 1;

            let delay = self.delay_for(&err, retry);
            tracing::warn!(
                url,
                retry,
                retries_left = self.max_retries - retry,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %err,
                "feed request failed, waiting before retry"
            );
            tokio::time::sleep(delay).await;
        }
    }
}
