//! Exponential backoff with jitter for fallible async operations.

use async_trait::async_trait;
use log::{debug, warn};
use rand::Rng;
use std::collections::HashSet;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::error::FetchError;

/// Default number of attempts, the first one included.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default delay before the second attempt, in milliseconds.
pub const DEFAULT_BASE_DELAY_MS: u64 = 1_000;

/// Default upper bound of the pre-jitter delay, in milliseconds.
pub const DEFAULT_MAX_DELAY_MS: u64 = 32_000;

/// Statuses retried by default.
pub const DEFAULT_RETRYABLE_STATUSES: [u16; 3] = [500, 503, 504];

/// When and how often a failed operation is retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub retryable: HashSet<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(DEFAULT_BASE_DELAY_MS),
            max_delay: Duration::from_millis(DEFAULT_MAX_DELAY_MS),
            retryable: DEFAULT_RETRYABLE_STATUSES.into_iter().collect(),
        }
    }
}

impl RetryPolicy {
    /// Only classified errors with a listed status are retried. Transport,
    /// auth and cancellation errors never are.
    pub fn is_retryable(&self, error: &FetchError) -> bool {
        match error {
            FetchError::Classified(err) => self.retryable.contains(&err.status),
            _ => false,
        }
    }

    /// Pre-jitter delays between consecutive attempts, one per retry.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        let first = self.base_delay.min(self.max_delay);
        std::iter::successors(Some(first), |d| Some(d.saturating_mul(2).min(self.max_delay)))
            .take(self.max_attempts.saturating_sub(1) as usize)
    }
}

/// A zero-argument fallible step that [`retry`] may run several times.
#[async_trait]
pub trait Operation: Send {
    type Output: Send;

    async fn call(&mut self) -> Result<Self::Output, FetchError>;
}

/// Uniform random offset in `[0, delay)`.
pub fn jitter(delay: Duration) -> Duration {
    if delay.is_zero() {
        return Duration::ZERO;
    }
    rand::rng().random_range(Duration::ZERO..delay)
}

/// Runs `operation` until it succeeds, fails with a non-retryable error, or
/// the policy's attempts are used up. The last error seen is returned.
pub async fn retry<O: Operation>(
    policy: &RetryPolicy,
    operation: &mut O,
    cancel: &CancellationToken,
) -> Result<O::Output, FetchError> {
    let mut delays = policy.delays();
    let mut attempt: u32 = 0;

    loop {
        let error = match operation.call().await {
            Ok(output) => return Ok(output),
            Err(e) => e,
        };

        if !policy.is_retryable(&error) {
            debug!("non-retryable error: {}", error);
            return Err(error);
        }

        let Some(delay) = delays.next() else {
            warn!(
                "giving up after {} attempt(s): {}",
                attempt + 1,
                error
            );
            return Err(error);
        };

        let wait = delay + jitter(delay);
        warn!(
            "attempt {}/{} failed ({}), retrying in {}ms...",
            attempt + 1,
            policy.max_attempts,
            error,
            wait.as_millis()
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(FetchError::Cancelled),
            _ = tokio::time::sleep(wait) => {}
        }

        attempt += 1;
    }
}
