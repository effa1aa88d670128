//! manager::retry
//!
//! Bounded retry of idempotent store reads.
//!
//! Only reads go through here, and only [`StoreError::Unavailable`] is
//! retried. Mutations are never retried.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::core::config::{defaults, Config};
use crate::store::StoreError;

/// How many times to try a read, and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first. Zero is treated as one.
    pub attempts: u32,
    /// Delay before the second attempt; doubles after each failure.
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: defaults::RETRY_ATTEMPTS,
            initial_backoff: Duration::from_millis(defaults::RETRY_INITIAL_BACKOFF_MS),
        }
    }
}

impl RetryPolicy {
    /// A policy that tries exactly once.
    pub fn none() -> Self {
        Self {
            attempts: 1,
            initial_backoff: Duration::ZERO,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            attempts: config.retry_attempts(),
            initial_backoff: Duration::from_millis(config.retry_initial_backoff_ms()),
        }
    }

    /// Run `read` until it succeeds, fails permanently, or attempts run out.
    pub async fn run<T, F, Fut>(&self, what: &str, mut read: F) -> Result<T, StoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let attempts = self.attempts.max(1);
        let mut backoff = self.initial_backoff;
        let mut attempt = 1;

        loop {
            match read().await {
                Err(e) if e.is_transient() && attempt < attempts => {
                    warn!(read = what, attempt, error = %e, "store read failed, retrying");
                    tokio::time::sleep(backoff).await;
                    backoff = backoff.saturating_mul(2);
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}
