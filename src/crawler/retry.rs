//! Bounded exponential backoff for transient fetch failures
//!
//! | Outcome | Action |
//! |---------|--------|
//! | Success | Return immediately |
//! | Timeout, connection failure, HTTP 5xx | Retry after backoff |
//! | Auth failure, quota denial, rejected query | Fail immediately |
//! | Attempts exhausted | Return the last error |
//!
//! The policy never touches the rate limiter itself; the wrapped operation
//! acquires a permit on every attempt, so retries are throttled too.

use crate::config::RetryConfig;
use crate::FetchError;
use std::future::Future;
use std::time::Duration;

/// Exponential backoff policy
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_backoff: Duration,
    max_backoff: Duration,
}

impl RetryPolicy {
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before retry number `retry` (1-based): initial × 2^(retry-1), capped
    pub fn backoff_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(16);
        self.initial_backoff
            .saturating_mul(1u32 << exponent)
            .min(self.max_backoff)
    }

    /// Runs `op` until it succeeds, fails permanently, or runs out of attempts
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, FetchError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    let delay = self.backoff_for(attempt);
                    tracing::debug!(
                        "Attempt {}/{} failed ({}), retrying in {:?}",
                        attempt,
                        self.max_attempts,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    fn create_test_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(&RetryConfig {
            max_attempts,
            initial_backoff_ms: 1000,
            max_backoff_ms: 5000,
        })
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = create_test_policy(10);
        assert_eq!(policy.backoff_for(1), Duration::from_secs(1));
        assert_eq!(policy.backoff_for(2), Duration::from_secs(2));
        assert_eq!(policy.backoff_for(3), Duration::from_secs(4));
        assert_eq!(policy.backoff_for(4), Duration::from_secs(5));
        assert_eq!(policy.backoff_for(40), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_error_is_retried() {
        let policy = create_test_policy(5);
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result = policy
            .run(move || async move {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    Err(FetchError::ServerUnavailable { status: 503 })
                } else {
                    Ok(n)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hard_error_fails_immediately() {
        let policy = create_test_policy(5);
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result: Result<(), _> = policy
            .run(move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(FetchError::Unauthorized { status: 401 })
            })
            .await;

        assert!(matches!(result, Err(FetchError::Unauthorized { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_attempts_return_last_error() {
        let policy = create_test_policy(3);
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let start = Instant::now();

        let result: Result<(), _> = policy
            .run(move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(FetchError::Timeout)
            })
            .await;

        assert!(matches!(result, Err(FetchError::Timeout)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 1s + 2s of backoff between the three attempts
        assert!(start.elapsed() >= Duration::from_secs(3));
    }
}
