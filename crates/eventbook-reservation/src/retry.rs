//! Bounded retry of whole ledger transactions.

use std::future::Future;

use tracing::warn;

use eventbook_core::config::retry::RetryConfig;
use eventbook_core::result::AppResult;

/// Re-runs an operation that failed with a retryable error kind.
///
/// Each attempt must be a complete transaction. Errors that are not
/// retryable, including commit failures, are returned immediately.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    /// Build from configuration.
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// A policy that makes exactly one attempt.
    pub fn disabled() -> Self {
        Self {
            config: RetryConfig {
                max_attempts: 1,
                ..RetryConfig::default()
            },
        }
    }

    /// Run `attempt` until it succeeds, fails permanently, or the attempt
    /// budget is spent.
    pub async fn run<T, F, Fut>(&self, operation: &'static str, mut attempt: F) -> AppResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut tried = 1;
        loop {
            match attempt().await {
                Err(e) if e.is_retryable() && tried < max_attempts => {
                    let delay = self.config.backoff_for(tried);
                    warn!(
                        operation,
                        attempt = tried,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    tried += 1;
                }
                result => return result,
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use eventbook_core::error::{AppError, ErrorKind};

    use super::*;

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(RetryConfig {
            max_attempts,
            initial_backoff_ms: 100,
            max_backoff_ms: 1000,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failure_is_retried_until_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result = policy(3)
            .run("reserve", move || {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(AppError::storage_unavailable("pool timed out"))
                    } else {
                        Ok(7)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_budget_is_bounded() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let err = policy(3)
            .run("reserve", move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(AppError::storage_unavailable("connection reset"))
                }
            })
            .await
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::StorageUnavailable);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_logical_errors_are_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let err = policy(5)
            .run("reserve", move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(AppError::insufficient_seats(2, 1))
                }
            })
            .await
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::InsufficientSeats);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_commit_failures_are_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let err = policy(5)
            .run("confirm", move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(AppError::database("Failed to commit transaction"))
                }
            })
            .await
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::Database);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
