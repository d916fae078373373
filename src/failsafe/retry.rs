//! Retry logic with exponential backoff

use std::future::Future;
use std::time::Duration;

use backon::{BackoffBuilder, ExponentialBackoff, ExponentialBuilder};
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::RetryConfig;
use crate::{Error, Result};

/// Retry policy configuration
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_retries: u32,
    /// Delay before the second attempt
    pub initial_delay: Duration,
    /// Delay multiplier between attempts
    pub backoff_factor: f32,
    /// Upper bound on a single delay
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Create from config
    #[must_use]
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries.max(1),
            initial_delay: config.initial_delay,
            backoff_factor: config.backoff_factor,
            max_delay: config.max_delay,
        }
    }

    /// Create an exponential backoff instance yielding one delay per retry
    #[must_use]
    pub fn create_backoff(&self) -> ExponentialBackoff {
        ExponentialBuilder::default()
            .with_min_delay(self.initial_delay)
            .with_max_delay(self.max_delay)
            .with_factor(self.backoff_factor)
            .with_max_times(self.max_retries.saturating_sub(1) as usize)
            .build()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(&RetryConfig::default())
    }
}

/// Execute a future with retry logic.
///
/// Non-retryable errors (see [`Error::is_retryable`]) are returned as-is on
/// the attempt that produced them. Retryable errors that persist through
/// every attempt are wrapped in [`Error::RetriesExhausted`].
pub async fn with_retry<F, Fut, T>(policy: &RetryPolicy, operation: &str, mut f: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut backoff = policy.create_backoff();
    let mut attempts = 0u32;

    loop {
        attempts += 1;

        match f().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                if !e.is_retryable() {
                    return Err(e);
                }

                match backoff.next() {
                    Some(delay) if attempts < policy.max_retries => {
                        debug!(
                            operation,
                            attempt = attempts,
                            delay_ms = delay.as_millis(),
                            error = %e,
                            "Retrying after backoff"
                        );
                        sleep(delay).await;
                    }
                    _ => {
                        warn!(operation, attempts, error = %e, "Max retry attempts reached");
                        return Err(Error::RetriesExhausted {
                            operation: operation.to_string(),
                            attempts,
                            message: e.to_string(),
                        });
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            initial_delay: Duration::from_millis(1),
            backoff_factor: 2.0,
            max_delay: Duration::from_millis(10),
        }
    }

    #[test]
    fn test_backoff_grows_by_factor() {
        let policy = RetryPolicy {
            max_retries: 4,
            initial_delay: Duration::from_millis(100),
            backoff_factor: 2.0,
            max_delay: Duration::from_secs(10),
        };
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let delays_ms: Vec<u64> = policy
            .create_backoff()
            .map(|d| (d.as_secs_f64() * 1000.0).round() as u64)
            .collect();
        assert_eq!(delays_ms, vec![100, 200, 400]);
    }

    #[test]
    fn test_single_attempt_policy_has_no_delays() {
        assert_eq!(fast_policy(1).create_backoff().count(), 0);
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result = with_retry(&fast_policy(3), "GET Bugs", || async move {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            if n < 3 {
                Err(Error::api(503, "Service Unavailable"))
            } else {
                Ok(n)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_bad_request_is_not_retried() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<()> = with_retry(&fast_policy(5), "GET Bugs", || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(Error::api(400, "bad where"))
        })
        .await;

        assert!(matches!(result, Err(Error::Api { status: 400, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unauthorized_is_not_retried() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<()> = with_retry(&fast_policy(5), "GET Bugs", || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(Error::api(401, "expired"))
        })
        .await;

        assert!(matches!(result, Err(Error::Authentication(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exhaustion_is_wrapped() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<()> = with_retry(&fast_policy(3), "POST Tasks", || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(Error::Transport("connection refused".to_string()))
        })
        .await;

        match result {
            Err(Error::RetriesExhausted {
                operation,
                attempts,
                message,
            }) => {
                assert_eq!(operation, "POST Tasks");
                assert_eq!(attempts, 3);
                assert!(message.contains("connection refused"));
            }
            other => panic!("expected RetriesExhausted, got {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
