//! Bounded fixed-delay retry for read requests

use std::future::Future;
use std::time::Duration;

use menuda_config::Config;

use crate::error::CoreResult;

/// How often and how patiently a read is repeated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts after the first one
    pub retries: u32,
    /// Pause between attempts
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 3,
            delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    pub fn new(retries: u32, delay: Duration) -> Self {
        Self { retries, delay }
    }

    /// No retries at all; used for writes
    pub fn none() -> Self {
        Self {
            retries: 0,
            delay: Duration::ZERO,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.retry.retries, config.retry_delay())
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or retries run out
pub async fn with_retry<T, F, Fut>(policy: RetryPolicy, label: &str, mut op: F) -> CoreResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = CoreResult<T>>,
{
    let mut retries_left = policy.retries;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(error) if retries_left > 0 && error.is_retryable() => {
                retries_left -= 1;
                log::warn!(
                    "Retrying fetch for {} after error: {}. Retries left: {}",
                    label,
                    error,
                    retries_left
                );
                tokio::time::sleep(policy.delay).await;
            }
            Err(error) => return Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn quick(retries: u32) -> RetryPolicy {
        RetryPolicy::new(retries, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let attempts = AtomicU32::new(0);
        let counter = &attempts;
        let result = with_retry(quick(3), "/categories", move || async move {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(CoreError::Network { message: "connection refused".to_string() })
            } else {
                Ok(n)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_retries() {
        let attempts = AtomicU32::new(0);
        let counter = &attempts;
        let result: CoreResult<()> = with_retry(quick(3), "/vendors", move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(CoreError::Status { status: 503, message: String::new() })
        })
        .await;

        assert_eq!(result.unwrap_err(), CoreError::Status { status: 503, message: String::new() });
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let attempts = AtomicU32::new(0);
        let counter = &attempts;
        let result: CoreResult<()> = with_retry(quick(3), "/transactions/x", move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(CoreError::Status { status: 404, message: String::new() })
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_none_policy_runs_once() {
        let attempts = AtomicU32::new(0);
        let counter = &attempts;
        let _: CoreResult<()> = with_retry(RetryPolicy::none(), "/transactions", move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(CoreError::Network { message: String::new() })
        })
        .await;
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_policy_from_config() {
        let config = Config::default();
        assert_eq!(RetryPolicy::from_config(&config), RetryPolicy::default());
    }
}
