//! Retry envelope: exponential backoff + jitter around any oracle-calling
//! operation, retrying only transient error classes (spec §4.2).

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;
use tracing::warn;

use crate::error::Error;

/// Types that can classify themselves as transient (retryable) or fatal.
pub trait Retryable {
    fn is_recoverable(&self) -> bool;
}

impl Retryable for Error {
    fn is_recoverable(&self) -> bool {
        Error::is_recoverable(self)
    }
}

/// Configuration for [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub attempts: u32,
    pub min_wait: Duration,
    pub max_wait: Duration,
}

impl RetryConfig {
    /// Validates `max_wait >= min_wait`, per spec §6's configuration rule.
    pub fn validate(&self) -> Result<(), Error> {
        if self.max_wait < self.min_wait {
            return Err(Error::Validation(
                "retry max_wait must be >= min_wait".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: crate::constants::DEFAULT_RETRY_ATTEMPTS,
            min_wait: crate::constants::DEFAULT_RETRY_MIN_WAIT,
            max_wait: crate::constants::DEFAULT_RETRY_MAX_WAIT,
        }
    }
}

/// Declarative retry decorator over an async operation.
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    #[must_use]
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exp = self
            .config
            .min_wait
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)));
        let bounded = std::cmp::min(exp, self.config.max_wait);
        let jitter_ms = rand::rng().random_range(0..=(bounded.as_millis() as u64 / 4 + 1));
        bounded + Duration::from_millis(jitter_ms)
    }

    /// Runs `operation`, retrying up to `attempts` times with exponential
    /// backoff for recoverable errors. Logs attempt index and error summary,
    /// never the payload (spec §4.2, §6).
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> Result<T, E>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + std::fmt::Display,
    {
        let mut attempt = 0u32;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    let recoverable = err.is_recoverable();
                    if !recoverable || attempt + 1 >= self.config.attempts {
                        return Err(err);
                    }
                    attempt += 1;
                    let delay = self.delay_for_attempt(attempt);
                    warn!(
                        attempt,
                        max_attempts = self.config.attempts,
                        error = %err,
                        delay_ms = delay.as_millis() as u64,
                        "retrying after recoverable error"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug)]
    struct Boom(bool);
    impl std::fmt::Display for Boom {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "boom")
        }
    }
    impl Retryable for Boom {
        fn is_recoverable(&self) -> bool {
            self.0
        }
    }

    #[tokio::test]
    async fn succeeds_without_retry() {
        let policy = RetryPolicy::new(RetryConfig::default());
        let calls = AtomicU32::new(0);
        let result: Result<u32, Boom> = policy
            .execute(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(42)
            })
            .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_recoverable_errors_until_success() {
        let policy = RetryPolicy::new(RetryConfig {
            attempts: 3,
            min_wait: Duration::from_millis(1),
            max_wait: Duration::from_millis(5),
        });
        let calls = AtomicU32::new(0);
        let result: Result<u32, Boom> = policy
            .execute(|| async {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(Boom(true))
                } else {
                    Ok(7)
                }
            })
            .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn never_retries_fatal_errors() {
        let policy = RetryPolicy::new(RetryConfig::default());
        let calls = AtomicU32::new(0);
        let result: Result<u32, Boom> = policy
            .execute(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(Boom(false))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let cfg = RetryConfig {
            attempts: 3,
            min_wait: Duration::from_secs(10),
            max_wait: Duration::from_secs(1),
        };
        assert!(cfg.validate().is_err());
    }
}
