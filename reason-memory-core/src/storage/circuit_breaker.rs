//! Circuit breaker wrapping calls to a [`super::StorageBackend`] adapter,
//! shielding the Memory Core from a backend that is failing repeatedly.
//!
//! Three states: `Closed` (normal), `Open` (short-circuiting, fails fast),
//! `HalfOpen` (one probe call allowed through to test recovery).

use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Closed,
    Open,
    HalfOpen,
}

struct Inner {
    state: State,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
}

/// Guards a storage adapter against cascading failures.
pub struct CircuitBreaker {
    failure_threshold: u32,
    reset_timeout: Duration,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    #[must_use]
    pub fn new(failure_threshold: u32, reset_timeout: Duration) -> Self {
        Self {
            failure_threshold,
            reset_timeout,
            inner: Mutex::new(Inner {
                state: State::Closed,
                consecutive_failures: 0,
                opened_at: None,
            }),
        }
    }

    fn allow_call(&self) -> bool {
        let mut inner = self.inner.lock().expect("circuit breaker lock poisoned");
        match inner.state {
            State::Closed => true,
            State::HalfOpen => true,
            State::Open => {
                let elapsed = inner
                    .opened_at
                    .map(|t| t.elapsed())
                    .unwrap_or(Duration::ZERO);
                if elapsed >= self.reset_timeout {
                    inner.state = State::HalfOpen;
                    true
                } else {
                    false
                }
            }
        }
    }

    fn record_success(&self) {
        let mut inner = self.inner.lock().expect("circuit breaker lock poisoned");
        inner.state = State::Closed;
        inner.consecutive_failures = 0;
        inner.opened_at = None;
    }

    fn record_failure(&self) {
        let mut inner = self.inner.lock().expect("circuit breaker lock poisoned");
        inner.consecutive_failures += 1;
        if inner.state == State::HalfOpen || inner.consecutive_failures >= self.failure_threshold {
            inner.state = State::Open;
            inner.opened_at = Some(Instant::now());
        }
    }

    /// Runs `operation` through the breaker: fails fast with
    /// [`Error::Storage`] while open, otherwise runs the operation and
    /// updates breaker state from the outcome.
    pub async fn call<F, Fut, T>(&self, operation: F) -> Result<T, Error>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, Error>>,
    {
        if !self.allow_call() {
            return Err(Error::Storage(
                "circuit breaker open: backend has failed repeatedly".to_string(),
            ));
        }
        match operation().await {
            Ok(value) => {
                self.record_success();
                Ok(value)
            }
            Err(err) => {
                self.record_failure();
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn opens_after_consecutive_failures() {
        let breaker = CircuitBreaker::new(2, Duration::from_secs(60));
        for _ in 0..2 {
            let result: Result<(), Error> = breaker
                .call(|| async { Err(Error::Storage("boom".to_string())) })
                .await;
            assert!(result.is_err());
        }
        let result: Result<(), Error> = breaker.call(|| async { Ok(()) }).await;
        assert!(matches!(result, Err(Error::Storage(_))));
    }

    #[tokio::test]
    async fn half_open_probe_recloses_on_success() {
        let breaker = CircuitBreaker::new(1, Duration::from_millis(1));
        let _: Result<(), Error> = breaker
            .call(|| async { Err(Error::Storage("boom".to_string())) })
            .await;
        std::thread::sleep(Duration::from_millis(5));
        let result: Result<(), Error> = breaker.call(|| async { Ok(()) }).await;
        assert!(result.is_ok());
        let result2: Result<(), Error> = breaker.call(|| async { Ok(()) }).await;
        assert!(result2.is_ok());
    }
}
