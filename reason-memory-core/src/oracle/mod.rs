//! Cached LLM Oracle: a thread-safe LRU+TTL wrapper over an LLM client.
//!
//! The underlying LLM transport is an external collaborator (spec §1),
//! captured here as the [`LlmClient`] trait — "a request/response oracle
//! with usage metrics." A real HTTP-backed client is a drop-in
//! implementation; this crate ships [`MockLlmClient`] for tests and for any
//! host that wants scripted, offline behavior.

pub mod cache;
pub mod types;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::retry::{RetryConfig, RetryPolicy};

pub use cache::{CacheLookup, CacheStats, OracleCache};
pub use types::{Message, OracleRequest, OracleResponse, ReasoningEffort, Usage};

/// The external LLM transport contract: request in, response-or-usage out.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn create(&self, request: &OracleRequest) -> Result<OracleResponse>;
}

/// Thread-safe cached oracle: memoizes deterministic calls, passes everything
/// else straight through to the underlying [`LlmClient`], wrapped in a
/// [`RetryPolicy`] so transient transport failures are retried transparently.
pub struct CachedOracle {
    client: Box<dyn LlmClient>,
    cache: OracleCache,
    retry: RetryPolicy,
}

impl CachedOracle {
    #[must_use]
    pub fn new(client: Box<dyn LlmClient>, cache_capacity: usize, cache_ttl: std::time::Duration) -> Self {
        Self {
            client,
            cache: OracleCache::new(cache_capacity, cache_ttl),
            retry: RetryPolicy::new(RetryConfig::default()),
        }
    }

    #[must_use]
    pub fn with_retry_config(mut self, config: RetryConfig) -> Self {
        self.retry = RetryPolicy::new(config);
        self
    }

    /// Creates a completion, consulting the cache first for deterministic
    /// requests. On a cache miss the underlying client is called through the
    /// retry envelope, and — for deterministic requests only — the result is
    /// stored before being returned.
    pub async fn create(&self, request: OracleRequest) -> Result<OracleResponse> {
        match self.cache.get(&request) {
            CacheLookup::Hit(response) => return Ok(response),
            CacheLookup::Bypass | CacheLookup::Miss => {}
        }

        let client = &self.client;
        let response = self
            .retry
            .execute(|| async { client.create(&request).await })
            .await?;

        if request.is_deterministic() {
            self.cache.put(&request, response.clone());
        }
        Ok(response)
    }

    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn invalidate_cache_entry(&self, request: &OracleRequest) -> bool {
        self.cache.invalidate(request)
    }
}

/// Scripted, deterministic oracle client for tests: returns the next
/// response from a fixed queue, or a content-based canned reply keyed by a
/// substring match, falling back to an echo.
pub struct MockLlmClient {
    scripted: std::sync::Mutex<std::collections::VecDeque<Result<OracleResponse, String>>>,
    call_count: std::sync::atomic::AtomicU32,
}

impl MockLlmClient {
    #[must_use]
    pub fn new() -> Self {
        Self {
            scripted: std::sync::Mutex::new(std::collections::VecDeque::new()),
            call_count: std::sync::atomic::AtomicU32::new(0),
        }
    }

    /// Queues a successful response to be returned by the next `create` call.
    pub fn push_response(&self, content: impl Into<String>) {
        self.scripted
            .lock()
            .expect("mock client lock poisoned")
            .push_back(Ok(OracleResponse {
                content: content.into(),
                usage: Usage::default(),
                metadata: Default::default(),
            }));
    }

    /// Queues a transient failure (as if the transport hit a 5xx/timeout).
    pub fn push_failure(&self, message: impl Into<String>) {
        self.scripted
            .lock()
            .expect("mock client lock poisoned")
            .push_back(Err(message.into()));
    }

    #[must_use]
    pub fn call_count(&self) -> u32 {
        self.call_count.load(std::sync::atomic::Ordering::SeqCst)
    }
}

impl Default for MockLlmClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn create(&self, _request: &OracleRequest) -> Result<OracleResponse> {
        self.call_count
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let next = self
            .scripted
            .lock()
            .expect("mock client lock poisoned")
            .pop_front();
        match next {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(Error::LlmGeneration(message)),
            None => Ok(OracleResponse {
                content: "{}".to_string(),
                usage: Usage::default(),
                metadata: Default::default(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn deterministic_request() -> OracleRequest {
        OracleRequest {
            model: "test-model".to_string(),
            messages: vec![Message::user("hi")],
            temperature: 0.0,
            max_output_tokens: 64,
            reasoning_effort: ReasoningEffort::Low,
        }
    }

    #[tokio::test]
    async fn second_deterministic_call_hits_cache_and_skips_client() {
        let client = MockLlmClient::new();
        client.push_response("first");
        let oracle = CachedOracle::new(Box::new(client), 10, Duration::from_secs(60));

        let first = oracle.create(deterministic_request()).await.unwrap();
        let second = oracle.create(deterministic_request()).await.unwrap();

        assert_eq!(first.content, "first");
        assert_eq!(second.content, "first");
        let stats = oracle.cache_stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test]
    async fn nondeterministic_calls_always_reach_the_client() {
        let client = MockLlmClient::new();
        client.push_response("a");
        client.push_response("b");
        let oracle = CachedOracle::new(Box::new(client), 10, Duration::from_secs(60));

        let mut req = deterministic_request();
        req.temperature = 0.7;

        let first = oracle.create(req.clone()).await.unwrap();
        let second = oracle.create(req).await.unwrap();

        assert_eq!(first.content, "a");
        assert_eq!(second.content, "b");
        assert_eq!(oracle.cache_stats().bypassed, 2);
    }

    #[tokio::test]
    async fn transient_failure_is_retried_then_succeeds() {
        let client = MockLlmClient::new();
        client.push_failure("connection reset");
        client.push_response("ok");
        let oracle = CachedOracle::new(Box::new(client), 10, Duration::from_secs(60))
            .with_retry_config(RetryConfig {
                attempts: 3,
                min_wait: Duration::from_millis(1),
                max_wait: Duration::from_millis(2),
            });

        let response = oracle.create(deterministic_request()).await.unwrap();
        assert_eq!(response.content, "ok");
    }
}
