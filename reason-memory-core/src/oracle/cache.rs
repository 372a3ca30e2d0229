//! LRU + TTL cache over deterministic oracle calls (spec §4.1).
//!
//! Shaped after the teacher's query cache (`LruCache` behind a single mutex,
//! insert-timestamp-based expiry), but keyed on the oracle request tuple
//! rather than a free-text query, and gated on `temperature == 0` before the
//! key is even computed.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use lru::LruCache;
use serde::Serialize;

use super::types::{OracleRequest, OracleResponse};

#[derive(Clone)]
struct Entry {
    response: OracleResponse,
    inserted_at: Instant,
}

/// Snapshot of cache counters. `total_requests = hits + misses + bypassed`.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub bypassed: u64,
    pub evictions: u64,
    pub expirations: u64,
}

impl CacheStats {
    #[must_use]
    pub fn total_requests(&self) -> u64 {
        self.hits + self.misses + self.bypassed
    }

    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let denom = self.hits + self.misses;
        if denom == 0 {
            0.0
        } else {
            self.hits as f64 / denom as f64
        }
    }
}

struct Inner {
    entries: LruCache<u64, Entry>,
    stats: CacheStats,
}

/// Thread-safe, fixed-capacity LRU cache with TTL for deterministic LLM calls.
pub struct OracleCache {
    capacity: usize,
    ttl: Duration,
    inner: Mutex<Inner>,
}

impl OracleCache {
    /// `capacity == 0` disables the cache entirely: `get` always misses and
    /// `put` is a no-op, regardless of determinism.
    #[must_use]
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let lru_capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            capacity,
            ttl,
            inner: Mutex::new(Inner {
                entries: LruCache::new(lru_capacity),
                stats: CacheStats::default(),
            }),
        }
    }

    fn key_for(request: &OracleRequest) -> u64 {
        let mut hasher = DefaultHasher::new();
        request.model.hash(&mut hasher);
        for m in &request.messages {
            m.role.hash(&mut hasher);
            m.content.hash(&mut hasher);
        }
        request.temperature.to_bits().hash(&mut hasher);
        request.max_output_tokens.hash(&mut hasher);
        // ReasoningEffort doesn't implement Hash directly; discriminant is enough.
        std::mem::discriminant(&request.reasoning_effort).hash(&mut hasher);
        hasher.finish()
    }

    /// Looks up a cached response for `request`. Non-deterministic requests
    /// (`temperature > 0`) are always treated as bypassed and never touch
    /// the entry map.
    pub fn get(&self, request: &OracleRequest) -> CacheLookup {
        if self.capacity == 0 {
            let mut inner = self.inner.lock().expect("oracle cache lock poisoned");
            inner.stats.misses += 1;
            return CacheLookup::Miss;
        }

        if !request.is_deterministic() {
            let mut inner = self.inner.lock().expect("oracle cache lock poisoned");
            inner.stats.bypassed += 1;
            return CacheLookup::Bypass;
        }

        let key = Self::key_for(request);
        let mut inner = self.inner.lock().expect("oracle cache lock poisoned");

        if let Some(entry) = inner.entries.peek(&key) {
            if entry.inserted_at.elapsed() > self.ttl {
                inner.entries.pop(&key);
                inner.stats.misses += 1;
                inner.stats.expirations += 1;
                return CacheLookup::Miss;
            }
            let response = entry.response.clone();
            inner.entries.get(&key); // bump recency
            inner.stats.hits += 1;
            return CacheLookup::Hit(response);
        }

        inner.stats.misses += 1;
        CacheLookup::Miss
    }

    /// Stores `response` for `request`, a no-op for non-deterministic requests.
    pub fn put(&self, request: &OracleRequest, response: OracleResponse) {
        if self.capacity == 0 || !request.is_deterministic() {
            return;
        }
        let key = Self::key_for(request);
        let mut inner = self.inner.lock().expect("oracle cache lock poisoned");
        let was_full = inner.entries.len() >= self.capacity && !inner.entries.contains(&key);
        inner.entries.put(
            key,
            Entry {
                response,
                inserted_at: Instant::now(),
            },
        );
        if was_full {
            inner.stats.evictions += 1;
        }
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.inner.lock().expect("oracle cache lock poisoned").stats
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock().expect("oracle cache lock poisoned");
        inner.entries.clear();
    }

    /// Invalidate a single cached request, if present. Used by the
    /// `manage_cache` tool's `invalidate` action.
    pub fn invalidate(&self, request: &OracleRequest) -> bool {
        let key = Self::key_for(request);
        let mut inner = self.inner.lock().expect("oracle cache lock poisoned");
        inner.entries.pop(&key).is_some()
    }
}

/// Outcome of a cache lookup.
pub enum CacheLookup {
    Hit(OracleResponse),
    Miss,
    Bypass,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::types::{Message, ReasoningEffort, Usage};

    fn request(temperature: f64) -> OracleRequest {
        OracleRequest {
            model: "test-model".to_string(),
            messages: vec![Message::user("hello")],
            temperature,
            max_output_tokens: 100,
            reasoning_effort: ReasoningEffort::Medium,
        }
    }

    fn response(content: &str) -> OracleResponse {
        OracleResponse {
            content: content.to_string(),
            usage: Usage::default(),
            metadata: Default::default(),
        }
    }

    #[test]
    fn deterministic_calls_are_cached() {
        let cache = OracleCache::new(10, Duration::from_secs(60));
        let req = request(0.0);
        assert!(matches!(cache.get(&req), CacheLookup::Miss));
        cache.put(&req, response("hi"));
        match cache.get(&req) {
            CacheLookup::Hit(r) => assert_eq!(r.content, "hi"),
            _ => panic!("expected hit"),
        }
        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn nondeterministic_calls_bypass_unconditionally() {
        let cache = OracleCache::new(10, Duration::from_secs(60));
        let req = request(0.7);
        assert!(matches!(cache.get(&req), CacheLookup::Bypass));
        cache.put(&req, response("hi"));
        assert!(matches!(cache.get(&req), CacheLookup::Bypass));
        let stats = cache.stats();
        assert_eq!(stats.bypassed, 2);
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
    }

    #[test]
    fn expired_entries_are_treated_as_absent() {
        let cache = OracleCache::new(10, Duration::from_millis(1));
        let req = request(0.0);
        cache.put(&req, response("hi"));
        std::thread::sleep(Duration::from_millis(5));
        assert!(matches!(cache.get(&req), CacheLookup::Miss));
        assert_eq!(cache.stats().expirations, 1);
    }

    #[test]
    fn capacity_overflow_evicts_oldest_insert() {
        let cache = OracleCache::new(1, Duration::from_secs(60));
        let req_a = request(0.0);
        let mut req_b = request(0.0);
        req_b.messages = vec![Message::user("different")];
        cache.put(&req_a, response("a"));
        cache.put(&req_b, response("b"));
        assert!(matches!(cache.get(&req_a), CacheLookup::Miss));
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn zero_capacity_disables_the_cache() {
        let cache = OracleCache::new(0, Duration::from_secs(60));
        let req = request(0.0);
        assert!(matches!(cache.get(&req), CacheLookup::Miss));
        cache.put(&req, response("hi"));
        assert!(matches!(cache.get(&req), CacheLookup::Miss));
        let stats = cache.stats();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 2);
    }

    #[test]
    fn total_requests_and_hit_rate_are_derived_correctly() {
        let mut stats = CacheStats {
            hits: 3,
            misses: 1,
            bypassed: 2,
            evictions: 0,
            expirations: 0,
        };
        assert_eq!(stats.total_requests(), 6);
        assert!((stats.hit_rate() - 0.75).abs() < 1e-9);
        stats.hits = 0;
        stats.misses = 0;
        assert_eq!(stats.hit_rate(), 0.0);
    }
}
