//! Layered configuration: built-in defaults, overridden by a TOML file,
//! overridden again by environment variables, then validated (spec §6).
//!
//! Startup refuses to proceed on an invalid config, and separately performs
//! a single low-cost API-key probe against the configured LLM endpoint
//! before serving any tool — both failures are fatal.

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

use reason_memory_core::oracle::ReasoningEffort;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    pub model: String,
    pub api_key: String,
    pub base_url: String,
    pub reasoning_effort: String,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            model: "gpt-oracle".to_string(),
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".to_string(),
            reasoning_effort: "medium".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub retrieval_k: usize,
    pub max_iterations: u32,
    pub success_threshold: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            retrieval_k: 5,
            max_iterations: reason_memory_core::constants::DEFAULT_MAX_ITERATIONS,
            success_threshold: reason_memory_core::constants::DEFAULT_SUCCESS_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub attempts: u32,
    pub min_wait_ms: u64,
    pub max_wait_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: reason_memory_core::constants::DEFAULT_RETRY_ATTEMPTS,
            min_wait_ms: reason_memory_core::constants::DEFAULT_RETRY_MIN_WAIT.as_millis() as u64,
            max_wait_ms: reason_memory_core::constants::DEFAULT_RETRY_MAX_WAIT.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub enabled: bool,
    pub size: usize,
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            size: reason_memory_core::constants::DEFAULT_CACHE_CAPACITY,
            ttl_secs: reason_memory_core::constants::DEFAULT_CACHE_TTL.as_secs(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackendKind {
    Embedded,
    Hosted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackendKind,
    /// `redb` file directory when `backend = embedded`.
    pub embedded_dir: String,
    /// `libsql://...` or `file:...` URL when `backend = hosted`.
    pub hosted_url: Option<String>,
    pub hosted_token: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackendKind::Embedded,
            embedded_dir: ".reason-memory".to_string(),
            hosted_url: None,
            hosted_token: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub oracle: OracleConfig,
    pub engine: EngineConfig,
    pub retry: RetryConfig,
    pub cache: CacheConfig,
    pub storage: StorageConfig,
    pub workspace_root: Option<String>,
    pub log_level: String,
}

impl Config {
    /// Defaults → TOML file (if present) → environment variables → validate.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read config file {}", path.display()))?;
                toml::from_str(&content)
                    .with_context(|| format!("failed to parse TOML config {}", path.display()))?
            }
            None => {
                let default_path = Path::new("reason-memory.toml");
                if default_path.exists() {
                    return Self::load(Some(default_path));
                }
                Self::default_with_log_level()
            }
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn default_with_log_level() -> Self {
        Self {
            log_level: "info".to_string(),
            ..Self::default()
        }
    }

    /// Environment variables win over the TOML file. Names are
    /// `REASON_MEMORY_<SECTION>_<FIELD>`, all upper case.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("REASON_MEMORY_MODEL") {
            self.oracle.model = v;
        }
        if let Ok(v) = std::env::var("REASON_MEMORY_API_KEY") {
            self.oracle.api_key = v;
        }
        if let Ok(v) = std::env::var("REASON_MEMORY_BASE_URL") {
            self.oracle.base_url = v;
        }
        if let Ok(v) = std::env::var("REASON_MEMORY_REASONING_EFFORT") {
            self.oracle.reasoning_effort = v;
        }
        if let Ok(v) = std::env::var("REASON_MEMORY_RETRIEVAL_K") {
            if let Ok(n) = v.parse() {
                self.engine.retrieval_k = n;
            }
        }
        if let Ok(v) = std::env::var("REASON_MEMORY_MAX_ITERATIONS") {
            if let Ok(n) = v.parse() {
                self.engine.max_iterations = n;
            }
        }
        if let Ok(v) = std::env::var("REASON_MEMORY_SUCCESS_THRESHOLD") {
            if let Ok(n) = v.parse() {
                self.engine.success_threshold = n;
            }
        }
        if let Ok(v) = std::env::var("REASON_MEMORY_STORAGE_BACKEND") {
            self.storage.backend = match v.as_str() {
                "hosted" => StorageBackendKind::Hosted,
                _ => StorageBackendKind::Embedded,
            };
        }
        if let Ok(v) = std::env::var("REASON_MEMORY_HOSTED_URL") {
            self.storage.hosted_url = Some(v);
        }
        if let Ok(v) = std::env::var("REASON_MEMORY_HOSTED_TOKEN") {
            self.storage.hosted_token = Some(v);
        }
        if let Ok(v) = std::env::var("REASON_MEMORY_WORKSPACE_ROOT") {
            self.workspace_root = Some(v);
        }
        if let Ok(v) = std::env::var("REASON_MEMORY_LOG_LEVEL") {
            self.log_level = v;
        }
    }

    /// Schema/invariant checks. Does NOT perform the API-key probe — that
    /// requires network access and is a separate, explicit startup step.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.oracle.model.trim().is_empty() {
            bail!("oracle.model must not be empty");
        }
        if self.oracle.api_key.trim().is_empty() {
            bail!("oracle.api_key must not be empty (set REASON_MEMORY_API_KEY)");
        }
        if !matches!(self.oracle.reasoning_effort.as_str(), "low" | "medium" | "high") {
            bail!("oracle.reasoning_effort must be one of: low, medium, high");
        }
        if self.engine.retrieval_k < 1 {
            bail!("engine.retrieval_k must be >= 1");
        }
        if self.engine.max_iterations < 1 {
            bail!("engine.max_iterations must be >= 1");
        }
        if !(0.0..=1.0).contains(&self.engine.success_threshold) {
            bail!("engine.success_threshold must be within [0, 1]");
        }
        if self.retry.max_wait_ms < self.retry.min_wait_ms {
            bail!("retry.max_wait_ms must be >= retry.min_wait_ms");
        }
        if self.cache.enabled && self.cache.size == 0 {
            bail!("cache.size must be >= 1 when cache.enabled = true");
        }
        if self.storage.backend == StorageBackendKind::Hosted && self.storage.hosted_url.is_none() {
            bail!("storage.hosted_url is required when storage.backend = hosted");
        }
        Ok(())
    }

    #[must_use]
    pub fn reasoning_effort(&self) -> ReasoningEffort {
        match self.oracle.reasoning_effort.as_str() {
            "low" => ReasoningEffort::Low,
            "high" => ReasoningEffort::High,
            _ => ReasoningEffort::Medium,
        }
    }

    #[must_use]
    pub fn retry_config(&self) -> reason_memory_core::retry::RetryConfig {
        reason_memory_core::retry::RetryConfig {
            attempts: self.retry.attempts,
            min_wait: Duration::from_millis(self.retry.min_wait_ms),
            max_wait: Duration::from_millis(self.retry.max_wait_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_fails_validation_without_api_key() {
        let config = Config::default_with_log_level();
        assert!(config.validate().is_err());
    }

    #[test]
    fn hosted_backend_requires_url() {
        let mut config = Config::default_with_log_level();
        config.oracle.api_key = "k".to_string();
        config.storage.backend = StorageBackendKind::Hosted;
        assert!(config.validate().is_err());
        config.storage.hosted_url = Some("libsql://example".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn max_wait_below_min_wait_is_rejected() {
        let mut config = Config::default_with_log_level();
        config.oracle.api_key = "k".to_string();
        config.retry.min_wait_ms = 1000;
        config.retry.max_wait_ms = 10;
        assert!(config.validate().is_err());
    }
}
