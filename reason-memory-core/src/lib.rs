#![allow(clippy::cast_precision_loss)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_docs_in_private_items)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::float_cmp)]

//! # Memory Core
//!
//! Core engine for a memory-augmented reasoning service: an iterative
//! GENERATE/EVALUATE/REFINE/JUDGE loop over an LLM oracle, backed by a
//! composite-scored, genealogy-tracked memory store.
//!
//! ## Module Organization
//!
//! ### Primary APIs
//! - [`reasoning`]: the iterative reasoning engine and MaTTS modes
//! - [`memory`]: composite retrieval, judging, extraction, genealogy
//! - [`tools`]: validated input/output functions for the tool surface
//!
//! ### Support modules
//! - [`types`]: the shared data model (memories, traces, trajectory steps)
//! - [`storage`]: the backend-agnostic storage trait and circuit breaker
//! - [`oracle`]: the cached, retried LLM client wrapper
//! - [`embeddings`]: the embedding trait and deterministic stand-in
//! - [`workspace`]: process-wide current-workspace state
//! - [`backup`]: backup/restore/migration
//! - [`retry`], [`constants`], [`error`]: cross-cutting primitives
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use reason_memory_core::embeddings::DeterministicEmbedder;
//! use reason_memory_core::memory::MemoryCore;
//! use reason_memory_core::oracle::{CachedOracle, MockLlmClient};
//! use reason_memory_core::reasoning::{ReasoningEngine, SolveOptions};
//! use reason_memory_core::storage::StorageBackend;
//!
//! # async fn example(storage: Arc<dyn StorageBackend>) -> reason_memory_core::error::Result<()> {
//! let memory = MemoryCore::new(storage, Arc::new(DeterministicEmbedder::new()));
//! let oracle = Arc::new(CachedOracle::new(Box::new(MockLlmClient::new()), 100, std::time::Duration::from_secs(3600)));
//! let engine = ReasoningEngine::new(oracle, memory, "gpt-oracle", reason_memory_core::oracle::ReasoningEffort::Medium);
//!
//! let result = engine
//!     .solve("implement retry with backoff", &"workspace-1".to_string(), SolveOptions::default())
//!     .await?;
//! println!("success={} score={:.2}", result.success, result.score);
//! # Ok(())
//! # }
//! ```

pub mod backup;
pub mod constants;
pub mod embeddings;
pub mod error;
pub mod memory;
pub mod oracle;
pub mod reasoning;
pub mod retry;
pub mod storage;
pub mod tools;
pub mod types;
pub mod workspace;

pub use error::{Error, Result};
pub use memory::MemoryCore;
pub use reasoning::{ReasoningEngine, SolveOptions, SolveResult};
pub use types::{MemoryId, MemoryItem, Outcome, ReasoningTrace, TraceId, WorkspaceId};
