//! Tunable constants called out by name in the specification.

use std::time::Duration;

/// Dimensionality of every stored/queried embedding vector.
pub const EMBEDDING_DIM: usize = 384;

/// Composite score weight applied to relevance (1 − normalized distance).
pub const WEIGHT_RELEVANCE: f64 = 0.65;
/// Composite score weight applied to recency.
pub const WEIGHT_RECENCY: f64 = 0.25;
/// Composite score weight applied to the combined error/evolution boost.
pub const WEIGHT_BOOST: f64 = 0.10;

/// Flat boost applied to memories carrying an `error_context`, before the
/// `boost_error_warnings` gate and the `WEIGHT_BOOST` scaling are applied.
pub const ERROR_CONTEXT_BOOST: f64 = 0.15;
/// Per-stage evolution bonus, capped by [`EVOLUTION_BONUS_CAP`].
pub const EVOLUTION_BONUS_PER_STAGE: f64 = 0.01;
/// Maximum evolution bonus regardless of stage.
pub const EVOLUTION_BONUS_CAP: f64 = 0.05;

/// Recency half-life window in days: a memory created `RECENCY_WINDOW_DAYS`
/// ago or more has a recency score of zero.
pub const RECENCY_WINDOW_DAYS: f64 = 30.0;

/// Retrieval over-fetch multiplier: ask storage for `k * CANDIDATE_MULTIPLIER`.
pub const CANDIDATE_MULTIPLIER: usize = 3;

/// Default success threshold for the EVALUATE → JUDGE transition.
pub const DEFAULT_SUCCESS_THRESHOLD: f64 = 0.8;

/// Default maximum number of GENERATE/EVALUATE/REFINE iterations.
pub const DEFAULT_MAX_ITERATIONS: u32 = 3;

/// Default LLM oracle cache capacity (entry count).
pub const DEFAULT_CACHE_CAPACITY: usize = 100;
/// Default LLM oracle cache TTL.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Default retry attempts for the retry envelope.
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
/// Default minimum backoff wait.
pub const DEFAULT_RETRY_MIN_WAIT: Duration = Duration::from_millis(500);
/// Default maximum backoff wait.
pub const DEFAULT_RETRY_MAX_WAIT: Duration = Duration::from_secs(10);

/// Default connection timeout for an oracle call.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Rough characters-per-token heuristic used to approximate a prompt token
/// budget without a real tokenizer (spec §9 Open Question 4).
pub const APPROX_CHARS_PER_TOKEN: usize = 4;
