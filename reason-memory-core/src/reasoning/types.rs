//! Request/response shapes for the Iterative Reasoning Engine (spec §4.6).

use serde::Serialize;

use crate::types::{MemoryId, TrajectoryStep};

/// Which MaTTS (memory-aware test-time scaling) mode, if any, drives a solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MattsMode {
    /// K candidate generations fanned out concurrently, then a single
    /// self-contrast SELECT step picks the official trajectory.
    Parallel,
    /// A single chain of depth K, each step refining the one before it.
    Sequential,
}

/// The FSM states named in spec §4.6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Generate,
    Evaluate,
    Refine,
    Select,
    Judge,
    Extract,
    Store,
    Done,
}

/// Caller-supplied knobs for a single `solve` call.
#[derive(Debug, Clone)]
pub struct SolveOptions {
    pub use_memory: bool,
    pub enable_matts: bool,
    pub matts_k: u32,
    pub matts_mode: MattsMode,
    pub store_result: bool,
    pub success_threshold: f64,
    pub max_iterations: u32,
    pub retrieval_k: usize,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            use_memory: true,
            enable_matts: false,
            matts_k: 3,
            matts_mode: MattsMode::Parallel,
            store_result: true,
            success_threshold: crate::constants::DEFAULT_SUCCESS_THRESHOLD,
            max_iterations: crate::constants::DEFAULT_MAX_ITERATIONS,
            retrieval_k: 5,
        }
    }
}

/// Outcome of one `solve` call.
#[derive(Debug, Clone, Serialize)]
pub struct SolveResult {
    pub success: bool,
    pub output: String,
    pub trajectory: Vec<TrajectoryStep>,
    pub score: f64,
    pub iterations: u32,
    pub memories_extracted: Vec<MemoryId>,
    pub judge_reasoning: String,
    /// Populated only in MaTTS-parallel mode: every candidate's final output.
    pub all_outputs: Option<Vec<String>>,
    /// Populated only in MaTTS-parallel mode: the `trajectory_id` SELECT chose.
    pub selected_trajectory: Option<u32>,
    /// Set when STORE failed; the engine does not retry storage itself.
    pub storage_error: Option<String>,
}
