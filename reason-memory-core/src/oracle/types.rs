//! Request/response shapes for the LLM oracle.

use serde::{Deserialize, Serialize};

/// Reasoning-effort hint passed through to the underlying LLM transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasoningEffort {
    Low,
    Medium,
    High,
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// A request to the LLM oracle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OracleRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub temperature: f64,
    pub max_output_tokens: u32,
    pub reasoning_effort: ReasoningEffort,
}

impl OracleRequest {
    /// A request is cacheable iff it is fully deterministic (`temperature == 0`).
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.temperature == 0.0
    }
}

/// Usage metrics returned alongside oracle output.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// The oracle's response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleResponse {
    pub content: String,
    pub usage: Usage,
    /// Free-form metadata (e.g. finish reason, model version actually served).
    pub metadata: std::collections::BTreeMap<String, String>,
}
