//! HTTP-backed [`LlmClient`]: the real transport behind the Cached LLM
//! Oracle (spec §1 names the LLM transport an external collaborator,
//! specified only by the `LlmClient` trait contract). Speaks a generic
//! OpenAI-compatible chat-completions wire shape over `reqwest`, since the
//! teacher repo never calls out to an LLM at the HTTP layer and no example
//! in the pack ships a narrower, equally-portable shape.

use reason_memory_core::error::{Error, Result};
use reason_memory_core::oracle::{LlmClient, OracleRequest, OracleResponse, Usage};
use serde::{Deserialize, Serialize};

pub struct HttpLlmClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpLlmClient {
    #[must_use]
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    /// A minimal, low-cost call used only to validate the API key at
    /// startup (spec §6: "failure is fatal"). Never logs the key itself.
    pub async fn probe(&self) -> Result<()> {
        let request = OracleRequest {
            model: "probe".to_string(),
            messages: vec![reason_memory_core::oracle::Message::user("ping")],
            temperature: 0.0,
            max_output_tokens: 1,
            reasoning_effort: reason_memory_core::oracle::ReasoningEffort::Low,
        };
        self.create(&request).await.map(|_| ())
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[derive(Deserialize, Default)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

#[async_trait::async_trait]
impl LlmClient for HttpLlmClient {
    async fn create(&self, request: &OracleRequest) -> Result<OracleResponse> {
        let body = ChatRequest {
            model: &request.model,
            messages: request
                .messages
                .iter()
                .map(|m| ChatMessage {
                    role: &m.role,
                    content: &m.content,
                })
                .collect(),
            temperature: request.temperature,
            max_tokens: request.max_output_tokens,
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::LlmGeneration(format!("transport error: {e}")))?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED
            || response.status() == reqwest::StatusCode::FORBIDDEN
        {
            return Err(Error::Auth(format!(
                "LLM oracle rejected credentials (status {})",
                response.status()
            )));
        }
        if !response.status().is_success() {
            return Err(Error::LlmGeneration(format!(
                "LLM oracle returned status {}",
                response.status()
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::LlmGeneration(format!("malformed oracle response: {e}")))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Error::LlmGeneration("oracle response had no choices".to_string()))?;

        let usage = parsed.usage.unwrap_or_default();
        let mut metadata = std::collections::BTreeMap::new();
        if let Some(reason) = choice.finish_reason {
            metadata.insert("finish_reason".to_string(), reason);
        }

        Ok(OracleResponse {
            content: choice.message.content,
            usage: Usage {
                input_tokens: usage.prompt_tokens,
                output_tokens: usage.completion_tokens,
            },
            metadata,
        })
    }
}
