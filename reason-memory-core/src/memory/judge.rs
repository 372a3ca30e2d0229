//! Judge verdict contract (spec §4.5.3): lenient JSON parsing of an LLM
//! judge's reply, in the same tolerant-coercion idiom the teacher used for
//! its reflection/extraction JSON parsing — strip markdown code fences,
//! coerce out-of-range scores, coerce unknown verdicts to `partial` rather
//! than failing the whole call.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::types::{ErrorContext, Outcome};

/// Parsed judge verdict.
#[derive(Debug, Clone)]
pub struct JudgeVerdict {
    pub verdict: Outcome,
    pub score: f64,
    pub reasoning: String,
    pub learnings: Vec<String>,
    pub error_context: Option<ErrorContext>,
}

#[derive(Debug, Deserialize)]
struct RawVerdict {
    verdict: Option<Value>,
    score: Option<Value>,
    reasoning: Option<Value>,
    learnings: Option<Value>,
    error_context: Option<RawErrorContext>,
}

#[derive(Debug, Deserialize)]
struct RawErrorContext {
    error_type: Option<String>,
    failure_pattern: Option<String>,
    corrective_guidance: Option<String>,
}

/// Strips a leading/trailing ```json fence (or bare ```), as LLM judges
/// routinely wrap their JSON payload in one despite being asked not to.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.trim_start_matches(['\n', '\r']);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn coerce_verdict(value: Option<Value>) -> Outcome {
    value
        .and_then(|v| v.as_str().map(str::to_string))
        .and_then(|s| s.parse::<Outcome>().ok())
        .unwrap_or(Outcome::Partial)
}

fn coerce_score(value: Option<Value>) -> f64 {
    value
        .and_then(|v| v.as_f64())
        .unwrap_or(0.0)
        .clamp(0.0, 1.0)
}

fn coerce_learnings(value: Option<Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect(),
        Some(Value::String(single)) => vec![single],
        _ => Vec::new(),
    }
}

fn coerce_reasoning(value: Option<Value>) -> String {
    value
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}

/// Parses a judge's raw reply text into a [`JudgeVerdict`], tolerating a
/// surrounding markdown code fence and coercing out-of-contract fields.
/// Only fails with [`Error::JsonParse`] when the payload isn't a JSON object
/// at all.
pub fn parse_verdict(raw: &str) -> Result<JudgeVerdict> {
    let stripped = strip_code_fence(raw);
    let raw_verdict: RawVerdict = serde_json::from_str(stripped)
        .map_err(|e| Error::JsonParse(format!("judge reply is not a JSON object: {e}")))?;

    let error_context = raw_verdict.error_context.and_then(|ec| {
        match (ec.error_type, ec.failure_pattern, ec.corrective_guidance) {
            (Some(error_type), Some(failure_pattern), Some(corrective_guidance)) => {
                Some(ErrorContext {
                    error_type,
                    failure_pattern,
                    corrective_guidance,
                })
            }
            _ => None,
        }
    });

    Ok(JudgeVerdict {
        verdict: coerce_verdict(raw_verdict.verdict),
        score: coerce_score(raw_verdict.score),
        reasoning: coerce_reasoning(raw_verdict.reasoning),
        learnings: coerce_learnings(raw_verdict.learnings),
        error_context,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_verdict() {
        let raw = r#"{"verdict":"success","score":0.9,"reasoning":"good","learnings":["a","b"]}"#;
        let v = parse_verdict(raw).unwrap();
        assert_eq!(v.verdict, Outcome::Success);
        assert_eq!(v.score, 0.9);
        assert_eq!(v.learnings, vec!["a", "b"]);
    }

    #[test]
    fn strips_markdown_code_fence() {
        let raw = "```json\n{\"verdict\":\"failure\",\"score\":0.1}\n```";
        let v = parse_verdict(raw).unwrap();
        assert_eq!(v.verdict, Outcome::Failure);
    }

    #[test]
    fn unknown_verdict_coerces_to_partial() {
        let raw = r#"{"verdict":"maybe","score":0.5}"#;
        let v = parse_verdict(raw).unwrap();
        assert_eq!(v.verdict, Outcome::Partial);
    }

    #[test]
    fn out_of_range_score_is_clamped() {
        let raw = r#"{"verdict":"success","score":5.0}"#;
        let v = parse_verdict(raw).unwrap();
        assert_eq!(v.score, 1.0);

        let raw_neg = r#"{"verdict":"success","score":-3.0}"#;
        let v_neg = parse_verdict(raw_neg).unwrap();
        assert_eq!(v_neg.score, 0.0);
    }

    #[test]
    fn missing_learnings_defaults_to_empty() {
        let raw = r#"{"verdict":"success","score":0.8}"#;
        let v = parse_verdict(raw).unwrap();
        assert!(v.learnings.is_empty());
    }

    #[test]
    fn completely_broken_payload_is_an_error() {
        let raw = "not json at all";
        assert!(parse_verdict(raw).is_err());
    }

    #[test]
    fn error_context_requires_all_three_fields() {
        let raw = r#"{"verdict":"failure","score":0.2,"error_context":{"error_type":"X"}}"#;
        let v = parse_verdict(raw).unwrap();
        assert!(v.error_context.is_none());
    }
}
