//! Evaluation Client — the single point of entry for AI screening calls.
//!
//! ARCHITECTURAL RULE: no other module talks to the AI provider directly.
//! The orchestrator only sees the `Evaluator` trait, so the provider can be
//! swapped or mocked without touching the pipeline.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::Config;
use crate::evaluator::prompts::{user_prompt, SCREENING_SYSTEM};
use crate::models::evaluation::Decision;

pub mod prompts;

const TEMPERATURE: f32 = 0.5;
const MAX_TOKENS: u32 = 1500;

#[derive(Debug, Error)]
pub enum EvaluateError {
    /// Transport failure, timeout, or provider-side 5xx. Transient — the
    /// orchestrator may retry.
    #[error("AI service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Provider signalled throttling (429). Transient — the orchestrator
    /// may retry.
    #[error("AI service rate limited")]
    RateLimited,

    /// The payload came back but does not decode to the verdict contract.
    /// Never retried: a contract defect, not a transient fault.
    #[error("malformed AI response: {0}")]
    MalformedResponse(String),
}

impl EvaluateError {
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            EvaluateError::ServiceUnavailable(_) | EvaluateError::RateLimited
        )
    }
}

/// The structured outcome of one evaluation call.
///
/// Decoded strictly: any extra field, missing field, or decision outside
/// {Shortlist, Reject} is a `MalformedResponse`. The score *range* is
/// deliberately not checked here — that invariant belongs to the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Verdict {
    pub decision: Decision,
    pub match_score: f64,
    pub justification: String,
    pub key_matches: Vec<String>,
    pub missing_requirements: Vec<String>,
}

/// Capability interface for the screening decision service.
/// Carried in `AppState` as `Arc<dyn Evaluator>`.
#[async_trait]
pub trait Evaluator: Send + Sync {
    /// One synchronous outbound call: job description + résumé text in,
    /// structured verdict out. Inputs must be non-empty after trimming;
    /// the extractor and job validation upstream guarantee that.
    async fn evaluate(&self, job_text: &str, resume_text: &str)
        -> Result<Verdict, EvaluateError>;
}

// ── OpenAI-style chat-completions wire types ────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    response_format: ResponseFormat,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// Production evaluator against an OpenAI-compatible chat-completions
/// endpoint (OpenAI itself, or a local Ollama behind the same API shape —
/// pick via `AI_BASE_URL`/`AI_MODEL`).
#[derive(Clone)]
pub struct OpenAiEvaluator {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiEvaluator {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(config.ai_timeout_secs))
                .build()
                .expect("Failed to build HTTP client"),
            base_url: config.ai_base_url.trim_end_matches('/').to_string(),
            api_key: config.ai_api_key.clone(),
            model: config.ai_model.clone(),
        }
    }
}

#[async_trait]
impl Evaluator for OpenAiEvaluator {
    async fn evaluate(
        &self,
        job_text: &str,
        resume_text: &str,
    ) -> Result<Verdict, EvaluateError> {
        debug_assert!(!job_text.trim().is_empty() && !resume_text.trim().is_empty());

        let prompt = user_prompt(job_text, resume_text);
        let request_body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SCREENING_SYSTEM,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
            response_format: ResponseFormat {
                format_type: "json_object",
            },
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| EvaluateError::ServiceUnavailable(e.to_string()))?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(EvaluateError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EvaluateError::ServiceUnavailable(format!(
                "status {status}: {body}"
            )));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| EvaluateError::MalformedResponse(e.to_string()))?;

        let content = chat
            .choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .ok_or_else(|| EvaluateError::MalformedResponse("no completion content".into()))?;

        let verdict = parse_verdict(content)?;
        debug!(
            decision = verdict.decision.as_str(),
            match_score = verdict.match_score,
            "AI evaluation call succeeded"
        );
        Ok(verdict)
    }
}

/// Decodes the model output into a `Verdict`, rejecting anything outside
/// the contract shape early rather than propagating partially-typed data.
pub fn parse_verdict(text: &str) -> Result<Verdict, EvaluateError> {
    let text = strip_json_fences(text);
    serde_json::from_str(text).map_err(|e| EvaluateError::MalformedResponse(e.to_string()))
}

/// Strips ```json ... ``` or ``` ... ``` code fences from model output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}
