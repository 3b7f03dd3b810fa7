//! Completion client: the one stage with network I/O.
//!
//! The client is an explicitly constructed object — credentials are sourced
//! once at construction (config first, `OPENAI_API_KEY` second) and held
//! privately. They are never logged and never appear in error chains.
//!
//! ## Retry Strategy
//!
//! Only HTTP 429 is retried. Rate limiting is transient by definition and
//! frequent under concurrent batches; exponential backoff
//! (`retry_backoff_ms * 2^attempt`) avoids the thundering-herd where N
//! workers retry simultaneously against a recovering endpoint, and a
//! server-supplied `Retry-After` overrides the computed delay. Transport
//! failures, timeouts, auth rejections, and 5xx responses surface
//! immediately as per-document [`DocumentError::UpstreamUnavailable`] — the
//! operator sees them on the failing document while the batch continues.

use crate::config::ExtractionConfig;
use crate::error::{DocumentError, ExtractError};
use serde::Deserialize;
use serde_json::json;
use std::fmt;
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

/// A successful completion call.
#[derive(Debug, Clone)]
pub struct CompletionReply {
    /// The model's reply, verbatim.
    pub content: String,
    /// Prompt tokens billed, per the API usage block (0 if absent).
    pub prompt_tokens: u32,
    /// Completion tokens billed (0 if absent).
    pub completion_tokens: u32,
    /// How many rate-limit retries this call spent.
    pub retries: u8,
}

/// Client for an OpenAI-compatible chat-completions endpoint.
pub struct CompletionClient {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: usize,
    max_retries: u32,
    retry_backoff_ms: u64,
}

impl fmt::Debug for CompletionClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionClient")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl CompletionClient {
    /// Construct a client from the config.
    ///
    /// Fails fast with [`ExtractError::MissingApiKey`] so a misconfigured
    /// run dies before any PDF is parsed, not on the first network call.
    pub fn from_config(config: &ExtractionConfig) -> Result<Self, ExtractError> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .filter(|k| !k.trim().is_empty())
            .ok_or(ExtractError::MissingApiKey)?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.api_timeout_secs))
            .build()
            .map_err(|e| ExtractError::Internal(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            max_retries: config.max_retries,
            retry_backoff_ms: config.retry_backoff_ms,
        })
    }

    /// Send one prompt as a single user-role message and return the reply.
    pub async fn complete(&self, prompt: &str) -> Result<CompletionReply, DocumentError> {
        let url = format!("{}/chat/completions", self.api_base);
        let body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        });

        let mut retry_after: Option<u64> = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff_ms = retry_after
                    .map(|secs| secs * 1000)
                    .unwrap_or(self.retry_backoff_ms * 2u64.pow(attempt - 1));
                warn!(
                    "Rate limited; retry {}/{} after {}ms",
                    attempt, self.max_retries, backoff_ms
                );
                sleep(Duration::from_millis(backoff_ms)).await;
            }

            let response = self
                .http
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await
                .map_err(classify_transport_error)?;

            let status = response.status();

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                retry_after = parse_retry_after(response.headers());
                continue;
            }

            if !status.is_success() {
                let detail = response.text().await.unwrap_or_default();
                return Err(DocumentError::UpstreamUnavailable {
                    detail: format!("HTTP {status}: {}", truncate(&detail, 200)),
                });
            }

            let payload: ChatResponse =
                response
                    .json()
                    .await
                    .map_err(|e| DocumentError::UpstreamUnavailable {
                        detail: format!("failed to decode API response: {e}"),
                    })?;

            let content = payload
                .choices
                .into_iter()
                .next()
                .map(|c| c.message.content)
                .ok_or_else(|| DocumentError::UpstreamUnavailable {
                    detail: "API response contained no choices".into(),
                })?;

            debug!(
                "Completion: {} prompt tokens, {} completion tokens, {} retries",
                payload.usage.prompt_tokens, payload.usage.completion_tokens, attempt
            );

            return Ok(CompletionReply {
                content,
                prompt_tokens: payload.usage.prompt_tokens,
                completion_tokens: payload.usage.completion_tokens,
                retries: attempt as u8,
            });
        }

        Err(DocumentError::UpstreamRateLimited {
            retries: self.max_retries,
            retry_after_secs: retry_after,
        })
    }
}

/// Map a transport-level failure onto the per-document error vocabulary.
///
/// Timeouts are deliberately classified as unavailability: from the batch's
/// point of view a hung endpoint and an unreachable one are the same thing.
fn classify_transport_error(e: reqwest::Error) -> DocumentError {
    let detail = if e.is_timeout() {
        "request timed out".to_string()
    } else {
        e.to_string()
    };
    DocumentError::UpstreamUnavailable { detail }
}

/// Read a `Retry-After` delay in whole seconds, if the server sent one.
fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Usage,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: String,
}

#[derive(Deserialize, Default)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}
