//! Configuration types for policy extraction.
//!
//! All behaviour is controlled through [`ExtractionConfig`], built via its
//! [`ExtractionConfigBuilder`]. Keeping every knob in one struct makes it
//! trivial to share configs across tasks and to diff two runs to understand
//! why their outputs differ.
//!
//! # Design choice: builder over constructor
//! A dozen-field constructor is unreadable and breaks on every new field.
//! The builder lets callers set only what they care about and rely on
//! documented defaults for the rest.

use crate::error::ExtractError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default chat-completions endpoint base.
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Default model identifier.
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Configuration for one extraction run.
///
/// Built via [`ExtractionConfig::builder()`] or [`ExtractionConfig::default()`].
///
/// # Example
/// ```rust
/// use pdf2policy::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .model("gpt-4o-mini")
///     .concurrency(4)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Model identifier sent with every completion request. Default: "gpt-4o".
    pub model: String,

    /// Base URL of the OpenAI-compatible API. Default:
    /// `https://api.openai.com/v1`. Point this at any compatible endpoint
    /// (Azure gateway, vLLM, LiteLLM proxy).
    pub api_base: String,

    /// API key. If `None`, `OPENAI_API_KEY` is read once when the completion
    /// client is constructed. Never logged, never serialized.
    pub api_key: Option<String>,

    /// Sampling temperature. Default: 0.0.
    ///
    /// Field extraction wants the most deterministic-leaning setting the API
    /// offers. This is not a reproducibility guarantee, only a bias.
    pub temperature: f32,

    /// Maximum tokens the model may generate per reply. Default: 1024.
    ///
    /// A twelve-field JSON object fits in well under 400 tokens; 1024 leaves
    /// room for models that insist on fence wrappers and stray prose without
    /// letting a runaway reply bill thousands of tokens.
    pub max_tokens: usize,

    /// Retry attempts when the service answers HTTP 429. Default: 3.
    ///
    /// Only rate limiting is retried; transport, auth, and server errors
    /// surface immediately as per-document failures.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds (exponential backoff). Default: 500.
    ///
    /// Doubles after each attempt: 500 ms → 1 s → 2 s. A server-supplied
    /// `Retry-After` header overrides the computed delay.
    pub retry_backoff_ms: u64,

    /// Number of documents processed concurrently. Default: 1 (sequential).
    ///
    /// Extraction is correct at any concurrency — documents share no state
    /// and results are reassembled in upload order — so this is purely a
    /// throughput knob. Size it to the upstream API's rate limit.
    pub concurrency: usize,

    /// Per-completion-call timeout in seconds. Default: 60.
    ///
    /// A timed-out call is classified as an upstream-unavailable failure for
    /// that document; the batch continues.
    pub api_timeout_secs: u64,

    /// Expected reply shape. Default: [`ReplyFormat::Json`].
    pub reply_format: ReplyFormat,

    /// Custom prompt template. If `None`, uses the built-in default.
    ///
    /// The template must contain the `{policy_text}` placeholder; see
    /// [`crate::prompts::build_prompt`].
    pub prompt_template: Option<String>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            api_key: None,
            temperature: 0.0,
            max_tokens: 1024,
            max_retries: 3,
            retry_backoff_ms: 500,
            concurrency: 1,
            api_timeout_secs: 60,
            reply_format: ReplyFormat::default(),
            prompt_template: None,
        }
    }
}

// Manual Debug so the API key can never leak into logs or error chains.
impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("concurrency", &self.concurrency)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("reply_format", &self.reply_format)
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn api_base(mut self, base: impl Into<String>) -> Self {
        self.config.api_base = base.into();
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n.max(1);
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn reply_format(mut self, format: ReplyFormat) -> Self {
        self.config.reply_format = format;
        self
    }

    pub fn prompt_template(mut self, template: impl Into<String>) -> Self {
        self.config.prompt_template = Some(template.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, ExtractError> {
        let c = &self.config;
        if c.model.trim().is_empty() {
            return Err(ExtractError::InvalidConfig("Model must not be empty".into()));
        }
        if c.api_base.trim().is_empty() {
            return Err(ExtractError::InvalidConfig(
                "API base URL must not be empty".into(),
            ));
        }
        if let Some(ref template) = c.prompt_template {
            if !template.contains("{policy_text}") {
                return Err(ExtractError::InvalidConfig(
                    "Prompt template must contain the {policy_text} placeholder".into(),
                ));
            }
        }
        Ok(self.config)
    }
}

/// The reply shape the model is expected to produce.
///
/// JSON is the shape the default prompt requests. The line-based shape exists
/// for prompt variants that ask for one `Key: value` pair per line; see
/// [`crate::pipeline::parse`] for its documented limitations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReplyFormat {
    /// A single JSON object, optionally fence-wrapped. (default)
    #[default]
    Json,
    /// One `Key: value` pair per line, no escaping.
    KeyValueLines,
}
