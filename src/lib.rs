//! # pdf2policy
//!
//! Extract structured fields from insurance policy PDFs with an LLM.
//!
//! ## Why this crate?
//!
//! Policy schedules bury the same dozen facts — policy number, parties,
//! dates, premium amounts — in wildly different layouts across insurers.
//! Template- and regex-based extractors break on every new carrier. Instead
//! this crate flattens each PDF's text layer and asks a completion model to
//! read it as a human would, then defensively reconciles the reply onto one
//! canonical, exportable record.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF bytes
//!  │
//!  ├─ 1. Text       flatten all pages to one blob (pdf-extract, spawn_blocking)
//!  ├─ 2. Prompt     deterministic instruction block + the document text
//!  ├─ 3. Complete   one chat-completion call, temperature 0, 429 backoff
//!  ├─ 4. Parse      strict JSON decode; fences and stray prose tolerated
//!  ├─ 5. Normalize  alias table → canonical schema, motor-only OD/TP rule
//!  └─ 6. Export     ordered batch results → CSV / JSON
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2policy::{process_batch, to_csv, Document, ExtractionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // API key read from OPENAI_API_KEY
//!     let config = ExtractionConfig::default();
//!     let docs = vec![Document::from_path("policy.pdf").await?];
//!     let output = process_batch(docs, &config).await?;
//!
//!     for (filename, error) in output.failures() {
//!         eprintln!("{filename}: {error}");
//!     }
//!     std::fs::write("extracted_policies.csv", to_csv(&output.results)?)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2policy` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! pdf2policy = { version = "0.3", default-features = false }
//! ```
//!
//! ## Failure model
//!
//! A document that cannot be read, completed, or parsed becomes an error
//! entry in the batch output — it never aborts the batch and its reply text
//! (when there was one) is retained for inspection. See [`error`] for the
//! fatal/per-document split.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod batch;
pub mod config;
pub mod error;
pub mod export;
pub mod output;
pub mod pipeline;
pub mod prompts;
pub mod record;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::{extract_one, process_batch, Document};
pub use config::{ExtractionConfig, ExtractionConfigBuilder, ReplyFormat};
pub use error::{DocumentError, ExtractError};
pub use export::{to_csv, to_json, write_csv, write_json, DEFAULT_CSV_FILENAME};
pub use output::{BatchOutput, BatchStats, DocumentResult};
pub use pipeline::llm::{CompletionClient, CompletionReply};
pub use record::{FieldValue, PolicyRecord, CANONICAL_FIELDS};
pub use stream::{extract_stream, DocumentStream};
