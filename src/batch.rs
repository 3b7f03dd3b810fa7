//! Eager (full-batch) extraction entry points.
//!
//! ## Why eager vs. streaming?
//!
//! This module provides the simpler API: process every document, then return
//! one [`BatchOutput`] with results in upload order and aggregate stats. Use
//! [`crate::stream::extract_stream`] instead when you want outcomes as they
//! complete (progress display, incremental writes).
//!
//! Documents are independent: no state is shared between their pipelines,
//! and one document's failure is captured in its own result slot without
//! cancelling or corrupting the rest. The only fatal errors are the ones
//! that doom every document equally (no API key, invalid config).

use crate::config::ExtractionConfig;
use crate::error::ExtractError;
use crate::output::{BatchOutput, BatchStats, DocumentResult};
use crate::pipeline::llm::{CompletionClient, CompletionReply};
use crate::pipeline::{normalize, parse, text};
use crate::prompts;
use crate::record::PolicyRecord;
use futures::stream::{self, StreamExt};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// One uploaded document: a filename and the raw PDF bytes.
///
/// Owned by the batch for the duration of one processing pass; the bytes are
/// not needed (and not kept) once text extraction has run.
#[derive(Debug, Clone)]
pub struct Document {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl Document {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }

    /// Read a document from disk. The filename recorded in results is the
    /// path's final component.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, ExtractError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ExtractError::FileNotFound {
                path: path.to_path_buf(),
            },
            std::io::ErrorKind::PermissionDenied => ExtractError::PermissionDenied {
                path: path.to_path_buf(),
            },
            _ => ExtractError::Internal(format!("Failed to read '{}': {e}", path.display())),
        })?;

        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self { filename, bytes })
    }
}

/// Process a batch of documents and collect every outcome.
///
/// Sequential when `config.concurrency == 1` (the default); otherwise up to
/// `concurrency` document pipelines run at once and the results are sorted
/// back into upload order. Per-document failures land in their result slot —
/// see [`DocumentResult`].
///
/// # Errors
/// Fatal only: missing API key or an unusable config.
pub async fn process_batch(
    documents: Vec<Document>,
    config: &ExtractionConfig,
) -> Result<BatchOutput, ExtractError> {
    let batch_start = Instant::now();
    let client = CompletionClient::from_config(config)?;
    let total = documents.len();
    info!("Processing batch of {} documents", total);

    let mut results: Vec<DocumentResult> = if config.concurrency <= 1 {
        let mut out = Vec::with_capacity(total);
        for (index, doc) in documents.iter().enumerate() {
            out.push(extract_one(index, doc, &client, config).await);
        }
        out
    } else {
        let client = &client;
        stream::iter(
            documents
                .iter()
                .enumerate()
                .map(|(index, doc)| async move { extract_one(index, doc, client, config).await }),
        )
        .buffer_unordered(config.concurrency)
        .collect()
        .await
    };

    // Workers complete out of order; the contract is upload order.
    results.sort_by_key(|r| r.index);

    let extracted = results.iter().filter(|r| r.is_ok()).count();
    let stats = BatchStats {
        total_documents: total,
        extracted,
        failed: total - extracted,
        total_input_tokens: results.iter().map(|r| r.input_tokens as u64).sum(),
        total_output_tokens: results.iter().map(|r| r.output_tokens as u64).sum(),
        total_duration_ms: batch_start.elapsed().as_millis() as u64,
    };

    info!(
        "Batch complete: {}/{} documents extracted in {}ms",
        extracted, total, stats.total_duration_ms
    );

    Ok(BatchOutput { results, stats })
}

/// Run the full pipeline for one document.
///
/// Always returns a [`DocumentResult`] — never propagates the error upward,
/// so a single bad document cannot abort a batch. Callers check
/// `result.error` to decide whether to display the record or the failure.
pub async fn extract_one(
    index: usize,
    doc: &Document,
    client: &CompletionClient,
    config: &ExtractionConfig,
) -> DocumentResult {
    let start = Instant::now();
    debug!("Processing '{}' ({} bytes)", doc.filename, doc.bytes.len());

    match run_stages(doc, client, config).await {
        Ok((record, reply)) => {
            debug!(
                "'{}': extracted in {}ms ({} retries)",
                doc.filename,
                start.elapsed().as_millis(),
                reply.retries
            );
            DocumentResult {
                index,
                filename: doc.filename.clone(),
                record: Some(record),
                error: None,
                input_tokens: reply.prompt_tokens,
                output_tokens: reply.completion_tokens,
                duration_ms: start.elapsed().as_millis() as u64,
                retries: reply.retries,
            }
        }
        Err(e) => {
            warn!("'{}': {}", doc.filename, e);
            DocumentResult {
                index,
                filename: doc.filename.clone(),
                record: None,
                error: Some(e),
                input_tokens: 0,
                output_tokens: 0,
                duration_ms: start.elapsed().as_millis() as u64,
                retries: 0,
            }
        }
    }
}

/// The per-document pipeline: text → prompt → completion → parse → normalize.
async fn run_stages(
    doc: &Document,
    client: &CompletionClient,
    config: &ExtractionConfig,
) -> Result<(PolicyRecord, CompletionReply), crate::error::DocumentError> {
    let text = text::extract_text(&doc.bytes).await?;
    let prompt = prompts::build_prompt(&text, config);
    let reply = client.complete(&prompt).await?;
    let fields = parse::parse_reply(&reply.content, config.reply_format)?;
    Ok((normalize::normalize(&fields), reply))
}
