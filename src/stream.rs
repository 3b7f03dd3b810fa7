//! Streaming extraction API: emit document outcomes as they complete.
//!
//! ## Why stream?
//!
//! A batch of slow completion calls takes a while. A stream-based API lets
//! callers display partial results immediately and drive progress bars
//! instead of staring at a blank terminal until [`crate::batch::process_batch`]
//! returns.
//!
//! The stream is finite, lazy, and consumed once; there is no rewinding a
//! half-drained batch. In concurrent mode outcomes arrive in completion
//! order, not upload order — sort by [`DocumentResult::index`] if order
//! matters downstream.

use crate::batch::{extract_one, Document};
use crate::config::ExtractionConfig;
use crate::error::ExtractError;
use crate::output::DocumentResult;
use crate::pipeline::llm::CompletionClient;
use futures::stream::{self, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use tokio_stream::Stream;
use tracing::info;

/// A boxed stream of per-document outcomes.
pub type DocumentStream = Pin<Box<dyn Stream<Item = DocumentResult> + Send>>;

/// Process documents lazily, yielding each outcome as it is ready.
///
/// Sequential when `config.concurrency == 1`, in which case outcomes arrive
/// in upload order. With concurrency, up to `concurrency` documents are in
/// flight and outcomes arrive in completion order.
///
/// # Errors
/// Fatal only (missing API key, unusable config). Per-document failures are
/// items in the stream, not errors from this function.
pub async fn extract_stream(
    documents: Vec<Document>,
    config: &ExtractionConfig,
) -> Result<DocumentStream, ExtractError> {
    let client = Arc::new(CompletionClient::from_config(config)?);
    let config = config.clone();
    let concurrency = config.concurrency;
    info!("Streaming batch of {} documents", documents.len());

    if concurrency <= 1 {
        let s = stream::iter(documents.into_iter().enumerate()).then(move |(index, doc)| {
            let client = Arc::clone(&client);
            let cfg = config.clone();
            async move { extract_one(index, &doc, &client, &cfg).await }
        });
        Ok(Box::pin(s))
    } else {
        let s = stream::iter(documents.into_iter().enumerate().map(move |(index, doc)| {
            let client = Arc::clone(&client);
            let cfg = config.clone();
            async move { extract_one(index, &doc, &client, &cfg).await }
        }))
        .buffer_unordered(concurrency);
        Ok(Box::pin(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sequential_stream_yields_in_upload_order() {
        let docs = vec![
            Document::new("a.pdf", b"junk".to_vec()),
            Document::new("b.pdf", b"junk".to_vec()),
            Document::new("c.pdf", b"junk".to_vec()),
        ];
        let config = ExtractionConfig::builder().api_key("test-key").build().unwrap();

        let mut stream = extract_stream(docs, &config).await.unwrap();
        let mut seen = Vec::new();
        while let Some(result) = stream.next().await {
            seen.push(result.filename);
        }
        assert_eq!(seen, vec!["a.pdf", "b.pdf", "c.pdf"]);
    }

    #[tokio::test]
    async fn stream_is_finite() {
        let config = ExtractionConfig::builder().api_key("test-key").build().unwrap();
        let mut stream = extract_stream(vec![], &config).await.unwrap();
        assert!(stream.next().await.is_none());
    }
}
