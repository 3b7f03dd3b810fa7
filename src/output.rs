//! Batch output types: per-document results and aggregate statistics.

use crate::error::DocumentError;
use crate::record::PolicyRecord;
use serde::{Deserialize, Serialize};

/// The outcome of processing one document.
///
/// Exactly one of `record` / `error` is set. Kept as two `Option`s rather
/// than a `Result` so the type stays serializable and partial batches can be
/// dumped to JSON for a post-run report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentResult {
    /// Position of this document in the upload batch (0-based).
    pub index: usize,
    /// Filename supplied with the document bytes.
    pub filename: String,
    /// The normalized record, when extraction succeeded.
    pub record: Option<PolicyRecord>,
    /// The per-document failure, when it did not.
    pub error: Option<DocumentError>,
    /// Prompt tokens billed for this document's completion call.
    pub input_tokens: u32,
    /// Completion tokens billed for this document's completion call.
    pub output_tokens: u32,
    /// Wall-clock time for this document, extraction through normalization.
    pub duration_ms: u64,
    /// Completion-call retries spent on this document.
    pub retries: u8,
}

impl DocumentResult {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Everything a finished batch produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOutput {
    /// One entry per input document, in upload order. Failed documents keep
    /// their position as error entries; nothing is re-indexed.
    pub results: Vec<DocumentResult>,
    pub stats: BatchStats,
}

impl BatchOutput {
    /// The successfully extracted records, still in upload order.
    pub fn records(&self) -> impl Iterator<Item = &PolicyRecord> {
        self.results.iter().filter_map(|r| r.record.as_ref())
    }

    /// The failed documents, still in upload order.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &DocumentError)> {
        self.results
            .iter()
            .filter_map(|r| r.error.as_ref().map(|e| (r.filename.as_str(), e)))
    }
}

/// Aggregate statistics for one batch run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchStats {
    pub total_documents: usize,
    pub extracted: usize,
    pub failed: usize,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub total_duration_ms: u64,
}
