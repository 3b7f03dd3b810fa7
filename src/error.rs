//! Error types for the pdf2policy library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ExtractError`] — **Fatal**: the batch cannot proceed at all
//!   (missing API key, invalid configuration, unwritable output file).
//!   Returned as `Err(ExtractError)` from the top-level entry points.
//!
//! * [`DocumentError`] — **Non-fatal**: a single document failed (unreadable
//!   PDF, upstream outage, reply that was not JSON) but the rest of the batch
//!   is fine. Stored inside [`crate::output::DocumentResult`] so callers can
//!   inspect partial success rather than losing a whole batch to one bad file.
//!
//! The separation lets callers decide their own tolerance: abort on the first
//! document failure, log and continue, or collect all errors for a post-run
//! report.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdf2policy library.
///
/// Document-level failures use [`DocumentError`] and are stored in
/// [`crate::output::DocumentResult`] rather than propagated here.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// No API key in the config and none in the environment.
    #[error(
        "No completion API key configured.\n\
         Set OPENAI_API_KEY, or provide one via ExtractionConfig::builder().api_key(...)."
    )]
    MissingApiKey,

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// CSV serialisation failed.
    #[error("CSV export failed: {0}")]
    CsvExport(String),

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single document.
///
/// Stored alongside [`crate::output::DocumentResult`] when a document fails.
/// The batch always continues with the remaining documents.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum DocumentError {
    /// The byte buffer is not a readable PDF (corrupt, encrypted, or not a
    /// PDF at all).
    #[error("Unreadable PDF: {detail}")]
    UnreadablePdf { detail: String },

    /// The completion service could not be reached, refused the request, or
    /// timed out.
    #[error("Completion service unavailable: {detail}")]
    UpstreamUnavailable { detail: String },

    /// The completion service returned HTTP 429 on every attempt.
    #[error("Completion service rate limited after {retries} retries")]
    UpstreamRateLimited {
        retries: u32,
        /// Server-specified delay from the last `Retry-After` header, if any.
        retry_after_secs: Option<u64>,
    },

    /// The model reply could not be decoded as a structured record.
    ///
    /// Carries the reply text verbatim so an operator can inspect what the
    /// model actually said.
    #[error("Malformed model reply: {detail}")]
    MalformedResponse { detail: String, raw_reply: String },
}

impl DocumentError {
    /// The original model reply, if this error retains one.
    pub fn raw_reply(&self) -> Option<&str> {
        match self {
            DocumentError::MalformedResponse { raw_reply, .. } => Some(raw_reply),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreadable_pdf_display() {
        let e = DocumentError::UnreadablePdf {
            detail: "missing %PDF header".into(),
        };
        assert!(e.to_string().contains("missing %PDF header"));
    }

    #[test]
    fn rate_limited_display() {
        let e = DocumentError::UpstreamRateLimited {
            retries: 3,
            retry_after_secs: Some(30),
        };
        assert!(e.to_string().contains("3 retries"));
    }

    #[test]
    fn malformed_response_keeps_raw_reply() {
        let e = DocumentError::MalformedResponse {
            detail: "expected value at line 1".into(),
            raw_reply: "Sorry, I cannot help with that.".into(),
        };
        assert_eq!(e.raw_reply(), Some("Sorry, I cannot help with that."));
    }

    #[test]
    fn document_error_round_trips_through_json() {
        let e = DocumentError::MalformedResponse {
            detail: "bad".into(),
            raw_reply: "{not json".into(),
        };
        let json = serde_json::to_string(&e).unwrap();
        let back: DocumentError = serde_json::from_str(&json).unwrap();
        assert_eq!(back.raw_reply(), Some("{not json"));
    }

    #[test]
    fn missing_api_key_display_mentions_env_var() {
        let msg = ExtractError::MissingApiKey.to_string();
        assert!(msg.contains("OPENAI_API_KEY"), "got: {msg}");
    }
}
