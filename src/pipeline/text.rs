//! Text extraction: flatten PDF bytes to a single text blob.
//!
//! ## Why spawn_blocking?
//!
//! `pdf-extract` parses the document synchronously on the calling thread.
//! `tokio::task::spawn_blocking` moves that CPU-bound work onto the blocking
//! thread pool so concurrent batches don't stall the async workers.
//!
//! ## What this stage does NOT do
//!
//! No layout analysis, no table or column detection, no OCR. Pages are
//! concatenated in page order exactly as the text layer presents them; a
//! scanned page with no text layer contributes nothing. Downstream, the
//! model is the one reading this blob — garbled column order is its problem
//! to untangle, not ours.

use crate::error::DocumentError;
use tracing::debug;

/// Extract the text of every page, in page order, as one string.
///
/// Fails with [`DocumentError::UnreadablePdf`] when the buffer is not a
/// valid document or is encrypted/corrupted. An all-images document yields
/// an empty string, not an error — whether that is worth sending to the
/// model is the caller's call.
pub async fn extract_text(bytes: &[u8]) -> Result<String, DocumentError> {
    // Cheap magic-byte check before handing the buffer to the parser, so an
    // HTML error page saved as "policy.pdf" gets a clear message.
    if !bytes.starts_with(b"%PDF") {
        return Err(DocumentError::UnreadablePdf {
            detail: format!(
                "missing %PDF header (first bytes: {:?})",
                &bytes[..bytes.len().min(4)]
            ),
        });
    }

    let owned = bytes.to_vec();
    let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&owned))
        .await
        .map_err(|e| DocumentError::UnreadablePdf {
            detail: format!("extraction task panicked: {e}"),
        })?
        .map_err(|e| DocumentError::UnreadablePdf {
            detail: e.to_string(),
        })?;

    debug!("Extracted {} chars of text", text.len());
    Ok(text)
}
