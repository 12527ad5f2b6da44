//! PDF text extraction.
//!
//! Wraps `pdf-extract` to turn uploaded bytes into ordered per-page text.
//! Page numbers are preserved so retrieved segments can cite their source
//! location. Corrupt or unreadable files surface as
//! [`PipelineError::Extraction`]; the caller leaves any existing retrieval
//! pipeline untouched in that case.

use crate::error::PipelineError;

/// Text of a single page, in document order.
#[derive(Debug, Clone)]
pub struct PageText {
    /// Zero-based page number.
    pub page: usize,
    pub text: String,
}

/// Extract the text of every page from an in-memory PDF.
pub fn extract_pages(bytes: &[u8]) -> Result<Vec<PageText>, PipelineError> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|e| PipelineError::Extraction(e.to_string()))?;

    Ok(pages
        .into_iter()
        .enumerate()
        .map(|(page, text)| PageText { page, text })
        .collect())
}
