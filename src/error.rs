//! Error taxonomy for the indexing and question-answering pipeline.
//!
//! Every component boundary returns a [`PipelineError`] tagged with the
//! failure kind, so the HTTP layer can map each kind to the right status
//! code without string matching. Provider outages stay distinct from
//! model-generated answers: an embedding or chat failure is surfaced as
//! [`PipelineError::Provider`], never rewritten into answer text.

use thiserror::Error;

/// Failure kinds produced by the pipeline components.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A caller-supplied parameter is out of range (e.g. chunk overlap
    /// not smaller than chunk size, or a zero retrieval `k`).
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The uploaded file could not be parsed into text.
    #[error("PDF extraction failed: {0}")]
    Extraction(String),

    /// An external provider call (embeddings or chat completion) failed:
    /// network error, auth error, rate limit, or timeout.
    #[error("provider error: {0}")]
    Provider(String),

    /// The document produced no segments to index.
    #[error("document contains no indexable text")]
    EmptyDocument,

    /// A question was asked while no retrieval pipeline is installed.
    #[error("No document has been uploaded yet")]
    NoDocument,
}

impl PipelineError {
    /// True for errors the caller can fix by changing the request,
    /// reported with a 4xx status at the HTTP boundary.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PipelineError::InvalidParameter(_) | PipelineError::NoDocument
        )
    }
}
