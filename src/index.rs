//! In-memory vector index over document segments.
//!
//! Pairs each [`Segment`] with its embedding vector and answers k-nearest
//! queries by cosine similarity. The index is built once per uploaded
//! document and read-only afterwards; there are no update or delete
//! operations. Equal similarity scores are broken by original document
//! position, earliest first.

use crate::chunk::Segment;
use crate::error::PipelineError;

/// A scored search hit referencing an indexed segment.
#[derive(Debug)]
pub struct Hit<'a> {
    pub segment: &'a Segment,
    pub score: f32,
}

/// Read-only similarity index mapping segment vectors to segments.
#[derive(Debug)]
pub struct VectorIndex {
    entries: Vec<(Segment, Vec<f32>)>,
}

impl VectorIndex {
    /// Build an index from parallel sequences of segments and vectors,
    /// paired by position.
    pub fn build(
        segments: Vec<Segment>,
        vectors: Vec<Vec<f32>>,
    ) -> Result<VectorIndex, PipelineError> {
        if segments.is_empty() {
            return Err(PipelineError::EmptyDocument);
        }
        if segments.len() != vectors.len() {
            return Err(PipelineError::InvalidParameter(format!(
                "segment count ({}) does not match vector count ({})",
                segments.len(),
                vectors.len()
            )));
        }
        let dims = vectors[0].len();
        if vectors.iter().any(|v| v.len() != dims) {
            return Err(PipelineError::InvalidParameter(
                "embedding vectors have inconsistent dimensions".to_string(),
            ));
        }

        Ok(VectorIndex {
            entries: segments.into_iter().zip(vectors).collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Return the `k` segments nearest to `query`, highest similarity
    /// first. `k` larger than the index returns everything; `k == 0` is
    /// rejected.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Hit<'_>>, PipelineError> {
        if k == 0 {
            return Err(PipelineError::InvalidParameter(
                "k must be a positive integer".to_string(),
            ));
        }

        let mut hits: Vec<Hit<'_>> = self
            .entries
            .iter()
            .map(|(segment, vector)| Hit {
                segment,
                score: cosine_similarity(query, vector),
            })
            .collect();

        // Score descending, document position ascending on ties.
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.segment.index.cmp(&b.segment.index))
        });

        hits.truncate(k);
        Ok(hits)
    }
}

/// Cosine similarity between two embedding vectors.
///
/// Returns `0.0` for empty vectors or vectors of different lengths.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}
