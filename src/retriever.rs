//! Top-k segment retrieval over a built index.
//!
//! A [`Retriever`] bundles a [`VectorIndex`] with a fixed `k`; this pair
//! is the per-document retrieval pipeline held as session state. Each
//! retrieval embeds the query text (one provider call), searches the
//! index, and returns the ranked segments with scores discarded.

use crate::chunk::Segment;
use crate::embedding::Embedder;
use crate::error::PipelineError;
use crate::index::VectorIndex;

#[derive(Debug)]
pub struct Retriever {
    index: VectorIndex,
    k: usize,
}

impl Retriever {
    /// Wrap a built index with a retrieval parameter. `k == 0` is
    /// rejected up front rather than at query time.
    pub fn new(index: VectorIndex, k: usize) -> Result<Retriever, PipelineError> {
        if k == 0 {
            return Err(PipelineError::InvalidParameter(
                "retrieval k must be a positive integer".to_string(),
            ));
        }
        Ok(Retriever { index, k })
    }

    /// Embed the query and return the top-k most similar segments in
    /// ranked order.
    pub async fn retrieve(
        &self,
        embedder: &dyn Embedder,
        query: &str,
    ) -> Result<Vec<&Segment>, PipelineError> {
        let query_vec = embedder.embed_query(query).await?;
        let hits = self.index.search(&query_vec, self.k)?;
        Ok(hits.into_iter().map(|hit| hit.segment).collect())
    }

    pub fn segment_count(&self) -> usize {
        self.index.len()
    }
}
