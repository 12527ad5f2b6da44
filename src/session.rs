//! Upload/session orchestration.
//!
//! A [`Session`] owns the single retrieval-pipeline slot. The state
//! machine has two states: no document (initial) and ready. Indexing is
//! all-or-nothing: the new pipeline is installed only after every stage
//! of extract, chunk, clean, embed, and index build has succeeded, so a
//! failure mid-upload leaves the previous pipeline (if any) untouched
//! and a question is never answered against a partially built index.
//!
//! The slot sits behind a `tokio::sync::RwLock`. A question holds the
//! read lock for the duration of its provider calls and an upload takes
//! the write lock only for the final swap, so concurrent requests never
//! observe a torn pipeline.

use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

use crate::answer::{self, Answer, ChatModel};
use crate::chunk;
use crate::config::Config;
use crate::embedding::Embedder;
use crate::error::PipelineError;
use crate::extract;
use crate::index::VectorIndex;
use crate::retriever::Retriever;

/// The per-document pipeline held while a document is active.
struct ActiveDocument {
    /// Original filename of the upload, echoed in source metadata.
    name: String,
    retriever: Retriever,
}

/// Shared handle to the single retrieval-pipeline slot.
#[derive(Clone)]
pub struct Session {
    slot: Arc<RwLock<Option<ActiveDocument>>>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            slot: Arc::new(RwLock::new(None)),
        }
    }

    /// True when a document has been indexed and questions are valid.
    pub async fn is_ready(&self) -> bool {
        self.slot.read().await.is_some()
    }

    /// Index an uploaded document and install it as the active pipeline,
    /// replacing any previous one. On error the slot is left unchanged.
    pub async fn ingest(
        &self,
        config: &Config,
        embedder: &dyn Embedder,
        name: &str,
        bytes: &[u8],
    ) -> Result<usize, PipelineError> {
        let pages = extract::extract_pages(bytes)?;
        let segments = chunk::chunk_pages(
            &pages,
            config.chunking.chunk_size,
            config.chunking.chunk_overlap,
        )?;
        if segments.is_empty() {
            return Err(PipelineError::EmptyDocument);
        }

        let texts: Vec<String> = segments.iter().map(|s| s.text.clone()).collect();
        let vectors = embedder.embed(&texts).await?;

        let segment_count = segments.len();
        let index = VectorIndex::build(segments, vectors)?;
        let retriever = Retriever::new(index, config.retrieval.top_k)?;

        let mut slot = self.slot.write().await;
        *slot = Some(ActiveDocument {
            name: name.to_string(),
            retriever,
        });
        info!(document = name, segments = segment_count, "document indexed");

        Ok(segment_count)
    }

    /// Answer a question against the active pipeline.
    ///
    /// Fails with [`PipelineError::NoDocument`] when no document has been
    /// uploaded. The read lock is held across the embedding and chat
    /// calls so a concurrent upload cannot swap the pipeline mid-answer.
    pub async fn ask(
        &self,
        embedder: &dyn Embedder,
        chat: &dyn ChatModel,
        question: &str,
    ) -> Result<Answer, PipelineError> {
        let slot = self.slot.read().await;
        let active = slot.as_ref().ok_or(PipelineError::NoDocument)?;

        let segments = active.retriever.retrieve(embedder, question).await?;
        answer::synthesize(chat, &active.name, &segments, question).await
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::answer::MockChat;
    use crate::embedding::{FailingEmbedder, MockEmbedder};

    fn test_config() -> Config {
        let mut config = Config::default();
        config.chunking.chunk_size = 40;
        config.chunking.chunk_overlap = 8;
        config.retrieval.top_k = 2;
        config
    }

    #[tokio::test]
    async fn ask_without_document_is_a_state_error() {
        let session = Session::new();
        let err = session
            .ask(&MockEmbedder::new(8), &MockChat::default(), "anything")
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::NoDocument));
        assert_eq!(err.to_string(), "No document has been uploaded yet");
    }

    #[tokio::test]
    async fn corrupt_document_leaves_state_unchanged() {
        let session = Session::new();
        let err = session
            .ingest(&test_config(), &MockEmbedder::new(8), "bad.pdf", b"not a pdf")
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Extraction(_)));
        assert!(!session.is_ready().await);
    }

    #[tokio::test]
    async fn embedding_outage_during_ingest_leaves_state_unchanged() {
        let session = Session::new();
        let err = session
            .ingest(
                &test_config(),
                &FailingEmbedder,
                "doc.pdf",
                &crate::testing::pdf_with_text("some page text"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Provider(_)));
        assert!(!session.is_ready().await);
    }

    #[tokio::test]
    async fn successful_ingest_enables_questions() {
        let session = Session::new();
        let embedder = MockEmbedder::new(8);
        let count = session
            .ingest(
                &test_config(),
                &embedder,
                "doc.pdf",
                &crate::testing::pdf_with_text("The account number is 123456."),
            )
            .await
            .unwrap();
        assert!(count >= 1);
        assert!(session.is_ready().await);

        let answer = session
            .ask(&embedder, &MockChat::with_reply("123456"), "account number?")
            .await
            .unwrap();
        assert_eq!(answer.answer, "123456");
        assert!(!answer.sources.is_empty());
        assert_eq!(answer.sources[0].source, "doc.pdf");
    }

    #[tokio::test]
    async fn new_upload_replaces_previous_pipeline() {
        let session = Session::new();
        let embedder = MockEmbedder::new(8);
        let config = test_config();

        session
            .ingest(
                &config,
                &embedder,
                "first.pdf",
                &crate::testing::pdf_with_text("first document body"),
            )
            .await
            .unwrap();
        session
            .ingest(
                &config,
                &embedder,
                "second.pdf",
                &crate::testing::pdf_with_text("second document body"),
            )
            .await
            .unwrap();

        let answer = session
            .ask(&embedder, &MockChat::default(), "first document body")
            .await
            .unwrap();
        for source in &answer.sources {
            assert_eq!(source.source, "second.pdf");
        }
    }

    #[tokio::test]
    async fn failed_replacement_keeps_previous_pipeline() {
        let session = Session::new();
        let embedder = MockEmbedder::new(8);
        let config = test_config();

        session
            .ingest(
                &config,
                &embedder,
                "first.pdf",
                &crate::testing::pdf_with_text("first document body"),
            )
            .await
            .unwrap();

        let err = session
            .ingest(&config, &embedder, "second.pdf", b"not a pdf")
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Extraction(_)));

        // Still answering from the first document.
        let answer = session
            .ask(&embedder, &MockChat::default(), "anything")
            .await
            .unwrap();
        assert_eq!(answer.sources[0].source, "first.pdf");
    }
}
