//! Grounded answer synthesis.
//!
//! Concatenates the retrieved segments into a single context block and
//! asks a chat model to answer strictly from it. One synchronous request
//! per question: no conversation state, no retries, no streaming. The
//! model is instructed to reply exactly `I don't know` when the context
//! does not contain the answer, and to strip extraneous formatting from
//! bare-value answers (e.g. a number is returned as the digits alone).
//!
//! A chat failure is a [`PipelineError::Provider`] and must reach the
//! HTTP boundary as an error payload, never as a fabricated answer.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::chunk::Segment;
use crate::config::ChatConfig;
use crate::error::PipelineError;

/// System instruction sent with every question.
const SYSTEM_INSTRUCTION: &str = "You are a question-answering assistant. \
Answer using ONLY the information in the supplied context. \
If the context does not contain the answer, reply with exactly: I don't know. \
When the answer is a bare value such as a number, an identifier, or a date, \
reply with that value alone, without surrounding words, punctuation, or formatting.";

/// Capability interface for single-turn chat completion.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Send one system instruction plus one user message and return the
    /// model's raw text response.
    async fn complete(&self, system: &str, user: &str) -> Result<String, PipelineError>;
}

/// Instantiate the chat model named by the configuration.
pub fn create_chat_model(config: &ChatConfig) -> Result<Arc<dyn ChatModel>, PipelineError> {
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiChat::new(config)?)),
        "mock" => Ok(Arc::new(MockChat::default())),
        other => Err(PipelineError::InvalidParameter(format!(
            "unknown chat provider: {}",
            other
        ))),
    }
}

/// Provenance record for one retrieved segment, returned to the caller
/// alongside the answer text.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SourceRef {
    /// Original filename of the uploaded document.
    pub source: String,
    /// Zero-based page number the segment was cut from.
    pub page: usize,
    /// Character offset of the segment within its page.
    pub offset: usize,
    /// Global segment ordinal across the document.
    pub segment: usize,
}

/// A grounded answer plus the metadata of the segments it was drawn from.
#[derive(Debug, Serialize)]
pub struct Answer {
    pub answer: String,
    pub sources: Vec<SourceRef>,
}

/// Build the grounded prompt and ask the model.
///
/// Segments are joined in ranked order, separated by a blank line. The
/// source list mirrors the retrieved segments one-to-one, in the same
/// order.
pub async fn synthesize(
    chat: &dyn ChatModel,
    source_name: &str,
    segments: &[&Segment],
    question: &str,
) -> Result<Answer, PipelineError> {
    let context = segments
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    let user = format!("Context:\n{}\n\nQuestion: {}", context, question);
    let answer = chat.complete(SYSTEM_INSTRUCTION, &user).await?;

    let sources = segments
        .iter()
        .map(|s| SourceRef {
            source: source_name.to_string(),
            page: s.page,
            offset: s.offset,
            segment: s.index,
        })
        .collect();

    Ok(Answer { answer, sources })
}

// ============ OpenAI provider ============

/// Chat model backed by `POST https://api.openai.com/v1/chat/completions`.
///
/// Requests use temperature 0 so repeated questions over the same context
/// stay stable. Requires the `OPENAI_API_KEY` environment variable.
pub struct OpenAiChat {
    client: reqwest::Client,
    model: String,
    api_key: String,
}

impl OpenAiChat {
    pub fn new(config: &ChatConfig) -> Result<Self, PipelineError> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            PipelineError::Provider("OPENAI_API_KEY environment variable not set".to_string())
        })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PipelineError::Provider(e.to_string()))?;

        Ok(Self {
            client,
            model: config.model.clone(),
            api_key,
        })
    }
}

#[async_trait]
impl ChatModel for OpenAiChat {
    async fn complete(&self, system: &str, user: &str) -> Result<String, PipelineError> {
        let body = serde_json::json!({
            "model": self.model,
            "temperature": 0,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
        });

        let response = self
            .client
            .post("https://api.openai.com/v1/chat/completions")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| PipelineError::Provider(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(PipelineError::Provider(format!(
                "OpenAI chat API error {}: {}",
                status, body_text
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| PipelineError::Provider(e.to_string()))?;

        json.get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| {
                PipelineError::Provider("invalid chat response: missing message content".to_string())
            })
    }
}

// ============ Mock provider ============

/// Offline chat model returning a canned reply; records nothing.
///
/// Useful for exercising the full upload/ask flow without network access.
pub struct MockChat {
    reply: String,
}

impl MockChat {
    pub fn with_reply(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
        }
    }
}

impl Default for MockChat {
    fn default() -> Self {
        Self::with_reply("I don't know")
    }
}

#[async_trait]
impl ChatModel for MockChat {
    async fn complete(&self, _system: &str, _user: &str) -> Result<String, PipelineError> {
        Ok(self.reply.clone())
    }
}

/// Chat model that always fails; exercises provider-outage paths in tests.
pub struct FailingChat;

#[async_trait]
impl ChatModel for FailingChat {
    async fn complete(&self, _system: &str, _user: &str) -> Result<String, PipelineError> {
        Err(PipelineError::Provider(
            "chat provider unavailable".to_string(),
        ))
    }
}
