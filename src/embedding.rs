//! Embedding provider abstraction and implementations.
//!
//! Defines the [`Embedder`] capability trait and two implementations:
//! - **[`OpenAiEmbedder`]** — calls the OpenAI embeddings API in batches.
//! - **[`MockEmbedder`]** — deterministic offline vectors for tests and
//!   the `mock` provider setting.
//!
//! Provider calls are a single attempt with a bounded timeout; a network
//! error, auth error, rate limit, or timeout surfaces as
//! [`PipelineError::Provider`] and propagates to the caller of the
//! enclosing operation. No retries are performed.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::config::EmbeddingConfig;
use crate::error::PipelineError;

/// Capability interface for turning texts into fixed-dimension vectors.
///
/// Implementations must preserve input order: the vector at position `i`
/// corresponds to `texts[i]`.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts, one vector per input, order-preserved.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, PipelineError>;

    /// Embed a single query text.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, PipelineError> {
        let mut vectors = self.embed(&[text.to_string()]).await?;
        if vectors.len() != 1 {
            return Err(PipelineError::Provider(
                "embedding response did not contain exactly one vector".to_string(),
            ));
        }
        Ok(vectors.remove(0))
    }
}

/// Instantiate the embedder named by the configuration.
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>, PipelineError> {
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiEmbedder::new(config)?)),
        "mock" => Ok(Arc::new(MockEmbedder::new(config.dims))),
        other => Err(PipelineError::InvalidParameter(format!(
            "unknown embedding provider: {}",
            other
        ))),
    }
}

// ============ OpenAI provider ============

/// Embedding provider backed by `POST https://api.openai.com/v1/embeddings`.
///
/// Requires the `OPENAI_API_KEY` environment variable. Inputs are sent in
/// batches of `batch_size` texts per request.
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    model: String,
    api_key: String,
    batch_size: usize,
}

impl OpenAiEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self, PipelineError> {
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
            batch_size: config.batch_size,
        })
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, PipelineError> {
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });

        let response = self
            .client
            .post("https://api.openai.com/v1/embeddings")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| PipelineError::Provider(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(PipelineError::Provider(format!(
                "OpenAI embeddings API error {}: {}",
                status, body_text
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| PipelineError::Provider(e.to_string()))?;
        parse_embeddings_response(&json, texts.len())
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, PipelineError> {
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            out.extend(self.embed_batch(batch).await?);
        }
        Ok(out)
    }
}

/// Extract `data[].embedding` arrays, reordered by their `index` field so
/// the output matches input order.
fn parse_embeddings_response(
    json: &serde_json::Value,
    expected: usize,
) -> Result<Vec<Vec<f32>>, PipelineError> {
    let data = json.get("data").and_then(|d| d.as_array()).ok_or_else(|| {
        PipelineError::Provider("invalid embeddings response: missing data array".to_string())
    })?;

    if data.len() != expected {
        return Err(PipelineError::Provider(format!(
            "embeddings response length {} does not match input length {}",
            data.len(),
            expected
        )));
    }

    let mut indexed: Vec<(usize, Vec<f32>)> = Vec::with_capacity(data.len());
    for (pos, item) in data.iter().enumerate() {
        let index = item
            .get("index")
            .and_then(|i| i.as_u64())
            .map(|i| i as usize)
            .unwrap_or(pos);
        let embedding = item
            .get("embedding")
            .and_then(|e| e.as_array())
            .ok_or_else(|| {
                PipelineError::Provider(
                    "invalid embeddings response: missing embedding".to_string(),
                )
            })?;
        let vec: Vec<f32> = embedding
            .iter()
            .map(|v| {
                v.as_f64().map(|f| f as f32).ok_or_else(|| {
                    PipelineError::Provider(
                        "invalid embeddings response: non-numeric component".to_string(),
                    )
                })
            })
            .collect::<Result<_, _>>()?;
        indexed.push((index, vec));
    }

    indexed.sort_by_key(|(i, _)| *i);
    Ok(indexed.into_iter().map(|(_, v)| v).collect())
}

// ============ Mock provider ============

/// Deterministic embedder for offline runs and tests.
///
/// Each text maps to a fixed pseudo-random unit-length vector seeded by
/// its bytes, so identical texts always land on identical vectors and a
/// segment's own text is its nearest neighbor.
pub struct MockEmbedder {
    dims: usize,
}

impl MockEmbedder {
    pub fn new(dims: usize) -> Self {
        Self { dims: dims.max(2) }
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        // FNV-1a seed, then xorshift for the components.
        let mut seed: u64 = 0xcbf29ce484222325;
        for b in text.bytes() {
            seed ^= b as u64;
            seed = seed.wrapping_mul(0x100000001b3);
        }
        if seed == 0 {
            seed = 0x9e3779b97f4a7c15;
        }

        let mut v: Vec<f32> = (0..self.dims)
            .map(|_| {
                seed ^= seed << 13;
                seed ^= seed >> 7;
                seed ^= seed << 17;
                ((seed >> 11) as f64 / (1u64 << 53) as f64) as f32 - 0.5
            })
            .collect();

        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for x in &mut v {
                *x /= norm;
            }
        }
        v
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, PipelineError> {
        Ok(texts.iter().map(|t| self.vector_for(t)).collect())
    }
}

/// Embedder that always fails; exercises provider-outage paths in tests.
pub struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, PipelineError> {
        Err(PipelineError::Provider(
            "embedding provider unavailable".to_string(),
        ))
    }
}
