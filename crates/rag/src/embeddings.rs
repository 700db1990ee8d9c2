//! Text embeddings
//!
//! The embedding service is an HTTP peer; the gateway never runs a model
//! in-process. The `Embedder` trait keeps the retriever testable without a
//! network.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use voice_gateway_config::EmbeddingSettings;

use crate::RagError;

/// Hard cap on texts per embedding request, independent of settings.
pub const MAX_EMBED_BATCH: usize = 50;

/// Dense-embedding provider.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts, preserving order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError>;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
        let texts = [text.to_string()];
        let mut vectors = self.embed_batch(&texts).await?;
        vectors
            .pop()
            .ok_or_else(|| RagError::Embedding("service returned no embedding".to_string()))
    }
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    input: &'a [String],
    model: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbedDatum {
    index: usize,
    embedding: Vec<f32>,
}

/// HTTP embedding client.
///
/// Speaks the OpenAI-compatible `{input, model}` request shape; the API key
/// travels in the `api-key` header, never in the URL.
pub struct HttpEmbedder {
    client: Client,
    settings: EmbeddingSettings,
}

impl HttpEmbedder {
    pub fn new(settings: EmbeddingSettings) -> Result<Self, RagError> {
        if settings.endpoint.is_empty() {
            return Err(RagError::Embedding(
                "embedding endpoint is not configured".to_string(),
            ));
        }
        let client = Client::builder()
            .timeout(Duration::from_millis(settings.timeout_ms))
            .build()
            .map_err(|e| RagError::Embedding(e.to_string()))?;
        Ok(Self { client, settings })
    }

    async fn request_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        let request = EmbedRequest {
            input: texts,
            model: &self.settings.model,
        };

        let response = self
            .client
            .post(&self.settings.endpoint)
            .header("api-key", &self.settings.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| RagError::Embedding(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RagError::Embedding(format!(
                "embedding service returned {}: {}",
                status, body
            )));
        }

        let parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|e| RagError::Embedding(format!("bad response body: {}", e)))?;

        if parsed.data.len() != texts.len() {
            return Err(RagError::Embedding(format!(
                "asked for {} embeddings, got {}",
                texts.len(),
                parsed.data.len()
            )));
        }

        // The service may reorder; restore request order by index.
        let mut data = parsed.data;
        data.sort_by_key(|d| d.index);
        Ok(data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        let batch = self.settings.batch_size.clamp(1, MAX_EMBED_BATCH);
        let mut all = Vec::with_capacity(texts.len());
        for group in texts.chunks(batch) {
            all.extend(self.request_batch(group).await?);
        }
        Ok(all)
    }
}

/// Deterministic hash-based embedder for tests; requires no service.
pub struct SimpleEmbedder {
    dim: usize,
}

impl SimpleEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dim];
        for (i, c) in text.chars().enumerate() {
            let idx = (c as usize + i) % self.dim;
            v[idx] += 1.0;
        }
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut v {
                *x /= norm;
            }
        }
        v
    }
}

#[async_trait]
impl Embedder for SimpleEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}
