//! Embedding provider abstraction for the vector content store.
//!
//! Defines the [`EmbeddingProvider`] trait plus the OpenAI-compatible HTTP
//! implementation used in production. The vector store depends only on the
//! trait, so tests substitute a deterministic provider.
//!
//! Retry strategy for the HTTP provider: 429 and 5xx responses and network
//! errors retry with exponential backoff (1s, 2s, 4s, ...); other 4xx fail
//! immediately.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::config::EmbeddingConfig;

/// Trait for embedding backends.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Model identifier (e.g. `"text-embedding-3-small"`).
    fn model_name(&self) -> &str;
    /// Embedding vector dimensionality.
    fn dims(&self) -> usize;
    /// Embed a batch of texts, one vector per input, in order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Instantiate the configured provider.
///
/// Fails when the provider is disabled or the API key environment variable
/// is unset; backend resolution treats that failure as "vector unavailable"
/// and degrades to the in-memory backend.
pub fn create_provider(config: &EmbeddingConfig) -> Result<OpenAiProvider> {
    if !config.is_enabled() {
        bail!("Embedding provider is disabled");
    }
    let api_key = std::env::var(&config.api_key_env)
        .with_context(|| format!("{} is not set", config.api_key_env))?;
    OpenAiProvider::new(config.clone(), api_key)
}

/// Embedding provider for OpenAI-compatible `/embeddings` endpoints.
pub struct OpenAiProvider {
    client: reqwest::Client,
    config: EmbeddingConfig,
    api_key: String,
    model: String,
    dims: usize,
}

impl OpenAiProvider {
    pub fn new(config: EmbeddingConfig, api_key: String) -> Result<Self> {
        let model = config
            .model
            .clone()
            .context("embedding.model is not configured")?;
        let dims = config.dims.context("embedding.dims is not configured")?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            config,
            api_key,
            model,
            dims,
        })
    }

    async fn request_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        #[derive(Deserialize)]
        struct EmbeddingResponse {
            data: Vec<EmbeddingItem>,
        }
        #[derive(Deserialize)]
        struct EmbeddingItem {
            embedding: Vec<f32>,
        }

        let url = format!("{}/embeddings", self.config.api_base.trim_end_matches('/'));
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });

        let mut attempt = 0u32;
        loop {
            let result = self
                .client
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await;

            let retryable = match &result {
                Ok(resp) => {
                    let status = resp.status();
                    status.as_u16() == 429 || status.is_server_error()
                }
                Err(_) => true,
            };

            match result {
                Ok(resp) if resp.status().is_success() => {
                    let parsed: EmbeddingResponse = resp.json().await?;
                    let vectors: Vec<Vec<f32>> =
                        parsed.data.into_iter().map(|d| d.embedding).collect();
                    if vectors.len() != texts.len() {
                        bail!(
                            "Embedding API returned {} vectors for {} inputs",
                            vectors.len(),
                            texts.len()
                        );
                    }
                    return Ok(vectors);
                }
                Ok(resp) if !retryable => {
                    let status = resp.status();
                    let text = resp.text().await.unwrap_or_default();
                    bail!("Embedding API error {}: {}", status, text);
                }
                _ if attempt >= self.config.max_retries => {
                    bail!(
                        "Embedding API failed after {} retries",
                        self.config.max_retries
                    );
                }
                _ => {
                    let backoff = Duration::from_secs(1 << attempt.min(5));
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.config.batch_size.max(1)) {
            vectors.extend(self.request_batch(batch).await?);
        }
        Ok(vectors)
    }
}

/// Cosine similarity of two vectors; 0.0 for mismatched or zero-magnitude input.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if mag_a < f32::EPSILON || mag_b < f32::EPSILON {
        0.0
    } else {
        dot / (mag_a * mag_b)
    }
}
