//! Vector-similarity [`ContentStore`] implementation.
//!
//! Chunks are embedded through an [`EmbeddingProvider`] at put time; search
//! embeds the query and ranks stored chunks by brute-force cosine
//! similarity, thresholded and truncated like every other backend.

use std::sync::{Arc, RwLock};

use anyhow::Result;
use async_trait::async_trait;

use crate::config::RetrievalConfig;
use crate::embedding::{cosine_similarity, EmbeddingProvider};
use crate::models::{Chunk, SearchHit};

use super::ContentStore;

struct StoredVector {
    document_id: String,
    text: String,
    vector: Vec<f32>,
}

pub struct VectorStore {
    provider: Arc<dyn EmbeddingProvider>,
    vectors: RwLock<Vec<StoredVector>>,
    retrieval: RetrievalConfig,
}

impl VectorStore {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, retrieval: RetrievalConfig) -> Self {
        Self {
            provider,
            vectors: RwLock::new(Vec::new()),
            retrieval,
        }
    }
}

#[async_trait]
impl ContentStore for VectorStore {
    fn name(&self) -> &'static str {
        "vector"
    }

    async fn put(&self, doc_id: &str, _text: &str, chunks: &[Chunk]) -> Result<()> {
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        // Embed outside the lock; the HTTP call must not block readers.
        let embedded = self.provider.embed(&texts).await?;

        let mut vectors = self.vectors.write().unwrap();
        vectors.retain(|sv| sv.document_id != doc_id);
        for (chunk, vector) in chunks.iter().zip(embedded.into_iter()) {
            vectors.push(StoredVector {
                document_id: doc_id.to_string(),
                text: chunk.text.clone(),
                vector,
            });
        }
        Ok(())
    }

    async fn remove(&self, doc_id: &str) -> Result<()> {
        let mut vectors = self.vectors.write().unwrap();
        vectors.retain(|sv| sv.document_id != doc_id);
        Ok(())
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }
        let query_vec = self
            .provider
            .embed(&[query.to_string()])
            .await?
            .into_iter()
            .next()
            .unwrap_or_default();

        let vectors = self.vectors.read().unwrap();
        let mut hits: Vec<SearchHit> = vectors
            .iter()
            .filter_map(|sv| {
                let score = cosine_similarity(&query_vec, &sv.vector) as f64;
                if score > self.retrieval.threshold {
                    Some(SearchHit {
                        text: sv.text.clone(),
                        score,
                    })
                } else {
                    None
                }
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(self.retrieval.top_k);
        Ok(hits)
    }

    async fn document_count(&self) -> Result<usize> {
        let vectors = self.vectors.read().unwrap();
        let mut ids: Vec<&str> = vectors.iter().map(|sv| sv.document_id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        Ok(ids.len())
    }
}
