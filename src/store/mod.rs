//! Content storage abstraction.
//!
//! The [`ContentStore`] trait defines the contract every search backend
//! satisfies: store a document's text (and chunks), remove it, and answer
//! relevance queries with scored fragments. Three implementations exist:
//!
//! | Backend | Module | Retrieval |
//! |---------|--------|-----------|
//! | in-memory | [`memory`] | keyword scoring over whole-document text |
//! | SQLite | [`sqlite`] | FTS5 candidates re-scored, keyword-scan fallback |
//! | vector | [`vector`] | cosine similarity over embedded chunks |
//!
//! Implementations must be `Send + Sync`; removal of an unknown id is an
//! idempotent no-op for every backend.

pub mod memory;
pub mod sqlite;
pub mod vector;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Chunk, SearchHit};

/// Abstract content backend behind the search façade.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Backend name for logs and the health endpoint.
    fn name(&self) -> &'static str;

    /// Insert or replace a document's content. Chunked backends consume
    /// `chunks`; whole-document backends consume `text`.
    async fn put(&self, doc_id: &str, text: &str, chunks: &[Chunk]) -> Result<()>;

    /// Remove a document's content. No-op for absent ids.
    async fn remove(&self, doc_id: &str) -> Result<()>;

    /// Return scored fragments relevant to `query`, best match first,
    /// truncated to the configured top-K.
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>>;

    /// Number of documents currently stored.
    async fn document_count(&self) -> Result<usize>;
}
