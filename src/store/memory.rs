//! In-memory [`ContentStore`] implementation.
//!
//! Keeps whole-document text in a `HashMap` behind `std::sync::RwLock` and
//! answers queries with the keyword scorer. This is the default backend and
//! the degraded mode when a configured backend is unavailable.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::Result;
use async_trait::async_trait;

use crate::config::RetrievalConfig;
use crate::models::{Chunk, SearchHit};
use crate::score;

use super::ContentStore;

pub struct InMemoryStore {
    docs: RwLock<HashMap<String, String>>,
    retrieval: RetrievalConfig,
}

impl InMemoryStore {
    pub fn new(retrieval: RetrievalConfig) -> Self {
        Self {
            docs: RwLock::new(HashMap::new()),
            retrieval,
        }
    }
}

#[async_trait]
impl ContentStore for InMemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn put(&self, doc_id: &str, text: &str, _chunks: &[Chunk]) -> Result<()> {
        let mut docs = self.docs.write().unwrap();
        docs.insert(doc_id.to_string(), text.to_string());
        Ok(())
    }

    async fn remove(&self, doc_id: &str) -> Result<()> {
        let mut docs = self.docs.write().unwrap();
        docs.remove(doc_id);
        Ok(())
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        let docs = self.docs.read().unwrap();
        Ok(score::rank(
            query,
            docs.values().map(String::as_str),
            &self.retrieval,
        ))
    }

    async fn document_count(&self) -> Result<usize> {
        Ok(self.docs.read().unwrap().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> InMemoryStore {
        InMemoryStore::new(RetrievalConfig::default())
    }

    #[tokio::test]
    async fn test_put_search_remove() {
        let store = store();
        store
            .put("report.pdf", "The quarterly revenue grew by 12%.", &[])
            .await
            .unwrap();
        assert_eq!(store.document_count().await.unwrap(), 1);

        let hits = store.search("What was the revenue growth?").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].score > 0.1);
        assert!(hits[0].text.contains("quarterly revenue"));

        store.remove("report.pdf").await.unwrap();
        assert_eq!(store.document_count().await.unwrap(), 0);
        assert!(store.search("revenue").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_absent_is_noop() {
        let store = store();
        store.remove("missing.pdf").await.unwrap();
    }

    #[tokio::test]
    async fn test_put_replaces_existing() {
        let store = store();
        store.put("a.txt", "old text about cats", &[]).await.unwrap();
        store.put("a.txt", "new text about dogs", &[]).await.unwrap();
        assert_eq!(store.document_count().await.unwrap(), 1);

        let hits = store.search("dogs").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert!(store.search("cats").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_query_returns_nothing() {
        let store = store();
        store.put("a.txt", "some content", &[]).await.unwrap();
        assert!(store.search("").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_no_overlap_returns_nothing() {
        let store = store();
        store.put("a.txt", "completely unrelated corpus", &[]).await.unwrap();
        assert!(store.search("zyzzyva").await.unwrap().is_empty());
    }
}
