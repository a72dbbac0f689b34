//! Backend-agnostic search façade.
//!
//! [`SearchFacade`] presents one search contract regardless of which
//! concrete [`ContentStore`] is active. Writes fan out to every store so a
//! secondary can answer when the primary comes up empty; reads consult the
//! secondary only when the primary returned zero hits and fallback is
//! enabled in configuration.
//!
//! Backend selection happens exactly once, at startup, in [`resolve`]:
//! configuration names the backend and credential presence decides
//! availability. A missing credential degrades to the in-memory backend with
//! a logged warning instead of failing startup.

use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use crate::config::Config;
use crate::db;
use crate::embedding;
use crate::migrate;
use crate::models::{Chunk, SearchHit};
use crate::store::memory::InMemoryStore;
use crate::store::sqlite::SqliteStore;
use crate::store::vector::VectorStore;
use crate::store::ContentStore;

pub struct SearchFacade {
    primary: Arc<dyn ContentStore>,
    secondary: Option<Arc<dyn ContentStore>>,
    fallback: bool,
}

impl SearchFacade {
    pub fn new(
        primary: Arc<dyn ContentStore>,
        secondary: Option<Arc<dyn ContentStore>>,
        fallback: bool,
    ) -> Self {
        Self {
            primary,
            secondary,
            fallback,
        }
    }

    /// Name of the active primary backend.
    pub fn backend_name(&self) -> &'static str {
        self.primary.name()
    }

    /// Store a document's content in every configured store.
    pub async fn put(&self, doc_id: &str, text: &str, chunks: &[Chunk]) -> Result<()> {
        self.primary.put(doc_id, text, chunks).await?;
        if let Some(secondary) = &self.secondary {
            secondary.put(doc_id, text, chunks).await?;
        }
        Ok(())
    }

    /// Remove a document's content from every configured store.
    pub async fn remove(&self, doc_id: &str) -> Result<()> {
        self.primary.remove(doc_id).await?;
        if let Some(secondary) = &self.secondary {
            secondary.remove(doc_id).await?;
        }
        Ok(())
    }

    /// Search the primary store; consult the secondary only when the primary
    /// found nothing and fallback is enabled.
    pub async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        let hits = self.primary.search(query).await?;
        if !hits.is_empty() || !self.fallback {
            return Ok(hits);
        }
        match &self.secondary {
            Some(secondary) => secondary.search(query).await,
            None => Ok(hits),
        }
    }

    pub async fn document_count(&self) -> Result<usize> {
        self.primary.document_count().await
    }
}

/// Resolve the configured backend into a façade. Called once at startup.
pub async fn resolve(config: &Config) -> Result<SearchFacade> {
    let retrieval = config.retrieval.clone();
    let fallback = retrieval.fallback;

    let facade = match config.storage.backend.as_str() {
        "sqlite" => {
            let pool = db::connect(config).await?;
            migrate::run_migrations(&pool).await?;
            let primary: Arc<dyn ContentStore> =
                Arc::new(SqliteStore::new(pool, retrieval.clone()));
            let secondary: Option<Arc<dyn ContentStore>> = if fallback {
                Some(Arc::new(InMemoryStore::new(retrieval)))
            } else {
                None
            };
            SearchFacade::new(primary, secondary, fallback)
        }
        "vector" => match embedding::create_provider(&config.embedding) {
            Ok(provider) => {
                let primary: Arc<dyn ContentStore> =
                    Arc::new(VectorStore::new(Arc::new(provider), retrieval.clone()));
                let secondary: Option<Arc<dyn ContentStore>> = if fallback {
                    Some(Arc::new(InMemoryStore::new(retrieval)))
                } else {
                    None
                };
                SearchFacade::new(primary, secondary, fallback)
            }
            Err(e) => {
                warn!(error = %e, "vector backend unavailable, degrading to in-memory");
                SearchFacade::new(Arc::new(InMemoryStore::new(retrieval)), None, fallback)
            }
        },
        // Validated at config load; anything else is "memory".
        _ => SearchFacade::new(Arc::new(InMemoryStore::new(retrieval)), None, fallback),
    };

    info!(backend = facade.backend_name(), "content backend resolved");
    Ok(facade)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetrievalConfig;
    use async_trait::async_trait;

    /// A primary that stores nothing and never matches, to force fallback.
    struct NullStore;

    #[async_trait]
    impl ContentStore for NullStore {
        fn name(&self) -> &'static str {
            "null"
        }
        async fn put(&self, _doc_id: &str, _text: &str, _chunks: &[Chunk]) -> Result<()> {
            Ok(())
        }
        async fn remove(&self, _doc_id: &str) -> Result<()> {
            Ok(())
        }
        async fn search(&self, _query: &str) -> Result<Vec<SearchHit>> {
            Ok(Vec::new())
        }
        async fn document_count(&self) -> Result<usize> {
            Ok(0)
        }
    }

    fn memory() -> Arc<InMemoryStore> {
        Arc::new(InMemoryStore::new(RetrievalConfig::default()))
    }

    #[tokio::test]
    async fn test_fallback_consults_secondary_when_primary_empty() {
        let facade = SearchFacade::new(Arc::new(NullStore), Some(memory()), true);
        facade
            .put("a.txt", "the quarterly revenue grew", &[])
            .await
            .unwrap();

        let hits = facade.search("revenue").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].text.contains("revenue"));
    }

    #[tokio::test]
    async fn test_fallback_disabled_skips_secondary() {
        let facade = SearchFacade::new(Arc::new(NullStore), Some(memory()), false);
        facade
            .put("a.txt", "the quarterly revenue grew", &[])
            .await
            .unwrap();

        assert!(facade.search("revenue").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_primary_hits_shadow_secondary() {
        let primary = memory();
        let secondary = memory();
        let facade = SearchFacade::new(primary, Some(secondary), true);
        facade.put("a.txt", "revenue report", &[]).await.unwrap();

        // Both stores hold the document; only one copy comes back.
        let hits = facade.search("revenue").await.unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn test_remove_fans_out() {
        let facade = SearchFacade::new(memory(), Some(memory()), true);
        facade.put("a.txt", "revenue report", &[]).await.unwrap();
        facade.remove("a.txt").await.unwrap();
        assert!(facade.search("revenue").await.unwrap().is_empty());
    }
}
