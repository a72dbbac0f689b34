//! SQLite [`ContentStore`] implementation.
//!
//! Chunks live in a `chunks` table mirrored into an FTS5 virtual table.
//! Search runs in two stages: FTS5 narrows the corpus to candidate chunks,
//! and the keyword scorer re-scores those candidates so every backend ranks
//! under the same threshold/top-K contract. When the FTS query matches
//! nothing (vocabulary mismatch, stemming), the store falls back to scoring
//! every chunk — the explicit fallback policy of the relational variant.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use crate::config::RetrievalConfig;
use crate::models::{Chunk, SearchHit};
use crate::score;

use super::ContentStore;

/// Candidates requested from FTS5 before re-scoring.
const FTS_CANDIDATE_LIMIT: i64 = 80;

pub struct SqliteStore {
    pool: SqlitePool,
    retrieval: RetrievalConfig,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool, retrieval: RetrievalConfig) -> Self {
        Self { pool, retrieval }
    }

    /// Build a sanitized FTS5 MATCH expression: alphanumeric tokens, quoted,
    /// OR-joined. Returns None when the query has no usable tokens.
    fn fts_query(query: &str) -> Option<String> {
        let terms: Vec<String> = query
            .split_whitespace()
            .map(|w| {
                w.chars()
                    .filter(|c| c.is_alphanumeric())
                    .collect::<String>()
            })
            .filter(|w| !w.is_empty())
            .map(|w| format!("\"{}\"", w))
            .collect();
        if terms.is_empty() {
            None
        } else {
            Some(terms.join(" OR "))
        }
    }

    async fn fts_candidates(&self, query: &str) -> Result<Vec<String>> {
        let match_expr = match Self::fts_query(query) {
            Some(expr) => expr,
            None => return Ok(Vec::new()),
        };

        let rows = sqlx::query(
            r#"
            SELECT text
            FROM chunks_fts
            WHERE chunks_fts MATCH ?
            ORDER BY rank
            LIMIT ?
            "#,
        )
        .bind(&match_expr)
        .bind(FTS_CANDIDATE_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(|row| row.get("text")).collect())
    }

    async fn all_chunk_texts(&self) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT text FROM chunks ORDER BY document_id, chunk_index")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(|row| row.get("text")).collect())
    }
}

#[async_trait]
impl ContentStore for SqliteStore {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn put(&self, doc_id: &str, _text: &str, chunks: &[Chunk]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM chunks_fts WHERE document_id = ?")
            .bind(doc_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM chunks WHERE document_id = ?")
            .bind(doc_id)
            .execute(&mut *tx)
            .await?;

        for chunk in chunks {
            sqlx::query(
                "INSERT INTO chunks (id, document_id, chunk_index, text, hash) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&chunk.id)
            .bind(doc_id)
            .bind(chunk.chunk_index)
            .bind(&chunk.text)
            .bind(&chunk.hash)
            .execute(&mut *tx)
            .await?;

            sqlx::query("INSERT INTO chunks_fts (chunk_id, document_id, text) VALUES (?, ?, ?)")
                .bind(&chunk.id)
                .bind(doc_id)
                .bind(&chunk.text)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn remove(&self, doc_id: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM chunks_fts WHERE document_id = ?")
            .bind(doc_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM chunks WHERE document_id = ?")
            .bind(doc_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        let candidates = self.fts_candidates(query).await?;

        let candidates = if candidates.is_empty() {
            // FTS found nothing; fall back to scoring every chunk.
            self.all_chunk_texts().await?
        } else {
            candidates
        };

        Ok(score::rank(
            query,
            candidates.iter().map(String::as_str),
            &self.retrieval,
        ))
    }

    async fn document_count(&self) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(DISTINCT document_id) FROM chunks")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::chunk_document;
    use crate::db;
    use crate::migrate;

    async fn store() -> (tempfile::TempDir, SqliteStore) {
        let tmp = tempfile::TempDir::new().unwrap();
        let pool = db::connect_path(&tmp.path().join("askdoc.sqlite"))
            .await
            .unwrap();
        migrate::run_migrations(&pool).await.unwrap();
        (tmp, SqliteStore::new(pool, RetrievalConfig::default()))
    }

    #[tokio::test]
    async fn test_put_and_fts_search() {
        let (_tmp, store) = store().await;
        let text = "The quarterly revenue grew by 12%. Operating costs fell.";
        let chunks = chunk_document("report.pdf", text, 1000, 100);
        store.put("report.pdf", text, &chunks).await.unwrap();

        let hits = store.search("revenue costs").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].score > 0.1);
        assert!(hits[0].text.contains("revenue"));
    }

    #[tokio::test]
    async fn test_fallback_scan_when_fts_misses() {
        let (_tmp, store) = store().await;
        let text = "The quarterly revenue grew by 12%.";
        let chunks = chunk_document("report.pdf", text, 1000, 100);
        store.put("report.pdf", text, &chunks).await.unwrap();

        // "quarter" is not a whole FTS token, so the MATCH yields nothing;
        // the fallback scan's substring heuristic still finds "quarterly".
        let hits = store.search("quarter").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].text.contains("quarterly"));
    }

    #[tokio::test]
    async fn test_put_replaces_chunks() {
        let (_tmp, store) = store().await;
        let old = chunk_document("a.txt", "old content about cats", 1000, 100);
        store.put("a.txt", "old content about cats", &old).await.unwrap();
        let new = chunk_document("a.txt", "new content about dogs", 1000, 100);
        store.put("a.txt", "new content about dogs", &new).await.unwrap();

        assert_eq!(store.document_count().await.unwrap(), 1);
        assert!(store.search("cats").await.unwrap().is_empty());
        assert_eq!(store.search("dogs").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_remove_idempotent() {
        let (_tmp, store) = store().await;
        let chunks = chunk_document("a.txt", "some text here", 1000, 100);
        store.put("a.txt", "some text here", &chunks).await.unwrap();
        store.remove("a.txt").await.unwrap();
        store.remove("a.txt").await.unwrap();
        assert_eq!(store.document_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_empty_query_returns_nothing() {
        let (_tmp, store) = store().await;
        let chunks = chunk_document("a.txt", "some text here", 1000, 100);
        store.put("a.txt", "some text here", &chunks).await.unwrap();
        assert!(store.search("").await.unwrap().is_empty());
        assert!(store.search("???").await.unwrap().is_empty());
    }

    #[test]
    fn test_fts_query_sanitization() {
        assert_eq!(
            SqliteStore::fts_query("revenue growth?").unwrap(),
            "\"revenue\" OR \"growth\""
        );
        assert!(SqliteStore::fts_query("?? !!").is_none());
        assert!(SqliteStore::fts_query("").is_none());
    }
}
