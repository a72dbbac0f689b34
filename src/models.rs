//! Core data models used throughout askdoc.
//!
//! These types represent the documents, chunks, and search hits that flow
//! through the upload and retrieval pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Indexing status of an uploaded document.
///
/// Linear state machine: a document is `Processing` while its text is being
/// chunked and stored, and `Indexed` once the content store has accepted it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Processing,
    Indexed,
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentStatus::Processing => write!(f, "processing"),
            DocumentStatus::Indexed => write!(f, "indexed"),
        }
    }
}

/// Registry entry for an uploaded document.
///
/// The id is the uploaded filename; the content stores key their entries by
/// the same id so the two stay paired.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMeta {
    pub id: String,
    pub name: String,
    pub doc_type: String,
    pub status: DocumentStatus,
    pub uploaded_at: DateTime<Utc>,
    pub size_bytes: u64,
}

/// A chunk of a document's extracted text.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub id: String,
    pub document_id: String,
    pub chunk_index: i64,
    pub text: String,
    pub hash: String,
}

/// A scored text fragment returned from a content store.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub text: String,
    pub score: f64,
}
