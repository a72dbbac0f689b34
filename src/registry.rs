//! Document metadata registry.
//!
//! The registry is the catalog of uploaded documents, independent of which
//! content store holds their text. It is an explicitly owned object handed
//! to the request handlers; one mutex guards the map and the recency list so
//! read-modify-write sequences stay atomic across concurrent callers. The
//! lock is never held across store or LLM I/O.
//!
//! Semantics:
//! - `register` is last-write-wins by id; re-registering moves the entry to
//!   the back of the recency order.
//! - `unregister` of an unknown id is an idempotent no-op.
//! - `save`/`load` snapshot the catalog as JSON so uploads survive restarts.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing::warn;

use crate::models::{DocumentMeta, DocumentStatus};

#[derive(Default)]
struct RegistryInner {
    by_id: HashMap<String, DocumentMeta>,
    order: Vec<String>,
}

pub struct DocumentRegistry {
    inner: Mutex<RegistryInner>,
}

impl DocumentRegistry {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(RegistryInner::default()),
        }
    }

    /// Insert or replace a document's metadata, keyed by id.
    pub fn register(&self, meta: DocumentMeta) {
        let mut inner = self.inner.lock().unwrap();
        inner.order.retain(|id| id != &meta.id);
        inner.order.push(meta.id.clone());
        inner.by_id.insert(meta.id.clone(), meta);
    }

    /// Remove a document's metadata. Returns whether an entry existed.
    pub fn unregister(&self, id: &str) -> bool {
        let mut inner = self.inner.lock().unwrap();
        inner.order.retain(|existing| existing != id);
        inner.by_id.remove(id).is_some()
    }

    pub fn get(&self, id: &str) -> Option<DocumentMeta> {
        self.inner.lock().unwrap().by_id.get(id).cloned()
    }

    /// All entries in recency order (oldest registration first).
    pub fn list(&self) -> Vec<DocumentMeta> {
        let inner = self.inner.lock().unwrap();
        inner
            .order
            .iter()
            .filter_map(|id| inner.by_id.get(id).cloned())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().by_id.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().by_id.len()
    }

    /// Flip a document's indexing status in place.
    pub fn set_status(&self, id: &str, status: DocumentStatus) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(meta) = inner.by_id.get_mut(id) {
            meta.status = status;
        }
    }

    /// Write the catalog to `path` as a JSON array in recency order.
    pub fn save(&self, path: &Path) -> Result<()> {
        let entries = self.list();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&entries)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write registry snapshot: {}", path.display()))?;
        Ok(())
    }

    /// Load a catalog snapshot. A missing or unreadable snapshot yields an
    /// empty registry rather than a startup failure.
    pub fn load(path: &Path) -> Self {
        let registry = Self::new();
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return registry,
        };
        match serde_json::from_str::<Vec<DocumentMeta>>(&content) {
            Ok(entries) => {
                for meta in entries {
                    registry.register(meta);
                }
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring corrupt registry snapshot");
            }
        }
        registry
    }
}

impl Default for DocumentRegistry {
    fn default() -> Self {
        Self::new()
    }
}
