//! Upload pipeline: validate, extract, persist, chunk, index, register.
//!
//! A document only becomes visible once both halves of an upload succeed:
//! content stored in the search backend AND metadata registered in the
//! catalog. Registration happens last, so a failed indexing run leaves no
//! orphan catalog entry; the raw file written before indexing is cleaned up
//! on failure. Per-file failures are reported to the caller, never
//! propagated as batch failures.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::chunk::chunk_document;
use crate::config::Config;
use crate::extract::{extract_text, DocType};
use crate::models::{DocumentMeta, DocumentStatus};
use crate::registry::DocumentRegistry;
use crate::search::SearchFacade;

/// Directory holding the raw bytes of every upload, for re-indexing after a
/// restart.
pub fn raw_dir(config: &Config) -> PathBuf {
    config.storage.data_dir.join("uploads")
}

/// Path of the registry snapshot.
pub fn snapshot_path(config: &Config) -> PathBuf {
    config.storage.data_dir.join("documents.json")
}

/// Uploaded filenames double as document ids and on-disk names under
/// `data_dir/uploads`. Anything carrying a path component (`/`, `..`) would
/// escape that directory when joined, so it is rejected outright.
fn is_safe_file_name(name: &str) -> bool {
    Path::new(name).file_name() == Some(std::ffi::OsStr::new(name))
}

/// Ingest one uploaded file. Returns the registered metadata on success; on
/// any failure the registry and content store are left unchanged.
pub async fn process_upload(
    config: &Config,
    registry: &DocumentRegistry,
    facade: &SearchFacade,
    file_name: &str,
    bytes: &[u8],
) -> Result<DocumentMeta> {
    if !is_safe_file_name(file_name) {
        anyhow::bail!("invalid file name: {}", file_name);
    }
    let doc_type = DocType::from_filename(file_name)
        .with_context(|| format!("unsupported file type: {}", file_name))?;

    if bytes.len() > config.upload.max_file_bytes {
        anyhow::bail!(
            "{} is {} bytes, exceeding the {} byte upload limit",
            file_name,
            bytes.len(),
            config.upload.max_file_bytes
        );
    }

    let text = extract_text(file_name, bytes)
        .map_err(|e| anyhow::anyhow!("{}", e))
        .with_context(|| format!("failed to extract text from {}", file_name))?;
    if text.trim().is_empty() {
        anyhow::bail!("{} contains no extractable text", file_name);
    }

    let raw_path = raw_dir(config).join(file_name);
    if let Some(parent) = raw_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&raw_path, bytes)
        .with_context(|| format!("failed to persist upload: {}", raw_path.display()))?;

    let chunks = chunk_document(file_name, &text, config.chunking.size, config.chunking.overlap);

    if let Err(e) = facade.put(file_name, &text, &chunks).await {
        // Indexing failed: drop the raw file so restart re-indexing does not
        // resurrect a document the catalog never listed.
        if let Err(rm) = std::fs::remove_file(&raw_path) {
            warn!(path = %raw_path.display(), error = %rm, "failed to clean up raw upload");
        }
        return Err(e.context(format!("failed to index {}", file_name)));
    }

    let meta = DocumentMeta {
        id: file_name.to_string(),
        name: file_name.to_string(),
        doc_type: doc_type.label().to_string(),
        status: DocumentStatus::Indexed,
        uploaded_at: Utc::now(),
        size_bytes: bytes.len() as u64,
    };
    registry.register(meta.clone());
    registry.save(&snapshot_path(config))?;

    info!(document = file_name, chunks = chunks.len(), "document indexed");
    Ok(meta)
}

/// Remove a document everywhere: content store, raw file, catalog. Unknown
/// ids are a no-op; the returned bool reports whether an entry existed.
pub async fn delete_document(
    config: &Config,
    registry: &DocumentRegistry,
    facade: &SearchFacade,
    id: &str,
) -> Result<bool> {
    facade.remove(id).await?;

    // An id with path components was never registered; joining it would
    // reach outside the uploads directory.
    if is_safe_file_name(id) {
        let raw_path = raw_dir(config).join(id);
        if let Err(e) = std::fs::remove_file(&raw_path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %raw_path.display(), error = %e, "failed to remove raw upload");
            }
        }
    }

    let existed = registry.unregister(id);
    registry.save(&snapshot_path(config))?;
    Ok(existed)
}

/// Rebuild in-memory state after a restart: load the catalog snapshot and
/// re-index every document whose raw file survived. Entries whose raw file
/// is gone or no longer extracts are dropped from the catalog.
pub async fn restore_documents(config: &Config, facade: &SearchFacade) -> Result<DocumentRegistry> {
    let registry = DocumentRegistry::load(&snapshot_path(config));

    for meta in registry.list() {
        let raw_path = raw_dir(config).join(&meta.id);
        let bytes = match std::fs::read(&raw_path) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(document = %meta.id, error = %e, "raw upload missing, dropping from catalog");
                registry.unregister(&meta.id);
                continue;
            }
        };
        let text = match extract_text(&meta.id, &bytes) {
            Ok(text) => text,
            Err(e) => {
                warn!(document = %meta.id, error = %e, "re-extraction failed, dropping from catalog");
                registry.unregister(&meta.id);
                continue;
            }
        };
        let chunks = chunk_document(&meta.id, &text, config.chunking.size, config.chunking.overlap);
        if let Err(e) = facade.put(&meta.id, &text, &chunks).await {
            warn!(document = %meta.id, error = %e, "re-indexing failed, dropping from catalog");
            registry.unregister(&meta.id);
            continue;
        }
        registry.set_status(&meta.id, DocumentStatus::Indexed);
    }

    registry.save(&snapshot_path(config))?;
    info!(documents = registry.len(), "catalog restored");
    Ok(registry)
}

/// Walk a directory and ingest every supported file in it. Used by the CLI.
/// Returns (indexed, skipped).
pub async fn ingest_dir(
    config: &Config,
    registry: &DocumentRegistry,
    facade: &SearchFacade,
    path: &Path,
) -> Result<(usize, usize)> {
    let mut indexed = 0usize;
    let mut skipped = 0usize;

    for entry in WalkDir::new(path).follow_links(false) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let file_name = match entry.file_name().to_str() {
            Some(name) => name.to_string(),
            None => {
                skipped += 1;
                continue;
            }
        };
        if DocType::from_filename(&file_name).is_none() {
            skipped += 1;
            continue;
        }
        let bytes = std::fs::read(entry.path())
            .with_context(|| format!("failed to read {}", entry.path().display()))?;
        match process_upload(config, registry, facade, &file_name, &bytes).await {
            Ok(_) => indexed += 1,
            Err(e) => {
                warn!(file = %file_name, error = %e, "skipping file");
                skipped += 1;
            }
        }
    }

    Ok((indexed, skipped))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        ChunkingConfig, RetrievalConfig, ServerConfig, StorageConfig, UploadConfig,
    };
    use crate::store::memory::InMemoryStore;
    use std::sync::Arc;

    fn test_config(data_dir: &Path) -> Config {
        Config {
            server: ServerConfig {
                bind: "127.0.0.1:0".to_string(),
            },
            storage: StorageConfig {
                backend: "memory".to_string(),
                data_dir: data_dir.to_path_buf(),
                db_path: None,
            },
            chunking: ChunkingConfig {
                size: 1000,
                overlap: 100,
            },
            retrieval: RetrievalConfig::default(),
            upload: UploadConfig::default(),
            llm: Default::default(),
            embedding: Default::default(),
        }
    }

    fn memory_facade() -> SearchFacade {
        SearchFacade::new(
            Arc::new(InMemoryStore::new(RetrievalConfig::default())),
            None,
            true,
        )
    }

    /// Delegates to an in-memory store but rejects puts for one document id.
    struct FlakyStore {
        inner: InMemoryStore,
        deny: String,
    }

    impl FlakyStore {
        fn denying(deny: &str) -> SearchFacade {
            let store = FlakyStore {
                inner: InMemoryStore::new(RetrievalConfig::default()),
                deny: deny.to_string(),
            };
            SearchFacade::new(Arc::new(store), None, true)
        }
    }

    #[async_trait::async_trait]
    impl crate::store::ContentStore for FlakyStore {
        fn name(&self) -> &'static str {
            "flaky"
        }
        async fn put(
            &self,
            doc_id: &str,
            text: &str,
            chunks: &[crate::models::Chunk],
        ) -> anyhow::Result<()> {
            if doc_id == self.deny {
                anyhow::bail!("store rejected {}", doc_id);
            }
            self.inner.put(doc_id, text, chunks).await
        }
        async fn remove(&self, doc_id: &str) -> anyhow::Result<()> {
            self.inner.remove(doc_id).await
        }
        async fn search(&self, query: &str) -> anyhow::Result<Vec<crate::models::SearchHit>> {
            self.inner.search(query).await
        }
        async fn document_count(&self) -> anyhow::Result<usize> {
            self.inner.document_count().await
        }
    }

    #[tokio::test]
    async fn test_upload_registers_and_indexes() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = test_config(tmp.path());
        let registry = DocumentRegistry::new();
        let facade = memory_facade();

        let meta = process_upload(
            &config,
            &registry,
            &facade,
            "report.txt",
            b"The quarterly revenue grew by 12%.",
        )
        .await
        .unwrap();

        assert_eq!(meta.id, "report.txt");
        assert_eq!(meta.doc_type, "text");
        assert_eq!(meta.status, DocumentStatus::Indexed);
        assert_eq!(registry.len(), 1);
        assert_eq!(facade.search("revenue").await.unwrap().len(), 1);
        assert!(raw_dir(&config).join("report.txt").exists());
        assert!(snapshot_path(&config).exists());
    }

    #[tokio::test]
    async fn test_unsupported_file_rejected() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = test_config(tmp.path());
        let registry = DocumentRegistry::new();
        let facade = memory_facade();

        let result = process_upload(&config, &registry, &facade, "data.bin", b"junk").await;
        assert!(result.is_err());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_traversal_filename_rejected() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = test_config(tmp.path());
        let registry = DocumentRegistry::new();
        let facade = memory_facade();

        for name in ["../evil.txt", "../../evil.txt", "nested/evil.txt", ".."] {
            let result =
                process_upload(&config, &registry, &facade, name, b"attacker controlled").await;
            assert!(result.is_err(), "{} was accepted", name);
        }
        assert!(registry.is_empty());
        // "uploads/../evil.txt" would have landed directly in data_dir.
        assert!(!tmp.path().join("evil.txt").exists());
    }

    #[tokio::test]
    async fn test_traversal_delete_cannot_reach_outside_uploads() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = test_config(tmp.path());
        let registry = DocumentRegistry::new();
        let facade = memory_facade();

        let sentinel = tmp.path().join("sentinel.txt");
        std::fs::create_dir_all(tmp.path()).unwrap();
        std::fs::write(&sentinel, b"keep me").unwrap();

        let existed = delete_document(&config, &registry, &facade, "../sentinel.txt")
            .await
            .unwrap();
        assert!(!existed);
        assert!(sentinel.exists());
    }

    #[tokio::test]
    async fn test_store_failure_leaves_no_registry_entry_or_raw_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = test_config(tmp.path());
        let registry = DocumentRegistry::new();
        let facade = FlakyStore::denying("report.txt");

        let result =
            process_upload(&config, &registry, &facade, "report.txt", b"some report text").await;
        assert!(result.is_err());
        assert!(registry.is_empty());
        assert!(!raw_dir(&config).join("report.txt").exists());
        assert!(!snapshot_path(&config).exists());
    }

    #[tokio::test]
    async fn test_empty_text_rejected() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = test_config(tmp.path());
        let registry = DocumentRegistry::new();
        let facade = memory_facade();

        let result = process_upload(&config, &registry, &facade, "blank.txt", b"   \n").await;
        assert!(result.is_err());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_oversized_file_rejected() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut config = test_config(tmp.path());
        config.upload.max_file_bytes = 8;
        let registry = DocumentRegistry::new();
        let facade = memory_facade();

        let result =
            process_upload(&config, &registry, &facade, "big.txt", b"far too many bytes").await;
        assert!(result.is_err());
        assert!(registry.is_empty());
        assert!(!raw_dir(&config).join("big.txt").exists());
    }

    #[tokio::test]
    async fn test_reupload_replaces_entry() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = test_config(tmp.path());
        let registry = DocumentRegistry::new();
        let facade = memory_facade();

        process_upload(&config, &registry, &facade, "a.txt", b"old content about cats")
            .await
            .unwrap();
        process_upload(&config, &registry, &facade, "a.txt", b"new content about dogs")
            .await
            .unwrap();

        assert_eq!(registry.len(), 1);
        assert!(facade.search("cats").await.unwrap().is_empty());
        assert_eq!(facade.search("dogs").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = test_config(tmp.path());
        let registry = DocumentRegistry::new();
        let facade = memory_facade();

        process_upload(&config, &registry, &facade, "a.txt", b"some content")
            .await
            .unwrap();

        assert!(delete_document(&config, &registry, &facade, "a.txt")
            .await
            .unwrap());
        assert!(!delete_document(&config, &registry, &facade, "a.txt")
            .await
            .unwrap());
        assert!(registry.is_empty());
        assert!(facade.search("content").await.unwrap().is_empty());
        assert!(!raw_dir(&config).join("a.txt").exists());
    }

    #[tokio::test]
    async fn test_restore_reindexes_surviving_files() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = test_config(tmp.path());
        let registry = DocumentRegistry::new();
        let facade = memory_facade();

        process_upload(
            &config,
            &registry,
            &facade,
            "report.txt",
            b"The quarterly revenue grew by 12%.",
        )
        .await
        .unwrap();
        process_upload(&config, &registry, &facade, "gone.txt", b"soon deleted")
            .await
            .unwrap();
        // Simulate a raw file lost between runs.
        std::fs::remove_file(raw_dir(&config).join("gone.txt")).unwrap();

        let fresh_facade = memory_facade();
        let restored = restore_documents(&config, &fresh_facade).await.unwrap();

        assert_eq!(restored.len(), 1);
        assert!(restored.get("report.txt").is_some());
        assert_eq!(fresh_facade.search("revenue").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_restore_continues_past_store_failure() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = test_config(tmp.path());
        let registry = DocumentRegistry::new();
        let facade = memory_facade();

        process_upload(&config, &registry, &facade, "good.txt", b"useful text")
            .await
            .unwrap();
        process_upload(&config, &registry, &facade, "bad.txt", b"other text")
            .await
            .unwrap();

        let flaky = FlakyStore::denying("bad.txt");
        let restored = restore_documents(&config, &flaky).await.unwrap();

        assert_eq!(restored.len(), 1);
        assert!(restored.get("good.txt").is_some());
        assert!(restored.get("bad.txt").is_none());
    }

    #[tokio::test]
    async fn test_ingest_dir_skips_unsupported() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = test_config(tmp.path());
        let registry = DocumentRegistry::new();
        let facade = memory_facade();

        let docs = tmp.path().join("docs");
        std::fs::create_dir_all(&docs).unwrap();
        std::fs::write(docs.join("a.txt"), b"revenue report").unwrap();
        std::fs::write(docs.join("b.md"), b"meeting notes").unwrap();
        std::fs::write(docs.join("c.bin"), b"\x00\x01").unwrap();

        let (indexed, skipped) = ingest_dir(&config, &registry, &facade, &docs).await.unwrap();
        assert_eq!(indexed, 2);
        assert_eq!(skipped, 1);
        assert_eq!(registry.len(), 2);
    }
}
