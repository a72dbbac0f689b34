//! Fixed-size overlapping window chunker.
//!
//! Splits document text into [`Chunk`]s of a configurable character length
//! with a configurable overlap between neighbors. Windows are emitted left
//! to right; the window position becomes the chunk's ordinal index, which is
//! meaningful downstream.
//!
//! Each chunk receives a UUID plus a SHA-256 hash of its text for
//! dedup/debugging.

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::models::Chunk;

/// Split text into character windows of `size`, each starting `size - overlap`
/// characters after the previous one. The final window may be shorter.
///
/// Preconditions (enforced at config load): `size > 0`, `overlap < size`.
/// Empty input yields an empty vector, not a single empty window.
pub fn split_windows(text: &str, size: usize, overlap: usize) -> Vec<String> {
    debug_assert!(size > 0 && overlap < size);

    let chars: Vec<char> = text.chars().collect();
    let step = size - overlap;
    let mut windows = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let end = (start + size).min(chars.len());
        windows.push(chars[start..end].iter().collect());
        start += step;
    }

    windows
}

/// Chunk a document's text, assigning contiguous indices starting at 0.
pub fn chunk_document(document_id: &str, text: &str, size: usize, overlap: usize) -> Vec<Chunk> {
    split_windows(text, size, overlap)
        .into_iter()
        .enumerate()
        .map(|(i, w)| make_chunk(document_id, i as i64, &w))
        .collect()
}

fn make_chunk(document_id: &str, index: i64, text: &str) -> Chunk {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    Chunk {
        id: Uuid::new_v4().to_string(),
        document_id: document_id.to_string(),
        chunk_index: index,
        text: text.to_string(),
        hash,
    }
}
