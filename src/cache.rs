//! Per-document diagnostic cache
//!
//! Results are keyed by file path and tagged with a hash of the text they were
//! computed from, so a changed document misses. Concurrent readers never
//! block each other; a second write for the same path replaces the first.

use crate::diagnostic::Diagnostic;
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone)]
struct CacheEntry {
    content_hash: String,
    diagnostics: Arc<Vec<Diagnostic>>,
}

/// Diagnostics of the last analyzed version of each document
#[derive(Debug, Default)]
pub struct DocumentCache {
    entries: DashMap<PathBuf, CacheEntry>,
}

impl DocumentCache {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Cached diagnostics for `path`, if they were computed from `text`
    pub fn get(&self, path: &Path, text: &str) -> Option<Arc<Vec<Diagnostic>>> {
        let entry = self.entries.get(path)?;
        if entry.content_hash != content_hash(text) {
            return None;
        }
        log::debug!("cache hit for {}", path.display());
        Some(Arc::clone(&entry.diagnostics))
    }

    /// Store diagnostics for `path`, replacing whatever was there
    pub fn insert(&self, path: &Path, text: &str, diagnostics: Vec<Diagnostic>) -> Arc<Vec<Diagnostic>> {
        let diagnostics = Arc::new(diagnostics);
        self.entries.insert(
            path.to_path_buf(),
            CacheEntry {
                content_hash: content_hash(text),
                diagnostics: Arc::clone(&diagnostics),
            },
        );
        diagnostics
    }

    pub fn invalidate(&self, path: &Path) {
        self.entries.remove(path);
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Hex SHA-256 of a document's text
pub fn content_hash(text: &str) -> String {
    Sha256::digest(text.as_bytes())
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}
