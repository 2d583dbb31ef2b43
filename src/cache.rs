//! Local fallback cache: a string-to-string map persisted to one file.
//!
//! This is what the sync client writes through when the remote endpoint is
//! unreachable. Each well-known section is cached under its own key as a
//! JSON string; there is no combined-document key.

use crate::document::{now_rfc3339, Document, CONFIG_SECTION, CONTACT_REQUESTS_SECTION};
use crate::error::Result;
use crate::persist::{atomic_write, load};
use crate::serializer::{JsonSerializer, Serializer};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// File-backed key-value cache, flushed on every write.
///
/// Thread-safe; reads hit the in-memory map, writes rewrite the whole file
/// (it holds a handful of small strings, so that costs nothing).
pub struct LocalCache {
    map: RwLock<HashMap<String, String>>,
    path: PathBuf,
    serializer: JsonSerializer,
}

impl LocalCache {
    /// Open (or create) a cache at `path`. A missing or empty file starts
    /// the cache empty.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let serializer = JsonSerializer::new();
        let map = load(path.as_ref(), &serializer)?.unwrap_or_default();
        Ok(Self {
            map: RwLock::new(map),
            path: path.as_ref().to_path_buf(),
            serializer,
        })
    }

    /// Value stored under `key`, if any.
    #[must_use]
    pub fn get_item(&self, key: &str) -> Option<String> {
        self.map.read().get(key).cloned()
    }

    /// Store `value` under `key` and flush to disk.
    pub fn set_item(&self, key: impl Into<String>, value: impl Into<String>) -> Result<()> {
        self.map.write().insert(key.into(), value.into());
        self.flush()
    }

    /// Remove `key`, returning its value if it was present.
    pub fn remove_item(&self, key: &str) -> Result<Option<String>> {
        let prev = self.map.write().remove(key);
        if prev.is_some() {
            self.flush()?;
        }
        Ok(prev)
    }

    /// Path to the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<()> {
        let snapshot = self.map.read().clone();
        let bytes = self.serializer.serialize(&snapshot)?;
        atomic_write(&self.path, &bytes)
    }

    // ---- document assembly ----

    /// Assemble a document from the cached section keys.
    ///
    /// Absent or unparseable keys fall back to an empty section, and
    /// `lastModified` is stamped with the current time; the cache never
    /// stores it.
    #[must_use]
    pub fn document(&self) -> Document {
        let config = self
            .get_item(CONFIG_SECTION)
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default();
        let contact_requests = self
            .get_item(CONTACT_REQUESTS_SECTION)
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default();
        Document {
            config,
            contact_requests,
            last_modified: Some(now_rfc3339()),
            extra: serde_json::Map::new(),
        }
    }

    /// Mirror a document's sections into the cache, one key per section.
    pub fn store_document(&self, doc: &Document) -> Result<()> {
        self.set_item(CONFIG_SECTION, serde_json::to_string(&doc.config)?)?;
        self.set_item(
            CONTACT_REQUESTS_SECTION,
            serde_json::to_string(&doc.contact_requests)?,
        )
    }
}

impl std::fmt::Debug for LocalCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalCache")
            .field("path", &self.path)
            .field("len", &self.map.read().len())
            .finish_non_exhaustive()
    }
}
