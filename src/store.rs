//! The file-backed document store and its builder.

use crate::document::Document;
use crate::error::Result;
use crate::persist::{atomic_write, load};
use crate::serializer::{JsonSerializer, Serializer};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Single shared JSON document persisted to one file.
///
/// Every operation goes through the backing file; nothing is cached in
/// process. That keeps the semantics dead simple and makes them easy to
/// state: no locking, so concurrent writers race and the last completed
/// write replaces the document wholesale. Section updates are
/// read-modify-write with the same exposure. Use a real database if you
/// need more.
pub struct DocStore {
    path: PathBuf,
    serializer: JsonSerializer,
    seed: Document,
}

impl DocStore {
    /// Open a store at `path` with the default seed and pretty-printed
    /// output. The file itself is only created on the first read or write.
    #[must_use]
    pub fn open(path: impl AsRef<Path>) -> Self {
        Self::builder(path).build()
    }

    /// Start configuring a store. Call [`.build()`](DocStoreBuilder::build)
    /// when ready.
    #[must_use]
    pub fn builder(path: impl AsRef<Path>) -> DocStoreBuilder {
        DocStoreBuilder::new(path)
    }

    // ---- reads ----

    /// The current document.
    ///
    /// If the backing file is missing or empty, the seed document is
    /// stamped, persisted, and returned, so a first read and every read
    /// after it observe the same thing.
    pub fn read(&self) -> Result<Document> {
        match load(&self.path, &self.serializer)? {
            Some(doc) => Ok(doc),
            None => {
                let mut doc = self.seed.clone();
                doc.touch();
                self.persist(&doc)?;
                Ok(doc)
            }
        }
    }

    /// Path to the backing JSON file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    // ---- writes ----

    /// Replace the entire document.
    ///
    /// `lastModified` is stamped; everything else in `doc` is persisted
    /// verbatim, dropping whatever was there before.
    pub fn replace(&self, mut doc: Document) -> Result<()> {
        doc.touch();
        self.persist(&doc)
    }

    /// Replace one top-level section, leaving the rest of the document
    /// untouched (apart from the `lastModified` stamp). Returns the updated
    /// document.
    ///
    /// Heads up: this does a load-then-persist under the hood, so there's a
    /// race window with concurrent writers. Fine for single-writer setups.
    pub fn update_section(&self, section: &str, value: Value) -> Result<Document> {
        let mut doc = self.read()?;
        doc.set_section(section, value)?;
        doc.touch();
        self.persist(&doc)?;
        Ok(doc)
    }

    // ---- internal ----

    fn persist(&self, doc: &Document) -> Result<()> {
        let bytes = self.serializer.serialize(doc)?;
        atomic_write(&self.path, &bytes)
    }
}

impl std::fmt::Debug for DocStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Configures and opens a [`DocStore`].
///
/// ```rust,no_run
/// use doc_sync::DocStore;
///
/// let store = DocStore::builder("data.json").pretty(false).build();
/// ```
pub struct DocStoreBuilder {
    path: PathBuf,
    pretty: bool,
    seed: Document,
}

impl DocStoreBuilder {
    fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            pretty: true,
            seed: Document::seed(),
        }
    }

    /// Write human-readable JSON with indentation (default: on).
    #[must_use]
    pub fn pretty(mut self, yes: bool) -> Self {
        self.pretty = yes;
        self
    }

    /// Document a fresh store starts from (default: [`Document::seed`]).
    #[must_use]
    pub fn seed(mut self, seed: Document) -> Self {
        self.seed = seed;
        self
    }

    /// Finish configuration. Does not touch the file system; the backing
    /// file appears on the first read or write.
    #[must_use]
    pub fn build(self) -> DocStore {
        let serializer = if self.pretty {
            JsonSerializer::pretty()
        } else {
            JsonSerializer::new()
        };
        DocStore {
            path: self.path,
            serializer,
            seed: self.seed,
        }
    }
}

impl std::fmt::Debug for DocStoreBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocStoreBuilder")
            .field("path", &self.path)
            .field("pretty", &self.pretty)
            .finish_non_exhaustive()
    }
}
