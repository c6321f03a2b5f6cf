//! Retrieval engine: one active collection per session, embedded with a
//! pluggable [`Embedder`] and persisted through a [`CollectionStore`].
//!
//! ```no_run
//! use notemate_core::config::Config;
//! use notemate_engine::RetrievalEngine;
//!
//! # fn main() -> notemate_core::Result<()> {
//! let config = Config::load()?.retrieval()?;
//! let engine = RetrievalEngine::from_config(&config)?;
//! engine.create_collection("lecture_01_txt")?;
//! engine.add_documents("lecture_01_txt", vec!["Cells divide by mitosis.".into()])?;
//! let context = engine.query("lecture_01_txt", "how do cells divide?", 3)?;
//! # let _ = context;
//! # Ok(())
//! # }
//! ```

use parking_lot::Mutex;
use tracing::{debug, info};

use notemate_core::chunker::Chunker;
use notemate_core::config::RetrievalConfig;
use notemate_core::error::{Error, Result};
use notemate_core::traits::Embedder;
use notemate_core::types::RetrievedChunk;
use notemate_embed::get_default_embedder;
use notemate_vector::{validate_collection_name, Collection, CollectionStore};

pub mod study;

pub use study::{Generator, StudyMaterial, StudySession, StudyTask};

pub struct RetrievalEngine {
    embedder: Box<dyn Embedder>,
    store: CollectionStore,
    active: Mutex<Option<Collection>>,
}

impl RetrievalEngine {
    pub fn new(embedder: Box<dyn Embedder>, store: CollectionStore) -> Self {
        Self { embedder, store, active: Mutex::new(None) }
    }

    pub fn from_config(config: &RetrievalConfig) -> Result<Self> {
        config.validate()?;
        let embedder = get_default_embedder(&config.embedding)?;
        let store = CollectionStore::new(config.storage.db_path())?;
        info!(embedder = embedder.id(), root = %store.root().display(), "retrieval engine ready");
        Ok(Self::new(embedder, store))
    }

    pub fn embedder(&self) -> &dyn Embedder {
        self.embedder.as_ref()
    }

    pub fn store(&self) -> &CollectionStore {
        &self.store
    }

    /// Name of the active collection, if any.
    pub fn active_collection(&self) -> Option<String> {
        self.active.lock().as_ref().map(|c| c.name().to_string())
    }

    /// Chunk count of the active collection.
    pub fn len(&self) -> usize {
        self.active.lock().as_ref().map_or(0, Collection::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Make `name` the active collection, empty. Nothing is written until the
    /// first successful [`add_documents`](Self::add_documents).
    pub fn create_collection(&self, name: &str) -> Result<()> {
        validate_collection_name(name)?;
        let collection = Collection::new(name, self.embedder.dim())?;
        *self.active.lock() = Some(collection);
        info!(collection = name, dim = self.embedder.dim(), "collection created");
        Ok(())
    }

    /// Load a persisted collection and make it active.
    pub fn open_collection(&self, name: &str) -> Result<usize> {
        let collection = self.store.load(name)?;
        if collection.dimension() != self.embedder.dim() {
            return Err(Error::DimensionMismatch {
                expected: self.embedder.dim(),
                actual: collection.dimension(),
            });
        }
        let count = collection.len();
        *self.active.lock() = Some(collection);
        Ok(count)
    }

    /// Embed `chunks`, append them to the active collection `name` and persist.
    ///
    /// The batch is applied whole or not at all: on any error the active
    /// collection and its files are as they were before the call.
    pub fn add_documents(&self, name: &str, chunks: Vec<String>) -> Result<()> {
        if chunks.is_empty() {
            debug!(collection = name, "no chunks to add");
            return Ok(());
        }
        let mut active = self.active.lock();
        let current = active
            .as_ref()
            .filter(|c| c.name() == name)
            .ok_or_else(|| Error::CollectionNotFound(name.to_string()))?;

        let vectors = self.embedder.embed_batch(&chunks)?;
        if vectors.len() != chunks.len() {
            return Err(Error::Embedding(format!(
                "{} returned {} vectors for {} chunks",
                self.embedder.id(),
                vectors.len(),
                chunks.len()
            )));
        }

        let mut next = current.clone();
        let added = chunks.len();
        next.append(chunks, &vectors)?;
        self.store.save_collection(&next)?;
        info!(collection = name, added, total = next.len(), "documents added");
        *active = Some(next);
        Ok(())
    }

    /// Texts of the `k` chunks nearest to `text`, closest first.
    pub fn query(&self, name: &str, text: &str, k: usize) -> Result<Vec<String>> {
        Ok(self.search(name, text, k)?.into_iter().map(|hit| hit.text).collect())
    }

    /// Like [`query`](Self::query) but keeps positions and distances.
    ///
    /// Returns an empty list without embedding anything when `name` is not
    /// the active collection, the collection is empty, or `k` is zero.
    pub fn search(&self, name: &str, text: &str, k: usize) -> Result<Vec<RetrievedChunk>> {
        let active = self.active.lock();
        let Some(collection) = active.as_ref().filter(|c| c.name() == name && !c.is_empty()) else {
            debug!(collection = name, "query against absent or empty collection");
            return Ok(Vec::new());
        };
        if k == 0 {
            return Ok(Vec::new());
        }

        let query = self
            .embedder
            .embed_batch(&[text.to_string()])?
            .into_iter()
            .next()
            .ok_or_else(|| {
                Error::Embedding(format!(
                    "{} returned no vector for the query",
                    self.embedder.id()
                ))
            })?;
        let hits = collection.search(&query, k)?;
        debug!(collection = name, k, hits = hits.len(), "query");
        Ok(hits)
    }

    /// Create `name`, chunk `text` and add the chunks. Returns the chunk count.
    pub fn ingest_text(&self, name: &str, text: &str, chunker: &Chunker) -> Result<usize> {
        self.create_collection(name)?;
        let chunks = chunker.chunk(text);
        let count = chunks.len();
        self.add_documents(name, chunks)?;
        Ok(count)
    }
}
