//! On-disk persistence for collections.
//!
//! Each collection `N` is stored as sibling files under the store root:
//!
//! - `N_docs.json`: `{"chunks": [...]}`
//! - `N_index.bin`: a 32-byte blake3 digest of the chunk sequence followed by
//!   the [`FlatIndex`] blob
//! - `N_docs.prev.json`: the chunks of the pair being replaced, kept while a
//!   save switches the two files over
//!
//! The digest ties the index to exactly one chunk file. A save links the
//! current docs to `N_docs.prev.json`, then replaces docs and index with a
//! write-to-temp, fsync, rename sequence, docs first. If it stops between the
//! two renames, the old index still matches the kept chunks and `load`
//! returns the previous collection. Readers take the index first for the
//! same reason.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use notemate_core::error::{Error, Result};

use crate::collection::{validate_collection_name, Collection};
use crate::index::FlatIndex;

const INDEX_SUFFIX: &str = "_index.bin";
const DOCS_SUFFIX: &str = "_docs.json";
const PREV_DOCS_SUFFIX: &str = "_docs.prev.json";
const DIGEST_LEN: usize = blake3::OUT_LEN;

#[derive(Serialize)]
struct DocsRef<'a> {
    chunks: &'a [String],
}

#[derive(Deserialize)]
struct DocsOwned {
    chunks: Vec<String>,
}

fn chunk_digest(chunks: &[String]) -> blake3::Hash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&(chunks.len() as u64).to_le_bytes());
    for chunk in chunks {
        hasher.update(&(chunk.len() as u64).to_le_bytes());
        hasher.update(chunk.as_bytes());
    }
    hasher.finalize()
}

fn ignore_not_found(result: io::Result<()>) -> io::Result<bool> {
    match result {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

#[derive(Debug, Clone)]
pub struct CollectionStore {
    root: PathBuf,
}

impl CollectionStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        debug!(root = %root.display(), "collection store opened");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn index_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}{INDEX_SUFFIX}"))
    }

    pub fn docs_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}{DOCS_SUFFIX}"))
    }

    pub fn prev_docs_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}{PREV_DOCS_SUFFIX}"))
    }

    pub fn save(&self, name: &str, chunks: &[String], index: &FlatIndex) -> Result<()> {
        validate_collection_name(name)?;
        if chunks.len() != index.len() {
            return Err(Error::IndexDesync {
                chunks: chunks.len(),
                vectors: index.len(),
            });
        }

        let docs = serde_json::to_vec(&DocsRef { chunks })?;
        let blob = index.to_bytes();
        let mut index_bytes = Vec::with_capacity(DIGEST_LEN + blob.len());
        index_bytes.extend_from_slice(chunk_digest(chunks).as_bytes());
        index_bytes.extend_from_slice(&blob);

        fs::create_dir_all(&self.root)?;
        self.keep_previous_docs(name)?;
        self.write_atomic(&self.docs_path(name), &docs)?;
        self.write_atomic(&self.index_path(name), &index_bytes)?;
        info!(
            collection = name,
            chunks = chunks.len(),
            dim = index.dimension(),
            "collection saved"
        );
        Ok(())
    }

    pub fn save_collection(&self, collection: &Collection) -> Result<()> {
        self.save(collection.name(), collection.chunks(), collection.index())
    }

    pub fn load(&self, name: &str) -> Result<Collection> {
        validate_collection_name(name)?;
        let index_bytes = self.read_artifact(name, &self.index_path(name))?;
        let docs = self.read_artifact(name, &self.docs_path(name))?;

        if index_bytes.len() < DIGEST_LEN {
            return Err(Error::corrupt(name, "index file is missing its digest"));
        }
        let (digest, blob) = index_bytes.split_at(DIGEST_LEN);
        let index = FlatIndex::from_bytes(blob)
            .map_err(|e| Error::corrupt(name, format!("index file: {e}")))?;

        let chunks = parse_docs(name, &docs)?;
        let chunks = if digest == chunk_digest(&chunks).as_bytes() {
            chunks
        } else {
            match self.previous_docs(name) {
                Some(prev) if digest == chunk_digest(&prev).as_bytes() => {
                    warn!(collection = name, "last save did not finish, using previous chunks");
                    prev
                }
                _ => {
                    return Err(Error::corrupt(
                        name,
                        "index and chunk files are from different saves",
                    ))
                }
            }
        };

        if chunks.len() != index.len() {
            return Err(Error::corrupt(
                name,
                format!("{} chunks but {} vectors", chunks.len(), index.len()),
            ));
        }

        let collection = Collection::from_parts(name, chunks, index)?;
        info!(
            collection = name,
            chunks = collection.len(),
            dim = collection.dimension(),
            "collection loaded"
        );
        Ok(collection)
    }

    pub fn exists(&self, name: &str) -> bool {
        validate_collection_name(name).is_ok()
            && self.docs_path(name).is_file()
            && self.index_path(name).is_file()
    }

    /// Names with both artifacts present, sorted.
    pub fn list(&self) -> Result<Vec<String>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut names = Vec::new();
        for entry in entries {
            let file_name = entry?.file_name();
            let Some(name) = file_name.to_str().and_then(|f| f.strip_suffix(DOCS_SUFFIX)) else {
                continue;
            };
            if self.index_path(name).is_file() {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Remove the collection's files. Returns whether anything was deleted.
    pub fn delete(&self, name: &str) -> Result<bool> {
        validate_collection_name(name)?;
        let mut removed = false;
        for path in [self.index_path(name), self.docs_path(name)] {
            removed |= ignore_not_found(fs::remove_file(&path))?;
        }
        ignore_not_found(fs::remove_file(self.prev_docs_path(name)))?;
        if removed {
            info!(collection = name, "collection deleted");
        }
        Ok(removed)
    }

    /// Point `N_docs.prev.json` at the current docs before they are replaced.
    fn keep_previous_docs(&self, name: &str) -> Result<()> {
        let docs = self.docs_path(name);
        if !docs.is_file() {
            return Ok(());
        }
        let prev = self.prev_docs_path(name);
        ignore_not_found(fs::remove_file(&prev))?;
        if let Err(e) = fs::hard_link(&docs, &prev) {
            debug!(error = %e, "hard link unavailable, copying previous chunks");
            fs::copy(&docs, &prev)?;
        }
        Ok(())
    }

    fn previous_docs(&self, name: &str) -> Option<Vec<String>> {
        let bytes = fs::read(self.prev_docs_path(name)).ok()?;
        parse_docs(name, &bytes).ok()
    }

    fn read_artifact(&self, name: &str, path: &Path) -> Result<Vec<u8>> {
        fs::read(path).map_err(|e| {
            debug!(path = %path.display(), error = %e, "collection artifact unavailable");
            Error::CollectionNotFound(name.to_string())
        })
    }

    fn write_atomic(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        let mut tmp = NamedTempFile::new_in(&self.root)?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| e.error)?;
        sync_dir(&self.root)?;
        debug!(path = %path.display(), bytes = bytes.len(), "artifact written");
        Ok(())
    }
}

fn parse_docs(name: &str, bytes: &[u8]) -> Result<Vec<String>> {
    let DocsOwned { chunks } = serde_json::from_slice(bytes)
        .map_err(|e| Error::corrupt(name, format!("chunk file: {e}")))?;
    Ok(chunks)
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> io::Result<()> {
    fs::File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_depends_on_chunk_boundaries() {
        let a = chunk_digest(&["ab".to_string(), "c".to_string()]);
        let b = chunk_digest(&["a".to_string(), "bc".to_string()]);
        assert_ne!(a, b);
    }

    #[test]
    fn artifact_paths_use_name_stem() {
        let dir = tempfile::tempdir().unwrap();
        let store = CollectionStore::new(dir.path()).unwrap();
        assert_eq!(store.index_path("doc1"), dir.path().join("doc1_index.bin"));
        assert_eq!(store.docs_path("doc1"), dir.path().join("doc1_docs.json"));
        assert_eq!(store.prev_docs_path("doc1"), dir.path().join("doc1_docs.prev.json"));
    }

    #[test]
    fn first_save_keeps_no_previous_docs() {
        let dir = tempfile::tempdir().unwrap();
        let store = CollectionStore::new(dir.path()).unwrap();
        let mut index = FlatIndex::new(2).unwrap();
        index.add(&[vec![1.0, 0.0]]).unwrap();
        store.save("doc1", &["a".to_string()], &index).unwrap();
        assert!(!store.prev_docs_path("doc1").exists());

        store.save("doc1", &["b".to_string()], &index).unwrap();
        let prev = fs::read(store.prev_docs_path("doc1")).unwrap();
        assert_eq!(parse_docs("doc1", &prev).unwrap(), vec!["a".to_string()]);
    }
}
