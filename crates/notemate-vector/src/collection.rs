use tracing::warn;

use notemate_core::error::{Error, Result};
use notemate_core::types::{Embedding, RetrievedChunk};

use crate::index::FlatIndex;

/// A named pair of chunk texts and the index over their embeddings.
///
/// Position *i* of the index always belongs to `chunks[i]`; both grow only
/// through [`Collection::append`], which adds a whole batch or nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct Collection {
    name: String,
    chunks: Vec<String>,
    index: FlatIndex,
}

impl Collection {
    pub fn new(name: &str, dimension: usize) -> Result<Self> {
        validate_collection_name(name)?;
        Ok(Self {
            name: name.to_string(),
            chunks: Vec::new(),
            index: FlatIndex::new(dimension)?,
        })
    }

    pub fn from_parts(name: &str, chunks: Vec<String>, index: FlatIndex) -> Result<Self> {
        validate_collection_name(name)?;
        if chunks.len() != index.len() {
            return Err(Error::IndexDesync {
                chunks: chunks.len(),
                vectors: index.len(),
            });
        }
        Ok(Self { name: name.to_string(), chunks, index })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn chunks(&self) -> &[String] {
        &self.chunks
    }

    pub fn index(&self) -> &FlatIndex {
        &self.index
    }

    pub fn dimension(&self) -> usize {
        self.index.dimension()
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn append(&mut self, chunks: Vec<String>, vectors: &[Embedding]) -> Result<()> {
        if chunks.len() != vectors.len() {
            return Err(Error::IndexDesync {
                chunks: chunks.len(),
                vectors: vectors.len(),
            });
        }
        self.index.add(vectors)?;
        self.chunks.extend(chunks);
        Ok(())
    }

    /// Nearest chunks to `query`, closest first.
    ///
    /// Positions the index returns beyond the chunk sequence are skipped.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<RetrievedChunk>> {
        let hits = self.index.search(query, k)?;
        Ok(hits
            .into_iter()
            .filter_map(|(position, distance)| match self.chunks.get(position) {
                Some(text) => Some(RetrievedChunk { position, text: text.clone(), distance }),
                None => {
                    warn!(
                        collection = %self.name,
                        position,
                        chunks = self.chunks.len(),
                        "index position out of range, skipping"
                    );
                    None
                }
            })
            .collect())
    }
}

/// Names double as file-name stems, so they must be non-empty and free of
/// path components.
pub fn validate_collection_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::invalid_config("collection name must not be empty"));
    }
    if name.contains(['/', '\\', '\0']) || name.contains("..") {
        return Err(Error::invalid_config(format!(
            "collection name '{name}' contains path characters"
        )));
    }
    Ok(())
}

/// Derive a collection name from an uploaded file name: dots, spaces and
/// path separators become underscores (`"My Notes.pdf"` -> `"My_Notes_pdf"`).
pub fn collection_name_for(file_name: &str) -> String {
    let name: String = file_name
        .chars()
        .map(|c| match c {
            '.' | ' ' | '/' | '\\' | '\0' => '_',
            c => c,
        })
        .collect();
    if name.is_empty() { "document".to_string() } else { name }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunks(texts: &[&str]) -> Vec<String> {
        texts.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_append_keeps_chunks_and_index_aligned() {
        let mut c = Collection::new("doc1", 2).unwrap();
        c.append(chunks(&["a", "b"]), &[vec![1.0, 0.0], vec![0.0, 1.0]]).unwrap();
        c.append(chunks(&["c"]), &[vec![1.0, 1.0]]).unwrap();
        assert_eq!(c.len(), 3);
        assert_eq!(c.index().len(), 3);
        assert_eq!(c.chunks()[2], "c");
    }

    #[test]
    fn test_failed_append_changes_nothing() {
        let mut c = Collection::new("doc1", 2).unwrap();
        c.append(chunks(&["a"]), &[vec![1.0, 0.0]]).unwrap();
        let before = c.clone();

        assert!(matches!(
            c.append(chunks(&["b"]), &[vec![1.0, 0.0, 0.0]]),
            Err(Error::DimensionMismatch { .. })
        ));
        assert!(matches!(
            c.append(chunks(&["b", "c"]), &[vec![1.0, 0.0]]),
            Err(Error::IndexDesync { .. })
        ));
        assert_eq!(c, before);
    }

    #[test]
    fn test_search_maps_positions_to_text() {
        let mut c = Collection::new("doc1", 2).unwrap();
        c.append(chunks(&["north", "east"]), &[vec![0.0, 1.0], vec![1.0, 0.0]]).unwrap();
        let hits = c.search(&[0.9, 0.1], 2).unwrap();
        assert_eq!(hits[0].text, "east");
        assert_eq!(hits[0].position, 1);
        assert_eq!(hits[1].text, "north");
        assert!(hits[0].distance <= hits[1].distance);
    }

    #[test]
    fn test_from_parts_detects_desync() {
        let mut index = FlatIndex::new(2).unwrap();
        index.add(&[vec![1.0, 0.0]]).unwrap();
        assert!(matches!(
            Collection::from_parts("doc1", chunks(&["a", "b"]), index),
            Err(Error::IndexDesync { chunks: 2, vectors: 1 })
        ));
    }

    #[test]
    fn test_name_validation() {
        assert!(Collection::new("", 2).is_err());
        assert!(Collection::new("../etc", 2).is_err());
        assert!(Collection::new("a/b", 2).is_err());
        assert!(Collection::new("lecture_3_pdf", 2).is_ok());
    }

    #[test]
    fn test_collection_name_for_upload() {
        assert_eq!(collection_name_for("My Notes.pdf"), "My_Notes_pdf");
        assert_eq!(collection_name_for("ch1.v2.docx"), "ch1_v2_docx");
        assert_eq!(collection_name_for("../x.txt"), "___x_txt");
        assert_eq!(collection_name_for(""), "document");
    }
}
