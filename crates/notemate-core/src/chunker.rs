//! Word-window chunking.
//!
//! Text is split on whitespace and cut into windows of `size` tokens whose
//! starts advance by `size - overlap`, so consecutive chunks share `overlap`
//! tokens. A document with no tokens still yields one chunk so downstream
//! embedding never receives an empty batch.

use tracing::debug;

use crate::config::{ChunkingConfig, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use crate::error::{Error, Result};

pub const NO_CONTENT_PLACEHOLDER: &str = "No content to process";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    size: usize,
    overlap: usize,
}

impl Default for Chunker {
    fn default() -> Self {
        Self { size: DEFAULT_CHUNK_SIZE, overlap: DEFAULT_CHUNK_OVERLAP }
    }
}

impl Chunker {
    pub fn new(size: usize, overlap: usize) -> Result<Self> {
        if size == 0 {
            return Err(Error::invalid_config("chunk size must be positive"));
        }
        if overlap >= size {
            return Err(Error::invalid_config(format!(
                "chunk overlap ({overlap}) must be smaller than chunk size ({size})"
            )));
        }
        Ok(Self { size, overlap })
    }

    pub fn from_config(config: &ChunkingConfig) -> Result<Self> {
        Self::new(config.size, config.overlap)
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Distance in tokens between the starts of consecutive windows.
    pub fn step(&self) -> usize {
        self.size - self.overlap
    }

    pub fn chunk(&self, text: &str) -> Vec<String> {
        let words: Vec<&str> = text.split_whitespace().collect();
        if words.is_empty() {
            debug!("no tokens in input, emitting placeholder chunk");
            return vec![NO_CONTENT_PLACEHOLDER.to_string()];
        }
        let chunks: Vec<String> = (0..words.len())
            .step_by(self.step())
            .map(|start| {
                let end = (start + self.size).min(words.len());
                words[start..end].join(" ")
            })
            .collect();
        debug!(
            tokens = words.len(),
            chunks = chunks.len(),
            size = self.size,
            overlap = self.overlap,
            "chunked text"
        );
        chunks
    }
}

/// One-shot form of [`Chunker::chunk`].
pub fn chunk_text(text: &str, size: usize, overlap: usize) -> Result<Vec<String>> {
    Ok(Chunker::new(size, overlap)?.chunk(text))
}
