use crate::error::Result;
use crate::types::Embedding;

/// Maps text to fixed-dimension vectors.
///
/// Implementations return exactly one vector per input, in input order, all
/// of length [`Embedder::dim`], and the same vector for the same text across
/// calls and processes. Backend failures surface as
/// [`Error::Embedding`](crate::error::Error::Embedding).
pub trait Embedder: Send + Sync {
    /// Stable identifier for the backend/model (e.g. `minilm:all-MiniLM-L6-v2:d384`).
    fn id(&self) -> &str;
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>>;
}

impl<E: Embedder + ?Sized> Embedder for Box<E> {
    fn id(&self) -> &str {
        (**self).id()
    }

    fn dim(&self) -> usize {
        (**self).dim()
    }

    fn max_len(&self) -> usize {
        (**self).max_len()
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        (**self).embed_batch(texts)
    }
}
