//! Domain types shared by the vector store and the retrieval engine.

use serde::{Deserialize, Serialize};

/// Index position of a chunk inside its collection.
pub type Position = usize;

/// A fixed-dimension embedding of one chunk or query.
pub type Embedding = Vec<f32>;

/// One ranked hit returned by a collection search.
///
/// - `position`: the chunk's position inside the collection
/// - `text`: the chunk text
/// - `distance`: squared L2 distance to the query, lower is closer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub position: Position,
    pub text: String,
    pub distance: f32,
}
