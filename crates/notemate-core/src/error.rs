use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    #[error("Corrupt collection '{name}': {reason}")]
    CorruptCollection { name: String, reason: String },

    #[error("Index desync: {chunks} chunks but {vectors} vectors")]
    IndexDesync { chunks: usize, vectors: usize },

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    pub fn corrupt(name: &str, reason: impl Into<String>) -> Self {
        Self::CorruptCollection { name: name.to_string(), reason: reason.into() }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
