//! Embedding backends for the retrieval core.
//!
//! - [`MiniLmEmbedder`]: sentence-transformers all-MiniLM-L6-v2 (384-d) run
//!   through candle from a local model directory.
//! - [`HashEmbedder`]: deterministic token hashing, no model files. Used in
//!   tests, development, and whenever `APP_USE_FAKE_EMBEDDINGS=1`.

use std::collections::HashMap;
use std::fmt::Display;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::time::Instant;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use tokenizers::Tokenizer;
use tracing::{debug, info, warn};
use twox_hash::XxHash64;

use notemate_core::config::{expand_path, EmbeddingBackend, EmbeddingConfig};
use notemate_core::error::{Error, Result};
use notemate_core::traits::Embedder;
use notemate_core::types::Embedding;

mod device;
mod pool;
mod tokenize;

pub use device::select_device;
pub use pool::masked_mean_l2;
pub use tokenize::tokenize_on_device;

pub const MINILM_MODEL_NAME: &str = "all-MiniLM-L6-v2";

pub(crate) fn embedding_error(e: impl Display) -> Error {
    Error::Embedding(e.to_string())
}

pub struct MiniLmEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    dim: usize,
    max_len: usize,
    id: String,
}

impl MiniLmEmbedder {
    /// Load tokenizer, config and weights from `model_dir`.
    ///
    /// Weights are read from `model.safetensors` when present, otherwise from
    /// `pytorch_model.bin`.
    pub fn load(model_dir: &Path, max_len: usize) -> Result<Self> {
        let device = select_device();
        info!(dir = %model_dir.display(), "loading {MINILM_MODEL_NAME}");

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path).map_err(|e| {
            Error::Embedding(format!(
                "failed to load tokenizer from {}: {e}",
                tokenizer_path.display()
            ))
        })?;

        let config_path = model_dir.join("config.json");
        let raw = std::fs::read_to_string(&config_path).map_err(|e| {
            Error::Embedding(format!("failed to read {}: {e}", config_path.display()))
        })?;
        let config: BertConfig = serde_json::from_str(&raw).map_err(embedding_error)?;

        let safetensors = model_dir.join("model.safetensors");
        let weights: HashMap<String, Tensor> = if safetensors.exists() {
            candle_core::safetensors::load(&safetensors, &device).map_err(embedding_error)?
        } else {
            candle_core::pickle::read_all(model_dir.join("pytorch_model.bin"))
                .map_err(embedding_error)?
                .into_iter()
                .collect()
        };
        let vb = VarBuilder::from_tensors(weights, DType::F32, &device);
        let model = BertModel::load(vb, &config).map_err(embedding_error)?;

        let dim = config.hidden_size;
        let id = format!("minilm:{MINILM_MODEL_NAME}:d{dim}");
        info!(dim, max_len, "{MINILM_MODEL_NAME} loaded");
        Ok(Self { model, tokenizer, device, dim, max_len, id })
    }

    pub fn embed_text(&self, text: &str) -> Result<Embedding> {
        let start = Instant::now();
        let (input_ids, attention_mask) =
            tokenize_on_device(&self.tokenizer, text, self.max_len, &self.device)?;
        let token_type_ids = input_ids.zeros_like().map_err(embedding_error)?;
        let hidden = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))
            .map_err(embedding_error)?;
        let pooled = masked_mean_l2(&hidden, &attention_mask).map_err(embedding_error)?;
        let v: Vec<f32> = pooled
            .squeeze(0)
            .and_then(|t| t.to_device(&Device::Cpu))
            .and_then(|t| t.to_vec1())
            .map_err(embedding_error)?;
        if v.len() != self.dim {
            return Err(Error::Embedding(format!(
                "model produced {} values, expected {}",
                v.len(),
                self.dim
            )));
        }
        let elapsed = start.elapsed();
        if elapsed.as_millis() > 100 {
            warn!(ms = elapsed.as_millis(), "slow embedding");
        }
        Ok(v)
    }
}

impl Embedder for MiniLmEmbedder {
    fn id(&self) -> &str {
        &self.id
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn max_len(&self) -> usize {
        self.max_len
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        debug!(batch = texts.len(), "embedding batch");
        texts.iter().map(|t| self.embed_text(t)).collect()
    }
}

/// Model-free embedder: each whitespace token is hashed with xxHash64 into
/// one of `dim` buckets, and the result is L2-normalized.
///
/// Identical texts map to identical vectors across processes; texts sharing
/// tokens land closer together than unrelated ones.
pub struct HashEmbedder {
    dim: usize,
    id: String,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim, id: format!("hash:xxh64:d{dim}") }
    }

    pub fn embed_text(&self, text: &str) -> Embedding {
        let mut v = vec![0f32; self.dim];
        if self.dim == 0 {
            return v;
        }
        for (i, token) in text.split_whitespace().enumerate() {
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = usize::try_from(h % self.dim as u64).unwrap_or(0);
            let val = ((h >> 32) as u32) as f32 / u32::MAX as f32;
            v[idx] += val + (i % 3) as f32 * 0.01;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-6);
        for x in &mut v {
            *x /= norm;
        }
        v
    }
}

impl Embedder for HashEmbedder {
    fn id(&self) -> &str {
        &self.id
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn max_len(&self) -> usize {
        usize::MAX
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}


fn fake_embeddings_forced() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

/// Build the embedder selected by `config`.
///
/// `APP_USE_FAKE_EMBEDDINGS=1` forces [`HashEmbedder`]. A loaded model whose
/// dimension differs from `config.dimension` is rejected.
pub fn get_default_embedder(config: &EmbeddingConfig) -> Result<Box<dyn Embedder>> {
    let backend = if fake_embeddings_forced() { EmbeddingBackend::Hash } else { config.backend };
    match backend {
        EmbeddingBackend::Hash => {
            info!(dim = config.dimension, "using HashEmbedder");
            Ok(Box::new(HashEmbedder::new(config.dimension)))
        }
        EmbeddingBackend::MiniLm => {
            let dir = resolve_model_dir(config.model_dir.as_deref())?;
            let embedder = MiniLmEmbedder::load(&dir, config.max_len)?;
            if embedder.dim() != config.dimension {
                return Err(Error::invalid_config(format!(
                    "embedding.dimension is {} but {} produces {}-d vectors",
                    config.dimension,
                    MINILM_MODEL_NAME,
                    embedder.dim()
                )));
            }
            Ok(Box::new(embedder))
        }
    }
}

/// Locate the model directory: explicit config, `APP_MODEL_DIR`, `MODEL_DIR`,
/// then `models/all-MiniLM-L6-v2` relative to the working directory or its parent.
pub fn resolve_model_dir(configured: Option<&str>) -> Result<PathBuf> {
    let mut candidates: Vec<PathBuf> = Vec::new();
    if let Some(dir) = configured {
        candidates.push(expand_path(dir));
    }
    for var in ["APP_MODEL_DIR", "MODEL_DIR"] {
        if let Ok(dir) = std::env::var(var) {
            candidates.push(expand_path(dir));
        }
    }
    candidates.push(Path::new("models").join(MINILM_MODEL_NAME));
    candidates.push(Path::new("../models").join(MINILM_MODEL_NAME));

    for dir in &candidates {
        if dir.exists() {
            debug!(dir = %dir.display(), "using model dir");
            return Ok(dir.clone());
        }
    }
    Err(Error::Embedding(format!(
        "could not locate the {MINILM_MODEL_NAME} model directory (tried {})",
        candidates.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", ")
    )))
}
