use notemate_core::config::{EmbeddingBackend, EmbeddingConfig};
use notemate_core::traits::Embedder;
use notemate_embed::get_default_embedder;

fn main() -> anyhow::Result<()> {
    let backend = if std::env::args().any(|a| a == "--hash") {
        EmbeddingBackend::Hash
    } else {
        EmbeddingBackend::MiniLm
    };
    let embedder = get_default_embedder(&EmbeddingConfig {
        backend,
        ..EmbeddingConfig::default()
    })?;
    let texts = vec!["hello world".to_string(), "rust embeddings".to_string()];
    let embs = embedder.embed_batch(&texts)?;
    println!("{}: B={} dim={}", embedder.id(), embs.len(), embedder.dim());
    Ok(())
}
