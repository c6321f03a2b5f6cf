//! notemate: turn notes into a searchable collection.
//!
//! ```bash
//! notemate chunk notes.txt --size 200 --overlap 20
//! notemate ingest "Lecture 3.txt"            # collection Lecture_3_txt
//! notemate query Lecture_3_txt "what is osmosis?" -k 5 --distances
//! notemate collections
//! ```
//!
//! Settings come from `config.toml` and `APP_*` variables; set
//! `APP_USE_FAKE_EMBEDDINGS=1` to run without the MiniLM model files.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use notemate_core::chunker::Chunker;
use notemate_core::config::Config;
use notemate_core::parser::parse_document;
use notemate_engine::RetrievalEngine;
use notemate_vector::{collection_name_for, CollectionStore};

#[derive(Parser)]
#[command(name = "notemate")]
#[command(about = "Chunk, embed and search study notes")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chunk a document and print the windows
    Chunk {
        file: PathBuf,

        /// Window size in words (defaults to chunking.size)
        #[arg(long)]
        size: Option<usize>,

        /// Words shared by consecutive windows (defaults to chunking.overlap)
        #[arg(long)]
        overlap: Option<usize>,
    },

    /// Parse, chunk, embed and store a document as a new collection
    Ingest {
        file: PathBuf,

        /// Collection name (derived from the file name by default)
        #[arg(long)]
        name: Option<String>,
    },

    /// Retrieve the chunks nearest to a question
    Query {
        name: String,

        text: String,

        /// Number of chunks (defaults to query.top_k)
        #[arg(short)]
        k: Option<usize>,

        /// Print squared L2 distances
        #[arg(long)]
        distances: bool,
    },

    /// List stored collections
    Collections,
}

fn spinner(msg: String) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::with_template("{spinner:.cyan} {msg}")?);
    pb.set_message(msg);
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load().context("loading configuration")?.retrieval()?;

    match cli.command {
        Commands::Chunk { file, size, overlap } => {
            let chunker = Chunker::new(
                size.unwrap_or(config.chunking.size),
                overlap.unwrap_or(config.chunking.overlap),
            )?;
            let text =
                parse_document(&file).with_context(|| format!("parsing {}", file.display()))?;
            let chunks = chunker.chunk(&text);
            println!(
                "{} -> {} chunks (size {}, overlap {})\n",
                file.display(),
                chunks.len(),
                chunker.size(),
                chunker.overlap()
            );
            for (i, chunk) in chunks.iter().enumerate() {
                let preview: String = chunk.chars().take(200).collect();
                let more = if chunk.chars().count() > 200 { "..." } else { "" };
                println!(
                    "--- chunk {} ({} words) ---\n{preview}{more}\n",
                    i + 1,
                    chunk.split_whitespace().count()
                );
            }
        }

        Commands::Ingest { file, name } => {
            let name = match name {
                Some(name) => name,
                None => {
                    let file_name = file
                        .file_name()
                        .map(|f| f.to_string_lossy().into_owned())
                        .with_context(|| format!("{} has no file name", file.display()))?;
                    collection_name_for(&file_name)
                }
            };
            let text =
                parse_document(&file).with_context(|| format!("parsing {}", file.display()))?;
            let chunker = Chunker::from_config(&config.chunking)?;

            let engine = RetrievalEngine::from_config(&config)?;
            let pb = spinner(format!("Embedding {} into '{name}'", file.display()))?;
            let result = engine.ingest_text(&name, &text, &chunker);
            pb.finish_and_clear();
            let count = result?;

            println!(
                "✅ Stored {count} chunks in collection '{name}' ({})",
                engine.store().root().display()
            );
        }

        Commands::Query { name, text, k, distances } => {
            let k = k.unwrap_or(config.query.top_k);
            let engine = RetrievalEngine::from_config(&config)?;
            engine.open_collection(&name)?;

            let hits = engine.search(&name, &text, k)?;
            if hits.is_empty() {
                println!("No results.");
            }
            for (rank, hit) in hits.iter().enumerate() {
                if distances {
                    println!(
                        "[{}] #{} d={:.4}\n{}\n",
                        rank + 1,
                        hit.position,
                        hit.distance,
                        hit.text
                    );
                } else {
                    println!("[{}] {}\n", rank + 1, hit.text);
                }
            }
        }

        Commands::Collections => {
            let store = CollectionStore::new(config.storage.db_path())?;
            let names = store.list()?;
            if names.is_empty() {
                println!("No collections in {}", store.root().display());
            }
            for name in names {
                match store.load(&name) {
                    Ok(c) => println!("{name}\t{} chunks\tdim {}", c.len(), c.dimension()),
                    Err(e) => println!("{name}\t⚠️  {e}"),
                }
            }
        }
    }
    Ok(())
}
