use std::path::PathBuf;

use notemate_vector::CollectionStore;

fn main() -> anyhow::Result<()> {
    let root = std::env::args().nth(1).map_or_else(|| PathBuf::from("./vector_db"), PathBuf::from);
    let store = CollectionStore::new(&root)?;
    let names = store.list()?;
    if names.is_empty() {
        println!("no collections under {}", root.display());
    }
    for name in names {
        match store.load(&name) {
            Ok(c) => println!("{name}: chunks={} dim={}", c.len(), c.dimension()),
            Err(e) => println!("{name}: {e}"),
        }
    }
    Ok(())
}
