use std::fs;

use notemate_core::error::Error;
use notemate_vector::{Collection, CollectionStore, FlatIndex};

fn chunks(texts: &[&str]) -> Vec<String> {
    texts.iter().map(ToString::to_string).collect()
}

fn sample_collection(name: &str) -> anyhow::Result<Collection> {
    let mut c = Collection::new(name, 3)?;
    c.append(
        chunks(&["photosynthesis", "cell division", "osmosis"]),
        &[vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0], vec![0.0, 0.0, 1.0]],
    )?;
    Ok(c)
}

#[test]
fn save_then_load_reproduces_collection() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let store = CollectionStore::new(tmp.path())?;
    let original = sample_collection("bio")?;
    store.save_collection(&original)?;

    assert!(tmp.path().join("bio_index.bin").is_file());
    assert!(tmp.path().join("bio_docs.json").is_file());

    let loaded = store.load("bio")?;
    assert_eq!(loaded, original);

    let query = [0.1, 0.9, 0.0];
    assert_eq!(loaded.search(&query, 2)?, original.search(&query, 2)?);
    Ok(())
}

#[test]
fn docs_file_is_plain_json() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let store = CollectionStore::new(tmp.path())?;
    store.save_collection(&sample_collection("bio")?)?;

    let bytes = fs::read(tmp.path().join("bio_docs.json"))?;
    let value: serde_json::Value = serde_json::from_slice(&bytes)?;
    assert_eq!(value["chunks"][1], "cell division");
    Ok(())
}

#[test]
fn empty_collection_round_trips() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let store = CollectionStore::new(tmp.path())?;
    store.save("empty", &[], &FlatIndex::new(4)?)?;
    let loaded = store.load("empty")?;
    assert!(loaded.is_empty());
    assert_eq!(loaded.dimension(), 4);
    Ok(())
}

#[test]
fn missing_artifacts_are_not_found() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let store = CollectionStore::new(tmp.path())?;
    assert!(matches!(store.load("nope"), Err(Error::CollectionNotFound(n)) if n == "nope"));

    store.save_collection(&sample_collection("bio")?)?;
    fs::remove_file(store.index_path("bio"))?;
    assert!(matches!(store.load("bio"), Err(Error::CollectionNotFound(_))));
    Ok(())
}

#[test]
fn garbage_index_is_corrupt() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let store = CollectionStore::new(tmp.path())?;
    store.save_collection(&sample_collection("bio")?)?;
    fs::write(store.index_path("bio"), b"not an index")?;
    assert!(matches!(store.load("bio"), Err(Error::CorruptCollection { .. })));

    fs::write(store.docs_path("bio"), b"{ broken")?;
    assert!(matches!(store.load("bio"), Err(Error::CorruptCollection { .. })));
    Ok(())
}

fn three_vectors() -> anyhow::Result<FlatIndex> {
    let mut index = FlatIndex::new(3)?;
    index.add(&[vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0], vec![0.0, 0.0, 1.0]])?;
    Ok(index)
}

#[test]
fn save_interrupted_between_renames_keeps_previous_collection() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let store = CollectionStore::new(tmp.path())?;
    let old = sample_collection("bio")?;
    store.save_collection(&old)?;
    let old_index = fs::read(store.index_path("bio"))?;

    // same count, different text: only the digest tells the pairs apart
    store.save("bio", &chunks(&["mitosis", "meiosis", "diffusion"]), &three_vectors()?)?;
    // state after a crash between the docs rename and the index rename
    fs::write(store.index_path("bio"), &old_index)?;

    let loaded = store.load("bio")?;
    assert_eq!(loaded, old);
    assert_eq!(store.list()?, vec!["bio".to_string()]);
    Ok(())
}

#[test]
fn completed_save_wins_over_previous_chunks() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let store = CollectionStore::new(tmp.path())?;
    store.save_collection(&sample_collection("bio")?)?;
    let newer = chunks(&["mitosis", "meiosis", "diffusion"]);
    store.save("bio", &newer, &three_vectors()?)?;

    assert!(store.prev_docs_path("bio").is_file());
    assert_eq!(store.load("bio")?.chunks(), newer.as_slice());
    Ok(())
}

#[test]
fn unmatched_pair_is_corrupt() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let store = CollectionStore::new(tmp.path())?;
    store.save_collection(&sample_collection("bio")?)?;
    let first_index = fs::read(store.index_path("bio"))?;
    store.save("bio", &chunks(&["mitosis", "meiosis", "diffusion"]), &three_vectors()?)?;
    store.save("bio", &chunks(&["atoms", "ions", "bonds"]), &three_vectors()?)?;
    // neither the docs nor the kept previous docs belong to this index
    fs::write(store.index_path("bio"), &first_index)?;

    match store.load("bio") {
        Err(Error::CorruptCollection { name, .. }) => assert_eq!(name, "bio"),
        other => panic!("expected corrupt collection, got {other:?}"),
    }
    Ok(())
}

#[test]
fn count_mismatch_on_disk_is_corrupt() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let store = CollectionStore::new(tmp.path())?;
    store.save_collection(&sample_collection("bio")?)?;
    fs::write(store.docs_path("bio"), br#"{"chunks": ["only one"]}"#)?;
    assert!(matches!(store.load("bio"), Err(Error::CorruptCollection { .. })));
    Ok(())
}

#[test]
fn save_rejects_desynced_pair() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let store = CollectionStore::new(tmp.path())?;
    let index = FlatIndex::new(2)?;
    let err = store.save("bad", &chunks(&["orphan"]), &index).unwrap_err();
    assert!(matches!(err, Error::IndexDesync { chunks: 1, vectors: 0 }));
    assert!(!store.exists("bad"));
    Ok(())
}

#[test]
fn resave_replaces_previous_pair() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let store = CollectionStore::new(tmp.path())?;
    let mut c = sample_collection("bio")?;
    store.save_collection(&c)?;
    c.append(chunks(&["enzymes"]), &[vec![0.5, 0.5, 0.0]])?;
    store.save_collection(&c)?;

    assert_eq!(store.load("bio")?.len(), 4);
    // docs, index and the previous docs; no temp files left behind
    let entries = fs::read_dir(tmp.path())?.count();
    assert_eq!(entries, 3);
    Ok(())
}

#[test]
fn list_exists_and_delete() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let store = CollectionStore::new(tmp.path().join("nested/db"))?;
    assert!(store.list()?.is_empty());

    store.save_collection(&sample_collection("zoology")?)?;
    store.save_collection(&sample_collection("algebra")?)?;
    fs::write(store.root().join("stray_docs.json"), b"{}")?;

    assert_eq!(store.list()?, vec!["algebra".to_string(), "zoology".to_string()]);
    assert!(store.exists("algebra"));
    assert!(!store.exists("stray"));

    store.save_collection(&sample_collection("algebra")?)?;
    assert!(store.prev_docs_path("algebra").is_file());
    assert!(store.delete("algebra")?);
    assert!(!store.prev_docs_path("algebra").exists());
    assert!(!store.delete("algebra")?);
    assert_eq!(store.list()?, vec!["zoology".to_string()]);
    Ok(())
}

#[test]
fn path_like_names_are_rejected() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let store = CollectionStore::new(tmp.path())?;
    assert!(matches!(store.load("../secret"), Err(Error::InvalidConfiguration(_))));
    assert!(store.delete("a/b").is_err());
    Ok(())
}
