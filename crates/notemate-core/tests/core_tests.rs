use std::fs;
use std::io::Write;
use tempfile::TempDir;

use notemate_core::chunker::{Chunker, NO_CONTENT_PLACEHOLDER};
use notemate_core::parser::{parse_document, ParseError};

#[test]
fn parse_and_chunk_small_text_file() {
    let tmp = TempDir::new().unwrap();
    let file_path = tmp.path().join("notes.txt");
    let mut f = fs::File::create(&file_path).unwrap();
    writeln!(f, "Photosynthesis converts light\ninto chemical energy.").unwrap();

    let text = parse_document(&file_path).expect("parse");
    let chunks = Chunker::default().chunk(&text);

    assert_eq!(chunks.len(), 1, "a short document becomes one chunk");
    assert_eq!(chunks[0], "Photosynthesis converts light into chemical energy.");
}

#[test]
fn empty_file_chunks_to_placeholder() {
    let tmp = TempDir::new().unwrap();
    let file_path = tmp.path().join("empty.txt");
    fs::write(&file_path, "").unwrap();

    let text = parse_document(&file_path).expect("parse");
    assert_eq!(Chunker::default().chunk(&text), vec![NO_CONTENT_PLACEHOLDER.to_string()]);
}

#[test]
fn invalid_utf8_is_decoded_lossily() {
    let tmp = TempDir::new().unwrap();
    let file_path = tmp.path().join("latin1.txt");
    fs::write(&file_path, b"caf\xe9 au lait").unwrap();

    let text = parse_document(&file_path).expect("parse");
    assert!(text.starts_with("caf"));
    assert!(text.ends_with("au lait"));
}

#[test]
fn missing_file_is_an_error_not_text() {
    let tmp = TempDir::new().unwrap();
    let err = parse_document(&tmp.path().join("missing.txt")).unwrap_err();
    assert!(matches!(err, ParseError::Io(_)));
}
