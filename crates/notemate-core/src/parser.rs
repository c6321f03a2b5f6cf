//! Document parsing collaborator.
//!
//! Turns an uploaded file into plain text for the chunker. Only plain text is
//! decoded here; PDF and DOCX extraction belongs to an external
//! [`DocumentParser`] implementation. Failures are errors and are never fed
//! to the chunker as document content.

use std::fmt;
use std::fs;
use std::path::Path;

use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Docx,
    Txt,
}

impl DocumentFormat {
    pub fn from_path(path: &Path) -> Result<Self, ParseError> {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "pdf" => Ok(Self::Pdf),
            "docx" => Ok(Self::Docx),
            "txt" | "md" | "text" => Ok(Self::Txt),
            _ => Err(ParseError::UnknownFormat(ext)),
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Txt => "txt",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unsupported document format: {0}")]
    Unsupported(DocumentFormat),
    #[error("Unknown document extension: '{0}'")]
    UnknownFormat(String),
}

pub trait DocumentParser: Send + Sync {
    fn parse(&self, path: &Path, format: DocumentFormat) -> Result<String, ParseError>;
}

/// Reads plain-text documents. Invalid UTF-8 is decoded lossily.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextParser;

impl DocumentParser for PlainTextParser {
    fn parse(&self, path: &Path, format: DocumentFormat) -> Result<String, ParseError> {
        if format != DocumentFormat::Txt {
            return Err(ParseError::Unsupported(format));
        }
        let bytes = fs::read(path)?;
        let text = match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => {
                warn!(path = %path.display(), "document is not valid UTF-8, decoding lossily");
                String::from_utf8_lossy(e.as_bytes()).into_owned()
            }
        };
        debug!(path = %path.display(), bytes = text.len(), "parsed document");
        Ok(text)
    }
}

/// Parse `path` with [`PlainTextParser`], inferring the format from its extension.
pub fn parse_document(path: &Path) -> Result<String, ParseError> {
    let format = DocumentFormat::from_path(path)?;
    PlainTextParser.parse(path, format)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_from_extension() {
        assert_eq!(
            DocumentFormat::from_path(Path::new("notes.PDF")).ok(),
            Some(DocumentFormat::Pdf)
        );
        assert_eq!(
            DocumentFormat::from_path(Path::new("a/b.docx")).ok(),
            Some(DocumentFormat::Docx)
        );
        assert_eq!(DocumentFormat::from_path(Path::new("x.txt")).ok(), Some(DocumentFormat::Txt));
        assert!(matches!(
            DocumentFormat::from_path(Path::new("archive.zip")),
            Err(ParseError::UnknownFormat(ext)) if ext == "zip"
        ));
    }

    #[test]
    fn binary_formats_are_not_decoded_here() {
        let err = PlainTextParser.parse(Path::new("slides.pdf"), DocumentFormat::Pdf);
        assert!(matches!(err, Err(ParseError::Unsupported(DocumentFormat::Pdf))));
    }
}
