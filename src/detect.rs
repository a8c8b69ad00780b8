//! Content sniffing by magic bytes.
//!
//! Classification is a pure predicate over the leading bytes of a buffer and
//! never allocates. It does not need an open [`Document`](crate::Document).

use serde::Serialize;

/// MIME type reported for PDF content
pub const PDF_MIME: &str = "application/pdf";
/// MIME type reported for EPUB content
pub const EPUB_MIME: &str = "application/epub+zip";

const PDF_MAGIC: &[u8; 4] = b"%PDF";
const ZIP_LOCAL_HEADER: &[u8; 4] = b"PK\x03\x04";
/// Name and stored content of the first ZIP entry of an EPUB container.
const EPUB_MIMETYPE_ENTRY: &[u8; 28] = b"mimetypeapplication/epub+zip";
/// Offset of the file name inside a ZIP local file header.
const ZIP_NAME_OFFSET: usize = 30;

/// Smallest input that can be recognised as EPUB (bytes 30..=57).
pub const EPUB_MIN_LEN: usize = ZIP_NAME_OFFSET + EPUB_MIMETYPE_ENTRY.len();

/// Document container formats the engine can open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Epub,
}

impl DocumentFormat {
    /// Detect format from magic bytes
    pub fn from_magic_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(PDF_MAGIC) {
            return Some(Self::Pdf);
        }

        if bytes.len() >= EPUB_MIN_LEN
            && bytes.starts_with(ZIP_LOCAL_HEADER)
            && &bytes[ZIP_NAME_OFFSET..EPUB_MIN_LEN] == EPUB_MIMETYPE_ENTRY
        {
            return Some(Self::Epub);
        }

        None
    }

    /// MIME type of the format
    pub fn mime_type(self) -> &'static str {
        match self {
            DocumentFormat::Pdf => PDF_MIME,
            DocumentFormat::Epub => EPUB_MIME,
        }
    }
}

/// Return the MIME type of `bytes`, or `""` when neither PDF nor EPUB matches.
pub fn detect_format(bytes: &[u8]) -> &'static str {
    DocumentFormat::from_magic_bytes(bytes).map_or("", DocumentFormat::mime_type)
}
