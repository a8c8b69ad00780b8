//! docfitz: PDF and EPUB content extraction on top of MuPDF
//!
//! A [`Document`] wraps one native parsing context and exposes:
//! - `extract_text`: plain text of a page
//! - `extract_image_bytes` / `extract_image`: image objects as PNG or pixels
//! - `load_outline`: the table of contents, flattened with levels
//! - `read_metadata`: ten fixed document information fields
//!
//! [`detect_format`] sniffs PDF or EPUB content without opening it.

pub mod config;
pub mod detect;
pub mod document;
pub mod error;
mod images;
pub mod metadata;
pub mod native;
pub mod outline;
mod text;

pub use config::ExtractConfig;
pub use detect::{detect_format, DocumentFormat, EPUB_MIME, PDF_MIME};
pub use document::Document;
pub use error::{Error, Result};
pub use metadata::METADATA_FIELDS;
pub use outline::OutlineEntry;
