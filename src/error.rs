//! Error types for docfitz

use thiserror::Error;

use crate::native::NativeError;

/// Result type alias for docfitz
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for document extraction
#[derive(Error, Debug)]
pub enum Error {
    /// Path does not exist
    #[error("no such file: {path}")]
    NoSuchFile { path: String },

    /// Native parsing context could not be allocated
    #[error("cannot create context")]
    CreateContextFailed,

    /// Malformed or unsupported document
    #[error("cannot open document: {reason}")]
    OpenDocumentFailed { reason: String },

    /// In-memory stream could not be created
    #[error("cannot open memory: {reason}")]
    OpenMemoryFailed { reason: String },

    /// Document is encrypted and the empty password was rejected
    #[error("document needs password")]
    NeedsPassword,

    /// Page index outside `[0, total)`
    #[error("page {page} missing (total: {total})")]
    PageMissing { page: usize, total: usize },

    /// Object number outside `[1, total)`
    #[error("object {object} missing (total: {total})")]
    ObjectMissing { object: u32, total: usize },

    /// Object exists but is not an image; skip it when scanning
    #[error("object {object} is not an image")]
    NotImage { object: u32 },

    /// Document has no outline structure
    #[error("cannot load outline")]
    LoadOutlineFailed,

    /// Operation on a handle that was already closed
    #[error("document is closed")]
    Closed,

    /// Image samples could not be turned into a pixel buffer
    #[error("cannot decode image object {object}: {reason}")]
    DecodeImageFailed { object: u32, reason: String },

    /// Image dimension exceeded
    #[error("Image dimension exceeded: {detail}")]
    ImageDimensionExceeded { detail: String },

    /// PNG encode/decode error
    #[error("image codec error: {0}")]
    EncodeImage(#[from] image::ImageError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Unexpected failure inside the native library. The library's own
    /// message is kept in `reason` and logged, never displayed.
    #[error("native library failure")]
    Native { reason: String },
}

impl From<NativeError> for Error {
    fn from(err: NativeError) -> Self {
        match err {
            NativeError::CreateContext => Error::CreateContextFailed,
            other => {
                let reason = other.to_string();
                tracing::debug!(reason = %reason, "native library failure");
                Error::Native { reason }
            }
        }
    }
}

/// Classify a failure raised while a document is being opened
pub(crate) fn open_error(err: NativeError) -> Error {
    match err {
        NativeError::CreateContext => Error::CreateContextFailed,
        NativeError::OpenMemory(reason) => Error::OpenMemoryFailed { reason },
        NativeError::Open(reason) | NativeError::Failed(reason) => {
            Error::OpenDocumentFailed { reason }
        }
    }
}

impl Error {
    /// True for the expected, skippable outcome of asking for a non-image object.
    pub fn is_not_image(&self) -> bool {
        matches!(self, Error::NotImage { .. })
    }

    /// Return a sanitized error message safe to show to end users.
    /// Internal details (paths, library messages) are omitted.
    /// Full details should be logged via tracing before calling this.
    pub fn client_message(&self) -> String {
        match self {
            Error::NoSuchFile { .. } => "No such file".to_string(),
            Error::CreateContextFailed => "Cannot create context".to_string(),
            Error::OpenDocumentFailed { .. } => "Cannot open document".to_string(),
            Error::OpenMemoryFailed { .. } => "Cannot open memory".to_string(),
            Error::NeedsPassword => "Document needs password".to_string(),
            Error::PageMissing { page, total } => {
                format!("Page {} missing (total: {})", page, total)
            }
            Error::ObjectMissing { object, total } => {
                format!("Object {} missing (total: {})", object, total)
            }
            Error::NotImage { object } => format!("Object {} is not an image", object),
            Error::LoadOutlineFailed => "Cannot load outline".to_string(),
            Error::Closed => "Document is closed".to_string(),
            Error::DecodeImageFailed { object, .. } => {
                format!("Cannot decode image object {}", object)
            }
            Error::ImageDimensionExceeded { detail } => {
                format!("Image dimension exceeded: {}", detail)
            }
            Error::EncodeImage(_) => "Image codec error".to_string(),
            Error::Io(_) => "I/O error".to_string(),
            Error::Native { .. } => "Document processing error".to_string(),
        }
    }
}
