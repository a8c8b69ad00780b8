//! Document handle: one native context, one opened document, one lock.

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::config::ExtractConfig;
use crate::detect::{DocumentFormat, EPUB_MIN_LEN};
use crate::error::{open_error, Error, Result};
use crate::native::{MupdfContext, NativeContext};

/// An opened PDF or EPUB document.
///
/// The native context behind a document is not reentrant, so every
/// extraction takes the document's lock for its whole duration. A `Document`
/// can be shared between threads (e.g. in an `Arc`); calls are serialized,
/// never run in parallel.
///
/// The context is released by [`Document::close`] or on drop, whichever
/// comes first.
pub struct Document {
    format: DocumentFormat,
    page_total: usize,
    object_total: usize,
    config: ExtractConfig,
    context: Mutex<Option<Box<dyn NativeContext>>>,
}

impl Document {
    /// Open the document at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_config(path, ExtractConfig::default())
    }

    /// Open the document at `path` with explicit limits
    pub fn open_with_config<P: AsRef<Path>>(path: P, config: ExtractConfig) -> Result<Self> {
        let path = absolute_path(path.as_ref())?;

        if !path.exists() {
            return Err(Error::NoSuchFile {
                path: path.display().to_string(),
            });
        }

        let format = sniff_file(&path)?;
        tracing::debug!(path = %path.display(), ?format, "opening document");

        let context = MupdfContext::open_path(&path, format).map_err(open_error)?;
        Self::from_context(Box::new(context), format, config)
    }

    /// Open a document held in memory
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::from_bytes_with_config(data, ExtractConfig::default())
    }

    /// Open a document held in memory with explicit limits.
    ///
    /// Content that is neither PDF nor EPUB is handed to the PDF parser,
    /// which repairs what it can or fails with `OpenDocumentFailed`.
    pub fn from_bytes_with_config(data: &[u8], config: ExtractConfig) -> Result<Self> {
        let format = DocumentFormat::from_magic_bytes(data).unwrap_or(DocumentFormat::Pdf);
        tracing::debug!(bytes = data.len(), ?format, "opening document from memory");

        let context = MupdfContext::open_bytes(data, format).map_err(open_error)?;
        Self::from_context(Box::new(context), format, config)
    }

    /// Drain `reader` into memory and open the result
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Self::from_reader_with_config(reader, ExtractConfig::default())
    }

    pub fn from_reader_with_config<R: Read>(mut reader: R, config: ExtractConfig) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::from_bytes_with_config(&data, config)
    }

    /// Wrap an already opened native context.
    ///
    /// Fails with `NeedsPassword` for encrypted documents; the context is
    /// dropped before the error is returned.
    pub fn from_context(
        mut context: Box<dyn NativeContext>,
        format: DocumentFormat,
        config: ExtractConfig,
    ) -> Result<Self> {
        if context.needs_password().map_err(open_error)? {
            tracing::debug!("document is encrypted");
            return Err(Error::NeedsPassword);
        }

        let page_total = context.count_pages().map_err(open_error)?;
        let object_total = context.count_objects().map_err(open_error)?;
        tracing::debug!(pages = page_total, objects = object_total, "document opened");

        Ok(Self {
            format,
            page_total,
            object_total,
            config,
            context: Mutex::new(Some(context)),
        })
    }

    /// Number of pages, fixed at open time
    pub fn page_count(&self) -> usize {
        self.page_total
    }

    /// Length of the cross-reference table, fixed at open time.
    /// Valid object numbers are `1..object_count()`.
    pub fn object_count(&self) -> usize {
        self.object_total
    }

    pub fn format(&self) -> DocumentFormat {
        self.format
    }

    pub fn config(&self) -> &ExtractConfig {
        &self.config
    }

    /// Release the native document and context.
    ///
    /// Calling it again is a no-op. Every other operation fails with
    /// [`Error::Closed`] afterwards.
    pub fn close(&self) -> Result<()> {
        if let Some(context) = self.context.lock().take() {
            drop(context);
            tracing::debug!("document closed");
        }
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.context.lock().is_none()
    }

    /// Run `f` against the native context while holding the lock
    pub(crate) fn with_context<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut dyn NativeContext) -> Result<T>,
    {
        let mut guard = self.context.lock();
        match guard.as_mut() {
            Some(context) => f(&mut **context),
            None => Err(Error::Closed),
        }
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("format", &self.format)
            .field("page_total", &self.page_total)
            .field("object_total", &self.object_total)
            .field("closed", &self.is_closed())
            .finish()
    }
}

fn absolute_path(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

/// Classify a file by its leading bytes, falling back to PDF
fn sniff_file(path: &Path) -> Result<DocumentFormat> {
    let mut head = Vec::with_capacity(EPUB_MIN_LEN);
    File::open(path)?
        .take(EPUB_MIN_LEN as u64)
        .read_to_end(&mut head)?;
    Ok(DocumentFormat::from_magic_bytes(&head).unwrap_or(DocumentFormat::Pdf))
}
