//! Extraction limits and buffer sizes

/// Resource configuration for a [`Document`](crate::Document)
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    /// Size of the buffer used for each metadata lookup, including the
    /// terminating NUL (default: 256)
    pub metadata_buffer_len: usize,
    /// Deepest outline level that is flattened; deeper subtrees are skipped (default: 256)
    pub max_outline_depth: usize,
    /// Maximum total pixel area of a decoded image (default: 100_000_000)
    pub max_image_pixels: u64,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            metadata_buffer_len: 256,
            max_outline_depth: 256,
            max_image_pixels: 100_000_000,
        }
    }
}
