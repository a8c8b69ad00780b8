//! Document information lookup

use std::collections::BTreeMap;

use crate::document::Document;
use crate::error::Result;

/// Output key and native lookup key of every metadata field, in output order
pub const METADATA_FIELDS: [(&str, &str); 10] = [
    ("format", "format"),
    ("encryption", "encryption"),
    ("title", "info:Title"),
    ("author", "info:Author"),
    ("subject", "info:Subject"),
    ("keywords", "info:Keywords"),
    ("creator", "info:Creator"),
    ("producer", "info:Producer"),
    ("creationDate", "info:CreationDate"),
    ("modDate", "info:ModDate"),
];

impl Document {
    /// Read the fixed set of metadata fields.
    ///
    /// The map always holds all ten keys of [`METADATA_FIELDS`]; fields the
    /// document lacks, or whose lookup fails, are empty strings. Values are
    /// cut to fit `metadata_buffer_len` bytes including a terminating NUL.
    pub fn read_metadata(&self) -> Result<BTreeMap<String, String>> {
        let buffer_len = self.config().metadata_buffer_len;

        self.with_context(|context| {
            let mut record = BTreeMap::new();
            for (name, key) in METADATA_FIELDS {
                let value = match context.lookup_metadata(key) {
                    Ok(Some(value)) => bounded_copy(&value, buffer_len),
                    Ok(None) => String::new(),
                    Err(err) => {
                        tracing::warn!(key, error = %err, "metadata lookup failed");
                        String::new()
                    }
                };
                record.insert(name.to_string(), value);
            }
            Ok(record)
        })
    }
}

/// Copy `value` into a NUL-terminated buffer of `buffer_len` bytes and read
/// it back, dropping NUL padding and any character cut by the limit
fn bounded_copy(value: &str, buffer_len: usize) -> String {
    let mut buffer = vec![0u8; buffer_len];
    let mut len = value.len().min(buffer_len.saturating_sub(1));
    while !value.is_char_boundary(len) {
        len -= 1;
    }
    buffer[..len].copy_from_slice(&value.as_bytes()[..len]);

    let end = buffer.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    String::from_utf8_lossy(&buffer[..end]).into_owned()
}
