//! Plain-text extraction

use crate::document::Document;
use crate::error::{Error, Result};
use crate::native::TextPage;

impl Document {
    /// Extract the text of page `page` (0-based) in the library's reading
    /// order. Each line ends with `\n` and each block is followed by a blank
    /// line. A page without text yields an empty string.
    pub fn extract_text(&self, page: usize) -> Result<String> {
        let total = self.page_count();
        self.with_context(|context| {
            if page >= total {
                return Err(Error::PageMissing { page, total });
            }
            tracing::debug!(page, "extracting text");
            let text_page = context.load_text_page(page)?;
            Ok(flatten(&text_page))
        })
    }

    /// Extract the text of every page, in page order
    pub fn extract_all_text(&self) -> Result<Vec<String>> {
        (0..self.page_count())
            .map(|page| self.extract_text(page))
            .collect()
    }
}

fn flatten(page: &TextPage) -> String {
    let mut text = String::new();
    for block in &page.blocks {
        for line in &block.lines {
            text.push_str(line);
            text.push('\n');
        }
        text.push('\n');
    }
    text
}
