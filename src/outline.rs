//! Table of contents flattening

use serde::Serialize;

use crate::document::Document;
use crate::error::{Error, Result};
use crate::native::OutlineNode;

/// One table-of-contents entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutlineEntry {
    /// Depth in the outline tree; top-level entries are level 1
    pub level: usize,
    pub title: String,
    /// Link target for external entries, empty otherwise
    pub uri: String,
    /// 0-based target page, absent for external links
    pub page: Option<usize>,
    /// Vertical position on the target page
    pub top: f64,
}

impl Document {
    /// Flatten the outline into depth-first pre-order.
    ///
    /// Fails with [`Error::LoadOutlineFailed`] when the document has no
    /// outline; an outline without entries gives an empty list.
    pub fn load_outline(&self) -> Result<Vec<OutlineEntry>> {
        let max_depth = self.config().max_outline_depth;
        let roots = self
            .with_context(|context| context.load_outline().map_err(Error::from))?
            .ok_or(Error::LoadOutlineFailed)?;

        let entries = flatten(&roots, max_depth);
        tracing::debug!(entries = entries.len(), "outline loaded");
        Ok(entries)
    }
}

fn flatten(roots: &[OutlineNode], max_depth: usize) -> Vec<OutlineEntry> {
    let mut entries = Vec::new();
    // Each frame is a level and the siblings still to visit at that level
    let mut stack: Vec<(usize, std::slice::Iter<'_, OutlineNode>)> = vec![(1, roots.iter())];

    while let Some((level, siblings)) = stack.last_mut() {
        let level = *level;
        let Some(node) = siblings.next() else {
            stack.pop();
            continue;
        };

        entries.push(OutlineEntry {
            level,
            title: node.title.clone(),
            uri: node.uri.clone().unwrap_or_default(),
            page: node.page.map(|page| page as usize),
            top: f64::from(node.y),
        });

        if node.children.is_empty() {
            continue;
        }
        if level >= max_depth {
            tracing::warn!(level, title = %node.title, "outline too deep, skipping children");
            continue;
        }
        stack.push((level + 1, node.children.iter()));
    }

    entries
}
