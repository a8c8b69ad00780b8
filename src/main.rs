//! docfitz-inspect - print a JSON summary of a PDF or EPUB
//!
//! Usage: `docfitz-inspect <file> [--text]`

use std::collections::BTreeMap;

use anyhow::{bail, Context};
use docfitz::{Document, OutlineEntry};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Serialize)]
struct Summary {
    format: docfitz::DocumentFormat,
    pages: usize,
    objects: usize,
    metadata: BTreeMap<String, String>,
    outline: Vec<OutlineEntry>,
    images: Vec<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<Vec<String>>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docfitz=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut path = None;
    let mut with_text = false;
    for arg in std::env::args().skip(1) {
        if arg == "--text" {
            with_text = true;
        } else if path.is_none() {
            path = Some(arg);
        } else {
            bail!("unexpected argument: {}", arg);
        }
    }
    let Some(path) = path else {
        bail!("usage: docfitz-inspect <file> [--text]");
    };

    let document = Document::open(&path).with_context(|| format!("cannot open {}", path))?;
    tracing::info!(path = %path, pages = document.page_count(), "inspecting document");

    let outline = match document.load_outline() {
        Ok(outline) => outline,
        Err(docfitz::Error::LoadOutlineFailed) => Vec::new(),
        Err(err) => return Err(err).context("cannot load outline"),
    };

    let images = document
        .scan_images()
        .context("cannot scan images")?
        .into_iter()
        .map(|(object, _)| object)
        .collect();

    let text = if with_text {
        Some(document.extract_all_text().context("cannot extract text")?)
    } else {
        None
    };

    let summary = Summary {
        format: document.format(),
        pages: document.page_count(),
        objects: document.object_count(),
        metadata: document.read_metadata()?,
        outline,
        images,
        text,
    };
    document.close()?;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
