//! Generated test documents.
//!
//! Documents are built with `lopdf` and `zip` so the tests need no binary fixtures.

#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::path::PathBuf;

use lopdf::{dictionary, Dictionary, Object, ObjectId, Stream, StringFormat};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const TITLE: &str = "Annual Report";
pub const AUTHOR: &str = "Ada Lovelace";
pub const CREATION_DATE: &str = "D:20240102030405Z";
pub const MOD_DATE: &str = "D:20240203040506Z";

/// Pixels of every generated image: 2x2 DeviceRGB, 8 bits per component
pub const IMAGE_PIXELS: [[u8; 3]; 4] = [[255, 0, 0], [0, 255, 0], [0, 0, 255], [255, 255, 255]];

/// Builder for small PDF files
#[derive(Debug, Clone)]
pub struct PdfBuilder {
    pages: usize,
    images: usize,
    device_n_images: usize,
    outline: bool,
    info: bool,
    encrypted: bool,
}

impl PdfBuilder {
    /// A document with `pages` pages reading "Hello page N"
    pub fn new(pages: usize) -> Self {
        Self {
            pages,
            images: 0,
            device_n_images: 0,
            outline: false,
            info: false,
            encrypted: false,
        }
    }

    /// Embed `count` RGB images, spread over the pages round-robin
    pub fn with_images(mut self, count: usize) -> Self {
        self.images = count;
        self
    }

    /// Embed `count` two-colorant DeviceN images after the RGB ones
    pub fn with_device_n_images(mut self, count: usize) -> Self {
        self.device_n_images = count;
        self
    }

    /// Add "Chapter N" per page, with a "Section 1.1" child under the first
    pub fn with_outline(mut self) -> Self {
        self.outline = true;
        self
    }

    pub fn with_info(mut self) -> Self {
        self.info = true;
        self
    }

    /// Protect with the standard security handler and an unknown user password
    pub fn encrypted(mut self) -> Self {
        self.encrypted = true;
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut doc = lopdf::Document::with_version("1.7");
        let pages_id = doc.new_object_id();

        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });

        let rgb: Vec<u8> = IMAGE_PIXELS.iter().flatten().copied().collect();
        let mut images: Vec<ObjectId> = (0..self.images)
            .map(|_| {
                doc.add_object(Stream::new(
                    image_dict(Object::Name(b"DeviceRGB".to_vec())),
                    rgb.clone(),
                ))
            })
            .collect();

        if self.device_n_images > 0 {
            // Cyan passes through, the spot colorant is dropped
            let tint = doc.add_object(Stream::new(
                dictionary! {
                    "FunctionType" => 4,
                    "Domain" => vec![0.into(), 1.into(), 0.into(), 1.into()],
                    "Range" => (0..8).map(|i: i64| Object::Integer(i % 2)).collect::<Vec<_>>(),
                },
                b"{ pop 0 0 0 }".to_vec(),
            ));
            let space = Object::Array(vec![
                "DeviceN".into(),
                Object::Array(vec!["Cyan".into(), "Spot".into()]),
                "DeviceCMYK".into(),
                Object::Reference(tint),
            ]);
            for _ in 0..self.device_n_images {
                let samples = vec![0x80; 2 * 2 * 2];
                images.push(doc.add_object(Stream::new(image_dict(space.clone()), samples)));
            }
        }

        let mut page_ids = Vec::with_capacity(self.pages);
        for index in 0..self.pages {
            let mut content = format!("BT /F1 24 Tf 72 720 Td (Hello page {}) Tj ET\n", index + 1);
            let mut xobjects = Dictionary::new();
            for (i, &image) in images.iter().enumerate() {
                if i % self.pages == index {
                    let name = format!("Im{}", i);
                    content.push_str(&format!(
                        "q 100 0 0 100 {} 500 cm /{} Do Q\n",
                        72 + 110 * (i / self.pages),
                        name
                    ));
                    xobjects.set(name, Object::Reference(image));
                }
            }

            let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
            let mut resources = dictionary! {
                "Font" => dictionary! { "F1" => Object::Reference(font_id) },
            };
            if !xobjects.is_empty() {
                resources.set("XObject", xobjects);
            }

            page_ids.push(doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                "Resources" => resources,
                "Contents" => Object::Reference(content_id),
            }));
        }

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => page_ids.iter().map(|&id| Object::Reference(id)).collect::<Vec<_>>(),
                "Count" => page_ids.len() as i64,
            }),
        );

        let mut catalog = dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        };
        if self.outline && !page_ids.is_empty() {
            catalog.set("Outlines", add_outline(&mut doc, &page_ids));
        }
        let catalog_id = doc.add_object(catalog);
        doc.trailer.set("Root", catalog_id);

        if self.info {
            let info_id = doc.add_object(dictionary! {
                "Title" => Object::string_literal(TITLE),
                "Author" => Object::string_literal(AUTHOR),
                "Subject" => Object::string_literal("Quarterly figures"),
                "Keywords" => Object::string_literal("finance, report"),
                "Creator" => Object::string_literal("docfitz tests"),
                "Producer" => Object::string_literal("docfitz"),
                "CreationDate" => Object::string_literal(CREATION_DATE),
                "ModDate" => Object::string_literal(MOD_DATE),
            });
            doc.trailer.set("Info", info_id);
        }

        if self.encrypted {
            let hash = || Object::String(vec![0; 32], StringFormat::Hexadecimal);
            let encrypt_id = doc.add_object(dictionary! {
                "Filter" => "Standard",
                "V" => 1,
                "R" => 2,
                "Length" => 40,
                "O" => hash(),
                "U" => hash(),
                "P" => -4,
            });
            let file_id = || Object::String(b"docfitz-test-id!".to_vec(), StringFormat::Literal);
            doc.trailer.set("Encrypt", Object::Reference(encrypt_id));
            doc.trailer.set("ID", Object::Array(vec![file_id(), file_id()]));
        }

        let mut buf = Vec::new();
        doc.save_to(&mut buf).expect("save generated PDF");
        buf
    }
}

fn image_dict(color_space: Object) -> Dictionary {
    dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => 2,
        "Height" => 2,
        "ColorSpace" => color_space,
        "BitsPerComponent" => 8,
    }
}

fn destination(page: ObjectId, top: i64) -> Object {
    Object::Array(vec![
        Object::Reference(page),
        "XYZ".into(),
        0.into(),
        top.into(),
        0.into(),
    ])
}

/// One chapter per page plus a section under the first chapter
fn add_outline(doc: &mut lopdf::Document, page_ids: &[ObjectId]) -> ObjectId {
    let root = doc.new_object_id();
    let chapters: Vec<ObjectId> = page_ids.iter().map(|_| doc.new_object_id()).collect();
    let section = doc.new_object_id();

    for (i, (&chapter, &page)) in chapters.iter().zip(page_ids).enumerate() {
        let mut item = dictionary! {
            "Title" => Object::string_literal(format!("Chapter {}", i + 1)),
            "Parent" => root,
            "Dest" => destination(page, 700),
        };
        if i > 0 {
            item.set("Prev", chapters[i - 1]);
        }
        if let Some(&next) = chapters.get(i + 1) {
            item.set("Next", next);
        }
        if i == 0 {
            item.set("First", section);
            item.set("Last", section);
            item.set("Count", 1);
        }
        doc.objects.insert(chapter, Object::Dictionary(item));
    }

    doc.objects.insert(
        section,
        Object::Dictionary(dictionary! {
            "Title" => Object::string_literal("Section 1.1"),
            "Parent" => chapters[0],
            "Dest" => destination(page_ids[0], 650),
        }),
    );
    doc.objects.insert(
        root,
        Object::Dictionary(dictionary! {
            "Type" => "Outlines",
            "First" => chapters[0],
            "Last" => chapters[chapters.len() - 1],
            "Count" => chapters.len() as i64,
        }),
    );
    root
}

/// Rewrite the trailer's `/Size` so it declares fewer objects than the xref holds
pub fn under_declare_size(pdf: &mut Vec<u8>, size: usize) {
    let trailer = find_last(pdf, b"trailer").expect("classic trailer");
    let key = trailer + find_last(&pdf[trailer..], b"/Size").expect("trailer /Size") + 5;

    let start = key + pdf[key..].iter().take_while(|b| b.is_ascii_whitespace()).count();
    let end = start + pdf[start..].iter().take_while(|b| b.is_ascii_digit()).count();
    pdf.splice(start..end, size.to_string().into_bytes());
}

fn find_last(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).rposition(|w| w == needle)
}

/// A minimal EPUB with one chapter containing `text`
pub fn build_epub(text: &str) -> Vec<u8> {
    let container = r#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;
    let opf = r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="id">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:identifier id="id">docfitz-test</dc:identifier>
    <dc:title>Test Book</dc:title>
    <dc:language>en</dc:language>
  </metadata>
  <manifest>
    <item id="ch1" href="chapter1.xhtml" media-type="application/xhtml+xml"/>
  </manifest>
  <spine>
    <itemref idref="ch1"/>
  </spine>
</package>"#;
    let chapter = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<html xmlns="http://www.w3.org/1999/xhtml"><head><title>One</title></head>
<body><p>{}</p></body></html>"#,
        text
    );

    let mut buffer = Vec::new();
    {
        let mut zip = ZipWriter::new(Cursor::new(&mut buffer));
        let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        // mimetype must come first and uncompressed
        zip.start_file("mimetype", stored).expect("start mimetype");
        zip.write_all(b"application/epub+zip").expect("write mimetype");

        for (name, data) in [
            ("META-INF/container.xml", container),
            ("OEBPS/content.opf", opf),
            ("OEBPS/chapter1.xhtml", chapter.as_str()),
        ] {
            zip.start_file(name, deflated).expect("start entry");
            zip.write_all(data.as_bytes()).expect("write entry");
        }
        zip.finish().expect("finish EPUB");
    }
    buffer
}

/// Write `bytes` to `name` inside a fresh temporary directory
pub fn write_temp(name: &str, bytes: &[u8]) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join(name);
    std::fs::write(&path, bytes).expect("write temp file");
    (dir, path)
}
