//! MuPDF implementation of [`NativeContext`]

use std::path::Path;

use mupdf::pdf::{PdfDocument, PdfObject};
use mupdf::{Document, MetadataName, Outline, TextPageOptions};

use super::{
    ColorModel, ImageHeader, NativeContext, NativeError, NativeResult, OutlineNode, Rect,
    TextBlock, TextPage,
};
use crate::detect::DocumentFormat;

/// Largest `Filter` array inspected when looking for undecoded filters.
const MAX_FILTER_CHAIN: i32 = 16;

enum OpenedDocument {
    /// Object-level access: image extraction and catalog checks
    Pdf(PdfDocument),
    /// Any other handler MuPDF registers (EPUB, XPS, ...)
    Generic(Document),
}

/// One opened MuPDF document
pub struct MupdfContext {
    document: OpenedDocument,
}

// SAFETY: MuPDF objects are bound to an `fz_context`, which is not
// thread-safe. The `mupdf` crate clones a per-thread context from a base
// context with locking callbacks installed, so a document may be used from
// any thread as long as two threads never use it at the same time.
//
// `MupdfContext` is only reachable through the `Mutex` inside
// `crate::Document`, and every trait method takes `&mut self`, so access is
// always exclusive. No MuPDF object created during a call (pages, text
// pages, objects) outlives that call.
unsafe impl Send for MupdfContext {}

fn open_failed(err: mupdf::Error) -> NativeError {
    NativeError::Open(err.to_string())
}

fn failed(err: mupdf::Error) -> NativeError {
    NativeError::Failed(err.to_string())
}

impl MupdfContext {
    /// Open the document at `path` with the handler matching `format`
    pub fn open_path(path: &Path, format: DocumentFormat) -> NativeResult<Self> {
        let filename = path.to_str().ok_or_else(|| {
            NativeError::Open(format!("path is not valid UTF-8: {}", path.display()))
        })?;

        let document = match format {
            DocumentFormat::Pdf => {
                OpenedDocument::Pdf(PdfDocument::open(filename).map_err(open_failed)?)
            }
            DocumentFormat::Epub => {
                OpenedDocument::Generic(Document::open(filename).map_err(open_failed)?)
            }
        };

        Ok(Self { document })
    }

    /// Open a document from memory
    pub fn open_bytes(data: &[u8], format: DocumentFormat) -> NativeResult<Self> {
        if data.is_empty() {
            return Err(NativeError::OpenMemory("buffer is empty".to_string()));
        }

        let document = match format {
            DocumentFormat::Pdf => {
                OpenedDocument::Pdf(PdfDocument::from_bytes(data).map_err(open_failed)?)
            }
            DocumentFormat::Epub => OpenedDocument::Generic(
                Document::from_bytes(data, format.mime_type()).map_err(open_failed)?,
            ),
        };

        Ok(Self { document })
    }

    fn document(&self) -> &Document {
        match &self.document {
            OpenedDocument::Pdf(pdf) => pdf,
            OpenedDocument::Generic(doc) => doc,
        }
    }

    fn pdf_mut(&mut self) -> NativeResult<&mut PdfDocument> {
        match &mut self.document {
            OpenedDocument::Pdf(pdf) => Ok(pdf),
            OpenedDocument::Generic(_) => Err(NativeError::Failed(
                "document has no object table".to_string(),
            )),
        }
    }

    /// Indirect reference to `object` (generation 0), resolved lazily by MuPDF
    fn indirect(&mut self, object: u32) -> NativeResult<PdfObject> {
        let num = i32::try_from(object)
            .map_err(|_| NativeError::Failed(format!("object number {} too large", object)))?;
        self.pdf_mut()?.new_indirect(num, 0).map_err(failed)
    }
}

fn dict_int(obj: &PdfObject, key: &str) -> NativeResult<Option<i32>> {
    match obj.get_dict(key).map_err(failed)? {
        Some(value) => value.as_int().map(Some).map_err(failed),
        None => Ok(None),
    }
}

fn dict_bool(obj: &PdfObject, key: &str) -> NativeResult<bool> {
    match obj.get_dict(key).map_err(failed)? {
        Some(value) => value.as_bool().map_err(failed),
        None => Ok(false),
    }
}

fn name_of(obj: &PdfObject) -> NativeResult<String> {
    obj.as_name()
        .map(|name| String::from_utf8_lossy(name).into_owned())
        .map_err(failed)
}

/// Names of a `Filter` entry, which is either a single name or an array.
fn filter_names(filter: &PdfObject) -> NativeResult<Vec<String>> {
    let single = name_of(filter)?;
    if !single.is_empty() {
        return Ok(vec![single]);
    }

    let mut names = Vec::new();
    for i in 0..MAX_FILTER_CHAIN {
        match filter.get_array(i).map_err(failed)? {
            Some(item) => names.push(name_of(&item)?),
            None => break,
        }
    }
    Ok(names)
}

fn color_model(space: &PdfObject) -> NativeResult<ColorModel> {
    let name = name_of(space)?;
    if !name.is_empty() {
        return color_model_by_name(&name);
    }

    let family = match space.get_array(0).map_err(failed)? {
        Some(first) => name_of(&first)?,
        None => return Err(NativeError::Failed("empty colour space array".to_string())),
    };

    match family.as_str() {
        "ICCBased" => {
            let profile = space
                .get_array(1)
                .map_err(failed)?
                .ok_or_else(|| NativeError::Failed("ICCBased without profile".to_string()))?;
            match dict_int(&profile, "N")? {
                Some(1) => Ok(ColorModel::Gray),
                Some(3) => Ok(ColorModel::Rgb),
                Some(4) => Ok(ColorModel::Cmyk),
                n => Err(NativeError::Failed(format!("unsupported ICC component count {:?}", n))),
            }
        }
        "Indexed" | "I" => {
            let base = space
                .get_array(1)
                .map_err(failed)?
                .ok_or_else(|| NativeError::Failed("Indexed without base".to_string()))?;
            let base = color_model(&base)?;
            if matches!(base, ColorModel::Indexed { .. }) {
                return Err(NativeError::Failed("nested Indexed colour space".to_string()));
            }

            let hival = match space.get_array(2).map_err(failed)? {
                Some(value) => value.as_int().map_err(failed)?.clamp(0, 255) as u8,
                None => 0,
            };

            let lookup = match space.get_array(3).map_err(failed)? {
                Some(table) => {
                    let bytes = table.as_bytes().map_err(failed)?;
                    if bytes.is_empty() {
                        table.read_stream().map_err(failed)?
                    } else {
                        bytes.to_vec()
                    }
                }
                None => Vec::new(),
            };

            Ok(ColorModel::Indexed {
                base: Box::new(base),
                hival,
                lookup,
            })
        }
        "CalGray" => Ok(ColorModel::Gray),
        "CalRGB" => Ok(ColorModel::Rgb),
        "Lab" => lab_space(space),
        // Single-colorant tints render as gray levels
        "Separation" => Ok(ColorModel::Gray),
        "DeviceN" => Err(NativeError::Failed(
            "DeviceN colour spaces need their tint transform".to_string(),
        )),
        other => color_model_by_name(other),
    }
}

/// `[/Lab << /WhitePoint [..] /Range [..] >>]`
fn lab_space(space: &PdfObject) -> NativeResult<ColorModel> {
    let params = space
        .get_array(1)
        .map_err(failed)?
        .ok_or_else(|| NativeError::Failed("Lab without parameters".to_string()))?;

    let mut white_point = [0.9505, 1.0, 1.089];
    if let Some(array) = params.get_dict("WhitePoint").map_err(failed)? {
        read_floats(&array, &mut white_point)?;
    }
    if white_point[1] <= 0.0 {
        return Err(NativeError::Failed("Lab white point Y must be positive".to_string()));
    }

    let mut range = [-100.0, 100.0, -100.0, 100.0];
    if let Some(array) = params.get_dict("Range").map_err(failed)? {
        read_floats(&array, &mut range)?;
    }

    Ok(ColorModel::Lab { white_point, range })
}

/// Overwrite `out` with the leading numbers of `array`
fn read_floats(array: &PdfObject, out: &mut [f32]) -> NativeResult<()> {
    for (i, slot) in out.iter_mut().enumerate() {
        match array.get_array(i as i32).map_err(failed)? {
            Some(value) => *slot = value.as_float().map_err(failed)?,
            None => break,
        }
    }
    Ok(())
}

fn color_model_by_name(name: &str) -> NativeResult<ColorModel> {
    match name {
        "DeviceGray" | "G" | "CalGray" => Ok(ColorModel::Gray),
        "DeviceRGB" | "RGB" | "CalRGB" => Ok(ColorModel::Rgb),
        "DeviceCMYK" | "CMYK" => Ok(ColorModel::Cmyk),
        other => Err(NativeError::Failed(format!("unsupported colour space {}", other))),
    }
}

fn convert_outlines(outlines: Vec<Outline>) -> Vec<OutlineNode> {
    outlines
        .into_iter()
        .map(|outline| OutlineNode {
            title: outline.title,
            uri: outline.uri,
            page: outline.page.map(|page| page as u32),
            y: outline.y,
            children: convert_outlines(outline.down),
        })
        .collect()
}

fn metadata_name(key: &str) -> Option<MetadataName> {
    let name = match key {
        "format" => MetadataName::Format,
        "encryption" => MetadataName::Encryption,
        "info:Title" => MetadataName::Title,
        "info:Author" => MetadataName::Author,
        "info:Subject" => MetadataName::Subject,
        "info:Keywords" => MetadataName::Keywords,
        "info:Creator" => MetadataName::Creator,
        "info:Producer" => MetadataName::Producer,
        "info:CreationDate" => MetadataName::CreationDate,
        "info:ModDate" => MetadataName::ModDate,
        _ => return None,
    };
    Some(name)
}

impl NativeContext for MupdfContext {
    fn needs_password(&mut self) -> NativeResult<bool> {
        self.document().needs_password().map_err(failed)
    }

    fn count_pages(&mut self) -> NativeResult<usize> {
        let count = self.document().page_count().map_err(failed)?;
        Ok(count.max(0) as usize)
    }

    fn count_objects(&mut self) -> NativeResult<usize> {
        let pdf = match &self.document {
            OpenedDocument::Pdf(pdf) => pdf,
            OpenedDocument::Generic(_) => return Ok(0),
        };
        // The loaded (or repaired) xref can be longer than an under-declared Size
        let xref_len = pdf.count_objects().map_err(failed)?;
        let trailer = pdf.trailer().map_err(failed)?;
        let size = dict_int(&trailer, "Size")?.unwrap_or(0);
        Ok(xref_len.max(size).max(0) as usize)
    }

    fn load_text_page(&mut self, index: usize) -> NativeResult<TextPage> {
        let page_no = i32::try_from(index)
            .map_err(|_| NativeError::Failed(format!("page index {} too large", index)))?;
        let page = self.document().load_page(page_no).map_err(failed)?;
        let bounds = page.bounds().map_err(failed)?;

        let text_page = page
            .to_text_page(TextPageOptions::empty())
            .map_err(failed)?;

        let blocks = text_page
            .blocks()
            .map(|block| TextBlock {
                lines: block
                    .lines()
                    .map(|line| line.chars().filter_map(|ch| ch.char()).collect())
                    .collect(),
            })
            .collect();

        Ok(TextPage {
            bounds: Rect {
                x0: bounds.x0,
                y0: bounds.y0,
                x1: bounds.x1,
                y1: bounds.y1,
            },
            blocks,
        })
    }

    fn object_subtype(&mut self, object: u32) -> NativeResult<Option<String>> {
        let obj = self.indirect(object)?;
        match obj.get_dict("Subtype").map_err(failed)? {
            Some(subtype) => {
                let name = name_of(&subtype)?;
                Ok((!name.is_empty()).then_some(name))
            }
            None => Ok(None),
        }
    }

    fn image_header(&mut self, object: u32) -> NativeResult<ImageHeader> {
        let obj = self.indirect(object)?;

        let width = dict_int(&obj, "Width")?.unwrap_or(0).max(0) as u32;
        let height = dict_int(&obj, "Height")?.unwrap_or(0).max(0) as u32;
        let image_mask = dict_bool(&obj, "ImageMask")?;

        let bits_per_component = if image_mask {
            1
        } else {
            dict_int(&obj, "BitsPerComponent")?.unwrap_or(8).clamp(0, 255) as u8
        };

        let color = if image_mask {
            ColorModel::Gray
        } else {
            match obj.get_dict("ColorSpace").map_err(failed)? {
                Some(space) => color_model(&space)?,
                None => ColorModel::Gray,
            }
        };

        let decode_inverted = match obj.get_dict("Decode").map_err(failed)? {
            Some(decode) => {
                let lo = decode.get_array(0).map_err(failed)?;
                let hi = decode.get_array(1).map_err(failed)?;
                match (lo, hi) {
                    (Some(lo), Some(hi)) => {
                        lo.as_float().map_err(failed)? > hi.as_float().map_err(failed)?
                    }
                    _ => false,
                }
            }
            None => false,
        };

        let undecoded_filter = match obj.get_dict("Filter").map_err(failed)? {
            Some(filter) => filter_names(&filter)?
                .into_iter()
                .find(|name| name == "JPXDecode"),
            None => None,
        };

        Ok(ImageHeader {
            width,
            height,
            bits_per_component,
            color,
            image_mask,
            decode_inverted,
            undecoded_filter,
        })
    }

    fn image_samples(&mut self, object: u32) -> NativeResult<Vec<u8>> {
        self.indirect(object)?.read_stream().map_err(failed)
    }

    fn load_outline(&mut self) -> NativeResult<Option<Vec<OutlineNode>>> {
        if let OpenedDocument::Pdf(pdf) = &self.document {
            let catalog = pdf.catalog().map_err(failed)?;
            if catalog.get_dict("Outlines").map_err(failed)?.is_none() {
                return Ok(None);
            }
        }

        let outlines = self.document().outlines().map_err(failed)?;
        Ok(Some(convert_outlines(outlines)))
    }

    fn lookup_metadata(&mut self, key: &str) -> NativeResult<Option<String>> {
        match metadata_name(key) {
            Some(name) => self.document().metadata(name).map(Some).map_err(failed),
            None => Ok(None),
        }
    }
}
