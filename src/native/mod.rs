//! Boundary to the native parsing/rendering library.
//!
//! Everything the engine asks of the library goes through [`NativeContext`]:
//! parse, render a page to structured text, describe and read an image
//! object, load the outline tree and look up metadata strings. A context is
//! not reentrant; [`Document`](crate::Document) owns exactly one and only
//! hands out `&mut` access while holding its lock.

mod mupdf_backend;


pub use mupdf_backend::MupdfContext;

use thiserror::Error;

/// Failure reported by the native layer
#[derive(Error, Debug)]
pub enum NativeError {
    #[error("cannot create context")]
    CreateContext,

    #[error("cannot open memory: {0}")]
    OpenMemory(String),

    #[error("cannot open document: {0}")]
    Open(String),

    #[error("{0}")]
    Failed(String),
}

pub type NativeResult<T> = std::result::Result<T, NativeError>;

/// Axis-aligned rectangle in page space
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

/// A page run through a structured-text device
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextPage {
    pub bounds: Rect,
    pub blocks: Vec<TextBlock>,
}

/// A block of lines, in the library's reading order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextBlock {
    pub lines: Vec<String>,
}

/// One node of the native outline forest
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutlineNode {
    pub title: String,
    pub uri: Option<String>,
    /// 0-based target page for internal links
    pub page: Option<u32>,
    pub y: f32,
    pub children: Vec<OutlineNode>,
}

/// Colour model of image samples
#[derive(Debug, Clone, PartialEq)]
pub enum ColorModel {
    Gray,
    Rgb,
    Cmyk,
    /// CIE L*a*b* with the space's white point (XYZ) and the `[amin amax bmin bmax]`
    /// range the a* and b* samples map onto
    Lab {
        white_point: [f32; 3],
        range: [f32; 4],
    },
    /// Palette image: one index per pixel into `lookup`, which holds
    /// `hival + 1` entries of `base` components each
    Indexed {
        base: Box<ColorModel>,
        hival: u8,
        lookup: Vec<u8>,
    },
}

impl ColorModel {
    /// Number of sample components per pixel
    pub fn components(&self) -> usize {
        match self {
            ColorModel::Gray | ColorModel::Indexed { .. } => 1,
            ColorModel::Rgb | ColorModel::Lab { .. } => 3,
            ColorModel::Cmyk => 4,
        }
    }
}

/// Dictionary parameters needed to interpret an image's decoded samples
#[derive(Debug, Clone, PartialEq)]
pub struct ImageHeader {
    pub width: u32,
    pub height: u32,
    pub bits_per_component: u8,
    pub color: ColorModel,
    pub image_mask: bool,
    /// `Decode` array maps 1 to the minimum instead of 0
    pub decode_inverted: bool,
    /// Filters the library leaves undecoded (e.g. `JPXDecode`)
    pub undecoded_filter: Option<String>,
}

/// Capabilities the engine needs from a native document library.
///
/// Every method takes `&mut self`: the underlying state mutates internal
/// caches even on reads and must never be entered twice at once.
pub trait NativeContext: Send {
    /// Whether the document is encrypted and the empty password was rejected
    fn needs_password(&mut self) -> NativeResult<bool>;

    fn count_pages(&mut self) -> NativeResult<usize>;

    /// Length of the cross-reference table (highest object number + 1)
    fn count_objects(&mut self) -> NativeResult<usize>;

    /// Load page `index`, run it through a structured-text device with an
    /// identity transform and return the result
    fn load_text_page(&mut self, index: usize) -> NativeResult<TextPage>;

    /// `Subtype` name of indirect object `object`, if it has one
    fn object_subtype(&mut self, object: u32) -> NativeResult<Option<String>>;

    fn image_header(&mut self, object: u32) -> NativeResult<ImageHeader>;

    /// Fully filter-decoded stream data of image object `object`
    fn image_samples(&mut self, object: u32) -> NativeResult<Vec<u8>>;

    /// `None` when the document has no outline at all
    fn load_outline(&mut self) -> NativeResult<Option<Vec<OutlineNode>>>;

    /// Named lookup such as `format`, `encryption` or `info:Title`
    fn lookup_metadata(&mut self, key: &str) -> NativeResult<Option<String>>;
}
