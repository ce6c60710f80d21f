//! PDF loading: pages, embedded images, text and geometry.

mod extractor;
mod layout;

pub use extractor::PdfDocument;
pub use layout::{GlyphMetrics, Matrix, PageLayout, Placement};

use serde::Serialize;

use crate::error::PdfError;

/// Result type for PDF operations.
pub type Result<T> = std::result::Result<T, PdfError>;

/// Axis-aligned rectangle in page space.
///
/// The origin is the top-left corner of the page and `y` grows downward, so
/// `y0` is the top edge and `y1` the bottom edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl BBox {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Smallest box containing all points.
    pub fn from_points(points: &[(f32, f32)]) -> Option<Self> {
        let (&first, rest) = points.split_first()?;
        let mut bbox = Self::new(first.0, first.1, first.0, first.1);
        for &(x, y) in rest {
            bbox.x0 = bbox.x0.min(x);
            bbox.y0 = bbox.y0.min(y);
            bbox.x1 = bbox.x1.max(x);
            bbox.y1 = bbox.y1.max(y);
        }
        Some(bbox)
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }
}

/// A run of text drawn by one text-showing operator.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSpan {
    pub bbox: BBox,
    /// Number of bytes shown; a rough glyph count.
    pub glyphs: usize,
}

/// Colour space of raw image samples.
#[derive(Debug, Clone, PartialEq)]
pub enum ColorSpace {
    Gray,
    Rgb,
    Cmyk,
    /// Palette lookup into `base`, `lookup` holds packed base colours.
    Indexed { base: Box<ColorSpace>, lookup: Vec<u8> },
    /// Anything else, kept by name for error reporting.
    Other(String),
}

impl ColorSpace {
    /// Components per sample.
    pub fn components(&self) -> Option<usize> {
        match self {
            ColorSpace::Gray | ColorSpace::Indexed { .. } => Some(1),
            ColorSpace::Rgb => Some(3),
            ColorSpace::Cmyk => Some(4),
            ColorSpace::Other(_) => None,
        }
    }
}

/// Image bytes as stored in the document.
#[derive(Debug, Clone)]
pub enum ImagePayload {
    /// A self-contained encoded image (e.g. JPEG for `DCTDecode`).
    Encoded { filter: String, data: Vec<u8> },
    /// Decompressed sample data described by the image dictionary.
    Raw {
        width: u32,
        height: u32,
        color_space: ColorSpace,
        bits_per_component: u8,
        data: Vec<u8>,
    },
}

/// An embedded image on a page.
#[derive(Debug, Clone)]
pub struct ImageRef {
    /// Object number of the image stream.
    pub xref: u32,
    pub payload: ImagePayload,
    /// Where the image is drawn; `None` when it is listed but never placed.
    pub bbox: Option<BBox>,
}

impl ImageRef {
    /// Top edge used for ordering and line estimation. Unplaced images sort
    /// first.
    pub fn top(&self) -> f32 {
        self.bbox.map(|b| b.y0).unwrap_or(0.0)
    }
}

/// Everything the pipeline needs from one page.
#[derive(Debug, Clone, Default)]
pub struct PageContent {
    /// Zero-based page index.
    pub index: usize,
    /// Images in extraction order.
    pub images: Vec<ImageRef>,
    /// Plain text, `None` when the page has no extractable text.
    pub text: Option<String>,
    pub spans: Vec<TextSpan>,
}

/// Source of pages for the extraction pipeline.
pub trait PageSource {
    /// Number of pages in the document.
    fn page_count(&self) -> usize;

    /// Load one page (zero-based).
    fn page(&self, index: usize) -> Result<PageContent>;
}
