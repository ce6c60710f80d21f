//! PDF document access using lopdf.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::{debug, trace};

use super::layout::{GlyphMetrics, LayoutWalker, Matrix, PageLayout, number, resolve_dict, subtype};
use super::{BBox, ColorSpace, ImagePayload, ImageRef, PageContent, PageSource, Result, TextSpan};
use crate::error::PdfError;

/// US Letter, used when a page has no usable MediaBox.
const DEFAULT_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

/// An open PDF document.
///
/// The parsed document is held in memory until [`PdfDocument::close`] is
/// called or the value is dropped.
pub struct PdfDocument {
    document: Document,
    source: Option<PathBuf>,
    /// Page object ids in page order.
    pages: Vec<ObjectId>,
    metrics: GlyphMetrics,
}

impl PdfDocument {
    /// Open and parse a PDF file.
    pub fn open(path: &Path) -> Result<Self> {
        let data = std::fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => PdfError::NotFound(path.to_path_buf()),
            _ => PdfError::Parse(format!("{}: {}", path.display(), e)),
        })?;
        let mut doc = Self::from_bytes(&data)?;
        doc.source = Some(path.to_path_buf());
        Ok(doc)
    }

    /// Parse a PDF held in memory.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut doc = Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

        // Handle PDFs with empty password encryption
        if doc.is_encrypted() {
            if doc.decrypt("").is_err() {
                return Err(PdfError::Encrypted);
            }
            debug!("Decrypted PDF with empty password");
        }

        let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();
        if pages.is_empty() {
            return Err(PdfError::NoPages);
        }

        debug!("Loaded PDF with {} pages", pages.len());
        Ok(Self {
            document: doc,
            source: None,
            pages,
            metrics: GlyphMetrics::default(),
        })
    }

    /// Use different glyph proportions for text span boxes.
    pub fn with_metrics(mut self, metrics: GlyphMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    /// Release the document.
    pub fn close(self) {
        debug!(
            "Closing {}",
            self.source
                .as_deref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "<memory>".to_string())
        );
    }

    fn page_id(&self, index: usize) -> Result<ObjectId> {
        self.pages
            .get(index)
            .copied()
            .ok_or(PdfError::InvalidPage(index))
    }

    /// Embedded images of a page as `(xref, payload)` in extraction order.
    ///
    /// Image XObjects of the page resources come first, in dictionary order,
    /// followed by images only reachable through Form XObjects.
    pub fn page_images(&self, index: usize) -> Result<Vec<(u32, ImagePayload)>> {
        let page_id = self.page_id(index)?;
        let doc = &self.document;

        let mut ids = Vec::new();
        if let Some(resources) = self.page_resources(page_id) {
            let mut seen = HashSet::new();
            collect_image_ids(doc, resources, &mut ids, &mut seen, 0);
        }

        let images: Vec<(u32, ImagePayload)> = ids
            .into_iter()
            .filter_map(|id| match doc.get_object(id) {
                Ok(Object::Stream(stream)) => Some((id.0, image_payload(doc, stream))),
                _ => None,
            })
            .collect();

        debug!("Found {} images on page {}", images.len(), index + 1);
        Ok(images)
    }

    /// Bounding boxes of drawn images as `(xref, bbox)`, first placement only.
    pub fn image_boxes(&self, index: usize) -> Result<Vec<(u32, BBox)>> {
        let layout = self.page_layout(index)?;
        let mut seen = HashSet::new();
        Ok(layout
            .placements
            .into_iter()
            .filter(|p| seen.insert(p.id))
            .map(|p| (p.id.0, p.bbox))
            .collect())
    }

    /// Text span boxes of a page.
    pub fn text_spans(&self, index: usize) -> Result<Vec<TextSpan>> {
        Ok(self.page_layout(index)?.spans)
    }

    /// Plain text of a page, `None` when there is none.
    pub fn page_text(&self, index: usize) -> Result<Option<String>> {
        self.page_id(index)?;
        let page_number = (index + 1) as u32;
        match self.document.extract_text(&[page_number]) {
            Ok(text) if !text.trim().is_empty() => Ok(Some(text)),
            Ok(_) => Ok(None),
            Err(e) => {
                debug!("No text on page {}: {}", page_number, e);
                Ok(None)
            }
        }
    }

    /// Walk the page content for text and image geometry.
    pub fn page_layout(&self, index: usize) -> Result<PageLayout> {
        let page_id = self.page_id(index)?;
        let doc = &self.document;

        let data = doc.get_page_content(page_id).map_err(|e| PdfError::Content {
            page: index,
            detail: e.to_string(),
        })?;
        let content = Content::decode(&data).map_err(|e| PdfError::Content {
            page: index,
            detail: e.to_string(),
        })?;

        let mut walker = LayoutWalker::new(doc, self.media_box(page_id), self.metrics);
        walker.walk(&content, self.page_resources(page_id), Matrix::IDENTITY);
        let layout = walker.finish();

        trace!(
            "Page {}: {} text spans, {} image placements",
            index + 1,
            layout.spans.len(),
            layout.placements.len()
        );
        Ok(layout)
    }

    /// Resources dictionary for a page, handling inheritance.
    fn page_resources(&self, page_id: ObjectId) -> Option<&Dictionary> {
        let doc = &self.document;
        inherited(doc, page_id, b"Resources").and_then(|r| resolve_dict(doc, r))
    }

    fn media_box(&self, page_id: ObjectId) -> [f32; 4] {
        let doc = &self.document;
        let values = inherited(doc, page_id, b"MediaBox").and_then(|obj| {
            let obj = match obj {
                Object::Reference(id) => doc.get_object(*id).ok()?,
                other => other,
            };
            let items = obj.as_array().ok()?;
            let numbers: Vec<f32> = items.iter().filter_map(number).collect();
            <[f32; 4]>::try_from(numbers).ok()
        });
        values.unwrap_or(DEFAULT_MEDIA_BOX)
    }
}

impl PageSource for PdfDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page(&self, index: usize) -> Result<PageContent> {
        let layout = self.page_layout(index)?;
        let mut images: Vec<ImageRef> = self
            .page_images(index)?
            .into_iter()
            .map(|(xref, payload)| ImageRef {
                xref,
                payload,
                bbox: None,
            })
            .collect();
        for image in &mut images {
            image.bbox = layout
                .placements
                .iter()
                .find(|p| p.id.0 == image.xref)
                .map(|p| p.bbox);
        }

        Ok(PageContent {
            index,
            images,
            text: self.page_text(index)?,
            spans: layout.spans,
        })
    }
}

/// Look up a page attribute, walking up the page tree.
fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut node_id = page_id;
    // Page trees are shallow; the bound only protects against cycles.
    for _ in 0..32 {
        let dict = doc.get_object(node_id).ok()?.as_dict().ok()?;
        if let Ok(value) = dict.get(key) {
            return Some(value);
        }
        match dict.get(b"Parent") {
            Ok(Object::Reference(parent_id)) => node_id = *parent_id,
            _ => return None,
        }
    }
    None
}

/// Collect image XObject ids from a resource dictionary, descending into
/// Form XObjects.
fn collect_image_ids(
    doc: &Document,
    resources: &Dictionary,
    ids: &mut Vec<ObjectId>,
    seen: &mut HashSet<ObjectId>,
    depth: usize,
) {
    let Some(xobjects) = resources.get(b"XObject").ok().and_then(|x| resolve_dict(doc, x)) else {
        return;
    };

    let mut forms = Vec::new();
    for (_name, obj) in xobjects.iter() {
        let Object::Reference(id) = obj else {
            continue;
        };
        if !seen.insert(*id) {
            continue;
        }
        let Ok(Object::Stream(stream)) = doc.get_object(*id) else {
            continue;
        };
        match subtype(&stream.dict) {
            Some(b"Image") => ids.push(*id),
            Some(b"Form") => forms.push(stream),
            _ => {}
        }
    }

    if depth >= 8 {
        return;
    }
    for form in forms {
        if let Some(form_resources) = form
            .dict
            .get(b"Resources")
            .ok()
            .and_then(|r| resolve_dict(doc, r))
        {
            collect_image_ids(doc, form_resources, ids, seen, depth + 1);
        }
    }
}

/// Names of the stream filters, in application order.
fn filter_names(dict: &Dictionary) -> Vec<String> {
    match dict.get(b"Filter") {
        Ok(Object::Name(name)) => vec![String::from_utf8_lossy(name).into_owned()],
        Ok(Object::Array(items)) => items
            .iter()
            .filter_map(|o| o.as_name().ok())
            .map(|n| String::from_utf8_lossy(n).into_owned())
            .collect(),
        _ => Vec::new(),
    }
}

/// Extract the payload of an image XObject.
fn image_payload(doc: &Document, stream: &Stream) -> ImagePayload {
    let dict = &stream.dict;
    let filters = filter_names(dict);

    if let Some(last) = filters.last() {
        if matches!(
            last.as_str(),
            "DCTDecode" | "JPXDecode" | "JBIG2Decode" | "CCITTFaxDecode"
        ) {
            trace!("Encoded image with filter {}", last);
            return ImagePayload::Encoded {
                filter: last.clone(),
                data: stream.content.clone(),
            };
        }
    }

    let int = |key: &[u8]| dict.get(key).ok().and_then(|o| o.as_i64().ok());
    let width = int(b"Width").unwrap_or(0).max(0) as u32;
    let height = int(b"Height").unwrap_or(0).max(0) as u32;
    let is_mask = matches!(dict.get(b"ImageMask"), Ok(Object::Boolean(true)));
    let bits_per_component = if is_mask {
        1
    } else {
        int(b"BitsPerComponent").unwrap_or(8) as u8
    };
    let color_space = if is_mask {
        ColorSpace::Other("ImageMask".to_string())
    } else {
        dict.get(b"ColorSpace")
            .map(|cs| color_space(doc, cs))
            .unwrap_or(ColorSpace::Rgb)
    };

    // Get the decompressed stream content
    let data = match stream.decompressed_content() {
        Ok(d) => d,
        Err(_) => stream.content.clone(),
    };

    ImagePayload::Raw {
        width,
        height,
        color_space,
        bits_per_component,
        data,
    }
}

/// Interpret a `/ColorSpace` entry.
fn color_space(doc: &Document, obj: &Object) -> ColorSpace {
    let obj = match obj {
        Object::Reference(id) => match doc.get_object(*id) {
            Ok(resolved) => resolved,
            Err(_) => return ColorSpace::Other("unresolved".to_string()),
        },
        other => other,
    };

    match obj {
        Object::Name(name) => match name.as_slice() {
            b"DeviceGray" | b"CalGray" | b"G" => ColorSpace::Gray,
            b"DeviceRGB" | b"CalRGB" | b"RGB" => ColorSpace::Rgb,
            b"DeviceCMYK" | b"CMYK" => ColorSpace::Cmyk,
            other => ColorSpace::Other(String::from_utf8_lossy(other).into_owned()),
        },
        Object::Array(items) => {
            let family = items.first().and_then(|o| o.as_name().ok()).unwrap_or_default();
            match family {
                b"ICCBased" => {
                    let n = items
                        .get(1)
                        .and_then(|r| match r {
                            Object::Reference(id) => doc.get_object(*id).ok(),
                            other => Some(other),
                        })
                        .and_then(|o| o.as_stream().ok())
                        .and_then(|s| s.dict.get(b"N").ok())
                        .and_then(|n| n.as_i64().ok());
                    match n {
                        Some(1) => ColorSpace::Gray,
                        Some(3) => ColorSpace::Rgb,
                        Some(4) => ColorSpace::Cmyk,
                        _ => ColorSpace::Other("ICCBased".to_string()),
                    }
                }
                b"Indexed" | b"I" => {
                    let base = items
                        .get(1)
                        .map(|b| color_space(doc, b))
                        .unwrap_or(ColorSpace::Rgb);
                    let lookup = items.get(3).and_then(|l| {
                        let l = match l {
                            Object::Reference(id) => doc.get_object(*id).ok()?,
                            other => other,
                        };
                        match l {
                            Object::String(bytes, _) => Some(bytes.clone()),
                            Object::Stream(s) => Some(
                                s.decompressed_content()
                                    .unwrap_or_else(|_| s.content.clone()),
                            ),
                            _ => None,
                        }
                    });
                    match lookup {
                        Some(lookup) => ColorSpace::Indexed {
                            base: Box::new(base),
                            lookup,
                        },
                        None => ColorSpace::Other("Indexed".to_string()),
                    }
                }
                b"CalGray" => ColorSpace::Gray,
                b"CalRGB" => ColorSpace::Rgb,
                other => ColorSpace::Other(String::from_utf8_lossy(other).into_owned()),
            }
        }
        _ => ColorSpace::Other("unknown".to_string()),
    }
}
