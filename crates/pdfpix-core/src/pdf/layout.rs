//! Content-stream geometry: text span boxes and image placements.
//!
//! Only the operators that move things around are interpreted (graphics
//! state, text positioning, text showing and `Do`). Glyph widths are not
//! looked up in font programs; a run advances by half an em per byte, which
//! is enough for the vertical ordering the position heuristics rely on.

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::trace;

use super::BBox;
use super::TextSpan;

/// Nesting limit for Form XObjects.
const MAX_FORM_DEPTH: usize = 8;

/// Assumed glyph advance in em units.
const GLYPH_ADVANCE: f32 = 0.5;

/// Affine transform `[a b c d e f]` as used by PDF.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    pub fn new(a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub fn translate(tx: f32, ty: f32) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    /// `self × other`: apply `self` first, then `other`.
    pub fn then(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    /// Length of the transformed unit x vector.
    fn scale_x(&self) -> f32 {
        (self.a * self.a + self.b * self.b).sqrt()
    }

    /// Length of the transformed unit y vector.
    fn scale_y(&self) -> f32 {
        (self.c * self.c + self.d * self.d).sqrt()
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Vertical extent of a glyph relative to its font size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphMetrics {
    pub ascent: f32,
    pub descent: f32,
}

impl Default for GlyphMetrics {
    fn default() -> Self {
        Self {
            ascent: 0.8,
            descent: 0.2,
        }
    }
}

/// An image XObject drawn on the page.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub id: ObjectId,
    pub bbox: BBox,
}

/// Geometry of one page.
#[derive(Debug, Clone, Default)]
pub struct PageLayout {
    pub spans: Vec<TextSpan>,
    /// Image placements in drawing order.
    pub placements: Vec<Placement>,
}

impl PageLayout {
    /// First placement of an image, if it is drawn at all.
    pub fn placement_of(&self, id: ObjectId) -> Option<BBox> {
        self.placements.iter().find(|p| p.id == id).map(|p| p.bbox)
    }
}

#[derive(Debug, Clone, Copy)]
struct TextState {
    font_size: f32,
    char_spacing: f32,
    word_spacing: f32,
    horizontal_scale: f32,
    leading: f32,
    rise: f32,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font_size: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scale: 1.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct GraphicsState {
    ctm: Matrix,
    text: TextState,
}

/// Walks content streams and records geometry in top-left page space.
pub(crate) struct LayoutWalker<'a> {
    doc: &'a Document,
    metrics: GlyphMetrics,
    /// MediaBox left edge and top edge in PDF space.
    origin: (f32, f32),
    layout: PageLayout,
    forms: Vec<ObjectId>,
}

impl<'a> LayoutWalker<'a> {
    /// `media_box` is `[llx, lly, urx, ury]`.
    pub(crate) fn new(doc: &'a Document, media_box: [f32; 4], metrics: GlyphMetrics) -> Self {
        Self {
            doc,
            metrics,
            origin: (media_box[0].min(media_box[2]), media_box[1].max(media_box[3])),
            layout: PageLayout::default(),
            forms: Vec::new(),
        }
    }

    pub(crate) fn finish(self) -> PageLayout {
        self.layout
    }

    /// Interpret a decoded content stream.
    pub(crate) fn walk(
        &mut self,
        content: &Content,
        resources: Option<&'a Dictionary>,
        base: Matrix,
    ) {
        let mut state = GraphicsState {
            ctm: base,
            text: TextState::default(),
        };
        let mut stack: Vec<GraphicsState> = Vec::new();
        let mut tm = Matrix::IDENTITY;
        let mut tlm = Matrix::IDENTITY;

        for op in &content.operations {
            match op.operator.as_str() {
                "q" => stack.push(state),
                "Q" => {
                    if let Some(saved) = stack.pop() {
                        state = saved;
                    }
                }
                "cm" => {
                    if let Some([a, b, c, d, e, f]) = numbers::<6>(&op.operands) {
                        state.ctm = Matrix::new(a, b, c, d, e, f).then(&state.ctm);
                    }
                }
                "BT" => {
                    tm = Matrix::IDENTITY;
                    tlm = Matrix::IDENTITY;
                }
                "Tf" => {
                    if let Some([size]) = numbers::<1>(&op.operands) {
                        state.text.font_size = size;
                    }
                }
                "Tc" => {
                    if let Some([v]) = numbers::<1>(&op.operands) {
                        state.text.char_spacing = v;
                    }
                }
                "Tw" => {
                    if let Some([v]) = numbers::<1>(&op.operands) {
                        state.text.word_spacing = v;
                    }
                }
                "Tz" => {
                    if let Some([v]) = numbers::<1>(&op.operands) {
                        state.text.horizontal_scale = v / 100.0;
                    }
                }
                "TL" => {
                    if let Some([v]) = numbers::<1>(&op.operands) {
                        state.text.leading = v;
                    }
                }
                "Ts" => {
                    if let Some([v]) = numbers::<1>(&op.operands) {
                        state.text.rise = v;
                    }
                }
                "Tm" => {
                    if let Some([a, b, c, d, e, f]) = numbers::<6>(&op.operands) {
                        tlm = Matrix::new(a, b, c, d, e, f);
                        tm = tlm;
                    }
                }
                "Td" | "TD" => {
                    if let Some([tx, ty]) = numbers::<2>(&op.operands) {
                        if op.operator == "TD" {
                            state.text.leading = -ty;
                        }
                        tlm = Matrix::translate(tx, ty).then(&tlm);
                        tm = tlm;
                    }
                }
                "T*" => {
                    tlm = Matrix::translate(0.0, -state.text.leading).then(&tlm);
                    tm = tlm;
                }
                "Tj" | "TJ" => tm = self.show_text(op, &state, tm),
                "'" | "\"" => {
                    if op.operator == "\"" {
                        let spacing = &op.operands[..op.operands.len().min(2)];
                        if let Some([aw, ac]) = numbers::<2>(spacing) {
                            state.text.word_spacing = aw;
                            state.text.char_spacing = ac;
                        }
                    }
                    tlm = Matrix::translate(0.0, -state.text.leading).then(&tlm);
                    tm = self.show_text(op, &state, tlm);
                }
                "Do" => {
                    let name = op.operands.first().and_then(|o| o.as_name().ok());
                    if let Some(name) = name {
                        self.invoke_xobject(name, resources, state.ctm);
                    }
                }
                _ => {}
            }
        }
    }

    /// Record a span for a text-showing operator and return the advanced
    /// text matrix.
    fn show_text(&mut self, op: &Operation, state: &GraphicsState, tm: Matrix) -> Matrix {
        let text = state.text;
        let mut glyphs = 0usize;
        let mut advance = 0.0f32;

        let mut add_string = |bytes: &[u8], advance: &mut f32| {
            glyphs += bytes.len();
            for &byte in bytes {
                let mut w = GLYPH_ADVANCE * text.font_size + text.char_spacing;
                if byte == b' ' {
                    w += text.word_spacing;
                }
                *advance += w * text.horizontal_scale;
            }
        };

        for operand in &op.operands {
            match operand {
                Object::String(bytes, _) => add_string(bytes, &mut advance),
                Object::Array(items) => {
                    for item in items {
                        match item {
                            Object::String(bytes, _) => add_string(bytes, &mut advance),
                            other => {
                                if let Some(adj) = number(other) {
                                    advance -= adj / 1000.0 * text.font_size * text.horizontal_scale;
                                }
                            }
                        }
                    }
                }
                _ => {}
            }
        }

        if glyphs == 0 || text.font_size == 0.0 {
            return tm;
        }

        let user = tm.then(&state.ctm);
        let (x, y) = user.apply(0.0, text.rise);
        let height = text.font_size * user.scale_y();
        let width = advance * user.scale_x();
        let top = y + self.metrics.ascent * height;
        let bottom = y - self.metrics.descent * height;

        let bbox = BBox::new(
            x.min(x + width) - self.origin.0,
            self.origin.1 - top,
            x.max(x + width) - self.origin.0,
            self.origin.1 - bottom,
        );
        trace!("text span {:?} ({} glyphs)", bbox, glyphs);
        self.layout.spans.push(TextSpan { bbox, glyphs });

        Matrix::translate(advance, 0.0).then(&tm)
    }

    fn invoke_xobject(&mut self, name: &[u8], resources: Option<&'a Dictionary>, ctm: Matrix) {
        let doc = self.doc;
        let Some(id) = resources.and_then(|res| xobject_id(doc, res, name)) else {
            trace!("unresolved XObject /{}", String::from_utf8_lossy(name));
            return;
        };
        let Ok(Object::Stream(stream)) = doc.get_object(id) else {
            return;
        };

        match subtype(&stream.dict) {
            Some(b"Image") => {
                let corners = [
                    ctm.apply(0.0, 0.0),
                    ctm.apply(1.0, 0.0),
                    ctm.apply(0.0, 1.0),
                    ctm.apply(1.0, 1.0),
                ];
                let flipped: Vec<(f32, f32)> = corners
                    .iter()
                    .map(|&(x, y)| (x - self.origin.0, self.origin.1 - y))
                    .collect();
                if let Some(bbox) = BBox::from_points(&flipped) {
                    trace!("image {:?} placed at {:?}", id, bbox);
                    self.layout.placements.push(Placement { id, bbox });
                }
            }
            Some(b"Form") => {
                if self.forms.contains(&id) || self.forms.len() >= MAX_FORM_DEPTH {
                    return;
                }
                let matrix = stream
                    .dict
                    .get(b"Matrix")
                    .ok()
                    .and_then(|m| match m {
                        Object::Array(items) => numbers::<6>(items),
                        _ => None,
                    })
                    .map(|[a, b, c, d, e, f]| Matrix::new(a, b, c, d, e, f))
                    .unwrap_or_default();
                let form_resources = stream
                    .dict
                    .get(b"Resources")
                    .ok()
                    .and_then(|r| resolve_dict(doc, r))
                    .or(resources);
                let data = stream
                    .decompressed_content()
                    .unwrap_or_else(|_| stream.content.clone());
                let Ok(content) = Content::decode(&data) else {
                    trace!("undecodable form XObject {:?}", id);
                    return;
                };

                self.forms.push(id);
                self.walk(&content, form_resources, matrix.then(&ctm));
                self.forms.pop();
            }
            _ => {}
        }
    }
}

/// Numeric value of an operand.
pub(crate) fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

/// The last `N` operands as numbers.
fn numbers<const N: usize>(operands: &[Object]) -> Option<[f32; N]> {
    if operands.len() < N {
        return None;
    }
    let mut out = [0.0f32; N];
    for (slot, obj) in out.iter_mut().zip(&operands[operands.len() - N..]) {
        *slot = number(obj)?;
    }
    Some(out)
}

/// Follow a single reference to a dictionary.
pub(crate) fn resolve_dict<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Dictionary> {
    match obj {
        Object::Dictionary(dict) => Some(dict),
        Object::Reference(id) => doc.get_object(*id).ok()?.as_dict().ok(),
        _ => None,
    }
}

/// `/Subtype` name of an XObject dictionary.
pub(crate) fn subtype(dict: &Dictionary) -> Option<&[u8]> {
    dict.get(b"Subtype").ok()?.as_name().ok()
}

/// Object id of a named XObject in a resource dictionary.
fn xobject_id(doc: &Document, resources: &Dictionary, name: &[u8]) -> Option<ObjectId> {
    let xobjects = resolve_dict(doc, resources.get(b"XObject").ok()?)?;
    match xobjects.get(name).ok()? {
        Object::Reference(id) => Some(*id),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{Stream, dictionary};

    const LETTER: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

    fn doc_with_image() -> (Document, Dictionary, ObjectId) {
        let mut doc = Document::with_version("1.5");
        let image_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => 2,
                "Height" => 2,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            vec![0, 64, 128, 255],
        ));
        let resources = dictionary! {
            "XObject" => dictionary! { "Im1" => image_id },
        };
        (doc, resources, image_id)
    }

    fn walk(doc: &Document, resources: &Dictionary, ops: Vec<Operation>) -> PageLayout {
        let content = Content { operations: ops };
        let mut walker = LayoutWalker::new(doc, LETTER, GlyphMetrics::default());
        walker.walk(&content, Some(resources), Matrix::IDENTITY);
        walker.finish()
    }

    #[test]
    fn test_matrix_then_applies_left_first() {
        let scale = Matrix::new(2.0, 0.0, 0.0, 2.0, 0.0, 0.0);
        let shift = Matrix::translate(10.0, 5.0);
        assert_eq!(scale.then(&shift).apply(1.0, 1.0), (12.0, 7.0));
        assert_eq!(shift.then(&scale).apply(1.0, 1.0), (22.0, 12.0));
    }

    #[test]
    fn test_image_placement_is_flipped_to_top_origin() {
        let (doc, resources, image_id) = doc_with_image();
        let layout = walk(
            &doc,
            &resources,
            vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![200.into(), 0.into(), 0.into(), 100.into(), 72.into(), 500.into()],
                ),
                Operation::new("Do", vec![Object::Name(b"Im1".to_vec())]),
                Operation::new("Q", vec![]),
            ],
        );

        assert_eq!(layout.placements.len(), 1);
        let bbox = layout.placement_of(image_id).unwrap();
        assert_eq!(bbox, BBox::new(72.0, 192.0, 272.0, 292.0));
    }

    #[test]
    fn test_graphics_state_restore() {
        let (doc, resources, image_id) = doc_with_image();
        let layout = walk(
            &doc,
            &resources,
            vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![1.into(), 0.into(), 0.into(), 1.into(), 100.into(), 100.into()],
                ),
                Operation::new("Q", vec![]),
                Operation::new(
                    "cm",
                    vec![10.into(), 0.into(), 0.into(), 10.into(), 0.into(), 0.into()],
                ),
                Operation::new("Do", vec![Object::Name(b"Im1".to_vec())]),
            ],
        );

        let bbox = layout.placement_of(image_id).unwrap();
        assert_eq!(bbox, BBox::new(0.0, 782.0, 10.0, 792.0));
    }

    #[test]
    fn test_text_span_geometry() {
        let (doc, resources, _) = doc_with_image();
        let layout = walk(
            &doc,
            &resources,
            vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 10.into()]),
                Operation::new("Td", vec![72.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal("Hello")]),
                Operation::new("ET", vec![]),
            ],
        );

        assert_eq!(layout.spans.len(), 1);
        let span = &layout.spans[0];
        assert_eq!(span.glyphs, 5);
        // baseline at 792 - 700 = 92, ascent 8, descent 2, advance 5 * 5
        assert_eq!(span.bbox, BBox::new(72.0, 84.0, 97.0, 94.0));
    }

    #[test]
    fn test_leading_moves_next_line_down() {
        let (doc, resources, _) = doc_with_image();
        let layout = walk(
            &doc,
            &resources,
            vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 10.into()]),
                Operation::new("TL", vec![12.into()]),
                Operation::new("Td", vec![72.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal("one")]),
                Operation::new("T*", vec![]),
                Operation::new("Tj", vec![Object::string_literal("two")]),
                Operation::new("'", vec![Object::string_literal("three")]),
                Operation::new("ET", vec![]),
            ],
        );

        let tops: Vec<f32> = layout.spans.iter().map(|s| s.bbox.y0).collect();
        assert_eq!(tops, vec![84.0, 96.0, 108.0]);
    }

    #[test]
    fn test_empty_strings_produce_no_span() {
        let (doc, resources, _) = doc_with_image();
        let layout = walk(
            &doc,
            &resources,
            vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 10.into()]),
                Operation::new("Tj", vec![Object::string_literal("")]),
                Operation::new("ET", vec![]),
            ],
        );
        assert!(layout.spans.is_empty());
    }

    #[test]
    fn test_form_xobject_is_walked_with_its_matrix() {
        let (mut doc, _, image_id) = doc_with_image();
        let inner = Content {
            operations: vec![
                Operation::new(
                    "cm",
                    vec![50.into(), 0.into(), 0.into(), 50.into(), 0.into(), 0.into()],
                ),
                Operation::new("Do", vec![Object::Name(b"Im1".to_vec())]),
            ],
        };
        let form_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Form",
                "BBox" => vec![0.into(), 0.into(), 100.into(), 100.into()],
                "Matrix" => vec![1.into(), 0.into(), 0.into(), 1.into(), 100.into(), 0.into()],
                "Resources" => dictionary! {
                    "XObject" => dictionary! { "Im1" => image_id },
                },
            },
            inner.encode().unwrap(),
        ));
        let resources = dictionary! {
            "XObject" => dictionary! { "Fm1" => form_id },
        };

        let layout = walk(
            &doc,
            &resources,
            vec![Operation::new("Do", vec![Object::Name(b"Fm1".to_vec())])],
        );

        let bbox = layout.placement_of(image_id).unwrap();
        assert_eq!(bbox, BBox::new(100.0, 742.0, 150.0, 792.0));
    }
}
