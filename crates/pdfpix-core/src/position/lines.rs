//! Line-number estimation from text geometry.

use crate::pdf::{ImageRef, TextSpan};

/// One-based line index of a vertical coordinate.
fn line_of(y: f32, line_height: f32) -> u32 {
    (y.max(0.0) / line_height).floor() as u32 + 1
}

/// Estimate the line an image starts on.
///
/// Takes every text span that ends at or above the image top, converts its
/// top edge to a line index and returns the line after the lowest one.
/// Pages without text above the image give line 1.
pub fn line_number(image_top: f32, spans: &[TextSpan], line_height: f32) -> u32 {
    spans
        .iter()
        .filter(|span| span.bbox.y1 <= image_top)
        .map(|span| line_of(span.bbox.y0, line_height))
        .max()
        .map_or(1, |line| line + 1)
}

/// Sort images top to bottom. Ties keep extraction order.
pub fn order_by_top(images: &mut [ImageRef]) {
    images.sort_by(|a, b| a.top().total_cmp(&b.top()));
}
