//! Size filter and downsampling.

use image::DynamicImage;
use image::imageops::FilterType;

/// Whether both sides reach `min`. No minimum means everything passes.
pub fn passes_min_dimension(width: u32, height: u32, min: Option<u32>) -> bool {
    match min {
        Some(min) => width >= min && height >= min,
        None => true,
    }
}

/// Target size for downsampling by `ratio`.
///
/// The threshold is `ratio` times the longer side, rounded down. When either
/// side exceeds it the image is scaled so the longer side equals the
/// threshold, keeping the aspect ratio. Returns `None` when no resize is
/// needed.
pub fn resize_target(width: u32, height: u32, ratio: f32) -> Option<(u32, u32)> {
    let long = width.max(height);
    let threshold = ((long as f32 * ratio).floor() as u32).max(1);
    if width <= threshold && height <= threshold {
        return None;
    }

    let scale = threshold as f64 / long as f64;
    let fit = |side: u32| ((side as f64 * scale).round() as u32).clamp(1, threshold);
    Some((fit(width), fit(height)))
}

/// Downsample with bicubic (Catmull-Rom) filtering, if needed.
pub fn downsample(image: &DynamicImage, ratio: f32) -> Option<DynamicImage> {
    let (width, height) = resize_target(image.width(), image.height(), ratio)?;
    Some(image.resize_exact(width, height, FilterType::CatmullRom))
}
