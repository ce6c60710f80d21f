//! Output directory handling and WebP encoding.

use std::fs;
use std::path::Path;

use image::DynamicImage;
use tracing::debug;

use crate::error::{PdfpixError, Result};

/// Create the output directory. With `clear`, remove the regular files in it
/// first; subdirectories are left alone.
///
/// Returns the number of files removed.
pub fn prepare_output_dir(dir: &Path, clear: bool) -> Result<usize> {
    fs::create_dir_all(dir)?;
    if !clear {
        return Ok(0);
    }

    let mut removed = 0;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            fs::remove_file(entry.path())?;
            removed += 1;
        }
    }
    debug!("Cleared {} files from {}", removed, dir.display());
    Ok(removed)
}

/// Encode `image` as lossy WebP at `quality` (0-100) and write it to `path`.
pub fn write_webp(image: &DynamicImage, path: &Path, quality: f32) -> Result<()> {
    let (width, height) = (image.width(), image.height());
    // libwebp takes 8-bit RGB(A) only
    let result = if image.color().has_alpha() {
        let pixels = image.to_rgba8();
        webp::Encoder::from_rgba(&pixels, width, height).encode_simple(false, quality)
    } else {
        let pixels = image.to_rgb8();
        webp::Encoder::from_rgb(&pixels, width, height).encode_simple(false, quality)
    };
    let encoded = result.map_err(|e| PdfpixError::Encode {
        path: path.to_path_buf(),
        detail: format!("{:?}", e),
    })?;

    fs::write(path, &*encoded).map_err(|source| PdfpixError::Write {
        path: path.to_path_buf(),
        source,
    })
}
