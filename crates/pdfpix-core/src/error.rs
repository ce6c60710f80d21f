//! Error types for the pdfpix-core library.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the pdfpix library.
///
/// Everything in here is fatal for the run (or, in batch mode with error
/// isolation, for one document). Per-image failures are [`DecodeError`]s and
/// end up as skipped records in the report instead.
#[derive(Error, Debug)]
pub enum PdfpixError {
    /// No input documents were found.
    #[error("no PDF files found in {}", path.display())]
    InputMissing { path: PathBuf },

    /// PDF loading or parsing error.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// Failed to write an output image.
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// WebP encoding failed.
    #[error("failed to encode {}: {detail}", path.display())]
    Encode { path: PathBuf, detail: String },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors related to PDF loading.
#[derive(Error, Debug)]
pub enum PdfError {
    /// The PDF file does not exist.
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,

    /// Invalid page index requested (zero-based).
    #[error("invalid page index: {0}")]
    InvalidPage(usize),

    /// A page content stream could not be decoded.
    #[error("failed to decode content of page {page}: {detail}")]
    Content { page: usize, detail: String },
}

/// Errors decoding a single embedded image.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// The stream uses a filter we cannot decode.
    #[error("unsupported image filter: {0}")]
    UnsupportedFilter(String),

    /// The colour space is not one we can map to pixels.
    #[error("unsupported colour space: {0}")]
    UnsupportedColorSpace(String),

    /// Bit depth other than 1, 2, 4 or 8.
    #[error("unsupported bits per component: {0}")]
    UnsupportedBits(u8),

    /// Width or height is zero or missing.
    #[error("invalid image dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    /// Sample data is shorter than width x height x components.
    #[error("truncated image data: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    /// The encoded blob is not a valid image.
    #[error("invalid image data: {0}")]
    Image(#[from] image::ImageError),
}

/// Result type for the pdfpix library.
pub type Result<T> = std::result::Result<T, PdfpixError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_missing_display() {
        let err = PdfpixError::InputMissing {
            path: PathBuf::from("./docs"),
        };
        assert_eq!(err.to_string(), "no PDF files found in ./docs");
    }

    #[test]
    fn test_pdf_error_converts() {
        let err: PdfpixError = PdfError::NoPages.into();
        assert!(err.to_string().contains("no pages"));
    }

    #[test]
    fn test_truncated_display() {
        let err = DecodeError::Truncated {
            expected: 300,
            actual: 12,
        };
        assert!(err.to_string().contains("300"));
        assert!(err.to_string().contains("12"));
    }
}
