//! Core library for extracting embedded images from PDF documents.
//!
//! This crate provides:
//! - PDF loading (embedded images, page text and text/image geometry)
//! - Position tags for images: estimated line numbers or heading paths
//! - Image decoding, size filtering and downsampling
//! - Deterministic output names with collision handling
//! - WebP output and per-image/per-run reports

pub mod error;
pub mod imaging;
pub mod models;
pub mod naming;
pub mod pdf;
pub mod pipeline;
pub mod position;
pub mod writer;

pub use error::{DecodeError, PdfError, PdfpixError, Result};
pub use models::{
    CollisionPolicy, DocumentReport, ImageOutcome, ImageRecord, PageReport, PdfpixConfig, Profile,
    RunReport, SkipReason,
};
pub use pdf::{PageSource, PdfDocument};
pub use pipeline::{Extractor, discover_inputs};
pub use position::PositionTag;
