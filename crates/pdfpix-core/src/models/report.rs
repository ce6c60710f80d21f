//! Per-image, per-page and per-run outcome reports.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::config::Profile;
use crate::position::PositionTag;

/// Why an image produced no output file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    /// The embedded stream could not be decoded.
    Decode { detail: String },
    /// Width or height below the configured minimum.
    TooSmall { width: u32, height: u32, min: u32 },
    /// Encoding or writing the output failed.
    Write { detail: String },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::Decode { detail } => write!(f, "decode failed: {detail}"),
            SkipReason::TooSmall { width, height, min } => {
                write!(f, "too small: {width}x{height} (min {min})")
            }
            SkipReason::Write { detail } => write!(f, "write failed: {detail}"),
        }
    }
}

/// Terminal state of one image.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ImageOutcome {
    Written {
        path: PathBuf,
        width: u32,
        height: u32,
        /// The file existed before and was replaced.
        replaced: bool,
    },
    Skipped { reason: SkipReason },
}

impl ImageOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self, ImageOutcome::Written { .. })
    }
}

/// One embedded image and what happened to it.
#[derive(Debug, Clone, Serialize)]
pub struct ImageRecord {
    /// Zero-based page index.
    pub page: usize,
    /// Object number of the image stream.
    pub xref: u32,
    /// Position tag the image was named with.
    pub position: PositionTag,
    pub outcome: ImageOutcome,
}

/// Outcome of one page.
#[derive(Debug, Clone, Serialize)]
pub struct PageReport {
    /// Zero-based page index.
    pub index: usize,
    /// Whether any text was extracted from the page.
    pub has_text: bool,
    /// Page-level position (heading path); `None` for line estimates, which
    /// are per image.
    pub heading: Option<PositionTag>,
    /// Number of embedded images found on the page.
    pub image_count: usize,
    pub records: Vec<ImageRecord>,
}

impl PageReport {
    pub fn written(&self) -> usize {
        self.records.iter().filter(|r| r.outcome.is_written()).count()
    }
}

/// Outcome of one document.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentReport {
    pub source: PathBuf,
    pub pages: Vec<PageReport>,
}

impl DocumentReport {
    /// Images written to disk.
    pub fn written(&self) -> usize {
        self.pages.iter().map(PageReport::written).sum()
    }

    /// Images found but not written.
    pub fn skipped(&self) -> usize {
        self.records().filter(|r| !r.outcome.is_written()).count()
    }

    /// All image records in processing order.
    pub fn records(&self) -> impl Iterator<Item = &ImageRecord> {
        self.pages.iter().flat_map(|p| p.records.iter())
    }
}

/// Outcome of a full run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub profile: Profile,
    pub output_dir: PathBuf,
    pub documents: Vec<DocumentReport>,
    /// Documents that failed to load and were isolated by the caller.
    pub failed: Vec<FailedDocument>,
}

/// A document that could not be processed at all.
#[derive(Debug, Clone, Serialize)]
pub struct FailedDocument {
    pub source: PathBuf,
    pub error: String,
}

impl RunReport {
    pub fn new(profile: Profile, output_dir: PathBuf) -> Self {
        Self {
            started_at: Utc::now(),
            profile,
            output_dir,
            documents: Vec::new(),
            failed: Vec::new(),
        }
    }

    /// Cumulative number of written images.
    pub fn written(&self) -> usize {
        self.documents.iter().map(DocumentReport::written).sum()
    }

    pub fn skipped(&self) -> usize {
        self.documents.iter().map(DocumentReport::skipped).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(page: usize, outcome: ImageOutcome) -> ImageRecord {
        ImageRecord {
            page,
            xref: 7,
            position: PositionTag::Line(1),
            outcome,
        }
    }

    #[test]
    fn test_counts() {
        let written = ImageOutcome::Written {
            path: PathBuf::from("a.webp"),
            width: 10,
            height: 10,
            replaced: false,
        };
        let skipped = ImageOutcome::Skipped {
            reason: SkipReason::TooSmall {
                width: 10,
                height: 10,
                min: 500,
            },
        };
        let doc = DocumentReport {
            source: PathBuf::from("doc.pdf"),
            pages: vec![
                PageReport {
                    index: 0,
                    has_text: true,
                    heading: None,
                    image_count: 2,
                    records: vec![record(0, written.clone()), record(0, skipped)],
                },
                PageReport {
                    index: 1,
                    has_text: false,
                    heading: None,
                    image_count: 1,
                    records: vec![record(1, written)],
                },
            ],
        };
        assert_eq!(doc.written(), 2);
        assert_eq!(doc.skipped(), 1);

        let mut run = RunReport::new(Profile::LineEstimate, PathBuf::from("images"));
        run.documents.push(doc);
        assert_eq!(run.written(), 2);
        assert_eq!(run.skipped(), 1);
    }

    #[test]
    fn test_outcome_serializes_with_status_tag() {
        let outcome = ImageOutcome::Skipped {
            reason: SkipReason::Decode {
                detail: "bad".to_string(),
            },
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "skipped");
        assert_eq!(json["reason"]["kind"], "decode");
    }

    #[test]
    fn test_skip_reason_display() {
        let reason = SkipReason::TooSmall {
            width: 32,
            height: 600,
            min: 500,
        };
        assert_eq!(reason.to_string(), "too small: 32x600 (min 500)");
    }
}
