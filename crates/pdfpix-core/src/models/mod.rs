//! Configuration and report data models.

pub mod config;
pub mod report;

pub use config::{
    CollisionPolicy, FilterConfig, InputConfig, OutputConfig, PdfpixConfig, PositionConfig,
    Profile,
};
pub use report::{
    DocumentReport, FailedDocument, ImageOutcome, ImageRecord, PageReport, RunReport, SkipReason,
};
