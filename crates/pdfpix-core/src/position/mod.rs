//! Position tags: where in the document an image sits.
//!
//! Two resolvers exist. [`lines`] estimates a text line number from page
//! geometry, [`headings`] derives a heading path from the page text.

pub mod headings;
pub mod lines;

pub use headings::{FALLBACK_PATH, HeadingTracker, heading_path};
pub use lines::{line_number, order_by_top};

use serde::Serialize;
use std::fmt;

/// Location of an image, as used in its file name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PositionTag {
    /// Estimated one-based text line number.
    Line(u32),
    /// Heading numbers of the page joined with `-`, or `"0"`.
    Heading(String),
}

impl fmt::Display for PositionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PositionTag::Line(line) => write!(f, "{line}"),
            PositionTag::Heading(path) => f.write_str(path),
        }
    }
}
