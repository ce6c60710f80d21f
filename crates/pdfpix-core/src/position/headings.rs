//! Heading paths from dotted section numbers in page text.

use lazy_static::lazy_static;
use regex::Regex;

/// Path used for pages without any section number.
pub const FALLBACK_PATH: &str = "0";

lazy_static! {
    // A line holding nothing but a number, usually a page number
    static ref PAGE_NUMBER_LINE: Regex = Regex::new(r"(?m)^[ \t]*\d+[ \t]*\r?$").unwrap();

    // Dotted section numbers: 2.1, 3.2.1
    static ref SECTION_NUMBER: Regex = Regex::new(r"\d+(?:\.\d+)+").unwrap();
}

/// Derive the heading path of a page.
///
/// Every section number on the page contributes its components in reading
/// order, joined with `-`: "2.1 Setup" becomes `2-1`.
pub fn heading_path(text: &str) -> String {
    let text = PAGE_NUMBER_LINE.replace_all(text, "");
    let parts: Vec<&str> = SECTION_NUMBER
        .find_iter(&text)
        .flat_map(|m| m.as_str().split('.'))
        .collect();

    if parts.is_empty() {
        FALLBACK_PATH.to_string()
    } else {
        parts.join("-")
    }
}

/// Per-heading image counter.
///
/// The index restarts at 1 whenever a page's heading path differs from the
/// previous page's.
#[derive(Debug, Clone, Default)]
pub struct HeadingTracker {
    current: Option<String>,
    next: u32,
}

impl HeadingTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move to a page with the given heading path. Returns `true` when the
    /// counter was reset.
    pub fn enter_page(&mut self, path: &str) -> bool {
        if self.current.as_deref() == Some(path) {
            return false;
        }
        self.current = Some(path.to_string());
        self.next = 1;
        true
    }

    /// Take the next index in the current section.
    pub fn next_index(&mut self) -> u32 {
        let index = self.next.max(1);
        self.next = index + 1;
        index
    }

    /// Forget the current section, e.g. at the start of a new document.
    pub fn reset(&mut self) {
        self.current = None;
        self.next = 1;
    }
}
