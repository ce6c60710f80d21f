//! Output file names and collision handling.

use std::path::{Path, PathBuf};

use crate::models::CollisionPolicy;
use crate::position::PositionTag;

/// Extension of every output file.
pub const EXTENSION: &str = "webp";

/// Length of the document prefix in line-estimate names.
const PREFIX_CHARS: usize = 4;

/// First four characters of the file stem.
///
/// The extension never leaks into the prefix: `ab.pdf` gives `ab`, not `ab.p`.
pub fn document_prefix(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().chars().take(PREFIX_CHARS).collect())
        .unwrap_or_default()
}

/// Base file name for an image.
///
/// Line tags give `{prefix}_{page}_{index}_{line}.webp`, heading tags give
/// `{page}_{path}_{index:04}.webp`. `page` is zero-based and written
/// one-based.
pub fn base_name(prefix: &str, page: usize, index: u32, position: &PositionTag) -> String {
    match position {
        PositionTag::Line(line) => {
            format!("{}_{}_{}_{}.{}", prefix, page + 1, index, line, EXTENSION)
        }
        PositionTag::Heading(path) => {
            format!("{}_{}_{:04}.{}", page + 1, path, index, EXTENSION)
        }
    }
}

/// A target path chosen for an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub path: PathBuf,
    /// A file was already at `path` and will be replaced.
    pub existed: bool,
}

/// Pick the path for `base` inside `dir`.
///
/// With [`CollisionPolicy::Suffix`] an existing file pushes the name to
/// `stem(n).ext` with the smallest free `n >= 1`, so `existed` is always
/// false.
pub fn resolve(dir: &Path, base: &str, policy: CollisionPolicy) -> Resolved {
    let path = dir.join(base);
    if !path.exists() {
        return Resolved {
            path,
            existed: false,
        };
    }

    match policy {
        CollisionPolicy::Overwrite => Resolved {
            path,
            existed: true,
        },
        CollisionPolicy::Suffix => {
            let (stem, ext) = match base.rsplit_once('.') {
                Some((stem, ext)) => (stem, Some(ext)),
                None => (base, None),
            };
            let path = (1u32..)
                .map(|n| match ext {
                    Some(ext) => dir.join(format!("{stem}({n}).{ext}")),
                    None => dir.join(format!("{stem}({n})")),
                })
                .find(|candidate| !candidate.exists())
                .unwrap_or_else(|| dir.join(base));
            Resolved {
                path,
                existed: false,
            }
        }
    }
}
