//! Source tree walking and file classification.

mod classify;
mod record;

pub use classify::{FileKind, FileSet, classify_record, classify_tree};
pub use record::FileRecord;

use std::path::Path;

/// Render a relative path with `/` separators, regardless of platform.
pub(crate) fn rel_to_string(path: &Path) -> String {
    path.components()
        .filter(|c| !matches!(c, std::path::Component::CurDir))
        .filter_map(|c| c.as_os_str().to_str())
        .collect::<Vec<_>>()
        .join("/")
}
