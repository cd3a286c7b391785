//! Source tree walk and classification.
//!
//! Every file under the source root lands in exactly one category. The
//! rules apply in a fixed order, so the same tree and config always
//! produce the same split:
//!
//! 1. file name starts with the ignored prefix → ignored
//! 2. first directory segment is the layout dirname → layout
//! 3. first directory segment is the data dirname → global data
//! 4. any directory segment starts with the ignored dirname prefix → ignored
//! 5. `.js` file whose name carries a second extension → template
//! 6. anything else → asset
//!
//! Inside the layout and data directories, deeper segments with the
//! ignored prefix still hide their subtree (rules 2 and 3 check that
//! before claiming the file).

use crate::config::BuildConfig;
use crate::files::FileRecord;
use crate::log;
use anyhow::{Context, Result};
use std::path::Path;
use walkdir::WalkDir;

/// The category a source file falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// Excluded from the build entirely.
    Ignored,
    /// A layout module under the layout directory.
    Layout,
    /// A global data module under the data directory.
    Global,
    /// A `name.ext.js` page module that renders to `name.ext`.
    Template,
    /// Copied to the target tree verbatim.
    Asset,
}

/// The classified contents of a source tree.
#[derive(Debug, Default)]
pub struct FileSet {
    pub assets: Vec<FileRecord>,
    pub templates: Vec<FileRecord>,
    pub layouts: Vec<FileRecord>,
    pub globals: Vec<FileRecord>,
    pub ignored: Vec<FileRecord>,
}

/// Classify one record against the configured markers.
pub fn classify_record(record: &FileRecord, config: &BuildConfig) -> FileKind {
    if record.source_name().starts_with(&config.ignored_filename) {
        return FileKind::Ignored;
    }

    let first_segment = record.source_rel_first_segment();
    if first_segment == Some(config.layout_dirname.as_str()) {
        if any_segment_ignored(&record.source_rel_rest(), &config.ignored_dirname) {
            return FileKind::Ignored;
        }
        return FileKind::Layout;
    }
    if first_segment == Some(config.data_dirname.as_str()) {
        if any_segment_ignored(&record.source_rel_rest(), &config.ignored_dirname) {
            return FileKind::Ignored;
        }
        return FileKind::Global;
    }

    if any_segment_ignored(record.source_dir_rel(), &config.ignored_dirname) {
        return FileKind::Ignored;
    }

    if record.source_ext() == ".js" && record.source_ext_second().is_some() {
        return FileKind::Template;
    }

    FileKind::Asset
}

fn any_segment_ignored(dir: &Path, ignored_dirname: &str) -> bool {
    dir.components()
        .filter_map(|c| c.as_os_str().to_str())
        .any(|segment| segment.starts_with(ignored_dirname))
}

/// Walk the source tree and classify every file.
pub fn classify_tree(config: &BuildConfig) -> Result<FileSet> {
    let mut files = FileSet::default();

    // sorted walk keeps global data order (and thus merges) deterministic
    for entry in WalkDir::new(&config.source)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry.with_context(|| {
            format!("failed to walk source tree `{}`", config.source.display())
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let record = FileRecord::new(&config.source, &config.target, entry.path())?;
        let kind = classify_record(&record, config);
        log!("scan"; "{} -> {:?}", record.source_path_rel(), kind);
        match kind {
            FileKind::Ignored => files.ignored.push(record),
            FileKind::Layout => files.layouts.push(record),
            FileKind::Global => files.globals.push(record),
            FileKind::Template => files.templates.push(record),
            FileKind::Asset => files.assets.push(record),
        }
    }

    Ok(files)
}
