//! Per-file path model.
//!
//! A [`FileRecord`] tracks a source location and a target location for
//! one file, each split into directory / name / extension parts. The
//! target side starts as a mirror of the source side and is adjusted by
//! classification (template extension stripping) and by target-path
//! transforms.

use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};

/// One path split into its relative directory, file name (without
/// extension) and extension (with leading dot, empty when none).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathParts {
    pub dir_rel: PathBuf,
    pub name: String,
    pub ext: String,
}

impl PathParts {
    fn from_rel(rel: &Path) -> Result<Self> {
        let file_name = rel
            .file_name()
            .and_then(|n| n.to_str())
            .with_context(|| format!("`{}` has no usable file name", rel.display()))?;
        let (name, ext) = split_name(file_name);
        Ok(Self {
            dir_rel: rel.parent().unwrap_or(Path::new("")).to_path_buf(),
            name,
            ext,
        })
    }

    fn path_rel(&self) -> PathBuf {
        self.dir_rel.join(format!("{}{}", self.name, self.ext))
    }
}

/// Split `about.html` into (`about`, `.html`); dotless names get an
/// empty extension. Leading-dot names like `.gitignore` keep the whole
/// name as the name.
fn split_name(file_name: &str) -> (String, String) {
    match file_name.rfind('.') {
        Some(idx) if idx > 0 => (file_name[..idx].to_string(), file_name[idx..].to_string()),
        _ => (file_name.to_string(), String::new()),
    }
}

/// Split a doubled name like `about.html` (the name part of
/// `about.html.js`) into (`about`, `.html`). `None` when there is no
/// inner extension, including leading-dot names like `.css`.
fn split_second(name: &str) -> Option<(String, String)> {
    match name.rfind('.') {
        Some(idx) if idx > 0 => Some((name[..idx].to_string(), name[idx..].to_string())),
        _ => None,
    }
}

/// Source and target locations of one file in the build.
#[derive(Debug, Clone)]
pub struct FileRecord {
    source_root: PathBuf,
    target_root: PathBuf,
    source: PathParts,
    target: PathParts,
}

impl FileRecord {
    /// Build a record for `source_path`, which must live under
    /// `source_root`. The target side mirrors the source side, except
    /// that a `.js` file with a second extension (`about.html.js`)
    /// targets the inner name (`about.html`).
    pub fn new(source_root: &Path, target_root: &Path, source_path: &Path) -> Result<Self> {
        let rel = source_path.strip_prefix(source_root).with_context(|| {
            format!(
                "`{}` is not under source root `{}`",
                source_path.display(),
                source_root.display()
            )
        })?;
        let source = PathParts::from_rel(rel)?;
        let target = match (source.ext.as_str(), split_second(&source.name)) {
            (".js", Some((inner_name, inner_ext))) => PathParts {
                dir_rel: source.dir_rel.clone(),
                name: inner_name,
                ext: inner_ext,
            },
            _ => source.clone(),
        };
        Ok(Self {
            source_root: source_root.to_path_buf(),
            target_root: target_root.to_path_buf(),
            source,
            target,
        })
    }

    // --- source side -------------------------------------------------

    /// Absolute (root-joined) source path.
    pub fn source_path(&self) -> PathBuf {
        self.source_root.join(self.source.path_rel())
    }

    /// Source path relative to the source root, `/`-separated.
    pub fn source_path_rel(&self) -> String {
        super::rel_to_string(&self.source.path_rel())
    }

    pub fn source_dir_rel(&self) -> &Path {
        &self.source.dir_rel
    }

    pub fn source_name(&self) -> &str {
        &self.source.name
    }

    /// Extension with leading dot, or empty.
    pub fn source_ext(&self) -> &str {
        &self.source.ext
    }

    /// Name plus extension, e.g. `about.html`.
    pub fn source_base(&self) -> String {
        format!("{}{}", self.source.name, self.source.ext)
    }

    /// The inner extension of a doubled name: `.html` for
    /// `about.html.js`. `None` when the name has no inner extension.
    pub fn source_ext_second(&self) -> Option<String> {
        split_second(&self.source.name).map(|(_, ext)| ext)
    }

    /// First directory segment of the relative source path, if any.
    pub fn source_rel_first_segment(&self) -> Option<&str> {
        self.source.dir_rel.components().next().and_then(|c| c.as_os_str().to_str())
    }

    /// Directory segments after the first one.
    pub fn source_rel_rest(&self) -> PathBuf {
        let mut components = self.source.dir_rel.components();
        components.next();
        components.as_path().to_path_buf()
    }

    // --- target side -------------------------------------------------

    /// Absolute (root-joined) target path.
    pub fn target_path(&self) -> PathBuf {
        self.target_root.join(self.target.path_rel())
    }

    /// Target path relative to the target root, `/`-separated.
    pub fn target_path_rel(&self) -> String {
        super::rel_to_string(&self.target.path_rel())
    }

    /// Target extension with leading dot, or empty.
    pub fn target_ext(&self) -> &str {
        &self.target.ext
    }

    /// Replace the whole target-relative path. The input must already
    /// be validated (relative, no parent components).
    pub fn set_target_path_rel(&mut self, rel: &str) -> Result<()> {
        let rel = Path::new(rel);
        if rel.is_absolute() {
            bail!("target path `{}` must be relative", rel.display());
        }
        self.target = PathParts::from_rel(rel)?;
        Ok(())
    }
}
