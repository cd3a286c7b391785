//! User modules and the registry that resolves them.
//!
//! Templates, layouts and global data files are backed by code the site
//! author writes. Each module is a bundle of optional exports:
//!
//! - `data` — a value (or a function of the build context) merged into
//!   the cascade
//! - `render` — produces content from merged data and the previous
//!   chain result
//! - `config` — adjusts the module's settings (layout link, target path)
//!
//! Modules register under their source-relative path; a classified
//! template or layout file with no registered module is a build error,
//! the same as a file that fails to import.

use crate::config::BuildConfig;
use anyhow::{Result, bail};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

/// Renders content: receives the merged data and the previous result in
/// the layout chain (empty at the leaf).
pub type RenderFn = Box<dyn Fn(&Value, &str) -> Result<String> + Send + Sync>;

type GlobalDataFn = Box<dyn Fn() -> Result<Value> + Send + Sync>;
type PageDataFn = Box<dyn Fn(&BuildContext) -> Result<Value> + Send + Sync>;
type LayoutConfigFn = Box<dyn Fn(LayoutSettings) -> Result<LayoutSettings> + Send + Sync>;
type TemplateConfigFn = Box<dyn Fn(TemplateSettings) -> Result<TemplateSettings> + Send + Sync>;

/// A global data export: a plain value or one computed at build time.
pub enum GlobalData {
    Static(Value),
    Computed(GlobalDataFn),
}

/// A layout or template data export.
pub enum PageData {
    Static(Value),
    Computed(PageDataFn),
}

/// Exports of a global data module.
#[derive(Default)]
pub struct GlobalModule {
    pub(crate) data: Option<GlobalData>,
}

impl GlobalModule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn data(mut self, value: Value) -> Self {
        self.data = Some(GlobalData::Static(value));
        self
    }

    pub fn data_fn(mut self, f: impl Fn() -> Result<Value> + Send + Sync + 'static) -> Self {
        self.data = Some(GlobalData::Computed(Box::new(f)));
        self
    }
}

/// Exports of a layout module.
#[derive(Default)]
pub struct LayoutModule {
    pub(crate) data: Option<PageData>,
    pub(crate) render: Option<RenderFn>,
    pub(crate) config: Option<LayoutConfigFn>,
}

impl LayoutModule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn data(mut self, value: Value) -> Self {
        self.data = Some(PageData::Static(value));
        self
    }

    pub fn data_fn(
        mut self,
        f: impl Fn(&BuildContext) -> Result<Value> + Send + Sync + 'static,
    ) -> Self {
        self.data = Some(PageData::Computed(Box::new(f)));
        self
    }

    pub fn render(
        mut self,
        f: impl Fn(&Value, &str) -> Result<String> + Send + Sync + 'static,
    ) -> Self {
        self.render = Some(Box::new(f));
        self
    }

    pub fn config(
        mut self,
        f: impl Fn(LayoutSettings) -> Result<LayoutSettings> + Send + Sync + 'static,
    ) -> Self {
        self.config = Some(Box::new(f));
        self
    }
}

/// Exports of a template module.
#[derive(Default)]
pub struct TemplateModule {
    pub(crate) data: Option<PageData>,
    pub(crate) render: Option<RenderFn>,
    pub(crate) config: Option<TemplateConfigFn>,
}

impl TemplateModule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn data(mut self, value: Value) -> Self {
        self.data = Some(PageData::Static(value));
        self
    }

    pub fn data_fn(
        mut self,
        f: impl Fn(&BuildContext) -> Result<Value> + Send + Sync + 'static,
    ) -> Self {
        self.data = Some(PageData::Computed(Box::new(f)));
        self
    }

    pub fn render(
        mut self,
        f: impl Fn(&Value, &str) -> Result<String> + Send + Sync + 'static,
    ) -> Self {
        self.render = Some(Box::new(f));
        self
    }

    pub fn config(
        mut self,
        f: impl Fn(TemplateSettings) -> Result<TemplateSettings> + Send + Sync + 'static,
    ) -> Self {
        self.config = Some(Box::new(f));
        self
    }
}

/// Settings a layout's `config` export may adjust.
#[derive(Debug, Clone, Default)]
pub struct LayoutSettings {
    /// Parent layout, as a path relative to the layout directory.
    pub layout_path: Option<String>,
}

/// Settings a template's `config` export may adjust.
#[derive(Debug, Clone)]
pub struct TemplateSettings {
    /// Layout to render through, as a path relative to the layout
    /// directory.
    pub layout_path: Option<String>,
    /// Where the rendered file lands, relative to the target root.
    pub target_path: String,
}

/// All registered user modules, keyed by source-relative path.
#[derive(Default)]
pub struct ModuleRegistry {
    globals: HashMap<PathBuf, GlobalModule>,
    layouts: HashMap<PathBuf, LayoutModule>,
    templates: HashMap<PathBuf, TemplateModule>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_global(&mut self, source_rel: impl Into<PathBuf>, module: GlobalModule) {
        self.globals.insert(source_rel.into(), module);
    }

    pub fn add_layout(&mut self, source_rel: impl Into<PathBuf>, module: LayoutModule) {
        self.layouts.insert(source_rel.into(), module);
    }

    pub fn add_template(&mut self, source_rel: impl Into<PathBuf>, module: TemplateModule) {
        self.templates.insert(source_rel.into(), module);
    }

    pub(crate) fn global(&self, source_rel: &Path) -> Option<&GlobalModule> {
        self.globals.get(source_rel)
    }

    pub(crate) fn layout(&self, source_rel: &Path) -> Option<&LayoutModule> {
        self.layouts.get(source_rel)
    }

    pub(crate) fn template(&self, source_rel: &Path) -> Option<&TemplateModule> {
        self.templates.get(source_rel)
    }
}

/// Build-wide facts handed to computed data exports.
#[derive(Debug, Clone)]
pub struct BuildContext {
    pub source: PathBuf,
    pub target: PathBuf,
    pub ignored_filename: String,
    pub ignored_dirname: String,
    pub layout_dirname: String,
    pub data_dirname: String,
}

impl BuildContext {
    pub(crate) fn from_config(config: &BuildConfig) -> Self {
        Self {
            source: config.source.clone(),
            target: config.target.clone(),
            ignored_filename: config.ignored_filename.clone(),
            ignored_dirname: config.ignored_dirname.clone(),
            layout_dirname: config.layout_dirname.clone(),
            data_dirname: config.data_dirname.clone(),
        }
    }
}

/// Check a path value coming from user code: layout links and target
/// paths must be non-empty, not whitespace, and must not climb out of
/// their root.
pub(crate) fn validate_user_path(label: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        bail!("{label} must not be empty");
    }
    let path = Path::new(value);
    if path.is_absolute() {
        bail!("{label} `{value}` must be relative");
    }
    if path
        .components()
        .any(|c| matches!(c, Component::ParentDir))
    {
        bail!("{label} `{value}` must not contain `..`");
    }
    Ok(())
}
