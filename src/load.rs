//! Module loading: resolving classified files against the registry and
//! evaluating their exports into ready-to-merge state.
//!
//! A classified template, layout or global file whose module was never
//! registered fails the build; a module missing an optional export
//! only warns.

use crate::files::{FileRecord, rel_to_string};
use crate::logger::Warnings;
use crate::module::{
    BuildContext, GlobalData, LayoutSettings, ModuleRegistry, PageData, RenderFn,
    TemplateSettings, validate_user_path,
};
use anyhow::{Context, Result, bail};
use serde_json::Value;
use std::path::Path;

/// A loaded global data file.
pub struct GlobalFile {
    pub file: FileRecord,
    pub data: Option<Value>,
}

/// A loaded layout with its evaluated exports.
///
/// `data_merged` starts empty and is memoized once all layouts are
/// loaded, holding global data merged with this layout's full chain.
pub struct Layout<'m> {
    pub file: FileRecord,
    /// Chain id: the path relative to the layout directory.
    pub id: String,
    pub layout_path: Option<String>,
    pub data: Option<Value>,
    pub render: Option<&'m RenderFn>,
    pub data_merged: Option<Value>,
}

impl std::fmt::Debug for Layout<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Layout")
            .field("file", &self.file)
            .field("id", &self.id)
            .field("layout_path", &self.layout_path)
            .field("data", &self.data)
            .field("render", &self.render.map(|_| "<fn>"))
            .field("data_merged", &self.data_merged)
            .finish()
    }
}

/// A loaded template with its evaluated exports.
pub struct Template<'m> {
    pub file: FileRecord,
    pub layout_path: Option<String>,
    pub data: Option<Value>,
    pub render: Option<&'m RenderFn>,
}

pub(crate) fn load_global(
    file: FileRecord,
    registry: &ModuleRegistry,
    warnings: &Warnings,
) -> Result<GlobalFile> {
    let rel = file.source_path_rel();
    let Some(module) = registry.global(Path::new(&rel)) else {
        bail!("global data file `{rel}` has no registered module");
    };
    let data = match &module.data {
        None => {
            warnings.emit(&format!("global data module `{rel}` exports no data"));
            None
        }
        Some(GlobalData::Static(value)) => Some(value.clone()),
        Some(GlobalData::Computed(f)) => {
            Some(f().with_context(|| format!("data export of `{rel}` failed"))?)
        }
    };
    Ok(GlobalFile { file, data })
}

pub(crate) fn load_layout<'m>(
    file: FileRecord,
    registry: &'m ModuleRegistry,
    ctx: &BuildContext,
    warnings: &Warnings,
) -> Result<Layout<'m>> {
    let rel = file.source_path_rel();
    let Some(module) = registry.layout(Path::new(&rel)) else {
        bail!("layout file `{rel}` has no registered module");
    };

    let data = eval_page_data(&module.data, ctx, &rel, warnings)?;

    let mut settings = LayoutSettings::default();
    if let Some(config) = &module.config {
        settings = config(settings).with_context(|| format!("config export of `{rel}` failed"))?;
    }
    let layout_path = normalize_layout_link(settings.layout_path, &rel)?;

    if module.render.is_none() {
        warnings.emit(&format!("layout module `{rel}` exports no render"));
    }

    let id = rel_to_string(&file.source_rel_rest().join(file.source_base()));
    Ok(Layout {
        file,
        id,
        layout_path,
        data,
        render: module.render.as_ref(),
        data_merged: None,
    })
}

pub(crate) fn load_template<'m>(
    mut file: FileRecord,
    registry: &'m ModuleRegistry,
    ctx: &BuildContext,
    warnings: &Warnings,
) -> Result<Template<'m>> {
    let rel = file.source_path_rel();
    let Some(module) = registry.template(Path::new(&rel)) else {
        bail!("template file `{rel}` has no registered module");
    };

    let data = eval_page_data(&module.data, ctx, &rel, warnings)?;

    let mut settings = TemplateSettings {
        layout_path: None,
        target_path: file.target_path_rel(),
    };
    if let Some(config) = &module.config {
        settings = config(settings).with_context(|| format!("config export of `{rel}` failed"))?;
    }
    let layout_path = normalize_layout_link(settings.layout_path, &rel)?;
    validate_user_path("target path", &settings.target_path)
        .with_context(|| format!("config export of `{rel}` set an invalid target path"))?;
    file.set_target_path_rel(&settings.target_path)?;

    if module.render.is_none() {
        warnings.emit(&format!("template module `{rel}` exports no render"));
    }

    Ok(Template {
        file,
        layout_path,
        data,
        render: module.render.as_ref(),
    })
}

fn eval_page_data(
    data: &Option<PageData>,
    ctx: &BuildContext,
    rel: &str,
    warnings: &Warnings,
) -> Result<Option<Value>> {
    match data {
        None => {
            warnings.emit(&format!("module `{rel}` exports no data"));
            Ok(None)
        }
        Some(PageData::Static(value)) => Ok(Some(value.clone())),
        Some(PageData::Computed(f)) => Ok(Some(
            f(ctx).with_context(|| format!("data export of `{rel}` failed"))?,
        )),
    }
}

/// Validate and slash-normalize a layout link from a config export.
fn normalize_layout_link(link: Option<String>, rel: &str) -> Result<Option<String>> {
    match link {
        None => Ok(None),
        Some(link) => {
            validate_user_path("layout path", &link)
                .with_context(|| format!("config export of `{rel}` set an invalid layout path"))?;
            Ok(Some(rel_to_string(Path::new(&link))))
        }
    }
}
