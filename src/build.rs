//! Build orchestration.
//!
//! [`build_site`] runs the whole pipeline: classify the source tree,
//! then copy assets and compile templates concurrently, joining both
//! before reporting. Template compilation itself loads globals and
//! layouts once, memoizes each layout's chain data, and processes the
//! templates in parallel against that shared immutable state.

use crate::config::{MergeMode, SiteConfig};
use crate::files::{FileRecord, FileSet, classify_tree};
use crate::load::{Layout, load_global, load_layout, load_template};
use crate::log;
use crate::logger::Warnings;
use crate::merge::{
    MergeFn, deep_merge, merge_globals, merge_layout_chains, merge_template_data, shallow_merge,
};
use crate::module::{BuildContext, ModuleRegistry};
use crate::render::render_template;
use crate::transform::TransformRegistry;
use anyhow::{Context, Result, bail};
use rayon::prelude::*;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Everything a build needs: configuration, the registered user
/// modules, the registered transforms and the merge strategy.
pub struct Site {
    pub config: SiteConfig,
    pub modules: ModuleRegistry,
    pub transforms: TransformRegistry,
    merge: MergeFn,
}

impl Site {
    /// Create a site; the merge strategy follows `build.merge`.
    pub fn new(config: SiteConfig) -> Self {
        let merge: MergeFn = match config.build.merge {
            MergeMode::Deep => Arc::new(deep_merge),
            MergeMode::Shallow => Arc::new(shallow_merge),
        };
        Self {
            config,
            modules: ModuleRegistry::new(),
            transforms: TransformRegistry::new(),
            merge,
        }
    }

    /// Replace the merge strategy with a custom one.
    pub fn set_merge_fn(&mut self, merge: MergeFn) {
        self.merge = merge;
    }

    fn merge_fn(&self) -> &(dyn Fn(Value, Value) -> Value + Send + Sync) {
        self.merge.as_ref()
    }
}

/// Per-invocation switches.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildFlags {
    /// Run the whole pipeline but write nothing to disk.
    pub dry_run: bool,
}

/// What a finished build did.
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub templates: usize,
    pub assets: usize,
    pub warnings: usize,
    pub duration: Duration,
}

/// Run a full build.
///
/// Fails fast when the source tree is missing or the target already
/// exists (a build never overwrites). Recoverable conditions (broken
/// layout chains, missing optional exports) warn and degrade; the
/// warning count lands in the report.
pub fn build_site(site: &Site, flags: &BuildFlags) -> Result<BuildReport> {
    let started = Instant::now();
    let build = &site.config.build;

    if !build.source.is_dir() {
        bail!("source `{}` does not exist", build.source.display());
    }
    if !flags.dry_run && build.target.exists() {
        bail!(
            "target `{}` already exists, refusing to overwrite",
            build.target.display()
        );
    }

    let files = classify_tree(build)?;
    log!(
        "build";
        "{} templates, {} assets, {} layouts, {} data files, {} ignored",
        files.templates.len(),
        files.assets.len(),
        files.layouts.len(),
        files.globals.len(),
        files.ignored.len()
    );

    let warnings = Warnings::new();
    let (assets_done, templates_done) = rayon::join(
        || copy_assets(&files.assets, flags),
        || process_templates(site, &files, flags, &warnings),
    );
    assets_done?;
    templates_done?;

    let report = BuildReport {
        templates: files.templates.len(),
        assets: files.assets.len(),
        warnings: warnings.count(),
        duration: started.elapsed(),
    };
    log!(
        "build";
        "built {} files in {:.2}s",
        report.templates + report.assets,
        report.duration.as_secs_f64()
    );
    Ok(report)
}

/// Mirror assets into the target tree.
fn copy_assets(assets: &[FileRecord], flags: &BuildFlags) -> Result<()> {
    if flags.dry_run {
        return Ok(());
    }
    assets.par_iter().try_for_each(|record| {
        let target = record.target_path();
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create `{}`", parent.display()))?;
        }
        std::fs::copy(record.source_path(), &target).with_context(|| {
            format!(
                "failed to copy `{}` to `{}`",
                record.source_path().display(),
                target.display()
            )
        })?;
        log!("copy"; "{}", record.target_path_rel());
        Ok(())
    })
}

/// Load globals and layouts, then compile every template.
fn process_templates(
    site: &Site,
    files: &FileSet,
    flags: &BuildFlags,
    warnings: &Warnings,
) -> Result<()> {
    let ctx = BuildContext::from_config(&site.config.build);
    let merge = site.merge_fn();

    let globals = files
        .globals
        .iter()
        .map(|record| load_global(record.clone(), &site.modules, warnings))
        .collect::<Result<Vec<_>>>()?;
    let global = merge_globals(&globals, merge);

    let mut layouts = files
        .layouts
        .iter()
        .map(|record| load_layout(record.clone(), &site.modules, &ctx, warnings))
        .collect::<Result<Vec<_>>>()?;
    merge_layout_chains(&mut layouts, &global, merge, warnings);

    files.templates.par_iter().try_for_each(|record| {
        process_template(site, record.clone(), &layouts, &global, &ctx, flags, warnings)
    })
}

/// Compile one template: load, retarget, merge, render, transform,
/// write.
fn process_template(
    site: &Site,
    record: FileRecord,
    layouts: &[Layout<'_>],
    global: &Value,
    ctx: &BuildContext,
    flags: &BuildFlags,
    warnings: &Warnings,
) -> Result<()> {
    let mut template = load_template(record, &site.modules, ctx, warnings)?;

    // classification guarantees templates carry an inner extension
    let source_ext = template.file.source_ext_second().unwrap_or_default();
    if let Some(rewritten) = site.transforms.apply_target_path(
        &source_ext,
        template.file.target_ext(),
        &template.file.target_path_rel(),
    )? {
        template.file.set_target_path_rel(&rewritten)?;
    }

    let (data, warning) = merge_template_data(&template, layouts, global, site.merge_fn());
    if let Some(message) = warning {
        warnings.emit(&message);
    }

    // broken chains were already reported when layout data was memoized
    let (output, _end) = render_template(&template, layouts, &data)?;
    let output =
        site.transforms
            .apply_content(&source_ext, template.file.target_ext(), output)?;

    if flags.dry_run {
        return Ok(());
    }
    let target = template.file.target_path();
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create `{}`", parent.display()))?;
    }
    std::fs::write(&target, output)
        .with_context(|| format!("failed to write `{}`", target.display()))?;
    log!("write"; "{}", template.file.target_path_rel());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::{GlobalModule, LayoutModule, TemplateModule};
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    /// A site rooted in a temp dir, with `rels` created as empty files.
    fn site_with(rels: &[&str]) -> (TempDir, Site) {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("src");
        fs::create_dir_all(&source).unwrap();
        for rel in rels {
            let path = source.join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, "").unwrap();
        }
        let mut config = SiteConfig::default();
        config.build.source = source;
        config.build.target = dir.path().join("dst");
        (dir, Site::new(config))
    }

    fn read(dir: &TempDir, rel: &str) -> String {
        fs::read_to_string(dir.path().join("dst").join(rel)).unwrap()
    }

    #[test]
    fn test_renders_template_to_target() {
        let (dir, mut site) = site_with(&["about.html.js"]);
        site.modules.add_template(
            "about.html.js",
            TemplateModule::new()
                .data(json!({}))
                .render(|_, _| Ok("<h1>Hi</h1>".to_string())),
        );

        let report = build_site(&site, &BuildFlags::default()).unwrap();
        assert_eq!(report.templates, 1);
        assert_eq!(read(&dir, "about.html"), "<h1>Hi</h1>");
    }

    #[test]
    fn test_assets_mirror_their_source_layout() {
        let (dir, site) = site_with(&["styles.css", "img/logo.png"]);
        fs::write(dir.path().join("src/styles.css"), "body{}").unwrap();

        let report = build_site(&site, &BuildFlags::default()).unwrap();
        assert_eq!(report.assets, 2);
        assert_eq!(read(&dir, "styles.css"), "body{}");
        assert!(dir.path().join("dst/img/logo.png").exists());
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let (dir, mut site) = site_with(&["about.html.js", "styles.css"]);
        site.modules.add_template(
            "about.html.js",
            TemplateModule::new()
                .data(json!({}))
                .render(|_, _| Ok("out".to_string())),
        );

        let report = build_site(&site, &BuildFlags { dry_run: true }).unwrap();
        assert_eq!(report.templates, 1);
        assert!(!dir.path().join("dst").exists());
    }

    #[test]
    fn test_existing_target_is_fatal() {
        let (dir, site) = site_with(&["styles.css"]);
        fs::create_dir_all(dir.path().join("dst")).unwrap();
        let err = build_site(&site, &BuildFlags::default()).unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn test_missing_source_is_fatal() {
        let (dir, mut site) = site_with(&[]);
        site.config.build.source = dir.path().join("nope");
        let err = build_site(&site, &BuildFlags::default()).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_unregistered_template_module_is_fatal() {
        let (_dir, site) = site_with(&["about.html.js"]);
        assert!(build_site(&site, &BuildFlags::default()).is_err());
    }

    #[test]
    fn test_data_cascades_global_layout_template() {
        let (dir, mut site) = site_with(&[
            "_data/site.js",
            "_layout/base.js",
            "_layout/post.js",
            "page.html.js",
        ]);
        site.modules.add_global(
            "_data/site.js",
            GlobalModule::new().data(json!({ "who": "global", "site": "strata" })),
        );
        site.modules.add_layout(
            "_layout/base.js",
            LayoutModule::new()
                .data(json!({ "who": "base", "root": true }))
                .render(|_, previous| Ok(format!("<html>{previous}</html>"))),
        );
        site.modules.add_layout(
            "_layout/post.js",
            LayoutModule::new()
                .data(json!({ "who": "post" }))
                .config(|mut settings| {
                    settings.layout_path = Some("base.js".to_string());
                    Ok(settings)
                })
                .render(|_, previous| Ok(format!("<article>{previous}</article>"))),
        );
        site.modules.add_template(
            "page.html.js",
            TemplateModule::new()
                .data(json!({ "who": "page" }))
                .config(|mut settings| {
                    settings.layout_path = Some("post.js".to_string());
                    Ok(settings)
                })
                .render(|data, _| {
                    Ok(format!(
                        "{}/{}/{}",
                        data["who"].as_str().unwrap(),
                        data["site"].as_str().unwrap(),
                        data["root"]
                    ))
                }),
        );

        let report = build_site(&site, &BuildFlags::default()).unwrap();
        assert_eq!(report.warnings, 0);
        // template wins `who`; global `site` and base-layout `root` survive
        assert_eq!(
            read(&dir, "page.html"),
            "<html><article>page/strata/true</article></html>"
        );
    }

    #[test]
    fn test_layout_renders_see_template_contributed_data() {
        let (dir, mut site) = site_with(&["_layout/base.js", "page.html.js"]);
        site.modules.add_layout(
            "_layout/base.js",
            LayoutModule::new()
                .data(json!({ "who": "base" }))
                .render(|data, previous| {
                    Ok(format!(
                        "<title>{}</title>{previous}",
                        data["who"].as_str().unwrap()
                    ))
                }),
        );
        site.modules.add_template(
            "page.html.js",
            TemplateModule::new()
                .data(json!({ "who": "page" }))
                .config(|mut settings| {
                    settings.layout_path = Some("base.js".to_string());
                    Ok(settings)
                })
                .render(|data, _| Ok(format!("<p>{}</p>", data["who"].as_str().unwrap()))),
        );

        build_site(&site, &BuildFlags::default()).unwrap();
        // the layout render sees the template-level merged data, where the
        // template's own `who` won over the layout's
        assert_eq!(read(&dir, "page.html"), "<title>page</title><p>page</p>");
    }

    #[test]
    fn test_missing_layout_warns_and_degrades() {
        let (dir, mut site) = site_with(&["page.html.js"]);
        site.modules.add_template(
            "page.html.js",
            TemplateModule::new()
                .data(json!({}))
                .config(|mut settings| {
                    settings.layout_path = Some("ghost.js".to_string());
                    Ok(settings)
                })
                .render(|_, _| Ok("alone".to_string())),
        );

        let report = build_site(&site, &BuildFlags::default()).unwrap();
        assert!(report.warnings >= 1);
        assert_eq!(read(&dir, "page.html"), "alone");
    }

    #[test]
    fn test_layout_cycle_warns_and_completes() {
        let (dir, mut site) = site_with(&["_layout/a.js", "_layout/b.js", "page.html.js"]);
        site.modules.add_layout(
            "_layout/a.js",
            LayoutModule::new()
                .data(json!({}))
                .config(|mut settings| {
                    settings.layout_path = Some("b.js".to_string());
                    Ok(settings)
                })
                .render(|_, previous| Ok(format!("a({previous})"))),
        );
        site.modules.add_layout(
            "_layout/b.js",
            LayoutModule::new()
                .data(json!({}))
                .config(|mut settings| {
                    settings.layout_path = Some("a.js".to_string());
                    Ok(settings)
                })
                .render(|_, previous| Ok(format!("b({previous})"))),
        );
        site.modules.add_template(
            "page.html.js",
            TemplateModule::new()
                .data(json!({}))
                .config(|mut settings| {
                    settings.layout_path = Some("a.js".to_string());
                    Ok(settings)
                })
                .render(|_, _| Ok("x".to_string())),
        );

        let report = build_site(&site, &BuildFlags::default()).unwrap();
        assert!(report.warnings >= 1);
        assert_eq!(read(&dir, "page.html"), "b(a(x))");
    }

    #[test]
    fn test_content_transforms_chain_in_order() {
        let (dir, mut site) = site_with(&["page.html.js", "other.txt.js"]);
        site.transforms.add_content(".html", ".html", |c| Ok(format!("{c}1")));
        site.transforms.add_content(".html", ".html", |c| Ok(format!("{c}2")));
        site.modules.add_template(
            "page.html.js",
            TemplateModule::new().data(json!({})).render(|_, _| Ok("x".to_string())),
        );
        // no transform registered for .txt -> identity
        site.modules.add_template(
            "other.txt.js",
            TemplateModule::new().data(json!({})).render(|_, _| Ok("y".to_string())),
        );

        build_site(&site, &BuildFlags::default()).unwrap();
        assert_eq!(read(&dir, "page.html"), "x12");
        assert_eq!(read(&dir, "other.txt"), "y");
    }

    #[test]
    fn test_target_path_transform_moves_output() {
        let (dir, mut site) = site_with(&["about.html.js"]);
        site.transforms.set_target_path(".html", ".html", |rel| {
            let stem = rel.strip_suffix(".html").unwrap_or(rel);
            Ok(format!("{stem}/index.html"))
        });
        site.modules.add_template(
            "about.html.js",
            TemplateModule::new().data(json!({})).render(|_, _| Ok("moved".to_string())),
        );

        build_site(&site, &BuildFlags::default()).unwrap();
        assert_eq!(read(&dir, "about/index.html"), "moved");
        assert!(!dir.path().join("dst/about.html").exists());
    }

    #[test]
    fn test_shallow_merge_mode_replaces_nested_objects() {
        let (dir, mut site) = site_with(&["_data/site.js", "page.html.js"]);
        site.config.build.merge = crate::config::MergeMode::Shallow;
        let mut site = Site::new(site.config);
        site.modules.add_global(
            "_data/site.js",
            GlobalModule::new().data(json!({ "nav": { "a": 1, "b": 2 } })),
        );
        site.modules.add_template(
            "page.html.js",
            TemplateModule::new()
                .data(json!({ "nav": { "a": 9 } }))
                .render(|data, _| Ok(data["nav"].to_string())),
        );

        build_site(&site, &BuildFlags::default()).unwrap();
        assert_eq!(read(&dir, "page.html"), r#"{"a":9}"#);
    }

    #[test]
    fn test_ignored_files_stay_out_of_the_target() {
        let (dir, site) = site_with(&["_draft.html.js", "_private/page.html.js", "ok.css"]);
        let report = build_site(&site, &BuildFlags::default()).unwrap();
        assert_eq!(report.templates, 0);
        assert_eq!(report.assets, 1);
        assert!(!dir.path().join("dst/_draft.html").exists());
        assert!(!dir.path().join("dst/_private").exists());
    }

    #[test]
    fn test_report_counts_and_duration() {
        let (_dir, mut site) = site_with(&["a.html.js", "b.css"]);
        site.modules.add_template(
            "a.html.js",
            TemplateModule::new().data(json!({})).render(|_, _| Ok(String::new())),
        );
        let report = build_site(&site, &BuildFlags::default()).unwrap();
        assert_eq!(report.templates, 1);
        assert_eq!(report.assets, 1);
        assert!(report.duration >= Duration::ZERO);
    }

    #[test]
    fn test_global_data_files_merge_in_order() {
        let (dir, mut site) = site_with(&["_data/a.js", "_data/b.js", "page.html.js"]);
        site.modules
            .add_global("_data/a.js", GlobalModule::new().data(json!({ "v": "a", "a": 1 })));
        site.modules
            .add_global("_data/b.js", GlobalModule::new().data(json!({ "v": "b" })));
        site.modules.add_template(
            "page.html.js",
            TemplateModule::new()
                .data(json!({}))
                .render(|data, _| Ok(format!("{}{}", data["v"].as_str().unwrap(), data["a"]))),
        );

        build_site(&site, &BuildFlags::default()).unwrap();
        // the sorted walk yields _data/a.js before _data/b.js; later file wins
        assert_eq!(read(&dir, "page.html"), "b1");
    }
}
