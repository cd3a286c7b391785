//! Extension-keyed transforms.
//!
//! A transform is keyed by the concatenation of a source extension and
//! a target extension, dots included: a template named `post.md.js`
//! targeting `.html` looks up `".md.html"`. Content transforms rewrite
//! rendered output in registration order; a target-path transform
//! rewrites where the file lands. Unregistered keys are identity.

use crate::files::rel_to_string;
use crate::module::validate_user_path;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;

type ContentFn = Box<dyn Fn(&str) -> Result<String> + Send + Sync>;
type TargetPathFn = Box<dyn Fn(&str) -> Result<String> + Send + Sync>;

struct ContentTransform {
    name: Option<String>,
    func: ContentFn,
}

/// Transforms registered for a site, looked up by extension pair.
#[derive(Default)]
pub struct TransformRegistry {
    content: HashMap<String, Vec<ContentTransform>>,
    target_path: HashMap<String, TargetPathFn>,
}

/// `".md" + ".html"` → `".md.html"`.
fn key(source_ext: &str, target_ext: &str) -> String {
    format!("{source_ext}{target_ext}")
}

impl TransformRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a content transform for an extension pair. Multiple
    /// transforms on the same key run in registration order.
    pub fn add_content(
        &mut self,
        source_ext: &str,
        target_ext: &str,
        func: impl Fn(&str) -> Result<String> + Send + Sync + 'static,
    ) {
        self.content
            .entry(key(source_ext, target_ext))
            .or_default()
            .push(ContentTransform {
                name: None,
                func: Box::new(func),
            });
    }

    /// Like [`add_content`](Self::add_content), with a name used in
    /// error messages.
    pub fn add_content_named(
        &mut self,
        source_ext: &str,
        target_ext: &str,
        name: &str,
        func: impl Fn(&str) -> Result<String> + Send + Sync + 'static,
    ) {
        self.content
            .entry(key(source_ext, target_ext))
            .or_default()
            .push(ContentTransform {
                name: Some(name.to_string()),
                func: Box::new(func),
            });
    }

    /// Register the target-path transform for an extension pair. At
    /// most one per key; a second registration replaces the first.
    pub fn set_target_path(
        &mut self,
        source_ext: &str,
        target_ext: &str,
        func: impl Fn(&str) -> Result<String> + Send + Sync + 'static,
    ) {
        self.target_path
            .insert(key(source_ext, target_ext), Box::new(func));
    }

    /// Run the content transforms for this extension pair over
    /// `content`. Identity when none are registered.
    pub(crate) fn apply_content(
        &self,
        source_ext: &str,
        target_ext: &str,
        content: String,
    ) -> Result<String> {
        let Some(transforms) = self.content.get(&key(source_ext, target_ext)) else {
            return Ok(content);
        };
        let mut content = content;
        for transform in transforms {
            let label = transform.name.as_deref().unwrap_or("(anonymous)");
            content = (transform.func)(&content).with_context(|| {
                format!(
                    "content transform {label} for `{}` failed",
                    key(source_ext, target_ext)
                )
            })?;
        }
        Ok(content)
    }

    /// Rewrite a target-relative path through the transform for this
    /// extension pair. `None` when no transform is registered.
    pub(crate) fn apply_target_path(
        &self,
        source_ext: &str,
        target_ext: &str,
        target_rel: &str,
    ) -> Result<Option<String>> {
        let Some(transform) = self.target_path.get(&key(source_ext, target_ext)) else {
            return Ok(None);
        };
        let rewritten = transform(target_rel).with_context(|| {
            format!(
                "target path transform for `{}` failed on `{target_rel}`",
                key(source_ext, target_ext)
            )
        })?;
        validate_user_path("target path", &rewritten).with_context(|| {
            format!(
                "target path transform for `{}` produced an invalid path",
                key(source_ext, target_ext)
            )
        })?;
        Ok(Some(rel_to_string(Path::new(&rewritten))))
    }
}
