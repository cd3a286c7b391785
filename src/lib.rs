//! Strata - a layout-chain static content build pipeline.
//!
//! Walks a source tree, classifies every file into exactly one category,
//! resolves each template's layout inheritance chain, merges data down
//! that chain, renders content leaf-to-root through the layouts, applies
//! extension-keyed transforms, and writes the results to a target tree.
//!
//! # Build Flow
//!
//! ```text
//! build_site()
//!     │
//!     ├── classify_tree() ──► FileSet { assets, templates, layouts, globals, ignored }
//!     │
//!     ├── copy assets ───────────────────────────────┐ (parallel, joined at end)
//!     │                                              │
//!     ├── load globals ──► merge global data         │
//!     ├── load layouts ──► memoize layout chains     │
//!     └── templates (parallel):                      │
//!             load ► target-path transform ► merge   │
//!             ► render chain ► content transforms    │
//!             ► write                                │
//!                                                    ▼
//!                                                 JoinAll
//! ```
//!
//! User modules (data / render / config exports) are Rust closures
//! registered in a [`ModuleRegistry`] keyed by source-relative path;
//! render functions are opaque callables to the pipeline.
//!
//! # Example
//!
//! ```ignore
//! let mut site = Site::new(SiteConfig::from_path(Path::new("strata.toml"))?);
//! site.modules.add_template(
//!     "about.html.js",
//!     TemplateModule::new().render(|_data, _previous| Ok("<h1>Hi</h1>".to_string())),
//! );
//! let report = build_site(&site, &BuildFlags::default())?;
//! ```

pub mod build;
pub mod chain;
pub mod config;
pub mod files;
pub mod load;
pub mod logger;
pub mod merge;
pub mod module;
pub mod render;
pub mod transform;

pub use build::{BuildFlags, BuildReport, Site, build_site};
pub use chain::ChainEnd;
pub use config::{BuildConfig, ConfigError, MergeMode, SiteConfig};
pub use files::{FileKind, FileRecord, FileSet};
pub use load::{GlobalFile, Layout, Template};
pub use merge::{MergeFn, deep_merge, shallow_merge};
pub use module::{
    BuildContext, GlobalModule, LayoutModule, LayoutSettings, ModuleRegistry, TemplateModule,
    TemplateSettings,
};
pub use transform::TransformRegistry;
