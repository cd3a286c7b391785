//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Everything that can go wrong turning a TOML file into a usable
/// [`SiteConfig`](super::SiteConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file `{}`", .0.display())]
    Io(PathBuf, #[source] std::io::Error),

    #[error("config file parsing error")]
    Toml(#[from] toml::de::Error),

    /// A classification marker (`ignored_filename`, `layout_dirname`,
    /// ...) that is empty or spans more than one path segment.
    #[error("`build.{field}` must be a non-empty single path segment, got `{value}`")]
    BadMarker { field: &'static str, value: String },

    /// The build would write into its own input tree.
    #[error(
        "`build.target` (`{}`) must not equal or nest inside `build.source` (`{}`)",
        target.display(),
        source_root.display()
    )]
    TargetInsideSource {
        target: PathBuf,
        source_root: PathBuf,
    },
}
