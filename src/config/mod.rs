//! Site configuration.
//!
//! Loaded from a TOML file (conventionally `strata.toml`); every field
//! has a default, so an empty file or no `[build]` table at all is valid.
//!
//! ```toml
//! [build]
//! source = "pages"
//! target = "public"
//! layout_dirname = "_layout"
//! merge = "deep"
//! ```

mod defaults;
mod error;

pub use error::ConfigError;

use educe::Educe;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Root configuration for a site build.
#[derive(Debug, Clone, Deserialize, Educe)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct SiteConfig {
    /// Path of the config file this was loaded from, if any.
    #[serde(skip)]
    pub config_path: Option<PathBuf>,

    #[serde(default)]
    pub build: BuildConfig,
}

/// The `[build]` table: tree locations and classification markers.
#[derive(Debug, Clone, Deserialize, Educe)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct BuildConfig {
    /// Root of the source tree to walk.
    #[serde(default = "defaults::build::source")]
    #[educe(Default = defaults::build::source())]
    pub source: PathBuf,

    /// Root of the target tree to write into.
    #[serde(default = "defaults::build::target")]
    #[educe(Default = defaults::build::target())]
    pub target: PathBuf,

    /// Filename prefix that marks a file as ignored.
    #[serde(default = "defaults::build::ignored_filename")]
    #[educe(Default = defaults::build::ignored_filename())]
    pub ignored_filename: String,

    /// Directory-name prefix that marks a whole subtree as ignored.
    #[serde(default = "defaults::build::ignored_dirname")]
    #[educe(Default = defaults::build::ignored_dirname())]
    pub ignored_dirname: String,

    /// Name of the top-level directory holding layout modules.
    #[serde(default = "defaults::build::layout_dirname")]
    #[educe(Default = defaults::build::layout_dirname())]
    pub layout_dirname: String,

    /// Name of the top-level directory holding global data modules.
    #[serde(default = "defaults::build::data_dirname")]
    #[educe(Default = defaults::build::data_dirname())]
    pub data_dirname: String,

    /// Strategy used when data objects cascade over each other.
    #[serde(default)]
    #[educe(Default = MergeMode::Deep)]
    pub merge: MergeMode,
}

/// How overlapping keys combine when data cascades.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeMode {
    /// Nested objects merge recursively; everything else is replaced.
    Deep,
    /// Top-level keys are replaced wholesale.
    Shallow,
}

impl Default for MergeMode {
    fn default() -> Self {
        Self::Deep
    }
}

impl SiteConfig {
    /// Parse a config from a TOML string.
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(content)?;
        config.expand_paths();
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a config file.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        let mut config = Self::from_str(&content)?;
        config.config_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Expand `~` in the source and target roots.
    fn expand_paths(&mut self) {
        self.build.source = expand_tilde(&self.build.source);
        self.build.target = expand_tilde(&self.build.target);
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("ignored_filename", &self.build.ignored_filename),
            ("ignored_dirname", &self.build.ignored_dirname),
            ("layout_dirname", &self.build.layout_dirname),
            ("data_dirname", &self.build.data_dirname),
        ] {
            if value.is_empty() || value.contains('/') || value.contains('\\') {
                return Err(ConfigError::BadMarker {
                    field,
                    value: value.clone(),
                });
            }
        }

        if self.build.target == self.build.source
            || self.build.target.starts_with(&self.build.source)
        {
            return Err(ConfigError::TargetInsideSource {
                target: self.build.target.clone(),
                source_root: self.build.source.clone(),
            });
        }

        Ok(())
    }
}

fn expand_tilde(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(s) => PathBuf::from(shellexpand::tilde(s).into_owned()),
        None => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SiteConfig::default();
        assert_eq!(config.build.source, PathBuf::from("src"));
        assert_eq!(config.build.target, PathBuf::from("dst"));
        assert_eq!(config.build.ignored_filename, "_");
        assert_eq!(config.build.ignored_dirname, "_");
        assert_eq!(config.build.layout_dirname, "_layout");
        assert_eq!(config.build.data_dirname, "_data");
        assert_eq!(config.build.merge, MergeMode::Deep);
    }

    #[test]
    fn test_empty_toml_matches_default() {
        let config = SiteConfig::from_str("").unwrap();
        let default = SiteConfig::default();
        assert_eq!(config.build.source, default.build.source);
        assert_eq!(config.build.target, default.build.target);
        assert_eq!(config.build.layout_dirname, default.build.layout_dirname);
        assert_eq!(config.build.merge, default.build.merge);
    }

    #[test]
    fn test_parse_overrides() {
        let config = SiteConfig::from_str(
            r#"
            [build]
            source = "pages"
            target = "public"
            layout_dirname = "_wrap"
            merge = "shallow"
            "#,
        )
        .unwrap();
        assert_eq!(config.build.source, PathBuf::from("pages"));
        assert_eq!(config.build.target, PathBuf::from("public"));
        assert_eq!(config.build.layout_dirname, "_wrap");
        assert_eq!(config.build.merge, MergeMode::Shallow);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result = SiteConfig::from_str(
            r#"
            [build]
            sorce = "pages"
            "#,
        );
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn test_empty_marker_rejected() {
        let result = SiteConfig::from_str(
            r#"
            [build]
            layout_dirname = ""
            "#,
        );
        assert!(matches!(
            result,
            Err(ConfigError::BadMarker {
                field: "layout_dirname",
                ..
            })
        ));
    }

    #[test]
    fn test_multi_segment_marker_rejected() {
        let result = SiteConfig::from_str(
            r#"
            [build]
            data_dirname = "a/b"
            "#,
        );
        assert!(matches!(
            result,
            Err(ConfigError::BadMarker {
                field: "data_dirname",
                ..
            })
        ));
    }

    #[test]
    fn test_target_inside_source_rejected() {
        let result = SiteConfig::from_str(
            r#"
            [build]
            source = "site"
            target = "site/out"
            "#,
        );
        assert!(matches!(result, Err(ConfigError::TargetInsideSource { .. })));

        let result = SiteConfig::from_str(
            r#"
            [build]
            source = "site"
            target = "site"
            "#,
        );
        assert!(matches!(result, Err(ConfigError::TargetInsideSource { .. })));
    }

    #[test]
    fn test_tilde_expansion() {
        let config = SiteConfig::from_str(
            r#"
            [build]
            source = "~/pages"
            "#,
        )
        .unwrap();
        assert!(!config.build.source.starts_with("~"));
    }
}
