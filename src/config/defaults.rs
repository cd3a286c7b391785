//! Default values for configuration.
//!
//! Referenced by both the serde `default` attributes and the
//! `educe(Default)` expressions, so a `SiteConfig::default()` and a
//! config parsed from an empty TOML document agree on every field.

pub mod build {
    use std::path::PathBuf;

    pub fn source() -> PathBuf {
        PathBuf::from("src")
    }

    pub fn target() -> PathBuf {
        PathBuf::from("dst")
    }

    pub fn ignored_filename() -> String {
        "_".to_string()
    }

    pub fn ignored_dirname() -> String {
        "_".to_string()
    }

    pub fn layout_dirname() -> String {
        "_layout".to_string()
    }

    pub fn data_dirname() -> String {
        "_data".to_string()
    }
}
