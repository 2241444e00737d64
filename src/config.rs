//! Site configuration module.
//!
//! Handles loading, validating, and merging the optional `config.toml` at the
//! site root. Stock defaults are overridden by whatever the user file sets;
//! everything else keeps its default.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! title = "au.si"           # Site title, passed to the index template as `title`
//!
//! [paths]                   # All relative to the site root
//! templates = "templates"
//! posts = "posts"
//! stylesheet = "styles.scss"
//! output = "dist"
//! cache = "tmp"
//!
//! [styles]
//! code_theme = "base16-ocean.dark"  # "" disables the code theme
//! browsers = ["> 0.5%", "last 2 versions", "Firefox ESR", "not dead"]
//!
//! [avatar]
//! enabled = true
//! url = "https://www.gravatar.com/avatar/ef0606c138d944e1a8089ff8eb1df71d?s=512"
//! sizes = [64, 128]         # Square derivative edge lengths
//! quality = 85              # JPEG quality (1-100)
//! max_age_hours = 24        # Skip the fetch while the cached avatar is younger
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Site configuration loaded from `config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Site title, passed to the index template.
    pub title: String,
    /// Input and output locations, relative to the site root.
    pub paths: PathsConfig,
    /// Stylesheet compilation and post-processing.
    pub styles: StylesConfig,
    /// Remote avatar and its resized derivatives.
    pub avatar: AvatarConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "au.si".to_string(),
            paths: PathsConfig::default(),
            styles: StylesConfig::default(),
            avatar: AvatarConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.title.trim().is_empty() {
            return Err(ConfigError::Validation("title must not be empty".into()));
        }
        if self.avatar.enabled {
            if self.avatar.quality == 0 || self.avatar.quality > 100 {
                return Err(ConfigError::Validation(
                    "avatar.quality must be 1-100".into(),
                ));
            }
            if self.avatar.sizes.is_empty() {
                return Err(ConfigError::Validation(
                    "avatar.sizes must not be empty".into(),
                ));
            }
            if self.avatar.sizes.contains(&0) {
                return Err(ConfigError::Validation(
                    "avatar.sizes values must be non-zero".into(),
                ));
            }
            if self.avatar.url.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "avatar.url must not be empty when the avatar is enabled".into(),
                ));
            }
        }
        Ok(())
    }
}

/// Input and output locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    pub templates: PathBuf,
    pub posts: PathBuf,
    pub stylesheet: PathBuf,
    pub output: PathBuf,
    /// Build-to-build image cache, keyed by content hash.
    pub cache: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            templates: PathBuf::from("templates"),
            posts: PathBuf::from("posts"),
            stylesheet: PathBuf::from("styles.scss"),
            output: PathBuf::from("dist"),
            cache: PathBuf::from("tmp"),
        }
    }
}

impl PathsConfig {
    /// Resolve every path against the site root.
    pub fn resolve(&self, root: &Path) -> Self {
        Self {
            templates: root.join(&self.templates),
            posts: root.join(&self.posts),
            stylesheet: root.join(&self.stylesheet),
            output: root.join(&self.output),
            cache: root.join(&self.cache),
        }
    }
}

/// Stylesheet settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StylesConfig {
    /// Name of a bundled syntax-highlighting theme appended to the stylesheet.
    /// Empty disables it.
    pub code_theme: String,
    /// Browserslist queries used for vendor prefixing.
    pub browsers: Vec<String>,
}

impl Default for StylesConfig {
    fn default() -> Self {
        Self {
            code_theme: "base16-ocean.dark".to_string(),
            browsers: vec![
                "> 0.5%".to_string(),
                "last 2 versions".to_string(),
                "Firefox ESR".to_string(),
                "not dead".to_string(),
            ],
        }
    }
}

/// Avatar download and derivative settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AvatarConfig {
    pub enabled: bool,
    pub url: String,
    /// Edge lengths of the square derivatives.
    pub sizes: Vec<u32>,
    /// JPEG encoding quality (1 = worst, 100 = best).
    pub quality: u32,
    /// How long a previously fetched avatar is trusted without asking the
    /// remote service again.
    pub max_age_hours: u64,
}

impl Default for AvatarConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: "https://www.gravatar.com/avatar/ef0606c138d944e1a8089ff8eb1df71d?s=512"
                .to_string(),
            sizes: vec![64, 128],
            quality: 85,
            max_age_hours: 24,
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(SiteConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `config.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if no `config.toml` exists in the directory.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = path.join("config.toml");
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<SiteConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `config.toml` in the site root.
pub fn load_config(root: &Path) -> Result<SiteConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(root)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# inkpress configuration
# ======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# Site title, passed to the index template as `title`.
title = "au.si"

# ---------------------------------------------------------------------------
# Paths (relative to the site root)
# ---------------------------------------------------------------------------
[paths]
templates = "templates"
posts = "posts"
stylesheet = "styles.scss"
# Every top-level .html file in here is deleted at the start of a build.
output = "dist"
# Resized avatar images are cached here between builds.
cache = "tmp"

# ---------------------------------------------------------------------------
# Styles
# ---------------------------------------------------------------------------
[styles]
# Syntax-highlighting theme appended to the stylesheet. One of:
# base16-ocean.dark, base16-eighties.dark, base16-mocha.dark,
# base16-ocean.light, InspiredGitHub, Solarized (dark), Solarized (light).
# Set to "" to disable.
code_theme = "base16-ocean.dark"

# Browserslist queries used to decide which vendor prefixes to add.
browsers = ["> 0.5%", "last 2 versions", "Firefox ESR", "not dead"]

# ---------------------------------------------------------------------------
# Avatar
# ---------------------------------------------------------------------------
[avatar]
enabled = true
url = "https://www.gravatar.com/avatar/ef0606c138d944e1a8089ff8eb1df71d?s=512"

# Edge lengths of the square JPEG derivatives (written as profile-<size>.jpg).
sizes = [64, 128]

# JPEG quality (1 = worst, 100 = best).
quality = 85

# A previously fetched avatar younger than this is reused without a request.
max_age_hours = 24
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_values() {
        let config = SiteConfig::default();
        assert_eq!(config.title, "au.si");
        assert_eq!(config.paths.output, PathBuf::from("dist"));
        assert_eq!(config.avatar.sizes, vec![64, 128]);
        assert_eq!(config.avatar.quality, 85);
        assert_eq!(config.styles.code_theme, "base16-ocean.dark");
    }

    #[test]
    fn parse_partial_config() {
        let toml = r##"
[avatar]
quality = 70
"##;
        let config: SiteConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.avatar.quality, 70);
        // Default values preserved
        assert_eq!(config.avatar.sizes, vec![64, 128]);
        assert_eq!(config.title, "au.si");
    }

    #[test]
    fn paths_resolve_against_root() {
        let paths = PathsConfig::default().resolve(Path::new("/site"));
        assert_eq!(paths.templates, PathBuf::from("/site/templates"));
        assert_eq!(paths.stylesheet, PathBuf::from("/site/styles.scss"));
        assert_eq!(paths.cache, PathBuf::from("/site/tmp"));
    }

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.title, "au.si");
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("config.toml"),
            r##"
title = "notes"

[paths]
output = "public"
"##,
        )
        .unwrap();

        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.title, "notes");
        assert_eq!(config.paths.output, PathBuf::from("public"));
        // Unspecified values should be defaults
        assert_eq!(config.paths.posts, PathBuf::from("posts"));
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("config.toml"), "this is not valid toml [[[").unwrap();

        let result = load_config(tmp.path());
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn unknown_key_rejected() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("config.toml"), "[avatar]\nqualty = 80\n").unwrap();

        let result = load_config(tmp.path());
        assert!(result.is_err());
    }

    #[test]
    fn merge_toml_table_merge() {
        let base: toml::Value = toml::from_str("[a]\nx = 1\ny = 2\n").unwrap();
        let overlay: toml::Value = toml::from_str("[a]\ny = 3\n").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["a"]["x"].as_integer(), Some(1));
        assert_eq!(merged["a"]["y"].as_integer(), Some(3));
    }

    #[test]
    fn validate_quality_bounds() {
        let mut config = SiteConfig::default();
        config.avatar.quality = 0;
        assert!(config.validate().is_err());
        config.avatar.quality = 101;
        assert!(config.validate().is_err());
        config.avatar.quality = 100;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_sizes() {
        let mut config = SiteConfig::default();
        config.avatar.sizes = vec![];
        assert!(config.validate().is_err());
        config.avatar.sizes = vec![64, 0];
        assert!(config.validate().is_err());
    }

    #[test]
    fn disabled_avatar_skips_avatar_validation() {
        let mut config = SiteConfig::default();
        config.avatar.enabled = false;
        config.avatar.sizes = vec![];
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_empty_title() {
        let mut config = SiteConfig::default();
        config.title = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let config: SiteConfig = toml::from_str(stock_config_toml()).unwrap();
        let defaults = SiteConfig::default();
        assert_eq!(config.title, defaults.title);
        assert_eq!(config.avatar.url, defaults.avatar.url);
        assert_eq!(config.avatar.sizes, defaults.avatar.sizes);
        assert_eq!(config.styles.browsers, defaults.styles.browsers);
        assert_eq!(config.paths.cache, defaults.paths.cache);
    }
}
