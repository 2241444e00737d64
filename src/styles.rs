//! Stylesheet compilation.
//!
//! The site stylesheet is compiled once per build with grass (Sass/SCSS, plain
//! CSS passes through) into a compressed string, and the code theme CSS is
//! appended to it. The result is the full candidate set every page reduces
//! from; it is never written to disk as-is.

use crate::markdown::CLASS_STYLE;
use std::path::{Path, PathBuf};
use syntect::highlighting::ThemeSet;
use syntect::html::css_for_theme_with_class_style;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StyleError {
    #[error("failed to compile stylesheet {path}: {message}")]
    Compile { path: PathBuf, message: String },
    #[error("unknown code theme '{name}' (available: {available})")]
    UnknownTheme { name: String, available: String },
    #[error("failed to generate code theme CSS: {0}")]
    Theme(String),
}

/// Compile a stylesheet source file to compressed CSS.
pub fn compile(path: &Path) -> Result<String, StyleError> {
    let options = grass::Options::default().style(grass::OutputStyle::Compressed);
    grass::from_path(path, &options).map_err(|e| StyleError::Compile {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// CSS for one of syntect's bundled themes, using the highlighter's classes.
pub fn code_theme_css(name: &str) -> Result<String, StyleError> {
    let themes = ThemeSet::load_defaults();
    let theme = themes.themes.get(name).ok_or_else(|| StyleError::UnknownTheme {
        name: name.to_string(),
        available: themes.themes.keys().cloned().collect::<Vec<_>>().join(", "),
    })?;
    css_for_theme_with_class_style(theme, CLASS_STYLE).map_err(|e| StyleError::Theme(e.to_string()))
}

/// Compile the site stylesheet and append the code theme, if any.
pub fn build_stylesheet(source: &Path, code_theme: &str) -> Result<String, StyleError> {
    let mut css = compile(source)?;
    if !code_theme.is_empty() {
        if !css.is_empty() && !css.ends_with('\n') {
            css.push('\n');
        }
        css.push_str(&code_theme_css(code_theme)?);
    }
    Ok(css)
}
