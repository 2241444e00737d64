//! Page templates.
//!
//! Every file in the templates directory is loaded verbatim into a
//! [`TemplateStore`], keyed by its name up to the first `.` (`post.hbs` →
//! `post`). Nothing is parsed at load time. [`Renderer`] compiles the store
//! into a handlebars registry where every template can also be pulled in as a
//! partial (`{{> header}}`), so syntax errors surface when pages are built.

use handlebars::Handlebars;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("template '{name}' failed to compile: {message}")]
    Compile { name: String, message: String },
    #[error("template '{0}' not found")]
    NotFound(String),
    #[error("template '{name}' failed to render: {message}")]
    Render { name: String, message: String },
}

/// Raw template text, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct TemplateStore {
    templates: BTreeMap<String, String>,
}

impl TemplateStore {
    /// Load every regular file in `dir`.
    pub fn load(dir: &Path) -> Result<Self, TemplateError> {
        let mut templates = BTreeMap::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            let file_name = path
                .file_name()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default();
            let name = file_name.split('.').next().unwrap_or("").to_string();
            if name.is_empty() {
                continue;
            }
            templates.insert(name, fs::read_to_string(&path)?);
        }
        Ok(Self { templates })
    }

    pub fn insert(&mut self, name: impl Into<String>, source: impl Into<String>) {
        self.templates.insert(name.into(), source.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.templates.get(name).map(String::as_str)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

/// Compiled templates, ready to render.
pub struct Renderer {
    registry: Handlebars<'static>,
}

impl Renderer {
    pub fn new(store: &TemplateStore) -> Result<Self, TemplateError> {
        let mut registry = Handlebars::new();
        for (name, source) in &store.templates {
            registry
                .register_template_string(name, source)
                .map_err(|e| TemplateError::Compile {
                    name: name.clone(),
                    message: e.to_string(),
                })?;
        }
        Ok(Self { registry })
    }

    /// Render the named template. Every other template is available as a
    /// partial.
    pub fn render<T: Serialize>(&self, name: &str, data: &T) -> Result<String, TemplateError> {
        if !self.registry.has_template(name) {
            return Err(TemplateError::NotFound(name.to_string()));
        }
        self.registry
            .render(name, data)
            .map_err(|e| TemplateError::Render {
                name: name.to_string(),
                message: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn load_keys_by_stem() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("post.hbs"), "post body").unwrap();
        fs::write(tmp.path().join("head.html.hbs"), "head").unwrap();
        fs::create_dir(tmp.path().join("nested")).unwrap();

        let store = TemplateStore::load(tmp.path()).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.get("post"), Some("post body"));
        assert_eq!(store.get("head"), Some("head"));
        assert_eq!(store.names().collect::<Vec<_>>(), vec!["head", "post"]);
    }

    #[test]
    fn load_does_not_validate() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("broken.hbs"), "{{#if}").unwrap();
        assert!(TemplateStore::load(tmp.path()).is_ok());
    }

    #[test]
    fn broken_template_fails_at_compile() {
        let mut store = TemplateStore::default();
        store.insert("broken", "{{#each posts}}no close");
        assert!(matches!(
            Renderer::new(&store),
            Err(TemplateError::Compile { .. })
        ));
    }

    #[test]
    fn templates_are_partials() {
        let mut store = TemplateStore::default();
        store.insert("head", "<title>{{title}}</title>");
        store.insert("page", "<html>{{> head}}<body>{{{content}}}</body></html>");
        let renderer = Renderer::new(&store).unwrap();

        let html = renderer
            .render("page", &json!({ "title": "A & B", "content": "<p>x</p>" }))
            .unwrap();
        assert_eq!(html, "<html><title>A &amp; B</title><body><p>x</p></body></html>");
    }

    #[test]
    fn missing_template_is_error() {
        let renderer = Renderer::new(&TemplateStore::default()).unwrap();
        assert!(matches!(
            renderer.render("index", &json!({})),
            Err(TemplateError::NotFound(_))
        ));
    }
}
