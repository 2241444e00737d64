//! Page building.
//!
//! Every output page is a [`PageJob`]: an output key, a template name and the
//! JSON data the template sees. Jobs are drained from an owned queue one at a
//! time by [`drain_queue`]; the first failure stops the queue and pages written
//! before it stay on disk.
//!
//! [`PagePipeline::build`] renders each page twice. The first render is only
//! used to learn which CSS the page needs; the reduced, prefixed and minified
//! CSS is then handed to the second render as `styles`, and that result is
//! minified and written.

use crate::css::{CssError, CssReducer, post_process};
use crate::minify::minify_html;
use crate::post::Post;
use crate::templates::{Renderer, TemplateError};
use lightningcss::targets::Targets;
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum PageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error("page '{key}': {source}")]
    Style {
        key: String,
        #[source]
        source: CssError,
    },
    #[error("failed to serialize page data: {0}")]
    Json(#[from] serde_json::Error),
    #[error("page '{0}': template data must be a JSON object")]
    InvalidData(String),
}

/// One output page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageJob {
    /// Output file stem: `<output>/<key>.html`.
    pub key: String,
    pub template: String,
    pub data: Value,
}

impl PageJob {
    /// A post page, keyed by slug and rendered with the `post` template.
    pub fn post(post: &Post) -> Result<Self, PageError> {
        Ok(Self {
            key: post.slug.clone(),
            template: "post".to_string(),
            data: serde_json::to_value(post)?,
        })
    }

    /// The index page listing every post.
    pub fn index(title: &str, posts: &[Post]) -> Result<Self, PageError> {
        Ok(Self {
            key: "index".to_string(),
            template: "index".to_string(),
            data: json!({
                "title": title,
                "slug": "",
                "posts": serde_json::to_value(posts)?,
            }),
        })
    }
}

/// One job per post in the given order, then the index.
pub fn build_queue(title: &str, posts: &[Post]) -> Result<VecDeque<PageJob>, PageError> {
    let mut queue = posts.iter().map(PageJob::post).collect::<Result<VecDeque<_>, _>>()?;
    queue.push_back(PageJob::index(title, posts)?);
    Ok(queue)
}

/// Shared, read-only inputs for building pages.
pub struct PagePipeline<'a, R: CssReducer> {
    pub renderer: &'a Renderer,
    /// The full compiled stylesheet every page is reduced from.
    pub stylesheet: &'a str,
    pub reducer: &'a R,
    pub targets: Targets,
}

impl<R: CssReducer> PagePipeline<'_, R> {
    /// Render, reduce CSS, re-render with `styles`, minify and write one page.
    pub fn build(&self, job: &PageJob, output_dir: &Path) -> Result<PathBuf, PageError> {
        let style_error = |source| PageError::Style {
            key: job.key.clone(),
            source,
        };

        let Value::Object(fields) = &job.data else {
            return Err(PageError::InvalidData(job.key.clone()));
        };

        let draft = self.renderer.render(&job.template, fields)?;
        let used = self
            .reducer
            .reduce(&draft, self.stylesheet)
            .map_err(style_error)?;
        let styles = post_process(&used, &self.targets).map_err(style_error)?;

        let mut fields = fields.clone();
        fields.insert("styles".to_string(), Value::String(styles));

        let html = minify_html(&self.renderer.render(&job.template, &fields)?);
        let path = output_dir.join(format!("{}.html", job.key));
        fs::write(&path, html)?;
        Ok(path)
    }
}

/// Build every job in order. Stops at the first failure.
pub fn drain_queue<R: CssReducer>(
    mut queue: VecDeque<PageJob>,
    pipeline: &PagePipeline<'_, R>,
    output_dir: &Path,
) -> Result<Vec<PathBuf>, PageError> {
    let mut written = Vec::with_capacity(queue.len());
    while let Some(job) = queue.pop_front() {
        let path = pipeline.build(&job, output_dir)?;
        info!(page = %job.key, "wrote {}", path.display());
        written.push(path);
    }
    Ok(written)
}
