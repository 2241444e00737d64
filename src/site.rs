//! The full build.
//!
//! ```text
//! config ─▶ templates ─▶ stylesheet ─▶ posts ─▶ clean output ─▶ queue
//!                                                                 │
//!                       ┌── avatar step (own thread) ◀────────────┤
//!                       │                                         ▼
//!                       │                         drain queue, one page at a time
//!                       ▼                                         │
//!                join, copy into <output>/images/ ◀───────────────┘
//! ```
//!
//! Page failures are fatal and returned as soon as they happen, without
//! waiting for the avatar thread. Avatar failures are logged and the build
//! carries on with an empty `images/`.

use crate::avatar::{AvatarError, AvatarOutcome, AvatarSource, AvatarStep, HttpSource, copy_derivatives};
use crate::cache::CacheOutcome;
use crate::config::{self, ConfigError, SiteConfig};
use crate::css::{self, CssError, CssReducer, UsedCssReducer};
use crate::imaging::{ImageBackend, RustBackend};
use crate::pages::{PageError, PagePipeline, build_queue, drain_queue};
use crate::post::{PostError, load_posts};
use crate::styles::{self, StyleError};
use crate::templates::{Renderer, TemplateError, TemplateStore};
use std::fs;
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Post(#[from] PostError),
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error(transparent)]
    Style(#[from] StyleError),
    #[error(transparent)]
    Css(#[from] CssError),
    #[error(transparent)]
    Page(#[from] PageError),
}

#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Ignore the avatar index and cached derivatives.
    pub no_cache: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BuildSummary {
    pub output_dir: PathBuf,
    /// Written pages, in build order.
    pub pages: Vec<PathBuf>,
    /// Derivatives copied into `<output>/images/`.
    pub images: Vec<PathBuf>,
    /// How the avatar was obtained. `None` when disabled or failed.
    pub avatar: Option<CacheOutcome>,
}

/// Build the site rooted at `root` with the production reducer, HTTP source
/// and image backend.
pub fn build(root: &Path, options: &BuildOptions) -> Result<BuildSummary, BuildError> {
    let config = config::load_config(root)?;
    build_site(
        root,
        &config,
        options,
        &UsedCssReducer,
        HttpSource::new(),
        RustBackend::new(),
    )
}

pub fn build_site<R, S, B>(
    root: &Path,
    config: &SiteConfig,
    options: &BuildOptions,
    reducer: &R,
    source: S,
    backend: B,
) -> Result<BuildSummary, BuildError>
where
    R: CssReducer,
    S: AvatarSource + 'static,
    B: ImageBackend + Send + 'static,
{
    let paths = config.paths.resolve(root);

    let store = TemplateStore::load(&paths.templates)?;
    let renderer = Renderer::new(&store)?;
    let stylesheet = styles::build_stylesheet(&paths.stylesheet, &config.styles.code_theme)?;
    let targets = css::browser_targets(&config.styles.browsers)?;
    let posts = load_posts(&paths.posts)?;
    info!(
        posts = posts.len(),
        templates = store.len(),
        stylesheet_bytes = stylesheet.len(),
        "inputs loaded"
    );

    clean_output(&paths.output)?;
    let queue = build_queue(&config.title, &posts)?;

    let images = config.avatar.enabled.then(|| {
        let step = AvatarStep {
            source,
            backend,
            config: config.avatar.clone(),
            cache_dir: paths.cache.clone(),
            use_cache: !options.no_cache,
        };
        thread::spawn(move || step.run())
    });

    let pipeline = PagePipeline {
        renderer: &renderer,
        stylesheet: &stylesheet,
        reducer,
        targets,
    };
    let pages = drain_queue(queue, &pipeline, &paths.output)?;

    let images_dir = paths.output.join("images");
    clear_images(&images_dir)?;
    let (images, avatar) = match images {
        Some(handle) => finish_images(handle, &images_dir),
        None => (Vec::new(), None),
    };

    Ok(BuildSummary {
        output_dir: paths.output,
        pages,
        images,
        avatar,
    })
}

/// Create the output directory and delete top-level `.html` files left by a
/// previous run. Everything else is left alone.
fn clean_output(output_dir: &Path) -> std::io::Result<()> {
    fs::create_dir_all(output_dir)?;
    for entry in fs::read_dir(output_dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|e| e == "html") {
            fs::remove_file(&path)?;
        }
    }
    Ok(())
}

/// Create `<output>/images/` and empty it. It only ever holds avatar
/// derivatives, which are copied in fresh on every build.
fn clear_images(images_dir: &Path) -> std::io::Result<()> {
    fs::create_dir_all(images_dir)?;
    for entry in fs::read_dir(images_dir)? {
        let path = entry?.path();
        if path.is_file() {
            fs::remove_file(&path)?;
        }
    }
    Ok(())
}

fn finish_images(
    handle: JoinHandle<Result<AvatarOutcome, AvatarError>>,
    images_dir: &Path,
) -> (Vec<PathBuf>, Option<CacheOutcome>) {
    let outcome = match handle.join() {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(e)) => {
            warn!("avatar skipped: {e}");
            return (Vec::new(), None);
        }
        Err(_) => {
            warn!("avatar skipped: worker thread panicked");
            return (Vec::new(), None);
        }
    };
    match copy_derivatives(&outcome.files, images_dir) {
        Ok(images) => (images, Some(outcome.cache)),
        Err(e) => {
            warn!("avatar skipped: {e}");
            (Vec::new(), None)
        }
    }
}
