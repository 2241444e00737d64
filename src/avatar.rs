//! Avatar download and derivative generation.
//!
//! Runs once per build on its own thread, next to page building:
//!
//! ```text
//! index fresh? ──yes──▶ reuse <cache>/<hash>/
//!      │ no
//!      ▼
//! fetch URL ─▶ sha256 ─▶ <cache>/<hash>/ complete? ──yes──▶ reuse
//!                                │ no
//!                                ▼
//!              write sizes into .<hash>.partial/ (rayon) ─▶ rename
//! ```
//!
//! Every failure here is isolated. The driver logs it and the site is built
//! without images.

use crate::cache::{self, AvatarIndex, CacheOutcome};
use crate::config::AvatarConfig;
use crate::imaging::{BackendError, ImageBackend, Quality, create_squares, plan_squares};
use chrono::{Duration, Utc};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum AvatarError {
    #[error("failed to fetch {url}: {message}")]
    Fetch { url: String, message: String },
    #[error("fetching {url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("image processing failed: {0}")]
    Backend(#[from] BackendError),
}

/// Where avatar bytes come from.
pub trait AvatarSource: Send {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, AvatarError>;
}

/// Plain HTTPS GET.
pub struct HttpSource {
    user_agent: String,
}

impl HttpSource {
    pub fn new() -> Self {
        Self {
            user_agent: format!("inkpress/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Default for HttpSource {
    fn default() -> Self {
        Self::new()
    }
}

impl AvatarSource for HttpSource {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, AvatarError> {
        let response = ureq::get(url)
            .set("User-Agent", &self.user_agent)
            .call()
            .map_err(|e| match e {
                ureq::Error::Status(status, _) => AvatarError::Status {
                    url: url.to_string(),
                    status,
                },
                ureq::Error::Transport(transport) => AvatarError::Fetch {
                    url: url.to_string(),
                    message: transport.to_string(),
                },
            })?;

        let mut bytes = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut bytes)
            .map_err(|e| AvatarError::Fetch {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        Ok(bytes)
    }
}

/// The derivatives available for this build.
#[derive(Debug, Clone, PartialEq)]
pub struct AvatarOutcome {
    pub hash: String,
    pub files: Vec<PathBuf>,
    pub cache: CacheOutcome,
}

/// One run of the avatar step. Owns everything it needs so it can be moved
/// onto a worker thread.
pub struct AvatarStep<S, B> {
    pub source: S,
    pub backend: B,
    pub config: AvatarConfig,
    pub cache_dir: PathBuf,
    pub use_cache: bool,
}

impl<S: AvatarSource, B: ImageBackend> AvatarStep<S, B> {
    pub fn run(&self) -> Result<AvatarOutcome, AvatarError> {
        fs::create_dir_all(&self.cache_dir)?;

        if let Some(hash) = self.fresh_hash() {
            debug!(hash = %hash, "avatar index is fresh, skipping fetch");
            return Ok(self.outcome(hash, CacheOutcome::Fresh));
        }

        let bytes = self.source.fetch(&self.config.url)?;
        let hash = cache::hash_bytes(&bytes);
        let entry = cache::entry_dir(&self.cache_dir, &hash);

        let outcome = if self.use_cache && cache::entry_complete(&entry, &self.config.sizes) {
            debug!(hash = %hash, "avatar unchanged, reusing derivatives");
            CacheOutcome::Reused
        } else {
            self.generate(&bytes, &hash, &entry)?;
            CacheOutcome::Generated
        };

        AvatarIndex::new(&self.config.url, &hash, Utc::now()).save(&self.cache_dir)?;
        Ok(self.outcome(hash, outcome))
    }

    fn fresh_hash(&self) -> Option<String> {
        if !self.use_cache {
            return None;
        }
        let index = AvatarIndex::load(&self.cache_dir)?;
        let max_age = i64::try_from(self.config.max_age_hours)
            .ok()
            .and_then(Duration::try_hours)
            .unwrap_or(Duration::MAX);
        let entry = cache::entry_dir(&self.cache_dir, &index.hash);
        (index.is_fresh(&self.config.url, max_age, Utc::now())
            && cache::entry_complete(&entry, &self.config.sizes))
        .then_some(index.hash)
    }

    fn generate(&self, bytes: &[u8], hash: &str, entry: &Path) -> Result<(), AvatarError> {
        let staging = cache::staging_dir(&self.cache_dir, hash);
        if staging.exists() {
            fs::remove_dir_all(&staging)?;
        }
        fs::create_dir_all(&staging)?;

        let quality = Quality::new(self.config.quality);
        if let Err(e) = create_squares(&self.backend, bytes, &staging, &self.config.sizes, quality) {
            let _ = fs::remove_dir_all(&staging);
            return Err(e.into());
        }
        debug!(hash = %hash, sizes = ?self.config.sizes, "publishing avatar derivatives");
        cache::publish(&staging, entry)?;
        Ok(())
    }

    fn outcome(&self, hash: String, cache: CacheOutcome) -> AvatarOutcome {
        let entry = cache::entry_dir(&self.cache_dir, &hash);
        let files = plan_squares(&entry, &self.config.sizes, Quality::new(self.config.quality))
            .into_iter()
            .map(|p| p.output)
            .collect();
        AvatarOutcome { hash, files, cache }
    }
}

/// Copy derivatives into `images_dir`, returning the copied paths.
pub fn copy_derivatives(files: &[PathBuf], images_dir: &Path) -> Result<Vec<PathBuf>, AvatarError> {
    fs::create_dir_all(images_dir)?;
    let mut copied = Vec::with_capacity(files.len());
    for file in files {
        let Some(name) = file.file_name() else {
            continue;
        };
        let dest = images_dir.join(name);
        fs::copy(file, &dest)?;
        copied.push(dest);
    }
    Ok(copied)
}
