//! Content-addressed cache for downloaded avatar derivatives.
//!
//! Resizing and re-encoding the avatar is the only expensive part of a
//! build, and the source rarely changes. This module lets the avatar step
//! skip both the work and, most of the time, the download.
//!
//! # Layout
//!
//! ```text
//! tmp/
//! ├── avatar.json          # index: { version, url, hash, fetched_at }
//! ├── <hash>/              # one directory per distinct source image
//! │   ├── profile-64.jpg
//! │   └── profile-128.jpg
//! └── .<hash>.partial/     # staging while derivatives are being written
//! ```
//!
//! ## Cache keys
//!
//! The key is the SHA-256 of the fetched bytes, so a changed avatar gets a
//! new directory and an unchanged one keeps its old directory no matter how
//! often it is re-downloaded.
//!
//! A hash directory only ever appears through [`publish`], an atomic rename
//! of a fully written staging directory. A directory that exists is complete
//! for the sizes it was written with; [`entry_complete`] checks the sizes
//! currently configured.
//!
//! ## Skipping the fetch
//!
//! The [`AvatarIndex`] remembers which URL produced which hash and when. If it
//! names the configured URL, is younger than the configured max age and its
//! directory is complete, no request is made.
//!
//! ## Bypassing the cache
//!
//! Pass `--no-cache` to ignore both the index and existing hash directories.
//! Derivatives are regenerated and replace the old directory.

use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::imaging::square_file_name;

/// Name of the index file within the cache directory.
const INDEX_FILENAME: &str = "avatar.json";

/// Version of the index format. Bump this to invalidate existing indexes
/// when the format or key computation changes.
const INDEX_VERSION: u32 = 1;

/// Which URL was last fetched, what it hashed to, and when.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct AvatarIndex {
    pub version: u32,
    pub url: String,
    pub hash: String,
    pub fetched_at: DateTime<Utc>,
}

impl AvatarIndex {
    pub fn new(url: &str, hash: &str, fetched_at: DateTime<Utc>) -> Self {
        Self {
            version: INDEX_VERSION,
            url: url.to_string(),
            hash: hash.to_string(),
            fetched_at,
        }
    }

    /// Load from the cache directory. Returns `None` if the file doesn't
    /// exist or can't be parsed (version mismatch, corruption).
    pub fn load(cache_dir: &Path) -> Option<Self> {
        let content = fs::read_to_string(index_path(cache_dir)).ok()?;
        let index: Self = serde_json::from_str(&content).ok()?;
        (index.version == INDEX_VERSION).then_some(index)
    }

    /// Save to the cache directory.
    pub fn save(&self, cache_dir: &Path) -> io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(index_path(cache_dir), json)
    }

    /// True when this entry was fetched from `url` less than `max_age` ago.
    pub fn is_fresh(&self, url: &str, max_age: Duration, now: DateTime<Utc>) -> bool {
        self.url == url && now.signed_duration_since(self.fetched_at) < max_age
    }
}

/// Resolve the index path for a cache directory.
pub fn index_path(cache_dir: &Path) -> PathBuf {
    cache_dir.join(INDEX_FILENAME)
}

/// SHA-256 of `bytes`, as a lowercase hex string.
pub fn hash_bytes(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// The published directory for `hash`.
pub fn entry_dir(cache_dir: &Path, hash: &str) -> PathBuf {
    cache_dir.join(hash)
}

/// The staging directory derivatives for `hash` are written to first.
pub fn staging_dir(cache_dir: &Path, hash: &str) -> PathBuf {
    cache_dir.join(format!(".{hash}.partial"))
}

/// True when `dir` holds a derivative for every size in `sizes`.
pub fn entry_complete(dir: &Path, sizes: &[u32]) -> bool {
    dir.is_dir() && sizes.iter().all(|&size| dir.join(square_file_name(size)).is_file())
}

/// Atomically move a finished staging directory into place.
///
/// An existing entry is replaced; it is removed first because `rename` onto a
/// non-empty directory fails.
pub fn publish(staging: &Path, entry: &Path) -> io::Result<()> {
    if entry.exists() {
        fs::remove_dir_all(entry)?;
    }
    fs::rename(staging, entry)
}

/// How the avatar step obtained its derivatives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    /// Fresh index, no request made.
    Fresh,
    /// Downloaded, but the hash directory already existed.
    Reused,
    /// Downloaded and encoded.
    Generated,
}

impl fmt::Display for CacheOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheOutcome::Fresh => write!(f, "cached"),
            CacheOutcome::Reused => write!(f, "fetched, cached"),
            CacheOutcome::Generated => write!(f, "fetched, encoded"),
        }
    }
}
