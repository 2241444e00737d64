//! Parameter types for image operations.
//!
//! These describe *what* to produce. [`operations`](super::operations) decides
//! which derivatives a source needs; the [`backend`](super::backend) does the
//! pixel work.

use std::path::PathBuf;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(85)
    }
}

/// One square derivative: centre-cropped to `size`×`size`, JPEG at `quality`.
#[derive(Debug, Clone, PartialEq)]
pub struct SquareParams {
    pub output: PathBuf,
    pub size: u32,
    pub quality: Quality,
}
