//! Pure Rust image processing backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, WebP) | `image::load_from_memory` |
//! | Square crop + resize | `image::DynamicImage::resize_to_fill` with `Lanczos3` |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder::new_with_quality` |

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::params::SquareParams;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};
use std::io::Cursor;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn decode(source: &[u8]) -> Result<DynamicImage, BackendError> {
    image::load_from_memory(source)
        .map_err(|e| BackendError::ProcessingFailed(format!("Failed to decode image: {e}")))
}

/// Encode as baseline JPEG. JPEG has no alpha, so the image is flattened to RGB.
fn save_jpeg(img: &DynamicImage, params: &SquareParams) -> Result<(), BackendError> {
    let file = std::fs::File::create(&params.output)?;
    let writer = std::io::BufWriter::new(file);
    let encoder = JpegEncoder::new_with_quality(writer, params.quality.value() as u8);
    DynamicImage::ImageRgb8(img.to_rgb8())
        .write_with_encoder(encoder)
        .map_err(|e| {
            BackendError::ProcessingFailed(format!(
                "JPEG encode failed for {}: {e}",
                params.output.display()
            ))
        })
}

impl ImageBackend for RustBackend {
    fn identify(&self, source: &[u8]) -> Result<Dimensions, BackendError> {
        let (width, height) = ImageReader::new(Cursor::new(source))
            .with_guessed_format()?
            .into_dimensions()
            .map_err(|e| {
                BackendError::ProcessingFailed(format!("Failed to read dimensions: {e}"))
            })?;
        Ok(Dimensions { width, height })
    }

    fn square(&self, source: &[u8], params: &SquareParams) -> Result<(), BackendError> {
        let img = decode(source)?;
        let filled = img.resize_to_fill(params.size, params.size, FilterType::Lanczos3);
        save_jpeg(&filled, params)
    }
}
