//! High-level image operations.
//!
//! These take configuration, compute parameters, and call the backend.

use super::backend::{BackendError, ImageBackend};
use super::params::{Quality, SquareParams};
use rayon::prelude::*;
use std::path::{Path, PathBuf};

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// File name of the square derivative for `size`.
pub fn square_file_name(size: u32) -> String {
    format!("profile-{size}.jpg")
}

/// Plan every square derivative without executing anything.
pub fn plan_squares(output_dir: &Path, sizes: &[u32], quality: Quality) -> Vec<SquareParams> {
    sizes
        .iter()
        .map(|&size| SquareParams {
            output: output_dir.join(square_file_name(size)),
            size,
            quality,
        })
        .collect()
}

/// Write one square JPEG per size into `output_dir`, in parallel.
///
/// The source is identified first so undecodable input fails once instead of
/// once per size. Any failed size fails the whole call.
pub fn create_squares(
    backend: &impl ImageBackend,
    source: &[u8],
    output_dir: &Path,
    sizes: &[u32],
    quality: Quality,
) -> Result<Vec<PathBuf>> {
    backend.identify(source)?;
    plan_squares(output_dir, sizes, quality)
        .into_par_iter()
        .map(|params| -> Result<PathBuf> {
            backend.square(source, &params)?;
            Ok(params.output)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use tempfile::TempDir;

    #[test]
    fn plan_squares_names_by_size() {
        let plan = plan_squares(Path::new("/cache/abc"), &[64, 128], Quality::new(85));
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].output, Path::new("/cache/abc/profile-64.jpg"));
        assert_eq!(plan[1].size, 128);
        assert_eq!(plan[1].quality.value(), 85);
    }

    #[test]
    fn create_squares_runs_every_size() {
        let tmp = TempDir::new().unwrap();
        let backend = MockBackend::new();

        let mut written =
            create_squares(&backend, b"img", tmp.path(), &[64, 128], Quality::new(85)).unwrap();
        written.sort();

        assert_eq!(
            written,
            vec![tmp.path().join("profile-128.jpg"), tmp.path().join("profile-64.jpg")]
        );
        let ops = backend.get_operations();
        assert_eq!(ops[0], RecordedOp::Identify(3));
        assert_eq!(
            ops.iter()
                .filter(|op| matches!(op, RecordedOp::Square { .. }))
                .count(),
            2
        );
    }

    #[test]
    fn create_squares_fails_when_any_size_fails() {
        let tmp = TempDir::new().unwrap();
        let backend = MockBackend::failing_on(&[128]);
        let result = create_squares(&backend, b"img", tmp.path(), &[64, 128], Quality::default());
        assert!(result.is_err());
    }

    #[test]
    fn create_squares_stops_on_identify_failure() {
        let tmp = TempDir::new().unwrap();
        let backend = MockBackend {
            dimensions: None,
            ..MockBackend::default()
        };
        assert!(create_squares(&backend, b"img", tmp.path(), &[64], Quality::default()).is_err());
        assert_eq!(backend.get_operations().len(), 1);
    }
}
