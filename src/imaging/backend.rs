//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait covers the two operations the avatar step needs:
//! identify and square. Sources are in-memory bytes because they come straight
//! off the network.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend).

use super::params::SquareParams;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Trait for image processing backends.
///
/// `Sync` because squares for several sizes are written in parallel.
pub trait ImageBackend: Sync {
    /// Decode enough of `source` to report its dimensions.
    fn identify(&self, source: &[u8]) -> Result<Dimensions, BackendError>;

    /// Centre-crop `source` to a square, resize it and write a JPEG.
    fn square(&self, source: &[u8], params: &SquareParams) -> Result<(), BackendError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::imaging::Quality;
    use std::sync::Mutex;

    /// Mock backend that records operations instead of decoding.
    /// Uses Mutex (not RefCell) so it is Sync and works with rayon's par_iter.
    ///
    /// `square` writes a small placeholder file so callers can copy and
    /// publish the output. Sizes listed in `fail_sizes` fail instead.
    #[derive(Default)]
    pub struct MockBackend {
        pub dimensions: Option<Dimensions>,
        pub fail_sizes: Vec<u32>,
        pub operations: Mutex<Vec<RecordedOp>>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Identify(usize),
        Square {
            output: String,
            size: u32,
            quality: u32,
        },
    }

    impl MockBackend {
        pub fn new() -> Self {
            Self {
                dimensions: Some(Dimensions {
                    width: 512,
                    height: 512,
                }),
                ..Self::default()
            }
        }

        pub fn failing_on(sizes: &[u32]) -> Self {
            Self {
                fail_sizes: sizes.to_vec(),
                ..Self::new()
            }
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }
    }

    impl ImageBackend for MockBackend {
        fn identify(&self, source: &[u8]) -> Result<Dimensions, BackendError> {
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::Identify(source.len()));
            self.dimensions
                .ok_or_else(|| BackendError::ProcessingFailed("No mock dimensions".to_string()))
        }

        fn square(&self, _source: &[u8], params: &SquareParams) -> Result<(), BackendError> {
            self.operations.lock().unwrap().push(RecordedOp::Square {
                output: params.output.to_string_lossy().to_string(),
                size: params.size,
                quality: params.quality.value(),
            });
            if self.fail_sizes.contains(&params.size) {
                return Err(BackendError::ProcessingFailed(format!(
                    "mock failure at {}",
                    params.size
                )));
            }
            std::fs::write(&params.output, format!("square-{}", params.size))?;
            Ok(())
        }
    }

    #[test]
    fn mock_records_identify() {
        let backend = MockBackend::new();
        let dims = backend.identify(b"abc").unwrap();
        assert_eq!(dims.width, 512);
        assert_eq!(backend.get_operations(), vec![RecordedOp::Identify(3)]);
    }

    #[test]
    fn mock_records_square_and_writes_placeholder() {
        let tmp = tempfile::TempDir::new().unwrap();
        let output = tmp.path().join("profile-64.jpg");
        let backend = MockBackend::new();

        backend
            .square(
                b"img",
                &SquareParams {
                    output: output.clone(),
                    size: 64,
                    quality: Quality::new(85),
                },
            )
            .unwrap();

        assert!(output.exists());
        assert!(matches!(
            &backend.get_operations()[0],
            RecordedOp::Square {
                size: 64,
                quality: 85,
                ..
            }
        ));
    }

    #[test]
    fn mock_fails_on_requested_size() {
        let tmp = tempfile::TempDir::new().unwrap();
        let backend = MockBackend::failing_on(&[128]);
        let result = backend.square(
            b"img",
            &SquareParams {
                output: tmp.path().join("profile-128.jpg"),
                size: 128,
                quality: Quality::default(),
            },
        );
        assert!(result.is_err());
    }
}
