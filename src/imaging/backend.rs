//! Image I/O backend trait and shared types.
//!
//! The [`ImageBackend`] trait covers the two boundaries of a run: reading an
//! uploaded photo (validated load) and writing a finished raster
//! with its print metadata. The core never encodes or decodes itself.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the pure Rust
//! decoders and encoders of the `image` crate.

use super::params::ExportRaster;
use image::DynamicImage;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unsupported image format: {0} (use JPEG or PNG)")]
    UnsupportedFormat(String),
    #[error("File {path} is {size} bytes, over the {limit} byte limit")]
    FileTooLarge { path: PathBuf, size: u64, limit: u64 },
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Trait for image I/O backends.
///
/// `Sync` so one backend can serve a parallel batch.
pub trait ImageBackend: Sync {
    /// Validate and decode an uploaded photo.
    fn load(&self, path: &Path) -> Result<DynamicImage, BackendError>;

    /// Encode `raster` to `path` with its DPI metadata.
    fn save(&self, raster: &ExportRaster<'_>, path: &Path) -> Result<(), BackendError>;
}
