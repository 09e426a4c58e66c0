//! Pure Rust image I/O backend.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG) | `image::ImageReader` with content sniffing |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder`, JFIF density in DPI |
//! | Encode → PNG | `png::Encoder`, `pHYs` chunk in pixels per meter |
//!
//! Uploads are checked before decoding: the extension must be one of
//! [`supported_input_extensions`], the file must be at most
//! `max_upload_bytes`, and the sniffed content must really be JPEG or PNG.
//! A `.png` holding a GIF is rejected even though the name looks fine.

use super::backend::{BackendError, ImageBackend};
use super::params::{ExportFormat, ExportRaster};
use image::codecs::jpeg::{JpegEncoder, PixelDensity};
use image::{DynamicImage, ImageFormat, ImageReader};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::debug;

/// Upload ceiling applied when nothing else is configured.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

const INPUT_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Extensions accepted as photo uploads.
pub fn supported_input_extensions() -> &'static [&'static str] {
    INPUT_EXTENSIONS
}

/// Whether `path` has one of the [`supported_input_extensions`].
pub fn is_supported_input(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| {
            INPUT_EXTENSIONS
                .iter()
                .any(|ext| ext.eq_ignore_ascii_case(e))
        })
}

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
#[derive(Debug, Clone, Copy)]
pub struct RustBackend {
    pub max_upload_bytes: u64,
}

impl RustBackend {
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_MAX_UPLOAD_BYTES)
    }

    pub fn with_limit(max_upload_bytes: u64) -> Self {
        Self { max_upload_bytes }
    }

    fn check_upload(&self, path: &Path) -> Result<(), BackendError> {
        if !is_supported_input(path) {
            let ext = path
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("(none)");
            return Err(BackendError::UnsupportedFormat(ext.to_string()));
        }
        let size = std::fs::metadata(path)?.len();
        if size > self.max_upload_bytes {
            return Err(BackendError::FileTooLarge {
                path: path.to_path_buf(),
                size,
                limit: self.max_upload_bytes,
            });
        }
        Ok(())
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn save_jpeg(raster: &ExportRaster<'_>, path: &Path) -> Result<(), BackendError> {
    let density = u16::try_from(raster.dpi).map_err(|_| {
        BackendError::ProcessingFailed(format!("DPI {} does not fit JFIF", raster.dpi))
    })?;
    let mut writer = BufWriter::new(File::create(path)?);
    let mut encoder = JpegEncoder::new_with_quality(&mut writer, raster.quality.value());
    encoder.set_pixel_density(PixelDensity::dpi(density));
    encoder
        .encode_image(raster.image)
        .map_err(|e| BackendError::ProcessingFailed(format!("JPEG encode failed: {e}")))
}

/// PNG stores density as pixels per meter.
pub fn dots_per_meter(dpi: u32) -> u32 {
    (dpi as f64 / 0.0254).round() as u32
}

/// The `image` PNG encoder never writes `pHYs`, so go through `png` directly.
fn save_png(raster: &ExportRaster<'_>, path: &Path) -> Result<(), BackendError> {
    let img = raster.image;
    let ppm = dots_per_meter(raster.dpi);
    let writer = BufWriter::new(File::create(path)?);
    let mut encoder = png::Encoder::new(writer, img.width(), img.height());
    encoder.set_color(png::ColorType::Rgb);
    encoder.set_depth(png::BitDepth::Eight);
    encoder.set_pixel_dims(Some(png::PixelDimensions {
        xppu: ppm,
        yppu: ppm,
        unit: png::Unit::Meter,
    }));
    let encode_failed = |e: png::EncodingError| {
        BackendError::ProcessingFailed(format!("PNG encode failed: {e}"))
    };
    let mut writer = encoder.write_header().map_err(encode_failed)?;
    writer.write_image_data(img.as_raw()).map_err(encode_failed)?;
    writer.finish().map_err(encode_failed)
}

impl ImageBackend for RustBackend {
    fn load(&self, path: &Path) -> Result<DynamicImage, BackendError> {
        self.check_upload(path)?;

        let reader = ImageReader::open(path)?.with_guessed_format()?;
        match reader.format() {
            Some(ImageFormat::Jpeg | ImageFormat::Png) => {}
            Some(other) => {
                return Err(BackendError::UnsupportedFormat(format!("{other:?}")));
            }
            None => return Err(BackendError::UnsupportedFormat("unknown".to_string())),
        }

        let img = reader.decode().map_err(|e| {
            BackendError::ProcessingFailed(format!("Failed to decode {}: {}", path.display(), e))
        })?;
        debug!(
            path = %path.display(),
            width = img.width(),
            height = img.height(),
            "Decoded upload"
        );
        Ok(img)
    }

    fn save(&self, raster: &ExportRaster<'_>, path: &Path) -> Result<(), BackendError> {
        match raster.format {
            ExportFormat::Jpeg => save_jpeg(raster, path),
            ExportFormat::Png => save_png(raster, path),
        }
    }
}
