//! High-level image operations.
//!
//! Raster helpers used by the compositor and the checker, plus the export
//! step that turns a finished raster into a file through the backend.
//!
//! ## Resampling
//!
//! [`resample_onto_canvas`] draws the source under a scale-then-translate
//! mapping into a square canvas. Downscales are split in two:
//!
//! ```text
//! source ──Lanczos3──▶ prefiltered (≈ final size) ──bicubic warp──▶ canvas
//! ```
//!
//! The bicubic kernel reads a 4×4 neighbourhood and gives up near an edge,
//! so the warp input is first padded with [`EDGE_PAD`] pixels of replicated
//! border. Every canvas pixel whose preimage lies inside the source keeps
//! source colour; past the padding the canvas is white.

use super::backend::{BackendError, ImageBackend};
use super::calculations::{prefilter_dimensions, residual_scale};
use super::params::{ExportFormat, ExportRaster, Quality};
use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

/// Border replicated around the warp input, enough for the bicubic
/// neighbourhood of the outermost source pixels.
pub const EDGE_PAD: u32 = 3;

/// Stem used when a requested output name sanitizes to nothing.
pub const DEFAULT_FILE_STEM: &str = "passport_photo";

// ============================================================================
// Raster preparation
// ============================================================================

/// Composite any alpha channel over white and drop it.
pub fn flatten_onto_white(img: &DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }
    let rgba = img.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let alpha = a as u16;
        let blend = |c: u8| ((c as u16 * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        Rgb([blend(r), blend(g), blend(b)])
    })
}

/// Push near-white pixels (every channel at or above `threshold`) to pure
/// white. Returns how many pixels changed.
pub fn whiten_background(img: &mut RgbImage, threshold: u8) -> usize {
    let mut changed = 0;
    for px in img.pixels_mut() {
        if px.0.iter().all(|&c| c >= threshold) && *px != WHITE {
            *px = WHITE;
            changed += 1;
        }
    }
    changed
}

/// Copy of `img` with `pad` pixels added on every side, each repeating the
/// nearest edge pixel.
pub fn pad_replicate(img: &RgbImage, pad: u32) -> RgbImage {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        return img.clone();
    }
    RgbImage::from_fn(w + 2 * pad, h + 2 * pad, |x, y| {
        let sx = x.saturating_sub(pad).min(w - 1);
        let sy = y.saturating_sub(pad).min(h - 1);
        *img.get_pixel(sx, sy)
    })
}

/// Draw `source` scaled by `scale` then shifted by `(translate_x,
/// translate_y)` into a `size`×`size` white canvas.
pub fn resample_onto_canvas(
    source: &RgbImage,
    scale: f32,
    translate_x: f32,
    translate_y: f32,
    size: u32,
) -> RgbImage {
    let dims = source.dimensions();
    let prefiltered;
    let (input, sx, sy) = match prefilter_dimensions(dims, scale) {
        Some((w, h)) => {
            prefiltered = imageops::resize(source, w, h, FilterType::Lanczos3);
            let (rx, ry) = residual_scale(dims, (w, h), scale);
            debug!(from = ?dims, to = ?(w, h), "Lanczos3 prefilter");
            (&prefiltered, rx, ry)
        }
        None => (source, scale, scale),
    };

    let padded = pad_replicate(input, EDGE_PAD);
    let pad = EDGE_PAD as f32;
    let projection = Projection::translate(translate_x - pad * sx, translate_y - pad * sy)
        * Projection::scale(sx, sy);
    let mut canvas = RgbImage::from_pixel(size, size, WHITE);
    warp_into(&padded, &projection, Interpolation::Bicubic, WHITE, &mut canvas);
    canvas
}

// ============================================================================
// Luma statistics
// ============================================================================

/// Rec. 601 luma of one pixel, 0–255.
pub fn luma(px: &Rgb<u8>) -> f32 {
    let [r, g, b] = px.0;
    0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LumaStats {
    pub mean: f32,
    pub std_dev: f32,
    pub samples: usize,
}

/// Mean and population standard deviation of luma inside a rectangle.
///
/// The rectangle is clipped to the image; `None` if nothing is left.
pub fn luma_stats(img: &RgbImage, x: i64, y: i64, width: u32, height: u32) -> Option<LumaStats> {
    let (w, h) = (img.width() as i64, img.height() as i64);
    let x0 = x.clamp(0, w);
    let y0 = y.clamp(0, h);
    let x1 = (x + width as i64).clamp(0, w);
    let y1 = (y + height as i64).clamp(0, h);
    if x0 >= x1 || y0 >= y1 {
        return None;
    }

    let mut sum = 0.0f64;
    let mut sum_sq = 0.0f64;
    for yy in y0..y1 {
        for xx in x0..x1 {
            let l = luma(img.get_pixel(xx as u32, yy as u32)) as f64;
            sum += l;
            sum_sq += l * l;
        }
    }
    let n = ((x1 - x0) * (y1 - y0)) as f64;
    let mean = sum / n;
    let variance = (sum_sq / n - mean * mean).max(0.0);
    Some(LumaStats {
        mean: mean as f32,
        std_dev: variance.sqrt() as f32,
        samples: n as usize,
    })
}

// ============================================================================
// Export
// ============================================================================

/// Make a user-chosen name safe to use as a file stem.
///
/// Path separators, parent references and control characters are removed;
/// an empty result falls back to [`DEFAULT_FILE_STEM`].
pub fn sanitize_file_stem(name: &str) -> String {
    let cleaned: String = name
        .replace("..", "")
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | ':') && !c.is_control())
        .collect();
    let trimmed = cleaned.trim().trim_matches('.');
    if trimmed.is_empty() {
        DEFAULT_FILE_STEM.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Output path for `stem` in `dir` with the format's extension.
pub fn export_path(dir: &Path, stem: &str, format: ExportFormat) -> PathBuf {
    dir.join(format!("{}.{}", sanitize_file_stem(stem), format.extension()))
}

/// Export settings shared by the photo and the sheet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExportConfig {
    pub format: ExportFormat,
    pub quality: Quality,
}

/// Write `image` at `dpi` to `dir/stem.ext`, creating `dir` if needed.
pub fn export(
    backend: &impl ImageBackend,
    image: &RgbImage,
    dpi: u32,
    dir: &Path,
    stem: &str,
    config: &ExportConfig,
) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = export_path(dir, stem, config.format);
    backend.save(
        &ExportRaster {
            image,
            dpi,
            format: config.format,
            quality: config.quality,
        },
        &path,
    )?;
    debug!(path = %path.display(), dpi, "Exported raster");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use image::{Rgba, RgbaImage};

    // =========================================================================
    // Raster preparation
    // =========================================================================

    #[test]
    fn flatten_transparent_pixels_become_white() {
        let mut rgba = RgbaImage::from_pixel(4, 4, Rgba([10, 20, 30, 0]));
        rgba.put_pixel(1, 1, Rgba([10, 20, 30, 255]));
        let flat = flatten_onto_white(&DynamicImage::ImageRgba8(rgba));

        assert_eq!(*flat.get_pixel(0, 0), WHITE);
        assert_eq!(*flat.get_pixel(1, 1), Rgb([10, 20, 30]));
    }

    #[test]
    fn flatten_half_alpha_blends() {
        let rgba = RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 128]));
        let flat = flatten_onto_white(&DynamicImage::ImageRgba8(rgba));
        let v = flat.get_pixel(0, 0).0[0];
        assert!((126..=128).contains(&v), "got {v}");
    }

    #[test]
    fn flatten_opaque_image_is_unchanged() {
        let rgb = RgbImage::from_pixel(3, 2, Rgb([1, 2, 3]));
        let flat = flatten_onto_white(&DynamicImage::ImageRgb8(rgb.clone()));
        assert_eq!(flat, rgb);
    }

    #[test]
    fn whiten_only_touches_bright_pixels() {
        let mut img = RgbImage::from_pixel(2, 1, Rgb([240, 245, 250]));
        img.put_pixel(1, 0, Rgb([240, 100, 250]));

        assert_eq!(whiten_background(&mut img, 235), 1);
        assert_eq!(*img.get_pixel(0, 0), WHITE);
        assert_eq!(*img.get_pixel(1, 0), Rgb([240, 100, 250]));
    }

    // =========================================================================
    // Resampling
    // =========================================================================

    #[test]
    fn identity_resample_copies_pixels() {
        let src = RgbImage::from_fn(16, 16, |x, y| Rgb([x as u8 * 10, y as u8 * 10, 50]));
        let out = resample_onto_canvas(&src, 1.0, 0.0, 0.0, 16);
        assert_eq!(out.get_pixel(7, 6), src.get_pixel(7, 6));
    }

    #[test]
    fn translation_outside_source_is_white() {
        let src = RgbImage::from_pixel(10, 10, Rgb([0, 0, 0]));
        let out = resample_onto_canvas(&src, 1.0, 20.0, 0.0, 40);
        assert_eq!(*out.get_pixel(5, 5), WHITE);
        assert_eq!(*out.get_pixel(25, 5), Rgb([0, 0, 0]));
        assert_eq!(out.dimensions(), (40, 40));
    }

    #[test]
    fn downscale_lands_source_block_at_scaled_position() {
        // black square 100..200 in a 400 px white source, half size, shifted 10
        let src = RgbImage::from_fn(400, 400, |x, y| {
            if (100..200).contains(&x) && (100..200).contains(&y) {
                Rgb([0, 0, 0])
            } else {
                WHITE
            }
        });
        let out = resample_onto_canvas(&src, 0.5, 10.0, 10.0, 200);
        // square now covers 60..110
        assert!(luma(out.get_pixel(85, 85)) < 20.0);
        assert!(luma(out.get_pixel(40, 40)) > 235.0);
        assert!(luma(out.get_pixel(130, 85)) > 235.0);
    }

    #[test]
    fn pad_replicate_repeats_edges() {
        let src = RgbImage::from_fn(2, 2, |x, y| Rgb([x as u8, y as u8, 9]));
        let padded = pad_replicate(&src, 3);
        assert_eq!(padded.dimensions(), (8, 8));
        assert_eq!(*padded.get_pixel(0, 0), Rgb([0, 0, 9]));
        assert_eq!(*padded.get_pixel(7, 7), Rgb([1, 1, 9]));
        assert_eq!(*padded.get_pixel(4, 3), Rgb([1, 0, 9]));
    }

    #[test]
    fn covered_edge_rows_and_columns_keep_source_colour() {
        let shirt = Rgb([70, 90, 140]);
        let src = RgbImage::from_pixel(100, 100, shirt);
        let out = resample_onto_canvas(&src, 1.0, 0.0, 0.0, 100);
        for (x, y) in [(0, 0), (99, 0), (0, 99), (99, 99), (50, 98), (98, 50)] {
            assert_eq!(*out.get_pixel(x, y), shirt, "pixel ({x}, {y})");
        }
    }

    #[test]
    fn downscaled_source_covers_canvas_edges() {
        // 1200 px scaled to exactly fill a 600 px canvas
        let shirt = Rgb([70, 90, 140]);
        let src = RgbImage::from_pixel(1200, 1200, shirt);
        let out = resample_onto_canvas(&src, 0.5, 0.0, 0.0, 600);
        for i in [0, 1, 2, 597, 598, 599] {
            assert_eq!(*out.get_pixel(i, 599), shirt, "bottom row, column {i}");
            assert_eq!(*out.get_pixel(599, i), shirt, "right column, row {i}");
            assert_eq!(*out.get_pixel(0, i), shirt, "left column, row {i}");
        }
    }

    #[test]
    fn resample_is_deterministic() {
        let src = RgbImage::from_fn(300, 300, |x, y| Rgb([(x ^ y) as u8, x as u8, y as u8]));
        let a = resample_onto_canvas(&src, 0.77, -5.5, 3.25, 100);
        let b = resample_onto_canvas(&src, 0.77, -5.5, 3.25, 100);
        assert_eq!(a, b);
    }

    // =========================================================================
    // Luma statistics
    // =========================================================================

    #[test]
    fn luma_of_white_and_black() {
        assert!((luma(&WHITE) - 255.0).abs() < 0.01);
        assert_eq!(luma(&Rgb([0, 0, 0])), 0.0);
    }

    #[test]
    fn stats_of_flat_region_have_zero_spread() {
        let img = RgbImage::from_pixel(10, 10, Rgb([100, 100, 100]));
        let s = luma_stats(&img, 2, 2, 4, 4).unwrap();
        assert!((s.mean - 100.0).abs() < 0.01);
        assert!(s.std_dev < 0.01);
        assert_eq!(s.samples, 16);
    }

    #[test]
    fn stats_of_half_black_half_white() {
        let img = RgbImage::from_fn(10, 2, |x, _| if x < 5 { Rgb([0, 0, 0]) } else { WHITE });
        let s = luma_stats(&img, 0, 0, 10, 2).unwrap();
        assert!((s.mean - 127.5).abs() < 0.1);
        assert!((s.std_dev - 127.5).abs() < 0.1);
    }

    #[test]
    fn stats_clip_rectangle_to_image() {
        let img = RgbImage::from_pixel(10, 10, WHITE);
        assert_eq!(luma_stats(&img, -5, -5, 10, 10).unwrap().samples, 25);
        assert_eq!(luma_stats(&img, 20, 0, 5, 5), None);
    }

    // =========================================================================
    // Export
    // =========================================================================

    #[test]
    fn sanitize_strips_traversal_and_separators() {
        assert_eq!(sanitize_file_stem("../../etc/passwd"), "etcpasswd");
        assert_eq!(sanitize_file_stem("a\\b/c"), "abc");
        assert_eq!(sanitize_file_stem("  my photo  "), "my photo");
    }

    #[test]
    fn sanitize_empty_falls_back_to_default() {
        assert_eq!(sanitize_file_stem(""), DEFAULT_FILE_STEM);
        assert_eq!(sanitize_file_stem("../"), DEFAULT_FILE_STEM);
        assert_eq!(sanitize_file_stem("..."), DEFAULT_FILE_STEM);
    }

    #[test]
    fn export_path_uses_format_extension() {
        assert_eq!(
            export_path(Path::new("/out"), "passport", ExportFormat::Jpeg),
            PathBuf::from("/out/passport.jpg")
        );
        assert_eq!(
            export_path(Path::new("/out"), "../x", ExportFormat::Png),
            PathBuf::from("/out/x.png")
        );
    }

    #[test]
    fn export_hands_raster_and_dpi_to_backend() {
        let tmp = tempfile::TempDir::new().unwrap();
        let backend = MockBackend::new();
        let image = RgbImage::new(600, 600);
        let config = ExportConfig {
            format: ExportFormat::Jpeg,
            quality: Quality::new(95),
        };

        let path = export(&backend, &image, 300, tmp.path(), "photo", &config).unwrap();

        assert_eq!(path, tmp.path().join("photo.jpg"));
        let ops = backend.get_operations();
        assert_eq!(
            ops,
            vec![RecordedOp::Save {
                output: path.to_string_lossy().to_string(),
                width: 600,
                height: 600,
                dpi: 300,
                format: ExportFormat::Jpeg,
                quality: 95,
            }]
        );
    }
}
