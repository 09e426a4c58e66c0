//! Parameter types for export.
//!
//! These structs describe *what* to write, not *how*. They are the interface
//! between [`operations`](super::operations) (which decides file names and
//! settings) and the [`backend`](super::backend) (which encodes). Keeping the
//! raster and its print metadata in one value is what lets tests swap in a
//! mock backend without touching any encoder.
//!
//! ## Types
//!
//! - [`Quality`]: JPEG quality (1–100, default 95). Clamped on construction.
//! - [`ExportFormat`]: JPEG or PNG.
//! - [`ExportRaster`]: borrowed raster + DPI + format + quality, ready to encode.

use image::RgbImage;
use serde::{Deserialize, Serialize};

/// Quality setting for lossy encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quality(pub u8);

impl Quality {
    pub fn new(value: u8) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(95)
    }
}

/// Output encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Jpeg,
    Png,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Jpeg => "jpg",
            ExportFormat::Png => "png",
        }
    }
}

/// A finished raster plus the print metadata it must carry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExportRaster<'a> {
    pub image: &'a RgbImage,
    pub dpi: u32,
    pub format: ExportFormat,
    pub quality: Quality,
}
