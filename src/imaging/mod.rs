//! Image processing, pure Rust.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Load** | `image::ImageReader` (JPEG, PNG) behind size and format checks |
//! | **Prefilter** | `image::imageops::resize` with `Lanczos3` |
//! | **Warp** | `imageproc::geometric_transformations::warp_into`, bicubic |
//! | **Save** | `JpegEncoder` with DPI density, `png::Encoder` with `pHYs` |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for prefilter and sheet grid math (unit testable)
//! - **Parameters**: Data structures describing an export
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: Raster helpers and the export step, combining calculations + backend

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, ImageBackend};
pub use calculations::{
    GridLayout, grid_capacity, plan_grid, prefilter_dimensions, residual_scale,
};
pub use operations::{
    DEFAULT_FILE_STEM, ExportConfig, LumaStats, WHITE, export, export_path, flatten_onto_white,
    luma, luma_stats, resample_onto_canvas, sanitize_file_stem,
    whiten_background,
};
pub use params::{ExportFormat, ExportRaster, Quality};
pub use rust_backend::{
    DEFAULT_MAX_UPLOAD_BYTES, RustBackend, is_supported_input, supported_input_extensions,
};
