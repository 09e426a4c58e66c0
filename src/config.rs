//! Configuration module.
//!
//! Handles loading, validating, and merging `config.toml` files. Stock
//! defaults are the base layer; a `config.toml` in the working directory
//! (or the file passed with `--config`) is merged on top.
//!
//! ## Configuration Options
//!
//! ```toml
//! # every key is optional; these are the defaults
//!
//! [photo]
//! variant = "india"          # or "united-states"
//!
//! [measurement]
//! crown_ratio = 0.2          # Share of forehead-to-chin added above the forehead
//!
//! [placement]
//! policy = "head-height-first"  # or "split-difference"
//!
//! [background]
//! # whiten_threshold = 235   # Channels >= this become pure white (off when absent)
//!
//! [compliance]
//! attire_band_px = 80
//! attire_min_luma = 220.0
//! attire_max_std = 20.0
//! shadow_max_std = 60.0
//!
//! [sheet]
//! copies = 6
//! guides = true
//! width_in = 6.0
//! height_in = 4.0
//! gutter_px = 0
//! margin_px = 0
//! guide_px = 2
//!
//! [export]
//! format = "jpeg"            # or "png"
//! quality = 95
//! file_stem = "passport_photo"
//! max_upload_bytes = 10485760
//!
//! [processing]
//! max_processes = 4          # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse; override just the values you want:
//!
//! ```toml
//! [photo]
//! variant = "united-states"
//! ```
//!
//! A misspelled key is a load error, not a silently ignored setting.

use crate::compliance::ComplianceConfig;
use crate::compositor::BackgroundOptions;
use crate::imaging::{DEFAULT_MAX_UPLOAD_BYTES, ExportConfig, ExportFormat, Quality};
use crate::measure::CROWN_EXTENSION_RATIO;
use crate::normalize::PolicyKind;
use crate::sheet::SheetLayout;
use crate::target::{PhotoVariant, TargetSpec};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

pub const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Application configuration loaded from `config.toml`.
///
/// Every field falls back to the stock value; a `config.toml` lists only
/// what it changes. Unrecognized keys are an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Which national requirements to meet.
    pub photo: PhotoConfig,
    /// Landmark-to-measurement calibration.
    pub measurement: MeasurementConfig,
    /// Head-height versus eye-line trade-off.
    pub placement: PlacementConfig,
    /// Source cleanup before resampling.
    pub background: BackgroundOptions,
    /// Advisory warning thresholds.
    pub compliance: ComplianceConfig,
    /// Print sheet layout.
    pub sheet: SheetConfig,
    /// Output encoding and upload limits.
    pub export: ExportSettings,
    /// Batch parallelism.
    pub processing: ProcessingConfig,
}

impl AppConfig {
    /// Range-check values that deserialize fine but cannot produce a photo.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ratio = self.measurement.crown_ratio;
        if !(0.0..1.0).contains(&ratio) {
            return Err(ConfigError::Validation(
                "measurement.crown_ratio must be in [0, 1)".into(),
            ));
        }
        if self.export.quality == 0 || self.export.quality > 100 {
            return Err(ConfigError::Validation(
                "export.quality must be 1-100".into(),
            ));
        }
        if self.export.max_upload_bytes == 0 {
            return Err(ConfigError::Validation(
                "export.max_upload_bytes must be non-zero".into(),
            ));
        }
        if self.background.whiten_threshold.is_some_and(|t| t < 128) {
            return Err(ConfigError::Validation(
                "background.whiten_threshold must be at least 128".into(),
            ));
        }
        if self.compliance.attire_band_px == 0 {
            return Err(ConfigError::Validation(
                "compliance.attire_band_px must be non-zero".into(),
            ));
        }
        if self.sheet.width_in <= 0.0 || self.sheet.height_in <= 0.0 {
            return Err(ConfigError::Validation(
                "sheet.width_in and sheet.height_in must be positive".into(),
            ));
        }
        if self.sheet.copies == 0 {
            return Err(ConfigError::Validation(
                "sheet.copies must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn spec(&self) -> TargetSpec {
        self.photo.variant.spec()
    }

    pub fn export_config(&self) -> ExportConfig {
        ExportConfig {
            format: self.export.format,
            quality: Quality::new(self.export.quality),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PhotoConfig {
    pub variant: PhotoVariant,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MeasurementConfig {
    /// Share of the forehead-to-chin distance added above the forehead
    /// landmark to estimate the crown.
    pub crown_ratio: f32,
}

impl Default for MeasurementConfig {
    fn default() -> Self {
        Self {
            crown_ratio: CROWN_EXTENSION_RATIO,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlacementConfig {
    pub policy: PolicyKind,
}

/// Print sheet settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SheetConfig {
    /// Copies placed when `--copies` is not given.
    pub copies: u32,
    /// Draw cut guides around each copy.
    pub guides: bool,
    pub width_in: f32,
    pub height_in: f32,
    /// Below `2 * guide_px`, guides overlap the copies' outer pixels.
    pub gutter_px: u32,
    pub margin_px: u32,
    pub guide_px: u32,
}

impl Default for SheetConfig {
    fn default() -> Self {
        let layout = SheetLayout::default();
        Self {
            copies: 6,
            guides: true,
            width_in: layout.width_in,
            height_in: layout.height_in,
            gutter_px: layout.gutter_px,
            margin_px: layout.margin_px,
            guide_px: layout.guide_px,
        }
    }
}

impl SheetConfig {
    pub fn layout(&self) -> SheetLayout {
        SheetLayout {
            width_in: self.width_in,
            height_in: self.height_in,
            gutter_px: self.gutter_px,
            margin_px: self.margin_px,
            guide_px: self.guide_px,
        }
    }
}

/// Output encoding and upload limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportSettings {
    pub format: ExportFormat,
    /// JPEG quality (1-100). Ignored for PNG.
    pub quality: u8,
    /// Output name when `--name` is not given; sanitized before use.
    pub file_stem: String,
    /// Uploads larger than this are rejected before decoding.
    pub max_upload_bytes: u64,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            format: ExportFormat::Jpeg,
            quality: Quality::default().value(),
            file_stem: crate::imaging::DEFAULT_FILE_STEM.to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

/// Batch parallelism.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel photo workers in `batch`.
    /// Unset means one worker per core.
    /// Requests above the core count are clamped.
    pub max_processes: Option<usize>,
}

/// Number of rayon workers for batch processing.
///
/// - `None`: every available core
/// - `Some(n)`: `min(n, cores)`, never more than the machine has
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Loading and merging
// =============================================================================

/// `AppConfig::default()` as a TOML table.
///
/// User files are merged onto this table, so it must list every key the
/// deserializer accepts.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(AppConfig::default()).expect("default config must serialize")
}

/// Deep-merge two TOML values, `overlay` taking precedence.
///
/// - Nested tables merge key by key, `overlay` winning on conflicts.
/// - A scalar or array in `overlay` replaces whatever `base` held.
/// - Keys only present in `base` survive untouched.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a TOML file as a raw value.
///
/// A missing file is `Ok(None)`; a file that does not parse is an error.
pub fn load_raw_config_file(config_path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Read `config.toml` from `dir` without deserializing it.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    load_raw_config_file(&dir.join(CONFIG_FILE_NAME))
}

/// Apply an optional user table over `base`, then deserialize and range-check.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<AppConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: AppConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Resolve the effective config for `dir`.
///
/// Stock defaults first, then `dir/config.toml` when it exists. Unknown keys
/// and out-of-range values are errors.
pub fn load_config(dir: &Path) -> Result<AppConfig, ConfigError> {
    resolve_config(stock_defaults_value(), load_raw_config(dir)?)
}

/// Load config from an explicit file, which must exist.
pub fn load_config_file(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let overlay: toml::Value = toml::from_str(&content)?;
    resolve_config(stock_defaults_value(), Some(overlay))
}

/// The stock `config.toml`, every key present and commented.
///
/// Printed by `passport-photo gen-config`.
pub fn stock_config_toml() -> &'static str {
    r##"# Passport Photo Configuration
# ============================
# Every key is optional; delete the ones you leave at their defaults.
# The values below are the built-in defaults.
#
# Place this file as config.toml in the directory you run from, or pass
# --config <path>. Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Photo requirements
# ---------------------------------------------------------------------------
[photo]
# "india" (2x2 in, head 25-35 mm, eyes 28-34 mm from the bottom)
# "united-states" (2x2 in, head 25.4-34.9 mm, eyes 28.6-34.9 mm)
variant = "india"

# ---------------------------------------------------------------------------
# Measurement
# ---------------------------------------------------------------------------
[measurement]
# The face mesh ends at the upper forehead. The crown is estimated this far
# above the forehead landmark, as a share of the forehead-to-chin distance.
crown_ratio = 0.2

# ---------------------------------------------------------------------------
# Placement
# ---------------------------------------------------------------------------
[placement]
# "head-height-first": scale for the target head height; the eye line is
#   placed as close to its band as possible and flagged if it misses.
# "split-difference": compromise between head height and eye band when
#   they cannot both be met.
policy = "head-height-first"

# ---------------------------------------------------------------------------
# Background
# ---------------------------------------------------------------------------
[background]
# Pixels whose channels are all at or above this value become pure white.
# Omit to keep the background as photographed.
# whiten_threshold = 235

# ---------------------------------------------------------------------------
# Compliance warnings (advisory only)
# ---------------------------------------------------------------------------
[compliance]
# Bottom rows of the photo checked for white clothing.
attire_band_px = 80
# Mean brightness (0-255) above which the band counts as white...
attire_min_luma = 220.0
# ...when it is also this uniform (brightness std-dev below).
attire_max_std = 20.0
# Brightness spread across the face above which shadows are suspected.
shadow_max_std = 60.0

# ---------------------------------------------------------------------------
# Print sheet
# ---------------------------------------------------------------------------
[sheet]
# Copies when --copies is not given.
copies = 6
# Draw thin cut guides around each copy.
guides = true
# Sheet size in inches (6x4 in = 1800x1200 px at 300 DPI).
width_in = 6.0
height_in = 4.0
# Pixels between copies and around the sheet edge. With a gutter narrower
# than two guides, cut guides are drawn over the edge of each copy; six
# copies on 6x4 in leave no room for one.
gutter_px = 0
margin_px = 0
# Cut guide thickness in pixels.
guide_px = 2

# ---------------------------------------------------------------------------
# Export
# ---------------------------------------------------------------------------
[export]
# "jpeg" (written with 300 DPI density) or "png".
format = "jpeg"
# JPEG quality (1 = worst, 100 = best).
quality = 95
# Output name when --name is not given.
file_stem = "passport_photo"
# Uploads larger than this many bytes are rejected (10 MB).
max_upload_bytes = 10485760

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel workers for the batch command.
# Leave unset to use one worker per CPU core.
# max_processes = 4
"##
}
