//! Physical photo requirements.
//!
//! A [`TargetSpec`] is the immutable set of constants a finished photo must
//! satisfy: canvas size, print resolution, allowed head height and the band
//! the eye line has to sit in. Nothing here is per-image state.
//!
//! National requirements are modeled as a [`PhotoVariant`] tag that selects
//! one of the built-in specs, so adding a new document type is one enum arm
//! and one constructor.
//!
//! ```text
//! India (default)   2 x 2 in @ 300 DPI   head 25–35 mm (target 26)   eyes 28–34 mm
//! United States     2 x 2 in @ 300 DPI   head 25–35 mm (target 30)   eyes 28–35 mm
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

pub const MM_PER_INCH: f32 = 25.4;

/// Physical requirements for one kind of photo.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetSpec {
    /// Side of the square canvas in inches.
    pub canvas_in: f32,
    pub dpi: u32,
    /// Allowed head height, crown to chin.
    pub head_min_mm: f32,
    pub head_max_mm: f32,
    /// Head height the normalizer scales to.
    pub head_target_mm: f32,
    /// Allowed eye-line height, measured from the bottom edge.
    pub eye_min_mm: f32,
    pub eye_max_mm: f32,
}

impl TargetSpec {
    pub const fn india() -> Self {
        Self {
            canvas_in: 2.0,
            dpi: 300,
            head_min_mm: 25.0,
            head_max_mm: 35.0,
            head_target_mm: 26.0,
            eye_min_mm: 28.0,
            eye_max_mm: 34.0,
        }
    }

    /// 1 to 1 3/8 in head, eyes 1 1/8 to 1 3/8 in from the bottom.
    pub const fn united_states() -> Self {
        Self {
            canvas_in: 2.0,
            dpi: 300,
            head_min_mm: 25.4,
            head_max_mm: 34.9,
            head_target_mm: 30.0,
            eye_min_mm: 28.6,
            eye_max_mm: 34.9,
        }
    }

    /// Canvas side in pixels (600 for 2 in at 300 DPI).
    pub fn canvas_px(&self) -> u32 {
        (self.canvas_in * self.dpi as f32).round() as u32
    }

    /// Canvas side in millimeters (50.8 for 2 in).
    pub fn canvas_mm(&self) -> f32 {
        self.canvas_in * MM_PER_INCH
    }

    pub fn px_per_mm(&self) -> f32 {
        self.canvas_px() as f32 / self.canvas_mm()
    }

    pub fn mm_to_px(&self, mm: f32) -> f32 {
        mm * self.px_per_mm()
    }

    pub fn px_to_mm(&self, px: f32) -> f32 {
        px / self.px_per_mm()
    }

    pub fn head_target_px(&self) -> f32 {
        self.mm_to_px(self.head_target_mm)
    }

    /// Middle of the eye band, in millimeters from the bottom edge.
    pub fn eye_band_mid_mm(&self) -> f32 {
        (self.eye_min_mm + self.eye_max_mm) / 2.0
    }

    pub fn head_in_range(&self, head_mm: f32) -> bool {
        (self.head_min_mm..=self.head_max_mm).contains(&head_mm)
    }

    pub fn eye_in_band(&self, eye_mm: f32) -> bool {
        (self.eye_min_mm..=self.eye_max_mm).contains(&eye_mm)
    }
}

impl Default for TargetSpec {
    fn default() -> Self {
        Self::india()
    }
}

/// Which built-in [`TargetSpec`] to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum PhotoVariant {
    /// Indian passport / OCI / visa, 2 x 2 in.
    #[default]
    India,
    /// US passport, 2 x 2 in.
    UnitedStates,
}

impl PhotoVariant {
    pub const ALL: [PhotoVariant; 2] = [PhotoVariant::India, PhotoVariant::UnitedStates];

    pub fn spec(self) -> TargetSpec {
        match self {
            PhotoVariant::India => TargetSpec::india(),
            PhotoVariant::UnitedStates => TargetSpec::united_states(),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PhotoVariant::India => "india",
            PhotoVariant::UnitedStates => "united-states",
        }
    }
}

impl fmt::Display for PhotoVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn india_canvas_is_600_px() {
        let spec = TargetSpec::india();
        assert_eq!(spec.canvas_px(), 600);
        assert!((spec.canvas_mm() - 50.8).abs() < 1e-4);
    }

    #[test]
    fn px_per_mm_at_300_dpi() {
        // 600 / 50.8
        assert!((TargetSpec::india().px_per_mm() - 11.811).abs() < 1e-3);
    }

    #[test]
    fn mm_px_conversion_is_symmetric() {
        let spec = TargetSpec::india();
        let px = spec.mm_to_px(31.0);
        assert!((spec.px_to_mm(px) - 31.0).abs() < 1e-4);
    }

    #[test]
    fn eye_band_midpoint() {
        assert_eq!(TargetSpec::india().eye_band_mid_mm(), 31.0);
    }

    #[test]
    fn band_checks_are_inclusive() {
        let spec = TargetSpec::india();
        assert!(spec.eye_in_band(28.0));
        assert!(spec.eye_in_band(34.0));
        assert!(!spec.eye_in_band(34.1));
        assert!(spec.head_in_range(25.0));
        assert!(!spec.head_in_range(24.9));
    }

    #[test]
    fn variant_selects_spec() {
        assert_eq!(PhotoVariant::India.spec(), TargetSpec::india());
        assert_eq!(PhotoVariant::UnitedStates.spec().head_target_mm, 30.0);
        assert_eq!(PhotoVariant::default(), PhotoVariant::India);
    }

    #[test]
    fn variant_parses_from_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            variant: PhotoVariant,
        }
        let w: Wrapper = toml::from_str(r#"variant = "united-states""#).unwrap();
        assert_eq!(w.variant, PhotoVariant::UnitedStates);
    }
}
