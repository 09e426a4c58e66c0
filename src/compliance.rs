//! Compliance checker: advisory warnings about a finished composite.
//!
//! Nothing here blocks output. Every check either reads pixels of the
//! composite or re-surfaces a condition the normalizer recorded, and the
//! result is an ordered, duplicate-free [`WarningSet`].
//!
//! | Warning | Source |
//! |---|---|
//! | `HeadSizeOutOfRange` | measured head × transform scale, in mm |
//! | `EyeLineOutOfBand` | normalizer condition |
//! | `FrameClipped` | normalizer condition, per axis |
//! | `AttireTooWhite` | luma of the bottom band, central half |
//! | `PossibleShadow` | luma spread inside the face box |
//!
//! The pixel checks are heuristics with thresholds from `[compliance]` in
//! config, not classifiers.

use crate::compositor::Composite;
use crate::imaging::luma_stats;
use crate::measure::Measurement;
use crate::normalize::{Axis, Condition};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Thresholds for the pixel heuristics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ComplianceConfig {
    /// Rows at the bottom of the canvas sampled for attire.
    pub attire_band_px: u32,
    /// Mean luma above which the attire band counts as white.
    pub attire_min_luma: f32,
    /// Attire band must also be this flat (luma std-dev below).
    pub attire_max_std: f32,
    /// Luma std-dev inside the face box above which shadows are suspected.
    pub shadow_max_std: f32,
}

impl Default for ComplianceConfig {
    fn default() -> Self {
        Self {
            attire_band_px: 80,
            attire_min_luma: 220.0,
            attire_max_std: 20.0,
            shadow_max_std: 60.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    HeadSizeOutOfRange { head_mm: f32 },
    EyeLineOutOfBand { eye_mm: f32 },
    FrameClipped { axis: Axis },
    AttireTooWhite { mean_luma: f32 },
    PossibleShadow { std_dev: f32 },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::HeadSizeOutOfRange { head_mm } => {
                write!(f, "Head height {head_mm:.1}mm is outside the allowed range")
            }
            Warning::EyeLineOutOfBand { eye_mm } => write!(
                f,
                "Eye line is {eye_mm:.1}mm from the bottom, outside the allowed band"
            ),
            Warning::FrameClipped { axis } => write!(
                f,
                "Photo does not cover the {axis} extent of the frame; edges were filled white"
            ),
            Warning::AttireTooWhite { .. } => write!(
                f,
                "Attire may be too white (bottom of image is very light)"
            ),
            Warning::PossibleShadow { .. } => write!(
                f,
                "High contrast on the face: there may be distracting shadows or lighting"
            ),
        }
    }
}

/// Ordered set of warnings; inserting an equal warning twice keeps one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WarningSet(Vec<Warning>);

impl WarningSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if an equal warning was already present.
    pub fn insert(&mut self, warning: Warning) -> bool {
        if self.0.contains(&warning) {
            return false;
        }
        self.0.push(warning);
        true
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Warning> {
        self.0.iter()
    }

    pub fn contains(&self, f: impl Fn(&Warning) -> bool) -> bool {
        self.0.iter().any(f)
    }
}

impl<'a> IntoIterator for &'a WarningSet {
    type Item = &'a Warning;
    type IntoIter = std::slice::Iter<'a, Warning>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Run every check against `composite`.
///
/// `measurement` is the source measurement the composite was built from; the
/// head-size check scales it by the composite's transform.
pub fn evaluate(
    composite: &Composite,
    measurement: &Measurement,
    config: &ComplianceConfig,
) -> WarningSet {
    let mut warnings = WarningSet::new();
    let spec = composite.spec();

    let head_mm = spec.px_to_mm(measurement.head_height_px * composite.transform().scale);
    if !spec.head_in_range(head_mm) {
        warnings.insert(Warning::HeadSizeOutOfRange { head_mm });
    }

    for condition in composite.conditions() {
        warnings.insert(match *condition {
            Condition::EyeLineOutOfBand { eye_mm } => Warning::EyeLineOutOfBand { eye_mm },
            Condition::FrameClipped { axis } => Warning::FrameClipped { axis },
        });
    }

    if let Some(w) = check_attire(composite, config) {
        warnings.insert(w);
    }
    if let Some(w) = check_shadow(composite, config) {
        warnings.insert(w);
    }

    debug!(count = warnings.len(), "Compliance evaluated");
    warnings
}

/// Bottom band, central half of the width.
fn check_attire(composite: &Composite, config: &ComplianceConfig) -> Option<Warning> {
    let size = composite.size();
    let band = config.attire_band_px.min(size);
    let stats = luma_stats(
        composite.image(),
        (size / 4) as i64,
        (size - band) as i64,
        size / 2,
        band,
    )?;
    (stats.mean > config.attire_min_luma && stats.std_dev < config.attire_max_std).then_some(
        Warning::AttireTooWhite {
            mean_luma: stats.mean,
        },
    )
}

/// Central face box: half a head wide, from a quarter below the crown to
/// just above the chin, so hair, ears and background stay out.
fn check_shadow(composite: &Composite, config: &ComplianceConfig) -> Option<Warning> {
    let g = composite.geometry();
    let head = g.head_height_px();
    if head <= 0.0 {
        return None;
    }
    let x = (g.center_x - 0.25 * head).round() as i64;
    let y = (g.crown_row + 0.25 * head).round() as i64;
    let w = (0.5 * head).round() as u32;
    let h = (0.6 * head).round() as u32;
    let stats = luma_stats(composite.image(), x, y, w, h)?;
    (stats.std_dev > config.shadow_max_std).then_some(Warning::PossibleShadow {
        std_dev: stats.std_dev,
    })
}
