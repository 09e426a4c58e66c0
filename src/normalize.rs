//! Geometric normalizer: where the face goes on the canvas.
//!
//! A single uniform scale plus a translation cannot satisfy both physical
//! rules (head height *and* eye-line band) for every face. Which rule wins
//! is a [`PlacementPolicy`]. The stock policy, [`HeadHeightFirst`], fixes the
//! scale from head height alone; the eye line is then placed as close to the
//! middle of its band as the canvas allows, and anything left over is
//! reported as [`Condition::EyeLineOutOfBand`] rather than fixed by rescaling.
//!
//! ## Order of operations
//!
//! 1. `scale` from the policy
//! 2. horizontal: eye midpoint onto the canvas center
//! 3. vertical: eye line onto the band midpoint, then clamped so the crown
//!    stays below the top edge and the chin above the bottom edge
//! 4. both axes: clamped so the canvas does not reach past the source
//!    edges; any clamp (or an unavoidable gap) is [`Condition::FrameClipped`]
//! 5. the achieved eye height is checked against the band
//!
//! All rows here are top-down canvas/source pixels.

use crate::measure::Measurement;
use crate::target::TargetSpec;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

const EPSILON: f32 = 1e-3;

/// Uniform scale then translate, mapping source pixels to canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub scale: f32,
    pub translate_x: f32,
    pub translate_y: f32,
}

impl Transform {
    pub fn apply_row(&self, row: f32) -> f32 {
        row * self.scale + self.translate_y
    }

    pub fn apply_col(&self, col: f32) -> f32 {
        col * self.scale + self.translate_x
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Horizontal,
    Vertical,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Horizontal => f.write_str("horizontal"),
            Axis::Vertical => f.write_str("vertical"),
        }
    }
}

/// Non-fatal facts the normalizer records for the compliance checker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Condition {
    /// The canvas needed pixels from beyond the source edge on `axis`.
    FrameClipped { axis: Axis },
    /// Eye line ended up outside the band, at `eye_mm` from the bottom.
    EyeLineOutOfBand { eye_mm: f32 },
}

/// Measured face mapped onto the canvas, top-down canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanvasGeometry {
    pub crown_row: f32,
    pub chin_row: f32,
    pub eye_row: f32,
    pub center_x: f32,
}

impl CanvasGeometry {
    pub fn head_height_px(&self) -> f32 {
        self.chin_row - self.crown_row
    }
}

/// Normalizer output: the transform plus what was recorded along the way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub transform: Transform,
    pub canvas: CanvasGeometry,
    pub conditions: Vec<Condition>,
    /// Head height on the canvas.
    pub head_height_mm: f32,
    /// Eye line on the canvas, from the bottom edge.
    pub eye_line_mm: f32,
    pub policy: String,
}

impl Placement {
    pub fn has_condition(&self, f: impl Fn(&Condition) -> bool) -> bool {
        self.conditions.iter().any(f)
    }
}

/// Chooses the scale when head height and eye line disagree.
pub trait PlacementPolicy: Sync {
    fn name(&self) -> &'static str;

    fn scale(&self, m: &Measurement, spec: &TargetSpec) -> f32;
}

/// Scale purely from head height; eye line is a consequence.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeadHeightFirst;

impl PlacementPolicy for HeadHeightFirst {
    fn name(&self) -> &'static str {
        "head-height-first"
    }

    fn scale(&self, m: &Measurement, spec: &TargetSpec) -> f32 {
        head_height_scale(m, spec)
    }
}

/// Average the head-height scale with the largest scale at which the eye
/// band is still reachable with the whole head on the canvas.
///
/// Identical to [`HeadHeightFirst`] whenever the two rules do not conflict.
#[derive(Debug, Clone, Copy, Default)]
pub struct SplitDifference;

impl PlacementPolicy for SplitDifference {
    fn name(&self) -> &'static str {
        "split-difference"
    }

    fn scale(&self, m: &Measurement, spec: &TargetSpec) -> f32 {
        let head = head_height_scale(m, spec);
        match eye_band_scale_limit(m, spec) {
            Some(limit) if limit < head => (head + limit) / 2.0,
            _ => head,
        }
    }
}

/// Config-facing selector for the built-in policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyKind {
    #[default]
    HeadHeightFirst,
    SplitDifference,
}

impl PolicyKind {
    pub fn policy(self) -> &'static dyn PlacementPolicy {
        match self {
            PolicyKind::HeadHeightFirst => &HeadHeightFirst,
            PolicyKind::SplitDifference => &SplitDifference,
        }
    }
}

/// Scale that makes the head exactly `head_target_mm` tall on the canvas.
pub fn head_height_scale(m: &Measurement, spec: &TargetSpec) -> f32 {
    spec.head_target_px() / m.head_height_px
}

/// Largest scale at which the eye line can sit inside the band while the
/// crown and chin both stay on the canvas. `None` when eye geometry is
/// degenerate (eyes at or outside the crown/chin rows).
fn eye_band_scale_limit(m: &Measurement, spec: &TargetSpec) -> Option<f32> {
    let c = spec.canvas_px() as f32;
    let above = m.eye_row() - m.crown_row();
    let below = m.chin_row() - m.eye_row();
    if above <= 0.0 || below <= 0.0 {
        return None;
    }
    // eye as high as allowed, crown at the top edge
    let crown_fit = (c - spec.mm_to_px(spec.eye_max_mm)) / above;
    // eye as low as allowed, chin at the bottom edge
    let chin_fit = spec.mm_to_px(spec.eye_min_mm) / below;
    Some(crown_fit.min(chin_fit))
}

/// Keep `ideal` inside the range where the canvas is fully covered by the
/// source, intersected with `keep` when given. Returns the translation and
/// whether the frame had to be clipped.
fn clamp_axis(ideal: f32, scaled_len: f32, canvas: f32, keep: Option<(f32, f32)>) -> (f32, bool) {
    if scaled_len + EPSILON < canvas {
        // source narrower than the canvas: gaps are unavoidable
        return (ideal, true);
    }
    // within EPSILON of the canvas counts as covering it
    let (mut lo, mut hi) = ((canvas - scaled_len).min(0.0), 0.0f32);
    if let Some((keep_lo, keep_hi)) = keep {
        let (l, h) = (lo.max(keep_lo), hi.min(keep_hi));
        if l > h {
            return (ideal, true);
        }
        lo = l;
        hi = h;
    }
    if ideal < lo - EPSILON || ideal > hi + EPSILON {
        (ideal.clamp(lo, hi), true)
    } else {
        (ideal, false)
    }
}

/// Compute the placement of measured face `m` from a `source` of
/// `(width, height)` pixels onto the canvas described by `spec`.
pub fn compute_transform(
    m: &Measurement,
    spec: &TargetSpec,
    source: (u32, u32),
    policy: &dyn PlacementPolicy,
) -> Placement {
    let c = spec.canvas_px() as f32;
    let (src_w, src_h) = (source.0 as f32, source.1 as f32);
    let scale = policy.scale(m, spec);
    let mut conditions = Vec::new();

    let ideal_x = c / 2.0 - scale * m.face_center_x_px;
    let (translate_x, clipped_x) = clamp_axis(ideal_x, scale * src_w, c, None);
    if clipped_x {
        conditions.push(Condition::FrameClipped {
            axis: Axis::Horizontal,
        });
    }

    let crown = scale * m.crown_row();
    let chin = scale * m.chin_row();
    let eye_target_row = c - spec.mm_to_px(spec.eye_band_mid_mm());
    let mut ideal_y = eye_target_row - scale * m.eye_row();

    // Head on canvas: crown + ty >= 0 and chin + ty <= c.
    let head_range = (-crown, c - chin);
    let head_fits = head_range.0 <= head_range.1;
    if head_fits {
        ideal_y = ideal_y.clamp(head_range.0, head_range.1);
    }
    let (translate_y, clipped_y) =
        clamp_axis(ideal_y, scale * src_h, c, head_fits.then_some(head_range));
    if clipped_y {
        conditions.push(Condition::FrameClipped {
            axis: Axis::Vertical,
        });
    }

    let transform = Transform {
        scale,
        translate_x,
        translate_y,
    };

    let canvas = CanvasGeometry {
        crown_row: transform.apply_row(m.crown_row()),
        chin_row: transform.apply_row(m.chin_row()),
        eye_row: transform.apply_row(m.eye_row()),
        center_x: transform.apply_col(m.face_center_x_px),
    };

    let eye_line_mm = spec.px_to_mm(c - canvas.eye_row);
    if !spec.eye_in_band(eye_line_mm) {
        conditions.push(Condition::EyeLineOutOfBand { eye_mm: eye_line_mm });
    }
    let head_height_mm = spec.px_to_mm(scale * m.head_height_px);

    debug!(
        policy = policy.name(),
        scale,
        translate_x,
        translate_y,
        head_height_mm,
        eye_line_mm,
        conditions = conditions.len(),
        "Computed placement"
    );

    Placement {
        transform,
        canvas,
        conditions,
        head_height_mm,
        eye_line_mm,
        policy: policy.name().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measure::measure;
    use crate::test_helpers::{FaceGeometry, assert_close, face_landmarks};

    fn measured(face: FaceGeometry, height: u32) -> Measurement {
        measure(&face_landmarks(face), height).unwrap()
    }

    fn place(face: FaceGeometry, source: (u32, u32)) -> Placement {
        compute_transform(
            &measured(face, source.1),
            &TargetSpec::india(),
            source,
            &HeadHeightFirst,
        )
    }

    #[test]
    fn scenario_scale_hits_target_head_height() {
        let p = place(FaceGeometry::scenario(), (1200, 1600));
        // (26 mm * 11.81 px/mm) / 400 px
        assert_close(p.transform.scale, 0.7677, 1e-3);
        let spec = TargetSpec::india();
        assert!((p.transform.scale * 400.0 - spec.head_target_px()).abs() <= 0.5);
        assert_close(p.head_height_mm, 26.0, 1e-3);
    }

    #[test]
    fn scenario_places_eye_line_mid_band_without_conditions() {
        let p = place(FaceGeometry::scenario(), (1200, 1600));
        assert_close(p.eye_line_mm, 31.0, 1e-2);
        assert!(p.conditions.is_empty(), "{:?}", p.conditions);
    }

    #[test]
    fn canvas_geometry_matches_target_head_height() {
        let p = place(FaceGeometry::scenario(), (1200, 1600));
        let spec = TargetSpec::india();
        assert_close(p.canvas.head_height_px(), spec.head_target_px(), 0.5);
        assert_close(p.canvas.center_x, 300.0, 1e-2);
    }

    #[test]
    fn scenario_centers_eyes_horizontally() {
        let p = place(FaceGeometry::scenario(), (1200, 1600));
        assert_close(p.transform.apply_col(600.0), 300.0, 1e-2);
    }

    #[test]
    fn scale_times_head_matches_target_for_many_heads() {
        let spec = TargetSpec::india();
        for head in [150.0f32, 333.0, 400.0, 812.5, 1500.0] {
            let face = FaceGeometry {
                crown_row: 100.0,
                chin_row: 100.0 + head,
                eye_row: 100.0 + head * 0.5,
                center_x: 1000.0,
            };
            let m = measured(face, 2000);
            let scale = head_height_scale(&m, &spec);
            assert!((scale * m.head_height_px - spec.head_target_px()).abs() <= 0.5);
        }
    }

    #[test]
    fn face_near_left_edge_clips_horizontally() {
        let face = FaceGeometry {
            center_x: 100.0,
            ..FaceGeometry::scenario()
        };
        let p = place(face, (1200, 1600));
        assert!(p.has_condition(|c| matches!(
            c,
            Condition::FrameClipped {
                axis: Axis::Horizontal
            }
        )));
        // clamped so the source's left edge sits on the canvas edge
        assert_close(p.transform.translate_x, 0.0, 1e-3);
    }

    #[test]
    fn clamp_axis_source_a_hair_narrower_than_canvas() {
        let (t, clipped) = clamp_axis(200.0, 600.0 - 4e-4, 600.0, None);
        assert!(clipped);
        assert_close(t, 0.0, 1e-3);

        let (t, clipped) = clamp_axis(-5.0, 600.0 - 4e-4, 600.0, None);
        assert!(clipped);
        assert_close(t, 0.0, 1e-3);
    }

    #[test]
    fn source_scaled_to_just_under_canvas_width_does_not_panic() {
        // 600 px wide source whose scale lands a fraction of a pixel short
        let m = Measurement {
            head_height_px: 307.0868,
            eye_line_y_px: 440.0,
            chin_y_px: 300.0,
            crown_y_px: 607.0868,
            face_center_x_px: 100.0,
            image_height_px: 1000,
        };
        let p = compute_transform(&m, &TargetSpec::india(), (600, 1000), &HeadHeightFirst);
        assert!(p.transform.scale * 600.0 < 600.0);
        assert!(p.has_condition(|c| matches!(
            c,
            Condition::FrameClipped {
                axis: Axis::Horizontal
            }
        )));
        assert_close(p.transform.translate_x, 0.0, 1e-3);
    }

    #[test]
    fn narrow_source_clips_without_moving_face() {
        // 500 px wide source scales to ~384 px, narrower than the canvas
        let face = FaceGeometry {
            center_x: 250.0,
            ..FaceGeometry::scenario()
        };
        let p = place(face, (500, 1600));
        assert!(p.has_condition(|c| matches!(c, Condition::FrameClipped { .. })));
        assert_close(p.transform.apply_col(250.0), 300.0, 1e-2);
    }

    #[test]
    fn eyes_near_chin_report_out_of_band() {
        let face = FaceGeometry {
            crown_row: 480.0,
            chin_row: 880.0,
            eye_row: 860.0,
            center_x: 600.0,
        };
        let p = place(face, (1200, 1600));
        // head height still wins
        assert_close(p.head_height_mm, 26.0, 1e-3);
        assert!(p.eye_line_mm < 28.0);
        assert!(p.has_condition(|c| matches!(c, Condition::EyeLineOutOfBand { .. })));
        // crown pinned to the top edge
        assert_close(p.canvas.crown_row, 0.0, 1e-2);
        assert_close(p.transform.apply_row(480.0), 0.0, 1e-2);
    }

    #[test]
    fn split_difference_matches_head_first_without_conflict() {
        let m = measured(FaceGeometry::scenario(), 1600);
        let spec = TargetSpec::india();
        assert_eq!(
            SplitDifference.scale(&m, &spec),
            HeadHeightFirst.scale(&m, &spec)
        );
    }

    #[test]
    fn split_difference_shrinks_scale_under_conflict() {
        let face = FaceGeometry {
            crown_row: 480.0,
            chin_row: 880.0,
            eye_row: 860.0,
            center_x: 600.0,
        };
        let m = measured(face, 1600);
        let spec = TargetSpec::india();
        let head = HeadHeightFirst.scale(&m, &spec);
        let split = SplitDifference.scale(&m, &spec);
        assert!(split < head);
        let p = compute_transform(&m, &spec, (1200, 1600), &SplitDifference);
        assert_eq!(p.policy, "split-difference");
        // closer to the band than head-height-first gets
        let first = compute_transform(&m, &spec, (1200, 1600), &HeadHeightFirst);
        assert!(p.eye_line_mm > first.eye_line_mm);
    }

    #[test]
    fn policy_kind_selects_policy() {
        assert_eq!(PolicyKind::default().policy().name(), "head-height-first");
        assert_eq!(
            PolicyKind::SplitDifference.policy().name(),
            "split-difference"
        );
    }

    #[test]
    fn clamp_axis_inside_range_is_untouched() {
        assert_eq!(clamp_axis(-100.0, 1000.0, 600.0, None), (-100.0, false));
    }

    #[test]
    fn clamp_axis_past_far_edge_is_clamped() {
        assert_eq!(clamp_axis(-500.0, 1000.0, 600.0, None), (-400.0, true));
    }

    #[test]
    fn clamp_axis_prefers_keep_range_over_coverage() {
        // keep range disjoint from coverage range: keep the ideal, flag it
        assert_eq!(
            clamp_axis(50.0, 1000.0, 600.0, Some((10.0, 60.0))),
            (50.0, true)
        );
    }

    #[test]
    fn transform_scales_then_translates() {
        let t = Transform {
            scale: 0.5,
            translate_x: 10.0,
            translate_y: -20.0,
        };
        assert_eq!(t.apply_col(100.0), 60.0);
        assert_eq!(t.apply_row(200.0), 80.0);
    }
}
