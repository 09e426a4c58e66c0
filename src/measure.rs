//! Measurement engine: head height and eye line from face-mesh landmarks.
//!
//! All vertical values in a [`Measurement`] are distances from the **bottom**
//! of the source image, the way the physical requirements are written
//! ("eyes 28–34 mm from the bottom"). Landmarks arrive top-down, so the
//! engine flips them once here and nowhere else:
//!
//! ```text
//!   row 0  ┌──────────┐
//!          │  crown ─ │ ── crown_y_px  ┐
//!          │  eyes  ─ │ ── eye_line_y_px│ head_height_px = crown_y_px - chin_y_px
//!          │  chin  ─ │ ── chin_y_px   ┘
//! row h-1  └──────────┘ ── 0
//! ```
//!
//! ## Crown estimate
//!
//! A face mesh stops at the upper forehead; it has no hairline or crown
//! point. The top of the head is extrapolated from the forehead landmark by
//! a fixed fraction of the forehead-to-chin distance
//! ([`estimate_crown_row`]). This is a calibration heuristic, not a
//! detection, and the ratio is tunable through `measurement.crown_ratio`.

use crate::landmarks::{LandmarkSet, MESH_POINT_COUNT, Point, index};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fraction of the forehead-to-chin distance added above the forehead
/// landmark to reach the crown.
pub const CROWN_EXTENSION_RATIO: f32 = 0.20;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MeasureError {
    #[error("No face detected. Use a clear, front-facing photo")]
    NoFaceDetected,
    #[error("Insufficient landmarks: {0}")]
    InsufficientLandmarks(String),
}

/// Geometry of one face in one source image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub head_height_px: f32,
    /// Eye midpoint, distance from the bottom edge.
    pub eye_line_y_px: f32,
    /// Distance from the bottom edge.
    pub chin_y_px: f32,
    /// Estimated top of head, distance from the bottom edge.
    pub crown_y_px: f32,
    /// Horizontal face midpoint (between the eyes), from the left edge.
    pub face_center_x_px: f32,
    pub image_height_px: u32,
}

impl Measurement {
    /// Crown as a top-down row in the source image.
    pub fn crown_row(&self) -> f32 {
        self.image_height_px as f32 - self.crown_y_px
    }

    pub fn chin_row(&self) -> f32 {
        self.image_height_px as f32 - self.chin_y_px
    }

    pub fn eye_row(&self) -> f32 {
        self.image_height_px as f32 - self.eye_line_y_px
    }
}

/// Extrapolate the top of the head from the forehead landmark.
///
/// Rows are top-down. `ratio` is the share of the forehead-to-chin distance
/// that lies above the forehead landmark; see [`CROWN_EXTENSION_RATIO`].
pub fn estimate_crown_row(forehead_row: f32, chin_row: f32, ratio: f32) -> f32 {
    forehead_row - ratio * (chin_row - forehead_row)
}

/// Measure with the stock crown ratio.
pub fn measure(landmarks: &LandmarkSet, image_height_px: u32) -> Result<Measurement, MeasureError> {
    measure_with_ratio(landmarks, image_height_px, CROWN_EXTENSION_RATIO)
}

/// Measure a face, extrapolating the crown with `crown_ratio`.
pub fn measure_with_ratio(
    landmarks: &LandmarkSet,
    image_height_px: u32,
    crown_ratio: f32,
) -> Result<Measurement, MeasureError> {
    if landmarks.is_empty() {
        return Err(MeasureError::NoFaceDetected);
    }
    if landmarks.len() < MESH_POINT_COUNT {
        return Err(MeasureError::InsufficientLandmarks(format!(
            "expected a {MESH_POINT_COUNT}-point face mesh, got {} points",
            landmarks.len()
        )));
    }

    let forehead = required(landmarks, index::FOREHEAD_TOP, "forehead")?;
    let chin = required(landmarks, index::CHIN, "chin")?;
    let left_eye = required(landmarks, index::LEFT_EYE, "left eye")?;
    let right_eye = required(landmarks, index::RIGHT_EYE, "right eye")?;

    let height = image_height_px as f32;
    let crown_row = estimate_crown_row(forehead.y, chin.y, crown_ratio);
    let eyes = left_eye.midpoint(right_eye);

    let crown_y_px = height - crown_row;
    let chin_y_px = height - chin.y;
    let head_height_px = crown_y_px - chin_y_px;

    if head_height_px <= 0.0 {
        return Err(MeasureError::InsufficientLandmarks(format!(
            "head height must be positive, got {head_height_px:.1}px (crown above chin?)"
        )));
    }

    Ok(Measurement {
        head_height_px,
        eye_line_y_px: height - eyes.y,
        chin_y_px,
        crown_y_px,
        face_center_x_px: eyes.x,
        image_height_px,
    })
}

fn required(landmarks: &LandmarkSet, idx: usize, name: &str) -> Result<Point, MeasureError> {
    let point = landmarks.get(idx).ok_or_else(|| {
        MeasureError::InsufficientLandmarks(format!(
            "{name} landmark #{idx} missing from a set of {}",
            landmarks.len()
        ))
    })?;
    if !point.is_finite() {
        return Err(MeasureError::InsufficientLandmarks(format!(
            "{name} landmark #{idx} is not a finite coordinate"
        )));
    }
    Ok(point)
}
