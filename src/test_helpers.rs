//! Shared test utilities: synthetic faces and portraits.
//!
//! Real detector output is not available in unit tests, so faces are built
//! from four numbers and the mesh is filled in around them.
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let face = FaceGeometry { crown_row: 480.0, chin_row: 880.0, eye_row: 700.0, center_x: 600.0 };
//! let landmarks = face_landmarks(face);
//! let photo = synthetic_portrait(1200, 1600, face, Rgb([70, 90, 140]));
//! ```

use image::{Rgb, RgbImage};

use crate::landmarks::{LandmarkSet, MESH_POINT_COUNT, Point, index};
use crate::measure::CROWN_EXTENSION_RATIO;

pub const BACKGROUND: Rgb<u8> = Rgb([232, 236, 240]);
pub const SKIN: Rgb<u8> = Rgb([200, 160, 140]);
pub const DARK_SHIRT: Rgb<u8> = Rgb([70, 90, 140]);
pub const WHITE_SHIRT: Rgb<u8> = Rgb([250, 250, 250]);

/// Top-down source rows of a face plus its horizontal center.
#[derive(Debug, Clone, Copy)]
pub struct FaceGeometry {
    pub crown_row: f32,
    pub chin_row: f32,
    pub eye_row: f32,
    pub center_x: f32,
}

impl FaceGeometry {
    /// The 1200x1600 portrait used throughout: 400 px head, eyes 900 px from the bottom.
    pub fn scenario() -> Self {
        Self {
            crown_row: 480.0,
            chin_row: 880.0,
            eye_row: 700.0,
            center_x: 600.0,
        }
    }
}

// =========================================================================
// Landmarks
// =========================================================================

/// Build a full mesh whose measured crown, chin and eyes match `face`.
///
/// The forehead landmark is placed so that the stock crown ratio lands the
/// estimate exactly on `crown_row`. Every other point sits on the face center.
pub fn face_landmarks(face: FaceGeometry) -> LandmarkSet {
    let r = CROWN_EXTENSION_RATIO;
    let forehead_row = (face.crown_row + r * face.chin_row) / (1.0 + r);
    let eye_span = (face.chin_row - face.crown_row).abs() * 0.3;

    let mut points = vec![Point::new(face.center_x, face.eye_row); MESH_POINT_COUNT];
    points[index::FOREHEAD_TOP] = Point::new(face.center_x, forehead_row);
    points[index::CHIN] = Point::new(face.center_x, face.chin_row);
    points[index::LEFT_EYE] = Point::new(face.center_x - eye_span / 2.0, face.eye_row);
    points[index::RIGHT_EYE] = Point::new(face.center_x + eye_span / 2.0, face.eye_row);
    LandmarkSet::new(points)
}

// =========================================================================
// Images
// =========================================================================

/// Flat-lit portrait: light background, skin ellipse for the head, and a
/// shirt from just below the chin to the bottom edge.
pub fn synthetic_portrait(width: u32, height: u32, face: FaceGeometry, shirt: Rgb<u8>) -> RgbImage {
    let head_h = face.chin_row - face.crown_row;
    let cy = (face.crown_row + face.chin_row) / 2.0;
    let ry = head_h / 2.0;
    let rx = head_h * 0.38;
    let shirt_top = face.chin_row + head_h * 0.15;
    let shirt_half = head_h * 1.1;

    RgbImage::from_fn(width, height, |x, y| {
        let (fx, fy) = (x as f32, y as f32);
        let dx = (fx - face.center_x) / rx;
        let dy = (fy - cy) / ry;
        if dx * dx + dy * dy <= 1.0 {
            SKIN
        } else if fy >= shirt_top && (fx - face.center_x).abs() <= shirt_half {
            shirt
        } else {
            BACKGROUND
        }
    })
}

/// Assert two floats are within `tol` of each other.
pub fn assert_close(actual: f32, expected: f32, tol: f32) {
    assert!(
        (actual - expected).abs() <= tol,
        "expected {expected} ± {tol}, got {actual}"
    );
}

/// Assert every channel of `actual` is within `tol` of `expected`.
pub fn assert_color_near(actual: Rgb<u8>, expected: Rgb<u8>, tol: u8) {
    let close = actual
        .0
        .iter()
        .zip(expected.0.iter())
        .all(|(a, e)| a.abs_diff(*e) <= tol);
    assert!(close, "expected {expected:?} ± {tol}, got {actual:?}");
}
