//! Face-mesh landmarks and the adapter contract to the external detector.
//!
//! Detection itself is not done here. A [`LandmarkSource`] is handed the
//! decoded raster and answers with a [`LandmarkSet`] in source pixel space, or
//! `None` when no face was found. The one built-in source,
//! [`SidecarLandmarks`], reads the JSON a face-mesh detector wrote next to
//! the photo:
//!
//! ```text
//! portrait.jpg
//! portrait.landmarks.json   {"coordinates": "normalized", "faces": [[[x, y], ...]]}
//! ```
//!
//! Only the first face is used. Normalized coordinates (`0.0..=1.0`, what
//! face-mesh detectors emit) are scaled by the raster size; `"pixels"` are
//! taken as-is.

use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Number of points in a face mesh. Refined meshes append iris points after
/// these; the extra points are accepted and ignored.
pub const MESH_POINT_COUNT: usize = 468;

/// Named mesh indices used by the measurement engine.
pub mod index {
    /// Top of the forehead, the highest point the mesh covers.
    pub const FOREHEAD_TOP: usize = 10;
    /// Lowest point of the jaw.
    pub const CHIN: usize = 152;
    pub const LEFT_EYE: usize = 33;
    pub const RIGHT_EYE: usize = 263;
}

#[derive(Error, Debug)]
pub enum LandmarkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Landmark JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Malformed landmark file {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },
}

/// A 2D point in pixel coordinates, y growing downward.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn midpoint(self, other: Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Ordered face-mesh points for one face, in source-image pixels.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LandmarkSet {
    points: Vec<Point>,
}

impl LandmarkSet {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<Point> {
        self.points.get(idx).copied()
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }
}

/// Contract to the external face-landmark detector.
///
/// `Ok(None)` is the explicit "no face" answer. Errors are reserved for the
/// adapter itself failing (unreadable file, broken JSON).
pub trait LandmarkSource {
    fn detect(&self, image: &RgbImage) -> Result<Option<LandmarkSet>, LandmarkError>;
}

/// Landmarks already known to the caller.
impl LandmarkSource for LandmarkSet {
    fn detect(&self, _image: &RgbImage) -> Result<Option<LandmarkSet>, LandmarkError> {
        if self.is_empty() {
            Ok(None)
        } else {
            Ok(Some(self.clone()))
        }
    }
}

/// Coordinate space of a sidecar file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoordinateSpace {
    #[default]
    Normalized,
    Pixels,
}

/// A point as written by common exporters: `[x, y]`, `[x, y, z]` or `{x, y, z}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawPoint {
    Array(Vec<f32>),
    Object { x: f32, y: f32 },
}

#[derive(Debug, Deserialize)]
struct SidecarFile {
    #[serde(default)]
    coordinates: CoordinateSpace,
    faces: Vec<Vec<RawPoint>>,
}

/// Default sidecar location for a photo: `portrait.jpg` → `portrait.landmarks.json`.
pub fn sidecar_path(photo: &Path) -> PathBuf {
    photo.with_extension("landmarks.json")
}

/// Reads face-mesh output from a JSON file.
#[derive(Debug, Clone)]
pub struct SidecarLandmarks {
    path: PathBuf,
}

impl SidecarLandmarks {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Sidecar next to `photo`.
    pub fn for_photo(photo: &Path) -> Self {
        Self::new(sidecar_path(photo))
    }

    fn malformed(&self, reason: impl Into<String>) -> LandmarkError {
        LandmarkError::Malformed {
            path: self.path.clone(),
            reason: reason.into(),
        }
    }

    /// Parse sidecar content against a raster of `width` x `height`.
    pub fn parse(
        &self,
        content: &str,
        width: u32,
        height: u32,
    ) -> Result<Option<LandmarkSet>, LandmarkError> {
        let file: SidecarFile = serde_json::from_str(content)?;
        let Some(face) = file.faces.into_iter().next() else {
            return Ok(None);
        };

        let (sx, sy) = match file.coordinates {
            CoordinateSpace::Normalized => (width as f32, height as f32),
            CoordinateSpace::Pixels => (1.0, 1.0),
        };

        let points = face
            .into_iter()
            .enumerate()
            .map(|(i, raw)| match raw {
                RawPoint::Array(v) if v.len() >= 2 => Ok(Point::new(v[0] * sx, v[1] * sy)),
                RawPoint::Array(v) => Err(self.malformed(format!(
                    "point {i} has {} coordinates, expected at least 2",
                    v.len()
                ))),
                RawPoint::Object { x, y } => Ok(Point::new(x * sx, y * sy)),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(LandmarkSet::new(points)))
    }
}

impl LandmarkSource for SidecarLandmarks {
    fn detect(&self, image: &RgbImage) -> Result<Option<LandmarkSet>, LandmarkError> {
        let content = std::fs::read_to_string(&self.path)?;
        self.parse(&content, image.width(), image.height())
    }
}
