//! Shared types written to disk by the CLI.
//!
//! A [`RunReport`] is the JSON record of one run: what was measured, how it
//! was placed and what the checker flagged. `process --report` writes one
//! for a single photo, and `batch` writes one next to every output.

use crate::compliance::WarningSet;
use crate::measure::Measurement;
use crate::normalize::Transform;
use crate::target::PhotoVariant;
use serde::{Deserialize, Serialize};

/// JSON summary of one photo run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Source photo as given on the command line.
    pub source: String,
    pub variant: PhotoVariant,
    /// Placement policy that chose the scale.
    pub policy: String,
    pub measurement: Measurement,
    pub transform: Transform,
    /// Head height on the finished canvas.
    pub head_height_mm: f32,
    /// Eye line on the finished canvas, from the bottom edge.
    pub eye_line_mm: f32,
    pub warnings: WarningSet,
    /// Files written for this run, in the order they were written.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<String>,
}

impl RunReport {
    /// `true` if the photo passed every check.
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}
