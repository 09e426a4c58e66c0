//! Compositor: the source photo, resampled onto a white print canvas.
//!
//! ```text
//! DynamicImage ─▶ flatten alpha on white ─▶ (optional) whiten near-white
//!              ─▶ Lanczos3 prefilter if shrinking ─▶ bicubic warp ─▶ 600x600
//! ```
//!
//! The result is a [`Composite`]: the finished canvas plus the face geometry
//! and normalizer conditions in canvas space, which is everything the
//! overlay, the compliance checker and the sheet tiler need. A composite is
//! never mutated after construction.

use crate::imaging::{flatten_onto_white, resample_onto_canvas, whiten_background};
use crate::normalize::{CanvasGeometry, Condition, Placement, Transform};
use crate::target::TargetSpec;
use image::{DynamicImage, RgbImage};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Source cleanup applied before resampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackgroundOptions {
    /// Pixels with every channel at or above this become pure white.
    /// `None` leaves the background as photographed.
    pub whiten_threshold: Option<u8>,
}

/// Finished passport photo canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct Composite {
    image: RgbImage,
    spec: TargetSpec,
    placement: Placement,
}

impl Composite {
    pub(crate) fn new(image: RgbImage, spec: TargetSpec, placement: Placement) -> Self {
        Self {
            image,
            spec,
            placement,
        }
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn dpi(&self) -> u32 {
        self.spec.dpi
    }

    pub fn spec(&self) -> &TargetSpec {
        &self.spec
    }

    pub fn size(&self) -> u32 {
        self.image.width()
    }

    pub fn transform(&self) -> &Transform {
        &self.placement.transform
    }

    pub fn geometry(&self) -> &CanvasGeometry {
        &self.placement.canvas
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.placement.conditions
    }

    pub fn placement(&self) -> &Placement {
        &self.placement
    }
}

/// Resample `source` under `placement` onto a white canvas sized by `spec`.
pub fn compose(
    source: &DynamicImage,
    placement: Placement,
    spec: &TargetSpec,
    background: &BackgroundOptions,
) -> Composite {
    let mut flat = flatten_onto_white(source);
    if let Some(threshold) = background.whiten_threshold {
        let changed = whiten_background(&mut flat, threshold);
        debug!(threshold, changed, "Whitened background");
    }

    let t = placement.transform;
    let image = resample_onto_canvas(
        &flat,
        t.scale,
        t.translate_x,
        t.translate_y,
        spec.canvas_px(),
    );

    Composite::new(image, *spec, placement)
}
