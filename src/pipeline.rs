//! One photo, end to end.
//!
//! ```text
//! photo ──load──► raster ──detect──► LandmarkSet ──measure──► Measurement
//!                                                                 │
//!        Composite ◄──compose── Placement ◄──compute_transform────┘
//!            │
//!            ├──render_overlay──► Overlay
//!            └──evaluate───────► WarningSet
//! ```
//!
//! [`run`] is pure: it takes a decoded image and hands back a
//! [`PipelineOutput`] or the first fatal error. Disk access lives in
//! [`run_file`], [`write_outputs`] and [`write_report`], all of which go
//! through an [`ImageBackend`] so tests can record exports instead of
//! encoding them.

use crate::compliance::{WarningSet, evaluate};
use crate::compositor::{Composite, compose};
use crate::config::AppConfig;
use crate::imaging::{BackendError, ImageBackend, export};
use crate::landmarks::{LandmarkError, LandmarkSource};
use crate::measure::{MeasureError, Measurement, measure_with_ratio};
use crate::normalize::compute_transform;
use crate::overlay::{Overlay, render_overlay};
use crate::sheet::{Sheet, SheetError, tile_sheet};
use crate::target::PhotoVariant;
use crate::types::RunReport;
use image::DynamicImage;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, instrument};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("Landmarks: {0}")]
    Landmarks(#[from] LandmarkError),
    #[error(transparent)]
    Measure(#[from] MeasureError),
    #[error(transparent)]
    Sheet(#[from] SheetError),
}

/// Everything one successful run produces.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub variant: PhotoVariant,
    pub measurement: Measurement,
    pub composite: Composite,
    pub overlay: Overlay,
    pub warnings: WarningSet,
}

impl PipelineOutput {
    pub fn report(&self, source: &Path) -> RunReport {
        let placement = self.composite.placement();
        RunReport {
            source: source.display().to_string(),
            variant: self.variant,
            policy: placement.policy.clone(),
            measurement: self.measurement,
            transform: placement.transform,
            head_height_mm: placement.head_height_mm,
            eye_line_mm: placement.eye_line_mm,
            warnings: self.warnings.clone(),
            outputs: Vec::new(),
        }
    }

    /// Tile the composite with the `[sheet]` settings from `config`.
    pub fn sheet(&self, config: &AppConfig) -> Result<Sheet, SheetError> {
        tile_sheet(
            &self.composite,
            config.sheet.copies,
            config.sheet.guides,
            &config.sheet.layout(),
        )
    }
}

/// Run measurement, placement, compositing and checks on a decoded photo.
#[instrument(skip_all, fields(variant = %config.photo.variant, policy = ?config.placement.policy))]
pub fn run(
    source: &DynamicImage,
    landmarks: &dyn LandmarkSource,
    config: &AppConfig,
) -> Result<PipelineOutput, PipelineError> {
    let spec = config.spec();
    let raster = source.to_rgb8();
    let dims = raster.dimensions();

    let found = landmarks
        .detect(&raster)?
        .ok_or(MeasureError::NoFaceDetected)?;
    debug!(points = found.len(), width = dims.0, height = dims.1, "Landmarks found");

    let measurement = measure_with_ratio(&found, dims.1, config.measurement.crown_ratio)?;
    let placement = compute_transform(
        &measurement,
        &spec,
        dims,
        config.placement.policy.policy(),
    );
    let composite = compose(source, placement, &spec, &config.background);
    let overlay = render_overlay(&composite, &spec);
    let warnings = evaluate(&composite, &measurement, &config.compliance);

    info!(
        head_mm = composite.placement().head_height_mm,
        eye_mm = composite.placement().eye_line_mm,
        warnings = warnings.len(),
        "Photo composed"
    );

    Ok(PipelineOutput {
        variant: config.photo.variant,
        measurement,
        composite,
        overlay,
        warnings,
    })
}

/// Load `photo` through `backend` and [`run`] it.
#[instrument(skip(backend, landmarks, config), fields(photo = %photo.display()))]
pub fn run_file(
    backend: &impl ImageBackend,
    photo: &Path,
    landmarks: &dyn LandmarkSource,
    config: &AppConfig,
) -> Result<PipelineOutput, PipelineError> {
    let source = backend.load(photo)?;
    run(&source, landmarks, config)
}

/// Which rasters [`write_outputs`] exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputOptions {
    pub photo: bool,
    pub preview: bool,
    pub sheet: bool,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            photo: true,
            preview: false,
            sheet: false,
        }
    }
}

/// Paths of the rasters written for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WrittenFiles {
    pub photo: Option<PathBuf>,
    pub preview: Option<PathBuf>,
    pub sheet: Option<PathBuf>,
}

impl WrittenFiles {
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        [&self.photo, &self.preview, &self.sheet]
            .into_iter()
            .flatten()
            .map(PathBuf::as_path)
    }
}

/// Export the requested rasters to `dir` as `stem`, `stem_preview` and
/// `stem_sheet`, in the configured format.
pub fn write_outputs(
    backend: &impl ImageBackend,
    output: &PipelineOutput,
    dir: &Path,
    stem: &str,
    config: &AppConfig,
    options: OutputOptions,
) -> Result<WrittenFiles, PipelineError> {
    let export_config = config.export_config();
    let dpi = output.composite.dpi();
    let mut written = WrittenFiles::default();

    if options.photo {
        written.photo = Some(export(
            backend,
            output.composite.image(),
            dpi,
            dir,
            stem,
            &export_config,
        )?);
    }
    if options.preview {
        written.preview = Some(export(
            backend,
            &output.overlay.image,
            dpi,
            dir,
            &format!("{stem}_preview"),
            &export_config,
        )?);
    }
    if options.sheet {
        let sheet = output.sheet(config)?;
        written.sheet = Some(export(
            backend,
            &sheet.image,
            sheet.dpi,
            dir,
            &format!("{stem}_sheet"),
            &export_config,
        )?);
    }

    Ok(written)
}

/// Write `report` as pretty JSON, creating parent directories.
pub fn write_report(report: &RunReport, path: &Path) -> Result<(), PipelineError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json)?;
    debug!(path = %path.display(), "Wrote report");
    Ok(())
}
