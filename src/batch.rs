//! Batch mode: every photo under a directory, in parallel.
//!
//! Photos are discovered with `walkdir` (JPEG and PNG, hidden entries
//! skipped) and each one is an independent pipeline run on the rayon pool.
//! A photo whose landmarks are missing or unusable fails on its own; the
//! rest of the batch carries on.
//!
//! Two photos in one folder with the same stem (`anna.jpg`, `anna.png`)
//! would share a sidecar and write over each other's outputs. Both fail
//! with [`BatchError::DuplicateStem`] instead of racing.
//!
//! ## Output Structure
//!
//! ```text
//! input/                      output/
//! ├── anna.jpg                ├── anna.jpg
//! ├── anna.landmarks.json     ├── anna.json          # RunReport
//! └── family/                 └── family/
//!     ├── ben.png                 ├── ben.jpg
//!     └── ben.landmarks.json      └── ben.json
//! ```
//!
//! ## Progress
//!
//! Callers pass an optional `mpsc::Sender<BatchEvent>`; one event is sent
//! per finished photo, in completion order. `main` drains the channel on a
//! printer thread.

use crate::config::AppConfig;
use crate::imaging::{ImageBackend, is_supported_input};
use crate::landmarks::SidecarLandmarks;
use crate::pipeline::{OutputOptions, PipelineError, run_file, write_outputs, write_report};
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("Input directory not found: {0}")]
    InputNotFound(PathBuf),
    #[error("Directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),
    #[error(
        "Another photo in {} is also named '{stem}'; rename one so outputs and landmarks do not collide",
        dir.display()
    )]
    DuplicateStem { dir: PathBuf, stem: String },
}

/// Progress of one photo.
#[derive(Debug, Clone)]
pub enum BatchEvent {
    Processed {
        /// 1-based position in discovery order.
        index: usize,
        source: PathBuf,
        outputs: Vec<PathBuf>,
        warnings: Vec<String>,
    },
    Failed {
        index: usize,
        source: PathBuf,
        error: String,
    },
}

/// Totals once every photo has been attempted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub discovered: usize,
    pub processed: usize,
    /// Processed photos with at least one warning.
    pub warned: usize,
    pub failed: usize,
}

/// All supported photos under `dir`, sorted by path.
pub fn discover_photos(dir: &Path) -> Result<Vec<PathBuf>, BatchError> {
    if !dir.is_dir() {
        return Err(BatchError::InputNotFound(dir.to_path_buf()));
    }

    let mut photos = Vec::new();
    for entry in WalkDir::new(dir)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name()))
    {
        let entry = entry?;
        if entry.file_type().is_file() && is_supported_input(entry.path()) {
            photos.push(entry.into_path());
        }
    }
    photos.sort();
    Ok(photos)
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().is_some_and(|n| n.starts_with('.'))
}

/// Photos that share a folder and a case-insensitive stem with another photo.
pub fn stem_collisions(photos: &[PathBuf]) -> Vec<&Path> {
    let mut groups: HashMap<(Option<&Path>, String), Vec<&Path>> = HashMap::new();
    for photo in photos {
        let stem = photo
            .file_stem()
            .map(|s| s.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        groups.entry((photo.parent(), stem)).or_default().push(photo);
    }
    let mut clashing: Vec<&Path> = groups
        .into_values()
        .filter(|group| group.len() > 1)
        .flatten()
        .collect();
    clashing.sort();
    clashing
}

/// Output directory and file stem for `photo`, mirroring its place under `input_root`.
pub fn output_location(photo: &Path, input_root: &Path, output_root: &Path) -> (PathBuf, String) {
    let relative_dir = photo
        .parent()
        .and_then(|p| p.strip_prefix(input_root).ok())
        .unwrap_or_else(|| Path::new(""));
    let stem = photo
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    (output_root.join(relative_dir), stem)
}

/// Process every photo under `input_dir` into `output_dir`.
///
/// Landmarks come from each photo's sidecar. Every processed photo also gets
/// a `stem.json` report next to its outputs.
pub fn run_batch(
    backend: &impl ImageBackend,
    input_dir: &Path,
    output_dir: &Path,
    config: &AppConfig,
    options: OutputOptions,
    progress: Option<Sender<BatchEvent>>,
) -> Result<BatchSummary, BatchError> {
    let photos = discover_photos(input_dir)?;
    debug!(count = photos.len(), dir = %input_dir.display(), "Discovered photos");
    let clashing = stem_collisions(&photos);
    if !clashing.is_empty() {
        warn!(count = clashing.len(), "Photos share a file stem and will be skipped");
    }

    let results: Vec<Option<bool>> = photos
        .par_iter()
        .enumerate()
        .map_with(progress, |tx, (i, photo)| {
            let (dir, stem) = output_location(photo, input_dir, output_dir);
            let result = if clashing.contains(&photo.as_path()) {
                Err(BatchError::DuplicateStem {
                    dir: photo.parent().unwrap_or(input_dir).to_path_buf(),
                    stem: stem.clone(),
                }
                .to_string())
            } else {
                process_one(backend, photo, &dir, &stem, config, options)
                    .map_err(|e| e.to_string())
            };
            let event = match result {
                Ok((outputs, warnings)) => BatchEvent::Processed {
                    index: i + 1,
                    source: photo.clone(),
                    outputs,
                    warnings,
                },
                Err(e) => {
                    warn!(photo = %photo.display(), error = %e, "Photo failed");
                    BatchEvent::Failed {
                        index: i + 1,
                        source: photo.clone(),
                        error: e,
                    }
                }
            };
            let outcome = match &event {
                BatchEvent::Processed { warnings, .. } => Some(!warnings.is_empty()),
                BatchEvent::Failed { .. } => None,
            };
            if let Some(tx) = tx {
                tx.send(event).ok();
            }
            outcome
        })
        .collect();

    Ok(BatchSummary {
        discovered: photos.len(),
        processed: results.iter().filter(|r| r.is_some()).count(),
        warned: results.iter().filter(|r| **r == Some(true)).count(),
        failed: results.iter().filter(|r| r.is_none()).count(),
    })
}

fn process_one(
    backend: &impl ImageBackend,
    photo: &Path,
    dir: &Path,
    stem: &str,
    config: &AppConfig,
    options: OutputOptions,
) -> Result<(Vec<PathBuf>, Vec<String>), PipelineError> {
    let landmarks = SidecarLandmarks::for_photo(photo);
    let output = run_file(backend, photo, &landmarks, config)?;
    let written = write_outputs(backend, &output, dir, stem, config, options)?;

    let mut report = output.report(photo);
    report.outputs = written.paths().map(|p| p.display().to_string()).collect();
    let report_path = dir.join(format!("{}.json", crate::imaging::sanitize_file_stem(stem)));
    write_report(&report, &report_path)?;

    let mut outputs: Vec<PathBuf> = written.paths().map(Path::to_path_buf).collect();
    outputs.push(report_path);
    let warnings = output.warnings.iter().map(|w| w.to_string()).collect();
    Ok((outputs, warnings))
}
