//! CLI output formatting for every command.
//!
//! # Information-First Display
//!
//! Each result leads with what was achieved (millimeters, copies, counts) and
//! shows file paths as indented secondary lines, so the output reads as a
//! verdict on the photo rather than a list of files.
//!
//! # Output Format
//!
//! ## Process
//!
//! ```text
//! Photo me.jpg
//!     Variant: india (head-height-first)
//!     Head: 26.0mm (allowed 25.0-35.0)
//!     Eye line: 31.0mm from bottom (allowed 28.0-34.0)
//!     Scale: 0.768, offset (-160.6, -303.5)
//! Warnings
//!     ! Attire may be too white (bottom of image is very light)
//! Outputs
//!     out/me.jpg
//!     out/me_preview.jpg
//! ```
//!
//! ## Batch
//!
//! ```text
//! 001 anna.jpg
//!     Source: photos/anna.jpg
//!     -> out/anna.jpg
//! 002 zed.jpg
//!     Source: photos/zed.jpg
//!     Failed: No face detected. Use a clear, front-facing photo
//!
//! Processed 1 of 2 photos (0 with warnings, 1 failed)
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::batch::{BatchEvent, BatchSummary};
use crate::sheet::Sheet;
use crate::target::{PhotoVariant, TargetSpec};
use crate::types::RunReport;
use std::path::Path;

// ============================================================================
// Shared display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Positional index plus file name, falling back to the full path.
///
/// ```text
/// 001 anna.jpg
/// ```
fn photo_line(index: usize, source: &Path) -> String {
    let name = source
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| source.display().to_string());
    format!("{} {}", format_index(index), name)
}

fn range_mm(min: f32, max: f32) -> String {
    format!("{min:.1}-{max:.1}")
}

// ============================================================================
// Process
// ============================================================================

/// Format the result of one photo run.
pub fn format_run_report(report: &RunReport) -> Vec<String> {
    let spec = report.variant.spec();
    let t = &report.transform;
    let mut lines = vec![
        format!("Photo {}", report.source),
        format!("{}Variant: {} ({})", indent(1), report.variant, report.policy),
        format!(
            "{}Head: {:.1}mm (allowed {})",
            indent(1),
            report.head_height_mm,
            range_mm(spec.head_min_mm, spec.head_max_mm)
        ),
        format!(
            "{}Eye line: {:.1}mm from bottom (allowed {})",
            indent(1),
            report.eye_line_mm,
            range_mm(spec.eye_min_mm, spec.eye_max_mm)
        ),
        format!(
            "{}Scale: {:.3}, offset ({:.1}, {:.1})",
            indent(1),
            t.scale,
            t.translate_x,
            t.translate_y
        ),
    ];

    if report.warnings.is_empty() {
        lines.push("No warnings".to_string());
    } else {
        lines.push("Warnings".to_string());
        for warning in &report.warnings {
            lines.push(format!("{}! {}", indent(1), warning));
        }
    }

    if !report.outputs.is_empty() {
        lines.push("Outputs".to_string());
        for path in &report.outputs {
            lines.push(format!("{}{}", indent(1), path));
        }
    }
    lines
}

pub fn print_run_report(report: &RunReport) {
    for line in format_run_report(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Sheet
// ============================================================================

/// Format a written print sheet.
///
/// ```text
/// Sheet 6 copies (3x2), 1800x1200 px @ 300 DPI
///     out/me_sheet.jpg
/// ```
pub fn format_sheet_output(sheet: &Sheet, path: &Path) -> Vec<String> {
    let (w, h) = sheet.image.dimensions();
    vec![
        format!(
            "Sheet {} {} ({}x{}), {}x{} px @ {} DPI",
            sheet.copies,
            if sheet.copies == 1 { "copy" } else { "copies" },
            sheet.grid.cols,
            sheet.grid.rows,
            w,
            h,
            sheet.dpi
        ),
        format!("{}{}", indent(1), path.display()),
    ]
}

pub fn print_sheet_output(sheet: &Sheet, path: &Path) {
    for line in format_sheet_output(sheet, path) {
        println!("{}", line);
    }
}

// ============================================================================
// Batch
// ============================================================================

/// Format a single batch progress event as display lines.
pub fn format_batch_event(event: &BatchEvent) -> Vec<String> {
    match event {
        BatchEvent::Processed {
            index,
            source,
            outputs,
            warnings,
        } => {
            let mut lines = vec![
                photo_line(*index, source),
                format!("{}Source: {}", indent(1), source.display()),
            ];
            for path in outputs {
                lines.push(format!("{}-> {}", indent(1), path.display()));
            }
            for warning in warnings {
                lines.push(format!("{}! {}", indent(1), warning));
            }
            lines
        }
        BatchEvent::Failed {
            index,
            source,
            error,
        } => vec![
            photo_line(*index, source),
            format!("{}Source: {}", indent(1), source.display()),
            format!("{}Failed: {}", indent(1), error),
        ],
    }
}

pub fn format_batch_summary(summary: &BatchSummary) -> String {
    format!(
        "Processed {} of {} photos ({} with warnings, {} failed)",
        summary.processed, summary.discovered, summary.warned, summary.failed
    )
}

pub fn print_batch_summary(summary: &BatchSummary) {
    println!();
    println!("{}", format_batch_summary(summary));
}

// ============================================================================
// Variants
// ============================================================================

fn variant_lines(variant: PhotoVariant, spec: &TargetSpec) -> Vec<String> {
    let px = spec.canvas_px();
    vec![
        variant.to_string(),
        format!(
            "{}Canvas: {} x {} in, {}x{} px @ {} DPI",
            indent(1),
            spec.canvas_in,
            spec.canvas_in,
            px,
            px,
            spec.dpi
        ),
        format!(
            "{}Head: {} mm, target {:.1}",
            indent(1),
            range_mm(spec.head_min_mm, spec.head_max_mm),
            spec.head_target_mm
        ),
        format!(
            "{}Eye line: {} mm from bottom",
            indent(1),
            range_mm(spec.eye_min_mm, spec.eye_max_mm)
        ),
    ]
}

/// Format every built-in photo variant with its requirements.
pub fn format_variants() -> Vec<String> {
    PhotoVariant::ALL
        .iter()
        .flat_map(|&v| variant_lines(v, &v.spec()))
        .collect()
}

pub fn print_variants() {
    for line in format_variants() {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compliance::{Warning, WarningSet};
    use crate::imaging::GridLayout;
    use crate::measure::Measurement;
    use crate::normalize::{Axis, Transform};
    use image::RgbImage;
    use std::path::PathBuf;

    fn report() -> RunReport {
        RunReport {
            source: "me.jpg".to_string(),
            variant: PhotoVariant::India,
            policy: "head-height-first".to_string(),
            measurement: Measurement {
                head_height_px: 400.0,
                eye_line_y_px: 900.0,
                chin_y_px: 720.0,
                crown_y_px: 1120.0,
                face_center_x_px: 600.0,
                image_height_px: 1600,
            },
            transform: Transform {
                scale: 0.76772,
                translate_x: -160.63,
                translate_y: -303.54,
            },
            head_height_mm: 26.0,
            eye_line_mm: 31.0,
            warnings: WarningSet::new(),
            outputs: vec![],
        }
    }

    // =========================================================================
    // Helper tests
    // =========================================================================

    #[test]
    fn format_index_pads() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(1234), "1234");
    }

    #[test]
    fn indent_levels() {
        assert_eq!(indent(0), "");
        assert_eq!(indent(2), "        ");
    }

    #[test]
    fn photo_line_uses_file_name() {
        assert_eq!(photo_line(3, Path::new("in/family/ben.png")), "003 ben.png");
    }

    // =========================================================================
    // Process
    // =========================================================================

    #[test]
    fn clean_report() {
        let lines = format_run_report(&report());
        assert_eq!(
            lines,
            vec![
                "Photo me.jpg",
                "    Variant: india (head-height-first)",
                "    Head: 26.0mm (allowed 25.0-35.0)",
                "    Eye line: 31.0mm from bottom (allowed 28.0-34.0)",
                "    Scale: 0.768, offset (-160.6, -303.5)",
                "No warnings",
            ]
        );
    }

    #[test]
    fn report_with_warnings_and_outputs() {
        let mut r = report();
        r.warnings.insert(Warning::FrameClipped {
            axis: Axis::Horizontal,
        });
        r.outputs = vec!["out/me.jpg".to_string(), "out/me_preview.jpg".to_string()];

        let lines = format_run_report(&r);
        assert_eq!(lines[5], "Warnings");
        assert!(lines[6].starts_with("    ! Photo does not cover the horizontal extent"));
        assert_eq!(lines[7], "Outputs");
        assert_eq!(lines[8], "    out/me.jpg");
        assert_eq!(lines[9], "    out/me_preview.jpg");
    }

    // =========================================================================
    // Sheet
    // =========================================================================

    #[test]
    fn sheet_line() {
        let sheet = Sheet {
            image: RgbImage::new(1800, 1200),
            dpi: 300,
            copies: 6,
            grid: GridLayout {
                cols: 3,
                rows: 2,
                cell: (600, 600),
                gutter: 0,
                origin: (0, 0),
            },
        };
        let lines = format_sheet_output(&sheet, Path::new("out/me_sheet.jpg"));
        assert_eq!(lines[0], "Sheet 6 copies (3x2), 1800x1200 px @ 300 DPI");
        assert_eq!(lines[1], "    out/me_sheet.jpg");
    }

    // =========================================================================
    // Batch
    // =========================================================================

    #[test]
    fn batch_processed_event() {
        let event = BatchEvent::Processed {
            index: 1,
            source: PathBuf::from("photos/anna.jpg"),
            outputs: vec![PathBuf::from("out/anna.jpg")],
            warnings: vec!["Attire may be too white".to_string()],
        };
        assert_eq!(
            format_batch_event(&event),
            vec![
                "001 anna.jpg",
                "    Source: photos/anna.jpg",
                "    -> out/anna.jpg",
                "    ! Attire may be too white",
            ]
        );
    }

    #[test]
    fn batch_failed_event() {
        let event = BatchEvent::Failed {
            index: 2,
            source: PathBuf::from("photos/zed.jpg"),
            error: "No face detected in the photo".to_string(),
        };
        let lines = format_batch_event(&event);
        assert_eq!(lines[0], "002 zed.jpg");
        assert_eq!(lines[2], "    Failed: No face detected in the photo");
    }

    #[test]
    fn batch_summary_line() {
        let summary = BatchSummary {
            discovered: 4,
            processed: 3,
            warned: 1,
            failed: 1,
        };
        assert_eq!(
            format_batch_summary(&summary),
            "Processed 3 of 4 photos (1 with warnings, 1 failed)"
        );
    }

    // =========================================================================
    // Variants
    // =========================================================================

    #[test]
    fn variants_list_every_spec() {
        let lines = format_variants();
        assert_eq!(lines.len(), 4 * PhotoVariant::ALL.len());
        assert_eq!(lines[0], "india");
        assert_eq!(lines[1], "    Canvas: 2 x 2 in, 600x600 px @ 300 DPI");
        assert_eq!(lines[2], "    Head: 25.0-35.0 mm, target 26.0");
        assert_eq!(lines[3], "    Eye line: 28.0-34.0 mm from bottom");
        assert_eq!(lines[4], "united-states");
    }
}
