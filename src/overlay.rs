//! Measurement overlay for previewing a composite.
//!
//! The overlay is a **separate** raster drawn on a copy of the composite; the
//! composite itself is never touched, and the overlay is never exported as
//! the final photo.
//!
//! ```text
//!        ──── red ────   crown      HEAD 26.0MM
//!        ──── red ────   chin
//! ═════════════ blue ═══════════ eye line
//!                                      EYE 31.0MM
//! ```
//!
//! Labels use a small built-in 5x7 bitmap font so no font files are needed.

use crate::compositor::Composite;
use crate::target::TargetSpec;
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;
use serde::Serialize;

pub const RED: Rgb<u8> = Rgb([255, 0, 0]);
pub const BLUE: Rgb<u8> = Rgb([0, 0, 255]);

const LINE_WIDTH: u32 = 2;
/// Half-length of the crown and chin segments.
const GUIDE_HALF_LEN: i32 = 60;
const GLYPH_SCALE: u32 = 2;

/// What a guide line marks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Guide {
    Crown,
    Chin,
    EyeLine,
}

/// One horizontal guide line, canvas pixels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Annotation {
    pub guide: Guide,
    pub row: u32,
    pub from_x: u32,
    pub to_x: u32,
    #[serde(skip)]
    pub color: Rgb<u8>,
}

/// One text label, top-left corner in canvas pixels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Label {
    pub text: String,
    pub x: u32,
    pub y: u32,
    #[serde(skip)]
    pub color: Rgb<u8>,
}

/// Preview raster plus what was drawn on it.
#[derive(Debug, Clone)]
pub struct Overlay {
    pub image: RgbImage,
    pub annotations: Vec<Annotation>,
    pub labels: Vec<Label>,
}

impl Overlay {
    pub fn annotation(&self, guide: Guide) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.guide == guide)
    }
}

pub fn head_label(head_mm: f32) -> String {
    format!("HEAD {head_mm:.1}MM")
}

pub fn eye_label(eye_mm: f32) -> String {
    format!("EYE {eye_mm:.1}MM")
}

/// Draw crown/chin/eye guides with millimeter labels over a copy of the
/// composite.
pub fn render_overlay(composite: &Composite, spec: &TargetSpec) -> Overlay {
    let mut image = composite.image().clone();
    let size = image.width();
    let g = composite.geometry();
    let last_row = size.saturating_sub(LINE_WIDTH) as f32;
    let row = |r: f32| r.round().clamp(0.0, last_row) as u32;

    let cx = g.center_x.round() as i32;
    let seg_from = (cx - GUIDE_HALF_LEN).clamp(0, size as i32) as u32;
    let seg_to = (cx + GUIDE_HALF_LEN).clamp(0, size as i32) as u32;

    let annotations = vec![
        Annotation {
            guide: Guide::Crown,
            row: row(g.crown_row),
            from_x: seg_from,
            to_x: seg_to,
            color: RED,
        },
        Annotation {
            guide: Guide::Chin,
            row: row(g.chin_row),
            from_x: seg_from,
            to_x: seg_to,
            color: RED,
        },
        Annotation {
            guide: Guide::EyeLine,
            row: row(g.eye_row),
            from_x: 0,
            to_x: size,
            color: BLUE,
        },
    ];
    for a in &annotations {
        draw_hline(&mut image, a);
    }

    let head_mm = spec.px_to_mm(g.head_height_px());
    let eye_mm = spec.px_to_mm(size as f32 - g.eye_row);

    let head_text = head_label(head_mm);
    let head_y = row((g.crown_row + g.chin_row) / 2.0);
    let head = place_label(head_text, seg_to as i32 + 5, head_y as i32, RED, size);

    let eye_text = eye_label(eye_mm);
    let eye_x = size as i32 - glyphs::text_width(&eye_text, GLYPH_SCALE) as i32 - 4;
    let eye = place_label(eye_text, eye_x, row(g.eye_row) as i32 + 5, BLUE, size);

    let labels = vec![head, eye];
    for l in &labels {
        glyphs::draw_text(&mut image, &l.text, l.x, l.y, GLYPH_SCALE, l.color);
    }

    Overlay {
        image,
        annotations,
        labels,
    }
}

fn draw_hline(image: &mut RgbImage, a: &Annotation) {
    if a.to_x <= a.from_x {
        return;
    }
    let rect = Rect::at(a.from_x as i32, a.row as i32).of_size(a.to_x - a.from_x, LINE_WIDTH);
    draw_filled_rect_mut(image, rect, a.color);
}

/// Keep the whole label inside the canvas.
fn place_label(text: String, x: i32, y: i32, color: Rgb<u8>, size: u32) -> Label {
    let w = glyphs::text_width(&text, GLYPH_SCALE) as i32;
    let h = glyphs::text_height(GLYPH_SCALE) as i32;
    let max_x = (size as i32 - w).max(0);
    let max_y = (size as i32 - h).max(0);
    Label {
        text,
        x: x.clamp(0, max_x) as u32,
        y: y.clamp(0, max_y) as u32,
        color,
    }
}

mod glyphs {
    use image::{Rgb, RgbImage};
    use imageproc::drawing::draw_filled_rect_mut;
    use imageproc::rect::Rect;

    const WIDTH: u32 = 5;
    const HEIGHT: u32 = 7;
    const SPACING: u32 = 1;

    /// Rows top to bottom, bit 4 is the leftmost column.
    fn glyph(c: char) -> Option<[u8; 7]> {
        let rows = match c.to_ascii_uppercase() {
            '0' => [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E],
            '1' => [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E],
            '2' => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F],
            '3' => [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E],
            '4' => [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02],
            '5' => [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E],
            '6' => [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E],
            '7' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
            '8' => [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E],
            '9' => [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C],
            '.' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x0C, 0x0C],
            ':' => [0x00, 0x0C, 0x0C, 0x00, 0x0C, 0x0C, 0x00],
            '-' => [0x00, 0x00, 0x00, 0x1F, 0x00, 0x00, 0x00],
            'A' => [0x0E, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
            'D' => [0x1E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x1E],
            'E' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x1F],
            'H' => [0x11, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
            'M' => [0x11, 0x1B, 0x15, 0x15, 0x11, 0x11, 0x11],
            'Y' => [0x11, 0x11, 0x0A, 0x04, 0x04, 0x04, 0x04],
            ' ' => [0x00; 7],
            _ => return None,
        };
        Some(rows)
    }

    pub fn text_width(text: &str, scale: u32) -> u32 {
        let n = text.chars().count() as u32;
        if n == 0 {
            return 0;
        }
        (n * (WIDTH + SPACING) - SPACING) * scale
    }

    pub fn text_height(scale: u32) -> u32 {
        HEIGHT * scale
    }

    /// Draw `text` with its top-left at `(x, y)`. Characters without a glyph
    /// advance like a space.
    pub fn draw_text(image: &mut RgbImage, text: &str, x: u32, y: u32, scale: u32, color: Rgb<u8>) {
        let mut pen_x = x;
        for c in text.chars() {
            if let Some(rows) = glyph(c) {
                for (dy, bits) in rows.iter().enumerate() {
                    for dx in 0..WIDTH {
                        if bits & (1 << (WIDTH - 1 - dx)) != 0 {
                            let rect = Rect::at(
                                (pen_x + dx * scale) as i32,
                                (y + dy as u32 * scale) as i32,
                            )
                            .of_size(scale, scale);
                            draw_filled_rect_mut(image, rect, color);
                        }
                    }
                }
            }
            pen_x += (WIDTH + SPACING) * scale;
        }
    }

}
