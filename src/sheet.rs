//! Print sheet: several copies of one composite on a 6x4 in canvas.
//!
//! Cells are laid out row-major and the occupied block is centered. With the
//! stock layout (no gutter, no margin) six 600 px photos exactly fill the
//! 1800x1200 sheet:
//!
//! ```text
//! ┌──────┬──────┬──────┐
//! │  1   │  2   │  3   │
//! ├──────┼──────┼──────┤
//! │  4   │  5   │  6   │
//! └──────┴──────┴──────┘
//! ```
//!
//! Cut guides are drawn last, as outlines around each cell centered in the
//! gutter. They stay clear of the photo only when `gutter_px` is at least
//! twice `guide_px`. The stock sheet has no gutter (six copies leave no spare
//! pixel), so there the guides are painted over the outermost `guide_px`
//! pixels of every copy, which is background at the canvas edge. Turn guides
//! off, or trade copies for a gutter, when every pixel must survive.

use crate::compositor::Composite;
use crate::imaging::{GridLayout, WHITE, grid_capacity, plan_grid};
use image::imageops;
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use thiserror::Error;
use tracing::debug;

const GUIDE_COLOR: Rgb<u8> = Rgb([160, 160, 160]);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SheetError {
    #[error("{requested} copies requested but the sheet holds at most {max}")]
    TooManyCopiesRequested { requested: u32, max: u32 },
    #[error("At least one copy is required")]
    NoCopiesRequested,
}

/// Physical sheet and spacing. Pixel values are at the composite's DPI.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SheetLayout {
    pub width_in: f32,
    pub height_in: f32,
    /// Space between neighbouring cells. Cut guides cover the outer
    /// `guide_px - gutter_px / 2` pixels of each copy when this is narrower
    /// than two guides.
    pub gutter_px: u32,
    /// Blank border around the whole sheet.
    pub margin_px: u32,
    /// Thickness of cut guides.
    pub guide_px: u32,
}

impl Default for SheetLayout {
    fn default() -> Self {
        Self {
            width_in: 6.0,
            height_in: 4.0,
            gutter_px: 0,
            margin_px: 0,
            guide_px: 2,
        }
    }
}

impl SheetLayout {
    pub fn size_px(&self, dpi: u32) -> (u32, u32) {
        (
            (self.width_in * dpi as f32).round() as u32,
            (self.height_in * dpi as f32).round() as u32,
        )
    }

    /// Most copies of a `cell`-sized photo that fit at `dpi`.
    pub fn capacity(&self, cell: u32, dpi: u32) -> u32 {
        let (cols, rows) = grid_capacity(
            self.size_px(dpi),
            (cell, cell),
            self.gutter_px,
            self.margin_px,
        );
        cols * rows
    }
}

/// Finished print sheet.
#[derive(Debug, Clone)]
pub struct Sheet {
    pub image: RgbImage,
    pub dpi: u32,
    pub copies: u32,
    pub grid: GridLayout,
}

/// Place `copies` of `composite` on a white sheet.
pub fn tile_sheet(
    composite: &Composite,
    copies: u32,
    with_guides: bool,
    layout: &SheetLayout,
) -> Result<Sheet, SheetError> {
    if copies == 0 {
        return Err(SheetError::NoCopiesRequested);
    }

    let dpi = composite.dpi();
    let size = layout.size_px(dpi);
    let cell = composite.size();
    let grid = plan_grid(size, (cell, cell), layout.gutter_px, layout.margin_px, copies)
        .ok_or_else(|| SheetError::TooManyCopiesRequested {
            requested: copies,
            max: layout.capacity(cell, dpi),
        })?;

    let mut image = RgbImage::from_pixel(size.0, size.1, WHITE);
    let positions = grid.positions(copies);
    for &(x, y) in &positions {
        imageops::replace(&mut image, composite.image(), x as i64, y as i64);
    }

    if with_guides && layout.guide_px > 0 {
        for &(x, y) in &positions {
            draw_cut_guide(&mut image, x, y, cell, layout);
        }
    }

    debug!(
        copies,
        cols = grid.cols,
        rows = grid.rows,
        width = size.0,
        height = size.1,
        "Tiled sheet"
    );

    Ok(Sheet {
        image,
        dpi,
        copies,
        grid,
    })
}

/// Outline one cell, expanded into the gutter by half its width.
fn draw_cut_guide(image: &mut RgbImage, x: u32, y: u32, cell: u32, layout: &SheetLayout) {
    let half_gutter = (layout.gutter_px / 2) as i32;
    for i in 0..layout.guide_px as i32 {
        let inset = i - half_gutter;
        let side = cell as i32 - 2 * inset;
        if side <= 0 {
            break;
        }
        let rect = Rect::at(x as i32 + inset, y as i32 + inset).of_size(side as u32, side as u32);
        draw_hollow_rect_mut(image, rect, GUIDE_COLOR);
    }
}
