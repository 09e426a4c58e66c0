//! Pure calculation functions for raster dimensions and sheet layout.
//!
//! All functions here are pure and testable without any I/O or images.

/// Dimensions to pre-shrink a source to before the bicubic warp.
///
/// Bicubic sampling alone aliases badly on large downscales, so any scale
/// below 1 first goes through a Lanczos3 resize to the final size; the warp
/// then only applies the small residual. Returns `None` when no prefilter
/// is needed.
///
/// # Examples
/// ```
/// # use passport_photo::imaging::prefilter_dimensions;
/// assert_eq!(prefilter_dimensions((1200, 1600), 0.5), Some((600, 800)));
/// assert_eq!(prefilter_dimensions((300, 400), 1.5), None);
/// ```
pub fn prefilter_dimensions(source: (u32, u32), scale: f32) -> Option<(u32, u32)> {
    if scale.is_nan() || scale >= 1.0 || scale <= 0.0 {
        return None;
    }
    let (w, h) = source;
    let pw = ((w as f64 * scale as f64).round() as u32).max(1);
    let ph = ((h as f64 * scale as f64).round() as u32).max(1);
    Some((pw, ph))
}

/// Scale still to apply on each axis after prefiltering `source` to
/// `prefiltered`, so the total is `scale` exactly.
pub fn residual_scale(source: (u32, u32), prefiltered: (u32, u32), scale: f32) -> (f32, f32) {
    let sx = prefiltered.0 as f32 / source.0 as f32;
    let sy = prefiltered.1 as f32 / source.1 as f32;
    (scale / sx, scale / sy)
}

/// How many cells of `cell` size fit across `sheet` with `gutter` between
/// cells and `margin` around the outside. Returns `(cols, rows)`.
///
/// ```text
///  margin   cell   gutter   cell   margin
///  |----|--------|------|--------|----|
/// ```
pub fn grid_capacity(sheet: (u32, u32), cell: (u32, u32), gutter: u32, margin: u32) -> (u32, u32) {
    let fit = |total: u32, size: u32| -> u32 {
        let avail = total.saturating_sub(2 * margin);
        if size == 0 || avail < size {
            0
        } else {
            (avail + gutter) / (size + gutter)
        }
    };
    (fit(sheet.0, cell.0), fit(sheet.1, cell.1))
}

/// Cell positions for one print sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLayout {
    pub cols: u32,
    pub rows: u32,
    pub cell: (u32, u32),
    pub gutter: u32,
    /// Top-left corner of the occupied block.
    pub origin: (u32, u32),
}

impl GridLayout {
    /// Top-left pixel of cell `index`, row-major.
    pub fn position(&self, index: u32) -> (u32, u32) {
        let col = index % self.cols;
        let row = index / self.cols;
        (
            self.origin.0 + col * (self.cell.0 + self.gutter),
            self.origin.1 + row * (self.cell.1 + self.gutter),
        )
    }

    pub fn positions(&self, count: u32) -> Vec<(u32, u32)> {
        (0..count).map(|i| self.position(i)).collect()
    }

    /// Width and height of the occupied block.
    pub fn block_size(&self) -> (u32, u32) {
        (
            self.cols * self.cell.0 + self.cols.saturating_sub(1) * self.gutter,
            self.rows * self.cell.1 + self.rows.saturating_sub(1) * self.gutter,
        )
    }
}

/// Lay out `copies` cells row-major with the occupied block centered on the
/// sheet. `None` when `copies` is zero or more than the sheet holds.
pub fn plan_grid(
    sheet: (u32, u32),
    cell: (u32, u32),
    gutter: u32,
    margin: u32,
    copies: u32,
) -> Option<GridLayout> {
    let (max_cols, max_rows) = grid_capacity(sheet, cell, gutter, margin);
    if copies == 0 || copies > max_cols * max_rows {
        return None;
    }
    let cols = copies.min(max_cols);
    let rows = copies.div_ceil(cols);
    let mut layout = GridLayout {
        cols,
        rows,
        cell,
        gutter,
        origin: (0, 0),
    };
    let (block_w, block_h) = layout.block_size();
    layout.origin = ((sheet.0 - block_w) / 2, (sheet.1 - block_h) / 2);
    Some(layout)
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // prefilter
    // =========================================================================

    #[test]
    fn prefilter_only_for_downscale() {
        assert_eq!(prefilter_dimensions((1200, 1600), 0.7677), Some((921, 1228)));
        assert_eq!(prefilter_dimensions((1200, 1600), 1.0), None);
        assert_eq!(prefilter_dimensions((1200, 1600), 2.0), None);
    }

    #[test]
    fn prefilter_never_collapses_to_zero() {
        assert_eq!(prefilter_dimensions((10, 3), 0.01), Some((1, 1)));
    }

    #[test]
    fn prefilter_rejects_degenerate_scale() {
        assert_eq!(prefilter_dimensions((100, 100), 0.0), None);
        assert_eq!(prefilter_dimensions((100, 100), f32::NAN), None);
    }

    #[test]
    fn residual_restores_total_scale() {
        let source = (1200, 1600);
        let scale = 0.7677;
        let pre = prefilter_dimensions(source, scale).unwrap();
        let (rx, ry) = residual_scale(source, pre, scale);
        assert!((pre.0 as f32 * rx - 1200.0 * scale).abs() < 1e-3);
        assert!((pre.1 as f32 * ry - 1600.0 * scale).abs() < 1e-3);
        assert!((rx - 1.0).abs() < 0.01);
    }

    // =========================================================================
    // grid
    // =========================================================================

    #[test]
    fn six_by_four_holds_six_passport_photos() {
        assert_eq!(grid_capacity((1800, 1200), (600, 600), 0, 0), (3, 2));
    }

    #[test]
    fn gutter_and_margin_reduce_capacity() {
        // 1800 - 2*20 = 1760: two cells + gutter = 1230, three would need 1840
        assert_eq!(grid_capacity((1800, 1200), (600, 600), 30, 20), (2, 1));
    }

    #[test]
    fn cell_larger_than_sheet_fits_nothing() {
        assert_eq!(grid_capacity((500, 500), (600, 600), 0, 0), (0, 0));
        assert_eq!(grid_capacity((1800, 1200), (600, 600), 0, 1000), (0, 0));
    }

    #[test]
    fn full_sheet_starts_at_origin() {
        let layout = plan_grid((1800, 1200), (600, 600), 0, 0, 6).unwrap();
        assert_eq!((layout.cols, layout.rows), (3, 2));
        assert_eq!(
            layout.positions(6),
            vec![
                (0, 0),
                (600, 0),
                (1200, 0),
                (0, 600),
                (600, 600),
                (1200, 600)
            ]
        );
    }

    #[test]
    fn partial_sheet_is_centered() {
        let layout = plan_grid((1800, 1200), (600, 600), 0, 0, 2).unwrap();
        assert_eq!((layout.cols, layout.rows), (2, 1));
        assert_eq!(layout.positions(2), vec![(300, 300), (900, 300)]);
    }

    #[test]
    fn gutter_spaces_cells_apart() {
        let layout = plan_grid((1800, 1200), (500, 500), 40, 0, 4).unwrap();
        assert_eq!((layout.cols, layout.rows), (3, 2));
        assert_eq!(layout.block_size(), (1580, 1040));
        assert_eq!(layout.position(1).0 - layout.position(0).0, 540);
        assert_eq!(layout.position(3), (layout.origin.0, layout.origin.1 + 540));
    }

    #[test]
    fn too_many_or_zero_copies_have_no_layout() {
        assert_eq!(plan_grid((1800, 1200), (600, 600), 0, 0, 7), None);
        assert_eq!(plan_grid((1800, 1200), (600, 600), 0, 0, 50), None);
        assert_eq!(plan_grid((1800, 1200), (600, 600), 0, 0, 0), None);
    }
}
