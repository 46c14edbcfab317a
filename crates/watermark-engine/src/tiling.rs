//! Brick-offset tile grid for repeating watermark text.
//!
//! Columns are spaced `width / (density * 2)` apart, rows 1.5x that, and
//! every odd row is shifted right by half a column. One extra row and
//! column of overscan sit on each side so rotated text at the border
//! leaves no gaps.

use tracing::debug;

use crate::layer::DENSITY_RANGE;

/// Ratio between vertical and horizontal tile spacing.
pub const ROW_SPACING_FACTOR: f32 = 1.5;

/// Anchor point of a single tile, in surface pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileAnchor {
    pub x: f32,
    pub y: f32,
}

/// Tile anchors plus the spacing they were generated with.
#[derive(Debug, Clone, PartialEq)]
pub struct TileGrid {
    pub num_columns: u32,
    pub step_x: f32,
    pub step_y: f32,
    pub anchors: Vec<TileAnchor>,
}

impl TileGrid {
    /// Horizontal offset applied to the row at `y` (0 or `step_x / 2`).
    pub fn row_offset(&self, y: f32) -> f32 {
        let row = (y / self.step_y).round() as i64;
        if row.rem_euclid(2) == 0 {
            0.0
        } else {
            self.step_x / 2.0
        }
    }

    /// Anchors belonging to the row at `y`, left to right.
    pub fn row(&self, y: f32) -> impl Iterator<Item = &TileAnchor> {
        self.anchors.iter().filter(move |a| a.y == y)
    }
}

/// Compute the tile anchors covering a `width` x `height` surface.
///
/// `density` is clamped to 1..=10. A zero-width surface yields no anchors.
pub fn compute_tile_grid(width: f32, height: f32, density: u32) -> TileGrid {
    let density = density.clamp(*DENSITY_RANGE.start(), *DENSITY_RANGE.end());
    let num_columns = density * 2;
    let step_x = width / num_columns as f32;
    let step_y = step_x * ROW_SPACING_FACTOR;

    if !step_x.is_finite() || step_x <= 0.0 || !height.is_finite() {
        debug!(width, height, density, "Degenerate surface, no tiles");
        return TileGrid {
            num_columns,
            step_x,
            step_y,
            anchors: Vec::new(),
        };
    }

    let mut anchors = Vec::new();
    // Row and column indices are integers so parity never drifts with
    // accumulated floating point error.
    let mut row: i64 = -1;
    loop {
        let y = row as f32 * step_y;
        if y >= height + step_y {
            break;
        }
        let offset_x = if row.rem_euclid(2) == 0 {
            0.0
        } else {
            step_x / 2.0
        };

        let mut col: i64 = -1;
        loop {
            let x = col as f32 * step_x;
            if x >= width + step_x {
                break;
            }
            anchors.push(TileAnchor {
                x: x + offset_x,
                y,
            });
            col += 1;
        }
        row += 1;
    }

    debug!(
        width,
        height,
        density,
        step_x,
        step_y,
        tiles = anchors.len(),
        "Computed tile grid"
    );

    TileGrid {
        num_columns,
        step_x,
        step_y,
        anchors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contains(grid: &TileGrid, x: f32, y: f32) -> bool {
        grid.anchors
            .iter()
            .any(|a| (a.x - x).abs() < 1e-3 && (a.y - y).abs() < 1e-3)
    }

    #[test]
    fn density_three_on_600_wide_surface() {
        let grid = compute_tile_grid(600.0, 400.0, 3);
        assert_eq!(grid.num_columns, 6);
        assert_eq!(grid.step_x, 100.0);
        assert_eq!(grid.step_y, 150.0);

        // Row y=0 is even and unshifted, the overscan row above is odd.
        assert!(contains(&grid, 0.0, 0.0));
        assert!(contains(&grid, 100.0, 0.0));
        assert!(contains(&grid, -50.0, -150.0));
        assert!(contains(&grid, 50.0, -150.0));
        assert!(contains(&grid, 50.0, 150.0));
        assert!(!contains(&grid, 0.0, -150.0));
    }

    #[test]
    fn vertical_step_is_one_and_a_half_horizontal() {
        for density in 1..=10 {
            let grid = compute_tile_grid(733.0, 211.0, density);
            assert_eq!(grid.num_columns, density * 2);
            assert!((grid.step_y - grid.step_x * 1.5).abs() < 1e-4);
        }
    }

    #[test]
    fn rows_cover_overscan_band() {
        let grid = compute_tile_grid(600.0, 400.0, 3);
        let mut ys: Vec<f32> = grid.anchors.iter().map(|a| a.y).collect();
        ys.dedup();
        // -150, 0, 150, 300, 450 (450 < 400 + 150)
        assert_eq!(ys, vec![-150.0, 0.0, 150.0, 300.0, 450.0]);

        let first_row: Vec<f32> = grid.row(0.0).map(|a| a.x).collect();
        // -100 .. 600 inclusive, 600 < 600 + 100
        assert_eq!(first_row.len(), 8);
        assert_eq!(first_row.first().copied(), Some(-100.0));
        assert_eq!(first_row.last().copied(), Some(600.0));
    }

    #[test]
    fn each_row_spans_all_columns_before_overscan() {
        for density in 1..=10 {
            let width = 480.0;
            let grid = compute_tile_grid(width, 300.0, density);
            let half = grid.step_x / 2.0;
            let inside = grid
                .row(0.0)
                .filter(|a| a.x > -half && a.x < width - half)
                .count();
            assert_eq!(inside as u32, density * 2, "density {density}");
        }
    }

    #[test]
    fn alternating_rows_are_offset_by_half_a_column() {
        let grid = compute_tile_grid(500.0, 900.0, 4);
        let half = grid.step_x / 2.0;
        let first_x = |y: f32| grid.row(y).next().map(|a| a.x).unwrap();

        for k in 0..4 {
            let y0 = k as f32 * grid.step_y;
            let y1 = (k + 1) as f32 * grid.step_y;
            let y2 = (k + 2) as f32 * grid.step_y;
            assert!(((first_x(y1) - first_x(y0)).abs() - half).abs() < 1e-3);
            assert!((first_x(y2) - first_x(y0)).abs() < 1e-3);
        }
    }

    #[test]
    fn row_offset_matches_parity() {
        let grid = compute_tile_grid(600.0, 400.0, 3);
        assert_eq!(grid.row_offset(0.0), 0.0);
        assert_eq!(grid.row_offset(-150.0), 50.0);
        assert_eq!(grid.row_offset(150.0), 50.0);
        assert_eq!(grid.row_offset(300.0), 0.0);
    }

    #[test]
    fn density_is_clamped() {
        let low = compute_tile_grid(100.0, 100.0, 0);
        assert_eq!(low.num_columns, 2);
        let high = compute_tile_grid(100.0, 100.0, 40);
        assert_eq!(high.num_columns, 20);
    }

    #[test]
    fn zero_width_surface_has_no_tiles() {
        let grid = compute_tile_grid(0.0, 100.0, 3);
        assert!(grid.anchors.is_empty());
    }

    #[test]
    fn density_one_yields_large_tiles() {
        let grid = compute_tile_grid(200.0, 200.0, 1);
        assert_eq!(grid.step_x, 100.0);
        assert_eq!(grid.step_y, 150.0);
        assert!(contains(&grid, 50.0, 150.0));
    }
}
