//! Sparse auto-placement of spanning tiles.
//!
//! Each item is placed at the first free position at or after the placement
//! cursor where its whole footprint fits; the cursor then moves just past it.
//! Items wider than the grid are clamped to the column count.
//!
//! # Example
//! ```
//! use tileboard::layout::grid::{GridSpec, place};
//! use tileboard::{Rect, TileSize};
//!
//! let spec = GridSpec::new(3, 2, 0);
//! let rects = place(spec, Rect::new(0, 0, 30, 10), &[TileSize::new(2, 1), TileSize::new(2, 1)]);
//! assert_eq!(rects[0], Rect::new(0, 0, 20, 2));
//! assert_eq!(rects[1], Rect::new(0, 2, 20, 2));
//! ```

use crate::geometry::Rect;
use crate::model::TileSize;

/// Grid parameters in terminal cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridSpec {
    pub columns: u16,
    pub row_height: u16,
    pub gap: u16,
}

impl GridSpec {
    pub fn new(columns: u16, row_height: u16, gap: u16) -> Self {
        Self {
            columns: columns.max(1),
            row_height: row_height.max(1),
            gap,
        }
    }

    /// Width of a single column for a canvas of `canvas_width` cells.
    pub fn column_width(&self, canvas_width: u16) -> u16 {
        let gaps = self.gap.saturating_mul(self.columns - 1);
        (canvas_width.saturating_sub(gaps) / self.columns).max(1)
    }

    /// Cells covered by one extra column of span.
    pub fn column_unit(&self, canvas_width: u16) -> f64 {
        f64::from(self.column_width(canvas_width)) + f64::from(self.gap)
    }

    /// Cells covered by one extra row of span.
    pub fn row_unit(&self) -> f64 {
        f64::from(self.row_height) + f64::from(self.gap)
    }
}

struct Occupancy {
    columns: usize,
    rows: Vec<Vec<bool>>,
}

impl Occupancy {
    fn new(columns: usize) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    fn ensure_rows(&mut self, count: usize) {
        while self.rows.len() < count {
            self.rows.push(vec![false; self.columns]);
        }
    }

    fn fits(&mut self, row: usize, col: usize, width: usize, height: usize) -> bool {
        if col + width > self.columns {
            return false;
        }
        self.ensure_rows(row + height);
        (row..row + height).all(|r| (col..col + width).all(|c| !self.rows[r][c]))
    }

    fn mark(&mut self, row: usize, col: usize, width: usize, height: usize) {
        self.ensure_rows(row + height);
        for r in row..row + height {
            for c in col..col + width {
                self.rows[r][c] = true;
            }
        }
    }
}

/// Place `sizes` in order and return one rect per item, offset by the canvas origin.
pub fn place(spec: GridSpec, canvas: Rect, sizes: &[TileSize]) -> Vec<Rect> {
    let columns = usize::from(spec.columns);
    let col_width = spec.column_width(canvas.width);
    let mut grid = Occupancy::new(columns);
    let (mut cursor_row, mut cursor_col) = (0usize, 0usize);
    let mut rects = Vec::with_capacity(sizes.len());

    for size in sizes {
        let width = usize::from(size.col_span.max(1)).min(columns);
        let height = usize::from(size.row_span.max(1));

        let (mut row, mut col) = (cursor_row, cursor_col);
        while !grid.fits(row, col, width, height) {
            col += 1;
            if col + width > columns {
                col = 0;
                row += 1;
            }
        }
        grid.mark(row, col, width, height);
        cursor_row = row;
        cursor_col = col + width;
        if cursor_col >= columns {
            cursor_col = 0;
            cursor_row += 1;
        }

        rects.push(cell_rect(spec, canvas, col_width, row, col, width, height));
    }

    rects
}

fn cell_rect(
    spec: GridSpec,
    canvas: Rect,
    col_width: u16,
    row: usize,
    col: usize,
    width: usize,
    height: usize,
) -> Rect {
    let to_u16 = |value: usize| u16::try_from(value).unwrap_or(u16::MAX);
    let col_step = col_width.saturating_add(spec.gap);
    let row_step = spec.row_height.saturating_add(spec.gap);
    let (width, height) = (to_u16(width), to_u16(height));
    Rect::new(
        canvas.x.saturating_add(col_step.saturating_mul(to_u16(col))),
        canvas.y.saturating_add(row_step.saturating_mul(to_u16(row))),
        col_width
            .saturating_mul(width)
            .saturating_add(spec.gap.saturating_mul(width - 1)),
        spec.row_height
            .saturating_mul(height)
            .saturating_add(spec.gap.saturating_mul(height - 1)),
    )
}
