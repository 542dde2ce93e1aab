//! Grid geometry: rectangles in grid units and their mapping to terminal
//! cells.
//!
//! Window geometry never leaves grid units. Conversion to the host's
//! coordinate space (terminal columns and rows here) happens only through
//! [`GridMetrics`] at render and hit-test time.

use ratatui::prelude::Rect;

use crate::constants::{GRID_SIZE, MIN_WINDOW_SIZE};
use crate::window::{WindowId, WindowSet};

/// Integer rectangle measured in grid cells.
///
/// Signed so intermediate placement candidates can be expressed before they
/// are validated against the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct GridRect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl GridRect {
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    pub const fn right(self) -> i32 {
        self.x + self.w
    }

    pub const fn bottom(self) -> i32 {
        self.y + self.h
    }

    pub fn overlaps(self, other: GridRect) -> bool {
        rects_overlap(self, other)
    }

    pub fn with_origin(self, x: i32, y: i32) -> Self {
        Self { x, y, ..self }
    }

    pub fn contains_cell(self, col: i32, row: i32) -> bool {
        col >= self.x && col < self.right() && row >= self.y && row < self.bottom()
    }

    /// True when the rect satisfies the placement invariant: fully on the
    /// grid and at least `MIN_WINDOW_SIZE` on both axes.
    pub fn is_valid(self) -> bool {
        self.x >= 0
            && self.y >= 0
            && self.right() <= GRID_SIZE
            && self.bottom() <= GRID_SIZE
            && self.w >= MIN_WINDOW_SIZE
            && self.h >= MIN_WINDOW_SIZE
    }

    /// Force an arbitrary caller-supplied rect into a valid one: size is
    /// clamped into `[MIN_WINDOW_SIZE, GRID_SIZE]`, then the origin is
    /// clamped so the rect stays on the grid.
    pub fn sanitize(self) -> Self {
        let w = self.w.clamp(MIN_WINDOW_SIZE, GRID_SIZE);
        let h = self.h.clamp(MIN_WINDOW_SIZE, GRID_SIZE);
        clamp(GridRect { w, h, ..self }, GRID_SIZE)
    }
}

impl std::fmt::Display for GridRect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{{},{} {}x{}}}", self.x, self.y, self.w, self.h)
    }
}

/// Half-open overlap test: rectangles that only share an edge do not
/// overlap.
pub fn rects_overlap(a: GridRect, b: GridRect) -> bool {
    !(a.right() <= b.x || b.right() <= a.x || a.bottom() <= b.y || b.bottom() <= a.y)
}

/// Ids of the non-minimized windows whose rect overlaps `rect`, skipping
/// `exclude`. Results come back in ascending id order.
pub fn find_conflicts(
    rect: GridRect,
    exclude: Option<WindowId>,
    windows: &WindowSet,
) -> Vec<WindowId> {
    windows
        .values()
        .filter(|window| Some(window.id()) != exclude)
        .filter(|window| window.occupies_grid() && rects_overlap(rect, window.rect()))
        .map(|window| window.id())
        .collect()
}

/// Keep `rect` on a `grid_size` grid by moving its origin; its size is left
/// alone.
pub fn clamp(rect: GridRect, grid_size: i32) -> GridRect {
    let max_x = (grid_size - rect.w).max(0);
    let max_y = (grid_size - rect.h).max(0);
    rect.with_origin(rect.x.clamp(0, max_x), rect.y.clamp(0, max_y))
}

/// Maps grid units onto the host container, measured in terminal cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GridMetrics {
    area: Rect,
}

impl GridMetrics {
    pub fn new(area: Rect) -> Self {
        Self { area }
    }

    pub fn area(&self) -> Rect {
        self.area
    }

    pub fn cell_width(&self) -> f64 {
        self.area.width as f64 / GRID_SIZE as f64
    }

    pub fn cell_height(&self) -> f64 {
        self.area.height as f64 / GRID_SIZE as f64
    }

    fn col_edge(&self, gx: i32) -> u16 {
        let offset = (gx as f64 * self.cell_width()).round() as u16;
        self.area.x.saturating_add(offset.min(self.area.width))
    }

    fn row_edge(&self, gy: i32) -> u16 {
        let offset = (gy as f64 * self.cell_height()).round() as u16;
        self.area.y.saturating_add(offset.min(self.area.height))
    }

    /// Screen area covered by a grid rect. Edges are rounded independently so
    /// neighbouring windows share their boundary column or row exactly.
    pub fn to_screen(&self, rect: GridRect) -> Rect {
        let x0 = self.col_edge(rect.x);
        let x1 = self.col_edge(rect.right());
        let y0 = self.row_edge(rect.y);
        let y1 = self.row_edge(rect.bottom());
        Rect {
            x: x0,
            y: y0,
            width: x1.saturating_sub(x0),
            height: y1.saturating_sub(y0),
        }
    }

    /// Grid cell under a screen position, if the position is inside the
    /// container.
    pub fn cell_at(&self, column: u16, row: u16) -> Option<(i32, i32)> {
        if !crate::layout::rect_contains(self.area, column, row) {
            return None;
        }
        let gx = ((column - self.area.x) as f64 / self.cell_width()).floor() as i32;
        let gy = ((row - self.area.y) as f64 / self.cell_height()).floor() as i32;
        Some((gx.min(GRID_SIZE - 1), gy.min(GRID_SIZE - 1)))
    }

    /// Convert a screen-space pointer delta into whole grid cells, rounding
    /// to the nearest cell.
    pub fn cell_delta(&self, dx: f64, dy: f64) -> (i32, i32) {
        let cw = self.cell_width();
        let ch = self.cell_height();
        let gx = if cw > 0.0 { (dx / cw).round() as i32 } else { 0 };
        let gy = if ch > 0.0 { (dy / ch).round() as i32 } else { 0 };
        (gx, gy)
    }
}
