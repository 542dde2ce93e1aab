pub mod engine;
pub mod gesture;
pub mod grid;

pub use gesture::{
    Gesture, HeaderButton, Highlight, InteractionController, Point, PointerTarget, ResizeEdge,
};
pub use grid::{GridMetrics, GridRect, clamp, find_conflicts, rects_overlap};

use ratatui::prelude::Rect;

pub fn rect_contains(rect: Rect, column: u16, row: u16) -> bool {
    if rect.width == 0 || rect.height == 0 {
        return false;
    }
    let max_x = rect.x.saturating_add(rect.width);
    let max_y = rect.y.saturating_add(rect.height);
    column >= rect.x && column < max_x && row >= rect.y && row < max_y
}
