//! Pointer gestures over the window grid.
//!
//! The controller turns pointer positions (terminal cells, as `f64` so
//! fractional cell sizes round consistently) into whole-cell proposals for
//! the registry. Every step resolves overlaps immediately, but content is
//! only told to refit once the gesture ends.

use crate::constants::{GRID_SIZE, MIN_WINDOW_SIZE};
use crate::layout::grid::{GridMetrics, GridRect, clamp};
use crate::window::decorator::WindowChrome;
use crate::window::{WindowId, WindowRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn from_cell(column: u16, row: u16) -> Self {
        Self::new(column as f64, row as f64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeEdge {
    North,
    South,
    East,
    West,
    NorthEast,
    NorthWest,
    SouthEast,
    SouthWest,
}

impl ResizeEdge {
    fn moves_west(self) -> bool {
        matches!(self, Self::West | Self::NorthWest | Self::SouthWest)
    }

    fn moves_east(self) -> bool {
        matches!(self, Self::East | Self::NorthEast | Self::SouthEast)
    }

    fn moves_north(self) -> bool {
        matches!(self, Self::North | Self::NorthEast | Self::NorthWest)
    }

    fn moves_south(self) -> bool {
        matches!(self, Self::South | Self::SouthEast | Self::SouthWest)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderButton {
    Minimize,
    Close,
}

/// What sits under the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerTarget {
    Header(WindowId),
    Button(WindowId, HeaderButton),
    Handle(WindowId, ResizeEdge),
    Body(WindowId),
}

impl PointerTarget {
    pub fn window(self) -> WindowId {
        match self {
            PointerTarget::Header(id)
            | PointerTarget::Button(id, _)
            | PointerTarget::Handle(id, _)
            | PointerTarget::Body(id) => id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeaderDrag {
    pub id: WindowId,
    pub start_pointer: Point,
    pub start_x: i32,
    pub start_y: i32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResizeDrag {
    pub id: WindowId,
    pub edge: ResizeEdge,
    pub start_pointer: Point,
    pub start_rect: GridRect,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Gesture {
    #[default]
    Idle,
    Dragging(HeaderDrag),
    Resizing(ResizeDrag),
}

impl Gesture {
    fn window(&self) -> Option<WindowId> {
        match self {
            Gesture::Idle => None,
            Gesture::Dragging(drag) => Some(drag.id),
            Gesture::Resizing(drag) => Some(drag.id),
        }
    }
}

/// Cells the active window covers, shown while a gesture is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Highlight {
    pub window: WindowId,
    pub rect: GridRect,
}

#[derive(Debug, Default)]
pub struct InteractionController {
    gesture: Gesture,
    metrics: GridMetrics,
    highlight: Option<Highlight>,
}

impl InteractionController {
    pub fn new(metrics: GridMetrics) -> Self {
        Self {
            metrics,
            ..Self::default()
        }
    }

    pub fn metrics(&self) -> &GridMetrics {
        &self.metrics
    }

    pub fn set_metrics(&mut self, metrics: GridMetrics) {
        self.metrics = metrics;
    }

    pub fn gesture(&self) -> &Gesture {
        &self.gesture
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.gesture, Gesture::Idle)
    }

    /// Window being dragged or resized.
    pub fn active_window(&self) -> Option<WindowId> {
        self.gesture.window()
    }

    pub fn highlight(&self) -> Option<Highlight> {
        self.highlight
    }

    pub fn overlay_visible(&self) -> bool {
        self.highlight.is_some()
    }

    pub fn begin_drag(
        &mut self,
        registry: &mut WindowRegistry,
        id: WindowId,
        pointer: Point,
    ) -> bool {
        let Some(rect) = self.startable(registry, id) else {
            return false;
        };
        registry.bring_to_front(id);
        self.gesture = Gesture::Dragging(HeaderDrag {
            id,
            start_pointer: pointer,
            start_x: rect.x,
            start_y: rect.y,
        });
        self.highlight = Some(Highlight { window: id, rect });
        tracing::debug!(window_id = %id, rect = %rect, "drag started");
        true
    }

    pub fn begin_resize(
        &mut self,
        registry: &mut WindowRegistry,
        id: WindowId,
        edge: ResizeEdge,
        pointer: Point,
    ) -> bool {
        let Some(rect) = self.startable(registry, id) else {
            return false;
        };
        registry.bring_to_front(id);
        self.gesture = Gesture::Resizing(ResizeDrag {
            id,
            edge,
            start_pointer: pointer,
            start_rect: rect,
        });
        self.highlight = Some(Highlight { window: id, rect });
        tracing::debug!(window_id = %id, ?edge, rect = %rect, "resize started");
        true
    }

    fn startable(&self, registry: &WindowRegistry, id: WindowId) -> Option<GridRect> {
        if !self.is_idle() {
            return None;
        }
        registry
            .get(id)
            .filter(|window| window.occupies_grid())
            .map(|window| window.rect())
    }

    pub fn pointer_move(&mut self, registry: &mut WindowRegistry, pointer: Point) {
        let (id, proposal) = match self.gesture {
            Gesture::Idle => return,
            Gesture::Dragging(drag) => {
                let Some(window) = registry.get(drag.id) else {
                    self.reset();
                    return;
                };
                let (dx, dy) = self.delta(drag.start_pointer, pointer);
                let current = window.rect();
                let moved = current.with_origin(drag.start_x + dx, drag.start_y + dy);
                (drag.id, clamp(moved, GRID_SIZE))
            }
            Gesture::Resizing(drag) => {
                if registry.get(drag.id).is_none() {
                    self.reset();
                    return;
                }
                let (dx, dy) = self.delta(drag.start_pointer, pointer);
                (drag.id, resize_rect(drag.start_rect, drag.edge, dx, dy))
            }
        };
        if registry.propose_rect(id, proposal) {
            tracing::trace!(window_id = %id, rect = %proposal, "gesture step");
        }
        self.highlight = registry
            .get(id)
            .map(|window| Highlight { window: id, rect: window.rect() });
    }

    /// Finish the gesture and let content refit to the settled geometry.
    pub fn end_gesture(&mut self, registry: &mut WindowRegistry) {
        let Some(id) = self.active_window() else {
            return;
        };
        self.reset();
        registry.settle(id);
        tracing::debug!(window_id = %id, "gesture ended");
    }

    /// Pointer capture was lost mid-gesture. Pushes already applied stay, so
    /// the geometry is committed exactly as on a normal release.
    pub fn cancel_gesture(&mut self, registry: &mut WindowRegistry) {
        if let Some(id) = self.active_window() {
            tracing::debug!(window_id = %id, "gesture cancelled");
        }
        self.end_gesture(registry);
    }

    /// Topmost window element under a screen cell.
    pub fn hit_test(
        &self,
        registry: &WindowRegistry,
        column: u16,
        row: u16,
    ) -> Option<PointerTarget> {
        registry.draw_order().into_iter().rev().find_map(|id| {
            let window = registry.get(id)?;
            let chrome = WindowChrome::new(self.metrics.to_screen(window.rect()));
            chrome.target_at(id, column, row)
        })
    }

    fn delta(&self, start: Point, pointer: Point) -> (i32, i32) {
        self.metrics
            .cell_delta(pointer.x - start.x, pointer.y - start.y)
    }

    fn reset(&mut self) {
        self.gesture = Gesture::Idle;
        self.highlight = None;
    }
}

/// Move the grabbed edges of `start` by a grid delta. Growing stops at the
/// grid boundary and shrinking at `MIN_WINDOW_SIZE`; the opposite edges never
/// move.
pub fn resize_rect(start: GridRect, edge: ResizeEdge, dx: i32, dy: i32) -> GridRect {
    let mut left = start.x;
    let mut right = start.right();
    let mut top = start.y;
    let mut bottom = start.bottom();
    if edge.moves_west() {
        left = (left + dx).clamp(0, right - MIN_WINDOW_SIZE);
    }
    if edge.moves_east() {
        right = (right + dx).clamp(left + MIN_WINDOW_SIZE, GRID_SIZE);
    }
    if edge.moves_north() {
        top = (top + dy).clamp(0, bottom - MIN_WINDOW_SIZE);
    }
    if edge.moves_south() {
        bottom = (bottom + dy).clamp(top + MIN_WINDOW_SIZE, GRID_SIZE);
    }
    GridRect::new(left, top, right - left, bottom - top)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::{CreateOptions, WindowEvent, WindowKind};
    use ratatui::prelude::Rect;

    // 10 columns and 5 rows per grid cell
    fn controller() -> InteractionController {
        InteractionController::new(GridMetrics::new(Rect {
            x: 0,
            y: 0,
            width: 80,
            height: 40,
        }))
    }

    fn resized(events: &[WindowEvent]) -> Vec<WindowId> {
        events
            .iter()
            .filter(|event| matches!(event, WindowEvent::ContentResized { .. }))
            .map(WindowEvent::id)
            .collect()
    }

    #[test]
    fn drag_notifies_dragged_and_displaced_windows_on_release() {
        let mut reg = WindowRegistry::new();
        let a = reg.create(WindowKind::Terminal, CreateOptions::at(GridRect::new(0, 0, 4, 4)));
        let b = reg.create(WindowKind::Terminal, CreateOptions::at(GridRect::new(4, 0, 4, 4)));
        reg.drain_events();

        let mut ctl = controller();
        assert!(ctl.begin_drag(&mut reg, a, Point::new(5.0, 1.0)));
        assert!(reg.is_focused(a));
        assert!(ctl.overlay_visible());

        ctl.pointer_move(&mut reg, Point::new(25.0, 1.0));
        assert_eq!(reg.get(a).unwrap().rect(), GridRect::new(2, 0, 4, 4));
        assert_eq!(reg.get(b).unwrap().rect(), GridRect::new(6, 0, 2, 4));
        assert!(reg.drain_events().is_empty());

        ctl.pointer_move(&mut reg, Point::new(45.0, 11.0));
        assert_eq!(reg.get(a).unwrap().rect(), GridRect::new(4, 2, 4, 4));
        assert_eq!(reg.get(b).unwrap().rect(), GridRect::new(2, 0, 2, 4));
        assert!(reg.overlapping_pairs().is_empty());
        assert_eq!(
            ctl.highlight(),
            Some(Highlight {
                window: a,
                rect: GridRect::new(4, 2, 4, 4)
            })
        );

        ctl.end_gesture(&mut reg);
        assert!(ctl.is_idle());
        assert!(!ctl.overlay_visible());
        assert_eq!(resized(&reg.drain_events()), vec![a, b]);
    }

    #[test]
    fn drag_is_clamped_to_grid() {
        let mut reg = WindowRegistry::new();
        let a = reg.create(WindowKind::Terminal, CreateOptions::at(GridRect::new(2, 2, 4, 4)));
        let mut ctl = controller();
        ctl.begin_drag(&mut reg, a, Point::new(30.0, 11.0));
        ctl.pointer_move(&mut reg, Point::new(500.0, -200.0));
        assert_eq!(reg.get(a).unwrap().rect(), GridRect::new(4, 0, 4, 4));
    }

    #[test]
    fn sub_cell_moves_do_not_notify() {
        let mut reg = WindowRegistry::new();
        let a = reg.create(WindowKind::Terminal, CreateOptions::default());
        reg.drain_events();
        let mut ctl = controller();
        ctl.begin_drag(&mut reg, a, Point::new(5.0, 1.0));
        ctl.pointer_move(&mut reg, Point::new(9.0, 3.0));
        assert_eq!(reg.get(a).unwrap().rect(), GridRect::new(0, 0, 4, 4));
        ctl.end_gesture(&mut reg);
        // release always settles the gestured window
        assert_eq!(resized(&reg.drain_events()), vec![a]);
    }

    #[test]
    fn resize_clamps_at_grid_and_minimum() {
        let mut reg = WindowRegistry::new();
        let a = reg.create(WindowKind::Terminal, CreateOptions::at(GridRect::new(0, 0, 4, 4)));
        let mut ctl = controller();
        assert!(ctl.begin_resize(&mut reg, a, ResizeEdge::SouthEast, Point::new(39.0, 19.0)));
        ctl.pointer_move(&mut reg, Point::new(200.0, 200.0));
        assert_eq!(reg.get(a).unwrap().rect(), GridRect::new(0, 0, 8, 8));
        ctl.pointer_move(&mut reg, Point::new(0.0, 0.0));
        assert_eq!(reg.get(a).unwrap().rect(), GridRect::new(0, 0, 2, 2));
        ctl.end_gesture(&mut reg);
    }

    #[test]
    fn resize_west_keeps_east_edge_fixed() {
        assert_eq!(
            resize_rect(GridRect::new(2, 2, 4, 4), ResizeEdge::West, 4, 0),
            GridRect::new(4, 2, 2, 4)
        );
        assert_eq!(
            resize_rect(GridRect::new(2, 2, 4, 4), ResizeEdge::West, -12, 3),
            GridRect::new(0, 2, 6, 4)
        );
        assert_eq!(
            resize_rect(GridRect::new(2, 2, 4, 4), ResizeEdge::NorthWest, -1, -1),
            GridRect::new(1, 1, 5, 5)
        );
    }

    #[test]
    fn gestures_need_idle_controller_and_visible_window() {
        let mut reg = WindowRegistry::new();
        let a = reg.create(WindowKind::Terminal, CreateOptions::default());
        let b = reg.create(WindowKind::Terminal, CreateOptions::default());
        reg.minimize(b);
        let mut ctl = controller();
        assert!(!ctl.begin_drag(&mut reg, b, Point::default()));
        assert!(!ctl.begin_drag(&mut reg, WindowId::new(99), Point::default()));
        assert!(ctl.begin_drag(&mut reg, a, Point::default()));
        assert!(!ctl.begin_resize(&mut reg, a, ResizeEdge::East, Point::default()));
        assert_eq!(ctl.active_window(), Some(a));
    }

    #[test]
    fn moves_while_idle_are_ignored() {
        let mut reg = WindowRegistry::new();
        let a = reg.create(WindowKind::Terminal, CreateOptions::default());
        reg.drain_events();
        let mut ctl = controller();
        ctl.pointer_move(&mut reg, Point::new(70.0, 30.0));
        ctl.end_gesture(&mut reg);
        assert_eq!(reg.get(a).unwrap().rect(), GridRect::new(0, 0, 4, 4));
        assert!(reg.drain_events().is_empty());
        assert!(ctl.highlight().is_none());
    }

    #[test]
    fn cancel_commits_current_geometry() {
        let mut reg = WindowRegistry::new();
        let a = reg.create(WindowKind::Terminal, CreateOptions::default());
        reg.drain_events();
        let mut ctl = controller();
        ctl.begin_resize(&mut reg, a, ResizeEdge::East, Point::new(39.0, 10.0));
        ctl.pointer_move(&mut reg, Point::new(59.0, 10.0));
        ctl.cancel_gesture(&mut reg);
        assert_eq!(reg.get(a).unwrap().rect(), GridRect::new(0, 0, 6, 4));
        assert!(ctl.is_idle());
        assert_eq!(resized(&reg.drain_events()), vec![a]);
    }

    #[test]
    fn closing_the_dragged_window_ends_the_gesture() {
        let mut reg = WindowRegistry::new();
        let a = reg.create(WindowKind::Terminal, CreateOptions::default());
        let mut ctl = controller();
        ctl.begin_drag(&mut reg, a, Point::default());
        reg.close(a);
        ctl.pointer_move(&mut reg, Point::new(30.0, 0.0));
        assert!(ctl.is_idle());
    }

    #[test]
    fn hit_test_prefers_topmost_window() {
        let mut reg = WindowRegistry::new();
        let a = reg.create(WindowKind::Terminal, CreateOptions::at(GridRect::new(0, 0, 4, 4)));
        let b = reg.create(WindowKind::Terminal, CreateOptions::at(GridRect::new(4, 0, 4, 4)));
        let ctl = controller();
        assert_eq!(ctl.hit_test(&reg, 10, 1), Some(PointerTarget::Header(a)));
        assert_eq!(
            ctl.hit_test(&reg, 40, 0),
            Some(PointerTarget::Handle(b, ResizeEdge::NorthWest))
        );
        assert_eq!(
            ctl.hit_test(&reg, 77, 1),
            Some(PointerTarget::Button(b, HeaderButton::Close))
        );
        assert_eq!(ctl.hit_test(&reg, 50, 10), Some(PointerTarget::Body(b)));
        assert_eq!(ctl.hit_test(&reg, 10, 30), None);
    }
}
