//! Property tests for the layout core, driven through the public registry and
//! gesture API with random operation sequences:
//!
//! 1. Every window stays inside the grid at its minimum size or larger.
//! 2. `find_free_spot` returns the first row-major free origin, or the
//!    origin when nothing fits.
//! 3. Resolving an overlap-free layout changes nothing.
//! 4. Exactly one visible window is focused, and it is the topmost one.
//! 5. With at most three default-size windows, no two visible windows ever
//!    overlap once an operation has finished.

use gridmux::layout::engine::{find_free_spot, resolve_overlaps};
use gridmux::layout::{
    GridMetrics, GridRect, InteractionController, Point, ResizeEdge, rects_overlap,
};
use gridmux::window::{CreateOptions, WindowId, WindowKind, WindowRegistry};
use proptest::prelude::*;
use ratatui::layout::Rect;

const GRID: i32 = 8;

#[derive(Debug, Clone)]
enum Op {
    AutoCreate,
    CreateAt(i32, i32, i32, i32),
    Minimize(usize),
    Restore,
    Close(usize),
    Drag(usize, i16, i16),
    Resize(usize, usize, i16, i16),
}

const EDGES: [ResizeEdge; 8] = [
    ResizeEdge::North,
    ResizeEdge::South,
    ResizeEdge::East,
    ResizeEdge::West,
    ResizeEdge::NorthEast,
    ResizeEdge::NorthWest,
    ResizeEdge::SouthEast,
    ResizeEdge::SouthWest,
];

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        2 => Just(Op::AutoCreate),
        2 => (-3i32..10, -3i32..10, 0i32..11, 0i32..11)
            .prop_map(|(x, y, w, h)| Op::CreateAt(x, y, w, h)),
        1 => any::<usize>().prop_map(Op::Minimize),
        1 => Just(Op::Restore),
        1 => any::<usize>().prop_map(Op::Close),
        3 => (any::<usize>(), -90i16..90, -45i16..45).prop_map(|(i, dx, dy)| Op::Drag(i, dx, dy)),
        3 => (any::<usize>(), 0usize..8, -90i16..90, -45i16..45)
            .prop_map(|(i, e, dx, dy)| Op::Resize(i, e, dx, dy)),
    ]
}

/// Operations that never grow a window. Windows start at the default size
/// and only shrink when pushed.
fn roomy_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        2 => Just(Op::AutoCreate),
        1 => any::<usize>().prop_map(Op::Minimize),
        1 => Just(Op::Restore),
        4 => (any::<usize>(), -90i16..90, -45i16..45).prop_map(|(i, dx, dy)| Op::Drag(i, dx, dy)),
    ]
}

const ROOMY_WINDOWS: usize = 3;

fn nth(ids: &[WindowId], i: usize) -> Option<WindowId> {
    if ids.is_empty() {
        None
    } else {
        Some(ids[i % ids.len()])
    }
}

fn apply(reg: &mut WindowRegistry, ctl: &mut InteractionController, op: &Op) {
    let visible = reg.draw_order();
    match *op {
        Op::AutoCreate => {
            reg.create(WindowKind::Terminal, CreateOptions::default());
        }
        Op::CreateAt(x, y, w, h) => {
            reg.create(WindowKind::Terminal, CreateOptions::at(GridRect::new(x, y, w, h)));
        }
        Op::Minimize(i) => {
            if let Some(id) = nth(&visible, i) {
                reg.minimize(id);
            }
        }
        Op::Restore => {
            if let Some(id) = reg.last_minimized() {
                reg.restore(id);
            }
        }
        Op::Close(i) => {
            let all: Vec<WindowId> = reg.iter().map(|w| w.id()).collect();
            if let Some(id) = nth(&all, i) {
                reg.close(id);
            }
        }
        Op::Drag(i, dx, dy) | Op::Resize(i, _, dx, dy) => {
            let Some(id) = nth(&visible, i) else {
                return;
            };
            let start = Point::new(40.0, 20.0);
            let started = match *op {
                Op::Resize(_, e, _, _) => ctl.begin_resize(reg, id, EDGES[e], start),
                _ => ctl.begin_drag(reg, id, start),
            };
            assert!(started);
            // two steps so intermediate pushes are exercised
            let half = Point::new(40.0 + dx as f64 / 2.0, 20.0 + dy as f64 / 2.0);
            ctl.pointer_move(reg, half);
            ctl.pointer_move(reg, Point::new(40.0 + dx as f64, 20.0 + dy as f64));
            ctl.end_gesture(reg);
        }
    }
}

fn run(ops: &[Op]) -> WindowRegistry {
    let mut reg = WindowRegistry::new();
    let mut ctl = InteractionController::new(GridMetrics::new(Rect::new(0, 0, 80, 40)));
    for op in ops {
        apply(&mut reg, &mut ctl, op);
    }
    reg
}

fn brute_force_free_spot(reg: &WindowRegistry, w: i32, h: i32) -> (i32, i32) {
    for y in 0..=GRID - h {
        for x in 0..=GRID - w {
            let candidate = GridRect::new(x, y, w, h);
            let blocked = reg
                .iter()
                .filter(|win| win.occupies_grid())
                .any(|win| rects_overlap(candidate, win.rect()));
            if !blocked {
                return (x, y);
            }
        }
    }
    (0, 0)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn windows_stay_in_bounds(ops in proptest::collection::vec(op(), 1..40)) {
        let mut reg = WindowRegistry::new();
        let mut ctl = InteractionController::new(GridMetrics::new(Rect::new(0, 0, 80, 40)));
        for op in &ops {
            apply(&mut reg, &mut ctl, op);
            for window in reg.iter() {
                prop_assert!(
                    window.rect().is_valid(),
                    "{} out of bounds after {:?}", window.rect(), op
                );
            }
        }
    }

    #[test]
    fn visible_windows_never_overlap(ops in proptest::collection::vec(roomy_op(), 1..40)) {
        let mut reg = WindowRegistry::new();
        let mut ctl = InteractionController::new(GridMetrics::new(Rect::new(0, 0, 80, 40)));
        for op in &ops {
            if matches!(op, Op::AutoCreate) && reg.len() >= ROOMY_WINDOWS {
                continue;
            }
            apply(&mut reg, &mut ctl, op);
            prop_assert!(
                reg.overlapping_pairs().is_empty(),
                "overlap {:?} after {:?}", reg.overlapping_pairs(), op
            );
        }
    }

    #[test]
    fn free_spot_is_first_row_major_fit(
        ops in proptest::collection::vec(op(), 0..20),
        w in 2i32..=8,
        h in 2i32..=8,
    ) {
        let reg = run(&ops);
        prop_assert_eq!(find_free_spot(w, h, reg.window_set()), brute_force_free_spot(&reg, w, h));
    }

    #[test]
    fn resolving_a_clean_layout_is_a_no_op(ops in proptest::collection::vec(op(), 1..30)) {
        let reg = run(&ops);
        prop_assume!(reg.overlapping_pairs().is_empty());
        for window in reg.iter() {
            let mut set = reg.window_set().clone();
            let moved = resolve_overlaps(window.id(), &mut set);
            prop_assert!(moved.is_empty());
            prop_assert_eq!(&set, reg.window_set());
        }
    }

    #[test]
    fn focus_follows_the_topmost_visible_window(ops in proptest::collection::vec(op(), 1..40)) {
        let reg = run(&ops);
        let visible = reg.draw_order();
        match reg.focused() {
            Some(id) => {
                prop_assert_eq!(visible.last().copied(), Some(id));
                prop_assert!(!reg.get(id).unwrap().minimized());
            }
            None => prop_assert!(visible.is_empty()),
        }
    }
}
