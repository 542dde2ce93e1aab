//! Placement and overlap resolution for grid windows.
//!
//! Resolution is greedy and local. When a window (the priority window)
//! changes geometry, every window it now overlaps is pushed out along the
//! cheapest axis, shrinking when the grid edge leaves no room. Displaced
//! windows then push whatever they landed on, so changes cascade outward
//! from the priority window. This runs on every pointer-move step of a drag,
//! so it favours moving windows as little as possible over finding a
//! globally tidy layout.

use std::collections::BTreeSet;

use crate::constants::{GRID_SIZE, MAX_RESOLVE_PASSES, MIN_WINDOW_SIZE};
use crate::layout::grid::{GridRect, find_conflicts};
use crate::window::{WindowId, WindowSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushDirection {
    Right,
    Left,
    Down,
    Up,
}

/// One way of moving a window clear of the priority rect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PushCandidate {
    pub direction: PushDirection,
    /// Cells shifted plus cells shrunk.
    pub cost: i32,
    pub rect: GridRect,
}

/// First origin, scanning rows top to bottom and columns left to right, where
/// a `w`×`h` window fits without overlapping a visible window. Falls back to
/// the top-left corner when the grid is full; the caller's resolve pass then
/// makes room.
pub fn find_free_spot(w: i32, h: i32, windows: &WindowSet) -> (i32, i32) {
    let w = w.clamp(MIN_WINDOW_SIZE, GRID_SIZE);
    let h = h.clamp(MIN_WINDOW_SIZE, GRID_SIZE);
    for y in 0..=GRID_SIZE - h {
        for x in 0..=GRID_SIZE - w {
            if find_conflicts(GridRect::new(x, y, w, h), None, windows).is_empty() {
                return (x, y);
            }
        }
    }
    (0, 0)
}

/// Restore the no-overlap invariant around `priority`, which is never moved.
///
/// Returns the ids of every window whose rect changed. Gives up after
/// `MAX_RESOLVE_PASSES` passes, or as soon as a pass moves nothing, leaving
/// any remaining overlap in place.
pub fn resolve_overlaps(priority: WindowId, windows: &mut WindowSet) -> BTreeSet<WindowId> {
    let mut changed = BTreeSet::new();
    if !windows.get(&priority).is_some_and(|w| w.occupies_grid()) {
        return changed;
    }

    // Authority order: a window only yields to windows ahead of it.
    let mut order = vec![priority];
    for pass in 0..MAX_RESOLVE_PASSES {
        let mut moved = false;
        let mut idx = 0;
        while idx < order.len() {
            let mover = order[idx];
            let mover_rect = windows[&mover].rect();
            for target in find_conflicts(mover_rect, Some(mover), windows) {
                let rank = match order.iter().position(|id| *id == target) {
                    Some(rank) if rank <= idx => continue,
                    Some(rank) => rank,
                    None => {
                        order.push(target);
                        order.len() - 1
                    }
                };
                let settled: Vec<GridRect> =
                    order[..rank].iter().map(|id| windows[id].rect()).collect();
                if push_clear_of(target, mover_rect, &settled, windows) {
                    changed.insert(target);
                    moved = true;
                }
            }
            idx += 1;
        }
        if !moved {
            tracing::trace!(window_id = %priority, passes = pass + 1, "overlaps resolved");
            break;
        }
        if pass + 1 == MAX_RESOLVE_PASSES {
            tracing::warn!(window_id = %priority, "resolve pass limit reached");
        }
    }

    let residual = order
        .iter()
        .filter(|id| !find_conflicts(windows[id].rect(), Some(**id), windows).is_empty())
        .count();
    if residual > 0 {
        tracing::warn!(window_id = %priority, residual, "residual overlap after resolve");
    }
    changed
}

/// Move `target` clear of `priority_rect` using the cheapest valid push, or
/// [`force_fit`] when no push works. Pushes into free cells beat cheaper
/// pushes onto another visible window. Returns whether the rect changed.
pub fn push_window_away(
    target: WindowId,
    priority_rect: GridRect,
    windows: &mut WindowSet,
) -> bool {
    push_clear_of(target, priority_rect, &[], windows)
}

/// Like [`push_window_away`], but candidates landing on any of `settled` are
/// only taken when nothing else is valid.
fn push_clear_of(
    target: WindowId,
    priority_rect: GridRect,
    settled: &[GridRect],
    windows: &mut WindowSet,
) -> bool {
    let Some(current) = windows.get(&target).map(|window| window.rect()) else {
        return false;
    };
    let occupied: Vec<GridRect> = windows
        .values()
        .filter(|window| window.id() != target && window.occupies_grid())
        .map(|window| window.rect())
        .collect();
    let next = best_push(current, priority_rect, settled, &occupied)
        .map(|candidate| candidate.rect)
        .or_else(|| force_fit(current, priority_rect));
    match next {
        Some(rect) if rect != current => {
            tracing::trace!(window_id = %target, from = %current, to = %rect, "pushed window");
            if let Some(window) = windows.get_mut(&target) {
                window.set_rect(rect);
            }
            true
        }
        Some(_) => false,
        None => {
            tracing::debug!(window_id = %target, rect = %current, "no room to push window");
            false
        }
    }
}

/// All valid push candidates for `target`, in the fixed order right, left,
/// down, up.
pub fn push_candidates(target: GridRect, priority: GridRect) -> Vec<PushCandidate> {
    let mut candidates = Vec::with_capacity(4);

    // How far the priority rect reaches into the target from each side.
    let from_left = priority.right() - target.x;
    let from_right = target.right() - priority.x;
    let from_top = priority.bottom() - target.y;
    let from_bottom = target.bottom() - priority.y;

    if let Some((x, w, shrink)) = push_forward(target.w, priority.right()) {
        candidates.push(PushCandidate {
            direction: PushDirection::Right,
            cost: from_left + shrink,
            rect: GridRect { x, w, ..target },
        });
    }
    if let Some((x, w, shrink)) = push_backward(target.x, target.w, from_right, priority.x) {
        candidates.push(PushCandidate {
            direction: PushDirection::Left,
            cost: from_right + shrink,
            rect: GridRect { x, w, ..target },
        });
    }
    if let Some((y, h, shrink)) = push_forward(target.h, priority.bottom()) {
        candidates.push(PushCandidate {
            direction: PushDirection::Down,
            cost: from_top + shrink,
            rect: GridRect { y, h, ..target },
        });
    }
    if let Some((y, h, shrink)) = push_backward(target.y, target.h, from_bottom, priority.y) {
        candidates.push(PushCandidate {
            direction: PushDirection::Up,
            cost: from_bottom + shrink,
            rect: GridRect { y, h, ..target },
        });
    }
    candidates
}

/// Cheapest candidate; ties go to the earlier direction.
pub fn cheapest_push(target: GridRect, priority: GridRect) -> Option<PushCandidate> {
    best_push(target, priority, &[], &[])
}

/// Candidates ranked by: lands on a settled window, lands on any other
/// window, cost.
fn best_push(
    target: GridRect,
    priority: GridRect,
    settled: &[GridRect],
    occupied: &[GridRect],
) -> Option<PushCandidate> {
    let mut candidates = push_candidates(target, priority);
    // sort_by_key is stable
    candidates.sort_by_key(|candidate| {
        let blocked = settled.iter().any(|rect| rect.overlaps(candidate.rect));
        let crowded = occupied.iter().any(|rect| rect.overlaps(candidate.rect));
        (blocked, crowded, candidate.cost)
    });
    candidates.into_iter().next()
}

/// Span starting at `edge`, shrunk at its far end when it would overflow the
/// grid. Yields `(pos, len, shrunk_by)`.
fn push_forward(len: i32, edge: i32) -> Option<(i32, i32, i32)> {
    let pos = edge;
    let overflow = pos + len - GRID_SIZE;
    let new_len = if overflow > 0 {
        (len - overflow).max(MIN_WINDOW_SIZE)
    } else {
        len
    };
    if pos < 0 || pos + new_len > GRID_SIZE {
        return None;
    }
    Some((pos, new_len, len - new_len))
}

/// Span shifted back by `shift`, shrunk from its near end when it would pass
/// the grid origin. Must end at or before `limit`.
fn push_backward(pos: i32, len: i32, shift: i32, limit: i32) -> Option<(i32, i32, i32)> {
    let mut new_pos = pos - shift;
    let mut new_len = len;
    if new_pos < 0 {
        new_len = (len + new_pos).max(MIN_WINDOW_SIZE);
        new_pos = 0;
    }
    if new_pos + new_len > limit {
        return None;
    }
    Some((new_pos, new_len, len - new_len))
}

/// Fallback placement beside the priority rect.
///
/// Tries the regions right of, left of, below and above `priority`, each
/// spanning the whole grid on the other axis. The target lands in the first
/// region at least `MIN_WINDOW_SIZE` on both axes, shrunk to fit and kept as
/// close to its current position as the region allows. `None` when no region
/// qualifies.
pub fn force_fit(target: GridRect, priority: GridRect) -> Option<GridRect> {
    let regions = [
        GridRect::new(priority.right(), 0, GRID_SIZE - priority.right(), GRID_SIZE),
        GridRect::new(0, 0, priority.x, GRID_SIZE),
        GridRect::new(0, priority.bottom(), GRID_SIZE, GRID_SIZE - priority.bottom()),
        GridRect::new(0, 0, GRID_SIZE, priority.y),
    ];
    regions
        .into_iter()
        .find(|region| region.w >= MIN_WINDOW_SIZE && region.h >= MIN_WINDOW_SIZE)
        .map(|region| {
            let w = target.w.min(region.w);
            let h = target.h.min(region.h);
            GridRect {
                x: target.x.clamp(region.x, region.right() - w),
                y: target.y.clamp(region.y, region.bottom() - h),
                w,
                h,
            }
        })
}
