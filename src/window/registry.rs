use std::collections::BTreeSet;

use super::{ContentId, Window, WindowEvent, WindowId, WindowKind, WindowSet};
use crate::constants::{DEFAULT_WINDOW_SIZE, Z_ORDER_FLOOR};
use crate::layout::engine::{find_free_spot, resolve_overlaps};
use crate::layout::{GridRect, rects_overlap};

/// Inputs for [`WindowRegistry::create`]. Anything left unset falls back to
/// the kind's default title and automatic placement.
#[derive(Debug, Clone, Default)]
pub struct CreateOptions {
    pub title: Option<String>,
    pub rect: Option<GridRect>,
    pub content_id: Option<ContentId>,
}

impl CreateOptions {
    pub fn at(rect: GridRect) -> Self {
        Self {
            rect: Some(rect),
            ..Self::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_content(mut self, content_id: ContentId) -> Self {
        self.content_id = Some(content_id);
        self
    }
}

/// Owns every window record plus stacking and focus state.
///
/// Operations on ids that are not (or no longer) registered are silently
/// ignored: input events routinely race with window teardown.
#[derive(Debug)]
pub struct WindowRegistry {
    windows: WindowSet,
    next_id: u64,
    focused: Option<WindowId>,
    events: Vec<WindowEvent>,
    // windows whose geometry changed since their last ContentResized
    unsettled: BTreeSet<WindowId>,
}

impl Default for WindowRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl WindowRegistry {
    pub fn new() -> Self {
        Self {
            windows: WindowSet::new(),
            next_id: 1,
            focused: None,
            events: Vec::new(),
            unsettled: BTreeSet::new(),
        }
    }

    /// Register a new window, place it, and make room for it.
    ///
    /// Explicit rects are sanitized but otherwise honoured; the new window is
    /// the priority window for the resolve pass that follows, so it may
    /// displace existing windows but is never moved itself.
    pub fn create(&mut self, kind: WindowKind, options: CreateOptions) -> WindowId {
        let id = WindowId::new(self.next_id);
        self.next_id += 1;

        let rect = match options.rect {
            Some(rect) => rect.sanitize(),
            None => {
                let (x, y) =
                    find_free_spot(DEFAULT_WINDOW_SIZE, DEFAULT_WINDOW_SIZE, &self.windows);
                GridRect::new(x, y, DEFAULT_WINDOW_SIZE, DEFAULT_WINDOW_SIZE)
            }
        };
        let mut window = Window::new(id, kind, rect);
        if let Some(title) = options.title {
            window.title = title;
        }
        window.content_id = options.content_id;
        self.windows.insert(id, window);
        tracing::debug!(window_id = %id, ?kind, rect = %rect, "opened window");

        let displaced = resolve_overlaps(id, &mut self.windows);
        self.unsettled.extend(displaced);
        self.unsettled.insert(id);
        self.bring_to_front(id);
        self.flush_settled();
        id
    }

    /// Queue a `Closed` notification carrying the full record, then drop the
    /// window.
    pub fn close(&mut self, id: WindowId) {
        let Some(window) = self.windows.get(&id) else {
            return;
        };
        tracing::debug!(window_id = %id, "closing window");
        self.events.push(WindowEvent::Closed {
            id,
            window: window.clone(),
        });
        self.windows.remove(&id);
        self.unsettled.remove(&id);
        if self.focused == Some(id) {
            self.select_fallback_focus();
        }
    }

    pub fn minimize(&mut self, id: WindowId) {
        let Some(window) = self.windows.get_mut(&id) else {
            return;
        };
        if window.minimized {
            return;
        }
        window.minimized = true;
        tracing::debug!(window_id = %id, "minimized window");
        if self.focused == Some(id) {
            self.select_fallback_focus();
        }
    }

    /// Bring a minimized window back. Its old cells may have been taken in the
    /// meantime, so it resolves as the priority window and takes focus.
    pub fn restore(&mut self, id: WindowId) {
        let Some(window) = self.windows.get_mut(&id) else {
            return;
        };
        if !window.minimized {
            return;
        }
        window.minimized = false;
        tracing::debug!(window_id = %id, "restored window");
        let displaced = resolve_overlaps(id, &mut self.windows);
        self.unsettled.extend(displaced);
        self.unsettled.insert(id);
        self.bring_to_front(id);
        self.flush_settled();
    }

    /// Raise a visible window above every other window and focus it.
    pub fn bring_to_front(&mut self, id: WindowId) {
        let top = self
            .windows
            .values()
            .map(|window| window.z_order)
            .max()
            .unwrap_or(0)
            .max(Z_ORDER_FLOOR);
        let Some(window) = self.windows.get_mut(&id) else {
            return;
        };
        if window.minimized {
            return;
        }
        window.z_order = top + 1;
        self.focused = Some(id);
    }

    pub fn update_title(&mut self, id: WindowId, title: impl Into<String>) {
        if let Some(window) = self.windows.get_mut(&id) {
            window.title = title.into();
        }
    }

    pub fn get(&self, id: WindowId) -> Option<&Window> {
        self.windows.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Window> {
        self.windows.values()
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn window_set(&self) -> &WindowSet {
        &self.windows
    }

    pub(crate) fn window_set_mut(&mut self) -> &mut WindowSet {
        &mut self.windows
    }

    pub fn find_by_content(&self, content_id: ContentId) -> Option<&Window> {
        self.windows
            .values()
            .find(|window| window.content_id == Some(content_id))
    }

    /// The live window of a singleton kind, if any.
    pub fn singleton(&self, kind: WindowKind) -> Option<&Window> {
        self.windows.values().find(|window| window.kind == kind)
    }

    pub fn focused(&self) -> Option<WindowId> {
        self.focused
    }

    pub fn is_focused(&self, id: WindowId) -> bool {
        self.focused == Some(id)
    }

    /// Visible windows from bottom to top.
    pub fn draw_order(&self) -> Vec<WindowId> {
        let mut visible: Vec<&Window> = self.windows.values().filter(|w| !w.minimized).collect();
        visible.sort_by_key(|window| window.z_order);
        visible.into_iter().map(|window| window.id).collect()
    }

    /// The minimized window that was most recently on top.
    pub fn last_minimized(&self) -> Option<WindowId> {
        self.windows
            .values()
            .filter(|window| window.minimized)
            .max_by_key(|window| window.z_order)
            .map(|window| window.id)
    }

    /// Move focus to the next (or previous) visible window in creation order.
    pub fn cycle_focus(&mut self, forward: bool) {
        let visible: Vec<WindowId> = self
            .windows
            .values()
            .filter(|window| !window.minimized)
            .map(|window| window.id)
            .collect();
        if visible.is_empty() {
            return;
        }
        let idx = self
            .focused
            .and_then(|id| visible.iter().position(|candidate| *candidate == id));
        let next = match (idx, forward) {
            (Some(idx), true) => (idx + 1) % visible.len(),
            (Some(idx), false) => (idx + visible.len() - 1) % visible.len(),
            (None, true) => 0,
            (None, false) => visible.len() - 1,
        };
        self.bring_to_front(visible[next]);
    }

    /// Ask every visible window's content to refit, e.g. after the host
    /// container changed size.
    pub fn refit_all(&mut self) {
        let ids: Vec<WindowId> = self.draw_order();
        self.unsettled.extend(ids);
        self.flush_settled();
    }

    /// Take every queued notification, oldest first.
    pub fn drain_events(&mut self) -> Vec<WindowEvent> {
        std::mem::take(&mut self.events)
    }

    /// Pairs of visible windows that overlap. Empty whenever the layout
    /// invariant holds.
    pub fn overlapping_pairs(&self) -> Vec<(WindowId, WindowId)> {
        let visible: Vec<&Window> = self.windows.values().filter(|w| !w.minimized).collect();
        let mut pairs = Vec::new();
        for (idx, a) in visible.iter().enumerate() {
            for b in &visible[idx + 1..] {
                if rects_overlap(a.rect, b.rect) {
                    pairs.push((a.id, b.id));
                }
            }
        }
        pairs
    }

    /// Move or resize a visible window mid-gesture and resolve around it.
    ///
    /// Content is not notified until [`WindowRegistry::settle`]. Returns
    /// whether the window's rect changed.
    pub(crate) fn propose_rect(&mut self, id: WindowId, rect: GridRect) -> bool {
        let rect = rect.sanitize();
        let Some(window) = self.windows.get_mut(&id) else {
            return false;
        };
        if window.minimized || window.rect == rect {
            return false;
        }
        window.rect = rect;
        let displaced = resolve_overlaps(id, &mut self.windows);
        self.unsettled.extend(displaced);
        true
    }

    /// Notify content owners of `id` and of every window displaced since the
    /// last settle.
    pub(crate) fn settle(&mut self, id: WindowId) {
        if self.windows.contains_key(&id) {
            self.unsettled.insert(id);
        }
        self.flush_settled();
    }

    fn flush_settled(&mut self) {
        for id in std::mem::take(&mut self.unsettled) {
            if let Some(window) = self.windows.get(&id) {
                self.events.push(WindowEvent::ContentResized {
                    id,
                    window: window.clone(),
                });
            }
        }
    }

    fn select_fallback_focus(&mut self) {
        self.focused = self
            .windows
            .values()
            .filter(|window| !window.minimized)
            .max_by_key(|window| window.z_order)
            .map(|window| window.id);
    }

    #[cfg(test)]
    pub(crate) fn insert_unresolved(&mut self, kind: WindowKind, rect: GridRect) -> WindowId {
        let id = WindowId::new(self.next_id);
        self.next_id += 1;
        self.windows.insert(id, Window::new(id, kind, rect));
        id
    }
}
