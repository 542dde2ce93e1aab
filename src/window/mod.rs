pub mod decorator;

mod registry;

use std::collections::BTreeMap;
use std::fmt;

use crate::layout::GridRect;

pub use registry::{CreateOptions, WindowRegistry};

/// Identifier for a window; assigned in increasing order and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WindowId(u64);

impl WindowId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "w{}", self.0)
    }
}

/// Opaque handle to whatever a window displays (a terminal session id).
pub type ContentId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowKind {
    Terminal,
    Overview,
}

impl WindowKind {
    pub fn default_title(self) -> &'static str {
        match self {
            WindowKind::Terminal => "Terminal",
            WindowKind::Overview => "Overview",
        }
    }

    /// Kinds with at most one live window.
    pub fn is_singleton(self) -> bool {
        matches!(self, WindowKind::Overview)
    }
}

/// Geometry and presentation record for one window.
///
/// The rect is only written by the layout engine and the registry; everything
/// else reads it through accessors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    id: WindowId,
    kind: WindowKind,
    rect: GridRect,
    minimized: bool,
    z_order: u64,
    title: String,
    content_id: Option<ContentId>,
}

impl Window {
    fn new(id: WindowId, kind: WindowKind, rect: GridRect) -> Self {
        Self {
            id,
            kind,
            rect,
            minimized: false,
            z_order: 0,
            title: kind.default_title().to_string(),
            content_id: None,
        }
    }

    pub fn id(&self) -> WindowId {
        self.id
    }

    pub fn kind(&self) -> WindowKind {
        self.kind
    }

    pub fn rect(&self) -> GridRect {
        self.rect
    }

    pub(crate) fn set_rect(&mut self, rect: GridRect) {
        self.rect = rect;
    }

    pub fn minimized(&self) -> bool {
        self.minimized
    }

    /// Minimized windows give up their grid cells.
    pub fn occupies_grid(&self) -> bool {
        !self.minimized
    }

    pub fn z_order(&self) -> u64 {
        self.z_order
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn content_id(&self) -> Option<ContentId> {
        self.content_id
    }
}

/// Every live window keyed by id. Ordered so scans are deterministic.
pub type WindowSet = BTreeMap<WindowId, Window>;

/// Notifications queued by the registry for content owners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowEvent {
    /// The window's geometry settled; its content should refit.
    ContentResized { id: WindowId, window: Window },
    /// The window is being removed. Carries the final record.
    Closed { id: WindowId, window: Window },
}

impl WindowEvent {
    pub fn id(&self) -> WindowId {
        match self {
            WindowEvent::ContentResized { id, .. } | WindowEvent::Closed { id, .. } => *id,
        }
    }

    pub fn window(&self) -> &Window {
        match self {
            WindowEvent::ContentResized { window, .. } | WindowEvent::Closed { window, .. } => {
                window
            }
        }
    }
}
