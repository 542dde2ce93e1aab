//! Shared crate-wide constants.

use std::time::Duration;

/// Number of logical cells along each side of the layout grid.
pub const GRID_SIZE: i32 = 8;

/// Smallest width or height, in grid units, a window may have.
pub const MIN_WINDOW_SIZE: i32 = 2;

/// Width and height, in grid units, of a window created without an explicit
/// rectangle.
pub const DEFAULT_WINDOW_SIZE: i32 = 4;

/// Upper bound on resolution passes in a single `resolve_overlaps` call.
///
/// The bound is never expected to bind on an 8×8 grid with a realistic
/// number of windows. When it does, the call returns with whatever overlap
/// remains.
pub const MAX_RESOLVE_PASSES: usize = 50;

/// Lowest z-order value handed out by `bring_to_front`.
pub const Z_ORDER_FLOOR: u64 = 100;

/// Quiet period after the last host resize before windows are refit.
pub const CONTAINER_RESIZE_DEBOUNCE: Duration = Duration::from_millis(150);

/// A session counts as active while output arrived within this window.
pub const ACTIVITY_WINDOW: Duration = Duration::from_secs(2);

/// Interval between background git status refreshes.
pub const GIT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Scrollback rows kept by each terminal's vt100 parser.
pub const DEFAULT_SCROLLBACK_LEN: usize = 2000;

/// Default sidebar width in terminal columns.
pub const DEFAULT_SIDEBAR_WIDTH: u16 = 28;
