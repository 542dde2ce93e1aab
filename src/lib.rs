//! gridmux: a terminal multiplexer whose windows snap to an 8×8 grid and
//! push each other out of the way instead of overlapping.
//!
//! The layout core lives in [`layout`] and [`window`]; everything else wires
//! it to PTYs, git and the terminal.

pub mod app;
pub mod config;
pub mod constants;
pub mod drivers;
pub mod error;
pub mod event_loop;
pub mod git;
pub mod keybindings;
pub mod layout;
pub mod preset;
pub mod pty;
pub mod runner;
pub mod session;
pub mod sidebar;
pub mod tracing_sub;
pub mod ui;
pub mod window;

pub use error::{Error, Result};
