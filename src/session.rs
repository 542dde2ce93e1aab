//! Terminal sessions: a PTY plus the bookkeeping the sidebar shows about it.

use std::path::{Path, PathBuf};
use std::time::Instant;

use crossterm::event::{
    KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use portable_pty::{CommandBuilder, PtySize};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color as TColor, Modifier, Style},
};
use vt100::{MouseProtocolEncoding, MouseProtocolMode};

use crate::constants::{ACTIVITY_WINDOW, DEFAULT_SCROLLBACK_LEN};
use crate::error::Result;
use crate::git::GitStatus;
use crate::layout::rect_contains;
use crate::pty::Pty;
use crate::window::ContentId;

pub type SessionId = ContentId;

/// Where and as what a session is started.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSpec {
    pub title: String,
    pub cwd: PathBuf,
    pub worktree: Option<PathBuf>,
    pub branch: Option<String>,
}

/// Tracks whether output is still flowing and whether anyone has looked at
/// it yet.
#[derive(Debug, Clone, Default)]
pub struct ActivityTracker {
    seen_bytes: usize,
    last_output_at: Option<Instant>,
    unseen: bool,
}

impl ActivityTracker {
    /// Record the PTY's running byte count. Returns whether new output
    /// arrived since the last observation.
    pub fn observe(&mut self, total_bytes: usize, now: Instant, focused: bool) -> bool {
        if total_bytes <= self.seen_bytes {
            return false;
        }
        self.seen_bytes = total_bytes;
        self.last_output_at = Some(now);
        if !focused {
            self.unseen = true;
        }
        true
    }

    pub fn is_active(&self, now: Instant) -> bool {
        self.last_output_at
            .is_some_and(|at| now.saturating_duration_since(at) < ACTIVITY_WINDOW)
    }

    pub fn has_unseen(&self) -> bool {
        self.unseen
    }

    pub fn mark_seen(&mut self) {
        self.unseen = false;
    }
}

#[derive(Debug)]
pub struct TerminalSession {
    id: SessionId,
    spec: SessionSpec,
    pty: Pty,
    activity: ActivityTracker,
    git_status: Option<GitStatus>,
    exited: bool,
    last_area: Rect,
}

impl TerminalSession {
    pub fn spawn(
        id: SessionId,
        command: CommandBuilder,
        spec: SessionSpec,
        size: PtySize,
    ) -> Result<Self> {
        let pty = Pty::spawn(command, size, DEFAULT_SCROLLBACK_LEN)?;
        tracing::debug!(
            session_id = id,
            title = %spec.title,
            cwd = %spec.cwd.display(),
            "spawned session"
        );
        Ok(Self {
            id,
            spec,
            pty,
            activity: ActivityTracker::default(),
            git_status: None,
            exited: false,
            last_area: Rect::default(),
        })
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.spec.title
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.spec.title = title.into();
    }

    pub fn cwd(&self) -> &Path {
        &self.spec.cwd
    }

    pub fn worktree(&self) -> Option<&Path> {
        self.spec.worktree.as_deref()
    }

    pub fn branch(&self) -> Option<&str> {
        self.spec.branch.as_deref()
    }

    /// Directory git status should be polled for.
    pub fn git_dir(&self) -> &Path {
        self.worktree().unwrap_or(self.cwd())
    }

    pub fn git_status(&self) -> Option<&GitStatus> {
        self.git_status.as_ref()
    }

    pub fn set_git_status(&mut self, status: Option<GitStatus>) {
        self.git_status = status;
    }

    pub fn activity(&self) -> &ActivityTracker {
        &self.activity
    }

    pub fn mark_seen(&mut self) {
        self.activity.mark_seen();
    }

    pub fn has_exited(&self) -> bool {
        self.exited
    }

    /// Pull pending output and refresh activity and exit state. Returns
    /// whether anything visible changed.
    pub fn tick(&mut self, now: Instant, focused: bool) -> bool {
        self.pty.update();
        let mut changed = self
            .activity
            .observe(self.pty.bytes_received(), now, focused);
        if !self.exited && self.pty.has_exited() {
            tracing::debug!(session_id = self.id, "session exited");
            self.exited = true;
            changed = true;
        }
        changed
    }

    /// Match the PTY to the content area of its window.
    pub fn refit(&mut self, cols: u16, rows: u16) -> Result<()> {
        if cols == 0 || rows == 0 {
            return Ok(());
        }
        self.pty.resize(PtySize {
            rows,
            cols,
            pixel_width: 0,
            pixel_height: 0,
        })
    }

    pub fn terminate(&mut self) -> Result<()> {
        self.pty.kill()
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.kind == KeyEventKind::Release || self.exited {
            return false;
        }
        if matches!(key.code, KeyCode::PageUp | KeyCode::PageDown)
            && key.modifiers.contains(KeyModifiers::SHIFT)
            && !self.pty.screen().alternate_screen()
        {
            let delta = if key.code == KeyCode::PageUp { 10 } else { -10 };
            let next = (self.pty.scrollback() as isize + delta).max(0) as usize;
            self.pty.set_scrollback(next);
            return true;
        }
        let bytes = key_to_bytes(key);
        if bytes.is_empty() {
            return false;
        }
        if self.pty.scrollback() > 0 {
            self.pty.set_scrollback(0);
        }
        if let Err(err) = self.pty.write_bytes(&bytes) {
            tracing::warn!(session_id = self.id, %err, "terminal input write failed");
        }
        true
    }

    /// Forward a mouse event inside the content area, but only when the
    /// program in the terminal asked for SGR mouse reporting.
    pub fn handle_mouse(&mut self, mouse: MouseEvent) -> bool {
        if self.exited || !rect_contains(self.last_area, mouse.column, mouse.row) {
            return false;
        }
        let screen = self.pty.screen();
        if screen.mouse_protocol_encoding() != MouseProtocolEncoding::Sgr {
            return false;
        }
        if !mouse_event_allowed(screen.mouse_protocol_mode(), mouse.kind) {
            return false;
        }
        let local = MouseEvent {
            column: mouse.column.saturating_sub(self.last_area.x),
            row: mouse.row.saturating_sub(self.last_area.y),
            ..mouse
        };
        let bytes = mouse_event_to_bytes(local);
        if let Err(err) = self.pty.write_bytes(&bytes) {
            tracing::warn!(session_id = self.id, %err, "terminal mouse write failed");
        }
        true
    }

    pub fn render(&mut self, buffer: &mut Buffer, area: Rect, focused: bool) {
        self.last_area = area;
        let show_cursor = focused && self.pty.scrollback() == 0;
        render_screen(self.pty.screen(), buffer, area, show_cursor);
    }
}

/// Paint a vt100 screen into `area` of a ratatui buffer.
pub fn render_screen(screen: &vt100::Screen, buffer: &mut Buffer, area: Rect, show_cursor: bool) {
    let visible = area.intersection(buffer.area);
    if visible.width == 0 || visible.height == 0 {
        return;
    }
    let start_col = visible.x - area.x;
    let start_row = visible.y - area.y;

    for row in start_row..start_row + visible.height {
        for col in start_col..start_col + visible.width {
            let Some(buf_cell) = buffer.cell_mut((area.x + col, area.y + row)) else {
                continue;
            };
            let Some(cell) = screen.cell(row, col) else {
                buf_cell.reset();
                continue;
            };
            let mut symbol = cell.contents().chars().next().unwrap_or(' ');
            if cell.is_wide_continuation() {
                symbol = ' ';
            }
            let (fg, bg) = resolve_colors(cell, screen);
            let mut style = Style::default();
            if let Some(fg) = fg {
                style = style.fg(fg);
            }
            if let Some(bg) = bg {
                style = style.bg(bg);
            }
            for (on, modifier) in [
                (cell.bold(), Modifier::BOLD),
                (cell.dim(), Modifier::DIM),
                (cell.italic(), Modifier::ITALIC),
                (cell.underline(), Modifier::UNDERLINED),
                (cell.inverse(), Modifier::REVERSED),
            ] {
                if on {
                    style = style.add_modifier(modifier);
                }
            }
            buf_cell.reset();
            let mut utf8 = [0u8; 4];
            buf_cell
                .set_symbol(symbol.encode_utf8(&mut utf8))
                .set_style(style);
        }
    }

    if show_cursor && !screen.hide_cursor() {
        let (row, col) = screen.cursor_position();
        if row < area.height
            && col < area.width
            && let Some(cell) = buffer.cell_mut((area.x + col, area.y + row))
        {
            cell.set_style(cell.style().add_modifier(Modifier::REVERSED));
        }
    }
}

pub fn key_to_bytes(key: KeyEvent) -> Vec<u8> {
    match key.code {
        KeyCode::Char(c) => {
            if key.modifiers.contains(KeyModifiers::CONTROL)
                && let Some(byte) = ctrl_char(c)
            {
                return vec![byte];
            }
            let mut bytes = c.to_string().into_bytes();
            if key.modifiers.contains(KeyModifiers::ALT) {
                bytes.insert(0, 0x1b);
            }
            bytes
        }
        KeyCode::Enter => vec![b'\r'],
        KeyCode::Backspace => vec![0x7f],
        KeyCode::Esc => vec![0x1b],
        KeyCode::Tab => vec![b'\t'],
        KeyCode::BackTab => b"\x1b[Z".to_vec(),
        KeyCode::Up => b"\x1b[A".to_vec(),
        KeyCode::Down => b"\x1b[B".to_vec(),
        KeyCode::Right => b"\x1b[C".to_vec(),
        KeyCode::Left => b"\x1b[D".to_vec(),
        KeyCode::Home => b"\x1b[H".to_vec(),
        KeyCode::End => b"\x1b[F".to_vec(),
        KeyCode::Insert => b"\x1b[2~".to_vec(),
        KeyCode::Delete => b"\x1b[3~".to_vec(),
        KeyCode::PageUp => b"\x1b[5~".to_vec(),
        KeyCode::PageDown => b"\x1b[6~".to_vec(),
        _ => Vec::new(),
    }
}

fn ctrl_char(c: char) -> Option<u8> {
    let c = c.to_ascii_lowercase();
    if c.is_ascii_lowercase() {
        Some((c as u8) - b'a' + 1)
    } else {
        None
    }
}

fn mouse_event_allowed(mode: MouseProtocolMode, kind: MouseEventKind) -> bool {
    use MouseEventKind::*;
    match mode {
        MouseProtocolMode::None => false,
        MouseProtocolMode::Press => matches!(kind, Down(_)),
        MouseProtocolMode::PressRelease => matches!(kind, Down(_) | Up(_)),
        MouseProtocolMode::ButtonMotion => matches!(kind, Down(_) | Up(_) | Drag(_)),
        MouseProtocolMode::AnyMotion => true,
    }
}

fn button_code(button: MouseButton) -> u8 {
    match button {
        MouseButton::Left => 0,
        MouseButton::Middle => 1,
        MouseButton::Right => 2,
    }
}

fn mouse_event_to_bytes(mouse: MouseEvent) -> Vec<u8> {
    let (mut code, release) = match mouse.kind {
        MouseEventKind::Down(button) => (button_code(button), false),
        MouseEventKind::Up(button) => (button_code(button), true),
        MouseEventKind::Drag(button) => (32 + button_code(button), false),
        MouseEventKind::Moved => (35, false),
        MouseEventKind::ScrollUp => (64, false),
        MouseEventKind::ScrollDown => (65, false),
        MouseEventKind::ScrollLeft => (66, false),
        MouseEventKind::ScrollRight => (67, false),
    };
    if mouse.modifiers.contains(KeyModifiers::SHIFT) {
        code |= 4;
    }
    if mouse.modifiers.contains(KeyModifiers::ALT) {
        code |= 8;
    }
    if mouse.modifiers.contains(KeyModifiers::CONTROL) {
        code |= 16;
    }
    let action = if release { 'm' } else { 'M' };
    format!(
        "\x1b[<{};{};{}{}",
        code,
        mouse.column.saturating_add(1),
        mouse.row.saturating_add(1),
        action
    )
    .into_bytes()
}

fn resolve_colors(cell: &vt100::Cell, screen: &vt100::Screen) -> (Option<TColor>, Option<TColor>) {
    let mut fg = resolve_color(cell.fgcolor(), screen.fgcolor());
    let bg = resolve_color(cell.bgcolor(), screen.bgcolor());
    if cell.bold() {
        fg = brighten_indexed(fg);
    }
    (fg, bg)
}

fn resolve_color(color: vt100::Color, screen_default: vt100::Color) -> Option<TColor> {
    let color = match color {
        vt100::Color::Default => screen_default,
        other => other,
    };
    match color {
        vt100::Color::Default => None,
        vt100::Color::Idx(idx) => Some(TColor::Indexed(idx)),
        vt100::Color::Rgb(r, g, b) => Some(TColor::Rgb(r, g, b)),
    }
}

fn brighten_indexed(color: Option<TColor>) -> Option<TColor> {
    match color {
        Some(TColor::Indexed(idx)) if idx < 8 => Some(TColor::Indexed(idx + 8)),
        _ => color,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn key(code: KeyCode, mods: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, mods)
    }

    #[test]
    fn activity_goes_quiet_after_window() {
        let start = Instant::now();
        let mut tracker = ActivityTracker::default();
        assert!(!tracker.is_active(start));
        assert!(tracker.observe(10, start, false));
        assert!(tracker.is_active(start + Duration::from_millis(1500)));
        assert!(!tracker.is_active(start + Duration::from_secs(3)));
        assert!(!tracker.observe(10, start + Duration::from_secs(3), false));
    }

    #[test]
    fn unseen_output_only_when_unfocused() {
        let now = Instant::now();
        let mut tracker = ActivityTracker::default();
        tracker.observe(5, now, true);
        assert!(!tracker.has_unseen());
        tracker.observe(9, now, false);
        assert!(tracker.has_unseen());
        tracker.mark_seen();
        assert!(!tracker.has_unseen());
    }

    #[test]
    fn key_encoding() {
        assert_eq!(key_to_bytes(key(KeyCode::Char('x'), KeyModifiers::NONE)), b"x");
        assert_eq!(key_to_bytes(key(KeyCode::Enter, KeyModifiers::NONE)), b"\r");
        assert_eq!(key_to_bytes(key(KeyCode::Char('c'), KeyModifiers::CONTROL)), vec![3]);
        assert_eq!(key_to_bytes(key(KeyCode::Char('b'), KeyModifiers::ALT)), b"\x1bb");
        assert_eq!(key_to_bytes(key(KeyCode::Delete, KeyModifiers::NONE)), b"\x1b[3~");
        assert!(key_to_bytes(key(KeyCode::F(5), KeyModifiers::NONE)).is_empty());
    }

    #[test]
    fn ctrl_char_edges() {
        assert_eq!(ctrl_char('a'), Some(1));
        assert_eq!(ctrl_char('Z'), Some(26));
        assert_eq!(ctrl_char('1'), None);
    }

    #[test]
    fn mouse_reporting_respects_mode() {
        use MouseEventKind::*;
        assert!(!mouse_event_allowed(MouseProtocolMode::None, Down(MouseButton::Left)));
        assert!(!mouse_event_allowed(MouseProtocolMode::Press, Up(MouseButton::Left)));
        assert!(mouse_event_allowed(MouseProtocolMode::PressRelease, Up(MouseButton::Left)));
        assert!(mouse_event_allowed(MouseProtocolMode::ButtonMotion, Drag(MouseButton::Left)));
        assert!(!mouse_event_allowed(MouseProtocolMode::ButtonMotion, Moved));
        assert!(mouse_event_allowed(MouseProtocolMode::AnyMotion, Moved));
    }

    #[test]
    fn sgr_mouse_encoding() {
        let down = MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column: 2,
            row: 3,
            modifiers: KeyModifiers::NONE,
        };
        assert_eq!(mouse_event_to_bytes(down), b"\x1b[<0;3;4M");
        let up = MouseEvent {
            kind: MouseEventKind::Up(MouseButton::Right),
            column: 0,
            row: 0,
            modifiers: KeyModifiers::SHIFT | KeyModifiers::CONTROL,
        };
        assert_eq!(mouse_event_to_bytes(up), b"\x1b[<22;1;1m");
    }

    #[test]
    fn colors_fall_back_to_screen_default() {
        assert_eq!(resolve_color(vt100::Color::Default, vt100::Color::Default), None);
        assert_eq!(
            resolve_color(vt100::Color::Default, vt100::Color::Idx(7)),
            Some(TColor::Indexed(7))
        );
        assert_eq!(
            resolve_color(vt100::Color::Rgb(1, 2, 3), vt100::Color::Idx(7)),
            Some(TColor::Rgb(1, 2, 3))
        );
        assert_eq!(brighten_indexed(Some(TColor::Indexed(1))), Some(TColor::Indexed(9)));
        assert_eq!(brighten_indexed(Some(TColor::Indexed(9))), Some(TColor::Indexed(9)));
    }

    #[test]
    fn renders_parsed_screen_with_offset() {
        let mut parser = vt100::Parser::new(3, 10, 0);
        parser.process(b"hi\r\n\x1b[1mok");
        let area = Rect {
            x: 2,
            y: 1,
            width: 10,
            height: 3,
        };
        let mut buffer = Buffer::empty(Rect {
            x: 0,
            y: 0,
            width: 12,
            height: 4,
        });
        render_screen(parser.screen(), &mut buffer, area, true);
        assert_eq!(buffer.cell((2, 1)).unwrap().symbol(), "h");
        assert_eq!(buffer.cell((3, 1)).unwrap().symbol(), "i");
        let bold = buffer.cell((2, 2)).unwrap();
        assert_eq!(bold.symbol(), "o");
        assert!(bold.style().add_modifier.contains(Modifier::BOLD));
        // cursor sits after "ok"
        let cursor = buffer.cell((4, 2)).unwrap();
        assert!(cursor.style().add_modifier.contains(Modifier::REVERSED));
    }
}
