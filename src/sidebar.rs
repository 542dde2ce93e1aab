use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState};

use crate::layout::rect_contains;
use crate::session::SessionId;
use crate::ui::{UiFrame, safe_set_string, truncate_to_width};

/// One session tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidebarEntry {
    pub session: SessionId,
    pub title: String,
    pub active: bool,
    pub unseen: bool,
    pub exited: bool,
    pub minimized: bool,
    /// Change summary, `None` when git status is unknown.
    pub git: Option<String>,
}

impl SidebarEntry {
    fn marker(&self) -> char {
        if self.exited {
            '✗'
        } else if self.active {
            '●'
        } else if self.unseen {
            '•'
        } else {
            ' '
        }
    }

    fn line(&self, width: usize) -> String {
        let mut line = format!("{} {}", self.marker(), self.title);
        if self.minimized {
            line.push_str(" (min)");
        }
        if let Some(git) = &self.git {
            let used = line.chars().count();
            let git_width = git.chars().count();
            if used + git_width + 1 < width {
                let pad = width - used - git_width;
                line.push_str(&" ".repeat(pad));
                line.push_str(git);
            }
        }
        truncate_to_width(&line, width)
    }
}

#[derive(Debug)]
pub struct Sidebar {
    entries: Vec<SidebarEntry>,
    state: ListState,
    hostname: String,
    list_area: Rect,
}

impl Default for Sidebar {
    fn default() -> Self {
        Self::new()
    }
}

impl Sidebar {
    pub fn new() -> Self {
        let hostname = hostname::get()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "localhost".to_string());
        Self::with_hostname(hostname)
    }

    pub fn with_hostname(hostname: impl Into<String>) -> Self {
        Self {
            entries: Vec::new(),
            state: ListState::default(),
            hostname: hostname.into(),
            list_area: Rect::default(),
        }
    }

    pub fn entries(&self) -> &[SidebarEntry] {
        &self.entries
    }

    /// Replace the tabs, keeping the selection on the same session when it
    /// still exists.
    pub fn set_entries(&mut self, entries: Vec<SidebarEntry>) {
        let selected = self.selected_session();
        self.entries = entries;
        self.select_session(selected);
    }

    pub fn select_session(&mut self, session: Option<SessionId>) {
        let idx = session.and_then(|id| self.entries.iter().position(|e| e.session == id));
        self.state.select(idx);
    }

    pub fn selected_session(&self) -> Option<SessionId> {
        self.state
            .selected()
            .and_then(|idx| self.entries.get(idx))
            .map(|entry| entry.session)
    }

    /// Session whose tab was drawn at a screen cell during the last render.
    pub fn session_at(&self, column: u16, row: u16) -> Option<SessionId> {
        if !rect_contains(self.list_area, column, row) {
            return None;
        }
        let idx = (row - self.list_area.y) as usize + self.state.offset();
        self.entries.get(idx).map(|entry| entry.session)
    }

    pub fn render(&mut self, frame: &mut UiFrame<'_>, area: Rect) {
        let block = Block::default()
            .borders(Borders::RIGHT)
            .border_style(Style::default().fg(Color::DarkGray));
        let inner = block.inner(area);
        frame.render_widget(block, area);
        if inner.width == 0 || inner.height == 0 {
            self.list_area = Rect::default();
            return;
        }

        let list_area = Rect {
            height: inner.height.saturating_sub(1),
            ..inner
        };
        let width = inner.width as usize;
        let items: Vec<ListItem> = self
            .entries
            .iter()
            .map(|entry| {
                let style = if entry.exited {
                    Style::default().fg(Color::DarkGray)
                } else if entry.unseen {
                    Style::default().add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };
                ListItem::new(entry.line(width)).style(style)
            })
            .collect();
        let list = List::new(items).highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        );
        frame.render_stateful_widget(list, list_area, &mut self.state);
        self.list_area = list_area;

        if inner.height > 0 {
            let footer_y = inner.y + inner.height - 1;
            let bounds = frame.area();
            safe_set_string(
                frame.buffer_mut(),
                bounds,
                inner.x,
                footer_y,
                &truncate_to_width(&format!("@{}", self.hostname), width),
                Style::default().fg(Color::DarkGray),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::buffer::Buffer;

    fn entry(session: SessionId, title: &str) -> SidebarEntry {
        SidebarEntry {
            session,
            title: title.to_string(),
            active: false,
            unseen: false,
            exited: false,
            minimized: false,
            git: None,
        }
    }

    #[test]
    fn selection_follows_session_across_updates() {
        let mut sidebar = Sidebar::with_hostname("box");
        sidebar.set_entries(vec![entry(1, "a"), entry(2, "b")]);
        sidebar.select_session(Some(2));
        sidebar.set_entries(vec![entry(0, "z"), entry(1, "a"), entry(2, "b")]);
        assert_eq!(sidebar.selected_session(), Some(2));
        sidebar.set_entries(vec![entry(1, "a")]);
        assert_eq!(sidebar.selected_session(), None);
    }

    #[test]
    fn entry_line_shows_marker_and_git_summary() {
        let mut e = entry(1, "build");
        e.active = true;
        e.git = Some("+1".to_string());
        assert_eq!(e.line(12), "● build   +1");
        e.exited = true;
        assert!(e.line(40).starts_with('✗'));
        // summary dropped when it does not fit
        assert_eq!(e.line(8), "✗ build");
    }

    #[test]
    fn render_then_click_maps_rows_to_sessions() {
        let area = Rect {
            x: 0,
            y: 0,
            width: 20,
            height: 6,
        };
        let mut buf = Buffer::empty(area);
        let mut sidebar = Sidebar::with_hostname("devbox");
        sidebar.set_entries(vec![entry(7, "one"), entry(9, "two")]);
        {
            let mut frame = UiFrame::from_parts(area, &mut buf);
            sidebar.render(&mut frame, area);
        }
        assert_eq!(sidebar.session_at(2, 0), Some(7));
        assert_eq!(sidebar.session_at(2, 1), Some(9));
        assert_eq!(sidebar.session_at(2, 2), None);
        assert_eq!(sidebar.session_at(19, 0), None);
        assert_eq!(buf.cell((0, 5)).unwrap().symbol(), "@");
    }
}
