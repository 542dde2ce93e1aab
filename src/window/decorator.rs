//! Window chrome: where the border, header, buttons and content sit inside a
//! window's screen rect, and how they are painted.
//!
//! Row 0 is the top border (and the north resize handle), row 1 is the
//! header with the title and the minimize/close buttons, and the remaining
//! rows down to the bottom border belong to the content.

use ratatui::prelude::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::Clear;

use crate::constants::GRID_SIZE;
use crate::layout::{
    GridMetrics, GridRect, HeaderButton, Highlight, PointerTarget, ResizeEdge, rect_contains,
};
use crate::ui::{UiFrame, safe_set_string, truncate_to_width};
use crate::window::WindowId;

pub const BUTTON_WIDTH: u16 = 3;
const MINIMIZE_LABEL: &str = "[_]";
const CLOSE_LABEL: &str = "[x]";

/// Screen geometry of one decorated window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowChrome {
    pub outer: Rect,
    pub header: Rect,
    pub minimize_button: Option<Rect>,
    pub close_button: Option<Rect>,
    pub content: Rect,
}

impl WindowChrome {
    pub fn new(outer: Rect) -> Self {
        let inner_width = outer.width.saturating_sub(2);
        let header = if outer.height >= 3 {
            Rect {
                x: outer.x.saturating_add(1),
                y: outer.y.saturating_add(1),
                width: inner_width,
                height: 1,
            }
        } else {
            Rect::default()
        };

        // Buttons only appear when at least one title column survives.
        let (minimize_button, close_button) = if header.width > BUTTON_WIDTH * 2 {
            let close_x = header.x + header.width - BUTTON_WIDTH;
            let close = Rect {
                x: close_x,
                y: header.y,
                width: BUTTON_WIDTH,
                height: 1,
            };
            let minimize = Rect {
                x: close_x - BUTTON_WIDTH,
                ..close
            };
            (Some(minimize), Some(close))
        } else {
            (None, None)
        };

        let content = Rect {
            x: outer.x.saturating_add(1),
            y: outer.y.saturating_add(2),
            width: inner_width,
            height: outer.height.saturating_sub(3),
        };

        Self {
            outer,
            header,
            minimize_button,
            close_button,
            content,
        }
    }

    /// Resize edge under a border cell.
    pub fn handle_at(&self, column: u16, row: u16) -> Option<ResizeEdge> {
        if !rect_contains(self.outer, column, row) {
            return None;
        }
        let left = column == self.outer.x;
        let right = column == self.outer.x + self.outer.width - 1;
        let top = row == self.outer.y;
        let bottom = row == self.outer.y + self.outer.height - 1;
        match (top, bottom, left, right) {
            (true, _, true, _) => Some(ResizeEdge::NorthWest),
            (true, _, _, true) => Some(ResizeEdge::NorthEast),
            (_, true, true, _) => Some(ResizeEdge::SouthWest),
            (_, true, _, true) => Some(ResizeEdge::SouthEast),
            (true, _, _, _) => Some(ResizeEdge::North),
            (_, true, _, _) => Some(ResizeEdge::South),
            (_, _, true, _) => Some(ResizeEdge::West),
            (_, _, _, true) => Some(ResizeEdge::East),
            _ => None,
        }
    }

    pub fn target_at(&self, id: WindowId, column: u16, row: u16) -> Option<PointerTarget> {
        if !rect_contains(self.outer, column, row) {
            return None;
        }
        if let Some(edge) = self.handle_at(column, row) {
            return Some(PointerTarget::Handle(id, edge));
        }
        if self
            .close_button
            .is_some_and(|rect| rect_contains(rect, column, row))
        {
            return Some(PointerTarget::Button(id, HeaderButton::Close));
        }
        if self
            .minimize_button
            .is_some_and(|rect| rect_contains(rect, column, row))
        {
            return Some(PointerTarget::Button(id, HeaderButton::Minimize));
        }
        if rect_contains(self.header, column, row) {
            return Some(PointerTarget::Header(id));
        }
        Some(PointerTarget::Body(id))
    }
}

/// Per-frame presentation state of a window.
#[derive(Debug, Clone, Copy)]
pub struct Decoration<'a> {
    pub title: &'a str,
    pub focused: bool,
    pub dragging: bool,
    /// Output arrived that the user has not looked at yet.
    pub unseen: bool,
}

pub trait WindowDecorator: std::fmt::Debug {
    fn render_window(
        &self,
        frame: &mut UiFrame<'_>,
        chrome: &WindowChrome,
        decoration: Decoration<'_>,
    );
}

#[derive(Debug, Default)]
pub struct DefaultDecorator;

impl WindowDecorator for DefaultDecorator {
    fn render_window(
        &self,
        frame: &mut UiFrame<'_>,
        chrome: &WindowChrome,
        decoration: Decoration<'_>,
    ) {
        let outer = chrome.outer;
        if outer.width < 2 || outer.height < 2 {
            return;
        }
        frame.render_widget(Clear, outer);

        let header_style = if decoration.focused {
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().bg(Color::DarkGray).fg(Color::White)
        };
        let border_style = if decoration.dragging {
            Style::default().fg(Color::Yellow)
        } else if decoration.focused {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        let bounds = frame.area();
        let buffer = frame.buffer_mut();
        let left = outer.x;
        let top = outer.y;
        let right = outer.x + outer.width - 1;
        let bottom = outer.y + outer.height - 1;

        for x in left..=right {
            let (top_symbol, bottom_symbol) = if x == left {
                ("┌", "└")
            } else if x == right {
                ("┐", "┘")
            } else {
                ("─", "─")
            };
            if let Some(cell) = buffer.cell_mut((x, top)) {
                cell.set_symbol(top_symbol).set_style(border_style);
            }
            if let Some(cell) = buffer.cell_mut((x, bottom)) {
                cell.set_symbol(bottom_symbol).set_style(border_style);
            }
        }
        for y in top.saturating_add(1)..bottom {
            for x in [left, right] {
                if let Some(cell) = buffer.cell_mut((x, y)) {
                    cell.set_symbol("│").set_style(border_style);
                }
            }
        }

        let header = chrome.header;
        if header.width == 0 {
            return;
        }
        for x in header.x..header.x + header.width {
            if let Some(cell) = buffer.cell_mut((x, header.y)) {
                cell.set_symbol(" ").set_style(header_style);
            }
        }
        let buttons_width = chrome
            .minimize_button
            .map(|_| BUTTON_WIDTH * 2)
            .unwrap_or(0);
        let title_width = header.width.saturating_sub(buttons_width + 1) as usize;
        let title = if decoration.unseen {
            format!("● {}", decoration.title)
        } else {
            decoration.title.to_string()
        };
        safe_set_string(
            buffer,
            bounds,
            header.x.saturating_add(1),
            header.y,
            &truncate_to_width(&title, title_width),
            header_style,
        );
        if let Some(rect) = chrome.minimize_button {
            safe_set_string(buffer, bounds, rect.x, rect.y, MINIMIZE_LABEL, header_style);
        }
        if let Some(rect) = chrome.close_button {
            safe_set_string(buffer, bounds, rect.x, rect.y, CLOSE_LABEL, header_style);
        }
    }
}

/// Gesture feedback: faint grid lines across empty cells of the container and
/// a double outline around the cells the active window now covers.
pub fn render_grid_overlay(frame: &mut UiFrame<'_>, metrics: &GridMetrics, highlight: &Highlight) {
    let area = metrics.area().intersection(frame.area());
    if area.width == 0 || area.height == 0 {
        return;
    }
    let line_style = Style::default().fg(Color::DarkGray);
    let buffer = frame.buffer_mut();

    for gx in 1..GRID_SIZE {
        let column = metrics.to_screen(GridRect::new(gx, 0, 1, 1)).x;
        for row in area.y..area.y + area.height {
            if let Some(cell) = buffer.cell_mut((column, row))
                && cell.symbol() == " "
            {
                cell.set_symbol("┊").set_style(line_style);
            }
        }
    }
    for gy in 1..GRID_SIZE {
        let row = metrics.to_screen(GridRect::new(0, gy, 1, 1)).y;
        for column in area.x..area.x + area.width {
            if let Some(cell) = buffer.cell_mut((column, row))
                && cell.symbol() == " "
            {
                cell.set_symbol("┈").set_style(line_style);
            }
        }
    }

    let target = metrics.to_screen(highlight.rect).intersection(area);
    if target.width < 2 || target.height < 2 {
        return;
    }
    let outline = Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::BOLD);
    let right = target.x + target.width - 1;
    let bottom = target.y + target.height - 1;
    for x in target.x..=right {
        for y in [target.y, bottom] {
            if let Some(cell) = buffer.cell_mut((x, y)) {
                cell.set_symbol("═").set_style(outline);
            }
        }
    }
    for y in target.y..=bottom {
        for x in [target.x, right] {
            if let Some(cell) = buffer.cell_mut((x, y)) {
                cell.set_symbol("║").set_style(outline);
            }
        }
    }
    for (x, y, symbol) in [
        (target.x, target.y, "╔"),
        (right, target.y, "╗"),
        (target.x, bottom, "╚"),
        (right, bottom, "╝"),
    ] {
        if let Some(cell) = buffer.cell_mut((x, y)) {
            cell.set_symbol(symbol).set_style(outline);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::buffer::Buffer;

    fn outer() -> Rect {
        Rect {
            x: 0,
            y: 0,
            width: 40,
            height: 20,
        }
    }

    #[test]
    fn chrome_layout() {
        let chrome = WindowChrome::new(outer());
        assert_eq!(
            chrome.header,
            Rect {
                x: 1,
                y: 1,
                width: 38,
                height: 1
            }
        );
        assert_eq!(chrome.close_button.unwrap().x, 36);
        assert_eq!(chrome.minimize_button.unwrap().x, 33);
        assert_eq!(
            chrome.content,
            Rect {
                x: 1,
                y: 2,
                width: 38,
                height: 17
            }
        );
    }

    #[test]
    fn narrow_windows_drop_buttons() {
        let chrome = WindowChrome::new(Rect {
            x: 0,
            y: 0,
            width: 8,
            height: 4,
        });
        assert!(chrome.close_button.is_none());
        assert_eq!(chrome.content.height, 1);
    }

    #[test]
    fn border_cells_map_to_edges() {
        let chrome = WindowChrome::new(outer());
        assert_eq!(chrome.handle_at(0, 0), Some(ResizeEdge::NorthWest));
        assert_eq!(chrome.handle_at(20, 0), Some(ResizeEdge::North));
        assert_eq!(chrome.handle_at(39, 0), Some(ResizeEdge::NorthEast));
        assert_eq!(chrome.handle_at(0, 10), Some(ResizeEdge::West));
        assert_eq!(chrome.handle_at(39, 10), Some(ResizeEdge::East));
        assert_eq!(chrome.handle_at(20, 19), Some(ResizeEdge::South));
        assert_eq!(chrome.handle_at(39, 19), Some(ResizeEdge::SouthEast));
        assert_eq!(chrome.handle_at(10, 10), None);
    }

    #[test]
    fn targets_inside_window() {
        let chrome = WindowChrome::new(outer());
        let id = WindowId::new(1);
        assert_eq!(chrome.target_at(id, 10, 1), Some(PointerTarget::Header(id)));
        assert_eq!(
            chrome.target_at(id, 37, 1),
            Some(PointerTarget::Button(id, HeaderButton::Close))
        );
        assert_eq!(
            chrome.target_at(id, 34, 1),
            Some(PointerTarget::Button(id, HeaderButton::Minimize))
        );
        assert_eq!(chrome.target_at(id, 10, 10), Some(PointerTarget::Body(id)));
        assert_eq!(chrome.target_at(id, 50, 10), None);
    }

    #[test]
    fn renders_title_and_buttons() {
        let area = outer();
        let mut buf = Buffer::empty(area);
        let mut frame = UiFrame::from_parts(area, &mut buf);
        let chrome = WindowChrome::new(area);
        DefaultDecorator.render_window(
            &mut frame,
            &chrome,
            Decoration {
                title: "shell",
                focused: true,
                dragging: false,
                unseen: false,
            },
        );
        assert_eq!(buf.cell((0, 0)).unwrap().symbol(), "┌");
        assert_eq!(buf.cell((2, 1)).unwrap().symbol(), "s");
        assert_eq!(buf.cell((37, 1)).unwrap().symbol(), "x");
        assert_eq!(buf.cell((34, 1)).unwrap().symbol(), "_");
        assert_eq!(buf.cell((39, 19)).unwrap().symbol(), "┘");
    }

    #[test]
    fn overlay_outlines_target_and_skips_painted_cells() {
        let area = Rect {
            x: 0,
            y: 0,
            width: 80,
            height: 40,
        };
        let mut buf = Buffer::empty(area);
        buf.cell_mut((10, 3)).unwrap().set_symbol("#");
        let mut frame = UiFrame::from_parts(area, &mut buf);
        let metrics = GridMetrics::new(area);
        let highlight = Highlight {
            window: WindowId::new(1),
            rect: GridRect::new(4, 4, 2, 2),
        };
        render_grid_overlay(&mut frame, &metrics, &highlight);
        assert_eq!(buf.cell((10, 3)).unwrap().symbol(), "#");
        assert_eq!(buf.cell((10, 2)).unwrap().symbol(), "┊");
        assert_eq!(buf.cell((40, 20)).unwrap().symbol(), "╔");
        assert_eq!(buf.cell((59, 29)).unwrap().symbol(), "╝");
    }
}
