//! The application: routes host input into the layout core and the terminal
//! sessions, turns registry notifications into PTY refits and teardown, and
//! paints a frame.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crossterm::event::{Event, KeyEvent, KeyEventKind, MouseButton, MouseEvent, MouseEventKind};
use portable_pty::{CommandBuilder, PtySize};
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::config::Config;
use crate::constants::{CONTAINER_RESIZE_DEBOUNCE, GIT_POLL_INTERVAL};
use crate::error::Result;
use crate::event_loop::ControlFlow;
use crate::git::{GitCli, GitStatusPoller};
use crate::keybindings::{Action, KeyBindings};
use crate::layout::{
    GridMetrics, GridRect, HeaderButton, InteractionController, Point, PointerTarget,
    rect_contains,
};
use crate::preset::{PresetContext, shell_command};
use crate::session::{SessionId, SessionSpec, TerminalSession};
use crate::sidebar::{Sidebar, SidebarEntry};
use crate::tracing_sub::LogBuffer;
use crate::ui::{UiFrame, safe_set_string, truncate_to_width};
use crate::window::decorator::{Decoration, DefaultDecorator, WindowChrome, WindowDecorator};
use crate::window::{CreateOptions, WindowEvent, WindowId, WindowKind, WindowRegistry};

const INITIAL_PTY_SIZE: PtySize = PtySize {
    rows: 24,
    cols: 80,
    pixel_width: 0,
    pixel_height: 0,
};

const EMPTY_MESSAGE: &str = "Ctrl+T new terminal · Ctrl+O overview · Ctrl+Q quit";

/// Split the host screen into the sidebar and the grid container. The
/// sidebar never takes more than half of the screen.
pub fn split_screen(screen: Rect, sidebar_width: u16) -> (Rect, Rect) {
    let width = sidebar_width.min(screen.width / 2);
    let sidebar = Rect { width, ..screen };
    let container = Rect {
        x: screen.x + width,
        width: screen.width - width,
        ..screen
    };
    (sidebar, container)
}

/// First `n >= start` whose branch `gridmux/{n}` does not exist and whose
/// path `<root>/wt-{n}` is neither a registered worktree nor on disk.
fn worktree_slot(
    root: &Path,
    start: SessionId,
    registered: &[PathBuf],
    mut branch_exists: impl FnMut(&str) -> Result<bool>,
) -> Result<(String, PathBuf)> {
    let mut n = start;
    loop {
        let branch = format!("gridmux/{n}");
        let path = root.join(format!("wt-{n}"));
        let taken = registered.contains(&path) || path.exists();
        if !taken && !branch_exists(&branch)? {
            return Ok((branch, path));
        }
        n += 1;
    }
}

pub struct App {
    config: Config,
    registry: WindowRegistry,
    controller: InteractionController,
    sessions: BTreeMap<SessionId, TerminalSession>,
    next_session: SessionId,
    sidebar: Sidebar,
    sidebar_area: Rect,
    decorator: Box<dyn WindowDecorator>,
    keybindings: KeyBindings,
    git: Option<GitCli>,
    poller: Option<GitStatusPoller>,
    repo: Option<PathBuf>,
    logs: LogBuffer,
    screen: Rect,
    // last host resize still waiting for the debounce period
    pending_refit: Option<Instant>,
}

impl App {
    pub fn new(config: Config, logs: LogBuffer) -> Self {
        let (git, poller, repo) = if config.no_git {
            (None, None, None)
        } else {
            let git = GitCli::new();
            let repo = match &config.repo {
                Some(repo) => Some(repo.clone()),
                None => match git.repo_root(&config.working_dir()) {
                    Ok(root) => Some(root),
                    Err(err) => {
                        tracing::debug!(%err, "working directory is not a git repository");
                        None
                    }
                },
            };
            let poller = GitStatusPoller::spawn(git.clone(), GIT_POLL_INTERVAL);
            (Some(git), Some(poller), repo)
        };
        Self {
            config,
            registry: WindowRegistry::new(),
            controller: InteractionController::default(),
            sessions: BTreeMap::new(),
            next_session: 1,
            sidebar: Sidebar::new(),
            sidebar_area: Rect::default(),
            decorator: Box::new(DefaultDecorator),
            keybindings: KeyBindings::default(),
            git,
            poller,
            repo,
            logs,
            screen: Rect::default(),
            pending_refit: None,
        }
    }

    pub fn registry(&self) -> &WindowRegistry {
        &self.registry
    }

    pub fn controller(&self) -> &InteractionController {
        &self.controller
    }

    pub fn sessions(&self) -> impl Iterator<Item = &TerminalSession> {
        self.sessions.values()
    }

    pub fn metrics(&self) -> &GridMetrics {
        self.controller.metrics()
    }

    /// Adopt a new host size. The layout follows immediately; content refits
    /// wait until resizing has been quiet for a moment.
    pub fn resize(&mut self, width: u16, height: u16, now: Instant) {
        let screen = Rect {
            x: 0,
            y: 0,
            width,
            height,
        };
        if screen == self.screen {
            return;
        }
        let first = self.screen.area() == 0;
        self.screen = screen;
        let (sidebar, container) = split_screen(screen, self.config.sidebar_width);
        self.sidebar_area = sidebar;
        self.controller.set_metrics(GridMetrics::new(container));
        if first {
            self.registry.refit_all();
            self.process_window_events();
        } else {
            self.pending_refit = Some(now);
        }
    }

    pub fn handle_event(&mut self, event: Event, now: Instant) -> ControlFlow {
        let flow = match event {
            Event::Key(key) => self.handle_key(key),
            Event::Mouse(mouse) => {
                self.handle_mouse(mouse);
                ControlFlow::Continue
            }
            Event::Resize(width, height) => {
                self.resize(width, height, now);
                ControlFlow::Continue
            }
            Event::FocusLost => {
                self.controller.cancel_gesture(&mut self.registry);
                ControlFlow::Continue
            }
            _ => ControlFlow::Continue,
        };
        self.process_window_events();
        self.sync_focus();
        flow
    }

    /// Periodic work: debounced refits, PTY output, git status. Quits once
    /// every session has exited.
    pub fn tick(&mut self, now: Instant) -> ControlFlow {
        if let Some(at) = self.pending_refit
            && now.saturating_duration_since(at) >= CONTAINER_RESIZE_DEBOUNCE
        {
            self.pending_refit = None;
            self.registry.refit_all();
        }
        self.process_window_events();

        let focused_session = self.focused_session();
        for session in self.sessions.values_mut() {
            session.tick(now, focused_session == Some(session.id()));
        }
        if let Some(poller) = &self.poller {
            for update in poller.drain() {
                for session in self.sessions.values_mut() {
                    if session.git_dir() == update.dir {
                        session.set_git_status(update.status.clone());
                    }
                }
            }
        }
        self.refresh_sidebar(now);

        if !self.sessions.is_empty() && self.sessions.values().all(|s| s.has_exited()) {
            tracing::info!("all sessions exited");
            return ControlFlow::Quit;
        }
        ControlFlow::Continue
    }

    fn handle_key(&mut self, key: KeyEvent) -> ControlFlow {
        if key.kind == KeyEventKind::Release {
            return ControlFlow::Continue;
        }
        if let Some(action) = self.keybindings.action_for_key(&key) {
            return self.run_action(action);
        }
        if let Some(session) = self
            .focused_session()
            .and_then(|id| self.sessions.get_mut(&id))
        {
            session.handle_key(key);
        }
        ControlFlow::Continue
    }

    pub fn run_action(&mut self, action: Action) -> ControlFlow {
        tracing::debug!(%action, "action");
        match action {
            Action::Quit => return ControlFlow::Quit,
            Action::NewTerminal => {
                if let Err(err) = self.open_shell() {
                    tracing::warn!(%err, "failed to open terminal");
                }
            }
            Action::NewWorktreeTerminal => {
                if let Err(err) = self.open_worktree_shell() {
                    tracing::warn!(%err, "failed to open worktree terminal");
                }
            }
            Action::CloseWindow => {
                if let Some(id) = self.registry.focused() {
                    self.registry.close(id);
                }
            }
            Action::MinimizeWindow => {
                if let Some(id) = self.registry.focused() {
                    self.registry.minimize(id);
                }
            }
            Action::RestoreWindow => {
                if let Some(id) = self.registry.last_minimized() {
                    self.registry.restore(id);
                }
            }
            Action::ToggleOverview => self.toggle_overview(),
            Action::FocusNext => self.registry.cycle_focus(true),
            Action::FocusPrev => self.registry.cycle_focus(false),
            Action::LaunchPreset(slot) => {
                if let Err(err) = self.launch_preset(slot as usize) {
                    tracing::warn!(%err, slot = slot + 1, "failed to launch preset");
                }
            }
        }
        ControlFlow::Continue
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        let pointer = Point::from_cell(mouse.column, mouse.row);
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                if rect_contains(self.sidebar_area, mouse.column, mouse.row) {
                    if let Some(session) = self.sidebar.session_at(mouse.column, mouse.row) {
                        self.focus_session(session);
                    }
                    return;
                }
                match self
                    .controller
                    .hit_test(&self.registry, mouse.column, mouse.row)
                {
                    Some(PointerTarget::Button(id, HeaderButton::Minimize)) => {
                        self.registry.minimize(id)
                    }
                    Some(PointerTarget::Button(id, HeaderButton::Close)) => self.registry.close(id),
                    Some(PointerTarget::Header(id)) => {
                        self.controller.begin_drag(&mut self.registry, id, pointer);
                    }
                    Some(PointerTarget::Handle(id, edge)) => {
                        self.controller
                            .begin_resize(&mut self.registry, id, edge, pointer);
                    }
                    Some(PointerTarget::Body(id)) => {
                        self.registry.bring_to_front(id);
                        self.forward_mouse(id, mouse);
                    }
                    None => {}
                }
            }
            MouseEventKind::Drag(MouseButton::Left) | MouseEventKind::Moved
                if !self.controller.is_idle() =>
            {
                self.controller.pointer_move(&mut self.registry, pointer);
            }
            MouseEventKind::Up(MouseButton::Left) if !self.controller.is_idle() => {
                self.controller.pointer_move(&mut self.registry, pointer);
                self.controller.end_gesture(&mut self.registry);
            }
            MouseEventKind::Moved => {}
            MouseEventKind::Drag(_) | MouseEventKind::Up(_) => {
                if let Some(id) = self.registry.focused() {
                    self.forward_mouse(id, mouse);
                }
            }
            _ => {
                if let Some(PointerTarget::Body(id)) =
                    self.controller
                        .hit_test(&self.registry, mouse.column, mouse.row)
                {
                    self.forward_mouse(id, mouse);
                }
            }
        }
    }

    fn forward_mouse(&mut self, id: WindowId, mouse: MouseEvent) {
        let Some(content) = self.registry.get(id).and_then(|w| w.content_id()) else {
            return;
        };
        if let Some(session) = self.sessions.get_mut(&content) {
            session.handle_mouse(mouse);
        }
    }

    /// Apply queued registry notifications to the sessions behind them.
    fn process_window_events(&mut self) {
        for event in self.registry.drain_events() {
            match event {
                WindowEvent::ContentResized { id, window } => {
                    let Some(content) = window.content_id() else {
                        continue;
                    };
                    let area = self.content_area(window.rect());
                    if let Some(session) = self.sessions.get_mut(&content)
                        && let Err(err) = session.refit(area.width, area.height)
                    {
                        tracing::warn!(window_id = %id, %err, "terminal refit failed");
                    }
                }
                WindowEvent::Closed { id, window } => {
                    tracing::debug!(window_id = %id, title = window.title(), "window closed");
                    let Some(content) = window.content_id() else {
                        continue;
                    };
                    if let Some(mut session) = self.sessions.remove(&content) {
                        if let Err(err) = session.terminate() {
                            tracing::warn!(session_id = content, %err, "failed to stop session");
                        }
                        self.unwatch_if_unused(session.git_dir());
                        if let Some(worktree) = session.worktree() {
                            self.release_worktree(worktree);
                        }
                    }
                }
            }
        }
    }

    fn unwatch_if_unused(&self, dir: &Path) {
        let Some(poller) = &self.poller else {
            return;
        };
        if !self.sessions.values().any(|s| s.git_dir() == dir) {
            poller.unwatch(dir);
        }
    }

    /// Remove a closed session's worktree unless it holds work in progress.
    fn release_worktree(&self, worktree: &Path) {
        let (Some(git), Some(repo)) = (&self.git, &self.repo) else {
            return;
        };
        if self.sessions.values().any(|s| s.worktree() == Some(worktree)) {
            return;
        }
        match git.remove_worktree_if_clean(repo, worktree) {
            Ok(true) => tracing::info!(path = %worktree.display(), "removed worktree"),
            Ok(false) => {
                tracing::warn!(path = %worktree.display(), "worktree has changes; leaving it")
            }
            Err(err) => {
                tracing::warn!(path = %worktree.display(), %err, "failed to remove worktree")
            }
        }
    }

    fn content_area(&self, rect: GridRect) -> Rect {
        WindowChrome::new(self.metrics().to_screen(rect)).content
    }

    fn focused_session(&self) -> Option<SessionId> {
        self.registry
            .focused()
            .and_then(|id| self.registry.get(id))
            .and_then(|window| window.content_id())
    }

    fn sync_focus(&mut self) {
        let focused = self.focused_session();
        if let Some(session) = focused.and_then(|id| self.sessions.get_mut(&id)) {
            session.mark_seen();
        }
        self.sidebar.select_session(focused);
    }

    /// Focus the window showing `session`, restoring it when minimized.
    pub fn focus_session(&mut self, session: SessionId) {
        let Some(window) = self.registry.find_by_content(session) else {
            return;
        };
        let id = window.id();
        if window.minimized() {
            self.registry.restore(id);
        } else {
            self.registry.bring_to_front(id);
        }
    }

    fn toggle_overview(&mut self) {
        match self.registry.singleton(WindowKind::Overview) {
            Some(window) if window.minimized() => {
                let id = window.id();
                self.registry.restore(id);
            }
            Some(window) if self.registry.is_focused(window.id()) => {
                let id = window.id();
                self.registry.close(id);
            }
            Some(window) => {
                let id = window.id();
                self.registry.bring_to_front(id);
            }
            None => {
                self.registry
                    .create(WindowKind::Overview, CreateOptions::default());
            }
        }
    }

    /// Directory, branch and worktree of the focused session, falling back to
    /// the configured working directory.
    fn focus_context(&self) -> SessionSpec {
        match self
            .focused_session()
            .and_then(|id| self.sessions.get(&id))
        {
            Some(session) => SessionSpec {
                title: String::new(),
                cwd: session.cwd().to_path_buf(),
                worktree: session.worktree().map(Path::to_path_buf),
                branch: session.branch().map(str::to_string),
            },
            None => SessionSpec {
                cwd: self.config.working_dir(),
                ..SessionSpec::default()
            },
        }
    }

    fn open_shell(&mut self) -> Result<WindowId> {
        let mut spec = self.focus_context();
        spec.title = format!("shell {}", self.next_session);
        let command = shell_command(&self.config.shell(), &spec.cwd)?;
        self.open_session(command, spec)
    }

    fn open_worktree_shell(&mut self) -> Result<WindowId> {
        let (Some(git), Some(repo)) = (&self.git, &self.repo) else {
            return Err(crate::Error::NoRepository);
        };
        let root = self.config.worktree_root_for(repo);
        let registered: Vec<PathBuf> = git
            .list_worktrees(repo)?
            .into_iter()
            .map(|worktree| worktree.path)
            .collect();
        let (branch, path) = worktree_slot(&root, self.next_session, &registered, |branch| {
            git.branch_exists(repo, branch)
        })?;
        std::fs::create_dir_all(&root)?;
        git.add_worktree(repo, &path, &branch)?;
        let spec = SessionSpec {
            title: branch.clone(),
            cwd: path.clone(),
            worktree: Some(path.clone()),
            branch: Some(branch),
        };
        let command = shell_command(&self.config.shell(), &path)?;
        self.open_session(command, spec)
    }

    fn launch_preset(&mut self, slot: usize) -> Result<WindowId> {
        let Some(preset) = self.config.preset(slot).cloned() else {
            return Err(crate::Error::Preset {
                name: format!("#{}", slot + 1),
                reason: "no preset configured in this slot".to_string(),
            });
        };
        let mut spec = self.focus_context();
        let ctx = PresetContext {
            cwd: &spec.cwd,
            branch: spec.branch.as_deref(),
            worktree: spec.worktree.as_deref(),
        };
        let command = preset.command(&ctx)?;
        spec.title = preset.name.clone();
        self.open_session(command, spec)
    }

    fn open_session(&mut self, command: CommandBuilder, spec: SessionSpec) -> Result<WindowId> {
        let id = self.next_session;
        let title = spec.title.clone();
        let session = TerminalSession::spawn(id, command, spec, INITIAL_PTY_SIZE)?;
        self.next_session += 1;
        if let Some(poller) = &self.poller {
            poller.watch(session.git_dir());
        }
        self.sessions.insert(id, session);
        let window = self.registry.create(
            WindowKind::Terminal,
            CreateOptions::default()
                .with_title(title)
                .with_content(id),
        );
        // refit to the placed window right away
        self.process_window_events();
        self.sync_focus();
        Ok(window)
    }

    fn refresh_sidebar(&mut self, now: Instant) {
        let entries = self
            .sessions
            .values()
            .map(|session| SidebarEntry {
                session: session.id(),
                title: session.title().to_string(),
                active: session.activity().is_active(now),
                unseen: session.activity().has_unseen(),
                exited: session.has_exited(),
                minimized: self
                    .registry
                    .find_by_content(session.id())
                    .is_some_and(|w| w.minimized()),
                git: session.git_status().map(|status| status.summary()),
            })
            .collect();
        self.sidebar.set_entries(entries);
        self.sidebar.select_session(self.focused_session());
    }

    pub fn render(&mut self, frame: &mut UiFrame<'_>) {
        if self.sidebar_area.width > 0 {
            self.sidebar.render(frame, self.sidebar_area);
        }
        let metrics = *self.metrics();
        let container = metrics.area();
        if self.registry.is_empty() {
            let bounds = frame.area();
            let text = truncate_to_width(EMPTY_MESSAGE, container.width as usize);
            safe_set_string(
                frame.buffer_mut(),
                bounds,
                container.x.saturating_add(1),
                container.y + container.height / 2,
                &text,
                Style::default().fg(Color::DarkGray),
            );
            return;
        }

        let active = self.controller.active_window();
        for id in self.registry.draw_order() {
            let Some(window) = self.registry.get(id) else {
                continue;
            };
            let chrome = WindowChrome::new(metrics.to_screen(window.rect()));
            let focused = self.registry.is_focused(id);
            let content = window.content_id();
            let unseen = content
                .and_then(|c| self.sessions.get(&c))
                .is_some_and(|s| s.activity().has_unseen());
            self.decorator.render_window(
                frame,
                &chrome,
                Decoration {
                    title: window.title(),
                    focused,
                    dragging: active == Some(id),
                    unseen,
                },
            );
            match window.kind() {
                WindowKind::Terminal => {
                    if let Some(session) = content.and_then(|c| self.sessions.get_mut(&c)) {
                        session.render(frame.buffer_mut(), chrome.content, focused);
                    }
                }
                WindowKind::Overview => self.render_overview(frame, chrome.content),
            }
        }

        if let Some(highlight) = self.controller.highlight() {
            crate::window::decorator::render_grid_overlay(frame, &metrics, &highlight);
        }
    }

    fn render_overview(&self, frame: &mut UiFrame<'_>, area: Rect) {
        if area.width == 0 || area.height == 0 {
            return;
        }
        let heading = Style::default().add_modifier(Modifier::BOLD);
        let dim = Style::default().fg(Color::DarkGray);
        let mut lines = vec![Line::from(Span::styled("Sessions", heading))];
        if self.sessions.is_empty() {
            lines.push(Line::from(Span::styled("  none", dim)));
        }
        for session in self.sessions.values() {
            let state = if session.has_exited() {
                "exited".to_string()
            } else {
                session
                    .git_status()
                    .map(|status| status.summary())
                    .unwrap_or_default()
            };
            lines.push(Line::from(vec![
                Span::raw(format!("  {:>3} {} ", session.id(), session.title())),
                Span::styled(session.cwd().display().to_string(), dim),
                Span::raw(format!(" {state}")),
            ]));
        }
        lines.push(Line::default());
        lines.push(Line::from(Span::styled("Keys", heading)));
        let presets = self.config.presets.len();
        for (action, combos) in self.keybindings.help_entries() {
            if matches!(action, Action::LaunchPreset(slot) if slot as usize >= presets) {
                continue;
            }
            lines.push(Line::from(vec![
                Span::styled(format!("  {:<12}", combos.join(", ")), dim),
                Span::raw(action.to_string()),
            ]));
        }
        lines.push(Line::default());
        lines.push(Line::from(Span::styled("Log", heading)));
        let room = (area.height as usize).saturating_sub(lines.len());
        for line in self.logs.tail(room) {
            lines.push(Line::from(Span::styled(line, dim)));
        }
        frame.render_widget(Paragraph::new(lines), area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;
    use ratatui::buffer::Buffer;

    fn app() -> App {
        let config = Config {
            no_git: true,
            sidebar_width: 20,
            ..Config::default()
        };
        let mut app = App::new(config, LogBuffer::new(16));
        app.resize(100, 40, Instant::now());
        app
    }

    fn mouse(kind: MouseEventKind, column: u16, row: u16) -> Event {
        Event::Mouse(MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::NONE,
        })
    }

    fn ctrl(c: char) -> Event {
        Event::Key(KeyEvent::new(
            crossterm::event::KeyCode::Char(c),
            KeyModifiers::CONTROL,
        ))
    }

    #[test]
    fn sidebar_takes_at_most_half_the_screen() {
        let screen = Rect::new(0, 0, 30, 10);
        let (sidebar, container) = split_screen(screen, 28);
        assert_eq!(sidebar, Rect::new(0, 0, 15, 10));
        assert_eq!(container, Rect::new(15, 0, 15, 10));
        let (sidebar, container) = split_screen(screen, 0);
        assert_eq!(sidebar.width, 0);
        assert_eq!(container, screen);
    }

    #[test]
    fn overview_toggles_between_open_focused_and_closed() {
        let mut app = app();
        let now = Instant::now();
        app.handle_event(ctrl('o'), now);
        let id = app.registry().singleton(WindowKind::Overview).unwrap().id();
        assert!(app.registry().is_focused(id));
        app.handle_event(ctrl('o'), now);
        assert!(app.registry().singleton(WindowKind::Overview).is_none());
    }

    #[test]
    fn header_drag_moves_window_by_whole_cells() {
        let mut app = app();
        let now = Instant::now();
        app.run_action(Action::ToggleOverview);
        // container is x 20..100, y 0..40: 10 columns and 5 rows per cell
        let id = app.registry().singleton(WindowKind::Overview).unwrap().id();
        assert_eq!(app.registry().get(id).unwrap().rect(), GridRect::new(0, 0, 4, 4));
        app.handle_event(mouse(MouseEventKind::Down(MouseButton::Left), 25, 1), now);
        assert!(!app.controller().is_idle());
        app.handle_event(mouse(MouseEventKind::Drag(MouseButton::Left), 46, 11), now);
        assert!(app.controller().overlay_visible());
        app.handle_event(mouse(MouseEventKind::Up(MouseButton::Left), 46, 11), now);
        assert!(app.controller().is_idle());
        assert_eq!(app.registry().get(id).unwrap().rect(), GridRect::new(2, 2, 4, 4));
    }

    #[test]
    fn focus_loss_ends_gesture_in_place() {
        let mut app = app();
        let now = Instant::now();
        app.run_action(Action::ToggleOverview);
        let id = app.registry().singleton(WindowKind::Overview).unwrap().id();
        app.handle_event(mouse(MouseEventKind::Down(MouseButton::Left), 25, 1), now);
        app.handle_event(mouse(MouseEventKind::Drag(MouseButton::Left), 35, 1), now);
        app.handle_event(Event::FocusLost, now);
        assert!(app.controller().is_idle());
        assert_eq!(app.registry().get(id).unwrap().rect(), GridRect::new(1, 0, 4, 4));
    }

    #[test]
    fn header_buttons_minimize_and_close() {
        let mut app = app();
        let now = Instant::now();
        app.run_action(Action::ToggleOverview);
        let id = app.registry().singleton(WindowKind::Overview).unwrap().id();
        // outer x 20..60: close at 56..59, minimize at 53..56 on row 1
        app.handle_event(mouse(MouseEventKind::Down(MouseButton::Left), 54, 1), now);
        assert!(app.registry().get(id).unwrap().minimized());
        app.run_action(Action::RestoreWindow);
        assert!(!app.registry().get(id).unwrap().minimized());
        app.handle_event(mouse(MouseEventKind::Down(MouseButton::Left), 57, 1), now);
        assert!(app.registry().get(id).is_none());
    }

    #[test]
    fn host_resize_refits_after_debounce() {
        let mut app = app();
        let start = Instant::now();
        app.run_action(Action::ToggleOverview);
        app.handle_event(Event::Resize(120, 40), start);
        assert_eq!(app.metrics().area(), Rect::new(20, 0, 100, 40));
        assert!(app.pending_refit.is_some());
        app.tick(start);
        assert!(app.pending_refit.is_some());
        app.tick(start + CONTAINER_RESIZE_DEBOUNCE);
        assert!(app.pending_refit.is_none());
    }

    #[test]
    fn render_draws_empty_hint_then_windows() {
        let mut app = app();
        let area = Rect::new(0, 0, 100, 40);
        let mut buf = Buffer::empty(area);
        {
            let mut frame = UiFrame::from_parts(area, &mut buf);
            app.render(&mut frame);
        }
        assert_eq!(buf.cell((21, 20)).unwrap().symbol(), "C");

        app.run_action(Action::ToggleOverview);
        let mut buf = Buffer::empty(area);
        {
            let mut frame = UiFrame::from_parts(area, &mut buf);
            app.render(&mut frame);
        }
        assert_eq!(buf.cell((20, 0)).unwrap().symbol(), "┌");
        // content starts below the header row
        assert_eq!(buf.cell((21, 2)).unwrap().symbol(), "S");
    }

    #[test]
    fn worktree_slot_skips_registered_paths_and_existing_branches() {
        let root = Path::new("/nonexistent/gridmux-wt");
        let registered = vec![root.join("wt-3"), PathBuf::from("/elsewhere/wt-4")];
        let mut asked = Vec::new();
        let (branch, path) = worktree_slot(root, 3, &registered, |branch| {
            asked.push(branch.to_string());
            Ok(branch == "gridmux/4")
        })
        .unwrap();
        assert_eq!(branch, "gridmux/5");
        assert_eq!(path, root.join("wt-5"));
        // wt-3 is registered, so its branch is never looked up
        assert_eq!(asked, vec!["gridmux/4", "gridmux/5"]);
    }

    #[test]
    fn worktree_slot_propagates_git_errors() {
        let err = worktree_slot(Path::new("/nonexistent"), 1, &[], |_| {
            Err(crate::Error::GitMissing)
        })
        .unwrap_err();
        assert!(matches!(err, crate::Error::GitMissing));
    }

    #[test]
    fn quit_binding_stops_the_loop() {
        let mut app = app();
        assert_eq!(app.handle_event(ctrl('q'), Instant::now()), ControlFlow::Quit);
        assert_eq!(app.tick(Instant::now()), ControlFlow::Continue);
    }
}
