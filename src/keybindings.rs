use std::collections::HashMap;
use std::fmt;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Number of presets reachable through Alt+digit.
pub const PRESET_SLOTS: u8 = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Quit,
    NewTerminal,
    NewWorktreeTerminal,
    CloseWindow,
    MinimizeWindow,
    RestoreWindow,
    ToggleOverview,
    FocusNext,
    FocusPrev,
    /// Zero-based index into the configured presets.
    LaunchPreset(u8),
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Quit => write!(f, "Quit"),
            Action::NewTerminal => write!(f, "New terminal"),
            Action::NewWorktreeTerminal => write!(f, "New terminal in a fresh worktree"),
            Action::CloseWindow => write!(f, "Close window"),
            Action::MinimizeWindow => write!(f, "Minimize window"),
            Action::RestoreWindow => write!(f, "Restore last minimized"),
            Action::ToggleOverview => write!(f, "Toggle overview"),
            Action::FocusNext => write!(f, "Focus next window"),
            Action::FocusPrev => write!(f, "Focus previous window"),
            Action::LaunchPreset(slot) => write!(f, "Launch preset {}", slot + 1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyCombo {
    pub code: KeyCode,
    pub mods: KeyModifiers,
}

impl KeyCombo {
    pub fn new(code: KeyCode, mods: KeyModifiers) -> Self {
        Self { code, mods }
    }

    pub fn ctrl(c: char) -> Self {
        Self::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    pub fn matches(&self, key: &KeyEvent) -> bool {
        let code = match key.code {
            KeyCode::Char(c) => KeyCode::Char(c.to_ascii_lowercase()),
            other => other,
        };
        code == self.code && key.modifiers == self.mods
    }

    pub fn display(&self) -> String {
        let mut parts = Vec::new();
        if self.mods.contains(KeyModifiers::CONTROL) {
            parts.push("Ctrl".to_string());
        }
        if self.mods.contains(KeyModifiers::SHIFT) {
            parts.push("Shift".to_string());
        }
        if self.mods.contains(KeyModifiers::ALT) {
            parts.push("Alt".to_string());
        }
        let code = match self.code {
            KeyCode::Char(c) => c.to_ascii_uppercase().to_string(),
            KeyCode::Left => "Left".to_string(),
            KeyCode::Right => "Right".to_string(),
            KeyCode::Up => "Up".to_string(),
            KeyCode::Down => "Down".to_string(),
            KeyCode::F(n) => format!("F{}", n),
            _ => format!("{:?}", self.code),
        };
        parts.push(code);
        parts.join("+")
    }
}

impl fmt::Display for KeyCombo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display())
    }
}

/// Global window-management bindings. Keys that match none of them belong to
/// the focused terminal.
#[derive(Debug, Clone)]
pub struct KeyBindings {
    map: HashMap<Action, Vec<KeyCombo>>,
}

impl Default for KeyBindings {
    fn default() -> Self {
        use Action::*;
        let mut kb = Self::new();
        kb.add(Quit, KeyCombo::ctrl('q'));
        kb.add(NewTerminal, KeyCombo::ctrl('t'));
        kb.add(NewWorktreeTerminal, KeyCombo::ctrl('g'));
        kb.add(CloseWindow, KeyCombo::ctrl('x'));
        kb.add(
            MinimizeWindow,
            KeyCombo::new(KeyCode::Down, KeyModifiers::CONTROL),
        );
        kb.add(
            RestoreWindow,
            KeyCombo::new(KeyCode::Up, KeyModifiers::CONTROL),
        );
        kb.add(ToggleOverview, KeyCombo::ctrl('o'));
        kb.add(
            FocusNext,
            KeyCombo::new(KeyCode::Right, KeyModifiers::CONTROL),
        );
        kb.add(
            FocusPrev,
            KeyCombo::new(KeyCode::Left, KeyModifiers::CONTROL),
        );
        for slot in 0..PRESET_SLOTS {
            let digit = char::from(b'1' + slot);
            kb.add(
                LaunchPreset(slot),
                KeyCombo::new(KeyCode::Char(digit), KeyModifiers::ALT),
            );
        }
        kb
    }
}

impl KeyBindings {
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    pub fn add(&mut self, action: Action, combo: KeyCombo) {
        self.map.entry(action).or_default().push(combo);
    }

    pub fn matches(&self, action: Action, key: &KeyEvent) -> bool {
        self.map
            .get(&action)
            .is_some_and(|list| list.iter().any(|c| c.matches(key)))
    }

    pub fn action_for_key(&self, key: &KeyEvent) -> Option<Action> {
        self.map
            .iter()
            .find(|(_, list)| list.iter().any(|c| c.matches(key)))
            .map(|(act, _)| *act)
    }

    /// `(action, combos)` pairs sorted by display text, for the overview.
    pub fn help_entries(&self) -> Vec<(Action, Vec<String>)> {
        let mut v: Vec<(Action, Vec<String>)> = self
            .map
            .iter()
            .map(|(act, list)| (*act, list.iter().map(|c| c.display()).collect()))
            .collect();
        v.sort_by_key(|(act, _)| act.to_string());
        v
    }
}
