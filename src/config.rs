use std::path::PathBuf;

use clap::Parser;
use tracing::Level;

use crate::constants::DEFAULT_SIDEBAR_WIDTH;
use crate::preset::{Preset, default_shell};

/// Command-line configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "gridmux", version, about)]
pub struct Config {
    /// Shell started in new terminals (defaults to $SHELL).
    #[arg(long)]
    pub shell: Option<String>,

    /// Working directory for new terminals.
    #[arg(long)]
    pub cwd: Option<PathBuf>,

    /// Repository new worktree terminals branch from (defaults to the
    /// repository containing the working directory).
    #[arg(long)]
    pub repo: Option<PathBuf>,

    /// Directory new worktrees are created under (defaults to
    /// `<repo>-worktrees` next to the repository).
    #[arg(long)]
    pub worktree_root: Option<PathBuf>,

    /// Command preset, `NAME=TEMPLATE`. Templates may use {cwd}, {branch}
    /// and {worktree}. Alt+1..9 launch presets in the order given.
    #[arg(long = "preset", value_name = "NAME=TEMPLATE")]
    pub presets: Vec<Preset>,

    /// Sidebar width in columns; 0 hides it.
    #[arg(long, default_value_t = DEFAULT_SIDEBAR_WIDTH)]
    pub sidebar_width: u16,

    /// Write logs to this file instead of the in-memory overview buffer.
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    #[arg(long, default_value_t = Level::INFO)]
    pub log_level: Level,

    /// Skip repository detection and git status polling.
    #[arg(long)]
    pub no_git: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self::parse_from(["gridmux"])
    }
}

impl Config {
    pub fn shell(&self) -> String {
        self.shell.clone().unwrap_or_else(default_shell)
    }

    pub fn working_dir(&self) -> PathBuf {
        self.cwd
            .clone()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Parent directory for a new worktree of `repo`.
    pub fn worktree_root_for(&self, repo: &std::path::Path) -> PathBuf {
        if let Some(root) = &self.worktree_root {
            return root.clone();
        }
        let name = repo
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "repo".to_string());
        repo.with_file_name(format!("{name}-worktrees"))
    }

    pub fn preset(&self, index: usize) -> Option<&Preset> {
        self.presets.get(index)
    }
}
