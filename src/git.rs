//! Git integration through the `git` executable.
//!
//! Everything here shells out; the parsers are pure so captured output can be
//! tested directly.

use std::collections::BTreeSet;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::error::{Error, Result};

/// Working tree summary from `git status --porcelain=v1 -b`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitStatus {
    /// `None` on a detached HEAD.
    pub branch: Option<String>,
    pub ahead: u32,
    pub behind: u32,
    pub staged: u32,
    pub unstaged: u32,
    pub untracked: u32,
    pub conflicted: u32,
}

impl GitStatus {
    pub fn is_clean(&self) -> bool {
        self.staged == 0 && self.unstaged == 0 && self.untracked == 0 && self.conflicted == 0
    }

    /// Compact form for narrow places such as the sidebar, e.g. `+2 ~1 ?3`.
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        if self.conflicted > 0 {
            parts.push(format!("!{}", self.conflicted));
        }
        if self.staged > 0 {
            parts.push(format!("+{}", self.staged));
        }
        if self.unstaged > 0 {
            parts.push(format!("~{}", self.unstaged));
        }
        if self.untracked > 0 {
            parts.push(format!("?{}", self.untracked));
        }
        if self.ahead > 0 {
            parts.push(format!("↑{}", self.ahead));
        }
        if self.behind > 0 {
            parts.push(format!("↓{}", self.behind));
        }
        if parts.is_empty() {
            "clean".to_string()
        } else {
            parts.join(" ")
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Worktree {
    pub path: PathBuf,
    pub head: Option<String>,
    /// Short branch name, without `refs/heads/`.
    pub branch: Option<String>,
    pub detached: bool,
    pub bare: bool,
    pub locked: bool,
}

pub fn parse_status_porcelain(output: &str) -> GitStatus {
    let mut status = GitStatus::default();
    for line in output.lines() {
        if let Some(header) = line.strip_prefix("## ") {
            parse_branch_header(header, &mut status);
            continue;
        }
        let bytes = line.as_bytes();
        if bytes.len() < 3 {
            continue;
        }
        let (x, y) = (bytes[0], bytes[1]);
        match (x, y) {
            (b'?', b'?') => status.untracked += 1,
            (b'!', b'!') => {}
            _ if is_conflict(x, y) => status.conflicted += 1,
            _ => {
                if x != b' ' {
                    status.staged += 1;
                }
                if y != b' ' {
                    status.unstaged += 1;
                }
            }
        }
    }
    status
}

fn is_conflict(x: u8, y: u8) -> bool {
    matches!(
        (x, y),
        (b'D', b'D') | (b'A', b'A') | (b'U', _) | (_, b'U')
    )
}

fn parse_branch_header(header: &str, status: &mut GitStatus) {
    let (head, tracking) = match header.split_once(" [") {
        Some((head, rest)) => (head, rest.strip_suffix(']')),
        None => (header, None),
    };
    let head = head
        .strip_prefix("No commits yet on ")
        .or_else(|| head.strip_prefix("Initial commit on "))
        .unwrap_or(head);
    let local = head.split("...").next().unwrap_or(head);
    status.branch = if local.starts_with("HEAD (") || local.is_empty() {
        None
    } else {
        Some(local.to_string())
    };
    for part in tracking.into_iter().flat_map(|t| t.split(", ")) {
        if let Some(n) = part.strip_prefix("ahead ") {
            status.ahead = n.trim().parse().unwrap_or(0);
        } else if let Some(n) = part.strip_prefix("behind ") {
            status.behind = n.trim().parse().unwrap_or(0);
        }
    }
}

pub fn parse_worktree_list(output: &str) -> Vec<Worktree> {
    let mut worktrees = Vec::new();
    let mut current: Option<Worktree> = None;
    for line in output.lines() {
        if line.is_empty() {
            worktrees.extend(current.take());
            continue;
        }
        let (key, value) = line.split_once(' ').unwrap_or((line, ""));
        if key == "worktree" {
            worktrees.extend(current.take());
            current = Some(Worktree {
                path: PathBuf::from(value),
                ..Worktree::default()
            });
            continue;
        }
        let Some(worktree) = current.as_mut() else {
            continue;
        };
        match key {
            "HEAD" => worktree.head = Some(value.to_string()),
            "branch" => {
                let name = value.strip_prefix("refs/heads/").unwrap_or(value);
                worktree.branch = Some(name.to_string());
            }
            "detached" => worktree.detached = true,
            "bare" => worktree.bare = true,
            "locked" => worktree.locked = true,
            _ => {}
        }
    }
    worktrees.extend(current);
    worktrees
}

#[derive(Debug, Clone)]
pub struct GitCli {
    program: PathBuf,
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new()
    }
}

impl GitCli {
    pub fn new() -> Self {
        Self::with_program("git")
    }

    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn output<I, S>(&self, cwd: &Path, args: I) -> Result<(String, Output)>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let args: Vec<S> = args.into_iter().collect();
        let command = args
            .iter()
            .map(|arg| arg.as_ref().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(" ");
        tracing::trace!(cwd = %cwd.display(), %command, "running git");
        let output = Command::new(&self.program)
            .arg("-C")
            .arg(cwd)
            .args(&args)
            .output()
            .map_err(|err| match err.kind() {
                std::io::ErrorKind::NotFound => Error::GitMissing,
                _ => Error::Io(err),
            })?;
        Ok((command, output))
    }

    fn run<I, S>(&self, cwd: &Path, args: I) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let (command, output) = self.output(cwd, args)?;
        if !output.status.success() {
            return Err(Error::Git {
                command,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    pub fn repo_root(&self, dir: &Path) -> Result<PathBuf> {
        let out = self.run(dir, ["rev-parse", "--show-toplevel"])?;
        Ok(PathBuf::from(out.trim()))
    }

    pub fn status(&self, dir: &Path) -> Result<GitStatus> {
        let out = self.run(dir, ["status", "--porcelain=v1", "-b"])?;
        Ok(parse_status_porcelain(&out))
    }

    pub fn list_worktrees(&self, repo: &Path) -> Result<Vec<Worktree>> {
        let out = self.run(repo, ["worktree", "list", "--porcelain"])?;
        Ok(parse_worktree_list(&out))
    }

    pub fn branch_exists(&self, repo: &Path, branch: &str) -> Result<bool> {
        let reference = format!("refs/heads/{branch}");
        let (_, output) =
            self.output(repo, ["rev-parse", "--verify", "--quiet", reference.as_str()])?;
        Ok(output.status.success())
    }

    /// Check out `branch` in a new worktree at `path`, creating the branch
    /// from HEAD when it does not exist yet.
    pub fn add_worktree(&self, repo: &Path, path: &Path, branch: &str) -> Result<()> {
        let path = path.as_os_str();
        if self.branch_exists(repo, branch)? {
            self.run(repo, [OsStr::new("worktree"), OsStr::new("add"), path, OsStr::new(branch)])?;
        } else {
            self.run(
                repo,
                [
                    OsStr::new("worktree"),
                    OsStr::new("add"),
                    OsStr::new("-b"),
                    OsStr::new(branch),
                    path,
                ],
            )?;
        }
        tracing::debug!(repo = %repo.display(), branch, "added worktree");
        Ok(())
    }

    pub fn remove_worktree(&self, repo: &Path, path: &Path, force: bool) -> Result<()> {
        let mut args = vec![OsStr::new("worktree"), OsStr::new("remove")];
        if force {
            args.push(OsStr::new("--force"));
        }
        args.push(path.as_os_str());
        self.run(repo, args)?;
        Ok(())
    }

    /// Remove the worktree at `path` unless it has uncommitted or untracked
    /// changes. Returns whether it was removed.
    pub fn remove_worktree_if_clean(&self, repo: &Path, path: &Path) -> Result<bool> {
        let status = self.status(path)?;
        if !status.is_clean() {
            return Ok(false);
        }
        self.remove_worktree(repo, path, false)?;
        tracing::debug!(repo = %repo.display(), path = %path.display(), "removed worktree");
        Ok(true)
    }
}

/// Result of one background status refresh. `status` is `None` when git
/// failed for that directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub dir: PathBuf,
    pub status: Option<GitStatus>,
}

enum PollerControl {
    Watch(PathBuf),
    Unwatch(PathBuf),
    Stop,
}

/// Background thread that refreshes git status for a set of directories.
pub struct GitStatusPoller {
    control: Sender<PollerControl>,
    updates: Receiver<StatusUpdate>,
    handle: Option<JoinHandle<()>>,
}

impl GitStatusPoller {
    pub fn spawn(git: GitCli, interval: Duration) -> Self {
        let (control, control_rx) = mpsc::channel();
        let (updates_tx, updates) = mpsc::channel();
        let handle = thread::Builder::new()
            .name("git-status".to_string())
            .spawn(move || poll_loop(git, interval, control_rx, updates_tx))
            .map_err(|err| tracing::warn!(%err, "failed to start git status poller"))
            .ok();
        Self {
            control,
            updates,
            handle,
        }
    }

    /// Start polling `dir`; a first refresh happens right away.
    pub fn watch(&self, dir: impl Into<PathBuf>) {
        let _ = self.control.send(PollerControl::Watch(dir.into()));
    }

    pub fn unwatch(&self, dir: impl Into<PathBuf>) {
        let _ = self.control.send(PollerControl::Unwatch(dir.into()));
    }

    /// Updates received since the last call, oldest first.
    pub fn drain(&self) -> Vec<StatusUpdate> {
        self.updates.try_iter().collect()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<StatusUpdate> {
        self.updates.recv_timeout(timeout).ok()
    }
}

impl Drop for GitStatusPoller {
    fn drop(&mut self) {
        let _ = self.control.send(PollerControl::Stop);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn poll_loop(
    git: GitCli,
    interval: Duration,
    control: Receiver<PollerControl>,
    updates: Sender<StatusUpdate>,
) {
    let mut dirs: BTreeSet<PathBuf> = BTreeSet::new();
    loop {
        let targets: Vec<PathBuf> = match control.recv_timeout(interval) {
            Ok(PollerControl::Watch(dir)) => {
                dirs.insert(dir.clone());
                vec![dir]
            }
            Ok(PollerControl::Unwatch(dir)) => {
                dirs.remove(&dir);
                continue;
            }
            Ok(PollerControl::Stop) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => dirs.iter().cloned().collect(),
        };
        for dir in targets {
            let status = match git.status(&dir) {
                Ok(status) => Some(status),
                Err(err) => {
                    tracing::warn!(dir = %dir.display(), %err, "git status failed");
                    None
                }
            };
            if updates.send(StatusUpdate { dir, status }).is_err() {
                return;
            }
        }
    }
    tracing::debug!("git status poller stopped");
}
