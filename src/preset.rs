//! Named command templates and the shell command new sessions start with.

use std::path::Path;
use std::str::FromStr;

use portable_pty::CommandBuilder;

use crate::error::{Error, Result};

/// A named command line such as `review=git -C {worktree} diff`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preset {
    pub name: String,
    pub template: String,
}

/// Values substituted into preset placeholders.
#[derive(Debug, Clone, Copy)]
pub struct PresetContext<'a> {
    pub cwd: &'a Path,
    pub branch: Option<&'a str>,
    pub worktree: Option<&'a Path>,
}

impl FromStr for Preset {
    type Err = Error;

    fn from_str(spec: &str) -> Result<Self> {
        let Some((name, template)) = spec.split_once('=') else {
            return Err(Error::Preset {
                name: spec.to_string(),
                reason: "expected NAME=TEMPLATE".to_string(),
            });
        };
        let name = name.trim();
        if name.is_empty() || template.trim().is_empty() {
            return Err(Error::Preset {
                name: name.to_string(),
                reason: "name and template must not be empty".to_string(),
            });
        }
        Ok(Self {
            name: name.to_string(),
            template: template.trim().to_string(),
        })
    }
}

impl Preset {
    fn error(&self, reason: impl Into<String>) -> Error {
        Error::Preset {
            name: self.name.clone(),
            reason: reason.into(),
        }
    }

    /// Substitute placeholders. Values are shell-quoted so paths with spaces
    /// survive the later split.
    pub fn expand(&self, ctx: &PresetContext<'_>) -> Result<String> {
        let mut out = String::with_capacity(self.template.len());
        let mut rest = self.template.as_str();
        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let Some(close) = after.find('}') else {
                return Err(self.error("unclosed `{`"));
            };
            let key = &after[..close];
            let value = match key {
                "cwd" => ctx.cwd.to_string_lossy().into_owned(),
                "branch" => ctx
                    .branch
                    .ok_or_else(|| self.error("{branch} has no value here"))?
                    .to_string(),
                "worktree" => ctx
                    .worktree
                    .ok_or_else(|| self.error("{worktree} has no value here"))?
                    .to_string_lossy()
                    .into_owned(),
                other => return Err(self.error(format!("unknown placeholder {{{other}}}"))),
            };
            out.push_str(&shell_words::quote(&value));
            rest = &after[close + 1..];
        }
        out.push_str(rest);
        Ok(out)
    }

    pub fn argv(&self, ctx: &PresetContext<'_>) -> Result<Vec<String>> {
        let expanded = self.expand(ctx)?;
        let argv = shell_words::split(&expanded).map_err(|err| self.error(err.to_string()))?;
        if argv.is_empty() {
            return Err(self.error("expands to an empty command"));
        }
        Ok(argv)
    }

    pub fn command(&self, ctx: &PresetContext<'_>) -> Result<CommandBuilder> {
        let argv = self.argv(ctx)?;
        let mut cmd = CommandBuilder::from_argv(argv.into_iter().map(Into::into).collect());
        cmd.cwd(ctx.worktree.unwrap_or(ctx.cwd));
        Ok(cmd)
    }
}

#[cfg(unix)]
pub fn default_shell() -> String {
    std::env::var("SHELL").unwrap_or_else(|_| "bash".to_string())
}

#[cfg(windows)]
pub fn default_shell() -> String {
    std::env::var("COMSPEC").unwrap_or_else(|_| "cmd.exe".to_string())
}

/// Interactive shell started in `cwd`. `shell` may carry arguments.
pub fn shell_command(shell: &str, cwd: &Path) -> Result<CommandBuilder> {
    let argv = shell_words::split(shell).map_err(|err| Error::Preset {
        name: "shell".to_string(),
        reason: err.to_string(),
    })?;
    let mut cmd = if argv.is_empty() {
        CommandBuilder::new(default_shell())
    } else {
        CommandBuilder::from_argv(argv.into_iter().map(Into::into).collect())
    };
    cmd.cwd(cwd);
    Ok(cmd)
}
