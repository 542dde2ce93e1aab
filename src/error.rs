//! Error type shared by the collaborators around the layout core.
//!
//! The layout core itself never fails: it sanitizes its inputs instead. The
//! PTY, git and preset plumbing can fail, and report through [`Error`].

use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("pty {stage} failed: {message}")]
    Pty {
        stage: &'static str,
        message: String,
    },

    #[error("git executable not found")]
    GitMissing,

    #[error("no git repository to work in")]
    NoRepository,

    #[error("`git {command}` failed: {stderr}")]
    Git { command: String, stderr: String },

    #[error("invalid preset `{name}`: {reason}")]
    Preset { name: String, reason: String },

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    pub(crate) fn pty<E: std::fmt::Display>(stage: &'static str, err: E) -> Self {
        Self::Pty {
            stage,
            message: err.to_string(),
        }
    }
}
