//! Error types for comp-git

use std::path::PathBuf;
use std::time::Duration;

/// Result type for comp-git operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in comp-git operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("Filesystem error: {0}")]
    Fs(#[from] comp_fs::Error),

    #[error("Failed to run git: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not a git repository: {path}")]
    NotARepository { path: PathBuf },

    #[error("`git {args}` failed (exit code {code}): {stderr}")]
    CommandFailed {
        args: String,
        code: i32,
        stderr: String,
    },

    #[error("`git {args}` timed out after {timeout:?}")]
    Timeout { args: String, timeout: Duration },

    #[error("HEAD is detached; no branch to synchronize")]
    DetachedHead,

    #[error("Branch '{branch}' has no upstream tracking branch")]
    NoUpstream { branch: String },

    #[error("Could not resolve conflicts replaying {commit}: {paths:?}")]
    MergeConflictUnresolved { commit: String, paths: Vec<String> },
}
