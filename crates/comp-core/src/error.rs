//! Error types for comp-core

use std::path::PathBuf;

/// Result type for comp-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in comp-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An expected file is missing
    #[error("File not found: {path}")]
    NotFound { path: PathBuf },

    /// Malformed JSON in a manifest, lock or state file
    #[error("Failed to parse {path} at line {line}, column {column}: {message}")]
    ParseError {
        path: PathBuf,
        line: usize,
        column: usize,
        message: String,
    },

    /// Filesystem write failure
    #[error("Failed to write {path}: {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: comp_fs::Error,
    },

    /// HTTP, network or remote-service failure
    #[error("Remote error{}: {message} ({code})", status_suffix(.status))]
    RemoteError {
        status: Option<u16>,
        code: String,
        message: String,
    },

    /// The dependency resolver exited nonzero or could not be started
    #[error("Composer {command} failed (exit code {code}): {message}")]
    ResolverFailure {
        command: String,
        code: i32,
        message: String,
    },

    /// The lock file cannot be trusted to describe installed packages
    #[error("Lock file {path} is stale: {reason}")]
    StaleLock { path: PathBuf, reason: String },

    /// The git critical-section lock was not acquired in time
    #[error("Timed out waiting for git lock {path}")]
    LockTimeout { path: PathBuf },

    /// Accept-mine merging could not reach a clean state
    #[error("Unresolved merge conflict replaying {commit}: {paths:?}")]
    MergeConflictUnresolved { commit: String, paths: Vec<String> },

    /// The manifest fingerprint does not match its body
    #[error("Manifest fingerprint mismatch in {path}: a forced reinitialization is required")]
    FingerprintMismatch { path: PathBuf },

    /// One or more plugins could not be activated
    #[error("Activation failed for {}", .plugins.join(", "))]
    ActivationFailed { plugins: Vec<String> },

    /// Remote endpoint or credentials are missing
    #[error("Remote endpoint is not configured")]
    RemoteNotConfigured,

    /// A host tool (wp, composer) could not be run
    #[error("Failed to run {program}: {message}")]
    Host { program: String, message: String },

    /// Invalid settings value
    #[error("Invalid setting {key}: {message}")]
    InvalidSetting { key: String, message: String },

    // Transparent wrappers for underlying crate errors
    /// Filesystem error from comp-fs
    #[error(transparent)]
    Fs(#[from] comp_fs::Error),

    /// Block error from comp-blocks
    #[error(transparent)]
    Blocks(#[from] comp_blocks::Error),

    /// Git error from comp-git
    #[error(transparent)]
    Git(comp_git::Error),

    /// JSON serialization/deserialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

impl From<comp_git::Error> for Error {
    fn from(err: comp_git::Error) -> Self {
        match err {
            comp_git::Error::MergeConflictUnresolved { commit, paths } => {
                Self::MergeConflictUnresolved { commit, paths }
            }
            other => Self::Git(other),
        }
    }
}

impl Error {
    /// Build a [`Error::ParseError`] from a serde_json error.
    pub fn parse(path: impl Into<PathBuf>, err: &serde_json::Error) -> Self {
        Self::ParseError {
            path: path.into(),
            line: err.line(),
            column: err.column(),
            message: err.to_string(),
        }
    }

    pub fn remote(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RemoteError {
            status: None,
            code: code.into(),
            message: message.into(),
        }
    }

    /// Map a comp-fs read error to [`Error::NotFound`] when the file is absent.
    pub fn from_read(path: impl Into<PathBuf>, err: comp_fs::Error) -> Self {
        if err.is_not_found() {
            Self::NotFound { path: path.into() }
        } else {
            Self::Fs(err)
        }
    }
}
