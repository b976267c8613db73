//! Error types for comp-cli

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Errors that can occur in CLI operations
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Error from comp-core
    #[error(transparent)]
    Core(#[from] comp_core::Error),

    /// Error from comp-fs
    #[error(transparent)]
    Fs(#[from] comp_fs::Error),

    /// Error from comp-git
    #[error(transparent)]
    Git(#[from] comp_git::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// User-facing error with a message
    #[error("{message}")]
    User { message: String },
}

impl CliError {
    /// Create a new user error with the given message
    pub fn user(message: impl Into<String>) -> Self {
        Self::User {
            message: message.into(),
        }
    }
}
