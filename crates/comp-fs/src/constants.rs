//! Well-known site paths.

use std::path::Path;

/// Fixed path names inside a managed site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SitePath {
    /// The `.composition` state directory
    StateDir,
    /// Settings file inside the state directory
    ConfigFile,
    /// Key-value option store inside the state directory
    OptionsFile,
    /// Persistent job queue inside the state directory
    QueueFile,
    /// Lock file guarding the Git merge/push critical section
    GitLockFile,
    /// Default manifest file name
    Manifest,
    /// Default lock file name
    LockFile,
    /// Default manifest backup inside the state directory
    ManifestBackup,
    /// Default `wp-content` directory
    WpContent,
    /// Plugins directory below `wp-content`
    Plugins,
    /// Themes directory below `wp-content`
    Themes,
    /// Must-use plugins directory below `wp-content`
    MuPlugins,
    /// The `.git` directory
    GitDir,
    /// The ignore file at the repository root
    GitIgnore,
}

impl SitePath {
    /// Get the string representation of the path.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StateDir => ".composition",
            Self::ConfigFile => "config.toml",
            Self::OptionsFile => "options.json",
            Self::QueueFile => "queue.json",
            Self::GitLockFile => "git.lock",
            Self::Manifest => "composer.json",
            Self::LockFile => "composer.lock",
            Self::ManifestBackup => "composer.json.bak",
            Self::WpContent => "wp-content",
            Self::Plugins => "plugins",
            Self::Themes => "themes",
            Self::MuPlugins => "mu-plugins",
            Self::GitDir => ".git",
            Self::GitIgnore => ".gitignore",
        }
    }
}

impl AsRef<Path> for SitePath {
    fn as_ref(&self) -> &Path {
        Path::new(self.as_str())
    }
}

impl AsRef<str> for SitePath {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl std::fmt::Display for SitePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
