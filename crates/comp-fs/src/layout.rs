//! Site layout resolution
//!
//! A site root holds the manifest and lock file, the `wp-content` tree and
//! the `.composition` state directory. Every path the agent touches is
//! derived from a [`SiteLayout`].

use std::path::Path;

use crate::{Error, NormalizedPath, Result, SitePath};

/// Resolved absolute paths for one managed site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteLayout {
    root: NormalizedPath,
    wp_content: NormalizedPath,
    manifest: NormalizedPath,
    backup: NormalizedPath,
}

impl SiteLayout {
    /// Layout with every path at its default location below `root`.
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = NormalizedPath::new(root);
        Self {
            wp_content: root.join(SitePath::WpContent.as_str()),
            manifest: root.join(SitePath::Manifest.as_str()),
            backup: root
                .join(SitePath::StateDir.as_str())
                .join(SitePath::ManifestBackup.as_str()),
            root,
        }
    }

    /// Resolve an existing site root, canonicalizing it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SiteRootNotFound`] if `root` is not a directory.
    pub fn discover(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let canonical = dunce::canonicalize(root).map_err(|_| Error::SiteRootNotFound {
            path: root.to_path_buf(),
        })?;
        if !canonical.is_dir() {
            return Err(Error::SiteRootNotFound {
                path: root.to_path_buf(),
            });
        }
        Ok(Self::new(canonical))
    }

    /// Override the `wp-content` directory (relative to the root).
    pub fn with_wp_content(mut self, relative: &str) -> Self {
        self.wp_content = self.root.join(relative);
        self
    }

    /// Override the manifest location (relative to the root).
    pub fn with_manifest(mut self, relative: &str) -> Self {
        self.manifest = self.root.join(relative);
        self
    }

    /// Override the backup location (relative to the root).
    pub fn with_backup(mut self, relative: &str) -> Self {
        self.backup = self.root.join(relative);
        self
    }

    pub fn root(&self) -> &NormalizedPath {
        &self.root
    }

    pub fn wp_content(&self) -> &NormalizedPath {
        &self.wp_content
    }

    pub fn plugins_dir(&self) -> NormalizedPath {
        self.wp_content.join(SitePath::Plugins.as_str())
    }

    pub fn themes_dir(&self) -> NormalizedPath {
        self.wp_content.join(SitePath::Themes.as_str())
    }

    pub fn mu_plugins_dir(&self) -> NormalizedPath {
        self.wp_content.join(SitePath::MuPlugins.as_str())
    }

    pub fn manifest(&self) -> &NormalizedPath {
        &self.manifest
    }

    /// The lock file sits next to the manifest, named after it.
    pub fn lock_file(&self) -> NormalizedPath {
        let name = self.manifest.file_name().unwrap_or(SitePath::Manifest.as_str());
        let lock_name = match name.strip_suffix(".json") {
            Some(stem) => format!("{stem}.lock"),
            None => SitePath::LockFile.as_str().to_string(),
        };
        match self.manifest.parent() {
            Some(parent) => parent.join(&lock_name),
            None => NormalizedPath::new(lock_name),
        }
    }

    pub fn backup(&self) -> &NormalizedPath {
        &self.backup
    }

    pub fn state_dir(&self) -> NormalizedPath {
        self.root.join(SitePath::StateDir.as_str())
    }

    pub fn config_file(&self) -> NormalizedPath {
        self.state_dir().join(SitePath::ConfigFile.as_str())
    }

    pub fn options_file(&self) -> NormalizedPath {
        self.state_dir().join(SitePath::OptionsFile.as_str())
    }

    pub fn queue_file(&self) -> NormalizedPath {
        self.state_dir().join(SitePath::QueueFile.as_str())
    }

    pub fn git_lock_file(&self) -> NormalizedPath {
        self.state_dir().join(SitePath::GitLockFile.as_str())
    }

    pub fn gitignore(&self) -> NormalizedPath {
        self.root.join(SitePath::GitIgnore.as_str())
    }

    /// Express an absolute path relative to the site root.
    pub fn relative(&self, path: &NormalizedPath) -> Option<NormalizedPath> {
        path.strip_prefix(&self.root)
    }
}
