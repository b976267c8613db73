//! The WordPress host the activation controller talks to

use std::collections::BTreeSet;

use crate::Result;

/// An active plugin WordPress itself considers invalid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidPlugin {
    pub plugin: String,
    pub reason: String,
}

/// Plugin and theme state of a WordPress installation.
///
/// Plugins are identified by their file path relative to the plugins
/// directory (`akismet/akismet.php`), themes by stylesheet directory.
pub trait SiteHost {
    fn active_plugins(&self) -> Result<BTreeSet<String>>;

    /// Activate one plugin in isolation, so a fatal error in it cannot take
    /// down the caller or other activations.
    fn activate_plugin(&self, plugin: &str) -> Result<()>;

    fn deactivate_plugin(&self, plugin: &str) -> Result<()>;

    /// Run WordPress's own integrity check over the active plugins.
    fn validate_active_plugins(&self) -> Result<Vec<InvalidPlugin>>;

    fn active_theme(&self) -> Result<Option<String>>;

    fn activate_theme(&self, stylesheet: &str) -> Result<()>;
}
