//! Managed package records

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Cached projection of one locked plugin or theme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRecord {
    /// Display name from the plugin or theme header.
    pub name: String,
    /// Upstream package name, e.g. `wpackagist-plugin/akismet`.
    pub package: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    /// Foundational package matched by the core package pattern.
    #[serde(default)]
    pub core_required: bool,
    /// Parent theme stylesheet, for child themes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
}

/// Records keyed by plugin file path (`akismet/akismet.php`) or theme
/// stylesheet (`astra`).
pub type PackageMap = BTreeMap<String, PackageRecord>;

impl PackageRecord {
    /// Minimal record, mostly useful in tests.
    pub fn new(name: impl Into<String>, package: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            package: package.into(),
            version: version.into(),
            description: None,
            homepage: None,
            authors: Vec::new(),
            core_required: false,
            template: None,
        }
    }
}

/// Top-level directory of a plugin key (`akismet` for `akismet/akismet.php`).
pub fn plugin_dir(key: &str) -> &str {
    key.split('/').next().unwrap_or(key)
}
