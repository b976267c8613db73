//! Agent settings
//!
//! Settings are read from `.composition/config.toml` in the site root through
//! [`ConfigStore`], so the same structure may also be written as JSON or YAML.
//! A missing file yields defaults. Credentials and the endpoint may be
//! overridden from the environment.

use std::time::Duration;

use comp_fs::{ConfigStore, NormalizedPath, SiteLayout};
use serde::{Deserialize, Serialize};

use crate::Result;

/// Seconds kept free below the host's execution limit when waiting for the git lock.
const LOCK_SAFETY_MARGIN_SECS: u64 = 5;
const DEFAULT_LOCK_TIMEOUT_SECS: u64 = 10;

/// Top-level settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub remote: RemoteSettings,
    pub paths: PathSettings,
    pub installer: InstallerSettings,
    pub wordpress: WordPressSettings,
    pub git: GitSettings,
    /// Relaxes TLS verification for the remote endpoint.
    pub debug: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteSettings {
    pub endpoint: Option<String>,
    pub key: Option<String>,
    pub secret: Option<String>,
    pub timeout_secs: u64,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            key: None,
            secret: None,
            timeout_secs: 5,
        }
    }
}

impl RemoteSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathSettings {
    pub wp_content: String,
    pub manifest: String,
    pub backup: String,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            wp_content: "wp-content".to_string(),
            manifest: "composer.json".to_string(),
            backup: ".composition/composer.json.bak".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallerSettings {
    pub composer_binary: String,
    /// CA bundle handed to Composer unless the environment already names one.
    pub ca_bundle: Option<String>,
    pub timezone: String,
    pub github_token: Option<String>,
}

impl Default for InstallerSettings {
    fn default() -> Self {
        Self {
            composer_binary: "composer".to_string(),
            ca_bundle: None,
            timezone: "UTC".to_string(),
            github_token: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WordPressSettings {
    pub wp_binary: String,
    /// Package names matching this pattern are flagged as core-required.
    pub core_package_pattern: String,
}

impl Default for WordPressSettings {
    fn default() -> Self {
        Self {
            wp_binary: "wp".to_string(),
            core_package_pattern: "^composition/".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GitSettings {
    pub enabled: bool,
    pub remote: String,
    pub lock_timeout_secs: Option<u64>,
    /// Execution limit of the surrounding host, used to derive the lock timeout.
    pub max_execution_secs: Option<u64>,
    pub network_timeout_secs: u64,
}

impl Default for GitSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            remote: "origin".to_string(),
            lock_timeout_secs: None,
            max_execution_secs: None,
            network_timeout_secs: 30,
        }
    }
}

impl GitSettings {
    /// How long to wait for the git critical-section lock.
    pub fn lock_timeout(&self) -> Duration {
        if let Some(secs) = self.lock_timeout_secs {
            return Duration::from_secs(secs);
        }
        match self.max_execution_secs {
            Some(max) if max > LOCK_SAFETY_MARGIN_SECS => {
                Duration::from_secs(max - LOCK_SAFETY_MARGIN_SECS)
            }
            _ => Duration::from_secs(DEFAULT_LOCK_TIMEOUT_SECS),
        }
    }

    pub fn network_timeout(&self) -> Duration {
        Duration::from_secs(self.network_timeout_secs)
    }
}

impl Settings {
    /// Load settings for a site, applying process environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings file exists but cannot be parsed.
    pub fn load(config_file: &NormalizedPath) -> Result<Self> {
        let mut settings: Settings = ConfigStore::new().load_or_default(config_file)?;
        settings.apply_env(|key| std::env::var(key).ok());
        Ok(settings)
    }

    /// Apply `COMPOSITION_*` overrides from `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("COMPOSITION_KEY") {
            self.remote.key = Some(key);
        }
        if let Some(secret) = non_empty("COMPOSITION_SECRET") {
            self.remote.secret = Some(secret);
        }
        if let Some(endpoint) = non_empty("COMPOSITION_ENDPOINT") {
            self.remote.endpoint = Some(endpoint);
        }
        if let Some(debug) = non_empty("COMPOSITION_DEBUG") {
            self.debug = matches!(debug.trim(), "1" | "true" | "yes" | "on");
        }
    }

    /// Site layout with the configured path overrides applied.
    pub fn layout(&self, root: &NormalizedPath) -> SiteLayout {
        SiteLayout::new(root.to_native())
            .with_wp_content(&self.paths.wp_content)
            .with_manifest(&self.paths.manifest)
            .with_backup(&self.paths.backup)
    }
}
