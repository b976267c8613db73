//! Local Package Cache
//!
//! Projects the lock file into managed plugin and theme records and persists
//! them in the option store. A refresh replaces both snapshots wholesale; the
//! diff against the previous snapshot is only logged and published.
//!
//! Refresh is idempotent: when the lock's content-hash equals the one stored
//! by the last refresh, nothing is scanned.

mod diff;
pub mod headers;
mod record;

pub use diff::{CacheDiff, RefreshReport, VersionChange};
pub use record::{PackageMap, PackageRecord, plugin_dir};

use std::fmt;

use regex::Regex;

use crate::context::AppContext;
use crate::events::Event;
use crate::manifest::{LockState, LockedPackage};
use crate::options::{LOCK_HASH_OPTION, PLUGINS_OPTION, THEMES_OPTION};
use crate::{Error, Result};
use headers::{find_plugin_main_file, theme_header};

/// What a refresh did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The lock content-hash was already cached; nothing was scanned.
    Unchanged,
    Refreshed(RefreshReport),
}

impl fmt::Display for RefreshOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unchanged => write!(f, "cache already current"),
            Self::Refreshed(report) => write!(f, "cache refreshed ({report})"),
        }
    }
}

/// Managed plugin and theme records for one site.
pub struct PackageCache<'a> {
    ctx: &'a AppContext,
    core_pattern: Regex,
}

impl<'a> PackageCache<'a> {
    /// # Errors
    ///
    /// Returns [`Error::InvalidSetting`] if the core package pattern is not a
    /// valid regular expression.
    pub fn new(ctx: &'a AppContext) -> Result<Self> {
        let pattern = &ctx.settings().wordpress.core_package_pattern;
        let core_pattern = Regex::new(pattern).map_err(|e| Error::InvalidSetting {
            key: "wordpress.core_package_pattern".to_string(),
            message: e.to_string(),
        })?;
        Ok(Self { ctx, core_pattern })
    }

    /// Cached plugin records, empty before the first refresh.
    pub fn plugins(&self) -> Result<PackageMap> {
        self.ctx.options().get_or_default(PLUGINS_OPTION)
    }

    /// Cached theme records, empty before the first refresh.
    pub fn themes(&self) -> Result<PackageMap> {
        self.ctx.options().get_or_default(THEMES_OPTION)
    }

    /// Content-hash of the lock the cache was last built from.
    pub fn lock_hash(&self) -> Result<Option<String>> {
        self.ctx.options().get(LOCK_HASH_OPTION)
    }

    fn stale(&self, reason: impl Into<String>) -> Error {
        Error::StaleLock {
            path: self.ctx.layout().lock_file().to_native(),
            reason: reason.into(),
        }
    }

    /// Rebuild the cache from the lock file.
    ///
    /// With `force`, the content-hash short circuit is bypassed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StaleLock`] when the lock file is missing, unreadable,
    /// has no content-hash or lists no packages. The cache is left untouched.
    pub fn refresh(&self, force: bool) -> Result<RefreshOutcome> {
        let lock = match LockState::read(&self.ctx.layout().lock_file()) {
            Ok(lock) => lock,
            Err(Error::NotFound { .. }) => return Err(self.stale("lock file is missing")),
            Err(e) => return Err(self.stale(format!("lock file is unreadable: {e}"))),
        };
        let hash = match lock.content_hash.as_deref().map(str::trim) {
            Some(hash) if !hash.is_empty() => hash.to_string(),
            _ => return Err(self.stale("lock file has no content-hash")),
        };
        if lock.packages.is_empty() {
            return Err(self.stale("lock file lists no packages"));
        }

        if !force && self.lock_hash()?.as_deref() == Some(hash.as_str()) {
            tracing::debug!(content_hash = %hash, "Package cache already current");
            return Ok(RefreshOutcome::Unchanged);
        }

        let plugins = self.scan_plugins(&lock.packages);
        let themes = self.scan_themes(&lock.packages);

        let report = RefreshReport {
            plugins: CacheDiff::between(&self.plugins()?, &plugins),
            themes: CacheDiff::between(&self.themes()?, &themes),
        };
        report.plugins.log("plugin");
        report.themes.log("theme");

        let options = self.ctx.options();
        options.set(PLUGINS_OPTION, &plugins)?;
        options.set(THEMES_OPTION, &themes)?;
        options.set(LOCK_HASH_OPTION, &hash)?;

        tracing::info!(
            plugins = plugins.len(),
            themes = themes.len(),
            content_hash = %hash,
            "Package cache refreshed"
        );
        self.ctx.publish(Event::CacheRefreshed(report.clone()));
        Ok(RefreshOutcome::Refreshed(report))
    }

    /// Drop both snapshots and the stored content-hash.
    pub fn clear(&self) -> Result<()> {
        let options = self.ctx.options();
        let mut cleared = false;
        for key in [PLUGINS_OPTION, THEMES_OPTION, LOCK_HASH_OPTION] {
            cleared |= options.delete(key)?;
        }
        if cleared {
            tracing::info!("Package cache cleared");
        }
        Ok(())
    }

    fn base_record(&self, package: &LockedPackage, name: String) -> PackageRecord {
        PackageRecord {
            name,
            package: package.name.clone(),
            version: package.version.clone(),
            description: package.description.clone(),
            homepage: package.homepage.clone(),
            authors: package.authors.iter().map(|a| a.name.clone()).collect(),
            core_required: self.core_pattern.is_match(&package.name),
            template: None,
        }
    }

    fn scan_plugins(&self, packages: &[LockedPackage]) -> PackageMap {
        let plugins_dir = self.ctx.layout().plugins_dir();
        let mut plugins = PackageMap::new();
        for package in packages.iter().filter(|p| p.is_plugin()) {
            let dir_name = package.short_name();
            match find_plugin_main_file(&plugins_dir.join(dir_name)) {
                Some((file, header)) => {
                    let key = format!("{dir_name}/{file}");
                    plugins.insert(key, self.base_record(package, header.name));
                }
                None => tracing::warn!(
                    package = %package.name,
                    dir = %plugins_dir.join(dir_name),
                    "No plugin main file found, skipping"
                ),
            }
        }
        plugins
    }

    fn scan_themes(&self, packages: &[LockedPackage]) -> PackageMap {
        let themes_dir = self.ctx.layout().themes_dir();
        let mut themes = PackageMap::new();
        for package in packages.iter().filter(|p| p.is_theme()) {
            let stylesheet = package.short_name();
            match theme_header(&themes_dir.join(stylesheet).join("style.css")) {
                Some(header) => {
                    let mut record = self.base_record(package, header.name);
                    record.template = header.template;
                    themes.insert(stylesheet.to_string(), record);
                }
                None => tracing::warn!(
                    package = %package.name,
                    theme = %stylesheet,
                    "Theme not found, skipping"
                ),
            }
        }
        themes
    }
}
