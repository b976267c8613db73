//! Activation Controller
//!
//! Activates cached plugins one at a time and selects the active theme.

mod host;
mod wp_cli;

pub use host::{InvalidPlugin, SiteHost};
pub use wp_cli::WpCli;

use crate::cache::PackageMap;
use crate::context::AppContext;
use crate::events::Event;
use crate::Result;

/// Per-plugin results of one activation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivationReport {
    pub activated: Vec<String>,
    pub already_active: Vec<String>,
    /// Plugin and failure message; these were deactivated again.
    pub failed: Vec<(String, String)>,
    /// Active plugins WordPress flagged afterwards. Informational only.
    pub invalid: Vec<InvalidPlugin>,
}

impl ActivationReport {
    /// True when every attempted activation succeeded.
    pub fn success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Result of theme selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThemeSelection {
    /// No theme in the cache; nothing to do.
    NoTheme,
    AlreadyActive(String),
    Activated(String),
}

/// Pick the theme to activate: a child whose parent is also cached, else the
/// only theme. With several unrelated themes the first stylesheet wins.
pub fn select_theme(themes: &PackageMap) -> Option<&str> {
    let child = themes.iter().find(|(_, record)| {
        record
            .template
            .as_deref()
            .is_some_and(|parent| themes.contains_key(parent))
    });
    if let Some((stylesheet, _)) = child {
        return Some(stylesheet.as_str());
    }

    let mut stylesheets = themes.keys();
    let first = stylesheets.next()?;
    if stylesheets.next().is_some() {
        tracing::warn!(
            themes = themes.len(),
            selected = %first,
            "Several unrelated managed themes, activating the first"
        );
    }
    Some(first.as_str())
}

/// Applies cached records to a [`SiteHost`].
pub struct ActivationController<'a> {
    ctx: &'a AppContext,
    host: &'a dyn SiteHost,
}

impl<'a> ActivationController<'a> {
    pub fn new(ctx: &'a AppContext, host: &'a dyn SiteHost) -> Self {
        Self { ctx, host }
    }

    /// Activate every cached plugin that is not already active.
    ///
    /// A failed activation is followed by a deactivation of that plugin and
    /// the pass continues with the next one.
    ///
    /// # Errors
    ///
    /// Returns an error only if the active plugin list cannot be read.
    pub fn activate_plugins(&self, plugins: &PackageMap) -> Result<ActivationReport> {
        let active = self.host.active_plugins()?;
        let mut report = ActivationReport::default();

        for (plugin, record) in plugins {
            if active.contains(plugin) {
                tracing::info!(plugin = %plugin, "Plugin already active");
                report.already_active.push(plugin.clone());
                continue;
            }

            match self.host.activate_plugin(plugin) {
                Ok(()) => {
                    tracing::info!(plugin = %plugin, name = %record.name, version = %record.version, "Plugin activated");
                    report.activated.push(plugin.clone());
                    self.ctx.publish(Event::PluginActivated {
                        plugin: plugin.clone(),
                    });
                }
                Err(e) => {
                    tracing::warn!(plugin = %plugin, error = %e, "Plugin activation failed, deactivating");
                    match self.host.deactivate_plugin(plugin) {
                        Ok(()) => self.ctx.publish(Event::PluginDeactivated {
                            plugin: plugin.clone(),
                        }),
                        Err(e) => tracing::debug!(plugin = %plugin, error = %e, "Deactivation after failure failed"),
                    }
                    report.failed.push((plugin.clone(), e.to_string()));
                }
            }
        }

        match self.host.validate_active_plugins() {
            Ok(invalid) => {
                for entry in &invalid {
                    tracing::warn!(plugin = %entry.plugin, reason = %entry.reason, "Active plugin is invalid");
                }
                report.invalid = invalid;
            }
            Err(e) => tracing::warn!(error = %e, "Could not validate active plugins"),
        }

        Ok(report)
    }

    /// Activate the theme chosen by [`select_theme`].
    pub fn activate_theme(&self, themes: &PackageMap) -> Result<ThemeSelection> {
        let Some(stylesheet) = select_theme(themes) else {
            tracing::debug!("No managed theme cached");
            return Ok(ThemeSelection::NoTheme);
        };

        if self.host.active_theme()?.as_deref() == Some(stylesheet) {
            tracing::info!(theme = %stylesheet, "Theme already active");
            return Ok(ThemeSelection::AlreadyActive(stylesheet.to_string()));
        }

        self.host.activate_theme(stylesheet)?;
        tracing::info!(theme = %stylesheet, "Theme activated");
        Ok(ThemeSelection::Activated(stylesheet.to_string()))
    }
}
