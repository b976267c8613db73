//! [`SiteHost`] backed by WP-CLI
//!
//! Every call is a separate `wp` process, which is what isolates one
//! plugin's fatal error from the next activation.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::process::Command;

use serde::Deserialize;

use super::host::{InvalidPlugin, SiteHost};
use crate::{Error, Result};

/// PHP evaluated by `wp eval` to expose `validate_active_plugins()`.
const VALIDATE_SNIPPET: &str = "echo wp_json_encode(array_map(function ($e) { return $e->get_error_message(); }, validate_active_plugins()));";

#[derive(Debug, Deserialize)]
struct PluginRow {
    file: String,
}

/// Drives the `wp` binary against a site root.
#[derive(Debug, Clone)]
pub struct WpCli {
    binary: String,
    root: PathBuf,
}

impl WpCli {
    pub fn new(binary: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            root: root.into(),
        }
    }

    fn run(&self, args: &[&str]) -> Result<String> {
        tracing::debug!(binary = %self.binary, ?args, "Running wp");
        let output = Command::new(&self.binary)
            .args(args)
            .arg(format!("--path={}", self.root.display()))
            .current_dir(&self.root)
            .output()
            .map_err(|e| Error::Host {
                program: self.binary.clone(),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Host {
                program: format!("{} {}", self.binary, args.join(" ")),
                message: stderr
                    .lines()
                    .rev()
                    .find(|l| !l.trim().is_empty())
                    .unwrap_or("exited with an error")
                    .trim()
                    .to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

/// WP-CLI names plugins by directory, or by file stem for single-file plugins.
fn plugin_slug(plugin: &str) -> &str {
    match plugin.split_once('/') {
        Some((dir, _)) => dir,
        None => plugin.trim_end_matches(".php"),
    }
}

impl SiteHost for WpCli {
    fn active_plugins(&self) -> Result<BTreeSet<String>> {
        let out = self.run(&["plugin", "list", "--status=active", "--fields=file", "--format=json"])?;
        let rows: Vec<PluginRow> = serde_json::from_str(&out)?;
        Ok(rows.into_iter().map(|r| r.file).collect())
    }

    fn activate_plugin(&self, plugin: &str) -> Result<()> {
        self.run(&["plugin", "activate", plugin_slug(plugin)])?;
        Ok(())
    }

    fn deactivate_plugin(&self, plugin: &str) -> Result<()> {
        self.run(&["plugin", "deactivate", plugin_slug(plugin)])?;
        Ok(())
    }

    fn validate_active_plugins(&self) -> Result<Vec<InvalidPlugin>> {
        let out = self.run(&["eval", VALIDATE_SNIPPET])?;
        // PHP encodes an empty array as `[]`
        let invalid: std::collections::BTreeMap<String, String> = match out.as_str() {
            "" | "[]" => Default::default(),
            _ => serde_json::from_str(&out)?,
        };
        Ok(invalid
            .into_iter()
            .map(|(plugin, reason)| InvalidPlugin { plugin, reason })
            .collect())
    }

    fn active_theme(&self) -> Result<Option<String>> {
        let out = self.run(&["theme", "list", "--status=active", "--field=name"])?;
        Ok(out.lines().next().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string))
    }

    fn activate_theme(&self, stylesheet: &str) -> Result<()> {
        self.run(&["theme", "activate", stylesheet])?;
        Ok(())
    }
}
