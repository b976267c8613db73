//! Package Installer
//!
//! Drives Composer against the manifest. A run is guarded by a
//! [`RevertGuard`] when a backup is supplied, so a failed run leaves the
//! manifest as it was before the remote rewrote it.

mod guard;
mod operation;
mod options;
mod runner;

pub use guard::RevertGuard;
pub use operation::{Operation, parse_operations};
pub use options::{InstallMethod, InstallOptions, Verbosity};
pub use runner::{ComposerCli, ComposerRunner, Invocation, RunOutput};

use serde_json::{Map, Value, json};

use crate::config::InstallerSettings;
use crate::context::AppContext;
use crate::{Error, Result};
use comp_fs::NormalizedPath;

/// Environment variables that already point TLS at a certificate store.
const CERT_ENV: &[&str] = &["SSL_CERT_FILE", "SSL_CERT_DIR"];
/// Environment variables searched for a GitHub token.
const GITHUB_TOKEN_ENV: &[&str] = &["GITHUB_TOKEN", "GH_TOKEN"];

/// Result of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    pub command: &'static str,
    pub dry_run: bool,
    pub operations: Vec<Operation>,
}

/// Applies the manifest to disk through a [`ComposerRunner`].
pub struct Installer<'a> {
    runner: &'a dyn ComposerRunner,
    manifest: NormalizedPath,
    settings: InstallerSettings,
    env: Box<dyn Fn(&str) -> Option<String> + 'a>,
}

impl<'a> Installer<'a> {
    pub fn new(ctx: &AppContext, runner: &'a dyn ComposerRunner) -> Self {
        Self {
            runner,
            manifest: ctx.layout().manifest().clone(),
            settings: ctx.settings().installer.clone(),
            env: Box::new(|key| std::env::var(key).ok()),
        }
    }

    /// Replace the process environment lookup.
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String> + 'a) -> Self {
        self.env = Box::new(lookup);
        self
    }

    /// Environment handed to Composer.
    pub fn environment(&self) -> Vec<(String, String)> {
        let lookup = |key: &str| (self.env)(key).filter(|v| !v.trim().is_empty());
        let mut env = Vec::new();

        let manifest_name = self.manifest.file_name().unwrap_or("composer.json");
        env.push(("COMPOSER".to_string(), manifest_name.to_string()));
        env.push(("TZ".to_string(), self.settings.timezone.clone()));

        if CERT_ENV.iter().any(|key| lookup(key).is_some()) {
            tracing::debug!("Certificate path configured in environment, using system TLS defaults");
        } else if let Some(bundle) = &self.settings.ca_bundle {
            env.push(("COMPOSER_CAFILE".to_string(), bundle.clone()));
        }

        let token = self
            .settings
            .github_token
            .clone()
            .or_else(|| GITHUB_TOKEN_ENV.iter().find_map(|key| lookup(key)));
        if let Some(auth) = merge_github_token(lookup("COMPOSER_AUTH").as_deref(), token.as_deref()) {
            env.push(("COMPOSER_AUTH".to_string(), auth));
        }
        env
    }

    fn invocation(&self, options: &InstallOptions) -> Invocation {
        let working_dir = self
            .manifest
            .parent()
            .map(|p| p.to_native())
            .unwrap_or_default();
        Invocation {
            args: options.to_args(),
            env: self.environment(),
            working_dir,
        }
    }

    /// Run Composer with `options`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ResolverFailure`] when Composer exits nonzero or
    /// cannot be started. If `options.revert_file` exists, the manifest has
    /// been restored from it by the time the error is returned.
    pub fn try_install(&self, options: &InstallOptions) -> Result<InstallReport> {
        let guard = options
            .revert_file
            .as_ref()
            .and_then(|backup| RevertGuard::arm(&self.manifest, backup));

        let command = options.command();
        tracing::info!(command, dry_run = options.dry_run, manifest = %self.manifest, "Running composer");

        let output = self.runner.run(&self.invocation(options)).map_err(|e| Error::ResolverFailure {
            command: command.to_string(),
            code: -1,
            message: e.to_string(),
        })?;

        if !output.success() {
            for line in output.stderr.lines().filter(|l| !l.trim().is_empty()) {
                tracing::debug!(target: "composer", "{line}");
            }
            let message = last_meaningful_line(&output.stderr)
                .or_else(|| last_meaningful_line(&output.stdout))
                .unwrap_or("no output")
                .to_string();
            return Err(Error::ResolverFailure {
                command: command.to_string(),
                code: output.code,
                message,
            });
        }

        // Composer reports operations on stderr; older versions on stdout
        let mut operations = parse_operations(&output.stderr);
        for op in parse_operations(&output.stdout) {
            if !operations.contains(&op) {
                operations.push(op);
            }
        }
        for op in &operations {
            tracing::info!(operation = %op, dry_run = options.dry_run, "Package operation");
        }

        if let Some(guard) = guard {
            guard.disarm();
        }
        Ok(InstallReport {
            command,
            dry_run: options.dry_run,
            operations,
        })
    }

    /// Run Composer, logging failure. Returns `true` on success.
    pub fn install(&self, options: &InstallOptions) -> bool {
        match self.try_install(options) {
            Ok(_) => true,
            Err(e) => {
                tracing::error!(error = %e, "Composer run failed");
                false
            }
        }
    }
}

fn last_meaningful_line(output: &str) -> Option<&str> {
    output.lines().map(str::trim).rev().find(|l| !l.is_empty())
}

/// Add a GitHub OAuth token to a `COMPOSER_AUTH` document unless one is
/// already configured. Returns the document to export, if any.
fn merge_github_token(existing: Option<&str>, token: Option<&str>) -> Option<String> {
    let mut auth: Map<String, Value> = match existing {
        Some(raw) => match serde_json::from_str(raw) {
            Ok(Value::Object(map)) => map,
            _ => {
                tracing::warn!("COMPOSER_AUTH is not a JSON object, leaving it untouched");
                return Some(raw.to_string());
            }
        },
        None => Map::new(),
    };

    let Some(token) = token else {
        return existing.map(str::to_string);
    };

    let has_token = auth
        .get("github-oauth")
        .and_then(|v| v.get("github.com"))
        .is_some();
    if has_token {
        return existing.map(str::to_string);
    }

    let entry = auth
        .entry("github-oauth")
        .or_insert_with(|| Value::Object(Map::new()));
    if !entry.is_object() {
        *entry = Value::Object(Map::new());
    }
    if let Some(map) = entry.as_object_mut() {
        map.insert("github.com".to_string(), json!(token));
    }
    serde_json::to_string(&auth).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::collections::HashMap;

    struct RecordingRunner {
        output: RunOutput,
        seen: RefCell<Vec<Invocation>>,
    }

    impl ComposerRunner for RecordingRunner {
        fn run(&self, invocation: &Invocation) -> Result<RunOutput> {
            self.seen.borrow_mut().push(invocation.clone());
            Ok(self.output.clone())
        }
    }

    fn runner(code: i32, stderr: &str) -> RecordingRunner {
        RecordingRunner {
            output: RunOutput {
                code,
                stdout: String::new(),
                stderr: stderr.to_string(),
            },
            seen: RefCell::new(Vec::new()),
        }
    }

    fn env_of(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn merge_token_into_empty_auth() {
        assert_eq!(
            merge_github_token(None, Some("ghp_x")).as_deref(),
            Some(r#"{"github-oauth":{"github.com":"ghp_x"}}"#)
        );
    }

    #[test]
    fn explicit_auth_wins_over_env_token() {
        let existing = r#"{"github-oauth":{"github.com":"configured"}}"#;
        assert_eq!(
            merge_github_token(Some(existing), Some("ghp_x")).as_deref(),
            Some(existing)
        );
    }

    #[test]
    fn token_merged_next_to_other_auth() {
        let existing = r#"{"http-basic":{"repo.example.org":{"username":"u","password":"p"}}}"#;
        let merged = merge_github_token(Some(existing), Some("ghp_x")).unwrap();
        let value: Value = serde_json::from_str(&merged).unwrap();
        assert_eq!(value["github-oauth"]["github.com"], "ghp_x");
        assert_eq!(value["http-basic"]["repo.example.org"]["username"], "u");
    }

    #[test]
    fn no_token_no_auth() {
        assert_eq!(merge_github_token(None, None), None);
    }

    #[test]
    fn environment_sets_manifest_timezone_and_cafile() {
        let mut settings = Settings::default();
        settings.installer.ca_bundle = Some("/etc/composition/cacert.pem".to_string());
        settings.installer.timezone = "Europe/Berlin".to_string();
        let ctx = AppContext::new("/srv/site", settings);
        let runner = runner(0, "");
        let env = env_of(&[("GH_TOKEN", "ghp_env")]);

        let installer = Installer::new(&ctx, &runner).with_env(move |k| env.get(k).cloned());
        let vars: HashMap<String, String> = installer.environment().into_iter().collect();

        assert_eq!(vars["COMPOSER"], "composer.json");
        assert_eq!(vars["TZ"], "Europe/Berlin");
        assert_eq!(vars["COMPOSER_CAFILE"], "/etc/composition/cacert.pem");
        assert!(vars["COMPOSER_AUTH"].contains("ghp_env"));
    }

    #[test]
    fn environment_cert_path_suppresses_cafile() {
        let mut settings = Settings::default();
        settings.installer.ca_bundle = Some("/etc/composition/cacert.pem".to_string());
        let ctx = AppContext::new("/srv/site", settings);
        let runner = runner(0, "");
        let env = env_of(&[("SSL_CERT_FILE", "/etc/ssl/cert.pem")]);

        let installer = Installer::new(&ctx, &runner).with_env(move |k| env.get(k).cloned());
        let vars: HashMap<String, String> = installer.environment().into_iter().collect();
        assert!(!vars.contains_key("COMPOSER_CAFILE"));
        assert!(!vars.contains_key("COMPOSER_AUTH"));
    }

    #[test]
    fn successful_run_reports_operations() {
        let ctx = AppContext::new("/srv/site", Settings::default());
        let runner = runner(0, "  - Installing wpackagist-plugin/akismet (5.3.1): Extracting archive\n");
        let installer = Installer::new(&ctx, &runner).with_env(|_| None);

        let report = installer.try_install(&InstallOptions::update()).unwrap();
        assert_eq!(report.command, "update");
        assert_eq!(report.operations.len(), 1);

        let seen = runner.seen.borrow();
        assert_eq!(seen[0].args[0], "update");
        assert_eq!(seen[0].working_dir, std::path::PathBuf::from("/srv/site"));
    }

    #[test]
    fn failed_run_is_resolver_failure() {
        let ctx = AppContext::new("/srv/site", Settings::default());
        let runner = runner(2, "Your requirements could not be resolved\n\n");
        let installer = Installer::new(&ctx, &runner).with_env(|_| None);

        match installer.try_install(&InstallOptions::install()) {
            Err(Error::ResolverFailure { code, message, .. }) => {
                assert_eq!(code, 2);
                assert_eq!(message, "Your requirements could not be resolved");
            }
            other => panic!("expected resolver failure, got {other:?}"),
        }
        assert!(!installer.install(&InstallOptions::install()));
    }
}
