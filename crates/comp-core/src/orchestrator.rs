//! Orchestrator
//!
//! Runs the update sequence: check manifest, apply installer, refresh cache,
//! activate. Steps run strictly in order and the first unrecovered failure
//! ends the sequence.
//!
//! In revert mode the manifest is backed up before the first step. A failure
//! in the first two steps reverts the manifest and retries that step; a
//! failure while activating reverts and re-runs from the installer step.
//! Each failing step gets one retry; a second failure ends the sequence.

use std::collections::HashSet;
use std::fmt;

use crate::activation::{ActivationController, SiteHost, ThemeSelection};
use crate::cache::PackageCache;
use crate::context::AppContext;
use crate::events::Event;
use crate::installer::{ComposerRunner, InstallOptions, Installer};
use crate::manifest::{LockState, Manifest, baseline_manifest};
use crate::remote::{RemoteClient, UpdateResult};
use crate::{Error, Result};

/// One named step of the update sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    CheckManifest,
    ApplyInstaller,
    RefreshCache,
    Activate,
}

impl Step {
    /// Every step in execution order.
    pub const ALL: [Step; 4] = [
        Step::CheckManifest,
        Step::ApplyInstaller,
        Step::RefreshCache,
        Step::Activate,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::CheckManifest => "check-manifest",
            Self::ApplyInstaller => "apply-installer",
            Self::RefreshCache => "refresh-cache",
            Self::Activate => "activate",
        }
    }

    /// 1-based position in the sequence.
    pub fn number(&self) -> usize {
        self.index() + 1
    }

    fn index(&self) -> usize {
        match self {
            Self::CheckManifest => 0,
            Self::ApplyInstaller => 1,
            Self::RefreshCache => 2,
            Self::Activate => 3,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SequenceOptions {
    /// Reinitialize the manifest to the baseline before the first step.
    pub force: bool,
    /// Back up the manifest first and revert to it on failure.
    pub revert_on_failure: bool,
}

/// Outcome of one executed step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepResult {
    pub step: Step,
    /// `Ok` carries a short summary, `Err` the failure message.
    pub outcome: std::result::Result<String, String>,
}

/// What a sequence run did, in execution order. Retried steps appear twice.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SequenceReport {
    pub steps: Vec<StepResult>,
    pub failed_at: Option<Step>,
    pub reverted: bool,
}

impl SequenceReport {
    pub fn success(&self) -> bool {
        self.failed_at.is_none()
    }

    fn record(&mut self, step: Step, outcome: std::result::Result<String, String>) {
        self.steps.push(StepResult { step, outcome });
    }
}

impl fmt::Display for SequenceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for result in &self.steps {
            match &result.outcome {
                Ok(summary) => writeln!(f, "[{}] {}: ok ({summary})", result.step.number(), result.step)?,
                Err(message) => writeln!(f, "[{}] {}: failed ({message})", result.step.number(), result.step)?,
            }
        }
        match self.failed_at {
            None => write!(f, "sequence succeeded"),
            Some(step) => write!(f, "sequence failed at step {} ({step})", step.number()),
        }
    }
}

/// Overwrite the manifest with the baseline manifest.
pub fn reinitialize(ctx: &AppContext) -> Result<Manifest> {
    let layout = ctx.layout();
    let wp_content = layout
        .manifest()
        .parent()
        .and_then(|dir| layout.wp_content().strip_prefix(&dir))
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| ctx.settings().paths.wp_content.clone());

    let manifest = baseline_manifest(&wp_content)?;
    ctx.manifest_store().write(&manifest)?;
    tracing::info!(path = %layout.manifest(), "Manifest reinitialized to baseline");
    ctx.publish(Event::ManifestUpdated);
    Ok(manifest)
}

/// Runs the update sequence against one site.
pub struct Orchestrator<'a> {
    ctx: &'a AppContext,
    runner: &'a dyn ComposerRunner,
    host: &'a dyn SiteHost,
}

impl<'a> Orchestrator<'a> {
    pub fn new(ctx: &'a AppContext, runner: &'a dyn ComposerRunner, host: &'a dyn SiteHost) -> Self {
        Self { ctx, runner, host }
    }

    /// Run all four steps.
    pub fn run(&self, options: SequenceOptions) -> SequenceReport {
        let mut report = SequenceReport::default();
        let store = self.ctx.manifest_store();

        if options.force {
            if let Err(e) = reinitialize(self.ctx) {
                tracing::error!(step = %Step::CheckManifest, error = %e, "Manifest reinitialization failed");
                report.record(Step::CheckManifest, Err(e.to_string()));
                report.failed_at = Some(Step::CheckManifest);
                return report;
            }
            self.ctx.dispatch_events();
        }

        let revert_mode = options.revert_on_failure
            && match store.backup() {
                Ok(_) => true,
                Err(e) => {
                    tracing::warn!(error = %e, "Manifest backup failed, continuing without revert");
                    false
                }
            };

        let mut retried: HashSet<Step> = HashSet::new();
        let mut index = 0;
        while let Some(&step) = Step::ALL.get(index) {
            let result = self.run_step(step, revert_mode);
            self.ctx.dispatch_events();

            match result {
                Ok(summary) => {
                    tracing::info!(step = %step, summary = %summary, "Step succeeded");
                    report.record(step, Ok(summary));
                    index += 1;
                }
                Err(e) => {
                    tracing::error!(step = %step, error = %e, "Step failed");
                    report.record(step, Err(e.to_string()));

                    if revert_mode && step != Step::RefreshCache && retried.insert(step) {
                        match store.revert() {
                            Ok(true) => {
                                report.reverted = true;
                                let restart = match step {
                                    Step::Activate => Step::ApplyInstaller,
                                    other => other,
                                };
                                tracing::warn!(step = %step, restart = %restart, "Manifest reverted, retrying");
                                self.ctx.publish(Event::ManifestUpdated);
                                index = restart.index();
                                continue;
                            }
                            Ok(false) => {}
                            Err(e) => tracing::error!(error = %e, "Manifest revert failed"),
                        }
                    }

                    report.failed_at = Some(step);
                    return report;
                }
            }
        }
        report
    }

    /// Run a single step.
    ///
    /// In revert mode the installer is guarded by the manifest backup and a
    /// remote failure fails the manifest check instead of being skipped.
    pub fn run_step(&self, step: Step, revert_mode: bool) -> Result<String> {
        tracing::debug!(step = %step, number = step.number(), "Running step");
        match step {
            Step::CheckManifest => self.check_manifest(revert_mode),
            Step::ApplyInstaller => self.apply_installer(revert_mode),
            Step::RefreshCache => Ok(PackageCache::new(self.ctx)?.refresh(false)?.to_string()),
            Step::Activate => self.activate(),
        }
    }

    fn check_manifest(&self, revert_mode: bool) -> Result<String> {
        let store = self.ctx.manifest_store();
        let current = store.read()?;
        if !current.verify_fingerprint()? {
            return Err(Error::FingerprintMismatch {
                path: store.path().to_native(),
            });
        }

        let client = match RemoteClient::from_settings(self.ctx.settings()) {
            Ok(client) => client,
            Err(Error::RemoteNotConfigured) => {
                tracing::warn!("Remote endpoint not configured, skipping update check");
                return Ok("remote not configured".to_string());
            }
            Err(e) => return Err(e),
        };

        match client.check_for_update(&current) {
            Ok(UpdateResult::NoUpdateAvailable) => Ok("no update".to_string()),
            Ok(UpdateResult::NewManifest(manifest)) => {
                if !manifest.verify_fingerprint()? {
                    return Err(Error::remote(
                        "invalid_fingerprint",
                        "Received manifest does not match its fingerprint",
                    ));
                }
                store.write(&manifest)?;
                self.ctx.publish(Event::ManifestUpdated);
                Ok(format!("manifest updated, {} required package(s)", manifest.require.len()))
            }
            Err(e @ Error::RemoteError { .. }) if !revert_mode => {
                tracing::warn!(error = %e, "Update check failed, continuing with current manifest");
                Ok(format!("update check failed: {e}"))
            }
            Err(e) => Err(e),
        }
    }

    fn apply_installer(&self, revert_mode: bool) -> Result<String> {
        let store = self.ctx.manifest_store();
        let manifest = store.read()?;
        let fresh = match LockState::read(&self.ctx.layout().lock_file()) {
            Ok(lock) => lock.is_fresh_for(&manifest)?,
            Err(Error::NotFound { .. }) => false,
            Err(e) => {
                tracing::warn!(error = %e, "Lock file unreadable, updating");
                false
            }
        };

        let mut options = if fresh {
            InstallOptions::install()
        } else {
            InstallOptions::update()
        };
        if revert_mode {
            options.revert_file = Some(store.backup_path().clone());
        }

        let report = Installer::new(self.ctx, self.runner).try_install(&options)?;
        if !report.operations.is_empty() {
            self.ctx.publish(Event::PackagesChanged {
                reason: format!("composer {}", report.command),
            });
        }
        Ok(format!("composer {}, {} operation(s)", report.command, report.operations.len()))
    }

    fn activate(&self) -> Result<String> {
        let cache = PackageCache::new(self.ctx)?;
        let controller = ActivationController::new(self.ctx, self.host);

        let report = controller.activate_plugins(&cache.plugins()?)?;
        let theme = controller.activate_theme(&cache.themes()?)?;
        if !report.success() {
            return Err(Error::ActivationFailed {
                plugins: report.failed.into_iter().map(|(plugin, _)| plugin).collect(),
            });
        }

        let theme = match theme {
            ThemeSelection::NoTheme => "no theme".to_string(),
            ThemeSelection::AlreadyActive(s) | ThemeSelection::Activated(s) => format!("theme {s}"),
        };
        Ok(format!(
            "{} activated, {} already active, {theme}",
            report.activated.len(),
            report.already_active.len()
        ))
    }
}
