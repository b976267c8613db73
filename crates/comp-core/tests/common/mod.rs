//! In-process stand-ins for Composer and WordPress.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::path::PathBuf;

use comp_core::activation::InvalidPlugin;
use comp_core::installer::{Invocation, RunOutput};
use comp_core::manifest::{content_hash, read_manifest};
use comp_core::{ComposerRunner, Error, Result, SiteHost};
use comp_fs::NormalizedPath;
use serde_json::{Value, json};

/// Fake Composer: on success writes `composer.lock` for the manifest it was
/// pointed at, listing the configured packages.
#[derive(Default)]
pub struct FakeComposer {
    pub packages: RefCell<Vec<(String, String, String)>>,
    /// Number of upcoming runs that fail.
    pub failures: Cell<usize>,
    pub calls: RefCell<Vec<Vec<String>>>,
    /// Package directories deleted by the next successful run.
    pub removals: RefCell<Vec<PathBuf>>,
}

impl FakeComposer {
    pub fn with_packages(packages: &[(&str, &str, &str)]) -> Self {
        let composer = Self::default();
        composer.set_packages(packages);
        composer
    }

    pub fn set_packages(&self, packages: &[(&str, &str, &str)]) {
        *self.packages.borrow_mut() = packages
            .iter()
            .map(|(n, v, t)| (n.to_string(), v.to_string(), t.to_string()))
            .collect();
    }

    pub fn commands(&self) -> Vec<String> {
        self.calls.borrow().iter().map(|args| args[0].clone()).collect()
    }
}

impl ComposerRunner for FakeComposer {
    fn run(&self, invocation: &Invocation) -> Result<RunOutput> {
        self.calls.borrow_mut().push(invocation.args.clone());
        if self.failures.get() > 0 {
            self.failures.set(self.failures.get() - 1);
            return Ok(RunOutput {
                code: 2,
                stdout: String::new(),
                stderr: "Your requirements could not be resolved to an installable set of packages.\n".to_string(),
            });
        }

        let manifest_name = invocation
            .env
            .iter()
            .find(|(k, _)| k == "COMPOSER")
            .map(|(_, v)| v.clone())
            .unwrap_or_else(|| "composer.json".to_string());
        let dir = NormalizedPath::new(&invocation.working_dir);
        let manifest = read_manifest(&dir.join(&manifest_name))?;

        let packages: Vec<Value> = self
            .packages
            .borrow()
            .iter()
            .map(|(name, version, kind)| {
                json!({
                    "name": name,
                    "version": version,
                    "type": kind,
                    "authors": [{"name": "Test Author"}],
                })
            })
            .collect();
        let lock = json!({
            "content-hash": content_hash(&manifest)?,
            "packages": packages,
            "packages-dev": [],
        });
        let lock_name = manifest_name.replace(".json", ".lock");
        std::fs::write(dir.join(&lock_name).to_native(), serde_json::to_string_pretty(&lock)?)
            .map_err(|e| comp_fs::Error::io(dir.join(&lock_name).to_native(), e))?;

        for dir in self.removals.borrow_mut().drain(..) {
            if dir.exists() {
                std::fs::remove_dir_all(&dir).map_err(|e| comp_fs::Error::io(&dir, e))?;
            }
        }

        let stderr: String = self
            .packages
            .borrow()
            .iter()
            .map(|(name, version, _)| format!("  - Installing {name} ({version}): Extracting archive\n"))
            .collect();
        Ok(RunOutput {
            code: 0,
            stdout: String::new(),
            stderr,
        })
    }
}

/// Fake WordPress: tracks active plugins and theme in memory. Plugins listed
/// in `fatal` fail to activate; active plugins whose file is missing below
/// `plugins_dir` are reported invalid.
pub struct FakeHost {
    pub plugins_dir: PathBuf,
    pub active: RefCell<BTreeSet<String>>,
    pub fatal: BTreeSet<String>,
    pub attempts: RefCell<Vec<String>>,
    pub deactivated: RefCell<Vec<String>>,
    pub theme: RefCell<Option<String>>,
}

impl FakeHost {
    pub fn new(plugins_dir: impl Into<PathBuf>) -> Self {
        Self {
            plugins_dir: plugins_dir.into(),
            active: RefCell::new(BTreeSet::new()),
            fatal: BTreeSet::new(),
            attempts: RefCell::new(Vec::new()),
            deactivated: RefCell::new(Vec::new()),
            theme: RefCell::new(None),
        }
    }

    pub fn with_fatal(mut self, plugin: &str) -> Self {
        self.fatal.insert(plugin.to_string());
        self
    }

    pub fn with_active(self, plugin: &str) -> Self {
        self.active.borrow_mut().insert(plugin.to_string());
        self
    }

    pub fn is_active(&self, plugin: &str) -> bool {
        self.active.borrow().contains(plugin)
    }
}

impl SiteHost for FakeHost {
    fn active_plugins(&self) -> Result<BTreeSet<String>> {
        Ok(self.active.borrow().clone())
    }

    fn activate_plugin(&self, plugin: &str) -> Result<()> {
        self.attempts.borrow_mut().push(plugin.to_string());
        if self.fatal.contains(plugin) {
            return Err(Error::Host {
                program: "wp".to_string(),
                message: "PHP Fatal error: Uncaught Error".to_string(),
            });
        }
        self.active.borrow_mut().insert(plugin.to_string());
        Ok(())
    }

    fn deactivate_plugin(&self, plugin: &str) -> Result<()> {
        self.deactivated.borrow_mut().push(plugin.to_string());
        self.active.borrow_mut().remove(plugin);
        Ok(())
    }

    fn validate_active_plugins(&self) -> Result<Vec<InvalidPlugin>> {
        Ok(self
            .active
            .borrow()
            .iter()
            .filter(|plugin| !self.plugins_dir.join(plugin.as_str()).is_file())
            .map(|plugin| InvalidPlugin {
                plugin: plugin.clone(),
                reason: "Plugin file does not exist.".to_string(),
            })
            .collect())
    }

    fn active_theme(&self) -> Result<Option<String>> {
        Ok(self.theme.borrow().clone())
    }

    fn activate_theme(&self, stylesheet: &str) -> Result<()> {
        *self.theme.borrow_mut() = Some(stylesheet.to_string());
        Ok(())
    }
}
