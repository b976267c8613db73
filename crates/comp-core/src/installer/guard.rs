//! Scoped revert guard for risky manifest operations

use comp_fs::{NormalizedPath, io};

/// Restores a manifest from its backup when dropped, unless disarmed.
///
/// Create the guard before a risky operation and call [`RevertGuard::disarm`]
/// once it has succeeded. Any other exit path, including an early return or
/// a panic unwinding through the caller, puts the backup back.
#[derive(Debug)]
#[must_use = "dropping the guard immediately reverts the manifest"]
pub struct RevertGuard {
    manifest: NormalizedPath,
    backup: NormalizedPath,
    armed: bool,
}

impl RevertGuard {
    /// Arm a guard, or return `None` when `backup` does not exist.
    pub fn arm(manifest: &NormalizedPath, backup: &NormalizedPath) -> Option<Self> {
        if !backup.is_file() {
            tracing::debug!(backup = %backup, "No backup, revert guard not armed");
            return None;
        }
        tracing::debug!(manifest = %manifest, backup = %backup, "Revert guard armed");
        Some(Self {
            manifest: manifest.clone(),
            backup: backup.clone(),
            armed: true,
        })
    }

    /// Cancel the pending revert.
    pub fn disarm(mut self) {
        self.armed = false;
        tracing::debug!(manifest = %self.manifest, "Revert guard disarmed");
    }
}

impl Drop for RevertGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match io::copy_atomic(&self.backup, &self.manifest) {
            Ok(()) => tracing::warn!(
                manifest = %self.manifest,
                backup = %self.backup,
                "Installer did not succeed, manifest reverted from backup"
            ),
            Err(e) => tracing::error!(
                manifest = %self.manifest,
                error = %e,
                "Failed to revert manifest from backup"
            ),
        }
    }
}
