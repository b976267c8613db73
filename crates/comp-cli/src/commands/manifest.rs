//! Manifest commands: info, check, update, reinit, backup, revert-backup

use colored::Colorize;

use comp_core::manifest::LockState;
use comp_core::orchestrator::reinitialize;
use comp_core::{AppContext, Event, Manifest, PackageCache, RemoteClient, UpdateResult};

use crate::error::{CliError, Result};

/// Freshness of the lock file relative to the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockStatus {
    Missing,
    Fresh,
    Stale,
    Unreadable(String),
}

pub fn lock_status(ctx: &AppContext, manifest: &Manifest) -> LockStatus {
    match LockState::read(&ctx.layout().lock_file()) {
        Ok(lock) => match lock.is_fresh_for(manifest) {
            Ok(true) => LockStatus::Fresh,
            Ok(false) => LockStatus::Stale,
            Err(e) => LockStatus::Unreadable(e.to_string()),
        },
        Err(comp_core::Error::NotFound { .. }) => LockStatus::Missing,
        Err(e) => LockStatus::Unreadable(e.to_string()),
    }
}

/// Run the info command
pub fn run_info(ctx: &AppContext) -> Result<()> {
    let layout = ctx.layout();
    let store = ctx.manifest_store();

    println!("{}", "Composition Status".bold());
    println!();
    println!("{}:     {}", "Root".dimmed(), layout.root());
    println!("{}: {}", "Manifest".dimmed(), store.path());

    match store.read() {
        Ok(manifest) => {
            let fingerprint = if manifest.verify_fingerprint()? {
                "valid".green()
            } else {
                "MISMATCH".red().bold()
            };
            println!("  {}: {}", "fingerprint".dimmed(), fingerprint);
            println!("  {}: {}", "required".dimmed(), manifest.require.len());
            for package in manifest.required_packages() {
                println!(
                    "    {} {} {} ({})",
                    "+".green(),
                    package.name.cyan(),
                    package.version,
                    package.required_by.dimmed()
                );
            }
            let lock = match lock_status(ctx, &manifest) {
                LockStatus::Fresh => "fresh".green(),
                LockStatus::Stale => "stale".yellow(),
                LockStatus::Missing => "missing".yellow(),
                LockStatus::Unreadable(e) => format!("unreadable ({e})").red(),
            };
            println!("{}:     {}", "Lock".dimmed(), lock);
        }
        Err(e) => println!("  {}", e.to_string().red()),
    }

    let backup = if store.backup_path().is_file() {
        "present".green()
    } else {
        "none".dimmed()
    };
    println!("{}:   {}", "Backup".dimmed(), backup);

    let cache = PackageCache::new(ctx)?;
    println!(
        "{}:    {} plugin(s), {} theme(s)",
        "Cache".dimmed(),
        cache.plugins()?.len(),
        cache.themes()?.len()
    );
    if let Some(hash) = cache.lock_hash()? {
        println!("  {}: {}", "lock hash".dimmed(), hash);
    }

    let remote = match &ctx.settings().remote.endpoint {
        Some(endpoint) => endpoint.cyan(),
        None => "not configured".yellow(),
    };
    println!("{}:   {}", "Remote".dimmed(), remote);

    let git = if ctx.settings().git.enabled {
        "enabled".green()
    } else {
        "disabled".dimmed()
    };
    println!("{}:      {}", "Git".dimmed(), git);

    let pending = ctx.queue().pending()?;
    if pending.is_empty() {
        println!("{}:     {}", "Jobs".dimmed(), "none pending".dimmed());
    } else {
        let kinds: Vec<String> = pending.iter().map(|j| j.kind.to_string()).collect();
        println!("{}:     {}", "Jobs".dimmed(), kinds.join(", "));
    }

    Ok(())
}

/// Run the check command
///
/// Fails when the manifest is missing, tampered with, or out of step with the lock.
pub fn run_check(ctx: &AppContext) -> Result<()> {
    println!("{} Checking manifest and lock file...", "=>".blue().bold());

    let manifest = ctx.manifest_store().read()?;
    let mut problems = Vec::new();

    if manifest.verify_fingerprint()? {
        println!("   {} manifest fingerprint", "OK".green().bold());
    } else {
        println!("   {} manifest fingerprint does not match", "!".red());
        problems.push("fingerprint");
    }

    match lock_status(ctx, &manifest) {
        LockStatus::Fresh => println!("   {} lock file is fresh", "OK".green().bold()),
        LockStatus::Stale => {
            println!("   {} lock file is stale", "-".yellow());
            problems.push("stale lock");
        }
        LockStatus::Missing => {
            println!("   {} lock file is missing", "-".yellow());
            problems.push("missing lock");
        }
        LockStatus::Unreadable(e) => {
            println!("   {} lock file is unreadable: {}", "!".red(), e);
            problems.push("unreadable lock");
        }
    }

    if problems.is_empty() {
        println!("{} Site composition is consistent.", "OK".green().bold());
        return Ok(());
    }

    println!();
    println!(
        "Run {} or {} to repair.",
        "composition update-sequence".cyan(),
        "composition reinit".cyan()
    );
    Err(CliError::user(format!("Check failed: {}", problems.join(", "))))
}

/// Run the update command
pub fn run_update(ctx: &AppContext) -> Result<()> {
    let store = ctx.manifest_store();
    let current = store.read()?;
    let client = RemoteClient::from_settings(ctx.settings())?;

    println!("{} Checking {} for updates...", "=>".blue().bold(), client.endpoint().cyan());

    match client.check_for_update(&current)? {
        UpdateResult::NoUpdateAvailable => {
            println!("{} Manifest is up to date.", "OK".green().bold());
        }
        UpdateResult::NewManifest(manifest) => {
            if !manifest.verify_fingerprint()? {
                return Err(CliError::user("Received manifest does not match its fingerprint"));
            }
            store.write(&manifest)?;
            ctx.publish(Event::ManifestUpdated);
            println!(
                "{} Manifest updated, {} required package(s).",
                "OK".green().bold(),
                manifest.require.len()
            );
        }
    }
    Ok(())
}

/// Run the reinit command
pub fn run_reinit(ctx: &AppContext) -> Result<()> {
    let manifest = reinitialize(ctx)?;
    println!(
        "{} Manifest reinitialized ({} package(s) required).",
        "OK".green().bold(),
        manifest.require.len()
    );
    Ok(())
}

/// Run the backup command
pub fn run_backup(ctx: &AppContext) -> Result<()> {
    let store = ctx.manifest_store();
    let backup = store.backup()?;
    println!("{} Manifest backed up to {}", "OK".green().bold(), backup);
    Ok(())
}

/// Run the revert-backup command
pub fn run_revert_backup(ctx: &AppContext) -> Result<()> {
    let store = ctx.manifest_store();
    if !store.revert()? {
        return Err(CliError::user(format!("No manifest backup at {}", store.backup_path())));
    }
    ctx.publish(Event::ManifestUpdated);
    println!("{} Manifest restored from {}", "OK".green().bold(), store.backup_path());
    Ok(())
}
