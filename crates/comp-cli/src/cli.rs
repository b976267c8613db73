//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Composition - keep a WordPress site in line with its remote manifest
#[derive(Parser, Debug)]
#[command(name = "composition")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Site root directory
    #[arg(long, global = true, env = "COMPOSITION_ROOT", default_value = ".")]
    pub root: PathBuf,

    /// The command to run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Show manifest, lock, cache and queue status
    Info,

    /// Verify the manifest fingerprint and lock freshness
    ///
    /// Exits nonzero when the manifest is tampered with or the lock file
    /// no longer matches it.
    Check,

    /// Ask the remote authority for a newer manifest
    Update,

    /// Overwrite the manifest with the baseline manifest
    Reinit,

    /// Run `composer install` against the manifest
    ComposerInstall(ComposerArgs),

    /// Run `composer update` against the manifest
    ComposerUpdate(ComposerArgs),

    /// Rebuild the package cache from the lock file
    UpdateCache {
        /// Rescan even if the lock content-hash is unchanged
        #[arg(long)]
        force: bool,
    },

    /// Drop the package cache
    ClearCache,

    /// Activate cached plugins and select the theme
    Activate,

    /// Run the full update sequence
    ///
    /// Steps: check-manifest, apply-installer, refresh-cache, activate.
    ///
    /// Examples:
    ///   composition update-sequence                      # Normal run
    ///   composition update-sequence --revert-on-failure  # Back up and retry once
    ///   composition update-sequence --force              # Start from the baseline manifest
    UpdateSequence {
        /// Reinitialize the manifest before the first step
        #[arg(long)]
        force: bool,

        /// Back up the manifest and revert to it on failure
        #[arg(long)]
        revert_on_failure: bool,
    },

    /// Copy the manifest to the backup location
    Backup,

    /// Restore the manifest from the backup
    RevertBackup,

    /// List uncommitted change units
    GitStatus,

    /// Commit pending changes and run the merge/push cycle now
    GitSync,

    /// Run queued jobs, optionally triggering the recurring ones first
    ///
    /// Intended to be called from cron.
    RunJobs {
        /// Queue the hourly job (cache refresh, commit and push)
        #[arg(long)]
        hourly: bool,

        /// Queue the midnight job (stale merge branch and lock cleanup)
        #[arg(long)]
        midnight: bool,
    },

    /// Report a host lifecycle event
    Hook {
        /// Lifecycle event
        #[arg(value_enum)]
        event: HookEvent,

        /// Plugin file or package the event refers to
        target: Option<String>,
    },
}

/// Flags shared by the Composer commands.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct ComposerArgs {
    /// Report planned operations without changing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Install development requirements
    #[arg(long)]
    pub dev: bool,

    /// Install packages from source instead of dist archives
    #[arg(long)]
    pub prefer_source: bool,

    /// Optimize the autoloader
    #[arg(long)]
    pub optimize: bool,
}

/// Host lifecycle notifications accepted by `hook`.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookEvent {
    PluginActivated,
    PluginDeactivated,
    PackageInstalled,
    PackageUpdated,
    PackageDeleted,
}
