//! Package cache and activation commands

use colored::Colorize;

use comp_core::activation::ThemeSelection;
use comp_core::{ActivationController, AppContext, PackageCache, RefreshOutcome};

use super::wp_cli;
use crate::error::{CliError, Result};

/// Run the update-cache command
pub fn run_update_cache(ctx: &AppContext, force: bool) -> Result<()> {
    let cache = PackageCache::new(ctx)?;
    match cache.refresh(force)? {
        RefreshOutcome::Unchanged => {
            println!("{} Cache already matches the lock file.", "OK".green().bold());
        }
        RefreshOutcome::Refreshed(report) => {
            println!("{} Cache refreshed: {}", "OK".green().bold(), report);
            println!(
                "   {} plugin(s), {} theme(s)",
                cache.plugins()?.len(),
                cache.themes()?.len()
            );
        }
    }
    Ok(())
}

/// Run the clear-cache command
pub fn run_clear_cache(ctx: &AppContext) -> Result<()> {
    PackageCache::new(ctx)?.clear()?;
    println!("{} Cache cleared.", "OK".green().bold());
    Ok(())
}

/// Run the activate command
pub fn run_activate(ctx: &AppContext) -> Result<()> {
    let cache = PackageCache::new(ctx)?;
    let host = wp_cli(ctx);
    let controller = ActivationController::new(ctx, &host);

    println!("{} Activating managed plugins...", "=>".blue().bold());
    let report = controller.activate_plugins(&cache.plugins()?)?;

    for plugin in &report.activated {
        println!("   {} {}", "+".green(), plugin.cyan());
    }
    for plugin in &report.already_active {
        println!("   {} {} (already active)", "=".dimmed(), plugin.cyan());
    }
    for (plugin, message) in &report.failed {
        println!("   {} {}: {}", "!".red(), plugin.cyan(), message);
    }
    for invalid in &report.invalid {
        println!("   {} {} is invalid: {}", "-".yellow(), invalid.plugin.cyan(), invalid.reason);
    }

    match controller.activate_theme(&cache.themes()?)? {
        ThemeSelection::NoTheme => println!("   {} no managed theme", "-".dimmed()),
        ThemeSelection::AlreadyActive(theme) => {
            println!("   {} theme {} (already active)", "=".dimmed(), theme.cyan())
        }
        ThemeSelection::Activated(theme) => println!("   {} theme {}", "+".green(), theme.cyan()),
    }

    if !report.success() {
        return Err(CliError::user(format!(
            "{} plugin(s) could not be activated",
            report.failed.len()
        )));
    }
    println!("{} Activation complete.", "OK".green().bold());
    Ok(())
}
