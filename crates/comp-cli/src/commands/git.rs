//! Git synchronization commands

use colored::Colorize;

use comp_core::{AppContext, Synchronizer};
use comp_git::ChangeKind;

use crate::error::{CliError, Result};

fn open(ctx: &AppContext) -> Result<Synchronizer<'_>> {
    Synchronizer::open(ctx)?.ok_or_else(|| {
        CliError::user("Git synchronization is disabled or the site is not a git repository")
    })
}

/// Run the git-status command
pub fn run_git_status(ctx: &AppContext) -> Result<()> {
    let sync = open(ctx)?;
    let branch = sync
        .repo()
        .current_branch()?
        .unwrap_or_else(|| "HEAD (detached)".to_string());
    let units = sync.pending_units()?;

    println!("{} {}", "Branch".bold(), branch.cyan());
    if units.is_empty() {
        println!("{} Working tree clean.", "OK".green().bold());
        return Ok(());
    }

    println!("{} pending commit(s):", units.len());
    for unit in &units {
        let marker = match unit.action {
            ChangeKind::Added => "+".green(),
            ChangeKind::Modified => "~".yellow(),
            ChangeKind::Deleted => "-".red(),
        };
        println!(
            "   {} {} {}",
            marker,
            unit.commit_message(),
            format!("({} path(s))", unit.paths.len()).dimmed()
        );
    }
    Ok(())
}

/// Run the git-sync command
pub fn run_git_sync(ctx: &AppContext) -> Result<()> {
    let sync = open(ctx)?;
    println!("{} Committing and syncing...", "=>".blue().bold());
    let report = sync.sync_now()?;
    println!("{} {}", "OK".green().bold(), report);
    Ok(())
}
