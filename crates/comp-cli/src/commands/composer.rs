//! Composer and update-sequence commands

use colored::Colorize;

use comp_core::installer::InstallMethod;
use comp_core::{AppContext, Event, InstallOptions, Installer, Orchestrator, SequenceOptions};

use super::{composer, wp_cli};
use crate::cli::ComposerArgs;
use crate::error::{CliError, Result};

/// Installer options for `composer install` or `composer update`.
pub fn install_options(update: bool, args: &ComposerArgs) -> InstallOptions {
    let mut options = if update {
        InstallOptions::update()
    } else {
        InstallOptions::install()
    };
    options.dry_run = args.dry_run;
    options.dev_mode = args.dev;
    options.optimize_autoloader = args.optimize;
    if args.prefer_source {
        options.install_method = InstallMethod::Source;
    }
    options
}

/// Run the composer-install or composer-update command
pub fn run_composer(ctx: &AppContext, update: bool, args: &ComposerArgs) -> Result<()> {
    let options = install_options(update, args);
    println!(
        "{} Running composer {}{}...",
        "=>".blue().bold(),
        options.command(),
        if options.dry_run { " (dry run)" } else { "" }
    );

    let runner = composer(ctx);
    let report = Installer::new(ctx, &runner).try_install(&options)?;

    if report.operations.is_empty() {
        println!("{} Nothing to install, update or remove.", "OK".green().bold());
        return Ok(());
    }

    let verb = if report.dry_run { "Planned" } else { "Applied" };
    println!("{} {} operation(s):", verb.bold(), report.operations.len());
    for op in &report.operations {
        println!("   {} {}", "-".cyan(), op);
    }

    if !report.dry_run {
        ctx.publish(Event::PackagesChanged {
            reason: format!("composer {}", report.command),
        });
    }
    Ok(())
}

/// Run the update-sequence command
pub fn run_update_sequence(ctx: &AppContext, force: bool, revert_on_failure: bool) -> Result<()> {
    println!("{} Running update sequence...", "=>".blue().bold());

    let runner = composer(ctx);
    let host = wp_cli(ctx);
    let report = Orchestrator::new(ctx, &runner, &host).run(SequenceOptions {
        force,
        revert_on_failure,
    });

    for result in &report.steps {
        match &result.outcome {
            Ok(summary) => println!(
                "   {} [{}] {}: {}",
                "OK".green().bold(),
                result.step.number(),
                result.step.name().cyan(),
                summary
            ),
            Err(message) => println!(
                "   {} [{}] {}: {}",
                "!".red(),
                result.step.number(),
                result.step.name().cyan(),
                message
            ),
        }
    }
    if report.reverted {
        println!("   {} manifest was reverted from backup", "-".yellow());
    }

    match report.failed_at {
        None => {
            println!("{} Update sequence complete.", "OK".green().bold());
            Ok(())
        }
        Some(step) => Err(CliError::user(format!(
            "Update sequence failed at step {} ({step})",
            step.number()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use comp_core::installer::Verbosity;

    #[test]
    fn test_install_options_from_flags() {
        let args = ComposerArgs {
            dry_run: true,
            dev: true,
            prefer_source: true,
            optimize: true,
        };
        let options = install_options(true, &args);

        assert!(options.update);
        assert!(options.dry_run);
        assert!(options.dev_mode);
        assert!(options.optimize_autoloader);
        assert_eq!(options.install_method, InstallMethod::Source);
        assert_eq!(options.verbosity, Verbosity::Normal);
    }

    #[test]
    fn test_install_options_defaults() {
        let options = install_options(false, &ComposerArgs::default());

        assert_eq!(options.command(), "install");
        assert!(!options.dry_run);
        assert_eq!(options.install_method, InstallMethod::Dist);
        assert!(options.revert_file.is_none());
    }
}
