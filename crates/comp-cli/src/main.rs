//! Composition CLI
//!
//! Operational surface for the composition reconciliation engine. Every
//! command opens the site once, runs, then delivers the events it published.

mod cli;
mod commands;
mod error;

use clap::Parser;
use colored::Colorize;
use comp_core::AppContext;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use error::Result;

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // A second init only fails if a subscriber is already installed
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let Some(command) = cli.command else {
        println!("{} WordPress composition agent", "composition".green().bold());
        println!();
        println!("Run {} for available commands.", "composition --help".cyan());
        return Ok(());
    };

    let ctx = AppContext::open(&cli.root)?;
    tracing::debug!(root = %ctx.layout().root(), command = ?command, "Site opened");

    let result = execute_command(&ctx, command);
    ctx.dispatch_events();
    result
}

fn execute_command(ctx: &AppContext, cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Info => commands::run_info(ctx),
        Commands::Check => commands::run_check(ctx),
        Commands::Update => commands::run_update(ctx),
        Commands::Reinit => commands::run_reinit(ctx),
        Commands::ComposerInstall(args) => commands::run_composer(ctx, false, &args),
        Commands::ComposerUpdate(args) => commands::run_composer(ctx, true, &args),
        Commands::UpdateCache { force } => commands::run_update_cache(ctx, force),
        Commands::ClearCache => commands::run_clear_cache(ctx),
        Commands::Activate => commands::run_activate(ctx),
        Commands::UpdateSequence {
            force,
            revert_on_failure,
        } => commands::run_update_sequence(ctx, force, revert_on_failure),
        Commands::Backup => commands::run_backup(ctx),
        Commands::RevertBackup => commands::run_revert_backup(ctx),
        Commands::GitStatus => commands::run_git_status(ctx),
        Commands::GitSync => commands::run_git_sync(ctx),
        Commands::RunJobs { hourly, midnight } => commands::run_jobs(ctx, hourly, midnight),
        Commands::Hook { event, target } => commands::run_hook(ctx, event, target.as_deref()),
    }
}
