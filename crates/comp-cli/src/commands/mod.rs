//! Command implementations for comp-cli

pub mod cache;
pub mod composer;
pub mod git;
pub mod jobs;
pub mod manifest;

pub use cache::{run_activate, run_clear_cache, run_update_cache};
pub use composer::{run_composer, run_update_sequence};
pub use git::{run_git_status, run_git_sync};
pub use jobs::{run_hook, run_jobs};
pub use manifest::{run_backup, run_check, run_info, run_reinit, run_revert_backup, run_update};

use comp_core::{AppContext, ComposerCli, WpCli};

/// Composer runner configured for the site.
fn composer(ctx: &AppContext) -> ComposerCli {
    ComposerCli::new(&ctx.settings().installer.composer_binary)
}

/// WP-CLI host for the site.
fn wp_cli(ctx: &AppContext) -> WpCli {
    WpCli::new(&ctx.settings().wordpress.wp_binary, ctx.layout().root().to_native())
}
