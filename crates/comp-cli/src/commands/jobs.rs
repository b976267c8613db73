//! Job queue and lifecycle hook commands

use colored::Colorize;

use comp_core::jobs::run_pending;
use comp_core::{AppContext, Event, JobKind};

use crate::cli::HookEvent;
use crate::error::{CliError, Result};

/// Run the run-jobs command
pub fn run_jobs(ctx: &AppContext, hourly: bool, midnight: bool) -> Result<()> {
    let queue = ctx.queue();
    if hourly {
        queue.schedule(JobKind::Hourly)?;
    }
    if midnight {
        queue.schedule(JobKind::Midnight)?;
    }

    let results = run_pending(ctx)?;
    if results.is_empty() {
        println!("{} No jobs pending.", "OK".green().bold());
        return Ok(());
    }

    let mut failed = 0;
    for result in &results {
        if result.success {
            println!("   {} {}", "OK".green().bold(), result.kind);
        } else {
            failed += 1;
            println!(
                "   {} {}: {}",
                "!".red(),
                result.kind,
                result.message.as_deref().unwrap_or("failed")
            );
        }
    }

    if failed > 0 {
        return Err(CliError::user(format!("{failed} of {} job(s) failed", results.len())));
    }
    Ok(())
}

/// Event a lifecycle notification turns into.
pub fn hook_event(event: HookEvent, target: Option<&str>) -> Result<Event> {
    let plugin = || {
        target
            .map(str::to_string)
            .ok_or_else(|| CliError::user("A plugin file is required for plugin events"))
    };
    let reason = |what: &str| match target {
        Some(target) => format!("{what}: {target}"),
        None => what.to_string(),
    };

    Ok(match event {
        HookEvent::PluginActivated => Event::PluginActivated { plugin: plugin()? },
        HookEvent::PluginDeactivated => Event::PluginDeactivated { plugin: plugin()? },
        HookEvent::PackageInstalled => Event::PackagesChanged {
            reason: reason("package installed"),
        },
        HookEvent::PackageUpdated => Event::PackagesChanged {
            reason: reason("package updated"),
        },
        HookEvent::PackageDeleted => Event::PackagesChanged {
            reason: reason("package deleted"),
        },
    })
}

/// Run the hook command
pub fn run_hook(ctx: &AppContext, event: HookEvent, target: Option<&str>) -> Result<()> {
    let event = hook_event(event, target)?;
    tracing::info!(event = %event.kind(), subject = target.unwrap_or(""), "Lifecycle hook");
    ctx.publish(event);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use comp_core::Settings;
    use tempfile::TempDir;

    #[test]
    fn test_plugin_events_need_target() {
        assert!(hook_event(HookEvent::PluginActivated, None).is_err());
        assert_eq!(
            hook_event(HookEvent::PluginDeactivated, Some("hello.php")).unwrap(),
            Event::PluginDeactivated {
                plugin: "hello.php".to_string()
            }
        );
    }

    #[test]
    fn test_package_events_carry_reason() {
        assert_eq!(
            hook_event(HookEvent::PackageUpdated, Some("wpackagist-plugin/akismet")).unwrap(),
            Event::PackagesChanged {
                reason: "package updated: wpackagist-plugin/akismet".to_string()
            }
        );
        assert_eq!(
            hook_event(HookEvent::PackageDeleted, None).unwrap(),
            Event::PackagesChanged {
                reason: "package deleted".to_string()
            }
        );
    }

    #[test]
    fn test_run_jobs_outside_repository() {
        let temp = TempDir::new().unwrap();
        let ctx = AppContext::new(temp.path(), Settings::default());

        run_jobs(&ctx, false, true).unwrap();
        assert!(ctx.queue().pending().unwrap().is_empty());
    }
}
