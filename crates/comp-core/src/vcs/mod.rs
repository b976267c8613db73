//! Version Control Synchronizer
//!
//! Treats the site as a git working tree: local changes are grouped into
//! change units and committed one unit at a time, installer-managed package
//! paths are kept out of git through a managed `.gitignore` block, and pushes
//! are queued as jobs instead of running inside the triggering operation.

mod gitignore;
mod synchronizer;
mod units;

pub use gitignore::{MANAGED_BLOCK_ID, ignore_entries};
pub use synchronizer::{CycleReport, Synchronizer};
pub use units::{ChangeUnit, Module, ModuleKind, ModuleResolver, group_changes};

use crate::context::AppContext;
use crate::events::{Event, EventBus, EventKind};
use crate::Result;

/// Register the synchronizer's event handlers.
///
/// A cache refresh regenerates the ignore list; every other site change
/// commits pending units and schedules a push.
pub fn subscribe(bus: &mut EventBus) {
    bus.subscribe(EventKind::CacheRefreshed, |ctx, _| {
        if let Some(sync) = Synchronizer::open(ctx)? {
            sync.update_gitignore()?;
        }
        Ok(())
    });

    for kind in [
        EventKind::ManifestUpdated,
        EventKind::PluginActivated,
        EventKind::PluginDeactivated,
        EventKind::PackagesChanged,
    ] {
        bus.subscribe(kind, commit_and_schedule);
    }
}

fn commit_and_schedule(ctx: &AppContext, event: &Event) -> Result<()> {
    let Some(sync) = Synchronizer::open(ctx)? else {
        return Ok(());
    };
    let committed = sync.commit_changes()?;
    if committed > 0 {
        tracing::debug!(event = %event.kind(), commits = committed, "Committed site changes");
        sync.schedule_push()?;
    }
    Ok(())
}
