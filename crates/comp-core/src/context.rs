//! Application context
//!
//! Built once per process and passed by reference to every component.

use comp_fs::{NormalizedPath, SiteLayout};

use crate::config::Settings;
use crate::events::{Event, EventBus};
use crate::jobs::JobQueue;
use crate::manifest::ManifestStore;
use crate::options::OptionStore;
use crate::vcs;
use crate::Result;

/// Events dispatched per call before giving up on a publish loop.
const MAX_DISPATCH: usize = 256;

/// Settings, site paths and shared stores for one managed site.
#[derive(Debug)]
pub struct AppContext {
    settings: Settings,
    layout: SiteLayout,
    options: OptionStore,
    queue: JobQueue,
    events: EventBus,
}

impl AppContext {
    /// Context for `root` with the given settings and no event subscribers.
    pub fn new(root: impl Into<NormalizedPath>, settings: Settings) -> Self {
        let root = root.into();
        let layout = settings.layout(&root);
        Self {
            options: OptionStore::new(layout.options_file()),
            queue: JobQueue::new(layout.queue_file()),
            events: EventBus::new(),
            layout,
            settings,
        }
    }

    /// Discover the site at `root`, load its settings and register the
    /// standard subscribers.
    ///
    /// # Errors
    ///
    /// Returns an error if `root` is not a directory or the settings file is
    /// malformed.
    pub fn open(root: impl AsRef<std::path::Path>) -> Result<Self> {
        let discovered = SiteLayout::discover(root)?;
        let settings = Settings::load(&discovered.config_file())?;
        Ok(Self::new(discovered.root().clone(), settings).with_standard_subscribers())
    }

    /// Register the version-control synchronizer's handlers.
    pub fn with_standard_subscribers(mut self) -> Self {
        if self.settings.git.enabled {
            vcs::subscribe(&mut self.events);
        }
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn layout(&self) -> &SiteLayout {
        &self.layout
    }

    pub fn options(&self) -> &OptionStore {
        &self.options
    }

    pub fn queue(&self) -> &JobQueue {
        &self.queue
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut EventBus {
        &mut self.events
    }

    pub fn manifest_store(&self) -> ManifestStore {
        ManifestStore::new(
            self.layout.manifest().clone(),
            self.layout.backup().clone(),
        )
    }

    pub fn publish(&self, event: Event) {
        self.events.publish(event);
    }

    /// Deliver queued events to their handlers. Handler errors are logged.
    ///
    /// Returns the number of events delivered.
    pub fn dispatch_events(&self) -> usize {
        let mut delivered = 0;
        while let Some(event) = self.events.next_pending() {
            if delivered == MAX_DISPATCH {
                tracing::error!("Event dispatch limit reached, dropping remaining events");
                while self.events.next_pending().is_some() {}
                break;
            }
            let kind = event.kind();
            for handler in self.events.handlers_for(kind) {
                if let Err(e) = handler(self, &event) {
                    tracing::warn!(event = %kind, error = %e, "Event handler failed");
                }
            }
            delivered += 1;
        }
        delivered
    }
}
