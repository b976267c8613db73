//! In-process typed event bus
//!
//! Publishers enqueue events while they work; [`AppContext::dispatch_events`]
//! later delivers them to the handlers registered at startup. Handlers
//! receive the context, so they can reach any component without globals.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;

use crate::cache::RefreshReport;
use crate::context::AppContext;
use crate::Result;

/// Something that happened to the site.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A new manifest from the remote authority was written.
    ManifestUpdated,
    /// The package cache was rebuilt from the lock file.
    CacheRefreshed(RefreshReport),
    PluginActivated { plugin: String },
    PluginDeactivated { plugin: String },
    /// Packages were installed, updated or deleted outside a cache refresh.
    PackagesChanged { reason: String },
    /// A git merge/push cycle finished.
    GitCycleComplete { pushed: bool },
}

/// Discriminant used to subscribe to an [`Event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ManifestUpdated,
    CacheRefreshed,
    PluginActivated,
    PluginDeactivated,
    PackagesChanged,
    GitCycleComplete,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::ManifestUpdated => EventKind::ManifestUpdated,
            Self::CacheRefreshed(_) => EventKind::CacheRefreshed,
            Self::PluginActivated { .. } => EventKind::PluginActivated,
            Self::PluginDeactivated { .. } => EventKind::PluginDeactivated,
            Self::PackagesChanged { .. } => EventKind::PackagesChanged,
            Self::GitCycleComplete { .. } => EventKind::GitCycleComplete,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ManifestUpdated => "manifest-updated",
            Self::CacheRefreshed => "cache-refreshed",
            Self::PluginActivated => "plugin-activated",
            Self::PluginDeactivated => "plugin-deactivated",
            Self::PackagesChanged => "packages-changed",
            Self::GitCycleComplete => "git-cycle-complete",
        };
        write!(f, "{name}")
    }
}

/// Event handler registered for one [`EventKind`].
pub type Handler = Box<dyn Fn(&AppContext, &Event) -> Result<()>>;

/// Queue of published events plus the handlers that consume them.
#[derive(Default)]
pub struct EventBus {
    handlers: Vec<(EventKind, Handler)>,
    pending: RefCell<VecDeque<Event>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for events of `kind`. Handlers run in registration order.
    pub fn subscribe<F>(&mut self, kind: EventKind, handler: F)
    where
        F: Fn(&AppContext, &Event) -> Result<()> + 'static,
    {
        self.handlers.push((kind, Box::new(handler)));
    }

    /// Queue an event for the next dispatch.
    pub fn publish(&self, event: Event) {
        tracing::debug!(event = %event.kind(), "Event published");
        self.pending.borrow_mut().push_back(event);
    }

    pub(crate) fn next_pending(&self) -> Option<Event> {
        self.pending.borrow_mut().pop_front()
    }

    pub(crate) fn handlers_for(&self, kind: EventKind) -> impl Iterator<Item = &Handler> {
        self.handlers
            .iter()
            .filter(move |(k, _)| *k == kind)
            .map(|(_, h)| h)
    }

    /// Events published but not yet dispatched.
    pub fn pending(&self) -> Vec<Event> {
        self.pending.borrow().iter().cloned().collect()
    }

    pub fn subscriber_count(&self) -> usize {
        self.handlers.len()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("handlers", &self.handlers.len())
            .field("pending", &self.pending.borrow().len())
            .finish()
    }
}
