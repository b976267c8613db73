//! Composition reconciliation engine
//!
//! Keeps a WordPress site's plugins and themes in line with a remotely
//! supplied `composer.json` manifest:
//!
//! - **Manifest Store**: read, write, back up, revert and fingerprint the manifest
//! - **Remote Sync Client**: ask the remote authority for a replacement manifest
//! - **Package Installer**: drive Composer against the manifest with a revert guard
//! - **Local Package Cache**: project the lock file into managed plugin/theme records
//! - **Activation Controller**: activate cached plugins in isolation, select a theme
//! - **Version Control Synchronizer**: commit site changes and push with accept-mine merging
//! - **Orchestrator**: the four-step update sequence with optional revert and retry
//!
//! # Architecture
//!
//! ```text
//!                      comp-cli
//!                          |
//!                      comp-core
//!                          |
//!          +---------------+---------------+
//!          |               |               |
//!       comp-fs       comp-blocks       comp-git
//! ```
//!
//! Every component receives an [`AppContext`] built once at process start;
//! there is no global state.

pub mod activation;
pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod installer;
pub mod jobs;
pub mod manifest;
pub mod options;
pub mod orchestrator;
pub mod remote;
pub mod vcs;

pub use activation::{ActivationController, ActivationReport, SiteHost, WpCli};
pub use cache::{CacheDiff, PackageCache, PackageRecord, RefreshOutcome, RefreshReport};
pub use config::Settings;
pub use context::AppContext;
pub use error::{Error, Result};
pub use events::{Event, EventBus, EventKind};
pub use installer::{ComposerCli, ComposerRunner, InstallOptions, InstallReport, Installer, Operation};
pub use jobs::{Job, JobKind, JobQueue};
pub use manifest::{LockState, Manifest, ManifestStore};
pub use options::OptionStore;
pub use orchestrator::{Orchestrator, SequenceOptions, SequenceReport, Step};
pub use remote::{RemoteClient, UpdateResult};
pub use vcs::{ChangeUnit, ModuleKind, Synchronizer};
