//! Filesystem primitives for the composition agent
//!
//! Provides normalized path handling, atomic writes, checksums, advisory
//! locking and site layout resolution shared by every other crate.

pub mod checksum;
pub mod config;
pub mod constants;
pub mod error;
pub mod io;
pub mod layout;
pub mod lock;
pub mod path;

pub use config::{ConfigFormat, ConfigStore};
pub use constants::SitePath;
pub use error::{Error, Result};
pub use layout::SiteLayout;
pub use lock::FileLock;
pub use path::NormalizedPath;
