//! Manifest Store
//!
//! The manifest (`composer.json`) is the desired package set pulled from the
//! remote authority. It is overwritten wholesale, never patched, and backed up
//! before every remote-driven rewrite.

mod baseline;
mod lock;
mod model;
mod store;

pub use baseline::{SPEC_VERSION, baseline_manifest};
pub use lock::{Author, LockState, LockedPackage, content_hash};
pub use model::{
    COMPOSITION_KEY, Extra, FINGERPRINT_KEY, Manifest, REQUIRED_KEY, RequiredPackage,
    SPEC_VERSION_KEY,
};
pub use store::{ManifestStore, read_manifest, to_pretty_json};
