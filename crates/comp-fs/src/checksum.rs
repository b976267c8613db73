//! Checksum utilities
//!
//! `sha256:<hex>` is the canonical format for fingerprints produced by this
//! workspace. Plain md5 hex digests exist only to interoperate with the
//! `content-hash` Composer writes into lock files.

use sha2::{Digest, Sha256};

/// Prefix for all sha256 checksums produced by this module
const PREFIX: &str = "sha256:";

/// Compute the SHA-256 checksum of string content.
///
/// Returns a string in the canonical format `"sha256:<hex>"`.
pub fn compute_content_checksum(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{}{:x}", PREFIX, hasher.finalize())
}

/// Lowercase md5 hex digest, as used by Composer lock files.
pub fn md5_hex(content: &[u8]) -> String {
    format!("{:x}", md5::compute(content))
}
