//! File-level block synchronization.

use comp_fs::{NormalizedPath, io};

use crate::Result;
use crate::writer::upsert_block;

/// Make the block `id` in the file at `path` contain exactly `entries`.
///
/// A missing file is treated as empty. Returns `true` when the file content
/// changed and was written, `false` when it was already up to date.
pub fn sync_block_in_file(path: &NormalizedPath, id: &str, entries: &[String]) -> Result<bool> {
    let current = io::read_text_optional(path)?.unwrap_or_default();
    let updated = upsert_block(&current, id, &entries.join("\n"))?;

    if updated == current {
        tracing::debug!(path = %path, block = %id, "Managed block already up to date");
        return Ok(false);
    }

    io::write_text(path, &updated)?;
    tracing::info!(path = %path, block = %id, entries = entries.len(), "Managed block rewritten");
    Ok(true)
}
