//! Manifest persistence: read, write, backup and revert

use comp_fs::{NormalizedPath, io};
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};

use super::Manifest;
use crate::{Error, Result};

/// Reads and writes the live manifest and its single backup copy.
///
/// Writes are atomic (temp file then rename) but not serialized against each
/// other: concurrent writers race and the last one wins.
#[derive(Debug, Clone)]
pub struct ManifestStore {
    path: NormalizedPath,
    backup: NormalizedPath,
}

impl ManifestStore {
    pub fn new(path: NormalizedPath, backup: NormalizedPath) -> Self {
        Self { path, backup }
    }

    pub fn path(&self) -> &NormalizedPath {
        &self.path
    }

    pub fn backup_path(&self) -> &NormalizedPath {
        &self.backup
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Parse the live manifest.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] when the file is absent
    /// - [`Error::ParseError`] with line and column for malformed JSON
    pub fn read(&self) -> Result<Manifest> {
        read_manifest(&self.path)
    }

    /// Serialize `manifest` over the live file.
    ///
    /// Output is pretty-printed with four-space indentation, slashes and
    /// non-ASCII characters unescaped, and a trailing newline.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WriteError`] on filesystem failure.
    pub fn write(&self, manifest: &Manifest) -> Result<()> {
        let content = to_pretty_json(manifest)?;
        io::write_atomic(&self.path, content.as_bytes()).map_err(|source| Error::WriteError {
            path: self.path.to_native(),
            source,
        })?;
        tracing::debug!(path = %self.path, "Manifest written");
        Ok(())
    }

    /// Copy the live manifest to the backup location, replacing any earlier backup.
    pub fn backup(&self) -> Result<&NormalizedPath> {
        if !self.exists() {
            return Err(Error::NotFound {
                path: self.path.to_native(),
            });
        }
        io::copy_atomic(&self.path, &self.backup).map_err(|source| Error::WriteError {
            path: self.backup.to_native(),
            source,
        })?;
        tracing::info!(backup = %self.backup, "Manifest backed up");
        Ok(&self.backup)
    }

    /// Copy the backup over the live manifest.
    ///
    /// Returns `false` when there is no backup to restore.
    pub fn revert(&self) -> Result<bool> {
        if !self.backup.is_file() {
            tracing::warn!(backup = %self.backup, "No manifest backup to revert to");
            return Ok(false);
        }
        io::copy_atomic(&self.backup, &self.path).map_err(|source| Error::WriteError {
            path: self.path.to_native(),
            source,
        })?;
        tracing::info!(path = %self.path, backup = %self.backup, "Manifest reverted from backup");
        Ok(true)
    }
}

/// Parse a manifest file.
pub fn read_manifest(path: &NormalizedPath) -> Result<Manifest> {
    let content = io::read_text(path).map_err(|e| Error::from_read(path.to_native(), e))?;
    Manifest::from_json(&content).map_err(|e| Error::parse(path.to_native(), &e))
}

/// Pretty JSON with four-space indentation and a trailing newline.
pub fn to_pretty_json<T: Serialize>(value: &T) -> Result<String> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer)?;
    buf.push(b'\n');
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
