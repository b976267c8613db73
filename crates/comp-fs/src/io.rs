//! Atomic I/O operations with file locking

use std::fs::{self, OpenOptions};
use std::io::Write;

use fs2::FileExt;

use crate::{Error, NormalizedPath, Result};

/// Write content atomically to a file with locking.
///
/// Uses write-to-temp-then-rename so readers never observe a partial
/// manifest, lock or ignore file. Concurrent writers still race on the final
/// rename; the last writer wins.
pub fn write_atomic(path: &NormalizedPath, content: &[u8]) -> Result<()> {
    let native_path = path.to_native();

    if let Some(parent) = native_path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    // Temp file in the same directory keeps the rename on one filesystem
    let temp_name = format!(
        ".{}.{}.tmp",
        native_path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default(),
        std::process::id()
    );
    let temp_path = native_path.with_file_name(&temp_name);

    let mut temp_file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&temp_path)
        .map_err(|e| Error::io(&temp_path, e))?;

    temp_file.lock_exclusive().map_err(|_| Error::LockFailed {
        path: native_path.clone(),
    })?;

    if let Err(e) = temp_file.write_all(content).and_then(|_| temp_file.sync_all()) {
        let _ = fs::remove_file(&temp_path);
        return Err(Error::io(&temp_path, e));
    }

    temp_file.unlock().map_err(|_| Error::LockFailed {
        path: native_path.clone(),
    })?;

    fs::rename(&temp_path, &native_path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        Error::io(&native_path, e)
    })?;

    Ok(())
}

/// Read text content from a file.
pub fn read_text(path: &NormalizedPath) -> Result<String> {
    let native_path = path.to_native();
    fs::read_to_string(&native_path).map_err(|e| Error::io(&native_path, e))
}

/// Read text content, mapping a missing file to `None`.
pub fn read_text_optional(path: &NormalizedPath) -> Result<Option<String>> {
    match read_text(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Write text content to a file atomically.
pub fn write_text(path: &NormalizedPath, content: &str) -> Result<()> {
    write_atomic(path, content.as_bytes())
}

/// Copy `from` over `to` atomically, byte for byte.
pub fn copy_atomic(from: &NormalizedPath, to: &NormalizedPath) -> Result<()> {
    let native_from = from.to_native();
    let bytes = fs::read(&native_from).map_err(|e| Error::io(&native_from, e))?;
    write_atomic(to, &bytes)
}

/// Read at most `limit` bytes from the start of a file as lossy UTF-8.
///
/// Header scanning only ever needs the first few kilobytes of a file.
pub fn read_head(path: &NormalizedPath, limit: usize) -> Result<String> {
    use std::io::Read;

    let native_path = path.to_native();
    let file = fs::File::open(&native_path).map_err(|e| Error::io(&native_path, e))?;
    let mut buf = Vec::with_capacity(limit.min(64 * 1024));
    file.take(limit as u64)
        .read_to_end(&mut buf)
        .map_err(|e| Error::io(&native_path, e))?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn write_atomic_creates_parent_and_leaves_no_temp() {
        let dir = tempdir().unwrap();
        let path = NormalizedPath::new(dir.path()).join("nested/file.json");

        write_atomic(&path, b"{}").unwrap();

        assert_eq!(read_text(&path).unwrap(), "{}");
        let leftovers: Vec<_> = fs::read_dir(dir.path().join("nested"))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn read_text_optional_missing_is_none() {
        let dir = tempdir().unwrap();
        let path = NormalizedPath::new(dir.path()).join("absent.txt");
        assert!(read_text_optional(&path).unwrap().is_none());
    }

    #[test]
    fn copy_atomic_is_byte_identical() {
        let dir = tempdir().unwrap();
        let from = NormalizedPath::new(dir.path()).join("a.json");
        let to = NormalizedPath::new(dir.path()).join("b.json");
        write_atomic(&from, "{\n    \"a\": \"é/ü\"\n}\n".as_bytes()).unwrap();
        write_atomic(&to, b"old").unwrap();

        copy_atomic(&from, &to).unwrap();

        assert_eq!(fs::read(from.to_native()).unwrap(), fs::read(to.to_native()).unwrap());
    }

    #[test]
    fn read_head_truncates() {
        let dir = tempdir().unwrap();
        let path = NormalizedPath::new(dir.path()).join("big.php");
        write_text(&path, &"x".repeat(100)).unwrap();
        assert_eq!(read_head(&path, 10).unwrap().len(), 10);
    }
}
