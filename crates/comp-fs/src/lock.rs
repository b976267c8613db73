//! Advisory exclusive file lock with a bounded wait

use std::fs::{self, File, OpenOptions};
use std::thread;
use std::time::{Duration, Instant};

use fs2::FileExt;

use crate::{Error, NormalizedPath, Result};

/// Interval between lock attempts while waiting.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// An exclusive advisory lock held on a lock file.
///
/// The lock is released when the value is dropped. Acquisition never blocks
/// indefinitely: callers supply the maximum wait.
#[derive(Debug)]
pub struct FileLock {
    file: File,
    path: NormalizedPath,
}

impl FileLock {
    /// Try to take the lock, polling every `poll` until `timeout` elapses.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LockTimeout`] when the lock is still held elsewhere
    /// after `timeout`, or an I/O error if the lock file cannot be opened.
    pub fn acquire(path: &NormalizedPath, timeout: Duration, poll: Duration) -> Result<Self> {
        let native = path.to_native();
        if let Some(parent) = native.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&native)
            .map_err(|e| Error::io(&native, e))?;

        let started = Instant::now();
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => {
                    tracing::debug!(lock = %path, waited_ms = started.elapsed().as_millis() as u64, "Lock acquired");
                    return Ok(Self {
                        file,
                        path: path.clone(),
                    });
                }
                Err(_) if started.elapsed() < timeout => thread::sleep(poll),
                Err(_) => {
                    return Err(Error::LockTimeout {
                        path: native,
                        waited: started.elapsed(),
                    });
                }
            }
        }
    }

    /// Path of the underlying lock file.
    pub fn path(&self) -> &NormalizedPath {
        &self.path
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if let Err(e) = self.file.unlock() {
            tracing::warn!(lock = %self.path, error = %e, "Failed to release lock");
        }
    }
}
