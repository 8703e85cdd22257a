//! Advisory locking of the live database file
//!
//! The lock is taken once, non-blocking. Contention is an expected outcome
//! and is reported as [`LockAttempt::Contended`] rather than as an error.

use std::fs::{File, TryLockError};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{BackupError, BackupResult};

/// Result of a single non-blocking lock attempt
#[derive(Debug)]
pub enum LockAttempt {
    /// The lock is held until the [`SourceLock`] is dropped
    Acquired(SourceLock),
    /// Another handle holds a conflicting lock
    Contended,
}

/// An exclusive advisory lock on an open source file
#[derive(Debug)]
pub struct SourceLock {
    file: File,
    path: PathBuf,
}

impl SourceLock {
    /// Open `path` for reading and try to lock it exclusively without blocking
    ///
    /// # Errors
    ///
    /// Returns `SourceUnavailable` if the file cannot be opened and `Io` for
    /// lock failures other than contention.
    pub fn try_acquire(path: &Path) -> BackupResult<LockAttempt> {
        let file = File::open(path).map_err(|e| BackupError::source_unavailable(path, e))?;

        match file.try_lock() {
            Ok(()) => {
                debug!("Locked {}", path.display());
                Ok(LockAttempt::Acquired(Self {
                    file,
                    path: path.to_path_buf(),
                }))
            }
            Err(TryLockError::WouldBlock) => {
                debug!("Lock on {} is held elsewhere", path.display());
                Ok(LockAttempt::Contended)
            }
            Err(TryLockError::Error(e)) => Err(BackupError::Io(format!(
                "Failed to lock {}: {}",
                path.display(),
                e
            ))),
        }
    }

    /// The locked file handle, positioned at the start of the file
    pub fn file(&self) -> &File {
        &self.file
    }

    /// Path of the locked file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for SourceLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}
