//! Consistent snapshots of a live SQLite database
//!
//! Wraps SQLite's online backup API. The copy runs in batches of pages so
//! writers on the source are only blocked for one batch at a time; if a
//! source page changes mid-copy the engine restarts the copy, so the result
//! is always a consistent snapshot.

use std::path::Path;
use std::time::Duration;

use rusqlite::backup::{Backup, StepResult};
use rusqlite::{Connection, OpenFlags};
use tracing::debug;

use crate::error::{BackupError, BackupResult};

/// Pause between steps when the source is busy or locked
const BUSY_BACKOFF: Duration = Duration::from_millis(250);

/// Produces page-level snapshots of a source database
#[derive(Debug, Clone, Copy)]
pub struct SnapshotProducer {
    page_batch_size: i32,
}

impl SnapshotProducer {
    /// Create a producer that copies `page_batch_size` pages per step
    ///
    /// A value of zero or less copies the whole database in a single step.
    pub fn new(page_batch_size: i32) -> Self {
        Self { page_batch_size }
    }

    /// Pages passed to each backup step
    fn pages_per_step(&self) -> i32 {
        if self.page_batch_size > 0 {
            self.page_batch_size
        } else {
            -1
        }
    }

    /// Copy `source` into a new database at `dest`
    ///
    /// `on_progress` receives `(pages_processed, pages_total)` after every
    /// step.
    ///
    /// # Errors
    ///
    /// Returns `DestinationConflict` if `dest` already exists,
    /// `SourceUnavailable` if the source cannot be opened, and `Sqlite` for
    /// engine failures during the copy.
    pub fn snapshot(
        &self,
        source: &Path,
        dest: &Path,
        mut on_progress: Option<&mut dyn FnMut(u64, u64)>,
    ) -> BackupResult<()> {
        if dest.exists() {
            return Err(BackupError::DestinationConflict(dest.to_path_buf()));
        }

        let src = Connection::open_with_flags(
            source,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| BackupError::source_unavailable(source, e))?;

        let mut dst = Connection::open(dest)?;

        debug!(
            "Snapshotting {} -> {} ({} pages per step)",
            source.display(),
            dest.display(),
            self.pages_per_step()
        );

        let backup = Backup::new(&src, &mut dst)?;
        loop {
            let step = backup.step(self.pages_per_step())?;

            if let Some(callback) = on_progress.as_mut() {
                let progress = backup.progress();
                let total = progress.pagecount.max(0) as u64;
                let remaining = progress.remaining.max(0) as u64;
                callback(total.saturating_sub(remaining), total);
            }

            match step {
                StepResult::Done => break,
                StepResult::More => {}
                // Busy or Locked
                _ => std::thread::sleep(BUSY_BACKOFF),
            }
        }

        Ok(())
    }
}
