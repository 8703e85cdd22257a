//! Staged file writes with atomic promotion
//!
//! Artifacts are never written at their final path. The writer fills a
//! sibling `<final>.tmp` file, and only a fully written temp file is renamed
//! over to the final path. The temp file is removed on every exit path, so a
//! failed or interrupted write leaves nothing behind.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{BackupError, BackupResult};

/// Suffix appended to a final path to form its staging path
pub const STAGING_SUFFIX: &str = ".tmp";

/// A path that is removed (if present) when the guard is dropped
#[derive(Debug)]
pub struct ScratchPath {
    path: PathBuf,
    armed: bool,
}

impl ScratchPath {
    /// Take ownership of `path` for cleanup
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            armed: true,
        }
    }

    /// The guarded path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stop guarding the path and hand it back to the caller
    pub fn keep(mut self) -> PathBuf {
        self.armed = false;
        std::mem::take(&mut self.path)
    }
}

impl Drop for ScratchPath {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed scratch file {}", self.path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove scratch file {}: {}", self.path.display(), e),
        }
    }
}

/// Build the staging path for a final path (`<final>.tmp`)
pub fn staging_path(final_path: &Path) -> PathBuf {
    let mut raw: OsString = final_path.as_os_str().to_owned();
    raw.push(STAGING_SUFFIX);
    PathBuf::from(raw)
}

/// An open staging scope over `<final>.tmp`
///
/// Dropping the scope without calling [`StagingScope::commit`] discards the
/// temp file.
#[derive(Debug)]
pub struct StagingScope {
    final_path: PathBuf,
    temp: ScratchPath,
}

impl StagingScope {
    /// Open a staging scope for `final_path`
    ///
    /// # Errors
    ///
    /// Returns `ArtifactExists` if the final path or its staging path is
    /// already present.
    pub fn open(final_path: impl Into<PathBuf>) -> BackupResult<Self> {
        let final_path = final_path.into();
        if final_path.exists() {
            return Err(BackupError::ArtifactExists(final_path));
        }

        let temp_path = staging_path(&final_path);
        if temp_path.exists() {
            return Err(BackupError::ArtifactExists(temp_path));
        }

        Ok(Self {
            final_path,
            temp: ScratchPath::new(temp_path),
        })
    }

    /// Path the caller must write to
    pub fn temp_path(&self) -> &Path {
        self.temp.path()
    }

    /// Promote the temp file to the final path
    ///
    /// Returns `false` if nothing was written to the temp path, in which
    /// case the final path is left absent.
    pub fn commit(self) -> BackupResult<bool> {
        let temp_path = self.temp.path();
        if !temp_path.exists() {
            return Ok(false);
        }

        fs::rename(temp_path, &self.final_path).map_err(|e| {
            BackupError::Io(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                self.final_path.display(),
                e
            ))
        })?;

        debug!("Committed {}", self.final_path.display());
        Ok(true)
    }
}

/// Run `write` against a staging path for `final_path`
///
/// On success the staged file is renamed to `final_path`. If `write` returns
/// an error the staged file is removed and the error is propagated.
pub fn stage<T, F>(final_path: &Path, write: F) -> BackupResult<T>
where
    F: FnOnce(&Path) -> BackupResult<T>,
{
    let scope = StagingScope::open(final_path)?;
    let value = write(scope.temp_path())?;
    scope.commit()?;
    Ok(value)
}

/// Remove a file, treating "already gone" as success
///
/// Returns whether a file was actually removed.
pub fn remove_if_exists(path: &Path) -> BackupResult<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(BackupError::Io(format!(
            "Failed to remove {}: {}",
            path.display(),
            e
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_stage_success_promotes_file() {
        let temp_dir = TempDir::new().unwrap();
        let final_path = temp_dir.path().join("db.20240101000000.sqlite3");

        stage(&final_path, |tmp| {
            fs::write(tmp, b"complete artifact")?;
            Ok(())
        })
        .unwrap();

        assert_eq!(fs::read(&final_path).unwrap(), b"complete artifact");
        assert!(!staging_path(&final_path).exists());
    }

    #[test]
    fn test_stage_failure_leaves_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let final_path = temp_dir.path().join("db.20240101000000.sqlite3");

        let result: BackupResult<()> = stage(&final_path, |tmp| {
            fs::write(tmp, b"half written")?;
            Err(BackupError::Codec("stream broke".into()))
        });

        assert!(matches!(result, Err(BackupError::Codec(_))));
        assert!(!final_path.exists());
        assert!(!staging_path(&final_path).exists());
    }

    #[test]
    fn test_stage_without_write_creates_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let final_path = temp_dir.path().join("db.20240101000000.sqlite3");

        stage(&final_path, |_| Ok(())).unwrap();

        assert!(!final_path.exists());
        assert!(!staging_path(&final_path).exists());
    }

    #[test]
    fn test_stage_refuses_existing_artifact() {
        let temp_dir = TempDir::new().unwrap();
        let final_path = temp_dir.path().join("db.20240101000000.sqlite3");
        fs::write(&final_path, b"earlier backup").unwrap();

        let result = stage(&final_path, |tmp| {
            fs::write(tmp, b"new")?;
            Ok(())
        });

        assert!(matches!(result, Err(BackupError::ArtifactExists(_))));
        assert_eq!(fs::read(&final_path).unwrap(), b"earlier backup");
    }

    #[test]
    fn test_scope_dropped_without_commit() {
        let temp_dir = TempDir::new().unwrap();
        let final_path = temp_dir.path().join("out.sqlite3");

        let scope = StagingScope::open(&final_path).unwrap();
        fs::write(scope.temp_path(), b"partial").unwrap();
        let temp_path = scope.temp_path().to_path_buf();
        drop(scope);

        assert!(!temp_path.exists());
        assert!(!final_path.exists());
    }

    #[test]
    fn test_scratch_keep_disarms_cleanup() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("scratch");
        fs::write(&path, b"x").unwrap();

        let kept = ScratchPath::new(&path).keep();
        assert_eq!(kept, path);
        assert!(path.exists());

        drop(ScratchPath::new(&path));
        assert!(!path.exists());
    }

    #[test]
    fn test_remove_if_exists() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("gone");
        assert!(!remove_if_exists(&path).unwrap());
        fs::write(&path, b"x").unwrap();
        assert!(remove_if_exists(&path).unwrap());
        assert!(!path.exists());
    }
}
