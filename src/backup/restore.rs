//! Backup restoration
//!
//! Restores the newest artifact of a logical name over the live database.
//! The artifact is first materialized at `<db>-restoring.tmp`; only then are
//! the sidecars and the old database removed and the temp file renamed into
//! place.
//!
//! The swap is not atomic: if the process dies after the old database is
//! removed but before the rename, only `<db>-restoring.tmp` is left.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::paths::with_suffix;
use crate::config::BackupConfig;
use crate::display::progress::ProgressReporter;
use crate::error::{BackupError, BackupResult};
use crate::storage::compression::{CompressionPipeline, ProgressReader};
use crate::storage::staging::{remove_if_exists, ScratchPath};

use super::catalog::{list_artifacts, ArtifactRecord};

/// Suffix of the temporary replacement database
pub const RESTORE_SUFFIX: &str = "-restoring.tmp";

/// Sidecars removed before the swap, in removal order
const SIDECAR_SUFFIXES: [&str; 2] = ["-shm", "-wal"];

/// Result of a restore operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreReport {
    /// Artifact that was restored
    pub artifact: ArtifactRecord,
    /// Live database path that now holds the restored content
    pub database: PathBuf,
    /// Sidecar files that existed and were removed
    pub removed_sidecars: Vec<PathBuf>,
    /// Whether a previous database file was replaced
    pub replaced_existing: bool,
}

/// Handles restoring from backups
pub struct RestoreManager<'a> {
    name: &'a str,
    config: &'a BackupConfig,
    progress: ProgressReporter,
}

impl<'a> RestoreManager<'a> {
    /// Create a new RestoreManager
    pub fn new(name: &'a str, config: &'a BackupConfig, progress: ProgressReporter) -> Self {
        Self {
            name,
            config,
            progress,
        }
    }

    /// Restore the newest artifact over the live database
    ///
    /// # Errors
    ///
    /// Returns `NoBackupsFound` if the catalog is empty, `Codec` if a
    /// compressed artifact is corrupt, and `Io` for filesystem failures.
    pub fn restore(&self) -> BackupResult<RestoreReport> {
        let records = list_artifacts(self.name, &self.config.destination_dir)?;
        let latest = records
            .last()
            .cloned()
            .ok_or_else(|| BackupError::NoBackupsFound(self.name.to_string()))?;

        let database = self.config.source_path.clone();
        let temp = ScratchPath::new(with_suffix(&database, RESTORE_SUFFIX));

        info!(
            "Restoring {} from {}",
            database.display(),
            latest.path.display()
        );
        self.materialize(&latest, temp.path())?;

        // From here on the temp file is the only copy being promoted; it must
        // survive a failed swap.
        let temp_path = temp.keep();

        let mut removed_sidecars = Vec::new();
        for suffix in SIDECAR_SUFFIXES {
            let sidecar = with_suffix(&database, suffix);
            if remove_if_exists(&sidecar)? {
                debug!("Removed sidecar {}", sidecar.display());
                removed_sidecars.push(sidecar);
            }
        }
        let replaced_existing = remove_if_exists(&database)?;

        fs::rename(&temp_path, &database).map_err(|e| {
            BackupError::Io(format!(
                "Failed to move {} into place at {}: {}",
                temp_path.display(),
                database.display(),
                e
            ))
        })?;

        Ok(RestoreReport {
            artifact: latest,
            database,
            removed_sidecars,
            replaced_existing,
        })
    }

    /// Write the plain database content of `record` to a new file at `dest`
    fn materialize(&self, record: &ArtifactRecord, dest: &Path) -> BackupResult<()> {
        let source = File::open(&record.path).map_err(|e| {
            BackupError::Io(format!("Failed to open {}: {}", record.path.display(), e))
        })?;
        let total = source.metadata()?.len();

        let out = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(dest)
            .map_err(|e| BackupError::Io(format!("Failed to create {}: {}", dest.display(), e)))?;
        let mut writer = BufWriter::new(out);

        let phase = self.progress.bytes("Restoring", total);
        let mut on_progress = |n: u64| phase.advance(n);

        let result = if record.is_compressed {
            CompressionPipeline::default()
                .decompress(BufReader::new(source), &mut writer, Some(&mut on_progress))
                .map(|_| ())
        } else {
            let mut reader = ProgressReader::new(source, Some(&mut on_progress));
            io::copy(&mut reader, &mut writer)
                .and_then(|_| writer.flush())
                .map_err(|e| BackupError::Io(format!("Failed to copy backup: {}", e)))
        };

        match result {
            Ok(()) => phase.finish(),
            Err(e) => {
                phase.abandon();
                return Err(e);
            }
        }

        let out = writer
            .into_inner()
            .map_err(|e| BackupError::Io(format!("Failed to flush {}: {}", dest.display(), e)))?;
        out.sync_all()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::catalog::artifact_file_name;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn setup() -> (TempDir, BackupConfig) {
        let temp_dir = TempDir::new().unwrap();
        let backups = temp_dir.path().join("backups");
        fs::create_dir_all(&backups).unwrap();
        let config = BackupConfig::new(temp_dir.path().join("live.sqlite3"), backups);
        (temp_dir, config)
    }

    fn write_artifact(config: &BackupConfig, second: u32, content: &[u8], compressed: bool) -> PathBuf {
        let created = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, second)
            .unwrap();
        let path = config
            .destination_dir
            .join(artifact_file_name("main", &created, compressed));
        if compressed {
            let mut out = File::create(&path).unwrap();
            CompressionPipeline::default()
                .compress(content, &mut out, None)
                .unwrap();
        } else {
            fs::write(&path, content).unwrap();
        }
        path
    }

    #[test]
    fn test_restore_compressed_removes_sidecars() {
        let (_temp, config) = setup();
        let artifact = write_artifact(&config, 1, b"restored database bytes", true);

        fs::write(&config.source_path, b"old live db").unwrap();
        fs::write(with_suffix(&config.source_path, "-wal"), b"wal").unwrap();
        fs::write(with_suffix(&config.source_path, "-shm"), b"shm").unwrap();

        let report = RestoreManager::new("main", &config, ProgressReporter::hidden())
            .restore()
            .unwrap();

        assert_eq!(report.artifact.path, artifact);
        assert!(report.replaced_existing);
        assert_eq!(report.removed_sidecars.len(), 2);
        assert_eq!(
            fs::read(&config.source_path).unwrap(),
            b"restored database bytes"
        );
        assert!(!with_suffix(&config.source_path, "-wal").exists());
        assert!(!with_suffix(&config.source_path, "-shm").exists());
        assert!(!with_suffix(&config.source_path, RESTORE_SUFFIX).exists());
    }

    #[test]
    fn test_restore_picks_newest_plain_artifact() {
        let (_temp, config) = setup();
        write_artifact(&config, 1, b"older", false);
        write_artifact(&config, 2, b"newer", false);

        let report = RestoreManager::new("main", &config, ProgressReporter::hidden())
            .restore()
            .unwrap();

        assert!(!report.replaced_existing);
        assert!(report.removed_sidecars.is_empty());
        assert_eq!(fs::read(&config.source_path).unwrap(), b"newer");
    }

    #[test]
    fn test_restore_without_backups() {
        let (_temp, config) = setup();
        let err = RestoreManager::new("main", &config, ProgressReporter::hidden())
            .restore()
            .unwrap_err();
        assert!(matches!(err, BackupError::NoBackupsFound(_)));
    }

    #[test]
    fn test_corrupt_artifact_leaves_live_db_untouched() {
        let (_temp, config) = setup();
        let path = config.destination_dir.join("main.20240101000000.sqlite3.zst");
        fs::write(&path, b"not a zstd stream").unwrap();
        fs::write(&config.source_path, b"live").unwrap();
        fs::write(with_suffix(&config.source_path, "-wal"), b"wal").unwrap();

        let err = RestoreManager::new("main", &config, ProgressReporter::hidden())
            .restore()
            .unwrap_err();

        assert!(matches!(err, BackupError::Codec(_)));
        assert_eq!(fs::read(&config.source_path).unwrap(), b"live");
        assert!(with_suffix(&config.source_path, "-wal").exists());
        assert!(!with_suffix(&config.source_path, RESTORE_SUFFIX).exists());
    }
}
