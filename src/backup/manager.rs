//! Backup orchestration
//!
//! One backup run for one logical name goes through these steps:
//!
//! 1. List existing artifacts and honour the minimum interval
//! 2. Pick obsolete artifacts against the pre-write catalog
//! 3. Stage the new artifact at `<final>.tmp`
//! 4. Write it with one of three strategies:
//!    - `Plain`: snapshot straight into the staging file (compression off)
//!    - `Direct`: lock the live file and compress it as-is (no WAL present)
//!    - `Snapshot`: snapshot to a scratch file, then compress that
//! 5. Promote the staging file, then delete the obsolete artifacts
//!
//! Any failure before promotion leaves neither a partial artifact nor a
//! pruned catalog behind.

use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use tracing::{debug, info, warn};

use crate::config::paths::with_suffix;
use crate::config::BackupConfig;
use crate::display::progress::{PhaseProgress, ProgressReporter};
use crate::error::{BackupError, BackupResult};
use crate::storage::compression::CompressionPipeline;
use crate::storage::lock::{LockAttempt, SourceLock};
use crate::storage::snapshot::SnapshotProducer;
use crate::storage::staging::{stage, ScratchPath};

use super::catalog::{artifact_file_name, list_artifacts, ArtifactRecord};
use super::retention::select_obsolete;

/// Suffix of the scratch snapshot used by the `Snapshot` strategy
const SNAPSHOT_SCRATCH_SUFFIX: &str = "-snapshot";

/// How the artifact was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupStrategy {
    /// Snapshot only, no compression
    Plain,
    /// Live file compressed directly under an advisory lock
    Direct,
    /// Snapshot to a scratch file, then compressed
    Snapshot,
}

impl fmt::Display for BackupStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain => write!(f, "snapshot"),
            Self::Direct => write!(f, "direct compression"),
            Self::Snapshot => write!(f, "snapshot + compression"),
        }
    }
}

/// Why the direct path was not taken
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    /// Another handle holds the advisory lock
    LockUnavailable,
    /// A write-ahead log sits next to the source
    WalPresent,
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LockUnavailable => write!(f, "source is locked"),
            Self::WalPresent => write!(f, "write-ahead log present"),
        }
    }
}

/// Outcome of the fast-path check
#[derive(Debug)]
pub enum FastPathDecision {
    /// Compress the live file; the lock is held until this value is dropped
    Direct(SourceLock),
    /// Take the snapshot route
    Fallback(FallbackReason),
}

/// Decide whether the live file can be compressed directly
///
/// Takes one non-blocking lock attempt on `source`. The direct path is only
/// safe when the lock is held and no `-wal` sidecar exists, since a WAL means
/// the main file alone is not a consistent database.
///
/// # Errors
///
/// Returns `SourceUnavailable` if the source cannot be opened.
pub fn decide_fast_path(source: &Path) -> BackupResult<FastPathDecision> {
    let lock = match SourceLock::try_acquire(source)? {
        LockAttempt::Acquired(lock) => lock,
        LockAttempt::Contended => {
            return Ok(FastPathDecision::Fallback(FallbackReason::LockUnavailable))
        }
    };

    if with_suffix(source, "-wal").exists() {
        return Ok(FastPathDecision::Fallback(FallbackReason::WalPresent));
    }

    Ok(FastPathDecision::Direct(lock))
}

/// Runtime options for a backup run
#[derive(Debug, Clone, Copy)]
pub struct BackupOptions {
    /// Progress bar factory
    pub progress: ProgressReporter,
    /// Compute and report the plan without touching the filesystem
    pub dry_run: bool,
}

impl Default for BackupOptions {
    fn default() -> Self {
        Self {
            progress: ProgressReporter::hidden(),
            dry_run: false,
        }
    }
}

/// What a backup run would do
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupPlan {
    /// Final path of the new artifact
    pub artifact: PathBuf,
    /// Artifacts deleted once the new one is committed
    pub obsolete: Vec<ArtifactRecord>,
}

/// Result of a completed backup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupReport {
    /// Path of the committed artifact
    pub artifact: PathBuf,
    /// Strategy that produced it
    pub strategy: BackupStrategy,
    /// Obsolete artifacts that were deleted
    pub pruned: Vec<PathBuf>,
    /// Obsolete artifacts that could not be deleted, with the reason
    pub prune_failures: Vec<(PathBuf, String)>,
}

/// Result of one backup run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupOutcome {
    /// The newest artifact is younger than the configured interval
    Skipped {
        /// Newest existing artifact
        latest: ArtifactRecord,
        /// Its age in seconds
        age_seconds: i64,
    },
    /// Dry run: nothing was written
    Planned(BackupPlan),
    /// A new artifact was committed
    Completed(BackupReport),
}

/// Runs backups for one logical name
pub struct BackupManager<'a> {
    name: &'a str,
    config: &'a BackupConfig,
    options: BackupOptions,
}

impl<'a> BackupManager<'a> {
    /// Create a new BackupManager
    pub fn new(name: &'a str, config: &'a BackupConfig, options: BackupOptions) -> Self {
        Self {
            name,
            config,
            options,
        }
    }

    /// Run a backup stamped with the current local time
    pub fn run(&self) -> BackupResult<BackupOutcome> {
        self.run_at(Local::now().naive_local())
    }

    /// Run a backup stamped with `now`
    pub fn run_at(&self, now: NaiveDateTime) -> BackupResult<BackupOutcome> {
        self.config.validate()?;

        let records = list_artifacts(self.name, &self.config.destination_dir)?;

        if let Some(outcome) = self.check_interval(&records, now) {
            return Ok(outcome);
        }

        let plan = BackupPlan {
            artifact: self.config.destination_dir.join(artifact_file_name(
                self.name,
                &now,
                self.config.compression_enabled,
            )),
            obsolete: select_obsolete(&records, self.config.retention_count)?,
        };

        if self.options.dry_run {
            return Ok(BackupOutcome::Planned(plan));
        }

        fs::create_dir_all(&self.config.destination_dir).map_err(|e| {
            BackupError::Io(format!(
                "Failed to create backup directory {}: {}",
                self.config.destination_dir.display(),
                e
            ))
        })?;

        let strategy = stage(&plan.artifact, |temp| self.write_artifact(temp))?;
        if !plan.artifact.exists() {
            return Err(BackupError::Io(format!(
                "No artifact was produced for {}",
                self.name
            )));
        }
        info!(
            "Backup of {} committed to {} ({})",
            self.name,
            plan.artifact.display(),
            strategy
        );

        let (pruned, prune_failures) = prune(&plan.obsolete);

        Ok(BackupOutcome::Completed(BackupReport {
            artifact: plan.artifact,
            strategy,
            pruned,
            prune_failures,
        }))
    }

    fn check_interval(
        &self,
        records: &[ArtifactRecord],
        now: NaiveDateTime,
    ) -> Option<BackupOutcome> {
        let interval = self.config.min_interval_seconds?;
        let latest = records.last()?;
        let created = latest.created_at()?;

        let age_seconds = now.signed_duration_since(created).num_seconds();
        if age_seconds < i64::try_from(interval).unwrap_or(i64::MAX) {
            info!(
                "Skipping {}: newest backup is {}s old, interval is {}s",
                self.name, age_seconds, interval
            );
            return Some(BackupOutcome::Skipped {
                latest: latest.clone(),
                age_seconds,
            });
        }
        None
    }

    /// Fill `temp` with the artifact and report the strategy used
    fn write_artifact(&self, temp: &Path) -> BackupResult<BackupStrategy> {
        if !self.config.compression_enabled {
            self.snapshot_into(temp)?;
            return Ok(BackupStrategy::Plain);
        }

        match decide_fast_path(&self.config.source_path)? {
            FastPathDecision::Direct(lock) => {
                debug!("Compressing locked source {}", lock.path().display());
                self.compress_into(lock.file(), temp)?;
                if temp.exists() {
                    return Ok(BackupStrategy::Direct);
                }
            }
            FastPathDecision::Fallback(reason) => {
                info!("Falling back to snapshot for {}: {}", self.name, reason);
            }
        }

        let scratch = ScratchPath::new(with_suffix(temp, SNAPSHOT_SCRATCH_SUFFIX));
        self.snapshot_into(scratch.path())?;
        let snapshot = File::open(scratch.path())?;
        self.compress_into(&snapshot, temp)?;

        Ok(BackupStrategy::Snapshot)
    }

    fn snapshot_into(&self, dest: &Path) -> BackupResult<()> {
        let phase = self.options.progress.pages("Snapshotting");
        let mut on_progress = |done: u64, total: u64| phase.update(done, total);

        let result = SnapshotProducer::new(self.config.page_batch_size).snapshot(
            &self.config.source_path,
            dest,
            Some(&mut on_progress),
        );
        finish_phase(&phase, result)
    }

    fn compress_into(&self, source: &File, dest: &Path) -> BackupResult<()> {
        let total = source.metadata()?.len();
        let phase = self.options.progress.bytes("Compressing", total);
        let mut on_progress = |n: u64| phase.advance(n);

        let pipeline = CompressionPipeline::new(self.config.compression_level);
        let result = write_compressed(&pipeline, source, dest, &mut on_progress);
        finish_phase(&phase, result)
    }
}

/// Compress `source` into a new file at `dest` and sync it to disk
fn write_compressed(
    pipeline: &CompressionPipeline,
    source: &File,
    dest: &Path,
    on_progress: &mut dyn FnMut(u64),
) -> BackupResult<()> {
    let out = OpenOptions::new().write(true).create_new(true).open(dest)?;
    let mut writer = BufWriter::new(out);
    pipeline.compress(BufReader::new(source), &mut writer, Some(on_progress))?;

    let out = writer
        .into_inner()
        .map_err(|e| BackupError::Io(format!("Failed to flush {}: {}", dest.display(), e)))?;
    out.sync_all()?;
    Ok(())
}

fn finish_phase<T>(phase: &PhaseProgress, result: BackupResult<T>) -> BackupResult<T> {
    match &result {
        Ok(_) => phase.finish(),
        Err(_) => phase.abandon(),
    }
    result
}

/// Delete obsolete artifacts, collecting failures instead of aborting
fn prune(obsolete: &[ArtifactRecord]) -> (Vec<PathBuf>, Vec<(PathBuf, String)>) {
    let mut pruned = Vec::new();
    let mut failures = Vec::new();

    for record in obsolete {
        match fs::remove_file(&record.path) {
            Ok(()) => {
                debug!("Pruned {}", record.path.display());
                pruned.push(record.path.clone());
            }
            Err(e) => {
                warn!("Failed to prune {}: {}", record.path.display(), e);
                failures.push((record.path.clone(), e.to_string()));
            }
        }
    }

    (pruned, failures)
}
