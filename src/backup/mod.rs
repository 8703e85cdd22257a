//! Backup and restore of SQLite databases
//!
//! # Architecture
//!
//! - `catalog`: discovers existing artifacts from the destination directory
//! - `retention`: decides which artifacts a new backup makes obsolete
//! - `BackupManager`: produces a new artifact and prunes old ones
//! - `RestoreManager`: puts the newest artifact back over the live database
//!
//! # Artifact Format
//!
//! Artifacts live in the entry's destination directory as
//! `{name}.{YYYYMMDDHHMMSS}.sqlite3`, or `.sqlite3.zst` when compressed with
//! zstd. The timestamp is local time with second granularity.
//!
//! # Example
//!
//! ```rust,ignore
//! use sqlite_backup::backup::{BackupManager, BackupOptions, RestoreManager};
//! use sqlite_backup::config::Profile;
//! use sqlite_backup::display::ProgressReporter;
//!
//! let profile = Profile::load(Path::new("backup.yaml"))?;
//! for (name, config) in profile.select(None)? {
//!     BackupManager::new(name, config?, BackupOptions::default()).run()?;
//! }
//!
//! let config = profile.get("main").unwrap()?;
//! RestoreManager::new("main", config, ProgressReporter::hidden()).restore()?;
//! ```

pub mod catalog;
mod manager;
pub mod retention;
mod restore;

pub use catalog::{list_artifacts, ArtifactRecord};
pub use manager::{
    decide_fast_path, BackupManager, BackupOptions, BackupOutcome, BackupPlan, BackupReport,
    BackupStrategy, FallbackReason, FastPathDecision,
};
pub use restore::{RestoreManager, RestoreReport, RESTORE_SUFFIX};
pub use retention::select_obsolete;
