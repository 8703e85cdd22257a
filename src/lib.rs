//! sqlite-backup - Rolling backups of SQLite databases
//!
//! This library backs up live SQLite databases into timestamped artifacts,
//! optionally zstd-compressed, keeps a bounded number of them per logical
//! name, and restores the newest one on demand.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Profile loading and path resolution
//! - `error`: Custom error types
//! - `storage`: Staging, locking, snapshot and compression primitives
//! - `backup`: Artifact catalog, retention, backup and restore
//! - `display`: Listing output and progress bars
//! - `cli`: Command handlers for the binary
//!
//! # Example
//!
//! ```rust,ignore
//! use sqlite_backup::backup::{BackupManager, BackupOptions};
//! use sqlite_backup::config::Profile;
//!
//! let profile = Profile::load(Path::new("backup.yaml"))?;
//! let config = profile.get("main").unwrap()?;
//! let outcome = BackupManager::new("main", config, BackupOptions::default()).run()?;
//! ```

pub mod backup;
pub mod cli;
pub mod config;
pub mod display;
pub mod error;
pub mod storage;

pub use error::{BackupError, BackupResult};
