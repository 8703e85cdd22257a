//! CLI command handlers
//!
//! This module contains the implementation of CLI commands, bridging the
//! clap argument parsing with the backup layer. Every command runs against
//! one named profile entry or, when no name is given, every entry in file
//! order.

pub mod backup;
pub mod list;
pub mod restore;

pub use backup::{handle_backup_command, BackupArgs};
pub use list::{handle_list_command, ListArgs};
pub use restore::{handle_restore_command, RestoreArgs};

use tracing::error;

use crate::config::profile::EntryConfig;
use crate::config::BackupConfig;
use crate::error::{BackupError, BackupResult};

/// Per-name results of a batch run
#[derive(Debug, Default)]
pub struct BatchSummary {
    /// Names whose task finished
    pub succeeded: Vec<String>,
    /// Names whose task failed, with the error
    pub failed: Vec<(String, BackupError)>,
}

impl BatchSummary {
    /// Whether every task finished
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Run `task` for each entry, continuing past failures
///
/// Prints `<label>: <name>` before each entry. An entry whose config is
/// invalid counts as a failure of that name only.
pub fn run_batch<F>(
    label: &str,
    entries: Vec<(&str, EntryConfig<'_>)>,
    mut task: F,
) -> BatchSummary
where
    F: FnMut(&str, &BackupConfig) -> BackupResult<()>,
{
    let mut summary = BatchSummary::default();

    for (name, config) in entries {
        println!("{}: {}", label, name);
        match config.and_then(|config| task(name, config)) {
            Ok(()) => summary.succeeded.push(name.to_string()),
            Err(e) => {
                error!("Task for {} failed: {}", name, e);
                eprintln!("  Error: {}", e);
                summary.failed.push((name.to_string(), e));
            }
        }
    }

    summary
}
