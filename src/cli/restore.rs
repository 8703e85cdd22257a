//! Restore CLI command
//!
//! Implements `restore --profile <path> [name]`.

use std::path::PathBuf;

use clap::Args;

use crate::backup::RestoreManager;
use crate::config::Profile;
use crate::display::progress::ProgressReporter;
use crate::error::BackupResult;

use super::{run_batch, BatchSummary};

/// Arguments of the `restore` command
#[derive(Args, Debug)]
pub struct RestoreArgs {
    /// Profile file describing the databases to restore
    #[arg(short, long, env = "SQLITE_BACKUP_PROFILE")]
    pub profile: PathBuf,

    /// Only restore this profile entry
    pub name: Option<String>,

    /// Hide progress bars
    #[arg(short, long)]
    pub quiet: bool,
}

/// Handle the restore command
pub fn handle_restore_command(
    profile: &Profile,
    args: &RestoreArgs,
) -> BackupResult<BatchSummary> {
    let entries = profile.select(args.name.as_deref())?;
    let progress = if args.quiet {
        ProgressReporter::hidden()
    } else {
        ProgressReporter::visible()
    };

    Ok(run_batch("Restore task", entries, |name, config| {
        let report = RestoreManager::new(name, config, progress).restore()?;

        println!("  Restored: {}", report.artifact.file_name());
        println!("  Database: {}", report.database.display());
        for sidecar in &report.removed_sidecars {
            println!("  Removed: {}", sidecar.display());
        }
        Ok(())
    }))
}
