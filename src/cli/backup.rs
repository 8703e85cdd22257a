//! Backup CLI command
//!
//! Implements `backup --profile <path> [name] [--quiet] [--dry-run]`.

use std::path::PathBuf;

use clap::Args;

use crate::backup::{BackupManager, BackupOptions, BackupOutcome};
use crate::config::Profile;
use crate::display::artifact::format_age;
use crate::display::progress::ProgressReporter;
use crate::error::BackupResult;

use super::{run_batch, BatchSummary};

/// Arguments of the `backup` command
#[derive(Args, Debug)]
pub struct BackupArgs {
    /// Profile file describing the databases to back up
    #[arg(short, long, env = "SQLITE_BACKUP_PROFILE")]
    pub profile: PathBuf,

    /// Only back up this profile entry
    pub name: Option<String>,

    /// Hide progress bars
    #[arg(short, long)]
    pub quiet: bool,

    /// Print the intended actions without touching the filesystem
    #[arg(long)]
    pub dry_run: bool,
}

/// Handle the backup command
///
/// Fails only when the profile cannot be used at all; per-entry failures are
/// reported in the returned summary.
pub fn handle_backup_command(profile: &Profile, args: &BackupArgs) -> BackupResult<BatchSummary> {
    let entries = profile.select(args.name.as_deref())?;
    let options = BackupOptions {
        progress: if args.quiet {
            ProgressReporter::hidden()
        } else {
            ProgressReporter::visible()
        },
        dry_run: args.dry_run,
    };

    Ok(run_batch("Backup task", entries, |name, config| {
        let outcome = BackupManager::new(name, config, options).run()?;
        print_outcome(&outcome);
        Ok(())
    }))
}

fn print_outcome(outcome: &BackupOutcome) {
    match outcome {
        BackupOutcome::Skipped {
            latest,
            age_seconds,
        } => {
            println!(
                "  Skipped by interval: {} is {} old",
                latest.file_name(),
                format_age(chrono::Duration::seconds(*age_seconds))
            );
        }

        BackupOutcome::Planned(plan) => {
            println!("  Would create: {}", plan.artifact.display());
            if plan.obsolete.is_empty() {
                println!("  Would remove: nothing");
            }
            for record in &plan.obsolete {
                println!("  Would remove: {}", record.path.display());
            }
        }

        BackupOutcome::Completed(report) => {
            println!(
                "  Created: {} ({})",
                report.artifact.display(),
                report.strategy
            );
            for path in &report.pruned {
                println!("  Removed: {}", path.display());
            }
            for (path, reason) in &report.prune_failures {
                eprintln!("  Failed to remove {}: {}", path.display(), reason);
            }
        }
    }
}
