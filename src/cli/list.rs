//! List CLI command
//!
//! Implements `list --profile <path> [name]`.

use std::path::PathBuf;

use chrono::Local;
use clap::Args;

use crate::backup::list_artifacts;
use crate::config::Profile;
use crate::display::artifact::format_artifact_list;
use crate::error::BackupResult;

use super::{run_batch, BatchSummary};

/// Arguments of the `list` command
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Profile file describing the databases
    #[arg(short, long, env = "SQLITE_BACKUP_PROFILE")]
    pub profile: PathBuf,

    /// Only list this profile entry
    pub name: Option<String>,
}

/// Handle the list command
pub fn handle_list_command(profile: &Profile, args: &ListArgs) -> BackupResult<BatchSummary> {
    let entries = profile.select(args.name.as_deref())?;
    let now = Local::now().naive_local();

    Ok(run_batch("List task", entries, |name, config| {
        let records = list_artifacts(name, &config.destination_dir)?;
        println!("{}", format_artifact_list(&records, now));
        println!();
        Ok(())
    }))
}
