use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use sqlite_backup::cli::{
    handle_backup_command, handle_list_command, handle_restore_command, BackupArgs, BatchSummary,
    ListArgs, RestoreArgs,
};
use sqlite_backup::config::Profile;
use sqlite_backup::BackupError;

#[derive(Parser)]
#[command(
    name = "sqlite-backup",
    version,
    about = "Rolling backups of live SQLite databases",
    long_about = "sqlite-backup snapshots live SQLite databases into timestamped, \
                  optionally zstd-compressed artifacts, keeps a fixed number of them \
                  per profile entry, and restores the newest one on demand."
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Back up one or every profile entry
    Backup(BackupArgs),

    /// Restore the newest backup of one or every profile entry
    Restore(RestoreArgs),

    /// List existing backups
    List(ListArgs),
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let (profile_path, name) = match &cli.command {
        Commands::Backup(args) => (&args.profile, args.name.as_deref()),
        Commands::Restore(args) => (&args.profile, args.name.as_deref()),
        Commands::List(args) => (&args.profile, args.name.as_deref()),
    };

    let profile = Profile::load(profile_path)
        .with_context(|| format!("Failed to load profile {}", profile_path.display()))?;

    let result = match &cli.command {
        Commands::Backup(args) => handle_backup_command(&profile, args),
        Commands::Restore(args) => handle_restore_command(&profile, args),
        Commands::List(args) => handle_list_command(&profile, args),
    };

    match result {
        Ok(summary) => Ok(exit_code(&summary)),
        Err(e @ BackupError::NotFound { .. }) => {
            eprintln!(
                "{} is not in {}",
                name.unwrap_or_default(),
                profile.path().display()
            );
            tracing::debug!("{}", e);
            Ok(ExitCode::FAILURE)
        }
        Err(e) => Err(e.into()),
    }
}

fn exit_code(summary: &BatchSummary) -> ExitCode {
    if summary.is_success() {
        return ExitCode::SUCCESS;
    }

    eprintln!();
    eprintln!("{} task(s) failed:", summary.failed.len());
    for (name, e) in &summary.failed {
        eprintln!("  {}: {}", name, e);
    }
    ExitCode::FAILURE
}
