//! Artifact catalog
//!
//! The destination directory listing is the catalog: there is no separate
//! index. Artifacts are named `{name}.{YYYYMMDDHHMMSS}.sqlite3` or
//! `{name}.{YYYYMMDDHHMMSS}.sqlite3.zst` and ordered by their timestamp.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

use crate::error::{BackupError, BackupResult};

/// Timestamp format embedded in artifact names (local time)
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Extension of uncompressed artifacts
pub const PLAIN_SUFFIX: &str = ".sqlite3";

/// Extension of compressed artifacts
pub const COMPRESSED_SUFFIX: &str = ".sqlite3.zst";

const TIMESTAMP_LEN: usize = 14;

/// One backup file discovered in the destination directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRecord {
    /// Full path to the artifact
    pub path: PathBuf,
    /// Fixed-width `YYYYMMDDHHMMSS` timestamp taken from the file name
    pub timestamp: String,
    /// Whether the artifact is zstd-compressed
    pub is_compressed: bool,
}

impl ArtifactRecord {
    /// Parse the embedded timestamp
    pub fn created_at(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(&self.timestamp, TIMESTAMP_FORMAT).ok()
    }

    /// File name of the artifact
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Build the file name of a new artifact
pub fn artifact_file_name(name: &str, created: &NaiveDateTime, compressed: bool) -> String {
    let suffix = if compressed {
        COMPRESSED_SUFFIX
    } else {
        PLAIN_SUFFIX
    };
    format!("{}.{}{}", name, created.format(TIMESTAMP_FORMAT), suffix)
}

/// Parse an artifact file name belonging to `name`
///
/// Returns `(timestamp, is_compressed)` or `None` if the file is not an
/// artifact of this logical name.
pub fn parse_artifact_name(name: &str, file_name: &str) -> Option<(String, bool)> {
    let rest = file_name.strip_prefix(name)?.strip_prefix('.')?;

    let (timestamp, compressed) = if let Some(ts) = rest.strip_suffix(COMPRESSED_SUFFIX) {
        (ts, true)
    } else if let Some(ts) = rest.strip_suffix(PLAIN_SUFFIX) {
        (ts, false)
    } else {
        return None;
    };

    if timestamp.len() != TIMESTAMP_LEN || !timestamp.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    Some((timestamp.to_string(), compressed))
}

/// List the artifacts of `name` in `directory`, oldest first
///
/// A missing directory is an empty catalog. Records with equal timestamps
/// keep directory-listing order, which is platform dependent.
///
/// # Errors
///
/// Returns a `Config` error if `name` is empty, and `Io` if the directory
/// cannot be read.
pub fn list_artifacts(name: &str, directory: &Path) -> BackupResult<Vec<ArtifactRecord>> {
    if name.is_empty() {
        return Err(BackupError::Config(
            "Logical name must not be empty".to_string(),
        ));
    }

    let entries = match fs::read_dir(directory) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(BackupError::Io(format!(
                "Failed to read backup directory {}: {}",
                directory.display(),
                e
            )))
        }
    };

    let mut records = Vec::new();
    for entry in entries {
        let entry = entry
            .map_err(|e| BackupError::Io(format!("Failed to read directory entry: {}", e)))?;

        let file_name = entry.file_name();
        let Some(file_name) = file_name.to_str() else {
            continue;
        };

        if let Some((timestamp, is_compressed)) = parse_artifact_name(name, file_name) {
            records.push(ArtifactRecord {
                path: entry.path(),
                timestamp,
                is_compressed,
            });
        }
    }

    records.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
    Ok(records)
}
