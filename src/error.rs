//! Custom error types for sqlite-backup
//!
//! This module defines the error hierarchy for backup and restore operations
//! using thiserror for ergonomic error definitions.

use std::path::PathBuf;

use thiserror::Error;

/// The main error type for backup and restore operations
#[derive(Error, Debug)]
pub enum BackupError {
    /// Configuration-related errors (bad profile, bad name, bad values)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Retention count below one
    #[error("Invalid retention {0}: retention must be greater than 0")]
    InvalidRetention(i64),

    /// An artifact (or its staging file) already exists at the target path
    #[error("Backup artifact already exists: {}", .0.display())]
    ArtifactExists(PathBuf),

    /// The source database could not be opened
    #[error("Source database unavailable: {}: {reason}", .path.display())]
    SourceUnavailable { path: PathBuf, reason: String },

    /// The snapshot destination is already occupied by a file
    #[error("Snapshot destination already exists: {}", .0.display())]
    DestinationConflict(PathBuf),

    /// Compression or decompression stream fault
    #[error("Codec error: {0}")]
    Codec(String),

    /// Restore requested but the catalog is empty
    #[error("No backups found for {0}")]
    NoBackupsFound(String),

    /// Entity not found errors
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: &'static str,
        identifier: String,
    },

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// SQLite engine errors
    #[error("SQLite error: {0}")]
    Sqlite(String),
}

impl BackupError {
    /// Create a "not found" error for a profile entry
    pub fn entry_not_found(name: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: "Profile entry",
            identifier: name.into(),
        }
    }

    /// Create a source-unavailable error from any displayable cause
    pub fn source_unavailable(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::SourceUnavailable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a configuration error
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_) | Self::InvalidRetention(_))
    }
}

impl From<std::io::Error> for BackupError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<rusqlite::Error> for BackupError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Sqlite(err.to_string())
    }
}

/// Result type alias for backup operations
pub type BackupResult<T> = Result<T, BackupError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BackupError::Config("test error".into());
        assert_eq!(err.to_string(), "Configuration error: test error");
    }

    #[test]
    fn test_entry_not_found() {
        let err = BackupError::entry_not_found("main");
        assert_eq!(err.to_string(), "Profile entry not found: main");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_invalid_retention_is_config() {
        let err = BackupError::InvalidRetention(0);
        assert!(err.is_config());
        assert!(err.to_string().contains("retention must be greater than 0"));
    }

    #[test]
    fn test_artifact_exists_display() {
        let err = BackupError::ArtifactExists(PathBuf::from("/backups/db.20240101000000.sqlite3"));
        assert_eq!(
            err.to_string(),
            "Backup artifact already exists: /backups/db.20240101000000.sqlite3"
        );
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: BackupError = io_err.into();
        assert!(matches!(err, BackupError::Io(_)));
    }
}
