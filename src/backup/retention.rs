//! Retention policy
//!
//! Obsolete artifacts are chosen before a new artifact is written, so that
//! once it lands exactly `retention` artifacts remain. Deleting them is the
//! caller's job and only happens after the new artifact is committed.

use crate::error::{BackupError, BackupResult};

use super::catalog::ArtifactRecord;

/// Select the artifacts to delete once a new one has been written
///
/// `records` must be ordered oldest first. The newest `retention - 1`
/// records are kept; everything older is returned, oldest first.
///
/// # Errors
///
/// Returns `InvalidRetention` if `retention < 1`.
pub fn select_obsolete(
    records: &[ArtifactRecord],
    retention: i64,
) -> BackupResult<Vec<ArtifactRecord>> {
    if retention < 1 {
        return Err(BackupError::InvalidRetention(retention));
    }

    let keep = usize::try_from(retention - 1).unwrap_or(usize::MAX);
    let obsolete = records.len().saturating_sub(keep);
    Ok(records[..obsolete].to_vec())
}
