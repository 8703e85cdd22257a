//! Backup profile loading
//!
//! A profile is a YAML mapping from logical name to backup settings:
//!
//! ```yaml
//! main:
//!   db_path: $HOME/app/data.sqlite3
//!   dest_dir: ./backups
//!   retention: 7
//!   interval: 86400
//!   compression: true
//! ```
//!
//! Entries keep the order they have in the file, so batch runs process
//! them top to bottom.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::paths::resolve_path;
use crate::error::{BackupError, BackupResult};

/// Default number of artifacts kept per logical name
pub const DEFAULT_RETENTION: i64 = 1;

/// Default zstd compression level
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 3;

/// Default number of pages copied per snapshot step
pub const DEFAULT_PAGE_BATCH_SIZE: i32 = 8192;

/// Raw profile entry as written in the YAML file
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawEntry {
    db_path: String,
    dest_dir: String,
    #[serde(default)]
    retention: Option<i64>,
    #[serde(default)]
    interval: Option<u64>,
    #[serde(default)]
    compression: Option<bool>,
    #[serde(default)]
    compression_level: Option<i32>,
    #[serde(default)]
    page_batch_size: Option<i32>,
}

/// Backup settings for one logical name, with paths already resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupConfig {
    /// Absolute path of the live database
    pub source_path: PathBuf,
    /// Absolute path of the directory holding the artifacts
    pub destination_dir: PathBuf,
    /// Number of artifacts to keep after a successful backup (>= 1)
    pub retention_count: i64,
    /// Minimum age of the newest artifact before a new one is taken
    pub min_interval_seconds: Option<u64>,
    /// Whether artifacts are zstd-compressed
    pub compression_enabled: bool,
    /// zstd compression level
    pub compression_level: i32,
    /// Pages copied per snapshot step (<= 0 copies everything in one step)
    pub page_batch_size: i32,
}

impl BackupConfig {
    /// Create a config with default options for the given paths
    pub fn new(source_path: impl Into<PathBuf>, destination_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_path: source_path.into(),
            destination_dir: destination_dir.into(),
            retention_count: DEFAULT_RETENTION,
            min_interval_seconds: None,
            compression_enabled: true,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            page_batch_size: DEFAULT_PAGE_BATCH_SIZE,
        }
    }

    /// Builder-style setter for the retention count
    pub fn with_retention(mut self, retention_count: i64) -> Self {
        self.retention_count = retention_count;
        self
    }

    /// Builder-style setter for the minimum interval
    pub fn with_interval(mut self, seconds: u64) -> Self {
        self.min_interval_seconds = Some(seconds);
        self
    }

    /// Builder-style setter for compression
    pub fn with_compression(mut self, enabled: bool) -> Self {
        self.compression_enabled = enabled;
        self
    }

    /// Check the invariants of a resolved config
    pub fn validate(&self) -> BackupResult<()> {
        if self.retention_count < 1 {
            return Err(BackupError::InvalidRetention(self.retention_count));
        }
        if !self.source_path.is_absolute() {
            return Err(BackupError::Config(format!(
                "db_path is not absolute: {}",
                self.source_path.display()
            )));
        }
        if !self.destination_dir.is_absolute() {
            return Err(BackupError::Config(format!(
                "dest_dir is not absolute: {}",
                self.destination_dir.display()
            )));
        }
        Ok(())
    }

    fn from_raw(raw: RawEntry, base_dir: &Path) -> Self {
        Self {
            source_path: resolve_path(base_dir, &raw.db_path),
            destination_dir: resolve_path(base_dir, &raw.dest_dir),
            retention_count: raw.retention.unwrap_or(DEFAULT_RETENTION),
            min_interval_seconds: raw.interval,
            compression_enabled: raw.compression.unwrap_or(true),
            compression_level: raw.compression_level.unwrap_or(DEFAULT_COMPRESSION_LEVEL),
            page_batch_size: raw.page_batch_size.unwrap_or(DEFAULT_PAGE_BATCH_SIZE),
        }
    }
}

/// Outcome of resolving one profile entry: its config, or why it is unusable
pub type EntryConfig<'a> = BackupResult<&'a BackupConfig>;

/// A loaded profile: ordered logical names with their resolved configs
///
/// An entry that fails to parse or validate is kept with its error message,
/// so it fails on its own when selected instead of spoiling the whole file.
#[derive(Debug, Clone)]
pub struct Profile {
    path: PathBuf,
    entries: Vec<(String, Result<BackupConfig, String>)>,
}

impl Profile {
    /// Load and preprocess a profile file
    ///
    /// # Errors
    ///
    /// Returns a `Config` error if the file is not a YAML mapping of
    /// non-empty string names. Problems inside a single entry are reported
    /// when that entry is selected.
    pub fn load(path: &Path) -> BackupResult<Self> {
        let path = std::path::absolute(path).map_err(|e| {
            BackupError::Io(format!("Failed to resolve profile {}: {}", path.display(), e))
        })?;

        let contents = std::fs::read_to_string(&path).map_err(|e| {
            BackupError::Io(format!("Failed to read profile {}: {}", path.display(), e))
        })?;

        Self::from_yaml(&contents, &path)
    }

    /// Parse a profile from YAML text, resolving paths against `profile_path`'s directory
    pub fn from_yaml(contents: &str, profile_path: &Path) -> BackupResult<Self> {
        let base_dir = profile_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        if contents.trim().is_empty() {
            return Ok(Self {
                path: profile_path.to_path_buf(),
                entries: Vec::new(),
            });
        }

        let mapping: Option<serde_yaml::Mapping> = serde_yaml::from_str(contents).map_err(|e| {
            BackupError::Config(format!(
                "Failed to parse profile {}: {}",
                profile_path.display(),
                e
            ))
        })?;

        let mut entries = Vec::new();
        for (key, value) in mapping.unwrap_or_default() {
            let name = match key {
                serde_yaml::Value::String(name) => name,
                other => {
                    return Err(BackupError::Config(format!(
                        "Profile keys must be strings, found {:?}",
                        other
                    )))
                }
            };
            if name.is_empty() {
                return Err(BackupError::Config("Profile entry name is empty".into()));
            }

            let config = parse_entry(&name, value, &base_dir);
            entries.push((name, config));
        }

        Ok(Self {
            path: profile_path.to_path_buf(),
            entries,
        })
    }

    /// Absolute path of the profile file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Entry names in file order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Look up a single entry by name
    ///
    /// Returns `None` if the name is absent, and a `Config` error if the
    /// entry is present but invalid.
    pub fn get(&self, name: &str) -> Option<EntryConfig<'_>> {
        self.entries
            .iter()
            .find(|(entry_name, _)| entry_name == name)
            .map(|(_, config)| entry_config(config))
    }

    /// Select either the named entry or every entry, in file order
    ///
    /// # Errors
    ///
    /// Returns a `NotFound` error when `name` is given but absent.
    pub fn select(&self, name: Option<&str>) -> BackupResult<Vec<(&str, EntryConfig<'_>)>> {
        let selected: Vec<(&str, EntryConfig<'_>)> = self
            .entries
            .iter()
            .filter(|(entry_name, _)| name.is_none_or(|wanted| entry_name == wanted))
            .map(|(entry_name, config)| (entry_name.as_str(), entry_config(config)))
            .collect();

        match name {
            Some(wanted) if selected.is_empty() => Err(BackupError::entry_not_found(wanted)),
            _ => Ok(selected),
        }
    }
}

fn entry_config(config: &Result<BackupConfig, String>) -> EntryConfig<'_> {
    config
        .as_ref()
        .map_err(|reason| BackupError::Config(reason.clone()))
}

/// Deserialize and validate one entry, keeping failures as a message
fn parse_entry(
    name: &str,
    value: serde_yaml::Value,
    base_dir: &Path,
) -> Result<BackupConfig, String> {
    let raw: RawEntry = serde_yaml::from_value(value)
        .map_err(|e| format!("Invalid profile entry '{}': {}", name, e))?;

    let config = BackupConfig::from_raw(raw, base_dir);
    config.validate().map_err(|e| match e {
        BackupError::InvalidRetention(n) => format!(
            "Invalid profile entry '{}': retention must be greater than 0, got {}",
            name, n
        ),
        other => format!("Invalid profile entry '{}': {}", name, other),
    })?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PROFILE: &str = r#"
main:
  db_path: data/main.sqlite3
  dest_dir: /srv/backups
  retention: 3
  interval: 3600
archive:
  db_path: /var/lib/archive.sqlite3
  dest_dir: ../archive-backups
  compression: false
"#;

    #[test]
    fn test_parse_profile_in_order() {
        let profile = Profile::from_yaml(PROFILE, Path::new("/etc/sqlite-backup/profile.yaml"))
            .unwrap();

        let names: Vec<&str> = profile.names().collect();
        assert_eq!(names, vec!["main", "archive"]);
    }

    #[test]
    fn test_paths_resolved_against_profile_dir() {
        let profile = Profile::from_yaml(PROFILE, Path::new("/etc/sqlite-backup/profile.yaml"))
            .unwrap();

        let main = profile.get("main").unwrap().unwrap();
        assert_eq!(
            main.source_path,
            PathBuf::from("/etc/sqlite-backup/data/main.sqlite3")
        );
        assert_eq!(main.destination_dir, PathBuf::from("/srv/backups"));
        assert_eq!(main.retention_count, 3);
        assert_eq!(main.min_interval_seconds, Some(3600));
        assert!(main.compression_enabled);

        let archive = profile.get("archive").unwrap().unwrap();
        assert_eq!(archive.destination_dir, PathBuf::from("/etc/archive-backups"));
        assert_eq!(archive.retention_count, DEFAULT_RETENTION);
        assert_eq!(archive.min_interval_seconds, None);
        assert!(!archive.compression_enabled);
        assert_eq!(archive.page_batch_size, DEFAULT_PAGE_BATCH_SIZE);
    }

    #[test]
    fn test_zero_retention_is_rejected() {
        let yaml = "main:\n  db_path: /a.db\n  dest_dir: /b\n  retention: 0\n";
        let profile = Profile::from_yaml(yaml, Path::new("/p.yaml")).unwrap();
        let err = profile.get("main").unwrap().unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("retention must be greater than 0"));
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let yaml = "main:\n  db_path: /a.db\n  dest_dir: /b\n  retain: 2\n";
        let profile = Profile::from_yaml(yaml, Path::new("/p.yaml")).unwrap();
        assert!(profile.get("main").unwrap().unwrap_err().is_config());
    }

    #[test]
    fn test_invalid_entry_does_not_hide_valid_ones() {
        let yaml = "broken:\n  db_path: x.db\n  dest_dir: b\n  retention: 0\n\
                    negative:\n  db_path: y.db\n  dest_dir: b\n  interval: -5\n\
                    good:\n  db_path: good.db\n  dest_dir: backups\n";
        let profile = Profile::from_yaml(yaml, Path::new("/srv/p.yaml")).unwrap();

        let good = profile.select(Some("good")).unwrap();
        assert_eq!(good.len(), 1);
        assert_eq!(good[0].0, "good");
        assert_eq!(
            good[0].1.as_ref().unwrap().source_path,
            PathBuf::from("/srv/good.db")
        );

        let all = profile.select(None).unwrap();
        let names: Vec<&str> = all.iter().map(|(name, _)| *name).collect();
        assert_eq!(names, vec!["broken", "negative", "good"]);
        assert!(all[0].1.is_err());
        assert!(all[1].1.is_err());
        assert!(all[2].1.is_ok());
    }

    #[test]
    fn test_non_string_key_rejects_profile() {
        let yaml = "1:\n  db_path: /a.db\n  dest_dir: /b\n";
        assert!(Profile::from_yaml(yaml, Path::new("/p.yaml"))
            .unwrap_err()
            .is_config());
    }

    #[test]
    fn test_empty_profile() {
        let profile = Profile::from_yaml("", Path::new("/p.yaml")).unwrap();
        assert_eq!(profile.names().count(), 0);
    }

    #[test]
    fn test_select_missing_entry() {
        let profile = Profile::from_yaml(PROFILE, Path::new("/p.yaml")).unwrap();
        let err = profile.select(Some("nope")).unwrap_err();
        assert!(err.is_not_found());

        assert_eq!(profile.select(None).unwrap().len(), 2);
        assert_eq!(profile.select(Some("archive")).unwrap()[0].0, "archive");
    }

    #[test]
    fn test_load_from_disk() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("profile.yaml");
        std::fs::write(&path, PROFILE).unwrap();

        let profile = Profile::load(&path).unwrap();
        assert!(profile.path().is_absolute());
        assert_eq!(
            profile.get("main").unwrap().unwrap().source_path,
            temp_dir.path().join("data").join("main.sqlite3")
        );
    }
}
