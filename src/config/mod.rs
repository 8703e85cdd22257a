//! Configuration module for sqlite-backup
//!
//! This module provides configuration management including:
//! - YAML profile loading with per-name backup settings
//! - Environment variable expansion and profile-relative path resolution

pub mod paths;
pub mod profile;

pub use profile::{BackupConfig, Profile};
