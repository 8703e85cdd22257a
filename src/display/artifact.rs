//! Artifact listing
//!
//! Formats the catalog of one logical name for terminal output.

use std::fs;

use chrono::{Duration, NaiveDateTime};

use crate::backup::ArtifactRecord;

/// Format the artifacts of one logical name, newest first
///
/// `records` are expected oldest first, as returned by the catalog.
pub fn format_artifact_list(records: &[ArtifactRecord], now: NaiveDateTime) -> String {
    if records.is_empty() {
        return "No backups found.".to_string();
    }

    let name_width = records
        .iter()
        .map(|r| r.file_name().len())
        .max()
        .unwrap_or(4)
        .max(4);

    let mut output = String::new();
    output.push_str(&format!(
        "{:<name_width$}  {:>10}  {:>6}  {}\n",
        "File",
        "Size",
        "Age",
        "Compressed",
        name_width = name_width,
    ));
    output.push_str(&format!(
        "{:-<name_width$}  {:->10}  {:->6}  {:-<10}\n",
        "",
        "",
        "",
        "",
        name_width = name_width,
    ));

    for record in records.iter().rev() {
        let size = fs::metadata(&record.path)
            .map(|m| format_size(m.len()))
            .unwrap_or_else(|_| "?".to_string());
        let age = record
            .created_at()
            .map(|created| format_age(now.signed_duration_since(created)))
            .unwrap_or_else(|| "?".to_string());

        output.push_str(&format!(
            "{:<name_width$}  {:>10}  {:>6}  {}\n",
            record.file_name(),
            size,
            age,
            if record.is_compressed { "yes" } else { "no" },
            name_width = name_width,
        ));
    }

    output.push_str(&format!("\nTotal: {} backup(s)", records.len()));
    output
}

/// Format an age in its largest whole unit
pub fn format_age(duration: Duration) -> String {
    let total_seconds = duration.num_seconds().max(0);

    if total_seconds < 60 {
        return format!("{}s", total_seconds);
    }

    let minutes = total_seconds / 60;
    if minutes < 60 {
        return format!("{}m", minutes);
    }

    let hours = minutes / 60;
    if hours < 24 {
        return format!("{}h", hours);
    }

    let days = hours / 24;
    if days < 30 {
        return format!("{}d", days);
    }

    format!("{}mo", days / 30)
}

/// Format a file size in human-readable form
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(5 * 1024 * 1024 + 512 * 1024), "5.5 MB");
        assert_eq!(format_size(3 * 1024 * 1024 * 1024), "3.0 GB");
    }

    #[test]
    fn test_format_age() {
        assert_eq!(format_age(Duration::seconds(42)), "42s");
        assert_eq!(format_age(Duration::minutes(5)), "5m");
        assert_eq!(format_age(Duration::hours(3)), "3h");
        assert_eq!(format_age(Duration::days(2)), "2d");
        assert_eq!(format_age(Duration::days(65)), "2mo");
        assert_eq!(format_age(Duration::seconds(-5)), "0s");
    }

    #[test]
    fn test_empty_list() {
        let now = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(format_artifact_list(&[], now), "No backups found.");
    }

    #[test]
    fn test_list_is_newest_first() {
        let temp_dir = TempDir::new().unwrap();
        let older = temp_dir.path().join("main.20240101000000.sqlite3");
        let newer = temp_dir.path().join("main.20240102000000.sqlite3.zst");
        fs::write(&older, vec![0u8; 2048]).unwrap();
        fs::write(&newer, b"zst").unwrap();

        let records = vec![
            ArtifactRecord {
                path: older,
                timestamp: "20240101000000".to_string(),
                is_compressed: false,
            },
            ArtifactRecord {
                path: newer,
                timestamp: "20240102000000".to_string(),
                is_compressed: true,
            },
        ];
        let now = NaiveDate::from_ymd_opt(2024, 1, 3)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();

        let output = format_artifact_list(&records, now);
        let newer_pos = output.find("main.20240102000000.sqlite3.zst").unwrap();
        let older_pos = output.find("main.20240101000000.sqlite3 ").unwrap();
        assert!(newer_pos < older_pos);
        assert!(output.contains("2.0 KB"));
        assert!(output.contains("1d"));
        assert!(output.contains("2d"));
        assert!(output.ends_with("Total: 2 backup(s)"));

        let missing = ArtifactRecord {
            path: PathBuf::from("/nonexistent/main.20240101000000.sqlite3"),
            timestamp: "20240101000000".to_string(),
            is_compressed: false,
        };
        assert!(format_artifact_list(&[missing], now).contains('?'));
    }
}
