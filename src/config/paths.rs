//! Path handling for profile entries
//!
//! Profile paths may reference environment variables (`$VAR` or `${VAR}`)
//! and may be relative. Relative paths are resolved against the directory
//! that holds the profile file.
//!
//! ## Resolution Order
//!
//! 1. Expand environment variable references (unknown ones are kept verbatim)
//! 2. If the result is relative, join it onto the profile directory
//! 3. Lexically normalize `.` and `..` components

use std::path::{Component, Path, PathBuf};

/// Expand `$VAR` and `${VAR}` references from the process environment.
///
/// References to variables that are not set, or that are malformed, are
/// left untouched.
pub fn expand_env_vars(input: &str) -> String {
    expand_with(input, |name| std::env::var(name).ok())
}

fn expand_with<F>(input: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(offset) = rest.find('$') {
        out.push_str(&rest[..offset]);
        let after = &rest[offset + 1..];

        if let Some(braced) = after.strip_prefix('{') {
            match braced.find('}') {
                Some(end) if is_valid_var_name(&braced[..end]) => {
                    let name = &braced[..end];
                    match lookup(name) {
                        Some(value) => out.push_str(&value),
                        None => out.push_str(&rest[offset..offset + end + 3]),
                    }
                    rest = &braced[end + 1..];
                }
                _ => {
                    out.push('$');
                    rest = after;
                }
            }
            continue;
        }

        let name_len = after
            .char_indices()
            .find(|(_, c)| !(c.is_ascii_alphanumeric() || *c == '_'))
            .map(|(i, _)| i)
            .unwrap_or(after.len());
        let name = &after[..name_len];

        if is_valid_var_name(name) {
            match lookup(name) {
                Some(value) => out.push_str(&value),
                None => {
                    out.push('$');
                    out.push_str(name);
                }
            }
        } else {
            out.push('$');
            out.push_str(name);
        }
        rest = &after[name_len..];
    }

    out.push_str(rest);
    out
}

fn is_valid_var_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Resolve a profile path against the profile's directory.
///
/// Environment references are expanded first, then relative paths are
/// joined onto `base_dir`. The result is lexically normalized.
pub fn resolve_path(base_dir: &Path, raw: &str) -> PathBuf {
    let expanded = PathBuf::from(expand_env_vars(raw));
    let joined = if expanded.is_absolute() {
        expanded
    } else {
        base_dir.join(expanded)
    };
    normalize(&joined)
}

/// Remove `.` components and fold `..` into its parent without touching the
/// filesystem.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Append a raw suffix to a path (`db.sqlite3` + `-wal` = `db.sqlite3-wal`)
pub fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut raw = path.as_os_str().to_owned();
    raw.push(suffix);
    PathBuf::from(raw)
}
