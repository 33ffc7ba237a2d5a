//! Security utilities for safe extraction

use crate::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::error;

/// Maximum allowed extraction size (10 GB by default)
pub const DEFAULT_MAX_EXTRACTION_SIZE: u64 = 10 * 1024 * 1024 * 1024;

/// Split an archive path into safe components.
///
/// Both `/` and `\` separate components. Empty and `.` components are
/// dropped; `..`, a leading separator and drive prefixes are rejected.
pub fn safe_components(untrusted: &str) -> Result<Vec<&str>> {
    if untrusted.starts_with('/') || untrusted.starts_with('\\') {
        error!(path = untrusted, "Path is absolute");
        return Err(Error::InvalidPath(format!(
            "Absolute path not allowed: {:?}",
            untrusted
        )));
    }

    let mut parts = Vec::new();
    for component in untrusted.split(|c| c == '/' || c == '\\') {
        match component {
            "" | "." => {}
            ".." => {
                error!(path = untrusted, "Path contains parent directory component");
                return Err(Error::InvalidPath(format!(
                    "Path traversal attempt detected: {:?}",
                    untrusted
                )));
            }
            name if parts.is_empty() && is_drive_prefix(name) => {
                error!(path = untrusted, "Path contains drive prefix");
                return Err(Error::InvalidPath(format!(
                    "Drive prefix not allowed: {:?}",
                    untrusted
                )));
            }
            name => parts.push(name),
        }
    }

    if parts.is_empty() {
        return Err(Error::InvalidPath(format!(
            "Path does not name a file: {:?}",
            untrusted
        )));
    }
    Ok(parts)
}

/// `C:` style prefix, optionally followed by more characters (`C:foo`)
fn is_drive_prefix(component: &str) -> bool {
    let bytes = component.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// Resolve an archive path below `base`, rejecting anything that would land
/// outside of it. `base` must exist.
pub fn sanitize_path(base: &Path, untrusted: &str) -> Result<PathBuf> {
    let canonical_base = base
        .canonicalize()
        .map_err(|e| Error::InvalidPath(format!("Cannot canonicalize base path: {}", e)))?;

    let mut result = canonical_base.clone();
    for part in safe_components(untrusted)? {
        result.push(part);
    }

    if !result.starts_with(&canonical_base) || result == canonical_base {
        error!(base = ?base, path = untrusted, result = ?result, "Path escapes base directory");
        return Err(Error::InvalidPath(format!(
            "Path would escape extraction directory: {:?}",
            untrusted
        )));
    }

    Ok(result)
}

/// Fail when an entry decompresses to more than `limit` bytes, the part of
/// the extraction budget still unused
pub fn check_decompressed_size(entry_size: u64, limit: u64) -> Result<()> {
    if entry_size > limit {
        error!(entry_size, limit, "Decompressed data exceeds extraction limit");
        return Err(Error::SecurityError(format!(
            "Decompressed data exceeds the remaining extraction limit of {} bytes",
            limit
        )));
    }

    Ok(())
}
